use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::{fmt, str::FromStr};
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

// --- Identity & Access ---

/// Identity
///
/// A resolved, authenticated user as reported by the auth service. Produced by the
/// session resolver from a credential token; never cached between requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct Identity {
    // Primary key of auth.users, shared with public.profiles.id.
    pub id: Uuid,
    pub email: String,
}

/// Profile
///
/// The row in `public.profiles` that carries the user's role. A missing row is a normal
/// state (freshly registered owners) and means standard access.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, Default)]
pub struct Profile {
    pub id: Uuid,
    pub email: Option<String>,
    // 'admin' for clinic staff; anything else is a pet owner.
    pub role: String,
}

/// AccessTier
///
/// Coarse permission level used by the route guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum AccessTier {
    Admin,
    #[default]
    Standard,
}

impl AccessTier {
    /// Maps a `profiles.role` value to a tier. Only the exact role `admin` escalates.
    pub fn from_role(role: &str) -> Self {
        match role {
            "admin" => AccessTier::Admin,
            _ => AccessTier::Standard,
        }
    }
}

// --- Clinic Records (Mapped to Database) ---

/// Owner
///
/// A pet owner registered by clinic staff (`public.owners`). `user_id` links the owner
/// to a portal login when the owner has one.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Owner {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: Option<String>,
    pub nick_name: Option<String>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

/// Pet
///
/// A row of `public.pets`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Pet {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,

    // 'type' is a reserved keyword in Rust; the column and the JSON key keep the short name.
    #[serde(rename = "type")]
    #[sqlx(rename = "type")]
    pub pet_type: String,

    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

/// PetWithOwner
///
/// Pet listing row for the staff dashboard, joined with the owner's name.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct PetWithOwner {
    pub id: Uuid,
    pub name: String,
    #[serde(rename = "type")]
    #[sqlx(rename = "type")]
    pub pet_type: String,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    pub owner_id: Uuid,
    pub owner_first_name: String,
    pub owner_last_name: String,
}

/// PetOption
///
/// Select-box entry used by the visit form: a pet and who it belongs to.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct PetOption {
    pub id: Uuid,
    pub name: String,
    #[serde(rename = "type")]
    #[sqlx(rename = "type")]
    pub pet_type: String,
    pub owner_first_name: String,
    pub owner_last_name: String,
}

/// Visit
///
/// A clinic visit (`public.visits`).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Visit {
    pub id: Uuid,
    pub pet_id: Uuid,
    #[ts(type = "string")]
    pub visit_date: NaiveDate,
    pub symptoms: String,
    pub treatment: Option<String>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

/// VisitRecord
///
/// Visit joined with the pet and its owner, as listed on the dashboard.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct VisitRecord {
    pub id: Uuid,
    #[ts(type = "string")]
    pub visit_date: NaiveDate,
    pub symptoms: String,
    pub treatment: Option<String>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    pub pet_name: String,
    pub pet_type: String,
    pub owner_first_name: String,
    pub owner_last_name: String,
}

/// Appointment
///
/// A booking made from the owner portal (`public.appointments`).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Appointment {
    pub id: Uuid,
    // The portal user who booked.
    pub user_id: Uuid,
    // Optional: owners may book before their pet is on file.
    pub pet_id: Option<Uuid>,
    #[ts(type = "string")]
    pub appointment_date: NaiveDate,
    #[ts(type = "string")]
    pub appointment_time: NaiveTime,
    pub reason: String,
    pub status: String,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

/// AppointmentRecord
///
/// Appointment joined with pet and owner details for the staff view. The pet side is a
/// LEFT JOIN, hence the optional columns.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct AppointmentRecord {
    pub id: Uuid,
    #[ts(type = "string")]
    pub appointment_date: NaiveDate,
    #[ts(type = "string")]
    pub appointment_time: NaiveTime,
    pub status: String,
    pub reason: String,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    pub pet_name: Option<String>,
    pub pet_type: Option<String>,
    pub owner_first_name: Option<String>,
    pub owner_last_name: Option<String>,
    pub owner_phone_number: Option<String>,
}

/// AppointmentStatus
///
/// Lifecycle of an appointment. Stored lowercase in the `status` column; parsing is
/// case-insensitive because staff forms have historically posted capitalised values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum AppointmentStatus {
    #[default]
    Pending,
    Confirmed,
    Cancelled,
    Completed,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Pending => "pending",
            AppointmentStatus::Confirmed => "confirmed",
            AppointmentStatus::Cancelled => "cancelled",
            AppointmentStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AppointmentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(AppointmentStatus::Pending),
            "confirmed" => Ok(AppointmentStatus::Confirmed),
            "cancelled" => Ok(AppointmentStatus::Cancelled),
            "completed" => Ok(AppointmentStatus::Completed),
            other => Err(format!("unknown appointment status '{}'", other)),
        }
    }
}

// --- Validated Inserts (Repository Input) ---

#[derive(Debug, Clone, PartialEq, Default)]
pub struct NewOwner {
    pub first_name: String,
    pub last_name: String,
    pub phone_number: Option<String>,
    pub nick_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct NewPet {
    pub owner_id: Uuid,
    pub name: String,
    pub pet_type: String,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct NewVisit {
    pub pet_id: Uuid,
    pub visit_date: NaiveDate,
    pub symptoms: String,
    pub treatment: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct NewAppointment {
    pub user_id: Uuid,
    pub pet_id: Option<Uuid>,
    pub appointment_date: NaiveDate,
    pub appointment_time: NaiveTime,
    pub reason: String,
    pub status: AppointmentStatus,
}

// --- Form Payloads (application/x-www-form-urlencoded) ---
//
// Every field defaults to empty so that an incomplete form reaches the handler and is
// answered with an `?error=` redirect instead of an extractor rejection.

#[derive(Debug, Clone, Deserialize, ToSchema, Default)]
#[serde(default)]
pub struct CredentialsForm {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize, ToSchema, Default)]
#[serde(default)]
pub struct CreateOwnerForm {
    pub first_name: String,
    pub last_name: String,
    pub phone_number: String,
    pub nick_name: String,
}

#[derive(Debug, Clone, Deserialize, ToSchema, Default)]
#[serde(default)]
pub struct CreatePetForm {
    pub owner_id: String,
    pub pet_name: String,
    pub pet_type: String,
}

#[derive(Debug, Clone, Deserialize, ToSchema, Default)]
#[serde(default)]
pub struct DeletePetForm {
    pub pet_id: String,
}

#[derive(Debug, Clone, Deserialize, ToSchema, Default)]
#[serde(default)]
pub struct CreateVisitForm {
    pub pet_id: String,
    pub symptoms: String,
    pub treatment: String,
    pub visit_date: String,
}

#[derive(Debug, Clone, Deserialize, ToSchema, Default)]
#[serde(default)]
pub struct BookAppointmentForm {
    pub appointment_date: String,
    pub appointment_time: String,
    pub reason: String,
    pub pet_id: String,
}

#[derive(Debug, Clone, Deserialize, ToSchema, Default)]
#[serde(default)]
pub struct UpdateAppointmentStatusForm {
    pub appointment_id: String,
    pub new_status: String,
}

// --- Page Payloads (Output) ---

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct LoginPage {
    pub message: Option<String>,
}

/// PortalHome
///
/// Landing page of the owner portal.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct PortalHome {
    pub email: String,
    pub appointments: Vec<Appointment>,
    // Set after a successful booking redirect.
    pub success: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct BookingPage {
    pub pets: Vec<Pet>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct MyPetsPage {
    pub pets: Vec<Pet>,
}

/// DashboardSummary
///
/// Staff overview: head counts plus the most recent visits.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct DashboardSummary {
    pub owner_count: i64,
    pub pet_count: i64,
    // Visits dated within the last seven days.
    pub recent_visit_count: i64,
    pub latest_visits: Vec<VisitRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct OwnersPage {
    pub owners: Vec<Owner>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct FormPage {
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct PetsPage {
    pub pets: Vec<PetWithOwner>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct AddPetPage {
    pub owners: Vec<Owner>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct VisitsPage {
    pub visits: Vec<VisitRecord>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct AddVisitPage {
    pub pets: Vec<PetOption>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct AddAppointmentPage {
    pub pets: Vec<PetOption>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct AppointmentsPage {
    pub appointments: Vec<AppointmentRecord>,
    pub error: Option<String>,
    pub message: Option<String>,
    pub update_success: bool,
}
