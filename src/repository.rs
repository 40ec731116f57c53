use crate::{
    error::RepoError,
    models::{
        Appointment, AppointmentRecord, AppointmentStatus, DashboardSummary, NewAppointment,
        NewOwner, NewPet, NewVisit, Owner, Pet, PetOption, PetWithOwner, Profile, Visit,
        VisitRecord,
    },
};
use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

/// Repository Trait
///
/// Abstract contract for every persistence operation, so handlers and the tier lookup
/// never see the driver. Every method returns an explicit `Result`; what a failure means
/// (deny, default, error page, error redirect) is decided by the caller.
///
/// **Send + Sync + async_trait** make `Arc<dyn Repository>` shareable across Axum tasks.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Access ---
    // Profile row carrying the role. Ok(None) when the user has no profile yet.
    async fn get_profile(&self, id: Uuid) -> Result<Option<Profile>, RepoError>;

    // --- Owners ---
    async fn list_owners(&self) -> Result<Vec<Owner>, RepoError>;
    async fn create_owner(&self, owner: NewOwner) -> Result<Owner, RepoError>;

    // --- Pets ---
    async fn list_pets(&self) -> Result<Vec<PetWithOwner>, RepoError>;
    // All pets with owner names, ordered by pet name. Feeds the visit form.
    async fn pet_options(&self) -> Result<Vec<PetOption>, RepoError>;
    // Pets whose owner record is linked to the given portal user.
    async fn pets_for_user(&self, user_id: Uuid) -> Result<Vec<Pet>, RepoError>;
    async fn create_pet(&self, pet: NewPet) -> Result<Pet, RepoError>;
    // Returns false when no pet with that id existed.
    async fn delete_pet(&self, id: Uuid) -> Result<bool, RepoError>;

    // --- Visits ---
    async fn list_visits(&self) -> Result<Vec<VisitRecord>, RepoError>;
    async fn create_visit(&self, visit: NewVisit) -> Result<Visit, RepoError>;

    // --- Appointments ---
    async fn list_appointments(&self) -> Result<Vec<AppointmentRecord>, RepoError>;
    async fn appointments_for_user(&self, user_id: Uuid) -> Result<Vec<Appointment>, RepoError>;
    async fn create_appointment(&self, appointment: NewAppointment)
    -> Result<Appointment, RepoError>;
    // Returns false when no appointment with that id existed.
    async fn update_appointment_status(
        &self,
        id: Uuid,
        status: AppointmentStatus,
    ) -> Result<bool, RepoError>;

    // --- Dashboard ---
    // Counts plus the five latest visits; `recent_since` bounds the recent-visit count.
    async fn dashboard_summary(&self, recent_since: NaiveDate)
    -> Result<DashboardSummary, RepoError>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;

const VISIT_RECORD_SELECT: &str = r#"
    SELECT
        v.id, v.visit_date, v.symptoms, v.treatment, v.created_at,
        p.name AS pet_name, p.type AS pet_type,
        o.first_name AS owner_first_name, o.last_name AS owner_last_name
    FROM visits v
    JOIN pets p ON v.pet_id = p.id
    JOIN owners o ON p.owner_id = o.id
"#;

const APPOINTMENT_COLUMNS: &str =
    "id, user_id, pet_id, appointment_date, appointment_time, reason, status, created_at";

/// PostgresRepository
///
/// `Repository` backed by the Supabase Postgres database.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn get_profile(&self, id: Uuid) -> Result<Option<Profile>, RepoError> {
        let profile =
            sqlx::query_as::<_, Profile>("SELECT id, email, role FROM profiles WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(profile)
    }

    /// list_owners
    ///
    /// Newest registrations first, as on the staff owner list.
    async fn list_owners(&self) -> Result<Vec<Owner>, RepoError> {
        let owners = sqlx::query_as::<_, Owner>(
            r#"SELECT id, user_id, first_name, last_name, phone_number, nick_name, created_at
               FROM owners
               ORDER BY created_at DESC"#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(owners)
    }

    async fn create_owner(&self, owner: NewOwner) -> Result<Owner, RepoError> {
        let created = sqlx::query_as::<_, Owner>(
            r#"INSERT INTO owners (first_name, last_name, phone_number, nick_name)
               VALUES ($1, $2, $3, $4)
               RETURNING id, user_id, first_name, last_name, phone_number, nick_name, created_at"#,
        )
        .bind(owner.first_name)
        .bind(owner.last_name)
        .bind(owner.phone_number)
        .bind(owner.nick_name)
        .fetch_one(&self.pool)
        .await?;
        Ok(created)
    }

    async fn list_pets(&self) -> Result<Vec<PetWithOwner>, RepoError> {
        let pets = sqlx::query_as::<_, PetWithOwner>(
            r#"SELECT
                   p.id, p.name, p.type, p.created_at,
                   o.id AS owner_id, o.first_name AS owner_first_name, o.last_name AS owner_last_name
               FROM pets p
               JOIN owners o ON p.owner_id = o.id
               ORDER BY p.created_at DESC"#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(pets)
    }

    async fn pet_options(&self) -> Result<Vec<PetOption>, RepoError> {
        let pets = sqlx::query_as::<_, PetOption>(
            r#"SELECT
                   p.id, p.name, p.type,
                   o.first_name AS owner_first_name, o.last_name AS owner_last_name
               FROM pets p
               JOIN owners o ON p.owner_id = o.id
               ORDER BY p.name ASC"#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(pets)
    }

    /// pets_for_user
    ///
    /// Ownership is resolved through `owners.user_id`; an owner record that was never
    /// linked to a login simply yields no pets.
    async fn pets_for_user(&self, user_id: Uuid) -> Result<Vec<Pet>, RepoError> {
        let pets = sqlx::query_as::<_, Pet>(
            r#"SELECT p.id, p.owner_id, p.name, p.type, p.created_at
               FROM pets p
               JOIN owners o ON p.owner_id = o.id
               WHERE o.user_id = $1
               ORDER BY p.name ASC"#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(pets)
    }

    async fn create_pet(&self, pet: NewPet) -> Result<Pet, RepoError> {
        let created = sqlx::query_as::<_, Pet>(
            r#"INSERT INTO pets (owner_id, name, type)
               VALUES ($1, $2, $3)
               RETURNING id, owner_id, name, type, created_at"#,
        )
        .bind(pet.owner_id)
        .bind(pet.name)
        .bind(pet.pet_type)
        .fetch_one(&self.pool)
        .await?;
        Ok(created)
    }

    /// delete_pet
    ///
    /// Visits referencing the pet are removed by the `ON DELETE CASCADE` on `visits.pet_id`.
    async fn delete_pet(&self, id: Uuid) -> Result<bool, RepoError> {
        let result = sqlx::query("DELETE FROM pets WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_visits(&self) -> Result<Vec<VisitRecord>, RepoError> {
        let query = format!("{} ORDER BY v.visit_date DESC", VISIT_RECORD_SELECT);
        let visits = sqlx::query_as::<_, VisitRecord>(&query)
            .fetch_all(&self.pool)
            .await?;
        Ok(visits)
    }

    async fn create_visit(&self, visit: NewVisit) -> Result<Visit, RepoError> {
        let created = sqlx::query_as::<_, Visit>(
            r#"INSERT INTO visits (pet_id, visit_date, symptoms, treatment)
               VALUES ($1, $2, $3, $4)
               RETURNING id, pet_id, visit_date, symptoms, treatment, created_at"#,
        )
        .bind(visit.pet_id)
        .bind(visit.visit_date)
        .bind(visit.symptoms)
        .bind(visit.treatment)
        .fetch_one(&self.pool)
        .await?;
        Ok(created)
    }

    /// list_appointments
    ///
    /// Upcoming first. The pet join is LEFT because bookings may omit the pet.
    async fn list_appointments(&self) -> Result<Vec<AppointmentRecord>, RepoError> {
        let appointments = sqlx::query_as::<_, AppointmentRecord>(
            r#"SELECT
                   a.id, a.appointment_date, a.appointment_time, a.status, a.reason, a.created_at,
                   p.name AS pet_name, p.type AS pet_type,
                   o.first_name AS owner_first_name, o.last_name AS owner_last_name,
                   o.phone_number AS owner_phone_number
               FROM appointments a
               LEFT JOIN pets p ON a.pet_id = p.id
               LEFT JOIN owners o ON p.owner_id = o.id
               ORDER BY a.appointment_date ASC, a.appointment_time ASC"#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(appointments)
    }

    async fn appointments_for_user(&self, user_id: Uuid) -> Result<Vec<Appointment>, RepoError> {
        let query = format!(
            "SELECT {} FROM appointments WHERE user_id = $1 ORDER BY appointment_date ASC, appointment_time ASC",
            APPOINTMENT_COLUMNS
        );
        let appointments = sqlx::query_as::<_, Appointment>(&query)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(appointments)
    }

    async fn create_appointment(
        &self,
        appointment: NewAppointment,
    ) -> Result<Appointment, RepoError> {
        let query = format!(
            r#"INSERT INTO appointments (user_id, pet_id, appointment_date, appointment_time, reason, status)
               VALUES ($1, $2, $3, $4, $5, $6)
               RETURNING {}"#,
            APPOINTMENT_COLUMNS
        );
        let created = sqlx::query_as::<_, Appointment>(&query)
            .bind(appointment.user_id)
            .bind(appointment.pet_id)
            .bind(appointment.appointment_date)
            .bind(appointment.appointment_time)
            .bind(appointment.reason)
            .bind(appointment.status.as_str())
            .fetch_one(&self.pool)
            .await?;
        Ok(created)
    }

    async fn update_appointment_status(
        &self,
        id: Uuid,
        status: AppointmentStatus,
    ) -> Result<bool, RepoError> {
        let result = sqlx::query("UPDATE appointments SET status = $1 WHERE id = $2")
            .bind(status.as_str())
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// dashboard_summary
    ///
    /// Compiles all counters for the staff dashboard in one call.
    async fn dashboard_summary(
        &self,
        recent_since: NaiveDate,
    ) -> Result<DashboardSummary, RepoError> {
        let owner_count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM owners")
            .fetch_one(&self.pool)
            .await?;
        let pet_count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM pets")
            .fetch_one(&self.pool)
            .await?;
        let recent_visit_count =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM visits WHERE visit_date >= $1")
                .bind(recent_since)
                .fetch_one(&self.pool)
                .await?;

        let query = format!("{} ORDER BY v.visit_date DESC LIMIT 5", VISIT_RECORD_SELECT);
        let latest_visits = sqlx::query_as::<_, VisitRecord>(&query)
            .fetch_all(&self.pool)
            .await?;

        Ok(DashboardSummary {
            owner_count,
            pet_count,
            recent_visit_count,
            latest_visits,
        })
    }
}
