use crate::{
    AppState,
    auth::AuthUser,
    config::Env,
    error::RepoError,
    guard::{DASHBOARD_PATH, LOGIN_PATH, PORTAL_PATH, Viewer},
    models::{
        AddAppointmentPage, AddPetPage, AddVisitPage, AppointmentStatus, AppointmentsPage,
        BookAppointmentForm, BookingPage, CreateOwnerForm, CreatePetForm, CreateVisitForm,
        CredentialsForm, DashboardSummary, DeletePetForm, FormPage, LoginPage, MyPetsPage, NewAppointment,
        NewOwner, NewPet, NewVisit, OwnersPage, PetsPage, PortalHome,
        UpdateAppointmentStatusForm, VisitsPage,
    },
    session, tier,
};
use axum::{
    Extension, Form, Json,
    extract::{Query, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Redirect, Response},
};
use chrono::{NaiveDate, NaiveTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

// --- Query Structs ---

/// PageFlags
///
/// Status flags carried back to a page by a Post/Redirect/Get round trip
/// (e.g. `/portal/book?error=...`, `/portal?success=true`).
#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PageFlags {
    pub error: Option<String>,
    pub message: Option<String>,
    pub success: Option<String>,
    pub update_success: Option<String>,
}

impl PageFlags {
    fn is_set(flag: &Option<String>) -> bool {
        matches!(flag.as_deref(), Some("true") | Some("1"))
    }
}

// --- Helpers ---

/// Redirect to `path` with a single URL-encoded query flag.
fn redirect_with(path: &str, key: &str, message: &str) -> Redirect {
    Redirect::to(&format!("{}?{}={}", path, key, urlencoding::encode(message)))
}

/// Page loads fail as a bare 500; the cause stays in the logs.
fn page_error(context: &str, err: RepoError) -> StatusCode {
    tracing::error!("{} error: {:?}", context, err);
    StatusCode::INTERNAL_SERVER_ERROR
}

/// Trimmed value, or `None` when the form left the field blank.
fn non_blank(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").ok()
}

/// Browsers post `HH:MM`; some send seconds too.
fn parse_time(value: &str) -> Option<NaiveTime> {
    let value = value.trim();
    NaiveTime::parse_from_str(value, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
        .ok()
}

/// Date, time and reason of a booking form. The pet is left to the caller.
fn parse_booking(
    form: &BookAppointmentForm,
) -> Result<(NaiveDate, NaiveTime, String), &'static str> {
    let (Some(date), Some(time), Some(reason)) = (
        non_blank(&form.appointment_date),
        non_blank(&form.appointment_time),
        non_blank(&form.reason),
    ) else {
        return Err("Please provide a date, time and reason.");
    };

    let (Some(date), Some(time)) = (parse_date(&date), parse_time(&time)) else {
        return Err("Invalid appointment date or time.");
    };

    if date < Utc::now().date_naive() {
        return Err("Appointment date cannot be in the past.");
    }

    Ok((date, time, reason))
}

// --- Public Pages ---

/// index
///
/// [Public Route] Entry point. Signed-in viewers go to the dashboard (which sends standard
/// users on to the portal); everyone else goes to the login page.
#[utoipa::path(
    get,
    path = "/",
    responses((status = 303, description = "Redirect to /dashboard or /login"))
)]
pub async fn index(Extension(viewer): Extension<Viewer>) -> Redirect {
    if viewer.identity.is_some() {
        Redirect::to(DASHBOARD_PATH)
    } else {
        Redirect::to(LOGIN_PATH)
    }
}

#[utoipa::path(
    get,
    path = "/login",
    params(PageFlags),
    responses((status = 200, description = "Login page", body = LoginPage))
)]
pub async fn login_page(Query(flags): Query<PageFlags>) -> Json<LoginPage> {
    Json(LoginPage {
        message: flags.message,
    })
}

/// login
///
/// [Public Route] Password sign-in. On success the access token is stored in the session
/// cookie and the viewer is sent to the home of their tier.
#[utoipa::path(
    post,
    path = "/login",
    request_body(content = CredentialsForm, content_type = "application/x-www-form-urlencoded"),
    responses((status = 303, description = "Redirect to home or back to /login"))
)]
pub async fn login(State(state): State<AppState>, Form(form): Form<CredentialsForm>) -> Response {
    let failed = || redirect_with(LOGIN_PATH, "message", "Email or password incorrect.");

    let email = form.email.trim();
    if email.is_empty() || form.password.is_empty() {
        return failed().into_response();
    }

    let session = match state.gateway.sign_in_with_password(email, &form.password).await {
        Ok(session) => session,
        Err(e) => {
            tracing::warn!(error = %e, "login failed");
            return failed().into_response();
        }
    };

    let policy = state.config.profile_failure_policy;
    let Some(tier) = tier::tier_with_policy(state.repo.as_ref(), &session.identity, policy).await
    else {
        return redirect_with(
            LOGIN_PATH,
            "message",
            "Your profile could not be loaded. Please try again.",
        )
        .into_response();
    };

    tracing::info!(user_id = %session.identity.id, ?tier, "signed in");
    let home = Viewer::member(session.identity, tier).home();
    let cookie = session::session_cookie(
        &state.config.session_cookie,
        &session.access_token,
        session.expires_in,
        state.config.env == Env::Production,
    );

    ([(header::SET_COOKIE, cookie)], Redirect::to(home)).into_response()
}

/// register
///
/// [Public Route] Account creation through Supabase Auth. The user confirms by email before
/// the first login; no profile row is written here, so new accounts start at standard tier.
#[utoipa::path(
    post,
    path = "/register",
    request_body(content = CredentialsForm, content_type = "application/x-www-form-urlencoded"),
    responses((status = 303, description = "Redirect to /login with a status message"))
)]
pub async fn register(
    State(state): State<AppState>,
    Form(form): Form<CredentialsForm>,
) -> Redirect {
    let email = form.email.trim();
    if email.is_empty() || form.password.is_empty() {
        return redirect_with(LOGIN_PATH, "message", "Could not register user.");
    }

    let callback = format!("{}/auth/callback", state.config.supabase_url);
    match state.gateway.sign_up(email, &form.password, &callback).await {
        Ok(()) => redirect_with(LOGIN_PATH, "message", "Check email to confirm registration."),
        Err(e) => {
            tracing::error!("Registration failed: {}", e);
            redirect_with(LOGIN_PATH, "message", "Could not register user.")
        }
    }
}

/// logout
///
/// [Public Route] Revokes the session upstream when possible and always clears the cookie.
#[utoipa::path(
    post,
    path = "/logout",
    responses((status = 303, description = "Redirect to /login"))
)]
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Some(token) = session::credential_token(&headers, &state.config.session_cookie) {
        if let Err(e) = state.gateway.sign_out(&token).await {
            tracing::warn!(error = %e, "sign-out failed upstream; clearing cookie anyway");
        }
    }

    let cookie = session::cleared_cookie(
        &state.config.session_cookie,
        state.config.env == Env::Production,
    );
    ([(header::SET_COOKIE, cookie)], Redirect::to(LOGIN_PATH)).into_response()
}

// --- Owner Portal (standard tier) ---

#[utoipa::path(
    get,
    path = "/portal",
    params(PageFlags),
    responses((status = 200, description = "Portal home", body = PortalHome))
)]
pub async fn portal_home(
    AuthUser { id, email, .. }: AuthUser,
    State(state): State<AppState>,
    Query(flags): Query<PageFlags>,
) -> Result<Json<PortalHome>, StatusCode> {
    let appointments = state
        .repo
        .appointments_for_user(id)
        .await
        .map_err(|e| page_error("appointments_for_user", e))?;

    Ok(Json(PortalHome {
        email,
        appointments,
        success: PageFlags::is_set(&flags.success),
    }))
}

/// booking_page
///
/// [Standard Route] Booking form data: the pets linked to the signed-in owner.
#[utoipa::path(
    get,
    path = "/portal/book",
    params(PageFlags),
    responses((status = 200, description = "Booking form", body = BookingPage))
)]
pub async fn booking_page(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
    Query(flags): Query<PageFlags>,
) -> Result<Json<BookingPage>, StatusCode> {
    let pets = state
        .repo
        .pets_for_user(id)
        .await
        .map_err(|e| page_error("pets_for_user", e))?;

    Ok(Json(BookingPage {
        pets,
        error: flags.error,
    }))
}

/// book_appointment
///
/// [Standard Route] Books an appointment for the signed-in owner. New bookings start as
/// `pending`. Validation failures and insert errors come back to the form as `?error=`.
#[utoipa::path(
    post,
    path = "/portal/book",
    request_body(content = BookAppointmentForm, content_type = "application/x-www-form-urlencoded"),
    responses((status = 303, description = "Redirect to /portal?success=true or back to the form"))
)]
pub async fn book_appointment(
    AuthUser { id: user_id, .. }: AuthUser,
    State(state): State<AppState>,
    Form(form): Form<BookAppointmentForm>,
) -> Redirect {
    let back = "/portal/book";

    let (appointment_date, appointment_time, reason) = match parse_booking(&form) {
        Ok(fields) => fields,
        Err(message) => return redirect_with(back, "error", message),
    };

    let pet_id = match non_blank(&form.pet_id) {
        None => None,
        Some(raw) => {
            let Ok(pet_id) = Uuid::parse_str(&raw) else {
                return redirect_with(back, "error", "Invalid pet selection.");
            };
            // Owners may only book for pets on their own record.
            match state.repo.pets_for_user(user_id).await {
                Ok(pets) if pets.iter().any(|p| p.id == pet_id) => Some(pet_id),
                Ok(_) => return redirect_with(back, "error", "Invalid pet selection."),
                Err(e) => {
                    tracing::error!("pets_for_user error: {:?}", e);
                    return redirect_with(back, "error", "Could not book the appointment.");
                }
            }
        }
    };

    let appointment = NewAppointment {
        user_id,
        pet_id,
        appointment_date,
        appointment_time,
        reason,
        status: AppointmentStatus::Pending,
    };

    match state.repo.create_appointment(appointment).await {
        Ok(created) => {
            tracing::info!(appointment_id = %created.id, %user_id, "appointment booked");
            Redirect::to(&format!("{}?success=true", PORTAL_PATH))
        }
        Err(e) => {
            tracing::error!("create_appointment error: {:?}", e);
            redirect_with(back, "error", "Could not book the appointment.")
        }
    }
}

#[utoipa::path(
    get,
    path = "/portal/pets",
    responses((status = 200, description = "My pets", body = MyPetsPage))
)]
pub async fn my_pets(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<MyPetsPage>, StatusCode> {
    let pets = state
        .repo
        .pets_for_user(id)
        .await
        .map_err(|e| page_error("pets_for_user", e))?;
    Ok(Json(MyPetsPage { pets }))
}

// --- Staff Dashboard (admin tier) ---

/// dashboard
///
/// [Admin Route] Clinic overview. "Recent" means visits dated within the last seven days.
#[utoipa::path(
    get,
    path = "/dashboard",
    responses((status = 200, description = "Summary", body = DashboardSummary))
)]
pub async fn dashboard(State(state): State<AppState>) -> Result<Json<DashboardSummary>, StatusCode> {
    let since = Utc::now().date_naive() - chrono::Duration::days(7);
    let summary = state
        .repo
        .dashboard_summary(since)
        .await
        .map_err(|e| page_error("dashboard_summary", e))?;
    Ok(Json(summary))
}

#[utoipa::path(
    get,
    path = "/dashboard/owners",
    params(PageFlags),
    responses((status = 200, description = "Owners", body = OwnersPage))
)]
pub async fn owners_page(
    State(state): State<AppState>,
    Query(flags): Query<PageFlags>,
) -> Result<Json<OwnersPage>, StatusCode> {
    let owners = state
        .repo
        .list_owners()
        .await
        .map_err(|e| page_error("list_owners", e))?;
    Ok(Json(OwnersPage {
        owners,
        error: flags.error,
    }))
}

#[utoipa::path(
    get,
    path = "/dashboard/owners/add",
    params(PageFlags),
    responses((status = 200, description = "Owner form", body = FormPage))
)]
pub async fn owner_form(Query(flags): Query<PageFlags>) -> Json<FormPage> {
    Json(FormPage { error: flags.error })
}

#[utoipa::path(
    post,
    path = "/dashboard/owners",
    request_body(content = CreateOwnerForm, content_type = "application/x-www-form-urlencoded"),
    responses((status = 303, description = "Redirect to the owner list"))
)]
pub async fn create_owner(
    State(state): State<AppState>,
    Form(form): Form<CreateOwnerForm>,
) -> Redirect {
    let (Some(first_name), Some(last_name)) = (non_blank(&form.first_name), non_blank(&form.last_name))
    else {
        return redirect_with("/dashboard/owners/add", "error", "First and last name are required.");
    };

    let owner = NewOwner {
        first_name,
        last_name,
        phone_number: non_blank(&form.phone_number),
        nick_name: non_blank(&form.nick_name),
    };

    match state.repo.create_owner(owner).await {
        Ok(created) => {
            tracing::info!(owner_id = %created.id, "owner created");
            Redirect::to("/dashboard/owners")
        }
        Err(e) => {
            tracing::error!("create_owner error: {:?}", e);
            redirect_with("/dashboard/owners", "error", &format!("Could not add owner: {}", e))
        }
    }
}

#[utoipa::path(
    get,
    path = "/dashboard/pets",
    params(PageFlags),
    responses((status = 200, description = "Pets", body = PetsPage))
)]
pub async fn pets_page(
    State(state): State<AppState>,
    Query(flags): Query<PageFlags>,
) -> Result<Json<PetsPage>, StatusCode> {
    let pets = state
        .repo
        .list_pets()
        .await
        .map_err(|e| page_error("list_pets", e))?;
    Ok(Json(PetsPage {
        pets,
        error: flags.error,
    }))
}

/// add_pet_page
///
/// [Admin Route] Pet form data: owners to choose from, alphabetical by last name.
#[utoipa::path(
    get,
    path = "/dashboard/pets/add",
    params(PageFlags),
    responses((status = 200, description = "Pet form", body = AddPetPage))
)]
pub async fn add_pet_page(
    State(state): State<AppState>,
    Query(flags): Query<PageFlags>,
) -> Result<Json<AddPetPage>, StatusCode> {
    let mut owners = state
        .repo
        .list_owners()
        .await
        .map_err(|e| page_error("list_owners", e))?;
    owners.sort_by(|a, b| a.last_name.cmp(&b.last_name));

    Ok(Json(AddPetPage {
        owners,
        error: flags.error,
    }))
}

#[utoipa::path(
    post,
    path = "/dashboard/pets",
    request_body(content = CreatePetForm, content_type = "application/x-www-form-urlencoded"),
    responses((status = 303, description = "Redirect to the pet list or back to the form"))
)]
pub async fn create_pet(State(state): State<AppState>, Form(form): Form<CreatePetForm>) -> Redirect {
    let back = "/dashboard/pets/add";

    let (Some(owner_id), Some(name), Some(pet_type)) = (
        non_blank(&form.owner_id),
        non_blank(&form.pet_name),
        non_blank(&form.pet_type),
    ) else {
        return redirect_with(back, "error", "Please fill in all fields.");
    };

    let Ok(owner_id) = Uuid::parse_str(&owner_id) else {
        return redirect_with(back, "error", "Invalid owner selection.");
    };

    match state
        .repo
        .create_pet(NewPet {
            owner_id,
            name,
            pet_type,
        })
        .await
    {
        Ok(created) => {
            tracing::info!(pet_id = %created.id, %owner_id, "pet created");
            Redirect::to("/dashboard/pets")
        }
        Err(e) => {
            tracing::error!("create_pet error: {:?}", e);
            redirect_with(back, "error", &format!("Could not add pet: {}", e))
        }
    }
}

/// delete_pet
///
/// [Admin Route] Removes a pet (and, through the foreign key cascade, its visits).
#[utoipa::path(
    post,
    path = "/dashboard/pets/delete",
    request_body(content = DeletePetForm, content_type = "application/x-www-form-urlencoded"),
    responses((status = 303, description = "Redirect to the pet list"))
)]
pub async fn delete_pet(State(state): State<AppState>, Form(form): Form<DeletePetForm>) -> Redirect {
    let list = "/dashboard/pets";

    let Some(pet_id) = non_blank(&form.pet_id).and_then(|raw| Uuid::parse_str(&raw).ok()) else {
        return Redirect::to(list);
    };

    match state.repo.delete_pet(pet_id).await {
        Ok(true) => {
            tracing::info!(%pet_id, "pet deleted");
            Redirect::to(list)
        }
        Ok(false) => redirect_with(list, "error", "Pet not found."),
        Err(e) => {
            tracing::error!("delete_pet error: {:?}", e);
            redirect_with(list, "error", &format!("Could not delete pet: {}", e))
        }
    }
}

#[utoipa::path(
    get,
    path = "/dashboard/visits",
    params(PageFlags),
    responses((status = 200, description = "Visits", body = VisitsPage))
)]
pub async fn visits_page(
    State(state): State<AppState>,
    Query(flags): Query<PageFlags>,
) -> Result<Json<VisitsPage>, StatusCode> {
    let visits = state
        .repo
        .list_visits()
        .await
        .map_err(|e| page_error("list_visits", e))?;
    Ok(Json(VisitsPage {
        visits,
        error: flags.error,
    }))
}

#[utoipa::path(
    get,
    path = "/dashboard/visits/add",
    params(PageFlags),
    responses((status = 200, description = "Visit form", body = AddVisitPage))
)]
pub async fn add_visit_page(
    State(state): State<AppState>,
    Query(flags): Query<PageFlags>,
) -> Result<Json<AddVisitPage>, StatusCode> {
    let pets = state
        .repo
        .pet_options()
        .await
        .map_err(|e| page_error("pet_options", e))?;
    Ok(Json(AddVisitPage {
        pets,
        error: flags.error,
    }))
}

/// create_visit
///
/// [Admin Route] Records a visit. Pet, symptoms and date are required; treatment is optional.
#[utoipa::path(
    post,
    path = "/dashboard/visits",
    request_body(content = CreateVisitForm, content_type = "application/x-www-form-urlencoded"),
    responses((status = 303, description = "Redirect to the visit list or back to the form"))
)]
pub async fn create_visit(
    State(state): State<AppState>,
    Form(form): Form<CreateVisitForm>,
) -> Redirect {
    let back = "/dashboard/visits/add";

    let (Some(pet_id), Some(symptoms), Some(visit_date)) = (
        non_blank(&form.pet_id),
        non_blank(&form.symptoms),
        non_blank(&form.visit_date),
    ) else {
        return redirect_with(back, "error", "Please fill in the required fields.");
    };

    let (Ok(pet_id), Some(visit_date)) = (Uuid::parse_str(&pet_id), parse_date(&visit_date)) else {
        return redirect_with(back, "error", "Invalid pet or visit date.");
    };

    let visit = NewVisit {
        pet_id,
        visit_date,
        symptoms,
        treatment: non_blank(&form.treatment),
    };

    match state.repo.create_visit(visit).await {
        Ok(created) => {
            tracing::info!(visit_id = %created.id, %pet_id, "visit recorded");
            Redirect::to("/dashboard/visits")
        }
        Err(e) => {
            tracing::error!("create_visit error: {:?}", e);
            redirect_with(back, "error", &format!("Could not record visit: {}", e))
        }
    }
}

#[utoipa::path(
    get,
    path = "/dashboard/appointments",
    params(PageFlags),
    responses((status = 200, description = "Appointments", body = AppointmentsPage))
)]
pub async fn appointments_page(
    State(state): State<AppState>,
    Query(flags): Query<PageFlags>,
) -> Result<Json<AppointmentsPage>, StatusCode> {
    let appointments = state
        .repo
        .list_appointments()
        .await
        .map_err(|e| page_error("list_appointments", e))?;

    Ok(Json(AppointmentsPage {
        appointments,
        update_success: PageFlags::is_set(&flags.update_success),
        error: flags.error,
        message: flags.message,
    }))
}

#[utoipa::path(
    get,
    path = "/dashboard/appointments/add",
    params(PageFlags),
    responses((status = 200, description = "Appointment form", body = AddAppointmentPage))
)]
pub async fn add_appointment_page(
    State(state): State<AppState>,
    Query(flags): Query<PageFlags>,
) -> Result<Json<AddAppointmentPage>, StatusCode> {
    let pets = state
        .repo
        .pet_options()
        .await
        .map_err(|e| page_error("pet_options", e))?;
    Ok(Json(AddAppointmentPage {
        pets,
        error: flags.error,
    }))
}

/// create_appointment
///
/// [Admin Route] Staff book on behalf of an owner, so a pet is required here. The booking is
/// recorded under the staff member's id and starts as `pending` like any other.
#[utoipa::path(
    post,
    path = "/dashboard/appointments",
    request_body(content = BookAppointmentForm, content_type = "application/x-www-form-urlencoded"),
    responses((status = 303, description = "Redirect to the appointment list or back to the form"))
)]
pub async fn create_appointment(
    AuthUser { id: user_id, .. }: AuthUser,
    State(state): State<AppState>,
    Form(form): Form<BookAppointmentForm>,
) -> Redirect {
    let back = "/dashboard/appointments/add";

    let (appointment_date, appointment_time, reason) = match parse_booking(&form) {
        Ok(fields) => fields,
        Err(message) => return redirect_with(back, "error", message),
    };

    let Some(pet_id) = non_blank(&form.pet_id).and_then(|raw| Uuid::parse_str(&raw).ok()) else {
        return redirect_with(back, "error", "Please select a pet.");
    };

    let appointment = NewAppointment {
        user_id,
        pet_id: Some(pet_id),
        appointment_date,
        appointment_time,
        reason,
        status: AppointmentStatus::Pending,
    };

    match state.repo.create_appointment(appointment).await {
        Ok(created) => {
            tracing::info!(appointment_id = %created.id, %pet_id, "appointment created by staff");
            redirect_with("/dashboard/appointments", "message", "Appointment created.")
        }
        Err(e) => {
            tracing::error!("create_appointment error: {:?}", e);
            redirect_with(back, "error", &format!("Could not create appointment: {}", e))
        }
    }
}

/// update_appointment_status
///
/// [Admin Route] Confirms, cancels or completes an appointment.
#[utoipa::path(
    post,
    path = "/dashboard/appointments/status",
    request_body(content = UpdateAppointmentStatusForm, content_type = "application/x-www-form-urlencoded"),
    responses((status = 303, description = "Redirect to the appointment list"))
)]
pub async fn update_appointment_status(
    State(state): State<AppState>,
    Form(form): Form<UpdateAppointmentStatusForm>,
) -> Redirect {
    let list = "/dashboard/appointments";

    let (Some(id), Some(status)) = (non_blank(&form.appointment_id), non_blank(&form.new_status))
    else {
        return redirect_with(list, "error", "Missing appointment or status.");
    };

    let (Ok(id), Ok(status)) = (Uuid::parse_str(&id), status.parse::<AppointmentStatus>()) else {
        return redirect_with(list, "error", "Invalid appointment or status.");
    };

    match state.repo.update_appointment_status(id, status).await {
        Ok(true) => {
            tracing::info!(appointment_id = %id, %status, "appointment status updated");
            Redirect::to(&format!("{}?update_success=true", list))
        }
        Ok(false) => redirect_with(list, "error", "Appointment not found."),
        Err(e) => {
            tracing::error!("update_appointment_status error: {:?}", e);
            redirect_with(list, "error", &format!("Could not update status: {}", e))
        }
    }
}
