#![allow(dead_code)]

use async_trait::async_trait;
use chrono::NaiveDate;
use clinic_portal::{
    AppState, RouteTable,
    auth::{AuthGateway, AuthSession, AuthUser},
    config::AppConfig,
    error::{AuthError, RepoError},
    models::{
        AccessTier, Appointment, AppointmentRecord, AppointmentStatus, DashboardSummary,
        Identity, NewAppointment, NewOwner, NewPet, NewVisit, Owner, Pet, PetOption, PetWithOwner,
        Profile, Visit, VisitRecord,
    },
    repository::Repository,
    session::IdentityProvider,
};
use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};
use uuid::Uuid;

// --- Fixtures ---

pub const STANDARD_ID: Uuid = Uuid::from_u128(123);
pub const ADMIN_ID: Uuid = Uuid::from_u128(456);

pub const STANDARD_TOKEN: &str = "standard-token";
pub const ADMIN_TOKEN: &str = "admin-token";

pub fn standard_identity() -> Identity {
    Identity {
        id: STANDARD_ID,
        email: "owner@clinic.test".to_string(),
    }
}

pub fn admin_identity() -> Identity {
    Identity {
        id: ADMIN_ID,
        email: "staff@clinic.test".to_string(),
    }
}

pub fn standard_user() -> AuthUser {
    AuthUser {
        id: STANDARD_ID,
        email: "owner@clinic.test".to_string(),
        tier: AccessTier::Standard,
    }
}

pub fn db_error() -> RepoError {
    RepoError::Database(sqlx::Error::PoolTimedOut)
}

// --- MOCK IDENTITY PROVIDER ---

/// Token -> identity table. `fail` makes every lookup error out.
#[derive(Default)]
pub struct MockIdentityProvider {
    pub sessions: HashMap<String, Identity>,
    pub fail: bool,
    pub calls: AtomicUsize,
}

impl MockIdentityProvider {
    /// Knows one standard user and one admin.
    pub fn clinic() -> Self {
        let mut sessions = HashMap::new();
        sessions.insert(STANDARD_TOKEN.to_string(), standard_identity());
        sessions.insert(ADMIN_TOKEN.to_string(), admin_identity());
        Self {
            sessions,
            ..Self::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IdentityProvider for MockIdentityProvider {
    async fn get_identity(&self, token: &str) -> Result<Option<Identity>, AuthError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(AuthError::Rejected {
                status: 503,
                body: "unavailable".to_string(),
            });
        }
        Ok(self.sessions.get(token).cloned())
    }
}

// --- MOCK AUTH GATEWAY ---

#[derive(Default)]
pub struct MockGateway {
    // email -> (password, identity)
    pub accounts: HashMap<String, (String, Identity)>,
    pub sign_up_fails: bool,
    pub sign_out_fails: bool,
    pub sign_ups: Mutex<Vec<(String, String)>>,
    pub sign_outs: Mutex<Vec<String>>,
}

impl MockGateway {
    pub fn clinic() -> Self {
        let mut accounts = HashMap::new();
        accounts.insert(
            "owner@clinic.test".to_string(),
            ("hunter2".to_string(), standard_identity()),
        );
        accounts.insert(
            "staff@clinic.test".to_string(),
            ("s3cret".to_string(), admin_identity()),
        );
        Self {
            accounts,
            ..Self::default()
        }
    }
}

#[async_trait]
impl AuthGateway for MockGateway {
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, AuthError> {
        match self.accounts.get(email) {
            Some((expected, identity)) if expected == password => Ok(AuthSession {
                access_token: format!("token-{}", identity.id),
                expires_in: 3600,
                identity: identity.clone(),
            }),
            _ => Err(AuthError::InvalidCredentials),
        }
    }

    async fn sign_up(
        &self,
        email: &str,
        _password: &str,
        redirect_to: &str,
    ) -> Result<(), AuthError> {
        if self.sign_up_fails {
            return Err(AuthError::Rejected {
                status: 422,
                body: "User already registered".to_string(),
            });
        }
        self.sign_ups
            .lock()
            .unwrap()
            .push((email.to_string(), redirect_to.to_string()));
        Ok(())
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), AuthError> {
        self.sign_outs.lock().unwrap().push(access_token.to_string());
        if self.sign_out_fails {
            return Err(AuthError::Rejected {
                status: 500,
                body: "boom".to_string(),
            });
        }
        Ok(())
    }
}

// --- MOCK REPOSITORY IMPLEMENTATION ---

/// Pre-canned outputs plus a record of every write the handlers attempted.
pub struct MockRepoControl {
    // user id -> role; users without an entry have no profile row.
    pub roles: HashMap<Uuid, String>,
    pub profile_fails: bool,
    pub profile_calls: AtomicUsize,

    // Makes every non-profile query fail.
    pub queries_fail: bool,

    pub owners: Vec<Owner>,
    pub pets: Vec<PetWithOwner>,
    pub pet_options: Vec<PetOption>,
    pub user_pets: Vec<Pet>,
    pub visits: Vec<VisitRecord>,
    pub appointments: Vec<AppointmentRecord>,
    pub user_appointments: Vec<Appointment>,
    pub summary: DashboardSummary,
    pub delete_result: bool,
    pub update_result: bool,

    pub created_owners: Mutex<Vec<NewOwner>>,
    pub created_pets: Mutex<Vec<NewPet>>,
    pub created_visits: Mutex<Vec<NewVisit>>,
    pub created_appointments: Mutex<Vec<NewAppointment>>,
    pub deleted_pets: Mutex<Vec<Uuid>>,
    pub status_updates: Mutex<Vec<(Uuid, AppointmentStatus)>>,
    pub summary_since: Mutex<Option<NaiveDate>>,
}

impl Default for MockRepoControl {
    fn default() -> Self {
        let mut roles = HashMap::new();
        roles.insert(ADMIN_ID, "admin".to_string());

        MockRepoControl {
            roles,
            profile_fails: false,
            profile_calls: AtomicUsize::new(0),
            queries_fail: false,
            owners: vec![],
            pets: vec![],
            pet_options: vec![],
            user_pets: vec![],
            visits: vec![],
            appointments: vec![],
            user_appointments: vec![],
            summary: DashboardSummary::default(),
            delete_result: true,
            update_result: true,
            created_owners: Mutex::new(vec![]),
            created_pets: Mutex::new(vec![]),
            created_visits: Mutex::new(vec![]),
            created_appointments: Mutex::new(vec![]),
            deleted_pets: Mutex::new(vec![]),
            status_updates: Mutex::new(vec![]),
            summary_since: Mutex::new(None),
        }
    }
}

impl MockRepoControl {
    fn check(&self) -> Result<(), RepoError> {
        if self.queries_fail {
            Err(db_error())
        } else {
            Ok(())
        }
    }

    pub fn profile_call_count(&self) -> usize {
        self.profile_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Repository for MockRepoControl {
    async fn get_profile(&self, id: Uuid) -> Result<Option<Profile>, RepoError> {
        self.profile_calls.fetch_add(1, Ordering::SeqCst);
        if self.profile_fails {
            return Err(db_error());
        }
        Ok(self.roles.get(&id).map(|role| Profile {
            id,
            email: None,
            role: role.clone(),
        }))
    }

    async fn list_owners(&self) -> Result<Vec<Owner>, RepoError> {
        self.check()?;
        Ok(self.owners.clone())
    }

    async fn create_owner(&self, owner: NewOwner) -> Result<Owner, RepoError> {
        self.check()?;
        self.created_owners.lock().unwrap().push(owner.clone());
        Ok(Owner {
            id: Uuid::new_v4(),
            first_name: owner.first_name,
            last_name: owner.last_name,
            phone_number: owner.phone_number,
            nick_name: owner.nick_name,
            ..Owner::default()
        })
    }

    async fn list_pets(&self) -> Result<Vec<PetWithOwner>, RepoError> {
        self.check()?;
        Ok(self.pets.clone())
    }

    async fn pet_options(&self) -> Result<Vec<PetOption>, RepoError> {
        self.check()?;
        Ok(self.pet_options.clone())
    }

    async fn pets_for_user(&self, _user_id: Uuid) -> Result<Vec<Pet>, RepoError> {
        self.check()?;
        Ok(self.user_pets.clone())
    }

    async fn create_pet(&self, pet: NewPet) -> Result<Pet, RepoError> {
        self.check()?;
        self.created_pets.lock().unwrap().push(pet.clone());
        Ok(Pet {
            id: Uuid::new_v4(),
            owner_id: pet.owner_id,
            name: pet.name,
            pet_type: pet.pet_type,
            ..Pet::default()
        })
    }

    async fn delete_pet(&self, id: Uuid) -> Result<bool, RepoError> {
        self.check()?;
        self.deleted_pets.lock().unwrap().push(id);
        Ok(self.delete_result)
    }

    async fn list_visits(&self) -> Result<Vec<VisitRecord>, RepoError> {
        self.check()?;
        Ok(self.visits.clone())
    }

    async fn create_visit(&self, visit: NewVisit) -> Result<Visit, RepoError> {
        self.check()?;
        self.created_visits.lock().unwrap().push(visit.clone());
        Ok(Visit {
            id: Uuid::new_v4(),
            pet_id: visit.pet_id,
            visit_date: visit.visit_date,
            symptoms: visit.symptoms,
            treatment: visit.treatment,
            ..Visit::default()
        })
    }

    async fn list_appointments(&self) -> Result<Vec<AppointmentRecord>, RepoError> {
        self.check()?;
        Ok(self.appointments.clone())
    }

    async fn appointments_for_user(&self, _user_id: Uuid) -> Result<Vec<Appointment>, RepoError> {
        self.check()?;
        Ok(self.user_appointments.clone())
    }

    async fn create_appointment(
        &self,
        appointment: NewAppointment,
    ) -> Result<Appointment, RepoError> {
        self.check()?;
        self.created_appointments
            .lock()
            .unwrap()
            .push(appointment.clone());
        Ok(Appointment {
            id: Uuid::new_v4(),
            user_id: appointment.user_id,
            pet_id: appointment.pet_id,
            appointment_date: appointment.appointment_date,
            appointment_time: appointment.appointment_time,
            reason: appointment.reason,
            status: appointment.status.to_string(),
            ..Appointment::default()
        })
    }

    async fn update_appointment_status(
        &self,
        id: Uuid,
        status: AppointmentStatus,
    ) -> Result<bool, RepoError> {
        self.check()?;
        self.status_updates.lock().unwrap().push((id, status));
        Ok(self.update_result)
    }

    async fn dashboard_summary(
        &self,
        recent_since: NaiveDate,
    ) -> Result<DashboardSummary, RepoError> {
        self.check()?;
        *self.summary_since.lock().unwrap() = Some(recent_since);
        Ok(self.summary.clone())
    }
}

// --- TEST UTILITIES ---

/// Full state over the given mocks, with the clinic route table and default config.
pub fn create_test_state(
    repo: Arc<MockRepoControl>,
    identity: Arc<MockIdentityProvider>,
    gateway: Arc<MockGateway>,
) -> AppState {
    create_test_state_with_config(repo, identity, gateway, AppConfig::default())
}

pub fn create_test_state_with_config(
    repo: Arc<MockRepoControl>,
    identity: Arc<MockIdentityProvider>,
    gateway: Arc<MockGateway>,
    config: AppConfig,
) -> AppState {
    AppState {
        repo,
        identity,
        gateway,
        config,
        routes: Arc::new(RouteTable::clinic()),
    }
}

/// The usual setup: both test users known, admin has a profile row, standard has none.
pub fn clinic_state() -> AppState {
    create_test_state(
        Arc::new(MockRepoControl::default()),
        Arc::new(MockIdentityProvider::clinic()),
        Arc::new(MockGateway::clinic()),
    )
}

pub fn state_with_repo(repo: MockRepoControl) -> (AppState, Arc<MockRepoControl>) {
    let repo = Arc::new(repo);
    let state = create_test_state(
        repo.clone(),
        Arc::new(MockIdentityProvider::clinic()),
        Arc::new(MockGateway::clinic()),
    );
    (state, repo)
}

/// Location header of a redirect response.
pub fn location(response: &axum::response::Response) -> String {
    response
        .headers()
        .get(axum::http::header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

pub fn set_cookie(response: &axum::response::Response) -> Option<String> {
    response
        .headers()
        .get(axum::http::header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}
