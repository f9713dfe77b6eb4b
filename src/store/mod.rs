use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::directory::{EmploymentWindow, NewProject, Project, User, UserType};
use crate::roster::{Assignment, RoleKind};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("write conflict: {0}")]
    Conflict(String),
    #[error("record already exists")]
    AlreadyExists,
    #[error("record not found")]
    NotFound,
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("store failure: {0}")]
    Internal(String),
}

impl From<serde_json::Error> for StoreError {
    fn from(value: serde_json::Error) -> Self {
        StoreError::Internal(format!("roster encoding failed: {value}"))
    }
}

#[derive(Debug, Clone)]
pub struct MemberFilter {
    pub user_id: Uuid,
    pub roles: Vec<RoleKind>,
}

#[derive(Debug, Clone, Default)]
pub struct AssignmentFilter {
    pub company: Option<String>,
    pub member: Option<MemberFilter>,
}

impl AssignmentFilter {
    pub fn company(company: impl Into<String>) -> Self {
        Self {
            company: Some(company.into()),
            member: None,
        }
    }

    pub fn with_member(mut self, user_id: Uuid, roles: &[RoleKind]) -> Self {
        self.member = Some(MemberFilter {
            user_id,
            roles: roles.to_vec(),
        });
        self
    }

    pub fn matches(&self, assignment: &Assignment) -> bool {
        if let Some(company) = &self.company {
            if &assignment.company != company {
                return false;
            }
        }
        match &self.member {
            Some(member) => member
                .roles
                .iter()
                .any(|role| assignment.holds(*role, member.user_id)),
            None => true,
        }
    }
}

#[async_trait]
pub trait AssignmentStore: Send + Sync + 'static {
    /// Returns the project's assignment, creating an empty one when none
    /// exists. Concurrent callers for the same project observe one document.
    async fn get_or_create(&self, project_id: Uuid, company: &str) -> StoreResult<Assignment>;

    async fn create(&self, project_id: Uuid, company: &str) -> StoreResult<Assignment>;

    async fn find(&self, filter: &AssignmentFilter) -> StoreResult<Vec<Assignment>>;

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Assignment>>;

    async fn find_by_project(&self, project_id: Uuid) -> StoreResult<Option<Assignment>>;

    async fn mentor_assignment(&self, user_id: Uuid) -> StoreResult<Option<Uuid>>;

    /// Persists the whole document. Fails with `Conflict` when the stored
    /// version moved since `assignment` was read or when a mentor listed on
    /// it is already reserved by another assignment. Returns the stored copy
    /// with its new version.
    async fn save(&self, assignment: &Assignment) -> StoreResult<Assignment>;
}

#[async_trait]
pub trait Directory: Send + Sync + 'static {
    async fn user(&self, id: Uuid) -> StoreResult<Option<User>>;

    async fn user_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    async fn credentials(&self, email: &str) -> StoreResult<Option<(User, String)>>;

    async fn users(&self, ids: &[Uuid]) -> StoreResult<Vec<User>>;

    async fn users_in_company(&self, company: &str, user_type: UserType)
        -> StoreResult<Vec<User>>;

    async fn project(&self, id: Uuid) -> StoreResult<Option<Project>>;

    async fn create_project(&self, project: NewProject) -> StoreResult<Project>;

    async fn approve_project(
        &self,
        id: Uuid,
        approved_by: Uuid,
        at: DateTime<Utc>,
    ) -> StoreResult<Project>;
}

#[async_trait]
pub trait AttendanceLedger: Send + Sync + 'static {
    async fn joined_windows(&self) -> StoreResult<Vec<EmploymentWindow>>;

    async fn recorded_dates(
        &self,
        user_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> StoreResult<HashSet<NaiveDate>>;

    /// Inserts a system-marked absence. Returns `false` when a record for
    /// that user and date already exists.
    async fn insert_absence(
        &self,
        user_id: Uuid,
        date: NaiveDate,
        marked_at: DateTime<Utc>,
    ) -> StoreResult<bool>;
}
