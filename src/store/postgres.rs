use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use tracing::warn;
use uuid::Uuid;

use super::{AssignmentFilter, AssignmentStore, AttendanceLedger, Directory, StoreError, StoreResult};
use crate::attendance::{ABSENT_STATUS, APPLICATION_JOINED, AUTO_ABSENT_REMARK, SYSTEM_MARKER};
use crate::db::PgPool;
use crate::directory::{EmploymentWindow, NewProject, Project, User, UserType};
use crate::models::{
    AssignmentRow, NewAssignmentRow, NewAttendanceRow, NewMentorReservation, NewProjectRow,
    ProjectRow, UserRow,
};
use crate::roster::{Assignment, Rosters};
use crate::schema::{
    applications, attendance, internships, mentor_reservations, project_assignments, projects,
    users,
};

impl From<DieselError> for StoreError {
    fn from(value: DieselError) -> Self {
        match value {
            DieselError::NotFound => StoreError::NotFound,
            DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
                StoreError::Conflict(info.message().to_string())
            }
            DieselError::DatabaseError(DatabaseErrorKind::SerializationFailure, info) => {
                StoreError::Conflict(info.message().to_string())
            }
            DieselError::DatabaseError(_, info)
                if info.message().contains("statement timeout") =>
            {
                StoreError::Unavailable(info.message().to_string())
            }
            other => StoreError::Internal(other.to_string()),
        }
    }
}

fn utc(value: NaiveDateTime) -> DateTime<Utc> {
    DateTime::from_naive_utc_and_offset(value, Utc)
}

impl TryFrom<AssignmentRow> for Assignment {
    type Error = StoreError;

    fn try_from(row: AssignmentRow) -> Result<Self, Self::Error> {
        let rosters: Rosters = serde_json::from_value(row.rosters)?;
        Ok(Assignment {
            id: row.id,
            project_id: row.project_id,
            company: row.company,
            rosters,
            version: row.version,
            created_at: utc(row.created_at),
            updated_at: utc(row.updated_at),
        })
    }
}

impl TryFrom<UserRow> for User {
    type Error = StoreError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let user_type = row
            .user_type
            .parse::<UserType>()
            .map_err(|err| StoreError::Internal(format!("user {}: {err}", row.id)))?;
        Ok(User {
            id: row.id,
            name: row.name,
            email: row.email,
            user_type,
            company: row.company,
            verified: row.verified,
            is_approved: row.is_approved,
        })
    }
}

impl From<ProjectRow> for Project {
    fn from(row: ProjectRow) -> Self {
        Project {
            id: row.id,
            name: row.name,
            company: row.company,
            description: row.description,
            skill_requirement: row.skill_requirement,
            estimated_time_to_complete: row.estimated_time_to_complete,
            suggested_by: row.suggested_by,
            is_approved: row.is_approved,
            approved_by: row.approved_by,
            approved_at: row.approved_at.map(utc),
            created_at: utc(row.created_at),
        }
    }
}

fn empty_assignment(project_id: Uuid, company: &str) -> StoreResult<NewAssignmentRow> {
    Ok(NewAssignmentRow {
        id: Uuid::new_v4(),
        project_id,
        company: company.to_string(),
        rosters: serde_json::to_value(Rosters::default())?,
        version: 0,
    })
}

fn load_assignment(conn: &mut PgConnection, id: Uuid) -> StoreResult<Assignment> {
    let row: AssignmentRow = project_assignments::table.find(id).first(conn)?;
    Assignment::try_from(row)
}

/// Brings `mentor_reservations` in line with the mentor roster of one
/// assignment. Must run inside the transaction that wrote the roster.
fn sync_mentor_reservations(
    conn: &mut PgConnection,
    assignment_id: Uuid,
    mentor_ids: &[Uuid],
) -> StoreResult<()> {
    diesel::delete(
        mentor_reservations::table
            .filter(mentor_reservations::assignment_id.eq(assignment_id))
            .filter(mentor_reservations::user_id.ne_all(mentor_ids.to_vec())),
    )
    .execute(conn)?;

    for user_id in mentor_ids {
        let holder: Option<Uuid> = mentor_reservations::table
            .find(*user_id)
            .select(mentor_reservations::assignment_id)
            .first(conn)
            .optional()?;
        match holder {
            Some(existing) if existing == assignment_id => {}
            Some(_) => {
                return Err(StoreError::Conflict(format!(
                    "user {user_id} already mentors another project"
                )))
            }
            None => {
                diesel::insert_into(mentor_reservations::table)
                    .values(&NewMentorReservation {
                        user_id: *user_id,
                        assignment_id,
                    })
                    .execute(conn)?;
            }
        }
    }
    Ok(())
}

/// diesel-backed store. Blocking queries run on the blocking pool and every
/// call is bounded by `timeout`.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
    timeout: Duration,
}

impl PgStore {
    pub fn new(pool: PgPool, timeout: Duration) -> Self {
        Self { pool, timeout }
    }

    async fn run<T, F>(&self, operation: &'static str, job: F) -> StoreResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut PgConnection) -> StoreResult<T> + Send + 'static,
    {
        let pool = self.pool.clone();
        let task = tokio::task::spawn_blocking(move || {
            let mut conn = pool
                .get()
                .map_err(|err| StoreError::Unavailable(format!("database pool error: {err}")))?;
            job(&mut *conn)
        });

        match tokio::time::timeout(self.timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(err)) => Err(StoreError::Internal(format!(
                "{operation} task failed: {err}"
            ))),
            Err(_) => {
                warn!(operation, timeout_ms = self.timeout.as_millis() as u64, "store call timed out");
                Err(StoreError::Unavailable(format!("{operation} timed out")))
            }
        }
    }
}

#[async_trait]
impl AssignmentStore for PgStore {
    async fn get_or_create(&self, project_id: Uuid, company: &str) -> StoreResult<Assignment> {
        let company = company.to_string();
        self.run("get_or_create", move |conn| {
            conn.transaction::<_, StoreError, _>(|conn| {
                diesel::insert_into(project_assignments::table)
                    .values(&empty_assignment(project_id, &company)?)
                    .on_conflict(project_assignments::project_id)
                    .do_nothing()
                    .execute(conn)?;
                let row: AssignmentRow = project_assignments::table
                    .filter(project_assignments::project_id.eq(project_id))
                    .first(conn)?;
                Assignment::try_from(row)
            })
        })
        .await
    }

    async fn create(&self, project_id: Uuid, company: &str) -> StoreResult<Assignment> {
        let company = company.to_string();
        self.run("create_assignment", move |conn| {
            let row: AssignmentRow = diesel::insert_into(project_assignments::table)
                .values(&empty_assignment(project_id, &company)?)
                .get_result(conn)
                .map_err(|err| match err {
                    DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                        StoreError::AlreadyExists
                    }
                    other => StoreError::from(other),
                })?;
            Assignment::try_from(row)
        })
        .await
    }

    async fn find(&self, filter: &AssignmentFilter) -> StoreResult<Vec<Assignment>> {
        let filter = filter.clone();
        self.run("find_assignments", move |conn| {
            let mut query = project_assignments::table
                .order(project_assignments::created_at.desc())
                .into_boxed();
            if let Some(company) = &filter.company {
                query = query.filter(project_assignments::company.eq(company.clone()));
            }
            let rows: Vec<AssignmentRow> = query.load(conn)?;
            let mut found = Vec::with_capacity(rows.len());
            for row in rows {
                let assignment = Assignment::try_from(row)?;
                if filter.matches(&assignment) {
                    found.push(assignment);
                }
            }
            Ok(found)
        })
        .await
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Assignment>> {
        self.run("find_assignment", move |conn| {
            let row: Option<AssignmentRow> = project_assignments::table
                .find(id)
                .first(conn)
                .optional()?;
            row.map(Assignment::try_from).transpose()
        })
        .await
    }

    async fn find_by_project(&self, project_id: Uuid) -> StoreResult<Option<Assignment>> {
        self.run("find_project_assignment", move |conn| {
            let row: Option<AssignmentRow> = project_assignments::table
                .filter(project_assignments::project_id.eq(project_id))
                .first(conn)
                .optional()?;
            row.map(Assignment::try_from).transpose()
        })
        .await
    }

    async fn mentor_assignment(&self, user_id: Uuid) -> StoreResult<Option<Uuid>> {
        self.run("mentor_assignment", move |conn| {
            Ok(mentor_reservations::table
                .find(user_id)
                .select(mentor_reservations::assignment_id)
                .first(conn)
                .optional()?)
        })
        .await
    }

    async fn save(&self, assignment: &Assignment) -> StoreResult<Assignment> {
        let id = assignment.id;
        let version = assignment.version;
        let roster_json = serde_json::to_value(&assignment.rosters)?;
        let mentors = assignment.mentor_ids();
        self.run("save_assignment", move |conn| {
            conn.transaction::<_, StoreError, _>(|conn| {
                let updated = diesel::update(
                    project_assignments::table
                        .filter(project_assignments::id.eq(id))
                        .filter(project_assignments::version.eq(version)),
                )
                .set((
                    project_assignments::rosters.eq(roster_json),
                    project_assignments::version.eq(version + 1),
                    project_assignments::updated_at.eq(Utc::now().naive_utc()),
                ))
                .execute(conn)?;

                if updated == 0 {
                    let exists: bool = diesel::select(diesel::dsl::exists(
                        project_assignments::table.find(id),
                    ))
                    .get_result(conn)?;
                    return Err(if exists {
                        StoreError::Conflict(format!(
                            "assignment {id} changed since version {version}"
                        ))
                    } else {
                        StoreError::NotFound
                    });
                }

                sync_mentor_reservations(conn, id, &mentors)?;
                load_assignment(conn, id)
            })
        })
        .await
    }
}

#[async_trait]
impl Directory for PgStore {
    async fn user(&self, id: Uuid) -> StoreResult<Option<User>> {
        self.run("user", move |conn| {
            let row: Option<UserRow> = users::table.find(id).first(conn).optional()?;
            row.map(User::try_from).transpose()
        })
        .await
    }

    async fn user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(self.credentials(email).await?.map(|(user, _)| user))
    }

    async fn credentials(&self, email: &str) -> StoreResult<Option<(User, String)>> {
        let email = email.trim().to_ascii_lowercase();
        self.run("credentials", move |conn| {
            let row: Option<UserRow> = users::table
                .filter(users::email.eq(email))
                .first(conn)
                .optional()?;
            match row {
                Some(row) => {
                    let hash = row.password_hash.clone();
                    Ok(Some((User::try_from(row)?, hash)))
                }
                None => Ok(None),
            }
        })
        .await
    }

    async fn users(&self, ids: &[Uuid]) -> StoreResult<Vec<User>> {
        let ids = ids.to_vec();
        self.run("users", move |conn| {
            let rows: Vec<UserRow> = users::table.filter(users::id.eq_any(ids)).load(conn)?;
            rows.into_iter().map(User::try_from).collect()
        })
        .await
    }

    async fn users_in_company(
        &self,
        company: &str,
        user_type: UserType,
    ) -> StoreResult<Vec<User>> {
        let company = company.to_string();
        self.run("users_in_company", move |conn| {
            let rows: Vec<UserRow> = users::table
                .filter(users::company.eq(company))
                .filter(users::user_type.eq(user_type.as_str()))
                .order((users::name.asc(), users::id.asc()))
                .load(conn)?;
            rows.into_iter().map(User::try_from).collect()
        })
        .await
    }

    async fn project(&self, id: Uuid) -> StoreResult<Option<Project>> {
        self.run("project", move |conn| {
            let row: Option<ProjectRow> = projects::table.find(id).first(conn).optional()?;
            Ok(row.map(Project::from))
        })
        .await
    }

    async fn create_project(&self, project: NewProject) -> StoreResult<Project> {
        self.run("create_project", move |conn| {
            let row: ProjectRow = diesel::insert_into(projects::table)
                .values(&NewProjectRow {
                    id: Uuid::new_v4(),
                    name: project.name,
                    company: project.company,
                    description: project.description,
                    skill_requirement: project.skill_requirement,
                    estimated_time_to_complete: project.estimated_time_to_complete,
                    suggested_by: project.suggested_by,
                    is_approved: project.is_approved,
                })
                .get_result(conn)?;
            Ok(Project::from(row))
        })
        .await
    }

    async fn approve_project(
        &self,
        id: Uuid,
        approved_by: Uuid,
        at: DateTime<Utc>,
    ) -> StoreResult<Project> {
        self.run("approve_project", move |conn| {
            let row: ProjectRow = diesel::update(projects::table.find(id))
                .set((
                    projects::is_approved.eq(true),
                    projects::approved_by.eq(Some(approved_by)),
                    projects::approved_at.eq(Some(at.naive_utc())),
                    projects::updated_at.eq(Utc::now().naive_utc()),
                ))
                .get_result(conn)?;
            Ok(Project::from(row))
        })
        .await
    }
}

#[async_trait]
impl AttendanceLedger for PgStore {
    async fn joined_windows(&self) -> StoreResult<Vec<EmploymentWindow>> {
        self.run("joined_windows", move |conn| {
            let rows: Vec<(Uuid, NaiveDate, Option<NaiveDate>)> = applications::table
                .inner_join(internships::table)
                .inner_join(users::table)
                .filter(applications::status.eq(APPLICATION_JOINED))
                .filter(users::user_type.eq(UserType::Intern.as_str()))
                .select((
                    applications::user_id,
                    internships::internship_start_date,
                    internships::internship_end_date,
                ))
                .load(conn)?;
            Ok(rows
                .into_iter()
                .map(|(user_id, start, end)| EmploymentWindow {
                    user_id,
                    start,
                    end,
                })
                .collect())
        })
        .await
    }

    async fn recorded_dates(
        &self,
        user_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> StoreResult<HashSet<NaiveDate>> {
        self.run("recorded_dates", move |conn| {
            let dates: Vec<NaiveDate> = attendance::table
                .filter(attendance::user_id.eq(user_id))
                .filter(attendance::date.between(from, to))
                .select(attendance::date)
                .load(conn)?;
            Ok(dates.into_iter().collect())
        })
        .await
    }

    async fn insert_absence(
        &self,
        user_id: Uuid,
        date: NaiveDate,
        marked_at: DateTime<Utc>,
    ) -> StoreResult<bool> {
        self.run("insert_absence", move |conn| {
            let inserted = diesel::insert_into(attendance::table)
                .values(&NewAttendanceRow {
                    id: Uuid::new_v4(),
                    user_id,
                    date,
                    status: ABSENT_STATUS.to_string(),
                    remarks: Some(AUTO_ABSENT_REMARK.to_string()),
                    marked_by: SYSTEM_MARKER.to_string(),
                    marked_at: marked_at.naive_utc(),
                })
                .on_conflict((attendance::user_id, attendance::date))
                .do_nothing()
                .execute(conn)?;
            Ok(inserted == 1)
        })
        .await
    }
}
