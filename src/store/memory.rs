use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use super::{AssignmentFilter, AssignmentStore, AttendanceLedger, Directory, StoreError, StoreResult};
use crate::attendance::{ABSENT_STATUS, AUTO_ABSENT_REMARK, SYSTEM_MARKER};
use crate::directory::{EmploymentWindow, NewProject, Project, User, UserType};
use crate::roster::Assignment;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttendanceEntry {
    pub status: String,
    pub remarks: Option<String>,
    pub marked_by: String,
    pub marked_at: DateTime<Utc>,
}

#[derive(Default)]
struct State {
    assignments: HashMap<Uuid, Assignment>,
    by_project: HashMap<Uuid, Uuid>,
    mentor_reservations: HashMap<Uuid, Uuid>,
    users: HashMap<Uuid, (User, String)>,
    projects: HashMap<Uuid, Project>,
    windows: Vec<EmploymentWindow>,
    attendance: HashMap<(Uuid, NaiveDate), AttendanceEntry>,
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, State>> {
        self.state
            .lock()
            .map_err(|_| StoreError::Internal("memory store lock poisoned".to_string()))
    }

    pub fn insert_user(&self, user: User, password_hash: impl Into<String>) -> StoreResult<()> {
        let mut state = self.lock()?;
        let email = user.email.to_ascii_lowercase();
        if state
            .users
            .values()
            .any(|(existing, _)| existing.id != user.id && existing.email.eq_ignore_ascii_case(&email))
        {
            return Err(StoreError::AlreadyExists);
        }
        state.users.insert(user.id, (user, password_hash.into()));
        Ok(())
    }

    pub fn insert_project(&self, project: Project) -> StoreResult<()> {
        self.lock()?.projects.insert(project.id, project);
        Ok(())
    }

    pub fn insert_employment(&self, window: EmploymentWindow) -> StoreResult<()> {
        self.lock()?.windows.push(window);
        Ok(())
    }

    pub fn record_attendance(
        &self,
        user_id: Uuid,
        date: NaiveDate,
        status: impl Into<String>,
    ) -> StoreResult<()> {
        self.lock()?.attendance.insert(
            (user_id, date),
            AttendanceEntry {
                status: status.into(),
                remarks: None,
                marked_by: "HR".to_string(),
                marked_at: Utc::now(),
            },
        );
        Ok(())
    }

    pub fn attendance_for(&self, user_id: Uuid) -> StoreResult<Vec<(NaiveDate, AttendanceEntry)>> {
        let state = self.lock()?;
        let mut entries: Vec<_> = state
            .attendance
            .iter()
            .filter(|((owner, _), _)| *owner == user_id)
            .map(|((_, date), entry)| (*date, entry.clone()))
            .collect();
        entries.sort_by_key(|(date, _)| *date);
        Ok(entries)
    }
}

fn insert_assignment(state: &mut State, project_id: Uuid, company: &str) -> Assignment {
    let assignment = Assignment::new(project_id, company, Utc::now());
    state.by_project.insert(project_id, assignment.id);
    state.assignments.insert(assignment.id, assignment.clone());
    assignment
}

#[async_trait]
impl AssignmentStore for MemoryStore {
    async fn get_or_create(&self, project_id: Uuid, company: &str) -> StoreResult<Assignment> {
        let mut state = self.lock()?;
        if let Some(existing) = state
            .by_project
            .get(&project_id)
            .and_then(|id| state.assignments.get(id))
        {
            return Ok(existing.clone());
        }
        Ok(insert_assignment(&mut state, project_id, company))
    }

    async fn create(&self, project_id: Uuid, company: &str) -> StoreResult<Assignment> {
        let mut state = self.lock()?;
        if state.by_project.contains_key(&project_id) {
            return Err(StoreError::AlreadyExists);
        }
        Ok(insert_assignment(&mut state, project_id, company))
    }

    async fn find(&self, filter: &AssignmentFilter) -> StoreResult<Vec<Assignment>> {
        let state = self.lock()?;
        let mut found: Vec<Assignment> = state
            .assignments
            .values()
            .filter(|assignment| filter.matches(assignment))
            .cloned()
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        Ok(found)
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Assignment>> {
        Ok(self.lock()?.assignments.get(&id).cloned())
    }

    async fn find_by_project(&self, project_id: Uuid) -> StoreResult<Option<Assignment>> {
        let state = self.lock()?;
        Ok(state
            .by_project
            .get(&project_id)
            .and_then(|id| state.assignments.get(id))
            .cloned())
    }

    async fn mentor_assignment(&self, user_id: Uuid) -> StoreResult<Option<Uuid>> {
        Ok(self.lock()?.mentor_reservations.get(&user_id).copied())
    }

    async fn save(&self, assignment: &Assignment) -> StoreResult<Assignment> {
        let mut state = self.lock()?;
        let current = state
            .assignments
            .get(&assignment.id)
            .ok_or(StoreError::NotFound)?;
        if current.version != assignment.version {
            return Err(StoreError::Conflict(format!(
                "assignment {} is at version {}, write was based on {}",
                assignment.id, current.version, assignment.version
            )));
        }

        let mentors = assignment.mentor_ids();
        for user_id in &mentors {
            if let Some(holder) = state.mentor_reservations.get(user_id) {
                if *holder != assignment.id {
                    return Err(StoreError::Conflict(format!(
                        "user {user_id} already mentors another project"
                    )));
                }
            }
        }

        state
            .mentor_reservations
            .retain(|user_id, holder| *holder != assignment.id || mentors.contains(user_id));
        for user_id in mentors {
            state.mentor_reservations.insert(user_id, assignment.id);
        }

        let mut stored = assignment.clone();
        stored.version += 1;
        stored.updated_at = Utc::now();
        state.assignments.insert(stored.id, stored.clone());
        Ok(stored)
    }
}

#[async_trait]
impl Directory for MemoryStore {
    async fn user(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(self.lock()?.users.get(&id).map(|(user, _)| user.clone()))
    }

    async fn user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(self.credentials(email).await?.map(|(user, _)| user))
    }

    async fn credentials(&self, email: &str) -> StoreResult<Option<(User, String)>> {
        let state = self.lock()?;
        Ok(state
            .users
            .values()
            .find(|(user, _)| user.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn users(&self, ids: &[Uuid]) -> StoreResult<Vec<User>> {
        let state = self.lock()?;
        Ok(ids
            .iter()
            .filter_map(|id| state.users.get(id).map(|(user, _)| user.clone()))
            .collect())
    }

    async fn users_in_company(
        &self,
        company: &str,
        user_type: UserType,
    ) -> StoreResult<Vec<User>> {
        let state = self.lock()?;
        let mut users: Vec<User> = state
            .users
            .values()
            .map(|(user, _)| user)
            .filter(|user| user.user_type == user_type && user.company.as_deref() == Some(company))
            .cloned()
            .collect();
        users.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(users)
    }

    async fn project(&self, id: Uuid) -> StoreResult<Option<Project>> {
        Ok(self.lock()?.projects.get(&id).cloned())
    }

    async fn create_project(&self, project: NewProject) -> StoreResult<Project> {
        let created = Project {
            id: Uuid::new_v4(),
            name: project.name,
            company: project.company,
            description: project.description,
            skill_requirement: project.skill_requirement,
            estimated_time_to_complete: project.estimated_time_to_complete,
            suggested_by: project.suggested_by,
            is_approved: project.is_approved,
            approved_by: None,
            approved_at: None,
            created_at: Utc::now(),
        };
        self.lock()?.projects.insert(created.id, created.clone());
        Ok(created)
    }

    async fn approve_project(
        &self,
        id: Uuid,
        approved_by: Uuid,
        at: DateTime<Utc>,
    ) -> StoreResult<Project> {
        let mut state = self.lock()?;
        let project = state.projects.get_mut(&id).ok_or(StoreError::NotFound)?;
        project.is_approved = true;
        project.approved_by = Some(approved_by);
        project.approved_at = Some(at);
        Ok(project.clone())
    }
}

#[async_trait]
impl AttendanceLedger for MemoryStore {
    async fn joined_windows(&self) -> StoreResult<Vec<EmploymentWindow>> {
        let state = self.lock()?;
        Ok(state
            .windows
            .iter()
            .filter(|window| {
                state
                    .users
                    .get(&window.user_id)
                    .is_some_and(|(user, _)| user.user_type == UserType::Intern)
            })
            .copied()
            .collect())
    }

    async fn recorded_dates(
        &self,
        user_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> StoreResult<HashSet<NaiveDate>> {
        let state = self.lock()?;
        Ok(state
            .attendance
            .keys()
            .filter(|(owner, date)| *owner == user_id && *date >= from && *date <= to)
            .map(|(_, date)| *date)
            .collect())
    }

    async fn insert_absence(
        &self,
        user_id: Uuid,
        date: NaiveDate,
        marked_at: DateTime<Utc>,
    ) -> StoreResult<bool> {
        let mut state = self.lock()?;
        if state.attendance.contains_key(&(user_id, date)) {
            return Ok(false);
        }
        state.attendance.insert(
            (user_id, date),
            AttendanceEntry {
                status: ABSENT_STATUS.to_string(),
                remarks: Some(AUTO_ABSENT_REMARK.to_string()),
                marked_by: SYSTEM_MARKER.to_string(),
                marked_at,
            },
        );
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roster::RoleKind;

    #[tokio::test]
    async fn get_or_create_returns_single_document() {
        let store = MemoryStore::new();
        let project = Uuid::new_v4();
        let first = store.get_or_create(project, "Acme").await.unwrap();
        let second = store.get_or_create(project, "Acme").await.unwrap();
        assert_eq!(first.id, second.id);
        assert!(matches!(
            store.create(project, "Acme").await,
            Err(StoreError::AlreadyExists)
        ));
    }

    #[tokio::test]
    async fn stale_save_is_rejected() {
        let store = MemoryStore::new();
        let base = store.get_or_create(Uuid::new_v4(), "Acme").await.unwrap();

        let mut left = base.clone();
        left.add_member(RoleKind::Intern, Uuid::new_v4(), Uuid::new_v4(), Utc::now())
            .unwrap();
        let mut right = base.clone();
        right
            .add_member(RoleKind::Intern, Uuid::new_v4(), Uuid::new_v4(), Utc::now())
            .unwrap();

        let saved = store.save(&left).await.unwrap();
        assert_eq!(saved.version, base.version + 1);
        assert!(matches!(store.save(&right).await, Err(StoreError::Conflict(_))));

        let stored = store.find_by_id(base.id).await.unwrap().unwrap();
        assert_eq!(stored.rosters.assigned_interns.len(), 1);
    }

    #[tokio::test]
    async fn mentor_reservations_follow_saves() {
        let store = MemoryStore::new();
        let dev = Uuid::new_v4();
        let hr = Uuid::new_v4();

        let mut first = store.get_or_create(Uuid::new_v4(), "Acme").await.unwrap();
        first.add_member(RoleKind::Mentor, dev, hr, Utc::now()).unwrap();
        let first = store.save(&first).await.unwrap();
        assert_eq!(store.mentor_assignment(dev).await.unwrap(), Some(first.id));

        let mut second = store.get_or_create(Uuid::new_v4(), "Acme").await.unwrap();
        second.add_member(RoleKind::Mentor, dev, hr, Utc::now()).unwrap();
        assert!(matches!(store.save(&second).await, Err(StoreError::Conflict(_))));

        let mut first = first;
        first.remove_member(RoleKind::Mentor, dev).unwrap();
        store.save(&first).await.unwrap();
        assert_eq!(store.mentor_assignment(dev).await.unwrap(), None);

        let second = store.find_by_id(second.id).await.unwrap().unwrap();
        let mut second = second;
        second.add_member(RoleKind::Mentor, dev, hr, Utc::now()).unwrap();
        store.save(&second).await.unwrap();
        assert_eq!(store.mentor_assignment(dev).await.unwrap(), Some(second.id));
    }

    #[tokio::test]
    async fn find_filters_by_company_and_member() {
        let store = MemoryStore::new();
        let intern = Uuid::new_v4();
        let mut acme = store.get_or_create(Uuid::new_v4(), "Acme").await.unwrap();
        acme.add_member(RoleKind::Intern, intern, Uuid::new_v4(), Utc::now())
            .unwrap();
        store.save(&acme).await.unwrap();
        store.get_or_create(Uuid::new_v4(), "Globex").await.unwrap();

        assert_eq!(store.find(&AssignmentFilter::default()).await.unwrap().len(), 2);
        assert_eq!(
            store.find(&AssignmentFilter::company("Globex")).await.unwrap().len(),
            1
        );
        let filter = AssignmentFilter::default().with_member(intern, &[RoleKind::Intern]);
        let found = store.find(&filter).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, acme.id);
    }

    #[tokio::test]
    async fn insert_absence_is_idempotent() {
        let store = MemoryStore::new();
        let intern = Uuid::new_v4();
        let date = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
        assert!(store.insert_absence(intern, date, Utc::now()).await.unwrap());
        assert!(!store.insert_absence(intern, date, Utc::now()).await.unwrap());
        let entries = store.attendance_for(intern).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].1.marked_by, SYSTEM_MARKER);
    }
}
