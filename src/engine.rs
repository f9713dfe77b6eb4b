use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use chrono::Utc;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::Serialize;
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::auth::Actor;
use crate::directory::{NewProject, Project, User, UserType};
use crate::notify::{NotificationEvent, Notifier};
use crate::roster::{Assignment, ReviewDecision, RoleKind, RosterError, VolunteerStatus};
use crate::store::{AssignmentFilter, AssignmentStore, Directory, StoreError};
use crate::views::{referenced_users, AssignmentView, UserSummary, ViewLookup};

pub type EngineResult<T> = Result<T, EngineError>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EngineError {
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    DuplicateRequest(String),
    #[error("{0}")]
    AlreadyAssigned(String),
    #[error("{0}")]
    AlreadyExists(String),
    #[error("{0}")]
    RoleExclusion(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    NoCandidates(String),
    #[error("{0}")]
    Unavailable(String),
    #[error("{0}")]
    Internal(String),
}

impl From<StoreError> for EngineError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Conflict(detail) => {
                warn!(%detail, "assignment write lost a race");
                EngineError::Conflict(
                    "the assignment was changed by another request; reload and retry".to_string(),
                )
            }
            StoreError::AlreadyExists => {
                EngineError::AlreadyExists("record already exists".to_string())
            }
            StoreError::NotFound => EngineError::NotFound("record not found".to_string()),
            StoreError::Unavailable(detail) => {
                warn!(%detail, "store unavailable");
                EngineError::Unavailable("storage is temporarily unavailable".to_string())
            }
            StoreError::Internal(detail) => {
                error!(%detail, "store failure");
                EngineError::Internal(detail)
            }
        }
    }
}

impl From<RosterError> for EngineError {
    fn from(value: RosterError) -> Self {
        let message = value.to_string();
        match value {
            RosterError::AlreadyAssigned { .. } => EngineError::AlreadyAssigned(message),
            RosterError::RoleExclusion { .. } => EngineError::RoleExclusion(message),
            RosterError::DuplicateRequest { .. } => EngineError::DuplicateRequest(message),
            RosterError::RequestNotFound | RosterError::MemberNotFound { .. } => {
                EngineError::NotFound(message)
            }
            RosterError::AlreadyReviewed { .. } => EngineError::Validation(message),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeveloperAssignment {
    #[serde(flatten)]
    pub assignment: AssignmentView,
    pub roles: Vec<RoleKind>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectApproval {
    pub project: Project,
    pub assignment: Assignment,
    pub seeded_mentor: Option<Uuid>,
}

#[derive(Debug, Clone)]
pub struct ProjectDraft {
    pub name: String,
    pub company: Option<String>,
    pub description: String,
    pub skill_requirement: Vec<String>,
    pub estimated_time_to_complete: String,
}

pub fn require_verified(actor: &Actor) -> EngineResult<()> {
    if actor.verified {
        Ok(())
    } else {
        Err(EngineError::Forbidden(
            "please verify your email before continuing".to_string(),
        ))
    }
}

pub fn require_manager(actor: &Actor) -> EngineResult<()> {
    require_verified(actor)?;
    if !actor.is_manager() {
        return Err(EngineError::Forbidden(
            "only HR and admins can perform this action".to_string(),
        ));
    }
    if actor.is_hr() && actor.company.is_none() {
        return Err(EngineError::Forbidden(
            "company information is required".to_string(),
        ));
    }
    Ok(())
}

fn require_scope(actor: &Actor, company: &str, message: &str) -> EngineResult<()> {
    if actor.manages(company) {
        Ok(())
    } else {
        Err(EngineError::Forbidden(message.to_string()))
    }
}

fn require_view(actor: &Actor, company: &str) -> EngineResult<()> {
    if actor.is_admin() || actor.belongs_to(company) {
        Ok(())
    } else {
        Err(EngineError::Forbidden(
            "you can only view assignments of your own company".to_string(),
        ))
    }
}

pub fn parse_roster_role(user_type: &str) -> EngineResult<RoleKind> {
    match user_type.trim().to_ascii_lowercase().as_str() {
        "developer" => Ok(RoleKind::Mentor),
        "intern" => Ok(RoleKind::Intern),
        other => Err(EngineError::Validation(format!(
            "invalid user type `{other}`; expected developer or intern"
        ))),
    }
}

pub fn parse_decision(status: &str) -> EngineResult<ReviewDecision> {
    match status.trim().to_ascii_lowercase().as_str() {
        "approved" => Ok(ReviewDecision::Approved),
        "rejected" => Ok(ReviewDecision::Rejected),
        other => Err(EngineError::Validation(format!(
            "invalid status `{other}`; expected approved or rejected"
        ))),
    }
}

pub struct Engine {
    store: Arc<dyn AssignmentStore>,
    directory: Arc<dyn Directory>,
    notifier: Notifier,
    rng: Mutex<StdRng>,
}

impl Engine {
    pub fn new(
        store: Arc<dyn AssignmentStore>,
        directory: Arc<dyn Directory>,
        notifier: Notifier,
    ) -> Self {
        Self::with_rng(store, directory, notifier, StdRng::from_entropy())
    }

    pub fn with_rng(
        store: Arc<dyn AssignmentStore>,
        directory: Arc<dyn Directory>,
        notifier: Notifier,
        rng: StdRng,
    ) -> Self {
        Self {
            store,
            directory,
            notifier,
            rng: Mutex::new(rng),
        }
    }

    async fn load_project(&self, project_id: Uuid) -> EngineResult<Project> {
        self.directory
            .project(project_id)
            .await?
            .ok_or_else(|| EngineError::NotFound("project not found".to_string()))
    }

    async fn load_assignment(&self, assignment_id: Uuid) -> EngineResult<Assignment> {
        self.store
            .find_by_id(assignment_id)
            .await?
            .ok_or_else(|| EngineError::NotFound("project assignment not found".to_string()))
    }

    async fn load_user(&self, user_id: Uuid) -> EngineResult<User> {
        self.directory
            .user(user_id)
            .await?
            .ok_or_else(|| EngineError::NotFound("user not found".to_string()))
    }

    async fn ensure_not_mentoring_elsewhere(
        &self,
        user_id: Uuid,
        current: Option<Uuid>,
    ) -> EngineResult<()> {
        match self.store.mentor_assignment(user_id).await? {
            Some(held) if Some(held) != current => Err(EngineError::AlreadyAssigned(
                "developer is already assigned as a mentor to another project".to_string(),
            )),
            _ => Ok(()),
        }
    }

    async fn check_can_join(
        &self,
        existing: Option<&Assignment>,
        role: RoleKind,
        user_id: Uuid,
    ) -> EngineResult<()> {
        if let Some(assignment) = existing {
            assignment.check_can_hold(role, user_id)?;
        }
        if role == RoleKind::Mentor {
            self.ensure_not_mentoring_elsewhere(user_id, existing.map(|a| a.id))
                .await?;
        }
        Ok(())
    }

    async fn add_to_roster(
        &self,
        actor: &Actor,
        project: &Project,
        role: RoleKind,
        user_id: Uuid,
    ) -> EngineResult<Assignment> {
        let existing = self.store.find_by_project(project.id).await?;
        self.check_can_join(existing.as_ref(), role, user_id).await?;

        let mut assignment = match existing {
            Some(assignment) => assignment,
            None => self.store.get_or_create(project.id, &project.company).await?,
        };
        assignment.add_member(role, user_id, actor.user_id, Utc::now())?;
        let saved = self.store.save(&assignment).await?;

        info!(
            assignment_id = %saved.id,
            project_id = %project.id,
            %user_id,
            role = role.label(),
            actor_id = %actor.user_id,
            "user added to project roster"
        );
        self.notifier.submit(NotificationEvent::MemberAdded {
            project_id: project.id,
            user_id,
            role,
            actor_id: actor.user_id,
        });
        Ok(saved)
    }

    pub async fn volunteer(
        &self,
        actor: &Actor,
        project_id: Uuid,
        role: RoleKind,
    ) -> EngineResult<Assignment> {
        require_verified(actor)?;
        if actor.user_type != role.required_user_type() {
            return Err(EngineError::Forbidden(format!(
                "only {}s can volunteer as {}",
                role.required_user_type(),
                role.label().to_ascii_lowercase()
            )));
        }
        if !actor.is_approved {
            return Err(EngineError::Forbidden(
                "your account must be approved before volunteering for projects".to_string(),
            ));
        }

        let project = self.load_project(project_id).await?;
        if !project.is_approved {
            return Err(EngineError::Forbidden(
                "cannot volunteer for a project that is not approved".to_string(),
            ));
        }
        if !actor.belongs_to(&project.company) {
            return Err(EngineError::Forbidden(
                "you can only volunteer for projects from your own company".to_string(),
            ));
        }

        let existing = self.store.find_by_project(project.id).await?;
        if let Some(assignment) = &existing {
            assignment.check_can_volunteer(role, actor.user_id)?;
        }
        let mut assignment = match existing {
            Some(assignment) => assignment,
            None => self.store.get_or_create(project.id, &project.company).await?,
        };
        assignment.add_volunteer(role, actor.user_id, Utc::now())?;
        let saved = self.store.save(&assignment).await?;

        info!(
            assignment_id = %saved.id,
            %project_id,
            user_id = %actor.user_id,
            role = role.label(),
            "volunteer request filed"
        );
        Ok(saved)
    }

    pub async fn volunteer_for_project(
        &self,
        actor: &Actor,
        project_id: Uuid,
    ) -> EngineResult<Assignment> {
        require_verified(actor)?;
        let role = RoleKind::for_project_volunteer(actor.user_type).ok_or_else(|| {
            EngineError::Forbidden(
                "only developers and interns can volunteer for projects".to_string(),
            )
        })?;
        self.volunteer(actor, project_id, role).await
    }

    pub async fn review(
        &self,
        actor: &Actor,
        assignment_id: Uuid,
        user_id: Uuid,
        role: RoleKind,
        decision: ReviewDecision,
    ) -> EngineResult<Assignment> {
        require_manager(actor)?;
        let mut assignment = self.load_assignment(assignment_id).await?;
        require_scope(
            actor,
            &assignment.company,
            "you can only review volunteers for projects from your own company",
        )?;
        if assignment.pending_request(role, user_id).is_none() {
            return Err(EngineError::NotFound(
                "pending volunteer request not found".to_string(),
            ));
        }

        if decision == ReviewDecision::Approved {
            self.check_can_join(Some(&assignment), role, user_id).await?;
        }
        let status =
            assignment.review_volunteer(role, user_id, decision, actor.user_id, Utc::now())?;
        let saved = self.store.save(&assignment).await?;

        info!(
            %assignment_id,
            %user_id,
            role = role.label(),
            status = status.as_str(),
            reviewer = %actor.user_id,
            "volunteer request reviewed"
        );
        if status == VolunteerStatus::Approved {
            self.notifier.submit(NotificationEvent::MemberAdded {
                project_id: saved.project_id,
                user_id,
                role,
                actor_id: actor.user_id,
            });
        }
        Ok(saved)
    }

    pub async fn assign_direct(
        &self,
        actor: &Actor,
        project_id: Uuid,
        user_id: Uuid,
        role: RoleKind,
    ) -> EngineResult<Assignment> {
        require_manager(actor)?;
        let project = self.load_project(project_id).await?;
        require_scope(
            actor,
            &project.company,
            "you can only assign users to projects from your own company",
        )?;
        if !project.is_approved {
            return Err(EngineError::Forbidden(
                "cannot assign users to a project that is not approved".to_string(),
            ));
        }

        let user = self.load_user(user_id).await?;
        if user.user_type != role.required_user_type() {
            return Err(EngineError::Validation(format!(
                "user is not a {}",
                role.required_user_type()
            )));
        }
        if !actor.is_admin() && user.company != actor.company {
            return Err(EngineError::Forbidden(
                "you can only assign users from your own company".to_string(),
            ));
        }

        self.add_to_roster(actor, &project, role, user.id).await
    }

    pub async fn assign_random_panelist(
        &self,
        actor: &Actor,
        project_id: Uuid,
    ) -> EngineResult<Assignment> {
        require_manager(actor)?;
        let project = self.load_project(project_id).await?;
        require_scope(
            actor,
            &project.company,
            "you can only assign panelists to projects from your own company",
        )?;
        if !project.is_approved {
            return Err(EngineError::Forbidden(
                "cannot assign panelists to a project that is not approved".to_string(),
            ));
        }

        let existing = self.store.find_by_project(project.id).await?;
        let taken: HashSet<Uuid> = existing
            .iter()
            .flat_map(|assignment| {
                assignment
                    .rosters
                    .assigned_developers
                    .iter()
                    .chain(assignment.rosters.panelists.iter())
                    .map(|member| member.user_id)
            })
            .collect();

        let mut candidates: Vec<User> = self
            .directory
            .users_in_company(&project.company, UserType::Developer)
            .await?
            .into_iter()
            .filter(|user| !taken.contains(&user.id))
            .collect();
        candidates.sort_by_key(|user| user.id);

        let chosen = {
            let mut rng = self
                .rng
                .lock()
                .map_err(|_| EngineError::Internal("random source poisoned".to_string()))?;
            candidates.choose(&mut *rng).map(|user| user.id)
        };
        let chosen = chosen.ok_or_else(|| {
            EngineError::NoCandidates(
                "no available developers to assign as a panelist".to_string(),
            )
        })?;

        self.add_to_roster(actor, &project, RoleKind::Panelist, chosen)
            .await
    }

    pub async fn remove_from_roster(
        &self,
        actor: &Actor,
        assignment_id: Uuid,
        user_id: Uuid,
        role: RoleKind,
    ) -> EngineResult<Assignment> {
        require_manager(actor)?;
        let mut assignment = self.load_assignment(assignment_id).await?;
        require_scope(
            actor,
            &assignment.company,
            "you can only manage assignments of your own company",
        )?;
        assignment.remove_member(role, user_id)?;
        let saved = self.store.save(&assignment).await?;

        info!(
            %assignment_id,
            %user_id,
            role = role.label(),
            actor_id = %actor.user_id,
            "user removed from project roster"
        );
        Ok(saved)
    }

    pub async fn initialize(&self, actor: &Actor, project_id: Uuid) -> EngineResult<Assignment> {
        require_manager(actor)?;
        let project = self.load_project(project_id).await?;
        require_scope(
            actor,
            &project.company,
            "you can only initialize assignments for projects from your own company",
        )?;
        if !project.is_approved {
            return Err(EngineError::Forbidden(
                "cannot initialize assignments for a project that is not approved".to_string(),
            ));
        }
        if self.store.find_by_project(project.id).await?.is_some() {
            return Err(EngineError::AlreadyExists(
                "project assignment already exists".to_string(),
            ));
        }

        let created = self
            .store
            .create(project.id, &project.company)
            .await
            .map_err(|err| match err {
                StoreError::AlreadyExists => {
                    EngineError::AlreadyExists("project assignment already exists".to_string())
                }
                other => EngineError::from(other),
            })?;
        info!(assignment_id = %created.id, %project_id, "project assignment initialized");
        Ok(created)
    }

    pub async fn create_project(&self, actor: &Actor, draft: ProjectDraft) -> EngineResult<Project> {
        require_verified(actor)?;
        if !matches!(
            actor.user_type,
            UserType::Developer | UserType::Hr | UserType::Admin
        ) {
            return Err(EngineError::Forbidden(
                "only developers, HR and admins can create projects".to_string(),
            ));
        }
        if !actor.is_approved && !actor.is_admin() {
            return Err(EngineError::Forbidden(
                "your account must be approved before creating projects".to_string(),
            ));
        }
        if draft.name.trim().is_empty() {
            return Err(EngineError::Validation("project name is required".to_string()));
        }
        if draft.skill_requirement.iter().all(|skill| skill.trim().is_empty()) {
            return Err(EngineError::Validation(
                "at least one required skill must be listed".to_string(),
            ));
        }

        let company = match (actor.is_admin(), draft.company, actor.company.clone()) {
            (true, Some(company), _) => company,
            (true, None, _) => {
                return Err(EngineError::Validation("company is required".to_string()))
            }
            (false, Some(company), Some(own)) if company != own => {
                return Err(EngineError::Forbidden(
                    "you can only create projects for your own company".to_string(),
                ))
            }
            (false, _, Some(own)) => own,
            (false, _, None) => {
                return Err(EngineError::Forbidden(
                    "company information is required".to_string(),
                ))
            }
        };

        let project = self
            .directory
            .create_project(NewProject {
                name: draft.name.trim().to_string(),
                company,
                description: draft.description,
                skill_requirement: draft
                    .skill_requirement
                    .into_iter()
                    .map(|skill| skill.trim().to_string())
                    .filter(|skill| !skill.is_empty())
                    .collect(),
                estimated_time_to_complete: draft.estimated_time_to_complete,
                suggested_by: Some(actor.email.clone()),
                is_approved: actor.is_manager(),
            })
            .await?;
        info!(
            project_id = %project.id,
            company = %project.company,
            approved = project.is_approved,
            "project created"
        );
        Ok(project)
    }

    // Seeding the suggesting developer never fails an approval that was written.
    pub async fn approve_project(
        &self,
        actor: &Actor,
        project_id: Uuid,
    ) -> EngineResult<ProjectApproval> {
        require_manager(actor)?;
        let project = self.load_project(project_id).await?;
        require_scope(
            actor,
            &project.company,
            "you can only approve projects from your own company",
        )?;

        let mut assignment = self
            .store
            .get_or_create(project.id, &project.company)
            .await?;
        let project = self
            .directory
            .approve_project(project.id, actor.user_id, Utc::now())
            .await?;
        info!(%project_id, approver = %actor.user_id, "project approved");

        let suggester = match &project.suggested_by {
            Some(email) => match self.directory.user_by_email(email).await {
                Ok(user) => user,
                Err(err) => {
                    warn!(%project_id, error = %err, "suggesting user lookup failed");
                    None
                }
            },
            None => None,
        };
        let mut seeded_mentor = None;
        if let Some(user) = suggester.filter(|user| user.user_type == UserType::Developer) {
            if !assignment.holds(RoleKind::Mentor, user.id) {
                match self
                    .add_to_roster(actor, &project, RoleKind::Mentor, user.id)
                    .await
                {
                    Ok(saved) => {
                        assignment = saved;
                        seeded_mentor = Some(user.id);
                    }
                    Err(err) => {
                        warn!(
                            %project_id,
                            user_id = %user.id,
                            reason = %err,
                            "suggesting developer not seeded as mentor"
                        );
                    }
                }
            }
        }

        Ok(ProjectApproval {
            project,
            assignment,
            seeded_mentor,
        })
    }

    async fn present(&self, assignments: Vec<Assignment>) -> EngineResult<Vec<AssignmentView>> {
        let mut ids: Vec<Uuid> = assignments.iter().flat_map(referenced_users).collect();
        ids.sort_unstable();
        ids.dedup();
        let users: HashMap<Uuid, UserSummary> = self
            .directory
            .users(&ids)
            .await?
            .iter()
            .map(|user| (user.id, UserSummary::from(user)))
            .collect();

        let mut project_names: HashMap<Uuid, String> = HashMap::new();
        for assignment in &assignments {
            if project_names.contains_key(&assignment.project_id) {
                continue;
            }
            if let Some(project) = self.directory.project(assignment.project_id).await? {
                project_names.insert(project.id, project.name);
            }
        }

        let lookup = ViewLookup {
            users,
            project_names,
        };
        Ok(assignments
            .into_iter()
            .map(|assignment| lookup.render(assignment))
            .collect())
    }

    async fn present_one(&self, assignment: Assignment) -> EngineResult<AssignmentView> {
        self.present(vec![assignment])
            .await?
            .pop()
            .ok_or_else(|| EngineError::Internal("assignment view missing".to_string()))
    }

    pub async fn list(&self, actor: &Actor) -> EngineResult<Vec<AssignmentView>> {
        require_verified(actor)?;
        let filter = if actor.is_admin() {
            AssignmentFilter::default()
        } else {
            let company = actor.company.clone().ok_or_else(|| {
                EngineError::Forbidden("company information is required".to_string())
            })?;
            AssignmentFilter::company(company)
        };
        let assignments = self.store.find(&filter).await?;
        self.present(assignments).await
    }

    pub async fn by_id(&self, actor: &Actor, assignment_id: Uuid) -> EngineResult<AssignmentView> {
        require_verified(actor)?;
        let assignment = self.load_assignment(assignment_id).await?;
        require_view(actor, &assignment.company)?;
        self.present_one(assignment).await
    }

    pub async fn by_project(&self, actor: &Actor, project_id: Uuid) -> EngineResult<AssignmentView> {
        require_verified(actor)?;
        let assignment = self
            .store
            .find_by_project(project_id)
            .await?
            .ok_or_else(|| {
                EngineError::NotFound("no assignment found for this project".to_string())
            })?;
        require_view(actor, &assignment.company)?;
        self.present_one(assignment).await
    }

    fn member_filter(actor: &Actor, user_id: Uuid, roles: &[RoleKind]) -> EngineResult<AssignmentFilter> {
        if actor.user_id != user_id && !actor.is_manager() {
            return Err(EngineError::Forbidden(
                "you can only view your own assignments".to_string(),
            ));
        }
        let filter = if actor.is_admin() || actor.user_id == user_id {
            AssignmentFilter::default()
        } else {
            let company = actor.company.clone().ok_or_else(|| {
                EngineError::Forbidden("company information is required".to_string())
            })?;
            AssignmentFilter::company(company)
        };
        Ok(filter.with_member(user_id, roles))
    }

    pub async fn for_intern(
        &self,
        actor: &Actor,
        intern_id: Uuid,
    ) -> EngineResult<Vec<AssignmentView>> {
        require_verified(actor)?;
        let filter = Self::member_filter(actor, intern_id, &[RoleKind::Intern])?;
        let assignments = self.store.find(&filter).await?;
        self.present(assignments).await
    }

    pub async fn for_developer(
        &self,
        actor: &Actor,
        developer_id: Uuid,
    ) -> EngineResult<Vec<DeveloperAssignment>> {
        require_verified(actor)?;
        let filter = Self::member_filter(
            actor,
            developer_id,
            &[RoleKind::Mentor, RoleKind::Panelist],
        )?;
        let assignments = self.store.find(&filter).await?;
        let roles: Vec<Vec<RoleKind>> = assignments
            .iter()
            .map(|assignment| assignment.roles_of(developer_id))
            .collect();
        Ok(self
            .present(assignments)
            .await?
            .into_iter()
            .zip(roles)
            .map(|(assignment, roles)| DeveloperAssignment { assignment, roles })
            .collect())
    }

    pub async fn pending_volunteers(&self, actor: &Actor) -> EngineResult<Vec<AssignmentView>> {
        require_manager(actor)?;
        let filter = match (&actor.company, actor.is_admin()) {
            (_, true) => AssignmentFilter::default(),
            (Some(company), false) => AssignmentFilter::company(company.clone()),
            (None, false) => {
                return Err(EngineError::Forbidden(
                    "company information is required".to_string(),
                ))
            }
        };
        let pending: Vec<Assignment> = self
            .store
            .find(&filter)
            .await?
            .into_iter()
            .filter(Assignment::has_pending_requests)
            .map(|assignment| assignment.pending_view())
            .collect();
        self.present(pending).await
    }

    pub async fn unassigned(
        &self,
        actor: &Actor,
        project_id: Uuid,
        role: RoleKind,
    ) -> EngineResult<Vec<User>> {
        require_manager(actor)?;
        let project = self.load_project(project_id).await?;
        require_scope(
            actor,
            &project.company,
            "you can only view users of your own company",
        )?;
        let assignment = self.store.find_by_project(project.id).await?;
        Ok(self
            .directory
            .users_in_company(&project.company, role.required_user_type())
            .await?
            .into_iter()
            .filter(|user| {
                assignment
                    .as_ref()
                    .map_or(true, |assignment| !assignment.holds(role, user.id))
            })
            .collect())
    }

    pub async fn notify_members(
        &self,
        actor: &Actor,
        project_id: Uuid,
        subject: Option<String>,
        message: String,
    ) -> EngineResult<bool> {
        require_manager(actor)?;
        if message.trim().is_empty() {
            return Err(EngineError::Validation("message is required".to_string()));
        }
        let project = self.load_project(project_id).await?;
        require_scope(
            actor,
            &project.company,
            "you can only notify members of projects from your own company",
        )?;
        if self.store.find_by_project(project.id).await?.is_none() {
            return Err(EngineError::NotFound(
                "project assignment not found".to_string(),
            ));
        }
        Ok(self.notifier.submit(NotificationEvent::ProjectBroadcast {
            project_id: project.id,
            subject,
            body: message,
            actor_id: actor.user_id,
        }))
    }

    pub async fn notify_all(
        &self,
        actor: &Actor,
        subject: Option<String>,
        message: String,
    ) -> EngineResult<bool> {
        require_verified(actor)?;
        if !actor.is_admin() {
            return Err(EngineError::Forbidden(
                "only admins can message every project".to_string(),
            ));
        }
        if message.trim().is_empty() {
            return Err(EngineError::Validation("message is required".to_string()));
        }
        Ok(self.notifier.submit(NotificationEvent::GlobalBroadcast {
            subject,
            body: message,
        }))
    }
}
