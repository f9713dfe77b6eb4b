use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::directory::UserType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoleKind {
    Mentor,
    Intern,
    Panelist,
}

impl RoleKind {
    pub const ALL: [RoleKind; 3] = [RoleKind::Mentor, RoleKind::Intern, RoleKind::Panelist];

    pub fn label(self) -> &'static str {
        match self {
            RoleKind::Mentor => "Mentor",
            RoleKind::Intern => "Intern",
            RoleKind::Panelist => "Panelist",
        }
    }

    pub fn required_user_type(self) -> UserType {
        match self {
            RoleKind::Mentor | RoleKind::Panelist => UserType::Developer,
            RoleKind::Intern => UserType::Intern,
        }
    }

    pub fn excluded_by(self) -> Option<RoleKind> {
        match self {
            RoleKind::Mentor => Some(RoleKind::Panelist),
            RoleKind::Panelist => Some(RoleKind::Mentor),
            RoleKind::Intern => None,
        }
    }

    pub fn for_project_volunteer(user_type: UserType) -> Option<RoleKind> {
        match user_type {
            UserType::Developer => Some(RoleKind::Mentor),
            UserType::Intern => Some(RoleKind::Intern),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VolunteerStatus {
    Pending,
    Approved,
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewDecision {
    Approved,
    Rejected,
}

impl VolunteerStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, VolunteerStatus::Pending)
    }

    pub fn apply(self, decision: ReviewDecision) -> Result<VolunteerStatus, RosterError> {
        match (self, decision) {
            (VolunteerStatus::Pending, ReviewDecision::Approved) => Ok(VolunteerStatus::Approved),
            (VolunteerStatus::Pending, ReviewDecision::Rejected) => Ok(VolunteerStatus::Rejected),
            (VolunteerStatus::Approved | VolunteerStatus::Rejected, _) => {
                Err(RosterError::AlreadyReviewed { status: self })
            }
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            VolunteerStatus::Pending => "pending",
            VolunteerStatus::Approved => "approved",
            VolunteerStatus::Rejected => "rejected",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterMember {
    pub user_id: Uuid,
    pub assigned_by: Uuid,
    pub assigned_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolunteerRequest {
    pub user_id: Uuid,
    pub requested_at: DateTime<Utc>,
    pub status: VolunteerStatus,
    #[serde(default)]
    pub reviewed_by: Option<Uuid>,
    #[serde(default)]
    pub reviewed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Rosters {
    pub assigned_developers: Vec<RosterMember>,
    pub assigned_interns: Vec<RosterMember>,
    pub panelists: Vec<RosterMember>,
    pub volunteer_developers: Vec<VolunteerRequest>,
    pub volunteer_interns: Vec<VolunteerRequest>,
    pub volunteer_panelists: Vec<VolunteerRequest>,
}

impl Rosters {
    pub fn members(&self, role: RoleKind) -> &[RosterMember] {
        match role {
            RoleKind::Mentor => &self.assigned_developers,
            RoleKind::Intern => &self.assigned_interns,
            RoleKind::Panelist => &self.panelists,
        }
    }

    fn members_mut(&mut self, role: RoleKind) -> &mut Vec<RosterMember> {
        match role {
            RoleKind::Mentor => &mut self.assigned_developers,
            RoleKind::Intern => &mut self.assigned_interns,
            RoleKind::Panelist => &mut self.panelists,
        }
    }

    pub fn volunteers(&self, role: RoleKind) -> &[VolunteerRequest] {
        match role {
            RoleKind::Mentor => &self.volunteer_developers,
            RoleKind::Intern => &self.volunteer_interns,
            RoleKind::Panelist => &self.volunteer_panelists,
        }
    }

    fn volunteers_mut(&mut self, role: RoleKind) -> &mut Vec<VolunteerRequest> {
        match role {
            RoleKind::Mentor => &mut self.volunteer_developers,
            RoleKind::Intern => &mut self.volunteer_interns,
            RoleKind::Panelist => &mut self.volunteer_panelists,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RosterError {
    #[error("user is already assigned to this project as {}", .role.label())]
    AlreadyAssigned { role: RoleKind },
    #[error("user is a {} on this project and cannot also be a {}", .held.label(), .requested.label())]
    RoleExclusion { held: RoleKind, requested: RoleKind },
    #[error("user has already volunteered for this role on this project (status: {})", .status.as_str())]
    DuplicateRequest { status: VolunteerStatus },
    #[error("no pending volunteer request for this user and role")]
    RequestNotFound,
    #[error("user is not assigned to this project as {}", .role.label())]
    MemberNotFound { role: RoleKind },
    #[error("volunteer request was already {}", .status.as_str())]
    AlreadyReviewed { status: VolunteerStatus },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
    pub id: Uuid,
    pub project_id: Uuid,
    pub company: String,
    #[serde(flatten)]
    pub rosters: Rosters,
    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Assignment {
    pub fn new(project_id: Uuid, company: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            project_id,
            company: company.into(),
            rosters: Rosters::default(),
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn holds(&self, role: RoleKind, user_id: Uuid) -> bool {
        self.rosters
            .members(role)
            .iter()
            .any(|member| member.user_id == user_id)
    }

    pub fn roles_of(&self, user_id: Uuid) -> Vec<RoleKind> {
        RoleKind::ALL
            .into_iter()
            .filter(|role| self.holds(*role, user_id))
            .collect()
    }

    pub fn mentor_ids(&self) -> Vec<Uuid> {
        self.rosters
            .assigned_developers
            .iter()
            .map(|member| member.user_id)
            .collect()
    }

    pub fn members(&self) -> impl Iterator<Item = (RoleKind, &RosterMember)> + '_ {
        RoleKind::ALL.into_iter().flat_map(move |role| {
            self.rosters
                .members(role)
                .iter()
                .map(move |member| (role, member))
        })
    }

    fn check_exclusion(&self, role: RoleKind, user_id: Uuid) -> Result<(), RosterError> {
        match role.excluded_by() {
            Some(held) if self.holds(held, user_id) => Err(RosterError::RoleExclusion {
                held,
                requested: role,
            }),
            _ => Ok(()),
        }
    }

    pub fn check_can_hold(&self, role: RoleKind, user_id: Uuid) -> Result<(), RosterError> {
        if self.holds(role, user_id) {
            return Err(RosterError::AlreadyAssigned { role });
        }
        self.check_exclusion(role, user_id)
    }

    pub fn check_can_volunteer(&self, role: RoleKind, user_id: Uuid) -> Result<(), RosterError> {
        self.check_exclusion(role, user_id)?;
        if let Some(existing) = self
            .rosters
            .volunteers(role)
            .iter()
            .find(|request| request.user_id == user_id)
        {
            return Err(RosterError::DuplicateRequest {
                status: existing.status,
            });
        }
        Ok(())
    }

    pub fn add_member(
        &mut self,
        role: RoleKind,
        user_id: Uuid,
        assigned_by: Uuid,
        at: DateTime<Utc>,
    ) -> Result<(), RosterError> {
        self.check_can_hold(role, user_id)?;
        self.rosters.members_mut(role).push(RosterMember {
            user_id,
            assigned_by,
            assigned_at: at,
        });
        Ok(())
    }

    pub fn remove_member(
        &mut self,
        role: RoleKind,
        user_id: Uuid,
    ) -> Result<RosterMember, RosterError> {
        let members = self.rosters.members_mut(role);
        let index = members
            .iter()
            .position(|member| member.user_id == user_id)
            .ok_or(RosterError::MemberNotFound { role })?;
        Ok(members.remove(index))
    }

    pub fn add_volunteer(
        &mut self,
        role: RoleKind,
        user_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<(), RosterError> {
        self.check_can_volunteer(role, user_id)?;
        self.rosters.volunteers_mut(role).push(VolunteerRequest {
            user_id,
            requested_at: at,
            status: VolunteerStatus::Pending,
            reviewed_by: None,
            reviewed_at: None,
        });
        Ok(())
    }

    pub fn pending_request(&self, role: RoleKind, user_id: Uuid) -> Option<&VolunteerRequest> {
        self.rosters
            .volunteers(role)
            .iter()
            .find(|request| request.user_id == user_id && request.status == VolunteerStatus::Pending)
    }

    /// Approval appends the user to the matching assigned roster. A failed
    /// review leaves the document untouched.
    pub fn review_volunteer(
        &mut self,
        role: RoleKind,
        user_id: Uuid,
        decision: ReviewDecision,
        reviewer: Uuid,
        at: DateTime<Utc>,
    ) -> Result<VolunteerStatus, RosterError> {
        let index = self
            .rosters
            .volunteers(role)
            .iter()
            .position(|request| {
                request.user_id == user_id && request.status == VolunteerStatus::Pending
            })
            .ok_or(RosterError::RequestNotFound)?;

        let next = self.rosters.volunteers(role)[index].status.apply(decision)?;
        if next == VolunteerStatus::Approved {
            self.check_can_hold(role, user_id)?;
        }

        let request = &mut self.rosters.volunteers_mut(role)[index];
        request.status = next;
        request.reviewed_by = Some(reviewer);
        request.reviewed_at = Some(at);

        if next == VolunteerStatus::Approved {
            self.rosters.members_mut(role).push(RosterMember {
                user_id,
                assigned_by: reviewer,
                assigned_at: at,
            });
        }

        Ok(next)
    }

    pub fn has_pending_requests(&self) -> bool {
        RoleKind::ALL.into_iter().any(|role| {
            self.rosters
                .volunteers(role)
                .iter()
                .any(|request| request.status == VolunteerStatus::Pending)
        })
    }

    pub fn pending_view(&self) -> Assignment {
        let mut view = self.clone();
        for role in RoleKind::ALL {
            view.rosters
                .volunteers_mut(role)
                .retain(|request| request.status == VolunteerStatus::Pending);
        }
        view
    }
}
