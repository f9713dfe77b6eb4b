use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::directory::{User, UserType};
use crate::roster::{Assignment, RoleKind, RosterMember, VolunteerRequest};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(rename = "type")]
    pub user_type: UserType,
    pub company: Option<String>,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            user_type: user.user_type,
            company: user.company.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberView {
    #[serde(flatten)]
    pub member: RosterMember,
    pub user: Option<UserSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolunteerView {
    #[serde(flatten)]
    pub request: VolunteerRequest,
    pub user: Option<UserSummary>,
}

/// Read model of an assignment. `user` is null for accounts that no longer
/// resolve.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentView {
    pub id: Uuid,
    pub project_id: Uuid,
    pub project_name: Option<String>,
    pub company: String,
    pub assigned_developers: Vec<MemberView>,
    pub assigned_interns: Vec<MemberView>,
    pub panelists: Vec<MemberView>,
    pub volunteer_developers: Vec<VolunteerView>,
    pub volunteer_interns: Vec<VolunteerView>,
    pub volunteer_panelists: Vec<VolunteerView>,
    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AssignmentView {
    pub fn members(&self, role: RoleKind) -> &[MemberView] {
        match role {
            RoleKind::Mentor => &self.assigned_developers,
            RoleKind::Intern => &self.assigned_interns,
            RoleKind::Panelist => &self.panelists,
        }
    }

    pub fn volunteers(&self, role: RoleKind) -> &[VolunteerView] {
        match role {
            RoleKind::Mentor => &self.volunteer_developers,
            RoleKind::Intern => &self.volunteer_interns,
            RoleKind::Panelist => &self.volunteer_panelists,
        }
    }
}

pub fn referenced_users(assignment: &Assignment) -> impl Iterator<Item = Uuid> + '_ {
    RoleKind::ALL.into_iter().flat_map(move |role| {
        let rosters = &assignment.rosters;
        rosters
            .members(role)
            .iter()
            .map(|member| member.user_id)
            .chain(rosters.volunteers(role).iter().map(|request| request.user_id))
    })
}

pub struct ViewLookup {
    pub users: HashMap<Uuid, UserSummary>,
    pub project_names: HashMap<Uuid, String>,
}

impl ViewLookup {
    pub fn render(&self, assignment: Assignment) -> AssignmentView {
        let members = |list: Vec<RosterMember>| -> Vec<MemberView> {
            list.into_iter()
                .map(|member| MemberView {
                    user: self.users.get(&member.user_id).cloned(),
                    member,
                })
                .collect()
        };
        let volunteers = |list: Vec<VolunteerRequest>| -> Vec<VolunteerView> {
            list.into_iter()
                .map(|request| VolunteerView {
                    user: self.users.get(&request.user_id).cloned(),
                    request,
                })
                .collect()
        };

        let rosters = assignment.rosters;
        AssignmentView {
            id: assignment.id,
            project_id: assignment.project_id,
            project_name: self.project_names.get(&assignment.project_id).cloned(),
            company: assignment.company,
            assigned_developers: members(rosters.assigned_developers),
            assigned_interns: members(rosters.assigned_interns),
            panelists: members(rosters.panelists),
            volunteer_developers: volunteers(rosters.volunteer_developers),
            volunteer_interns: volunteers(rosters.volunteer_interns),
            volunteer_panelists: volunteers(rosters.volunteer_panelists),
            version: assignment.version,
            created_at: assignment.created_at,
            updated_at: assignment.updated_at,
        }
    }
}
