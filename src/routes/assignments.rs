use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    auth::Actor,
    directory::User,
    engine::{parse_decision, parse_roster_role, DeveloperAssignment},
    error::AppResult,
    roster::{Assignment, RoleKind},
    routes::envelope::{accepted, created, ok, ok_with, Reply},
    state::AppState,
    views::AssignmentView,
};

type Body<T> = Result<Json<T>, JsonRejection>;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectRequest {
    pub project_id: Uuid,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewRequest {
    pub assignment_id: Uuid,
    pub user_id: Uuid,
    pub user_type: String,
    pub status: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PanelistReviewRequest {
    pub assignment_id: Uuid,
    pub user_id: Uuid,
    pub status: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignUserRequest {
    pub project_id: Uuid,
    pub user_id: Uuid,
    pub user_type: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignPanelistRequest {
    pub project_id: Uuid,
    pub user_id: Uuid,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveUserRequest {
    pub assignment_id: Uuid,
    pub user_id: Uuid,
    pub user_type: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemovePanelistRequest {
    pub assignment_id: Uuid,
    pub user_id: Uuid,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotifyMembersRequest {
    pub project_id: Uuid,
    pub subject: Option<String>,
    pub message: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotifyAllRequest {
    pub subject: Option<String>,
    pub message: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Queued {
    pub queued: bool,
}

pub async fn volunteer(
    State(state): State<AppState>,
    actor: Actor,
    payload: Body<ProjectRequest>,
) -> AppResult<Reply<Assignment>> {
    let Json(payload) = payload?;
    let assignment = state
        .engine
        .volunteer_for_project(&actor, payload.project_id)
        .await?;
    Ok(created("volunteer request submitted", assignment))
}

pub async fn volunteer_panelist(
    State(state): State<AppState>,
    actor: Actor,
    payload: Body<ProjectRequest>,
) -> AppResult<Reply<Assignment>> {
    let Json(payload) = payload?;
    let assignment = state
        .engine
        .volunteer(&actor, payload.project_id, RoleKind::Panelist)
        .await?;
    Ok(created("panelist volunteer request submitted", assignment))
}

pub async fn review_volunteer(
    State(state): State<AppState>,
    actor: Actor,
    payload: Body<ReviewRequest>,
) -> AppResult<Reply<Assignment>> {
    let Json(payload) = payload?;
    let role = parse_roster_role(&payload.user_type)?;
    let decision = parse_decision(&payload.status)?;
    let assignment = state
        .engine
        .review(&actor, payload.assignment_id, payload.user_id, role, decision)
        .await?;
    Ok(ok_with("volunteer request reviewed", assignment))
}

pub async fn review_panelist_volunteer(
    State(state): State<AppState>,
    actor: Actor,
    payload: Body<PanelistReviewRequest>,
) -> AppResult<Reply<Assignment>> {
    let Json(payload) = payload?;
    let decision = parse_decision(&payload.status)?;
    let assignment = state
        .engine
        .review(
            &actor,
            payload.assignment_id,
            payload.user_id,
            RoleKind::Panelist,
            decision,
        )
        .await?;
    Ok(ok_with("panelist volunteer request reviewed", assignment))
}

pub async fn assign_user(
    State(state): State<AppState>,
    actor: Actor,
    payload: Body<AssignUserRequest>,
) -> AppResult<Reply<Assignment>> {
    let Json(payload) = payload?;
    let role = parse_roster_role(&payload.user_type)?;
    let assignment = state
        .engine
        .assign_direct(&actor, payload.project_id, payload.user_id, role)
        .await?;
    Ok(created("user assigned to project", assignment))
}

pub async fn assign_panelist(
    State(state): State<AppState>,
    actor: Actor,
    payload: Body<AssignPanelistRequest>,
) -> AppResult<Reply<Assignment>> {
    let Json(payload) = payload?;
    let assignment = state
        .engine
        .assign_direct(&actor, payload.project_id, payload.user_id, RoleKind::Panelist)
        .await?;
    Ok(created("panelist assigned to project", assignment))
}

pub async fn assign_random_panelist(
    State(state): State<AppState>,
    actor: Actor,
    payload: Body<ProjectRequest>,
) -> AppResult<Reply<Assignment>> {
    let Json(payload) = payload?;
    let assignment = state
        .engine
        .assign_random_panelist(&actor, payload.project_id)
        .await?;
    Ok(created("random panelist assigned to project", assignment))
}

pub async fn remove_user(
    State(state): State<AppState>,
    actor: Actor,
    payload: Body<RemoveUserRequest>,
) -> AppResult<Reply<Assignment>> {
    let Json(payload) = payload?;
    let role = parse_roster_role(&payload.user_type)?;
    let assignment = state
        .engine
        .remove_from_roster(&actor, payload.assignment_id, payload.user_id, role)
        .await?;
    Ok(ok_with("user removed from project", assignment))
}

pub async fn remove_panelist(
    State(state): State<AppState>,
    actor: Actor,
    payload: Body<RemovePanelistRequest>,
) -> AppResult<Reply<Assignment>> {
    let Json(payload) = payload?;
    let assignment = state
        .engine
        .remove_from_roster(
            &actor,
            payload.assignment_id,
            payload.user_id,
            RoleKind::Panelist,
        )
        .await?;
    Ok(ok_with("panelist removed from project", assignment))
}

pub async fn initialize(
    State(state): State<AppState>,
    actor: Actor,
    payload: Body<ProjectRequest>,
) -> AppResult<Reply<Assignment>> {
    let Json(payload) = payload?;
    let assignment = state.engine.initialize(&actor, payload.project_id).await?;
    Ok(created("project assignment initialized", assignment))
}

pub async fn list_assignments(
    State(state): State<AppState>,
    actor: Actor,
) -> AppResult<Reply<Vec<AssignmentView>>> {
    Ok(ok(state.engine.list(&actor).await?))
}

pub async fn get_assignment(
    State(state): State<AppState>,
    actor: Actor,
    Path(assignment_id): Path<Uuid>,
) -> AppResult<Reply<AssignmentView>> {
    Ok(ok(state.engine.by_id(&actor, assignment_id).await?))
}

pub async fn get_project_assignment(
    State(state): State<AppState>,
    actor: Actor,
    Path(project_id): Path<Uuid>,
) -> AppResult<Reply<AssignmentView>> {
    Ok(ok(state.engine.by_project(&actor, project_id).await?))
}

pub async fn intern_assignments(
    State(state): State<AppState>,
    actor: Actor,
    Path(intern_id): Path<Uuid>,
) -> AppResult<Reply<Vec<AssignmentView>>> {
    Ok(ok(state.engine.for_intern(&actor, intern_id).await?))
}

pub async fn developer_assignments(
    State(state): State<AppState>,
    actor: Actor,
    Path(developer_id): Path<Uuid>,
) -> AppResult<Reply<Vec<DeveloperAssignment>>> {
    Ok(ok(state.engine.for_developer(&actor, developer_id).await?))
}

pub async fn pending_volunteers(
    State(state): State<AppState>,
    actor: Actor,
) -> AppResult<Reply<Vec<AssignmentView>>> {
    Ok(ok(state.engine.pending_volunteers(&actor).await?))
}

pub async fn unassigned_interns(
    State(state): State<AppState>,
    actor: Actor,
    Path(project_id): Path<Uuid>,
) -> AppResult<Reply<Vec<User>>> {
    Ok(ok(state
        .engine
        .unassigned(&actor, project_id, RoleKind::Intern)
        .await?))
}

pub async fn unassigned_developers(
    State(state): State<AppState>,
    actor: Actor,
    Path(project_id): Path<Uuid>,
) -> AppResult<Reply<Vec<User>>> {
    Ok(ok(state
        .engine
        .unassigned(&actor, project_id, RoleKind::Mentor)
        .await?))
}

pub async fn notify_members(
    State(state): State<AppState>,
    actor: Actor,
    payload: Body<NotifyMembersRequest>,
) -> AppResult<Reply<Queued>> {
    let Json(payload) = payload?;
    let queued = state
        .engine
        .notify_members(&actor, payload.project_id, payload.subject, payload.message)
        .await?;
    Ok(accepted("notification queued", Queued { queued }))
}

pub async fn notify_all_projects_members(
    State(state): State<AppState>,
    actor: Actor,
    payload: Body<NotifyAllRequest>,
) -> AppResult<Reply<Queued>> {
    let Json(payload) = payload?;
    let queued = state
        .engine
        .notify_all(&actor, payload.subject, payload.message)
        .await?;
    Ok(accepted("notification queued", Queued { queued }))
}
