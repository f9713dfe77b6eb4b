use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    auth::Actor,
    directory::Project,
    engine::{ProjectApproval, ProjectDraft},
    error::AppResult,
    routes::envelope::{created, ok_with, Reply},
    state::AppState,
};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProjectRequest {
    pub name: String,
    pub company: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub skill_requirement: Vec<String>,
    #[serde(default)]
    pub estimated_time_to_complete: String,
}

pub async fn create_project(
    State(state): State<AppState>,
    actor: Actor,
    payload: Result<Json<CreateProjectRequest>, JsonRejection>,
) -> AppResult<Reply<Project>> {
    let Json(payload) = payload?;
    let project = state
        .engine
        .create_project(
            &actor,
            ProjectDraft {
                name: payload.name,
                company: payload.company,
                description: payload.description,
                skill_requirement: payload.skill_requirement,
                estimated_time_to_complete: payload.estimated_time_to_complete,
            },
        )
        .await?;
    let message = if project.is_approved {
        "project created"
    } else {
        "project suggestion submitted for approval"
    };
    Ok(created(message, project))
}

pub async fn approve_project(
    State(state): State<AppState>,
    actor: Actor,
    Path(project_id): Path<Uuid>,
) -> AppResult<Reply<ProjectApproval>> {
    let approval = state.engine.approve_project(&actor, project_id).await?;
    Ok(ok_with("project approved", approval))
}
