use axum::http::HeaderValue;
use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::{auth::Actor, state::AppState};

pub mod assignments;
pub mod attendance;
pub mod auth;
pub mod envelope;
pub mod health;
pub mod projects;

fn cors_layer(state: &AppState) -> CorsLayer {
    let allow_origin = match state.config.cors_allowed_origin.as_ref() {
        Some(origins) => {
            let headers: Vec<HeaderValue> = origins
                .split(',')
                .map(str::trim)
                .filter(|origin| !origin.is_empty())
                .filter_map(|origin| match origin.parse::<HeaderValue>() {
                    Ok(value) => Some(value),
                    Err(_) => {
                        warn!(%origin, "ignoring invalid CORS origin");
                        None
                    }
                })
                .collect();
            AllowOrigin::list(headers)
        }
        None => AllowOrigin::mirror_request(),
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(tower_http::cors::AllowMethods::mirror_request())
        .allow_headers(tower_http::cors::AllowHeaders::mirror_request())
        .allow_credentials(true)
}

pub fn create_router(state: AppState) -> Router<()> {
    let cors = cors_layer(&state);

    let auth_routes = Router::new()
        .route("/login", post(auth::login))
        .route("/me", get(auth::me));

    let assignment_routes = Router::new()
        .route("/all", get(assignments::list_assignments))
        .route("/pending-volunteers", get(assignments::pending_volunteers))
        .route("/project/:project_id", get(assignments::get_project_assignment))
        .route("/intern/:intern_id", get(assignments::intern_assignments))
        .route("/developer/:developer_id", get(assignments::developer_assignments))
        .route(
            "/unassigned-interns/:project_id",
            get(assignments::unassigned_interns),
        )
        .route(
            "/unassigned-developers/:project_id",
            get(assignments::unassigned_developers),
        )
        .route("/volunteer", post(assignments::volunteer))
        .route("/review-volunteer", put(assignments::review_volunteer))
        .route("/assign-user", post(assignments::assign_user))
        .route("/remove-user", delete(assignments::remove_user))
        .route("/initialize", post(assignments::initialize))
        .route("/notify-members", post(assignments::notify_members))
        .route(
            "/notify-all-projects-members",
            post(assignments::notify_all_projects_members),
        )
        .route("/panelist/volunteer", post(assignments::volunteer_panelist))
        .route(
            "/panelist/review-volunteer",
            put(assignments::review_panelist_volunteer),
        )
        .route("/panelist/assign", post(assignments::assign_panelist))
        .route(
            "/panelist/assign-random",
            post(assignments::assign_random_panelist),
        )
        .route("/panelist/remove", post(assignments::remove_panelist))
        .route("/:assignment_id", get(assignments::get_assignment));

    let project_routes = Router::new()
        .route("/", post(projects::create_project))
        .route("/:project_id/approve", post(projects::approve_project));

    let attendance_routes = Router::new().route("/backfill", post(attendance::backfill));

    let protected_state = state.clone();
    let protected_routes = Router::new()
        .nest("/api/project-assignments", assignment_routes)
        .nest("/api/projects", project_routes)
        .nest("/api/attendance", attendance_routes)
        .layer(middleware::from_extractor_with_state::<Actor, _>(protected_state));

    Router::new()
        .merge(protected_routes)
        .nest("/api/auth", auth_routes)
        .route("/api/health", get(health::health_check))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(DefaultBodyLimit::max(1024 * 1024))
}
