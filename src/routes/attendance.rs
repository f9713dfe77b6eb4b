use axum::extract::State;
use chrono::Utc;

use crate::{
    attendance::{backfill_absences, BackfillReport},
    auth::Actor,
    engine::require_manager,
    error::AppResult,
    routes::envelope::{ok_with, Reply},
    state::AppState,
};

pub async fn backfill(
    State(state): State<AppState>,
    actor: Actor,
) -> AppResult<Reply<BackfillReport>> {
    require_manager(&actor)?;
    let report = backfill_absences(state.ledger.as_ref(), Utc::now().date_naive()).await?;
    Ok(ok_with("attendance backfill completed", report))
}
