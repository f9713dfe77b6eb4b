use std::sync::Arc;

use crate::{
    auth::jwt::JwtService,
    config::AppConfig,
    engine::Engine,
    store::{AttendanceLedger, Directory},
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub jwt: JwtService,
    pub engine: Arc<Engine>,
    pub directory: Arc<dyn Directory>,
    pub ledger: Arc<dyn AttendanceLedger>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        jwt: JwtService,
        engine: Engine,
        directory: Arc<dyn Directory>,
        ledger: Arc<dyn AttendanceLedger>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            jwt,
            engine: Arc::new(engine),
            directory,
            ledger,
        }
    }
}
