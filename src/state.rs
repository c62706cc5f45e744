use std::sync::Arc;

use axum::extract::FromRef;

use crate::{config::Config, store::Store, utils::clock::Clock};

pub type SharedStore = Arc<dyn Store>;
pub type SharedClock = Arc<dyn Clock>;

#[derive(Clone)]
pub struct AppState {
    pub store: SharedStore,
    pub clock: SharedClock,
    pub config: Config,
}

impl FromRef<AppState> for SharedStore {
    fn from_ref(state: &AppState) -> Self {
        state.store.clone()
    }
}

impl FromRef<AppState> for SharedClock {
    fn from_ref(state: &AppState) -> Self {
        state.clock.clone()
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}
