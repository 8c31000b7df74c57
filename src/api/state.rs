//! Shared application state.

use crate::config::ServiceConfig;
use crate::convert::Pipeline;
use crate::users::{InMemoryUserStore, UserStore};
use std::sync::Arc;

/// Handed to every handler; cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
    pub users: Arc<dyn UserStore>,
}

impl AppState {
    pub fn new(pipeline: Pipeline, users: Arc<dyn UserStore>) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            users,
        }
    }

    /// Production stages from `config` and an empty in-memory user store.
    pub fn from_config(config: &ServiceConfig) -> Self {
        Self::new(Pipeline::from_config(config), Arc::new(InMemoryUserStore::new()))
    }
}
