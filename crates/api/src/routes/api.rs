use services::{CredentialSettings, ModelHub, ModelRouter};
use std::sync::Arc;

/// Shared state handed to every route
#[derive(Clone)]
pub struct AppState {
    pub model_router: Arc<ModelRouter>,
    pub credential_settings: Arc<CredentialSettings>,
    pub model_hub: Arc<ModelHub>,
}
