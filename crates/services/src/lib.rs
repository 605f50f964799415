pub mod catalog;
pub mod credentials;
pub mod model_hub;
pub mod model_router;

pub use credentials::{CredentialResolver, CredentialSettings, InMemoryCredentialStore};
pub use model_hub::{InMemoryModelHubStore, ModelHub};
pub use model_router::{ModelRouter, ProviderRegistry, RouteRequest, RoutedStream};
