pub mod account;
pub mod auth;
pub mod blog;
pub mod config;
pub mod constants;
pub mod data_state;
pub mod event;
pub mod fields;
pub mod message;
pub mod message_queue;
pub mod orchestrator;
pub mod relay;
pub mod remote;
pub mod resource;
pub mod result;
pub mod session;
pub mod tracker;
pub mod unifier;
pub mod view_model;

pub use account::{AccountRepository, AccountStateEvent, AccountViewModel, AccountViewState};
pub use auth::{AuthRepository, AuthStateEvent, AuthViewModel, AuthViewState};
pub use blog::{BlogRepository, BlogStateEvent, BlogViewModel, BlogViewState};
pub use config::{load_settings, ClientSettings, SettingsError};
pub use data_state::{build_error, DataState};
pub use event::{DedupKey, SharedEvent, StateEvent};
pub use message::{ConfirmCallback, Message, MessageType, UiComponentType};
pub use message_queue::MessageQueue;
pub use orchestrator::Orchestrator;
pub use relay::StateRelay;
pub use remote::{HttpRemoteApi, RemoteApi};
pub use resource::{CacheThenNetworkResource, CallTimeouts};
pub use result::{CacheResult, RemoteResult};
pub use session::SessionContext;
pub use tracker::EventTracker;
pub use view_model::{ViewModel, ViewStateHandler};

#[cfg(test)]
#[path = "tests/support.rs"]
mod test_support;
