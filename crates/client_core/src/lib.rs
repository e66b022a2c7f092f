//! Client core of the super-admin console: REST transport, session handling
//! and the collection sync controller driving the dashboard.

pub mod api;
pub mod config;
pub mod error;
pub mod listing;
pub mod resource;
pub mod session;
pub mod sync;

pub use api::ApiClient;
pub use config::{load_settings, Settings};
pub use error::{ClientError, ClientResult};
pub use resource::{CollectionKind, Companies, Mutation, Operation, Resource, Stores, Users};
pub use session::{
    AuthSession, FileSessionStore, MemorySessionStore, SessionStatus, SessionStore,
    StoredSession, TokenProvider,
};
pub use sync::{
    CompanyDetails, SyncController, SyncEvent, SyncOutcome, SyncSnapshot, SyncStatus,
};

#[cfg(test)]
#[path = "tests/mock_backend.rs"]
pub(crate) mod mock_backend;
