//! Upload side of the pipeline: rotating account pool, auth provider
//! seam, and the upload dispatcher with rate-limit rotation.

pub mod auth;
pub mod dispatcher;
pub mod error;
pub mod pool;

pub use auth::{AuthProvider, Credential, StaticAuthProvider};
pub use dispatcher::{DispatcherConfig, UploadClient, UploadDispatcher, UploadResponse};
pub use error::{AuthError, NoAccountAvailable};
pub use pool::{AccountPool, UploadOutcome};
