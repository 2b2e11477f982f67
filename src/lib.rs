//! Client-side authentication: login/registration against a REST backend and
//! a durable, observable session snapshot.
//!
//! DESIGN
//! ======
//! `SessionStore` owns the one active `SessionEnvelope` and mirrors it to a
//! `SessionStorage` backend as a single record. `AuthGateway` calls the
//! remote API through `AuthApi` and commits successful replies into the
//! store. Callers build both explicitly and pass them around; there is no
//! global instance.

pub mod config;
pub mod forms;
pub mod gateway;
pub mod models;
pub mod session;
pub mod storage;

pub use config::AuthConfig;
pub use gateway::{AuthApi, AuthGateway, GatewayError, HttpAuthApi};
pub use models::{AuthReply, EnvelopeReply, Gender, LoginRequest, RegisterRequest, SessionEnvelope};
pub use session::{SESSION_STORAGE_KEY, SessionError, SessionStore};
pub use storage::{FileStorage, MemoryStorage, SessionStorage, StorageError};
