//! Auth gateway — remote login/registration with commit-on-success.
//!
//! DESIGN
//! ======
//! `AuthApi` is the transport seam: `HttpAuthApi` talks to the real backend,
//! tests plug in scripted replies. `AuthGateway` adds the only behavior on
//! top of the raw call: a reply with `success == true` and a payload is
//! committed to the `SessionStore` before being handed back.
//!
//! ERROR HANDLING
//! ==============
//! One attempt per call. Transport failures come back unchanged and never
//! touch the session; business failures (`success == false`) are returned
//! as ordinary replies.

pub mod http;

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;

use std::sync::Arc;

pub use http::HttpAuthApi;

use crate::models::{AuthReply, LoginRequest, RegisterRequest};
use crate::session::{SessionError, SessionStore};

// =============================================================================
// ERROR
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// The request never produced an HTTP response.
    #[error("auth request failed: {0}")]
    Request(String),

    /// The server answered with a non-success HTTP status.
    #[error("auth server returned {status}: {message}")]
    Status { status: u16, message: String },

    /// A success response body was not an envelope reply.
    #[error("auth response parse failed: {0}")]
    Parse(String),

    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),

    /// The reply succeeded but its session could not be committed.
    #[error("session commit failed: {0}")]
    Session(#[from] SessionError),
}

impl GatewayError {
    /// HTTP status of a server-side failure.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

// =============================================================================
// TRANSPORT
// =============================================================================

/// Remote auth endpoints.
#[async_trait::async_trait]
pub trait AuthApi: Send + Sync {
    /// # Errors
    ///
    /// Returns a [`GatewayError`] on transport or parse failure.
    async fn login(&self, credentials: &LoginRequest) -> Result<AuthReply, GatewayError>;

    /// # Errors
    ///
    /// Returns a [`GatewayError`] on transport or parse failure.
    async fn register(&self, profile: &RegisterRequest) -> Result<AuthReply, GatewayError>;
}

// =============================================================================
// GATEWAY
// =============================================================================

#[derive(Clone)]
pub struct AuthGateway {
    api: Arc<dyn AuthApi>,
    session: SessionStore,
}

impl AuthGateway {
    #[must_use]
    pub fn new(api: Arc<dyn AuthApi>, session: SessionStore) -> Self {
        Self { api, session }
    }

    #[must_use]
    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    /// Sign in; a successful reply becomes the active session.
    ///
    /// # Errors
    ///
    /// Returns the transport error unchanged, or [`GatewayError::Session`] if
    /// a successful reply could not be committed.
    pub async fn login(&self, credentials: &LoginRequest) -> Result<AuthReply, GatewayError> {
        tracing::debug!(username = %credentials.username, "login requested");
        let reply = self.api.login(credentials).await?;
        self.commit_if_successful(&reply, "login")?;
        Ok(reply)
    }

    /// Create an account; a successful reply becomes the active session.
    ///
    /// # Errors
    ///
    /// Same as [`AuthGateway::login`].
    pub async fn register(&self, profile: &RegisterRequest) -> Result<AuthReply, GatewayError> {
        tracing::debug!(email = %profile.email, "registration requested");
        let reply = self.api.register(profile).await?;
        self.commit_if_successful(&reply, "register")?;
        Ok(reply)
    }

    /// Forget the local session. No server round-trip.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored record could not be removed.
    pub fn logout(&self) -> Result<(), SessionError> {
        self.session.clear()
    }

    fn commit_if_successful(&self, reply: &AuthReply, operation: &'static str) -> Result<(), GatewayError> {
        match reply.committable() {
            Some(envelope) => {
                self.session.commit(envelope.clone())?;
                tracing::info!(operation, user_id = envelope.user_id, "authenticated");
            }
            None => {
                tracing::info!(operation, code = reply.code, success = reply.success, "reply carried no session");
            }
        }
        Ok(())
    }
}
