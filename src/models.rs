//! Wire and storage shapes for authentication data.
//!
//! SYSTEM CONTEXT
//! ==============
//! `SessionEnvelope` is both the `data` payload of a successful login or
//! registration reply and the single record persisted by the session store.
//! Request shapes mirror the remote API's JSON bodies.

#[cfg(test)]
#[path = "models_test.rs"]
mod tests;

use std::fmt;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

// =============================================================================
// SESSION ENVELOPE
// =============================================================================

/// Credential and profile bundle for the authenticated user.
///
/// Every field defaults when missing so a stored record that parses but lacks
/// credentials is rejected by [`SessionEnvelope::is_valid`] rather than by the
/// JSON decoder.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionEnvelope {
    /// Opaque bearer credential.
    pub token: String,
    pub refresh_token: String,
    /// Scheme label, e.g. `"Bearer"`. The API sends this as `type`.
    #[serde(alias = "type")]
    pub token_type: String,
    pub issued_at: String,
    pub expires_at: String,
    pub user_id: i64,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub roles: Vec<String>,
}

impl SessionEnvelope {
    /// An envelope may back an active session only with a token and an email.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self.token.is_empty() && !self.email.is_empty()
    }

    /// Full name for display, falling back to the email address.
    #[must_use]
    pub fn display_name(&self) -> String {
        let name = format!("{} {}", self.first_name, self.last_name);
        let name = name.trim();
        if name.is_empty() { self.email.clone() } else { name.to_owned() }
    }

    /// Parse `expiresAt` as RFC 3339. `None` when absent or in another format.
    #[must_use]
    pub fn expires_at_time(&self) -> Option<OffsetDateTime> {
        OffsetDateTime::parse(&self.expires_at, &Rfc3339).ok()
    }

    /// Whether `expiresAt` lies at or before `now`.
    ///
    /// Informational only: nothing ends a session because of this.
    #[must_use]
    pub fn is_expired_at(&self, now: OffsetDateTime) -> Option<bool> {
        self.expires_at_time().map(|expires| expires <= now)
    }
}

// =============================================================================
// ENVELOPE REPLY
// =============================================================================

/// Generic `success`/`code`/`message`/`data` wrapper returned by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvelopeReply<T> {
    pub success: bool,
    #[serde(default)]
    pub code: i32,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> EnvelopeReply<T> {
    /// Payload worth committing: present only when the reply succeeded.
    #[must_use]
    pub fn committable(&self) -> Option<&T> {
        if self.success { self.data.as_ref() } else { None }
    }
}

/// Reply to both login and registration.
pub type AuthReply = EnvelopeReply<SessionEnvelope>;

// =============================================================================
// REQUESTS
// =============================================================================

/// Body of `POST {base}/login`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginRequest")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Gender {
    #[default]
    Male,
    Female,
    Other,
}

impl Gender {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Male => "MALE",
            Self::Female => "FEMALE",
            Self::Other => "OTHER",
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Gender {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "MALE" => Ok(Self::Male),
            "FEMALE" => Ok(Self::Female),
            "OTHER" => Ok(Self::Other),
            other => Err(format!("unknown gender '{other}' (expected MALE, FEMALE or OTHER)")),
        }
    }
}

/// Body of `POST {base}/register`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub gender: Gender,
    /// National ID, passport number or similar.
    pub identifier: String,
    pub phone: String,
}

impl fmt::Debug for RegisterRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisterRequest")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .field("gender", &self.gender)
            .field("identifier", &self.identifier)
            .field("phone", &self.phone)
            .finish()
    }
}
