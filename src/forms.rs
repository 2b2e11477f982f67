//! Input validation and user-facing messages for the login and signup flows.
//!
//! SYSTEM CONTEXT
//! ==============
//! Presentation code runs these checks before calling the gateway and uses
//! the message helpers to turn failures into something a person can act on.
//! The status-code conventions here belong to the UI; the gateway itself
//! never interprets them.

#[cfg(test)]
#[path = "forms_test.rs"]
mod tests;

use std::fmt;

use crate::gateway::GatewayError;
use crate::models::{AuthReply, LoginRequest, RegisterRequest};

pub const LOGIN_PASSWORD_MIN_LEN: usize = 3;
pub const REGISTER_PASSWORD_MIN_LEN: usize = 8;
pub const NAME_MIN_LEN: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldIssue {
    Required,
    InvalidEmail,
    TooShort { min: usize },
    /// Only digits and `+` are allowed.
    InvalidPhone,
}

impl fmt::Display for FieldIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Required => f.write_str("is required"),
            Self::InvalidEmail => f.write_str("must be a valid email address"),
            Self::TooShort { min } => write!(f, "must be at least {min} characters"),
            Self::InvalidPhone => f.write_str("may only contain digits and '+'"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    /// Wire name of the offending field, e.g. `firstName`.
    pub field: &'static str,
    pub issue: FieldIssue,
}

/// Every failing field of a form, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq, thiserror::Error)]
#[error("{}", render(.errors))]
pub struct ValidationErrors {
    pub errors: Vec<FieldError>,
}

impl ValidationErrors {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    #[must_use]
    pub fn issue_for(&self, field: &str) -> Option<FieldIssue> {
        self.errors.iter().find(|e| e.field == field).map(|e| e.issue)
    }

    fn check(&mut self, field: &'static str, issue: Option<FieldIssue>) {
        if let Some(issue) = issue {
            self.errors.push(FieldError { field, issue });
        }
    }

    fn into_result(self) -> Result<(), Self> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

fn render(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| format!("{} {}", e.field, e.issue))
        .collect::<Vec<_>>()
        .join("; ")
}

// =============================================================================
// FIELD RULES
// =============================================================================

fn required(value: &str) -> Option<FieldIssue> {
    value.trim().is_empty().then_some(FieldIssue::Required)
}

fn min_len(value: &str, min: usize) -> Option<FieldIssue> {
    required(value).or_else(|| (value.chars().count() < min).then_some(FieldIssue::TooShort { min }))
}

fn email(value: &str) -> Option<FieldIssue> {
    required(value).or_else(|| (!is_email(value)).then_some(FieldIssue::InvalidEmail))
}

fn phone(value: &str) -> Option<FieldIssue> {
    let allowed = value.chars().all(|c| c.is_ascii_digit() || c == '+');
    required(value).or_else(|| (!allowed).then_some(FieldIssue::InvalidPhone))
}

/// Loose address check: `local@domain` with non-empty dot-separated labels.
#[must_use]
pub fn is_email(value: &str) -> bool {
    if value.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    !local.is_empty() && !domain.is_empty() && !domain.contains('@') && domain.split('.').all(|label| !label.is_empty())
}

// =============================================================================
// FORMS
// =============================================================================

/// # Errors
///
/// Returns every failing field of the login form.
pub fn validate_login(form: &LoginRequest) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::default();
    errors.check("username", email(&form.username));
    errors.check("password", min_len(&form.password, LOGIN_PASSWORD_MIN_LEN));
    errors.into_result()
}

/// # Errors
///
/// Returns every failing field of the registration form.
pub fn validate_register(form: &RegisterRequest) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::default();
    errors.check("firstName", min_len(&form.first_name, NAME_MIN_LEN));
    errors.check("lastName", min_len(&form.last_name, NAME_MIN_LEN));
    errors.check("email", email(&form.email));
    errors.check("password", min_len(&form.password, REGISTER_PASSWORD_MIN_LEN));
    errors.check("identifier", required(&form.identifier));
    errors.check("phone", phone(&form.phone));
    errors.into_result()
}

// =============================================================================
// MESSAGES
// =============================================================================

const GENERIC_LOGIN_FAILURE: &str = "An unexpected error occurred. Please try again later.";
const GENERIC_REGISTER_FAILURE: &str = "Registration failed. Please try again later.";

/// Message for a failed login call.
#[must_use]
pub fn login_failure_message(err: &GatewayError) -> &'static str {
    match err.status() {
        Some(401 | 403) => "Incorrect credentials. Please check your email and password.",
        _ => GENERIC_LOGIN_FAILURE,
    }
}

/// Message for a failed registration call.
#[must_use]
pub fn register_failure_message(err: &GatewayError) -> &'static str {
    match err.status() {
        Some(409) => "That email address is already registered.",
        Some(400) => "Invalid data. Please review the form.",
        _ => GENERIC_REGISTER_FAILURE,
    }
}

/// Message for a well-formed reply with `success == false`.
#[must_use]
pub fn rejection_message(reply: &AuthReply) -> String {
    if reply.message.trim().is_empty() {
        format!("Request rejected (code {}).", reply.code)
    } else {
        reply.message.clone()
    }
}

const NO_SESSION_RETURNED: &str = "The server accepted the request but returned no session.";

fn accepted_without_session(reply: &AuthReply) -> String {
    if reply.message.trim().is_empty() { NO_SESSION_RETURNED.to_owned() } else { reply.message.clone() }
}

/// Message after a successful login reply.
///
/// Greets the user only when this reply carried the session that was
/// committed; a previously stored session is never mistaken for it.
#[must_use]
pub fn login_outcome_message(reply: &AuthReply) -> String {
    match reply.committable() {
        Some(session) => format!("Welcome, {}!", session.display_name()),
        None => accepted_without_session(reply),
    }
}

/// Message after a successful registration reply.
#[must_use]
pub fn register_outcome_message(reply: &AuthReply) -> String {
    match reply.committable() {
        Some(session) => format!("Account created; signed in as {}.", session.email),
        None => format!("Account created. {}", accepted_without_session(reply)),
    }
}
