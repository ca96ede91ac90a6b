//! GitHub API error types.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors that can occur while fetching starred repositories.
///
/// Every variant is terminal for the fetch cycle it occurs in; nothing here is
/// retried internally.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("No GitHub token provided")]
    MissingCredential,

    #[error("No GitHub username provided")]
    MissingSubject,

    #[error("Authentication failed (HTTP 401)")]
    AuthenticationFailed,

    #[error("Rate limit exceeded{}", reset_suffix(.reset_at))]
    RateLimited { reset_at: Option<DateTime<Utc>> },

    #[error("GitHub server error (HTTP {status})")]
    UpstreamServerError { status: u16 },

    #[error("Network unavailable: {message}")]
    NetworkUnavailable { message: String },

    #[error("Request failed: {status_text}")]
    RequestFailed {
        status: u16,
        status_text: String,
        /// The `message` field of the error body, when one was returned.
        api_message: Option<String>,
    },
}

fn reset_suffix(reset_at: &Option<DateTime<Utc>>) -> String {
    match reset_at {
        Some(at) => format!(". Resets at {at}"),
        None => String::new(),
    }
}

impl FetchError {
    /// A message suitable for showing to the user, distinct per failure class.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::MissingCredential => {
                "Please enter a GitHub token first. Run `stardex login` to save one.".to_string()
            }
            Self::MissingSubject => {
                "Please enter a GitHub username first. Run `stardex login --username <name>`."
                    .to_string()
            }
            Self::AuthenticationFailed => {
                "Bad credentials. Check that your GitHub token is valid.".to_string()
            }
            Self::RateLimited { reset_at } => match reset_at {
                Some(at) => format!(
                    "GitHub API rate limit exceeded. Try again after {}.",
                    at.format("%H:%M:%S UTC")
                ),
                None => "GitHub API rate limit exceeded. Try again later.".to_string(),
            },
            Self::UpstreamServerError { status } => {
                format!("GitHub is having problems (HTTP {status}). Try again later.")
            }
            Self::NetworkUnavailable { .. } => {
                "Network unavailable. Check your connection and try again.".to_string()
            }
            Self::RequestFailed { status_text, .. } => {
                format!("Failed to fetch starred repositories: {status_text}")
            }
        }
    }

    /// Check if this error indicates rate limiting.
    #[inline]
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }
}
