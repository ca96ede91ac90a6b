//! GitHub API client: one authenticated request per page.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use url::Url;

use crate::http::reqwest_transport::ReqwestTransport;
use crate::http::{HttpError, HttpRequest, HttpResponse, HttpTransport};
use crate::types::{PAGE_SIZE, Repository};

use super::convert::to_repository;
use super::error::FetchError;
use super::types::{ApiErrorBody, StarredRepoResponse};

/// Default API base URL.
pub const DEFAULT_API_URL: &str = "https://api.github.com";

const ACCEPT: &str = "application/vnd.github.v3+json";
const USER_AGENT: &str = "stardex";

/// One page of starred repositories.
#[derive(Debug, Clone)]
pub struct StarredPage {
    pub items: Vec<Repository>,
    /// Raw `Link` header, if the response carried one.
    pub link_header: Option<String>,
}

/// GitHub API client.
///
/// Stateless apart from its configuration; cloning is cheap and clones share
/// the underlying transport.
#[derive(Clone)]
pub struct GitHubClient {
    transport: Arc<dyn HttpTransport>,
    api_url: String,
}

impl GitHubClient {
    /// Create a client over an explicit transport.
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            transport,
            api_url: DEFAULT_API_URL.to_string(),
        }
    }

    /// Create a reqwest-backed client whose requests time out after `timeout`.
    pub fn with_timeout(timeout: Duration) -> Result<Self, FetchError> {
        let transport = ReqwestTransport::with_timeout(timeout).map_err(map_transport_error)?;
        Ok(Self::new(Arc::new(transport)))
    }

    /// Point the client at a different API base (GitHub Enterprise, tests).
    #[must_use]
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into().trim_end_matches('/').to_string();
        self
    }

    /// URL of one page of a user's starred repositories.
    ///
    /// `subject` is always a single path segment; `/`, `?` and `#` in it are
    /// percent-encoded.
    pub fn starred_url(&self, subject: &str, page: u32) -> Result<String, FetchError> {
        let invalid_base = || FetchError::RequestFailed {
            status: 0,
            status_text: format!("invalid API URL '{}'", self.api_url),
            api_message: None,
        };

        let mut url = Url::parse(&self.api_url).map_err(|_| invalid_base())?;
        url.path_segments_mut()
            .map_err(|_| invalid_base())?
            .pop_if_empty()
            .extend(["users", subject, "starred"]);
        url.query_pairs_mut()
            .append_pair("page", &page.to_string())
            .append_pair("per_page", &PAGE_SIZE.to_string());

        Ok(url.into())
    }

    /// Fetch one page of `subject`'s starred repositories.
    ///
    /// Fails with [`FetchError::MissingCredential`] or
    /// [`FetchError::MissingSubject`] before touching the network when
    /// `credential` or `subject` is blank.
    pub async fn fetch_page(
        &self,
        subject: &str,
        page: u32,
        credential: &str,
    ) -> Result<StarredPage, FetchError> {
        if credential.trim().is_empty() {
            return Err(FetchError::MissingCredential);
        }
        if subject.trim().is_empty() {
            return Err(FetchError::MissingSubject);
        }

        let request = HttpRequest::get(self.starred_url(subject, page)?)
            .header("Authorization", format!("token {credential}"))
            .header("Accept", ACCEPT)
            .header("User-Agent", USER_AGENT);

        let response = self
            .transport
            .send(request)
            .await
            .map_err(map_transport_error)?;

        if !response.is_success() {
            let err = classify_failure(&response);
            tracing::debug!(subject, page, status = response.status, error = %err, "Page request failed");
            return Err(err);
        }

        let link_header = response.header("link").map(String::from);
        let payload: Vec<StarredRepoResponse> =
            serde_json::from_slice(&response.body).map_err(|e| FetchError::RequestFailed {
                status: response.status,
                status_text: format!("invalid response body: {e}"),
                api_message: None,
            })?;

        tracing::debug!(subject, page, count = payload.len(), "Fetched page");

        Ok(StarredPage {
            items: payload.into_iter().map(to_repository).collect(),
            link_header,
        })
    }
}

fn map_transport_error(err: HttpError) -> FetchError {
    FetchError::NetworkUnavailable {
        message: err.to_string(),
    }
}

/// Map a non-2xx response to a typed failure.
fn classify_failure(response: &HttpResponse) -> FetchError {
    let api_message = serde_json::from_slice::<ApiErrorBody>(&response.body)
        .ok()
        .map(|b| b.message);

    match response.status {
        401 => FetchError::AuthenticationFailed,
        403 if is_rate_limited(response, api_message.as_deref()) => FetchError::RateLimited {
            reset_at: parse_rate_limit_reset(response),
        },
        429 => FetchError::RateLimited {
            reset_at: parse_rate_limit_reset(response),
        },
        status @ 500..=599 => FetchError::UpstreamServerError { status },
        status => FetchError::RequestFailed {
            status,
            status_text: status_text(status),
            api_message,
        },
    }
}

/// A 403 is a rate limit when the quota header says so or the body says so.
fn is_rate_limited(response: &HttpResponse, api_message: Option<&str>) -> bool {
    let exhausted = response
        .header("x-ratelimit-remaining")
        .is_some_and(|v| v.trim() == "0");
    let says_so = api_message.is_some_and(|m| m.to_ascii_lowercase().contains("rate limit"));
    exhausted || says_so
}

fn parse_rate_limit_reset(response: &HttpResponse) -> Option<DateTime<Utc>> {
    response
        .header("x-ratelimit-reset")
        .and_then(|v| v.trim().parse::<i64>().ok())
        .and_then(|epoch| DateTime::from_timestamp(epoch, 0))
}

fn status_text(status: u16) -> String {
    reqwest::StatusCode::from_u16(status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .map(String::from)
        .unwrap_or_else(|| format!("HTTP {status}"))
}
