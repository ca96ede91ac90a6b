//! Complete starred-repository fetch: probe page 1, then fetch the rest
//! concurrently.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::progress::{FetchProgress, ProgressCallback, emit};
use crate::types::{PAGE_SIZE, Repository};

use super::client::GitHubClient;
use super::error::FetchError;
use super::pagination::total_pages;

type PageOutcome = (u32, Result<Vec<Repository>, FetchError>);

/// Largest page count a `Link` header may advertise, one million repositories.
/// A fetch planned beyond this fails after page 1.
pub const MAX_PAGES: u32 = 10_000;

/// Fetches every page of a user's starred repositories.
#[derive(Clone)]
pub struct StarredFetcher {
    client: GitHubClient,
    /// Maximum in-flight page requests after page 1; `None` fetches every
    /// remaining page at once.
    concurrency: Option<usize>,
}

impl StarredFetcher {
    pub fn new(client: GitHubClient) -> Self {
        Self {
            client,
            concurrency: None,
        }
    }

    /// Bound the number of concurrent page requests. Zero means unbounded.
    #[must_use]
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = (concurrency > 0).then_some(concurrency);
        self
    }

    /// Fetch all starred repositories of `subject`.
    ///
    /// The result is all-or-nothing: if any page fails, the outstanding
    /// requests are aborted and the error is returned. Items come back in
    /// ascending page order whatever order the pages complete in.
    pub async fn fetch_all(
        &self,
        subject: &str,
        credential: &str,
        on_progress: Option<&ProgressCallback>,
    ) -> Result<Vec<Repository>, FetchError> {
        if credential.trim().is_empty() {
            return Err(FetchError::MissingCredential);
        }

        let first = self.client.fetch_page(subject, 1, credential).await?;
        let total_pages = total_pages(first.link_header.as_deref());
        if total_pages > MAX_PAGES {
            tracing::warn!(subject, total_pages, "Link header advertises too many pages");
            return Err(FetchError::RequestFailed {
                status: 200,
                status_text: format!(
                    "response advertises {total_pages} pages, more than the supported {MAX_PAGES}"
                ),
                api_message: None,
            });
        }
        let total = u64::from(total_pages) * u64::from(PAGE_SIZE);

        emit(
            on_progress,
            FetchProgress::FetchStarted {
                subject: subject.to_string(),
                total_pages,
            },
        );
        emit(
            on_progress,
            FetchProgress::PageFetched {
                page: 1,
                count: first.items.len(),
                current: first.items.len() as u64,
                total,
            },
        );

        let mut items = first.items;
        if total_pages > 1 {
            let rest = self
                .fetch_remaining(subject, credential, total_pages, total, on_progress)
                .await?;
            items.extend(rest.into_iter().flatten());
        }

        tracing::info!(subject, total_pages, total_items = items.len(), "Fetched starred repositories");
        emit(
            on_progress,
            FetchProgress::FetchComplete {
                total_items: items.len(),
            },
        );

        Ok(items)
    }

    /// Fetch pages `2..=total_pages`, returning them indexed by page - 2.
    async fn fetch_remaining(
        &self,
        subject: &str,
        credential: &str,
        total_pages: u32,
        total: u64,
        on_progress: Option<&ProgressCallback>,
    ) -> Result<Vec<Vec<Repository>>, FetchError> {
        let semaphore = self.concurrency.map(|n| Arc::new(Semaphore::new(n)));
        let subject: Arc<str> = Arc::from(subject);
        let credential: Arc<str> = Arc::from(credential);
        let mut join_set: JoinSet<PageOutcome> = JoinSet::new();

        for page in 2..=total_pages {
            let client = self.client.clone();
            let semaphore = semaphore.clone();
            let subject = Arc::clone(&subject);
            let credential = Arc::clone(&credential);

            join_set.spawn(async move {
                let _permit = match semaphore {
                    Some(s) => s.acquire_owned().await.ok(),
                    None => None,
                };
                let result = client
                    .fetch_page(&subject, page, &credential)
                    .await
                    .map(|p| p.items);
                (page, result)
            });
        }

        let mut pages: Vec<Vec<Repository>> = vec![Vec::new(); (total_pages - 1) as usize];
        let mut completed: u64 = 1;

        while let Some(joined) = join_set.join_next().await {
            let (page, result) = match joined {
                Ok(outcome) => outcome,
                Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
                Err(e) => {
                    return Err(FetchError::NetworkUnavailable {
                        message: format!("page request cancelled: {e}"),
                    });
                }
            };

            // Returning here drops the set, which aborts the outstanding requests.
            let page_items = result.inspect_err(|e| {
                tracing::warn!(subject = %subject, page, error = %e, "Page fetch failed, aborting");
            })?;

            completed += 1;
            emit(
                on_progress,
                FetchProgress::PageFetched {
                    page,
                    count: page_items.len(),
                    current: completed * u64::from(PAGE_SIZE),
                    total,
                },
            );
            pages[(page - 2) as usize] = page_items;
        }

        Ok(pages)
    }
}
