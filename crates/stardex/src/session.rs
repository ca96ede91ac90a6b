//! The session ties the fetcher, the cache, the credential store and the
//! search index together.
//!
//! One `StarSession` is built at startup and handed to whatever needs it; it
//! owns the in-memory collection and guarantees at most one fetch cycle runs
//! at a time.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use sea_orm::DatabaseConnection;
use thiserror::Error;

use crate::cache::RepositoryCache;
use crate::credentials::CredentialStore;
use crate::github::{FetchError, StarredFetcher};
use crate::progress::{ProgressCallback, ProgressState, ProgressTracker};
use crate::search::{SearchIndex, SortKey};
use crate::types::Repository;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("A fetch is already in progress")]
    Busy,

    #[error(transparent)]
    Fetch(#[from] FetchError),
}

impl SessionError {
    pub fn user_message(&self) -> String {
        match self {
            Self::Busy => "A fetch is already in progress. Wait for it to finish.".to_string(),
            Self::Fetch(e) => e.user_message(),
        }
    }
}

/// Result of a successful refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshOutcome {
    /// Repositories fetched; this is now the in-memory collection.
    pub fetched: usize,
    /// Whether the fetched collection was fully written to the cache.
    pub persisted: bool,
}

pub struct StarSession {
    fetcher: StarredFetcher,
    cache: RepositoryCache,
    credentials: CredentialStore,
    index: RwLock<Arc<SearchIndex>>,
    busy: AtomicBool,
    progress: Arc<ProgressTracker>,
}

/// Marks a fetch cycle as running; dropping it (including when the refresh
/// future is cancelled) ends the cycle.
struct CycleGuard<'a> {
    busy: &'a AtomicBool,
    progress: &'a ProgressTracker,
}

impl<'a> CycleGuard<'a> {
    fn acquire(busy: &'a AtomicBool, progress: &'a ProgressTracker) -> Option<Self> {
        busy.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()?;
        progress.begin();
        Some(Self { busy, progress })
    }
}

impl Drop for CycleGuard<'_> {
    fn drop(&mut self) {
        self.progress.finish();
        self.busy.store(false, Ordering::Release);
    }
}

impl StarSession {
    /// Build a session whose cache and credentials share `db`.
    pub fn new(fetcher: StarredFetcher, db: Arc<DatabaseConnection>) -> Self {
        Self::from_parts(
            fetcher,
            RepositoryCache::new(Arc::clone(&db)),
            CredentialStore::new(db),
        )
    }

    pub fn from_parts(
        fetcher: StarredFetcher,
        cache: RepositoryCache,
        credentials: CredentialStore,
    ) -> Self {
        Self {
            fetcher,
            cache,
            credentials,
            index: RwLock::new(Arc::new(SearchIndex::default())),
            busy: AtomicBool::new(false),
            progress: Arc::new(ProgressTracker::new()),
        }
    }

    pub fn cache(&self) -> &RepositoryCache {
        &self.cache
    }

    pub fn credentials(&self) -> &CredentialStore {
        &self.credentials
    }

    /// Replace the in-memory collection with the cache contents.
    ///
    /// A storage failure is logged and leaves the collection empty. Returns
    /// the number of repositories loaded.
    pub async fn load_cached(&self) -> usize {
        let repos = match self.cache.load_all().await {
            Ok(repos) => repos,
            Err(e) => {
                tracing::warn!(error = %e, "Could not load cached repositories");
                Vec::new()
            }
        };
        let count = repos.len();
        self.replace_index(repos);
        tracing::debug!(count, "Loaded cached repositories");
        count
    }

    /// Fetch the complete starred collection, persist it and make it the
    /// in-memory collection.
    ///
    /// A failed fetch changes nothing. A failed save is logged and reported
    /// through [`RefreshOutcome::persisted`]; the fetched data is still used.
    pub async fn refresh(
        &self,
        subject: &str,
        credential: &str,
        on_progress: Option<ProgressCallback>,
    ) -> Result<RefreshOutcome, SessionError> {
        let _cycle =
            CycleGuard::acquire(&self.busy, &self.progress).ok_or(SessionError::Busy)?;

        let tracker = Arc::clone(&self.progress);
        let forward: ProgressCallback = Box::new(move |event| {
            tracker.apply(&event);
            if let Some(cb) = &on_progress {
                cb(event);
            }
        });

        let repos = self
            .fetcher
            .fetch_all(subject, credential, Some(&forward))
            .await?;

        let persisted = match self.cache.save_all(&repos).await {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!(error = %e, "Fetched repositories were not fully cached");
                false
            }
        };

        let fetched = repos.len();
        self.replace_index(repos);

        Ok(RefreshOutcome { fetched, persisted })
    }

    pub fn search(&self, term: &str, sort: SortKey) -> Vec<Repository> {
        self.index().query(term, sort)
    }

    /// The current index; a later refresh swaps in a new one.
    pub fn index(&self) -> Arc<SearchIndex> {
        Arc::clone(&self.index.read().unwrap_or_else(|e| e.into_inner()))
    }

    pub fn repositories(&self) -> Vec<Repository> {
        self.index().repositories().to_vec()
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    pub fn progress(&self) -> ProgressState {
        self.progress.snapshot()
    }

    fn replace_index(&self, repos: Vec<Repository>) {
        let index = Arc::new(SearchIndex::build(repos));
        *self.index.write().unwrap_or_else(|e| e.into_inner()) = index;
    }
}

#[cfg(all(test, feature = "migrate"))]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use tokio::sync::Notify;

    use super::*;
    use crate::db::{connect, connect_and_migrate};
    use crate::github::GitHubClient;
    use crate::github::client::test_support::{error_response, ok_page};
    use crate::http::{HttpError, HttpRequest, HttpResponse, HttpTransport, MockTransport};
    use crate::progress::FetchProgress;
    use crate::types::fixtures::repo;

    const API: &str = "https://api.test";
    const PAGE_1: &str = "https://api.test/users/octocat/starred?page=1&per_page=100";

    fn session_with(
        transport: impl HttpTransport + 'static,
        db: Arc<DatabaseConnection>,
    ) -> StarSession {
        let client = GitHubClient::new(Arc::new(transport)).with_api_url(API);
        StarSession::new(StarredFetcher::new(client), db)
    }

    async fn memory_db() -> Arc<DatabaseConnection> {
        Arc::new(
            connect_and_migrate("sqlite::memory:")
                .await
                .expect("in-memory database"),
        )
    }

    async fn unmigrated_db() -> Arc<DatabaseConnection> {
        Arc::new(connect("sqlite::memory:").await.expect("connect"))
    }

    #[tokio::test]
    async fn test_cache_and_credentials_share_one_connection() {
        let db = memory_db().await;
        let session = session_with(MockTransport::new(), Arc::clone(&db));
        assert_eq!(Arc::strong_count(&db), 3);

        session.credentials().save_username("octocat").await.expect("save");
        RepositoryCache::new(Arc::clone(&db))
            .save_all(&[repo(1, "a", "one")])
            .await
            .expect("seed");

        assert_eq!(session.cache().count().await.expect("count"), 1);
        assert_eq!(
            CredentialStore::new(db).username().await.expect("read").as_deref(),
            Some("octocat")
        );
    }

    #[tokio::test]
    async fn test_refresh_persists_and_indexes() {
        let transport = MockTransport::new();
        let repos = vec![repo(1, "tokio-rs", "tokio"), repo(2, "serde-rs", "serde")];
        transport.push_response(PAGE_1, ok_page(&repos, None));

        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        let session = session_with(transport, memory_db().await);

        let outcome = session
            .refresh(
                "octocat",
                "token",
                Some(Box::new(move |e| sink.lock().unwrap().push(e))),
            )
            .await
            .expect("refresh");

        assert_eq!(outcome, RefreshOutcome { fetched: 2, persisted: true });
        assert_eq!(session.repositories(), repos);
        assert_eq!(session.cache().load_all().await.expect("load"), repos);
        assert_eq!(
            session
                .search("tokio", SortKey::Relevance)
                .iter()
                .map(|r| r.id)
                .collect::<Vec<_>>(),
            vec![1]
        );

        let state = session.progress();
        assert!(!state.visible);
        assert_eq!((state.current, state.total), (2, 100));
        assert!(!session.is_busy());
        assert!(
            events
                .lock()
                .unwrap()
                .contains(&FetchProgress::FetchComplete { total_items: 2 })
        );
    }

    #[tokio::test]
    async fn test_failed_fetch_leaves_everything_unchanged() {
        let db = memory_db().await;
        let cached = vec![repo(10, "a", "cached-one"), repo(11, "b", "cached-two")];
        RepositoryCache::new(Arc::clone(&db))
            .save_all(&cached)
            .await
            .expect("seed");

        let transport = MockTransport::new();
        transport.push_response(PAGE_1, error_response(401, &[], "Bad credentials"));
        let session = session_with(transport, db);
        assert_eq!(session.load_cached().await, 2);

        let err = session
            .refresh("octocat", "bad", None)
            .await
            .expect_err("401 must fail");
        assert!(matches!(err, SessionError::Fetch(FetchError::AuthenticationFailed)));

        assert_eq!(session.repositories(), cached);
        assert_eq!(session.cache().load_all().await.expect("load"), cached);
        assert!(!session.is_busy());
        assert!(!session.progress().visible);
    }

    #[tokio::test]
    async fn test_save_failure_is_not_fatal() {
        let transport = MockTransport::new();
        let repos = vec![repo(1, "o", "one")];
        transport.push_response(PAGE_1, ok_page(&repos, None));

        // No migrations: every write fails.
        let db = unmigrated_db().await;
        let session = session_with(transport, db);

        let outcome = session.refresh("octocat", "token", None).await.expect("refresh");
        assert_eq!(outcome, RefreshOutcome { fetched: 1, persisted: false });
        assert_eq!(session.repositories(), repos);
    }

    #[tokio::test]
    async fn test_load_cached_with_unusable_storage_is_empty() {
        let db = unmigrated_db().await;
        let session = session_with(MockTransport::new(), db);
        assert_eq!(session.load_cached().await, 0);
        assert!(session.index().is_empty());
    }

    /// Holds every request until released.
    #[derive(Clone)]
    struct GatedTransport {
        inner: MockTransport,
        gate: Arc<Notify>,
    }

    #[async_trait]
    impl HttpTransport for GatedTransport {
        async fn send(&self, request: HttpRequest) -> Result<HttpResponse, HttpError> {
            self.gate.notified().await;
            self.inner.send(request).await
        }
    }

    #[tokio::test]
    async fn test_overlapping_refresh_is_rejected() {
        let inner = MockTransport::new();
        inner.push_response(PAGE_1, ok_page(&[repo(1, "o", "one")], None));
        let gate = Arc::new(Notify::new());
        let transport = GatedTransport {
            inner,
            gate: Arc::clone(&gate),
        };
        let session = Arc::new(session_with(transport, memory_db().await));

        let first = tokio::spawn({
            let session = Arc::clone(&session);
            async move { session.refresh("octocat", "token", None).await }
        });

        while !session.is_busy() {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        assert!(session.progress().visible);

        let err = session
            .refresh("octocat", "token", None)
            .await
            .expect_err("second refresh must be refused");
        assert!(matches!(err, SessionError::Busy));

        gate.notify_one();
        let outcome = first.await.expect("join").expect("first refresh");
        assert_eq!(outcome.fetched, 1);
        assert!(!session.is_busy());
    }

    #[tokio::test]
    async fn test_cancelled_refresh_releases_busy_flag() {
        let inner = MockTransport::new();
        let gate = Arc::new(Notify::new());
        let session = session_with(
            GatedTransport {
                inner,
                gate: Arc::clone(&gate),
            },
            memory_db().await,
        );

        let cancelled =
            tokio::time::timeout(Duration::from_millis(20), session.refresh("octocat", "t", None))
                .await;
        assert!(cancelled.is_err());
        assert!(!session.is_busy());
        assert!(session.cache().load_all().await.expect("load").is_empty());
    }

    #[test]
    fn test_busy_message() {
        assert!(SessionError::Busy.user_message().contains("already in progress"));
        let err = SessionError::from(FetchError::MissingCredential);
        assert_eq!(err.user_message(), FetchError::MissingCredential.user_message());
    }
}
