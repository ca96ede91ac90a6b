//! End-to-end tests of a session over a scripted transport and an in-memory
//! SQLite database.
//!
//! These tests require the `migrate` feature.

#![cfg(feature = "migrate")]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use sea_orm::{DatabaseConnection, EntityTrait};
use stardex::http::{HttpError, HttpRequest, HttpResponse, HttpTransport};
use stardex::{
    FetchError, FetchProgress, GitHubClient, Repository, RepositoryCache, SessionError, SortKey,
    StarSession, StarredFetcher, StarredRepository, connect_and_migrate,
};

const API: &str = "https://api.test";

/// Serves a fixed response per URL and counts requests.
#[derive(Clone, Default)]
struct ScriptedTransport {
    routes: Arc<Mutex<HashMap<String, HttpResponse>>>,
    hits: Arc<Mutex<Vec<String>>>,
}

impl ScriptedTransport {
    fn serve(&self, url: String, response: HttpResponse) {
        self.routes.lock().unwrap().insert(url, response);
    }

    fn hits(&self) -> Vec<String> {
        self.hits.lock().unwrap().clone()
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, HttpError> {
        self.hits.lock().unwrap().push(request.url.clone());
        self.routes
            .lock()
            .unwrap()
            .get(&request.url)
            .cloned()
            .ok_or(HttpError::NoMockResponse { url: request.url })
    }
}

fn page_url(user: &str, page: u32) -> String {
    format!("{API}/users/{user}/starred?page={page}&per_page=100")
}

fn repository(id: i64, owner: &str, name: &str) -> Repository {
    Repository {
        id,
        name: name.to_string(),
        description: Some(format!("Project number {id}")),
        url: format!("https://github.com/{owner}/{name}"),
        language: Some("Rust".to_string()),
        star_count: id as u32,
        updated_at: "2024-01-01T00:00:00Z".to_string(),
        owner_login: owner.to_string(),
    }
}

fn json_page(repos: &[Repository], link: Option<String>) -> HttpResponse {
    let body: Vec<serde_json::Value> = repos
        .iter()
        .map(|r| {
            serde_json::json!({
                "id": r.id,
                "name": r.name,
                "description": r.description,
                "html_url": r.url,
                "language": r.language,
                "stargazers_count": r.star_count,
                "updated_at": r.updated_at,
                "owner": { "login": r.owner_login },
            })
        })
        .collect();

    let mut headers = Vec::new();
    if let Some(link) = link {
        headers.push(("link".to_string(), link));
    }
    HttpResponse {
        status: 200,
        headers,
        body: serde_json::to_vec(&body).unwrap(),
    }
}

async fn setup() -> (ScriptedTransport, StarSession, Arc<DatabaseConnection>) {
    let db = Arc::new(
        connect_and_migrate("sqlite::memory:")
            .await
            .expect("Failed to create test database"),
    );
    let transport = ScriptedTransport::default();
    let client = GitHubClient::new(Arc::new(transport.clone())).with_api_url(API);
    let session = StarSession::new(StarredFetcher::new(client), Arc::clone(&db));
    (transport, session, db)
}

#[tokio::test]
async fn test_refresh_fetches_three_pages_and_caches_them() {
    let (transport, session, _db) = setup().await;
    let all: Vec<Repository> = (1..=250)
        .map(|i| repository(i, "owner", &format!("crate-{i}")))
        .collect();
    let last = format!(
        "<{}>; rel=\"next\", <{}>; rel=\"last\"",
        page_url("octocat", 2),
        page_url("octocat", 3)
    );
    transport.serve(page_url("octocat", 1), json_page(&all[..100], Some(last)));
    transport.serve(page_url("octocat", 2), json_page(&all[100..200], None));
    transport.serve(page_url("octocat", 3), json_page(&all[200..], None));

    let progress = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&progress);
    let outcome = session
        .refresh(
            "octocat",
            "ghp_token",
            Some(Box::new(move |event: FetchProgress| {
                if let Some(counts) = event.counts() {
                    sink.lock().unwrap().push(counts);
                }
            })),
        )
        .await
        .expect("refresh should succeed");

    assert_eq!(outcome.fetched, 250);
    assert!(outcome.persisted);
    assert_eq!(transport.hits().len(), 3);
    assert_eq!(transport.hits()[0], page_url("octocat", 1));

    let progress = progress.lock().unwrap();
    assert!(progress.len() >= 3);
    assert!(progress.windows(2).all(|w| w[0].0 <= w[1].0));
    assert_eq!(progress.last(), Some(&(300, 300)));

    assert_eq!(session.repositories(), all);
    assert_eq!(session.cache().count().await.expect("count"), 250);
    assert_eq!(session.cache().load_all().await.expect("load"), all);

    let hits = session.search("crate-250", SortKey::Relevance);
    assert_eq!(hits.first().map(|r| r.id), Some(250));
    let by_stars = session.search("", SortKey::Stars);
    assert_eq!(by_stars.first().map(|r| r.id), Some(250));
}

#[tokio::test]
async fn test_unauthorized_refresh_keeps_cached_data_readable() {
    let (transport, session, db) = setup().await;
    let cached = vec![repository(1, "a", "one"), repository(2, "b", "two")];
    RepositoryCache::new(db)
        .save_all(&cached)
        .await
        .expect("seed cache");
    session.load_cached().await;

    transport.serve(
        page_url("octocat", 1),
        HttpResponse {
            status: 401,
            headers: Vec::new(),
            body: br#"{"message":"Bad credentials"}"#.to_vec(),
        },
    );

    let err = session
        .refresh("octocat", "ghp_revoked", None)
        .await
        .expect_err("401 must reject");
    assert!(matches!(err, SessionError::Fetch(FetchError::AuthenticationFailed)));

    assert_eq!(session.cache().load_all().await.expect("load"), cached);
    assert_eq!(session.search("", SortKey::Relevance), cached);
}

#[tokio::test]
async fn test_missing_token_never_hits_the_network() {
    let (transport, session, _db) = setup().await;

    let err = session
        .refresh("octocat", "  ", None)
        .await
        .expect_err("blank token must reject");
    assert!(matches!(err, SessionError::Fetch(FetchError::MissingCredential)));
    assert!(transport.hits().is_empty());
}

#[tokio::test]
async fn test_replacing_one_entry_leaves_others_untouched() {
    let (_transport, _session, db) = setup().await;
    let cache = RepositoryCache::new(Arc::clone(&db));
    cache
        .save_all(&[
            repository(1, "a", "one"),
            repository(2, "b", "two"),
            repository(3, "c", "three"),
        ])
        .await
        .expect("seed");
    let before = StarredRepository::find_by_id(2)
        .one(db.as_ref())
        .await
        .expect("query")
        .expect("row 2");

    tokio::time::sleep(std::time::Duration::from_millis(5)).await;

    let mut replacement = repository(2, "b", "two-renamed");
    replacement.star_count = 9_999;
    replacement.description = None;
    cache.save_all(&[replacement.clone()]).await.expect("replace");

    let loaded = cache.load_all().await.expect("load");
    assert_eq!(loaded.len(), 3);
    assert_eq!(loaded[0], repository(1, "a", "one"));
    assert_eq!(loaded[1], replacement);
    assert_eq!(loaded[2], repository(3, "c", "three"));

    let after = StarredRepository::find_by_id(2)
        .one(db.as_ref())
        .await
        .expect("query")
        .expect("row 2");
    assert!(after.cached_at > before.cached_at);
}

#[tokio::test]
async fn test_credentials_persist_across_sessions() {
    let (_transport, session, db) = setup().await;
    session
        .credentials()
        .save_username("octocat")
        .await
        .expect("save username");
    session
        .credentials()
        .save_token("ghp_saved")
        .await
        .expect("save token");

    let client = GitHubClient::new(Arc::new(ScriptedTransport::default())).with_api_url(API);
    let reopened = StarSession::new(StarredFetcher::new(client), db);
    assert_eq!(
        reopened.credentials().username().await.expect("read").as_deref(),
        Some("octocat")
    );
    assert_eq!(
        reopened.credentials().token().await.expect("read").as_deref(),
        Some("ghp_saved")
    );
}
