//! End-to-end flows: boots the mock network on an ephemeral port and drives
//! it with the automation client, the same way the CLI does.

use std::sync::Arc;

use mocknet::automation::{self, Client, ConnectOutcome, Credentials};
use mocknet::config::Config;
use mocknet::server;
use mocknet::storage::{self, Repositories};
use mocknet::state::SearchQuery;

async fn spawn_server(checkpoint: bool) -> String {
    let mut cfg = Config::default();
    cfg.mocknet.checkpoint = checkpoint;

    let app = server::router(server::app_state(&cfg).unwrap());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://127.0.0.1:{port}")
}

fn demo_creds() -> Credentials {
    // blank credentials fall back to the seeded demo/demo pair
    Credentials {
        username: String::new(),
        password: String::new(),
    }
}

#[tokio::test]
async fn full_flow_against_live_server() {
    let base = spawn_server(false).await;
    let client = Client::new(&base).unwrap();
    let repos = Repositories::new(storage::open_in_memory().await.unwrap());

    let authed = automation::ensure_authed(&client, &repos, &demo_creds())
        .await
        .unwrap();
    assert_eq!(authed.username, "demo");

    // search: engineers only, ordered by profile id
    let query = SearchQuery {
        title: "engineer".into(),
        ..SearchQuery::default()
    };
    let results = automation::search(&client, &authed.cookies, &query, 25)
        .await
        .unwrap();
    assert!(!results.is_empty());
    assert_eq!(results[0].profile_id, "p1");
    assert!(
        results
            .iter()
            .all(|r| r.meta.to_lowercase().contains("engineer"))
    );
    let ids: Vec<String> = results.iter().map(|r| r.profile_id.clone()).collect();
    let mut sorted = ids.clone();
    sorted.sort();
    assert_eq!(ids, sorted);

    // per is honored
    let page = automation::search(&client, &authed.cookies, &query, 3)
        .await
        .unwrap();
    assert_eq!(page.len(), 3);

    // connect once, then observe the idempotent guard
    let outcome =
        automation::send_connection_request(&client, &authed.cookies, "p1", "hi from the bot")
            .await
            .unwrap();
    assert_eq!(outcome, ConnectOutcome::Sent);
    let outcome = automation::send_connection_request(&client, &authed.cookies, "p1", "again")
        .await
        .unwrap();
    assert_eq!(outcome, ConnectOutcome::AlreadyRequested);

    let pending = automation::pending_requests(&client, &authed.cookies)
        .await
        .unwrap();
    assert_eq!(pending, vec!["Ada Lovelace".to_owned()]);

    // messaging before acceptance is rejected
    let err = automation::send_message(&client, &authed.cookies, "p1", "hello")
        .await
        .unwrap_err();
    assert!(err.to_string().contains("not connected"), "{err}");

    automation::accept_connection(&client, &authed.cookies, "p1")
        .await
        .unwrap();
    let accepted = automation::accepted_connections(&client, &authed.cookies)
        .await
        .unwrap();
    assert_eq!(accepted, vec!["Ada Lovelace".to_owned()]);

    // acceptance created the (empty) thread
    let threads = automation::inbox(&client, &authed.cookies).await.unwrap();
    assert_eq!(threads, vec!["Ada Lovelace".to_owned()]);
    assert!(
        automation::conversation(&client, &authed.cookies, "p1")
            .await
            .unwrap()
            .is_empty()
    );

    automation::send_message(&client, &authed.cookies, "p1", "hello")
        .await
        .unwrap();
    let msgs = automation::conversation(&client, &authed.cookies, "p1")
        .await
        .unwrap();
    assert_eq!(msgs.len(), 1);
    assert_eq!(msgs[0].from, "You");
    assert_eq!(msgs[0].body, "hello");
    assert!(!msgs[0].sent_at.is_empty());

    let name = automation::view_profile(&client, &authed.cookies, "p1")
        .await
        .unwrap();
    assert_eq!(name, "Ada Lovelace");
}

#[tokio::test]
async fn saved_sessions_are_reused() {
    let base = spawn_server(false).await;
    let client = Client::new(&base).unwrap();
    let repos = Repositories::new(storage::open_in_memory().await.unwrap());

    let first = automation::ensure_authed(&client, &repos, &demo_creds())
        .await
        .unwrap();
    let second = automation::ensure_authed(&client, &repos, &demo_creds())
        .await
        .unwrap();
    // second run replayed the stored cookies instead of logging in again
    assert_eq!(first.cookies, second.cookies);

    let key = automation::session_key(client.base_url(), "demo");
    let saved = repos.sessions.get(&key).await.unwrap().unwrap();
    assert_eq!(saved.cookies_json, first.cookies.to_json().unwrap());
}

#[tokio::test]
async fn login_walks_the_checkpoint_when_enabled() {
    let base = spawn_server(true).await;
    let client = Client::new(&base).unwrap();
    let repos = Repositories::new(storage::open_in_memory().await.unwrap());

    let authed = automation::ensure_authed(&client, &repos, &demo_creds())
        .await
        .unwrap();
    assert_eq!(authed.username, "demo");
}

#[tokio::test]
async fn bad_credentials_fail_login() {
    let base = spawn_server(false).await;
    let client = Client::new(&base).unwrap();

    let err = automation::login(
        &client,
        &Credentials {
            username: "demo".into(),
            password: "wrong".into(),
        },
    )
    .await
    .unwrap_err();
    assert!(err.to_string().contains("did not redirect"), "{err}");
}

#[tokio::test]
async fn protected_pages_redirect_to_login() {
    let base = spawn_server(false).await;
    let http = reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap();

    for path in ["/search", "/connections", "/messages", "/profile/p1"] {
        let resp = http.get(format!("{base}{path}")).send().await.unwrap();
        assert!(resp.status().is_redirection(), "{path}: {}", resp.status());
        let loc = resp
            .headers()
            .get(reqwest::header::LOCATION)
            .unwrap()
            .to_str()
            .unwrap();
        assert!(loc.starts_with("/login?next="), "{path} -> {loc}");
    }

    // security headers ride on every response
    let resp = http.get(format!("{base}/login")).send().await.unwrap();
    assert_eq!(
        resp.headers().get("x-frame-options").unwrap(),
        &reqwest::header::HeaderValue::from_static("DENY")
    );
    assert_eq!(
        resp.headers().get("cache-control").unwrap(),
        &reqwest::header::HeaderValue::from_static("no-store")
    );
}

#[tokio::test]
async fn concurrent_connect_requests_have_one_winner() {
    let base = spawn_server(false).await;
    let client = Arc::new(Client::new(&base).unwrap());
    let repos = Repositories::new(storage::open_in_memory().await.unwrap());
    let authed = automation::ensure_authed(&client, &repos, &demo_creds())
        .await
        .unwrap();
    let cookies = Arc::new(authed.cookies);

    let futs = (0..6).map(|i| {
        let client = Arc::clone(&client);
        let cookies = Arc::clone(&cookies);
        async move {
            automation::send_connection_request(&client, &cookies, "p5", &format!("note-{i}"))
                .await
                .unwrap()
        }
    });
    let outcomes = futures_util::future::join_all(futs).await;

    let sent = outcomes
        .iter()
        .filter(|o| **o == ConnectOutcome::Sent)
        .count();
    assert_eq!(sent, 1);
    assert_eq!(
        outcomes
            .iter()
            .filter(|o| **o == ConnectOutcome::AlreadyRequested)
            .count(),
        outcomes.len() - 1
    );
}
