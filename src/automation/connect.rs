use anyhow::bail;
use reqwest::StatusCode;

use super::{Client, CookieSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectOutcome {
    Sent,
    /// The profile was already pending or accepted; the network shows the
    /// current state instead.
    AlreadyRequested,
}

pub async fn send_connection_request(
    client: &Client,
    cookies: &CookieSet,
    profile_id: &str,
    note: &str,
) -> anyhow::Result<ConnectOutcome> {
    let resp = client
        .post_form(
            &format!("/profile/{profile_id}/connect"),
            cookies,
            &[("note", note)],
        )
        .await?;

    let status = resp.status();
    if status.is_redirection() {
        let to = super::location(&resp).unwrap_or_default();
        if to.contains("already=1") {
            Ok(ConnectOutcome::AlreadyRequested)
        } else {
            Ok(ConnectOutcome::Sent)
        }
    } else if status == StatusCode::NOT_FOUND {
        bail!("automation: unknown profile {profile_id}")
    } else {
        bail!("automation: connect returned {status}")
    }
}

pub async fn pending_requests(
    client: &Client,
    cookies: &CookieSet,
) -> anyhow::Result<Vec<String>> {
    connection_names(client, cookies, "[data-testid='pending-request-name']").await
}

pub async fn accepted_connections(
    client: &Client,
    cookies: &CookieSet,
) -> anyhow::Result<Vec<String>> {
    connection_names(client, cookies, "[data-testid='accepted-connection-name']").await
}

async fn connection_names(
    client: &Client,
    cookies: &CookieSet,
    css: &str,
) -> anyhow::Result<Vec<String>> {
    let resp = client.get("/connections", cookies).await?;
    if resp.status() != StatusCode::OK {
        bail!("automation: connections returned {}", resp.status());
    }
    let body = resp.text().await?;
    let doc = scraper::Html::parse_document(&body);
    Ok(super::select_all(&doc, css)
        .into_iter()
        .map(super::text_of)
        .collect())
}

/// Test hook: drives the mock's admin toggle that simulates the counterparty
/// accepting a request.
pub async fn accept_connection(
    client: &Client,
    cookies: &CookieSet,
    profile_id: &str,
) -> anyhow::Result<()> {
    let resp = client
        .post_form(
            "/admin/accept",
            cookies,
            &[("profile_id", profile_id), ("back", "/connections")],
        )
        .await?;
    if !resp.status().is_redirection() {
        bail!("automation: accept returned {}", resp.status());
    }
    Ok(())
}
