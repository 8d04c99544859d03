use anyhow::bail;
use reqwest::StatusCode;

use crate::storage::Repositories;

use super::{Client, CookieSet, Credentials, session_key};

pub struct Authed {
    pub username: String,
    pub cookies: CookieSet,
}

/// Reuses the saved session when its cookies still authenticate, otherwise
/// performs a fresh login and persists the new cookie set.
pub async fn ensure_authed(
    client: &Client,
    repos: &Repositories,
    creds: &Credentials,
) -> anyhow::Result<Authed> {
    let mut creds = creds.clone();
    if creds.username.trim().is_empty() {
        creds.username = "demo".to_owned();
    }
    if creds.password.trim().is_empty() {
        creds.password = "demo".to_owned();
    }
    let key = session_key(client.base_url(), &creds.username);

    if let Some(saved) = repos.sessions.get(&key).await? {
        if let Ok(cookies) = CookieSet::from_json(&saved.cookies_json) {
            if let Some(username) = check_authed(client, &cookies).await? {
                repos.sessions.touch(&key).await?;
                tracing::debug!(%key, "reusing saved session");
                return Ok(Authed { username, cookies });
            }
        }
    }

    let (username, cookies) = login(client, &creds).await?;
    repos.sessions.upsert(&key, &cookies.to_json()?).await?;
    tracing::info!(%username, "fresh login, session saved");
    Ok(Authed { username, cookies })
}

/// Fresh login: submit the form, keep the cookies off the redirect, walk the
/// checkpoint interstitial when one is in the way, and confirm the nav shows
/// a signed-in user.
pub async fn login(client: &Client, creds: &Credentials) -> anyhow::Result<(String, CookieSet)> {
    let resp = client
        .post_form(
            "/login",
            &CookieSet::default(),
            &[
                ("username", creds.username.as_str()),
                ("password", creds.password.as_str()),
                ("next", "/search"),
            ],
        )
        .await?;

    if !resp.status().is_redirection() {
        bail!(
            "automation: login did not redirect (status {}); bad credentials?",
            resp.status()
        );
    }
    let mut cookies = CookieSet::capture(&resp);
    if cookies.is_empty() {
        bail!("automation: login set no session cookie");
    }

    if super::location(&resp)
        .unwrap_or_default()
        .starts_with("/checkpoint")
    {
        tracing::debug!("completing checkpoint interstitial");
        let resp = client
            .post_form("/checkpoint", &cookies, &[("next", "/search")])
            .await?;
        cookies.merge(CookieSet::capture(&resp));
    }

    let Some(username) = check_authed(client, &cookies).await? else {
        bail!("automation: nav-user not found after login (not authenticated)");
    };
    Ok((username, cookies))
}

/// Loads /search and reads the signed-in username out of the nav, if any.
pub async fn check_authed(
    client: &Client,
    cookies: &CookieSet,
) -> anyhow::Result<Option<String>> {
    let resp = client.get("/search", cookies).await?;
    if resp.status() != StatusCode::OK {
        return Ok(None);
    }
    let body = resp.text().await?;
    Ok(parse_nav_user(&body))
}

pub(crate) fn parse_nav_user(body: &str) -> Option<String> {
    let doc = scraper::Html::parse_document(body);
    super::first_text(&doc, "[data-testid='nav-user']").filter(|s| !s.is_empty())
}
