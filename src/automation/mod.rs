//! Drives the login, search, connect and messaging flows against the local
//! mock network the way an external client would: over the page surface,
//! reading elements through their `data-testid` attributes. Session cookies
//! are an opaque blob that gets stored and replayed between runs.

mod auth;
mod connect;
mod message;
mod search;

pub use auth::{Authed, check_authed, ensure_authed, login};
pub use connect::{
    ConnectOutcome, accept_connection, accepted_connections, pending_requests,
    send_connection_request,
};
pub use message::{MessageView, conversation, inbox, send_message};
pub use search::{SearchResult, search, view_profile};

use anyhow::{Context, bail};
use reqwest::header;
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredCookie {
    pub name: String,
    pub value: String,
}

/// The cookies a login handed us, persisted verbatim and replayed on later
/// runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CookieSet(pub Vec<StoredCookie>);

impl CookieSet {
    pub fn from_json(raw: &str) -> anyhow::Result<Self> {
        serde_json::from_str(raw).context("automation: parse stored cookies")
    }

    pub fn to_json(&self) -> anyhow::Result<String> {
        serde_json::to_string(self).context("automation: serialize cookies")
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub(crate) fn header_value(&self) -> String {
        self.0
            .iter()
            .map(|c| format!("{}={}", c.name, c.value))
            .collect::<Vec<_>>()
            .join("; ")
    }

    pub(crate) fn capture(resp: &reqwest::Response) -> CookieSet {
        let mut out = Vec::new();
        for v in resp.headers().get_all(header::SET_COOKIE) {
            let Ok(s) = v.to_str() else { continue };
            let Some(pair) = s.split(';').next() else { continue };
            let Some((name, value)) = pair.split_once('=') else {
                continue;
            };
            out.push(StoredCookie {
                name: name.trim().to_owned(),
                value: value.trim().to_owned(),
            });
        }
        CookieSet(out)
    }

    pub(crate) fn merge(&mut self, other: CookieSet) {
        for c in other.0 {
            match self.0.iter_mut().find(|have| have.name == c.name) {
                Some(have) => have.value = c.value,
                None => self.0.push(c),
            }
        }
    }
}

/// HTTP client bound to one mock-network base URL. Redirects are not
/// followed: the flows read `Location` themselves, and the login flow needs
/// the `Set-Cookie` off the 302.
pub struct Client {
    http: reqwest::Client,
    base_url: String,
}

impl Client {
    /// Refuses anything that is not the local mock app.
    pub fn new(base_url: &str) -> anyhow::Result<Self> {
        let base_url = base_url.trim().trim_end_matches('/').to_owned();
        ensure_local_base_url(&base_url)?;
        let http = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()?;
        Ok(Client { http, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub(crate) async fn get(
        &self,
        path: &str,
        cookies: &CookieSet,
    ) -> anyhow::Result<reqwest::Response> {
        let mut req = self.http.get(format!("{}{path}", self.base_url));
        if !cookies.is_empty() {
            req = req.header(header::COOKIE, cookies.header_value());
        }
        req.send()
            .await
            .with_context(|| format!("automation: GET {path}"))
    }

    pub(crate) async fn post_form<T: Serialize + ?Sized>(
        &self,
        path: &str,
        cookies: &CookieSet,
        form: &T,
    ) -> anyhow::Result<reqwest::Response> {
        let mut req = self.http.post(format!("{}{path}", self.base_url)).form(form);
        if !cookies.is_empty() {
            req = req.header(header::COOKIE, cookies.header_value());
        }
        req.send()
            .await
            .with_context(|| format!("automation: POST {path}"))
    }
}

/// Key under which a session's cookies are stored.
pub fn session_key(base_url: &str, username: &str) -> String {
    let user = username.trim();
    let user = if user.is_empty() { "(unknown)" } else { user };
    format!("mocknet|{}|{}", base_url.trim(), user)
}

fn ensure_local_base_url(raw: &str) -> anyhow::Result<()> {
    let Some(rest) = raw.strip_prefix("http://") else {
        bail!("automation: base URL must use http");
    };
    let host = rest.split(['/', '?']).next().unwrap_or_default();
    let host = host.rsplit_once(':').map(|(h, _)| h).unwrap_or(host);
    if host != "localhost" && host != "127.0.0.1" {
        bail!("automation: base URL must be localhost/127.0.0.1");
    }
    Ok(())
}

pub(crate) fn location(resp: &reqwest::Response) -> Option<String> {
    resp.headers()
        .get(header::LOCATION)?
        .to_str()
        .ok()
        .map(str::to_owned)
}

// ---- page reading ----
//
// scraper documents are not Send, so parsing stays in sync helpers that take
// the body text and return owned data.

pub(crate) fn select_all<'a>(doc: &'a Html, css: &str) -> Vec<ElementRef<'a>> {
    match Selector::parse(css) {
        Ok(sel) => doc.select(&sel).collect(),
        Err(_) => Vec::new(),
    }
}

pub(crate) fn first_text(doc: &Html, css: &str) -> Option<String> {
    select_all(doc, css).first().map(|el| text_of(*el))
}

pub(crate) fn text_of(el: ElementRef<'_>) -> String {
    el.text().collect::<String>().trim().to_owned()
}

pub(crate) fn child_text(el: ElementRef<'_>, css: &str) -> Option<String> {
    let sel = Selector::parse(css).ok()?;
    el.select(&sel).next().map(text_of)
}
