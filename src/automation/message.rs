use anyhow::bail;
use reqwest::StatusCode;

use crate::state::thread_id;

use super::{Client, CookieSet};

#[derive(Debug, Clone)]
pub struct MessageView {
    pub from: String,
    pub body: String,
    pub sent_at: String,
}

pub async fn send_message(
    client: &Client,
    cookies: &CookieSet,
    profile_id: &str,
    body: &str,
) -> anyhow::Result<()> {
    let resp = client
        .post_form(
            "/messages/send",
            cookies,
            &[("profile_id", profile_id), ("body", body)],
        )
        .await?;

    let status = resp.status();
    if status.is_redirection() {
        Ok(())
    } else if status == StatusCode::BAD_REQUEST {
        let reason = resp.text().await.unwrap_or_default();
        bail!("automation: message rejected: {reason}")
    } else {
        bail!("automation: send returned {status}")
    }
}

/// Reads one conversation. The thread is addressed by the counterparty
/// profile id via the stable `thread-<id>` naming scheme.
pub async fn conversation(
    client: &Client,
    cookies: &CookieSet,
    profile_id: &str,
) -> anyhow::Result<Vec<MessageView>> {
    let resp = client
        .get(
            &format!("/messages?thread={}", thread_id(profile_id)),
            cookies,
        )
        .await?;
    if resp.status() != StatusCode::OK {
        bail!("automation: messages returned {}", resp.status());
    }
    let body = resp.text().await?;
    Ok(parse_conversation(&body))
}

pub async fn inbox(client: &Client, cookies: &CookieSet) -> anyhow::Result<Vec<String>> {
    let resp = client.get("/messages", cookies).await?;
    if resp.status() != StatusCode::OK {
        bail!("automation: messages returned {}", resp.status());
    }
    let body = resp.text().await?;
    let doc = scraper::Html::parse_document(&body);
    Ok(super::select_all(&doc, "[data-testid='conversation-name']")
        .into_iter()
        .map(super::text_of)
        .collect())
}

pub(crate) fn parse_conversation(body: &str) -> Vec<MessageView> {
    let doc = scraper::Html::parse_document(body);
    super::select_all(&doc, "[data-testid='message-item']")
        .into_iter()
        .filter_map(|el| {
            Some(MessageView {
                from: super::child_text(el, "[data-testid='message-from']")?,
                body: super::child_text(el, "[data-testid='message-content']")?,
                sent_at: super::child_text(el, "[data-testid='message-timestamp']")
                    .unwrap_or_default(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::parse_conversation;

    #[test]
    fn conversation_items_are_parsed() {
        let page = r#"<div data-testid="messages-list">
            <div data-testid="message-item">
                <span data-testid="message-from">You</span>
                <span data-testid="message-content">hello</span>
                <span data-testid="message-timestamp">2026-08-05T10:00:00Z</span>
            </div>
        </div>"#;
        let msgs = parse_conversation(page);
        assert_eq!(msgs.len(), 1);
        assert_eq!(msgs[0].from, "You");
        assert_eq!(msgs[0].body, "hello");
        assert_eq!(msgs[0].sent_at, "2026-08-05T10:00:00Z");
    }

    #[test]
    fn empty_thread_parses_to_no_messages() {
        assert!(parse_conversation("<div data-testid='messages-list'></div>").is_empty());
    }
}
