use anyhow::{Context, bail};
use reqwest::StatusCode;

use crate::state::SearchQuery;

use super::{Client, CookieSet};

#[derive(Debug, Clone)]
pub struct SearchResult {
    pub profile_id: String,
    pub name: String,
    pub meta: String,
}

pub async fn search(
    client: &Client,
    cookies: &CookieSet,
    query: &SearchQuery,
    per: usize,
) -> anyhow::Result<Vec<SearchResult>> {
    let path = format!(
        "/search?title={}&company={}&location={}&keywords={}&per={}",
        urlencoding::encode(query.title.trim()),
        urlencoding::encode(query.company.trim()),
        urlencoding::encode(query.location.trim()),
        urlencoding::encode(query.keywords.trim()),
        per,
    );
    let resp = client.get(&path, cookies).await?;
    if resp.status() != StatusCode::OK {
        bail!("automation: search returned {}", resp.status());
    }
    let body = resp.text().await?;
    Ok(parse_search_results(&body))
}

pub async fn view_profile(
    client: &Client,
    cookies: &CookieSet,
    profile_id: &str,
) -> anyhow::Result<String> {
    let resp = client.get(&format!("/profile/{profile_id}"), cookies).await?;
    if resp.status() != StatusCode::OK {
        bail!(
            "automation: profile {profile_id} returned {}",
            resp.status()
        );
    }
    let body = resp.text().await?;
    let doc = scraper::Html::parse_document(&body);
    super::first_text(&doc, "[data-testid='profile-name']")
        .context("automation: profile-name not found")
}

pub(crate) fn parse_search_results(body: &str) -> Vec<SearchResult> {
    let doc = scraper::Html::parse_document(body);
    super::select_all(&doc, "[data-testid='search-result']")
        .into_iter()
        .filter_map(|el| {
            let profile_id = el.value().attr("data-profile-id")?.to_owned();
            let name = super::child_text(el, "[data-testid='search-result-name']")?;
            let meta =
                super::child_text(el, "[data-testid='search-result-meta']").unwrap_or_default();
            Some(SearchResult {
                profile_id,
                name,
                meta,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::parse_search_results;

    #[test]
    fn results_come_out_of_the_cards() {
        let page = r#"<div data-testid="search-results">
            <div data-testid="search-result" data-profile-id="p1">
                <a data-testid="search-result-name" href="/profile/p1">Ada Lovelace</a>
                <div data-testid="search-result-meta">Software Engineer &bull; Analytical Engines &bull; London</div>
            </div>
            <div data-testid="search-result" data-profile-id="p2">
                <a data-testid="search-result-name" href="/profile/p2">Grace Hopper</a>
                <div data-testid="search-result-meta">Senior Engineer</div>
            </div>
            <div data-testid="search-result">
                <a data-testid="search-result-name">No id, skipped</a>
            </div>
        </div>"#;

        let results = parse_search_results(page);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].profile_id, "p1");
        assert_eq!(results[0].name, "Ada Lovelace");
        assert!(results[0].meta.contains("Analytical Engines"));
        assert_eq!(results[1].profile_id, "p2");
    }

    #[test]
    fn no_results_is_an_empty_list() {
        assert!(parse_search_results("<div data-testid='search-results'></div>").is_empty());
    }
}
