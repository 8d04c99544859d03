use axum::Router;
use axum::debug_handler;
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use serde::Deserialize;

use crate::state::SearchQuery;
use crate::{AppResult, AppState, auth, esc, include_res};

pub fn router() -> Router<AppState> {
    Router::new().route("/search", get(search_page))
}

#[derive(Deserialize)]
pub(crate) struct SearchParams {
    #[serde(default)]
    title: String,
    #[serde(default)]
    company: String,
    #[serde(default)]
    location: String,
    #[serde(default)]
    keywords: String,
    page: Option<String>,
    per: Option<String>,
}

/// Query-string integers degrade to the default on junk input.
pub(crate) fn q_int(v: Option<&str>, def: i64) -> i64 {
    v.map(str::trim)
        .filter(|s| !s.is_empty())
        .and_then(|s| s.parse().ok())
        .unwrap_or(def)
}

// page has floor 1, per defaults to 10 and is clamped to [1,25]
pub(crate) fn clamp_paging(page: i64, per: i64) -> (usize, usize) {
    let page = page.max(1) as usize;
    let per = per.clamp(1, 25) as usize;
    (page, per)
}

pub(crate) fn page_window(total: usize, page: usize, per: usize) -> (usize, usize) {
    let start = ((page - 1) * per).min(total);
    let end = (start + per).min(total);
    (start, end)
}

fn search_href(q: &SearchQuery, page: usize, per: usize) -> String {
    format!(
        "/search?title={}&company={}&location={}&keywords={}&page={}&per={}",
        urlencoding::encode(q.title.trim()),
        urlencoding::encode(q.company.trim()),
        urlencoding::encode(q.location.trim()),
        urlencoding::encode(q.keywords.trim()),
        page.max(1),
        per,
    )
}

#[debug_handler]
pub(crate) async fn search_page(
    State(app): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<SearchParams>,
) -> AppResult<Response> {
    let username = match auth::require_user(&app, &headers, "/search") {
        Ok(u) => u,
        Err(to) => return Ok(to),
    };

    let query = SearchQuery {
        title: params.title,
        company: params.company,
        location: params.location,
        keywords: params.keywords,
    };
    let (page, per) = clamp_paging(
        q_int(params.page.as_deref(), 1),
        q_int(params.per.as_deref(), 10),
    );

    let all = app.net.search(&query);
    let total = all.len();
    let (start, end) = page_window(total, page, per);

    let mut results = String::new();
    for p in &all[start..end] {
        results += &include_res!(str, "/pages/search_result.html")
            .replace("{id}", &esc(&p.id))
            .replace("{name}", &esc(&p.full_name()))
            .replace("{title}", &esc(&p.title))
            .replace("{company}", &esc(&p.company))
            .replace("{location}", &esc(&p.location));
    }

    let prev = if page > 1 {
        format!(
            r#"<a data-testid="search-prev" href="{}">&larr; Prev</a>"#,
            search_href(&query, page - 1, per)
        )
    } else {
        String::new()
    };
    let next = if end < total {
        format!(
            r#"<a data-testid="search-next" href="{}">Next &rarr;</a>"#,
            search_href(&query, page + 1, per)
        )
    } else {
        String::new()
    };

    let body = include_res!(str, "/pages/search.html")
        .replace("{brand}", &esc(&app.site.brand_name))
        .replace("{nav}", &auth::nav(&username))
        .replace("{q_title}", &esc(query.title.trim()))
        .replace("{q_company}", &esc(query.company.trim()))
        .replace("{q_location}", &esc(query.location.trim()))
        .replace("{q_keywords}", &esc(query.keywords.trim()))
        .replace("{total}", &total.to_string())
        .replace("{results}", &results)
        .replace("{prev}", &prev)
        .replace("{next}", &next);
    Ok(Html(body).into_response())
}
