//! Web-facing tools: page fetch, Wikipedia search, Tavily search.

use std::sync::OnceLock;

use dom_content_extraction::scraper::{Html, Node};
use dom_content_extraction::{extract_content_as_markdown, DensityTree};
use serde_json::{json, Value};
use tracing::debug;

use crate::error::{Result, RunnerError};

const WIKIPEDIA_API: &str = "https://en.wikipedia.org/w/api.php";
const TAVILY_API: &str = "https://api.tavily.com/search";
const USER_AGENT: &str = concat!("skillrunner/", env!("CARGO_PKG_VERSION"));

pub(crate) const NO_WIKIPEDIA_ENTRY: &str = "No relevant Wikipedia entry found.";

static SHARED_CLIENT: OnceLock<reqwest::Client> = OnceLock::new();

/// Get (or create) the shared reqwest client.
pub(crate) fn shared_client() -> &'static reqwest::Client {
    SHARED_CLIENT.get_or_init(|| {
        reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .user_agent(USER_AGENT)
            .build()
            .expect("HTTP client construction cannot fail with static options")
    })
}

/// Fetch a URL and return the readable text extracted from the page.
pub async fn web_fetch(url: &str) -> Result<String> {
    let response = shared_client().get(url).send().await?;
    let status = response.status().as_u16();
    if status != 200 {
        return Err(RunnerError::api(status, format!("fetching {url}")));
    }

    let body = response.text().await?;
    if body.trim().is_empty() {
        return Err(RunnerError::tool("web_fetch", format!("{url} returned an empty body")));
    }

    let text = extract_readable_text(&body);
    if text.is_empty() {
        return Err(RunnerError::tool(
            "web_fetch",
            format!("{url} contained no readable text"),
        ));
    }
    Ok(text)
}

/// Extract the readable text of a page.
///
/// Content-density analysis pulls the main content as markdown; documents
/// the analysis cannot handle (too small or too uniform to score) fall back
/// to a plain text walk over the parsed tree.
fn extract_readable_text(html: &str) -> String {
    let document = Html::parse_document(html);

    if let Ok(density_tree) = DensityTree::from_document(&document) {
        if let Ok(markdown) = extract_content_as_markdown(&density_tree, &document) {
            let markdown = markdown.trim();
            if !markdown.is_empty() {
                return markdown.to_string();
            }
        }
    }

    collapse_document_text(&document)
}

/// Collect text nodes in document order, skipping non-content elements and
/// collapsing every whitespace run to a single space.
fn collapse_document_text(document: &Html) -> String {
    let mut parts: Vec<String> = Vec::new();
    let mut stack = vec![document.tree.root()];
    while let Some(node) = stack.pop() {
        match node.value() {
            Node::Text(text) => {
                let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
                if !collapsed.is_empty() {
                    parts.push(collapsed);
                }
            }
            Node::Element(element)
                if matches!(element.name(), "script" | "style" | "noscript" | "head") =>
            {
                continue;
            }
            _ => {}
        }
        // Children are pushed in reverse so the pop order is document order.
        let children: Vec<_> = node.children().collect();
        for child in children.into_iter().rev() {
            stack.push(child);
        }
    }

    parts.join("\n")
}

/// Search Wikipedia and return a plain-text summary of the top hit.
pub async fn wikipedia_search(query: &str) -> Result<String> {
    wikipedia_search_at(WIKIPEDIA_API, query).await
}

pub(crate) async fn wikipedia_search_at(api_base: &str, query: &str) -> Result<String> {
    let response = shared_client()
        .get(api_base)
        .query(&[
            ("action", "query"),
            ("list", "search"),
            ("srsearch", query),
            ("srlimit", "1"),
            ("format", "json"),
            ("utf8", "1"),
        ])
        .send()
        .await?;
    let status = response.status().as_u16();
    if status != 200 {
        return Err(RunnerError::api(status, "Wikipedia search request failed"));
    }

    let payload: Value = response.json().await?;
    let Some(title) = payload["query"]["search"][0]["title"].as_str() else {
        return Ok(NO_WIKIPEDIA_ENTRY.to_string());
    };
    debug!(title, "wikipedia search hit");

    let response = shared_client()
        .get(api_base)
        .query(&[
            ("action", "query"),
            ("prop", "extracts"),
            ("exintro", "1"),
            ("explaintext", "1"),
            ("titles", title),
            ("format", "json"),
            ("utf8", "1"),
        ])
        .send()
        .await?;
    let status = response.status().as_u16();
    if status != 200 {
        return Err(RunnerError::api(status, "Wikipedia extract request failed"));
    }

    let payload: Value = response.json().await?;
    let extract = payload["query"]["pages"]
        .as_object()
        .and_then(|pages| pages.values().next())
        .and_then(|page| page["extract"].as_str())
        .filter(|extract| !extract.trim().is_empty());

    match extract {
        Some(extract) => Ok(format!("{title}: {}", extract.trim())),
        None => Ok(NO_WIKIPEDIA_ENTRY.to_string()),
    }
}

/// Search the web via the Tavily API.
///
/// The API key is read from `TAVILY_API_KEY`; an unset key is an error.
pub async fn tavily_search(query: &str) -> Result<String> {
    let api_key = std::env::var("TAVILY_API_KEY")
        .ok()
        .filter(|key| !key.is_empty())
        .ok_or_else(|| {
            RunnerError::Configuration("TAVILY_API_KEY environment variable is not set".to_string())
        })?;
    tavily_search_at(TAVILY_API, &api_key, query).await
}

pub(crate) async fn tavily_search_at(api_base: &str, api_key: &str, query: &str) -> Result<String> {
    let response = shared_client()
        .post(api_base)
        .json(&json!({
            "api_key": api_key,
            "query": query,
            "max_results": 5,
            "include_answer": true,
        }))
        .send()
        .await?;
    let status = response.status().as_u16();
    if status != 200 {
        let body = response.text().await.unwrap_or_default();
        return Err(RunnerError::api(status, format!("Tavily search failed: {body}")));
    }

    let payload: Value = response.json().await?;
    let mut formatted = String::new();

    if let Some(answer) = payload["answer"].as_str().filter(|a| !a.is_empty()) {
        formatted.push_str("Answer: ");
        formatted.push_str(answer);
        formatted.push_str("\n\n");
    }

    if let Some(results) = payload["results"].as_array() {
        for (index, result) in results.iter().enumerate() {
            let title = result["title"].as_str().unwrap_or("(untitled)");
            let url = result["url"].as_str().unwrap_or("");
            let content = result["content"].as_str().unwrap_or("");
            formatted.push_str(&format!("{}. {title}\n   {url}\n   {content}\n", index + 1));
        }
    }

    if formatted.is_empty() {
        formatted.push_str("No results found.");
    }
    Ok(formatted)
}
