//! Fetch a URL's readable text and cache it as node state.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use pipeline_core::UrlContext;

use crate::error::EngineError;
use crate::state::{SharedStore, URL_CONTEXT_KEY};

/// Fetches the readable text of a page. Split out so tests and embedders
/// can substitute their own fetch path.
#[async_trait]
pub trait ContentFetcher: Send + Sync {
    /// Returns `(final_url, text_content)`; redirects may change the URL.
    async fn fetch(&self, url: &str) -> Result<(String, String), String>;
}

/// reqwest-backed fetcher that strips HTML down to its text.
pub struct HttpContentFetcher {
    client: reqwest::Client,
    max_content_len: usize,
}

impl Default for HttpContentFetcher {
    fn default() -> Self {
        Self {
            client: reqwest::Client::new(),
            max_content_len: 100_000,
        }
    }
}

impl HttpContentFetcher {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ContentFetcher for HttpContentFetcher {
    async fn fetch(&self, url: &str) -> Result<(String, String), String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        if !response.status().is_success() {
            return Err(format!("HTTP {}", response.status().as_u16()));
        }

        let final_url = response.url().to_string();
        let body = response.text().await.map_err(|e| e.to_string())?;
        let mut text = strip_html(&body);
        if text.len() > self.max_content_len {
            let mut cut = self.max_content_len;
            while !text.is_char_boundary(cut) {
                cut -= 1;
            }
            text.truncate(cut);
        }
        Ok((final_url, text))
    }
}

/// Drop tags, scripts and styles; collapse the remaining whitespace.
fn strip_html(body: &str) -> String {
    let mut text = String::with_capacity(body.len() / 2);
    let mut chars = body.char_indices().peekable();
    let mut skip_until: Option<&str> = None;

    while let Some((i, c)) = chars.next() {
        if let Some(closing) = skip_until {
            let matches_closing = body[i..]
                .get(..closing.len())
                .is_some_and(|s| s.eq_ignore_ascii_case(closing));
            if matches_closing {
                for _ in 0..closing.len() - 1 {
                    chars.next();
                }
                skip_until = None;
            }
            continue;
        }

        if c == '<' {
            let rest = &body[i..];
            if rest.get(..7).is_some_and(|s| s.eq_ignore_ascii_case("<script")) {
                skip_until = Some("</script>");
            } else if rest.get(..6).is_some_and(|s| s.eq_ignore_ascii_case("<style")) {
                skip_until = Some("</style>");
            }
            // Consume to the end of the tag itself.
            for (_, t) in chars.by_ref() {
                if t == '>' {
                    break;
                }
            }
            text.push(' ');
        } else {
            text.push(c);
        }
    }

    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Loads page text into the `url:context` node-state slot, toggling the
/// node's loading flag around the fetch. A failed fetch is stored as an
/// error context rather than surfaced as an engine error; the context
/// builder skips error contexts.
pub struct UrlLoader {
    store: SharedStore,
    fetcher: Arc<dyn ContentFetcher>,
}

impl UrlLoader {
    pub fn new(store: SharedStore, fetcher: Arc<dyn ContentFetcher>) -> Self {
        Self { store, fetcher }
    }

    pub async fn load(
        &self,
        node_id: &str,
        url: &str,
        label: Option<&str>,
    ) -> Result<(), EngineError> {
        if url.is_empty() {
            return Ok(());
        }

        self.store.lock().await.set_loading(node_id, true);

        let context = match self.fetcher.fetch(url).await {
            Ok((final_url, content)) => {
                log::debug!("[{node_id}] loaded {} bytes from {final_url}", content.len());
                UrlContext {
                    url: final_url,
                    label: label.map(str::to_string),
                    content,
                    error: None,
                }
            }
            Err(error) => {
                log::warn!("[{node_id}] failed to load {url}: {error}");
                UrlContext {
                    url: url.to_string(),
                    label: label.map(str::to_string),
                    content: String::new(),
                    error: Some(error),
                }
            }
        };

        let mut store = self.store.lock().await;
        let value: Value = serde_json::to_value(&context)?;
        store.set_node_state(node_id, URL_CONTEXT_KEY, value);
        store.set_loading(node_id, false);
        Ok(())
    }

    pub async fn clear_context(&self, node_id: &str) {
        self.store
            .lock()
            .await
            .clear_node_state(node_id, URL_CONTEXT_KEY);
    }
}
