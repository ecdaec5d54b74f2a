//! Profile retrieval across a fixed, ordered list of mirror front-ends.
use crate::config::Scrape;
use crate::error::ScrapeError;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Raw outcome of one GET against a mirror.
#[derive(Debug, Clone)]
pub struct MirrorResponse {
    pub status: u16,
    pub body: String,
}

impl MirrorResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[async_trait]
pub trait MirrorTransport: Send + Sync {
    async fn get(&self, url: &str) -> Result<MirrorResponse>;
}

/// Production transport backed by `reqwest`.
#[derive(Clone)]
pub struct HttpTransport {
    http: Client,
}

impl fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpTransport").finish_non_exhaustive()
    }
}

impl HttpTransport {
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .no_proxy()
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .context("failed to build mirror HTTP client")?;
        Ok(Self { http })
    }
}

#[async_trait]
impl MirrorTransport for HttpTransport {
    async fn get(&self, url: &str) -> Result<MirrorResponse> {
        let res = self
            .http
            .get(url)
            .header(
                reqwest::header::ACCEPT,
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            )
            .send()
            .await
            .with_context(|| format!("failed to reach {url}"))?;
        let status = res.status().as_u16();
        if !res.status().is_success() {
            // Error bodies are never used.
            return Ok(MirrorResponse {
                status,
                body: String::new(),
            });
        }
        let body = res
            .text()
            .await
            .with_context(|| format!("failed to read body from {url}"))?;
        Ok(MirrorResponse { status, body })
    }
}

/// Markup returned by [`MirrorFetcher::fetch_profile`].
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub url: String,
    pub body: String,
    /// True when no mirror cleared the size threshold and this is the best
    /// short body seen.
    pub degraded: bool,
}

#[derive(Clone)]
pub struct MirrorFetcher {
    transport: Arc<dyn MirrorTransport>,
    mirrors: Vec<String>,
    min_body_bytes: usize,
}

impl fmt::Debug for MirrorFetcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MirrorFetcher")
            .field("mirrors", &self.mirrors)
            .field("min_body_bytes", &self.min_body_bytes)
            .finish_non_exhaustive()
    }
}

impl MirrorFetcher {
    pub fn new(
        transport: Arc<dyn MirrorTransport>,
        mirrors: Vec<String>,
        min_body_bytes: usize,
    ) -> Self {
        Self {
            transport,
            mirrors,
            min_body_bytes,
        }
    }

    pub fn from_config(cfg: &Scrape) -> Result<Self> {
        let transport = HttpTransport::new(&cfg.user_agent, cfg.request_timeout())?;
        Ok(Self::new(
            Arc::new(transport),
            cfg.mirrors.clone(),
            cfg.min_body_bytes,
        ))
    }

    /// Try each mirror in order and return the first body above the size
    /// threshold, else the longest non-empty body seen.
    #[instrument(skip(self))]
    pub async fn fetch_profile(&self, username: &str) -> Result<FetchedPage, ScrapeError> {
        let mut last_cause: Option<String> = None;
        let mut best: Option<FetchedPage> = None;

        for base in &self.mirrors {
            let url = profile_url(base, username);
            info!(%url, "fetching profile");
            let res = match self.transport.get(&url).await {
                Ok(res) => res,
                Err(err) => {
                    warn!(%url, error = %format!("{err:#}"), "mirror unreachable");
                    last_cause = Some(format!("{url}: {err:#}"));
                    continue;
                }
            };

            if !res.is_success() {
                warn!(%url, status = res.status, "mirror rejected request");
                last_cause = Some(format!("{url} responded {}", res.status));
                continue;
            }

            let len = res.body.len();
            debug!(%url, len, preview = %preview(&res.body, 500), "mirror responded");
            if len > self.min_body_bytes {
                return Ok(FetchedPage {
                    url,
                    body: res.body,
                    degraded: false,
                });
            }

            warn!(%url, len, threshold = self.min_body_bytes, "mirror body below threshold");
            if len == 0 {
                last_cause = Some(format!("{url} returned an empty body"));
                continue;
            }
            if best.as_ref().map_or(true, |b| len >= b.body.len()) {
                best = Some(FetchedPage {
                    url,
                    body: res.body,
                    degraded: true,
                });
            }
        }

        if let Some(page) = best {
            warn!(url = %page.url, len = page.body.len(), "using degraded mirror response");
            return Ok(page);
        }

        Err(ScrapeError::FetchExhausted {
            last_cause: last_cause.unwrap_or_else(|| "no mirrors configured".to_string()),
        })
    }
}

/// Join a mirror base and a handle without doubling slashes.
pub fn profile_url(base: &str, username: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), username.trim_start_matches('/'))
}

/// First `max` characters of `text`, cut on a char boundary.
pub(crate) fn preview(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct ScriptedTransport {
        responses: HashMap<String, Result<MirrorResponse, String>>,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedTransport {
        fn with(mut self, url: &str, res: Result<MirrorResponse, String>) -> Self {
            self.responses.insert(url.to_string(), res);
            self
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl MirrorTransport for ScriptedTransport {
        async fn get(&self, url: &str) -> Result<MirrorResponse> {
            self.calls.lock().unwrap().push(url.to_string());
            match self.responses.get(url) {
                Some(Ok(res)) => Ok(res.clone()),
                Some(Err(msg)) => Err(anyhow!(msg.clone())),
                None => Err(anyhow!("no route to {url}")),
            }
        }
    }

    fn ok(status: u16, body: &str) -> Result<MirrorResponse, String> {
        Ok(MirrorResponse {
            status,
            body: body.to_string(),
        })
    }

    fn mirrors() -> Vec<String> {
        vec![
            "https://m1.test".into(),
            "https://m2.test/".into(),
            "https://m3.test".into(),
        ]
    }

    #[tokio::test]
    async fn third_mirror_wins_after_two_503s() {
        let big = "x".repeat(1500);
        let transport = Arc::new(
            ScriptedTransport::default()
                .with("https://m1.test/alice", ok(503, ""))
                .with("https://m2.test/alice", ok(503, ""))
                .with("https://m3.test/alice", ok(200, &big)),
        );
        let fetcher = MirrorFetcher::new(transport.clone(), mirrors(), 1000);
        let page = fetcher.fetch_profile("alice").await.unwrap();
        assert_eq!(page.body, big);
        assert_eq!(page.url, "https://m3.test/alice");
        assert!(!page.degraded);
        assert_eq!(transport.calls().len(), 3);
    }

    #[tokio::test]
    async fn first_large_body_short_circuits() {
        let big = "y".repeat(2000);
        let transport = Arc::new(
            ScriptedTransport::default()
                .with("https://m1.test/alice", ok(200, &big))
                .with("https://m2.test/alice", ok(200, &big)),
        );
        let fetcher = MirrorFetcher::new(transport.clone(), mirrors(), 1000);
        fetcher.fetch_profile("alice").await.unwrap();
        assert_eq!(transport.calls(), vec!["https://m1.test/alice".to_string()]);
    }

    #[tokio::test]
    async fn all_500_empty_is_exhausted() {
        let transport = Arc::new(
            ScriptedTransport::default()
                .with("https://m1.test/alice", ok(500, ""))
                .with("https://m2.test/alice", ok(500, ""))
                .with("https://m3.test/alice", ok(500, "")),
        );
        let fetcher = MirrorFetcher::new(transport, mirrors(), 1000);
        let err = fetcher.fetch_profile("alice").await.unwrap_err();
        match err {
            ScrapeError::FetchExhausted { last_cause } => {
                assert!(last_cause.contains("m3.test"));
                assert!(last_cause.contains("500"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn transport_faults_keep_last_cause() {
        let transport = Arc::new(
            ScriptedTransport::default()
                .with("https://m1.test/alice", Err("connection refused".into()))
                .with("https://m2.test/alice", ok(404, ""))
                .with("https://m3.test/alice", Err("tls handshake failed".into())),
        );
        let fetcher = MirrorFetcher::new(transport, mirrors(), 1000);
        let err = fetcher.fetch_profile("alice").await.unwrap_err();
        assert!(err.to_string().contains("tls handshake failed"));
    }

    #[tokio::test]
    async fn short_bodies_fall_back_to_longest() {
        let transport = Arc::new(
            ScriptedTransport::default()
                .with("https://m1.test/alice", ok(200, "short"))
                .with("https://m2.test/alice", ok(200, "a bit longer"))
                .with("https://m3.test/alice", ok(503, "")),
        );
        let fetcher = MirrorFetcher::new(transport, mirrors(), 1000);
        let page = fetcher.fetch_profile("alice").await.unwrap();
        assert!(page.degraded);
        assert_eq!(page.body, "a bit longer");
        assert_eq!(page.url, "https://m2.test/alice");
    }

    #[test]
    fn profile_url_joins_cleanly() {
        assert_eq!(profile_url("https://a.test/", "bob"), "https://a.test/bob");
        assert_eq!(profile_url("https://a.test", "bob"), "https://a.test/bob");
    }

    #[test]
    fn preview_respects_char_boundaries() {
        assert_eq!(preview("héllo", 2), "hé");
        assert_eq!(preview("hi", 10), "hi");
    }
}
