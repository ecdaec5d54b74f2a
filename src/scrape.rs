use crate::config::Config;
use crate::error::ScrapeError;
use crate::extract::{extract_post, Extraction};
use crate::fetch::MirrorFetcher;
use crate::locate::locate_posts;
use crate::model::{PostRecord, ScrapeReport};
use crate::store::PostStore;
use anyhow::Result;
use scraper::Html;
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, info, instrument};

/// Posts recovered from one document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extracted {
    pub posts: Vec<PostRecord>,
    pub skipped: usize,
}

/// Parse markup into a document tree. Blank or binary payloads are rejected;
/// anything else is accepted the way a browser would.
pub fn parse_markup(markup: &str) -> Result<Html, ScrapeError> {
    if markup.trim().is_empty() {
        return Err(ScrapeError::ParseFailure("empty document".into()));
    }
    if markup.contains('\0') {
        return Err(ScrapeError::ParseFailure("document contains NUL bytes".into()));
    }
    Ok(Html::parse_document(markup))
}

/// Run locate + extract over `markup`. Duplicate ids keep their first
/// occurrence.
pub fn extract_posts(markup: &str, username: &str) -> Result<Extracted, ScrapeError> {
    let doc = parse_markup(markup)?;
    debug!("document parsed");
    let located = locate_posts(&doc)?;
    let total = located.elements.len();

    let mut seen = HashSet::new();
    let mut out = Extracted::default();
    for (idx, el) in located.elements.into_iter().enumerate() {
        match extract_post(el, username) {
            Extraction::Post(post) => {
                if seen.insert(post.post_id.clone()) {
                    debug!(n = idx + 1, total, post_id = %post.post_id, is_repost = post.is_repost, "extracted post");
                    out.posts.push(post);
                } else {
                    debug!(n = idx + 1, total, post_id = %post.post_id, "duplicate post id");
                }
            }
            Extraction::Skip(reason) => {
                debug!(n = idx + 1, total, ?reason, "skipping element");
                out.skipped += 1;
            }
        }
    }

    info!(
        extracted = out.posts.len(),
        skipped = out.skipped,
        "extraction complete"
    );
    Ok(out)
}

/// Fetch → parse → locate → extract for one profile.
#[derive(Debug, Clone)]
pub struct Scraper {
    fetcher: MirrorFetcher,
    username: String,
    run_timeout: Duration,
}

impl Scraper {
    pub fn new(fetcher: MirrorFetcher, username: impl Into<String>, run_timeout: Duration) -> Self {
        Self {
            fetcher,
            username: username.into(),
            run_timeout,
        }
    }

    pub fn from_config(cfg: &Config) -> Result<Self> {
        let fetcher = MirrorFetcher::from_config(&cfg.scrape)?;
        Ok(Self::new(fetcher, cfg.app.username.clone(), cfg.scrape.run_timeout()))
    }

    #[instrument(skip(self), fields(username = %self.username))]
    pub async fn run(&self) -> Result<ScrapeReport, ScrapeError> {
        tokio::time::timeout(self.run_timeout, self.run_inner())
            .await
            .map_err(|_| ScrapeError::TimedOut(self.run_timeout))?
    }

    async fn run_inner(&self) -> Result<ScrapeReport, ScrapeError> {
        info!("starting scrape");
        let page = self.fetcher.fetch_profile(&self.username).await?;
        let extracted = extract_posts(&page.body, &self.username)?;
        Ok(ScrapeReport {
            posts: extracted.posts,
            skipped: extracted.skipped,
            mirror: page.url,
            degraded: page.degraded,
        })
    }

    /// Scrape and upsert the batch into `store`.
    #[instrument(skip_all)]
    pub async fn scrape_and_store(&self, store: &dyn PostStore) -> Result<ScrapeReport, ScrapeError> {
        let report = self.run().await?;
        store
            .upsert(&report.posts)
            .await
            .map_err(ScrapeError::Storage)?;
        info!(
            count = report.posts.len(),
            skipped = report.skipped,
            mirror = %report.mirror,
            degraded = report.degraded,
            "scrape complete"
        );
        Ok(report)
    }
}
