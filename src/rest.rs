//! PostgREST-compatible table client (e.g. a Supabase project).
use crate::model::PostRecord;
use crate::store::PostStore;
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Method, Url};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

#[derive(Clone)]
pub struct RestStore {
    http: Client,
    base_url: Url,
    key: String,
    table: String,
}

impl fmt::Debug for RestStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RestStore")
            .field("base_url", &self.base_url)
            .field("table", &self.table)
            .finish_non_exhaustive()
    }
}

/// Row shape of the remote table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
struct PostRow {
    tweet_id: String,
    text_content: String,
    is_retweet: bool,
}

impl From<&PostRecord> for PostRow {
    fn from(p: &PostRecord) -> Self {
        Self {
            tweet_id: p.post_id.clone(),
            text_content: p.text_content.clone(),
            is_retweet: p.is_repost,
        }
    }
}

impl From<PostRow> for PostRecord {
    fn from(r: PostRow) -> Self {
        PostRecord {
            post_id: r.tweet_id,
            text_content: r.text_content,
            is_repost: r.is_retweet,
        }
    }
}

impl RestStore {
    pub fn new(base_url: &str, key: &str, table: &str) -> Result<Self> {
        let mut base = base_url.trim_end_matches('/').to_string();
        base.push('/');
        let base_url = Url::parse(&base).with_context(|| format!("invalid store url {base_url}"))?;
        let http = Client::builder()
            .user_agent("mirror-scraper/0.1")
            .no_proxy()
            .build()
            .context("failed to build store HTTP client")?;
        Ok(Self {
            http,
            base_url,
            key: key.to_string(),
            table: table.to_string(),
        })
    }

    fn table_url(&self) -> Result<Url> {
        self.base_url
            .join(&format!("rest/v1/{}", self.table))
            .context("invalid store table URL")
    }

    fn request(&self, method: Method, url: Url) -> reqwest::RequestBuilder {
        self.http
            .request(method, url)
            .header("apikey", &self.key)
            .header("Authorization", format!("Bearer {}", self.key))
    }

    pub fn build_upsert_request(&self, posts: &[PostRecord]) -> Result<reqwest::Request> {
        let mut url = self.table_url()?;
        url.query_pairs_mut().append_pair("on_conflict", "tweet_id");
        let rows: Vec<PostRow> = posts.iter().map(PostRow::from).collect();
        self.request(Method::POST, url)
            .header("Content-Type", "application/json")
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(&rows)
            .build()
            .context("failed to build upsert request")
    }

    pub fn build_select_request(&self) -> Result<reqwest::Request> {
        let mut url = self.table_url()?;
        url.query_pairs_mut().append_pair("select", "*");
        self.request(Method::GET, url)
            .header("Accept", "application/json")
            .build()
            .context("failed to build select request")
    }

    async fn execute(&self, request: reqwest::Request) -> Result<reqwest::Response> {
        debug!(method = %request.method(), url = %request.url(), "sending store request");
        let res = self
            .http
            .execute(request)
            .await
            .context("failed to reach store")?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(anyhow!("store error {}: {}", status, body));
        }
        Ok(res)
    }
}

#[async_trait]
impl PostStore for RestStore {
    async fn upsert(&self, posts: &[PostRecord]) -> Result<()> {
        if posts.is_empty() {
            return Ok(());
        }
        let request = self.build_upsert_request(posts)?;
        self.execute(request).await?;
        Ok(())
    }

    async fn all(&self) -> Result<Vec<PostRecord>> {
        let request = self.build_select_request()?;
        let rows: Vec<PostRow> = self
            .execute(request)
            .await?
            .json()
            .await
            .context("invalid store response")?;
        Ok(rows.into_iter().map(PostRecord::from).collect())
    }
}
