#![allow(dead_code)]

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use mirror_scraper::fetch::{MirrorResponse, MirrorTransport};
use mirror_scraper::model::PostRecord;
use mirror_scraper::store::{PostStore, SqliteStore};
use std::collections::HashMap;
use std::sync::Mutex;

pub async fn sqlite_store() -> SqliteStore {
    let pool = sqlx::SqlitePool::connect("sqlite::memory:").await.unwrap();
    sqlx::migrate!("./migrations").run(&pool).await.unwrap();
    SqliteStore::new(pool)
}

/// Serves canned responses keyed by URL and records every request.
#[derive(Default)]
pub struct ScriptedMirrors {
    responses: Mutex<HashMap<String, (u16, String)>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedMirrors {
    pub fn set(&self, url: &str, status: u16, body: &str) {
        self.responses
            .lock()
            .unwrap()
            .insert(url.to_string(), (status, body.to_string()));
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl MirrorTransport for ScriptedMirrors {
    async fn get(&self, url: &str) -> Result<MirrorResponse> {
        self.calls.lock().unwrap().push(url.to_string());
        match self.responses.lock().unwrap().get(url) {
            Some((status, body)) => Ok(MirrorResponse {
                status: *status,
                body: body.clone(),
            }),
            None => Err(anyhow!("connection refused: {url}")),
        }
    }
}

/// Store whose every call fails.
pub struct BrokenStore;

#[async_trait]
impl PostStore for BrokenStore {
    async fn upsert(&self, _posts: &[PostRecord]) -> Result<()> {
        Err(anyhow!("disk full"))
    }

    async fn all(&self) -> Result<Vec<PostRecord>> {
        Err(anyhow!("relation does not exist"))
    }
}

/// A realistic mirror timeline for `alice`, padded past the size threshold.
pub fn timeline_page() -> String {
    let mut html = String::from(
        r#"<!DOCTYPE html><html><head><title>Alice (@alice)</title></head><body>
<div class="timeline">
  <div class="timeline-item pinned">
    <a class="tweet-link" href="/alice/status/100#m"></a>
    <div class="tweet-body"><div class="tweet-content media-body">Pinned intro</div></div>
  </div>
  <div class="timeline-item">
    <a class="tweet-link" href="/alice/status/101#m"></a>
    <div class="tweet-body">
      <div class="tweet-header"><a class="fullname" href="/alice">Alice</a></div>
      <div class="tweet-content media-body">Shipping the new release today</div>
      <div class="tweet-stats"><span>4</span></div>
    </div>
  </div>
  <div class="timeline-item">
    <a class="tweet-link" href="/Bob/status/102#m"></a>
    <div class="retweet-header"><span>Alice retweeted</span></div>
    <div class="tweet-body"><div class="tweet-content media-body">Bob says hello</div></div>
  </div>
  <div class="timeline-item">
    <div class="tweet-body"><div class="tweet-content">Ad without a permalink</div></div>
  </div>
</div>
"#,
    );
    html.push_str(&format!("<!-- {} -->", "padding ".repeat(150)));
    html.push_str("</body></html>");
    html
}
