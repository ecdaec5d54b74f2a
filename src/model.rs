use serde::{Deserialize, Serialize};

/// One post recovered from a mirror page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PostRecord {
    pub post_id: String,
    pub text_content: String,
    pub is_repost: bool,
}

impl PostRecord {
    pub fn new(post_id: impl Into<String>, text_content: impl Into<String>, is_repost: bool) -> Self {
        Self {
            post_id: post_id.into(),
            text_content: text_content.into(),
            is_repost,
        }
    }
}

/// Read-side projection of the stored history, split on `is_repost`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct GroupedView {
    pub user_tweets: Vec<String>,
    pub user_retweets: Vec<String>,
}

impl GroupedView {
    /// Partition records preserving their incoming order.
    pub fn from_records<I>(records: I) -> Self
    where
        I: IntoIterator<Item = PostRecord>,
    {
        let mut view = GroupedView::default();
        for record in records {
            if record.is_repost {
                view.user_retweets.push(record.text_content);
            } else {
                view.user_tweets.push(record.text_content);
            }
        }
        view
    }
}

/// Outcome of a single scrape run before it is persisted.
#[derive(Debug, Clone)]
pub struct ScrapeReport {
    pub posts: Vec<PostRecord>,
    pub skipped: usize,
    pub mirror: String,
    pub degraded: bool,
}

/// JSON body returned by the scrape boundary.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum ScrapeResponse {
    Success { ok: bool, count: usize, source: String },
    Failure { ok: bool, error: String },
}

impl ScrapeResponse {
    pub fn success(count: usize, source: impl Into<String>) -> Self {
        ScrapeResponse::Success {
            ok: true,
            count,
            source: source.into(),
        }
    }

    pub fn failure(error: impl ToString) -> Self {
        ScrapeResponse::Failure {
            ok: false,
            error: error.to_string(),
        }
    }
}
