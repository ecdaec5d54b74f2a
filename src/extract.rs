//! Per-container field recovery: post id, repost classification and text.
//!
//! Every step has a fallback chain, and anything that cannot be recovered
//! turns into a [`Extraction::Skip`] instead of an error. Records that leave
//! this module are always complete.
use crate::model::PostRecord;
use crate::patterns;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Url;
use scraper::{ElementRef, Node};
use tracing::debug;

/// Cap applied to text recovered from the whole container.
pub const MAX_FALLBACK_CHARS: usize = 500;

static STATUS_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"/status/(\d+)").expect("status id regex"));
static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("whitespace regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NoPermalink,
    NoStatusId,
    EmptyText,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    Post(PostRecord),
    Skip(SkipReason),
}

/// Which tier produced the text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextSource {
    Primary,
    Alternate,
    Container,
}

/// Recover a [`PostRecord`] from one candidate container.
pub fn extract_post(el: ElementRef<'_>, username: &str) -> Extraction {
    let Some(href) = find_permalink(el) else {
        return Extraction::Skip(SkipReason::NoPermalink);
    };
    let Some(post_id) = status_id(href) else {
        return Extraction::Skip(SkipReason::NoStatusId);
    };
    let is_repost = is_repost(href, username);

    let (text, source) = recover_text(el);
    if text.is_empty() {
        return Extraction::Skip(SkipReason::EmptyText);
    }
    debug!(%post_id, ?source, "recovered post text");

    Extraction::Post(PostRecord {
        post_id,
        text_content: text,
        is_repost,
    })
}

/// The dedicated permalink element, else the first link pointing at a status.
pub fn find_permalink<'a>(el: ElementRef<'a>) -> Option<&'a str> {
    if let Some(link) = patterns::PERMALINKS.first_within(el) {
        if let Some(href) = link.value().attr("href") {
            return Some(href);
        }
    }
    el.select(&patterns::ANCHORS)
        .filter_map(|a| a.value().attr("href"))
        .find(|href| href.contains("/status/"))
}

pub fn status_id(href: &str) -> Option<String> {
    STATUS_ID
        .captures(href)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Author handle taken from the second path segment of a permalink.
pub fn permalink_author(href: &str) -> String {
    let path = match (Url::parse(href), href.strip_prefix("//")) {
        (Ok(url), _) => url.path().to_string(),
        // Protocol-relative: drop the host.
        (Err(_), Some(rest)) => rest.find('/').map_or("", |idx| &rest[idx..]).to_string(),
        (Err(_), None) => href.to_string(),
    };
    path.split('/').nth(1).unwrap_or_default().to_string()
}

/// Heuristic: a post is a repost when the permalink belongs to someone else.
/// Quote posts and similar variants are not told apart.
pub fn is_repost(href: &str, username: &str) -> bool {
    !permalink_author(href).eq_ignore_ascii_case(username)
}

pub fn recover_text(el: ElementRef<'_>) -> (String, TextSource) {
    if let Some(primary) = patterns::PRIMARY.first_within(el) {
        return (trimmed_text(primary), TextSource::Primary);
    }
    if let Some(alternate) = patterns::ALTERNATES.first_within(el) {
        return (trimmed_text(alternate), TextSource::Alternate);
    }
    (container_text(el), TextSource::Container)
}

fn trimmed_text(el: ElementRef<'_>) -> String {
    el.text().collect::<String>().trim().to_string()
}

/// Whole-container text with noise regions removed, capped and
/// whitespace-collapsed.
pub fn container_text(el: ElementRef<'_>) -> String {
    let noise = patterns::NOISE.all_within(el);
    let mut raw = String::new();
    push_visible_text(el, &noise, &mut raw);

    let capped: String = raw.trim().chars().take(MAX_FALLBACK_CHARS).collect();
    WHITESPACE_RUN.replace_all(&capped, " ").into_owned()
}

fn push_visible_text(el: ElementRef<'_>, noise: &[ElementRef<'_>], out: &mut String) {
    if noise.iter().any(|n| n.id() == el.id()) {
        return;
    }
    for child in el.children() {
        if let Some(child_el) = ElementRef::wrap(child) {
            push_visible_text(child_el, noise, out);
        } else if let Node::Text(text) = child.value() {
            out.push_str(text);
        }
    }
}
