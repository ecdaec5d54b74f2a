//! Priority-ordered CSS pattern tables for the mirror markup variants we know
//! about. Supporting a new variant means adding a row here.
use anyhow::{anyhow, Result};
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};

/// Post containers, most specific first. Pinned posts are excluded.
pub const POST_CONTAINERS: &[&str] = &[
    ".timeline-item:not(.pinned)",
    ".tweet-card:not(.pinned)",
    ".tweet:not(.pinned)",
    ".timeline-tweet",
    ".main-tweet",
    ".tweet-body",
];

/// Case-insensitive class markers used by the generic container scan.
pub const POST_CLASS_MARKERS: &[&str] = &["tweet", "post"];

/// The dedicated permalink element inside a post.
pub const PERMALINK: &[&str] = &[".tweet-link"];

/// Primary content area.
pub const PRIMARY_CONTENT: &[&str] = &[".tweet-content"];

/// Alternative content areas tried when the primary one is missing.
pub const ALTERNATE_CONTENT: &[&str] = &[
    ".tweet-text",
    ".timeline-tweet-text",
    ".post-content",
    ".tweet-body p",
    ".tweet-content-wrapper",
];

/// Regions stripped before falling back to the container's whole text.
pub const NOISE_REGIONS: &[&str] = &[
    ".tweet-stats",
    ".tweet-footer",
    ".tweet-date",
    ".tweet-header",
    ".tweet-media",
    ".tweet-reactions",
    ".tweet-info",
    ".tweet-name",
];

/// Timeline wrappers, only consulted for diagnostics.
pub const TIMELINE_CONTAINERS: &[&str] = &[".timeline", ".timeline-container"];

/// Error or empty-account panels, only consulted for diagnostics.
pub const EMPTY_STATES: &[&str] = &[".error-panel", ".empty-state"];

/// A compiled, ordered list of selectors.
#[derive(Debug, Clone)]
pub struct SelectorTable {
    entries: Vec<(&'static str, Selector)>,
}

impl SelectorTable {
    pub fn compile(patterns: &[&'static str]) -> Result<Self> {
        let entries = patterns
            .iter()
            .map(|css| {
                Selector::parse(css)
                    .map(|sel| (*css, sel))
                    .map_err(|err| anyhow!("invalid selector {css:?}: {err:?}"))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { entries })
    }

    /// Matches of the first pattern that selects anything in the document.
    pub fn first_non_empty<'a>(&self, doc: &'a Html) -> Option<(&'static str, Vec<ElementRef<'a>>)> {
        self.entries.iter().find_map(|(css, sel)| {
            let found: Vec<_> = doc.select(sel).collect();
            (!found.is_empty()).then_some((*css, found))
        })
    }

    /// First descendant of `el` matched by the highest-priority pattern.
    pub fn first_within<'a>(&self, el: ElementRef<'a>) -> Option<ElementRef<'a>> {
        self.entries
            .iter()
            .find_map(|(_, sel)| el.select(sel).next())
    }

    /// Every descendant of `el` matched by any pattern.
    pub fn all_within<'a>(&self, el: ElementRef<'a>) -> Vec<ElementRef<'a>> {
        self.entries
            .iter()
            .flat_map(|(_, sel)| el.select(sel))
            .collect()
    }

    /// Total matches across every pattern in the document.
    pub fn count(&self, doc: &Html) -> usize {
        self.entries.iter().map(|(_, sel)| doc.select(sel).count()).sum()
    }

    /// First document match across the table, in pattern order.
    pub fn first_in<'a>(&self, doc: &'a Html) -> Option<ElementRef<'a>> {
        self.entries.iter().find_map(|(_, sel)| doc.select(sel).next())
    }
}

fn builtin(patterns: &[&'static str]) -> SelectorTable {
    SelectorTable::compile(patterns).expect("built-in selector tables are valid")
}

pub static CONTAINERS: Lazy<SelectorTable> = Lazy::new(|| builtin(POST_CONTAINERS));
pub static PERMALINKS: Lazy<SelectorTable> = Lazy::new(|| builtin(PERMALINK));
pub static PRIMARY: Lazy<SelectorTable> = Lazy::new(|| builtin(PRIMARY_CONTENT));
pub static ALTERNATES: Lazy<SelectorTable> = Lazy::new(|| builtin(ALTERNATE_CONTENT));
pub static NOISE: Lazy<SelectorTable> = Lazy::new(|| builtin(NOISE_REGIONS));
pub static TIMELINES: Lazy<SelectorTable> = Lazy::new(|| builtin(TIMELINE_CONTAINERS));
pub static EMPTY_PANELS: Lazy<SelectorTable> = Lazy::new(|| builtin(EMPTY_STATES));
pub static ANCHORS: Lazy<Selector> = Lazy::new(|| Selector::parse("a[href]").expect("anchor selector"));
pub static ANY_ELEMENT: Lazy<Selector> = Lazy::new(|| Selector::parse("*").expect("universal selector"));
pub static BODY: Lazy<Selector> = Lazy::new(|| Selector::parse("body").expect("body selector"));
