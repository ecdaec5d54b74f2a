use crate::error::ScrapeError;
use crate::fetch::preview;
use crate::patterns::{self, SelectorTable, POST_CLASS_MARKERS};
use scraper::{ElementRef, Html};
use tracing::{debug, info, warn};

const BODY_SNIPPET_CHARS: usize = 1500;

/// Which rule produced the candidate set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocatedBy {
    Pattern(&'static str),
    ClassMarker,
}

#[derive(Debug)]
pub struct Located<'a> {
    pub by: LocatedBy,
    pub elements: Vec<ElementRef<'a>>,
}

/// What an empty page looked like, for logging only.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmptyPageDiagnostics {
    pub timeline_containers: usize,
    pub empty_state_panels: usize,
    pub empty_state_message: Option<String>,
    pub body_snippet: String,
}

/// Locate post containers using the built-in pattern table.
pub fn locate_posts(doc: &Html) -> Result<Located<'_>, ScrapeError> {
    locate_posts_with(doc, &patterns::CONTAINERS)
}

pub fn locate_posts_with<'a>(
    doc: &'a Html,
    table: &SelectorTable,
) -> Result<Located<'a>, ScrapeError> {
    if let Some((css, elements)) = table.first_non_empty(doc) {
        info!(count = elements.len(), selector = css, "found post containers");
        return Ok(Located {
            by: LocatedBy::Pattern(css),
            elements,
        });
    }

    debug!("no preferred container pattern matched, scanning class names");
    let elements: Vec<_> = doc
        .select(&patterns::ANY_ELEMENT)
        .filter(|el| has_post_marker(*el))
        .collect();
    if !elements.is_empty() {
        info!(count = elements.len(), "found post containers by class marker");
        return Ok(Located {
            by: LocatedBy::ClassMarker,
            elements,
        });
    }

    let diag = diagnose_empty(doc);
    warn!(
        timeline_containers = diag.timeline_containers,
        empty_state_panels = diag.empty_state_panels,
        message = diag.empty_state_message.as_deref().unwrap_or(""),
        "no post elements found"
    );
    debug!(body = %diag.body_snippet, "body snippet");
    Err(ScrapeError::NoPostsFound)
}

fn has_post_marker(el: ElementRef<'_>) -> bool {
    let Some(class) = el.value().attr("class") else {
        return false;
    };
    let class = class.to_ascii_lowercase();
    POST_CLASS_MARKERS.iter().any(|marker| class.contains(marker))
}

pub fn diagnose_empty(doc: &Html) -> EmptyPageDiagnostics {
    let empty_state_message = patterns::EMPTY_PANELS
        .first_in(doc)
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|msg| !msg.is_empty());
    let body_snippet = doc
        .select(&patterns::BODY)
        .next()
        .map(|body| {
            let inner = body.inner_html();
            let cut = preview(&inner, BODY_SNIPPET_CHARS);
            if cut.len() < inner.len() {
                format!("{cut}...")
            } else {
                cut.to_string()
            }
        })
        .unwrap_or_default();
    EmptyPageDiagnostics {
        timeline_containers: patterns::TIMELINES.count(doc),
        empty_state_panels: patterns::EMPTY_PANELS.count(doc),
        empty_state_message,
        body_snippet,
    }
}
