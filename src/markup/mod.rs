//! Markup rendering for note bodies
//!
//! Renders CommonMark (plus the GitHub-style extensions enabled in config) to
//! HTML that is safe to embed: raw HTML in the source is escaped as text and
//! links or images with script-capable URL schemes are neutralized.

use pulldown_cmark::{html, CowStr, Event, Options, Parser, Tag};
use serde::Deserialize;

/// Turns raw note markup into display markup
pub trait MarkupRenderer: Send + Sync {
    fn render(&self, text: &str) -> String;
}

/// Markdown extensions toggled from config
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct MarkupConfig {
    pub tables: bool,
    pub strikethrough: bool,
    pub tasklists: bool,
}

impl Default for MarkupConfig {
    fn default() -> Self {
        Self {
            tables: true,
            strikethrough: true,
            tasklists: true,
        }
    }
}

impl MarkupConfig {
    fn options(&self) -> Options {
        let mut options = Options::empty();
        options.set(Options::ENABLE_TABLES, self.tables);
        options.set(Options::ENABLE_STRIKETHROUGH, self.strikethrough);
        options.set(Options::ENABLE_TASKLISTS, self.tasklists);
        options
    }
}

const UNSAFE_SCHEMES: [&str; 3] = ["javascript:", "vbscript:", "data:"];

/// CommonMark renderer backed by pulldown-cmark
#[derive(Debug, Clone)]
pub struct CommonMarkRenderer {
    options: Options,
}

impl CommonMarkRenderer {
    pub fn new(config: MarkupConfig) -> Self {
        Self {
            options: config.options(),
        }
    }
}

impl Default for CommonMarkRenderer {
    fn default() -> Self {
        Self::new(MarkupConfig::default())
    }
}

impl MarkupRenderer for CommonMarkRenderer {
    fn render(&self, text: &str) -> String {
        let events = Parser::new_ext(text, self.options).map(sanitize);
        let mut out = String::with_capacity(text.len() * 3 / 2);
        html::push_html(&mut out, events);
        out
    }
}

fn sanitize(event: Event<'_>) -> Event<'_> {
    match event {
        Event::Html(raw) | Event::InlineHtml(raw) => Event::Text(raw),
        Event::Start(Tag::Link {
            link_type,
            dest_url,
            title,
            id,
        }) => Event::Start(Tag::Link {
            link_type,
            dest_url: safe_url(dest_url),
            title,
            id,
        }),
        Event::Start(Tag::Image {
            link_type,
            dest_url,
            title,
            id,
        }) => Event::Start(Tag::Image {
            link_type,
            dest_url: safe_url(dest_url),
            title,
            id,
        }),
        other => other,
    }
}

fn safe_url(url: CowStr<'_>) -> CowStr<'_> {
    let normalized: String = url
        .chars()
        .filter(|c| !c.is_whitespace() && !c.is_control())
        .collect::<String>()
        .to_ascii_lowercase();
    if UNSAFE_SCHEMES.iter().any(|s| normalized.starts_with(s)) {
        CowStr::Borrowed("#")
    } else {
        url
    }
}
