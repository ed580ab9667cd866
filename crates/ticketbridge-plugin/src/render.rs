//! Issue description rendering
//!
//! Templating and CSS inlining belong to the host's email pipeline and are
//! injected as traits. Between the two, every CSS `@import` is removed so a
//! rendered description can never pull in remote stylesheets.

use regex::Regex;
use std::sync::OnceLock;
use tera::{Context, Tera};
use ticketbridge_core::models::Notification;

use crate::error::Result;

const DESCRIPTION_TEMPLATE_NAME: &str = "description.html";
const DESCRIPTION_TEMPLATE: &str = include_str!("../templates/description.html");

/// Turns a notification into issue HTML
pub trait DescriptionRenderer: Send + Sync {
    fn render(&self, notification: &Notification) -> Result<String>;
}

/// Moves `<style>` rules onto the elements they select
pub trait CssInliner: Send + Sync {
    fn inline(&self, html: &str) -> Result<String>;
}

/// Bundled Tera template renderer
pub struct TeraRenderer {
    tera: Tera,
}

impl TeraRenderer {
    pub fn new() -> Result<Self> {
        Self::with_template(DESCRIPTION_TEMPLATE)
    }

    /// Use a custom template. It sees `group` and `event` in its context.
    pub fn with_template(source: &str) -> Result<Self> {
        let mut tera = Tera::default();
        tera.add_raw_template(DESCRIPTION_TEMPLATE_NAME, source)?;
        Ok(Self { tera })
    }
}

impl DescriptionRenderer for TeraRenderer {
    fn render(&self, notification: &Notification) -> Result<String> {
        let mut context = Context::new();
        context.insert("group", &notification.group);
        context.insert("event", &notification.event);
        Ok(self.tera.render(DESCRIPTION_TEMPLATE_NAME, &context)?)
    }
}

/// Leaves the markup untouched, for hosts that inline on delivery.
pub struct KeepStyleBlocks;

impl CssInliner for KeepStyleBlocks {
    fn inline(&self, html: &str) -> Result<String> {
        Ok(html.to_string())
    }
}

fn at_keyword_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)@((?:[a-z0-9_-]|\\[0-9a-f]{1,6}[ \t\r\n\f]?|\\[^0-9a-f\r\n\f])+)")
            .expect("CSS at-keyword pattern is valid")
    })
}

/// Resolve CSS escapes in an identifier and lowercase it, so `\69mport`
/// reads as `import`.
fn decode_identifier(raw: &str) -> String {
    let mut decoded = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '\\' {
            decoded.push(c);
            continue;
        }

        let mut hex = String::new();
        while hex.len() < 6 {
            match chars.peek() {
                Some(h) if h.is_ascii_hexdigit() => {
                    hex.push(*h);
                    chars.next();
                }
                _ => break,
            }
        }

        if hex.is_empty() {
            if let Some(escaped) = chars.next() {
                decoded.push(escaped);
            }
            continue;
        }

        if chars.peek().is_some_and(|w| w.is_ascii_whitespace()) {
            chars.next();
        }
        let code = u32::from_str_radix(&hex, 16)
            .ok()
            .and_then(char::from_u32)
            .unwrap_or(char::REPLACEMENT_CHARACTER);
        decoded.push(code);
    }

    decoded.to_lowercase()
}

/// Byte offset just past the at-rule whose prelude starts at `start`.
///
/// The rule ends at the first `;` outside strings and parentheses, or before
/// a block, a tag, or the end of the input. Comments are skipped.
fn at_rule_end(css: &str, start: usize) -> usize {
    let bytes = css.as_bytes();
    let mut quote: Option<u8> = None;
    let mut depth = 0usize;
    let mut i = start;

    while i < bytes.len() {
        let b = bytes[i];
        match quote {
            Some(q) => {
                if b == b'\\' {
                    i += 1;
                } else if b == q {
                    quote = None;
                }
            }
            None => match b {
                b'\'' | b'"' => quote = Some(b),
                b'/' if bytes.get(i + 1) == Some(&b'*') => {
                    i = css[i + 2..]
                        .find("*/")
                        .map_or(bytes.len(), |end| i + 2 + end + 2);
                    continue;
                }
                b'<' => return i,
                b'(' => depth += 1,
                b')' => depth = depth.saturating_sub(1),
                b';' if depth == 0 => return i + 1,
                b'{' | b'}' if depth == 0 => return i,
                _ => {}
            },
        }
        i += 1;
    }

    bytes.len()
}

fn strip_once(html: &str) -> String {
    let mut stripped = String::with_capacity(html.len());
    let mut cursor = 0;

    for captures in at_keyword_pattern().captures_iter(html) {
        let (Some(rule), Some(name)) = (captures.get(0), captures.get(1)) else {
            continue;
        };
        if rule.start() < cursor || decode_identifier(name.as_str()) != "import" {
            continue;
        }
        stripped.push_str(&html[cursor..rule.start()]);
        cursor = at_rule_end(html, rule.end());
    }

    stripped.push_str(&html[cursor..]);
    stripped
}

/// Remove every CSS `@import` rule from the markup.
///
/// Runs until nothing changes, so removing one rule can never splice the
/// surrounding text into a new one.
pub fn strip_css_imports(html: &str) -> String {
    let mut current = html.to_string();
    loop {
        let next = strip_once(&current);
        if next == current {
            return next;
        }
        current = next;
    }
}

/// Render, sanitize, then inline.
pub fn render_html_body(
    renderer: &dyn DescriptionRenderer,
    inliner: &dyn CssInliner,
    notification: &Notification,
) -> Result<String> {
    let html = renderer.render(notification)?;
    let sanitized = strip_css_imports(&html);
    if sanitized.len() != html.len() {
        tracing::warn!(
            group_id = notification.group.id,
            "Removed CSS @import from issue description"
        );
    }
    inliner.inline(&sanitized)
}
