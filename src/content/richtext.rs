//! Prismic structured text serialization
//!
//! Blocks arrive as opaque JSON and are only interpreted here, when a page is
//! rendered. Unknown block types are skipped; span offsets are UTF-16 code
//! unit offsets, as produced by the Prismic editor.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::cms::link_resolver;
use crate::helpers::html_escape;

/// One structured text node, kept exactly as the CMS sent it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RichTextBlock(pub Value);

impl RichTextBlock {
    /// Block type (`paragraph`, `heading2`, `list-item`, ...)
    pub fn kind(&self) -> &str {
        self.0.get("type").and_then(Value::as_str).unwrap_or("")
    }

    /// Plain text of the block
    pub fn text(&self) -> &str {
        self.0.get("text").and_then(Value::as_str).unwrap_or("")
    }

    fn str_field(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    fn spans(&self) -> Vec<Span> {
        self.0
            .get("spans")
            .and_then(|spans| Vec::<Span>::deserialize(spans).ok())
            .unwrap_or_default()
    }
}

impl From<Value> for RichTextBlock {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

#[derive(Debug, Clone, Deserialize)]
struct Span {
    start: usize,
    end: usize,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    data: Value,
}

impl Span {
    fn open_tag(&self) -> String {
        match self.kind.as_str() {
            "strong" => "<strong>".to_string(),
            "em" => "<em>".to_string(),
            "hyperlink" => {
                let field = |key: &str| self.data.get(key).and_then(Value::as_str);
                // Links to other documents carry no URL of their own
                let url = match field("link_type") {
                    Some("Document") => link_resolver(field("type").unwrap_or(""), field("uid")),
                    _ => field("url").unwrap_or("#").to_string(),
                };
                match field("target") {
                    Some(target) => format!(
                        r#"<a href="{}" target="{}" rel="noopener">"#,
                        html_escape(&url),
                        html_escape(target)
                    ),
                    None => format!(r#"<a href="{}">"#, html_escape(&url)),
                }
            }
            "label" => {
                let label = self
                    .data
                    .get("label")
                    .and_then(Value::as_str)
                    .unwrap_or("label");
                format!(r#"<span class="{}">"#, html_escape(label))
            }
            _ => String::new(),
        }
    }

    fn close_tag(&self) -> &'static str {
        match self.kind.as_str() {
            "strong" => "</strong>",
            "em" => "</em>",
            "hyperlink" => "</a>",
            "label" => "</span>",
            _ => "",
        }
    }
}

/// Serialize blocks to HTML, in order
pub fn as_html(blocks: &[RichTextBlock]) -> String {
    let mut out = String::new();
    let mut list: Option<&'static str> = None;

    for block in blocks {
        let wanted = match block.kind() {
            "list-item" => Some("ul"),
            "o-list-item" => Some("ol"),
            _ => None,
        };
        if list != wanted {
            if let Some(tag) = list {
                out.push_str(&format!("</{}>", tag));
            }
            if let Some(tag) = wanted {
                out.push_str(&format!("<{}>", tag));
            }
            list = wanted;
        }
        out.push_str(&block_html(block));
    }

    if let Some(tag) = list {
        out.push_str(&format!("</{}>", tag));
    }
    out
}

/// Plain text of all blocks, joined by spaces
pub fn as_text(blocks: &[RichTextBlock]) -> String {
    blocks
        .iter()
        .map(RichTextBlock::text)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn block_html(block: &RichTextBlock) -> String {
    let kind = block.kind();
    match kind {
        "paragraph" => format!("<p>{}</p>", serialize_spans(block.text(), &block.spans())),
        "preformatted" => format!(
            "<pre>{}</pre>",
            serialize_spans(block.text(), &block.spans())
        ),
        "list-item" | "o-list-item" => {
            format!("<li>{}</li>", serialize_spans(block.text(), &block.spans()))
        }
        "heading1" | "heading2" | "heading3" | "heading4" | "heading5" | "heading6" => {
            let level = &kind["heading".len()..];
            format!(
                "<h{}>{}</h{}>",
                level,
                serialize_spans(block.text(), &block.spans()),
                level
            )
        }
        "image" => {
            let url = block.str_field("url").unwrap_or("");
            let alt = block.str_field("alt").unwrap_or("");
            format!(
                r#"<p class="block-img"><img src="{}" alt="{}" /></p>"#,
                html_escape(url),
                html_escape(alt)
            )
        }
        "embed" => {
            let oembed = block.0.get("oembed").cloned().unwrap_or(Value::Null);
            let field = |key: &str| {
                oembed
                    .get(key)
                    .and_then(Value::as_str)
                    .unwrap_or("")
                    .to_string()
            };
            format!(
                r#"<div data-oembed="{}" data-oembed-type="{}" data-oembed-provider="{}">{}</div>"#,
                html_escape(&field("embed_url")),
                html_escape(&field("type")),
                html_escape(&field("provider_name")),
                field("html")
            )
        }
        other => {
            tracing::debug!("Skipping rich text block of type {:?}", other);
            String::new()
        }
    }
}

/// Wrap text in its span markup, keeping tags properly nested
fn serialize_spans(text: &str, spans: &[Span]) -> String {
    let mut spans: Vec<&Span> = spans.iter().filter(|s| s.start < s.end).collect();
    // Outer spans (earlier start, later end) open first
    spans.sort_by(|a, b| a.start.cmp(&b.start).then(b.end.cmp(&a.end)));

    let mut out = String::with_capacity(text.len());
    let mut open: Vec<&Span> = Vec::new();
    let mut pending = spans.into_iter().peekable();
    let mut pos = 0usize;

    for c in text.chars() {
        close_ended(&mut out, &mut open, pos);
        while let Some(span) = pending.next_if(|s| s.start <= pos) {
            out.push_str(&span.open_tag());
            open.push(span);
        }
        match c {
            '\n' => out.push_str("<br />"),
            _ => out.push_str(&html_escape(c.encode_utf8(&mut [0; 4]))),
        }
        pos += c.len_utf16();
    }

    for span in open.iter().rev() {
        out.push_str(span.close_tag());
    }
    out
}

/// Close every span ending at `pos`, reopening the ones above it that continue
fn close_ended<'a>(out: &mut String, open: &mut Vec<&'a Span>, pos: usize) {
    let Some(depth) = open.iter().position(|s| s.end <= pos) else {
        return;
    };
    let closed: Vec<&Span> = open.drain(depth..).collect();
    for span in closed.iter().rev() {
        out.push_str(span.close_tag());
    }
    for span in closed {
        if span.end > pos {
            out.push_str(&span.open_tag());
            open.push(span);
        }
    }
}
