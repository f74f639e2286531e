//! Injects open and click tracking into outbound HTML.

use regex::Regex;
use std::sync::LazyLock;

use crate::application::services::UrlCodec;
use crate::domain::Metadata;
use crate::error::{AdaptError, MalformedHtmlError};
use crate::utils::html::{decode_entities, escape_attribute};
use crate::utils::tracking_url::is_trackable_url;

/// Metadata key holding a rewritten link's destination.
pub const ORIGINAL_URL_KEY: &str = "original_url";

static SCRIPT_END: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)</script[\s/>]").unwrap());
static STYLE_END: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)</style[\s/>]").unwrap());
static TITLE_END: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)</title[\s/>]").unwrap());
static TEXTAREA_END: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)</textarea[\s/>]").unwrap());

/// Rewrites HTML email bodies for tracking.
///
/// [`HtmlAdapter::adapt`] adds one open pixel and turns every absolute http(s) link into
/// a click-tracking link. The transform is not idempotent: adapt a message exactly once.
#[derive(Clone)]
pub struct HtmlAdapter {
    codec: UrlCodec,
}

impl HtmlAdapter {
    pub fn new(codec: UrlCodec) -> Self {
        Self { codec }
    }

    /// Returns `html` with tracking injected.
    ///
    /// - One 1×1 `<img>` pointing at the open URL for `shared_metadata` is inserted right
    ///   before the last `</body>`, or appended when the document has none.
    /// - Each `<a href>` with an absolute http(s) destination is replaced by a click URL
    ///   whose metadata is `shared_metadata` plus [`ORIGINAL_URL_KEY`]. Relative, anchor,
    ///   `mailto:` and other-scheme links are left as they are.
    ///
    /// Content of comments, `<script>` and `<style>` is never rewritten. Everything the
    /// adapter does not replace is copied byte for byte.
    ///
    /// # Errors
    ///
    /// - [`AdaptError::MalformedHtml`] for an empty document, an unterminated tag, comment
    ///   or quoted attribute, or an unclosed `<script>` / `<style>`
    /// - [`AdaptError::Encoding`] when a tracking URL cannot be built
    pub fn adapt(&self, html: &str, shared_metadata: &Metadata) -> Result<String, AdaptError> {
        if html.trim().is_empty() {
            return Err(MalformedHtmlError::new(0, "empty document").into());
        }

        let scanned = scan(html)?;
        let mut edits: Vec<(Span, String)> = Vec::with_capacity(scanned.hrefs.len() + 1);

        for span in scanned.hrefs {
            let destination = decode_entities(&html[span.inner_start..span.inner_end]);
            let destination = destination.trim();
            if !is_trackable_url(destination) {
                continue;
            }

            let metadata = shared_metadata.clone().with(ORIGINAL_URL_KEY, destination);
            let click_url = self.codec.click_url(destination, &metadata)?;
            edits.push((span, format!("\"{}\"", escape_attribute(&click_url))));
        }

        let pixel_at = scanned.last_body_close.unwrap_or(html.len());
        edits.push((Span::empty(pixel_at), self.pixel_tag(shared_metadata)?));
        edits.sort_by_key(|(span, _)| span.start);

        let mut adapted = String::with_capacity(html.len() + 256 * edits.len());
        let mut cursor = 0;
        for (span, replacement) in edits {
            adapted.push_str(&html[cursor..span.start]);
            adapted.push_str(&replacement);
            cursor = span.end;
        }
        adapted.push_str(&html[cursor..]);

        Ok(adapted)
    }

    /// The `<img>` tag inserted by [`Self::adapt`].
    pub fn pixel_tag(&self, metadata: &Metadata) -> Result<String, AdaptError> {
        let open_url = self.codec.open_url(metadata)?;
        Ok(format!(
            r#"<img src="{}" width="1" height="1" alt="" style="border:0;width:1px;height:1px" />"#,
            escape_attribute(&open_url)
        ))
    }
}

/// Byte range of an attribute value. `start..end` includes the quotes, if any;
/// `inner_start..inner_end` is the raw value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Span {
    start: usize,
    end: usize,
    inner_start: usize,
    inner_end: usize,
}

impl Span {
    fn empty(at: usize) -> Self {
        Self {
            start: at,
            end: at,
            inner_start: at,
            inner_end: at,
        }
    }
}

#[derive(Debug, Default)]
struct ScannedDocument {
    hrefs: Vec<Span>,
    last_body_close: Option<usize>,
}

struct Tag<'a> {
    name: &'a str,
    attributes: Vec<(&'a str, Span)>,
    self_closing: bool,
    end: usize,
}

impl Tag<'_> {
    fn attribute(&self, name: &str) -> Option<Span> {
        self.attributes
            .iter()
            .find(|(attr, _)| attr.eq_ignore_ascii_case(name))
            .map(|(_, span)| *span)
    }
}

fn scan(html: &str) -> Result<ScannedDocument, MalformedHtmlError> {
    let bytes = html.as_bytes();
    let mut doc = ScannedDocument::default();
    let mut pos = 0;

    while let Some(found) = html[pos..].find('<') {
        let lt = pos + found;

        match bytes.get(lt + 1).copied() {
            Some(b'!') if html[lt..].starts_with("<!--") => {
                let close = html[lt + 4..]
                    .find("-->")
                    .ok_or_else(|| MalformedHtmlError::new(lt, "unterminated comment"))?;
                pos = lt + 4 + close + 3;
            }
            Some(b'!') | Some(b'?') => {
                let close = html[lt..]
                    .find('>')
                    .ok_or_else(|| MalformedHtmlError::new(lt, "unterminated declaration"))?;
                pos = lt + close + 1;
            }
            Some(b'/') => {
                let tag = parse_tag(html, lt, lt + 2)?;
                if tag.name.eq_ignore_ascii_case("body") {
                    doc.last_body_close = Some(lt);
                }
                pos = tag.end;
            }
            Some(c) if c.is_ascii_alphabetic() => {
                let tag = parse_tag(html, lt, lt + 1)?;

                if tag.name.eq_ignore_ascii_case("a") {
                    if let Some(href) = tag.attribute("href") {
                        doc.hrefs.push(href);
                    }
                }

                let raw_text_end = if tag.self_closing {
                    None
                } else if tag.name.eq_ignore_ascii_case("script") {
                    Some((&*SCRIPT_END, "unclosed script element"))
                } else if tag.name.eq_ignore_ascii_case("style") {
                    Some((&*STYLE_END, "unclosed style element"))
                } else if tag.name.eq_ignore_ascii_case("title") {
                    Some((&*TITLE_END, "unclosed title element"))
                } else if tag.name.eq_ignore_ascii_case("textarea") {
                    Some((&*TEXTAREA_END, "unclosed textarea element"))
                } else {
                    None
                };

                pos = match raw_text_end {
                    Some((closer, reason)) => {
                        let m = closer
                            .find(&html[tag.end..])
                            .ok_or_else(|| MalformedHtmlError::new(lt, reason))?;
                        tag.end + m.start()
                    }
                    None => tag.end,
                };
            }
            _ => pos = lt + 1,
        }
    }

    Ok(doc)
}

/// Parses a start or end tag whose name begins at `name_start`.
fn parse_tag(html: &str, lt: usize, name_start: usize) -> Result<Tag<'_>, MalformedHtmlError> {
    let bytes = html.as_bytes();
    let len = bytes.len();
    let unterminated = || MalformedHtmlError::new(lt, "unterminated tag");

    let mut i = name_start;
    while i < len && !is_tag_delimiter(bytes[i]) {
        i += 1;
    }
    let name = &html[name_start..i];

    let mut attributes = Vec::new();
    loop {
        i = skip_whitespace(bytes, i);
        if i >= len {
            return Err(unterminated());
        }

        match bytes[i] {
            b'>' => {
                return Ok(Tag {
                    name,
                    attributes,
                    self_closing: false,
                    end: i + 1,
                });
            }
            b'/' if bytes.get(i + 1) == Some(&b'>') => {
                return Ok(Tag {
                    name,
                    attributes,
                    self_closing: true,
                    end: i + 2,
                });
            }
            b'/' => i += 1,
            _ => {
                // First character always belongs to the name, even `=` or a quote.
                let attr_start = i;
                i += 1;
                while i < len && !is_tag_delimiter(bytes[i]) && bytes[i] != b'=' {
                    i += 1;
                }
                let attr_name = &html[attr_start..i];

                i = skip_whitespace(bytes, i);
                if bytes.get(i) != Some(&b'=') {
                    continue;
                }

                i = skip_whitespace(bytes, i + 1);
                if i >= len {
                    return Err(unterminated());
                }

                let span = match bytes[i] {
                    quote @ (b'"' | b'\'') => {
                        let close = html[i + 1..].find(quote as char).ok_or_else(|| {
                            MalformedHtmlError::new(i, "unterminated quoted attribute")
                        })?;
                        let inner_end = i + 1 + close;
                        Span {
                            start: i,
                            end: inner_end + 1,
                            inner_start: i + 1,
                            inner_end,
                        }
                    }
                    _ => {
                        let value_start = i;
                        while i < len && !bytes[i].is_ascii_whitespace() && bytes[i] != b'>' {
                            i += 1;
                        }
                        Span {
                            start: value_start,
                            end: i,
                            inner_start: value_start,
                            inner_end: i,
                        }
                    }
                };

                i = span.end;
                attributes.push((attr_name, span));
            }
        }
    }
}

fn is_tag_delimiter(b: u8) -> bool {
    b.is_ascii_whitespace() || b == b'/' || b == b'>'
}

fn skip_whitespace(bytes: &[u8], mut i: usize) -> usize {
    while i < bytes.len() && bytes[i].is_ascii_whitespace() {
        i += 1;
    }
    i
}
