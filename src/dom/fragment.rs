//! Printf-style markup templates.
//!
//! `%s` substitutes an argument verbatim and `%e` substitutes it HTML-escaped.
//! The expanded markup is parsed into detached document nodes; the caller
//! decides where to attach the returned root.

use super::{Container, Document, NodeId};
use crate::error::{ReportError, Result};

const VOID_TAGS: &[&str] = &["br", "hr", "img", "input", "meta", "link", "wbr"];

pub(crate) fn is_void(tag: &str) -> bool {
    VOID_TAGS.contains(&tag)
}

/// Escape text for use in element content or a quoted attribute value.
pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Expand `%s` / `%e` placeholders in order. A `%` followed by anything else
/// is kept as written.
pub fn substitute(template: &str, args: &[&str]) -> Result<String> {
    let mut out = String::with_capacity(template.len());
    let mut next = 0;
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        let raw = match chars.peek() {
            Some('s') => true,
            Some('e') => false,
            _ => {
                out.push(c);
                continue;
            }
        };
        chars.next();
        let arg = args.get(next).ok_or(ReportError::MissingArgument {
            index: next,
            given: args.len(),
        })?;
        next += 1;
        if raw {
            out.push_str(arg);
        } else {
            out.push_str(&escape(arg));
        }
    }

    Ok(out)
}

/// Build a detached node tree from a template and its arguments.
pub fn fragment(doc: &mut Document, template: &str, args: &[&str]) -> Result<NodeId> {
    let markup = substitute(template, args)?;
    parse(doc, &markup)
}

/// Parse a small, well-formed markup snippet with exactly one root element.
pub fn parse(doc: &mut Document, markup: &str) -> Result<NodeId> {
    let mut parser = Parser {
        src: markup,
        pos: 0,
    };
    let mut open: Vec<NodeId> = Vec::new();
    let mut roots: Vec<NodeId> = Vec::new();

    while parser.pos < markup.len() {
        if parser.rest().starts_with("</") {
            let start = parser.pos;
            parser.pos += 2;
            let name = parser.name();
            parser.skip_ws();
            if !parser.eat('>') {
                return Err(parser.error(start, "unterminated closing tag"));
            }
            let Some(top) = open.pop() else {
                return Err(parser.error(start, "closing tag without open element"));
            };
            let expected = doc.tag(top).unwrap_or_default().to_string();
            if expected != name {
                return Err(ReportError::Mismatched {
                    expected,
                    found: name,
                });
            }
        } else if parser.rest().starts_with('<') {
            let el = parser.open_tag(doc)?;
            match open.last() {
                Some(&parent) => doc.append_child(parent, el),
                None => roots.push(el),
            }
            let tag = doc.tag(el).unwrap_or_default();
            if !is_void(tag) {
                open.push(el);
            }
        } else {
            let start = parser.pos;
            let text = parser.text();
            match open.last() {
                Some(&parent) => {
                    let node = doc.create_text(decode_entities(text));
                    doc.append_child(parent, node);
                }
                None if text.trim().is_empty() => {}
                None => return Err(parser.error(start, "text outside of an element")),
            }
        }
    }

    if let Some(&unclosed) = open.last() {
        return Err(ReportError::Unclosed {
            tag: doc.tag(unclosed).unwrap_or_default().to_string(),
        });
    }

    match roots.as_slice() {
        [root] => Ok(*root),
        _ => Err(ReportError::RootCount { count: roots.len() }),
    }
}

struct Parser<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn error(&self, offset: usize, reason: &str) -> ReportError {
        ReportError::Markup {
            offset,
            reason: reason.to_string(),
        }
    }

    fn eat(&mut self, c: char) -> bool {
        if self.rest().starts_with(c) {
            self.pos += c.len_utf8();
            true
        } else {
            false
        }
    }

    fn skip_ws(&mut self) {
        let rest = self.rest();
        self.pos += rest.len() - rest.trim_start().len();
    }

    fn name(&mut self) -> String {
        let rest = self.rest();
        let len = rest
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == ':'))
            .unwrap_or(rest.len());
        self.pos += len;
        rest[..len].to_ascii_lowercase()
    }

    fn text(&mut self) -> &'a str {
        let rest = self.rest();
        let len = rest.find('<').unwrap_or(rest.len());
        self.pos += len;
        &rest[..len]
    }

    fn open_tag(&mut self, doc: &mut Document) -> Result<NodeId> {
        let start = self.pos;
        self.pos += 1;
        let tag = self.name();
        if tag.is_empty() {
            return Err(self.error(start, "expected a tag name"));
        }
        let el = doc.create_element(&tag);

        loop {
            self.skip_ws();
            if self.eat('>') {
                return Ok(el);
            }
            if self.rest().starts_with("/>") {
                self.pos += 2;
                return Ok(el);
            }
            let name = self.name();
            if name.is_empty() {
                return Err(self.error(self.pos, "expected an attribute name"));
            }
            self.skip_ws();
            let value = if self.eat('=') {
                self.skip_ws();
                self.attr_value(start)?
            } else {
                String::new()
            };
            doc.set_attr(el, &name, &value);
        }
    }

    fn attr_value(&mut self, tag_start: usize) -> Result<String> {
        let rest = self.rest();
        let quote = match rest.chars().next() {
            Some(q @ ('"' | '\'')) => q,
            Some(_) => {
                let len = rest
                    .find(|c: char| c.is_whitespace() || c == '>')
                    .unwrap_or(rest.len());
                self.pos += len;
                return Ok(decode_entities(&rest[..len]));
            }
            None => return Err(self.error(tag_start, "unterminated tag")),
        };
        let body = &rest[1..];
        let Some(end) = body.find(quote) else {
            return Err(self.error(tag_start, "unterminated attribute value"));
        };
        self.pos += end + 2;
        Ok(decode_entities(&body[..end]))
    }
}

/// Decode the entities `escape` produces plus numeric references.
fn decode_entities(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        let decoded = rest.find(';').and_then(|semi| {
            let entity = &rest[1..semi];
            let c = match entity {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                "nbsp" => Some('\u{a0}'),
                _ => numeric_entity(entity),
            };
            c.map(|c| (c, semi))
        });
        match decoded {
            Some((c, semi)) => {
                out.push(c);
                rest = &rest[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn numeric_entity(entity: &str) -> Option<char> {
    let digits = entity.strip_prefix('#')?;
    let code = match digits.strip_prefix(['x', 'X']) {
        Some(hex) => u32::from_str_radix(hex, 16).ok()?,
        None => digits.parse().ok()?,
    };
    char::from_u32(code)
}
