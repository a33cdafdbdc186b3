//! Best-effort syntax highlighting for test bodies.
//!
//! An ordered list of regex rules claims spans of the source. A rule only
//! sees text no earlier rule has claimed, so spans never overlap. This is not
//! a tokenizer: a keyword inside a string that an earlier rule missed will
//! still be marked.

use std::sync::LazyLock;

use regex::Regex;

use crate::dom::escape;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Comment,
    String,
    Number,
    Keyword,
    Init,
}

impl Category {
    pub fn as_class(&self) -> &'static str {
        match self {
            Category::Comment => "comment",
            Category::String => "string",
            Category::Number => "number",
            Category::Keyword => "keyword",
            Category::Init => "init",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    pub category: Option<Category>,
    pub text: String,
}

struct Rule {
    pattern: Regex,
    /// Category per capture group; group 0 is used when this has one entry
    /// and the pattern has no groups.
    groups: &'static [Category],
}

const KEYWORDS: &str = r"\b(?:function|new|throw|return|var|let|const|if|else|for|while|do|switch|case|break|continue|try|catch|finally|typeof|instanceof|delete|in|of|this|null|undefined|true|false|async|await|yield|class|extends)\b";

static RULES: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    let rule = |pattern: &str, groups: &'static [Category]| Rule {
        pattern: Regex::new(pattern).expect("highlight rule must compile"),
        groups,
    };
    vec![
        rule(r"/\*[\s\S]*?\*/", &[Category::Comment]),
        rule(r"//[^\n]*", &[Category::Comment]),
        rule(r#"'(?:[^'\\\n]|\\.)*'|"(?:[^"\\\n]|\\.)*""#, &[Category::String]),
        rule(r"\b\d+\.\d+\b", &[Category::Number]),
        rule(r"\b\d+\b", &[Category::Number]),
        rule(r"\b(new)[ \t]+([A-Za-z_$][\w$]*)", &[Category::Keyword, Category::Init]),
        rule(KEYWORDS, &[Category::Keyword]),
    ]
});

/// Split `source` into plain and categorized spans.
pub fn highlight(source: &str) -> Vec<Span> {
    let mut spans = vec![Span {
        category: None,
        text: source.to_string(),
    }];

    for rule in RULES.iter() {
        spans = spans
            .into_iter()
            .flat_map(|span| match span.category {
                Some(_) => vec![span],
                None => apply(rule, &span.text),
            })
            .collect();
    }

    spans.retain(|s| !s.text.is_empty());
    spans
}

fn apply(rule: &Rule, text: &str) -> Vec<Span> {
    let mut out = Vec::new();
    let mut last = 0;

    for caps in rule.pattern.captures_iter(text) {
        let Some(whole) = caps.get(0) else { continue };
        push_plain(&mut out, &text[last..whole.start()]);

        if caps.len() == 1 {
            out.push(Span {
                category: rule.groups.first().copied(),
                text: whole.as_str().to_string(),
            });
        } else {
            // Text between groups stays plain.
            let mut cursor = whole.start();
            for (i, category) in rule.groups.iter().enumerate() {
                let Some(group) = caps.get(i + 1) else { continue };
                push_plain(&mut out, &text[cursor..group.start()]);
                out.push(Span {
                    category: Some(*category),
                    text: group.as_str().to_string(),
                });
                cursor = group.end();
            }
            push_plain(&mut out, &text[cursor..whole.end()]);
        }
        last = whole.end();
    }

    push_plain(&mut out, &text[last..]);
    out
}

fn push_plain(out: &mut Vec<Span>, text: &str) {
    if !text.is_empty() {
        out.push(Span {
            category: None,
            text: text.to_string(),
        });
    }
}

/// Render highlighted source as escaped markup with `<span class="…">` wrappers.
pub fn highlight_html(source: &str) -> String {
    highlight(source)
        .into_iter()
        .map(|span| match span.category {
            Some(category) => format!(
                "<span class=\"{}\">{}</span>",
                category.as_class(),
                escape(&span.text)
            ),
            None => escape(&span.text),
        })
        .collect()
}
