//! Named-slot prompt templates.
//!
//! Syntax:
//! - `{name}` is a placeholder when `name` matches `[A-Za-z_][A-Za-z0-9_]*`.
//! - `{{` and `}}` render as literal braces.
//! - Any other brace is literal text, so JSON examples embedded in a
//!   template survive rendering untouched.
//!
//! Rendering has exactly one missing-slot rule: a placeholder with no
//! binding renders as the empty string.

use std::collections::BTreeMap;

/// Values bound to placeholder names for one render.
pub type Bindings = BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Slot(String),
}

/// A parsed prompt template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    source: String,
    segments: Vec<Segment>,
}

fn is_ident_start(c: char) -> bool {
    c == '_' || c.is_ascii_alphabetic()
}

fn is_ident_continue(c: char) -> bool {
    c == '_' || c.is_ascii_alphanumeric()
}

impl PromptTemplate {
    /// Parse a template. Parsing never fails: anything that is not a
    /// well-formed placeholder is literal text.
    pub fn parse(source: impl Into<String>) -> Self {
        let source = source.into();
        let mut segments = Vec::new();
        let mut literal = String::new();
        let chars: Vec<char> = source.chars().collect();
        let mut i = 0;

        while i < chars.len() {
            let c = chars[i];
            match c {
                '{' if chars.get(i + 1) == Some(&'{') => {
                    literal.push('{');
                    i += 2;
                }
                '}' if chars.get(i + 1) == Some(&'}') => {
                    literal.push('}');
                    i += 2;
                }
                '{' => {
                    let start = i + 1;
                    let mut end = start;
                    if chars.get(start).copied().is_some_and(is_ident_start) {
                        end += 1;
                        while chars.get(end).copied().is_some_and(is_ident_continue) {
                            end += 1;
                        }
                    }
                    if end > start && chars.get(end) == Some(&'}') {
                        if !literal.is_empty() {
                            segments.push(Segment::Literal(std::mem::take(&mut literal)));
                        }
                        segments.push(Segment::Slot(chars[start..end].iter().collect()));
                        i = end + 1;
                    } else {
                        literal.push('{');
                        i += 1;
                    }
                }
                _ => {
                    literal.push(c);
                    i += 1;
                }
            }
        }
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Self { source, segments }
    }

    /// The raw template text.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Placeholder names in order of first appearance, without duplicates.
    pub fn placeholders(&self) -> Vec<&str> {
        let mut seen = Vec::new();
        for seg in &self.segments {
            if let Segment::Slot(name) = seg {
                if !seen.contains(&name.as_str()) {
                    seen.push(name.as_str());
                }
            }
        }
        seen
    }

    /// Placeholders that `bindings` does not cover.
    pub fn missing<'a>(&'a self, bindings: &Bindings) -> Vec<&'a str> {
        self.placeholders()
            .into_iter()
            .filter(|name| !bindings.contains_key(*name))
            .collect()
    }

    /// Render with `bindings`. Unbound placeholders become empty strings.
    pub fn render(&self, bindings: &Bindings) -> String {
        let mut out = String::with_capacity(self.source.len());
        for seg in &self.segments {
            match seg {
                Segment::Literal(text) => out.push_str(text),
                Segment::Slot(name) => {
                    if let Some(value) = bindings.get(name) {
                        out.push_str(value);
                    }
                }
            }
        }
        out
    }
}

impl From<&str> for PromptTemplate {
    fn from(s: &str) -> Self {
        Self::parse(s)
    }
}
