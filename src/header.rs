//! OSGi-style header clauses.
//!
//! A header is a `,`-separated list of clauses; each clause is
//! `name[;name...][;attr=value][;directive:=value]`. Directive keys keep their
//! trailing `:` so `resolution:=optional` is stored under `resolution:`.
//! Quoted values may contain separators. Brackets in unquoted values are
//! tracked too, so `version=[1.0,2.0)` stays one attribute.
use anyhow::{anyhow, Result};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Clause {
    pub name: String,
    pub attributes: BTreeMap<String, String>,
}

impl Clause {
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }
}

/// Parse a header value into its clauses.
pub fn parse_header(text: &str) -> Result<Vec<Clause>> {
    let mut clauses = Vec::new();
    for raw_clause in split_top_level(text, ',')? {
        if raw_clause.trim().is_empty() {
            continue;
        }
        let mut names = Vec::new();
        let mut attributes = BTreeMap::new();
        for part in split_top_level(&raw_clause, ';')? {
            let part = part.trim();
            if part.is_empty() {
                return Err(anyhow!("empty element in clause {:?}", raw_clause.trim()));
            }
            match find_unquoted(part, '=') {
                None => {
                    if !attributes.is_empty() {
                        return Err(anyhow!(
                            "name {part:?} follows attributes in clause {:?}",
                            raw_clause.trim()
                        ));
                    }
                    names.push(unquote(part));
                }
                Some(index) => {
                    let key = part[..index].trim();
                    let value = unquote(part[index + 1..].trim());
                    let key = attribute_key(key)
                        .ok_or_else(|| anyhow!("invalid attribute name in {part:?}"))?;
                    attributes.insert(key, value);
                }
            }
        }
        if names.is_empty() {
            return Err(anyhow!("clause {:?} has no name", raw_clause.trim()));
        }
        for name in names {
            clauses.push(Clause {
                name,
                attributes: attributes.clone(),
            });
        }
    }
    Ok(clauses)
}

/// `key:` stays a directive, `key:Type` drops the type, `key` is kept.
fn attribute_key(raw: &str) -> Option<String> {
    if raw.is_empty() {
        return None;
    }
    if let Some(directive) = raw.strip_suffix(':') {
        if directive.is_empty() || directive.contains(':') {
            return None;
        }
        return Some(raw.to_string());
    }
    let name = match raw.split_once(':') {
        Some((name, _type)) => name,
        None => raw,
    };
    if name.is_empty() {
        return None;
    }
    Some(name.to_string())
}

fn split_top_level(text: &str, separator: char) -> Result<Vec<String>> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    let mut depth = 0usize;
    let mut chars = text.chars();
    while let Some(ch) = chars.next() {
        match quote {
            Some(open) => {
                current.push(ch);
                if ch == '\\' {
                    if let Some(next) = chars.next() {
                        current.push(next);
                    }
                } else if ch == open {
                    quote = None;
                }
            }
            None => match ch {
                '"' | '\'' => {
                    quote = Some(ch);
                    current.push(ch);
                }
                '[' | '(' => {
                    depth += 1;
                    current.push(ch);
                }
                ']' | ')' => {
                    depth = depth.saturating_sub(1);
                    current.push(ch);
                }
                _ if ch == separator && depth == 0 => {
                    parts.push(std::mem::take(&mut current));
                }
                _ => current.push(ch),
            },
        }
    }
    if quote.is_some() {
        return Err(anyhow!("unterminated quote in {text:?}"));
    }
    parts.push(current);
    Ok(parts)
}

fn find_unquoted(text: &str, needle: char) -> Option<usize> {
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for (index, ch) in text.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match quote {
            Some(_) if ch == '\\' => escaped = true,
            Some(open) if ch == open => quote = None,
            Some(_) => {}
            None if ch == '"' || ch == '\'' => quote = Some(ch),
            None if ch == needle => return Some(index),
            None => {}
        }
    }
    None
}

fn unquote(text: &str) -> String {
    let mut chars = text.chars();
    let first = chars.next();
    let quoted = matches!(first, Some('"') | Some('\''))
        && text.len() >= 2
        && text.ends_with(first.unwrap_or('"'));
    if !quoted {
        return text.to_string();
    }
    let inner = &text[1..text.len() - 1];
    let mut value = String::with_capacity(inner.len());
    let mut inner_chars = inner.chars();
    while let Some(ch) = inner_chars.next() {
        if ch == '\\' {
            if let Some(next) = inner_chars.next() {
                value.push(next);
            }
        } else {
            value.push(ch);
        }
    }
    value
}

fn is_token(value: &str) -> bool {
    !value.is_empty()
        && value
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '_' || ch == '-')
}

/// Render a value, quoting it unless it is a plain token.
pub fn quote_value(value: &str) -> String {
    if is_token(value) {
        return value.to_string();
    }
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for ch in value.chars() {
        if ch == '"' || ch == '\\' {
            quoted.push('\\');
        }
        quoted.push(ch);
    }
    quoted.push('"');
    quoted
}

/// Render a typed list value: items joined by `,` with embedded commas escaped.
pub fn quote_list<'a>(items: impl IntoIterator<Item = &'a str>) -> String {
    let joined = items
        .into_iter()
        .map(|item| item.replace('\\', "\\\\").replace(',', "\\,"))
        .collect::<Vec<_>>()
        .join(",");
    let mut quoted = String::with_capacity(joined.len() + 2);
    quoted.push('"');
    for ch in joined.chars() {
        if ch == '"' {
            quoted.push('\\');
        }
        quoted.push(ch);
    }
    quoted.push('"');
    quoted
}
