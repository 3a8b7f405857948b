//! Label matcher normalization.
//!
//! A route can state its label conditions four different ways. Everything downstream works on
//! the canonical [ObjectMatcher] triple, so [normalize_matchers] folds the legacy forms into one
//! list, and [matcher_to_string] / [parse_matcher] convert between the triple and the string form
//! used by the `matchers` field.
use once_cell::sync::Lazy;
use regex::Regex;

use crate::{
    properties::{MatcherOperator, ObjectMatcher, Route},
    PolicyError,
};

/// `name op value`, where the name is either bare or a double quoted string with `\` escapes.
/// Values may span lines.
static MATCHER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?s)^\s*("(?:[^"\\]|\\.)*"|[^\s"=!~]+)\s*(=~|!~|!=|=)\s*(.*?)\s*$"#)
        .expect("static matcher expression is valid")
});

fn needs_quoting(input: &str) -> bool {
    input.is_empty()
        || input.starts_with('~')
        || input
            .chars()
            .any(|c| c.is_whitespace() || c == '"' || c == '\\')
}

fn is_quoted(input: &str) -> bool {
    input.len() >= 2 && input.starts_with('"') && input.ends_with('"')
}

/// Wrap `input` in double quotes, escaping `\` and `"`, if it would not survive bare.
pub fn quote_with_escape(input: &str) -> String {
    if !needs_quoting(input) {
        return input.to_string();
    }
    let mut quoted = String::with_capacity(input.len() + 2);
    quoted.push('"');
    for c in input.chars() {
        if c == '\\' || c == '"' {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    quoted
}

/// Strip one level of double quoting, resolving `\\` and `\"`. Bare input is returned as is.
pub fn unquote_with_unescape(input: &str) -> String {
    if !is_quoted(input) {
        return input.to_string();
    }
    let inner = &input[1..input.len() - 1];
    let mut unescaped = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some(escaped) => unescaped.push(escaped),
                None => unescaped.push('\\'),
            }
        } else {
            unescaped.push(c);
        }
    }
    unescaped
}

/// String form of a matcher, e.g. `severity="very bad"`.
pub fn matcher_to_string(matcher: &ObjectMatcher) -> String {
    let name = if matcher.name().contains(&['=', '!', '~'][..]) {
        // Bare names stop at the first operator character.
        let mut quoted = quote_with_escape(matcher.name());
        if !is_quoted(&quoted) {
            quoted = format!("\"{quoted}\"");
        }
        quoted
    } else {
        quote_with_escape(matcher.name())
    };
    format!(
        "{}{}{}",
        name,
        matcher.operator(),
        quote_with_escape(matcher.value())
    )
}

/// Parse one matcher in string form. Quoted names and values are unquoted.
pub fn parse_matcher(input: &str) -> Result<ObjectMatcher, PolicyError> {
    let captures = MATCHER_RE.captures(input).ok_or_else(|| {
        PolicyError::InvalidMatcher(format!("'{input}' is not a valid label matcher"))
    })?;
    let name = unquote_with_unescape(&captures[1]);
    if name.is_empty() {
        return Err(PolicyError::InvalidMatcher(format!(
            "'{input}' has an empty label name"
        )));
    }
    let operator = captures[2].parse::<MatcherOperator>()?;
    let value = unquote_with_unescape(&captures[3]);
    Ok(ObjectMatcher(name, operator, value))
}

/// Parse a comma separated matcher list such as `{severity="critical", team=~"ops|sre"}`.
///
/// Commas inside quoted segments do not split. Empty entries are skipped.
pub fn parse_matchers(input: &str) -> Result<Vec<ObjectMatcher>, PolicyError> {
    let trimmed = input.trim();
    let body = trimmed
        .strip_prefix('{')
        .and_then(|rest| rest.strip_suffix('}'))
        .unwrap_or(trimmed);

    let mut parts = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut escaped = false;
    for c in body.chars() {
        if escaped {
            escaped = false;
        } else if c == '\\' && in_quotes {
            escaped = true;
        } else if c == '"' {
            in_quotes = !in_quotes;
        } else if c == ',' && !in_quotes {
            parts.push(std::mem::take(&mut current));
            continue;
        }
        current.push(c);
    }
    parts.push(current);

    parts
        .iter()
        .filter(|part| !part.trim().is_empty())
        .map(|part| parse_matcher(part))
        .collect()
}

/// Fold every matcher declaration of `route` into canonical triples.
///
/// Output order: `matchers` strings, then `object_matchers`, then `match_re`, then `match`.
pub fn normalize_matchers(route: &Route) -> Result<Vec<ObjectMatcher>, PolicyError> {
    let mut normalized = Vec::new();
    if let Some(matchers) = &route.matchers {
        for matcher in matchers {
            normalized.push(parse_matcher(matcher)?);
        }
    }
    if let Some(object_matchers) = &route.object_matchers {
        normalized.extend(object_matchers.iter().cloned());
    }
    if let Some(match_re) = &route.match_re {
        normalized.extend(
            match_re
                .iter()
                .map(|(name, value)| ObjectMatcher::new(name, MatcherOperator::Regex, value)),
        );
    }
    if let Some(match_labels) = &route.match_labels {
        normalized.extend(
            match_labels
                .iter()
                .map(|(name, value)| ObjectMatcher::new(name, MatcherOperator::Equal, value)),
        );
    }
    Ok(normalized)
}

/// Literal matcher comparison that ignores one level of quoting on either side, so that
/// `foo=bar` and `"foo"="bar"` compare equal. Operators are compared, not interpreted.
pub fn matchers_equal(lhs: &ObjectMatcher, rhs: &ObjectMatcher) -> bool {
    lhs.operator() == rhs.operator()
        && unquote_with_unescape(lhs.name()) == unquote_with_unescape(rhs.name())
        && unquote_with_unescape(lhs.value()) == unquote_with_unescape(rhs.value())
}
