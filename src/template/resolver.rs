//! Maps a client-supplied template identifier to a stored template file.
//!
//! Clients send identifiers in inconsistent shapes (with or without
//! extension, different case, display names). Matching runs in fixed tiers;
//! each tier is checked against every candidate before the next one.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref EXTENSION: Regex = Regex::new(r"\.\w+$").expect("valid extension pattern");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchTier {
    Exact,
    WithoutExtension,
    IgnoreCase,
    Contains,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TemplateMatch<'a> {
    pub filename: &'a str,
    pub tier: MatchTier,
}

fn strip_extension(name: &str) -> &str {
    match EXTENSION.find(name) {
        Some(m) => &name[..m.start()],
        None => name,
    }
}

fn normalize(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .collect()
}

pub fn resolve_template<'a, S: AsRef<str>>(
    requested: &str,
    candidates: &'a [S],
) -> Option<TemplateMatch<'a>> {
    let requested = requested.trim();
    let requested_stem = strip_extension(requested);
    if requested_stem.is_empty() {
        return None;
    }

    let mut sorted: Vec<&'a str> = candidates.iter().map(AsRef::as_ref).collect();
    sorted.sort_unstable();

    let requested_lower = requested_stem.to_lowercase();
    let requested_normalized = normalize(requested_stem);

    first_match(&sorted, MatchTier::Exact, |f| f == requested)
        .or_else(|| {
            first_match(&sorted, MatchTier::WithoutExtension, |f| {
                strip_extension(f) == requested_stem
            })
        })
        .or_else(|| {
            first_match(&sorted, MatchTier::IgnoreCase, |f| {
                strip_extension(f).to_lowercase() == requested_lower
            })
        })
        .or_else(|| {
            first_match(&sorted, MatchTier::Contains, |f| {
                normalize(f).contains(&requested_normalized)
            })
        })
}

fn first_match<'a>(
    sorted: &[&'a str],
    tier: MatchTier,
    pred: impl Fn(&str) -> bool,
) -> Option<TemplateMatch<'a>> {
    sorted
        .iter()
        .copied()
        .find(|f| pred(f))
        .map(|filename| TemplateMatch { filename, tier })
}
