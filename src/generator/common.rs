//! Common utilities for document generation.
//!
//! Shared helpers for date formatting, output naming and XML text escaping.

use chrono::{DateTime, Local, Utc};
use std::path::Path;

/// Caps keep `{company}_{stem}_{timestamp}_{suffix}.{ext}` well under the 255 byte name limit.
const MAX_COMPONENT_BYTES: usize = 80;
const MAX_STEM_BYTES: usize = 100;

/// Format the current local date the way the generated policies print it (e.g. "03/14/2025").
pub fn format_generated_date() -> String {
    Local::now().format("%m/%d/%Y").to_string()
}

/// Timestamp used in generated filenames: ISO-8601 with `:` and `.` replaced by `-`.
pub fn filename_timestamp(now: DateTime<Utc>) -> String {
    now.format("%Y-%m-%dT%H-%M-%S-%3fZ").to_string()
}

/// Replace whitespace runs with `_`, then strip anything unsafe in a filename.
pub fn sanitize_name_component(name: &str, fallback: &str) -> String {
    let joined = name.split_whitespace().collect::<Vec<_>>().join("_");
    let cleaned = sanitize_filename::sanitize(joined).replace("..", "_");

    if cleaned.is_empty() {
        return fallback.to_string();
    }
    truncate_to_bytes(&cleaned, MAX_COMPONENT_BYTES).to_string()
}

/// Longest prefix of `value` that fits in `max` bytes without splitting a character.
pub fn truncate_to_bytes(value: &str, max: usize) -> &str {
    if value.len() <= max {
        return value;
    }
    let mut end = max;
    while !value.is_char_boundary(end) {
        end -= 1;
    }
    &value[..end]
}

/// Filename stem (without extension) of a template file.
pub fn template_stem(template_filename: &str) -> &str {
    Path::new(template_filename)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(template_filename)
}

/// `{company}_{templateStem}_{timestamp}.{ext}`
pub fn output_filename(
    company_name: &str,
    template_filename: &str,
    extension: &str,
    now: DateTime<Utc>,
) -> String {
    format!(
        "{}_{}_{}.{}",
        sanitize_name_component(company_name, "company"),
        truncate_to_bytes(template_stem(template_filename), MAX_STEM_BYTES),
        filename_timestamp(now),
        extension
    )
}

/// Insert `_{suffix}` before the extension.
pub fn with_suffix(filename: &str, suffix: &str) -> String {
    match filename.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{stem}_{suffix}.{ext}"),
        _ => format!("{filename}_{suffix}"),
    }
}

pub fn escape_xml_text(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Decode the predefined XML entities and numeric character references.
pub fn unescape_xml_text(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;

    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];
        let Some(semi) = tail.find(';') else {
            out.push_str(tail);
            return out;
        };
        let entity = &tail[1..semi];
        let decoded = match entity {
            "amp" => Some('&'),
            "lt" => Some('<'),
            "gt" => Some('>'),
            "quot" => Some('"'),
            "apos" => Some('\''),
            _ => entity
                .strip_prefix("#x")
                .or_else(|| entity.strip_prefix("#X"))
                .and_then(|hex| u32::from_str_radix(hex, 16).ok())
                .or_else(|| entity.strip_prefix('#').and_then(|dec| dec.parse().ok()))
                .and_then(char::from_u32),
        };
        match decoded {
            Some(ch) => {
                out.push(ch);
                rest = &tail[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}
