//! Placeholder names understood by the renderers.

use lazy_static::lazy_static;
use regex::Regex;

use super::common::format_generated_date;

lazy_static! {
    /// `{Name}` or `{%Name}` (image-module syntax).
    pub static ref TAG_PATTERN: Regex =
        Regex::new(r"\{(%?)([A-Za-z][A-Za-z0-9_]*)\}").expect("valid tag pattern");
}

const COMPANY_TAGS: [&str; 2] = ["Company_Name", "CompanyName"];
const OWNER_TAGS: [&str; 2] = ["Owner_Name", "OwnerName"];
const DATE_TAGS: [&str; 2] = ["Generated_Date", "current_date"];
const LOGO_TAGS: [&str; 3] = ["Company_Logo", "CompanyLogo", "Logo"];

/// What a matched tag turns into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagFill<'a> {
    Text(&'a str),
    Logo,
    /// Unknown tag, left as written.
    Keep,
}

#[derive(Debug, Clone)]
pub struct PlaceholderValues {
    pub company_name: String,
    pub owner_name: String,
    pub generated_date: String,
}

impl PlaceholderValues {
    pub fn new(company_name: impl Into<String>, owner_name: impl Into<String>) -> Self {
        Self {
            company_name: company_name.into(),
            owner_name: owner_name.into(),
            generated_date: format_generated_date(),
        }
    }

    pub fn with_date(mut self, generated_date: impl Into<String>) -> Self {
        self.generated_date = generated_date.into();
        self
    }

    /// Classify a tag given its optional `%` image prefix and its name.
    pub fn fill_for(&self, image_prefix: bool, name: &str) -> TagFill<'_> {
        if LOGO_TAGS.contains(&name) {
            return TagFill::Logo;
        }
        if image_prefix {
            return TagFill::Keep;
        }
        if COMPANY_TAGS.contains(&name) {
            TagFill::Text(&self.company_name)
        } else if OWNER_TAGS.contains(&name) {
            TagFill::Text(&self.owner_name)
        } else if DATE_TAGS.contains(&name) {
            TagFill::Text(&self.generated_date)
        } else {
            TagFill::Keep
        }
    }
}
