//! Plain-text templates.

use regex::Captures;

use super::placeholders::{TagFill, TAG_PATTERN};
use super::traits::TemplateRenderer;
use super::{GeneratorError, LogoImage, PlaceholderValues};

/// Substitutes placeholders in UTF-8 text. Logo tags are dropped.
pub struct TextRenderer;

impl TextRenderer {
    pub fn render_str(source: &str, values: &PlaceholderValues) -> String {
        TAG_PATTERN
            .replace_all(source, |caps: &Captures| {
                match values.fill_for(!caps[1].is_empty(), &caps[2]) {
                    TagFill::Text(value) => value.to_string(),
                    TagFill::Logo => String::new(),
                    TagFill::Keep => caps[0].to_string(),
                }
            })
            .into_owned()
    }
}

impl TemplateRenderer for TextRenderer {
    fn render(
        &self,
        template: &[u8],
        values: &PlaceholderValues,
        _logo: Option<&LogoImage>,
    ) -> Result<Vec<u8>, GeneratorError> {
        let source = std::str::from_utf8(template)
            .map_err(|_| GeneratorError::InvalidUtf8("text template".to_string()))?;
        Ok(Self::render_str(source, values).into_bytes())
    }
}
