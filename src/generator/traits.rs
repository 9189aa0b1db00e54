//! Traits for generator system standardization.

use super::{GeneratorError, LogoImage, PlaceholderValues};

/// Trait for validating request objects.
pub trait Validator {
    /// Validate the state of the object.
    fn validate(&self) -> Result<(), String>;
}

/// Trait for template renderers.
pub trait TemplateRenderer {
    /// Render `template` with the given values, embedding `logo` where the template asks for it.
    fn render(
        &self,
        template: &[u8],
        values: &PlaceholderValues,
        logo: Option<&LogoImage>,
    ) -> Result<Vec<u8>, GeneratorError>;
}
