//! Generators module - business logic for filling policy templates.
//!
//! - `docx` - placeholder substitution and logo embedding inside Word packages
//! - `text` - placeholder substitution in plain-text templates
//! - `engine` - picks a renderer per template and applies the failure policy

pub mod common;
pub mod docx;
pub mod engine;
pub mod logo;
pub mod placeholders;
pub mod text;
pub mod traits;

pub use docx::DocxRenderer;
pub use engine::{RenderEngine, RenderOutcome};
pub use logo::LogoImage;
pub use placeholders::PlaceholderValues;
pub use text::TextRenderer;
pub use traits::{TemplateRenderer, Validator};

use std::path::Path;
use std::str::FromStr;

use thiserror::Error;

/// Errors that can occur during document generation.
#[derive(Debug, Error)]
pub enum GeneratorError {
    #[error("unsupported template type: {0}")]
    UnsupportedTemplate(String),
    #[error("template file is empty: {0}")]
    EmptyTemplate(String),
    #[error("failed to process DOCX archive: {0}")]
    Archive(#[from] zip::result::ZipError),
    #[error("DOCX package is missing {0}")]
    MissingPart(String),
    #[error("{0} is not valid UTF-8")]
    InvalidUtf8(String),
    #[error("I/O error while rendering: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid logo image: {0}")]
    InvalidLogo(String),
    #[error("template inflates past the limit of {0} bytes")]
    TooLarge(u64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateKind {
    Docx,
    Txt,
}

impl TemplateKind {
    pub fn from_filename(filename: &str) -> Option<Self> {
        let ext = Path::new(filename).extension()?.to_str()?;
        Self::from_extension(ext)
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "docx" => Some(Self::Docx),
            "txt" => Some(Self::Txt),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Docx => "docx",
            Self::Txt => "txt",
        }
    }
}

/// What to do when a template cannot be rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RenderFailurePolicy {
    /// Surface the error to the caller.
    #[default]
    Fail,
    /// Write the unmodified template bytes and report success.
    CopyOriginal,
}

impl FromStr for RenderFailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "fail" => Ok(Self::Fail),
            "copy-original" | "copy_original" | "copy" => Ok(Self::CopyOriginal),
            other => Err(format!("unknown render failure policy: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_kind_from_filename() {
        assert_eq!(TemplateKind::from_filename("a.DOCX"), Some(TemplateKind::Docx));
        assert_eq!(TemplateKind::from_filename("notes.txt"), Some(TemplateKind::Txt));
        assert_eq!(TemplateKind::from_filename("scan.pdf"), None);
        assert_eq!(TemplateKind::from_filename("README"), None);
    }

    #[test]
    fn test_failure_policy_parse() {
        assert_eq!("fail".parse(), Ok(RenderFailurePolicy::Fail));
        assert_eq!("Copy-Original".parse(), Ok(RenderFailurePolicy::CopyOriginal));
        assert!("retry".parse::<RenderFailurePolicy>().is_err());
    }
}
