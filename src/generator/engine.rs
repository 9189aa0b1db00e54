//! Rendering engine.
//!
//! Picks the renderer for a template's type and applies the configured
//! failure policy.

use log::{debug, warn};

use super::{
    DocxRenderer, GeneratorError, LogoImage, PlaceholderValues, RenderFailurePolicy,
    TemplateKind, TemplateRenderer, TextRenderer,
};

/// Bytes produced for one template.
#[derive(Debug)]
pub struct RenderOutcome {
    pub bytes: Vec<u8>,
    pub kind: TemplateKind,
    /// True when rendering failed and the raw template was copied instead.
    pub degraded: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct RenderEngine {
    policy: RenderFailurePolicy,
    docx: DocxRenderer,
}

impl RenderEngine {
    pub fn new(policy: RenderFailurePolicy) -> Self {
        Self {
            policy,
            docx: DocxRenderer::default(),
        }
    }

    /// Cap the bytes a DOCX template may inflate to while rendering.
    pub fn with_inflate_limit(mut self, max_inflated_bytes: u64) -> Self {
        self.docx = DocxRenderer::new(max_inflated_bytes);
        self
    }

    /// Render a template file's content.
    ///
    /// # Arguments
    /// * `template_filename` - stored name of the template, used for type detection and logging.
    /// * `template` - raw template bytes.
    /// * `values` - placeholder values for this request.
    /// * `logo` - optional logo to embed where the template has a logo tag.
    pub fn render(
        &self,
        template_filename: &str,
        template: &[u8],
        values: &PlaceholderValues,
        logo: Option<&LogoImage>,
    ) -> Result<RenderOutcome, GeneratorError> {
        let kind = TemplateKind::from_filename(template_filename)
            .ok_or_else(|| GeneratorError::UnsupportedTemplate(template_filename.to_string()))?;
        if template.is_empty() {
            return Err(GeneratorError::EmptyTemplate(template_filename.to_string()));
        }

        let result = match kind {
            TemplateKind::Docx => self.docx.render(template, values, logo),
            TemplateKind::Txt => TextRenderer.render(template, values, logo),
        };

        match result {
            Ok(bytes) => {
                debug!("Rendered {} ({} bytes)", template_filename, bytes.len());
                Ok(RenderOutcome {
                    bytes,
                    kind,
                    degraded: false,
                })
            }
            // An oversized package is never passed through, whatever the policy.
            Err(e @ GeneratorError::TooLarge(_)) => Err(e),
            Err(e) if self.policy == RenderFailurePolicy::CopyOriginal => {
                warn!(
                    "Rendering {} failed ({}); copying the template unchanged",
                    template_filename, e
                );
                Ok(RenderOutcome {
                    bytes: template.to_vec(),
                    kind,
                    degraded: true,
                })
            }
            Err(e) => Err(e),
        }
    }
}

impl Default for RenderEngine {
    fn default() -> Self {
        Self::new(RenderFailurePolicy::default())
    }
}
