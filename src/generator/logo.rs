//! Company logo images and their WordprocessingML drawing markup.

use std::io::Cursor;

use image::{ImageFormat, ImageReader};

use super::GeneratorError;

/// Rendered logo width: 2 inches in EMU.
const LOGO_WIDTH_EMU: u64 = 1_828_800;

#[derive(Debug, Clone)]
pub struct LogoImage {
    bytes: Vec<u8>,
    format: ImageFormat,
    width_px: u32,
    height_px: u32,
}

impl LogoImage {
    /// Sniff the image format from content and read its pixel size.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, GeneratorError> {
        let format = image::guess_format(&bytes)
            .map_err(|e| GeneratorError::InvalidLogo(e.to_string()))?;
        if !matches!(format, ImageFormat::Png | ImageFormat::Jpeg | ImageFormat::Gif) {
            return Err(GeneratorError::InvalidLogo(format!(
                "unsupported format {:?}, expected PNG, JPEG or GIF",
                format
            )));
        }

        let (width_px, height_px) = ImageReader::with_format(Cursor::new(&bytes), format)
            .into_dimensions()
            .map_err(|e| GeneratorError::InvalidLogo(e.to_string()))?;
        if width_px == 0 || height_px == 0 {
            return Err(GeneratorError::InvalidLogo("image has no pixels".to_string()));
        }

        Ok(Self {
            bytes,
            format,
            width_px,
            height_px,
        })
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width_px, self.height_px)
    }

    pub fn extension(&self) -> &'static str {
        match self.format {
            ImageFormat::Jpeg => "jpeg",
            ImageFormat::Gif => "gif",
            _ => "png",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self.format {
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Gif => "image/gif",
            _ => "image/png",
        }
    }

    /// Display size in EMU: fixed width, height following the aspect ratio.
    pub fn extent_emu(&self) -> (u64, u64) {
        let height = LOGO_WIDTH_EMU * u64::from(self.height_px) / u64::from(self.width_px);
        (LOGO_WIDTH_EMU, height.max(1))
    }

    /// `<w:drawing>` element showing the image behind relationship `rel_id`.
    ///
    /// Namespaces are declared locally so the markup is valid in any part.
    pub fn drawing_xml(&self, rel_id: &str, shape_id: u32, media_name: &str) -> String {
        let (cx, cy) = self.extent_emu();
        format!(
            concat!(
                r#"<w:drawing><wp:inline distT="0" distB="0" distL="0" distR="0" "#,
                r#"xmlns:wp="http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing">"#,
                r#"<wp:extent cx="{cx}" cy="{cy}"/>"#,
                r#"<wp:docPr id="{id}" name="Company Logo {id}"/>"#,
                r#"<wp:cNvGraphicFramePr><a:graphicFrameLocks "#,
                r#"xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" noChangeAspect="1"/>"#,
                r#"</wp:cNvGraphicFramePr>"#,
                r#"<a:graphic xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main">"#,
                r#"<a:graphicData uri="http://schemas.openxmlformats.org/drawingml/2006/picture">"#,
                r#"<pic:pic xmlns:pic="http://schemas.openxmlformats.org/drawingml/2006/picture">"#,
                r#"<pic:nvPicPr><pic:cNvPr id="{id}" name="{media}"/><pic:cNvPicPr/></pic:nvPicPr>"#,
                r#"<pic:blipFill><a:blip r:embed="{rel}" "#,
                r#"xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"/>"#,
                r#"<a:stretch><a:fillRect/></a:stretch></pic:blipFill>"#,
                r#"<pic:spPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="{cx}" cy="{cy}"/></a:xfrm>"#,
                r#"<a:prstGeom prst="rect"><a:avLst/></a:prstGeom></pic:spPr>"#,
                r#"</pic:pic></a:graphicData></a:graphic></wp:inline></w:drawing>"#
            ),
            cx = cx,
            cy = cy,
            id = shape_id,
            media = media_name,
            rel = rel_id,
        )
    }
}
