//! Placeholder substitution inside Word (`.docx`) packages.
//!
//! Word splits visible text into runs at arbitrary points, so a tag such as
//! `{Company_Name}` may span several `<w:t>` nodes. Tags are matched over the
//! concatenated text of a paragraph; the replacement lands in the node where the
//! tag starts and the consumed characters are cut from the following nodes.

use std::collections::HashMap;
use std::io::{Cursor, Read, Write};

use lazy_static::lazy_static;
use log::{debug, warn};
use regex::Regex;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use super::common::{escape_xml_text, unescape_xml_text};
use super::placeholders::{TagFill, TAG_PATTERN};
use super::traits::TemplateRenderer;
use super::{GeneratorError, LogoImage, PlaceholderValues};

const CONTENT_TYPES_PART: &str = "[Content_Types].xml";
const IMAGE_RELATIONSHIP: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/image";
const FIRST_SHAPE_ID: u32 = 4000;
/// Default cap on the total inflated size of a template package.
pub const DEFAULT_MAX_INFLATED_BYTES: u64 = 64 * 1024 * 1024;

lazy_static! {
    /// Run starts, run properties, text nodes and paragraph ends, in document order.
    static ref RUN_TOKEN: Regex = Regex::new(concat!(
        r"(?s)<w:r(?:\s[^>]*)?>",
        r"|(?P<props><w:rPr>.*?</w:rPr>)",
        r"|<w:t(?:\s[^>]*)?>(?P<text>[^<]*)</w:t>",
        r"|</w:p>"
    ))
    .expect("valid run token pattern");
    static ref CONTENT_PART: Regex =
        Regex::new(r"^word/(document|header\d*|footer\d*|footnotes|endnotes)\.xml$")
            .expect("valid part pattern");
    static ref RELATIONSHIP_ID: Regex =
        Regex::new(r#"Id="rId(\d+)""#).expect("valid relationship pattern");
}

/// Renderer for Word packages, bounded by the inflated size it will hold in memory.
#[derive(Debug, Clone, Copy)]
pub struct DocxRenderer {
    max_inflated_bytes: u64,
}

impl DocxRenderer {
    pub fn new(max_inflated_bytes: u64) -> Self {
        Self { max_inflated_bytes }
    }
}

impl Default for DocxRenderer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_INFLATED_BYTES)
    }
}

struct ZipEntry {
    name: String,
    data: Vec<u8>,
    is_dir: bool,
}

/// A `<w:t>` element: its byte span in the part, its decoded text and the
/// `<w:rPr>` of the run it sits in.
struct TextNode {
    start: usize,
    end: usize,
    text: String,
    run_props: Option<String>,
}

enum Fill {
    Text(String),
    Drawing(String),
}

struct Replacement {
    start: usize,
    end: usize,
    fill: Fill,
}

/// Result of rewriting one XML part.
pub struct PartRewrite {
    pub xml: String,
    pub logos_inserted: usize,
}

/// Supplies drawing markup for logo tags in one part.
pub struct LogoSlot<'a> {
    pub logo: &'a LogoImage,
    pub rel_id: String,
    pub media_name: String,
    pub next_shape_id: u32,
}

impl LogoSlot<'_> {
    fn next_drawing(&mut self) -> String {
        let id = self.next_shape_id;
        self.next_shape_id += 1;
        self.logo.drawing_xml(&self.rel_id, id, &self.media_name)
    }
}

/// Substitute every known tag in a WordprocessingML part.
pub fn rewrite_part(
    xml: &str,
    values: &PlaceholderValues,
    mut logo: Option<&mut LogoSlot<'_>>,
) -> PartRewrite {
    let mut paragraphs: Vec<Vec<TextNode>> = vec![Vec::new()];
    let mut run_props: Option<&str> = None;
    for caps in RUN_TOKEN.captures_iter(xml) {
        let Some(whole) = caps.get(0) else { continue };
        if let Some(text) = caps.name("text") {
            if let Some(current) = paragraphs.last_mut() {
                current.push(TextNode {
                    start: whole.start(),
                    end: whole.end(),
                    text: unescape_xml_text(text.as_str()),
                    run_props: run_props.map(str::to_string),
                });
            }
        } else if let Some(props) = caps.name("props") {
            let props = props.as_str();
            // A nested <w:rPrChange> ends the lazy match early; such a fragment is not reusable.
            run_props = (!props["<w:rPr>".len()..].contains("<w:rPr")).then_some(props);
        } else if whole.as_str() == "</w:p>" {
            paragraphs.push(Vec::new());
        } else {
            // A new run; properties seen so far (e.g. inside <w:pPr>) do not apply.
            run_props = None;
        }
    }

    let mut edits: Vec<(usize, usize, String)> = Vec::new();
    let mut logos_inserted = 0;
    for paragraph in paragraphs.iter().filter(|p| !p.is_empty()) {
        logos_inserted += rewrite_paragraph(paragraph, values, &mut logo, &mut edits);
    }

    if edits.is_empty() {
        return PartRewrite {
            xml: xml.to_string(),
            logos_inserted: 0,
        };
    }

    let mut out = String::with_capacity(xml.len() + edits.len() * 32);
    let mut cursor = 0;
    for (start, end, replacement) in edits {
        out.push_str(&xml[cursor..start]);
        out.push_str(&replacement);
        cursor = end;
    }
    out.push_str(&xml[cursor..]);

    PartRewrite {
        xml: out,
        logos_inserted,
    }
}

/// Returns the number of logos inserted; pushes edits for changed nodes in order.
fn rewrite_paragraph(
    nodes: &[TextNode],
    values: &PlaceholderValues,
    logo: &mut Option<&mut LogoSlot<'_>>,
    edits: &mut Vec<(usize, usize, String)>,
) -> usize {
    let mut combined = String::new();
    let mut bounds = Vec::with_capacity(nodes.len());
    for node in nodes {
        let start = combined.len();
        combined.push_str(&node.text);
        bounds.push((start, combined.len()));
    }

    let mut logos_inserted = 0;
    let mut replacements = Vec::new();
    for caps in TAG_PATTERN.captures_iter(&combined) {
        let Some(whole) = caps.get(0) else { continue };
        let fill = match values.fill_for(!caps[1].is_empty(), &caps[2]) {
            TagFill::Text(value) => Fill::Text(value.to_string()),
            TagFill::Logo => match logo.as_deref_mut() {
                Some(slot) => {
                    logos_inserted += 1;
                    Fill::Drawing(slot.next_drawing())
                }
                None => Fill::Text(String::new()),
            },
            TagFill::Keep => continue,
        };
        replacements.push(Replacement {
            start: whole.start(),
            end: whole.end(),
            fill,
        });
    }

    if replacements.is_empty() {
        return 0;
    }

    for (node, &(start, end)) in nodes.iter().zip(&bounds) {
        let mut content = String::new();
        let mut pos = start;
        let mut touched = false;

        for r in replacements.iter().filter(|r| r.start < end && r.end > start) {
            touched = true;
            if r.start >= start {
                content.push_str(&escape_xml_text(&combined[pos..r.start]));
                match &r.fill {
                    Fill::Text(text) => content.push_str(&escape_xml_text(text)),
                    Fill::Drawing(drawing) => {
                        // Close the text and run, emit a picture run, reopen with the same formatting.
                        let props = node.run_props.as_deref().unwrap_or_default();
                        content.push_str(&format!(
                            r#"</w:t></w:r><w:r>{drawing}</w:r><w:r>{props}<w:t xml:space="preserve">"#
                        ));
                    }
                }
            }
            pos = r.end.min(end);
        }

        if !touched {
            continue;
        }
        content.push_str(&escape_xml_text(&combined[pos..end]));
        edits.push((
            node.start,
            node.end,
            format!(r#"<w:t xml:space="preserve">{content}</w:t>"#),
        ));
    }

    logos_inserted
}

/// Next free `rIdN` in a relationships part.
pub fn next_relationship_id(rels_xml: Option<&str>) -> String {
    let max = rels_xml
        .map(|xml| {
            RELATIONSHIP_ID
                .captures_iter(xml)
                .filter_map(|c| c[1].parse::<u32>().ok())
                .max()
                .unwrap_or(0)
        })
        .unwrap_or(0);
    format!("rId{}", max + 1)
}

/// Append an image relationship, creating the relationships part if needed.
pub fn add_image_relationship(rels_xml: Option<&str>, rel_id: &str, target: &str) -> String {
    let relationship =
        format!(r#"<Relationship Id="{rel_id}" Type="{IMAGE_RELATIONSHIP}" Target="{target}"/>"#);
    match rels_xml {
        Some(xml) if xml.contains("</Relationships>") => {
            xml.replacen("</Relationships>", &format!("{relationship}</Relationships>"), 1)
        }
        _ => format!(
            concat!(
                "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n",
                "<Relationships xmlns=\"http://schemas.openxmlformats.org/package/2006/relationships\">",
                "{}</Relationships>"
            ),
            relationship
        ),
    }
}

/// Make sure `[Content_Types].xml` maps `extension` to `content_type`.
pub fn ensure_default_content_type(
    types_xml: &str,
    extension: &str,
    content_type: &str,
) -> Result<String, GeneratorError> {
    let declared = format!(r#"extension="{}""#, extension.to_ascii_lowercase());
    if types_xml.to_ascii_lowercase().contains(&declared) {
        return Ok(types_xml.to_string());
    }
    if !types_xml.contains("</Types>") {
        return Err(GeneratorError::MissingPart(CONTENT_TYPES_PART.to_string()));
    }
    Ok(types_xml.replacen(
        "</Types>",
        &format!(r#"<Default Extension="{extension}" ContentType="{content_type}"/></Types>"#),
        1,
    ))
}

/// `word/_rels/document.xml.rels` for `word/document.xml`.
fn rels_path_for(part: &str) -> String {
    match part.rsplit_once('/') {
        Some((dir, file)) => format!("{dir}/_rels/{file}.rels"),
        None => format!("_rels/{part}.rels"),
    }
}

/// Inflate every entry, failing once the package grows past `limit` bytes.
fn read_entries(template: &[u8], limit: u64) -> Result<Vec<ZipEntry>, GeneratorError> {
    let mut archive = ZipArchive::new(Cursor::new(template))?;
    let mut entries = Vec::with_capacity(archive.len());
    let mut remaining = limit;
    for i in 0..archive.len() {
        let file = archive.by_index(i)?;
        // Header sizes are untrusted: they only reject early, the read itself is bounded.
        if file.size() > remaining {
            return Err(GeneratorError::TooLarge(limit));
        }
        let name = file.name().to_string();
        let is_dir = file.is_dir();

        let mut data = Vec::with_capacity(file.size() as usize);
        let read = file.take(remaining.saturating_add(1)).read_to_end(&mut data)? as u64;
        if read > remaining {
            return Err(GeneratorError::TooLarge(limit));
        }
        remaining -= read;
        entries.push(ZipEntry { name, data, is_dir });
    }
    Ok(entries)
}

fn write_entries(entries: &[ZipEntry]) -> Result<Vec<u8>, GeneratorError> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);
    for entry in entries {
        if entry.is_dir {
            writer.add_directory(entry.name.as_str(), options)?;
        } else {
            writer.start_file(entry.name.as_str(), options)?;
            writer.write_all(&entry.data)?;
        }
    }
    Ok(writer.finish()?.into_inner())
}

fn utf8_part(entry: &ZipEntry) -> Result<String, GeneratorError> {
    String::from_utf8(entry.data.clone()).map_err(|_| GeneratorError::InvalidUtf8(entry.name.clone()))
}

/// Move a part's bytes out as text; the entry is refilled after rewriting.
fn take_utf8_part(entry: &mut ZipEntry) -> Result<String, GeneratorError> {
    String::from_utf8(std::mem::take(&mut entry.data))
        .map_err(|_| GeneratorError::InvalidUtf8(entry.name.clone()))
}

fn unused_media_name(entries: &[ZipEntry], extension: &str) -> String {
    let mut candidate = format!("company_logo.{extension}");
    let mut n = 1;
    while entries.iter().any(|e| e.name == format!("word/media/{candidate}")) {
        candidate = format!("company_logo_{n}.{extension}");
        n += 1;
    }
    candidate
}

impl TemplateRenderer for DocxRenderer {
    fn render(
        &self,
        template: &[u8],
        values: &PlaceholderValues,
        logo: Option<&LogoImage>,
    ) -> Result<Vec<u8>, GeneratorError> {
        let mut entries = read_entries(template, self.max_inflated_bytes)?;
        if !entries.iter().any(|e| e.name == "word/document.xml") {
            return Err(GeneratorError::MissingPart("word/document.xml".to_string()));
        }

        let media_name = logo.map(|l| unused_media_name(&entries, l.extension()));
        let mut next_shape_id = FIRST_SHAPE_ID;
        let mut rels_updates: HashMap<String, String> = HashMap::new();
        let mut total_logos = 0;

        let index_by_name: HashMap<String, usize> = entries
            .iter()
            .enumerate()
            .map(|(i, e)| (e.name.clone(), i))
            .collect();

        for i in 0..entries.len() {
            if !CONTENT_PART.is_match(&entries[i].name) {
                continue;
            }
            let part_name = entries[i].name.clone();
            let xml = take_utf8_part(&mut entries[i])?;
            let rels_path = rels_path_for(&part_name);
            let existing_rels = match index_by_name.get(&rels_path) {
                Some(&idx) => Some(utf8_part(&entries[idx])?),
                None => None,
            };

            let mut slot = match (logo, media_name.as_deref()) {
                (Some(logo), Some(media)) => Some(LogoSlot {
                    logo,
                    rel_id: next_relationship_id(existing_rels.as_deref()),
                    media_name: media.to_string(),
                    next_shape_id,
                }),
                _ => None,
            };

            let rewrite = rewrite_part(&xml, values, slot.as_mut());
            if let Some(slot) = &slot {
                next_shape_id = slot.next_shape_id;
                if rewrite.logos_inserted > 0 {
                    let target = format!("media/{}", slot.media_name);
                    let rels = add_image_relationship(existing_rels.as_deref(), &slot.rel_id, &target);
                    rels_updates.insert(rels_path, rels);
                    total_logos += rewrite.logos_inserted;
                }
            }
            debug!("Rendered part {} ({} logo(s))", part_name, rewrite.logos_inserted);
            entries[i].data = rewrite.xml.into_bytes();
        }

        if let (Some(logo), Some(media), true) = (logo, media_name, total_logos > 0) {
            for (path, rels) in rels_updates {
                match index_by_name.get(&path) {
                    Some(&idx) => entries[idx].data = rels.into_bytes(),
                    None => entries.push(ZipEntry {
                        name: path,
                        data: rels.into_bytes(),
                        is_dir: false,
                    }),
                }
            }

            let types_idx = *index_by_name
                .get(CONTENT_TYPES_PART)
                .ok_or_else(|| GeneratorError::MissingPart(CONTENT_TYPES_PART.to_string()))?;
            let types = utf8_part(&entries[types_idx])?;
            entries[types_idx].data =
                ensure_default_content_type(&types, logo.extension(), logo.content_type())?
                    .into_bytes();

            entries.push(ZipEntry {
                name: format!("word/media/{media}"),
                data: logo.bytes().to_vec(),
                is_dir: false,
            });
        } else if logo.is_some() {
            warn!("Logo supplied but the template has no logo placeholder; logo not embedded");
        }

        write_entries(&entries)
    }
}
