//! Read-back of a built presentation.
//!
//! Lists every slide's shapes with their names, absolute geometry and text,
//! plus the speaker notes. Used by `deck-render inspect` and by tests that
//! check the builder against the planned slot geometry.

use deck_core::{Error, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde::Serialize;
use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;
use zip::ZipArchive;

/// A shape as found in a slide part. Geometry is in EMU.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ShapeSummary {
    pub name: String,
    pub x: i64,
    pub y: i64,
    pub cx: i64,
    pub cy: i64,
    /// Paragraphs joined by newlines.
    pub text: String,
    pub is_picture: bool,
}

/// A slide with its shapes in document order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlideSummary {
    /// 1-based slide number.
    pub number: usize,
    pub shapes: Vec<ShapeSummary>,
    pub notes: Option<String>,
}

impl SlideSummary {
    /// First shape with this name.
    pub fn shape(&self, name: &str) -> Option<&ShapeSummary> {
        self.shapes.iter().find(|s| s.name == name)
    }
}

/// Reader for presentation packages.
pub struct PackageReader<R: Read + Seek> {
    archive: ZipArchive<R>,
}

impl PackageReader<BufReader<File>> {
    /// Open a presentation file.
    pub fn open(path: &Path) -> Result<Self> {
        Self::new(BufReader::new(File::open(path)?))
    }
}

impl<R: Read + Seek> PackageReader<R> {
    pub fn new(reader: R) -> Result<Self> {
        let archive = ZipArchive::new(reader)
            .map_err(|e| Error::ZipError(format!("Failed to open ZIP: {}", e)))?;
        Ok(Self { archive })
    }

    /// Whether the package contains a part with this name.
    pub fn has_part(&mut self, path: &str) -> bool {
        self.archive.by_name(path).is_ok()
    }

    /// Raw content of a part.
    pub fn read_part(&mut self, path: &str) -> Result<String> {
        let mut file = self
            .archive
            .by_name(path)
            .map_err(|e| Error::ZipError(format!("File not found in archive '{}': {}", path, e)))?;

        let mut content = String::new();
        file.read_to_string(&mut content)
            .map_err(|e| Error::ZipError(format!("Failed to read '{}': {}", path, e)))?;

        Ok(content)
    }

    /// Read every slide in presentation order.
    pub fn slides(&mut self) -> Result<Vec<SlideSummary>> {
        let order = self.slide_order()?;
        let mut slides = Vec::with_capacity(order.len());
        for (idx, slide_path) in order.iter().enumerate() {
            let content = self.read_part(slide_path)?;
            let shapes = extract_shapes(&content)?;
            let notes = self.read_notes(slide_path)?;
            slides.push(SlideSummary {
                number: idx + 1,
                shapes,
                notes,
            });
        }
        Ok(slides)
    }

    /// Ordered slide part paths from the presentation relationships.
    fn slide_order(&mut self) -> Result<Vec<String>> {
        let rels = self.read_part("ppt/_rels/presentation.xml.rels")?;
        let mut slides: Vec<(String, Option<usize>)> = parse_relationships(&rels)?
            .into_iter()
            .filter(|rel| rel.kind.ends_with("/slide"))
            .map(|rel| {
                let order = extract_slide_number(&rel.target);
                (resolve_target("ppt", &rel.target), order)
            })
            .collect();

        slides.sort_by(|a, b| match (a.1, b.1) {
            (Some(na), Some(nb)) => na.cmp(&nb),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => a.0.cmp(&b.0),
        });

        Ok(slides.into_iter().map(|(path, _)| path).collect())
    }

    fn read_notes(&mut self, slide_path: &str) -> Result<Option<String>> {
        let Some((dir, file)) = slide_path.rsplit_once('/') else {
            return Ok(None);
        };
        let rels_path = format!("{}/_rels/{}.rels", dir, file);
        if !self.has_part(&rels_path) {
            return Ok(None);
        }
        let rels = parse_relationships(&self.read_part(&rels_path)?)?;
        let Some(notes_rel) = rels.iter().find(|r| r.kind.ends_with("/notesSlide")) else {
            return Ok(None);
        };
        let notes_path = resolve_target(dir, &notes_rel.target);
        let shapes = extract_shapes(&self.read_part(&notes_path)?)?;
        let text = shapes
            .into_iter()
            .map(|s| s.text)
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join("\n");
        Ok((!text.is_empty()).then_some(text))
    }
}

struct RelationshipEntry {
    kind: String,
    target: String,
}

fn parse_relationships(content: &str) -> Result<Vec<RelationshipEntry>> {
    let mut reader = Reader::from_str(content);
    reader.trim_text(true);
    let mut rels = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e))
                if e.name().as_ref() == b"Relationship" =>
            {
                let mut kind = String::new();
                let mut target = String::new();
                for attr in e.attributes().flatten() {
                    match attr.key.as_ref() {
                        b"Type" => kind = String::from_utf8_lossy(&attr.value).to_string(),
                        b"Target" => target = String::from_utf8_lossy(&attr.value).to_string(),
                        _ => {}
                    }
                }
                rels.push(RelationshipEntry { kind, target });
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(Error::XmlError(format!(
                    "Error parsing relationships: {}",
                    e
                )));
            }
            _ => {}
        }
    }
    Ok(rels)
}

/// Resolve a relationship target against the directory of its source part.
fn resolve_target(base_dir: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }
    let mut parts: Vec<&str> = base_dir.split('/').filter(|p| !p.is_empty()).collect();
    for segment in target.split('/') {
        match segment {
            ".." => {
                parts.pop();
            }
            "." | "" => {}
            s => parts.push(s),
        }
    }
    parts.join("/")
}

fn attr_i64(e: &BytesStart, key: &[u8]) -> Option<i64> {
    e.attributes()
        .flatten()
        .find(|a| a.key.as_ref() == key)
        .and_then(|a| String::from_utf8_lossy(&a.value).parse().ok())
}

/// Record attributes of geometry and naming elements on the current shape.
fn apply_element(e: &BytesStart, shape: &mut ShapeSummary, in_xfrm: bool) {
    let name = e.name();
    match local_name(name.as_ref()) {
        b"cNvPr" => {
            if let Some(attr) = e.attributes().flatten().find(|a| a.key.as_ref() == b"name") {
                shape.name = attr
                    .unescape_value()
                    .map(|v| v.to_string())
                    .unwrap_or_else(|_| String::from_utf8_lossy(&attr.value).to_string());
            }
        }
        b"off" if in_xfrm => {
            shape.x = attr_i64(e, b"x").unwrap_or_default();
            shape.y = attr_i64(e, b"y").unwrap_or_default();
        }
        b"ext" if in_xfrm => {
            shape.cx = attr_i64(e, b"cx").unwrap_or_default();
            shape.cy = attr_i64(e, b"cy").unwrap_or_default();
        }
        _ => {}
    }
}

/// Extract shapes with names, geometry and text from slide XML.
fn extract_shapes(xml_content: &str) -> Result<Vec<ShapeSummary>> {
    let mut shapes = Vec::new();
    let mut reader = Reader::from_str(xml_content);
    reader.trim_text(true);

    let mut current_shape: Option<ShapeSummary> = None;
    let mut in_xfrm = false;
    let mut in_text_body = false;
    let mut in_paragraph = false;
    let mut current_text = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => {
                let name = e.name();
                match local_name(name.as_ref()) {
                    b"sp" | b"pic" => {
                        current_shape = Some(ShapeSummary {
                            is_picture: local_name(name.as_ref()) == b"pic",
                            ..ShapeSummary::default()
                        });
                    }
                    b"xfrm" => in_xfrm = true,
                    b"txBody" => in_text_body = true,
                    b"p" if in_text_body => {
                        in_paragraph = true;
                        if !current_text.is_empty() {
                            current_text.push('\n');
                        }
                    }
                    _ => {
                        if let Some(ref mut shape) = current_shape {
                            apply_element(e, shape, in_xfrm);
                        }
                    }
                }
            }
            Ok(Event::Empty(ref e)) => {
                if let Some(ref mut shape) = current_shape {
                    apply_element(e, shape, in_xfrm);
                }
            }
            Ok(Event::Text(ref e)) => {
                if in_paragraph {
                    let text = e.unescape().unwrap_or_default();
                    current_text.push_str(&text);
                }
            }
            Ok(Event::End(ref e)) => {
                let name = e.name();
                match local_name(name.as_ref()) {
                    b"sp" | b"pic" => {
                        if let Some(mut shape) = current_shape.take() {
                            shape.text = current_text.trim().to_string();
                            shapes.push(shape);
                        }
                        current_text.clear();
                        in_text_body = false;
                        in_paragraph = false;
                    }
                    b"xfrm" => in_xfrm = false,
                    b"txBody" => in_text_body = false,
                    b"p" => in_paragraph = false,
                    _ => {}
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(Error::XmlError(format!(
                    "Error at position {}: {}",
                    reader.buffer_position(),
                    e
                )));
            }
            _ => {}
        }
    }

    Ok(shapes)
}

/// Extract the local name from a potentially namespaced XML element name.
fn local_name(name: &[u8]) -> &[u8] {
    if let Some(pos) = name.iter().position(|&b| b == b':') {
        &name[pos + 1..]
    } else {
        name
    }
}

/// Extract a slide number from a string like "rId2" or "slide3.xml".
fn extract_slide_number(s: &str) -> Option<usize> {
    let s = s.trim_end_matches(".xml").trim_end_matches(".rels");

    let digits: String = s.chars().rev().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    let digits: String = digits.chars().rev().collect();
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_slide_number() {
        assert_eq!(extract_slide_number("rId1"), Some(1));
        assert_eq!(extract_slide_number("rId12"), Some(12));
        assert_eq!(extract_slide_number("slides/slide1.xml"), Some(1));
        assert_eq!(extract_slide_number("slide123.xml"), Some(123));
        assert_eq!(extract_slide_number("nodigits"), None);
    }

    #[test]
    fn test_local_name() {
        assert_eq!(local_name(b"p:sp"), b"sp");
        assert_eq!(local_name(b"a:t"), b"t");
        assert_eq!(local_name(b"sp"), b"sp");
    }

    #[test]
    fn test_resolve_target() {
        assert_eq!(resolve_target("ppt", "slides/slide2.xml"), "ppt/slides/slide2.xml");
        assert_eq!(
            resolve_target("ppt/slides", "../notesSlides/notesSlide2.xml"),
            "ppt/notesSlides/notesSlide2.xml"
        );
        assert_eq!(resolve_target("ppt/slides", "/ppt/media/a.png"), "ppt/media/a.png");
    }

    #[test]
    fn test_extract_shapes_reads_geometry_and_text() {
        let xml = r#"<p:sld xmlns:p="p" xmlns:a="a"><p:cSld><p:spTree>
            <p:grpSpPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="0" cy="0"/></a:xfrm></p:grpSpPr>
            <p:sp><p:nvSpPr><p:cNvPr id="2" name="Title &amp; Body"/></p:nvSpPr>
            <p:spPr><a:xfrm><a:off x="10" y="20"/><a:ext cx="30" cy="40"/></a:xfrm></p:spPr>
            <p:txBody><a:p><a:r><a:t>第一</a:t></a:r></a:p><a:p><a:r><a:t>a &lt; b</a:t></a:r></a:p></p:txBody></p:sp>
            <p:pic><p:nvPicPr><p:cNvPr id="3" name="p1_slot0"/></p:nvPicPr>
            <p:spPr><a:xfrm><a:off x="1" y="2"/><a:ext cx="3" cy="4"/></a:xfrm></p:spPr></p:pic>
            </p:spTree></p:cSld></p:sld>"#;
        let shapes = extract_shapes(xml).unwrap();
        assert_eq!(shapes.len(), 2);
        assert_eq!(
            shapes[0],
            ShapeSummary {
                name: "Title & Body".to_string(),
                x: 10,
                y: 20,
                cx: 30,
                cy: 40,
                text: "第一\na < b".to_string(),
                is_picture: false,
            }
        );
        assert!(shapes[1].is_picture);
        assert_eq!((shapes[1].x, shapes[1].cy), (1, 4));
    }
}
