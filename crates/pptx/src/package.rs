//! OPC packaging: parts, relationships and content types.

use quick_xml::escape::escape;
use std::fmt::Write as FmtWrite;
use std::io::{Seek, Write};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

use deck_core::{Error, Result};

use crate::media::ImageFormat;
use crate::slide::BuiltSlide;
use crate::{CANVAS_HEIGHT, CANVAS_WIDTH};

const SLIDE_MASTER: &str = include_str!("../resources/slideMaster1.xml");
const SLIDE_LAYOUT: &str = include_str!("../resources/slideLayout1.xml");
const NOTES_MASTER: &str = include_str!("../resources/notesMaster1.xml");
const THEME: &str = include_str!("../resources/theme1.xml");

const XML_DECL: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#;
const PML_NAMESPACES: &str = r#"xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main""#;

const REL_BASE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const CT_BASE: &str = "application/vnd.openxmlformats-officedocument";

/// Application name recorded in the document properties.
const APPLICATION: &str = "deck-render";

/// First slide id; PowerPoint reserves lower values.
const FIRST_SLIDE_ID: usize = 256;

/// Presentation-level relationships that precede the slides.
const FIXED_PRESENTATION_RELS: usize = 6;

fn xml_err(e: std::fmt::Error) -> Error {
    Error::XmlError(e.to_string())
}

fn zip_err(e: zip::result::ZipError) -> Error {
    Error::ZipError(e.to_string())
}

/// A relationship entry of a `.rels` part.
struct Relationship<'a> {
    id: String,
    kind: &'a str,
    target: String,
}

impl<'a> Relationship<'a> {
    fn new(id: impl Into<String>, kind: &'a str, target: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind,
            target: target.into(),
        }
    }
}

fn relationships_xml(rels: &[Relationship]) -> Result<String> {
    let mut xml = String::from(XML_DECL);
    xml.push_str(
        r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
    );
    for rel in rels {
        let kind = if rel.kind.starts_with("http") {
            rel.kind.to_string()
        } else {
            format!("{}/{}", REL_BASE, rel.kind)
        };
        write!(
            xml,
            r#"<Relationship Id="{}" Type="{}" Target="{}"/>"#,
            rel.id, kind, rel.target
        )
        .map_err(xml_err)?;
    }
    xml.push_str("</Relationships>");
    Ok(xml)
}

/// Writes named parts into a ZIP container.
pub struct PackageWriter<W: Write + Seek> {
    zip: ZipWriter<W>,
    options: FileOptions,
}

impl<W: Write + Seek> PackageWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            zip: ZipWriter::new(inner),
            options: FileOptions::default().compression_method(CompressionMethod::Deflated),
        }
    }

    pub fn add_part(&mut self, name: &str, data: &[u8]) -> Result<()> {
        self.zip.start_file(name, self.options).map_err(zip_err)?;
        self.zip.write_all(data)?;
        Ok(())
    }

    pub fn finish(mut self) -> Result<W> {
        self.zip.finish().map_err(zip_err)
    }
}

fn content_types_xml(slides: &[BuiltSlide]) -> Result<String> {
    let mut xml = String::from(XML_DECL);
    xml.push_str(
        r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">"#,
    );
    xml.push_str(r#"<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>"#);
    xml.push_str(r#"<Default Extension="xml" ContentType="application/xml"/>"#);
    for format in ImageFormat::ALL {
        write!(
            xml,
            r#"<Default Extension="{}" ContentType="{}"/>"#,
            format.extension(),
            format.content_type()
        )
        .map_err(xml_err)?;
    }

    let overrides = [
        ("/ppt/presentation.xml", "presentationml.presentation.main+xml"),
        ("/ppt/slideMasters/slideMaster1.xml", "presentationml.slideMaster+xml"),
        ("/ppt/slideLayouts/slideLayout1.xml", "presentationml.slideLayout+xml"),
        ("/ppt/notesMasters/notesMaster1.xml", "presentationml.notesMaster+xml"),
        ("/ppt/theme/theme1.xml", "theme+xml"),
        ("/ppt/theme/theme2.xml", "theme+xml"),
        ("/ppt/presProps.xml", "presentationml.presProps+xml"),
        ("/ppt/viewProps.xml", "presentationml.viewProps+xml"),
        ("/ppt/tableStyles.xml", "presentationml.tableStyles+xml"),
        ("/docProps/app.xml", "extended-properties+xml"),
    ];
    for (part, kind) in overrides {
        write!(xml, r#"<Override PartName="{}" ContentType="{}.{}"/>"#, part, CT_BASE, kind)
            .map_err(xml_err)?;
    }
    xml.push_str(r#"<Override PartName="/docProps/core.xml" ContentType="application/vnd.openxmlformats-package.core-properties+xml"/>"#);

    for (i, slide) in slides.iter().enumerate() {
        let n = i + 1;
        write!(
            xml,
            r#"<Override PartName="/ppt/slides/slide{}.xml" ContentType="{}.presentationml.slide+xml"/>"#,
            n, CT_BASE
        )
        .map_err(xml_err)?;
        if slide.notes.is_some() {
            write!(
                xml,
                r#"<Override PartName="/ppt/notesSlides/notesSlide{}.xml" ContentType="{}.presentationml.notesSlide+xml"/>"#,
                n, CT_BASE
            )
            .map_err(xml_err)?;
        }
    }
    xml.push_str("</Types>");
    Ok(xml)
}

fn presentation_xml(slide_count: usize) -> Result<String> {
    let mut xml = String::from(XML_DECL);
    write!(xml, r#"<p:presentation {} saveSubsetFonts="1">"#, PML_NAMESPACES).map_err(xml_err)?;
    xml.push_str(r#"<p:sldMasterIdLst><p:sldMasterId id="2147483648" r:id="rId1"/></p:sldMasterIdLst>"#);
    xml.push_str(r#"<p:notesMasterIdLst><p:notesMasterId r:id="rId2"/></p:notesMasterIdLst>"#);
    xml.push_str("<p:sldIdLst>");
    for i in 0..slide_count {
        write!(
            xml,
            r#"<p:sldId id="{}" r:id="rId{}"/>"#,
            FIRST_SLIDE_ID + i,
            FIXED_PRESENTATION_RELS + 1 + i
        )
        .map_err(xml_err)?;
    }
    xml.push_str("</p:sldIdLst>");
    write!(
        xml,
        r#"<p:sldSz cx="{}" cy="{}"/><p:notesSz cx="6858000" cy="9144000"/><p:defaultTextStyle/></p:presentation>"#,
        CANVAS_WIDTH, CANVAS_HEIGHT
    )
    .map_err(xml_err)?;
    Ok(xml)
}

fn presentation_rels(slide_count: usize) -> Result<String> {
    let mut rels = vec![
        Relationship::new("rId1", "slideMaster", "slideMasters/slideMaster1.xml"),
        Relationship::new("rId2", "notesMaster", "notesMasters/notesMaster1.xml"),
        Relationship::new("rId3", "theme", "theme/theme1.xml"),
        Relationship::new("rId4", "presProps", "presProps.xml"),
        Relationship::new("rId5", "viewProps", "viewProps.xml"),
        Relationship::new("rId6", "tableStyles", "tableStyles.xml"),
    ];
    for i in 0..slide_count {
        rels.push(Relationship::new(
            format!("rId{}", FIXED_PRESENTATION_RELS + 1 + i),
            "slide",
            format!("slides/slide{}.xml", i + 1),
        ));
    }
    relationships_xml(&rels)
}

fn core_xml(title: &str) -> String {
    format!(
        r#"{}<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:dcterms="http://purl.org/dc/terms/" xmlns:dcmitype="http://purl.org/dc/dcmitype/" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance"><dc:title>{}</dc:title><dc:creator>{}</dc:creator></cp:coreProperties>"#,
        XML_DECL,
        escape(title),
        APPLICATION
    )
}

fn app_xml(slides: &[BuiltSlide]) -> String {
    let notes = slides.iter().filter(|s| s.notes.is_some()).count();
    format!(
        r#"{}<Properties xmlns="http://schemas.openxmlformats.org/officeDocument/2006/extended-properties" xmlns:vt="http://schemas.openxmlformats.org/officeDocument/2006/docPropsVTypes"><Application>{}</Application><Slides>{}</Slides><Notes>{}</Notes></Properties>"#,
        XML_DECL,
        APPLICATION,
        slides.len(),
        notes
    )
}

fn notes_xml(notes: &str) -> Result<String> {
    let mut xml = String::from(XML_DECL);
    write!(xml, "<p:notes {}><p:cSld><p:spTree>", PML_NAMESPACES).map_err(xml_err)?;
    xml.push_str(r#"<p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr/>"#);
    xml.push_str(r#"<p:sp><p:nvSpPr><p:cNvPr id="2" name="Notes Placeholder"/><p:cNvSpPr><a:spLocks noGrp="1"/></p:cNvSpPr><p:nvPr><p:ph type="body" idx="1"/></p:nvPr></p:nvSpPr><p:spPr/><p:txBody><a:bodyPr/><a:lstStyle/>"#);
    for line in notes.lines() {
        write!(
            xml,
            r#"<a:p><a:r><a:rPr lang="zh-CN" dirty="0"/><a:t>{}</a:t></a:r></a:p>"#,
            escape(line)
        )
        .map_err(xml_err)?;
    }
    if notes.lines().next().is_none() {
        xml.push_str("<a:p/>");
    }
    xml.push_str(r#"</p:txBody></p:sp></p:spTree></p:cSld><p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:notes>"#);
    Ok(xml)
}

/// Write a complete presentation package.
pub fn write_package<W: Write + Seek>(inner: W, title: &str, slides: &[BuiltSlide]) -> Result<W> {
    let mut package = PackageWriter::new(inner);

    package.add_part("[Content_Types].xml", content_types_xml(slides)?.as_bytes())?;
    package.add_part(
        "_rels/.rels",
        relationships_xml(&[
            Relationship::new("rId1", "officeDocument", "ppt/presentation.xml"),
            Relationship::new(
                "rId2",
                "http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties",
                "docProps/core.xml",
            ),
            Relationship::new("rId3", "extended-properties", "docProps/app.xml"),
        ])?
        .as_bytes(),
    )?;
    package.add_part("docProps/core.xml", core_xml(title).as_bytes())?;
    package.add_part("docProps/app.xml", app_xml(slides).as_bytes())?;

    package.add_part("ppt/presentation.xml", presentation_xml(slides.len())?.as_bytes())?;
    package.add_part(
        "ppt/_rels/presentation.xml.rels",
        presentation_rels(slides.len())?.as_bytes(),
    )?;
    package.add_part(
        "ppt/presProps.xml",
        format!("{}<p:presentationPr {}/>", XML_DECL, PML_NAMESPACES).as_bytes(),
    )?;
    package.add_part(
        "ppt/viewProps.xml",
        format!(
            r#"{}<p:viewPr {}><p:normalViewPr><p:restoredLeft sz="15620"/><p:restoredTop sz="94660"/></p:normalViewPr><p:gridSpacing cx="76200" cy="76200"/></p:viewPr>"#,
            XML_DECL, PML_NAMESPACES
        )
        .as_bytes(),
    )?;
    package.add_part(
        "ppt/tableStyles.xml",
        format!(
            r#"{}<a:tblStyleLst xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" def="{{5C22544A-7EE6-4342-B048-85BDC9FD1C3A}}"/>"#,
            XML_DECL
        )
        .as_bytes(),
    )?;

    package.add_part("ppt/slideMasters/slideMaster1.xml", SLIDE_MASTER.as_bytes())?;
    package.add_part(
        "ppt/slideMasters/_rels/slideMaster1.xml.rels",
        relationships_xml(&[
            Relationship::new("rId1", "slideLayout", "../slideLayouts/slideLayout1.xml"),
            Relationship::new("rId2", "theme", "../theme/theme1.xml"),
        ])?
        .as_bytes(),
    )?;
    package.add_part("ppt/slideLayouts/slideLayout1.xml", SLIDE_LAYOUT.as_bytes())?;
    package.add_part(
        "ppt/slideLayouts/_rels/slideLayout1.xml.rels",
        relationships_xml(&[Relationship::new(
            "rId1",
            "slideMaster",
            "../slideMasters/slideMaster1.xml",
        )])?
        .as_bytes(),
    )?;
    package.add_part("ppt/notesMasters/notesMaster1.xml", NOTES_MASTER.as_bytes())?;
    package.add_part(
        "ppt/notesMasters/_rels/notesMaster1.xml.rels",
        relationships_xml(&[Relationship::new("rId1", "theme", "../theme/theme2.xml")])?.as_bytes(),
    )?;
    package.add_part("ppt/theme/theme1.xml", THEME.as_bytes())?;
    package.add_part("ppt/theme/theme2.xml", THEME.as_bytes())?;

    let mut media_count = 0;
    for (i, slide) in slides.iter().enumerate() {
        let n = i + 1;
        let mut rels = vec![Relationship::new(
            "rId1",
            "slideLayout",
            "../slideLayouts/slideLayout1.xml",
        )];

        for picture in &slide.images {
            media_count += 1;
            let media = format!("image{}.{}", media_count, picture.image.format.extension());
            package.add_part(&format!("ppt/media/{}", media), &picture.image.data)?;
            rels.push(Relationship::new(
                picture.rel_id.clone(),
                "image",
                format!("../media/{}", media),
            ));
        }

        if let Some(notes) = &slide.notes {
            rels.push(Relationship::new(
                slide.notes_rel_id(),
                "notesSlide",
                format!("../notesSlides/notesSlide{}.xml", n),
            ));
            package.add_part(
                &format!("ppt/notesSlides/notesSlide{}.xml", n),
                notes_xml(notes)?.as_bytes(),
            )?;
            package.add_part(
                &format!("ppt/notesSlides/_rels/notesSlide{}.xml.rels", n),
                relationships_xml(&[
                    Relationship::new("rId1", "notesMaster", "../notesMasters/notesMaster1.xml"),
                    Relationship::new("rId2", "slide", format!("../slides/slide{}.xml", n)),
                ])?
                .as_bytes(),
            )?;
        }

        package.add_part(&format!("ppt/slides/slide{}.xml", n), slide.to_xml()?.as_bytes())?;
        package.add_part(
            &format!("ppt/slides/_rels/slide{}.xml.rels", n),
            relationships_xml(&rels)?.as_bytes(),
        )?;
    }

    log::debug!(
        "Packaged {} slides with {} media parts",
        slides.len(),
        media_count
    );
    package.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presentation_lists_slides_after_fixed_rels() {
        let xml = presentation_xml(2).unwrap();
        assert!(xml.contains(r#"<p:sldId id="256" r:id="rId7"/>"#));
        assert!(xml.contains(r#"<p:sldId id="257" r:id="rId8"/>"#));
        assert!(xml.contains(r#"<p:sldSz cx="12192000" cy="6858000"/>"#));

        let rels = presentation_rels(2).unwrap();
        assert!(rels.contains(r#"Id="rId8" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/slide" Target="slides/slide2.xml""#));
    }

    #[test]
    fn test_core_title_is_escaped() {
        assert!(core_xml("电工 & 安全").contains("<dc:title>电工 &amp; 安全</dc:title>"));
    }

    #[test]
    fn test_notes_keep_lines() {
        let xml = notes_xml("第一行\n第二行").unwrap();
        assert!(xml.contains("<a:t>第一行</a:t>"));
        assert!(xml.contains("<a:t>第二行</a:t>"));
    }
}
