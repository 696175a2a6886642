//! Slide shapes and their DrawingML serialization.

use quick_xml::escape::escape;
use std::fmt::Write as FmtWrite;

use deck_core::{Error, Rect, Result};

use crate::{CANVAS_HEIGHT, CANVAS_WIDTH, EMU_PER_INCH};

/// An absolute rectangle in EMU.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmuRect {
    pub x: i64,
    pub y: i64,
    pub cx: i64,
    pub cy: i64,
}

impl EmuRect {
    /// Rectangle from inch measurements.
    pub fn inches(x: f64, y: f64, w: f64, h: f64) -> Self {
        let emu = |v: f64| (v * EMU_PER_INCH as f64).round() as i64;
        Self {
            x: emu(x),
            y: emu(y),
            cx: emu(w),
            cy: emu(h),
        }
    }

    /// Scale a normalized rectangle onto the canvas.
    pub fn from_normalized(rect: &Rect) -> Self {
        let (x, y, cx, cy) = rect.scale(CANVAS_WIDTH, CANVAS_HEIGHT);
        Self { x, y, cx, cy }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Center,
}

impl Align {
    fn attr(&self) -> &'static str {
        match self {
            Self::Left => "l",
            Self::Center => "ctr",
        }
    }
}

/// Character and paragraph formatting applied to every paragraph of a body.
#[derive(Debug, Clone, PartialEq)]
pub struct TextStyle {
    /// Points.
    pub size: u32,
    /// Six hex digits, no `#`.
    pub color: String,
    pub bold: bool,
    pub italic: bool,
    pub align: Align,
    /// Space after each paragraph, in points.
    pub space_after: u32,
    pub anchor_center: bool,
}

impl TextStyle {
    pub fn new(size: u32, color: impl Into<String>) -> Self {
        Self {
            size,
            color: color.into(),
            bold: false,
            italic: false,
            align: Align::Left,
            space_after: 0,
            anchor_center: false,
        }
    }

    pub fn bold(mut self) -> Self {
        self.bold = true;
        self
    }

    pub fn italic(mut self) -> Self {
        self.italic = true;
        self
    }

    pub fn centered(mut self) -> Self {
        self.align = Align::Center;
        self.anchor_center = true;
        self
    }

    pub fn space_after(mut self, points: u32) -> Self {
        self.space_after = points;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextBody {
    pub paragraphs: Vec<String>,
    pub style: TextStyle,
}

/// A solid fill, optionally tinted towards white.
#[derive(Debug, Clone, PartialEq)]
pub struct Fill {
    pub color: String,
    /// Percentage of white mixed in, 0 to 100.
    pub tint: u32,
}

impl Fill {
    pub fn solid(color: impl Into<String>) -> Self {
        Self {
            color: color.into(),
            tint: 0,
        }
    }

    pub fn tinted(color: impl Into<String>, tint: u32) -> Self {
        Self {
            color: color.into(),
            tint: tint.min(100),
        }
    }

    fn write(&self, xml: &mut String) -> Result<()> {
        if self.tint == 0 {
            write!(xml, r#"<a:solidFill><a:srgbClr val="{}"/></a:solidFill>"#, self.color)
                .map_err(|e| Error::XmlError(e.to_string()))
        } else {
            write!(
                xml,
                r#"<a:solidFill><a:srgbClr val="{}"><a:lumMod val="{}"/><a:lumOff val="{}"/></a:srgbClr></a:solidFill>"#,
                self.color,
                (100 - self.tint) * 1000,
                self.tint * 1000
            )
            .map_err(|e| Error::XmlError(e.to_string()))
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Outline {
    pub color: String,
    pub dashed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Geometry {
    Rect,
    RoundRect,
}

impl Geometry {
    fn preset(&self) -> &'static str {
        match self {
            Self::Rect => "rect",
            Self::RoundRect => "roundRect",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ShapeKind {
    /// A text box without fill.
    Text(TextBody),
    /// A preset geometry with optional fill, outline and text.
    Auto {
        geometry: Geometry,
        fill: Option<Fill>,
        outline: Option<Outline>,
        body: Option<TextBody>,
    },
    /// An embedded image referenced through the slide relationships.
    Picture { rel_id: String, description: String },
}

/// A named shape placed on a slide.
#[derive(Debug, Clone, PartialEq)]
pub struct Shape {
    pub name: String,
    pub rect: EmuRect,
    pub kind: ShapeKind,
}

impl Shape {
    pub fn text(name: impl Into<String>, rect: EmuRect, paragraphs: Vec<String>, style: TextStyle) -> Self {
        Self {
            name: name.into(),
            rect,
            kind: ShapeKind::Text(TextBody { paragraphs, style }),
        }
    }

    pub fn auto(
        name: impl Into<String>,
        rect: EmuRect,
        geometry: Geometry,
        fill: Option<Fill>,
        outline: Option<Outline>,
    ) -> Self {
        Self {
            name: name.into(),
            rect,
            kind: ShapeKind::Auto {
                geometry,
                fill,
                outline,
                body: None,
            },
        }
    }

    /// Attach text to a preset shape. Has no effect on other kinds.
    pub fn with_body(mut self, paragraphs: Vec<String>, style: TextStyle) -> Self {
        if let ShapeKind::Auto { ref mut body, .. } = self.kind {
            *body = Some(TextBody { paragraphs, style });
        }
        self
    }

    pub fn picture(name: impl Into<String>, rect: EmuRect, rel_id: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rect,
            kind: ShapeKind::Picture {
                rel_id: rel_id.into(),
                description: description.into(),
            },
        }
    }

    /// Serialize as a `p:sp` or `p:pic` element.
    pub fn to_xml(&self, xml: &mut String, id: u32) -> Result<()> {
        match &self.kind {
            ShapeKind::Text(body) => {
                xml.push_str("<p:sp><p:nvSpPr>");
                self.write_cnvpr(xml, id, None)?;
                xml.push_str(r#"<p:cNvSpPr txBox="1"/><p:nvPr/></p:nvSpPr><p:spPr>"#);
                self.write_xfrm(xml)?;
                xml.push_str(r#"<a:prstGeom prst="rect"><a:avLst/></a:prstGeom><a:noFill/></p:spPr>"#);
                write_text_body(xml, body)?;
                xml.push_str("</p:sp>");
            }
            ShapeKind::Auto {
                geometry,
                fill,
                outline,
                body,
            } => {
                xml.push_str("<p:sp><p:nvSpPr>");
                self.write_cnvpr(xml, id, None)?;
                xml.push_str("<p:cNvSpPr/><p:nvPr/></p:nvSpPr><p:spPr>");
                self.write_xfrm(xml)?;
                write!(xml, r#"<a:prstGeom prst="{}"><a:avLst/></a:prstGeom>"#, geometry.preset())
                    .map_err(|e| Error::XmlError(e.to_string()))?;
                match fill {
                    Some(fill) => fill.write(xml)?,
                    None => xml.push_str("<a:noFill/>"),
                }
                match outline {
                    Some(outline) => {
                        write!(
                            xml,
                            r#"<a:ln w="19050"><a:solidFill><a:srgbClr val="{}"/></a:solidFill>"#,
                            outline.color
                        )
                        .map_err(|e| Error::XmlError(e.to_string()))?;
                        if outline.dashed {
                            xml.push_str(r#"<a:prstDash val="dash"/>"#);
                        }
                        xml.push_str("</a:ln>");
                    }
                    None => xml.push_str("<a:ln><a:noFill/></a:ln>"),
                }
                xml.push_str("</p:spPr>");
                if let Some(body) = body {
                    write_text_body(xml, body)?;
                }
                xml.push_str("</p:sp>");
            }
            ShapeKind::Picture {
                rel_id,
                description,
            } => {
                xml.push_str("<p:pic><p:nvPicPr>");
                self.write_cnvpr(xml, id, Some(description))?;
                xml.push_str(r#"<p:cNvPicPr><a:picLocks noChangeAspect="1"/></p:cNvPicPr><p:nvPr/></p:nvPicPr>"#);
                write!(
                    xml,
                    r#"<p:blipFill><a:blip r:embed="{}"/><a:stretch><a:fillRect/></a:stretch></p:blipFill>"#,
                    rel_id
                )
                .map_err(|e| Error::XmlError(e.to_string()))?;
                xml.push_str("<p:spPr>");
                self.write_xfrm(xml)?;
                xml.push_str(r#"<a:prstGeom prst="rect"><a:avLst/></a:prstGeom></p:spPr></p:pic>"#);
            }
        }
        Ok(())
    }

    fn write_cnvpr(&self, xml: &mut String, id: u32, description: Option<&str>) -> Result<()> {
        write!(xml, r#"<p:cNvPr id="{}" name="{}""#, id, escape(&self.name))
            .map_err(|e| Error::XmlError(e.to_string()))?;
        if let Some(descr) = description {
            write!(xml, r#" descr="{}""#, escape(descr)).map_err(|e| Error::XmlError(e.to_string()))?;
        }
        xml.push_str("/>");
        Ok(())
    }

    fn write_xfrm(&self, xml: &mut String) -> Result<()> {
        let r = &self.rect;
        write!(
            xml,
            r#"<a:xfrm><a:off x="{}" y="{}"/><a:ext cx="{}" cy="{}"/></a:xfrm>"#,
            r.x, r.y, r.cx, r.cy
        )
        .map_err(|e| Error::XmlError(e.to_string()))
    }
}

/// Serialize a `p:txBody` with one paragraph per entry.
pub(crate) fn write_text_body(xml: &mut String, body: &TextBody) -> Result<()> {
    let style = &body.style;
    write!(
        xml,
        r#"<p:txBody><a:bodyPr wrap="square" rtlCol="0" anchor="{}"><a:normAutofit/></a:bodyPr><a:lstStyle/>"#,
        if style.anchor_center { "ctr" } else { "t" }
    )
    .map_err(|e| Error::XmlError(e.to_string()))?;

    let empty = [String::new()];
    let paragraphs: &[String] = if body.paragraphs.is_empty() {
        &empty
    } else {
        &body.paragraphs
    };
    for text in paragraphs {
        write!(xml, r#"<a:p><a:pPr algn="{}">"#, style.align.attr())
            .map_err(|e| Error::XmlError(e.to_string()))?;
        if style.space_after > 0 {
            write!(xml, r#"<a:spcAft><a:spcPts val="{}"/></a:spcAft>"#, style.space_after * 100)
                .map_err(|e| Error::XmlError(e.to_string()))?;
        }
        xml.push_str("</a:pPr>");
        write!(xml, r#"<a:r><a:rPr lang="zh-CN" sz="{}""#, style.size * 100)
            .map_err(|e| Error::XmlError(e.to_string()))?;
        if style.bold {
            xml.push_str(r#" b="1""#);
        }
        if style.italic {
            xml.push_str(r#" i="1""#);
        }
        xml.push_str(r#" dirty="0">"#);
        write!(
            xml,
            r#"<a:solidFill><a:srgbClr val="{}"/></a:solidFill></a:rPr><a:t>{}</a:t></a:r></a:p>"#,
            style.color,
            escape(text)
        )
        .map_err(|e| Error::XmlError(e.to_string()))?;
    }
    xml.push_str("</p:txBody>");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalized_rect_scales_to_canvas() {
        let rect = Rect::new(0.5, 0.5, 0.25, 0.5).unwrap();
        assert_eq!(
            EmuRect::from_normalized(&rect),
            EmuRect {
                x: 6_096_000,
                y: 3_429_000,
                cx: 3_048_000,
                cy: 3_429_000
            }
        );
        assert_eq!(EmuRect::inches(1.0, 0.0, 0.5, 0.0).x, 914_400);
    }

    #[test]
    fn test_text_shape_xml_escapes() {
        let shape = Shape::text(
            "Body",
            EmuRect::inches(0.0, 0.0, 1.0, 1.0),
            vec!["a < b & c".to_string()],
            TextStyle::new(22, "1E293B").bold(),
        );
        let mut xml = String::new();
        shape.to_xml(&mut xml, 5).unwrap();
        assert!(xml.contains(r#"<p:cNvPr id="5" name="Body"/>"#));
        assert!(xml.contains("<a:t>a &lt; b &amp; c</a:t>"));
        assert!(xml.contains(r#"sz="2200" b="1""#));
    }

    #[test]
    fn test_dashed_outline_and_tint() {
        let shape = Shape::auto(
            "p1_slot0",
            EmuRect::inches(0.0, 0.0, 1.0, 1.0),
            Geometry::RoundRect,
            Some(Fill::tinted("27AE60", 80)),
            Some(Outline {
                color: "D1D5DB".to_string(),
                dashed: true,
            }),
        );
        let mut xml = String::new();
        shape.to_xml(&mut xml, 2).unwrap();
        assert!(xml.contains(r#"prst="roundRect""#));
        assert!(xml.contains(r#"<a:lumMod val="20000"/><a:lumOff val="80000"/>"#));
        assert!(xml.contains(r#"<a:prstDash val="dash"/>"#));
    }

    #[test]
    fn test_picture_references_relationship() {
        let shape = Shape::picture("p0_slot0", EmuRect::inches(0.0, 0.0, 1.0, 1.0), "rId2", "配图");
        let mut xml = String::new();
        shape.to_xml(&mut xml, 3).unwrap();
        assert!(xml.starts_with("<p:pic>"));
        assert!(xml.contains(r#"r:embed="rId2""#));
        assert!(xml.contains(r#"descr="配图""#));
    }
}
