//! Per-slide drawing.
//!
//! Each rendering branch draws onto a [`SlideCanvas`]. Every rectangle that
//! hosts an image slot is taken from the planned slot geometry, so pictures
//! and placeholders land where the HTML preview put them.

use std::collections::HashMap;
use std::fmt::Write as FmtWrite;
use std::path::PathBuf;

use deck_core::{Error, ImageSlotRequest, LayoutId, RenderBranch, Rect, Result, SlidePage, StyleConfig};

use crate::media::LoadedImage;
use crate::shape::{EmuRect, Fill, Geometry, Outline, Shape, TextStyle};

/// Caption drawn inside an empty image placeholder.
pub const PLACEHOLDER_CAPTION: &str = "[配图区域]";

/// Colors resolved once per deck from the style configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct Palette {
    pub primary: String,
    pub secondary: String,
    pub accent: String,
    pub text: String,
    pub background: String,
}

impl Palette {
    pub fn from_style(style: &StyleConfig) -> Self {
        Self {
            primary: style.color("primary"),
            secondary: style.color("secondary"),
            accent: style.color("accent"),
            text: style.color("text"),
            background: style.color("background"),
        }
    }
}

/// Body font size in points for a page carrying `chars` characters of bullets.
pub fn bullet_font_size(chars: usize) -> u32 {
    match chars {
        c if c > 400 => 14,
        c if c > 300 => 16,
        c if c > 200 => 18,
        _ => 22,
    }
}

/// A picture referenced from the slide relationships.
#[derive(Debug, Clone)]
pub struct SlideImage {
    pub rel_id: String,
    pub image: LoadedImage,
}

/// Collects the shapes, pictures and notes of one slide.
pub struct SlideCanvas<'a> {
    palette: &'a Palette,
    slot_images: &'a HashMap<String, PathBuf>,
    shapes: Vec<Shape>,
    images: Vec<SlideImage>,
}

impl<'a> SlideCanvas<'a> {
    pub fn new(palette: &'a Palette, slot_images: &'a HashMap<String, PathBuf>) -> Self {
        Self {
            palette,
            slot_images,
            shapes: Vec::new(),
            images: Vec::new(),
        }
    }

    pub fn push(&mut self, shape: Shape) {
        self.shapes.push(shape);
    }

    /// Embed the image bound to `slot_id`, if one is bound and loadable.
    /// Returns whether a picture was placed.
    fn try_picture(&mut self, slot_id: &str, rect: EmuRect) -> bool {
        let Some(path) = self.slot_images.get(slot_id) else {
            return false;
        };
        match LoadedImage::load(path) {
            Ok(image) => {
                // rId1 is the slide layout.
                let rel_id = format!("rId{}", self.images.len() + 2);
                self.shapes
                    .push(Shape::picture(slot_id, rect, rel_id.clone(), "配图"));
                self.images.push(SlideImage { rel_id, image });
                true
            }
            Err(e) => {
                log::warn!("Slot {}: falling back to placeholder: {}", slot_id, e);
                false
            }
        }
    }

    /// Picture when the slot has a usable image, dashed placeholder otherwise.
    pub fn picture_or_placeholder(&mut self, slot_id: &str, rect: EmuRect) {
        if self.try_picture(slot_id, rect) {
            return;
        }
        self.push(
            Shape::auto(
                slot_id,
                rect,
                Geometry::RoundRect,
                Some(Fill::solid("F3F4F6")),
                Some(Outline {
                    color: "D1D5DB".to_string(),
                    dashed: true,
                }),
            )
            .with_body(
                vec![PLACEHOLDER_CAPTION.to_string()],
                TextStyle::new(14, "9CA3AF").italic().centered(),
            ),
        );
    }

    pub fn palette(&self) -> &Palette {
        self.palette
    }

    pub fn finish(self) -> (Vec<Shape>, Vec<SlideImage>) {
        (self.shapes, self.images)
    }
}

type BranchRenderer = fn(&mut SlideCanvas, &SlidePage, &[ImageSlotRequest]);

/// Drawing dispatch: one renderer per rendering branch.
fn branch_renderer(branch: RenderBranch) -> BranchRenderer {
    match branch {
        RenderBranch::Title => draw_cover,
        RenderBranch::Steps => draw_steps,
        RenderBranch::Comparison => draw_comparison,
        RenderBranch::Grid => draw_grid,
        RenderBranch::ImagePaired => draw_image_paired,
        RenderBranch::Text => draw_text,
    }
}

fn draw_title(canvas: &mut SlideCanvas, page: &SlidePage) {
    let palette = canvas.palette().clone();
    canvas.push(Shape::text(
        "Title",
        EmuRect::inches(0.8, 0.5, 12.0, 1.0),
        vec![page.title.clone()],
        TextStyle::new(36, palette.primary).bold(),
    ));
    canvas.push(Shape::auto(
        "Title Underline",
        EmuRect::inches(0.8, 1.45, 0.8, 0.05),
        Geometry::Rect,
        Some(Fill::solid(palette.accent)),
        None,
    ));
}

fn bullet_lines(page: &SlidePage) -> Vec<String> {
    page.bullets().iter().map(|b| format!("• {}", b)).collect()
}

fn draw_bullets(canvas: &mut SlideCanvas, page: &SlidePage, rect: EmuRect) {
    let color = canvas.palette().text.clone();
    let size = bullet_font_size(page.bullet_char_count());
    canvas.push(Shape::text(
        "Bullets",
        rect,
        bullet_lines(page),
        TextStyle::new(size, color).space_after(8),
    ));
}

fn draw_cover(canvas: &mut SlideCanvas, page: &SlidePage, slots: &[ImageSlotRequest]) {
    let palette = canvas.palette().clone();
    // A cover whose title triggers a visual layout still owns that layout's slots.
    for slot in slots {
        canvas.picture_or_placeholder(&slot.slot_id, EmuRect::from_normalized(&slot.rect));
    }
    canvas.push(Shape::text(
        "Title",
        EmuRect::inches(1.0, 2.5, 11.333, 2.0),
        vec![page.title.clone()],
        TextStyle::new(54, palette.primary).bold().centered(),
    ));
    if let Some(subtitle) = page.bullets().first() {
        canvas.push(Shape::text(
            "Subtitle",
            EmuRect::inches(1.0, 4.8, 11.333, 1.0),
            vec![subtitle.to_string()],
            TextStyle::new(24, palette.secondary).centered(),
        ));
    }
}

fn draw_text(canvas: &mut SlideCanvas, page: &SlidePage, _slots: &[ImageSlotRequest]) {
    draw_title(canvas, page);
    draw_bullets(canvas, page, EmuRect::inches(0.8, 1.8, 12.0, 5.0));
}

fn draw_steps(canvas: &mut SlideCanvas, page: &SlidePage, slots: &[ImageSlotRequest]) {
    draw_title(canvas, page);
    for slot in slots {
        canvas.picture_or_placeholder(&slot.slot_id, EmuRect::from_normalized(&slot.rect));
    }
    let color = canvas.palette().text.clone();
    let steps = page
        .bullets()
        .iter()
        .enumerate()
        .map(|(i, b)| format!("{}. {}", i + 1, b))
        .collect();
    canvas.push(Shape::text(
        "Steps",
        EmuRect::inches(6.8, 1.8, 6.0, 5.0),
        steps,
        TextStyle::new(18, color).space_after(12),
    ));
}

/// Panel colors for the two sides of a comparison.
const COMPARISON_COLORS: [&str; 2] = ["27AE60", "C0392B"];

/// Caption strip height, as a fraction of the canvas.
const LABEL_HEIGHT: f64 = 0.06;

fn label_rect(slot: &Rect, above: bool) -> EmuRect {
    let y = if above {
        (slot.y - LABEL_HEIGHT).max(0.0)
    } else {
        (slot.y + slot.h - LABEL_HEIGHT).max(0.0)
    };
    EmuRect::from_normalized(&Rect {
        x: slot.x,
        y,
        w: slot.w,
        h: LABEL_HEIGHT,
    })
}

fn draw_comparison(canvas: &mut SlideCanvas, page: &SlidePage, slots: &[ImageSlotRequest]) {
    draw_title(canvas, page);
    let bullets = page.bullets();
    for (i, slot) in slots.iter().enumerate() {
        let color = COMPARISON_COLORS[i % COMPARISON_COLORS.len()];
        let rect = EmuRect::from_normalized(&slot.rect);
        if !canvas.try_picture(&slot.slot_id, rect) {
            canvas.push(Shape::auto(
                slot.slot_id.as_str(),
                rect,
                Geometry::RoundRect,
                Some(Fill::tinted(color, 80)),
                Some(Outline {
                    color: color.to_string(),
                    dashed: false,
                }),
            ));
        }
        if let Some(label) = bullets.get(i) {
            canvas.push(Shape::text(
                format!("{} label", slot.slot_id),
                label_rect(&slot.rect, true),
                vec![label.to_string()],
                TextStyle::new(20, color).bold().centered(),
            ));
        }
    }
}

fn draw_grid(canvas: &mut SlideCanvas, page: &SlidePage, slots: &[ImageSlotRequest]) {
    draw_title(canvas, page);
    let primary = canvas.palette().primary.clone();
    let bullets = page.bullets();
    for (i, slot) in slots.iter().enumerate() {
        let rect = EmuRect::from_normalized(&slot.rect);
        if !canvas.try_picture(&slot.slot_id, rect) {
            canvas.push(Shape::auto(
                slot.slot_id.as_str(),
                rect,
                Geometry::RoundRect,
                Some(Fill::solid("F8FAFC")),
                Some(Outline {
                    color: "E2E8F0".to_string(),
                    dashed: false,
                }),
            ));
        }
        if let Some(label) = bullets.get(i) {
            canvas.push(Shape::text(
                format!("{} label", slot.slot_id),
                label_rect(&slot.rect, false),
                vec![label.to_string()],
                TextStyle::new(16, primary.clone()).bold().centered(),
            ));
        }
    }
}

/// Where the bullet column goes next to the image of an image-paired layout.
fn paired_bullet_rect(layout: Option<LayoutId>) -> EmuRect {
    match layout {
        Some(LayoutId::CenterVisual) => EmuRect::from_normalized(&Rect {
            x: 0.04,
            y: 0.86,
            w: 0.92,
            h: 0.12,
        }),
        Some(LayoutId::SplitVertical) => EmuRect::from_normalized(&Rect {
            x: 0.10,
            y: 0.58,
            w: 0.80,
            h: 0.37,
        }),
        _ => EmuRect::inches(0.8, 1.8, 6.5, 5.0),
    }
}

fn draw_image_paired(canvas: &mut SlideCanvas, page: &SlidePage, slots: &[ImageSlotRequest]) {
    draw_title(canvas, page);
    draw_bullets(canvas, page, paired_bullet_rect(page.layout_id));
    for slot in slots {
        canvas.picture_or_placeholder(&slot.slot_id, EmuRect::from_normalized(&slot.rect));
    }
}

fn draw_decoration(canvas: &mut SlideCanvas) {
    let accent = canvas.palette().accent.clone();
    canvas.push(Shape::auto(
        "Decoration Bar",
        EmuRect::inches(0.0, 7.4, 13.333, 0.1),
        Geometry::Rect,
        Some(Fill::solid(accent)),
        None,
    ));
}

fn draw_phase_tag(canvas: &mut SlideCanvas, phase: &str) {
    let primary = canvas.palette().primary.clone();
    canvas.push(
        Shape::auto(
            "Phase Tag",
            EmuRect::inches(11.5, 0.3, 1.6, 0.4),
            Geometry::RoundRect,
            Some(Fill::tinted(primary, 20)),
            None,
        )
        .with_body(vec![phase.to_string()], TextStyle::new(10, "FFFFFF").centered()),
    );
}

/// One slide ready for packaging.
#[derive(Debug, Clone)]
pub struct BuiltSlide {
    pub number: usize,
    pub shapes: Vec<Shape>,
    pub images: Vec<SlideImage>,
    pub notes: Option<String>,
    pub background: String,
}

impl BuiltSlide {
    /// Draw a page through its branch renderer plus the shared decorations.
    pub fn draw(
        page: &SlidePage,
        slots: &[ImageSlotRequest],
        palette: &Palette,
        slot_images: &HashMap<String, PathBuf>,
    ) -> Self {
        let branch = RenderBranch::select(&page.slide_type, page.layout_id);
        let mut canvas = SlideCanvas::new(palette, slot_images);

        branch_renderer(branch)(&mut canvas, page, slots);
        draw_decoration(&mut canvas);
        if let Some(phase) = page.phase() {
            draw_phase_tag(&mut canvas, phase);
        }

        let (shapes, images) = canvas.finish();
        log::debug!(
            "Slide {} ({}): {} shapes, {} pictures",
            page.index + 1,
            branch.name(),
            shapes.len(),
            images.len()
        );
        Self {
            number: page.index + 1,
            shapes,
            images,
            notes: page.notes().map(str::to_string),
            background: palette.background.clone(),
        }
    }

    /// Relationship id of the notes slide, after the layout and pictures.
    pub fn notes_rel_id(&self) -> String {
        format!("rId{}", self.images.len() + 2)
    }

    /// Serialize as `ppt/slides/slideN.xml`.
    pub fn to_xml(&self) -> Result<String> {
        let mut xml = String::with_capacity(4096);
        xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
        xml.push_str(r#"<p:sld xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main">"#);
        write!(
            xml,
            r#"<p:cSld><p:bg><p:bgPr><a:solidFill><a:srgbClr val="{}"/></a:solidFill><a:effectLst/></p:bgPr></p:bg><p:spTree>"#,
            self.background
        )
        .map_err(|e| Error::XmlError(e.to_string()))?;
        xml.push_str(r#"<p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr>"#);
        xml.push_str(r#"<p:grpSpPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="0" cy="0"/><a:chOff x="0" y="0"/><a:chExt cx="0" cy="0"/></a:xfrm></p:grpSpPr>"#);
        for (i, shape) in self.shapes.iter().enumerate() {
            shape.to_xml(&mut xml, i as u32 + 2)?;
        }
        xml.push_str(r#"</p:spTree></p:cSld><p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:sld>"#);
        Ok(xml)
    }
}
