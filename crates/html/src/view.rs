//! Template views.
//!
//! Everything the templates print is precomputed here so the templates stay
//! free of logic beyond loops and flags.

use askama::Template;
use deck_core::{Error, ImageSlotRequest, LayoutId, RenderBranch, Result, SlidePage};

/// Caption shown inside an unfilled placeholder.
pub const PLACEHOLDER_CAPTION: &str = "[配图区域]";

/// Height of a panel or cell caption strip, as a fraction of the canvas.
const LABEL_HEIGHT: f64 = 0.06;

fn percent(v: f64) -> String {
    format!("{:.2}%", v * 100.0)
}

pub struct SlotView {
    pub slot_id: String,
    pub position: String,
    pub style: String,
    pub caption: &'static str,
    /// Caption strip for comparison panels and grid cells; empty when unused.
    pub label: String,
    pub label_style: String,
}

impl SlotView {
    fn new(slot: &ImageSlotRequest, label: Option<&str>, label_above: bool) -> Self {
        let r = slot.rect;
        let label_top = if label_above {
            (r.y - LABEL_HEIGHT).max(0.0)
        } else {
            (r.y + r.h - LABEL_HEIGHT).max(0.0)
        };
        Self {
            slot_id: slot.slot_id.clone(),
            position: slot.layout_position.clone(),
            style: format!(
                "left:{};top:{};width:{};height:{}",
                percent(r.x),
                percent(r.y),
                percent(r.w),
                percent(r.h)
            ),
            caption: PLACEHOLDER_CAPTION,
            label: label.unwrap_or_default().to_string(),
            label_style: format!(
                "left:{};top:{};width:{};height:{}",
                percent(r.x),
                percent(label_top),
                percent(r.w),
                percent(LABEL_HEIGHT)
            ),
        }
    }
}

/// Per-page data shared by all branch templates.
pub struct PageView {
    pub number: usize,
    pub title: String,
    pub subtitle: String,
    pub has_subtitle: bool,
    pub bullets: Vec<String>,
    pub slots: Vec<SlotView>,
}

impl PageView {
    pub fn new(page: &SlidePage, branch: RenderBranch, slots: &[ImageSlotRequest]) -> Self {
        let bullets: Vec<String> = page.bullets().into_iter().map(str::to_string).collect();
        let subtitle = bullets.first().cloned().unwrap_or_default();

        let slots = slots
            .iter()
            .enumerate()
            .map(|(i, slot)| match branch {
                RenderBranch::Comparison => {
                    SlotView::new(slot, bullets.get(i).map(String::as_str), true)
                }
                RenderBranch::Grid => SlotView::new(slot, bullets.get(i).map(String::as_str), false),
                _ => SlotView::new(slot, None, false),
            })
            .collect();

        Self {
            number: page.index + 1,
            title: page.title.clone(),
            has_subtitle: !subtitle.is_empty(),
            subtitle,
            bullets,
            slots,
        }
    }
}

#[derive(Template)]
#[template(path = "slides/title.html")]
struct TitleBody<'a> {
    page: &'a PageView,
}

#[derive(Template)]
#[template(path = "slides/steps.html")]
struct StepsBody<'a> {
    page: &'a PageView,
}

#[derive(Template)]
#[template(path = "slides/comparison.html")]
struct ComparisonBody<'a> {
    page: &'a PageView,
}

#[derive(Template)]
#[template(path = "slides/grid.html")]
struct GridBody<'a> {
    page: &'a PageView,
}

#[derive(Template)]
#[template(path = "slides/image_paired.html")]
struct ImagePairedBody<'a> {
    page: &'a PageView,
}

#[derive(Template)]
#[template(path = "slides/text.html")]
struct TextBody<'a> {
    page: &'a PageView,
}

type BodyRenderer = fn(&PageView) -> askama::Result<String>;

/// Markup dispatch: one body template per rendering branch.
fn body_renderer(branch: RenderBranch) -> BodyRenderer {
    match branch {
        RenderBranch::Title => |page| TitleBody { page }.render(),
        RenderBranch::Steps => |page| StepsBody { page }.render(),
        RenderBranch::Comparison => |page| ComparisonBody { page }.render(),
        RenderBranch::Grid => |page| GridBody { page }.render(),
        RenderBranch::ImagePaired => |page| ImagePairedBody { page }.render(),
        RenderBranch::Text => |page| TextBody { page }.render(),
    }
}

/// A rendered page block.
pub struct SlideView {
    pub number: usize,
    pub layout_id: &'static str,
    pub branch: &'static str,
    pub slide_type: String,
    pub phase: String,
    pub has_phase: bool,
    pub notes: String,
    pub has_notes: bool,
    pub slot_count: usize,
    pub body: String,
}

impl SlideView {
    pub fn render(page: &SlidePage, layout: LayoutId, slots: &[ImageSlotRequest]) -> Result<Self> {
        let branch = RenderBranch::select(&page.slide_type, Some(layout));
        let view = PageView::new(page, branch, slots);
        let body = body_renderer(branch)(&view).map_err(|e| {
            Error::TemplateError(format!("page {} ({}): {}", view.number, branch.name(), e))
        })?;
        let phase = page.phase().unwrap_or_default().to_string();
        let notes = page.notes().unwrap_or_default().to_string();

        Ok(Self {
            number: view.number,
            layout_id: layout.as_str(),
            branch: branch.name(),
            slide_type: page.slide_type.as_str().to_string(),
            has_phase: !phase.is_empty(),
            phase,
            has_notes: !notes.is_empty(),
            notes,
            slot_count: slots.len(),
            body,
        })
    }
}

#[derive(Template)]
#[template(path = "deck.html")]
pub struct DeckTemplate<'a> {
    pub deck_title: &'a str,
    pub theme_class: &'a str,
    pub css_block: String,
    pub slides: Vec<SlideView>,
    pub total_image_slots: usize,
}
