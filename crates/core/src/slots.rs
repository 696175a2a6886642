//! Image slot planning.
//!
//! Every layout owns a fixed list of placeholder rectangles in normalized
//! canvas coordinates. Both renderers read the same table, which is what keeps
//! the placeholders of the markup and presentation artifacts aligned.

use crate::layout::LayoutId;
use crate::types::{ImageSlotRequest, Rect, SlidePage, SlideType, VisualStyle};

/// One placeholder position of a layout.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SlotGeometry {
    /// Position tag, e.g. `right` or `grid_2`.
    pub position: &'static str,
    pub rect: Rect,
}

const fn slot(position: &'static str, x: f64, y: f64, w: f64, h: f64) -> SlotGeometry {
    SlotGeometry {
        position,
        rect: Rect { x, y, w, h },
    }
}

const RIGHT_IMAGE: &[SlotGeometry] = &[slot("right", 0.58, 0.18, 0.38, 0.72)];

const STEPS_IMAGE: &[SlotGeometry] = &[slot("left", 0.04, 0.18, 0.42, 0.72)];

const COMPARISON_PANELS: &[SlotGeometry] = &[
    slot("left", 0.04, 0.25, 0.42, 0.50),
    slot("right", 0.54, 0.25, 0.42, 0.50),
];

const GRID_CELLS: &[SlotGeometry] = &[
    slot("grid_0", 0.05, 0.20, 0.42, 0.35),
    slot("grid_1", 0.53, 0.20, 0.42, 0.35),
    slot("grid_2", 0.05, 0.58, 0.42, 0.35),
    slot("grid_3", 0.53, 0.58, 0.42, 0.35),
];

const CENTER_IMAGE: &[SlotGeometry] = &[slot("center", 0.20, 0.20, 0.60, 0.65)];

const TOP_IMAGE: &[SlotGeometry] = &[slot("top", 0.10, 0.15, 0.80, 0.40)];

/// Aspect ratio requested for every generated image.
const ASPECT_RATIO: &str = "16:9";

/// Title words carried into the keyword list.
const TITLE_KEYWORDS: usize = 3;

/// Plans image slots for a page from its resolved layout.
#[derive(Debug, Clone, Copy, Default)]
pub struct SlotPlanner;

impl SlotPlanner {
    /// Create a new slot planner.
    pub fn new() -> Self {
        Self
    }

    /// Placeholder geometry for a layout; empty for text-only layouts.
    pub fn geometry(layout: LayoutId) -> &'static [SlotGeometry] {
        match layout {
            LayoutId::TitleBulletsRightImg => RIGHT_IMAGE,
            LayoutId::OperationSteps => STEPS_IMAGE,
            LayoutId::ConceptComparison => COMPARISON_PANELS,
            LayoutId::Grid4 => GRID_CELLS,
            LayoutId::CenterVisual => CENTER_IMAGE,
            LayoutId::SplitVertical => TOP_IMAGE,
            LayoutId::TitleOnlyCenter
            | LayoutId::TitleBullets
            | LayoutId::TimelineHorizontal
            | LayoutId::TocSidebarRight => &[],
        }
    }

    /// Slot id for the `slot`-th placeholder on page `page_index`.
    pub fn slot_id(page_index: usize, slot: usize) -> String {
        format!("p{}_slot{}", page_index, slot)
    }

    /// Image style for a page type and layout.
    pub fn visual_style(slide_type: &SlideType, layout: LayoutId) -> VisualStyle {
        match (slide_type, layout) {
            (SlideType::Steps, _) => VisualStyle::Photo,
            (SlideType::Other(name), _) if name == "demonstration" => VisualStyle::Photo,
            (SlideType::Concept | SlideType::Intro, _) => VisualStyle::Schematic,
            (_, LayoutId::Grid4) => VisualStyle::Icon,
            (_, LayoutId::CenterVisual) => VisualStyle::Diagram,
            _ => VisualStyle::Illustration,
        }
    }

    /// Slide type followed by the first title words, colons treated as spaces.
    fn keywords(page: &SlidePage) -> Vec<String> {
        let mut keywords = vec![page.slide_type.as_str().to_string()];
        let title = page.title.replace(['：', ':'], " ");
        keywords.extend(
            title
                .split_whitespace()
                .take(TITLE_KEYWORDS)
                .map(str::to_string),
        );
        keywords
    }

    /// Plan the slot requests for one page.
    pub fn plan_slots(&self, page: &SlidePage, layout: LayoutId) -> Vec<ImageSlotRequest> {
        let geometry = Self::geometry(layout);
        if geometry.is_empty() {
            return Vec::new();
        }

        let keywords = Self::keywords(page);
        let visual_style = Self::visual_style(&page.slide_type, layout);
        let context = page.notes().unwrap_or(&page.title).to_string();

        geometry
            .iter()
            .enumerate()
            .map(|(i, g)| ImageSlotRequest {
                slot_id: Self::slot_id(page.index, i),
                page_index: page.index,
                theme: page.title.clone(),
                keywords: keywords.clone(),
                visual_style,
                aspect_ratio: ASPECT_RATIO.to_string(),
                context: context.clone(),
                layout_position: g.position.to_string(),
                rect: g.rect,
                priority: if i == 0 { 1 } else { 2 },
            })
            .collect()
    }
}
