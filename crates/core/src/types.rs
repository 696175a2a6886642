//! Domain types for slide decks, planned image slots and render results.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::layout::LayoutId;

/// The instructional role of a page. Drives the default layout choice.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SlideType {
    Title,
    Toc,
    Section,
    Intro,
    Concept,
    Steps,
    Comparison,
    Exercises,
    Summary,
    ThankYou,
    /// Any other type name, kept as written.
    Other(String),
}

impl SlideType {
    /// Wire name of this slide type.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Title => "title",
            Self::Toc => "toc",
            Self::Section => "section",
            Self::Intro => "intro",
            Self::Concept => "concept",
            Self::Steps => "steps",
            Self::Comparison => "comparison",
            Self::Exercises => "exercises",
            Self::Summary => "summary",
            Self::ThankYou => "thank_you",
            Self::Other(name) => name,
        }
    }
}

impl From<String> for SlideType {
    fn from(name: String) -> Self {
        match name.as_str() {
            "title" => Self::Title,
            "toc" => Self::Toc,
            "section" => Self::Section,
            "intro" => Self::Intro,
            "concept" => Self::Concept,
            "steps" => Self::Steps,
            "comparison" => Self::Comparison,
            "exercises" => Self::Exercises,
            "summary" => Self::Summary,
            "thank_you" => Self::ThankYou,
            _ => Self::Other(name),
        }
    }
}

impl From<SlideType> for String {
    fn from(slide_type: SlideType) -> Self {
        match slide_type {
            SlideType::Other(name) => name,
            known => known.as_str().to_string(),
        }
    }
}

/// Kind of content carried by a slide element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementType {
    Text,
    Bullets,
    Image,
    Table,
    Diagram,
    #[serde(other)]
    Other,
}

/// Polymorphic element payload.
///
/// Bullet lists arrive either as a bare list of strings or wrapped as
/// `{"items": [...]}`; both forms expose the same items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ElementContent {
    Items(Vec<String>),
    Wrapped { items: Vec<String> },
    Text(String),
    Other(serde_json::Value),
}

impl Default for ElementContent {
    fn default() -> Self {
        Self::Text(String::new())
    }
}

impl ElementContent {
    /// List items carried by this payload; empty for non-list content.
    pub fn items(&self) -> &[String] {
        match self {
            Self::Items(items) | Self::Wrapped { items } => items,
            _ => &[],
        }
    }
}

/// A rectangle in normalized canvas coordinates, every component in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawRect")]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl Rect {
    /// The whole canvas.
    pub const FULL: Rect = Rect {
        x: 0.0,
        y: 0.0,
        w: 1.0,
        h: 1.0,
    };

    /// Create a rectangle, rejecting components outside `[0, 1]`.
    pub fn new(x: f64, y: f64, w: f64, h: f64) -> crate::Result<Self> {
        let rect = Self { x, y, w, h };
        if rect.is_normalized() {
            Ok(rect)
        } else {
            Err(crate::Error::InvalidGeometry(format!(
                "({}, {}, {}, {}) is outside [0, 1]",
                x, y, w, h
            )))
        }
    }

    /// Whether every component lies in `[0, 1]`.
    pub fn is_normalized(&self) -> bool {
        [self.x, self.y, self.w, self.h]
            .iter()
            .all(|v| (0.0..=1.0).contains(v))
    }

    /// Scale to absolute units on a canvas of the given size.
    /// Returns `(left, top, width, height)`.
    pub fn scale(&self, canvas_width: i64, canvas_height: i64) -> (i64, i64, i64, i64) {
        let cw = canvas_width as f64;
        let ch = canvas_height as f64;
        (
            (self.x * cw).round() as i64,
            (self.y * ch).round() as i64,
            (self.w * cw).round() as i64,
            (self.h * ch).round() as i64,
        )
    }
}

impl Default for Rect {
    fn default() -> Self {
        Self::FULL
    }
}

#[derive(Deserialize)]
struct RawRect {
    #[serde(default)]
    x: f64,
    #[serde(default)]
    y: f64,
    #[serde(default = "one")]
    w: f64,
    #[serde(default = "one")]
    h: f64,
}

fn one() -> f64 {
    1.0
}

impl TryFrom<RawRect> for Rect {
    type Error = String;

    fn try_from(raw: RawRect) -> std::result::Result<Self, Self::Error> {
        Rect::new(raw.x, raw.y, raw.w, raw.h).map_err(|e| e.to_string())
    }
}

/// A single element placed on a page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlideElement {
    pub id: String,

    #[serde(rename = "type", alias = "element_type")]
    pub element_type: ElementType,

    #[serde(default, deserialize_with = "null_as_default")]
    pub content: ElementContent,

    /// Normalized placement on the canvas.
    #[serde(flatten)]
    pub rect: Rect,

    /// Free-form style properties.
    #[serde(default)]
    pub style: BTreeMap<String, String>,
}

impl SlideElement {
    /// Create a full-canvas bullet list element.
    pub fn bullets<I, S>(id: impl Into<String>, items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id: id.into(),
            element_type: ElementType::Bullets,
            content: ElementContent::Items(items.into_iter().map(Into::into).collect()),
            rect: Rect::FULL,
            style: BTreeMap::new(),
        }
    }
}

/// A page of the deck as consumed by the layout engine and renderers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlidePage {
    /// 0-based position in the deck.
    pub index: usize,

    pub slide_type: SlideType,

    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub elements: Vec<SlideElement>,

    /// Set by the layout engine during a render pass.
    #[serde(default)]
    pub layout_id: Option<LayoutId>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub speaker_notes: String,

    #[serde(default)]
    pub pedagogy_phase: Option<String>,
}

impl SlidePage {
    /// Create an empty page.
    pub fn new(index: usize, slide_type: SlideType, title: impl Into<String>) -> Self {
        Self {
            index,
            slide_type,
            title: title.into(),
            elements: Vec::new(),
            layout_id: None,
            speaker_notes: String::new(),
            pedagogy_phase: None,
        }
    }

    /// Add a bullet list element.
    pub fn with_bullets<I, S>(mut self, items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let id = format!("bullets_{}_{}", self.index, self.elements.len());
        self.elements.push(SlideElement::bullets(id, items));
        self
    }

    /// Set the speaker notes.
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.speaker_notes = notes.into();
        self
    }

    /// Set the pedagogy phase label.
    pub fn with_phase(mut self, phase: impl Into<String>) -> Self {
        self.pedagogy_phase = Some(phase.into());
        self
    }

    /// All bullet items from every bullets element, in element order.
    pub fn bullets(&self) -> Vec<&str> {
        self.elements
            .iter()
            .filter(|e| e.element_type == ElementType::Bullets)
            .flat_map(|e| e.content.items().iter().map(String::as_str))
            .collect()
    }

    /// Total bullet length in characters (not bytes).
    pub fn bullet_char_count(&self) -> usize {
        self.bullets().iter().map(|b| b.chars().count()).sum()
    }

    /// Title followed by all bullet text; the haystack for keyword triggers.
    pub fn keyword_text(&self) -> String {
        let mut text = self.title.clone();
        text.push(' ');
        text.push_str(&self.bullets().join(" "));
        text
    }

    /// The pedagogy phase, if set to a non-empty label.
    pub fn phase(&self) -> Option<&str> {
        self.pedagogy_phase
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
    }

    /// Speaker notes, if any.
    pub fn notes(&self) -> Option<&str> {
        Some(self.speaker_notes.as_str()).filter(|n| !n.trim().is_empty())
    }
}

/// Check that every page's `index` equals its position.
///
/// Slot ids and page numbers are derived from `index`, so a gap or a
/// duplicate would give two slots the same id.
pub fn check_page_order(pages: &[SlidePage]) -> crate::Result<()> {
    match pages.iter().enumerate().find(|(i, p)| p.index != *i) {
        Some((position, page)) => Err(crate::Error::InvalidPageIndex(format!(
            "page at position {} has index {}",
            position, page.index
        ))),
        None => Ok(()),
    }
}

/// Number pages by position. Returns how many indexes changed.
pub fn renumber_pages(pages: &mut [SlidePage]) -> usize {
    let mut changed = 0;
    for (i, page) in pages.iter_mut().enumerate() {
        if page.index != i {
            page.index = i;
            changed += 1;
        }
    }
    changed
}

/// Rendering style requested for a generated image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VisualStyle {
    Photo,
    Schematic,
    Diagram,
    Icon,
    Illustration,
}

impl VisualStyle {
    /// Style guidance handed to the image generator.
    pub fn hint(&self) -> &'static str {
        match self {
            Self::Photo => "真实照片风格，高清专业",
            Self::Schematic => "技术示意图，清晰线条，专业标注",
            Self::Diagram => "图表风格，数据可视化",
            Self::Icon => "简洁图标风格，扁平化设计",
            Self::Illustration => "插画风格，教育配图",
        }
    }
}

/// A planned placeholder region awaiting an image from the external pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageSlotRequest {
    /// `p{page_index}_slot{i}`, unique within a render pass.
    pub slot_id: String,
    pub page_index: usize,
    pub theme: String,
    pub keywords: Vec<String>,
    pub visual_style: VisualStyle,
    pub aspect_ratio: String,
    pub context: String,
    /// Position tag such as `left`, `right` or `grid_0`.
    pub layout_position: String,
    #[serde(flatten)]
    pub rect: Rect,
    /// 1 is the highest priority.
    pub priority: u8,
}

impl ImageSlotRequest {
    /// Compose the generation prompt for this slot.
    pub fn prompt(&self, subject: &str) -> String {
        format!(
            "为高职教育课件生成配图：\n\n\
             主题：{}\n\
             关键词：{}\n\
             上下文：{}\n\
             视觉风格：{}\n\n\
             要求：\n\
             1. 专业、清晰、适合教学展示\n\
             2. {} 宽高比\n\
             3. 无文字水印\n\
             4. 风格统一，适合PPT使用\n\
             5. 背景简洁，主体突出\n\
             6. 符合{}专业特点",
            self.theme,
            self.keywords.join(", "),
            self.context,
            self.visual_style.hint(),
            self.aspect_ratio,
            subject
        )
    }
}

/// Outcome of a markup render pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderResult {
    /// Where the markup artifact was written.
    pub html_path: PathBuf,

    /// Every slot planned across the deck, in page order.
    pub image_slots: Vec<ImageSlotRequest>,

    /// Layout usage histogram; values sum to `total_pages`.
    pub layouts_used: BTreeMap<LayoutId, usize>,

    pub total_pages: usize,

    /// Content warnings, in page order.
    pub warnings: Vec<String>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bullets_from_both_content_forms() {
        let json = r#"{
            "index": 1,
            "slide_type": "concept",
            "title": "Ohm",
            "elements": [
                {"id": "a", "type": "bullets", "content": ["one", "two"]},
                {"id": "b", "type": "bullets", "content": {"items": ["three"]}},
                {"id": "c", "type": "text", "content": "not a bullet"}
            ]
        }"#;
        let page: SlidePage = serde_json::from_str(json).unwrap();
        assert_eq!(page.bullets(), vec!["one", "two", "three"]);
        assert_eq!(page.layout_id, None);
    }

    #[test]
    fn test_null_title_and_notes_are_empty() {
        let json = r#"{"index": 0, "slide_type": "title", "title": null, "speaker_notes": null}"#;
        let page: SlidePage = serde_json::from_str(json).unwrap();
        assert_eq!(page.title, "");
        assert_eq!(page.notes(), None);
        assert!(page.bullets().is_empty());
    }

    #[test]
    fn test_page_order_checked_and_renumbered() {
        let mut pages = vec![
            SlidePage::new(0, SlideType::Title, "a"),
            SlidePage::new(1, SlideType::Concept, "b"),
            SlidePage::new(1, SlideType::Concept, "c"),
        ];
        let err = check_page_order(&pages).unwrap_err();
        assert!(matches!(err, crate::Error::InvalidPageIndex(ref msg) if msg.contains("position 2")));

        assert_eq!(renumber_pages(&mut pages), 1);
        assert_eq!(pages[2].index, 2);
        assert!(check_page_order(&pages).is_ok());
        assert!(check_page_order(&[]).is_ok());
    }

    #[test]
    fn test_unknown_slide_type_keeps_its_name() {
        let json = r#"{"index": 0, "slide_type": "demonstration"}"#;
        let page: SlidePage = serde_json::from_str(json).unwrap();
        assert_eq!(page.slide_type, SlideType::Other("demonstration".to_string()));
        assert_eq!(page.slide_type.as_str(), "demonstration");
        assert_eq!(
            serde_json::to_value(&page.slide_type).unwrap(),
            serde_json::json!("demonstration")
        );
        assert_eq!(
            serde_json::from_str::<SlideType>(r#""thank_you""#).unwrap(),
            SlideType::ThankYou
        );
    }

    #[test]
    fn test_element_geometry_defaults_and_range() {
        let ok: SlideElement =
            serde_json::from_str(r#"{"id": "e", "type": "image", "x": 0.5, "y": 0.25}"#).unwrap();
        assert_eq!(
            ok.rect,
            Rect {
                x: 0.5,
                y: 0.25,
                w: 1.0,
                h: 1.0
            }
        );

        let bad = serde_json::from_str::<SlideElement>(r#"{"id": "e", "type": "image", "x": 1.5}"#);
        assert!(bad.is_err());
    }

    #[test]
    fn test_bullet_char_count_counts_chars() {
        let page = SlidePage::new(0, SlideType::Concept, "t").with_bullets(["电压", "abc"]);
        assert_eq!(page.bullet_char_count(), 5);
    }

    #[test]
    fn test_keyword_text_joins_title_and_bullets() {
        let page = SlidePage::new(0, SlideType::Concept, "安全").with_bullets(["操作规范"]);
        assert_eq!(page.keyword_text(), "安全 操作规范");
    }

    #[test]
    fn test_blank_phase_is_none() {
        let page = SlidePage::new(0, SlideType::Concept, "t").with_phase("  ");
        assert_eq!(page.phase(), None);
        let page = page.with_phase("情境导入");
        assert_eq!(page.phase(), Some("情境导入"));
    }

    #[test]
    fn test_rect_scale() {
        let rect = Rect::new(0.5, 0.25, 0.25, 0.5).unwrap();
        assert_eq!(rect.scale(1000, 400), (500, 100, 250, 200));
        assert!(Rect::new(-0.1, 0.0, 0.5, 0.5).is_err());
    }

    #[test]
    fn test_slot_request_json_is_flat() {
        let slot = ImageSlotRequest {
            slot_id: "p0_slot0".to_string(),
            page_index: 0,
            theme: "t".to_string(),
            keywords: vec!["concept".to_string()],
            visual_style: VisualStyle::Schematic,
            aspect_ratio: "16:9".to_string(),
            context: "t".to_string(),
            layout_position: "right".to_string(),
            rect: Rect::new(0.58, 0.18, 0.38, 0.72).unwrap(),
            priority: 1,
        };
        let value = serde_json::to_value(&slot).unwrap();
        assert_eq!(value["x"], 0.58);
        assert_eq!(value["visual_style"], "schematic");
        assert!(slot.prompt("机电").contains("技术示意图"));
    }
}
