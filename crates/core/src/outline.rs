//! Conversion from stored outline pages to renderable slide pages.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::LazyLock;

use crate::pedagogy::PedagogyDefinition;
use crate::types::{ElementContent, ElementType, Rect, SlideElement, SlidePage, SlideType};

/// A list marker at the start of a line: `- `, `• ` or `* `.
static BULLET_MARKER_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[-•*] (.*)$").unwrap());

/// Label lines from the outline generator that never become bullets.
const LABEL_PREFIXES: &[&str] = &["页面标题", "页面文字"];

/// Unmarked lines need more than this many characters to count as content.
const MIN_PLAIN_LINE_CHARS: usize = 3;

/// One page of a stored outline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutlinePage {
    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub slide_type: Option<SlideType>,

    #[serde(default)]
    pub pedagogy_phase: Option<String>,
}

impl OutlinePage {
    /// Bullet items parsed from the description.
    pub fn bullets(&self) -> Vec<String> {
        self.description
            .lines()
            .map(str::trim)
            .filter_map(|line| {
                if let Some(caps) = BULLET_MARKER_REGEX.captures(line) {
                    return Some(caps[1].trim().to_string());
                }
                let is_label = LABEL_PREFIXES.iter().any(|p| line.starts_with(p));
                (!is_label && line.chars().count() > MIN_PLAIN_LINE_CHARS)
                    .then(|| line.to_string())
            })
            .collect()
    }

    /// Build the slide page at `index`. The first page is always the cover;
    /// otherwise an explicit type wins, then the pedagogy phase mapping.
    pub fn into_slide_page(
        self,
        index: usize,
        pedagogy: Option<&PedagogyDefinition>,
    ) -> SlidePage {
        let items = self.bullets();
        let phase_type = || {
            let phase = self.pedagogy_phase.as_deref()?;
            pedagogy?.slide_type_for_phase(phase)
        };
        let slide_type = if index == 0 {
            SlideType::Title
        } else {
            self.slide_type
                .or_else(phase_type)
                .unwrap_or(SlideType::Concept)
        };

        let mut elements = Vec::new();
        if !items.is_empty() {
            elements.push(SlideElement {
                id: format!("bullets_{}", index),
                element_type: ElementType::Bullets,
                content: ElementContent::Wrapped { items },
                rect: Rect::FULL,
                style: BTreeMap::new(),
            });
        }

        SlidePage {
            index,
            slide_type,
            title: self.title,
            elements,
            layout_id: None,
            speaker_notes: self.description,
            pedagogy_phase: self.pedagogy_phase,
        }
    }
}

/// Convert a whole outline, numbering pages in order.
pub fn outline_to_pages(
    outline: Vec<OutlinePage>,
    pedagogy: Option<&PedagogyDefinition>,
) -> Vec<SlidePage> {
    outline
        .into_iter()
        .enumerate()
        .map(|(index, page)| page.into_slide_page(index, pedagogy))
        .collect()
}
