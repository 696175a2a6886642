//! Layout decisions.
//!
//! Maps each page to one layout variant from its slide type, keyword
//! triggers in its text, the template's preferences, and the layout chosen
//! for the previous page. The previous layout is an explicit parameter so the
//! engine itself holds no per-deck state.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::registry::TemplateDefinition;
use crate::slots::SlotPlanner;
use crate::types::{SlidePage, SlideType};

/// Every known page arrangement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayoutId {
    TitleOnlyCenter,
    TitleBullets,
    TitleBulletsRightImg,
    OperationSteps,
    ConceptComparison,
    #[serde(rename = "grid_4")]
    Grid4,
    CenterVisual,
    SplitVertical,
    TimelineHorizontal,
    TocSidebarRight,
}

impl LayoutId {
    /// All layouts, in catalog order. Alternatives are drawn in this order.
    pub const ALL: [LayoutId; 10] = [
        LayoutId::TitleOnlyCenter,
        LayoutId::TitleBullets,
        LayoutId::TitleBulletsRightImg,
        LayoutId::OperationSteps,
        LayoutId::ConceptComparison,
        LayoutId::Grid4,
        LayoutId::CenterVisual,
        LayoutId::SplitVertical,
        LayoutId::TimelineHorizontal,
        LayoutId::TocSidebarRight,
    ];

    /// Wire name of this layout.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TitleOnlyCenter => "title_only_center",
            Self::TitleBullets => "title_bullets",
            Self::TitleBulletsRightImg => "title_bullets_right_img",
            Self::OperationSteps => "operation_steps",
            Self::ConceptComparison => "concept_comparison",
            Self::Grid4 => "grid_4",
            Self::CenterVisual => "center_visual",
            Self::SplitVertical => "split_vertical",
            Self::TimelineHorizontal => "timeline_horizontal",
            Self::TocSidebarRight => "toc_sidebar_right",
        }
    }

    /// The rendering family this layout belongs to.
    pub fn family(&self) -> LayoutFamily {
        match self {
            Self::OperationSteps => LayoutFamily::Steps,
            Self::ConceptComparison => LayoutFamily::Comparison,
            Self::Grid4 => LayoutFamily::Grid,
            Self::TitleBulletsRightImg | Self::CenterVisual | Self::SplitVertical => {
                LayoutFamily::ImagePaired
            }
            Self::TitleOnlyCenter
            | Self::TitleBullets
            | Self::TimelineHorizontal
            | Self::TocSidebarRight => LayoutFamily::Text,
        }
    }
}

impl fmt::Display for LayoutId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LayoutId {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|id| id.as_str() == s)
            .ok_or_else(|| crate::Error::UnknownLayout(s.to_string()))
    }
}

/// Tag grouping layouts that render the same way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayoutFamily {
    Steps,
    Comparison,
    Grid,
    ImagePaired,
    Text,
}

impl LayoutFamily {
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Steps => "steps",
            Self::Comparison => "comparison",
            Self::Grid => "grid",
            Self::ImagePaired => "image-paired",
            Self::Text => "text",
        }
    }
}

/// The rendering branch a backend takes for one page.
///
/// Closed set: each backend maps every variant to its own renderer, so a new
/// layout only needs a family assignment above.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenderBranch {
    Title,
    Steps,
    Comparison,
    Grid,
    ImagePaired,
    Text,
}

impl RenderBranch {
    /// Select the branch for a page. Cover pages always use the title branch;
    /// pages without a resolved layout fall back to text.
    pub fn select(slide_type: &SlideType, layout: Option<LayoutId>) -> Self {
        if *slide_type == SlideType::Title {
            return Self::Title;
        }
        match layout.map(|l| l.family()) {
            Some(LayoutFamily::Steps) => Self::Steps,
            Some(LayoutFamily::Comparison) => Self::Comparison,
            Some(LayoutFamily::Grid) => Self::Grid,
            Some(LayoutFamily::ImagePaired) => Self::ImagePaired,
            Some(LayoutFamily::Text) | None => Self::Text,
        }
    }

    /// Short name used as a CSS class and in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::Steps => "steps",
            Self::Comparison => "comparison",
            Self::Grid => "grid",
            Self::ImagePaired => "image-paired",
            Self::Text => "text",
        }
    }
}

/// Static catalog entry for a layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LayoutInfo {
    pub id: LayoutId,
    pub name: &'static str,
    pub description: &'static str,
    pub image_slots: usize,
}

/// Keyword rules, scanned in order. The first rule that adopts its layout wins.
const KEYWORD_TRIGGERS: &[(LayoutId, &[&str])] = &[
    (
        LayoutId::OperationSteps,
        &["步骤", "操作", "流程", "实施", "演示", "实训", "实验", "制作"],
    ),
    (
        LayoutId::ConceptComparison,
        &["对比", "比较", "区别", "异同", "优劣", "优缺点", "VS", "vs"],
    ),
    (
        LayoutId::Grid4,
        &["分类", "类型", "四种", "4种", "工具", "设备", "特点", "要素"],
    ),
    (
        LayoutId::TimelineHorizontal,
        &["发展", "历程", "阶段", "演变", "时间线", "进程"],
    ),
    (
        LayoutId::CenterVisual,
        &["原理图", "示意图", "架构", "结构", "模型", "框架"],
    ),
];

/// Used when an avoided layout must be replaced and the template prefers nothing usable.
const GLOBAL_FALLBACK: LayoutId = LayoutId::TitleBullets;

/// Cap on the alternative list built to break a repeat.
const MAX_ALTERNATIVES: usize = 3;

/// Stateless layout resolver.
#[derive(Debug, Clone, Copy, Default)]
pub struct LayoutEngine;

impl LayoutEngine {
    /// Create a new layout engine.
    pub fn new() -> Self {
        Self
    }

    /// Default layout for a slide type.
    pub fn default_layout(slide_type: &SlideType) -> LayoutId {
        match slide_type {
            SlideType::Title | SlideType::Section | SlideType::ThankYou => {
                LayoutId::TitleOnlyCenter
            }
            SlideType::Toc => LayoutId::TocSidebarRight,
            SlideType::Intro | SlideType::Concept => LayoutId::TitleBulletsRightImg,
            SlideType::Steps => LayoutId::OperationSteps,
            SlideType::Comparison => LayoutId::ConceptComparison,
            SlideType::Exercises | SlideType::Summary => LayoutId::TitleBullets,
            SlideType::Other(_) => LayoutId::TitleBulletsRightImg,
        }
    }

    /// Decide the layout of one page given the layout of the page before it.
    pub fn resolve_layout(
        &self,
        page: &SlidePage,
        template: &TemplateDefinition,
        previous: Option<LayoutId>,
    ) -> LayoutId {
        let mut layout = Self::default_layout(&page.slide_type);

        // Scanning stops at the first adopting rule even if a later rule's
        // layout is preferred by the template.
        let text = page.keyword_text();
        for (candidate, keywords) in KEYWORD_TRIGGERS {
            if !keywords.iter().any(|kw| text.contains(kw)) {
                continue;
            }
            if template.prefers(*candidate) || !template.avoids(*candidate) {
                layout = *candidate;
                break;
            }
        }

        if Some(layout) == previous {
            if let Some(alternative) = self.alternatives(layout, template).first() {
                layout = *alternative;
            }
        }

        if template.avoids(layout) {
            let replacement = Self::replacement_for_avoided(template, previous);
            log::debug!(
                "Page {}: layout {} is avoided by template '{}', using {}",
                page.index,
                layout,
                template.id,
                replacement
            );
            layout = replacement;
        }

        layout
    }

    /// Up to three layouts other than `current`: template preferences first,
    /// then the catalog order, without duplicates.
    pub fn alternatives(&self, current: LayoutId, template: &TemplateDefinition) -> Vec<LayoutId> {
        let mut alternatives = Vec::with_capacity(MAX_ALTERNATIVES);
        for id in template.preferred_layouts.iter().chain(LayoutId::ALL.iter()) {
            if *id != current && !alternatives.contains(id) {
                alternatives.push(*id);
                if alternatives.len() == MAX_ALTERNATIVES {
                    break;
                }
            }
        }
        alternatives
    }

    /// The first preferred layout, skipping any that is itself avoided or
    /// equal to the previous page's layout. Stricter than taking
    /// `preferred_layouts[0]` as is, which may be avoided or repeat the
    /// previous page.
    fn replacement_for_avoided(
        template: &TemplateDefinition,
        previous: Option<LayoutId>,
    ) -> LayoutId {
        let usable = |id: &LayoutId| !template.avoids(*id) && Some(*id) != previous;

        template
            .preferred_layouts
            .iter()
            .copied()
            .find(|id| usable(id))
            .or_else(|| usable(&GLOBAL_FALLBACK).then_some(GLOBAL_FALLBACK))
            .or_else(|| LayoutId::ALL.iter().copied().find(|id| usable(id)))
            .unwrap_or_else(|| {
                template
                    .preferred_layouts
                    .first()
                    .copied()
                    .unwrap_or(GLOBAL_FALLBACK)
            })
    }

    /// Resolve the whole deck as a fold over the pages in order.
    pub fn fold_layouts(&self, pages: &[SlidePage], template: &TemplateDefinition) -> Vec<LayoutId> {
        pages
            .iter()
            .scan(None, |previous, page| {
                let layout = self.resolve_layout(page, template, *previous);
                *previous = Some(layout);
                Some(layout)
            })
            .collect()
    }

    /// Resolve the whole deck and record each page's layout on the page.
    pub fn resolve_deck(
        &self,
        pages: &mut [SlidePage],
        template: &TemplateDefinition,
    ) -> Vec<LayoutId> {
        let layouts = self.fold_layouts(pages, template);
        for (page, layout) in pages.iter_mut().zip(&layouts) {
            page.layout_id = Some(*layout);
        }
        layouts
    }

    /// Catalog entry for a layout.
    pub fn layout_info(id: LayoutId) -> LayoutInfo {
        let (name, description) = match id {
            LayoutId::TitleOnlyCenter => ("居中标题", "用于封面、过渡页"),
            LayoutId::TitleBullets => ("标题+要点", "用于目录、总结"),
            LayoutId::TitleBulletsRightImg => ("左文右图", "最常用，概念讲解"),
            LayoutId::OperationSteps => ("左图右步骤", "实训操作"),
            LayoutId::ConceptComparison => ("左右对比", "对比分析"),
            LayoutId::Grid4 => ("四宫格", "分类展示"),
            LayoutId::CenterVisual => ("中心视觉", "重点图示"),
            LayoutId::SplitVertical => ("上下分栏", "图文对照"),
            LayoutId::TimelineHorizontal => ("水平时间线", "流程步骤"),
            LayoutId::TocSidebarRight => ("右侧目录", "目录导航"),
        };
        LayoutInfo {
            id,
            name,
            description,
            image_slots: SlotPlanner::geometry(id).len(),
        }
    }

    /// Catalog entries for every layout.
    pub fn list_all_layouts() -> Vec<LayoutInfo> {
        LayoutId::ALL.iter().map(|id| Self::layout_info(*id)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::TemplateRegistry;

    fn page(index: usize, slide_type: SlideType, title: &str) -> SlidePage {
        SlidePage::new(index, slide_type, title)
    }

    fn template(preferred: &[LayoutId], avoided: &[LayoutId]) -> TemplateDefinition {
        let mut t = TemplateDefinition::minimal("test");
        t.preferred_layouts = preferred.to_vec();
        t.avoided_layouts = avoided.iter().copied().collect();
        t
    }

    #[test]
    fn test_title_page_resolves_to_center() {
        let engine = LayoutEngine::new();
        let layout = engine.resolve_layout(
            &page(0, SlideType::Title, "电工基础"),
            &template(&[], &[]),
            None,
        );
        assert_eq!(layout, LayoutId::TitleOnlyCenter);
    }

    #[test]
    fn test_type_defaults() {
        assert_eq!(
            LayoutEngine::default_layout(&SlideType::Toc),
            LayoutId::TocSidebarRight
        );
        assert_eq!(
            LayoutEngine::default_layout(&SlideType::Summary),
            LayoutId::TitleBullets
        );
        assert_eq!(
            LayoutEngine::default_layout(&SlideType::Other("lab".to_string())),
            LayoutId::TitleBulletsRightImg
        );
    }

    #[test]
    fn test_keyword_in_bullets_triggers_layout() {
        let engine = LayoutEngine::new();
        let p = page(1, SlideType::Concept, "电路").with_bullets(["串联与并联的区别"]);
        assert_eq!(
            engine.resolve_layout(&p, &template(&[], &[]), None),
            LayoutId::ConceptComparison
        );
    }

    #[test]
    fn test_avoided_trigger_keeps_scanning() {
        let engine = LayoutEngine::new();
        // "操作" would pick operation_steps, which is avoided; "分类" picks grid_4.
        let p = page(1, SlideType::Concept, "工具操作分类");
        let t = template(&[], &[LayoutId::OperationSteps]);
        assert_eq!(engine.resolve_layout(&p, &t, None), LayoutId::Grid4);
    }

    #[test]
    fn test_earlier_rule_wins_over_later_preferred_rule() {
        let engine = LayoutEngine::new();
        // Both steps and center_visual fire; center_visual is preferred but the
        // steps rule comes first and is merely not avoided.
        let p = page(1, SlideType::Concept, "操作结构");
        let t = template(&[LayoutId::CenterVisual], &[]);
        assert_eq!(engine.resolve_layout(&p, &t, None), LayoutId::OperationSteps);
    }

    #[test]
    fn test_repeat_steps_pages_alternate() {
        let engine = LayoutEngine::new();
        let registry = TemplateRegistry::builtin();
        let t = registry.get("practice_medical").unwrap();
        assert!(t.avoided_layouts.is_empty());

        let mut pages = vec![
            page(0, SlideType::Steps, "操作准备"),
            page(1, SlideType::Steps, "操作流程"),
        ];
        let layouts = engine.resolve_deck(&mut pages, t);
        assert_eq!(layouts[0], LayoutId::OperationSteps);
        assert_ne!(layouts[1], layouts[0]);
        assert_eq!(layouts[1], LayoutId::ConceptComparison);
        assert_eq!(pages[1].layout_id, Some(LayoutId::ConceptComparison));
    }

    #[test]
    fn test_alternatives_prefer_template_then_catalog() {
        let engine = LayoutEngine::new();
        let t = template(&[LayoutId::Grid4, LayoutId::TitleBullets], &[]);
        assert_eq!(
            engine.alternatives(LayoutId::TitleBullets, &t),
            vec![
                LayoutId::Grid4,
                LayoutId::TitleOnlyCenter,
                LayoutId::TitleBulletsRightImg
            ]
        );
        assert_eq!(
            engine.alternatives(LayoutId::TitleOnlyCenter, &template(&[], &[])),
            vec![
                LayoutId::TitleBullets,
                LayoutId::TitleBulletsRightImg,
                LayoutId::OperationSteps
            ]
        );
    }

    #[test]
    fn test_avoided_default_replaced_by_first_preferred() {
        let engine = LayoutEngine::new();
        let t = template(
            &[LayoutId::CenterVisual, LayoutId::Grid4],
            &[LayoutId::OperationSteps],
        );
        let p = page(0, SlideType::Steps, "");
        assert_eq!(engine.resolve_layout(&p, &t, None), LayoutId::CenterVisual);
    }

    #[test]
    fn test_avoided_replacement_does_not_repeat_previous() {
        let engine = LayoutEngine::new();
        let t = template(
            &[LayoutId::CenterVisual, LayoutId::Grid4],
            &[LayoutId::OperationSteps],
        );
        let p = page(1, SlideType::Steps, "");
        assert_eq!(
            engine.resolve_layout(&p, &t, Some(LayoutId::CenterVisual)),
            LayoutId::Grid4
        );
    }

    #[test]
    fn test_avoided_without_preferences_uses_global_fallback() {
        let engine = LayoutEngine::new();
        let t = template(&[], &[LayoutId::TitleOnlyCenter]);
        let p = page(0, SlideType::Section, "");
        assert_eq!(engine.resolve_layout(&p, &t, None), LayoutId::TitleBullets);
    }

    #[test]
    fn test_catalog_matches_slot_table() {
        let layouts = LayoutEngine::list_all_layouts();
        assert_eq!(layouts.len(), LayoutId::ALL.len());
        let grid = LayoutEngine::layout_info(LayoutId::Grid4);
        assert_eq!(grid.image_slots, 4);
        assert_eq!(grid.name, "四宫格");
        assert_eq!(LayoutEngine::layout_info(LayoutId::TitleBullets).image_slots, 0);
    }

    #[test]
    fn test_layout_id_round_trips_through_str() {
        for id in LayoutId::ALL {
            assert_eq!(id.as_str().parse::<LayoutId>().unwrap(), id);
            assert_eq!(
                serde_json::to_string(&id).unwrap(),
                format!("\"{}\"", id.as_str())
            );
        }
        assert!("title_only".parse::<LayoutId>().is_err());
    }

    #[test]
    fn test_render_branch_selection() {
        assert_eq!(
            RenderBranch::select(&SlideType::Title, Some(LayoutId::Grid4)),
            RenderBranch::Title
        );
        assert_eq!(
            RenderBranch::select(&SlideType::Concept, Some(LayoutId::SplitVertical)),
            RenderBranch::ImagePaired
        );
        assert_eq!(
            RenderBranch::select(&SlideType::Concept, None),
            RenderBranch::Text
        );
        assert_eq!(
            RenderBranch::select(&SlideType::Toc, Some(LayoutId::TocSidebarRight)),
            RenderBranch::Text
        );
    }
}
