//! Deck to editable presentation.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use deck_core::{
    check_page_order, LayoutEngine, LayoutId, Result, SlidePage, SlotPlanner, StyleConfig,
    TemplateDefinition, DEFAULT_TEMPLATE_ID,
};

use crate::package::write_package;
use crate::slide::{BuiltSlide, Palette};

/// Builds a `.pptx` file from a deck.
#[derive(Debug, Clone)]
pub struct PresentationBuilder {
    title: String,
    engine: LayoutEngine,
    planner: SlotPlanner,
}

impl PresentationBuilder {
    /// `title` is recorded in the document properties.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            engine: LayoutEngine::new(),
            planner: SlotPlanner::new(),
        }
    }

    /// Layouts recorded on the pages by an earlier render pass are reused as
    /// is. Pages without one are resolved with the default template.
    fn layouts(&self, pages: &[SlidePage]) -> Vec<LayoutId> {
        let fallback = TemplateDefinition::minimal(DEFAULT_TEMPLATE_ID);
        let mut previous = None;
        pages
            .iter()
            .map(|page| {
                let layout = page.layout_id.unwrap_or_else(|| {
                    log::debug!("Page {} has no layout, resolving", page.index + 1);
                    self.engine.resolve_layout(page, &fallback, previous)
                });
                previous = Some(layout);
                layout
            })
            .collect()
    }

    /// Write the presentation to `output`.
    ///
    /// `slot_images` maps slot ids to image files. Slots without an entry,
    /// or whose file cannot be read as an image, get a placeholder box.
    pub fn build(
        &self,
        pages: &[SlidePage],
        style: &StyleConfig,
        slot_images: &HashMap<String, PathBuf>,
        output: &Path,
    ) -> Result<PathBuf> {
        log::info!("Building '{}' ({} pages)", self.title, pages.len());
        check_page_order(pages)?;
        let palette = Palette::from_style(style);

        let slides: Vec<BuiltSlide> = pages
            .iter()
            .zip(self.layouts(pages))
            .map(|(page, layout)| {
                let mut page = page.clone();
                page.layout_id = Some(layout);
                let slots = self.planner.plan_slots(&page, layout);
                BuiltSlide::draw(&page, &slots, &palette, slot_images)
            })
            .collect();

        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let file = File::create(output)?;
        let mut writer = write_package(BufWriter::new(file), &self.title, &slides)?;
        writer.flush()?;

        let pictures: usize = slides.iter().map(|s| s.images.len()).sum();
        log::info!(
            "Wrote {} ({} slides, {} pictures)",
            output.display(),
            slides.len(),
            pictures
        );
        Ok(output.to_path_buf())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deck_core::SlideType;

    #[test]
    fn test_recorded_layouts_are_kept() {
        let mut page = SlidePage::new(0, SlideType::Concept, "概念");
        page.layout_id = Some(LayoutId::CenterVisual);
        let layouts = PresentationBuilder::new("t").layouts(&[page]);
        assert_eq!(layouts, vec![LayoutId::CenterVisual]);
    }

    #[test]
    fn test_missing_layouts_are_resolved_in_order() {
        let pages = vec![
            SlidePage::new(0, SlideType::Title, "封面"),
            SlidePage::new(1, SlideType::Summary, "小结"),
            SlidePage::new(2, SlideType::Summary, "总结"),
        ];
        let layouts = PresentationBuilder::new("t").layouts(&pages);
        assert_eq!(layouts[0], LayoutId::TitleOnlyCenter);
        assert_eq!(layouts[1], LayoutId::TitleBullets);
        assert_ne!(layouts[1], layouts[2]);
    }
}
