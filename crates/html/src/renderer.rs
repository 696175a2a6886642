//! Deck to HTML rendering.

use askama::Template;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use deck_core::{
    check_page_order, Error, LayoutEngine, RenderResult, Result, SlidePage, SlotPlanner,
    StyleConfig, TemplateDefinition,
};

use crate::view::{DeckTemplate, SlideView};

/// Pages whose bullets exceed this many characters get a warning.
pub const OVERFLOW_CHAR_LIMIT: usize = 300;

/// Name of the written document inside the output directory.
const OUTPUT_FILE: &str = "index.html";

/// Directory under the output directory that receives copied assets.
const ASSETS_TARGET: &str = "static";

/// Renders decks to a single HTML document.
#[derive(Debug, Clone, Default)]
pub struct HtmlRenderer {
    engine: LayoutEngine,
    planner: SlotPlanner,
    assets_dir: Option<PathBuf>,
}

impl HtmlRenderer {
    /// Create a renderer that copies no static assets.
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy this directory to `<output>/static` on every render.
    pub fn with_assets_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.assets_dir = Some(dir.into());
        self
    }

    /// Render the deck into `output_dir/index.html`.
    ///
    /// Layouts are resolved in page order and written back to each page's
    /// `layout_id`, so a later presentation build reuses the same decisions.
    /// Fails before writing anything if a page's `index` is not its position.
    pub fn render(
        &self,
        pages: &mut [SlidePage],
        style: &StyleConfig,
        deck_title: &str,
        output_dir: &Path,
        template: &TemplateDefinition,
    ) -> Result<RenderResult> {
        log::info!("Rendering '{}' ({} pages)", deck_title, pages.len());
        check_page_order(pages)?;

        let mut slides = Vec::with_capacity(pages.len());
        let mut image_slots = Vec::new();
        let mut layouts_used = BTreeMap::new();
        let mut warnings = Vec::new();
        let mut previous = None;

        for page in pages.iter_mut() {
            let layout = self.engine.resolve_layout(page, template, previous);
            page.layout_id = Some(layout);
            previous = Some(layout);
            *layouts_used.entry(layout).or_insert(0) += 1;

            let slots = self.planner.plan_slots(page, layout);

            let chars = page.bullet_char_count();
            if chars > OVERFLOW_CHAR_LIMIT {
                log::debug!("Page {} overflows: {} chars", page.index + 1, chars);
                warnings.push(format!("第 {} 页文字过多 ({} 字)", page.index + 1, chars));
            }

            slides.push(SlideView::render(page, layout, &slots)?);
            image_slots.extend(slots);
        }

        let deck = DeckTemplate {
            deck_title,
            theme_class: &template.css_theme,
            // Values come from configuration files; keep them from closing the style element.
            css_block: style.css_block(template).replace('<', ""),
            slides,
            total_image_slots: image_slots.len(),
        };
        let html = deck
            .render()
            .map_err(|e| Error::TemplateError(e.to_string()))?;

        fs::create_dir_all(output_dir)?;
        self.copy_assets(output_dir);

        let html_path = output_dir.join(OUTPUT_FILE);
        let file = File::create(&html_path)?;
        let mut writer = BufWriter::new(file);
        writer.write_all(html.as_bytes())?;
        writer.flush()?;

        log::info!(
            "Wrote {} ({} image slots, {} warnings)",
            html_path.display(),
            image_slots.len(),
            warnings.len()
        );

        Ok(RenderResult {
            html_path,
            image_slots,
            layouts_used,
            total_pages: pages.len(),
            warnings,
        })
    }

    /// Best effort: failures are logged and never abort the render.
    fn copy_assets(&self, output_dir: &Path) {
        let Some(source) = &self.assets_dir else {
            return;
        };
        let target = output_dir.join(ASSETS_TARGET);
        let result = (|| -> std::io::Result<()> {
            if target.exists() {
                fs::remove_dir_all(&target)?;
            }
            copy_dir(source, &target)
        })();
        match result {
            Ok(()) => log::debug!("Copied assets to {}", target.display()),
            Err(e) => log::warn!(
                "Failed to copy assets from {}: {}",
                source.display(),
                e
            ),
        }
    }
}

fn copy_dir(source: &Path, target: &Path) -> std::io::Result<()> {
    fs::create_dir_all(target)?;
    for entry in fs::read_dir(source)? {
        let entry = entry?;
        let path = entry.path();
        let dest = target.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_dir(&path, &dest)?;
        } else {
            fs::copy(&path, &dest)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use deck_core::{LayoutId, SlideType};

    fn render(pages: &mut [SlidePage]) -> (tempfile::TempDir, RenderResult) {
        let dir = tempfile::tempdir().unwrap();
        let result = HtmlRenderer::new()
            .render(
                pages,
                &StyleConfig::new("test"),
                "测试课件",
                dir.path(),
                &TemplateDefinition::minimal("test"),
            )
            .unwrap();
        (dir, result)
    }

    #[test]
    fn test_layouts_written_back_to_pages() {
        let mut pages = vec![
            SlidePage::new(0, SlideType::Title, "封面"),
            SlidePage::new(1, SlideType::Concept, "概念"),
        ];
        let (_dir, result) = render(&mut pages);
        assert_eq!(pages[0].layout_id, Some(LayoutId::TitleOnlyCenter));
        assert_eq!(pages[1].layout_id, Some(LayoutId::TitleBulletsRightImg));
        assert_eq!(result.image_slots.len(), 1);
        assert_eq!(result.image_slots[0].slot_id, "p1_slot0");
    }

    #[test]
    fn test_overflow_warning_uses_page_number() {
        let long = "字".repeat(301);
        let mut pages = vec![
            SlidePage::new(0, SlideType::Title, "封面"),
            SlidePage::new(1, SlideType::Summary, "总结").with_bullets([long]),
        ];
        let (_dir, result) = render(&mut pages);
        assert_eq!(result.warnings, vec!["第 2 页文字过多 (301 字)".to_string()]);
    }

    #[test]
    fn test_exactly_limit_is_not_a_warning() {
        let mut pages =
            vec![SlidePage::new(0, SlideType::Summary, "总结").with_bullets(["a".repeat(300)])];
        let (_dir, result) = render(&mut pages);
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_duplicate_page_index_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut pages = vec![
            SlidePage::new(1, SlideType::Concept, "概念一"),
            SlidePage::new(1, SlideType::Concept, "概念二"),
        ];
        let err = HtmlRenderer::new()
            .render(
                &mut pages,
                &StyleConfig::new("test"),
                "测试课件",
                dir.path(),
                &TemplateDefinition::minimal("test"),
            )
            .unwrap_err();
        assert!(matches!(err, Error::InvalidPageIndex(_)));
        assert!(!dir.path().join(OUTPUT_FILE).exists());
    }

    #[test]
    fn test_markup_escapes_text() {
        let mut pages =
            vec![SlidePage::new(0, SlideType::Summary, "<script>").with_bullets(["a & b"])];
        let (_dir, result) = render(&mut pages);
        let html = fs::read_to_string(result.html_path).unwrap();
        assert!(!html.contains("<script>"));
        assert!(html.contains("a &amp; b") || html.contains("a &#38; b"));
    }
}
