//! Template registry.
//!
//! Templates bundle CSS variables with layout preferences. The registry is
//! built once (from the built-in table or a JSON file) and then only read.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::io::Read;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::layout::LayoutId;

/// Teaching scene a template or pedagogy model applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scene {
    Theory,
    Practice,
    Review,
    Mixed,
}

impl Scene {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Theory => "theory",
            Self::Practice => "practice",
            Self::Review => "review",
            Self::Mixed => "mixed",
        }
    }
}

impl fmt::Display for Scene {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scene {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "theory" => Ok(Self::Theory),
            "practice" => Ok(Self::Practice),
            "review" => Ok(Self::Review),
            "mixed" => Ok(Self::Mixed),
            other => Err(Error::UnknownScene(other.to_string())),
        }
    }
}

/// An immutable bundle of style variables and layout preferences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateDefinition {
    pub id: String,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub applicable_scenes: Vec<Scene>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview_image: Option<String>,

    /// CSS class put on the document body.
    #[serde(default)]
    pub css_theme: String,

    /// Prefixed CSS variables, e.g. `color-primary`.
    #[serde(default)]
    pub css_vars: BTreeMap<String, String>,

    /// Ordered: the first entry is the strongest preference.
    #[serde(default)]
    pub preferred_layouts: Vec<LayoutId>,

    #[serde(default)]
    pub avoided_layouts: BTreeSet<LayoutId>,

    /// Style guidance for an upstream layout agent. Inert here.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub prompt_modifier: String,
}

impl TemplateDefinition {
    /// A template with no preferences and no CSS overrides.
    pub fn minimal(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            description: String::new(),
            applicable_scenes: Vec::new(),
            preview_image: None,
            css_theme: String::new(),
            css_vars: BTreeMap::new(),
            preferred_layouts: Vec::new(),
            avoided_layouts: BTreeSet::new(),
            prompt_modifier: String::new(),
        }
    }

    pub fn prefers(&self, layout: LayoutId) -> bool {
        self.preferred_layouts.contains(&layout)
    }

    pub fn avoids(&self, layout: LayoutId) -> bool {
        self.avoided_layouts.contains(&layout)
    }

    pub fn applies_to(&self, scene: Scene) -> bool {
        self.applicable_scenes.contains(&scene)
    }
}

/// Id of the template returned when a lookup misses.
pub const DEFAULT_TEMPLATE_ID: &str = "default";

/// Built-in template used when a render names none.
pub const RENDER_TEMPLATE_ID: &str = "theory_professional";

/// Immutable lookup table of templates, in registration order.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateRegistry {
    templates: Vec<TemplateDefinition>,
}

impl TemplateRegistry {
    /// Build a registry from explicit templates. Later duplicates are dropped.
    pub fn from_templates(templates: Vec<TemplateDefinition>) -> Self {
        let mut seen = BTreeSet::new();
        let templates = templates
            .into_iter()
            .filter(|t| {
                let fresh = seen.insert(t.id.clone());
                if !fresh {
                    log::warn!("Duplicate template id '{}' ignored", t.id);
                }
                fresh
            })
            .collect();
        Self { templates }
    }

    /// Load a registry from a JSON array of template definitions.
    pub fn from_json_reader<R: Read>(reader: R) -> Result<Self> {
        let templates: Vec<TemplateDefinition> = serde_json::from_reader(reader)?;
        Ok(Self::from_templates(templates))
    }

    /// The seven built-in vocational templates.
    pub fn builtin() -> Self {
        Self::from_templates(builtin_templates())
    }

    pub fn get(&self, id: &str) -> Option<&TemplateDefinition> {
        self.templates.iter().find(|t| t.id == id)
    }

    /// Strict lookup.
    pub fn require(&self, id: &str) -> Result<&TemplateDefinition> {
        self.get(id)
            .ok_or_else(|| Error::UnknownTemplate(id.to_string()))
    }

    /// Lookup that falls back to a minimal template for unknown ids.
    pub fn get_or_default(&self, id: &str) -> Cow<'_, TemplateDefinition> {
        match self.get(id) {
            Some(template) => Cow::Borrowed(template),
            None => {
                log::warn!("Template '{}' not found, using minimal default", id);
                Cow::Owned(TemplateDefinition::minimal(DEFAULT_TEMPLATE_ID))
            }
        }
    }

    pub fn list(&self) -> &[TemplateDefinition] {
        &self.templates
    }

    pub fn by_scene(&self, scene: Scene) -> Vec<&TemplateDefinition> {
        self.templates.iter().filter(|t| t.applies_to(scene)).collect()
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

impl Default for TemplateRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

struct Palette<'a> {
    primary: &'a str,
    secondary: &'a str,
    accent: &'a str,
    background: &'a str,
    text: &'a str,
    surface: &'a str,
}

struct Typography<'a> {
    title_family: &'a str,
    body_family: &'a str,
    title_size: &'a str,
    body_size: &'a str,
}

fn css_vars(
    palette: Palette<'_>,
    typography: Typography<'_>,
    radius: &str,
    alignment: &str,
) -> BTreeMap<String, String> {
    [
        ("color-primary", palette.primary),
        ("color-secondary", palette.secondary),
        ("color-accent", palette.accent),
        ("color-background", palette.background),
        ("color-text", palette.text),
        ("color-surface", palette.surface),
        ("font-family-title", typography.title_family),
        ("font-family-body", typography.body_family),
        ("font-size-title", typography.title_size),
        ("font-size-body", typography.body_size),
        ("layout-border-radius", radius),
        ("layout-alignment", alignment),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

#[allow(clippy::too_many_arguments)]
fn template(
    id: &str,
    name: &str,
    description: &str,
    scenes: &[Scene],
    css_vars: BTreeMap<String, String>,
    preferred: &[LayoutId],
    avoided: &[LayoutId],
    prompt_modifier: &str,
) -> TemplateDefinition {
    TemplateDefinition {
        id: id.to_string(),
        name: name.to_string(),
        description: description.to_string(),
        applicable_scenes: scenes.to_vec(),
        preview_image: None,
        css_theme: format!("theme-{}", id.replace('_', "-")),
        css_vars,
        preferred_layouts: preferred.to_vec(),
        avoided_layouts: avoided.iter().copied().collect(),
        prompt_modifier: prompt_modifier.to_string(),
    }
}

fn builtin_templates() -> Vec<TemplateDefinition> {
    use LayoutId::*;

    const HEITI: &str = "'思源黑体', sans-serif";
    const YAHEI: &str = "'微软雅黑', sans-serif";

    vec![
        template(
            "theory_professional",
            "理论课-专业严谨",
            "蓝色系专业风格，适合系统性理论讲解",
            &[Scene::Theory],
            css_vars(
                Palette {
                    primary: "#1e3a8a",
                    secondary: "#64748b",
                    accent: "#3b82f6",
                    background: "#f8fafc",
                    text: "#1e293b",
                    surface: "rgba(255,255,255,0.95)",
                },
                Typography {
                    title_family: "'思源黑体', 'Source Han Sans', sans-serif",
                    body_family: "'思源宋体', 'Source Han Serif', serif",
                    title_size: "38px",
                    body_size: "22px",
                },
                "8px",
                "left",
            ),
            &[TitleBulletsRightImg, ConceptComparison, TitleBullets],
            &[Grid4],
            "布局倾向：左文右图、对比分析；避免过多图片网格；语气专业、严谨、逻辑清晰",
        ),
        template(
            "theory_elegant",
            "理论课-优雅简约",
            "灰白色系极简风格，突出内容本身",
            &[Scene::Theory],
            css_vars(
                Palette {
                    primary: "#374151",
                    secondary: "#9ca3af",
                    accent: "#6b7280",
                    background: "#ffffff",
                    text: "#111827",
                    surface: "#f9fafb",
                },
                Typography {
                    title_family: "'Noto Serif SC', serif",
                    body_family: "'Noto Sans SC', sans-serif",
                    title_size: "36px",
                    body_size: "20px",
                },
                "4px",
                "center",
            ),
            &[TitleBullets, CenterVisual, SplitVertical],
            &[OperationSteps],
            "布局倾向：简洁布局、居中视觉；避免步骤操作类布局；语气简练、优雅、留白感",
        ),
        template(
            "practice_industrial",
            "实训课-工业风格",
            "绿色系工业风格，适合机械、电气类实训",
            &[Scene::Practice],
            css_vars(
                Palette {
                    primary: "#166534",
                    secondary: "#4ade80",
                    accent: "#22c55e",
                    background: "#f0fdf4",
                    text: "#14532d",
                    surface: "rgba(255,255,255,0.9)",
                },
                Typography {
                    title_family: HEITI,
                    body_family: YAHEI,
                    title_size: "36px",
                    body_size: "22px",
                },
                "4px",
                "left",
            ),
            &[OperationSteps, Grid4, TimelineHorizontal],
            &[],
            "布局倾向：操作步骤、网格展示、时间线；避免纯标题页；语气指导性、操作性、安全提示明确",
        ),
        template(
            "practice_medical",
            "实训课-医护风格",
            "浅蓝绿色系，适合医卫类护理实训",
            &[Scene::Practice],
            css_vars(
                Palette {
                    primary: "#0891b2",
                    secondary: "#67e8f9",
                    accent: "#06b6d4",
                    background: "#ecfeff",
                    text: "#164e63",
                    surface: "rgba(255,255,255,0.95)",
                },
                Typography {
                    title_family: HEITI,
                    body_family: YAHEI,
                    title_size: "34px",
                    body_size: "20px",
                },
                "12px",
                "left",
            ),
            &[OperationSteps, ConceptComparison, TitleBulletsRightImg],
            &[],
            "布局倾向：操作步骤（带安全警示）、对比（正误示范）；突出安全注意事项；语气规范、严谨",
        ),
        template(
            "review_mindmap",
            "复习课-思维导图",
            "紫色系复习风格，适合知识梳理和回顾",
            &[Scene::Review],
            css_vars(
                Palette {
                    primary: "#7c3aed",
                    secondary: "#c4b5fd",
                    accent: "#8b5cf6",
                    background: "#faf5ff",
                    text: "#4c1d95",
                    surface: "rgba(255,255,255,0.9)",
                },
                Typography {
                    title_family: HEITI,
                    body_family: YAHEI,
                    title_size: "36px",
                    body_size: "20px",
                },
                "16px",
                "center",
            ),
            &[CenterVisual, Grid4, SplitVertical],
            &[OperationSteps],
            "布局倾向：中心视觉、网格总结、分栏对比；避免操作步骤类；语气总结性、归纳性",
        ),
        template(
            "review_quiz",
            "复习课-测验巩固",
            "橙色系测验风格，适合习题练习和检测",
            &[Scene::Review],
            css_vars(
                Palette {
                    primary: "#ea580c",
                    secondary: "#fed7aa",
                    accent: "#f97316",
                    background: "#fff7ed",
                    text: "#7c2d12",
                    surface: "rgba(255,255,255,0.95)",
                },
                Typography {
                    title_family: HEITI,
                    body_family: YAHEI,
                    title_size: "34px",
                    body_size: "22px",
                },
                "8px",
                "left",
            ),
            &[TitleBullets, ConceptComparison, Grid4],
            &[CenterVisual],
            "布局倾向：题目列表、选项对比、分类网格；避免大面积图片；语气检测性、答案解析",
        ),
        template(
            "general_tech",
            "通用-科技风格",
            "深色系科技风格，适合信息技术类课程",
            &[Scene::Theory, Scene::Practice, Scene::Review],
            css_vars(
                Palette {
                    primary: "#06b6d4",
                    secondary: "#22d3ee",
                    accent: "#67e8f9",
                    background: "#0f172a",
                    text: "#e2e8f0",
                    surface: "rgba(30,41,59,0.9)",
                },
                Typography {
                    title_family: "'JetBrains Mono', monospace",
                    body_family: "'Inter', sans-serif",
                    title_size: "36px",
                    body_size: "20px",
                },
                "6px",
                "left",
            ),
            &[TitleBulletsRightImg, OperationSteps, Grid4],
            &[],
            "布局倾向：代码展示、流程图、技术架构；适合展示代码片段、技术原理图；语气技术性",
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_has_seven_templates() {
        let registry = TemplateRegistry::builtin();
        assert_eq!(registry.len(), 7);
        let ids: Vec<&str> = registry.list().iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids[0], "theory_professional");
        assert_eq!(ids[6], "general_tech");
    }

    #[test]
    fn test_template_preferences() {
        let registry = TemplateRegistry::builtin();
        let t = registry.get("review_mindmap").unwrap();
        assert_eq!(t.preferred_layouts[0], LayoutId::CenterVisual);
        assert!(t.avoids(LayoutId::OperationSteps));
        assert!(t.prefers(LayoutId::Grid4));
        assert_eq!(t.css_theme, "theme-review-mindmap");
        assert_eq!(t.css_vars["color-primary"], "#7c3aed");
    }

    #[test]
    fn test_unknown_template_falls_back_to_minimal() {
        let registry = TemplateRegistry::builtin();
        let t = registry.get_or_default("does_not_exist");
        assert_eq!(t.id, DEFAULT_TEMPLATE_ID);
        assert!(t.preferred_layouts.is_empty());
        assert!(t.avoided_layouts.is_empty());
        assert!(t.css_vars.is_empty());
        assert!(matches!(t, Cow::Owned(_)));
        assert!(registry.require("does_not_exist").is_err());
    }

    #[test]
    fn test_by_scene() {
        let registry = TemplateRegistry::builtin();
        let practice: Vec<&str> = registry
            .by_scene(Scene::Practice)
            .iter()
            .map(|t| t.id.as_str())
            .collect();
        assert_eq!(
            practice,
            vec!["practice_industrial", "practice_medical", "general_tech"]
        );
        assert!(registry.by_scene(Scene::Mixed).is_empty());
    }

    #[test]
    fn test_load_from_json() {
        let json = r##"[
            {"id": "custom", "preferred_layouts": ["grid_4"], "avoided_layouts": ["title_bullets"],
             "applicable_scenes": ["mixed"], "css_vars": {"color-primary": "#000000"}},
            {"id": "custom"}
        ]"##;
        let registry = TemplateRegistry::from_json_reader(json.as_bytes()).unwrap();
        assert_eq!(registry.len(), 1);
        let t = registry.get("custom").unwrap();
        assert!(t.prefers(LayoutId::Grid4));
        assert!(t.avoids(LayoutId::TitleBullets));
        assert!(t.applies_to(Scene::Mixed));
    }

    #[test]
    fn test_json_with_unknown_layout_is_rejected() {
        let json = r#"[{"id": "x", "avoided_layouts": ["title_only"]}]"#;
        assert!(TemplateRegistry::from_json_reader(json.as_bytes()).is_err());
    }

    #[test]
    fn test_scene_from_str() {
        assert_eq!("Practice".parse::<Scene>().unwrap(), Scene::Practice);
        assert!("lab".parse::<Scene>().is_err());
    }
}
