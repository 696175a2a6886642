//! Style configuration.
//!
//! Overrides are grouped by category with unprefixed keys (`primary`, not
//! `color-primary`). Anything a template author needs outside the three
//! categories goes in `extensions` under its full variable name.

use serde::{de, Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::io::Read;

use crate::error::Result;
use crate::registry::TemplateDefinition;

/// A recognized variable namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StyleCategory {
    Color,
    Font,
    Layout,
}

impl StyleCategory {
    pub const ALL: [StyleCategory; 3] = [Self::Color, Self::Font, Self::Layout];

    /// Namespace prefix including the separator, e.g. `color-`.
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::Color => "color-",
            Self::Font => "font-",
            Self::Layout => "layout-",
        }
    }

    /// Split a prefixed variable name into its category and bare key.
    pub fn from_variable(name: &str) -> Option<(Self, &str)> {
        Self::ALL.iter().find_map(|category| {
            name.strip_prefix(category.prefix())
                .filter(|key| !key.is_empty())
                .map(|key| (*category, key))
        })
    }
}

/// Fallback colours, used when neither style nor template supplies a valid value.
const DEFAULT_COLORS: &[(&str, &str)] = &[
    ("primary", "1E3A8A"),
    ("secondary", "64748B"),
    ("accent", "3B82F6"),
    ("text", "1E293B"),
    ("background", "F8FAFC"),
];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StyleConfig {
    #[serde(default)]
    pub style_name: String,

    #[serde(default, deserialize_with = "scalar_map")]
    pub color: BTreeMap<String, String>,

    #[serde(default, deserialize_with = "scalar_map")]
    pub font: BTreeMap<String, String>,

    #[serde(default, deserialize_with = "scalar_map")]
    pub layout: BTreeMap<String, String>,

    /// Full variable names emitted verbatim, after everything else.
    #[serde(default, deserialize_with = "scalar_map")]
    pub extensions: BTreeMap<String, String>,
}

impl StyleConfig {
    pub fn new(style_name: impl Into<String>) -> Self {
        Self {
            style_name: style_name.into(),
            ..Default::default()
        }
    }

    pub fn from_json_reader<R: Read>(reader: R) -> Result<Self> {
        Ok(serde_json::from_reader(reader)?)
    }

    /// Derive a style from a template's variables. Unprefixed names land in
    /// `extensions`.
    pub fn from_template(template: &TemplateDefinition) -> Self {
        let mut style = Self::new(template.id.clone());
        for (name, value) in &template.css_vars {
            match StyleCategory::from_variable(name) {
                Some((category, key)) => {
                    style.category_mut(category).insert(key.to_string(), value.clone());
                }
                None => {
                    style.extensions.insert(name.clone(), value.clone());
                }
            }
        }
        style
    }

    pub fn category(&self, category: StyleCategory) -> &BTreeMap<String, String> {
        match category {
            StyleCategory::Color => &self.color,
            StyleCategory::Font => &self.font,
            StyleCategory::Layout => &self.layout,
        }
    }

    fn category_mut(&mut self, category: StyleCategory) -> &mut BTreeMap<String, String> {
        match category {
            StyleCategory::Color => &mut self.color,
            StyleCategory::Font => &mut self.font,
            StyleCategory::Layout => &mut self.layout,
        }
    }

    /// Set one override.
    pub fn set(&mut self, category: StyleCategory, key: impl Into<String>, value: impl Into<String>) {
        self.category_mut(category).insert(key.into(), value.into());
    }

    /// Merge template defaults with this style. Later sources win.
    pub fn css_variables(&self, template: &TemplateDefinition) -> BTreeMap<String, String> {
        let mut vars = template.css_vars.clone();
        for category in StyleCategory::ALL {
            for (key, value) in self.category(category) {
                vars.insert(format!("{}{}", category.prefix(), key), value.clone());
            }
        }
        for (name, value) in &self.extensions {
            vars.insert(name.clone(), value.clone());
        }
        vars
    }

    /// The merged variables as CSS custom property declarations.
    pub fn css_block(&self, template: &TemplateDefinition) -> String {
        self.css_variables(template)
            .iter()
            .map(|(name, value)| format!("--{}: {};", name, value))
            .collect::<Vec<_>>()
            .join("\n            ")
    }

    /// Six-digit uppercase hex (no `#`) for a colour key. Values that are not
    /// `#rgb` or `#rrggbb` fall back to the built-in default.
    pub fn color(&self, key: &str) -> String {
        self.color
            .get(key)
            .and_then(|value| normalize_hex(value))
            .unwrap_or_else(|| default_color(key).to_string())
    }
}

fn default_color(key: &str) -> &'static str {
    DEFAULT_COLORS
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(_, v)| *v)
        .unwrap_or("000000")
}

fn normalize_hex(value: &str) -> Option<String> {
    let hex = value.trim().strip_prefix('#')?;
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    match hex.len() {
        6 => Some(hex.to_ascii_uppercase()),
        3 => Some(
            hex.chars()
                .flat_map(|c| [c, c])
                .collect::<String>()
                .to_ascii_uppercase(),
        ),
        _ => None,
    }
}

/// Accept strings, numbers and booleans as map values.
fn scalar_map<'de, D>(deserializer: D) -> std::result::Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<BTreeMap<String, serde_json::Value>>::deserialize(deserializer)?;
    raw.unwrap_or_default()
        .into_iter()
        .map(|(key, value)| {
            let value = match value {
                serde_json::Value::String(s) => s,
                serde_json::Value::Number(n) => n.to_string(),
                serde_json::Value::Bool(b) => b.to_string(),
                other => {
                    return Err(de::Error::custom(format!(
                        "style value for '{}' must be a scalar, got {}",
                        key, other
                    )))
                }
            };
            Ok((key, value))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::TemplateRegistry;

    #[test]
    fn test_category_from_variable() {
        assert_eq!(
            StyleCategory::from_variable("color-primary"),
            Some((StyleCategory::Color, "primary"))
        );
        assert_eq!(
            StyleCategory::from_variable("font-size-title"),
            Some((StyleCategory::Font, "size-title"))
        );
        assert_eq!(StyleCategory::from_variable("shadow"), None);
        assert_eq!(StyleCategory::from_variable("color-"), None);
    }

    #[test]
    fn test_overrides_win_over_template() {
        let registry = TemplateRegistry::builtin();
        let template = registry.get("theory_professional").unwrap();
        let mut style = StyleConfig::new("custom");
        style.set(StyleCategory::Color, "primary", "#ff0000");
        style.set(StyleCategory::Layout, "gap", "12px");
        style.extensions.insert("shadow".to_string(), "none".to_string());

        let vars = style.css_variables(template);
        assert_eq!(vars["color-primary"], "#ff0000");
        assert_eq!(vars["color-accent"], "#3b82f6");
        assert_eq!(vars["layout-gap"], "12px");
        assert_eq!(vars["shadow"], "none");

        let block = style.css_block(template);
        assert!(block.contains("--color-primary: #ff0000;"));
    }

    #[test]
    fn test_from_template_splits_prefixes() {
        let mut template = TemplateDefinition::minimal("t");
        template
            .css_vars
            .insert("color-primary".to_string(), "#123456".to_string());
        template
            .css_vars
            .insert("shadow".to_string(), "none".to_string());
        let style = StyleConfig::from_template(&template);
        assert_eq!(style.color["primary"], "#123456");
        assert_eq!(style.extensions["shadow"], "none");
        assert_eq!(style.css_variables(&template), template.css_vars);
    }

    #[test]
    fn test_misspelled_category_rejected() {
        let json = r##"{"style_name": "x", "colour": {"primary": "#000"}}"##;
        assert!(serde_json::from_str::<StyleConfig>(json).is_err());
    }

    #[test]
    fn test_numeric_values_become_strings() {
        let json = r#"{"style_name": "x", "font": {"size-body": 20}, "layout": {"dense": true}}"#;
        let style: StyleConfig = serde_json::from_str(json).unwrap();
        assert_eq!(style.font["size-body"], "20");
        assert_eq!(style.layout["dense"], "true");
    }

    #[test]
    fn test_color_lookup() {
        let mut style = StyleConfig::new("x");
        assert_eq!(style.color("primary"), "1E3A8A");
        style.set(StyleCategory::Color, "primary", "#0af");
        style.set(StyleCategory::Color, "accent", "rgba(0,0,0,1)");
        assert_eq!(style.color("primary"), "00AAFF");
        assert_eq!(style.color("accent"), "3B82F6");
        assert_eq!(style.color("unknown"), "000000");
    }
}
