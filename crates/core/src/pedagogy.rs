//! Instructional models.
//!
//! A model is an ordered list of phases, each with a recommended slide type.
//! Phases only label pages; they never influence layout selection.

use serde::{Deserialize, Serialize};
use std::io::Read;

use crate::error::Result;
use crate::registry::Scene;
use crate::types::SlideType;

/// One stage of an instructional model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PedagogyPhase {
    pub name: String,
    pub slide_type: SlideType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PedagogyDefinition {
    pub id: String,
    pub name: String,
    pub name_en: String,
    pub description: String,
    pub applicable_scenes: Vec<Scene>,
    pub structure: Vec<PedagogyPhase>,
}

impl PedagogyDefinition {
    /// Phase names in teaching order.
    pub fn phases(&self) -> impl Iterator<Item = &str> {
        self.structure.iter().map(|p| p.name.as_str())
    }

    /// Recommended slide type for a phase of this model.
    pub fn slide_type_for_phase(&self, phase: &str) -> Option<SlideType> {
        let phase = phase.trim();
        self.structure
            .iter()
            .find(|p| p.name == phase)
            .map(|p| p.slide_type.clone())
    }

    pub fn applies_to(&self, scene: Scene) -> bool {
        self.applicable_scenes.contains(&scene)
    }
}

/// Model returned when a lookup misses.
pub const DEFAULT_PEDAGOGY_ID: &str = "five_step";

#[derive(Debug, Clone, PartialEq)]
pub struct PedagogyRegistry {
    models: Vec<PedagogyDefinition>,
}

impl PedagogyRegistry {
    /// The ten built-in models, `five_step` first.
    pub fn builtin() -> Self {
        Self {
            models: builtin_models(),
        }
    }

    /// Load models from a JSON array. The built-in default model is added
    /// when the file does not define one, so lookups can always fall back.
    pub fn from_json_reader<R: Read>(reader: R) -> Result<Self> {
        let mut models: Vec<PedagogyDefinition> = serde_json::from_reader(reader)?;
        if !models.iter().any(|m| m.id == DEFAULT_PEDAGOGY_ID) {
            models.extend(
                builtin_models()
                    .into_iter()
                    .filter(|m| m.id == DEFAULT_PEDAGOGY_ID),
            );
        }
        Ok(Self { models })
    }

    pub fn get(&self, id: &str) -> Option<&PedagogyDefinition> {
        self.models.iter().find(|m| m.id == id)
    }

    /// Lookup falling back to the five-step model.
    pub fn get_or_default(&self, id: &str) -> &PedagogyDefinition {
        self.get(id)
            .or_else(|| {
                log::debug!("Pedagogy '{}' not found, using {}", id, DEFAULT_PEDAGOGY_ID);
                self.get(DEFAULT_PEDAGOGY_ID)
            })
            .unwrap_or(&self.models[0])
    }

    pub fn list(&self) -> &[PedagogyDefinition] {
        &self.models
    }

    pub fn by_scene(&self, scene: Scene) -> Vec<&PedagogyDefinition> {
        self.models.iter().filter(|m| m.applies_to(scene)).collect()
    }
}

impl Default for PedagogyRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

fn model(
    id: &str,
    name: &str,
    name_en: &str,
    description: &str,
    scenes: &[Scene],
    structure: &[(&str, SlideType)],
) -> PedagogyDefinition {
    PedagogyDefinition {
        id: id.to_string(),
        name: name.to_string(),
        name_en: name_en.to_string(),
        description: description.to_string(),
        applicable_scenes: scenes.to_vec(),
        structure: structure
            .iter()
            .map(|(name, slide_type)| PedagogyPhase {
                name: name.to_string(),
                slide_type: slide_type.clone(),
            })
            .collect(),
    }
}

fn builtin_models() -> Vec<PedagogyDefinition> {
    use Scene::*;
    use SlideType::*;

    vec![
        model(
            "five_step",
            "五步教学法",
            "Five-Step Teaching Method",
            "经典的职教课堂结构，适用于理论课和混合课",
            &[Theory, Mixed],
            &[
                ("情境导入", Intro),
                ("探究新知", Concept),
                ("示范演练", Steps),
                ("巩固拓展", Exercises),
                ("总结评价", Summary),
            ],
        ),
        model(
            "action_oriented",
            "行动导向法",
            "Action-Oriented Learning (Six Steps)",
            "以学生为中心的实训教学模式，强调任务驱动和自主学习",
            &[Practice, Mixed],
            &[
                ("资讯", Intro),
                ("计划", Concept),
                ("决策", Comparison),
                ("实施", Steps),
                ("检查", Exercises),
                ("评估", Summary),
            ],
        ),
        model(
            "boppps",
            "BOPPPS 模型",
            "BOPPPS Model",
            "北美高校流行的教学设计模型，适合精品课和微课",
            &[Theory, Mixed],
            &[
                ("导引", Intro),
                ("学习目标", Concept),
                ("前测", Exercises),
                ("参与式学习", Steps),
                ("后测", Exercises),
                ("总结", Summary),
            ],
        ),
        model(
            "case_driven",
            "案例驱动法",
            "Case-Driven Method",
            "通过真实案例引导学习，适合医卫、经管、法律类专业",
            &[Theory, Mixed],
            &[
                ("案例展示", Intro),
                ("问题提炼", Concept),
                ("原理剖析", Concept),
                ("方案制定", Steps),
                ("反思总结", Summary),
            ],
        ),
        model(
            "project_based",
            "项目教学法",
            "Project-Based Learning",
            "以完整项目为载体，培养综合职业能力",
            &[Practice, Mixed],
            &[
                ("项目导入", Intro),
                ("项目分析", Concept),
                ("方案设计", Comparison),
                ("项目实施", Steps),
                ("成果展示", Summary),
                ("评价反馈", Exercises),
            ],
        ),
        model(
            "task_driven",
            "任务驱动法",
            "Task-Driven Learning",
            "以具体任务为导向，边学边做",
            &[Practice],
            &[
                ("任务发布", Intro),
                ("知识准备", Concept),
                ("任务实施", Steps),
                ("成果检验", Exercises),
                ("归纳总结", Summary),
            ],
        ),
        model(
            "inquiry_based",
            "探究式教学法",
            "Inquiry-Based Learning",
            "以问题为起点，引导学生自主探索发现",
            &[Theory, Mixed],
            &[
                ("情境创设", Intro),
                ("问题提出", Concept),
                ("自主探究", Steps),
                ("合作交流", Comparison),
                ("总结提升", Summary),
            ],
        ),
        model(
            "flipped_classroom",
            "翻转课堂",
            "Flipped Classroom",
            "课前自学、课中深化，适合混合式教学",
            &[Theory, Mixed],
            &[
                ("课前任务回顾", Intro),
                ("疑难点拨", Concept),
                ("深度探讨", Comparison),
                ("实践应用", Steps),
                ("拓展延伸", Summary),
            ],
        ),
        model(
            "situational",
            "情境教学法",
            "Situational Teaching Method",
            "创设真实工作情境，在情境中学习",
            &[Practice, Mixed],
            &[
                ("情境引入", Intro),
                ("角色分配", Concept),
                ("情境体验", Steps),
                ("问题解决", Exercises),
                ("总结反思", Summary),
            ],
        ),
        model(
            "demonstration",
            "演示教学法",
            "Demonstration Teaching Method",
            "教师演示、学生模仿，适合技能操作类课程",
            &[Practice],
            &[
                ("操作说明", Intro),
                ("教师演示", Steps),
                ("分步讲解", Concept),
                ("学生模仿", Exercises),
                ("纠错强化", Summary),
            ],
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_models() {
        let registry = PedagogyRegistry::builtin();
        assert_eq!(registry.list().len(), 10);
        let action = registry.get("action_oriented").unwrap();
        assert_eq!(action.structure.len(), 6);
        assert_eq!(
            action.phases().collect::<Vec<_>>(),
            vec!["资讯", "计划", "决策", "实施", "检查", "评估"]
        );
    }

    #[test]
    fn test_unknown_model_falls_back_to_five_step() {
        let registry = PedagogyRegistry::builtin();
        assert_eq!(registry.get_or_default("montessori").id, "five_step");
    }

    #[test]
    fn test_slide_type_for_phase() {
        let registry = PedagogyRegistry::builtin();
        let five = registry.get_or_default("five_step");
        assert_eq!(five.slide_type_for_phase("示范演练"), Some(SlideType::Steps));
        assert_eq!(five.slide_type_for_phase(" 总结评价 "), Some(SlideType::Summary));
        assert_eq!(five.slide_type_for_phase("资讯"), None);
    }

    #[test]
    fn test_by_scene() {
        let registry = PedagogyRegistry::builtin();
        let practice: Vec<&str> = registry
            .by_scene(Scene::Practice)
            .iter()
            .map(|m| m.id.as_str())
            .collect();
        assert_eq!(
            practice,
            vec![
                "action_oriented",
                "project_based",
                "task_driven",
                "situational",
                "demonstration"
            ]
        );
    }

    #[test]
    fn test_json_registry_keeps_a_default() {
        let json = r#"[{
            "id": "custom", "name": "自定义", "name_en": "Custom", "description": "",
            "applicable_scenes": ["review"],
            "structure": [{"name": "回顾", "slide_type": "summary"}]
        }]"#;
        let registry = PedagogyRegistry::from_json_reader(json.as_bytes()).unwrap();
        assert_eq!(registry.list().len(), 2);
        assert_eq!(registry.get_or_default("other").id, "five_step");
    }
}
