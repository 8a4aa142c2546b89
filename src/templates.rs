//! Built-in rubric skeletons per module number. The catalog is fixed at
//! build time; the UI reads a template and feeds the materialized
//! objectives back through a normal project update.

use uuid::Uuid;

use crate::model::{Indicator, Objective};

pub struct TemplateIndicator {
    pub title: &'static str,
    pub weight: f64,
    pub max_score: u32,
}

pub struct TemplateObjective {
    pub title: &'static str,
    pub description: &'static str,
    pub indicators: &'static [TemplateIndicator],
}

pub struct ModuleTemplate {
    pub module_number: &'static str,
    pub name: &'static str,
    pub objectives: &'static [TemplateObjective],
}

pub const MODULE_TEMPLATES: &[ModuleTemplate] = &[
    ModuleTemplate {
        module_number: "117",
        name: "Informatics and network infrastructure for a small business",
        objectives: &[
            TemplateObjective {
                title: "Plan the network layout",
                description: "Topology, addressing and required components",
                indicators: &[
                    TemplateIndicator { title: "Draws a correct topology", weight: 2.0, max_score: 3 },
                    TemplateIndicator { title: "Chooses a fitting address plan", weight: 1.0, max_score: 3 },
                ],
            },
            TemplateObjective {
                title: "Commission the infrastructure",
                description: "Install, configure and verify the planned setup",
                indicators: &[
                    TemplateIndicator { title: "Configures devices per plan", weight: 2.0, max_score: 3 },
                    TemplateIndicator { title: "Verifies connectivity systematically", weight: 1.0, max_score: 3 },
                ],
            },
        ],
    },
    ModuleTemplate {
        module_number: "231",
        name: "Apply data protection and data security",
        objectives: &[
            TemplateObjective {
                title: "Assess protection needs",
                description: "Classify data and derive protection measures",
                indicators: &[
                    TemplateIndicator { title: "Classifies data correctly", weight: 1.0, max_score: 3 },
                    TemplateIndicator { title: "Derives proportionate measures", weight: 2.0, max_score: 3 },
                ],
            },
        ],
    },
    ModuleTemplate {
        module_number: "320",
        name: "Object-oriented programming",
        objectives: &[
            TemplateObjective {
                title: "Model a class structure",
                description: "Classes, relations and responsibilities",
                indicators: &[
                    TemplateIndicator { title: "Identifies sensible classes", weight: 1.0, max_score: 3 },
                    TemplateIndicator { title: "Assigns clear responsibilities", weight: 1.0, max_score: 3 },
                ],
            },
            TemplateObjective {
                title: "Implement and test the model",
                description: "Working implementation with unit tests",
                indicators: &[
                    TemplateIndicator { title: "Implementation matches the model", weight: 2.0, max_score: 3 },
                    TemplateIndicator { title: "Tests cover the core behavior", weight: 1.0, max_score: 3 },
                ],
            },
        ],
    },
];

pub fn find_template(module_number: &str) -> Option<&'static ModuleTemplate> {
    MODULE_TEMPLATES
        .iter()
        .find(|t| t.module_number == module_number)
}

/// Materialize a template's rubric with fresh ids, ready to be applied to a
/// project's objective collection.
pub fn materialize_objectives(template: &ModuleTemplate) -> Vec<Objective> {
    template
        .objectives
        .iter()
        .map(|o| Objective {
            id: Uuid::new_v4().to_string(),
            title: o.title.to_string(),
            description: o.description.to_string(),
            indicators: o
                .indicators
                .iter()
                .map(|i| Indicator {
                    id: Uuid::new_v4().to_string(),
                    title: i.title.to_string(),
                    weight: i.weight,
                    max_score: i.max_score,
                })
                .collect(),
        })
        .collect()
}
