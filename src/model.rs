use chrono::{Local, NaiveDate, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Current wall-clock time as an RFC 3339 UTC string with microseconds.
/// Fixed-width, so lexicographic order on stored timestamps is chronological.
pub fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Module category letter as it appears in project names.
/// The weight mapping lives only here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModulePrefix {
    A,
    B,
}

impl ModulePrefix {
    pub fn from_letter(c: char) -> Option<Self> {
        match c.to_ascii_uppercase() {
            'A' => Some(ModulePrefix::A),
            'B' => Some(ModulePrefix::B),
            _ => None,
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        let mut chars = code.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Self::from_letter(c),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ModulePrefix::A => "A",
            ModulePrefix::B => "B",
        }
    }

    /// Share of the module grade carried by this evaluation category.
    pub fn weight(self) -> f64 {
        match self {
            ModulePrefix::A => 0.8,
            ModulePrefix::B => 0.2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestType {
    Formative,
    Summative,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    Grid,
    List,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultView {
    Points,
    Percent,
    Grade,
}

/// Application-wide settings document; the same shape is embedded in every
/// project. Records written by older builds may lack fields added since:
/// the container-level serde default fills those from `Settings::default()`,
/// stored values win field by field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub class_average: f64,
    pub pass_threshold: f64,
    pub correction_error_factor: f64,
    pub module_name: String,
    pub test_identifier: String,
    pub module_description: String,
    pub corrector_name: String,
    pub school_name: String,
    pub test_type: TestType,
    pub show_points: bool,
    pub show_grade: bool,
    pub show_remarks: bool,
    pub max_questions: Option<u32>,
    pub test_date: NaiveDate,
    pub view_mode: ViewMode,
    pub result_view: ResultView,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            class_average: 4.5,
            pass_threshold: 4.0,
            correction_error_factor: 0.0,
            module_name: String::new(),
            test_identifier: "EP1".to_string(),
            module_description: String::new(),
            corrector_name: String::new(),
            school_name: String::new(),
            test_type: TestType::Summative,
            show_points: true,
            show_grade: true,
            show_remarks: false,
            max_questions: None,
            test_date: Local::now().date_naive(),
            view_mode: ViewMode::Grid,
            result_view: ResultView::Points,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Indicator {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub weight: f64,
    #[serde(default = "default_max_score")]
    pub max_score: u32,
}

fn default_max_score() -> u32 {
    3
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Objective {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub indicators: Vec<Indicator>,
}

/// One per-indicator result inside a grid. `points` is computed by the
/// grade calculator in the UI layer and stored verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Evaluation {
    pub indicator_id: String,
    #[serde(default)]
    pub score: Option<u32>,
    #[serde(default)]
    pub remark: Option<String>,
    #[serde(default)]
    pub points: f64,
    #[serde(default)]
    pub selected: bool,
}

/// A single student's scored rubric within a project. Totals and the
/// module/test snapshot are denormalized at grading time by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Grid {
    pub student_id: String,
    #[serde(default)]
    pub evaluations: Vec<Evaluation>,
    #[serde(default)]
    pub total_points: f64,
    #[serde(default)]
    pub max_points: f64,
    #[serde(default)]
    pub grade: Option<f64>,
    #[serde(default)]
    pub module_name: String,
    #[serde(default)]
    pub module_description: String,
    #[serde(default)]
    pub test_date: Option<NaiveDate>,
    #[serde(default = "now_iso")]
    pub created_at: String,
    #[serde(default)]
    pub completed_at: Option<String>,
}

/// The persisted aggregate: roster, rubric, grids and settings live as
/// nested documents inside one row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "now_iso")]
    pub created_at: String,
    #[serde(default = "now_iso")]
    pub updated_at: String,
    #[serde(default)]
    pub module_number: Option<String>,
    #[serde(default)]
    pub module_prefix: Option<ModulePrefix>,
    #[serde(default)]
    pub weight_percent: Option<f64>,
    #[serde(default)]
    pub settings: Settings,
    #[serde(default)]
    pub students: Vec<Student>,
    #[serde(default)]
    pub objectives: Vec<Objective>,
    #[serde(default)]
    pub grids: Vec<Grid>,
}
