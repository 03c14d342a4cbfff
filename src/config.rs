use crate::error::{Result, SchedulingError};
use serde::{Deserialize, Serialize};
use std::ops::Range;
use std::path::Path;

/// What an explicit marker cell means in an eligibility matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerConvention {
    /// Marker = 1, blank = 0.
    MarkedMeansYes,
    /// Marker = 0, blank = 1.
    MarkedMeansNo,
}

/// How time slots are bucketed for the group-conflict constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum DayTimePolicy {
    /// Same time label and at least one shared day, closed transitively.
    SharedDay,
    /// Fixed arithmetic over row position, as laid out in the source workbook.
    RowBlocks { block_size: usize },
}

/// A single course that must land in one of exactly two slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PinnedOverride {
    pub course: u32,
    pub slots: [usize; 2],
}

/// Header names of the metadata columns in the raw tables.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ColumnNames {
    pub prof: String,
    pub max_courses: String,
    pub number: String,
    pub name: String,
    pub level: String,
    pub credits: String,
    pub lab_sections: String,
    pub enrollment: String,
    pub time: String,
    pub days: String,
}

impl Default for ColumnNames {
    fn default() -> Self {
        Self {
            prof: "Prof".into(),
            max_courses: "NumCourses".into(),
            number: "Number".into(),
            name: "Name".into(),
            level: "Grad/Ugrad".into(),
            credits: "Credits".into(),
            lab_sections: "Labs/Discussion Sections".into(),
            enrollment: "Total Enrollment".into(),
            time: "Times".into(),
            days: "Days".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SolverOptions {
    pub threads: i32,
    pub random_seed: i32,
    pub log_to_console: bool,
    pub time_limit_secs: Option<f64>,
}

impl Default for SolverOptions {
    fn default() -> Self {
        Self {
            threads: 1,
            random_seed: 1234,
            log_to_console: false,
            time_limit_secs: None,
        }
    }
}

/// Every policy constant of a scheduling run.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SchedulingConfig {
    /// Credits carried by one course unit; scales loads and undergraduate credits.
    pub credits_per_course_unit: u32,
    /// Trailing rows of the course and time matrices that hold no data.
    pub footer_rows: usize,
    pub columns: ColumnNames,
    pub course_marker: MarkerConvention,
    pub time_marker: MarkerConvention,
    pub marker: String,
    /// Inclusive course-number range collapsed into `high_level_group`.
    pub high_level_range: (u32, u32),
    pub high_level_group: u32,
    pub research_courses: Vec<u32>,
    pub research_group: u32,
    pub day_time_policy: DayTimePolicy,
    pub prime_slots: Range<usize>,
    pub designated_days: String,
    pub pinned: Option<PinnedOverride>,
    pub solver: SolverOptions,
}

impl Default for SchedulingConfig {
    fn default() -> Self {
        Self {
            credits_per_course_unit: 3,
            footer_rows: 2,
            columns: ColumnNames::default(),
            course_marker: MarkerConvention::MarkedMeansYes,
            time_marker: MarkerConvention::MarkedMeansNo,
            marker: "x".into(),
            high_level_range: (500, 699),
            high_level_group: 6,
            research_courses: vec![701],
            research_group: 7,
            day_time_policy: DayTimePolicy::SharedDay,
            prime_slots: 4..16,
            designated_days: "T/TH".into(),
            pinned: Some(PinnedOverride {
                course: 701,
                slots: [8, 10],
            }),
            solver: SolverOptions::default(),
        }
    }
}

impl SchedulingConfig {
    /// Reads a JSON config file; missing keys fall back to the defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| SchedulingError::Config(format!("{}: {e}", path.display())))?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(raw).map_err(|e| SchedulingError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.credits_per_course_unit == 0 {
            return Err(SchedulingError::Config(
                "creditsPerCourseUnit must be positive".into(),
            ));
        }
        if let DayTimePolicy::RowBlocks { block_size: 0 } = self.day_time_policy {
            return Err(SchedulingError::Config("block_size must be positive".into()));
        }
        if self.high_level_range.0 > self.high_level_range.1 {
            return Err(SchedulingError::Config(format!(
                "highLevelRange {:?} is empty",
                self.high_level_range
            )));
        }
        if let Some(pin) = self.pinned {
            if pin.slots[0] == pin.slots[1] {
                return Err(SchedulingError::Config(format!(
                    "pinned course {} needs two distinct slots",
                    pin.course
                )));
            }
        }
        if self.marker.trim().is_empty() {
            return Err(SchedulingError::Config("marker must not be blank".into()));
        }
        Ok(())
    }
}
