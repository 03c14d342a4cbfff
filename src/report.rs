//! Joins a [`ScheduleResult`] with entity attributes for display and export.

use crate::entities::{CourseGroup, CourseNumber, Entities, Level, ProfessorLabel, SlotIndex};
use crate::extract::ScheduleResult;
use crate::solver::SolveStatus;
use itertools::Itertools;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeachingRow {
    pub professor: ProfessorLabel,
    pub course: CourseNumber,
    pub name: String,
    pub credits: u32,
    pub level: Level,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacementRow {
    pub course: CourseNumber,
    pub name: String,
    pub slot: SlotIndex,
    pub time: String,
    pub days: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleRow {
    pub professor: ProfessorLabel,
    pub course: CourseNumber,
    pub name: String,
    pub time: String,
    pub days: String,
    pub credits: u32,
    pub level: Level,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LabRow {
    pub professor: ProfessorLabel,
    pub course: CourseNumber,
    pub name: String,
    pub slot: SlotIndex,
    pub time: String,
    pub days: String,
}

/// How a course group spread over the fairness subsets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupUsage {
    pub group: CourseGroup,
    pub sections: usize,
    pub prime_sections: usize,
    pub designated_day_sections: usize,
}

impl fmt::Display for GroupUsage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} sections, {} prime, {} on designated days",
            self.group, self.sections, self.prime_sections, self.designated_day_sections
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleReport {
    pub status: SolveStatus,
    pub status_code: u8,
    pub total_credits: Option<f64>,
    pub teaching: Vec<TeachingRow>,
    pub placements: Vec<PlacementRow>,
    pub labs: Vec<LabRow>,
    pub schedule: Vec<ScheduleRow>,
    pub group_usage: Vec<GroupUsage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl ScheduleReport {
    pub fn build(entities: &Entities, result: &ScheduleResult) -> Self {
        let course = |n: CourseNumber| entities.course(n);
        let slot = |s: SlotIndex| entities.slot(s);

        let teaching: Vec<TeachingRow> = result
            .professor_of
            .iter()
            .filter_map(|(n, p)| {
                course(*n).map(|c| TeachingRow {
                    professor: p.clone(),
                    course: *n,
                    name: c.name.clone(),
                    credits: c.credits,
                    level: c.level,
                })
            })
            .sorted_by(|a, b| (&a.professor, a.course).cmp(&(&b.professor, b.course)))
            .collect();

        let placements: Vec<PlacementRow> = result
            .slot_of
            .iter()
            .filter_map(|(n, s)| {
                let (c, t) = (course(*n)?, slot(*s)?);
                Some(PlacementRow {
                    course: *n,
                    name: c.name.clone(),
                    slot: *s,
                    time: t.time_label.clone(),
                    days: t.days_label.clone(),
                })
            })
            .collect();

        let labs = result
            .labs
            .iter()
            .filter_map(|l| {
                let (c, t) = (course(l.course)?, slot(l.slot)?);
                Some(LabRow {
                    professor: l.professor.clone(),
                    course: l.course,
                    name: c.name.clone(),
                    slot: l.slot,
                    time: t.time_label.clone(),
                    days: t.days_label.clone(),
                })
            })
            .collect();

        let schedule: Vec<ScheduleRow> = teaching
            .iter()
            .filter_map(|row| {
                let t = slot(*result.slot_of.get(&row.course)?)?;
                Some(ScheduleRow {
                    professor: row.professor.clone(),
                    course: row.course,
                    name: row.name.clone(),
                    time: t.time_label.clone(),
                    days: t.days_label.clone(),
                    credits: row.credits,
                    level: row.level,
                })
            })
            .sorted_by(|a, b| {
                (&a.professor, &a.time, a.course).cmp(&(&b.professor, &b.time, b.course))
            })
            .collect();

        let group_usage = result
            .slot_of
            .iter()
            .filter_map(|(n, s)| Some((course(*n)?.group, slot(*s)?)))
            .into_group_map()
            .into_iter()
            .map(|(group, slots)| GroupUsage {
                group,
                sections: slots.len(),
                prime_sections: slots.iter().filter(|t| t.prime).count(),
                designated_day_sections: slots.iter().filter(|t| t.designated_days).count(),
            })
            .sorted_by_key(|u| u.group)
            .collect();

        let hint = match result.status {
            SolveStatus::Infeasible | SolveStatus::InfeasibleOrUnbounded => Some(
                "Model is infeasible; compute an IIS on the raw model to find the conflicting constraints."
                    .to_string(),
            ),
            SolveStatus::Loaded | SolveStatus::Interrupted => {
                Some("Solver returned no usable assignment.".to_string())
            }
            SolveStatus::Optimal | SolveStatus::Unbounded => None,
        };

        Self {
            status: result.status,
            status_code: result.status.code(),
            total_credits: result.objective,
            teaching,
            placements,
            labs,
            schedule,
            group_usage,
            hint,
        }
    }
}
