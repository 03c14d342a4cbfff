//! Reads solved variable values back into domain terms.

use crate::entities::{CourseNumber, ProfessorLabel, SlotIndex};
use crate::model::ScheduleModel;
use crate::solver::{SolveOutcome, SolveStatus};
use serde::Serialize;
use std::collections::BTreeMap;

const THRESHOLD: f64 = 0.5;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LabSession {
    pub professor: ProfessorLabel,
    pub course: CourseNumber,
    pub slot: SlotIndex,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleResult {
    pub status: SolveStatus,
    pub professor_of: BTreeMap<CourseNumber, ProfessorLabel>,
    pub slot_of: BTreeMap<CourseNumber, SlotIndex>,
    /// Sorted by professor, then course, then slot.
    pub labs: Vec<LabSession>,
    /// Objective over the rounded assignment.
    pub objective: Option<f64>,
}

impl ScheduleResult {
    pub fn empty(status: SolveStatus) -> Self {
        Self {
            status,
            professor_of: BTreeMap::new(),
            slot_of: BTreeMap::new(),
            labs: Vec::new(),
            objective: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.professor_of.is_empty() && self.slot_of.is_empty() && self.labs.is_empty()
    }
}

pub fn extract(model: &ScheduleModel, outcome: &SolveOutcome) -> ScheduleResult {
    let values = match (outcome.status, &outcome.values) {
        (SolveStatus::Optimal, Some(values)) => values,
        (status, _) => return ScheduleResult::empty(status),
    };
    let chosen: Vec<f64> = values
        .iter()
        .map(|v| if *v > THRESHOLD { 1.0 } else { 0.0 })
        .collect();
    let on = |id: crate::model::VarId| chosen.get(id.0).is_some_and(|v| *v > THRESHOLD);

    let professor_of = model
        .variables
        .teach_vars()
        .filter(|(_, id)| on(*id))
        .map(|(k, _)| (k.course, k.prof.clone()))
        .collect();
    let slot_of = model
        .variables
        .placement_vars()
        .filter(|(_, id)| on(*id))
        .map(|(k, _)| (k.course, k.slot))
        .collect();
    let mut labs: Vec<LabSession> = model
        .variables
        .lab_vars()
        .filter(|(_, id)| on(*id))
        .map(|(k, _)| LabSession {
            professor: k.prof.clone(),
            course: k.course,
            slot: k.slot,
        })
        .collect();
    labs.sort();

    ScheduleResult {
        status: outcome.status,
        professor_of,
        slot_of,
        labs,
        objective: Some(model.objective.evaluate(&chosen)),
    }
}
