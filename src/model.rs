//! Immutable MILP description of a term's timetable.
//!
//! Four binary families are declared over the normalised entities:
//!
//! - `x[prof, course]`: the professor teaches the course
//! - `y[course, slot]`: the course meets at the slot
//! - `z[prof, slot]`: the professor is occupied at the slot
//! - `l[prof, course, slot]`: the course's lab, run by the professor, meets at the slot
//!
//! The model is plain data. A [`crate::solver::MilpSolver`] consumes it whole, and
//! [`ScheduleModel::violations`] checks any candidate assignment against it.

use crate::config::SchedulingConfig;
use crate::entities::{CourseNumber, Entities, ProfessorLabel, SlotIndex};
use crate::error::{Result, SchedulingError};
use crate::grouping::Groupings;
use log::{info, trace};
use std::collections::BTreeMap;
use std::fmt;

const TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VarId(pub usize);

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TeachKey {
    pub prof: ProfessorLabel,
    pub course: CourseNumber,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PlacementKey {
    pub course: CourseNumber,
    pub slot: SlotIndex,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OccupancyKey {
    pub prof: ProfessorLabel,
    pub slot: SlotIndex,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LabKey {
    pub prof: ProfessorLabel,
    pub course: CourseNumber,
    pub slot: SlotIndex,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VarKey {
    Teach(TeachKey),
    Placement(PlacementKey),
    Occupancy(OccupancyKey),
    Lab(LabKey),
}

impl fmt::Display for VarKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VarKey::Teach(k) => write!(f, "x[{},{}]", k.prof, k.course),
            VarKey::Placement(k) => write!(f, "y[{},{}]", k.course, k.slot),
            VarKey::Occupancy(k) => write!(f, "z[{},{}]", k.prof, k.slot),
            VarKey::Lab(k) => write!(f, "l[{},{},{}]", k.prof, k.course, k.slot),
        }
    }
}

/// Typed handles for every declared variable.
#[derive(Debug, Clone, Default)]
pub struct Variables {
    keys: Vec<VarKey>,
    teach: BTreeMap<TeachKey, VarId>,
    placement: BTreeMap<PlacementKey, VarId>,
    occupancy: BTreeMap<OccupancyKey, VarId>,
    lab: BTreeMap<LabKey, VarId>,
}

impl Variables {
    fn declare(&mut self, key: VarKey) -> VarId {
        let id = VarId(self.keys.len());
        match &key {
            VarKey::Teach(k) => self.teach.insert(k.clone(), id),
            VarKey::Placement(k) => self.placement.insert(*k, id),
            VarKey::Occupancy(k) => self.occupancy.insert(k.clone(), id),
            VarKey::Lab(k) => self.lab.insert(k.clone(), id),
        };
        self.keys.push(key);
        id
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn key(&self, id: VarId) -> Option<&VarKey> {
        self.keys.get(id.0)
    }

    pub fn keys(&self) -> impl Iterator<Item = (VarId, &VarKey)> {
        self.keys.iter().enumerate().map(|(i, k)| (VarId(i), k))
    }

    pub fn x(&self, prof: &ProfessorLabel, course: CourseNumber) -> Result<VarId> {
        let key = TeachKey {
            prof: prof.clone(),
            course,
        };
        self.teach
            .get(&key)
            .copied()
            .ok_or_else(|| SchedulingError::UnknownIndex(VarKey::Teach(key).to_string()))
    }

    pub fn y(&self, course: CourseNumber, slot: SlotIndex) -> Result<VarId> {
        let key = PlacementKey { course, slot };
        self.placement
            .get(&key)
            .copied()
            .ok_or_else(|| SchedulingError::UnknownIndex(VarKey::Placement(key).to_string()))
    }

    pub fn z(&self, prof: &ProfessorLabel, slot: SlotIndex) -> Result<VarId> {
        let key = OccupancyKey {
            prof: prof.clone(),
            slot,
        };
        self.occupancy
            .get(&key)
            .copied()
            .ok_or_else(|| SchedulingError::UnknownIndex(VarKey::Occupancy(key).to_string()))
    }

    pub fn l(&self, prof: &ProfessorLabel, course: CourseNumber, slot: SlotIndex) -> Result<VarId> {
        let key = LabKey {
            prof: prof.clone(),
            course,
            slot,
        };
        self.lab
            .get(&key)
            .copied()
            .ok_or_else(|| SchedulingError::UnknownIndex(VarKey::Lab(key).to_string()))
    }

    pub fn teach_vars(&self) -> impl Iterator<Item = (&TeachKey, VarId)> {
        self.teach.iter().map(|(k, v)| (k, *v))
    }

    pub fn placement_vars(&self) -> impl Iterator<Item = (&PlacementKey, VarId)> {
        self.placement.iter().map(|(k, v)| (k, *v))
    }

    pub fn lab_vars(&self) -> impl Iterator<Item = (&LabKey, VarId)> {
        self.lab.iter().map(|(k, v)| (k, *v))
    }
}

/// `Σ coefficient · variable`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinearExpr {
    pub terms: Vec<(VarId, f64)>,
}

impl LinearExpr {
    pub fn add(&mut self, var: VarId, coefficient: f64) -> &mut Self {
        self.terms.push((var, coefficient));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn evaluate(&self, values: &[f64]) -> f64 {
        self.terms
            .iter()
            .map(|(var, c)| c * values.get(var.0).copied().unwrap_or(0.0))
            .sum()
    }
}

impl FromIterator<VarId> for LinearExpr {
    fn from_iter<I: IntoIterator<Item = VarId>>(iter: I) -> Self {
        Self {
            terms: iter.into_iter().map(|v| (v, 1.0)).collect(),
        }
    }
}

impl FromIterator<(VarId, f64)> for LinearExpr {
    fn from_iter<I: IntoIterator<Item = (VarId, f64)>>(iter: I) -> Self {
        Self {
            terms: iter.into_iter().collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sense {
    LessEq,
    Equal,
}

/// The rule a constraint belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ConstraintKind {
    OneProfessor,
    ProfessorLoad,
    TeachingEligibility,
    OneSlot,
    ProfessorSlots,
    Availability,
    OccupancyLink,
    OneToOne,
    LabExists,
    LabValidity,
    GroupConflict,
    Pinned,
    PrimeFairness,
    DesignatedDaysFairness,
}

impl ConstraintKind {
    pub fn prefix(self) -> &'static str {
        match self {
            ConstraintKind::OneProfessor => "one_professor",
            ConstraintKind::ProfessorLoad => "professor_load",
            ConstraintKind::TeachingEligibility => "teach_eligible",
            ConstraintKind::OneSlot => "one_slot",
            ConstraintKind::ProfessorSlots => "professor_slots",
            ConstraintKind::Availability => "available",
            ConstraintKind::OccupancyLink => "occupancy_link",
            ConstraintKind::OneToOne => "one_to_one",
            ConstraintKind::LabExists => "lab_exists",
            ConstraintKind::LabValidity => "lab_validity",
            ConstraintKind::GroupConflict => "group_conflict",
            ConstraintKind::Pinned => "pinned",
            ConstraintKind::PrimeFairness => "max_half_prime",
            ConstraintKind::DesignatedDaysFairness => "max_half_designated_days",
        }
    }
}

/// `expr (<= | ==) rhs`.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearConstraint {
    pub kind: ConstraintKind,
    pub name: String,
    pub expr: LinearExpr,
    pub sense: Sense,
    pub rhs: f64,
}

impl LinearConstraint {
    pub fn is_satisfied(&self, values: &[f64]) -> bool {
        let lhs = self.expr.evaluate(values);
        match self.sense {
            Sense::LessEq => lhs <= self.rhs + TOLERANCE,
            Sense::Equal => (lhs - self.rhs).abs() <= TOLERANCE,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScheduleModel {
    pub variables: Variables,
    pub constraints: Vec<LinearConstraint>,
    /// Maximised.
    pub objective: LinearExpr,
}

impl ScheduleModel {
    /// Constraints the assignment breaks; `values` is indexed by [`VarId`].
    pub fn violations(&self, values: &[f64]) -> Vec<&LinearConstraint> {
        self.constraints
            .iter()
            .filter(|c| !c.is_satisfied(values))
            .collect()
    }

    pub fn constraints_of(&self, kind: ConstraintKind) -> impl Iterator<Item = &LinearConstraint> {
        self.constraints.iter().filter(move |c| c.kind == kind)
    }
}

struct Constraints(Vec<LinearConstraint>);

impl Constraints {
    fn push(&mut self, kind: ConstraintKind, index: fmt::Arguments<'_>, expr: LinearExpr, sense: Sense, rhs: f64) {
        if expr.is_empty() {
            return;
        }
        self.0.push(LinearConstraint {
            kind,
            name: format!("{}[{}]", kind.prefix(), index),
            expr,
            sense,
            rhs,
        });
    }
}

pub fn build(entities: &Entities, groupings: &Groupings, config: &SchedulingConfig) -> Result<ScheduleModel> {
    let profs = &entities.professors;
    let courses = &entities.courses;
    let slots = &entities.slots;
    let eligibility = &entities.eligibility;
    if profs.is_empty() {
        return Err(SchedulingError::EmptyCollection("professors"));
    }
    if courses.is_empty() {
        return Err(SchedulingError::EmptyCollection("courses"));
    }
    if slots.is_empty() {
        return Err(SchedulingError::EmptyCollection("times"));
    }
    info!(
        "Setting up ILP model with {} professors, {} courses, and {} timeslots...",
        profs.len(),
        courses.len(),
        slots.len()
    );

    let mut vars = Variables::default();
    for p in profs {
        for c in courses {
            vars.declare(VarKey::Teach(TeachKey {
                prof: p.label.clone(),
                course: c.number,
            }));
        }
    }
    for c in courses {
        for s in slots {
            vars.declare(VarKey::Placement(PlacementKey {
                course: c.number,
                slot: s.index,
            }));
        }
    }
    for p in profs {
        for s in slots {
            vars.declare(VarKey::Occupancy(OccupancyKey {
                prof: p.label.clone(),
                slot: s.index,
            }));
        }
    }
    for p in profs {
        for c in courses {
            for s in slots {
                vars.declare(VarKey::Lab(LabKey {
                    prof: p.label.clone(),
                    course: c.number,
                    slot: s.index,
                }));
            }
        }
    }
    trace!(
        "Declared {} variables: {} x, {} y, {} z, {} l.",
        vars.len(),
        vars.teach.len(),
        vars.placement.len(),
        vars.occupancy.len(),
        vars.lab.len()
    );

    let objective = profs
        .iter()
        .flat_map(|p| courses.iter().map(move |c| (p, c)))
        .map(|(p, c)| -> Result<(VarId, f64)> { Ok((vars.x(&p.label, c.number)?, f64::from(c.credits))) })
        .collect::<Result<LinearExpr>>()?;

    let mut cs = Constraints(Vec::new());
    use ConstraintKind::*;

    for c in courses {
        // C1
        let expr = profs
            .iter()
            .map(|p| vars.x(&p.label, c.number))
            .collect::<Result<LinearExpr>>()?;
        cs.push(OneProfessor, format_args!("{}", c.number), expr, Sense::Equal, 1.0);

        // C4
        let expr = slots
            .iter()
            .map(|s| vars.y(c.number, s.index))
            .collect::<Result<LinearExpr>>()?;
        cs.push(OneSlot, format_args!("{}", c.number), expr, Sense::Equal, 1.0);

        // C8
        let mut expr = LinearExpr::default();
        for p in profs {
            expr.add(vars.x(&p.label, c.number)?, 1.0);
        }
        for s in slots {
            expr.add(vars.y(c.number, s.index)?, -1.0);
        }
        cs.push(OneToOne, format_args!("{}", c.number), expr, Sense::Equal, 0.0);

        // C9
        let mut expr = LinearExpr::default();
        for p in profs {
            for s in slots {
                expr.add(vars.l(&p.label, c.number, s.index)?, 1.0);
            }
        }
        let labs = if c.has_lab { 1.0 } else { 0.0 };
        cs.push(LabExists, format_args!("{}", c.number), expr, Sense::Equal, labs);
    }

    for p in profs {
        // C2
        let expr = courses
            .iter()
            .map(|c| -> Result<(VarId, f64)> { Ok((vars.x(&p.label, c.number)?, f64::from(c.credits))) })
            .collect::<Result<LinearExpr>>()?;
        cs.push(ProfessorLoad, format_args!("{}", p.label), expr, Sense::LessEq, f64::from(p.max_credit));

        // C5
        let expr = slots
            .iter()
            .map(|s| vars.z(&p.label, s.index))
            .collect::<Result<LinearExpr>>()?;
        let max_slots = p.max_credit.div_ceil(config.credits_per_course_unit);
        cs.push(ProfessorSlots, format_args!("{}", p.label), expr, Sense::LessEq, f64::from(max_slots));

        for c in courses {
            // C3
            let x = vars.x(&p.label, c.number)?;
            let allowed = f64::from(eligibility.prof_course(&p.label, c.number));
            cs.push(
                TeachingEligibility,
                format_args!("{},{}", p.label, c.number),
                LinearExpr::from_iter([x]),
                Sense::LessEq,
                allowed,
            );
        }

        for s in slots {
            // C6
            let z = vars.z(&p.label, s.index)?;
            let available = f64::from(eligibility.prof_time(&p.label, s.index));
            cs.push(
                Availability,
                format_args!("{},{}", p.label, s.index),
                LinearExpr::from_iter([z]),
                Sense::LessEq,
                available,
            );

            for c in courses {
                let x = vars.x(&p.label, c.number)?;
                let y = vars.y(c.number, s.index)?;
                let l = vars.l(&p.label, c.number, s.index)?;

                // C7: x + y - 1 <= z
                let expr = LinearExpr::from_iter([(x, 1.0), (y, 1.0), (z, -1.0)]);
                cs.push(
                    OccupancyLink,
                    format_args!("{},{},{}", p.label, c.number, s.index),
                    expr,
                    Sense::LessEq,
                    1.0,
                );

                // C10: l <= (x + (1 - y) + prof_time) / 3, scaled by three
                let expr = LinearExpr::from_iter([(l, 3.0), (x, -1.0), (y, 1.0)]);
                cs.push(
                    LabValidity,
                    format_args!("{},{},{}", p.label, c.number, s.index),
                    expr,
                    Sense::LessEq,
                    1.0 + available,
                );
            }
        }
    }

    // C11
    for (g, group_courses) in &groupings.course_groups {
        for (t, group_slots) in &groupings.day_time_groups {
            let mut expr = LinearExpr::default();
            for &course in group_courses {
                for &slot in group_slots {
                    expr.add(vars.y(course, slot)?, 1.0);
                    for p in profs {
                        expr.add(vars.l(&p.label, course, slot)?, 1.0);
                    }
                }
            }
            cs.push(GroupConflict, format_args!("{g},t{t}"), expr, Sense::LessEq, 1.0);
        }
    }

    // C12
    if let Some(pin) = groupings.pinned {
        let expr = pin
            .slots
            .iter()
            .map(|&s| vars.y(pin.course, s))
            .collect::<Result<LinearExpr>>()?;
        cs.push(Pinned, format_args!("{}", pin.course), expr, Sense::Equal, 1.0);
    }

    // C13, C14: 2 * in_subset <= total, i.e. in_subset - outside <= 0
    let pinned_course = groupings.pinned.map(|p| p.course);
    for (kind, subset) in [
        (PrimeFairness, &groupings.prime_slots),
        (DesignatedDaysFairness, &groupings.designated_days_slots),
    ] {
        for (g, group_courses) in &groupings.course_groups {
            let mut expr = LinearExpr::default();
            for &course in group_courses.iter().filter(|&&c| Some(c) != pinned_course) {
                for s in slots {
                    let coefficient = if subset.contains(&s.index) { 1.0 } else { -1.0 };
                    expr.add(vars.y(course, s.index)?, coefficient);
                }
            }
            cs.push(kind, format_args!("{g}"), expr, Sense::LessEq, 0.0);
        }
    }

    info!(
        "Model has {} variables and {} constraints.",
        vars.len(),
        cs.0.len()
    );

    Ok(ScheduleModel {
        variables: vars,
        constraints: cs.0,
        objective,
    })
}
