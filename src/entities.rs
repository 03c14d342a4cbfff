use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;

/// Spreadsheet-style professor label: `A`, `B`, …, `Z`, `AA`, …
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProfessorLabel(pub String);

impl ProfessorLabel {
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// Column order: shorter labels sort first, so `Z < AA`.
impl Ord for ProfessorLabel {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0
            .len()
            .cmp(&other.0.len())
            .then_with(|| self.0.cmp(&other.0))
    }
}

impl PartialOrd for ProfessorLabel {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for ProfessorLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CourseNumber(pub u32);

impl fmt::Display for CourseNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Position of a slot row once footer rows are dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SlotIndex(pub usize);

impl fmt::Display for SlotIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CourseGroup(pub u32);

impl fmt::Display for CourseGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "g{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Professor {
    pub label: ProfessorLabel,
    /// Maximum credit load for the term.
    pub max_credit: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Level {
    Grad,
    Ugrad,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Level::Grad => f.write_str("Grad"),
            Level::Ugrad => f.write_str("Ugrad"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub number: CourseNumber,
    pub name: String,
    pub level: Level,
    /// Credit weight, already scaled for undergraduate courses.
    pub credits: u32,
    pub enrollment: u32,
    pub lab_sections: u32,
    pub has_lab: bool,
    pub group: CourseGroup,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSlot {
    pub index: SlotIndex,
    pub time_label: String,
    pub days_label: String,
    pub time_group: u32,
    pub day_time_group: u32,
    pub prime: bool,
    pub designated_days: bool,
}

/// The two eligibility relations. Pairs not recorded are ineligible.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Eligibility {
    teach: BTreeSet<(ProfessorLabel, CourseNumber)>,
    available: BTreeSet<(ProfessorLabel, SlotIndex)>,
}

impl Eligibility {
    pub fn allow_teaching(&mut self, prof: ProfessorLabel, course: CourseNumber) {
        self.teach.insert((prof, course));
    }

    pub fn allow_slot(&mut self, prof: ProfessorLabel, slot: SlotIndex) {
        self.available.insert((prof, slot));
    }

    pub fn can_teach(&self, prof: &ProfessorLabel, course: CourseNumber) -> bool {
        self.teach.contains(&(prof.clone(), course))
    }

    pub fn is_available(&self, prof: &ProfessorLabel, slot: SlotIndex) -> bool {
        self.available.contains(&(prof.clone(), slot))
    }

    /// `prof_course[prof, course]` as a 0/1 coefficient.
    pub fn prof_course(&self, prof: &ProfessorLabel, course: CourseNumber) -> u8 {
        u8::from(self.can_teach(prof, course))
    }

    /// `prof_time[prof, slot]` as a 0/1 coefficient.
    pub fn prof_time(&self, prof: &ProfessorLabel, slot: SlotIndex) -> u8 {
        u8::from(self.is_available(prof, slot))
    }
}

/// Normalised, read-only inputs of a scheduling run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entities {
    pub professors: Vec<Professor>,
    pub courses: Vec<Course>,
    pub slots: Vec<TimeSlot>,
    pub eligibility: Eligibility,
}

impl Entities {
    pub fn course(&self, number: CourseNumber) -> Option<&Course> {
        self.courses.iter().find(|c| c.number == number)
    }

    pub fn slot(&self, index: SlotIndex) -> Option<&TimeSlot> {
        self.slots.get(index.0)
    }

    pub fn professor(&self, label: &ProfessorLabel) -> Option<&Professor> {
        self.professors.iter().find(|p| &p.label == label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_sort_in_column_order() {
        let mut labels: Vec<ProfessorLabel> = ["AA", "B", "Z", "A", "AB"]
            .into_iter()
            .map(ProfessorLabel::new)
            .collect();
        labels.sort();
        let sorted: Vec<&str> = labels.iter().map(|l| l.as_str()).collect();
        assert_eq!(sorted, ["A", "B", "Z", "AA", "AB"]);
    }

    #[test]
    fn absent_pairs_are_ineligible() {
        let mut eligibility = Eligibility::default();
        let a = ProfessorLabel::new("A");
        eligibility.allow_teaching(a.clone(), CourseNumber(101));
        assert_eq!(eligibility.prof_course(&a, CourseNumber(101)), 1);
        assert_eq!(eligibility.prof_course(&a, CourseNumber(102)), 0);
        assert_eq!(eligibility.prof_time(&a, SlotIndex(0)), 0);
    }
}
