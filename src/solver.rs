use crate::config::{SchedulingConfig, SolverOptions};
use crate::data::RawTables;
use crate::entities::Entities;
use crate::error::Result;
use crate::extract::{self, ScheduleResult};
use crate::model::{self, ScheduleModel, Sense};
use crate::{grouping, normalize};
use good_lp::solvers::SolutionStatus;
use good_lp::{
    Expression, ProblemVariables, ResolutionError, Solution, SolverModel, Variable, constraint,
    default_solver, variable,
};
use log::{info, warn};
use serde::Serialize;
use std::fmt;
use std::time::Instant;

/// Outcome classification of a solve attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SolveStatus {
    /// Built but never solved.
    Loaded,
    Optimal,
    Infeasible,
    InfeasibleOrUnbounded,
    Unbounded,
    /// The solver stopped without a usable answer.
    Interrupted,
}

impl SolveStatus {
    pub fn code(self) -> u8 {
        match self {
            SolveStatus::Loaded => 1,
            SolveStatus::Optimal => 2,
            SolveStatus::Infeasible => 3,
            SolveStatus::InfeasibleOrUnbounded => 4,
            SolveStatus::Unbounded => 5,
            SolveStatus::Interrupted => 11,
        }
    }

    pub fn is_optimal(self) -> bool {
        self == SolveStatus::Optimal
    }
}

impl From<SolutionStatus> for SolveStatus {
    /// Only a proven optimum counts; a stop on a time or gap limit is interrupted.
    fn from(status: SolutionStatus) -> Self {
        match status {
            SolutionStatus::Optimal => SolveStatus::Optimal,
            SolutionStatus::TimeLimit | SolutionStatus::GapLimit => SolveStatus::Interrupted,
        }
    }
}

impl fmt::Display for SolveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SolveStatus::Loaded => "LOADED",
            SolveStatus::Optimal => "OPTIMAL",
            SolveStatus::Infeasible => "INFEASIBLE",
            SolveStatus::InfeasibleOrUnbounded => "INF_OR_UNBD",
            SolveStatus::Unbounded => "UNBOUNDED",
            SolveStatus::Interrupted => "INTERRUPTED",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SolveOutcome {
    pub status: SolveStatus,
    /// Indexed by [`crate::model::VarId`]; present only when the status is optimal.
    pub values: Option<Vec<f64>>,
}

impl SolveOutcome {
    pub fn without_values(status: SolveStatus) -> Self {
        Self {
            status,
            values: None,
        }
    }
}

/// A generic "solve this mixed-integer program" capability.
pub trait MilpSolver {
    fn solve(&self, model: &ScheduleModel) -> SolveOutcome;
}

/// HiGHS through `good_lp`.
#[derive(Debug, Clone, Default)]
pub struct HighsSolver {
    pub options: SolverOptions,
}

impl HighsSolver {
    pub fn new(options: SolverOptions) -> Self {
        Self { options }
    }
}

impl MilpSolver for HighsSolver {
    fn solve(&self, model: &ScheduleModel) -> SolveOutcome {
        let start_time = Instant::now();
        let mut problem = ProblemVariables::new();
        let vars: Vec<Variable> = model
            .variables
            .keys()
            .map(|(_, key)| problem.add(variable().binary().name(key.to_string())))
            .collect();

        let expression = |expr: &model::LinearExpr| -> Expression {
            expr.terms.iter().map(|(var, c)| *c * vars[var.0]).sum()
        };

        let mut highs = problem
            .maximise(expression(&model.objective))
            .using(default_solver)
            .set_option("threads", self.options.threads)
            .set_option("random_seed", self.options.random_seed)
            .set_option("log_to_console", self.options.log_to_console);
        if let Some(limit) = self.options.time_limit_secs {
            highs = highs.set_option("time_limit", limit);
        }

        for c in &model.constraints {
            let lhs = expression(&c.expr);
            let rhs = c.rhs;
            highs.add_constraint(match c.sense {
                Sense::LessEq => constraint!(lhs <= rhs),
                Sense::Equal => constraint!(lhs == rhs),
            });
        }

        info!("Starting ILP solver...");
        let outcome = match highs.solve() {
            Ok(solution) => match SolveStatus::from(solution.status()) {
                SolveStatus::Optimal => SolveOutcome {
                    status: SolveStatus::Optimal,
                    values: Some(vars.iter().map(|v| solution.value(*v)).collect()),
                },
                stopped => {
                    warn!("Solver hit a limit ({:?}) before proving optimality", solution.status());
                    SolveOutcome::without_values(stopped)
                }
            },
            Err(ResolutionError::Infeasible) => SolveOutcome::without_values(SolveStatus::Infeasible),
            Err(ResolutionError::Unbounded) => SolveOutcome::without_values(SolveStatus::Unbounded),
            Err(other) => {
                warn!("Solver stopped without a result: {other}");
                SolveOutcome::without_values(SolveStatus::Interrupted)
            }
        };
        info!("Solver finished with {} in {:.2?}", outcome.status, start_time.elapsed());
        outcome
    }
}

/// A finished run: the entities it was built from and what came back.
#[derive(Debug, Clone)]
pub struct ScheduleRun {
    pub entities: Entities,
    pub result: ScheduleResult,
}

/// Normalise, group, build, solve and extract.
///
/// Table and configuration problems come back as `Err` before any variable
/// is declared; infeasibility and friends are statuses inside the result.
pub fn solve(tables: &RawTables, config: &SchedulingConfig, solver: &dyn MilpSolver) -> Result<ScheduleRun> {
    config.validate()?;
    let entities = normalize::normalize(tables, config)?;
    let groupings = grouping::derive(&entities, config)?;
    let model = model::build(&entities, &groupings, config)?;

    let outcome = solver.solve(&model);
    if let Some(values) = outcome.values.as_deref() {
        for broken in model.violations(values) {
            warn!("Solved assignment violates {}", broken.name);
        }
    }
    if matches!(
        outcome.status,
        SolveStatus::Infeasible | SolveStatus::InfeasibleOrUnbounded
    ) {
        warn!("Model is infeasible; an IIS computation on the raw model can locate the conflict.");
    }

    let result = extract::extract(&model, &outcome);
    Ok(ScheduleRun { entities, result })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{CourseNumber, ProfessorLabel, SlotIndex};
    use crate::model::tests::two_by_two;
    use serde_json::json;

    fn no_pin() -> SchedulingConfig {
        SchedulingConfig {
            pinned: None,
            footer_rows: 0,
            ..SchedulingConfig::default()
        }
    }

    fn two_by_two_tables() -> RawTables {
        serde_json::from_value(json!({
            "professors": {
                "columns": ["Prof", "NumCourses"],
                "rows": [["A", 2], ["B", 1]]
            },
            "courses": {
                "columns": ["Number", "Name", "Grad/Ugrad", "Credits",
                            "Labs/Discussion Sections", "Total Enrollment", "A", "B"],
                "rows": [
                    [101, "Intro I", "Ugrad", 1, 0, 60, "x", "x"],
                    [102, "Intro II", "Ugrad", 1, 0, 40, "x", null]
                ]
            },
            "times": {
                "columns": ["Times", "Days", "A", "B"],
                "rows": [
                    ["9:00", "M/W/F", null, null],
                    ["10:30", "M/W/F", null, null]
                ]
            }
        }))
        .unwrap()
    }

    #[test]
    fn two_professors_two_courses_end_to_end() {
        let config = no_pin();
        let run = solve(&two_by_two_tables(), &config, &HighsSolver::default()).unwrap();
        let result = run.result;

        assert_eq!(result.status, SolveStatus::Optimal);
        // only A may teach 102; A's cap of 6 also admits 101, so either professor may take it
        assert_eq!(result.professor_of[&CourseNumber(102)], ProfessorLabel::new("A"));
        assert!(["A", "B"].contains(&result.professor_of[&CourseNumber(101)].as_str()));
        assert_eq!(result.slot_of.len(), 2);
        assert_ne!(result.slot_of[&CourseNumber(101)], result.slot_of[&CourseNumber(102)]);
        assert!(result.labs.is_empty());
        assert_eq!(result.objective, Some(6.0));
    }

    #[test]
    fn loads_never_exceed_caps_in_solved_schedules() {
        let config = no_pin();
        let entities = two_by_two(&config);
        let groupings = grouping::derive(&entities, &config).unwrap();
        let model = model::build(&entities, &groupings, &config).unwrap();
        let outcome = HighsSolver::default().solve(&model);
        let result = extract::extract(&model, &outcome);

        for prof in &entities.professors {
            let load: u32 = result
                .professor_of
                .iter()
                .filter(|(_, p)| **p == prof.label)
                .map(|(c, _)| entities.course(*c).unwrap().credits)
                .sum();
            assert!(load <= prof.max_credit, "{} carries {load}", prof.label);
        }
    }

    #[test]
    fn lab_sessions_follow_their_course() {
        let config = no_pin();
        let mut tables = two_by_two_tables();
        // 102 gets a lab and a third slot in its own bucket
        tables.courses.rows[1][4] = 1.0.into();
        tables.times.rows.push(vec!["13:00".into(), "T/TH".into(), "".into(), "".into()]);
        let run = solve(&tables, &config, &HighsSolver::default()).unwrap();
        let result = run.result;

        assert_eq!(result.status, SolveStatus::Optimal);
        assert_eq!(result.labs.len(), 1);
        let lab = &result.labs[0];
        assert_eq!(lab.course, CourseNumber(102));
        assert_eq!(lab.professor, result.professor_of[&CourseNumber(102)]);
        assert_ne!(lab.slot, result.slot_of[&CourseNumber(102)]);
        assert!(run.entities.eligibility.is_available(&lab.professor, lab.slot));
        assert!(result.labs.iter().all(|l| l.course != CourseNumber(101)));
    }

    #[test]
    fn overloaded_sole_professor_is_infeasible() {
        let config = no_pin();
        let tables: RawTables = serde_json::from_value(json!({
            "professors": {"columns": ["Prof", "NumCourses"], "rows": [["A", 1]]},
            "courses": {
                "columns": ["Number", "Name", "Grad/Ugrad", "Credits",
                            "Labs/Discussion Sections", "Total Enrollment", "A"],
                "rows": [[601, "Seminar", "Grad", 4, 0, 12, "x"]]
            },
            "times": {"columns": ["Times", "Days", "A"], "rows": [["9:00", "M/W", null]]}
        }))
        .unwrap();
        let run = solve(&tables, &config, &HighsSolver::default()).unwrap();

        assert!(matches!(
            run.result.status,
            SolveStatus::Infeasible | SolveStatus::InfeasibleOrUnbounded
        ));
        assert!(run.result.is_empty());
    }

    #[test]
    fn pinned_course_lands_in_a_designated_slot() {
        let config = SchedulingConfig {
            footer_rows: 0,
            pinned: Some(crate::config::PinnedOverride {
                course: 701,
                slots: [1, 2],
            }),
            ..SchedulingConfig::default()
        };
        let mut tables = two_by_two_tables();
        tables.courses.rows.push(vec![
            701.0.into(),
            "Research".into(),
            "Grad".into(),
            3.0.into(),
            0.0.into(),
            5.0.into(),
            "x".into(),
            "".into(),
        ]);
        tables.professors.rows[0][1] = 3.0.into();
        tables.times.rows.push(vec!["13:00".into(), "M/W/F".into(), "".into(), "".into()]);
        let run = solve(&tables, &config, &HighsSolver::default()).unwrap();

        assert_eq!(run.result.status, SolveStatus::Optimal);
        let slot = run.result.slot_of[&CourseNumber(701)];
        assert!([SlotIndex(1), SlotIndex(2)].contains(&slot));
    }

    #[test]
    fn structural_errors_stop_before_solving() {
        struct Unreachable;
        impl MilpSolver for Unreachable {
            fn solve(&self, _: &ScheduleModel) -> SolveOutcome {
                panic!("solver must not run");
            }
        }
        let config = SchedulingConfig {
            footer_rows: 0,
            ..SchedulingConfig::default()
        };
        let err = solve(&two_by_two_tables(), &config, &Unreachable).unwrap_err();
        assert_eq!(err, crate::error::SchedulingError::UnknownOverrideCourse(701));
    }

    #[test]
    fn status_codes_follow_source_numbering() {
        assert_eq!(SolveStatus::Loaded.code(), 1);
        assert_eq!(SolveStatus::Optimal.code(), 2);
        assert_eq!(SolveStatus::InfeasibleOrUnbounded.to_string(), "INF_OR_UNBD");
        assert_eq!(SolveStatus::Unbounded.code(), 5);
    }

    #[test]
    fn limit_stops_are_interrupted_not_optimal() {
        assert_eq!(SolveStatus::from(SolutionStatus::Optimal), SolveStatus::Optimal);
        assert_eq!(SolveStatus::from(SolutionStatus::TimeLimit), SolveStatus::Interrupted);
        assert_eq!(SolveStatus::from(SolutionStatus::GapLimit), SolveStatus::Interrupted);
        assert_eq!(SolveStatus::Interrupted.code(), 11);
    }

    #[test]
    fn interrupted_runs_carry_no_schedule() {
        struct Stopped;
        impl MilpSolver for Stopped {
            fn solve(&self, _: &ScheduleModel) -> SolveOutcome {
                SolveOutcome::without_values(SolveStatus::from(SolutionStatus::TimeLimit))
            }
        }
        let run = solve(&two_by_two_tables(), &no_pin(), &Stopped).unwrap();
        assert_eq!(run.result.status, SolveStatus::Interrupted);
        assert!(run.result.is_empty());
    }
}
