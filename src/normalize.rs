//! Turns the raw professor, course and time tables into [`Entities`].

use crate::config::{MarkerConvention, SchedulingConfig};
use crate::data::{Cell, RawTables, Table};
use crate::entities::{
    Course, CourseNumber, Eligibility, Entities, Level, Professor, ProfessorLabel, SlotIndex,
    TimeSlot,
};
use crate::error::{Result, SchedulingError};
use crate::grouping;
use itertools::Itertools;
use log::{info, warn};
use std::collections::{BTreeMap, HashSet};

const PROFESSORS: &str = "professors";
const COURSES: &str = "courses";
const TIMES: &str = "times";

pub fn normalize(tables: &RawTables, config: &SchedulingConfig) -> Result<Entities> {
    let names = &config.columns;

    let courses_table = drop_footer(&tables.courses, COURSES, config.footer_rows)?;
    let times_table = drop_footer(&tables.times, TIMES, config.footer_rows)?;

    let course_meta = [
        names.number.as_str(),
        names.name.as_str(),
        names.level.as_str(),
        names.credits.as_str(),
        names.lab_sections.as_str(),
        names.enrollment.as_str(),
    ];
    let course_cols = course_meta
        .iter()
        .map(|c| tables.courses.column(COURSES, c))
        .collect::<Result<Vec<_>>>()?;
    let time_cols = [names.time.as_str(), names.days.as_str()]
        .iter()
        .map(|c| tables.times.column(TIMES, c))
        .collect::<Result<Vec<_>>>()?;

    let course_prof_cols = professor_columns(&tables.courses, &course_cols)?;
    let time_prof_cols = professor_columns(&tables.times, &time_cols)?;

    let professors = professors(&tables.professors, &course_prof_cols, config)?;
    let known: HashSet<&ProfessorLabel> = professors.iter().map(|p| &p.label).collect();
    if let Some((_, label)) = time_prof_cols.iter().find(|(_, l)| !known.contains(l)) {
        return Err(SchedulingError::UnknownProfessor {
            table: TIMES,
            label: label.to_string(),
        });
    }

    let mut eligibility = Eligibility::default();

    let mut courses = Vec::with_capacity(courses_table.len());
    let mut seen = HashSet::new();
    for row in 0..courses_table.len() {
        let course = course_row(&tables.courses, row, &course_cols, &course_meta, config)?;
        if !seen.insert(course.number) {
            return Err(SchedulingError::DuplicateCourse(course.number.0));
        }
        for (col, label) in &course_prof_cols {
            let cell = tables.courses.cell(row, *col);
            if read_marker(cell, config.course_marker, &config.marker)
                .ok_or_else(|| invalid_marker(COURSES, row, label, cell))?
            {
                eligibility.allow_teaching(label.clone(), course.number);
            }
        }
        courses.push(course);
    }
    if courses.is_empty() {
        return Err(SchedulingError::EmptyCollection(COURSES));
    }

    let time_labels = (0..times_table.len())
        .map(|row| text(tables.times.cell(row, time_cols[0])))
        .collect_vec();
    let days_labels = (0..times_table.len())
        .map(|row| text(tables.times.cell(row, time_cols[1])))
        .collect_vec();
    if time_labels.is_empty() {
        return Err(SchedulingError::EmptyCollection(TIMES));
    }
    let time_groups = grouping::time_groups(&time_labels);
    let day_time_groups =
        grouping::day_time_groups(&time_labels, &days_labels, config.day_time_policy)?;

    let mut slots = Vec::with_capacity(time_labels.len());
    for (row, (time_label, days_label)) in time_labels.into_iter().zip(days_labels).enumerate() {
        let index = SlotIndex(row);
        for (col, label) in &time_prof_cols {
            let cell = tables.times.cell(row, *col);
            if read_marker(cell, config.time_marker, &config.marker)
                .ok_or_else(|| invalid_marker(TIMES, row, label, cell))?
            {
                eligibility.allow_slot(label.clone(), index);
            }
        }
        slots.push(TimeSlot {
            index,
            prime: config.prime_slots.contains(&row),
            designated_days: grouping::is_designated_days(&days_label, &config.designated_days),
            time_label,
            days_label,
            time_group: time_groups[row],
            day_time_group: day_time_groups[row],
        });
    }

    info!(
        "Normalised {} professors, {} courses and {} time slots.",
        professors.len(),
        courses.len(),
        slots.len()
    );

    Ok(Entities {
        professors,
        courses,
        slots,
        eligibility,
    })
}

/// Data rows left once the trailing footer rows are removed.
fn drop_footer<'a>(table: &'a Table, name: &'static str, footer: usize) -> Result<&'a [Vec<Cell>]> {
    let keep = table
        .rows
        .len()
        .checked_sub(footer)
        .ok_or(SchedulingError::NotEnoughRows {
            table: name,
            rows: table.rows.len(),
            footer,
        })?;
    Ok(&table.rows[..keep])
}

fn professor_columns(table: &Table, meta: &[usize]) -> Result<Vec<(usize, ProfessorLabel)>> {
    let mut seen = HashSet::new();
    let mut cols = Vec::new();
    for (i, name) in table.columns.iter().enumerate() {
        if meta.contains(&i) {
            continue;
        }
        let label = ProfessorLabel::new(name.trim());
        if !seen.insert(label.clone()) {
            return Err(SchedulingError::DuplicateProfessor(label.0));
        }
        cols.push((i, label));
    }
    Ok(cols)
}

fn professors(
    table: &Table,
    course_prof_cols: &[(usize, ProfessorLabel)],
    config: &SchedulingConfig,
) -> Result<Vec<Professor>> {
    let label_col = table.column(PROFESSORS, &config.columns.prof)?;
    let load_col = table.column(PROFESSORS, &config.columns.max_courses)?;

    let mut loads = BTreeMap::new();
    for row in 0..table.rows.len() {
        let label = text(table.cell(row, label_col));
        if label.is_empty() {
            continue;
        }
        let count = integer(table.cell(row, load_col), PROFESSORS, row, &config.columns.max_courses)?
            .ok_or_else(|| SchedulingError::InvalidValue {
                table: PROFESSORS,
                row,
                column: config.columns.max_courses.clone(),
                reason: "maximum course count is blank".into(),
            })?;
        if loads.insert(ProfessorLabel::new(label), count).is_some() {
            return Err(SchedulingError::DuplicateProfessor(text(table.cell(row, label_col))));
        }
    }

    let mut professors = course_prof_cols
        .iter()
        .map(|(_, label)| {
            let count = loads
                .remove(label)
                .ok_or_else(|| SchedulingError::MissingLoad(label.to_string()))?;
            Ok(Professor {
                label: label.clone(),
                max_credit: count * config.credits_per_course_unit,
            })
        })
        .collect::<Result<Vec<_>>>()?;
    for label in loads.keys() {
        warn!("Professor {label} has a load row but no course column; ignoring.");
    }
    if professors.is_empty() {
        return Err(SchedulingError::EmptyCollection(PROFESSORS));
    }
    professors.sort_by(|a, b| a.label.cmp(&b.label));
    Ok(professors)
}

fn course_row(
    table: &Table,
    row: usize,
    cols: &[usize],
    names: &[&str],
    config: &SchedulingConfig,
) -> Result<Course> {
    let required = |i: usize, what: &str| -> Result<u32> {
        integer(table.cell(row, cols[i]), COURSES, row, names[i])?.ok_or_else(|| {
            SchedulingError::InvalidValue {
                table: COURSES,
                row,
                column: names[i].to_string(),
                reason: format!("{what} is blank"),
            }
        })
    };
    let optional = |i: usize| -> Result<u32> {
        Ok(integer(table.cell(row, cols[i]), COURSES, row, names[i])?.unwrap_or(0))
    };

    let number = required(0, "course number")?;
    if number == 0 {
        return Err(SchedulingError::InvalidValue {
            table: COURSES,
            row,
            column: names[0].to_string(),
            reason: "course number must be positive".into(),
        });
    }
    let level = match text(table.cell(row, cols[2])).to_ascii_lowercase().as_str() {
        "grad" => Level::Grad,
        "ugrad" => Level::Ugrad,
        other => {
            return Err(SchedulingError::InvalidValue {
                table: COURSES,
                row,
                column: names[2].to_string(),
                reason: format!("`{other}` is neither Grad nor Ugrad"),
            });
        }
    };
    let raw_credits = required(3, "credits")?;
    let credits = match level {
        Level::Ugrad => raw_credits * config.credits_per_course_unit,
        Level::Grad => raw_credits,
    };
    let lab_sections = optional(4)?;
    let number = CourseNumber(number);

    Ok(Course {
        number,
        name: text(table.cell(row, cols[1])),
        level,
        credits,
        enrollment: optional(5)?,
        lab_sections,
        has_lab: lab_sections > 0,
        group: grouping::course_group(number, config),
    })
}

/// `Some(true)` for eligible/available, `None` for an unrecognised cell.
fn read_marker(cell: &Cell, convention: MarkerConvention, marker: &str) -> Option<bool> {
    let marked = match cell {
        _ if cell.is_blank() => false,
        Cell::Text(s) if s.trim().eq_ignore_ascii_case(marker.trim()) => true,
        Cell::Text(s) => return s.trim().parse::<f64>().ok().and_then(literal),
        Cell::Number(n) => return literal(*n),
        Cell::Blank => false,
    };
    Some(match convention {
        MarkerConvention::MarkedMeansYes => marked,
        MarkerConvention::MarkedMeansNo => !marked,
    })
}

fn literal(n: f64) -> Option<bool> {
    if n == 0.0 {
        Some(false)
    } else if n == 1.0 {
        Some(true)
    } else {
        None
    }
}

fn invalid_marker(table: &'static str, row: usize, label: &ProfessorLabel, cell: &Cell) -> SchedulingError {
    SchedulingError::InvalidMarker {
        table,
        row,
        column: label.to_string(),
        value: cell.to_string(),
    }
}

fn text(cell: &Cell) -> String {
    match cell {
        Cell::Number(n) if n.fract() == 0.0 => format!("{}", *n as i64),
        other => other.to_string().trim().to_string(),
    }
}

fn integer(cell: &Cell, table: &'static str, row: usize, column: &str) -> Result<Option<u32>> {
    let invalid = |reason: String| SchedulingError::InvalidValue {
        table,
        row,
        column: column.to_string(),
        reason,
    };
    let value = match cell {
        _ if cell.is_blank() => return Ok(None),
        Cell::Number(n) => *n,
        Cell::Text(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| invalid(format!("`{}` is not a number", s.trim())))?,
        Cell::Blank => return Ok(None),
    };
    if value < 0.0 || value.fract() != 0.0 || value > f64::from(u32::MAX) {
        return Err(invalid(format!("{value} is not a non-negative integer")));
    }
    Ok(Some(value as u32))
}
