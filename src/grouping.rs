//! Grouping keys used by the conflict and fairness constraints.

use crate::config::{DayTimePolicy, SchedulingConfig};
use crate::entities::{CourseGroup, CourseNumber, Entities, SlotIndex};
use crate::error::{Result, SchedulingError};
use itertools::Itertools;
use log::debug;
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// A course restricted to one of exactly two slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pinned {
    pub course: CourseNumber,
    pub slots: [SlotIndex; 2],
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Groupings {
    pub course_groups: BTreeMap<CourseGroup, Vec<CourseNumber>>,
    pub day_time_groups: BTreeMap<u32, Vec<SlotIndex>>,
    pub prime_slots: BTreeSet<SlotIndex>,
    pub designated_days_slots: BTreeSet<SlotIndex>,
    pub pinned: Option<Pinned>,
}

pub fn derive(entities: &Entities, config: &SchedulingConfig) -> Result<Groupings> {
    let course_groups: BTreeMap<CourseGroup, Vec<CourseNumber>> = entities
        .courses
        .iter()
        .map(|c| (c.group, c.number))
        .into_group_map()
        .into_iter()
        .map(|(g, mut courses)| {
            courses.sort();
            (g, courses)
        })
        .collect();

    let day_time_groups: BTreeMap<u32, Vec<SlotIndex>> = entities
        .slots
        .iter()
        .map(|s| (s.day_time_group, s.index))
        .into_group_map()
        .into_iter()
        .map(|(t, mut slots)| {
            slots.sort();
            (t, slots)
        })
        .collect();

    let prime_slots = entities.slots.iter().filter(|s| s.prime).map(|s| s.index).collect();
    let designated_days_slots = entities
        .slots
        .iter()
        .filter(|s| s.designated_days)
        .map(|s| s.index)
        .collect();

    let pinned = config
        .pinned
        .map(|p| {
            let course = CourseNumber(p.course);
            if entities.course(course).is_none() {
                return Err(SchedulingError::UnknownOverrideCourse(p.course));
            }
            for slot in p.slots {
                if entities.slot(SlotIndex(slot)).is_none() {
                    return Err(SchedulingError::UnknownSlot(slot));
                }
            }
            Ok(Pinned {
                course,
                slots: p.slots.map(SlotIndex),
            })
        })
        .transpose()?;

    debug!(
        "Derived {} course groups, {} day-time groups, {} prime and {} designated-day slots.",
        course_groups.len(),
        day_time_groups.len(),
        entities.slots.iter().filter(|s| s.prime).count(),
        entities.slots.iter().filter(|s| s.designated_days).count()
    );

    Ok(Groupings {
        course_groups,
        day_time_groups,
        prime_slots,
        designated_days_slots,
        pinned,
    })
}

/// Research overrides win over the high-level range, which wins over the
/// hundreds bucket of `number - 1`.
pub fn course_group(number: CourseNumber, config: &SchedulingConfig) -> CourseGroup {
    let n = number.0;
    let (lo, hi) = config.high_level_range;
    if config.research_courses.contains(&n) {
        CourseGroup(config.research_group)
    } else if (lo..=hi).contains(&n) {
        CourseGroup(config.high_level_group)
    } else {
        CourseGroup(n.saturating_sub(1) / 100)
    }
}

/// Textually identical time labels share an id, numbered in first-seen order.
pub fn time_groups(time_labels: &[String]) -> Vec<u32> {
    let mut ids: HashMap<&str, u32> = HashMap::new();
    time_labels
        .iter()
        .map(|label| {
            let next = ids.len() as u32;
            *ids.entry(label.as_str()).or_insert(next)
        })
        .collect()
}

pub fn day_time_groups(
    time_labels: &[String],
    days_labels: &[String],
    policy: DayTimePolicy,
) -> Result<Vec<u32>> {
    match policy {
        DayTimePolicy::SharedDay => Ok(shared_day_groups(time_labels, days_labels)),
        DayTimePolicy::RowBlocks { block_size: 0 } => Err(SchedulingError::Config(
            "block_size must be positive".into(),
        )),
        DayTimePolicy::RowBlocks { block_size } => Ok((0..time_labels.len())
            .map(|i| ((i / block_size) * 2 + usize::from(i % block_size == block_size - 1)) as u32)
            .collect()),
    }
}

pub fn day_tokens(days_label: &str) -> BTreeSet<String> {
    days_label
        .split(|c: char| c == '/' || c == ',' || c.is_whitespace())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_ascii_uppercase())
        .collect()
}

pub fn is_designated_days(days_label: &str, designated: &str) -> bool {
    days_label.trim().eq_ignore_ascii_case(designated.trim())
}

// Union-find over slots that share a time label and a day.
fn shared_day_groups(time_labels: &[String], days_labels: &[String]) -> Vec<u32> {
    let n = time_labels.len();
    let tokens: Vec<BTreeSet<String>> = days_labels.iter().map(|d| day_tokens(d)).collect();
    let mut parent: Vec<usize> = (0..n).collect();

    fn find(parent: &mut [usize], mut i: usize) -> usize {
        while parent[i] != i {
            parent[i] = parent[parent[i]];
            i = parent[i];
        }
        i
    }

    for (i, j) in (0..n).tuple_combinations() {
        if time_labels[i] == time_labels[j] && !tokens[i].is_disjoint(&tokens[j]) {
            let (ri, rj) = (find(&mut parent, i), find(&mut parent, j));
            if ri != rj {
                parent[ri.max(rj)] = ri.min(rj);
            }
        }
    }

    let mut ids: HashMap<usize, u32> = HashMap::new();
    (0..n)
        .map(|i| {
            let root = find(&mut parent, i);
            let next = ids.len() as u32;
            *ids.entry(root).or_insert(next)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PinnedOverride;
    use crate::normalize::{normalize, tests::sample_tables};

    fn labels(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn course_groups_follow_hundreds_with_overrides() {
        let config = SchedulingConfig::default();
        let group = |n| course_group(CourseNumber(n), &config).0;
        assert_eq!(group(100), 0);
        assert_eq!(group(101), 1);
        assert_eq!(group(200), 1);
        assert_eq!(group(499), 4);
        assert_eq!(group(500), 6);
        assert_eq!(group(699), 6);
        assert_eq!(group(700), 6);
        assert_eq!(group(702), 7);
        assert_eq!(group(701), 7);
    }

    #[test]
    fn research_override_beats_bucket_edges() {
        let config = SchedulingConfig {
            research_courses: vec![500, 699, 700, 701],
            research_group: 9,
            ..SchedulingConfig::default()
        };
        for n in [500, 699, 700, 701] {
            assert_eq!(course_group(CourseNumber(n), &config), CourseGroup(9), "course {n}");
        }
        assert_eq!(course_group(CourseNumber(501), &config), CourseGroup(6));
        assert_eq!(course_group(CourseNumber(702), &config), CourseGroup(7));
    }

    #[test]
    fn time_groups_number_in_first_seen_order() {
        let times = labels(&["10:30", "9:00", "10:30", "13:00", "9:00"]);
        assert_eq!(time_groups(&times), [0, 1, 0, 2, 1]);
    }

    #[test]
    fn shared_day_groups_merge_overlapping_days() {
        let times = labels(&["9:00", "9:00", "9:00", "10:30", "9:00"]);
        let days = labels(&["M/W", "T/TH", "W/F", "M/W", "TH"]);
        let groups = day_time_groups(&times, &days, DayTimePolicy::SharedDay).unwrap();
        // M/W and W/F share W; T/TH and TH share TH; 10:30 stands alone
        assert_eq!(groups, [0, 1, 0, 2, 1]);
    }

    #[test]
    fn row_block_groups_match_workbook_layout() {
        let times = labels(&["t"; 8]);
        let groups = day_time_groups(&times, &times, DayTimePolicy::RowBlocks { block_size: 4 }).unwrap();
        assert_eq!(groups, [0, 0, 0, 1, 2, 2, 2, 3]);
    }

    #[test]
    fn zero_row_block_size_is_a_config_error() {
        let times = labels(&["t"; 3]);
        let err = day_time_groups(&times, &times, DayTimePolicy::RowBlocks { block_size: 0 }).unwrap_err();
        assert_eq!(err, SchedulingError::Config("block_size must be positive".into()));
    }

    #[test]
    fn day_tokens_accept_common_separators() {
        let tokens: Vec<String> = day_tokens("m/w, f").into_iter().collect();
        assert_eq!(tokens, ["F", "M", "W"]);
    }

    #[test]
    fn unknown_pinned_course_is_a_config_error() {
        let config = SchedulingConfig {
            pinned: Some(PinnedOverride {
                course: 999,
                slots: [0, 1],
            }),
            ..SchedulingConfig::default()
        };
        let entities = normalize(&sample_tables(), &config).unwrap();
        assert_eq!(
            derive(&entities, &config).unwrap_err(),
            SchedulingError::UnknownOverrideCourse(999)
        );
    }

    #[test]
    fn pinned_slots_must_exist() {
        let config = SchedulingConfig::default();
        let entities = normalize(&sample_tables(), &config).unwrap();
        // default pin is 701 in slots 8 and 10; the sample has four slots
        assert_eq!(derive(&entities, &config).unwrap_err(), SchedulingError::UnknownSlot(8));
    }

    #[test]
    fn derives_groups_and_subsets() {
        let config = SchedulingConfig {
            prime_slots: 1..3,
            pinned: Some(PinnedOverride {
                course: 701,
                slots: [0, 2],
            }),
            ..SchedulingConfig::default()
        };
        let entities = normalize(&sample_tables(), &config).unwrap();
        let groupings = derive(&entities, &config).unwrap();

        assert_eq!(groupings.course_groups[&CourseGroup(1)], [CourseNumber(101)]);
        assert_eq!(groupings.course_groups[&CourseGroup(7)], [CourseNumber(701)]);
        assert_eq!(
            groupings.prime_slots.iter().copied().collect::<Vec<_>>(),
            [SlotIndex(1), SlotIndex(2)]
        );
        assert_eq!(
            groupings.designated_days_slots.iter().copied().collect::<Vec<_>>(),
            [SlotIndex(1)]
        );
        // 9:00 M/W/F and 9:00 W/F collide
        assert_eq!(groupings.day_time_groups[&0], [SlotIndex(0), SlotIndex(3)]);
        assert_eq!(groupings.pinned.unwrap().slots, [SlotIndex(0), SlotIndex(2)]);
    }
}
