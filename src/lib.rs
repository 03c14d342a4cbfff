//! Assigns professors to courses and courses to time slots for one term.
//!
//! Raw tables are normalised into entities ([`normalize`]), grouped for the
//! conflict and fairness rules ([`grouping`]), turned into an immutable MILP
//! description ([`model`]), solved by any [`solver::MilpSolver`] and read back
//! into a sorted [`extract::ScheduleResult`].

pub mod config;
pub mod data;
pub mod entities;
pub mod error;
pub mod extract;
pub mod grouping;
pub mod model;
pub mod normalize;
pub mod report;
pub mod server;
pub mod solver;

pub use error::{Result, SchedulingError};
