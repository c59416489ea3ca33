// src/analyze/mod.rs
//! Ranking and selection: scored candidates in, ordered digest items out.

pub mod planner;
pub mod scoring;

pub use crate::analyze::planner::DigestPlanner;
pub use crate::analyze::scoring::CandidateScorer;
