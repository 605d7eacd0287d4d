//! Core planning logic: type model, catalog, discovery, matching, rules, planning.

pub mod catalog;
pub mod compat;
pub mod descriptor;
pub mod discovery;
pub mod error;
pub mod flatten;
pub mod matcher;
pub mod naming;
pub mod parser;
pub mod planner;
pub mod provider;
pub mod report;
pub mod resolver;
pub mod rules;
pub mod types;
