//! Terminal presentation layer composition modules.

pub(crate) mod config;
pub(crate) mod controls;
pub(crate) mod progress;
