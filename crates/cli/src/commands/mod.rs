//! CLI subcommands

pub mod model;
pub mod predict;
