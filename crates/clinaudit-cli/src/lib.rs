//! CLI library components for the clinical audit capture tool.

pub mod logging;
