//! Performance-profile analysis and recommendation engine.
//!
//! The analysis side takes the call-path profiles a measurement tool
//! produced, validates them, flattens and merges the raw counter
//! samples, evaluates the LCPI metric definitions against them, and
//! sorts the hotspots by the requested relevance order. The
//! recommendation side reads the resulting metrics file back as code
//! segments, scores them against the rules in a [`recommend::RuleStore`],
//! and picks the top suggestions for each segment.

pub mod analysis;
pub mod config;
pub mod error;
pub mod expr;
pub mod machine;
pub mod model;
pub mod recommend;
pub mod report;

pub use analysis::analyze;
pub use analysis::lcpi::{LcpiDefinition, LcpiSet};
pub use analysis::sort::SortOrder;
pub use config::AnalysisConfig;
pub use error::{Error, Result};
pub use expr::Expr;
pub use machine::MachineProfile;
pub use model::{CallPathNode, Hotspot, HotspotKind, LcpiValue, Metric, Profile};
