/// Analysis configuration, built once and passed by reference into each
/// pipeline stage. Replaces any notion of process-wide mutable state.
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    /// Collapse every hotspot of a profile into one whole-program aggregate
    pub aggregate: bool,
    /// Keep only metrics sampled on this thread; `None` merges all threads
    pub thread: Option<u32>,
    /// Requested hotspot ordering (relevance | performance | mixed);
    /// `None` leaves hotspots in tool-module order
    pub order: Option<String>,
    /// Relevance cutoff used by the report to flag interesting hotspots
    pub threshold: f64,
    /// Counter name holding the total retired instructions for a hotspot
    pub total_instructions: String,
    /// Counter name holding the total cycles for a hotspot
    pub total_cycles: String,
    /// How many recommendations to report per code segment
    pub rec_count: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            aggregate: false,
            thread: None,
            order: None,
            threshold: 0.0,
            total_instructions: "PAPI_TOT_INS".to_string(),
            total_cycles: "PAPI_TOT_CYC".to_string(),
            rec_count: 3,
        }
    }
}
