pub mod segment;
pub mod select;
pub mod store;

pub use segment::{parse_metrics_schema, parse_segments, Segment, SegmentType};
pub use select::{select_all, select_for_segment, Outcome, RecommendationResult, SegmentRecommendations};
pub use store::{FunctionRule, MemoryRuleStore, Recommendation, RuleParams, RuleStore, Value};
