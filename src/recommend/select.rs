use log::{debug, warn};
use serde::Serialize;

use crate::error::Result;
use crate::recommend::segment::Segment;
use crate::recommend::store::{RuleParams, RuleStore, Value};

/// Aggregate result of a selection pass over a set of segments
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// At least one segment produced recommendations
    Selected,
    /// Every rule ran but nothing scored positive anywhere
    NoRecommendation,
}

/// One scored recommendation candidate
#[derive(Debug, Clone, Serialize)]
pub struct RecommendationResult {
    pub function_id: i64,
    pub recommendation_id: i64,
    pub score: f64,
    pub weight: f64,
}

/// The ranked recommendations chosen for one segment
#[derive(Debug, Clone, Serialize)]
pub struct SegmentRecommendations {
    pub filename: String,
    pub line_number: u32,
    pub results: Vec<RecommendationResult>,
}

/// Run the selection pass over every segment. A rule-store failure is
/// fatal and aborts the remaining segments; a segment with no positive
/// scores just moves on.
pub fn select_all(
    segments: &[Segment],
    store: &dyn RuleStore,
    rec_count: usize,
) -> Result<(Outcome, Vec<SegmentRecommendations>)> {
    debug!("selecting recommendations");

    let mut outcome = Outcome::NoRecommendation;
    let mut reports = Vec::with_capacity(segments.len());

    for segment in segments {
        let results = select_for_segment(segment, store, rec_count)?;
        if results.is_empty() {
            debug!(
                "   no recommendations for {}:{}",
                segment.filename, segment.line_number
            );
        } else {
            outcome = Outcome::Selected;
        }
        reports.push(SegmentRecommendations {
            filename: segment.filename.clone(),
            line_number: segment.line_number,
            results,
        });
    }

    Ok((outcome, reports))
}

/// Evaluate every rule in the store against one segment and return the
/// top-N results by score. The scratch collection of candidate rows lives
/// only for this segment's selection.
pub fn select_for_segment(
    segment: &Segment,
    store: &dyn RuleStore,
    rec_count: usize,
) -> Result<Vec<RecommendationResult>> {
    debug!(
        "   selecting recommendation for ({}:{})",
        segment.filename, segment.line_number
    );

    let rules = store.load_rules()?;
    debug!("      {} function(s) found", rules.len());

    let params = RuleParams {
        rowid: segment.rowid,
        loop_depth: segment.loop_depth,
    };

    let mut scratch: Vec<RecommendationResult> = Vec::new();
    for rule in &rules {
        debug!("      running '{}'", rule.description);
        for row in store.execute_rule(rule, &params)? {
            // The predicate contract: first column is the recommendation
            // id, second is the score. Anything else is skipped.
            let recommendation_id = match row.first().and_then(Value::as_integer) {
                Some(id) => id,
                None => {
                    warn!("         1st column is not an integer");
                    continue;
                }
            };
            let score = match row.get(1).and_then(Value::as_real) {
                Some(score) => score,
                None => {
                    warn!("         2nd column is not a float");
                    continue;
                }
            };
            if score > 0.0 {
                debug!(
                    "         function={}, recom={}, score={}",
                    rule.id, recommendation_id, score
                );
                scratch.push(RecommendationResult {
                    function_id: rule.id,
                    recommendation_id,
                    score,
                    weight: 0.0,
                });
            }
        }
    }

    scratch.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    scratch.truncate(rec_count);
    Ok(scratch)
}
