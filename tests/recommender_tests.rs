//! End-to-end tests of the recommendation stage: schema ingestion,
//! segment parsing into the rule store, rule evaluation, and top-N
//! selection.

use std::io::Cursor;

use hotspot_analyzer::recommend::{
    parse_metrics_schema, parse_segments, select_all, FunctionRule, MemoryRuleStore, Outcome,
    Recommendation, RuleStore, Value,
};

const SCHEMA: &str = "\
# counters collected by the measurement tool
PAPI_TOT_INS
PAPI_TOT_CYC
PAPI_L2_DCM
";

const MEASUREMENTS: &str = "\
# two bottlenecks from one run
%
code.filename=./src/solver.c
code.line_number=120
code.type=2
code.function_name=relax.omp_fn.1
code.importance=0.72
code.runtime=4.1
code.loopdepth=3
PAPI_TOT_INS=800000
PAPI_TOT_CYC=2400000
PAPI_L2_DCM=90000
%
code.filename=./src/setup.c
code.line_number=33
code.type=1
code.function_name=init_grid
code.importance=0.05
code.runtime=0.2
code.loopdepth=0
PAPI_TOT_INS=100000
PAPI_TOT_CYC=110000
PAPI_L2_DCM=10
";

/// A store with two scoring rules: one rewards cache-hostile loops, one
/// rewards deep loop nests via the bound loop-depth parameter.
fn populated_store() -> MemoryRuleStore {
    let mut store = MemoryRuleStore::new();

    store.add_rule(
        FunctionRule {
            id: 1,
            description: "L2 data misses per instruction".to_string(),
            statement: "SELECT 10, PAPI_L2_DCM / PAPI_TOT_INS * 100 \
                        FROM metrics WHERE rowid = @RID"
                .to_string(),
        },
        |row, _params| {
            let misses = row.get("PAPI_L2_DCM").and_then(Value::as_real);
            let instructions = row.get("PAPI_TOT_INS").and_then(Value::as_real);
            match (misses, instructions) {
                (Some(m), Some(i)) if i > 0.0 => {
                    vec![vec![Value::Integer(10), Value::Real(m / i * 100.0)]]
                }
                _ => vec![],
            }
        },
    );

    store.add_rule(
        FunctionRule {
            id: 2,
            description: "deep loop nest".to_string(),
            statement: "SELECT 20, @LPD - 1 FROM metrics WHERE rowid = @RID".to_string(),
        },
        |_row, params| vec![vec![Value::Integer(20), Value::Real(params.loop_depth as f64 - 1.0)]],
    );

    store.add_recommendation(Recommendation {
        id: 10,
        description: "improve data locality".to_string(),
        reason: "most cycles are spent waiting on L2 misses".to_string(),
        example: "loop blocking over the innermost dimension".to_string(),
    });
    store.add_recommendation(Recommendation {
        id: 20,
        description: "collapse the loop nest".to_string(),
        reason: "deep nests defeat the vectorizer".to_string(),
        example: "#pragma omp collapse(2)".to_string(),
    });

    store
}

#[test]
fn full_stage_scores_and_ranks_per_segment() {
    let mut store = populated_store();
    let columns = parse_metrics_schema(Cursor::new(SCHEMA)).unwrap();
    store.create_metrics_table(&columns).unwrap();

    let segments = parse_segments(Cursor::new(MEASUREMENTS), &mut store).unwrap();
    assert_eq!(segments.len(), 2);
    assert_eq!(segments[0].function_name, "relax");
    assert_eq!(segments[0].filename, "solver.c");

    let (outcome, reports) = select_all(&segments, &store, 3).unwrap();
    assert_eq!(outcome, Outcome::Selected);

    // the loop: misses score 90000/800000*100 = 11.25 beats depth score 2
    let loop_results = &reports[0].results;
    let ids: Vec<i64> = loop_results.iter().map(|r| r.recommendation_id).collect();
    assert_eq!(ids, vec![10, 20]);
    assert!((loop_results[0].score - 11.25).abs() < 1e-9);

    // the function: depth score is -1 (dropped), misses score 0.01 stays
    let function_results = &reports[1].results;
    assert_eq!(function_results.len(), 1);
    assert_eq!(function_results[0].recommendation_id, 10);
}

#[test]
fn rec_count_caps_each_segment() {
    let mut store = populated_store();
    let columns = parse_metrics_schema(Cursor::new(SCHEMA)).unwrap();
    store.create_metrics_table(&columns).unwrap();

    let segments = parse_segments(Cursor::new(MEASUREMENTS), &mut store).unwrap();
    let (_, reports) = select_all(&segments, &store, 1).unwrap();

    assert_eq!(reports[0].results.len(), 1);
    assert_eq!(reports[0].results[0].recommendation_id, 10);
}

#[test]
fn recommendation_texts_resolve_from_the_store() {
    let mut store = populated_store();
    let columns = parse_metrics_schema(Cursor::new(SCHEMA)).unwrap();
    store.create_metrics_table(&columns).unwrap();

    let segments = parse_segments(Cursor::new(MEASUREMENTS), &mut store).unwrap();
    let (_, reports) = select_all(&segments, &store, 3).unwrap();

    let top = &reports[0].results[0];
    let recommendation = store.recommendation(top.recommendation_id).unwrap().unwrap();
    assert_eq!(recommendation.description, "improve data locality");

    assert!(store.recommendation(999).unwrap().is_none());
}

#[test]
fn recommendation_report_carries_the_store_texts() {
    let mut store = populated_store();
    let columns = parse_metrics_schema(Cursor::new(SCHEMA)).unwrap();
    store.create_metrics_table(&columns).unwrap();

    let segments = parse_segments(Cursor::new(MEASUREMENTS), &mut store).unwrap();
    let (_, reports) = select_all(&segments, &store, 3).unwrap();

    let mut buffer = Vec::new();
    hotspot_analyzer::report::write_recommendations(&reports, &store, &mut buffer).unwrap();

    let text = String::from_utf8(buffer).unwrap();
    assert!(text.contains("solver.c:120"));
    assert!(text.contains("improve data locality"));
    assert!(text.contains("collapse the loop nest"));
}

#[test]
fn no_positive_score_anywhere_is_no_recommendation() {
    let mut store = MemoryRuleStore::new();
    store.add_rule(
        FunctionRule {
            id: 1,
            description: "never fires".to_string(),
            statement: String::new(),
        },
        |_row, _params| vec![vec![Value::Integer(1), Value::Real(0.0)]],
    );
    store.create_metrics_table(&[]).unwrap();

    let input = "%\ncode.filename=a.c\ncode.line_number=1\n";
    let segments = parse_segments(Cursor::new(input), &mut store).unwrap();

    let (outcome, reports) = select_all(&segments, &store, 3).unwrap();
    assert_eq!(outcome, Outcome::NoRecommendation);
    assert!(reports[0].results.is_empty());
}

#[test]
fn store_failure_aborts_selection() {
    struct BrokenStore;
    impl RuleStore for BrokenStore {
        fn create_metrics_table(&mut self, _columns: &[String]) -> hotspot_analyzer::Result<()> {
            Ok(())
        }
        fn register_segment(&mut self) -> hotspot_analyzer::Result<i64> {
            Ok(1)
        }
        fn update_metric(
            &mut self,
            _rowid: i64,
            _column: &str,
            _value: &str,
        ) -> hotspot_analyzer::Result<()> {
            Ok(())
        }
        fn load_rules(&self) -> hotspot_analyzer::Result<Vec<FunctionRule>> {
            Err(hotspot_analyzer::Error::RuleStore(
                "connection lost".to_string(),
            ))
        }
        fn execute_rule(
            &self,
            _rule: &FunctionRule,
            _params: &hotspot_analyzer::recommend::RuleParams,
        ) -> hotspot_analyzer::Result<Vec<Vec<Value>>> {
            Ok(vec![])
        }
        fn recommendation(
            &self,
            _id: i64,
        ) -> hotspot_analyzer::Result<Option<Recommendation>> {
            Ok(None)
        }
    }

    let mut scratch = MemoryRuleStore::new();
    scratch.create_metrics_table(&[]).unwrap();
    let input = "%\ncode.filename=a.c\n";
    let segments = parse_segments(Cursor::new(input), &mut scratch).unwrap();

    let result = select_all(&segments, &BrokenStore, 3);
    assert!(matches!(
        result,
        Err(hotspot_analyzer::Error::RuleStore(_))
    ));
}
