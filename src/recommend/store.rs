use std::collections::HashMap;

use log::debug;
use serde::Serialize;

use crate::error::{Error, Result};

/// A typed column value returned by a rule predicate
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Integer(i64),
    Real(f64),
    Text(String),
    Null,
}

impl Value {
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_real(&self) -> Option<f64> {
        match self {
            Value::Real(v) => Some(*v),
            _ => None,
        }
    }
}

/// Named parameters bound into a rule predicate. A rule may legitimately
/// ignore a parameter; any name outside this set is simply never bound.
#[derive(Debug, Clone, Copy)]
pub struct RuleParams {
    /// `@RID`: the segment's correlation row in the per-run metrics table
    pub rowid: i64,
    /// `@LPD`: the segment's loop depth
    pub loop_depth: i64,
}

impl RuleParams {
    pub fn get(&self, name: &str) -> Option<i64> {
        match name {
            "@RID" => Some(self.rowid),
            "@LPD" => Some(self.loop_depth),
            _ => None,
        }
    }
}

/// A named scoring predicate loaded from the rule store. The statement is
/// opaque to the engine; only the backend interprets it.
#[derive(Debug, Clone)]
pub struct FunctionRule {
    pub id: i64,
    pub description: String,
    pub statement: String,
}

/// A recommendation's descriptive texts
#[derive(Debug, Clone, Serialize)]
pub struct Recommendation {
    pub id: i64,
    pub description: String,
    pub reason: String,
    pub example: String,
}

/// The relational collection of scoring predicates and recommendation
/// descriptions. The physical engine is an external collaborator; this
/// trait is the parameterized-query surface the selection engine needs.
pub trait RuleStore {
    /// Define the dynamic columns of the per-run metrics table
    fn create_metrics_table(&mut self, columns: &[String]) -> Result<()>;

    /// Register a new segment row and return its correlation rowid
    fn register_segment(&mut self) -> Result<i64>;

    /// Set one column of a segment's metrics row. Unknown columns are an
    /// error the caller may choose to log and ignore.
    fn update_metric(&mut self, rowid: i64, column: &str, value: &str) -> Result<()>;

    /// Load the full, unfiltered set of function rules
    fn load_rules(&self) -> Result<Vec<FunctionRule>>;

    /// Evaluate one rule's predicate with the given parameter bindings,
    /// returning its result rows
    fn execute_rule(&self, rule: &FunctionRule, params: &RuleParams) -> Result<Vec<Vec<Value>>>;

    /// Fetch the descriptive texts for a recommendation id
    fn recommendation(&self, id: i64) -> Result<Option<Recommendation>>;
}

/// Predicate body for the in-memory backend: sees the segment's metrics
/// row and the bound parameters, returns result rows shaped like the
/// relational predicates would
pub type RulePredicate =
    Box<dyn Fn(&HashMap<String, Value>, &RuleParams) -> Vec<Vec<Value>> + Send + Sync>;

/// In-memory rule store: the reference backend used by tests and small
/// deployments. Holds the per-run metrics table as rows of typed values
/// keyed by rowid.
#[derive(Default)]
pub struct MemoryRuleStore {
    columns: Vec<String>,
    rows: HashMap<i64, HashMap<String, Value>>,
    next_rowid: i64,
    rules: Vec<FunctionRule>,
    predicates: HashMap<i64, RulePredicate>,
    recommendations: HashMap<i64, Recommendation>,
}

impl MemoryRuleStore {
    pub fn new() -> Self {
        Self {
            next_rowid: 1,
            ..Self::default()
        }
    }

    /// Register a rule together with its predicate body
    pub fn add_rule<F>(&mut self, rule: FunctionRule, predicate: F)
    where
        F: Fn(&HashMap<String, Value>, &RuleParams) -> Vec<Vec<Value>> + Send + Sync + 'static,
    {
        self.predicates.insert(rule.id, Box::new(predicate));
        self.rules.push(rule);
    }

    pub fn add_recommendation(&mut self, recommendation: Recommendation) {
        self.recommendations
            .insert(recommendation.id, recommendation);
    }

    /// The metrics row registered for a segment, if any
    pub fn metrics_row(&self, rowid: i64) -> Option<&HashMap<String, Value>> {
        self.rows.get(&rowid)
    }
}

impl RuleStore for MemoryRuleStore {
    fn create_metrics_table(&mut self, columns: &[String]) -> Result<()> {
        // The code.* location columns always exist, mirroring the schema
        // of the per-run scratch table
        self.columns = vec![
            "code_filename".to_string(),
            "code_line_number".to_string(),
            "code_type".to_string(),
            "code_extra_info".to_string(),
        ];
        self.columns.extend_from_slice(columns);
        debug!("metrics table created with {} column(s)", self.columns.len());
        Ok(())
    }

    fn register_segment(&mut self) -> Result<i64> {
        let rowid = self.next_rowid;
        self.next_rowid += 1;
        self.rows.insert(rowid, HashMap::new());
        Ok(rowid)
    }

    fn update_metric(&mut self, rowid: i64, column: &str, value: &str) -> Result<()> {
        if !self.columns.iter().any(|c| c == column) {
            return Err(Error::RuleStore(format!("no such column: {}", column)));
        }
        let row = self
            .rows
            .get_mut(&rowid)
            .ok_or_else(|| Error::RuleStore(format!("no such row: {}", rowid)))?;
        let value = match value.parse::<f64>() {
            Ok(number) => Value::Real(number),
            Err(_) => Value::Text(value.to_string()),
        };
        row.insert(column.to_string(), value);
        Ok(())
    }

    fn load_rules(&self) -> Result<Vec<FunctionRule>> {
        Ok(self.rules.clone())
    }

    fn execute_rule(&self, rule: &FunctionRule, params: &RuleParams) -> Result<Vec<Vec<Value>>> {
        let predicate = self.predicates.get(&rule.id).ok_or_else(|| {
            Error::RuleStore(format!("no predicate registered for rule {}", rule.id))
        })?;
        let empty = HashMap::new();
        let row = self.rows.get(&params.rowid).unwrap_or(&empty);
        Ok(predicate(row, params))
    }

    fn recommendation(&self, id: i64) -> Result<Option<Recommendation>> {
        Ok(self.recommendations.get(&id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_column_is_rejected() {
        let mut store = MemoryRuleStore::new();
        store.create_metrics_table(&["PAPI_TOT_INS".to_string()]).unwrap();
        let rowid = store.register_segment().unwrap();

        assert!(store.update_metric(rowid, "PAPI_TOT_INS", "42").is_ok());
        assert!(store.update_metric(rowid, "bogus_column", "1").is_err());
    }

    #[test]
    fn numeric_values_are_typed_as_real() {
        let mut store = MemoryRuleStore::new();
        store.create_metrics_table(&["PAPI_TOT_INS".to_string()]).unwrap();
        let rowid = store.register_segment().unwrap();
        store.update_metric(rowid, "PAPI_TOT_INS", "42.5").unwrap();
        store.update_metric(rowid, "code_filename", "main.c").unwrap();

        let row = store.metrics_row(rowid).unwrap();
        assert_eq!(row["PAPI_TOT_INS"], Value::Real(42.5));
        assert_eq!(row["code_filename"], Value::Text("main.c".to_string()));
    }
}
