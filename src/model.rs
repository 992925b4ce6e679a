use std::collections::HashMap;

use crate::expr::Expr;

/// Index of a hotspot within its owning profile's flat list
pub type HotspotId = usize;

/// Stable handle of a call-path node within the profile's arena
pub type CallPathHandle = usize;

/// A single named performance-counter sample
#[derive(Debug, Clone, PartialEq)]
pub struct Metric {
    pub name: String,
    pub thread: u32,
    pub mpi_rank: u32,
    pub experiment: u32,
    pub value: f64,
}

impl Metric {
    pub fn new(name: &str, thread: u32, experiment: u32, value: f64) -> Self {
        Self {
            name: name.to_string(),
            thread,
            mpi_rank: 0,
            experiment,
            value,
        }
    }
}

/// What kind of code region a hotspot covers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HotspotKind {
    Procedure,
    /// A loop nested inside a procedure; `procedure` indexes the enclosing
    /// procedure in the profile's hotspot list
    Loop { procedure: HotspotId, depth: u32 },
    /// Synthetic whole-program hotspot created by aggregation
    Program,
}

/// A named LCPI result bound to one hotspot
#[derive(Debug, Clone)]
pub struct LcpiValue {
    pub name: String,
    pub value: f64,
    pub expression: Expr,
}

/// A profiled procedure or loop with its associated counter samples
#[derive(Debug, Clone)]
pub struct Hotspot {
    pub id: u64,
    pub name: String,
    pub file: String,
    pub line: u32,
    pub module: String,
    pub kind: HotspotKind,
    /// Share of the profile's total cycles spent here
    pub importance: f64,
    /// Relative spread of cycle counts across repeated experiments
    pub variance: f64,
    pub instructions: f64,
    pub cycles: f64,
    pub metrics: Vec<Metric>,
    pub lcpi: HashMap<String, LcpiValue>,
    // Name lookup into `metrics`; first occurrence wins, valid only after
    // the metrics have been merged
    metric_index: HashMap<String, usize>,
}

impl Hotspot {
    pub fn new(id: u64, name: &str, kind: HotspotKind) -> Self {
        Self {
            id,
            name: name.to_string(),
            file: String::new(),
            line: 0,
            module: String::new(),
            kind,
            importance: 0.0,
            variance: 0.0,
            instructions: 0.0,
            cycles: 0.0,
            metrics: Vec::new(),
            lcpi: HashMap::new(),
            metric_index: HashMap::new(),
        }
    }

    /// Set the source location, builder style
    pub fn at(mut self, file: &str, line: u32) -> Self {
        self.file = file.to_string();
        self.line = line;
        self
    }

    pub fn add_metric(&mut self, metric: Metric) {
        self.metrics.push(metric);
    }

    /// Rebuild the by-name lookup after the metric list has changed.
    /// When several experiments carry the same counter, the earliest
    /// entry is the one lookups see.
    pub fn rebuild_metric_index(&mut self) {
        self.metric_index.clear();
        for (idx, metric) in self.metrics.iter().enumerate() {
            self.metric_index.entry(metric.name.clone()).or_insert(idx);
        }
    }

    /// Value of the named counter, if this hotspot carries it
    pub fn metric(&self, name: &str) -> Option<f64> {
        self.metric_index
            .get(name)
            .map(|&idx| self.metrics[idx].value)
    }

    /// Value of the named LCPI metric, 0.0 when it was never computed
    pub fn lcpi_value(&self, name: &str) -> f64 {
        self.lcpi.get(name).map(|l| l.value).unwrap_or(0.0)
    }

    /// Nesting depth for loops, 0 for procedures and the program aggregate
    pub fn loop_depth(&self) -> u32 {
        match self.kind {
            HotspotKind::Loop { depth, .. } => depth,
            _ => 0,
        }
    }
}

/// Tree node wrapping a hotspot reference, used only while the call tree
/// is validated; the flat hotspot list is canonical afterwards
#[derive(Debug, Clone)]
pub struct CallPathNode {
    pub hotspot: HotspotId,
    pub parent: Option<CallPathHandle>,
    pub children: Vec<CallPathHandle>,
}

/// One measured run: the call tree built by the tool-module adapter plus
/// the flat list of hotspots derived from it
#[derive(Debug, Clone)]
pub struct Profile {
    pub id: u32,
    pub name: String,
    pub cycles: f64,
    pub instructions: f64,
    pub hotspots: Vec<Hotspot>,
    /// Arena of call-path nodes; `roots` lists the top-level callees
    pub call_paths: Vec<CallPathNode>,
    pub roots: Vec<CallPathHandle>,
}

impl Profile {
    pub fn new(id: u32, name: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
            cycles: 0.0,
            instructions: 0.0,
            hotspots: Vec::new(),
            call_paths: Vec::new(),
            roots: Vec::new(),
        }
    }

    pub fn add_hotspot(&mut self, hotspot: Hotspot) -> HotspotId {
        self.hotspots.push(hotspot);
        self.hotspots.len() - 1
    }

    /// Append a call-path node for `hotspot`, attached under `parent` or as
    /// a new root when `parent` is `None`. Returns the node's handle.
    pub fn add_call_path(
        &mut self,
        hotspot: HotspotId,
        parent: Option<CallPathHandle>,
    ) -> CallPathHandle {
        let handle = self.call_paths.len();
        self.call_paths.push(CallPathNode {
            hotspot,
            parent,
            children: Vec::new(),
        });
        match parent {
            Some(p) => self.call_paths[p].children.push(handle),
            None => self.roots.push(handle),
        }
        handle
    }

    /// Find a hotspot by name in the flat list
    pub fn hotspot_by_name(&self, name: &str) -> Option<&Hotspot> {
        self.hotspots.iter().find(|h| h.name == name)
    }
}
