use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use log::{debug, trace};

use crate::error::{Error, Result};
use crate::expr::Expr;
use crate::machine::MachineProfile;
use crate::model::{LcpiValue, Profile};

/// One named LCPI formula over free variables that are counter or
/// machine-constant names
#[derive(Debug, Clone)]
pub struct LcpiDefinition {
    pub name: String,
    pub expression: Expr,
}

/// The global set of LCPI definitions, loaded once per analysis round
#[derive(Debug, Clone, Default)]
pub struct LcpiSet {
    definitions: Vec<LcpiDefinition>,
}

impl LcpiSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load `name = expression` definitions; `#` comments and blank lines
    /// are ignored, and `:` is sanitized to `_` so counter names stay
    /// valid identifiers. An unparsable expression is fatal.
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self> {
        let mut set = Self::new();
        for (number, line) in reader.lines().enumerate() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let sanitized = line.replace(':', "_");
            let (name, formula) = sanitized.split_once('=').ok_or_else(|| {
                Error::InvalidExpression {
                    line: number + 1,
                    message: "missing '='".to_string(),
                }
            })?;
            let name = name.replace(' ', "");
            let expression =
                Expr::parse(formula).map_err(|e| Error::InvalidExpression {
                    line: number + 1,
                    message: e.to_string(),
                })?;

            trace!("   [{}]=[{}]", name, formula.trim());
            set.add(&name, expression);
        }
        debug!("{} LCPI metric(s) found", set.len());
        Ok(set)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_reader(BufReader::new(File::open(path)?))
    }

    /// Add or replace a definition
    pub fn add(&mut self, name: &str, expression: Expr) {
        if let Some(existing) = self.definitions.iter_mut().find(|d| d.name == name) {
            existing.expression = expression;
        } else {
            self.definitions.push(LcpiDefinition {
                name: name.to_string(),
                expression,
            });
        }
    }

    pub fn definitions(&self) -> &[LcpiDefinition] {
        &self.definitions
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Evaluate every definition against every hotspot of the profile.
    /// Variables resolve hotspot-metrics-first, machine characterization
    /// second, and default to 0.0 when neither defines them; that default
    /// is deliberate and never an error. Division by a zero denominator
    /// yields inf/NaN, which downstream ranking tolerates.
    pub fn compute(&self, profile: &mut Profile, machine: &MachineProfile) {
        debug!("   calculating LCPI metrics");
        for hotspot in &mut profile.hotspots {
            trace!("    [{}] {}", hotspot.id, hotspot.name);
            for definition in &self.definitions {
                let value = {
                    let resolve = |name: &str| {
                        hotspot
                            .metric(name)
                            .or_else(|| machine.get(name))
                            .unwrap_or(0.0)
                    };
                    definition.expression.eval(&resolve)
                };
                trace!("       {}=[{}]", definition.name, value);
                hotspot.lcpi.insert(
                    definition.name.clone(),
                    LcpiValue {
                        name: definition.name.clone(),
                        value,
                        expression: definition.expression.clone(),
                    },
                );
            }
        }
    }
}
