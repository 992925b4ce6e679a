use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use log::debug;

use crate::error::{Error, Result};

/// Machine characterization: named hardware constants (latencies, peak
/// ratios) measured once per machine and used as the fallback source for
/// LCPI variables.
#[derive(Debug, Clone, Default)]
pub struct MachineProfile {
    values: HashMap<String, f64>,
}

impl MachineProfile {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a `name = value` characterization file; `#` comments and blank
    /// lines are ignored
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self> {
        let mut machine = Self::new();
        for (number, line) in reader.lines().enumerate() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let (name, value) = line.split_once('=').ok_or_else(|| {
                Error::MalformedProfile(format!(
                    "machine characterization line {} has no '='",
                    number + 1
                ))
            })?;
            let name = name.trim().replace(':', "_");
            let value = value.trim().parse::<f64>().map_err(|_| {
                Error::MalformedProfile(format!(
                    "machine characterization line {} has a non-numeric value",
                    number + 1
                ))
            })?;
            machine.values.insert(name, value);
        }
        debug!("{} machine characterization value(s) loaded", machine.values.len());
        Ok(machine)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_reader(BufReader::new(File::open(path)?))
    }

    pub fn set(&mut self, name: &str, value: f64) {
        self.values.insert(name.replace(':', "_"), value);
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
