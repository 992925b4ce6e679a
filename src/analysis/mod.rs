pub mod aggregate;
pub mod lcpi;
pub mod sort;
pub mod validate;

use log::debug;

use crate::config::AnalysisConfig;
use crate::error::{Error, Result};
use crate::machine::MachineProfile;
use crate::model::Profile;

use lcpi::LcpiSet;

/// Run the full analysis round over the profiles produced by a tool-module
/// adapter: validate call paths, flatten and merge metrics, evaluate the
/// LCPI definitions, then sort. Fails fast; no partial output survives a
/// fatal error.
pub fn analyze(
    profiles: &mut [Profile],
    config: &AnalysisConfig,
    lcpi: &LcpiSet,
    machine: &MachineProfile,
) -> Result<()> {
    let found_hotspots = validate::validate_all(profiles)?;

    aggregate::flatten_all(profiles, config)?;

    for profile in profiles.iter_mut() {
        lcpi.compute(profile, machine);
    }

    if !found_hotspots {
        // Distinguished outcome: the workload was too small to produce a
        // call tree, so the caller can suggest a longer run
        return Err(Error::NoHotspots(
            "the measurements contain no call paths; the workload may be too short".to_string(),
        ));
    }

    if let Some(order) = &config.order {
        sort::sort_all(profiles, order)?;
    }

    debug!("analysis round complete");
    Ok(())
}
