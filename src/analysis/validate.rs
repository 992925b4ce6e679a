use log::{debug, trace};

use crate::error::{Error, Result};
use crate::model::{CallPathHandle, HotspotKind, Profile};

/// Walk every call tree and confirm it is well-formed. Returns whether any
/// profile carried a non-empty tree, i.e. whether hotspots were found at
/// all. Validation never mutates the profiles; a dangling reference is
/// fatal and aborts the run.
pub fn validate_all(profiles: &[Profile]) -> Result<bool> {
    debug!("checking {} profile(s)", profiles.len());

    let mut found_hotspots = false;
    for profile in profiles {
        debug!(" [{}] {}", profile.id, profile.name);
        if !profile.roots.is_empty() {
            for &root in &profile.roots {
                check_call_path(profile, root, 0)?;
            }
            found_hotspots = true;
        }
    }
    Ok(found_hotspots)
}

fn check_call_path(profile: &Profile, handle: CallPathHandle, depth: usize) -> Result<()> {
    let node = profile.call_paths.get(handle).ok_or_else(|| {
        Error::MalformedProfile(format!(
            "profile '{}' references call-path node {} which does not exist",
            profile.name, handle
        ))
    })?;

    let hotspot = profile.hotspots.get(node.hotspot).ok_or_else(|| {
        Error::MalformedProfile(format!(
            "profile '{}' call path references hotspot {} which does not exist",
            profile.name, node.hotspot
        ))
    })?;

    match hotspot.kind {
        HotspotKind::Procedure | HotspotKind::Program => {
            trace!(
                "{}[{}] {} ({}:{})",
                " .".repeat(depth + 1),
                hotspot.id,
                hotspot.name,
                hotspot.file,
                hotspot.line
            );
        }
        HotspotKind::Loop { procedure, .. } => {
            // A loop is allowed to alias its enclosing procedure's location,
            // but the procedure itself has to exist
            let enclosing = profile.hotspots.get(procedure).ok_or_else(|| {
                Error::MalformedProfile(format!(
                    "loop hotspot '{}' in profile '{}' references procedure {} \
                     which does not exist",
                    hotspot.name, profile.name, procedure
                ))
            })?;
            trace!(
                "{}[{}] loop ({}:{})",
                " .".repeat(depth + 1),
                hotspot.id,
                enclosing.file,
                hotspot.line
            );
        }
    }

    for &child in &node.children {
        check_call_path(profile, child, depth + 1)?;
    }
    Ok(())
}
