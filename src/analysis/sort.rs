use std::str::FromStr;

use log::{debug, warn};
use strum_macros::{Display, EnumString};

use crate::error::Result;
use crate::model::{Hotspot, Profile};

/// Available hotspot orderings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum SortOrder {
    /// By time-share weight
    Relevance,
    /// By the LCPI value named "overall"
    Performance,
    /// By overall LCPI x importance
    Mixed,
}

/// Sort every profile's hotspots in descending order of the requested key.
/// An unknown order name is a warning, not an error: the lists are left
/// untouched.
pub fn sort_all(profiles: &mut [Profile], order: &str) -> Result<()> {
    let order = match SortOrder::from_str(order) {
        Ok(order) => order,
        Err(_) => {
            warn!("unknown sorting order ({}), hotspots are not sorted", order);
            return Ok(());
        }
    };

    for profile in profiles.iter_mut() {
        debug!("   sorting [{}] {} by {}", profile.id, profile.name, order);
        sort_profile(profile, order);
    }
    Ok(())
}

/// Repeated selection of the maximum remaining element. The comparison is
/// non-strict, so of two equal-keyed candidates the later-encountered one
/// wins each round; external consumers depend on that ordering, so it is
/// kept as-is rather than replaced with a stable sort. NaN keys never win
/// a comparison and therefore sink to the bottom.
pub fn sort_profile(profile: &mut Profile, order: SortOrder) {
    let key = |h: &Hotspot| -> f64 {
        match order {
            SortOrder::Relevance => h.importance,
            SortOrder::Performance => h.lcpi_value("overall"),
            SortOrder::Mixed => h.lcpi_value("overall") * h.importance,
        }
    };

    let mut unsorted = std::mem::take(&mut profile.hotspots);
    let mut sorted = Vec::with_capacity(unsorted.len());

    while !unsorted.is_empty() {
        let mut max_key = -1.0_f64;
        let mut max_idx = 0;
        for (idx, hotspot) in unsorted.iter().enumerate() {
            let k = key(hotspot);
            if k >= max_key {
                max_key = k;
                max_idx = idx;
            }
        }
        sorted.push(unsorted.remove(max_idx));
    }

    profile.hotspots = sorted;
}
