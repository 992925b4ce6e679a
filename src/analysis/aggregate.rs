use log::debug;

use crate::config::AnalysisConfig;
use crate::error::Result;
use crate::model::{Hotspot, HotspotKind, Profile};

/// Flatten every profile: optionally aggregate all hotspots into one, merge
/// per-thread/per-experiment samples, prune hotspots that cannot support
/// per-instruction metrics, and derive importance/variance.
pub fn flatten_all(profiles: &mut [Profile], config: &AnalysisConfig) -> Result<()> {
    debug!("flattening {} profile(s)", profiles.len());
    for profile in profiles.iter_mut() {
        debug!(" [{}] {}", profile.id, profile.name);
        if config.aggregate {
            aggregate_hotspots(profile);
        }
        flatten_hotspots(profile, config);
    }
    Ok(())
}

/// Move (not copy) every hotspot's raw metrics into one synthetic
/// whole-program hotspot named after the profile; the hotspot list is
/// replaced by that single aggregate. Metrics are still unmerged here.
pub fn aggregate_hotspots(profile: &mut Profile) {
    debug!("   aggregating {} hotspot(s)", profile.hotspots.len());

    let mut aggregated = Hotspot::new(0, &profile.name, HotspotKind::Program);
    for hotspot in profile.hotspots.iter_mut() {
        debug!(
            "      moving {} metrics from {} to the aggregated hotspot",
            hotspot.metrics.len(),
            hotspot.name
        );
        aggregated.metrics.extend(hotspot.metrics.drain(..));
    }
    profile.hotspots.clear();
    profile.hotspots.push(aggregated);
}

/// Collapse a hotspot's metric list to one value per (name, experiment)
/// pair. With a thread filter, samples from other threads are dropped;
/// without one, thread ids are normalized to 0 so callers see
/// thread-independent data. Idempotent.
pub fn merge_metrics(hotspot: &mut Hotspot, thread: Option<u32>) {
    match thread {
        Some(id) => hotspot.metrics.retain(|m| m.thread == id),
        None => {
            for metric in &mut hotspot.metrics {
                metric.thread = 0;
            }
        }
    }

    // Two-pointer scan: fold every later duplicate into the earlier metric.
    // O(n^2), but n is bounded by instrumented counters x experiments.
    let mut i = 0;
    while i < hotspot.metrics.len() {
        let mut j = i + 1;
        while j < hotspot.metrics.len() {
            let duplicate = hotspot.metrics[j].name == hotspot.metrics[i].name
                && hotspot.metrics[j].experiment == hotspot.metrics[i].experiment;
            if duplicate {
                let value = hotspot.metrics.remove(j).value;
                hotspot.metrics[i].value += value;
            } else {
                j += 1;
            }
        }
        i += 1;
    }

    // Names are unique per experiment now; index them for the LCPI engine
    hotspot.rebuild_metric_index();
}

/// Merge each hotspot's metrics, then prune hotspots lacking the
/// total-instructions counter. A pruned hotspot's cycle count still folds
/// into the profile total so no time is lost from the denominator.
fn flatten_hotspots(profile: &mut Profile, config: &AnalysisConfig) {
    let hotspots = std::mem::take(&mut profile.hotspots);
    let mut kept = Vec::with_capacity(hotspots.len());

    for mut hotspot in hotspots {
        merge_metrics(&mut hotspot, config.thread);

        if hotspot.metric(&config.total_instructions).is_some() {
            kept.push(hotspot);
        } else {
            if let Some(cycles) = hotspot.metric(&config.total_cycles) {
                profile.cycles += cycles;
            }
            debug!(
                "      {} removed from list of hotspots ({} not found)",
                hotspot.name, config.total_instructions
            );
        }
    }

    profile.hotspots = kept;
    calculate_importance_variance(profile, config);
}

/// Fill each surviving hotspot's cycle/instruction totals from its merged
/// counters, accumulate the profile totals, then derive importance (share
/// of profile cycles) and variance (relative spread across experiments).
fn calculate_importance_variance(profile: &mut Profile, config: &AnalysisConfig) {
    for hotspot in &mut profile.hotspots {
        let cycle_samples: Vec<f64> = hotspot
            .metrics
            .iter()
            .filter(|m| m.name == config.total_cycles)
            .map(|m| m.value)
            .collect();

        hotspot.cycles = cycle_samples.iter().sum();
        hotspot.instructions = hotspot
            .metrics
            .iter()
            .filter(|m| m.name == config.total_instructions)
            .map(|m| m.value)
            .sum();
        hotspot.variance = relative_spread(&cycle_samples);

        profile.cycles += hotspot.cycles;
        profile.instructions += hotspot.instructions;
    }

    for hotspot in &mut profile.hotspots {
        hotspot.importance = if profile.cycles > 0.0 {
            hotspot.cycles / profile.cycles
        } else {
            0.0
        };
    }
}

/// (max - min) / mean over the per-experiment samples; 0 for fewer than
/// two samples or a zero mean
fn relative_spread(samples: &[f64]) -> f64 {
    if samples.len() < 2 {
        return 0.0;
    }
    let mean = samples.iter().sum::<f64>() / samples.len() as f64;
    if mean == 0.0 {
        return 0.0;
    }
    let max = samples.iter().cloned().fold(f64::MIN, f64::max);
    let min = samples.iter().cloned().fold(f64::MAX, f64::min);
    (max - min) / mean
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Metric;

    fn hotspot_with(metrics: Vec<Metric>) -> Hotspot {
        let mut hotspot = Hotspot::new(1, "compute", HotspotKind::Procedure);
        for metric in metrics {
            hotspot.add_metric(metric);
        }
        hotspot
    }

    #[test]
    fn merge_sums_across_threads() {
        let mut hotspot = hotspot_with(vec![
            Metric::new("L2_DCM", 0, 0, 3.0),
            Metric::new("L2_DCM", 1, 0, 5.0),
        ]);
        merge_metrics(&mut hotspot, None);

        assert_eq!(hotspot.metrics.len(), 1);
        assert_eq!(hotspot.metric("L2_DCM"), Some(8.0));
        assert_eq!(hotspot.metrics[0].thread, 0);
    }

    #[test]
    fn merge_keeps_experiments_apart() {
        let mut hotspot = hotspot_with(vec![
            Metric::new("L2_DCM", 0, 0, 3.0),
            Metric::new("L2_DCM", 0, 1, 5.0),
        ]);
        merge_metrics(&mut hotspot, None);
        assert_eq!(hotspot.metrics.len(), 2);
    }

    #[test]
    fn merge_is_idempotent() {
        let mut hotspot = hotspot_with(vec![
            Metric::new("L2_DCM", 0, 0, 3.0),
            Metric::new("L2_DCM", 1, 0, 5.0),
            Metric::new("L1_DCM", 2, 0, 1.0),
        ]);
        merge_metrics(&mut hotspot, None);
        let once = hotspot.metrics.clone();
        merge_metrics(&mut hotspot, None);
        assert_eq!(hotspot.metrics, once);
    }

    #[test]
    fn thread_filter_drops_other_threads() {
        let mut hotspot = hotspot_with(vec![
            Metric::new("L2_DCM", 0, 0, 3.0),
            Metric::new("L2_DCM", 1, 0, 5.0),
        ]);
        merge_metrics(&mut hotspot, Some(1));
        assert_eq!(hotspot.metrics.len(), 1);
        assert_eq!(hotspot.metric("L2_DCM"), Some(5.0));
    }

    #[test]
    fn aggregation_moves_all_metrics() {
        let mut profile = Profile::new(0, "app");
        profile.add_hotspot(hotspot_with(vec![Metric::new("PAPI_TOT_CYC", 0, 0, 10.0)]));
        profile.add_hotspot(hotspot_with(vec![Metric::new("PAPI_TOT_CYC", 1, 0, 20.0)]));

        aggregate_hotspots(&mut profile);

        assert_eq!(profile.hotspots.len(), 1);
        let aggregate = &profile.hotspots[0];
        assert_eq!(aggregate.kind, HotspotKind::Program);
        assert_eq!(aggregate.name, "app");
        // raw metrics, not yet merged
        assert_eq!(aggregate.metrics.len(), 2);
    }

    #[test]
    fn prune_folds_cycles_into_profile_total() {
        let config = AnalysisConfig::default();
        let mut profile = Profile::new(0, "app");
        profile.add_hotspot(hotspot_with(vec![Metric::new("PAPI_TOT_CYC", 0, 0, 120.0)]));

        flatten_all(std::slice::from_mut(&mut profile), &config).unwrap();

        assert!(profile.hotspots.is_empty());
        assert_eq!(profile.cycles, 120.0);
    }

    #[test]
    fn importance_is_share_of_profile_cycles() {
        let config = AnalysisConfig::default();
        let mut profile = Profile::new(0, "app");
        profile.add_hotspot(hotspot_with(vec![
            Metric::new("PAPI_TOT_INS", 0, 0, 50.0),
            Metric::new("PAPI_TOT_CYC", 0, 0, 75.0),
        ]));
        profile.add_hotspot(hotspot_with(vec![
            Metric::new("PAPI_TOT_INS", 0, 0, 10.0),
            Metric::new("PAPI_TOT_CYC", 0, 0, 25.0),
        ]));

        flatten_all(std::slice::from_mut(&mut profile), &config).unwrap();

        assert_eq!(profile.cycles, 100.0);
        assert_eq!(profile.hotspots[0].importance, 0.75);
        assert_eq!(profile.hotspots[1].importance, 0.25);
    }

    #[test]
    fn variance_reflects_experiment_spread() {
        let config = AnalysisConfig::default();
        let mut profile = Profile::new(0, "app");
        profile.add_hotspot(hotspot_with(vec![
            Metric::new("PAPI_TOT_INS", 0, 0, 50.0),
            Metric::new("PAPI_TOT_CYC", 0, 0, 90.0),
            Metric::new("PAPI_TOT_CYC", 0, 1, 110.0),
        ]));

        flatten_all(std::slice::from_mut(&mut profile), &config).unwrap();

        let hotspot = &profile.hotspots[0];
        assert_eq!(hotspot.cycles, 200.0);
        assert!((hotspot.variance - 0.2).abs() < 1e-12);
    }
}
