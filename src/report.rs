//! Output side of the analysis round: the human-readable report, the
//! machine-readable metrics file consumed by the recommendation stage,
//! and CSV/JSON exports.

use std::collections::BTreeMap;
use std::io::{BufRead, Write};

use log::debug;
use serde::Serialize;

use crate::config::AnalysisConfig;
use crate::model::{Hotspot, HotspotKind, Metric, Profile};
use crate::recommend::SegmentType;

fn kind_label(kind: HotspotKind) -> &'static str {
    match kind {
        HotspotKind::Procedure => "function",
        HotspotKind::Loop { .. } => "loop",
        HotspotKind::Program => "program",
    }
}

fn segment_type(kind: HotspotKind) -> SegmentType {
    match kind {
        HotspotKind::Loop { .. } => SegmentType::Loop,
        HotspotKind::Procedure | HotspotKind::Program => SegmentType::Function,
    }
}

/// Write the human-readable analysis report. Hotspots whose importance
/// falls below the configured threshold are left out.
pub fn write_analysis<W: Write>(
    profiles: &[Profile],
    config: &AnalysisConfig,
    out: &mut W,
) -> crate::error::Result<()> {
    for profile in profiles {
        writeln!(out, "Profile: {}", profile.name)?;
        writeln!(
            out,
            "  total cycles: {:.0}, total instructions: {:.0}",
            profile.cycles, profile.instructions
        )?;

        for hotspot in &profile.hotspots {
            if hotspot.importance < config.threshold {
                debug!(
                    "   {} below threshold ({:.2}% < {:.2}%), not reported",
                    hotspot.name,
                    hotspot.importance * 100.0,
                    config.threshold * 100.0
                );
                continue;
            }

            writeln!(
                out,
                "  {} {} ({}:{})",
                kind_label(hotspot.kind),
                hotspot.name,
                hotspot.file,
                hotspot.line
            )?;
            writeln!(
                out,
                "    importance: {:.2}%, variance: {:.2}%",
                hotspot.importance * 100.0,
                hotspot.variance * 100.0
            )?;
            writeln!(
                out,
                "    cycles: {:.0}, instructions: {:.0}",
                hotspot.cycles, hotspot.instructions
            )?;

            // stable ordering for the report
            let lcpi: BTreeMap<&str, f64> = hotspot
                .lcpi
                .values()
                .map(|l| (l.name.as_str(), l.value))
                .collect();
            for (name, value) in lcpi {
                writeln!(out, "    {} = {:.6}", name, value)?;
            }
        }
        writeln!(out)?;
    }
    Ok(())
}

/// Write one profile's hotspots in the metrics-file format the
/// recommendation stage reads back: a `%` line opens each record,
/// followed by the `code.*` location keys and one
/// `{counter}.{experiment}={value}` line per merged sample.
pub fn write_metrics<W: Write>(profile: &Profile, out: &mut W) -> crate::error::Result<()> {
    for hotspot in &profile.hotspots {
        writeln!(out, "%")?;
        writeln!(out, "code.filename={}", hotspot.file)?;
        writeln!(out, "code.line_number={}", hotspot.line)?;
        writeln!(out, "code.type={}", segment_type(hotspot.kind).code())?;
        writeln!(out, "code.function_name={}", hotspot.name)?;
        writeln!(out, "code.extra_info=")?;
        writeln!(out, "code.importance={}", hotspot.importance)?;
        writeln!(out, "code.runtime={}", hotspot.cycles)?;
        writeln!(out, "code.loopdepth={}", hotspot.loop_depth())?;
        for metric in &hotspot.metrics {
            writeln!(out, "{}.{}={}", metric.name, metric.experiment, metric.value)?;
        }
    }
    debug!("{} hotspot(s) written", profile.hotspots.len());
    Ok(())
}

/// Read the counter samples back from a metrics file, one `Vec<Metric>`
/// per `%` record. The `code.*` keys carry the location, not samples, so
/// they are skipped here; the experiment number rides on the last
/// dot-separated component of the key.
pub fn read_metrics<R: BufRead>(reader: R) -> crate::error::Result<Vec<Vec<Metric>>> {
    let mut records: Vec<Vec<Metric>> = Vec::new();

    for line in reader.lines() {
        let line = line?;
        let line = line.trim_end();
        if line.starts_with('#') || line.trim().is_empty() {
            continue;
        }
        if line.starts_with('%') {
            records.push(Vec::new());
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        if key.starts_with("code.") {
            continue;
        }
        let Some(record) = records.last_mut() else {
            continue;
        };
        let (name, experiment) = match key.rsplit_once('.') {
            Some((name, suffix)) => (name, suffix.parse().unwrap_or(0)),
            None => (key, 0),
        };
        let value = value.parse().unwrap_or(0.0);
        record.push(Metric::new(name, 0, experiment, value));
    }

    Ok(records)
}

/// Write the recommendation report: for each segment, the ranked
/// suggestions with their descriptive texts from the store. A result
/// whose texts are missing from the store is still reported by id.
pub fn write_recommendations<W: Write>(
    reports: &[crate::recommend::SegmentRecommendations],
    store: &dyn crate::recommend::RuleStore,
    out: &mut W,
) -> crate::error::Result<()> {
    for report in reports {
        writeln!(out, "{}:{}", report.filename, report.line_number)?;
        if report.results.is_empty() {
            writeln!(out, "  no recommendation")?;
            continue;
        }
        for result in &report.results {
            match store.recommendation(result.recommendation_id)? {
                Some(recommendation) => {
                    writeln!(
                        out,
                        "  [{:.3}] {}",
                        result.score, recommendation.description
                    )?;
                    if !recommendation.reason.is_empty() {
                        writeln!(out, "          {}", recommendation.reason)?;
                    }
                    if !recommendation.example.is_empty() {
                        writeln!(out, "          e.g. {}", recommendation.example)?;
                    }
                }
                None => {
                    writeln!(
                        out,
                        "  [{:.3}] recommendation #{}",
                        result.score, result.recommendation_id
                    )?;
                }
            }
        }
    }
    Ok(())
}

#[derive(Debug, Serialize)]
struct HotspotSummary<'a> {
    name: &'a str,
    file: &'a str,
    line: u32,
    kind: &'static str,
    importance: f64,
    variance: f64,
    cycles: f64,
    instructions: f64,
    lcpi: BTreeMap<&'a str, f64>,
}

#[derive(Debug, Serialize)]
struct ProfileSummary<'a> {
    name: &'a str,
    cycles: f64,
    instructions: f64,
    hotspots: Vec<HotspotSummary<'a>>,
}

fn summarize(hotspot: &Hotspot) -> HotspotSummary<'_> {
    HotspotSummary {
        name: &hotspot.name,
        file: &hotspot.file,
        line: hotspot.line,
        kind: kind_label(hotspot.kind),
        importance: hotspot.importance,
        variance: hotspot.variance,
        cycles: hotspot.cycles,
        instructions: hotspot.instructions,
        lcpi: hotspot
            .lcpi
            .values()
            .map(|l| (l.name.as_str(), l.value))
            .collect(),
    }
}

/// Export every profile's hotspot summary as JSON
pub fn export_json<W: Write>(profiles: &[Profile], out: W) -> crate::error::Result<()> {
    let summaries: Vec<ProfileSummary> = profiles
        .iter()
        .map(|p| ProfileSummary {
            name: &p.name,
            cycles: p.cycles,
            instructions: p.instructions,
            hotspots: p.hotspots.iter().map(summarize).collect(),
        })
        .collect();
    serde_json::to_writer_pretty(out, &summaries)?;
    Ok(())
}

/// Export every profile's hotspots as flat CSV rows, one row per hotspot
pub fn export_csv<W: Write>(profiles: &[Profile], out: W) -> crate::error::Result<()> {
    let mut writer = csv::Writer::from_writer(out);
    writer.write_record([
        "profile",
        "hotspot",
        "file",
        "line",
        "kind",
        "importance",
        "variance",
        "cycles",
        "instructions",
        "overall",
    ])?;
    for profile in profiles {
        for hotspot in &profile.hotspots {
            writer.write_record([
                profile.name.as_str(),
                hotspot.name.as_str(),
                hotspot.file.as_str(),
                &hotspot.line.to_string(),
                kind_label(hotspot.kind),
                &hotspot.importance.to_string(),
                &hotspot.variance.to_string(),
                &hotspot.cycles.to_string(),
                &hotspot.instructions.to_string(),
                &hotspot.lcpi_value("overall").to_string(),
            ])?;
        }
    }
    writer.flush()?;
    Ok(())
}
