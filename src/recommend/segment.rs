use std::io::BufRead;

use log::{debug, trace, warn};
use strum_macros::Display;

use crate::error::{Error, Result};
use crate::recommend::store::RuleStore;

/// Kind of code region a segment reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum SegmentType {
    Unknown,
    Function,
    Loop,
}

impl SegmentType {
    /// Wire encoding used in the metrics-file `code.type` key
    pub fn from_code(code: i64) -> Self {
        match code {
            1 => SegmentType::Function,
            2 => SegmentType::Loop,
            _ => SegmentType::Unknown,
        }
    }

    pub fn code(&self) -> i64 {
        match self {
            SegmentType::Unknown => 0,
            SegmentType::Function => 1,
            SegmentType::Loop => 2,
        }
    }
}

/// One reported bottleneck instance submitted to the recommendation engine
#[derive(Debug, Clone)]
pub struct Segment {
    pub filename: String,
    pub line_number: u32,
    pub segment_type: SegmentType,
    pub function_name: String,
    pub extra_info: String,
    pub section_info: String,
    pub importance: f64,
    pub runtime: f64,
    pub loop_depth: i64,
    /// Correlation id of this segment's row in the per-run metrics table
    pub rowid: i64,
}

impl Segment {
    fn new(rowid: i64) -> Self {
        Self {
            filename: String::new(),
            line_number: 0,
            segment_type: SegmentType::Unknown,
            function_name: String::new(),
            extra_info: String::new(),
            section_info: String::new(),
            importance: 0.0,
            runtime: 0.0,
            loop_depth: 0,
            rowid,
        }
    }
}

/// Replace the characters that would not survive as column or parameter
/// names
pub fn sanitize_identifier(name: &str) -> String {
    name.replace(['%', '.', '(', ')', '-', ':'], "_")
}

/// Parse the newline-delimited metrics schema (one metric name per line,
/// `#` comments), sanitizing each name; these become the dynamic columns
/// of the per-run metrics table.
pub fn parse_metrics_schema<R: BufRead>(reader: R) -> Result<Vec<String>> {
    let mut columns = Vec::new();
    for line in reader.lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        columns.push(sanitize_identifier(line));
    }
    debug!("{} metric column(s) in schema", columns.len());
    Ok(columns)
}

/// Parse the measurement stream: a line starting with `%` opens a new
/// segment record, `#` and blank lines are skipped, everything else is a
/// `key=value` pair. Recognized `code.*` keys fill the segment; every key
/// is also forwarded to the store's metrics row under its sanitized name,
/// where unknown columns are logged and dropped rather than failing the
/// parse. An empty result is the distinguished no-hotspots outcome.
pub fn parse_segments<R: BufRead>(reader: R, store: &mut dyn RuleStore) -> Result<Vec<Segment>> {
    let mut segments: Vec<Segment> = Vec::new();

    for (number, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim_end();
        let input_line = number + 1;

        if line.starts_with('#') || line.trim().is_empty() {
            continue;
        }

        if line.starts_with('%') {
            debug!("   ({}) new bottleneck found", input_line);
            let rowid = store.register_segment()?;
            segments.push(Segment::new(rowid));
            continue;
        }

        let Some((key, value)) = line.split_once('=') else {
            warn!("   ({}) ignored line (no '=')", input_line);
            continue;
        };

        let Some(segment) = segments.last_mut() else {
            warn!("   ({}) data before the first '%' record", input_line);
            continue;
        };

        match key {
            "code.filename" => {
                // measurement paths are rooted at ./src; strip it
                segment.filename = value
                    .strip_prefix("./src/")
                    .unwrap_or(value)
                    .to_string();
                trace!("   ({}) filename: [{}]", input_line, segment.filename);
            }
            "code.line_number" => {
                segment.line_number = value.parse().unwrap_or(0);
            }
            "code.type" => {
                segment.segment_type = SegmentType::from_code(value.parse().unwrap_or(0));
            }
            "code.extra_info" => {
                segment.extra_info = value.to_string();
            }
            "code.importance" => {
                segment.importance = value.parse().unwrap_or(0.0);
            }
            "code.section_info" => {
                segment.section_info = value.to_string();
                continue;
            }
            "code.function_name" => {
                // outlined OMP regions carry a '.'-suffixed name; drop it
                segment.function_name = value
                    .split('.')
                    .next()
                    .unwrap_or(value)
                    .to_string();
            }
            "code.runtime" => {
                segment.runtime = value.parse().unwrap_or(0.0);
            }
            "code.loopdepth" => {
                segment.loop_depth = value.parse().unwrap_or(0);
            }
            _ => {}
        }

        // Forward everything into the metrics row; columns the schema
        // does not define are not worth failing the whole parse over
        let column = sanitize_identifier(key);
        if let Err(e) = store.update_metric(segment.rowid, &column, value) {
            trace!("   ({}) ignored line ({} = {}): {}", input_line, key, value, e);
        }
    }

    if segments.is_empty() {
        return Err(Error::NoHotspots(
            "the measurements contain no code segments".to_string(),
        ));
    }

    debug!("   {} code segment(s) found", segments.len());
    for segment in &segments {
        debug!(
            "      [{}] {} (line {})",
            segment.segment_type, segment.filename, segment.line_number
        );
    }

    Ok(segments)
}
