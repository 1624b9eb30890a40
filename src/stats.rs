//! Parsing of the print-stats block into [`PrintStats`].

use tracing::debug;

use crate::error::{Error, Result};

/// Total estimated print duration and layer count, parsed from the
/// print-stats block the slicer appends near the end of the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrintStats {
    pub layer_count: u32,
    pub print_time_s: u32,
}

fn parse_time(raw: &str) -> Result<u32> {
    let raw = raw.trim();
    if let Some((minutes_raw, rest)) = raw.split_once('m') {
        let minutes: u32 = minutes_raw.trim().parse()?;
        let seconds_raw = rest.trim().trim_end_matches('s').trim();
        let seconds: u32 = seconds_raw.parse()?;
        Ok(minutes * 60 + seconds)
    } else {
        let seconds_raw = raw.trim_end_matches('s').trim();
        Ok(seconds_raw.parse()?)
    }
}

/// Parses the print-stats block (the trailing run of comment/blank lines
/// peeled off by the preamble splitter).
pub fn parse(stats_lines: &[String]) -> Result<PrintStats> {
    let layer_count = stats_lines
        .iter()
        .find_map(|line| line.strip_prefix("; layer count:"))
        .ok_or_else(|| Error::MissingMarker("layer count:".into()))?
        .trim()
        .parse()?;

    let time_line = stats_lines
        .iter()
        .find(|line| line.contains("estimated printing time"))
        .ok_or_else(|| Error::MissingMarker("estimated printing time".into()))?;
    let (_, time_raw) = time_line
        .split_once('=')
        .ok_or_else(|| Error::MalformedInput(format!("no '=' in stats line: {time_line}")))?;
    let print_time_s = parse_time(time_raw)?;

    debug!(layer_count, print_time_s, "parsed print stats");
    Ok(PrintStats {
        layer_count,
        print_time_s,
    })
}
