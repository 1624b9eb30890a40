//! Peels the file into a preserved head, a preserved end/stats/config
//! trailer, and the middle region the rest of the pipeline rewrites.

use tracing::debug;

use crate::error::{Error, Result};

/// The five regions a raw line buffer is split into.
pub struct Split {
    /// Comments, thumbnails, and the pre-print block: passed through untouched.
    pub head: Vec<String>,
    /// The region between `start_gcode` and the fan-off command: the part
    /// the rest of the pipeline rewrites.
    pub middle: Vec<String>,
    /// From the first `M107` line through the end of the (pre-stats,
    /// pre-config) buffer: passed through untouched.
    pub end: Vec<String>,
    /// The trailing run of `; `-prefixed/blank comment lines preceding the
    /// slicer-config block.
    pub stats: Vec<String>,
    /// The `; SuperSlicer_config = begin` ... end-of-file block.
    pub config: Vec<String>,
}

const START_GCODE_MARKER: &str = "; custom gcode: start_gcode";
const CONFIG_BEGIN_MARKER: &str = "; SuperSlicer_config = begin";

fn is_stats_comment(line: &str) -> bool {
    line.starts_with("; ") || line.trim().is_empty()
}

/// Splits `lines` (with blank lines already eliminated) into the five
/// regions described in §4.1.
pub fn split(lines: Vec<String>) -> Result<Split> {
    if !lines.iter().any(|l| l.starts_with("M73")) {
        return Err(Error::MissingMarker("M73".into()));
    }
    let start_idx = lines
        .iter()
        .position(|l| l.starts_with(START_GCODE_MARKER))
        .ok_or_else(|| Error::MissingMarker(START_GCODE_MARKER.into()))?;
    let head = lines[..start_idx].to_vec();
    let mut rest = lines[start_idx..].to_vec();

    let config_begin = rest
        .iter()
        .position(|l| l.starts_with(CONFIG_BEGIN_MARKER))
        .ok_or_else(|| Error::MissingMarker(CONFIG_BEGIN_MARKER.into()))?;
    let config = rest.split_off(config_begin);

    let mut stats = Vec::new();
    while rest.last().is_some_and(|l| is_stats_comment(l)) {
        stats.push(rest.pop().expect("checked non-empty by is_some_and"));
    }
    stats.reverse();

    let fan_off_idx = rest
        .iter()
        .position(|l| l.starts_with("M107"))
        .ok_or_else(|| Error::MissingMarker("M107".into()))?;
    let end = rest.split_off(fan_off_idx);
    let middle = rest;

    debug!(
        head = head.len(),
        middle = middle.len(),
        end = end.len(),
        stats = stats.len(),
        config = config.len(),
        "split input into regions"
    );

    Ok(Split {
        head,
        middle,
        end,
        stats,
        config,
    })
}

/// Eliminates blank lines, matching the spec's pre-sectionizing cleanup.
pub fn eliminate_blank_lines(lines: Vec<String>) -> Vec<String> {
    lines.into_iter().filter(|l| !l.trim().is_empty()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(raw: &str) -> Vec<String> {
        raw.lines().map(|s| s.to_string()).collect()
    }

    #[test]
    fn splits_all_five_regions() {
        let input = lines(
            "; thumbnail\n\
             M73 P0\n\
             ; custom gcode: start_gcode\n\
             G1 X0 Y0\n\
             ; custom gcode end: start_gcode\n\
             M107\n\
             ; end gcode\n\
             ; layer count: 1\n\
             ; estimated printing time (normal mode) = 10s\n\
             ; SuperSlicer_config = begin\n\
             ; key = value\n\
             ; SuperSlicer_config = end",
        );
        let split = split(input).unwrap();
        assert_eq!(split.head, vec!["; thumbnail", "M73 P0"]);
        assert_eq!(
            split.middle,
            vec![
                "; custom gcode: start_gcode",
                "G1 X0 Y0",
                "; custom gcode end: start_gcode"
            ]
        );
        assert_eq!(split.end, vec!["M107", "; end gcode"]);
        assert_eq!(
            split.stats,
            vec![
                "; layer count: 1",
                "; estimated printing time (normal mode) = 10s"
            ]
        );
        assert_eq!(
            split.config,
            vec![
                "; SuperSlicer_config = begin",
                "; key = value",
                "; SuperSlicer_config = end"
            ]
        );
    }

    #[test]
    fn missing_m73_is_an_error() {
        let input = lines("; custom gcode: start_gcode\nG1 X0\n");
        assert!(split(input).is_err());
    }

    #[test]
    fn eliminates_blank_lines() {
        let input = lines("G1 X0\n\n   \nG1 Y0\n");
        assert_eq!(eliminate_blank_lines(input), vec!["G1 X0", "G1 Y0"]);
    }
}
