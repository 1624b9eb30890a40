//! Parsing of the slicer-config block into [`GlobalConfig`] and a per-tool
//! [`ToolConfig`] table.

use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Default seconds before a reselect that a tool must begin heating from
/// standby, absent an explicit `WARMUP_TIME=` directive.
pub const DEFAULT_WARMUP_TIME_S: u32 = 30;
/// Default seconds before a reselect that a tool must begin heating from
/// fully off, absent an explicit `WARMUP_FROM_OFF_TIME=` directive.
pub const DEFAULT_WARMUP_FROM_OFF_TIME_S: u32 = 90;
/// Default seconds a tool may idle before it is considered dormant (fully
/// off rather than at standby), absent an explicit `DORMANT_TIME=` directive.
pub const DEFAULT_DORMANT_TIME_S: u32 = 120;

/// Per-tool configuration, indexed by tool number starting at 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolConfig {
    pub tool_number: usize,
    pub bed_temperature: i32,
    pub first_layer_bed_temperature: i32,
    pub chamber_temperature: i32,
    pub temperature: i32,
    pub first_layer_temperature: i32,
    pub tool_used: bool,
    pub warmup_time_s: u32,
    pub warmup_from_off_time_s: u32,
    pub dormant_time_s: u32,
}

impl ToolConfig {
    fn new(tool_number: usize) -> Self {
        Self {
            tool_number,
            bed_temperature: 0,
            first_layer_bed_temperature: 0,
            chamber_temperature: 0,
            temperature: 0,
            first_layer_temperature: 0,
            tool_used: false,
            warmup_time_s: DEFAULT_WARMUP_TIME_S,
            warmup_from_off_time_s: DEFAULT_WARMUP_FROM_OFF_TIME_S,
            dormant_time_s: DEFAULT_DORMANT_TIME_S,
        }
    }
}

/// Global parameters parsed from the slicer-config block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobalConfig {
    pub standby_temperature_delta: i32,
    pub time_start_gcode: u32,
    pub time_toolchange: u32,
    pub tool_count: usize,
}

/// Recognized keys. `first_layer_height` is accepted so it never trips the
/// unrecognized-key warning, even though no stage consumes it yet.
const RECOGNIZED_KEYS: &[&str] = &[
    "standby_temperature_delta",
    "time_start_gcode",
    "time_toolchange",
    "bed_temperature",
    "chamber_temperature",
    "first_layer_bed_temperature",
    "first_layer_temperature",
    "temperature",
    "first_layer_height",
];

fn key_value(line: &str) -> Option<(&str, &str)> {
    let rest = line.strip_prefix("; ")?;
    let (key, value) = rest.split_once('=')?;
    Some((key.trim(), value.trim()))
}

fn find_value<'a>(lines: &'a [String], key: &str) -> Option<&'a str> {
    lines.iter().find_map(|line| {
        let (k, v) = key_value(line)?;
        (k == key).then_some(v)
    })
}

fn parse_csv_i32(value: &str) -> Result<Vec<i32>> {
    value
        .split(',')
        .map(|part| part.trim().parse::<i32>().map_err(Error::from))
        .collect()
}

/// Parses the slicer-config block (the lines between and including the
/// `; SuperSlicer_config = begin`/`end` markers) into a [`GlobalConfig`]
/// and an indexed [`ToolConfig`] table.
pub fn parse(config_lines: &[String]) -> Result<(GlobalConfig, Vec<ToolConfig>)> {
    debug!(lines = config_lines.len(), "parsing slicer config block");

    for line in config_lines {
        if let Some((key, _)) = key_value(line) {
            if key != "SuperSlicer_config" && !RECOGNIZED_KEYS.contains(&key) {
                warn!(key, "unrecognized slicer config key, ignoring");
            }
        }
    }

    let standby_temperature_delta = find_value(config_lines, "standby_temperature_delta")
        .ok_or_else(|| Error::MissingMarker("standby_temperature_delta".into()))?
        .parse()?;
    let time_start_gcode: u32 = find_value(config_lines, "time_start_gcode")
        .ok_or_else(|| Error::MissingMarker("time_start_gcode".into()))?
        .parse()?;
    let time_toolchange: u32 = find_value(config_lines, "time_toolchange")
        .ok_or_else(|| Error::MissingMarker("time_toolchange".into()))?
        .parse()?;

    let bed_temps_raw = find_value(config_lines, "bed_temperature")
        .ok_or_else(|| Error::MissingMarker("bed_temperature".into()))?;
    let bed_temps = parse_csv_i32(bed_temps_raw)?;
    let tool_count = bed_temps.len();

    let mut tools: Vec<ToolConfig> = (0..tool_count).map(ToolConfig::new).collect();
    for (i, temp) in bed_temps.into_iter().enumerate() {
        tools[i].bed_temperature = temp;
    }

    for (key, setter) in [
        ("chamber_temperature", (|t, v| t.chamber_temperature = v) as fn(&mut ToolConfig, i32)),
        (
            "first_layer_bed_temperature",
            (|t, v| t.first_layer_bed_temperature = v) as fn(&mut ToolConfig, i32),
        ),
        (
            "first_layer_temperature",
            (|t, v| t.first_layer_temperature = v) as fn(&mut ToolConfig, i32),
        ),
        ("temperature", (|t, v| t.temperature = v) as fn(&mut ToolConfig, i32)),
    ] {
        if let Some(raw) = find_value(config_lines, key) {
            let values = parse_csv_i32(raw)?;
            for (i, v) in values.into_iter().enumerate().take(tool_count) {
                setter(&mut tools[i], v);
            }
        }
    }

    let global = GlobalConfig {
        standby_temperature_delta,
        time_start_gcode,
        time_toolchange,
        tool_count,
    };

    debug!(tool_count, "parsed global config");
    Ok((global, tools))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(raw: &str) -> Vec<String> {
        raw.lines().map(|s| s.to_string()).collect()
    }

    #[test]
    fn parses_global_and_per_tool_values() {
        let block = lines(
            "; SuperSlicer_config = begin\n\
             ; standby_temperature_delta = -5\n\
             ; time_start_gcode = 45\n\
             ; time_toolchange = 18\n\
             ; bed_temperature = 60,65\n\
             ; first_layer_bed_temperature = 65,70\n\
             ; first_layer_temperature = 215,220\n\
             ; temperature = 210,215\n\
             ; chamber_temperature = 0,0\n\
             ; SuperSlicer_config = end",
        );
        let (global, tools) = parse(&block).unwrap();
        assert_eq!(global.standby_temperature_delta, -5);
        assert_eq!(global.time_start_gcode, 45);
        assert_eq!(global.time_toolchange, 18);
        assert_eq!(global.tool_count, 2);
        assert_eq!(tools.len(), 2);
        assert_eq!(tools[0].bed_temperature, 60);
        assert_eq!(tools[1].bed_temperature, 65);
        assert_eq!(tools[0].first_layer_temperature, 215);
        assert_eq!(tools[1].temperature, 215);
        assert_eq!(tools[0].warmup_time_s, DEFAULT_WARMUP_TIME_S);
    }

    #[test]
    fn missing_required_key_is_an_error() {
        let block = lines("; SuperSlicer_config = begin\n; SuperSlicer_config = end");
        assert!(parse(&block).is_err());
    }
}
