//! In-place transforms over the middle region: stripping slicer-inserted
//! temperature artifacts around toolchanges, and lifting custom per-tool
//! directives out of start-filament blocks.

use tracing::{debug, trace};

use crate::config::{
    ToolConfig, DEFAULT_DORMANT_TIME_S, DEFAULT_WARMUP_FROM_OFF_TIME_S, DEFAULT_WARMUP_TIME_S,
};
use crate::error::{Error, Result};

const START_FILAMENT_OPEN: &str = "; custom gcode: start_filament_gcode";
const START_FILAMENT_CLOSE: &str = "; custom gcode end: start_filament_gcode";
const TOOLCHANGE_OPEN: &str = "; custom gcode: toolchange_gcode";

/// Drops any `M104` line immediately followed by the toolchange-gcode open
/// marker — SuperSlicer inserts this temperature drop before every
/// toolchange, which this post-processor replaces with its own logic.
pub fn remove_pre_toolchange_temp_drop(lines: Vec<String>) -> Vec<String> {
    let mut out = Vec::with_capacity(lines.len());
    for (i, line) in lines.iter().enumerate() {
        if line.starts_with("M104") && lines.get(i + 1).is_some_and(|n| n.trim() == TOOLCHANGE_OPEN) {
            continue;
        }
        out.push(line.clone());
    }
    out
}

/// Drops any `M109` line immediately preceded by the start-filament close
/// marker — SuperSlicer inserts this temperature set-and-wait after every
/// start-filament block.
pub fn remove_post_start_filament_temp_set(lines: Vec<String>) -> Vec<String> {
    let mut out = Vec::with_capacity(lines.len());
    for (i, line) in lines.iter().enumerate() {
        if line.starts_with("M109") && i > 0 && lines[i - 1].starts_with(START_FILAMENT_CLOSE) {
            continue;
        }
        out.push(line.clone());
    }
    out
}

struct Directive {
    key: &'static str,
    value: i32,
    line_idx: usize,
}

fn parse_directive_line(idx: usize, line: &str) -> Option<Directive> {
    let (key, raw) = line.split_once('=')?;
    let value: i32 = raw.trim().parse().ok()?;
    let key = match key {
        "EXTRUDER" => "EXTRUDER",
        "WARMUP_TIME" => "WARMUP_TIME",
        "WARMUP_FROM_OFF_TIME" => "WARMUP_FROM_OFF_TIME",
        "DORMANT_TIME" => "DORMANT_TIME",
        _ => return None,
    };
    Some(Directive {
        key,
        value,
        line_idx: idx,
    })
}

/// Parses `EXTRUDER=`/`WARMUP_TIME=`/`WARMUP_FROM_OFF_TIME=`/`DORMANT_TIME=`
/// directives out of every start-filament block, applies them to the
/// indexed tool config table, and removes the directive lines (and the
/// whole block, if it becomes empty) from the output.
///
/// The source implementation restarts its scan from the beginning any time
/// it mutates the buffer, to reach a fixed point after block boundaries
/// shift. Each block's directives are self-contained, so collecting every
/// block's bounds and directive indices in one forward pass and then
/// deleting them in a single reverse-sorted pass is behaviorally identical
/// and avoids the quadratic restart.
pub fn extract_start_filament_parameters(
    mut lines: Vec<String>,
    tool_configs: &mut [ToolConfig],
) -> Result<Vec<String>> {
    let mut blocks_to_remove: Vec<usize> = Vec::new();
    let mut lines_to_remove: Vec<usize> = Vec::new();

    let mut i = 0;
    while i < lines.len() {
        if lines[i].starts_with(START_FILAMENT_OPEN) {
            let open = i;
            let mut j = i + 1;
            while !lines.get(j).is_some_and(|l| l.starts_with(START_FILAMENT_CLOSE)) {
                j += 1;
                if j >= lines.len() {
                    return Err(Error::MissingMarker(START_FILAMENT_CLOSE.into()));
                }
            }
            let close = j;

            if open + 1 == close {
                i = close + 1;
                continue;
            }

            let mut directives = Vec::new();
            for (k, line) in lines.iter().enumerate().take(close).skip(open + 1) {
                if let Some(d) = parse_directive_line(k, line) {
                    directives.push(d);
                }
            }

            if directives.is_empty() {
                i = close + 1;
                continue;
            }

            let extruder = directives
                .iter()
                .find(|d| d.key == "EXTRUDER")
                .map(|d| d.value)
                .ok_or_else(|| {
                    Error::MalformedInput(
                        "start-filament directive block missing EXTRUDER=".into(),
                    )
                })?;
            let tool = tool_configs.get_mut(extruder as usize).ok_or_else(|| {
                Error::MalformedInput(format!("EXTRUDER={extruder} out of range"))
            })?;

            tool.warmup_time_s = directives
                .iter()
                .find(|d| d.key == "WARMUP_TIME")
                .map(|d| d.value as u32)
                .unwrap_or(DEFAULT_WARMUP_TIME_S);
            tool.warmup_from_off_time_s = directives
                .iter()
                .find(|d| d.key == "WARMUP_FROM_OFF_TIME")
                .map(|d| d.value as u32)
                .unwrap_or(DEFAULT_WARMUP_FROM_OFF_TIME_S);
            tool.dormant_time_s = directives
                .iter()
                .find(|d| d.key == "DORMANT_TIME")
                .map(|d| d.value as u32)
                .unwrap_or(DEFAULT_DORMANT_TIME_S);

            trace!(extruder, "applied start-filament tool parameters");
            lines_to_remove.extend(directives.iter().map(|d| d.line_idx));
            if directives.len() == close - open - 1 {
                blocks_to_remove.push(open);
                blocks_to_remove.push(close);
            }

            i = close + 1;
        } else {
            i += 1;
        }
    }

    let mut remove: Vec<usize> = lines_to_remove;
    remove.extend(blocks_to_remove);
    remove.sort_unstable();
    remove.dedup();
    for idx in remove.into_iter().rev() {
        lines.remove(idx);
    }

    debug!("processed start-filament parameter blocks");
    Ok(lines)
}
