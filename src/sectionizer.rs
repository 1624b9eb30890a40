//! Tokenizes the middle region into typed [`Section`]s linked in order.
//!
//! Expressed, per the design notes, as a state-free mapping from a line's
//! leading token to a `(kind, terminator predicate)` pair plus a generic
//! "consume a run" helper, rather than a hand-rolled state machine.

use tracing::debug;

use crate::error::{Error, Result};
use crate::section::{SectionKind, SectionList};

const START_GCODE_OPEN: &str = "; custom gcode: start_gcode";
const START_GCODE_CLOSE: &str = "; custom gcode end: start_gcode";
const TOOLCHANGE_OPEN: &str = "; custom gcode: toolchange_gcode";
const TOOLCHANGE_CLOSE: &str = "; custom gcode end: toolchange_gcode";
const LAYER_GCODE_OPEN: &str = "; custom gcode: layer_gcode";
const LAYER_GCODE_CLOSE: &str = "; custom gcode end: layer_gcode";
const LAYER_CHANGE_COMMENT: &str = ";LAYER_CHANGE";

fn is_temp_command(line: &str) -> bool {
    line.starts_with("M104") || line.starts_with("M109") || line.starts_with("M140") || line.starts_with("M190")
}

fn parse_next_tool(lines: &[String]) -> Option<i32> {
    lines.iter().find_map(|l| l.strip_prefix("NEXT_TOOL=")?.trim().parse().ok())
}

/// Scans the middle region for the first `toolchange_gcode` block and
/// returns the tool number from its interior `NEXT_TOOL=` directive. This
/// seeds `current_tool` before any section is created, since the
/// `START_GCODE` section (which precedes the first toolchange block
/// lexically) is itself tagged with that tool.
fn seed_initial_tool(lines: &[String]) -> Result<i32> {
    let open = lines
        .iter()
        .position(|l| l.starts_with(TOOLCHANGE_OPEN))
        .ok_or_else(|| Error::MissingMarker(TOOLCHANGE_OPEN.into()))?;
    let close = lines[open..]
        .iter()
        .position(|l| l.starts_with(TOOLCHANGE_CLOSE))
        .map(|offset| open + offset)
        .ok_or_else(|| Error::MissingMarker(TOOLCHANGE_CLOSE.into()))?;
    parse_next_tool(&lines[open..=close])
        .ok_or_else(|| Error::MalformedInput("toolchange block missing NEXT_TOOL=".into()))
}

/// Builds the section list from the (blank-free) middle region.
pub fn sectionize(lines: &[String]) -> Result<SectionList> {
    let mut current_tool = seed_initial_tool(lines)?;
    let mut list = SectionList::new();
    let mut initial_temp_seen = false;
    let mut initial_toolchange_seen = false;

    let mut i = 0;
    while i < lines.len() {
        let line = &lines[i];

        if line.starts_with(START_GCODE_OPEN) {
            let end = find_or_err(lines, i, |l| l.starts_with(START_GCODE_CLOSE), START_GCODE_CLOSE)?;
            list.push_back(SectionKind::StartGcode, current_tool, lines[i..=end].to_vec());
            i = end + 1;
        } else if line.starts_with("G1") {
            let mut end = i;
            while end + 1 < lines.len() && lines[end + 1].starts_with("G1") {
                end += 1;
            }
            list.push_back(SectionKind::Gcode, current_tool, lines[i..=end].to_vec());
            i = end + 1;
        } else if line.starts_with(TOOLCHANGE_OPEN) {
            let end = find_or_err(lines, i, |l| l.starts_with(TOOLCHANGE_CLOSE), TOOLCHANGE_CLOSE)?;
            let id = list.push_back(SectionKind::Toolchange, current_tool, lines[i..=end].to_vec());
            if !initial_toolchange_seen {
                list.get_mut(id).toolchange.initial_toolchange = true;
                initial_toolchange_seen = true;
            }
            if let Some(next_tool) = parse_next_tool(&lines[i..=end]) {
                current_tool = next_tool;
            }
            i = end + 1;
        } else if line.starts_with(LAYER_CHANGE_COMMENT) {
            let end = (i + 2).min(lines.len() - 1);
            list.push_back(SectionKind::LayerChangeComment, current_tool, lines[i..=end].to_vec());
            i = end + 1;
        } else if line.starts_with(LAYER_GCODE_OPEN) {
            let end = find_or_err(lines, i, |l| l.starts_with(LAYER_GCODE_CLOSE), LAYER_GCODE_CLOSE)?;
            list.push_back(SectionKind::LayerChangeGcode, current_tool, lines[i..=end].to_vec());
            i = end + 1;
        } else if is_temp_command(line) {
            let mut end = i;
            while end + 1 < lines.len() && is_temp_command(&lines[end + 1]) {
                end += 1;
            }
            let kind = if initial_temp_seen {
                SectionKind::SecondLayerTemp
            } else {
                initial_temp_seen = true;
                SectionKind::InitialTemp
            };
            list.push_back(kind, current_tool, lines[i..=end].to_vec());
            i = end + 1;
        } else {
            list.push_back(SectionKind::Other, current_tool, vec![line.clone()]);
            i += 1;
        }
    }

    debug!(section_count = list.iter().count(), "sectionized middle region");
    Ok(list)
}

fn find_or_err(
    lines: &[String],
    from: usize,
    pred: impl Fn(&str) -> bool,
    marker: &str,
) -> Result<usize> {
    lines[from..]
        .iter()
        .position(|l| pred(l))
        .map(|offset| from + offset)
        .ok_or_else(|| Error::MissingMarker(marker.to_string()))
}
