//! Core pipeline for the toolchanger temperature-management post-processor.
//!
//! Takes a raw SuperSlicer G-code file (as lines) and rewrites the
//! temperature-management logic around toolchanges: the original slicer
//! output assumes every tool stays hot for the whole print, which wastes
//! energy and risks oozing on idle tools. This pipeline scores how long
//! each tool will sit idle and replaces the slicer's fixed temperature
//! commands with preheat/standby/shutoff commands timed to match.

pub mod config;
pub mod error;
pub mod filters;
pub mod inject;
pub mod rewrite;
pub mod scorer;
pub mod section;
pub mod sectionizer;
pub mod serializer;
pub mod splitter;
pub mod stats;

use tracing::{debug, info};

use config::ToolConfig;
use error::Result;

const TOOLCHANGE_MARKER: &str = "; custom gcode: toolchange_gcode";

/// Marks `tool_used` on every [`ToolConfig`] whose tool number appears as
/// a standalone `T<digits>` token anywhere in the middle region.
///
/// The original tool used a plain substring search for `T{n}`, which a
/// line like `T10` would also satisfy when searching for tool `1`. This
/// tightens the match to a token boundary: `T` preceded by start-of-line
/// or whitespace.
fn mark_tools_used(middle: &[String], tool_configs: &mut [ToolConfig]) {
    let mut seen = vec![false; tool_configs.len()];
    for line in middle {
        for n in standalone_tool_tokens(line) {
            if let Some(slot) = seen.get_mut(n as usize) {
                *slot = true;
            }
        }
    }
    for (tool, used) in tool_configs.iter_mut().zip(seen) {
        tool.tool_used = used;
    }
}

fn standalone_tool_tokens(line: &str) -> Vec<i32> {
    let bytes = line.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'T' && (i == 0 || bytes[i - 1].is_ascii_whitespace()) {
            let start = i + 1;
            let mut end = start;
            while end < bytes.len() && bytes[end].is_ascii_digit() {
                end += 1;
            }
            if end > start {
                if let Ok(n) = line[start..end].parse::<i32>() {
                    tokens.push(n);
                }
                i = end;
                continue;
            }
        }
        i += 1;
    }
    tokens
}

/// Runs the full pipeline over `lines`. Returns `None` if the input
/// contains no toolchange section at all, signaling the caller to leave
/// the file untouched rather than write anything back.
pub fn process(lines: Vec<String>) -> Result<Option<Vec<String>>> {
    if !lines.iter().any(|l| l.starts_with(TOOLCHANGE_MARKER)) {
        info!("no toolchange present, short-circuiting");
        return Ok(None);
    }

    let lines = splitter::eliminate_blank_lines(lines);
    let split = splitter::split(lines)?;

    let (global, mut tool_configs) = config::parse(&split.config)?;
    let stats = stats::parse(&split.stats)?;

    let middle = filters::remove_pre_toolchange_temp_drop(split.middle.clone());
    let middle = filters::remove_post_start_filament_temp_set(middle);
    let middle = filters::extract_start_filament_parameters(middle, &mut tool_configs)?;

    mark_tools_used(&middle, &mut tool_configs);

    let mut list = sectionizer::sectionize(&middle)?;

    let start_ctx = rewrite::start::rewrite(&mut list, &tool_configs, &global, stats.print_time_s)?;
    rewrite::second_layer::rewrite(&mut list, &tool_configs)?;

    let mut score_tracker = start_ctx.score_tracker;
    rewrite::toolchange::rewrite(&mut list, &tool_configs, &global, &mut score_tracker)?;

    scorer::score(&mut list, score_tracker);

    inject::shutoff::inject(&mut list, &tool_configs)?;
    inject::standby::inject(&mut list, &tool_configs, &global);
    inject::preheat::inject(&mut list, &tool_configs, start_ctx.first_tool)?;

    let output = serializer::serialize(&split.head, &list, &split);
    debug!(lines = output.len(), layer_count = stats.layer_count, "pipeline complete");
    Ok(Some(output))
}
