//! Replaces the slicer's post-layer-1 temperature block with a tailored
//! one, and tags every section with which temperature regime it falls
//! under, per §4.7.

use tracing::debug;

use crate::config::ToolConfig;
use crate::error::{Error, Result};
use crate::section::{SectionKind, SectionList};

fn max_bed_temp(tools: &[ToolConfig]) -> i32 {
    tools.iter().filter(|t| t.tool_used).map(|t| t.bed_temperature).max().unwrap_or(0)
}

/// Rewrites the second-layer temperature block: see §4.7.
pub fn rewrite(list: &mut SectionList, tool_configs: &[ToolConfig]) -> Result<()> {
    let second_layer_id = list
        .find(|s| s.kind == SectionKind::SecondLayerTemp)
        .ok_or_else(|| Error::MissingMarker("SECOND_LAYER_TEMP section".into()))?;

    let ids: Vec<_> = list.iter().collect();
    let mut in_first_layer = true;
    for id in ids {
        if id == second_layer_id {
            in_first_layer = false;
        }
        if in_first_layer {
            list.get_mut(id).first_layer_temps_used = true;
        } else {
            list.get_mut(id).other_layer_temps_used = true;
        }
    }

    let max_bed = max_bed_temp(tool_configs);
    let current_tool = list.get(second_layer_id).tool;
    let temp = tool_configs[current_tool as usize].temperature;

    list.get_mut(second_layer_id).lines = vec![
        "; custom gcode: second_layer_temperature".into(),
        format!("M140 S{max_bed} ; set bed temperature"),
        format!("M104 S{temp} T{current_tool} ; set tool temperature"),
        "; custom gcode end: second_layer_temperature".into(),
    ];

    debug!(current_tool, max_bed, "rewrote second-layer temperature block");
    Ok(())
}
