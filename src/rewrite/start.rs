//! Synthesizes the pre-start section and the first tool's temperature
//! wait or selection, per §4.6.

use tracing::debug;

use crate::config::{GlobalConfig, ToolConfig};
use crate::error::{Error, Result};
use crate::section::{SectionKind, SectionList};

/// Residual state threaded into the rest of the pipeline once the start
/// region has been rewritten.
pub struct StartContext {
    /// Running estimate of unattributed print time, decremented as
    /// fixed-cost sections (start-gcode, toolchanges) are accounted for.
    pub score_tracker: f64,
    /// True iff a synthetic first-toolchange section was inserted (i.e.
    /// the first tool selected is not tool 0).
    pub has_first_toolchange: bool,
    /// The tool the print actually begins on.
    pub first_tool: i32,
}

fn max_first_layer_bed_temp(tools: &[ToolConfig]) -> i32 {
    tools
        .iter()
        .filter(|t| t.tool_used)
        .map(|t| t.first_layer_bed_temperature)
        .max()
        .unwrap_or(0)
}

/// Rewrites the start region: see §4.6.
pub fn rewrite(
    list: &mut SectionList,
    tool_configs: &[ToolConfig],
    global: &GlobalConfig,
    print_time_s: u32,
) -> Result<StartContext> {
    let max_flb = max_first_layer_bed_temp(tool_configs);

    let start_id = list
        .find(|s| s.kind == SectionKind::StartGcode)
        .ok_or_else(|| Error::MissingMarker("START_GCODE section".into()))?;
    let first_tool = list.get(start_id).tool;

    // 1. prepend the pre-start section.
    list.push_front(
        SectionKind::PreStart,
        0,
        vec![
            "; custom gcode: pre_start_gcode".into(),
            "T0 ; select T0".into(),
            format!("M140 S{max_flb} ; set bed temperature"),
            "M109 S150 T0 ; set T0 temperature and wait".into(),
            format!("M190 S{max_flb} ; set bed temperature and wait"),
            "; custom gcode end: pre_start_gcode".into(),
        ],
    );

    // 2. score the start-gcode section.
    list.get_mut(start_id).score = global.time_start_gcode as f64;

    // 3. delete the initial-temp section.
    let initial_temp_id = list
        .find(|s| s.kind == SectionKind::InitialTemp)
        .ok_or_else(|| Error::MissingMarker("INITIAL_TEMP section".into()))?;
    list.remove(initial_temp_id);

    // 4. delete the first toolchange section.
    let first_toolchange_id = list
        .find(|s| s.kind == SectionKind::Toolchange)
        .ok_or_else(|| Error::MissingMarker("first TOOLCHANGE section".into()))?;
    list.remove(first_toolchange_id);

    let mut score_tracker = (print_time_s as f64) - (global.time_start_gcode as f64);
    let mut has_first_toolchange = false;

    if first_tool == 0 {
        let temp = tool_configs[0].first_layer_temperature;
        list.insert_after(
            start_id,
            SectionKind::Other,
            0,
            vec![
                "; custom gcode: first_tool_temperature".into(),
                format!("M109 S{temp} T0 ; set T0 temperature and wait"),
                "; custom gcode end: first_tool_temperature".into(),
            ],
        );
    } else {
        let t0_used = tool_configs[0].tool_used;
        let mut lines = vec!["; custom gcode: first_tool_selection".into()];
        if !t0_used {
            lines.push("M104 S0 T0 ; turn off T0 as it is not used in print".into());
        }
        lines.push(format!("T{first_tool} ; select tool {first_tool}"));
        lines.push("; custom gcode end: first_tool_selection".into());

        let toolchange_id = list.insert_after(start_id, SectionKind::Toolchange, first_tool, lines);
        {
            let section = list.get_mut(toolchange_id);
            section.score = global.time_toolchange as f64;
            section.toolchange.initial_toolchange = true;
        }
        score_tracker -= global.time_toolchange as f64;
        has_first_toolchange = true;

        let temp = tool_configs[first_tool as usize].first_layer_temperature;
        let pre_start_id = list.prev(start_id).expect("pre-start was just prepended");
        list.insert_after(
            pre_start_id,
            SectionKind::Other,
            first_tool,
            vec![
                format!("; custom gcode: preheat_section T{first_tool}"),
                format!("M104 S{temp} T{first_tool} ; set tool temperature to preheat"),
                format!("; custom gcode end: preheat_section T{first_tool}"),
            ],
        );
    }

    debug!(first_tool, has_first_toolchange, "rewrote start region");

    Ok(StartContext {
        score_tracker,
        has_first_toolchange,
        first_tool,
    })
}
