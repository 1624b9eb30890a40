//! Keeps deselected tools at a reduced standby temperature, or turns them
//! fully off when the gap before reselection is long enough, per §4.11.

use tracing::debug;

use crate::config::{GlobalConfig, ToolConfig};
use crate::section::{SectionKind, SectionList};

use super::insert_penultimate;

/// No-op for single-tool prints (there is nothing to idle). Otherwise,
/// for every toolchange that isn't already the final deselection of its
/// tool, decides whether the gap before that tool is reselected is long
/// enough to let it go fully cold, and injects the appropriate command.
///
/// A toolchange whose tool is never reselected again is simply skipped;
/// it does not stop the rest of the toolchanges in the print from being
/// considered.
pub fn inject(list: &mut SectionList, tool_configs: &[ToolConfig], global: &GlobalConfig) {
    if tool_configs.iter().filter(|t| t.tool_used).count() <= 1 {
        return;
    }

    let toolchange_ids: Vec<_> = list
        .iter()
        .filter(|&id| list.get(id).kind == SectionKind::Toolchange)
        .collect();

    for id in toolchange_ids {
        if list.get(id).toolchange.last_deselect {
            continue;
        }
        let outgoing = list.get(id).toolchange.outgoing_tool;

        let mut accumulated = 0.0;
        let mut cursor = list.next(id);
        let mut reselect = None;
        while let Some(cursor_id) = cursor {
            let section = list.get(cursor_id);
            if section.kind == SectionKind::Toolchange && section.toolchange.incoming_tool == outgoing {
                reselect = Some(cursor_id);
                break;
            }
            accumulated += section.score;
            cursor = list.next(cursor_id);
        }
        let Some(reselect_id) = reselect else {
            continue;
        };

        let tool = &tool_configs[outgoing as usize];
        if accumulated >= tool.dormant_time_s as f64 {
            list.get_mut(reselect_id).toolchange.heat_from_off = true;
            insert_penultimate(&mut list.get_mut(id).lines, format!("M104 S0 T{outgoing} ; idle tool {outgoing}"));
        } else {
            let first_layer = list.get(reselect_id).first_layer_temps_used;
            let target = if first_layer { tool.first_layer_temperature } else { tool.temperature };
            let standby_temp = target - global.standby_temperature_delta;
            insert_penultimate(
                &mut list.get_mut(id).lines,
                format!("M104 S{standby_temp} T{outgoing} ; standby tool {outgoing}"),
            );
        }
    }

    debug!("injected standby commands");
}
