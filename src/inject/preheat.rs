//! Injects a command to start heating a tool ahead of its next selection,
//! timed against how long it will have been idle, per §4.12.

use tracing::debug;

use crate::config::ToolConfig;
use crate::error::{Error, Result};
use crate::section::{SectionId, SectionKind, SectionList};

fn preheat_lines(tool: i32, target: i32) -> Vec<String> {
    vec![
        format!("; custom gcode: preheat_section T{tool}"),
        format!("M104 S{target} T{tool} ; set tool temperature to preheat"),
        format!("; custom gcode end: preheat_section T{tool}"),
    ]
}

/// No-op for single-tool prints. Otherwise marks the earliest non-initial
/// reselection of every tool other than the first as heating from fully
/// off, then walks backward from each non-initial toolchange to place its
/// preheat command far enough ahead to be ready in time.
pub fn inject(list: &mut SectionList, tool_configs: &[ToolConfig], first_tool: i32) -> Result<()> {
    if tool_configs.iter().filter(|t| t.tool_used).count() <= 1 {
        return Ok(());
    }

    let start_gcode_id = list
        .find(|s| s.kind == SectionKind::StartGcode)
        .ok_or_else(|| Error::MissingMarker("START_GCODE section".into()))?;

    let toolchange_ids: Vec<SectionId> = list
        .iter()
        .filter(|&id| {
            let s = list.get(id);
            s.kind == SectionKind::Toolchange && !s.toolchange.initial_toolchange
        })
        .collect();

    // First pass: earliest non-initial reselection of each non-first used
    // tool always heats from fully off.
    for tool in tool_configs.iter().filter(|t| t.tool_used && t.tool_number as i32 != first_tool) {
        let t = tool.tool_number as i32;
        if let Some(&id) = toolchange_ids.iter().find(|&&id| list.get(id).toolchange.incoming_tool == t) {
            list.get_mut(id).toolchange.heat_from_off = true;
        }
    }

    // Second pass: place a preheat command far enough ahead of every
    // non-initial toolchange's reselection.
    for id in toolchange_ids {
        let toolchange = list.get(id).toolchange;
        let first_layer_temps_used = list.get(id).first_layer_temps_used;
        let t = toolchange.incoming_tool;
        let tool = tool_configs
            .get(t as usize)
            .ok_or_else(|| Error::MalformedInput(format!("incoming tool T{t} out of range")))?;
        let target = if first_layer_temps_used { tool.first_layer_temperature } else { tool.temperature };
        let lead = if toolchange.heat_from_off { tool.warmup_from_off_time_s } else { tool.warmup_time_s } as f64;

        let mut current = id;
        let mut accumulated = 0.0;
        loop {
            let prev = list
                .prev(current)
                .ok_or_else(|| Error::MalformedInput("toolchange section has no predecessor".into()))?;
            accumulated += list.get(prev).score;

            if list.head() == Some(prev) {
                if t != first_tool {
                    list.insert_after(start_gcode_id, SectionKind::Other, t, preheat_lines(t, target));
                }
                break;
            }

            if accumulated >= lead {
                let insert_after_id = list.prev(prev).unwrap_or(start_gcode_id);
                list.insert_after(insert_after_id, SectionKind::Other, t, preheat_lines(t, target));
                break;
            }

            current = prev;
        }
    }

    debug!("injected preheat commands");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tool(n: usize, used: bool, temp: i32, warmup: u32, warmup_off: u32) -> ToolConfig {
        ToolConfig {
            tool_number: n,
            bed_temperature: 0,
            first_layer_bed_temperature: 0,
            chamber_temperature: 0,
            temperature: temp,
            first_layer_temperature: temp,
            tool_used: used,
            warmup_time_s: warmup,
            warmup_from_off_time_s: warmup_off,
            dormant_time_s: 120,
        }
    }

    #[test]
    fn inserts_preheat_section_once_threshold_crossed() {
        let mut list = SectionList::new();
        list.push_back(SectionKind::PreStart, 0, vec!["; pre_start".into()]);
        list.push_back(SectionKind::StartGcode, 0, vec!["; start_gcode".into()]);

        let initial_tc = list.push_back(SectionKind::Toolchange, 0, vec!["T0".into()]);
        list.get_mut(initial_tc).toolchange.initial_toolchange = true;

        let gcode_a = list.push_back(SectionKind::Gcode, 0, vec!["G1 X1".into()]);
        list.get_mut(gcode_a).score = 50.0;
        let gcode_b = list.push_back(SectionKind::Gcode, 0, vec!["G1 X2".into()]);
        list.get_mut(gcode_b).score = 50.0;

        let tc = list.push_back(SectionKind::Toolchange, 0, vec!["; custom gcode: toolchange_gcode".into()]);
        list.get_mut(tc).toolchange.incoming_tool = 1;
        list.get_mut(tc).toolchange.outgoing_tool = 0;

        let tools = vec![tool(0, true, 210, 30, 90), tool(1, true, 220, 30, 90)];
        inject(&mut list, &tools, 0).unwrap();

        assert!(list.get(tc).toolchange.heat_from_off);
        let lines = list.linearize();
        assert!(lines.iter().any(|l| l.contains("preheat_section T1")));
        assert!(lines.iter().any(|l| l.contains("M104 S220 T1")));
    }

    #[test]
    fn skips_preheat_for_first_tool_when_walk_reaches_head() {
        let mut list = SectionList::new();
        list.push_back(SectionKind::PreStart, 1, vec!["; pre_start".into()]);
        list.push_back(SectionKind::StartGcode, 1, vec!["; start_gcode".into()]);

        let initial_tc = list.push_back(SectionKind::Toolchange, 1, vec!["T1".into()]);
        list.get_mut(initial_tc).toolchange.initial_toolchange = true;

        let gcode = list.push_back(SectionKind::Gcode, 1, vec!["G1 X1".into()]);
        list.get_mut(gcode).score = 1.0;

        let tc = list.push_back(SectionKind::Toolchange, 1, vec!["; custom gcode: toolchange_gcode".into()]);
        list.get_mut(tc).toolchange.incoming_tool = 1;
        list.get_mut(tc).toolchange.outgoing_tool = 0;

        let tools = vec![tool(0, true, 210, 30, 90), tool(1, true, 220, 30, 90)];
        let before = list.iter().count();
        inject(&mut list, &tools, 1).unwrap();
        assert_eq!(list.iter().count(), before);
    }

    #[test]
    fn single_tool_print_is_a_no_op() {
        let mut list = SectionList::new();
        list.push_back(SectionKind::StartGcode, 0, vec!["; start_gcode".into()]);
        let tools = vec![tool(0, true, 210, 30, 90)];
        inject(&mut list, &tools, 0).unwrap();
    }
}
