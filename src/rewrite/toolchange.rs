//! Replaces each non-initial toolchange section's contents with a
//! canonical set-temp / select-tool / verify sequence, per §4.8.

use tracing::debug;

use crate::config::{GlobalConfig, ToolConfig};
use crate::error::{Error, Result};
use crate::section::{SectionKind, SectionList};

fn parse_int_directive(lines: &[String], prefix: &str) -> Option<i32> {
    lines.iter().find_map(|l| l.strip_prefix(prefix)?.trim().parse().ok())
}

/// Rewrites every non-initial toolchange section: see §4.8.
pub fn rewrite(
    list: &mut SectionList,
    tool_configs: &[ToolConfig],
    global: &GlobalConfig,
    score_tracker: &mut f64,
) -> Result<()> {
    let ids: Vec<_> = list.iter().collect();
    for id in ids {
        let section = list.get(id);
        if section.kind != SectionKind::Toolchange || section.toolchange.initial_toolchange {
            continue;
        }

        let outgoing_tool = parse_int_directive(&section.lines, "CURRENT_TOOL=")
            .ok_or_else(|| Error::MalformedInput("toolchange section missing CURRENT_TOOL=".into()))?;
        let incoming_tool = parse_int_directive(&section.lines, "NEXT_TOOL=")
            .ok_or_else(|| Error::MalformedInput("toolchange section missing NEXT_TOOL=".into()))?;
        let first_layer_temps_used = section.first_layer_temps_used;

        let incoming = tool_configs.get(incoming_tool as usize).ok_or_else(|| {
            Error::MalformedInput(format!("NEXT_TOOL={incoming_tool} out of range"))
        })?;
        let temp = if first_layer_temps_used {
            incoming.first_layer_temperature
        } else {
            incoming.temperature
        };

        let section = list.get_mut(id);
        section.toolchange.outgoing_tool = outgoing_tool;
        section.toolchange.incoming_tool = incoming_tool;
        section.score = global.time_toolchange as f64;
        section.lines = vec![
            "; custom gcode: toolchange_gcode".into(),
            format!("M104 S{temp} T{incoming_tool} ; set tool temperature"),
            format!("T{incoming_tool} ; select tool {incoming_tool}"),
            "VERIFY_TOOL_DETECTED ASYNC=1 ; verify tool detected".into(),
            "; custom gcode end: toolchange_gcode".into(),
        ];

        *score_tracker -= global.time_toolchange as f64;
    }

    debug!("rewrote toolchange sections");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ToolConfig;

    fn tool(n: usize, flt: i32, temp: i32) -> ToolConfig {
        ToolConfig {
            tool_number: n,
            bed_temperature: 0,
            first_layer_bed_temperature: 0,
            chamber_temperature: 0,
            temperature: temp,
            first_layer_temperature: flt,
            tool_used: true,
            warmup_time_s: 30,
            warmup_from_off_time_s: 90,
            dormant_time_s: 120,
        }
    }

    fn global() -> GlobalConfig {
        GlobalConfig {
            standby_temperature_delta: -5,
            time_start_gcode: 45,
            time_toolchange: 18,
            tool_count: 2,
        }
    }

    #[test]
    fn rewrites_non_initial_toolchange_and_skips_initial() {
        let mut list = SectionList::new();
        let initial = list.push_back(
            SectionKind::Toolchange,
            1,
            vec!["T1 ; select tool 1".into()],
        );
        list.get_mut(initial).toolchange.initial_toolchange = true;

        let real = list.push_back(
            SectionKind::Toolchange,
            1,
            vec![
                "; custom gcode: toolchange_gcode".into(),
                "CURRENT_TOOL=1".into(),
                "NEXT_TOOL=0".into(),
                "; custom gcode end: toolchange_gcode".into(),
            ],
        );
        list.get_mut(real).other_layer_temps_used = true;

        let tools = vec![tool(0, 215, 210), tool(1, 220, 215)];
        let mut tracker = 100.0;
        rewrite(&mut list, &tools, &global(), &mut tracker).unwrap();

        assert_eq!(list.get(initial).lines, vec!["T1 ; select tool 1"]);
        assert_eq!(list.get(real).toolchange.outgoing_tool, 1);
        assert_eq!(list.get(real).toolchange.incoming_tool, 0);
        assert_eq!(list.get(real).score, 18.0);
        assert_eq!(tracker, 100.0 - 18.0);
        assert!(list.get(real).lines.iter().any(|l| l.contains("M104 S210 T0")));
    }
}
