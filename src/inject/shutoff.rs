//! Turns off every tool that is no longer needed by the end of the print,
//! per §4.10.

use tracing::debug;

use crate::config::ToolConfig;
use crate::error::{Error, Result};
use crate::section::{SectionKind, SectionList};

use super::insert_penultimate;

/// For each used tool, either leaves it selected through to the end
/// trailer (if it's still the active tool at the last section) or marks
/// its final deselecting toolchange and injects the command to turn it
/// off there.
pub fn inject(list: &mut SectionList, tool_configs: &[ToolConfig]) -> Result<()> {
    let tail = list.tail().ok_or_else(|| Error::MalformedInput("empty section list".into()))?;

    for tool in tool_configs.iter().filter(|t| t.tool_used) {
        let t = tool.tool_number as i32;
        if list.get(tail).tool == t {
            continue;
        }

        let deselect_id = list
            .riter()
            .find(|&id| {
                let s = list.get(id);
                s.kind == SectionKind::Toolchange && s.toolchange.outgoing_tool == t
            })
            .ok_or_else(|| {
                Error::MalformedInput(format!("no deselecting toolchange found for used tool T{t}"))
            })?;

        list.get_mut(deselect_id).toolchange.last_deselect = true;
        insert_penultimate(&mut list.get_mut(deselect_id).lines, format!("M104 S0 T{t} ; turn off tool {t}"));
    }

    debug!("injected shutoff commands");
    Ok(())
}
