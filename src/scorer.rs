//! Attributes the remaining unaccounted-for print time across the plain
//! movement (`GCODE`) sections, proportional to their line count, per §4.9.

use tracing::debug;

use crate::section::{SectionKind, SectionList};

/// Scores every `GCODE` section as its share of `score_tracker`,
/// weighted by its line count against the total line count of all such
/// sections. A list with no `GCODE` sections (or only empty ones) is left
/// unscored rather than dividing by zero.
pub fn score(list: &mut SectionList, score_tracker: f64) {
    let gcode_ids: Vec<_> = list.iter().filter(|&id| list.get(id).kind == SectionKind::Gcode).collect();
    let total_lines: usize = gcode_ids.iter().map(|&id| list.get(id).lines.len()).sum();

    if total_lines == 0 {
        debug!("no gcode sections to score, leaving score_tracker unattributed");
        return;
    }

    for id in gcode_ids {
        let n = list.get(id).lines.len();
        list.get_mut(id).score = (n as f64 / total_lines as f64) * score_tracker;
    }

    debug!(total_lines, score_tracker, "scored gcode sections");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distributes_score_proportionally_to_line_count() {
        let mut list = SectionList::new();
        let a = list.push_back(SectionKind::Gcode, 0, vec!["G1 X1".into(), "G1 X2".into()]);
        let b = list.push_back(SectionKind::Gcode, 0, vec!["G1 X3".into()]);
        let other = list.push_back(SectionKind::Other, 0, vec!["; comment".into(), "; two".into()]);

        score(&mut list, 300.0);

        assert_eq!(list.get(a).score, 200.0);
        assert_eq!(list.get(b).score, 100.0);
        assert_eq!(list.get(other).score, 0.0);
    }

    #[test]
    fn no_gcode_sections_is_a_no_op() {
        let mut list = SectionList::new();
        let other = list.push_back(SectionKind::Other, 0, vec!["; comment".into()]);
        score(&mut list, 300.0);
        assert_eq!(list.get(other).score, 0.0);
    }
}
