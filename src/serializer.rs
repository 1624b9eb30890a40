//! Reassembles the rewritten section list and the untouched trailers back
//! into a single output buffer, per §4.13.

use crate::section::SectionList;
use crate::splitter::Split;

/// Concatenates the head, the linearized (rewritten) middle section list,
/// and the end/stats/config trailers, each separated by a blank line.
pub fn serialize(head: &[String], list: &SectionList, split: &Split) -> Vec<String> {
    let middle = list.linearize();

    let mut out = Vec::new();
    out.extend(head.iter().cloned());
    out.push(String::new());
    out.extend(middle);
    out.push(String::new());
    out.extend(split.end.iter().cloned());
    out.push(String::new());
    out.extend(split.stats.iter().cloned());
    out.push(String::new());
    out.extend(split.config.iter().cloned());
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::section::SectionKind;

    #[test]
    fn joins_regions_with_blank_line_separators() {
        let head = vec!["; head".to_string()];
        let mut list = SectionList::new();
        list.push_back(SectionKind::Other, 0, vec!["G1 X0".into()]);
        let split = Split {
            head: head.clone(),
            middle: Vec::new(),
            end: vec!["M107".into()],
            stats: vec!["; layer count: 1".into()],
            config: vec!["; SuperSlicer_config = begin".into()],
        };

        let out = serialize(&head, &list, &split);
        assert_eq!(
            out,
            vec![
                "; head",
                "",
                "G1 X0",
                "",
                "M107",
                "",
                "; layer count: 1",
                "",
                "; SuperSlicer_config = begin",
            ]
        );
    }
}
