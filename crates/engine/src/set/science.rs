use thiserror::Error;

/// One staged experiment result awaiting injection. Immutable once parsed;
/// duplicates are allowed and kept in file order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScienceResultEntry {
    pub experiment_id: String,
    pub region_name: String,
    pub result_text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("science results line {line_number} has no '=' separator: '{content}'")]
pub struct MalformedScienceLine {
    pub line_number: usize,
    pub content: String,
}

/// Outcome of parsing one science results file. Entries collected before a
/// malformed line are kept; `error` marks where parsing stopped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScienceParse {
    pub entries: Vec<ScienceResultEntry>,
    pub error: Option<MalformedScienceLine>,
}

/// Parses a set's science results file.
///
/// A line whose text left of the first `=` trims to `id` switches the
/// current experiment-id context and produces no entry. Every other
/// non-empty line is split on its first `=` into region name and result
/// text (both trimmed) and produces one entry under the current id context;
/// entries appearing before any `id =` line carry an empty id. Blank lines
/// are skipped. A non-empty line with no `=` stops parsing for the rest of
/// the file.
pub fn parse_science_results(raw: &str) -> ScienceParse {
    let mut entries = Vec::new();
    let mut experiment_id = String::new();
    for (index, line) in raw.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let Some((left, right)) = line.split_once('=') else {
            return ScienceParse {
                entries,
                error: Some(MalformedScienceLine {
                    line_number: index + 1,
                    content: line.to_string(),
                }),
            };
        };
        let left = left.trim();
        let right = right.trim();
        if left == "id" {
            experiment_id = right.to_string();
        } else {
            entries.push(ScienceResultEntry {
                experiment_id: experiment_id.clone(),
                region_name: left.to_string(),
                result_text: right.to_string(),
            });
        }
    }
    ScienceParse {
        entries,
        error: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(experiment_id: &str, region_name: &str, result_text: &str) -> ScienceResultEntry {
        ScienceResultEntry {
            experiment_id: experiment_id.to_string(),
            region_name: region_name.to_string(),
            result_text: result_text.to_string(),
        }
    }

    #[test]
    fn id_lines_switch_context_and_produce_no_entry() {
        let raw = "id = exp1\nHighlands = result A\nLowlands = result B\nid = exp2\nHighlands = result C\n";
        let parse = parse_science_results(raw);
        assert!(parse.error.is_none());
        assert_eq!(
            parse.entries,
            vec![
                entry("exp1", "Highlands", "result A"),
                entry("exp1", "Lowlands", "result B"),
                entry("exp2", "Highlands", "result C"),
            ]
        );
    }

    #[test]
    fn entry_before_any_id_line_carries_empty_id() {
        let parse = parse_science_results("Highlands = orphan\nid = exp1\nLowlands = kept\n");
        assert!(parse.error.is_none());
        assert_eq!(
            parse.entries,
            vec![entry("", "Highlands", "orphan"), entry("exp1", "Lowlands", "kept")]
        );
    }

    #[test]
    fn line_without_separator_stops_parsing_but_keeps_prior_entries() {
        let raw = "id = exp1\nHighlands = result A\nthis line is broken\nLowlands = lost\n";
        let parse = parse_science_results(raw);
        assert_eq!(parse.entries, vec![entry("exp1", "Highlands", "result A")]);
        let error = parse.error.expect("error");
        assert_eq!(error.line_number, 3);
        assert_eq!(error.content, "this line is broken");
    }

    #[test]
    fn blank_lines_are_skipped() {
        let parse = parse_science_results("id = exp1\n\n   \nHighlands = result A\n");
        assert!(parse.error.is_none());
        assert_eq!(parse.entries, vec![entry("exp1", "Highlands", "result A")]);
    }

    #[test]
    fn duplicates_are_preserved_in_file_order() {
        let raw = "id = exp1\nHighlands = first\nHighlands = second\n";
        let parse = parse_science_results(raw);
        assert_eq!(
            parse.entries,
            vec![
                entry("exp1", "Highlands", "first"),
                entry("exp1", "Highlands", "second"),
            ]
        );
    }

    #[test]
    fn result_text_keeps_later_equals_signs() {
        let parse = parse_science_results("id = exp1\nHighlands = a = b\n");
        assert_eq!(parse.entries, vec![entry("exp1", "Highlands", "a = b")]);
    }

    #[test]
    fn region_named_like_id_prefix_is_still_an_entry() {
        let parse = parse_science_results("grid = not an id line\n");
        assert!(parse.error.is_none());
        assert_eq!(parse.entries, vec![entry("", "grid", "not an id line")]);
    }
}
