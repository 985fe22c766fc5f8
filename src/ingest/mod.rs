// Allow wildcards in match statements for the parsing rules `Rule::*`.
#![allow(clippy::wildcard_enum_match_arm)]

use crate::error::RankFlowError;
use crate::util::io::get_file_lines;
use crate::util::timer::RfTimer;
use derive_new::new;
use hashbrown::HashSet;
use log::info;
use pest::iterators::Pair;
use pest::Parser;
use pest_derive::Parser;
use rankflow_api::NodeId;

pub mod topics;

#[derive(Parser)]
#[grammar = "ingest/record_grammar.pest"]
struct RecordParser;

/// A node and the ids it links to, as read from the input. Link weights are discarded.
#[derive(Debug, Clone, PartialEq, Eq, new)]
pub struct AdjacencyRecord {
    pub id: NodeId,
    pub outlinks: Vec<NodeId>,
}

/// Parses one `id<TAB>adjacency` line.
pub fn parse_record(line: &str) -> Result<AdjacencyRecord, String> {
    let line = line.trim_end_matches(|c| c == '\r' || c == '\n');
    let record = RecordParser::parse(Rule::record, line)
        .map_err(|e| e.to_string())?
        .next()
        .ok_or_else(|| "empty record".to_owned())?;

    let mut id = None;
    let mut outlinks = Vec::new();
    for pair in record.into_inner() {
        match pair.as_rule() {
            Rule::node_id => id = Some(node_id_string(pair)),
            Rule::mapping => outlinks.extend(
                pair.into_inner().filter_map(|entry| entry.into_inner().next()).map(node_id_string),
            ),
            Rule::list => outlinks.extend(pair.into_inner().map(node_id_string)),
            _ => {}
        }
    }

    let id = id.ok_or_else(|| "missing node id".to_owned())?;
    if id.is_empty() {
        return Err("node id is empty".to_owned());
    }
    if outlinks.iter().any(String::is_empty) {
        return Err(format!("node '{}' links to an empty node id", id));
    }
    Ok(AdjacencyRecord::new(id, outlinks))
}

fn node_id_string(pair: Pair<Rule>) -> NodeId {
    // `node_id` wraps exactly one of `single_inner`, `double_inner` or `bare`.
    pair.into_inner().next().map_or_else(String::new, |inner| inner.as_str().to_owned())
}

/// Reads every record of `file_path`. Blank lines are skipped and duplicate ids are rejected.
pub fn load_adjacency(file_path: &str) -> Result<Vec<AdjacencyRecord>, RankFlowError> {
    info!("Loading graph records from file '{}'", file_path);
    let timer = RfTimer::now();
    let mut seen = HashSet::new();
    let mut records = Vec::new();
    let mut link_count = 0;
    for (index, line) in get_file_lines(file_path)?.enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let record = parse_record(&line)
            .map_err(|e| RankFlowError::RecordParse(index + 1, file_path.to_owned(), e))?;
        if !seen.insert(record.id.clone()) {
            return Err(RankFlowError::DuplicateNode(record.id, file_path.to_owned()));
        }
        link_count += record.outlinks.len();
        records.push(record);

        if records.len() % 500_000 == 0 {
            info!("Processed {} records in {}", records.len(), timer.elapsed().to_seconds_string());
        }
    }
    info!(
        "Loaded {} records with {} links in {}",
        records.len(),
        link_count,
        timer.elapsed().to_seconds_string()
    );
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(values: &[&str]) -> Vec<NodeId> {
        values.iter().map(|s| (*s).to_owned()).collect()
    }

    #[test]
    fn parses_weighted_mappings() {
        let record = parse_record("1\t{'3': 1, '7': 2, '12': 1}").expect("valid record");
        assert_eq!(record, AdjacencyRecord::new("1".to_owned(), ids(&["3", "7", "12"])));

        let record = parse_record("A\t{\"B\": 0.5,\"C\":1}\r\n").expect("valid record");
        assert_eq!(record, AdjacencyRecord::new("A".to_owned(), ids(&["B", "C"])));
    }

    #[test]
    fn parses_lists_and_quoted_ids() {
        let record = parse_record("\"A\"\t[\"B\", \"C\"]").expect("valid record");
        assert_eq!(record, AdjacencyRecord::new("A".to_owned(), ids(&["B", "C"])));

        let record = parse_record("'node one'\t['node two']").expect("valid record");
        assert_eq!(record, AdjacencyRecord::new("node one".to_owned(), ids(&["node two"])));
    }

    #[test]
    fn parses_dangling_nodes() {
        assert_eq!(parse_record("X\t{}").expect("valid record").outlinks, Vec::<NodeId>::new());
        assert_eq!(parse_record("X\t[ ]").expect("valid record").outlinks, Vec::<NodeId>::new());
    }

    #[test]
    fn rejects_malformed_records() {
        assert!(parse_record("A {'B': 1}").is_err());
        assert!(parse_record("A\t{'B' 1}").is_err());
        assert!(parse_record("A\t['B'").is_err());
        assert!(parse_record("''\t['B']").is_err());
        assert!(parse_record("A\t['']").is_err());
    }

    #[test]
    fn loads_test_graph() {
        let records = load_adjacency("data/test_data/graphs/small.txt").expect("graph loads");
        assert_eq!(records.len(), 4);
        assert_eq!(records[0], AdjacencyRecord::new("A".to_owned(), ids(&["B", "C"])));
        assert!(records.iter().any(|record| record.id == "D" && record.outlinks.is_empty()));
    }

    #[test]
    fn rejects_duplicate_ids() {
        assert!(matches!(
            load_adjacency("data/test_data/graphs/duplicate.txt"),
            Err(RankFlowError::DuplicateNode(id, _)) if id == "A"
        ));
    }
}
