use crate::computations::top_k::{TopKCollector, TopKEntry};
use crate::config::RankConfig;
use crate::error::RankFlowError;
use crate::util::io::get_buf_writer;
use csv::WriterBuilder;
use log::info;
use rankflow_api::NodeRecord;

/// Picks the records to report: every record (in id order) with `report_all`, otherwise the
/// `top_k` highest ranked ones, best first. Ranks not above `min_rank` are dropped first.
pub fn top_ranked(records: Vec<NodeRecord>, config: &RankConfig) -> Vec<NodeRecord> {
    let kept = records.into_iter().filter(|record| match config.min_rank {
        Some(min_rank) => record.rank > min_rank,
        None => true,
    });
    if config.report_all {
        return kept.collect();
    }
    let mut collector = TopKCollector::new(config.top_k);
    collector.extend(kept.map(TopKEntry::from_record));
    collector.drain().into_iter().map(|entry| entry.payload).collect()
}

/// Writes `id<TAB>rank` lines to `output_path`, or logs them when no path is given.
pub fn write_ranks(records: &[NodeRecord], output_path: Option<&str>) -> Result<(), RankFlowError> {
    let output_path = match output_path {
        Some(output_path) => output_path,
        None => {
            for record in records {
                info!("{}\t{}", record.id, record.rank);
            }
            return Ok(());
        }
    };

    info!("Writing {} ranks to '{}'", records.len(), output_path);
    let write_error =
        |e: csv::Error| RankFlowError::WriteFile(output_path.to_owned(), e.to_string());
    let mut writer = WriterBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .from_writer(get_buf_writer(output_path)?);
    for record in records {
        writer
            .write_record(&[record.id.as_str(), record.rank.to_string().as_str()])
            .map_err(write_error)?;
    }
    writer
        .flush()
        .map_err(|e| RankFlowError::WriteFile(output_path.to_owned(), e.to_string()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::io::get_file_lines;

    fn records() -> Vec<NodeRecord> {
        vec![
            NodeRecord::new("a".to_owned(), 0.05, vec![], None),
            NodeRecord::new("b".to_owned(), 2.0, vec![], None),
            NodeRecord::new("c".to_owned(), 1.0, vec![], None),
            NodeRecord::new("d".to_owned(), 2.0, vec![], None),
        ]
    }

    fn ids(records: &[NodeRecord]) -> Vec<&str> {
        records.iter().map(|record| record.id.as_str()).collect()
    }

    #[test]
    fn top_k_with_threshold() {
        let config = RankConfig { top_k: 2, ..RankConfig::with_partitions(4.0, 1) };
        assert_eq!(ids(&top_ranked(records(), &config)), vec!["b", "d"]);

        let config = RankConfig { top_k: 10, min_rank: Some(0.1), ..config };
        assert_eq!(ids(&top_ranked(records(), &config)), vec!["b", "d", "c"]);
    }

    #[test]
    fn report_all_keeps_input_order() {
        let config =
            RankConfig { report_all: true, top_k: 0, ..RankConfig::with_partitions(4.0, 1) };
        assert_eq!(ids(&top_ranked(records(), &config)), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn ranks_are_written_tab_separated() {
        let path = std::env::temp_dir().join(format!("rankflow-output-{}.tsv", std::process::id()));
        let path = path.to_str().expect("utf-8 temp path");
        write_ranks(&records()[1..3], Some(path)).expect("write ranks");
        let lines = get_file_lines(path).expect("read back").collect::<Vec<_>>();
        assert_eq!(lines, vec!["b\t2".to_owned(), "c\t1".to_owned()]);
        std::fs::remove_file(path).expect("cleanup");
    }
}
