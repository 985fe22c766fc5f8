use crate::error::RankFlowError;
use csv::{ReaderBuilder, Trim};
use hashbrown::HashMap;
use log::info;
use rankflow_api::{NodeId, TopicId};
use std::iter::FromIterator;

/// Maps node ids to the topic they belong to.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TopicLookup {
    topics: HashMap<NodeId, TopicId>,
}

impl TopicLookup {
    /// Loads `id,topic` rows. A header row is not expected.
    pub fn load_from_csv(file_path: &str) -> Result<Self, RankFlowError> {
        info!("Loading topics from file '{}'", file_path);
        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .trim(Trim::All)
            .flexible(true)
            .from_path(file_path)
            .map_err(|e| RankFlowError::ReadFile(file_path.to_owned(), e.to_string()))?;

        let mut topics = HashMap::new();
        for (index, row) in reader.records().enumerate() {
            let row = row.map_err(|e| {
                RankFlowError::Parsing(format!(
                    "Could not read topic row {} in file '{}': {}",
                    index + 1,
                    file_path,
                    e
                ))
            })?;
            match (row.get(0), row.get(1)) {
                (Some(id), Some(topic)) if !id.is_empty() && !topic.is_empty() => {
                    topics.insert(id.to_owned(), topic.to_owned());
                }
                _ => {
                    return Err(RankFlowError::Parsing(format!(
                        "Topic row {} in file '{}' should be 'id,topic' but found '{:?}'",
                        index + 1,
                        file_path,
                        row
                    )))
                }
            }
        }
        info!("Loaded topics for {} nodes", topics.len());
        Ok(Self { topics })
    }

    pub fn topic_of(&self, id: &str) -> Option<&TopicId> {
        self.topics.get(id)
    }

    pub fn len(&self) -> usize {
        self.topics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.topics.is_empty()
    }
}

impl FromIterator<(NodeId, TopicId)> for TopicLookup {
    fn from_iter<I: IntoIterator<Item = (NodeId, TopicId)>>(iter: I) -> Self {
        Self { topics: iter.into_iter().collect() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_topics_from_csv() {
        let lookup = TopicLookup::load_from_csv("data/test_data/graphs/two_topics.csv")
            .expect("topics load");
        assert_eq!(lookup.len(), 8);
        assert_eq!(lookup.topic_of("1").map(String::as_str), Some("t1"));
        assert_eq!(lookup.topic_of("8").map(String::as_str), Some("t2"));
        assert_eq!(lookup.topic_of("9"), None);
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(matches!(
            TopicLookup::load_from_csv("data/test_data/graphs/missing.csv"),
            Err(RankFlowError::ReadFile(_, _))
        ));
    }
}
