use crate::error::RankFlowError;
use crate::util::io::{get_buf_reader, get_buf_writer};
use crate::util::timer::RfTimer;
use log::info;
use rankflow_api::NodeRecord;
use serde_derive::{Deserialize, Serialize};
use std::path::Path;

const CHECKPOINT_FILE: &str = "rankflow_checkpoint";
const CHECKPOINT_EXTENSION: &str = "bin";

/// The state of a run after `completed_iterations` full iterations.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Checkpoint {
    pub variant: String,
    pub completed_iterations: usize,
    pub records: Vec<NodeRecord>,
}

/// Borrowing twin of `Checkpoint`, so that records need not be cloned to be saved.
#[derive(Serialize)]
struct CheckpointRef<'a> {
    variant: &'a str,
    completed_iterations: usize,
    records: &'a [NodeRecord],
}

pub fn save_checkpoint(
    checkpoint_dir: &str,
    variant: &str,
    completed_iterations: usize,
    records: &[NodeRecord],
) -> Result<(), RankFlowError> {
    check_directory(checkpoint_dir)?;
    let file_path = get_file_path(checkpoint_dir);
    info!("Saving checkpoint after iteration {} to '{}'", completed_iterations, file_path);
    let timer = RfTimer::now();
    let writer = get_buf_writer(&file_path)?;
    bincode::serialize_into(writer, &CheckpointRef { variant, completed_iterations, records })
        .map_err(|e| RankFlowError::Serialize(CHECKPOINT_FILE.to_owned(), e.to_string()))?;
    info!("Saved checkpoint in {}", timer.elapsed().to_seconds_string());
    Ok(())
}

pub fn load_checkpoint(checkpoint_dir: &str) -> Result<Checkpoint, RankFlowError> {
    check_directory(checkpoint_dir)?;
    let file_path = get_file_path(checkpoint_dir);
    info!("Loading checkpoint '{}'", file_path);
    let timer = RfTimer::now();
    let reader = get_buf_reader(&file_path)?;
    let checkpoint: Checkpoint = bincode::deserialize_from(reader)
        .map_err(|e| RankFlowError::Deserialize(CHECKPOINT_FILE.to_owned(), e.to_string()))?;
    info!(
        "Loaded checkpoint of {} records after iteration {} in {}",
        checkpoint.records.len(),
        checkpoint.completed_iterations,
        timer.elapsed().to_seconds_string()
    );
    Ok(checkpoint)
}

fn check_directory(checkpoint_dir: &str) -> Result<(), RankFlowError> {
    if Path::new(checkpoint_dir).is_dir() {
        Ok(())
    } else {
        Err(RankFlowError::NotDirectory(checkpoint_dir.to_owned()))
    }
}

fn get_file_path(checkpoint_dir: &str) -> String {
    format!("{}/{}.{}", checkpoint_dir, CHECKPOINT_FILE, CHECKPOINT_EXTENSION)
}
