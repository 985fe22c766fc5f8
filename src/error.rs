use rankflow_api::BucketId;

#[derive(Debug)]
pub enum RankFlowError {
    Generic(String),
    ReadFile(String, String),
    CreateFile(String, String),
    WriteFile(String, String),
    Parsing(String),
    RecordParse(usize, String, String),
    DuplicateNode(String, String),
    Config(String),
    PartitionMismatch { router: usize, runtime: usize },
    BucketOutOfRange { bucket: BucketId, fan_out: usize },
    Serialize(String, String),
    Deserialize(String, String),
    NotDirectory(String),
    Worker(String),
}

impl std::fmt::Display for RankFlowError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            RankFlowError::Generic(msg) => write!(f, "[RankFlowError] {}", msg)?,
            RankFlowError::ReadFile(file_path, e) => {
                write!(f, "[IOError] Could not open file '{}' for reading: {}", file_path, e)?;
            }
            RankFlowError::CreateFile(file_path, e) => {
                write!(f, "[IOError] Could not create file '{}' for writing: {}", file_path, e)?;
            }
            RankFlowError::WriteFile(file_path, e) => {
                write!(f, "[IOError] Could not write to '{}': {}", file_path, e)?;
            }
            RankFlowError::Parsing(message) => write!(f, "[ParsingError] {}", message)?,
            RankFlowError::RecordParse(line, file, message) => write!(
                f,
                "[ParsingError] Could not parse record at line {} in file '{}': {}",
                line, file, message
            )?,
            RankFlowError::DuplicateNode(id, file) => {
                write!(f, "[ParsingError] Duplicate node id '{}' found in file '{}'", id, file)?;
            }
            RankFlowError::Config(message) => write!(f, "[ConfigError] {}", message)?,
            RankFlowError::PartitionMismatch { router, runtime } => write!(
                f,
                "[PartitionError] Router hashes into {} buckets but the runtime fans out to {} \
                 workers",
                router, runtime
            )?,
            RankFlowError::BucketOutOfRange { bucket, fan_out } => write!(
                f,
                "[PartitionError] Message addressed to bucket {} but only {} buckets exist",
                bucket, fan_out
            )?,
            RankFlowError::Serialize(name, e) => {
                write!(f, "[SerdeError] Could not serialize '{}': {}", name, e)?;
            }
            RankFlowError::Deserialize(name, e) => {
                write!(f, "[SerdeError] Could not deserialize '{}': {}", name, e)?;
            }
            RankFlowError::NotDirectory(path) => {
                write!(f, "[SerdeError] Invalid checkpoint directory: '{}'", path)?;
            }
            RankFlowError::Worker(message) => write!(f, "[WorkerError] {}", message)?,
        }
        Ok(())
    }
}

pub fn config_error(message: String) -> RankFlowError {
    RankFlowError::Config(message)
}

pub fn worker_error(message: String) -> RankFlowError {
    RankFlowError::Worker(message)
}
