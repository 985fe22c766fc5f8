use crate::error::RankFlowError;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter};

pub fn get_buf_reader(file_path: &str) -> Result<BufReader<File>, RankFlowError> {
    Ok(BufReader::new(
        File::open(file_path)
            .map_err(|e| RankFlowError::ReadFile(file_path.to_owned(), e.to_string()))?,
    ))
}

pub fn get_file_lines(file_path: &str) -> Result<impl Iterator<Item = String>, RankFlowError> {
    Ok(get_buf_reader(file_path)?.lines().filter_map(Result::ok))
}

pub fn get_buf_writer(file_path: &str) -> Result<BufWriter<File>, RankFlowError> {
    Ok(BufWriter::new(
        File::create(file_path)
            .map_err(|e| RankFlowError::CreateFile(file_path.to_owned(), e.to_string()))?,
    ))
}
