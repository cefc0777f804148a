//! Persisted queue files.
//!
//! One wire request per line (JSON Lines). Blank lines are ignored.

use outbox_protocol::{ProtocolError, Request, WireRequest};
use std::fs;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use thiserror::Error;

/// Errors reading or writing a queue file.
#[derive(Error, Debug)]
pub enum QueueFileError {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A line could not be admitted as a request.
    #[error("line {line}: {source}")]
    Parse {
        /// 1-based line number.
        line: usize,
        /// Underlying error.
        source: ProtocolError,
    },

    /// A request could not be encoded.
    #[error("encode error: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Loads every request in a queue file, in file order.
pub fn load(path: &Path) -> Result<Vec<Request>, QueueFileError> {
    let reader = BufReader::new(fs::File::open(path)?);
    let mut requests = Vec::new();

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let request = WireRequest::from_json(&line)
            .and_then(WireRequest::into_request)
            .map_err(|source| QueueFileError::Parse {
                line: index + 1,
                source,
            })?;
        requests.push(request);
    }

    Ok(requests)
}

/// Rewrites a queue file with `requests`.
pub fn save(path: &Path, requests: &[Request]) -> Result<(), QueueFileError> {
    let mut writer = BufWriter::new(fs::File::create(path)?);
    for request in requests {
        serde_json::to_writer(&mut writer, &WireRequest::from(request))?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(())
}
