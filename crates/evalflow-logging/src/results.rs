use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::Utc;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

/// One line of a result file
#[derive(Debug, Serialize)]
struct ResultLine<'a, T: Serialize> {
    timestamp: String,
    data: &'a T,
}

/// Writes flow results as JSONL to a file in the results directory.
///
/// Files are named `<UTC timestamp>_<prompt hash>.jsonl`. The file is
/// created on the first record, so a writer that never writes leaves
/// nothing behind.
pub struct ResultWriter {
    file: Mutex<Option<BufWriter<File>>>,
    path: PathBuf,
}

impl ResultWriter {
    /// Create a writer under `~/.local/share/evalflow/results/`.
    pub fn new(prompt: &str) -> io::Result<Self> {
        Self::in_dir(&Self::default_dir()?, prompt)
    }

    /// Create a writer in `dir`, creating the directory if needed.
    pub fn in_dir(dir: &Path, prompt: &str) -> io::Result<Self> {
        fs::create_dir_all(dir)?;

        let timestamp_str = Utc::now().format("%Y-%m-%dT%H-%M-%SZ").to_string();

        let mut hasher = Sha256::new();
        hasher.update(prompt.as_bytes());
        let hash = hex::encode(hasher.finalize());
        let short_hash = &hash[..6];

        let path = dir.join(format!("{}_{}.jsonl", timestamp_str, short_hash));

        Ok(Self {
            file: Mutex::new(None),
            path,
        })
    }

    /// Returns the path to the result file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one timestamped record.
    pub fn write_record<T: Serialize>(&self, data: &T) -> io::Result<()> {
        let line = ResultLine {
            timestamp: Utc::now().to_rfc3339(),
            data,
        };
        let json = serde_json::to_string(&line)?;

        let mut guard = self
            .file
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "result writer lock poisoned"))?;

        if guard.is_none() {
            // Two flows with the same prompt in the same second share a file
            let file = fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.path)
                .map_err(|e| {
                    warn!(path = %self.path.display(), error = %e, "Failed to open result file");
                    e
                })?;
            debug!(path = %self.path.display(), "Opened result file");
            *guard = Some(BufWriter::new(file));
        }

        if let Some(writer) = guard.as_mut() {
            writeln!(writer, "{}", json)?;
            writer.flush()?;
        }
        Ok(())
    }

    pub fn default_dir() -> io::Result<PathBuf> {
        let data_dir = dirs::data_dir().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                "Could not determine data directory",
            )
        })?;
        Ok(data_dir.join("evalflow").join("results"))
    }
}
