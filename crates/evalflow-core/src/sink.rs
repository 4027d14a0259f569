use evalflow_logging::ResultWriter;

use crate::{FlowResult, PersistError};

/// Best-effort storage for completed flow results.
///
/// Failures are logged by the runner and never change the flow outcome.
pub trait PersistenceSink: Send + Sync {
    /// Where results go, for log output
    fn destination(&self) -> String;

    fn save(&self, result: &FlowResult) -> Result<(), PersistError>;
}

impl PersistenceSink for ResultWriter {
    fn destination(&self) -> String {
        self.path().display().to_string()
    }

    fn save(&self, result: &FlowResult) -> Result<(), PersistError> {
        self.write_record(result)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_result_writer_persists_flow_result() {
        let dir = TempDir::new().unwrap();
        let writer = ResultWriter::in_dir(dir.path(), "Summarize X").unwrap();

        let result = FlowResult {
            generated_text: Some("X is ...".into()),
            failed_metrics: true,
            ..Default::default()
        };
        writer.save(&result).unwrap();

        let content = std::fs::read_to_string(writer.path()).unwrap();
        let line: serde_json::Value = serde_json::from_str(content.trim()).unwrap();
        assert_eq!(line["data"]["generated_text"], "X is ...");
        assert_eq!(line["data"]["failed_metrics"], true);
        assert!(writer.destination().ends_with(".jsonl"));
    }
}
