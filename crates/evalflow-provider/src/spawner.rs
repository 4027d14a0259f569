use std::path::Path;
use std::process::Stdio;
use std::time::Instant;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tracing::{debug, warn};

use crate::{GeneratorConfig, ProcessOutput, ProviderError};

/// Runs a CLI-backed provider to completion and captures what it printed
pub struct ProcessSpawner;

impl ProcessSpawner {
    /// Spawn `binary` with `args`, honouring the working directory, extra
    /// environment and timeout from `config`.
    ///
    /// The child is killed if the timeout elapses or the future is dropped.
    pub async fn spawn(
        binary: &Path,
        args: &[&str],
        config: &GeneratorConfig,
    ) -> Result<ProcessOutput, ProviderError> {
        let start = Instant::now();

        debug!(
            binary = %binary.display(),
            arg_count = args.len(),
            "Spawning provider process"
        );

        let mut cmd = Command::new(binary);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        if let Some(ref dir) = config.working_dir {
            cmd.current_dir(dir);
        }
        cmd.envs(&config.env_vars);

        let mut child = cmd.spawn()?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ProviderError::InvalidResponse("stdout not captured".into()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| ProviderError::InvalidResponse("stderr not captured".into()))?;

        let collect = async {
            let (stdout, stderr) = tokio::try_join!(read_all(stdout), read_all(stderr))?;
            let status = child.wait().await?;
            Ok::<_, std::io::Error>((stdout, stderr, status))
        };

        let (stdout, stderr, status) = match config.timeout {
            Some(limit) => match tokio::time::timeout(limit, collect).await {
                Ok(result) => result?,
                Err(_) => {
                    warn!(binary = %binary.display(), ?limit, "Provider process timed out");
                    return Err(ProviderError::Timeout(limit));
                }
            },
            None => collect.await?,
        };

        let output = ProcessOutput {
            stdout,
            stderr,
            exit_code: status.code().unwrap_or(-1),
            duration: start.elapsed(),
        };

        debug!(
            exit_code = output.exit_code,
            duration_ms = output.duration.as_millis(),
            stdout_len = output.stdout.len(),
            "Provider process completed"
        );

        Ok(output)
    }
}

/// Invalid UTF-8 is replaced rather than treated as an error
async fn read_all<R: AsyncRead + Unpin>(mut reader: R) -> std::io::Result<String> {
    let mut buf = Vec::new();
    reader.read_to_end(&mut buf).await?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}
