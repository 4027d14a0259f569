use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

/// The three sequential stages of an evaluation flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowStage {
    PromptEvaluation,
    ContentGeneration,
    ResponseEvaluation,
}

impl FlowStage {
    /// 1-based position in the flow
    pub fn number(&self) -> usize {
        match self {
            FlowStage::PromptEvaluation => 1,
            FlowStage::ContentGeneration => 2,
            FlowStage::ResponseEvaluation => 3,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            FlowStage::PromptEvaluation => "PROMPT EVALUATION",
            FlowStage::ContentGeneration => "CONTENT GENERATION",
            FlowStage::ResponseEvaluation => "RESPONSE EVALUATION",
        }
    }
}

impl std::fmt::Display for FlowStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FlowStage::PromptEvaluation => write!(f, "prompt evaluation"),
            FlowStage::ContentGeneration => write!(f, "content generation"),
            FlowStage::ResponseEvaluation => write!(f, "response evaluation"),
        }
    }
}

/// Structured log events for the evaluation flow
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LogEvent {
    FlowStarted {
        prompt_preview: String,
        context_chars: usize,
    },
    StageStarted {
        stage: FlowStage,
    },
    /// An attempt failed and another one is scheduled
    StageRetrying {
        stage: FlowStage,
        attempt: usize,
        max_attempts: usize,
        delay_secs: f64,
        error: String,
    },
    StageCompleted {
        stage: FlowStage,
        duration_secs: f64,
    },
    MetricsSummary {
        stage: FlowStage,
        total: usize,
        passed: usize,
        failing: usize,
    },
    StageExhausted {
        stage: FlowStage,
        attempts: usize,
        error: String,
    },
    FlowCompleted {
        failed_metrics: bool,
        duration_secs: f64,
    },
    FlowFailed {
        stage: FlowStage,
        error: String,
        duration_secs: f64,
    },
    ResultPersisted {
        destination: String,
    },
    PersistFailed {
        error: String,
    },
}

impl LogEvent {
    /// Add a timestamp to serialize with the event
    fn with_timestamp(&self) -> serde_json::Value {
        let mut value = serde_json::to_value(self).unwrap_or_default();
        if let Some(obj) = value.as_object_mut() {
            obj.insert(
                "timestamp".to_string(),
                serde_json::Value::String(chrono::Utc::now().to_rfc3339()),
            );
        }
        value
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable format with colors and visual structure
    #[default]
    Pretty,
    /// JSON lines format for machine consumption
    Json,
    /// Compact single-line format
    Compact,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            "compact" => Ok(LogFormat::Compact),
            _ => Err(format!("Unknown log format: {}", s)),
        }
    }
}

/// Logger for flow events - handles both console output and file logging
pub struct Logger {
    format: LogFormat,
    quiet: bool,
    file_writer: Option<Mutex<File>>,
}

impl Logger {
    pub fn new(format: LogFormat) -> Self {
        Self {
            format,
            quiet: false,
            file_writer: None,
        }
    }

    /// A logger that writes nothing to the console
    pub fn silent() -> Self {
        Self {
            format: LogFormat::Compact,
            quiet: true,
            file_writer: None,
        }
    }

    /// Create a logger with file output in addition to console
    pub fn with_file(format: LogFormat, log_path: &Path) -> std::io::Result<Self> {
        if let Some(parent) = log_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_path)?;

        Ok(Self {
            format,
            quiet: false,
            file_writer: Some(Mutex::new(file)),
        })
    }

    pub fn log(&self, event: &LogEvent) {
        // File output is always JSON
        if let Some(ref writer) = self.file_writer {
            if let Ok(mut file) = writer.lock() {
                let json = event.with_timestamp();
                let _ = writeln!(file, "{}", json);
            }
        }

        if self.quiet {
            return;
        }

        match self.format {
            LogFormat::Json => self.log_json(event),
            LogFormat::Pretty => self.log_pretty(event),
            LogFormat::Compact => self.log_compact(event),
        }
    }

    fn log_json(&self, event: &LogEvent) {
        if let Ok(json) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{}", json);
        }
    }

    fn log_pretty(&self, event: &LogEvent) {
        let mut stderr = std::io::stderr();
        match event {
            LogEvent::FlowStarted {
                prompt_preview,
                context_chars,
            } => {
                let _ = writeln!(stderr);
                let _ = writeln!(
                    stderr,
                    "{}",
                    "╭─────────────────────────────────────────────────────────────────────╮"
                        .bright_blue()
                );
                let _ = writeln!(
                    stderr,
                    "{}  {}{}",
                    "│".bright_blue(),
                    "evalflow".bold().bright_white(),
                    " ".repeat(59) + &"│".bright_blue().to_string()
                );
                let _ = writeln!(
                    stderr,
                    "{}  {} {}",
                    "│".bright_blue(),
                    "Prompt:".dimmed(),
                    Self::truncate_with_padding(prompt_preview, 60, 68).dimmed()
                );
                let _ = writeln!(
                    stderr,
                    "{}  {} {}",
                    "│".bright_blue(),
                    "Context:".dimmed(),
                    Self::truncate_with_padding(&format!("{} chars", context_chars), 59, 67)
                        .dimmed()
                );
                let _ = writeln!(
                    stderr,
                    "{}",
                    "╰─────────────────────────────────────────────────────────────────────╯"
                        .bright_blue()
                );
                let _ = writeln!(stderr);
            }
            LogEvent::StageStarted { stage } => {
                let _ = writeln!(
                    stderr,
                    "  {} {} {}",
                    "▶".bright_cyan(),
                    format!("[{}/3]", stage.number()).dimmed(),
                    stage.label().bright_cyan().bold()
                );
            }
            LogEvent::StageRetrying {
                attempt,
                max_attempts,
                delay_secs,
                error,
                ..
            } => {
                let _ = writeln!(
                    stderr,
                    "    {} Attempt {}/{} failed: {}",
                    "↻".bright_yellow(),
                    attempt,
                    max_attempts,
                    error.yellow()
                );
                let _ = writeln!(
                    stderr,
                    "    {}",
                    format!("retrying in {:.2}s", delay_secs).dimmed()
                );
            }
            LogEvent::StageCompleted { duration_secs, .. } => {
                let _ = writeln!(
                    stderr,
                    "    {} Done ({:.1}s)",
                    "✓".bright_green(),
                    duration_secs
                );
            }
            LogEvent::MetricsSummary {
                total,
                passed,
                failing,
                ..
            } => {
                let summary = format!(
                    "{} {}, {} passed, {} failing",
                    total,
                    if *total == 1 { "metric" } else { "metrics" },
                    passed,
                    failing
                );
                if *failing > 0 {
                    let _ = writeln!(stderr, "    {} {}", "📊".dimmed(), summary.bright_red());
                } else {
                    let _ = writeln!(stderr, "    {} {}", "📊".dimmed(), summary.dimmed());
                }
                let _ = writeln!(stderr);
            }
            LogEvent::StageExhausted {
                attempts, error, ..
            } => {
                let _ = writeln!(
                    stderr,
                    "    {} Gave up after {} {}: {}",
                    "✗".bright_red(),
                    attempts,
                    if *attempts == 1 { "attempt" } else { "attempts" },
                    error.bright_red()
                );
                let _ = writeln!(stderr);
            }
            LogEvent::FlowCompleted { .. } | LogEvent::FlowFailed { .. } => {
                // Final outcome is printed by the binary
            }
            LogEvent::ResultPersisted { destination } => {
                let _ = writeln!(
                    stderr,
                    "  {} {} {}",
                    "💾".dimmed(),
                    "Saved result to".dimmed(),
                    destination.dimmed()
                );
            }
            LogEvent::PersistFailed { error } => {
                let _ = writeln!(
                    stderr,
                    "  {} Failed to save result: {}",
                    "⚠".bright_yellow(),
                    error
                );
            }
        }
    }

    fn log_compact(&self, event: &LogEvent) {
        let mut stderr = std::io::stderr();
        let timestamp = chrono::Utc::now().format("%H:%M:%S");
        let msg = match event {
            LogEvent::FlowStarted { .. } => format!("[{}] flow:start", timestamp),
            LogEvent::StageStarted { stage } => {
                format!("[{}] stage:start:{}", timestamp, stage.number())
            }
            LogEvent::StageRetrying {
                stage,
                attempt,
                max_attempts,
                delay_secs,
                ..
            } => format!(
                "[{}] stage:retry:{} {}/{} wait={:.2}s",
                timestamp,
                stage.number(),
                attempt,
                max_attempts,
                delay_secs
            ),
            LogEvent::StageCompleted {
                stage,
                duration_secs,
            } => format!(
                "[{}] stage:done:{} {:.1}s",
                timestamp,
                stage.number(),
                duration_secs
            ),
            LogEvent::MetricsSummary {
                stage,
                total,
                failing,
                ..
            } => format!(
                "[{}] metrics:{} total={} failing={}",
                timestamp,
                stage.number(),
                total,
                failing
            ),
            LogEvent::StageExhausted {
                stage,
                attempts,
                error,
            } => format!(
                "[{}] stage:exhausted:{} attempts={} {}",
                timestamp,
                stage.number(),
                attempts,
                error
            ),
            LogEvent::FlowCompleted {
                failed_metrics,
                duration_secs,
            } => format!(
                "[{}] flow:done failed_metrics={} {:.1}s",
                timestamp, failed_metrics, duration_secs
            ),
            LogEvent::FlowFailed {
                stage,
                duration_secs,
                ..
            } => format!(
                "[{}] flow:failed:{} {:.1}s",
                timestamp,
                stage.number(),
                duration_secs
            ),
            LogEvent::ResultPersisted { destination } => {
                format!("[{}] saved:{}", timestamp, destination)
            }
            LogEvent::PersistFailed { error } => format!("[{}] save:error {}", timestamp, error),
        };
        let _ = writeln!(stderr, "{}", msg);
    }

    /// Truncate a string and pad to exact width
    fn truncate_with_padding(s: &str, max_len: usize, total_width: usize) -> String {
        let char_count = s.chars().count();
        let truncated = if char_count > max_len {
            let head: String = s.chars().take(max_len - 3).collect();
            format!("{}...", head)
        } else {
            s.to_string()
        };

        let padding_needed = total_width.saturating_sub(truncated.chars().count() + 1); // +1 for trailing │
        format!("{}{}│", truncated, " ".repeat(padding_needed))
    }
}
