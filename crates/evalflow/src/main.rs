mod config;
mod output;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::{info, warn};

use evalflow_core::{
    generate_text, stage_retry_callback, FlowRequest, FlowRunner, FlowStage, PersistenceSink,
    RetryPolicy, DEFAULT_MAX_RETRIES, PROMPT_EVALUATION_TASK,
};
use evalflow_logging::{LogEvent, LogFormat, Logger, ResultWriter};
use evalflow_provider::{
    create_generator, EvaluationInput, EvaluationProvider, GeneratorConfig, InspeqEvaluator,
    ProviderKind, TextGenerationProvider,
};
use evalflow_report::EvaluationReport;

use config::{ProjectConfig, Secrets};

#[derive(Parser, Debug)]
#[command(
    name = "evalflow",
    about = "Evaluate a prompt, generate content from it, and evaluate the result",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Working directory for evalflow.toml and relative paths (default: current directory)
    #[arg(short = 'd', long, global = true)]
    working_dir: Option<PathBuf>,

    /// Log output format
    #[arg(long, value_enum, default_value = "pretty", global = true)]
    log_format: LogFormatChoice,

    /// Tracing level when RUST_LOG is not set
    #[arg(long, default_value = "warn", global = true)]
    log_level: String,

    /// Also write JSON logs to evalflow.log in this directory
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the full flow: evaluate prompt, generate, evaluate response
    Run(RunArgs),
    /// Evaluate the prompt only
    EvaluatePrompt(FlowArgs),
    /// Generate content only
    Generate(FlowArgs),
    /// Print the reports in a saved evaluation or result file
    Report {
        /// Raw evaluation JSON, `run --json-output` output, or a JSONL result file
        file: PathBuf,
    },
}

#[derive(Args, Debug)]
struct FlowArgs {
    /// Prompt text (or reads from --prompt-file if not provided)
    #[arg(short, long)]
    prompt: Option<String>,

    /// Path to prompt file
    #[arg(long, default_value = "prompt.md")]
    prompt_file: PathBuf,

    /// Context text for generation
    #[arg(short, long, conflicts_with = "context_file")]
    context: Option<String>,

    /// Path to a file holding the context
    #[arg(long)]
    context_file: Option<PathBuf>,

    /// Metric for the prompt evaluation (repeatable)
    #[arg(long = "prompt-metric")]
    prompt_metrics: Vec<String>,

    /// Metric for the response evaluation (repeatable)
    #[arg(long = "response-metric")]
    response_metrics: Vec<String>,

    /// Attempts per stage
    #[arg(short = 'n', long)]
    max_retries: Option<usize>,

    /// Text generation backend
    #[arg(long, value_enum)]
    provider: Option<ProviderChoice>,

    /// Model to use for generation
    #[arg(short, long)]
    model: Option<String>,

    /// Dry run: show what would happen without calling any provider
    #[arg(long)]
    dry_run: bool,
}

#[derive(Args, Debug)]
struct RunArgs {
    #[command(flatten)]
    flow: FlowArgs,

    /// Output the final outcome as JSON
    #[arg(long)]
    json_output: bool,

    /// Directory for result files (default: [output].results_dir, then the data dir)
    #[arg(long)]
    results_dir: Option<PathBuf>,

    /// Do not write a result file
    #[arg(long)]
    no_save: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ProviderChoice {
    Anthropic,
    ClaudeCli,
}

impl From<ProviderChoice> for ProviderKind {
    fn from(choice: ProviderChoice) -> Self {
        match choice {
            ProviderChoice::Anthropic => ProviderKind::Anthropic,
            ProviderChoice::ClaudeCli => ProviderKind::ClaudeCli,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormatChoice {
    Pretty,
    Json,
    Compact,
}

impl From<LogFormatChoice> for LogFormat {
    fn from(choice: LogFormatChoice) -> Self {
        match choice {
            LogFormatChoice::Pretty => LogFormat::Pretty,
            LogFormatChoice::Json => LogFormat::Json,
            LogFormatChoice::Compact => LogFormat::Compact,
        }
    }
}

/// Everything resolved from flags, config file and environment
struct Settings {
    working_dir: PathBuf,
    config: ProjectConfig,
    secrets: Secrets,
    logger: Arc<Logger>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_format: LogFormat = cli.log_format.into();
    let guard = evalflow_logging::init_tracing(&cli.log_level, log_format, cli.log_dir.as_deref());

    let working_dir = match cli.working_dir.clone() {
        Some(dir) => dir,
        None => std::env::current_dir().context("Failed to get current directory")?,
    };

    let config = ProjectConfig::load(&working_dir)?.unwrap_or_default();
    let settings = Settings {
        working_dir,
        config,
        secrets: Secrets::from_env(),
        logger: Arc::new(Logger::new(log_format)),
    };

    let exit_code = match cli.command {
        Command::Run(args) => run_flow(&settings, &args).await?,
        Command::EvaluatePrompt(args) => evaluate_prompt(&settings, &args).await?,
        Command::Generate(args) => generate(&settings, &args).await?,
        Command::Report { file } => {
            output::print_report_file(&settings.working_dir.join(file))?;
            0
        }
    };

    // Flush buffered file logs before exiting
    drop(guard);
    std::process::exit(exit_code);
}

async fn run_flow(settings: &Settings, args: &RunArgs) -> Result<i32> {
    let request = build_request(settings, &args.flow)?;
    let kind = settings.config.provider_kind(args.flow.provider.map(Into::into))?;
    let retry = retry_policy(settings, &args.flow)?;

    if args.flow.dry_run {
        output::print_dry_run(&request, kind, &retry);
        return Ok(0);
    }

    let generator = build_generator(settings, &args.flow, kind)?;
    let evaluator = build_evaluator(settings)?;
    let writer = if args.no_save {
        None
    } else {
        open_result_writer(settings, args.results_dir.as_deref(), &request.prompt)
    };

    let mut runner = FlowRunner::new(generator.as_ref(), &evaluator, settings.logger.clone())
        .with_retry_policy(retry);
    if let Some(ref writer) = writer {
        runner = runner.with_sink(writer as &dyn PersistenceSink);
    }

    let outcome = runner.run(&request).await;

    if args.json_output {
        let json = serde_json::to_string_pretty(&outcome)?;
        println!("{}", json);
    } else {
        output::print_outcome(&outcome);
    }

    Ok(outcome.exit_code())
}

async fn evaluate_prompt(settings: &Settings, args: &FlowArgs) -> Result<i32> {
    let request = build_request(settings, args)?;
    let retry = retry_policy(settings, args)?;

    if args.dry_run {
        let kind = settings.config.provider_kind(args.provider.map(Into::into))?;
        output::print_dry_run(&request, kind, &retry);
        return Ok(0);
    }

    let evaluator = build_evaluator(settings)?;
    let inputs = [EvaluationInput::for_prompt(&request.prompt, &request.context)];
    let stage = FlowStage::PromptEvaluation;

    settings.logger.log(&LogEvent::StageStarted { stage });
    let callback = stage_retry_callback(settings.logger.clone(), stage);
    let raw = retry
        .run_with_callback(
            || evaluator.evaluate(PROMPT_EVALUATION_TASK, &request.prompt_metrics, &inputs),
            Some(callback),
        )
        .await
        .with_context(|| format!("{} failed after {} attempt(s)", stage, retry.max_retries()))?;

    let report = EvaluationReport::from_value(&raw);
    output::print_report("Prompt Evaluation Results", &report);
    Ok(0)
}

async fn generate(settings: &Settings, args: &FlowArgs) -> Result<i32> {
    let request = build_request(settings, args)?;
    let kind = settings.config.provider_kind(args.provider.map(Into::into))?;
    let retry = retry_policy(settings, args)?;

    if args.dry_run {
        output::print_dry_run(&request, kind, &retry);
        return Ok(0);
    }

    let generator = build_generator(settings, args, kind)?;
    let stage = FlowStage::ContentGeneration;

    settings.logger.log(&LogEvent::StageStarted { stage });
    let callback = stage_retry_callback(settings.logger.clone(), stage);
    let text = retry
        .run_with_callback(
            || generate_text(generator.as_ref(), &request.prompt, &request.context),
            Some(callback),
        )
        .await
        .with_context(|| format!("{} failed after {} attempt(s)", stage, retry.max_retries()))?;

    println!("{}", text);
    Ok(0)
}

fn build_request(settings: &Settings, args: &FlowArgs) -> Result<FlowRequest> {
    let prompt = get_prompt(args, &settings.working_dir)?;
    let context = get_context(args, &settings.working_dir)?;

    let mut request = FlowRequest::new(prompt).with_context(context);
    if let Some(metrics) = settings.config.prompt_metrics(&args.prompt_metrics) {
        request = request.with_prompt_metrics(metrics);
    }
    if let Some(metrics) = settings.config.response_metrics(&args.response_metrics) {
        request = request.with_response_metrics(metrics);
    }
    Ok(request)
}

fn retry_policy(settings: &Settings, args: &FlowArgs) -> Result<RetryPolicy> {
    let max_retries = settings
        .config
        .max_retries(args.max_retries)
        .unwrap_or(DEFAULT_MAX_RETRIES);

    let mut policy = RetryPolicy::new(max_retries);
    if let Some(base_delay) = settings.config.base_delay()? {
        policy = policy.with_base_delay(base_delay);
    }
    Ok(policy)
}

fn build_generator(
    settings: &Settings,
    args: &FlowArgs,
    kind: ProviderKind,
) -> Result<Box<dyn TextGenerationProvider>> {
    let section = &settings.config.generator;

    let mut config = GeneratorConfig::default().with_working_dir(settings.working_dir.clone());
    if let Some(model) = args.model.as_deref().or(section.model.as_deref()) {
        config.model = model.to_string();
    }
    if let Some(max_tokens) = section.max_tokens {
        config = config.with_max_tokens(max_tokens);
    }
    if let Some(secs) = section.timeout_secs {
        config = config.with_timeout(Duration::from_secs(secs));
    }

    let api_key = settings.secrets.require_generator(kind)?;
    let generator = create_generator(kind, config, api_key)
        .with_context(|| format!("Failed to create {} generator", kind))?;
    info!(provider = generator.name(), "Generator ready");
    Ok(generator)
}

fn build_evaluator(settings: &Settings) -> Result<InspeqEvaluator> {
    let (api_key, project_id) = settings.secrets.require_evaluator()?;

    let mut evaluator = InspeqEvaluator::new(api_key, project_id);
    if let Some(ref base_url) = settings.config.evaluator.base_url {
        evaluator = evaluator.with_base_url(base_url.clone());
    }
    info!(provider = evaluator.name(), "Evaluator ready");
    Ok(evaluator)
}

/// Persistence is best effort; a writer that cannot be opened only warns
fn open_result_writer(settings: &Settings, cli_dir: Option<&Path>, prompt: &str) -> Option<ResultWriter> {
    let opened = match settings.config.results_dir(cli_dir, &settings.working_dir) {
        Some(dir) => ResultWriter::in_dir(&dir, prompt),
        None => ResultWriter::new(prompt),
    };

    match opened {
        Ok(writer) => Some(writer),
        Err(e) => {
            warn!(error = %e, "Could not open result file; results will not be saved");
            None
        }
    }
}

fn get_prompt(args: &FlowArgs, working_dir: &Path) -> Result<String> {
    // Prefer --prompt flag
    if let Some(ref prompt) = args.prompt {
        return Ok(prompt.clone());
    }

    let prompt_path = resolve(working_dir, &args.prompt_file);
    if prompt_path.exists() {
        let content =
            std::fs::read_to_string(&prompt_path).context("Failed to read prompt file")?;
        Ok(content.trim().to_string())
    } else {
        anyhow::bail!(
            "No prompt provided. Use --prompt or create a {} file",
            args.prompt_file.display()
        )
    }
}

fn get_context(args: &FlowArgs, working_dir: &Path) -> Result<String> {
    if let Some(ref context) = args.context {
        return Ok(context.clone());
    }

    match args.context_file {
        Some(ref path) => {
            let path = resolve(working_dir, path);
            std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read context file {}", path.display()))
        }
        None => Ok(String::new()),
    }
}

fn resolve(working_dir: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        working_dir.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(dir: &Path) -> Settings {
        Settings {
            working_dir: dir.to_path_buf(),
            config: ProjectConfig::default(),
            secrets: Secrets::from_lookup(|_| None),
            logger: Arc::new(Logger::silent()),
        }
    }

    fn parse_flow_args(extra: &[&str]) -> FlowArgs {
        let mut argv = vec!["evalflow", "generate"];
        argv.extend_from_slice(extra);
        match Cli::parse_from(argv).command {
            Command::Generate(args) => args,
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_prompt_flag_wins_over_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("prompt.md"), "from file").unwrap();

        let args = parse_flow_args(&["--prompt", "from flag"]);
        assert_eq!(get_prompt(&args, dir.path()).unwrap(), "from flag");

        let args = parse_flow_args(&[]);
        assert_eq!(get_prompt(&args, dir.path()).unwrap(), "from file");
    }

    #[test]
    fn test_missing_prompt_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let args = parse_flow_args(&[]);
        assert!(get_prompt(&args, dir.path()).is_err());
    }

    #[test]
    fn test_context_defaults_to_empty() {
        let dir = tempfile::tempdir().unwrap();
        let args = parse_flow_args(&["-p", "x"]);
        assert_eq!(get_context(&args, dir.path()).unwrap(), "");

        std::fs::write(dir.path().join("ctx.txt"), "background").unwrap();
        let args = parse_flow_args(&["-p", "x", "--context-file", "ctx.txt"]);
        assert_eq!(get_context(&args, dir.path()).unwrap(), "background");
    }

    #[test]
    fn test_request_uses_repeated_metric_flags() {
        let dir = tempfile::tempdir().unwrap();
        let args = parse_flow_args(&[
            "-p",
            "x",
            "--prompt-metric",
            "COHERENCE",
            "--prompt-metric",
            "TOXICITY",
        ]);

        let request = build_request(&settings(dir.path()), &args).unwrap();
        assert_eq!(request.prompt_metrics, vec!["COHERENCE", "TOXICITY"]);
        assert_eq!(request.response_metrics.len(), 5);
    }

    #[test]
    fn test_retry_policy_from_flags() {
        let dir = tempfile::tempdir().unwrap();
        let args = parse_flow_args(&["-p", "x", "--max-retries", "5"]);
        let policy = retry_policy(&settings(dir.path()), &args).unwrap();
        assert_eq!(policy.max_retries(), 5);

        let args = parse_flow_args(&["-p", "x"]);
        let policy = retry_policy(&settings(dir.path()), &args).unwrap();
        assert_eq!(policy.max_retries(), DEFAULT_MAX_RETRIES);
    }

    #[test]
    fn test_evaluator_requires_credentials() {
        let dir = tempfile::tempdir().unwrap();
        let err = build_evaluator(&settings(dir.path())).unwrap_err();
        assert!(err.to_string().contains("INSPEQ_API_KEY"));
    }

    #[test]
    fn test_run_flags_parse() {
        let cli = Cli::parse_from([
            "evalflow",
            "run",
            "-p",
            "Summarize X",
            "--json-output",
            "--provider",
            "claude-cli",
            "--no-save",
        ]);
        match cli.command {
            Command::Run(args) => {
                assert!(args.json_output);
                assert!(args.no_save);
                assert!(matches!(args.flow.provider, Some(ProviderChoice::ClaudeCli)));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }
}
