use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use evalflow_logging::{FlowStage, LogEvent, Logger};
use evalflow_provider::{EvaluationInput, EvaluationProvider, ProviderError, TextGenerationProvider};
use evalflow_report::EvaluationReport;

use crate::error::FlowError;
use crate::outcome::FlowOutcome;
use crate::request::{FlowRequest, PROMPT_EVALUATION_TASK, RESPONSE_EVALUATION_TASK};
use crate::retry::{RetryCallback, RetryNotice, RetryPolicy};
use crate::sink::PersistenceSink;
use crate::FlowResult;

/// One generation attempt. Blank text is an error so it gets retried.
pub async fn generate_text(
    generator: &dyn TextGenerationProvider,
    prompt: &str,
    context: &str,
) -> Result<String, ProviderError> {
    let text = generator.generate(prompt, context).await?;
    if text.trim().is_empty() {
        return Err(ProviderError::EmptyResult);
    }
    Ok(text)
}

/// Create a retry callback that reports failed attempts for a stage
pub fn stage_retry_callback(logger: Arc<Logger>, stage: FlowStage) -> RetryCallback {
    Arc::new(move |notice: &RetryNotice| {
        logger.log(&LogEvent::StageRetrying {
            stage,
            attempt: notice.attempt,
            max_attempts: notice.max_attempts,
            delay_secs: notice.delay.as_secs_f64(),
            error: notice.error.clone(),
        });
    })
}

/// Orchestrates the three-stage evaluation flow
pub struct FlowRunner<'a> {
    generator: &'a dyn TextGenerationProvider,
    evaluator: &'a dyn EvaluationProvider,
    sink: Option<&'a dyn PersistenceSink>,
    retry: RetryPolicy,
    logger: Arc<Logger>,
}

impl<'a> FlowRunner<'a> {
    pub fn new(
        generator: &'a dyn TextGenerationProvider,
        evaluator: &'a dyn EvaluationProvider,
        logger: Arc<Logger>,
    ) -> Self {
        Self {
            generator,
            evaluator,
            sink: None,
            retry: RetryPolicy::default(),
            logger,
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_sink(mut self, sink: &'a dyn PersistenceSink) -> Self {
        self.sink = Some(sink);
        self
    }

    fn create_retry_callback(&self, stage: FlowStage) -> RetryCallback {
        stage_retry_callback(self.logger.clone(), stage)
    }

    /// Run all three stages and return the terminal outcome.
    ///
    /// Stage exhaustion is reported as [`FlowOutcome::Failed`] with whatever
    /// earlier stages produced; this never returns an error.
    pub async fn run(&self, request: &FlowRequest) -> FlowOutcome {
        let started = Instant::now();
        self.logger.log(&LogEvent::FlowStarted {
            prompt_preview: request.prompt_preview(),
            context_chars: request.context.chars().count(),
        });

        let mut result = FlowResult::new();

        match self.run_stages(request, &mut result).await {
            Ok(()) => {
                self.persist(&result);
                let duration = started.elapsed();
                self.logger.log(&LogEvent::FlowCompleted {
                    failed_metrics: result.failed_metrics,
                    duration_secs: duration.as_secs_f64(),
                });
                info!(failed_metrics = result.failed_metrics, "Evaluation flow completed");
                FlowOutcome::completed(result, duration)
            }
            Err(e) => {
                warn!(error = %e, "Evaluation flow failed");
                let duration = started.elapsed();
                let stage = e.stage();
                let error = e.to_string();
                self.logger.log(&LogEvent::FlowFailed {
                    stage,
                    error: error.clone(),
                    duration_secs: duration.as_secs_f64(),
                });
                FlowOutcome::failed(stage, error, result, duration)
            }
        }
    }

    /// Stages run strictly in order; each mutates `result` as soon as it succeeds
    async fn run_stages(
        &self,
        request: &FlowRequest,
        result: &mut FlowResult,
    ) -> Result<(), FlowError> {
        let raw = self.evaluate_prompt(request).await?;
        let report = result.record_prompt_evaluation(raw);
        self.log_metrics(FlowStage::PromptEvaluation, &report);

        let text = self.generate(request).await?;
        result.record_generated_text(text.clone());

        let raw = self.evaluate_response(request, &text).await?;
        let report = result.record_response_evaluation(raw);
        self.log_metrics(FlowStage::ResponseEvaluation, &report);

        Ok(())
    }

    /// Stage 1: evaluate the prompt before anything is generated
    pub async fn evaluate_prompt(&self, request: &FlowRequest) -> Result<Value, FlowError> {
        let evaluator = self.evaluator;
        let metrics = request.prompt_metrics.as_slice();
        let inputs = [EvaluationInput::for_prompt(&request.prompt, &request.context)];
        let inputs = &inputs;

        self.run_stage(FlowStage::PromptEvaluation, || async move {
            evaluator
                .evaluate(PROMPT_EVALUATION_TASK, metrics, inputs)
                .await
        })
        .await
    }

    /// Stage 2: generate content. An empty result counts as a failed attempt.
    pub async fn generate(&self, request: &FlowRequest) -> Result<String, FlowError> {
        let generator = self.generator;

        self.run_stage(FlowStage::ContentGeneration, || {
            generate_text(generator, &request.prompt, &request.context)
        })
        .await
    }

    /// Stage 3: evaluate the generated content
    pub async fn evaluate_response(
        &self,
        request: &FlowRequest,
        generated: &str,
    ) -> Result<Value, FlowError> {
        let evaluator = self.evaluator;
        let metrics = request.response_metrics.as_slice();
        let inputs = [EvaluationInput::for_response(
            &request.prompt,
            generated,
            &request.context,
        )];
        let inputs = &inputs;

        self.run_stage(FlowStage::ResponseEvaluation, || async move {
            evaluator
                .evaluate(RESPONSE_EVALUATION_TASK, metrics, inputs)
                .await
        })
        .await
    }

    async fn run_stage<T, F, Fut>(&self, stage: FlowStage, op: F) -> Result<T, FlowError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        self.logger.log(&LogEvent::StageStarted { stage });
        debug!(%stage, max_attempts = self.retry.max_retries(), "Running stage");
        let started = Instant::now();

        let callback = self.create_retry_callback(stage);
        match self.retry.run_with_callback(op, Some(callback)).await {
            Ok(value) => {
                self.logger.log(&LogEvent::StageCompleted {
                    stage,
                    duration_secs: started.elapsed().as_secs_f64(),
                });
                Ok(value)
            }
            Err(source) => {
                let attempts = self.retry.max_retries();
                self.logger.log(&LogEvent::StageExhausted {
                    stage,
                    attempts,
                    error: source.to_string(),
                });
                Err(FlowError::StageExhausted {
                    stage,
                    attempts,
                    source,
                })
            }
        }
    }

    fn log_metrics(&self, stage: FlowStage, report: &EvaluationReport) {
        let failing = report.metrics.iter().filter(|m| m.is_failing()).count();
        self.logger.log(&LogEvent::MetricsSummary {
            stage,
            total: report.metrics.len(),
            passed: report.passed_metrics().len(),
            failing,
        });
    }

    /// Save the result if a sink is configured. Failures are only logged.
    fn persist(&self, result: &FlowResult) {
        let Some(sink) = self.sink else {
            return;
        };

        match sink.save(result) {
            Ok(()) => self.logger.log(&LogEvent::ResultPersisted {
                destination: sink.destination(),
            }),
            Err(e) => {
                warn!(error = %e, "Failed to save flow result");
                self.logger.log(&LogEvent::PersistFailed {
                    error: e.to_string(),
                });
            }
        }
    }
}
