//! # evalflow-core
//!
//! Runs the evaluation flow: evaluate the prompt, generate content, evaluate
//! the generated content. Each stage is retried independently with
//! exponential backoff; the first stage to exhaust its retries ends the flow
//! with a [`FlowOutcome::Failed`] that keeps everything obtained so far.

mod error;
mod outcome;
mod request;
mod result;
mod retry;
mod runner;
mod sink;

pub use error::{FlowError, PersistError};
pub use outcome::FlowOutcome;
pub use request::{
    FlowRequest, DEFAULT_PROMPT_METRICS, DEFAULT_RESPONSE_METRICS, PROMPT_EVALUATION_TASK,
    RESPONSE_EVALUATION_TASK,
};
pub use result::FlowResult;
pub use retry::{
    Delay, RetryCallback, RetryNotice, RetryPolicy, TokioDelay, DEFAULT_BASE_DELAY,
    DEFAULT_MAX_RETRIES,
};
pub use runner::{generate_text, stage_retry_callback, FlowRunner};
pub use sink::PersistenceSink;

pub use evalflow_logging::FlowStage;
