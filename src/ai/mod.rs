pub mod client;
pub mod headline_parser;
pub mod html;
pub mod pricing;
pub mod prompts;
pub mod templates;

pub use client::{extract_json, AnthropicClient, LlmClient, LlmCompletion, LlmError, LlmRequest};

use tracing::{debug, warn};

/// Runs one completion under the request's timeout.
///
/// Hitting the timeout drops the in-flight future, which aborts the outbound HTTP request.
/// The returned text is trimmed and never empty.
pub async fn generate(client: &dyn LlmClient, request: &LlmRequest) -> Result<LlmCompletion, LlmError> {
    let started = std::time::Instant::now();
    let outcome = tokio::time::timeout(request.timeout, client.complete(request)).await;

    let mut completion = match outcome {
        Ok(result) => result?,
        Err(_) => {
            warn!(timeout_secs = request.timeout.as_secs(), model = client.model(), "LLM request timed out");
            return Err(LlmError::Timeout(request.timeout));
        }
    };

    completion.text = completion.text.trim().to_string();
    if completion.text.is_empty() {
        return Err(LlmError::EmptyResponse);
    }
    debug!(
        model = %completion.model,
        input_tokens = completion.input_tokens,
        output_tokens = completion.output_tokens,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "LLM completion"
    );
    Ok(completion)
}
