//! Schema-validated generation orchestrator.
//!
//! Turns the provider's unreliable "text from a prompt" primitive into a
//! typed, validated, retried, fail-safe-bounded operation. Every call shape
//! funnels through one bounded attempt loop with an explicit three-way
//! per-iteration outcome; adapter errors, parse failures, constraint
//! failures, and predicate rejections each consume exactly one attempt.
//!
//! Exhausting the retry budget is a normal termination path, not an error:
//! the caller's fail-safe value is returned verbatim and nothing is ever
//! raised. A single misbehaving generation must never abort a larger
//! simulation step.

use std::sync::Arc;

use serde_json::{json, Value};

use crate::error::{AdapterError, ValidationError};
use crate::legacy;
use crate::provider::{GenerationOptions, GenerationProvider};
use crate::schema::{self, CognitiveFunction, TypedResponse};

/// Default number of attempts before falling back.
pub const DEFAULT_RETRY_BUDGET: u32 = 3;

// ---------------------------------------------------------------------------
// Caller-supplied strategies
// ---------------------------------------------------------------------------

/// Acceptance check applied after schema validation succeeds.
///
/// Returning `false` consumes the attempt and retries; it is how callers
/// express domain checks the schema cannot, e.g. "must name an accessible
/// location".
pub trait Predicate<T>: Send + Sync {
    fn accept(&self, value: &T, prompt: &str) -> bool;
}

impl<T, F> Predicate<T> for F
where
    F: Fn(&T, &str) -> bool + Send + Sync,
{
    fn accept(&self, value: &T, prompt: &str) -> bool {
        self(value, prompt)
    }
}

/// Cleanup applied to an accepted value before it is returned.
pub trait Transform<T, U = T>: Send + Sync {
    fn apply(&self, value: T, prompt: &str) -> U;
}

impl<T, U, F> Transform<T, U> for F
where
    F: Fn(T, &str) -> U + Send + Sync,
{
    fn apply(&self, value: T, prompt: &str) -> U {
        self(value, prompt)
    }
}

// ---------------------------------------------------------------------------
// Attempt outcome
// ---------------------------------------------------------------------------

/// Outcome of a single attempt inside the retry loop.
enum Attempt<T> {
    Success(T),
    AdapterFailure(AdapterError),
    Invalid(ValidationError),
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

/// Drives validated generation against a [`GenerationProvider`].
///
/// Attempts are strictly sequential; a failed attempt mutates no state, so
/// retrying is always safe.
pub struct SafeGenerator {
    provider: Arc<dyn GenerationProvider>,
}

impl SafeGenerator {
    pub fn new(provider: Arc<dyn GenerationProvider>) -> Self {
        Self { provider }
    }

    /// The single retry core. `request_prompt` goes to the provider;
    /// `caller_prompt` is what predicates see (the two differ for the
    /// simple-string shape, which wraps the caller's prompt).
    async fn run_attempts<T>(
        &self,
        request_prompt: &str,
        caller_prompt: &str,
        options: &GenerationOptions,
        retry_budget: u32,
        decode: &(dyn Fn(&str) -> Result<T, ValidationError> + Send + Sync),
        accept: Option<&dyn Predicate<T>>,
    ) -> Option<T> {
        for attempt in 1..=retry_budget {
            let outcome = match self.provider.request(request_prompt, options).await {
                Err(err) => Attempt::AdapterFailure(err),
                Ok(raw) => match decode(raw.trim()) {
                    Err(err) => Attempt::Invalid(err),
                    Ok(value) => match accept {
                        Some(predicate) if !predicate.accept(&value, caller_prompt) => {
                            Attempt::Invalid(ValidationError::Rejected)
                        }
                        _ => Attempt::Success(value),
                    },
                },
            };

            match outcome {
                Attempt::Success(value) => {
                    log::debug!("generation accepted on attempt {attempt}/{retry_budget}");
                    return Some(value);
                }
                Attempt::AdapterFailure(err) => {
                    log::debug!("attempt {attempt}/{retry_budget} adapter failure: {err}");
                }
                Attempt::Invalid(err) => {
                    log::debug!("attempt {attempt}/{retry_budget} invalid output: {err}");
                }
            }
        }

        log::warn!("retry budget of {retry_budget} exhausted; falling back");
        None
    }

    /// The "simple string" shape: a free-text answer wrapped in a minimal
    /// one-field schema at the boundary so it rides the same retry and
    /// validation plumbing as rich schemas.
    ///
    /// `example_output` and `special_instruction` steer the provider toward
    /// the expected `{"output": ...}` envelope. On exhaustion, `fail_safe`
    /// is returned verbatim.
    pub async fn safe_generate_text(
        &self,
        prompt: &str,
        example_output: &str,
        special_instruction: &str,
        retry_budget: u32,
        fail_safe: String,
        accept: Option<&dyn Predicate<String>>,
        cleanup: Option<&dyn Transform<String>>,
    ) -> String {
        let request_prompt = wrap_text_prompt(prompt, example_output, special_instruction);
        let options = GenerationOptions::with_schema(text_output_schema());

        let result = self
            .run_attempts(
                &request_prompt,
                prompt,
                &options,
                retry_budget,
                &decode_text_output,
                accept,
            )
            .await;

        match result {
            Some(value) => match cleanup {
                Some(transform) => transform.apply(value, prompt),
                None => value,
            },
            None => fail_safe,
        }
    }

    /// The "rich schema" shape: generation against the structural type
    /// registered for `function`, returning the typed value.
    ///
    /// `None` means the budget was exhausted; the caller owns the fallback.
    pub async fn safe_generate_typed(
        &self,
        function: CognitiveFunction,
        prompt: &str,
        retry_budget: u32,
        accept: Option<&dyn Predicate<TypedResponse>>,
    ) -> Option<TypedResponse> {
        let options = GenerationOptions {
            response_schema: Some(function.schema().clone()),
            schema_name: Some(function.as_str().to_string()),
            ..GenerationOptions::default()
        };

        self.run_attempts(
            prompt,
            prompt,
            &options,
            retry_budget,
            &move |raw: &str| schema::validate(function, raw),
            accept,
        )
        .await
    }

    /// Rich-schema generation projected into the plain-data shape the
    /// function's legacy callers expect. On exhaustion, `fail_safe` is
    /// returned verbatim.
    pub async fn safe_generate(
        &self,
        function: CognitiveFunction,
        prompt: &str,
        retry_budget: u32,
        fail_safe: Value,
    ) -> Value {
        match self
            .safe_generate_typed(function, prompt, retry_budget, None)
            .await
        {
            Some(typed) => legacy::to_domain_shape(&typed, function),
            None => fail_safe,
        }
    }
}

// ---------------------------------------------------------------------------
// Simple-string boundary
// ---------------------------------------------------------------------------

fn wrap_text_prompt(prompt: &str, example_output: &str, special_instruction: &str) -> String {
    format!(
        "\"\"\"\n{prompt}\n\"\"\"\n\
         Output the response to the prompt above in json. {special_instruction}\n\
         Example output json:\n\
         {{\"output\": \"{example_output}\"}}"
    )
}

fn text_output_schema() -> Value {
    json!({
        "type": "object",
        "properties": { "output": {"type": "string"} },
        "required": ["output"],
        "additionalProperties": false
    })
}

fn decode_text_output(raw: &str) -> Result<String, ValidationError> {
    let value = schema::responses::parse_json(raw)?;
    value
        .get("output")
        .and_then(|o| o.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| ValidationError::constraint("output", "required field absent"))
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicU32, Ordering};

    use async_trait::async_trait;

    use crate::error::AdapterError;
    use crate::provider::GenerationOptions;

    /// Stub provider returning a fixed script of responses.
    struct StubProvider {
        responses: Vec<Result<String, AdapterError>>,
        calls: AtomicU32,
    }

    impl StubProvider {
        fn new(responses: Vec<Result<String, AdapterError>>) -> Self {
            Self {
                responses,
                calls: AtomicU32::new(0),
            }
        }

        fn always_failing() -> Self {
            Self::new(Vec::new())
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl GenerationProvider for StubProvider {
        async fn request(
            &self,
            _prompt: &str,
            _options: &GenerationOptions,
        ) -> Result<String, AdapterError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) as usize;
            self.responses
                .get(call)
                .cloned()
                .unwrap_or_else(|| Err(AdapterError::new("stub exhausted")))
        }

        async fn embed(&self, _text: &str) -> Result<Vec<f32>, AdapterError> {
            Err(AdapterError::new("stub has no embeddings"))
        }
    }

    fn generator(stub: Arc<StubProvider>) -> SafeGenerator {
        SafeGenerator::new(stub)
    }

    #[tokio::test]
    async fn test_always_failing_adapter_returns_fail_safe_after_exact_budget() {
        let stub = Arc::new(StubProvider::always_failing());
        let result = generator(Arc::clone(&stub))
            .safe_generate(
                CognitiveFunction::WakeUpHour,
                "when does Klaus wake up?",
                4,
                json!(8),
            )
            .await;
        assert_eq!(result, json!(8));
        assert_eq!(stub.calls(), 4);
    }

    #[test]
    fn test_zero_budget_never_calls_the_adapter() {
        let stub = Arc::new(StubProvider::always_failing());
        let result = tokio_test::block_on(generator(Arc::clone(&stub)).safe_generate(
            CognitiveFunction::WakeUpHour,
            "prompt",
            0,
            json!(8),
        ));
        assert_eq!(result, json!(8));
        assert_eq!(stub.calls(), 0);
    }

    #[tokio::test]
    async fn test_successful_generation_is_deterministic() {
        for _ in 0..3 {
            let stub = Arc::new(StubProvider::new(vec![Ok(
                r#"{"wake_up_hour": 6}"#.to_string()
            )]));
            let result = generator(Arc::clone(&stub))
                .safe_generate(CognitiveFunction::WakeUpHour, "prompt", 3, json!(8))
                .await;
            assert_eq!(result, json!(6));
            assert_eq!(stub.calls(), 1);
        }
    }

    #[tokio::test]
    async fn test_constraint_violation_retries_then_falls_back() {
        // Out-of-range hour on every attempt: budget is consumed, the
        // fail-safe integer comes back unchanged.
        let stub = Arc::new(StubProvider::new(vec![
            Ok(r#"{"wake_up_hour": 27}"#.to_string()),
            Ok(r#"{"wake_up_hour": 27}"#.to_string()),
            Ok(r#"{"wake_up_hour": 27}"#.to_string()),
        ]));
        let result = generator(Arc::clone(&stub))
            .safe_generate(CognitiveFunction::WakeUpHour, "prompt", 3, json!(8))
            .await;
        assert_eq!(result, json!(8));
        assert_eq!(stub.calls(), 3);
    }

    #[tokio::test]
    async fn test_recovery_after_invalid_attempts() {
        let stub = Arc::new(StubProvider::new(vec![
            Err(AdapterError::new("503")),
            Ok("not json".to_string()),
            Ok(r#"{"wake_up_hour": 9}"#.to_string()),
        ]));
        let result = generator(Arc::clone(&stub))
            .safe_generate(CognitiveFunction::WakeUpHour, "prompt", 5, json!(8))
            .await;
        assert_eq!(result, json!(9));
        assert_eq!(stub.calls(), 3);
    }

    #[tokio::test]
    async fn test_predicate_rejection_consumes_attempts() {
        let stub = Arc::new(StubProvider::new(vec![
            Ok(r#"{"sector": "the moon"}"#.to_string()),
            Ok(r#"{"sector": "kitchen"}"#.to_string()),
        ]));
        let accessible = |value: &TypedResponse, _prompt: &str| -> bool {
            matches!(value, TypedResponse::Sector(s) if s.sector == "kitchen")
        };
        let result = generator(Arc::clone(&stub))
            .safe_generate_typed(CognitiveFunction::ActionSector, "prompt", 3, Some(&accessible))
            .await;
        assert_eq!(stub.calls(), 2);
        match result {
            Some(TypedResponse::Sector(s)) => assert_eq!(s.sector, "kitchen"),
            other => panic!("expected sector, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_simple_string_shape_decodes_output_field() {
        let stub = Arc::new(StubProvider::new(vec![Ok(
            r#"{"output": "listening to music"}"#.to_string(),
        )]));
        let result = generator(Arc::clone(&stub))
            .safe_generate_text(
                "What is a good activity?",
                "reading a book",
                "Output a single activity.",
                3,
                "idle".to_string(),
                None,
                None,
            )
            .await;
        assert_eq!(result, "listening to music");
    }

    #[tokio::test]
    async fn test_simple_string_shape_applies_cleanup() {
        let stub = Arc::new(StubProvider::new(vec![Ok(
            r#"{"output": "  reading  "}"#.to_string(),
        )]));
        let cleanup = |value: String, _prompt: &str| value.trim().to_string();
        let result = generator(Arc::clone(&stub))
            .safe_generate_text(
                "activity?",
                "reading",
                "",
                3,
                "idle".to_string(),
                None,
                Some(&cleanup),
            )
            .await;
        assert_eq!(result, "reading");
    }

    #[tokio::test]
    async fn test_simple_string_shape_fail_safe_on_exhaustion() {
        let stub = Arc::new(StubProvider::new(vec![
            Ok(r#"{"wrong_key": "x"}"#.to_string()),
            Ok("garbage".to_string()),
        ]));
        let result = generator(Arc::clone(&stub))
            .safe_generate_text("activity?", "reading", "", 2, "idle".to_string(), None, None)
            .await;
        assert_eq!(result, "idle");
        assert_eq!(stub.calls(), 2);
    }

    #[tokio::test]
    async fn test_both_shapes_share_the_attempt_counter() {
        // Equivalent budgets drive equivalent adapter call counts through
        // either shape.
        let stub_text = Arc::new(StubProvider::always_failing());
        generator(Arc::clone(&stub_text))
            .safe_generate_text("p", "e", "", 3, "f".to_string(), None, None)
            .await;

        let stub_schema = Arc::new(StubProvider::always_failing());
        generator(Arc::clone(&stub_schema))
            .safe_generate(CognitiveFunction::Poignancy, "p", 3, json!(4))
            .await;

        assert_eq!(stub_text.calls(), stub_schema.calls());
        assert_eq!(stub_text.calls(), 3);
    }

    #[tokio::test]
    async fn test_predicate_sees_the_callers_prompt() {
        let stub = Arc::new(StubProvider::new(vec![Ok(
            r#"{"output": "answer"}"#.to_string()
        )]));
        let saw_caller_prompt = |_value: &String, prompt: &str| -> bool {
            // The wrapped request adds an instruction envelope; predicates
            // must still see the original prompt.
            prompt == "original prompt"
        };
        let result = generator(stub)
            .safe_generate_text(
                "original prompt",
                "x",
                "",
                1,
                "fallback".to_string(),
                Some(&saw_caller_prompt),
                None,
            )
            .await;
        assert_eq!(result, "answer");
    }
}
