use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, warn};

use crate::core::parser::parse_document;
use crate::error::{PulseError, TimeoutCause};
use crate::models::{BiometricInput, DerivedMetrics, RecommendationDocument};
use crate::services::cancel::CancelToken;
use crate::services::gemini::{GenerateError, GenerationOptions, TextGenerator};

const SYSTEM_PROMPT: &str = "\
You are PulseGuard, an AI preventive health assistant.
Your job is to analyze user health data and provide:
- Preventive health insights
- Personalized recommendations
- Lifestyle improvements
- Risk warnings (if needed)
Rules:
- Be concise
- Be practical
- Be supportive and encouraging
- Do NOT diagnose diseases
- Focus on prevention
You MUST respond in exactly this format with no deviations:
Summary:
[2-3 sentences]
Recommendations:
- [recommendation]
- [recommendation]
- [recommendation]
Risk Level:
[Low / Moderate / High]
Preventive Actions:
- [action]
- [action]
- [action]";

/// Retry, backoff and deadline settings for generation calls
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Backoff before the first retry; doubles for each later one
    pub base_backoff_ms: u64,
    /// Overall deadline covering every attempt and backoff
    pub timeout_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_backoff_ms: 500,
            timeout_ms: 15_000,
        }
    }
}

impl RetryPolicy {
    pub fn max_attempts(&self) -> u32 {
        self.max_retries + 1
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Wait after the given failed attempt (1-based)
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2_u64.saturating_pow(attempt.saturating_sub(1));
        Duration::from_millis(self.base_backoff_ms.saturating_mul(factor))
    }
}

/// Validated output of a generation call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generated {
    pub text: String,
    pub document: RecommendationDocument,
}

/// Recommendation generator backed by a [`TextGenerator`]
#[derive(Clone)]
pub struct AiGenerator {
    client: Arc<dyn TextGenerator>,
    policy: RetryPolicy,
    options: GenerationOptions,
}

impl AiGenerator {
    pub fn new(client: Arc<dyn TextGenerator>) -> Self {
        Self {
            client,
            policy: RetryPolicy::default(),
            options: GenerationOptions::default(),
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_options(mut self, options: GenerationOptions) -> Self {
        self.options = options;
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Generate and validate a recommendation document
    ///
    /// The deadline and the cancel token both cover the in-flight call and
    /// any backoff wait. Output that fails validation is never retried.
    pub async fn generate(
        &self,
        input: &BiometricInput,
        metrics: &DerivedMetrics,
        cancel: &CancelToken,
    ) -> Result<Generated, PulseError> {
        let user_prompt = build_user_prompt(input, metrics);
        let timeout = self.policy.timeout();

        let text = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("Generation cancelled by caller");
                return Err(PulseError::TimedOut(TimeoutCause::Cancelled));
            }
            result = tokio::time::timeout(timeout, self.call_with_retry(SYSTEM_PROMPT, &user_prompt)) => {
                match result {
                    Ok(text) => text?,
                    Err(_) => {
                        warn!(timeout_ms = self.policy.timeout_ms, "Generation deadline elapsed");
                        return Err(PulseError::TimedOut(TimeoutCause::Deadline(timeout)));
                    }
                }
            }
        };

        let text = text.trim();
        if text.is_empty() {
            return Err(PulseError::MalformedResponse(
                "empty response received from generator".into(),
            ));
        }

        let document = parse_document(text)?;
        Ok(Generated {
            text: text.to_string(),
            document,
        })
    }

    async fn call_with_retry(&self, system: &str, user: &str) -> Result<String, PulseError> {
        let max_attempts = self.policy.max_attempts();
        let mut attempt = 1;

        loop {
            match self.client.generate(system, user, &self.options).await {
                Ok(text) => {
                    debug!(attempt, "Generation succeeded");
                    return Ok(text);
                }
                // the HTTP client gave up on its own deadline; the caller did not cancel
                Err(GenerateError::Aborted) => {
                    return Err(PulseError::TimedOut(TimeoutCause::Deadline(self.policy.timeout())));
                }
                Err(e) if e.is_retryable() && attempt < max_attempts => {
                    let backoff = self.policy.backoff(attempt);
                    warn!(
                        "Generation attempt {}/{} failed ({}), retrying in {}ms",
                        attempt,
                        max_attempts,
                        e,
                        backoff.as_millis()
                    );
                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                }
                Err(e) if e.is_retryable() => {
                    error!(attempts = attempt, error = %e, "Generation retries exhausted");
                    return Err(PulseError::RetryableUpstream {
                        attempts: attempt,
                        message: e.to_string(),
                    });
                }
                Err(e) => {
                    error!(error = %e, "Generation failed");
                    return Err(PulseError::Upstream(e.to_string()));
                }
            }
        }
    }
}

/// User prompt embedding every input and derived field
pub fn build_user_prompt(input: &BiometricInput, metrics: &DerivedMetrics) -> String {
    format!(
        "User Health Data:\n\
Age: {age} ({age_group})\n\
Weight: {weight} kg\n\
Height: {height} cm\n\
BMI: {bmi} ({bmi_category})\n\
Hydration Level: {hydration} ({liters} L/day recommended)\n\
Posture Score: {posture}/100 ({posture_category})\n\
Activity Level: {activity}\n\
Health Risk Score: {risk_score}/100\n\
Risk Level: {risk}\n\
Provide preventive health recommendations.",
        age = input.age(),
        age_group = metrics.age_group.as_str(),
        weight = input.weight_kg(),
        height = input.height_cm(),
        bmi = metrics.bmi,
        bmi_category = metrics.bmi_category.as_str(),
        hydration = metrics.hydration_level.as_str(),
        liters = metrics.daily_water_intake_liters,
        posture = input.posture_score(),
        posture_category = metrics.posture_category.as_str(),
        activity = input.activity_level(),
        risk_score = metrics.health_risk_score,
        risk = metrics.risk_level,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::metrics::derive_metrics;
    use crate::models::{ActivityLevel, RiskLevel};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;
    use tokio::time::Instant;

    const VALID: &str = "Summary:\nLooking good.\nRecommendations:\n- Walk\nRisk Level:\nLow\n\
Preventive Actions:\n- Sleep\n";

    /// Replays a fixed script of results, then repeats the last one
    struct Scripted {
        script: Mutex<VecDeque<Result<String, GenerateError>>>,
        calls: AtomicU32,
    }

    impl Scripted {
        fn new(script: Vec<Result<String, GenerateError>>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script.into()),
                calls: AtomicU32::new(0),
            })
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    fn replay(e: &GenerateError) -> GenerateError {
        match e {
            GenerateError::RateLimited => GenerateError::RateLimited,
            GenerateError::ServerError(s) => GenerateError::ServerError(*s),
            GenerateError::Aborted => GenerateError::Aborted,
            GenerateError::Other(m) => GenerateError::Other(m.clone()),
        }
    }

    #[async_trait]
    impl TextGenerator for Scripted {
        async fn generate(
            &self,
            _system: &str,
            _user: &str,
            _options: &GenerationOptions,
        ) -> Result<String, GenerateError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut script = self.script.lock().unwrap();
            if script.len() > 1 {
                script.pop_front().unwrap()
            } else {
                match script.front().unwrap() {
                    Ok(text) => Ok(text.clone()),
                    Err(e) => Err(replay(e)),
                }
            }
        }
    }

    /// Never answers
    struct Hanging;

    #[async_trait]
    impl TextGenerator for Hanging {
        async fn generate(
            &self,
            _system: &str,
            _user: &str,
            _options: &GenerationOptions,
        ) -> Result<String, GenerateError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(VALID.to_string())
        }
    }

    fn input() -> (BiometricInput, DerivedMetrics) {
        let input = BiometricInput::new(28, 75.0, 175.0, ActivityLevel::Sedentary, 65).unwrap();
        let metrics = derive_metrics(&input);
        (input, metrics)
    }

    async fn run(client: Arc<dyn TextGenerator>, cancel: &CancelToken) -> Result<Generated, PulseError> {
        let (input, metrics) = input();
        AiGenerator::new(client).generate(&input, &metrics, cancel).await
    }

    #[test]
    fn test_backoff_doubles() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts(), 4);
        assert_eq!(policy.backoff(1), Duration::from_millis(500));
        assert_eq!(policy.backoff(2), Duration::from_millis(1000));
        assert_eq!(policy.backoff(3), Duration::from_millis(2000));
    }

    #[test]
    fn test_user_prompt_embeds_fields() {
        let (input, metrics) = input();
        let prompt = build_user_prompt(&input, &metrics);
        assert!(prompt.contains("Age: 28 (young)"));
        assert!(prompt.contains("BMI: 24.5 (normal)"));
        assert!(prompt.contains("Activity Level: Sedentary"));
        assert!(prompt.contains("Posture Score: 65/100 (average)"));
        assert!(prompt.contains("Health Risk Score: 30/100"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_three_failures_then_success() {
        let fake = Scripted::new(vec![
            Err(GenerateError::RateLimited),
            Err(GenerateError::ServerError(503)),
            Err(GenerateError::ServerError(500)),
            Ok(VALID.to_string()),
        ]);
        let started = Instant::now();

        let generated = run(fake.clone(), &CancelToken::new()).await.unwrap();

        assert_eq!(fake.calls(), 4);
        assert_eq!(generated.document.risk_level, RiskLevel::Low);
        assert!(started.elapsed() >= Duration::from_millis(3500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retryable_failure_on_last_attempt_surfaces() {
        let fake = Scripted::new(vec![Err(GenerateError::RateLimited)]);

        let err = run(fake.clone(), &CancelToken::new()).await.unwrap_err();

        assert!(matches!(err, PulseError::RetryableUpstream { attempts: 4, .. }));
        assert_eq!(fake.calls(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_retryable_fails_fast() {
        let fake = Scripted::new(vec![Err(GenerateError::ServerError(502))]);

        let err = run(fake.clone(), &CancelToken::new()).await.unwrap_err();

        assert!(matches!(err, PulseError::Upstream(_)));
        assert_eq!(fake.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_backoff() {
        let fake = Scripted::new(vec![Err(GenerateError::RateLimited)]);
        let cancel = CancelToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(700)).await;
            trigger.cancel();
        });

        let err = run(fake.clone(), &cancel).await.unwrap_err();

        assert!(matches!(err, PulseError::TimedOut(TimeoutCause::Cancelled)));
        // first backoff ends at 500ms, second would end at 1500ms
        assert_eq!(fake.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_elapses() {
        let err = run(Arc::new(Hanging), &CancelToken::new()).await.unwrap_err();
        assert!(matches!(
            err,
            PulseError::TimedOut(TimeoutCause::Deadline(d)) if d == Duration::from_millis(15_000)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_client_abort_reported_as_deadline() {
        let fake = Scripted::new(vec![Err(GenerateError::Aborted)]);
        let err = run(fake.clone(), &CancelToken::new()).await.unwrap_err();
        assert!(matches!(
            err,
            PulseError::TimedOut(TimeoutCause::Deadline(d)) if d == Duration::from_millis(15_000)
        ));
        assert_eq!(fake.calls(), 1);
    }

    #[tokio::test]
    async fn test_malformed_output_not_retried() {
        let severe = VALID.replace("Low", "Severe");
        for text in ["", "Summary: hi", severe.as_str()] {
            let fake = Scripted::new(vec![Ok(text.to_string())]);
            let err = run(fake.clone(), &CancelToken::new()).await.unwrap_err();
            assert!(matches!(err, PulseError::MalformedResponse(_)), "accepted {:?}", text);
            assert_eq!(fake.calls(), 1);
        }
    }
}
