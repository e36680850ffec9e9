// Integration tests for PulseGuard

use actix_web::{http::StatusCode, test, web, App};
use async_trait::async_trait;
use pulse_guard::core::{PostureScorer, RuleCatalog};
use pulse_guard::error::{PulseError, TimeoutCause};
use pulse_guard::models::{ActivityLevel, BiometricInput, Landmark, LandmarkSet, RiskLevel, Strategy};
use pulse_guard::routes::{self, AppState};
use pulse_guard::services::{
    AiGenerator, CancelToken, GenerateError, GenerationOptions, HealthEngine, RetryPolicy,
    TextGenerator,
};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

const AI_TEXT: &str = "Here is your assessment.\n\
**Summary:** Your weight is above the healthy range.\n\
**Recommendations:**\n\
- Add a 20 minute walk after dinner\n\
- Swap sugary drinks for water\n\
**Risk Level:** High\n\
**Preventive Actions:**\n\
- Book a blood pressure check\n\
- Track your weight weekly\n";

/// Fails with the queued errors, then answers with a fixed text
struct FlakyGenerator {
    failures: Mutex<Vec<GenerateError>>,
    reply: String,
    calls: AtomicU32,
    last_prompt: Mutex<String>,
}

impl FlakyGenerator {
    fn new(failures: Vec<GenerateError>, reply: &str) -> Arc<Self> {
        Arc::new(Self {
            failures: Mutex::new(failures),
            reply: reply.to_string(),
            calls: AtomicU32::new(0),
            last_prompt: Mutex::new(String::new()),
        })
    }
}

#[async_trait]
impl TextGenerator for FlakyGenerator {
    async fn generate(
        &self,
        system: &str,
        user: &str,
        _options: &GenerationOptions,
    ) -> Result<String, GenerateError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        assert!(system.contains("Risk Level:"));
        *self.last_prompt.lock().unwrap() = user.to_string();

        let mut failures = self.failures.lock().unwrap();
        if failures.is_empty() {
            Ok(self.reply.clone())
        } else {
            Err(failures.remove(0))
        }
    }
}

fn create_engine(generator: Option<Arc<FlakyGenerator>>) -> HealthEngine {
    let catalog = Arc::new(RuleCatalog::builtin().unwrap());
    let engine = HealthEngine::new(catalog, PostureScorer::default());
    match generator {
        Some(client) => engine.with_generator(AiGenerator::new(client)),
        None => engine,
    }
}

fn create_test_input() -> BiometricInput {
    BiometricInput::new(52, 98.0, 172.0, ActivityLevel::LightlyActive, 45).unwrap()
}

#[tokio::test(start_paused = true)]
async fn test_ai_backed_recovers_after_retryable_failures() {
    let fake = FlakyGenerator::new(
        vec![
            GenerateError::ServerError(503),
            GenerateError::RateLimited,
            GenerateError::ServerError(500),
        ],
        AI_TEXT,
    );
    let engine = create_engine(Some(fake.clone()));

    let rec = engine
        .recommend(&create_test_input(), Some(33.1), Strategy::AiBacked, &CancelToken::new())
        .await
        .unwrap();

    assert_eq!(fake.calls.load(Ordering::SeqCst), 4);
    assert_eq!(rec.strategy, Strategy::AiBacked);
    assert_eq!(rec.document.risk_level, RiskLevel::High);
    assert_eq!(rec.document.recommendations.len(), 2);
    assert!(rec.document.important_flags.is_empty());
    assert_eq!(rec.urgency, engine.catalog().urgency(RiskLevel::High));
    assert!(rec.text.starts_with("Here is your assessment."));

    let prompt = fake.last_prompt.lock().unwrap().clone();
    assert!(prompt.contains("BMI: 33.1 (obese)"));
    assert!(prompt.contains("Activity Level: Lightly Active"));
}

#[tokio::test(start_paused = true)]
async fn test_ai_backed_cancelled_mid_backoff() {
    let fake = FlakyGenerator::new(
        (0..4).map(|_| GenerateError::RateLimited).collect(),
        AI_TEXT,
    );
    let engine = create_engine(Some(fake.clone()));
    let cancel = CancelToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        trigger.cancel();
    });

    let err = engine
        .recommend(&create_test_input(), None, Strategy::AiBacked, &cancel)
        .await
        .unwrap_err();

    assert!(matches!(err, PulseError::TimedOut(TimeoutCause::Cancelled)));
    assert_eq!(fake.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_ai_backed_retry_policy_is_configurable() {
    let fake = FlakyGenerator::new(vec![GenerateError::RateLimited, GenerateError::RateLimited], AI_TEXT);
    let catalog = Arc::new(RuleCatalog::builtin().unwrap());
    let engine = HealthEngine::new(catalog, PostureScorer::default()).with_generator(
        AiGenerator::new(fake.clone()).with_policy(RetryPolicy {
            max_retries: 1,
            base_backoff_ms: 100,
            timeout_ms: 5_000,
        }),
    );

    let err = engine
        .recommend(&create_test_input(), None, Strategy::AiBacked, &CancelToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, PulseError::RetryableUpstream { attempts: 2, .. }));
}

#[tokio::test]
async fn test_rule_based_end_to_end() {
    let engine = create_engine(None);
    let input = create_test_input();

    let rec = engine
        .recommend(&input, None, Strategy::RuleBased, &CancelToken::new())
        .await
        .unwrap();

    // 98 kg / 1.72 m^2 = 33.1 -> obese, High
    assert_eq!(rec.metrics.bmi, 33.1);
    assert_eq!(rec.document.risk_level, RiskLevel::High);
    assert_eq!(rec.document.important_flags.len(), 0);
    assert!(rec.text.contains("Risk Level:\nHigh"));
}

#[::core::prelude::v1::test]
fn test_scoring_through_engine() {
    let engine = create_engine(None);
    let mut points = vec![Landmark::new(0.5, 0.5); 33];
    points[0] = Landmark::new(0.75, 0.2);
    points[7] = Landmark::new(0.6, 0.2);
    points[8] = Landmark::new(0.4, 0.2);
    points[11] = Landmark::new(0.6, 0.4);
    points[12] = Landmark::new(0.4, 0.4);
    points[23] = Landmark::new(0.6, 0.8);
    points[24] = Landmark::new(0.4, 0.8);

    let result = engine.score(&LandmarkSet::new(points)).unwrap();
    // neck offset 0.25 -> min(25, 25)
    assert_eq!(result.score, 75);
    assert_eq!(result.issues, vec!["Neck tilt detected"]);
}

#[actix_web::test]
async fn test_recommendation_falls_back_to_rules() {
    let fake = FlakyGenerator::new(vec![], "Summary:\nok\nRecommendations:\n- a\nRisk Level: Severe");
    let state = AppState {
        engine: Arc::new(create_engine(Some(fake))),
    };
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state))
            .app_data(routes::json_config())
            .configure(routes::configure_routes),
    )
    .await;

    let body = serde_json::json!({
        "age": 52,
        "weightKg": 98,
        "heightCm": 172,
        "activityLevel": "Lightly Active",
        "postureScore": 45,
        "strategy": "aiBacked",
        "fallbackToRules": true
    });
    let req = test::TestRequest::post()
        .uri("/api/v1/recommendations")
        .set_json(&body)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let json: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(json["strategy"], "ruleBased");

    let mut strict = body.clone();
    strict["fallbackToRules"] = serde_json::json!(false);
    let req = test::TestRequest::post()
        .uri("/api/v1/recommendations")
        .set_json(&strict)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
}
