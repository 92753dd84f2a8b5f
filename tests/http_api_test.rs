mod common;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    routing::post,
    Router,
};
use chrono::Utc;
use serde_json::{json, Value as JsonValue};
use tower::ServiceExt;

use common::{chat, spawn_vendor, ONE_QUESTION};
use polyglot_quiz::config::{AppConfig, FileConfig};
use polyglot_quiz::domain::{Band, Direction, Language, Level, Question, QuestionLanguage, QuestionType};
use polyglot_quiz::quiz::machine::{Action, QuizPhase, QuizScreen, Screen};
use polyglot_quiz::quiz::session::{AnswerRecord, BandReport, SessionHistory};
use polyglot_quiz::quiz::{QuizClient, QuizMachine};
use polyglot_quiz::{build_router, AppState};

fn config(vars: &[(&str, &str)]) -> AppConfig {
    let map: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
    AppConfig::resolve(|k| map.get(k).cloned(), FileConfig::default())
}

fn app(vars: &[(&str, &str)]) -> Router {
    build_router(Arc::new(AppState::new(config(vars))))
}

/// App backed by a single fake OpenAI-compatible vendor.
fn app_with_vendor(base_url: &str) -> Router {
    app(&[("OPENAI_API_KEY", "sk-test"), ("OPENAI_BASE_URL", base_url), ("QUIZ_RETRY_DELAY_MS", "5")])
}

fn post_json(uri: &str, body: JsonValue) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn json_body(res: axum::response::Response) -> JsonValue {
    let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn valid_request() -> JsonValue {
    json!({ "language": "French", "level": "Basic", "band": 2, "count": 6 })
}

#[tokio::test]
async fn missing_fields_are_a_bad_request() {
    let res = app(&[]).oneshot(post_json("/generate-questions", json!({ "language": "French" }))).await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body = json_body(res).await;
    assert_eq!(body["error"], "Missing required field(s): level, band, count");
}

#[tokio::test]
async fn non_numeric_band_is_a_bad_request() {
    let req = json!({ "language": "French", "level": "Basic", "band": "second", "count": 6 });
    let res = app(&[]).oneshot(post_json("/generate-questions", req)).await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(res).await["error"], "band must be a number");
}

#[tokio::test]
async fn malformed_body_is_a_bad_request() {
    let req = Request::builder()
        .method("POST")
        .uri("/generate-questions")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{ not json"))
        .unwrap();
    let res = app(&[]).oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert!(json_body(res).await["error"].is_string());
}

#[tokio::test]
async fn no_provider_is_a_configuration_error() {
    let res = app(&[]).oneshot(post_json("/generate-questions", valid_request())).await.unwrap();
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = json_body(res).await;
    assert_eq!(body["kind"], "ConfigurationError");
    assert!(body["error"].as_str().unwrap().contains("GEMINI_API_KEY"));
}

#[tokio::test]
async fn serves_questions_with_provider_header() {
    let vendor = spawn_vendor(vec![chat(ONE_QUESTION)]).await;
    let res = app_with_vendor(&vendor.base_url).oneshot(post_json("/generate-questions", valid_request())).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()["x-question-provider"], "openai");
    let body = json_body(res).await;
    let items = body.as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["answer"], "Bonjour");
    assert_eq!(items[0]["type"], "multiple-choice");
    assert_eq!(items[0]["questionLanguage"], "en");
    assert_eq!(items[0]["options"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn empty_model_output_is_all_providers_failed() {
    let vendor = spawn_vendor(vec![chat("```json\n```")]).await;
    let res = app_with_vendor(&vendor.base_url).oneshot(post_json("/generate-questions", valid_request())).await.unwrap();
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = json_body(res).await;
    assert_eq!(body["kind"], "AllProvidersFailed");
    assert!(body["error"].as_str().unwrap().starts_with("AllProvidersFailed"));
    assert!(body["hint"].is_string());
}

#[tokio::test]
async fn health_and_catalog() {
    let res = app(&[("GROQ_API_KEY", "gsk")])
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = json_body(res).await;
    assert_eq!(body, json!({ "ok": true, "mode": "single", "providers": ["groq"] }));

    let res = app(&[]).oneshot(Request::get("/catalog").body(Body::empty()).unwrap()).await.unwrap();
    let body = json_body(res).await;
    assert_eq!(body["languages"].as_array().unwrap().len(), 11);
    assert_eq!(body["levels"], json!(["Basic", "Moderate", "Advanced"]));
    assert_eq!(body["bands"], json!([1, 2, 3, 4, 5]));
    assert_eq!(body["defaultCount"], 6);
}

fn sample_history() -> SessionHistory {
    let q = Question {
        question: "Hello".into(),
        answer: "Bonjour".into(),
        options: Some(vec!["Bonjour".into(), "Salut".into()]),
        direction: Direction::EnToTarget,
        kind: QuestionType::MultipleChoice,
        question_language: QuestionLanguage::En,
        explanation: "A common greeting.".into(),
    };
    let answers = vec![AnswerRecord::grade(&q, "Bonjour", Utc::now()), AnswerRecord::grade(&q, "Salut", Utc::now())];
    std::iter::once(BandReport::new(Band::new(1).unwrap(), Level::Basic, Language::French, answers, Utc::now())).collect()
}

#[tokio::test]
async fn report_is_downloadable_text() {
    let req = json!({ "learner": "Ana", "history": sample_history() });
    let res = app(&[]).oneshot(post_json("/report", req)).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let disposition = res.headers()[header::CONTENT_DISPOSITION].to_str().unwrap().to_string();
    assert!(disposition.starts_with("attachment; filename=\"quiz-report-french-basic-"));
    let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("Learner:  Ana"));
    assert!(text.contains("Overall: 1/2 correct (50%)"));
}

#[tokio::test]
async fn report_of_empty_history_is_rejected() {
    let req = json!({ "learner": "Ana", "history": SessionHistory::new() });
    let res = app(&[]).oneshot(post_json("/report", req)).await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

async fn start_band(client: &QuizClient, machine: &mut QuizMachine) {
    client.apply(machine, Action::Start).await.unwrap();
    client.apply(machine, Action::SelectLanguage(Language::French)).await.unwrap();
    client.apply(machine, Action::SelectLevel(Level::Basic)).await.unwrap();
    client.apply(machine, Action::SelectBand(Band::new(1).unwrap())).await.unwrap();
}

#[tokio::test]
async fn learner_flow_against_running_server() {
    let vendor = spawn_vendor(vec![chat(ONE_QUESTION)]).await;
    let server = common::serve(app_with_vendor(&vendor.base_url)).await;
    let client = QuizClient::new(server);
    let mut machine = QuizMachine::default();

    start_band(&client, &mut machine).await;
    assert_eq!(machine.active_quiz().map(|q| q.len()), Some(1));

    client.apply(&mut machine, Action::SubmitAnswer("bonjour!".into())).await.unwrap();
    client.apply(&mut machine, Action::FinishBand).await.unwrap();
    match machine.screen() {
        Screen::Report { report } => assert_eq!((report.score, report.total), (1, 1)),
        other => panic!("expected report screen, got {other:?}"),
    }
}

#[tokio::test]
async fn learner_sees_error_screen_when_generation_fails() {
    let vendor = spawn_vendor(vec![chat("")]).await;
    let server = common::serve(app_with_vendor(&vendor.base_url)).await;
    let client = QuizClient::new(server);
    let mut machine = QuizMachine::default();

    start_band(&client, &mut machine).await;
    match machine.screen() {
        Screen::Quiz(QuizScreen { phase: QuizPhase::Failed { reason }, .. }) => {
            assert!(reason.contains("500"), "reason: {reason}");
            assert!(reason.contains("AllProvidersFailed"), "reason: {reason}");
        }
        other => panic!("expected error screen, got {other:?}"),
    }
    assert!(machine.active_quiz().is_none());
}

#[tokio::test]
async fn slow_server_times_out_into_error_screen() {
    let slow = Router::new().route(
        "/generate-questions",
        post(|| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            "[]"
        }),
    );
    let server = common::serve(slow).await;
    let client = QuizClient::with_timeout(server, Duration::from_millis(50));
    let mut machine = QuizMachine::default();

    start_band(&client, &mut machine).await;
    match machine.screen() {
        Screen::Quiz(QuizScreen { phase: QuizPhase::Failed { reason }, .. }) => {
            assert!(reason.contains("timed out"), "reason: {reason}");
        }
        other => panic!("expected error screen, got {other:?}"),
    }

    // Retrying issues a fresh request that times out the same way.
    client.apply(&mut machine, Action::RetryFetch).await.unwrap();
    assert_eq!(machine.screen().name(), "quiz (error)");
}
