// tests/api_tests.rs
use actix::{Actor, Handler};
use actix_web::{App, HttpResponse, HttpServer, test, web};
use codeforge::api::handlers::WsBroker;
use codeforge::api::handlers::ws::RunUpdate;
use codeforge::api::{AppState, configure_routes};
use codeforge::config::{AppConfig, FileConfig};
use codeforge::models::ProblemCase;
use codeforge::store::Backends;
use codeforge::store::sqlite::SqliteStore;
use serde::Deserialize;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Minimal Judge0 stand-in. Programs containing `while True` never finish,
/// programs containing `correct` print the expected output, anything else
/// prints `wrong`.
#[derive(Default)]
struct FakeJudge0 {
    next: AtomicUsize,
    tickets: Mutex<HashMap<String, (String, String)>>,
}

#[derive(Deserialize)]
struct FakeSubmission {
    source_code: String,
    expected_output: String,
}

async fn fake_submit(
    judge: web::Data<FakeJudge0>,
    body: web::Json<FakeSubmission>,
) -> HttpResponse {
    let token = format!("tok-{}", judge.next.fetch_add(1, Ordering::SeqCst));
    let body = body.into_inner();
    judge
        .tickets
        .lock()
        .unwrap()
        .insert(token.clone(), (body.source_code, body.expected_output));
    HttpResponse::Created().json(json!({ "token": token }))
}

async fn fake_poll(judge: web::Data<FakeJudge0>, path: web::Path<String>) -> HttpResponse {
    let tickets = judge.tickets.lock().unwrap();
    let Some((source, expected)) = tickets.get(path.as_str()) else {
        return HttpResponse::NotFound().finish();
    };
    if source.contains("while True") {
        return HttpResponse::Ok().json(json!({
            "status": { "id": 2, "description": "Processing" }
        }));
    }
    let stdout = if source.contains("correct") {
        format!("{}\n", expected)
    } else {
        "wrong\n".to_string()
    };
    HttpResponse::Ok().json(json!({
        "status": { "id": 3, "description": "Accepted" },
        "stdout": stdout,
        "time": "0.01",
        "memory": 1024
    }))
}

/// Serve a fake Judge0 on an ephemeral port and return its base URL.
fn start_fake_judge0() -> String {
    let judge = web::Data::new(FakeJudge0::default());
    let server = HttpServer::new(move || {
        App::new()
            .app_data(judge.clone())
            .route("/submissions", web::post().to(fake_submit))
            .route("/submissions/{token}", web::get().to(fake_poll))
    })
    .workers(1)
    .bind(("127.0.0.1", 0))
    .unwrap();
    let addr = server.addrs()[0];
    actix_web::rt::spawn(server.run());
    format!("http://{}", addr)
}

/// Collects run updates the broker pushes to a user.
struct Collector(Arc<Mutex<Vec<RunUpdate>>>);

impl Actor for Collector {
    type Context = actix::Context<Self>;
}

impl Handler<RunUpdate> for Collector {
    type Result = ();

    fn handle(&mut self, msg: RunUpdate, _: &mut Self::Context) {
        self.0.lock().unwrap().push(msg);
    }
}

async fn subscribe(broker: &WsBroker, user_id: &str) -> Arc<Mutex<Vec<RunUpdate>>> {
    let updates = Arc::new(Mutex::new(Vec::new()));
    let recipient = Collector(updates.clone()).start().recipient();
    broker
        .register(uuid::Uuid::new_v4(), user_id.to_string(), recipient)
        .await;
    updates
}

async fn seeded_state() -> AppState {
    seeded_state_with(&[]).await
}

async fn seeded_state_with(env: &[(&str, &str)]) -> AppState {
    let store = Arc::new(SqliteStore::connect("sqlite::memory:").await.unwrap());
    store.insert_user("coder-1", "coder", "coder-token").await.unwrap();
    store.insert_user("creator-1", "creator", "creator-token").await.unwrap();
    store
        .insert_case(
            "two-sum",
            &ProblemCase {
                id: "c1".to_string(),
                input: "nums = [2,7,11,15], target = 9".to_string(),
                expected_output: "[0,1]".to_string(),
                hidden: false,
            },
        )
        .await
        .unwrap();
    store
        .insert_case(
            "two-sum",
            &ProblemCase {
                id: "c2".to_string(),
                input: "nums = [3,3], target = 6".to_string(),
                expected_output: "[0,1]".to_string(),
                hidden: true,
            },
        )
        .await
        .unwrap();

    let env: HashMap<String, String> = env
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    let config =
        AppConfig::resolve(FileConfig::default(), move |key| env.get(key).cloned()).unwrap();
    let backends = Backends {
        store: store.clone(),
        identity: store,
    };
    AppState::new(config, reqwest::Client::new(), backends)
}

/// State whose judge is a fresh fake Judge0 polled every few milliseconds.
async fn judged_state() -> AppState {
    let judge0 = start_fake_judge0();
    seeded_state_with(&[
        ("JUDGE0_API_URL", judge0.as_str()),
        ("POLL_INTERVAL_MS", "5"),
        ("POLL_MAX_INTERVAL_MS", "5"),
        ("POLL_MAX_ATTEMPTS", "400"),
    ])
    .await
}

macro_rules! app {
    ($state:expr) => {
        app!($state, WsBroker::new())
    };
    ($state:expr, $broker:expr) => {
        test::init_service(
            App::new()
                .app_data(web::Data::new($state))
                .app_data(web::Data::new($broker))
                .configure(configure_routes),
        )
        .await
    };
}

fn run_request(source_code: &str) -> test::TestRequest {
    test::TestRequest::post()
        .uri("/api/v1/runs")
        .insert_header(("Authorization", "Bearer coder-token"))
        .set_json(json!({
            "problem_id": "two-sum",
            "language": "python",
            "source_code": source_code
        }))
}

fn history_request() -> test::TestRequest {
    test::TestRequest::get()
        .uri("/api/v1/submissions?problem_id=two-sum")
        .insert_header(("Authorization", "Bearer coder-token"))
}

#[actix_web::test]
async fn health_reports_judge_backend() {
    let app = app!(seeded_state().await);
    let req = test::TestRequest::get().uri("/api/v1/health").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["judge"], "judge0");
}

#[actix_web::test]
async fn missing_token_is_unauthorized() {
    let app = app!(seeded_state().await);
    let req = test::TestRequest::get()
        .uri("/api/v1/problems/two-sum/cases")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 401);
}

#[actix_web::test]
async fn case_listing_hides_hidden_cases() {
    let app = app!(seeded_state().await);
    let req = test::TestRequest::get()
        .uri("/api/v1/problems/two-sum/cases")
        .insert_header(("Authorization", "Bearer coder-token"))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let cases = body["cases"].as_array().unwrap();
    assert_eq!(cases.len(), 1);
    assert_eq!(cases[0]["id"], "c1");
}

#[actix_web::test]
async fn run_without_cases_is_rejected_before_judging() {
    let app = app!(seeded_state().await);
    let req = test::TestRequest::post()
        .uri("/api/v1/runs")
        .insert_header(("Authorization", "Bearer coder-token"))
        .set_json(json!({
            "problem_id": "no-such-problem",
            "language": "javascript",
            "source_code": "console.log(1)"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "VALIDATION_ERROR");
}

#[actix_web::test]
async fn creators_cannot_start_runs() {
    let app = app!(seeded_state().await);
    let req = test::TestRequest::post()
        .uri("/api/v1/runs")
        .insert_header(("Authorization", "Bearer creator-token"))
        .set_json(json!({
            "problem_id": "two-sum",
            "language": "python",
            "source_code": "print(1)"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 403);
}

#[actix_web::test]
async fn saved_code_shows_up_in_history() {
    let app = app!(seeded_state().await);
    let save = test::TestRequest::post()
        .uri("/api/v1/submissions")
        .insert_header(("Authorization", "Bearer coder-token"))
        .set_json(json!({
            "problem_id": "two-sum",
            "language": "cpp",
            "source_code": "int main() {}"
        }))
        .to_request();
    let resp = test::call_service(&app, save).await;
    assert_eq!(resp.status(), 201);

    let list = test::TestRequest::get()
        .uri("/api/v1/submissions?problem_id=two-sum")
        .insert_header(("Authorization", "Bearer coder-token"))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, list).await;
    let results = body["results"].as_array().unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["status"], "saved");
    assert_eq!(results[0]["language"], "cpp");
}

#[actix_web::test]
async fn denied_fullscreen_does_not_open_a_session() {
    let app = app!(seeded_state().await);
    let req = test::TestRequest::post()
        .uri("/api/v1/sessions")
        .insert_header(("Authorization", "Bearer coder-token"))
        .set_json(json!({ "fullscreen_granted": false }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert!(body["session_id"].is_null());
    assert_eq!(body["phase"], "inactive");
    assert_eq!(body["warning"]["type"], "fullscreen_denied");
}

#[actix_web::test]
async fn proctored_session_counts_tab_switches() {
    let app = app!(seeded_state().await);
    let start = test::TestRequest::post()
        .uri("/api/v1/sessions")
        .insert_header(("Authorization", "Bearer coder-token"))
        .set_json(json!({ "fullscreen_granted": true }))
        .to_request();
    let started: Value = test::call_and_read_body_json(&app, start).await;
    let id = started["session_id"].as_str().unwrap().to_string();
    assert_eq!(started["phase"], "active");

    for hidden in [true, true, false, true] {
        let event = test::TestRequest::post()
            .uri(&format!("/api/v1/sessions/{}/events", id))
            .insert_header(("Authorization", "Bearer coder-token"))
            .set_json(json!({ "type": "visibility", "hidden": hidden }))
            .to_request();
        let resp = test::call_service(&app, event).await;
        assert_eq!(resp.status(), 200);
    }

    let foreign = test::TestRequest::delete()
        .uri(&format!("/api/v1/sessions/{}", id))
        .insert_header(("Authorization", "Bearer creator-token"))
        .to_request();
    assert_eq!(test::call_service(&app, foreign).await.status(), 404);

    let end = test::TestRequest::delete()
        .uri(&format!("/api/v1/sessions/{}", id))
        .insert_header(("Authorization", "Bearer coder-token"))
        .to_request();
    let ended: Value = test::call_and_read_body_json(&app, end).await;
    assert_eq!(ended["state"]["violation_count"], 2);
    assert_eq!(ended["phase"], "inactive");
    assert_eq!(ended["state"]["fullscreen_active"], false);
}

#[actix_web::test]
async fn graded_run_is_returned_recorded_and_broadcast() {
    let broker = WsBroker::new();
    let updates = subscribe(&broker, "coder-1").await;
    let app = app!(judged_state().await, broker);

    let req = run_request("def solve(): correct").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let run_id = body["run_id"].as_u64().unwrap();
    assert_eq!(body["passed"], 1);
    assert_eq!(body["total"], 1);
    assert_eq!(body["result"]["all_passed"], true);
    assert_eq!(body["result"]["score"], 100);
    assert_eq!(body["result"]["verdicts"][0]["actual_output"], "[0,1]");

    tokio::time::sleep(Duration::from_millis(50)).await;
    let updates = updates.lock().unwrap();
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].run_id, run_id);
    assert_eq!(updates[0].score, 100);
    drop(updates);

    let req = history_request().to_request();
    let history: Value = test::call_and_read_body_json(&app, req).await;
    let results = history["results"].as_array().unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["status"], "accepted");
    assert_eq!(results[0]["score"], 100);
}

#[actix_web::test]
async fn superseded_run_gets_conflict_and_is_neither_recorded_nor_broadcast() {
    let broker = WsBroker::new();
    let updates = subscribe(&broker, "coder-1").await;
    let app = app!(judged_state().await, broker);

    let (first, second) = tokio::join!(
        test::call_service(&app, run_request("while True: pass").to_request()),
        async {
            tokio::time::sleep(Duration::from_millis(100)).await;
            let req = run_request("def solve(): correct").to_request();
            let body: Value = test::call_and_read_body_json(&app, req).await;
            body
        }
    );

    assert_eq!(first.status(), 409);
    let error: Value = test::read_body_json(first).await;
    assert_eq!(error["error"], "SUPERSEDED");
    assert_eq!(second["result"]["all_passed"], true);

    tokio::time::sleep(Duration::from_millis(50)).await;
    let updates = updates.lock().unwrap();
    assert_eq!(updates.len(), 1);
    assert_eq!(Some(updates[0].run_id), second["run_id"].as_u64());
    drop(updates);

    let req = history_request().to_request();
    let history: Value = test::call_and_read_body_json(&app, req).await;
    let results = history["results"].as_array().unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["status"], "accepted");
}

#[actix_web::test]
async fn cancelling_abandons_the_run_in_flight() {
    let broker = WsBroker::new();
    let updates = subscribe(&broker, "coder-1").await;
    let app = app!(judged_state().await, broker);

    let (run, cancel) = tokio::join!(
        test::call_service(&app, run_request("while True: pass").to_request()),
        async {
            tokio::time::sleep(Duration::from_millis(100)).await;
            let req = test::TestRequest::delete()
                .uri("/api/v1/runs/current")
                .insert_header(("Authorization", "Bearer coder-token"))
                .to_request();
            test::call_service(&app, req).await
        }
    );

    assert_eq!(cancel.status(), 204);
    assert_eq!(run.status(), 409);

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(updates.lock().unwrap().is_empty());
    let req = history_request().to_request();
    let history: Value = test::call_and_read_body_json(&app, req).await;
    assert!(history["results"].as_array().unwrap().is_empty());
}

#[actix_web::test]
async fn override_chord_ends_and_removes_the_session() {
    let state = seeded_state().await;
    let sessions = state.sessions.clone();
    let app = app!(state);

    let start = test::TestRequest::post()
        .uri("/api/v1/sessions")
        .insert_header(("Authorization", "Bearer coder-token"))
        .set_json(json!({ "fullscreen_granted": true }))
        .to_request();
    let started: Value = test::call_and_read_body_json(&app, start).await;
    let id = started["session_id"].as_str().unwrap().to_string();
    assert_eq!(sessions.len(), 1);

    let chord = test::TestRequest::post()
        .uri(&format!("/api/v1/sessions/{}/events", id))
        .insert_header(("Authorization", "Bearer coder-token"))
        .set_json(json!({ "type": "key", "key": "X", "ctrl": true, "shift": true }))
        .to_request();
    let ended: Value = test::call_and_read_body_json(&app, chord).await;
    assert_eq!(ended["phase"], "inactive");
    assert_eq!(ended["prevent_default"], true);
    assert!(sessions.is_empty());

    let late = test::TestRequest::post()
        .uri(&format!("/api/v1/sessions/{}/events", id))
        .insert_header(("Authorization", "Bearer coder-token"))
        .set_json(json!({ "type": "visibility", "hidden": true }))
        .to_request();
    assert_eq!(test::call_service(&app, late).await.status(), 404);
}
