use std::time::Duration;

use axum::http::StatusCode;
use axum_test::TestServer;
use serde_json::{json, Value};
use server::agents::AgentFactory;
use server::config::{AgentBackend, ServerConfig};
use server::{create_router, state::AppState};
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn seeded_config() -> ServerConfig {
    let mut config = ServerConfig::default();
    config.game.seed = Some(11);
    config
}

fn setup_test_server(config: ServerConfig) -> TestServer {
    let app = create_router(AppState::scripted(config));
    TestServer::new(app).expect("Failed to create test server")
}

async fn create_session(server: &TestServer, participants: &[&str]) -> String {
    let response = server
        .post("/api/sessions")
        .json(&json!({ "participants": participants }))
        .await;
    response.assert_status(StatusCode::CREATED);
    let body: Value = response.json();
    body["id"].as_str().unwrap().to_string()
}

/// Poll the session until it reaches `status`.
async fn wait_for_status(server: &TestServer, id: &str, status: &str) -> Value {
    for _ in 0..500 {
        let body: Value = server.get(&format!("/api/sessions/{}", id)).await.json();
        if body["status"] == status {
            return body;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("Session {} never reached status {}", id, status);
}

mod health {
    use super::*;

    #[tokio::test]
    async fn test_health_endpoint() {
        let server = setup_test_server(ServerConfig::default());

        let response = server.get("/health").await;

        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["status"], "ok");
        assert_eq!(body["sessions"], 0);
    }

    #[tokio::test]
    async fn test_openapi_document() {
        let server = setup_test_server(ServerConfig::default());

        let response = server.get("/api/openapi.json").await;

        response.assert_status_ok();
        let body: Value = response.json();
        assert!(body["paths"]["/api/sessions/{id}/next-round"].is_object());
        let participant_id = &body["components"]["schemas"]["Participant"]["properties"]["id"];
        assert_eq!(participant_id["type"], "string");
        assert_eq!(participant_id["format"], "uuid");
    }
}

mod sessions_crud {
    use super::*;

    #[tokio::test]
    async fn test_create_session_returns_201_created() {
        let server = setup_test_server(seeded_config());

        let response = server
            .post("/api/sessions")
            .json(&json!({ "participants": ["Avery", "Blake", "Casey", "Dakota"] }))
            .await;

        response.assert_status(StatusCode::CREATED);
        let body: Value = response.json();
        assert!(body["id"].is_string());
        assert_eq!(body["status"], "pending");
        assert_eq!(body["phase"], "setup");
        assert_eq!(body["round"], 0);
        assert_eq!(body["participants"].as_array().unwrap().len(), 4);
        assert_eq!(body["transcript_len"], 0);
    }

    #[tokio::test]
    async fn test_create_session_uses_default_roster() {
        let server = setup_test_server(seeded_config());

        let response = server.post("/api/sessions").json(&json!({})).await;

        response.assert_status(StatusCode::CREATED);
        let body: Value = response.json();
        let names: Vec<&str> = body["participants"]
            .as_array()
            .unwrap()
            .iter()
            .map(|p| p["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["Alex", "Avery", "Blake", "Cameron", "Casey", "Charlie"]);
    }

    #[tokio::test]
    async fn test_create_session_uses_configured_roster() {
        let mut config = seeded_config();
        config.roster = vec!["Harper".into(), "Jamie".into(), "Finley".into()];
        let server = setup_test_server(config);

        let body: Value = server.post("/api/sessions").json(&json!({})).await.json();
        assert_eq!(body["participants"][0]["name"], "Harper");
        assert_eq!(body["participants"].as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_create_session_with_too_few_participants() {
        let server = setup_test_server(seeded_config());

        let response = server
            .post("/api/sessions")
            .json(&json!({ "participants": ["Avery", "Blake"] }))
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(body["error"], "bad_request");
    }

    #[tokio::test]
    async fn test_create_session_with_duplicate_names() {
        let server = setup_test_server(seeded_config());

        let response = server
            .post("/api/sessions")
            .json(&json!({ "participants": ["Avery", "Blake", "avery"] }))
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert!(body["message"].as_str().unwrap().contains("avery"));
    }

    #[tokio::test]
    async fn test_create_session_rejects_narrator_name() {
        let server = setup_test_server(seeded_config());

        let response = server
            .post("/api/sessions")
            .json(&json!({ "participants": ["Avery", "Blake", "Host"] }))
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(
            body["message"],
            "Participant name is reserved for the narrator: Host"
        );
    }

    #[tokio::test]
    async fn test_create_session_with_invalid_rules() {
        let server = setup_test_server(seeded_config());

        let response = server
            .post("/api/sessions")
            .json(&json!({
                "participants": ["Avery", "Blake", "Casey"],
                "game": { "agent_timeout_secs": 0 }
            }))
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_list_sessions() {
        let server = setup_test_server(seeded_config());

        let first = create_session(&server, &["Avery", "Blake", "Casey"]).await;
        let second = create_session(&server, &["Dakota", "Elliot", "Finley"]).await;

        let response = server.get("/api/sessions").await;

        response.assert_status_ok();
        let body: Value = response.json();
        let ids: Vec<&str> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|s| s["id"].as_str().unwrap())
            .collect();
        assert_eq!(ids, vec![first.as_str(), second.as_str()]);
    }

    #[tokio::test]
    async fn test_list_sessions_filtered_by_status() {
        let server = setup_test_server(seeded_config());

        let finished = create_session(&server, &["Avery", "Blake", "Casey"]).await;
        let waiting = create_session(&server, &["Dakota", "Elliot", "Finley"]).await;
        server
            .post(&format!("/api/sessions/{}/start", finished))
            .await
            .assert_status(StatusCode::ACCEPTED);
        wait_for_status(&server, &finished, "completed").await;

        let pending: Value = server
            .get("/api/sessions")
            .add_query_param("status", "pending")
            .await
            .json();
        let pending = pending.as_array().unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0]["id"], waiting.as_str());

        let completed: Value = server
            .get("/api/sessions")
            .add_query_param("status", "completed")
            .await
            .json();
        assert_eq!(completed[0]["id"], finished.as_str());
    }

    #[tokio::test]
    async fn test_list_sessions_rejects_unknown_status() {
        let server = setup_test_server(seeded_config());

        let response = server
            .get("/api/sessions")
            .add_query_param("status", "paused")
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(body["message"], "Unknown session status: 'paused'");
    }

    #[tokio::test]
    async fn test_get_session_not_found() {
        let server = setup_test_server(seeded_config());

        let response = server
            .get("/api/sessions/00000000-0000-0000-0000-000000000000")
            .await;

        response.assert_status(StatusCode::NOT_FOUND);
        let body: Value = response.json();
        assert_eq!(body["error"], "not_found");
    }

    #[tokio::test]
    async fn test_delete_session() {
        let server = setup_test_server(seeded_config());
        let id = create_session(&server, &["Avery", "Blake", "Casey"]).await;

        server
            .delete(&format!("/api/sessions/{}", id))
            .await
            .assert_status(StatusCode::NO_CONTENT);

        server
            .get(&format!("/api/sessions/{}", id))
            .await
            .assert_status(StatusCode::NOT_FOUND);
        server
            .delete(&format!("/api/sessions/{}", id))
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }
}

mod rounds {
    use super::*;

    #[tokio::test]
    async fn test_next_round_before_start_is_conflict() {
        let server = setup_test_server(seeded_config());
        let id = create_session(&server, &["Avery", "Blake", "Casey"]).await;

        let response = server
            .post(&format!("/api/sessions/{}/next-round", id))
            .await;

        response.assert_status(StatusCode::CONFLICT);
        let body: Value = response.json();
        assert_eq!(body["error"], "conflict");
    }

    #[tokio::test]
    async fn test_start_unknown_session() {
        let server = setup_test_server(seeded_config());

        server
            .post("/api/sessions/00000000-0000-0000-0000-000000000000/start")
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_full_game_over_http() {
        let server = setup_test_server(seeded_config());
        let id = create_session(&server, &["Avery", "Blake", "Casey", "Dakota"]).await;

        server
            .post(&format!("/api/sessions/{}/start", id))
            .await
            .assert_status(StatusCode::ACCEPTED);
        let state = wait_for_status(&server, &id, "idle").await;
        assert_eq!(state["round"], 1);
        assert_eq!(state["active"].as_array().unwrap().len(), 3);
        assert_eq!(state["eliminated"].as_array().unwrap().len(), 1);

        server
            .post(&format!("/api/sessions/{}/start", id))
            .await
            .assert_status(StatusCode::CONFLICT);

        let winner: Value = server
            .get(&format!("/api/sessions/{}/winner", id))
            .await
            .json();
        assert_eq!(winner["status"], "idle");
        assert!(winner["winners"].as_array().unwrap().is_empty());
        assert!(winner["takeaway"].is_null());

        server
            .post(&format!("/api/sessions/{}/next-round", id))
            .await
            .assert_status(StatusCode::ACCEPTED);
        let state = wait_for_status(&server, &id, "completed").await;
        assert_eq!(state["phase"], "game_over");

        let winner: Value = server
            .get(&format!("/api/sessions/{}/winner", id))
            .await
            .json();
        assert_eq!(winner["winners"].as_array().unwrap().len(), 2);
        let first = winner["winners"][0]["name"].as_str().unwrap();
        let second = winner["winners"][1]["name"].as_str().unwrap();
        assert!(winner["takeaway"]
            .as_str()
            .unwrap()
            .starts_with(&format!("{} and {} ", first, second)));

        server
            .post(&format!("/api/sessions/{}/next-round", id))
            .await
            .assert_status(StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_auto_advance_plays_to_the_end() {
        let mut config = seeded_config();
        config.auto_advance = true;
        config.round_delay_ms = 1;
        let server = setup_test_server(config);
        let id = create_session(&server, &["Avery", "Blake", "Casey", "Dakota", "Elliot"]).await;

        server
            .post(&format!("/api/sessions/{}/start", id))
            .await
            .assert_status(StatusCode::ACCEPTED);

        let state = wait_for_status(&server, &id, "completed").await;
        assert_eq!(state["round"], 3);
        assert_eq!(state["eliminated"].as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_single_winner_rule_from_request() {
        let server = setup_test_server(seeded_config());

        let response = server
            .post("/api/sessions")
            .json(&json!({
                "participants": ["Avery", "Blake", "Casey"],
                "game": { "exit_rule": "single_winner", "seed": 3 }
            }))
            .await;
        let id = response.json::<Value>()["id"].as_str().unwrap().to_string();

        server.post(&format!("/api/sessions/{}/start", id)).await;
        wait_for_status(&server, &id, "idle").await;
        server
            .post(&format!("/api/sessions/{}/next-round", id))
            .await;
        wait_for_status(&server, &id, "completed").await;

        let winner: Value = server
            .get(&format!("/api/sessions/{}/winner", id))
            .await
            .json();
        assert_eq!(winner["winners"].as_array().unwrap().len(), 1);
    }
}

mod transcript {
    use super::*;

    #[tokio::test]
    async fn test_transcript_after_first_round() {
        let server = setup_test_server(seeded_config());
        let id = create_session(&server, &["Avery", "Blake", "Casey", "Dakota"]).await;

        server.post(&format!("/api/sessions/{}/start", id)).await;
        let state = wait_for_status(&server, &id, "idle").await;

        let response = server
            .get(&format!("/api/sessions/{}/transcript", id))
            .await;
        response.assert_status_ok();
        let entries: Vec<Value> = response.json();
        assert_eq!(entries.len() as u64, state["transcript_len"].as_u64().unwrap());

        for (i, entry) in entries.iter().enumerate() {
            assert_eq!(entry["sequence_index"], i as u64);
        }
        assert_eq!(entries[0]["event"], "background");
        assert_eq!(entries[0]["sender"], "Host");

        let tail: Vec<Value> = server
            .get(&format!("/api/sessions/{}/transcript", id))
            .add_query_param("from", 5)
            .await
            .json();
        assert_eq!(tail.len(), entries.len() - 5);
        assert_eq!(tail[0]["sequence_index"], 5);
    }

    #[tokio::test]
    async fn test_transcript_of_unknown_session() {
        let server = setup_test_server(seeded_config());

        server
            .get("/api/sessions/00000000-0000-0000-0000-000000000000/transcript")
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }
}

mod observers {
    use super::*;
    use axum_test::TestWebSocket;

    fn ws_server() -> TestServer {
        let app = create_router(AppState::scripted(seeded_config()));
        TestServer::builder()
            .http_transport()
            .build(app)
            .expect("Failed to create test server")
    }

    async fn observe(server: &TestServer, id: &str) -> TestWebSocket {
        server
            .get_websocket(&format!("/api/sessions/{}/ws", id))
            .await
            .into_websocket()
            .await
    }

    #[tokio::test]
    async fn test_observer_gets_history_notice_then_live_events() {
        let server = ws_server();
        let id = create_session(&server, &["Avery", "Blake", "Casey", "Dakota"]).await;
        server
            .post(&format!("/api/sessions/{}/start", id))
            .await
            .assert_status(StatusCode::ACCEPTED);
        let state = wait_for_status(&server, &id, "idle").await;
        let recorded = state["transcript_len"].as_u64().unwrap();

        let mut ws = observe(&server, &id).await;

        let history: Value = ws.receive_json().await;
        assert_eq!(history["kind"], "history");
        let messages = history["messages"].as_array().unwrap();
        assert_eq!(messages.len() as u64, recorded);
        for (i, msg) in messages.iter().enumerate() {
            assert_eq!(msg["sequence"], i as u64);
            assert!(msg["timestamp"].is_i64());
        }
        assert_eq!(messages[0]["kind"], "system");
        let ballot = messages
            .iter()
            .find(|m| {
                m["kind"] == "agent"
                    && m["content"].as_str().unwrap().starts_with("I vote for ")
            })
            .unwrap();
        assert!(ballot["sender"].is_string());
        assert!(ballot["private_reasoning"]
            .as_str()
            .unwrap()
            .ends_with("looks like the easiest target."));

        let notice: Value = ws.receive_json().await;
        assert_eq!(notice["kind"], "system");
        assert_eq!(notice["content"], "Joined game.");
        assert!(notice.get("sequence").is_none());

        ws.send_json(&json!({ "type": "ping" })).await;
        let pong: Value = ws.receive_json().await;
        assert_eq!(pong["kind"], "system");
        assert_eq!(pong["content"], "pong");

        server
            .post(&format!("/api/sessions/{}/next-round", id))
            .await
            .assert_status(StatusCode::ACCEPTED);

        let mut next = recorded;
        loop {
            let msg: Value = ws.receive_json().await;
            assert_eq!(msg["sequence"], next);
            next += 1;
            if msg["event"] == "closing" {
                break;
            }
        }

        let state = wait_for_status(&server, &id, "completed").await;
        assert_eq!(state["transcript_len"], next);
    }

    #[tokio::test]
    async fn test_observer_of_unknown_session_is_rejected() {
        let server = ws_server();

        server
            .get_websocket("/api/sessions/00000000-0000-0000-0000-000000000000/ws")
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }
}

mod model_agents {
    use super::*;

    fn completion(content: &str) -> Value {
        json!({
            "id": "gen-1",
            "model": "test-model",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": content},
                "finish_reason": "stop"
            }]
        })
    }

    fn model_server(mock: &MockServer) -> TestServer {
        let backend = AgentBackend::OpenRouter {
            model: "test-model".to_string(),
            base_url: mock.uri(),
        };
        let agents = AgentFactory::from_backend(&backend, Some("sk-test".to_string())).unwrap();
        let config = ServerConfig {
            agent: backend,
            ..seeded_config()
        };
        TestServer::new(create_router(AppState::new(config, agents)))
            .expect("Failed to create test server")
    }

    #[tokio::test]
    async fn test_model_backed_round() {
        let mock = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion(
                r#"{"response": "Vote for anyone but me.", "vote_target": "Casey", "thought": "Casey is quiet"}"#,
            )))
            .mount(&mock)
            .await;

        let server = model_server(&mock);
        let id = create_session(&server, &["Avery", "Blake", "Casey", "Dakota"]).await;

        server.post(&format!("/api/sessions/{}/start", id)).await;
        let state = wait_for_status(&server, &id, "idle").await;
        assert_eq!(state["eliminated"][0]["name"], "Casey");

        let entries: Vec<Value> = server
            .get(&format!("/api/sessions/{}/transcript", id))
            .await
            .json();
        assert!(entries
            .iter()
            .any(|e| e["sender"] == "Avery" && e["content"] == "Vote for anyone but me."));
        assert!(entries
            .iter()
            .any(|e| e["content"] == "I vote for Casey." && e["private_reasoning"] == "Casey is quiet"));
    }

    #[tokio::test]
    async fn test_model_written_takeaway() {
        let mock = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_string_contains("outplayed the others"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(completion("Avery and Blake ran the table.")),
            )
            .with_priority(1)
            .expect(1)
            .mount(&mock)
            .await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion(
                r#"{"response": "Not me.", "vote_target": "Casey", "thought": "Casey is quiet"}"#,
            )))
            .mount(&mock)
            .await;

        let server = model_server(&mock);
        let id = create_session(&server, &["Avery", "Blake", "Casey"]).await;

        let winner: Value = server
            .get(&format!("/api/sessions/{}/winner", id))
            .await
            .json();
        assert!(winner["takeaway"].is_null());

        server.post(&format!("/api/sessions/{}/start", id)).await;
        wait_for_status(&server, &id, "completed").await;

        for _ in 0..2 {
            let winner: Value = server
                .get(&format!("/api/sessions/{}/winner", id))
                .await
                .json();
            assert_eq!(winner["takeaway"], "Avery and Blake ran the table.");
        }
    }

    #[tokio::test]
    async fn test_backend_failure_fails_session() {
        let mock = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": {"message": "bad model", "code": 400}
            })))
            .mount(&mock)
            .await;

        let server = model_server(&mock);
        let id = create_session(&server, &["Avery", "Blake", "Casey"]).await;

        server
            .post(&format!("/api/sessions/{}/start", id))
            .await
            .assert_status(StatusCode::ACCEPTED);
        let state = wait_for_status(&server, &id, "failed").await;
        assert!(state["error"].as_str().unwrap().contains("bad model"));

        let response = server
            .post(&format!("/api/sessions/{}/next-round", id))
            .await;
        response.assert_status(StatusCode::CONFLICT);
    }
}
