//! Integration Tests for TxFlow Server
//!
//! These tests verify the full flow of WebSocket and HTTP endpoints,
//! testing the system as a whole rather than individual units.

mod common;
use common::*;

// ============================================================================
// HTTP Route Integration Tests
// ============================================================================

mod http_routes {
    use super::*;
    use axum::http::{StatusCode, header};

    #[tokio::test]
    async fn test_health_endpoint_returns_ok() {
        let app = create_test_app();

        let response = get(app, "/health").await;
        assert_eq!(response.status(), StatusCode::OK);

        let json = json_body(response).await;
        assert_eq!(json["status"], "ok");
        assert!(json["version"].is_string());
        assert_eq!(json["demo_running"], false);
        assert_eq!(json["connections"], 0);
    }

    #[tokio::test]
    async fn test_initial_view_is_baseline() {
        let app = create_test_app();

        let response = get(app, "/api/demo").await;
        assert_eq!(response.status(), StatusCode::OK);

        let json = json_body(response).await;
        assert_eq!(json["phase"], "idle");
        assert_eq!(json["message"], "Ready to start demo");
        assert_eq!(json["running"], false);
        assert_eq!(json["metrics"]["totalCount"], 0);
        assert_eq!(json["metrics"]["successRate"], 100.0);
        assert_eq!(json["metrics"]["p95LatencyMs"], 0);
        assert_eq!(json["recent"].as_array().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn test_start_runs_to_completion() {
        let (app, state) = create_test_app_with_state();

        let response = post(app.clone(), "/api/demo/start", "").await;
        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await;
        assert_eq!(json["accepted"], true);
        assert_eq!(json["view"]["running"], true);

        let view = wait_for_idle(&state).await;
        assert_eq!(view.metrics.total_count, 1 + 20 + 20);
        assert_eq!(view.metrics.success_rate, 100.0);
        assert_eq!(view.metrics.current_tps, 1000);
        assert_eq!(view.progress, 100.0);

        let json = json_body(get(app, "/api/demo").await).await;
        assert_eq!(json["phase"], "complete");
        assert_eq!(json["message"], "Demo completed successfully!");
        assert_eq!(json["recent"].as_array().unwrap().len(), 20);
    }

    #[tokio::test]
    async fn test_second_start_is_rejected_while_running() {
        let (app, state) = create_test_app_with_state();

        let first = json_body(post(app.clone(), "/api/demo/start", "").await).await;
        let second = json_body(post(app.clone(), "/api/demo/start", "").await).await;
        let reset = json_body(post(app, "/api/demo/reset", "").await).await;

        assert_eq!(first["accepted"], true);
        assert_eq!(second["accepted"], false);
        assert_eq!(reset["accepted"], false);

        wait_for_idle(&state).await;
    }

    #[tokio::test]
    async fn test_reset_after_run_restores_baseline() {
        let (app, state) = create_test_app_with_state();

        post(app.clone(), "/api/demo/start", "").await;
        wait_for_idle(&state).await;

        let json = json_body(post(app, "/api/demo/reset", "").await).await;
        assert_eq!(json["accepted"], true);
        assert_eq!(json["view"]["phase"], "idle");
        assert_eq!(json["view"]["progress"], 0.0);
        assert_eq!(json["view"]["metrics"]["totalCount"], 0);
        assert_eq!(json["view"]["metrics"]["peakTps"], 0);
        assert_eq!(json["view"]["recent"].as_array().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn test_ingest_empty_body_is_rejected() {
        let app = create_test_app();

        let json = json_body(post(app, "/api/demo/ingest", "  \n").await).await;
        assert_eq!(json["accepted"], false);
        assert_eq!(json["view"]["phase"], "idle");
    }

    #[tokio::test]
    async fn test_ingest_replays_file_rows() {
        let (app, state) = create_test_app_with_state();
        let file = "transaction_id,amount,status,timestamp\n\
                    A1,250.50,completed,2024-03-01T10:00:00Z\n\
                    A2,99.99,failed,2024-03-01T10:00:01Z\n\
                    A3,10,completed,2024-03-01T10:00:02Z\n";

        let json = json_body(post(app, "/api/demo/ingest", file).await).await;
        assert_eq!(json["accepted"], true);
        assert_eq!(json["view"]["phase"], "csv");

        let view = wait_for_idle(&state).await;
        assert_eq!(view.metrics.total_count, 3);
        assert_eq!(view.recent.len(), 3);

        // Later chunks land in front
        assert_eq!(view.recent[0].id(), "A3");
        assert_eq!(view.recent[1].id(), "A1");
        assert_eq!(view.recent[2].id(), "A2");
        assert_eq!(view.recent[1].amount(), 250.50);
    }

    #[tokio::test]
    async fn test_sample_csv_download() {
        let app = create_test_app();

        let response = get(app, "/api/demo/sample.csv").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "text/csv"
        );
        let disposition = response
            .headers()
            .get(header::CONTENT_DISPOSITION)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        assert!(disposition.contains("sample_transactions.csv"));

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let text = String::from_utf8(body.to_vec()).unwrap();
        let mut lines = text.lines();
        assert!(lines.next().unwrap().starts_with("transaction_id,amount"));
        assert_eq!(lines.count(), 100);
    }

    #[tokio::test]
    async fn test_sample_csv_can_be_ingested() {
        let (app, state) = create_test_app_with_state();

        let response = get(app.clone(), "/api/demo/sample.csv").await;
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let file = String::from_utf8(body.to_vec()).unwrap();

        let json = json_body(post(app, "/api/demo/ingest", file).await).await;
        assert_eq!(json["accepted"], true);

        let view = wait_for_idle(&state).await;
        assert_eq!(view.metrics.total_count, 100);
        assert_eq!(view.recent.len(), 20);
    }

    #[tokio::test]
    async fn test_unknown_route_returns_404() {
        let app = create_test_app();

        let response = get(app, "/api/demo/unknown").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}

// ============================================================================
// WebSocket Protocol Integration Tests
// ============================================================================

mod websocket_protocol {
    use super::*;
    use futures_util::{SinkExt, StreamExt};
    use std::time::Duration;
    use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};
    use txflow_server::demo::Phase;
    use txflow_server::protocol::{AckStatus, ClientMessage, ErrorCode, ServerMessage};

    type WsStream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

    async fn send(ws: &mut WsStream, msg: &ClientMessage) {
        let json = serde_json::to_string(msg).unwrap();
        ws.send(Message::Text(json.into())).await.unwrap();
    }

    /// Read server messages until `pred` matches or the timeout expires
    async fn recv_until(
        ws: &mut WsStream,
        pred: impl Fn(&ServerMessage) -> bool,
    ) -> Option<ServerMessage> {
        tokio::time::timeout(Duration::from_secs(5), async {
            while let Some(msg) = ws.next().await {
                if let Ok(Message::Text(text)) = msg
                    && let Ok(server_msg) = serde_json::from_str::<ServerMessage>(&text)
                    && pred(&server_msg)
                {
                    return Some(server_msg);
                }
            }
            None
        })
        .await
        .ok()
        .flatten()
    }

    #[tokio::test]
    async fn test_websocket_connection_receives_initial_state() {
        let (addr, _state, server_handle) = start_test_server().await;
        let ws_url = format!("ws://{}/ws", addr);

        let (mut ws_stream, _) = connect_async(&ws_url).await.unwrap();

        let msg = recv_until(&mut ws_stream, |m| matches!(m, ServerMessage::State { .. })).await;
        match msg {
            Some(ServerMessage::State { view }) => {
                assert_eq!(view.phase, Phase::Idle);
                assert!(!view.running);
            }
            other => panic!("Expected initial state, got {:?}", other),
        }

        server_handle.abort();
    }

    #[tokio::test]
    async fn test_ping_pong_protocol() {
        let (addr, _state, server_handle) = start_test_server().await;
        let ws_url = format!("ws://{}/ws", addr);

        let (mut ws_stream, _) = connect_async(&ws_url).await.unwrap();
        send(&mut ws_stream, &ClientMessage::Ping { seq: 1 }).await;

        let pong = recv_until(&mut ws_stream, |m| matches!(m, ServerMessage::Pong)).await;
        assert!(pong.is_some(), "Server should respond with pong");

        server_handle.abort();
    }

    #[tokio::test]
    async fn test_start_over_websocket_streams_to_completion() {
        let (addr, _state, server_handle) = start_test_server().await;
        let ws_url = format!("ws://{}/ws", addr);

        let (mut ws_stream, _) = connect_async(&ws_url).await.unwrap();
        send(&mut ws_stream, &ClientMessage::Start { seq: 5 }).await;

        let ack = recv_until(&mut ws_stream, |m| matches!(m, ServerMessage::Ack { .. })).await;
        match ack {
            Some(ServerMessage::Ack {
                ack_seq,
                status,
                reason,
            }) => {
                assert_eq!(ack_seq, 5);
                assert_eq!(status, AckStatus::Ok);
                assert!(reason.is_none());
            }
            other => panic!("Expected ack, got {:?}", other),
        }

        let complete = recv_until(&mut ws_stream, |m| {
            matches!(m, ServerMessage::State { view } if view.phase == Phase::Complete)
        })
        .await;
        match complete {
            Some(ServerMessage::State { view }) => {
                assert_eq!(view.metrics.total_count, 41);
                assert_eq!(view.progress, 100.0);
            }
            other => panic!("Expected completed state, got {:?}", other),
        }

        server_handle.abort();
    }

    #[tokio::test]
    async fn test_reset_while_running_is_rejected_with_reason() {
        let (addr, state, server_handle) = start_test_server().await;
        let ws_url = format!("ws://{}/ws", addr);

        assert!(state.driver.start().await);

        let (mut ws_stream, _) = connect_async(&ws_url).await.unwrap();
        send(&mut ws_stream, &ClientMessage::Reset { seq: 2 }).await;

        let ack = recv_until(&mut ws_stream, |m| matches!(m, ServerMessage::Ack { .. })).await;
        if let Some(ServerMessage::Ack { status, reason, .. }) = ack {
            // The run may already have finished on a slow machine
            if status == AckStatus::Rejected {
                assert!(reason.is_some());
            }
        } else {
            panic!("Expected ack for reset");
        }

        wait_for_idle(&state).await;
        server_handle.abort();
    }

    #[tokio::test]
    async fn test_invalid_message_returns_error() {
        let (addr, _state, server_handle) = start_test_server().await;
        let ws_url = format!("ws://{}/ws", addr);

        let (mut ws_stream, _) = connect_async(&ws_url).await.unwrap();
        ws_stream
            .send(Message::Text(r#"{"type":"launch"}"#.into()))
            .await
            .unwrap();

        let error = recv_until(&mut ws_stream, |m| matches!(m, ServerMessage::Error { .. })).await;
        match error {
            Some(ServerMessage::Error { code, message }) => {
                assert_eq!(code, ErrorCode::InvalidMessage);
                assert!(message.starts_with("Invalid message format"));
            }
            other => panic!("Expected error, got {:?}", other),
        }

        server_handle.abort();
    }

    #[tokio::test]
    async fn test_connection_is_tracked_in_health() {
        let (addr, state, server_handle) = start_test_server().await;
        let ws_url = format!("ws://{}/ws", addr);

        let (mut ws_stream, _) = connect_async(&ws_url).await.unwrap();
        recv_until(&mut ws_stream, |m| matches!(m, ServerMessage::State { .. })).await;
        assert_eq!(state.connection_count().await, 1);

        ws_stream.close(None).await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(state.connection_count().await, 0);

        server_handle.abort();
    }
}
