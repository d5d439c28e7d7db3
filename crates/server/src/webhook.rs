use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use chrono::Utc;
use secrecy::SecretString;
use serde_json::json;
use tracing::{info, warn};

use boardbot_agent::AgentRuntime;
use boardbot_core::session::SessionStore;
use boardbot_slack::{classify_envelope, verify_signature, Inbound};

const TIMESTAMP_HEADER: &str = "x-slack-request-timestamp";
const SIGNATURE_HEADER: &str = "x-slack-signature";

#[derive(Clone)]
pub struct WebhookState {
    pub runtime: Arc<AgentRuntime>,
    pub sessions: Arc<SessionStore>,
    pub signing_secret: SecretString,
}

pub fn router(state: WebhookState) -> Router {
    Router::new().route("/slack/events", post(slack_events)).with_state(state)
}

/// The Events API front door. Acknowledges within the platform's short
/// response budget: challenges are echoed, turns are spawned onto their own
/// task, and everything else still gets a 200 so the platform does not retry.
pub async fn slack_events(
    State(state): State<WebhookState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let timestamp = header_value(&headers, TIMESTAMP_HEADER);
    let signature = header_value(&headers, SIGNATURE_HEADER);
    let (Some(timestamp), Some(signature)) = (timestamp, signature) else {
        warn!(event_name = "ingress.slack.missing_signature_headers", "rejecting unsigned request");
        return unauthorized();
    };

    if let Err(error) =
        verify_signature(&state.signing_secret, timestamp, signature, &body, Utc::now())
    {
        warn!(
            event_name = "ingress.slack.signature_rejected",
            error = %error,
            "rejecting request with an invalid signature"
        );
        return unauthorized();
    }

    // A thread with a pending continuation claims its next message, so the
    // classifier consults the session store before its mention/keyword gates.
    match classify_envelope(&body, |thread_id| state.sessions.get(thread_id).is_some()) {
        Ok(Inbound::Challenge(challenge)) => {
            info!(event_name = "ingress.slack.challenge_echoed", "answering url verification");
            (StatusCode::OK, Json(json!({ "challenge": challenge }))).into_response()
        }
        Ok(Inbound::Turn(request)) => {
            info!(
                event_name = "ingress.slack.turn_accepted",
                channel_id = %request.channel_id,
                thread_id = %request.thread_id,
                "handing turn to the agent"
            );
            let runtime = state.runtime.clone();
            tokio::spawn(async move {
                runtime.run_turn(request).await;
            });
            ok_status()
        }
        Ok(Inbound::Ignored) => ok_status(),
        Err(error) => {
            warn!(
                event_name = "ingress.slack.envelope_rejected",
                error = %error,
                "acknowledging an unreadable envelope"
            );
            ok_status()
        }
    }
}

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

fn ok_status() -> Response {
    (StatusCode::OK, Json(json!({ "status": "ok" }))).into_response()
}

fn unauthorized() -> Response {
    (StatusCode::UNAUTHORIZED, Json(json!({ "status": "invalid signature" }))).into_response()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use chrono::Utc;
    use hmac::{Hmac, Mac};
    use secrecy::SecretString;
    use sha2::Sha256;
    use tower::util::ServiceExt;

    use boardbot_agent::reasoner::{Reasoner, ReasonerError, ReasonerReply};
    use boardbot_agent::tools::ToolRegistry;
    use boardbot_agent::AgentRuntime;
    use boardbot_core::message::Message;
    use boardbot_core::session::SessionStore;
    use boardbot_slack::{RecordingNotifier, ResponseCoordinator};

    use super::{router, WebhookState};

    const SIGNING_SECRET: &str = "8f742231b10e8888abcd99yyyzzz85a5";

    struct CannedReasoner;

    #[async_trait]
    impl Reasoner for CannedReasoner {
        async fn invoke(
            &self,
            _system_prompt: &str,
            _history: &[Message],
        ) -> Result<ReasonerReply, ReasonerError> {
            Ok(ReasonerReply::Text("done".to_string()))
        }
    }

    fn state_with_sessions(
        notifier: Arc<RecordingNotifier>,
        sessions: Arc<SessionStore>,
    ) -> WebhookState {
        let runtime = AgentRuntime::new(
            Arc::new(CannedReasoner),
            Arc::new(ToolRegistry::default()),
            sessions.clone(),
            Arc::new(ResponseCoordinator::new(notifier)),
            25,
        );
        WebhookState {
            runtime: Arc::new(runtime),
            sessions,
            signing_secret: SecretString::from(SIGNING_SECRET),
        }
    }

    fn state(notifier: Arc<RecordingNotifier>) -> WebhookState {
        state_with_sessions(notifier, Arc::new(SessionStore::default()))
    }

    fn signed_request(body: &str) -> Request<Body> {
        let timestamp = Utc::now().timestamp().to_string();
        let mut mac = Hmac::<Sha256>::new_from_slice(SIGNING_SECRET.as_bytes()).expect("hmac key");
        mac.update(format!("v0:{timestamp}:{body}").as_bytes());
        let signature = format!("v0={}", hex::encode(mac.finalize().into_bytes()));

        Request::builder()
            .method("POST")
            .uri("/slack/events")
            .header("content-type", "application/json")
            .header("x-slack-request-timestamp", timestamp)
            .header("x-slack-signature", signature)
            .body(Body::from(body.to_string()))
            .expect("request")
    }

    #[tokio::test]
    async fn challenge_is_echoed_verbatim() {
        let app = router(state(Arc::new(RecordingNotifier::new())));
        let body = r#"{"type":"url_verification","challenge":"tok-42"}"#;

        let response = app.oneshot(signed_request(body)).await.expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        let payload: serde_json::Value = serde_json::from_slice(&bytes).expect("json");
        assert_eq!(payload["challenge"], "tok-42");
    }

    #[tokio::test]
    async fn unsigned_requests_are_rejected() {
        let app = router(state(Arc::new(RecordingNotifier::new())));
        let request = Request::builder()
            .method("POST")
            .uri("/slack/events")
            .body(Body::from(r#"{"challenge":"tok-42"}"#))
            .expect("request");

        let response = app.oneshot(request).await.expect("response");
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn tampered_signatures_are_rejected() {
        let app = router(state(Arc::new(RecordingNotifier::new())));
        let mut request = signed_request(r#"{"challenge":"tok-42"}"#);
        request
            .headers_mut()
            .insert("x-slack-signature", "v0=deadbeef".parse().expect("header"));

        let response = app.oneshot(request).await.expect("response");
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn events_are_acknowledged_before_the_turn_finishes() {
        let notifier = Arc::new(RecordingNotifier::new());
        let app = router(state(notifier.clone()));
        let body = r#"{"event":{"type":"app_mention","text":"<@U0BOT> hello",
                       "channel":"C123","ts":"1724.001"}}"#;

        let response = app.oneshot(signed_request(body)).await.expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        let payload: serde_json::Value = serde_json::from_slice(&bytes).expect("json");
        assert_eq!(payload["status"], "ok");

        // The spawned turn delivers in the background.
        tokio::task::yield_now().await;
    }

    #[tokio::test]
    async fn thread_reply_resumes_a_pending_continuation() {
        let notifier = Arc::new(RecordingNotifier::new());
        let sessions = Arc::new(SessionStore::default());
        sessions.start(
            "1724.001",
            boardbot_core::session::ConversationState::AwaitingCardName,
            std::collections::HashMap::from([("list_name".to_string(), "To Do".to_string())]),
        );
        let app = router(state_with_sessions(notifier.clone(), sessions.clone()));

        // No mention, no keyword: just the user's answer in the thread.
        let body = r#"{"event":{"type":"message","text":"Buy milk",
                       "channel":"C123","ts":"1724.009","thread_ts":"1724.001"}}"#;
        let response = app.oneshot(signed_request(body)).await.expect("response");
        assert_eq!(response.status(), StatusCode::OK);

        // The turn runs on a spawned task; wait for it to consume the session.
        for _ in 0..100 {
            if sessions.get("1724.001").is_none() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert!(sessions.get("1724.001").is_none(), "continuation must be consumed");
        assert!(
            notifier.sent().iter().any(|message| message.thread_ts.as_deref() == Some("1724.001")),
            "the resumed turn must answer in the thread"
        );
    }

    #[tokio::test]
    async fn bot_chatter_and_garbage_still_get_a_200() {
        let app = router(state(Arc::new(RecordingNotifier::new())));

        let bot_echo = r#"{"event":{"type":"app_mention","text":"hi","bot_id":"B01",
                           "channel":"C123","ts":"1724.002"}}"#;
        let response =
            app.clone().oneshot(signed_request(bot_echo)).await.expect("response");
        assert_eq!(response.status(), StatusCode::OK);

        let response = app.oneshot(signed_request("not json")).await.expect("response");
        assert_eq!(response.status(), StatusCode::OK);
    }
}
