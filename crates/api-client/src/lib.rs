//! # Campus API Client
//!
//! HTTP implementation of [`PlatformApi`] for the campus platform.
//!
//! Endpoints:
//! - `GET  /chats/{id}`: one conversation
//! - `GET  /users/{viewer}/chats`: every conversation of a viewer
//! - `GET  /posts/{id}`: a forum post with its flat reply list
//! - `POST /chats`: first message to a counterpart, creating the conversation
//! - `POST /chats/{id}/messages`: message into an existing conversation
//!
//! Responses are handed to the `campus-wire` adapters as text, so payload shape handling lives
//! in one place. Transport failures and non-success statuses become [`ApiError`] values.

use async_trait::async_trait;
use campus_core::{ApiError, ApiResult, ClientConfig, CoreError, CoreResult, PlatformApi};
use campus_types::{NonEmptyText, UserKey};
use campus_wire::{
    Chats, Conversation, FirstMessageRequest, Forum, MessageRequest, PostThread, SentMessage,
};
use reqwest::{Client, Method, Response, StatusCode, Url};
use serde::Serialize;

const MAX_ERROR_MESSAGE_LEN: usize = 200;

/// [`PlatformApi`] over HTTP with JSON bodies.
#[derive(Clone, Debug)]
pub struct HttpPlatformApi {
    http: Client,
    base_url: Url,
    api_token: Option<String>,
}

impl HttpPlatformApi {
    /// Build a client from startup configuration.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidConfig`] if the HTTP client cannot be constructed.
    pub fn new(config: &ClientConfig) -> CoreResult<Self> {
        let http = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| CoreError::InvalidConfig(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: config.api_base_url().clone(),
            api_token: config.api_token().map(str::to_string),
        })
    }

    /// Appends `segments` to the base URL, escaping each one.
    fn url(&self, segments: &[&str]) -> ApiResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| ApiError::Transport(format!("cannot extend {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get(&self, segments: &[&str], what: &str) -> ApiResult<String> {
        self.send(Method::GET, segments, None::<&()>, what).await
    }

    async fn post<B: Serialize + Sync>(
        &self,
        segments: &[&str],
        body: &B,
        what: &str,
    ) -> ApiResult<String> {
        self.send(Method::POST, segments, Some(body), what).await
    }

    async fn send<B: Serialize + Sync>(
        &self,
        method: Method,
        segments: &[&str],
        body: Option<&B>,
        what: &str,
    ) -> ApiResult<String> {
        let url = self.url(segments)?;
        tracing::debug!(%method, %url, "platform request");

        let mut request = self.http.request(method, url);
        if let Some(token) = &self.api_token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        read_body(response, what).await
    }
}

async fn read_body(response: Response, what: &str) -> ApiResult<String> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| ApiError::Transport(e.to_string()))?;

    if status.is_success() {
        return Ok(body);
    }

    tracing::warn!(status = status.as_u16(), what, "platform request failed");
    if status == StatusCode::NOT_FOUND {
        return Err(ApiError::NotFound(what.to_string()));
    }
    Err(ApiError::Status {
        status: status.as_u16(),
        message: error_message(&body, status),
    })
}

/// Picks a readable message out of an error body: its `message` field when it is JSON,
/// otherwise the text itself, bounded in length.
fn error_message(body: &str, status: StatusCode) -> String {
    let from_json = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_string));

    let message = from_json.unwrap_or_else(|| body.trim().to_string());
    if message.is_empty() {
        return status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string();
    }
    message.chars().take(MAX_ERROR_MESSAGE_LEN).collect()
}

#[async_trait]
impl PlatformApi for HttpPlatformApi {
    async fn get_conversation(&self, conversation_id: &str) -> ApiResult<Conversation> {
        let what = format!("chat {conversation_id}");
        let body = self.get(&["chats", conversation_id], &what).await?;
        Ok(Chats::conversation_parse(&body, conversation_id)?)
    }

    async fn list_conversations(&self, viewer: &UserKey) -> ApiResult<Vec<Conversation>> {
        let what = format!("chats of {viewer}");
        let body = self
            .get(&["users", viewer.as_str(), "chats"], &what)
            .await?;
        Ok(Chats::conversations_parse(&body)?)
    }

    async fn get_post(&self, post_id: &str) -> ApiResult<PostThread> {
        let what = format!("post {post_id}");
        let body = self.get(&["posts", post_id], &what).await?;
        Ok(Forum::post_thread_parse(&body)?)
    }

    async fn send_first_message(
        &self,
        counterpart: &UserKey,
        text: &NonEmptyText,
    ) -> ApiResult<SentMessage> {
        let request = FirstMessageRequest {
            counterpart,
            message: text,
        };
        let body = self
            .post(&["chats"], &request, &format!("first message to {counterpart}"))
            .await?;
        Ok(Chats::sent_message_parse(&body, None)?)
    }

    async fn send_message(
        &self,
        conversation_id: &str,
        text: &NonEmptyText,
    ) -> ApiResult<SentMessage> {
        let request = MessageRequest { message: text };
        let body = self
            .post(
                &["chats", conversation_id, "messages"],
                &request,
                &format!("chat {conversation_id}"),
            )
            .await?;
        Ok(Chats::sent_message_parse(&body, Some(conversation_id))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::Path;
    use axum::http::HeaderMap;
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use campus_core::{ChildOrder, ConversationResolver, Identity, NavigationResolver};
    use serde_json::{json, Value};
    use std::time::Duration;

    async fn spawn(router: Router) -> HttpPlatformApi {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        let config = ClientConfig::new(
            &format!("http://{addr}/api/"),
            vec![],
            Duration::from_secs(5),
            Some("t0ken".into()),
        )
        .unwrap();
        HttpPlatformApi::new(&config).unwrap()
    }

    fn key(s: &str) -> UserKey {
        UserKey::new(s).unwrap()
    }

    fn text(s: &str) -> NonEmptyText {
        NonEmptyText::new(s).unwrap()
    }

    fn platform() -> Router {
        Router::new()
            .route(
                "/api/chats/:id",
                get(|Path(id): Path<String>| async move {
                    if id == "42" {
                        Ok(Json(json!({
                            "success": true,
                            "data": {
                                "chat": {
                                    "id": 42,
                                    "user1": {"id": "u1", "name": "Ana"},
                                    "user2": {"id": "u2", "name": "Bruno"}
                                }
                            }
                        })))
                    } else {
                        Err((axum::http::StatusCode::NOT_FOUND, "no such chat"))
                    }
                }),
            )
            .route(
                "/api/users/:viewer/chats",
                get(|Path(viewer): Path<String>, headers: HeaderMap| async move {
                    let authorised = headers
                        .get("authorization")
                        .and_then(|v| v.to_str().ok())
                        == Some("Bearer t0ken");
                    if !authorised {
                        return Err((
                            axum::http::StatusCode::UNAUTHORIZED,
                            Json(json!({"message": "missing token"})),
                        ));
                    }
                    Ok(Json(json!([
                        {"id": "5", "user1": viewer, "user2": "u2"},
                        {"id": "9", "user1": "u2", "user2": viewer}
                    ])))
                }),
            )
            .route(
                "/api/posts/:id",
                get(|Path(id): Path<String>| async move {
                    Json(json!({
                        "id": id,
                        "title": "Week 3",
                        "authorId": "teacher",
                        "authorName": "Teacher",
                        "message": "Doubts?",
                        "createdAt": "2024-04-02T10:00:00Z",
                        "replies": [
                            {"id": "r2", "parentId": "r1", "authorId": "s2", "authorName": "Eva",
                             "message": "same", "createdAt": "2024-04-02T10:02:00Z"},
                            {"id": "r1", "parentId": null, "authorId": "s1", "authorName": "Leo",
                             "message": "why?", "createdAt": "2024-04-02T10:01:00Z"}
                        ]
                    }))
                }),
            )
            .route(
                "/api/chats",
                post(|Json(body): Json<Value>| async move {
                    if body["message"] == "reject me" {
                        return Json(json!({"success": false, "message": "blocked"}));
                    }
                    Json(json!({"success": true, "data": {"chatId": 77, "messageId": 1}}))
                }),
            )
            .route(
                "/api/chats/:id/messages",
                post(|Json(body): Json<Value>| async move {
                    assert_eq!(body, json!({"message": "hola"}));
                    Json(json!({"messageId": "m2"}))
                }),
            )
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn fetches_nested_conversation() {
        let api = spawn(platform()).await;
        let conversation = api.get_conversation("42").await.unwrap();

        assert_eq!(conversation.id, "42");
        assert_eq!(conversation.participant_a.display_name(), "Ana");
        assert_eq!(conversation.participant_b.key, key("u2"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn missing_conversation_is_not_found() {
        let api = spawn(platform()).await;
        let err = api.get_conversation("7").await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)), "{err:?}");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn lists_flat_conversations_with_bearer_token() {
        let api = spawn(platform()).await;
        let conversations = api.list_conversations(&key("u1")).await.unwrap();
        let ids: Vec<&str> = conversations.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, ["5", "9"]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn unauthorised_status_carries_server_message() {
        let router = platform();
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        let config =
            ClientConfig::new(&format!("http://{addr}/api"), vec![], Duration::from_secs(5), None)
                .unwrap();
        let api = HttpPlatformApi::new(&config).unwrap();

        match api.list_conversations(&key("u1")).await.unwrap_err() {
            ApiError::Status { status, message } => {
                assert_eq!(status, 401);
                assert_eq!(message, "missing token");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn loads_and_assembles_post_thread() {
        let api = spawn(platform()).await;
        let thread = campus_core::threads::load_thread(&api, "p1", ChildOrder::AsReceived)
            .await
            .unwrap();

        assert_eq!(thread.root.record.id(), "p1");
        assert_eq!(thread.orphans, 0);
        assert_eq!(thread.root.children.len(), 1);
        assert_eq!(thread.root.children[0].record.id(), "r1");
        assert_eq!(thread.root.children[0].children[0].record.id(), "r2");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn first_message_then_follow_up() {
        let api = spawn(platform()).await;
        let resolver = ConversationResolver::new(api);

        let mut session = resolver
            .open_chat(&key("u9"), Identity::new(key("u3")))
            .await;
        assert_eq!(session.state().conversation_id(), None);

        let sent = session.send(&text("hi")).await.unwrap();
        assert_eq!(sent.conversation_id, "77");
        assert_eq!(session.state().conversation_id(), Some("77"));

        let sent = session.send(&text("hola")).await.unwrap();
        assert_eq!(sent.conversation_id, "77");
        assert_eq!(sent.message_id.as_deref(), Some("m2"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn rejected_send_is_reported() {
        let api = spawn(platform()).await;
        let err = api
            .send_first_message(&key("u3"), &text("reject me"))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Rejected(ref m) if m == "blocked"), "{err:?}");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn resolves_chat_link_through_http() {
        let api = spawn(platform()).await;
        let resolver = NavigationResolver::new(api, Default::default());

        let resolution = resolver
            .resolve_link("campus://chats/42", &key("u1"))
            .await
            .unwrap();
        match resolution {
            campus_core::Resolution::Navigate(campus_core::Destination::Chat {
                chat_id,
                counterpart,
            }) => {
                assert_eq!(chat_id, "42");
                assert_eq!(counterpart.display_name(), "Bruno");
            }
            other => panic!("unexpected resolution: {other:?}"),
        }
    }

    #[test]
    fn error_message_prefers_json_message() {
        let status = StatusCode::BAD_REQUEST;
        assert_eq!(error_message(r#"{"message":"bad id"}"#, status), "bad id");
        assert_eq!(error_message("  plain  ", status), "plain");
        assert_eq!(error_message("", status), "Bad Request");
        assert_eq!(error_message(&"x".repeat(500), status).len(), MAX_ERROR_MESSAGE_LEN);
    }
}
