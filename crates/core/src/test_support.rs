//! In-memory [`PlatformApi`] fake and record builders for unit tests.

use crate::api::{ApiError, ApiResult, PlatformApi};
use async_trait::async_trait;
use campus_types::{NonEmptyText, UserKey};
use campus_wire::{Conversation, Identity, PostRecord, PostThread, ReplyRecord, SentMessage};
use chrono::{DateTime, TimeZone, Utc};
use std::collections::HashMap;
use std::sync::Mutex;

pub(crate) fn key(s: &str) -> UserKey {
    UserKey::new(s).unwrap()
}

pub(crate) fn text(s: &str) -> NonEmptyText {
    NonEmptyText::new(s).unwrap()
}

pub(crate) fn conversation(id: &str, a: &str, b: &str) -> Conversation {
    Conversation {
        id: id.to_string(),
        participant_a: Identity::new(key(a)),
        participant_b: Identity::new(key(b)),
    }
}

pub(crate) fn at_minute(minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 4, 2, 10, minute, 0).unwrap()
}

pub(crate) fn root_post(id: &str) -> PostRecord {
    PostRecord {
        id: id.to_string(),
        title: Some("Week 3".to_string()),
        author_id: key("teacher"),
        author_name: "Teacher".to_string(),
        author_picture_url: None,
        message: "Post your doubts here".to_string(),
        created_at: at_minute(0),
    }
}

pub(crate) fn reply(id: &str, parent: Option<&str>, minute: u32) -> ReplyRecord {
    ReplyRecord {
        id: id.to_string(),
        parent_id: parent.map(str::to_string),
        author_id: key("student"),
        author_name: "Student".to_string(),
        author_picture_url: None,
        message: format!("reply {id}"),
        created_at: at_minute(minute),
    }
}

/// Records every call as `operation:argument`.
#[derive(Default)]
pub(crate) struct FakeApi {
    conversations: Vec<Conversation>,
    posts: HashMap<String, PostThread>,
    fail_listing: bool,
    fail_sending: bool,
    calls: Mutex<Vec<String>>,
}

impl FakeApi {
    pub(crate) fn with_conversation(mut self, conversation: Conversation) -> Self {
        self.conversations.push(conversation);
        self
    }

    pub(crate) fn with_post(mut self, thread: PostThread) -> Self {
        self.posts.insert(thread.root.id.clone(), thread);
        self
    }

    pub(crate) fn failing_listing(mut self) -> Self {
        self.fail_listing = true;
        self
    }

    pub(crate) fn failing_sending(mut self) -> Self {
        self.fail_sending = true;
        self
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl PlatformApi for FakeApi {
    async fn get_conversation(&self, conversation_id: &str) -> ApiResult<Conversation> {
        self.record(format!("get_conversation:{conversation_id}"));
        self.conversations
            .iter()
            .find(|c| c.id == conversation_id)
            .cloned()
            .ok_or_else(|| ApiError::NotFound(format!("chat {conversation_id}")))
    }

    async fn list_conversations(&self, viewer: &UserKey) -> ApiResult<Vec<Conversation>> {
        self.record(format!("list_conversations:{viewer}"));
        if self.fail_listing {
            return Err(ApiError::Transport("connection reset".into()));
        }
        Ok(self
            .conversations
            .iter()
            .filter(|c| c.involves(viewer))
            .cloned()
            .collect())
    }

    async fn get_post(&self, post_id: &str) -> ApiResult<PostThread> {
        self.record(format!("get_post:{post_id}"));
        self.posts
            .get(post_id)
            .cloned()
            .ok_or_else(|| ApiError::NotFound(format!("post {post_id}")))
    }

    async fn send_first_message(
        &self,
        counterpart: &UserKey,
        _text: &NonEmptyText,
    ) -> ApiResult<SentMessage> {
        self.record(format!("send_first_message:{counterpart}"));
        if self.fail_sending {
            return Err(ApiError::Status {
                status: 503,
                message: "unavailable".into(),
            });
        }
        Ok(SentMessage {
            conversation_id: "500".to_string(),
            message_id: Some("1".to_string()),
        })
    }

    async fn send_message(
        &self,
        conversation_id: &str,
        _text: &NonEmptyText,
    ) -> ApiResult<SentMessage> {
        self.record(format!("send_message:{conversation_id}"));
        if self.fail_sending {
            return Err(ApiError::Transport("timed out".into()));
        }
        Ok(SentMessage {
            conversation_id: conversation_id.to_string(),
            message_id: Some("2".to_string()),
        })
    }
}
