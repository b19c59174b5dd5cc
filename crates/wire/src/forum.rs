//! Forum post wire models and translation helpers.
//!
//! Responsibilities:
//! - Define the normalised [`PostRecord`] / [`ReplyRecord`] shapes used for thread assembly
//! - Accept the post payload either as `{ post, replies }` or as a flat post carrying `replies`
//! - Accept reply authors either nested (`author: { ci, name, picture }`) or flat
//!   (`authorId`, `authorName`, `authorPictureUrl`)
//!
//! Notes:
//! - Reply `parentId` is taken verbatim; whether it resolves is decided by the assembler
//! - A blank `parentId` is read as absent

use crate::payload::{self, non_blank, WireId, WireProfile};
use crate::{WireError, WireResult};
use campus_types::UserKey;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

// ============================================================================
// Public domain-level types
// ============================================================================

/// The root post of a discussion. Anchors the reply tree but is not itself a reply.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PostRecord {
    pub id: String,
    pub title: Option<String>,
    pub author_id: UserKey,
    pub author_name: String,
    pub author_picture_url: Option<String>,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

/// A single reply in a discussion, referencing an optional parent reply.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReplyRecord {
    /// Opaque reply identifier.
    pub id: String,

    /// Parent reply id. `None` means a top-level reply to the root post.
    pub parent_id: Option<String>,

    pub author_id: UserKey,
    pub author_name: String,
    pub author_picture_url: Option<String>,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

/// A post together with the flat list of its replies, in server order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PostThread {
    pub root: PostRecord,
    pub replies: Vec<ReplyRecord>,
}

// ============================================================================
// Public Forum operations
// ============================================================================

/// Forum payload operations.
///
/// This is a zero-sized type used for namespacing forum-related adapters.
pub struct Forum;

impl Forum {
    /// Adapter for the `getPost` collaborator call.
    ///
    /// # Errors
    ///
    /// Returns [`WireError`] if the text is not JSON, the server rejected the request, or the
    /// post or any reply does not match the expected shape.
    pub fn post_thread_parse(json_text: &str) -> WireResult<PostThread> {
        let payload = payload::open(json_text)?;
        let Value::Object(mut map) = payload else {
            return Err(WireError::InvalidInput(
                "post payload must be a JSON object".into(),
            ));
        };

        let replies_value = payload::take_first(&mut map, &["replies", "answers"])
            .unwrap_or_else(|| Value::Array(Vec::new()));
        let post_value = match map.remove("post") {
            Some(post) => payload::unwrap_payload(post)?,
            None => Value::Object(map),
        };

        let post: WirePost = payload::decode(post_value, "post")?;
        let replies: Vec<WireReply> = payload::decode(replies_value, "replies")?;

        let root = post_to_domain(post)?;
        let replies = replies
            .into_iter()
            .enumerate()
            .map(|(idx, reply)| reply_to_domain(reply, idx))
            .collect::<WireResult<Vec<_>>>()?;

        Ok(PostThread { root, replies })
    }
}

// ============================================================================
// Wire types (internal)
// ============================================================================

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WirePost {
    id: WireId,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    author: Option<WireProfile>,
    #[serde(default, alias = "author_id")]
    author_id: Option<WireId>,
    #[serde(default, alias = "author_name")]
    author_name: Option<String>,
    #[serde(default, alias = "author_picture_url")]
    author_picture_url: Option<String>,
    #[serde(default, alias = "body")]
    message: String,
    #[serde(alias = "created_at")]
    created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireReply {
    id: WireId,
    #[serde(default, alias = "parent_id", alias = "parent")]
    parent_id: Option<WireId>,
    #[serde(default)]
    author: Option<WireProfile>,
    #[serde(default, alias = "author_id")]
    author_id: Option<WireId>,
    #[serde(default, alias = "author_name")]
    author_name: Option<String>,
    #[serde(default, alias = "author_picture_url")]
    author_picture_url: Option<String>,
    #[serde(default, alias = "body")]
    message: String,
    #[serde(alias = "created_at")]
    created_at: DateTime<Utc>,
}

// ============================================================================
// Helper functions (internal)
// ============================================================================

struct AuthorFields {
    id: UserKey,
    name: String,
    picture_url: Option<String>,
}

/// Picks the author from the nested profile when present, otherwise from the flat fields.
fn author_fields(
    profile: Option<WireProfile>,
    flat_id: Option<WireId>,
    flat_name: Option<String>,
    flat_picture: Option<String>,
    context: &str,
) -> WireResult<AuthorFields> {
    match profile {
        Some(profile) => Ok(AuthorFields {
            id: profile.ci.into_user_key(&format!("{context}.author.ci"))?,
            name: non_blank(profile.name).unwrap_or_default(),
            picture_url: non_blank(profile.picture),
        }),
        None => {
            let id = flat_id
                .ok_or_else(|| WireError::MissingField(format!("{context}.authorId")))?
                .into_user_key(&format!("{context}.authorId"))?;
            Ok(AuthorFields {
                id,
                name: non_blank(flat_name).unwrap_or_default(),
                picture_url: non_blank(flat_picture),
            })
        }
    }
}

fn post_to_domain(wire: WirePost) -> WireResult<PostRecord> {
    let id = wire
        .id
        .into_non_blank()
        .ok_or_else(|| WireError::MissingField("post.id".into()))?;
    let author = author_fields(
        wire.author,
        wire.author_id,
        wire.author_name,
        wire.author_picture_url,
        "post",
    )?;

    Ok(PostRecord {
        id,
        title: non_blank(wire.title),
        author_id: author.id,
        author_name: author.name,
        author_picture_url: author.picture_url,
        message: wire.message,
        created_at: wire.created_at,
    })
}

fn reply_to_domain(wire: WireReply, idx: usize) -> WireResult<ReplyRecord> {
    let context = format!("replies[{idx}]");
    let id = wire
        .id
        .into_non_blank()
        .ok_or_else(|| WireError::MissingField(format!("{context}.id")))?;

    let parent_id = match wire.parent_id {
        Some(parent) => {
            let parent = parent.into_non_blank();
            if parent.is_none() {
                tracing::debug!("{context} has a blank parentId, reading it as top-level");
            }
            parent
        }
        None => None,
    };

    let author = author_fields(
        wire.author,
        wire.author_id,
        wire.author_name,
        wire.author_picture_url,
        &context,
    )?;

    Ok(ReplyRecord {
        id,
        parent_id,
        author_id: author.id,
        author_name: author.name,
        author_picture_url: author.picture_url,
        message: wire.message,
        created_at: wire.created_at,
    })
}
