//! Navigation resolution: typed intents to concrete in-app destinations.
//!
//! Every intent except [`NavigationIntent::Chat`] maps synchronously to a screen. Message
//! screens are keyed by counterpart rather than by conversation id, so a chat intent needs
//! one lookup of the conversation to find the participant that is not the viewer.

use crate::api::PlatformApi;
use crate::error::{CoreError, CoreResult};
use crate::links::{LinkParser, NavigationIntent};
use campus_types::UserKey;
use campus_wire::Identity;

/// A screen and its parameters.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Destination {
    Course {
        course_id: String,
    },
    Forum {
        course_id: String,
        forum_id: String,
    },
    Post {
        course_id: String,
        forum_id: String,
        post_id: String,
    },
    Content {
        course_id: String,
        content_id: String,
    },
    Quiz {
        course_id: String,
        quiz_id: String,
    },
    Evaluation {
        course_id: String,
        evaluation_id: String,
    },
    Chat {
        chat_id: String,
        counterpart: Identity,
    },
}

impl Destination {
    /// Stable route name of the destination screen.
    pub fn route(&self) -> &'static str {
        match self {
            Self::Course { .. } => "course",
            Self::Forum { .. } => "forum",
            Self::Post { .. } => "post",
            Self::Content { .. } => "content",
            Self::Quiz { .. } => "quiz",
            Self::Evaluation { .. } => "evaluation",
            Self::Chat { .. } => "chat",
        }
    }

    /// Route parameters in declaration order.
    pub fn params(&self) -> Vec<(&'static str, &str)> {
        match self {
            Self::Course { course_id } => vec![("courseId", course_id.as_str())],
            Self::Forum {
                course_id,
                forum_id,
            } => vec![("courseId", course_id.as_str()), ("forumId", forum_id.as_str())],
            Self::Post {
                course_id,
                forum_id,
                post_id,
            } => vec![
                ("courseId", course_id.as_str()),
                ("forumId", forum_id.as_str()),
                ("postId", post_id.as_str()),
            ],
            Self::Content {
                course_id,
                content_id,
            } => vec![("courseId", course_id.as_str()), ("contentId", content_id.as_str())],
            Self::Quiz { course_id, quiz_id } => {
                vec![("courseId", course_id.as_str()), ("quizId", quiz_id.as_str())]
            }
            Self::Evaluation {
                course_id,
                evaluation_id,
            } => vec![
                ("courseId", course_id.as_str()),
                ("evaluationId", evaluation_id.as_str()),
            ],
            Self::Chat {
                chat_id,
                counterpart,
            } => vec![("chatId", chat_id.as_str()), ("counterpart", counterpart.key.as_str())],
        }
    }
}

/// Outcome of resolving an intent.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Resolution {
    Navigate(Destination),
    /// The link did not match any known shape. The caller performs no navigation.
    Unrecognized,
}

/// Resolves intents against the platform API.
#[derive(Clone, Debug)]
pub struct NavigationResolver<A> {
    api: A,
    parser: LinkParser,
}

impl<A: PlatformApi> NavigationResolver<A> {
    pub fn new(api: A, parser: LinkParser) -> Self {
        Self { api, parser }
    }

    /// Resolves an intent for `viewer`.
    ///
    /// Resolving the same intent twice yields the same destination as long as conversation
    /// membership does not change server-side.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::CannotResolveCounterpart`] when a chat lookup fails or the
    /// conversation has no participant other than the viewer. The caller must not navigate
    /// and may retry.
    pub async fn resolve(
        &self,
        intent: &NavigationIntent,
        viewer: &UserKey,
    ) -> CoreResult<Resolution> {
        let destination = match intent {
            NavigationIntent::Chat { chat_id } => self.resolve_chat(chat_id, viewer).await?,
            NavigationIntent::Unresolved => return Ok(Resolution::Unrecognized),
            other => match direct_destination(other) {
                Some(destination) => destination,
                None => return Ok(Resolution::Unrecognized),
            },
        };

        tracing::debug!(route = destination.route(), "resolved navigation intent");
        Ok(Resolution::Navigate(destination))
    }

    /// Runs the full pipeline: normalise, parse, resolve.
    pub async fn resolve_link(&self, raw: &str, viewer: &UserKey) -> CoreResult<Resolution> {
        let intent = self.parser.intent(raw);
        self.resolve(&intent, viewer).await
    }

    async fn resolve_chat(&self, chat_id: &str, viewer: &UserKey) -> CoreResult<Destination> {
        let conversation = self.api.get_conversation(chat_id).await.map_err(|e| {
            tracing::warn!(chat_id, error = %e, "conversation lookup failed");
            CoreError::CannotResolveCounterpart {
                chat_id: chat_id.to_string(),
                reason: e.to_string(),
            }
        })?;

        let counterpart = conversation.other_participant(viewer).ok_or_else(|| {
            tracing::warn!(chat_id, viewer = %viewer, "conversation has no usable counterpart");
            CoreError::CannotResolveCounterpart {
                chat_id: chat_id.to_string(),
                reason: format!("no participant other than {viewer}"),
            }
        })?;

        Ok(Destination::Chat {
            chat_id: chat_id.to_string(),
            counterpart: counterpart.clone(),
        })
    }
}

/// Synchronous mapping for every intent that needs no lookup.
fn direct_destination(intent: &NavigationIntent) -> Option<Destination> {
    let destination = match intent.clone() {
        NavigationIntent::Course { course_id } => Destination::Course { course_id },
        NavigationIntent::Forum {
            course_id,
            forum_id,
        } => Destination::Forum {
            course_id,
            forum_id,
        },
        NavigationIntent::Post {
            course_id,
            forum_id,
            post_id,
        } => Destination::Post {
            course_id,
            forum_id,
            post_id,
        },
        NavigationIntent::Content {
            course_id,
            content_id,
        } => Destination::Content {
            course_id,
            content_id,
        },
        NavigationIntent::Quiz { course_id, quiz_id } => Destination::Quiz { course_id, quiz_id },
        NavigationIntent::Evaluation {
            course_id,
            evaluation_id,
        } => Destination::Evaluation {
            course_id,
            evaluation_id,
        },
        NavigationIntent::Chat { .. } | NavigationIntent::Unresolved => return None,
    };
    Some(destination)
}
