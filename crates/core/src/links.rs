//! Link parsing: raw locator strings to typed navigation intents.
//!
//! Locators reach the clients in three shapes:
//! - absolute URLs (`https://host/courses/MAT101?tab=forums`)
//! - custom-scheme URLs (`campus://courses/MAT101`, `campus:chats/12`)
//! - relative paths, with or without a leading `/`
//!
//! [`LinkParser::normalize`] reduces all of them to a `/`-rooted path and [`parse`] matches
//! that path against a fixed, ordered list of shapes. Both are total: an unknown shape yields
//! [`NavigationIntent::Unresolved`], never an error.

use crate::constants::{
    CHATS_SEGMENT, CONTENTS_SEGMENT, COURSES_SEGMENT, DEFAULT_LINK_SCHEME, EVALUATIONS_SEGMENT,
    FORUMS_SEGMENT, POSTS_SEGMENT, QUIZZES_SEGMENT,
};
use serde::Serialize;
use url::{Position, Url};

/// Base against which relative locators are resolved. Only its path is ever kept.
const PATH_BASE: &str = "https://campus.invalid/";

/// What the user wants to see, independent of how the locator was written.
///
/// Identifiers are taken verbatim from the path; their existence is not checked.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum NavigationIntent {
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
    /// A conversation reference. The counterpart is not known from the id alone.
    Chat {
        chat_id: String,
    },
    /// The locator did not match any known shape.
    Unresolved,
}

impl NavigationIntent {
    /// Canonical path for this intent, or `None` for [`NavigationIntent::Unresolved`].
    ///
    /// Parsing the returned path yields an equal intent.
    pub fn to_path(&self) -> Option<String> {
        let path = match self {
            Self::Course { course_id } => format!("/{COURSES_SEGMENT}/{course_id}"),
            Self::Forum {
                course_id,
                forum_id,
            } => format!("/{COURSES_SEGMENT}/{course_id}/{FORUMS_SEGMENT}/{forum_id}"),
            Self::Post {
                course_id,
                forum_id,
                post_id,
            } => format!(
                "/{COURSES_SEGMENT}/{course_id}/{FORUMS_SEGMENT}/{forum_id}/{POSTS_SEGMENT}/{post_id}"
            ),
            Self::Content {
                course_id,
                content_id,
            } => format!("/{COURSES_SEGMENT}/{course_id}/{CONTENTS_SEGMENT}/{content_id}"),
            Self::Quiz { course_id, quiz_id } => {
                format!("/{COURSES_SEGMENT}/{course_id}/{QUIZZES_SEGMENT}/{quiz_id}")
            }
            Self::Evaluation {
                course_id,
                evaluation_id,
            } => format!("/{COURSES_SEGMENT}/{course_id}/{EVALUATIONS_SEGMENT}/{evaluation_id}"),
            Self::Chat { chat_id } => format!("/{CHATS_SEGMENT}/{chat_id}"),
            Self::Unresolved => return None,
        };
        Some(path)
    }

    pub fn is_resolved(&self) -> bool {
        !matches!(self, Self::Unresolved)
    }
}

/// Normalises locators using a configured set of custom URL schemes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LinkParser {
    /// Lowercase scheme names without `:` or `://`.
    schemes: Vec<String>,
}

impl Default for LinkParser {
    fn default() -> Self {
        Self {
            schemes: vec![DEFAULT_LINK_SCHEME.to_string()],
        }
    }
}

impl LinkParser {
    /// Creates a parser recognising the given custom schemes.
    ///
    /// Scheme names are matched case-insensitively and may be given as `campus`, `campus:` or
    /// `campus://`. Blank entries are ignored; if none remain the default scheme is used.
    pub fn new<I, S>(schemes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut normalised: Vec<String> = Vec::new();
        for scheme in schemes {
            let scheme = scheme
                .as_ref()
                .trim()
                .trim_end_matches('/')
                .trim_end_matches(':')
                .to_ascii_lowercase();
            if !scheme.is_empty() && !normalised.contains(&scheme) {
                normalised.push(scheme);
            }
        }

        if normalised.is_empty() {
            return Self::default();
        }
        Self {
            schemes: normalised,
        }
    }

    pub fn schemes(&self) -> &[String] {
        &self.schemes
    }

    /// Reduces a raw locator to a `/`-rooted path, keeping any query and fragment.
    ///
    /// - recognised custom scheme: everything after `scheme:` is read as a path
    /// - any other URL with an authority: scheme and authority are stripped
    /// - anything else is read as a path
    ///
    /// `.` and `..` segments are resolved and the path is percent-encoded the way [`Url`]
    /// serialises it. Never fails: input that cannot be read as a path normalises to `/`.
    pub fn normalize(&self, raw: &str) -> String {
        let raw = raw.trim();

        if let Some((scheme, rest)) = raw.split_once(':') {
            if self.schemes.iter().any(|s| s.eq_ignore_ascii_case(scheme)) {
                return path_reference(rest);
            }
        }

        match Url::parse(raw) {
            Ok(url) if !url.cannot_be_a_base() => url[Position::BeforePath..].to_string(),
            _ => path_reference(raw),
        }
    }

    /// `parse(normalize(raw))`.
    pub fn intent(&self, raw: &str) -> NavigationIntent {
        let path = self.normalize(raw);
        let intent = parse(&path);
        if !intent.is_resolved() {
            tracing::warn!(locator = raw, path = %path, "unrecognized link");
        }
        intent
    }
}

/// [`LinkParser::normalize`] with the default scheme list.
pub fn normalize(raw: &str) -> String {
    LinkParser::default().normalize(raw)
}

/// Matches a normalised path against the known shapes, most specific first.
///
/// Query and fragment are ignored, empty and `.` segments are skipped, `..` drops the
/// previous segment, and trailing segments beyond a matched shape are allowed
/// (`/courses/C1/forums/F1/posts/7/edit` is still a post).
pub fn parse(path: &str) -> NavigationIntent {
    let path_only = path.split(['?', '#']).next().unwrap_or_default();
    let mut segments: Vec<&str> = Vec::new();
    for segment in path_only.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    let owned = |s: &&str| s.to_string();

    match segments.as_slice() {
        [COURSES_SEGMENT, course, FORUMS_SEGMENT, forum, POSTS_SEGMENT, post, ..] => {
            NavigationIntent::Post {
                course_id: owned(course),
                forum_id: owned(forum),
                post_id: owned(post),
            }
        }
        [COURSES_SEGMENT, course, FORUMS_SEGMENT, forum, ..] => NavigationIntent::Forum {
            course_id: owned(course),
            forum_id: owned(forum),
        },
        [COURSES_SEGMENT, course, CONTENTS_SEGMENT, content, ..] => NavigationIntent::Content {
            course_id: owned(course),
            content_id: owned(content),
        },
        [COURSES_SEGMENT, course, QUIZZES_SEGMENT, quiz, ..] => NavigationIntent::Quiz {
            course_id: owned(course),
            quiz_id: owned(quiz),
        },
        [COURSES_SEGMENT, course, EVALUATIONS_SEGMENT, evaluation, ..] => {
            NavigationIntent::Evaluation {
                course_id: owned(course),
                evaluation_id: owned(evaluation),
            }
        }
        [COURSES_SEGMENT, course, ..] => NavigationIntent::Course {
            course_id: owned(course),
        },
        [CHATS_SEGMENT, chat, ..] => NavigationIntent::Chat {
            chat_id: owned(chat),
        },
        _ => NavigationIntent::Unresolved,
    }
}

/// Resolves `reference` as an absolute path against [`PATH_BASE`].
fn path_reference(reference: &str) -> String {
    let rooted = format!("/{}", reference.trim_start_matches('/'));
    match Url::parse(PATH_BASE).and_then(|base| base.join(&rooted)) {
        Ok(url) => url[Position::BeforePath..].to_string(),
        Err(e) => {
            tracing::debug!(reference, error = %e, "locator is not a path");
            "/".to_string()
        }
    }
}
