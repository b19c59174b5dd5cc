//! Constants used throughout the campus core crate.
//!
//! Path segment names are defined here once so the parser and the canonical path builder
//! cannot drift apart.

/// Custom URL scheme recognised when none is configured.
pub const DEFAULT_LINK_SCHEME: &str = "campus";

/// Request timeout used when none is configured.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Path segment introducing a course id.
pub const COURSES_SEGMENT: &str = "courses";

/// Path segment introducing a forum id within a course.
pub const FORUMS_SEGMENT: &str = "forums";

/// Path segment introducing a post id within a forum.
pub const POSTS_SEGMENT: &str = "posts";

/// Path segment introducing a content id within a course.
pub const CONTENTS_SEGMENT: &str = "contents";

/// Path segment introducing a quiz id within a course.
pub const QUIZZES_SEGMENT: &str = "quizzes";

/// Path segment introducing an evaluation id within a course.
pub const EVALUATIONS_SEGMENT: &str = "evaluations";

/// Path segment introducing a chat id.
pub const CHATS_SEGMENT: &str = "chats";
