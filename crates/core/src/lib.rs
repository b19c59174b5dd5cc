//! # Campus Core
//!
//! Activity-link resolution and conversational-thread assembly for the campus clients.
//!
//! This crate contains the pure and lightly-async logic shared by every client surface:
//! - [`links`]: turn a raw locator (absolute URL, custom-scheme URL, relative path) into a
//!   typed [`NavigationIntent`]
//! - [`navigation`]: map an intent to a concrete [`Destination`], looking up the chat
//!   counterpart when needed
//! - [`threads`]: rebuild a nested discussion from a flat reply list
//! - [`conversations`]: reuse an existing conversation with a counterpart or start a new one
//!
//! **No transport concerns**: HTTP lives in `campus-api-client`, payload shapes in
//! `campus-wire`. The remote API is reached only through the [`PlatformApi`] trait.

pub mod api;
pub mod config;
pub mod constants;
pub mod conversations;
pub mod error;
pub mod links;
pub mod liveness;
pub mod navigation;
pub mod threads;

#[cfg(test)]
pub(crate) mod test_support;

pub use api::{ApiError, ApiResult, PlatformApi};
pub use config::ClientConfig;
pub use conversations::{find_existing, ChatSession, ChatState, ConversationResolver};
pub use error::{CoreError, CoreResult};
pub use links::{LinkParser, NavigationIntent};
pub use liveness::ViewGuard;
pub use navigation::{Destination, NavigationResolver, Resolution};
pub use threads::{assemble, AssembledThread, ChildOrder, NodeRecord, ReplyNode};

pub use campus_types::{NonEmptyText, TextError, UserKey};
pub use campus_wire::{Conversation, Identity, PostRecord, PostThread, ReplyRecord, SentMessage};
