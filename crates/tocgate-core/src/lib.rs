//! Contracts between the TOC gateway and its OSCAR backend.
//!
//! The gateway translates; the backend authenticates, routes, and stores.
//! This crate pins down the seam: the [`services`] traits (one per food
//! group), the concrete [`session::Session`] object both sides share, the
//! [`cookie::CookieBaker`] used for HTTP auth tokens, and the
//! [`config::TocConfigStore`] holding opaque TOC client configuration.

pub mod config;
pub mod cookie;
pub mod error;
pub mod message;
pub mod screen_name;
pub mod services;
pub mod session;

pub use config::{MemoryConfigStore, TocConfigStore};
pub use cookie::{CookieBaker, HmacCookieBaker};
pub use error::ServiceError;
pub use message::{SnacBody, SnacMessage};
pub use screen_name::ScreenName;
pub use session::Session;
