//! TOC-to-OSCAR protocol gateway.
//!
//! Accepts line-oriented TOC clients over FLAP framing and translates both
//! directions against a binary OSCAR backend: inbound TOC verbs become
//! SNAC service calls ([`translator`]), asynchronous backend SNACs become
//! TOC lines ([`events`]). Each connection runs three fate-sharing tasks
//! (reader, backend listener, writer — [`handler`]); chat rooms multiplex
//! over the connection through a per-connection [`chat_registry`].
//!
//! The crate is a library: the embedding process owns the OSCAR backend
//! (it implements the `tocgate-core` service traits), configuration
//! loading, and the tracing subscriber. [`server::Gateway`] provides the
//! listener set, TOC/HTTP demux, connection tracking, and graceful
//! shutdown; the sidecar HTTP helper consumes hand-offs from
//! [`http_relay`].

pub mod args;
pub mod chat_registry;
pub mod error;
pub mod events;
pub mod handler;
pub mod http_relay;
pub mod rate_limit;
pub mod server;
pub mod testing;
pub mod translator;

pub use chat_registry::ChatRegistry;
pub use error::{CommandError, ConnectionError, SessionEnd};
pub use handler::{MAX_TOC_FRAME, handle_toc_connection};
pub use http_relay::{HttpConnection, HttpHandoff, HttpIntake, http_handoff};
pub use rate_limit::SignonLimiter;
pub use server::{Gateway, GatewayConfig, GatewayError};
pub use translator::{BackendServices, CommandTranslator, ConnContext, ERR_INTERNAL};
