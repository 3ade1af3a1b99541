//! Hemmer provider for Buddy.Works.
//!
//! The binary speaks the Hemmer provider protocol over gRPC: on start it
//! prints `HEMMER_PROVIDER|1|<address>` to stdout and serves until the
//! engine stops it. Each resource type (`buddy_workspace`, `buddy_pipeline`,
//! `buddy_sandbox`, ...) maps onto the Buddy REST API through a typed
//! handler in [`resources`].
//!
//! # Layout
//!
//! - [`value`], [`schema`], [`validation`], [`planner`]: the three-state
//!   value model, attribute schemas, configuration checks and plan
//!   computation.
//! - [`identity`]: composite resource IDs.
//! - [`client`]: the narrow REST client.
//! - [`convert`]: mappings between nested state blocks and API models.
//! - [`resources`], [`data_sources`]: the handlers.
//! - [`sandbox_wait`]: polling for asynchronous sandbox transitions.
//! - [`provider`], [`server`]: protocol dispatch and the gRPC server.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod client;
pub mod config;
pub mod convert;
pub mod data_sources;
pub mod error;
pub mod identity;
pub mod logging;
pub mod planner;
pub mod provider;
pub mod resources;
pub mod sandbox_wait;
pub mod schema;
pub mod server;
pub mod testing;
pub mod types;
pub mod validation;
pub mod value;

/// Protocol types generated from `proto/provider.proto`.
#[allow(missing_docs)]
#[allow(clippy::all)]
pub mod generated {
    tonic::include_proto!("hemmer.provider.v1");
}

pub use error::ProviderError;
pub use logging::init_logging;
pub use provider::BuddyProvider;
pub use server::{serve, serve_with_options, ProviderService, ServeOptions};
pub use types::{PlanResult, HANDSHAKE_PREFIX, PROTOCOL_VERSION};
