//! # bids-server
//!
//! TCP server for bids.
//!
//! This crate provides:
//! - TCP connection handling with async I/O
//! - A single hub task that owns sessions and auctions
//! - Command dispatch with an authentication gate
//! - Credential pinning and bidder anonymization
//! - Keepalive eviction of silent sessions
//! - Layered configuration (defaults, YAML, environment)

pub mod auth;
pub mod config;
pub mod error;
pub mod handler;
pub mod hub;
pub mod keepalive;
pub mod registry;
pub mod server;
pub mod session;

pub use auth::{bidder_tag, hash_credential, CredentialStore};
pub use config::{AuthConfig, Config, ConfigError, KeepaliveConfig, NetworkConfig};
pub use error::ServerError;
pub use handler::{CommandHandler, Disposition};
pub use hub::{Hub, HubEvent};
pub use keepalive::KeepaliveMonitor;
pub use registry::SessionRegistry;
pub use server::{Server, ServerConfig, ServerStats};
pub use session::{Session, SessionState, DEFAULT_OUTBOUND_QUEUE};
