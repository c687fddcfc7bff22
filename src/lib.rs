// Link a chat identity to a GitHub account over OAuth and keep the token encrypted

// Callback HTTP server
pub mod api;

// Environment and TOML configuration
pub mod config;

// Encrypted credential storage
pub mod credentials;

pub mod error;

// Façade for the chat application
pub mod link;

// Authorization-code flow and pending link registry
pub mod oauth;

// In-process startup of the callback server and façade
pub mod server;

// Per-channel defaults
pub mod settings;

pub use error::LinkError;
pub use link::{AccountLinker, LinkInvitation};
pub use server::{serve, LinkServer};
