//! HTTP API of the control plane.
//!
//! [`TeresaClient`] implements the streaming deploy RPC used by the deploy
//! pipeline plus the auxiliary lookups and app management behind the `login`, `app` and
//! `team` commands.

pub mod client;
pub mod models;
pub mod server;

pub use client::TeresaClient;
pub use models::{App, EnvVar, NewApp, PatchAppRequest, PatchOp, Team, User};
pub use server::ServerUrl;
