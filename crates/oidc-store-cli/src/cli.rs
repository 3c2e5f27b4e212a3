use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};

#[derive(Parser)]
#[command(name = "oidc-store")]
#[command(about = "Inspect and maintain OIDC artifact storage")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to a TOML configuration file
    #[arg(short, long, global = true, env = "OIDC_STORE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Storage backend (overrides the configuration file)
    #[arg(short, long, global = true, env = "OIDC_STORE_BACKEND")]
    pub backend: Option<BackendKind>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Process-local maps, saved to a JSON snapshot between runs
    #[default]
    Memory,
    /// PostgreSQL tables
    Postgres,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(flatten)]
    Store(StoreCommands),
    /// Walk through an authorization code flow and a grant revocation
    Demo,
}

/// Commands that run against the configured backend.
#[derive(Subcommand)]
pub enum StoreCommands {
    /// Create or replace an artifact
    Upsert(UpsertArgs),
    /// Show an artifact if it exists and has not expired
    Find(ArtifactArgs),
    /// Mark an artifact as consumed
    Consume(ArtifactArgs),
    /// Delete an artifact
    Destroy(ArtifactArgs),
    /// Delete every token and code issued under a grant
    Revoke(RevokeArgs),
    /// Create missing tables (PostgreSQL only)
    Schema,
    /// Remove expired artifacts
    Cleanup,
}

#[derive(clap::Args)]
pub struct ArtifactArgs {
    /// Artifact kind, e.g. AccessToken
    pub kind: String,
    /// Artifact id
    pub id: String,
}

#[derive(clap::Args)]
pub struct UpsertArgs {
    /// Artifact kind, e.g. AccessToken
    pub kind: String,
    /// Artifact id
    pub id: String,
    /// JSON object payload
    #[arg(short, long, conflicts_with = "file")]
    pub payload: Option<String>,
    /// Read the JSON payload from a file
    #[arg(short, long)]
    pub file: Option<PathBuf>,
    /// Lifetime in seconds; omit or 0 for no expiry
    #[arg(short, long)]
    pub ttl: Option<u64>,
}

#[derive(clap::Args)]
pub struct RevokeArgs {
    /// Grant id
    pub grant_id: String,
}
