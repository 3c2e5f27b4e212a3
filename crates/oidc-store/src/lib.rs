//! # oidc-store
//!
//! Artifact storage for an OpenID Connect identity provider.
//!
//! The provider persists several kinds of short-lived artifacts (access
//! tokens, authorization codes, refresh tokens, sessions and more). This
//! crate gives it one [`ArtifactStore`] per kind with TTL-aware lookups,
//! single-use consumption and deletion, and cascades a grant revocation to
//! every token and code issued under the grant.
//!
//! ## Overview
//!
//! - [`StoreFactory`] validates the table of every recognized kind once and
//!   hands out stores by kind name. Unknown names get a [`RejectingStore`].
//! - [`GrantIndex`] tracks which artifacts belong to which grant.
//! - [`RevocationCoordinator`] deletes a grant's artifacts across kinds.
//! - [`RevocationListener`] drives revocations from a channel of
//!   [`GrantRevoked`] events.
//!
//! Storage itself sits behind [`ArtifactBackend`]; backends live in
//! separate crates.
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use oidc_store::{GrantRevoker, StoreFactory};
//!
//! let factory = StoreFactory::from_env(backend)?;
//!
//! let codes = factory.for_kind("AuthorizationCode");
//! codes.upsert("code-1", payload, Some(600)).await?;
//! codes.consume("code-1").await?;
//!
//! factory.revocation().revoke("grant-1").await?;
//! ```

mod account;
mod artifact;
mod backend;
pub mod clock;
mod config;
mod dispatch;
mod error;
mod grant;
mod inspection;
mod key;
mod kind;
pub mod listener;
mod revocation;
mod store;

#[cfg(test)]
mod testing;

pub use account::{Account, AccountLookup, SCOPE_CLAIMS, StaticAccounts};
pub use artifact::{Artifact, GRANT_ID_FIELD};
pub use backend::{ArtifactBackend, DynBackend};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::TableConfig;
pub use dispatch::StoreFactory;
pub use error::{ErrorCategory, StoreError, StoreResult};
pub use grant::GrantIndex;
pub use inspection::TokenInspection;
pub use key::{StorageKey, grant_key};
pub use kind::ArtifactKind;
pub use listener::{GrantRevoked, ListenerStats, RevocationListener};
pub use revocation::{GrantRevoker, RevocationCoordinator, RevocationReport};
pub use store::{ArtifactStore, DynStore, KindStore, RejectingStore};

/// Prelude module for convenient imports.
///
/// ```ignore
/// use oidc_store::prelude::*;
/// ```
pub mod prelude {
    pub use crate::backend::{ArtifactBackend, DynBackend};
    pub use crate::dispatch::StoreFactory;
    pub use crate::error::{StoreError, StoreResult};
    pub use crate::kind::ArtifactKind;
    pub use crate::revocation::{GrantRevoker, RevocationReport};
    pub use crate::store::{ArtifactStore, DynStore};
}
