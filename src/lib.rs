//! Role-based authorization decisions for data queries.
//!
//! A request names a user, a verb and a query target (data source, instance,
//! table, columns). The [`Engine`] resolves the user's grants from a pluggable
//! async store, matches them against the target with case-insensitive globs
//! and column allow-lists, and returns a [`Verdict`]: `Allowed`, `Denied` or
//! `Indeterminate` together with a reason naming the first check that failed.
//!
//! # Examples
//!
//! Deciding a request with the in-memory store (enable `memory-store`):
//! ```no_run
//! # #[cfg(feature = "memory-store")]
//! # {
//! use rs_query_authz::{AuthzInput, EngineBuilder, Grant, MemoryStore, RoleId, UserId};
//! let store = MemoryStore::new();
//! let role = RoleId::try_from("analyst").unwrap();
//! store.add_user_role(UserId::try_from("alice").unwrap(), role.clone());
//! store.add_grant(role, Grant::new(["SELECT"]).tables(["orders"]));
//!
//! let engine = EngineBuilder::new(store).build();
//! let input = AuthzInput::new("alice", "GET", "SELECT")
//!     .data_source("aurora")
//!     .table("orders")
//!     .query_sql("SELECT id FROM orders");
//! let _ = engine.decide(&input);
//! # }
//! ```
//!
//! Sharing compiled patterns across requests (enable `memory-cache`):
//! ```no_run
//! # #[cfg(feature = "memory-cache")]
//! # {
//! use rs_query_authz::MemoryCache;
//! let cache = MemoryCache::new(1024);
//! # let _ = cache;
//! # }
//! ```
#![forbid(unsafe_code)]

mod action;
mod cache;
mod columns;
mod diagnose;
mod engine;
mod error;
mod grant;
mod pattern;
mod request;
mod resource;
mod store;
mod types;
#[cfg(feature = "memory-cache")]
mod memory_cache;

#[cfg(feature = "memory-store")]
mod memory_store;

pub use crate::action::{ANY_ACTION, Action};
pub use crate::cache::{NoCache, PatternCache};
pub use crate::diagnose::GrantFunnel;
pub use crate::engine::{
    Decision, DecisionRule, Engine, EngineBuilder, Explanation, STATUS, Verdict, grants_for,
};
pub use crate::error::{Error, Result, StoreError};
pub use crate::grant::{Grant, Principal, Resources, Role, TableColumns, User};
pub use crate::pattern::{GlobPattern, PatternSyntax};
pub use crate::request::{AuthzInput, QueryInfo, RequestInfo};
pub use crate::resource::{SourceKind, qualified_table};
pub use crate::store::{RoleStore, Store, UserStore};
pub use crate::types::{RoleId, UserId};

#[cfg(feature = "memory-store")]
pub use crate::memory_store::{Database, MemoryStore};

#[cfg(feature = "memory-cache")]
pub use crate::memory_cache::MemoryCache;
