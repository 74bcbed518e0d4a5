//! DriveHist - local path to OneDrive version history resolution
//!
//! Resolves a file inside a locally-synced OneDrive/SharePoint folder to
//! the corresponding Microsoft Graph drive item and its version history,
//! tolerating the mismatches between local mount metadata and the actual
//! remote drive topology.
//!
//! # Architecture
//!
//! ```text
//! local path
//!    │
//!    ▼
//! ┌──────────────────┐   ┌──────────────────┐   ┌───────────────────┐
//! │ Mapping Discovery │──▶│ Mapping Selector │──▶│ Remote Path Build │
//! │ config/env/       │   │ longest root wins│   │ + trim fallbacks  │
//! │ registry/inference│   └──────────────────┘   └─────────┬─────────┘
//! └──────────────────┘                                     │
//!                                                          ▼
//! ┌──────────────────┐   ┌──────────────────┐   ┌───────────────────┐
//! │ Version Context  │◀──│ Version Fetcher  │◀──│   Item Resolver   │
//! │ Store            │   │ newest first     │   │ 5-strategy cascade│
//! └──────────────────┘   └──────────────────┘   └───────────────────┘
//! ```
//!
//! The embedding layer (editor command surface, preview rendering, token
//! acquisition UI) stays outside: it supplies a token provider
//! ([`graph::AccessTokenProvider`]) and consumes [`VersionHistoryService`].

pub mod config;
pub mod graph;
pub mod localpath;
pub mod mapping;
pub mod remote_path;
pub mod resolver;
pub mod service;
pub mod store;
pub mod types;
pub mod versions;

pub use config::{HistoryConfig, MappingEntry};
pub use graph::{AccessTokenProvider, AuthError, GraphApi, GraphClient, GraphError, RetryConfig, StaticTokenProvider};
pub use service::VersionHistoryService;
pub use store::VersionContextStore;
pub use types::{FileVersion, HistoryError, Mapping, RemoteItem, VersionContext};
