//! Traffic Common - GitHub Traffic Collection
//!
//! Shared logic for recording the page views and clones GitHub reports for a
//! repository. The [`api`] module talks to GitHub's REST API, [`builder`] turns
//! one fetch cycle into a [`TrafficTable`] and folds it into previously
//! recorded data, and [`store`] keeps those tables on disk between runs.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use traffic_common::{GithubApi, build_client, build_table};
//!
//! # async fn run() -> Result<(), traffic_common::ApiError> {
//! let client = build_client(Duration::from_secs(30))?;
//! let api = GithubApi::new(client, std::env::var("GITHUB_TOKEN").ok());
//! let table = build_table(&api, "rust-lang", "rust", None).await?;
//! # let _ = table;
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod builder;
pub mod error;
pub mod record;
pub mod store;
pub mod table;
pub mod token;

pub use api::{ApiResponse, Fetch, GITHUB_API_BASE, GithubApi, build_client, get_clones, get_views};
pub use builder::build_table;
pub use error::{ApiError, StoreError};
pub use record::{TrafficKind, TrafficRecord};
pub use table::{TrafficRow, TrafficTable};
pub use token::TokenProvider;
