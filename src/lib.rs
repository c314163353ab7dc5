#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! # About Query
//!
//! `graphql_query` reshapes the output of a GraphQL client into a classified
//! result with explicit states, on top of which it offers bounded automatic
//! retries and shared query handles.
//!
//! The crate does not talk to the network itself. The underlying GraphQL
//! transport/cache client is handed in as a fetcher closure and stays in
//! charge of protocol, caching, and de-duplication concerns.
//!
//! A query provides:
//! - a classified [`QueryResult`] with explicit `Paused`, `Fetching`,
//!   `Success`, and `Error` states
//! - a selector step transforming raw response data, with selector failures
//!   surfaced as data instead of panics
//! - a `refetch` action that always forces a fresh network fetch
//! - change notification through registered listeners
//! - bounded, delayed retries driven by a predicate over the raw data
//!   ([`use_retry_query`])
//! - one-query-many-readers sharing ([`create_shared_query`])
//!
//! ## The main entry points are:
//! - [`use_query`] - classify a single query execution.
//! - [`use_retry_query`] - classify and retry while a predicate is unsatisfied.
//! - [`create_shared_query`] - share one query's classified result across many
//!   readers.
//!
//! # Feature Flags
//! - `native` (default): timers and task spawning through `tokio`. Handles
//!   must be created inside a [`tokio::task::LocalSet`].
//! - `web`: timers and task spawning through `gloo-timers` and
//!   `wasm-bindgen-futures`.
//!
//! # A Simple Example
//!
//! ```rust,no_run
//! use graphql_query::{use_query, BoxError, Operation, QueryOptions, Response};
//!
//! // Variables for the query.
//! #[derive(Debug, Clone)]
//! struct TrackVariables {
//!     id: u32,
//! }
//!
//! // The raw shape the client returns.
//! #[derive(Debug, Clone)]
//! struct TrackData {
//!     name: Option<String>,
//! }
//!
//! async fn fetch_track(op: Operation<TrackVariables>) -> Response<TrackData> {
//!     // Hand the operation to the GraphQL client of your choice.
//!     todo!()
//! }
//!
//! fn watch_track() {
//!     let track = use_query(
//!         "query Track($id: ID!) { track(id: $id) { name } }",
//!         TrackVariables { id: 1 },
//!         fetch_track,
//!         |data: &TrackData| {
//!             data.name
//!                 .clone()
//!                 .ok_or_else(|| BoxError::from("track without a name"))
//!         },
//!         QueryOptions::default(),
//!     );
//!
//!     match track.result() {
//!         graphql_query::QueryResult::Success(name) => println!("{name}"),
//!         other => println!("{other:?}"),
//!     }
//! }
//! ```

mod client;
mod create_shared_query;
mod error;
mod instant;
mod operation;
mod query;
mod query_executor;
mod query_result;
mod query_state;
mod retry;
mod use_query;
mod util;

pub use client::*;
pub use create_shared_query::*;
pub use error::*;
pub use instant::*;
pub use operation::*;
pub use query::ListenerId;
pub use query_result::*;
pub use query_state::*;
pub use retry::*;
pub use use_query::*;

/// Convenience trait for query variable requirements.
pub trait QueryVariables: std::fmt::Debug + Clone {}
impl<K> QueryVariables for K where K: std::fmt::Debug + Clone {}

/// Convenience trait for raw query data requirements.
pub trait QueryValue: std::fmt::Debug + Clone {}
impl<V> QueryValue for V where V: std::fmt::Debug + Clone {}
