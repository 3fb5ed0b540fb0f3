//! # Memopad
//!
//! Short text memos on top of a hosted backend-as-a-service platform, with
//! live updates pushed to every open board.
//!
//! ## Features
//!
//! - **Auth callback**: exchanges an authorization code for a session cookie
//! - **Session guard**: identity for signed-in users, redirect to sign-up otherwise
//! - **Sign-up**: platform account plus a `users` profile row, retryable
//! - **Memo board**: fetch, insert, delete and a live change feed with teardown
//!
//! ## Modules
//!
//! - [`backend`]: Backend platform contract, REST and in-memory clients
//! - [`auth`]: Callback, session guard and sign-up flows
//! - [`memos`]: Memo list, table access and the live board
//! - [`api`]: HTTP server with Axum
//! - [`websocket`]: Live board over WebSocket
//! - [`config`]: TOML configuration with environment overrides
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use memopad::backend::InMemoryBackend;
//! use memopad::memos::MemoBoard;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let board = Arc::new(MemoBoard::new(Arc::new(InMemoryBackend::new())));
//!
//!     // Subscribe, load, and keep applying remote changes
//!     let feed = board.mount().await?;
//!
//!     board.add("Buy milk").await;
//!     println!("{:?}", board.snapshot());
//!
//!     // Releases the backend subscription
//!     feed.unmount().await;
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod auth;
pub mod backend;
pub mod config;
pub mod memos;
pub mod websocket;

pub use api::{build_router, serve, ApiConfig, ApiError, AppState};

pub use backend::{Backend, BackendError, BackendResult, InMemoryBackend, RestBackend};

pub use memos::{LiveFeed, Memo, MemoBoard, MemoList};

pub use config::{Config, ConfigError};
