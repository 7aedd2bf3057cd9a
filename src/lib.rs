//! # Coursetrack
//!
//! A learning-progress server, usable both as a standalone binary and as a
//! library.
//!
//! Administrators curate a category → subject → topic → exercise hierarchy;
//! learners enroll in subjects, record exercise attempts, toggle topic
//! completion, and read aggregated progress back out.
//!
//! ## Library Usage
//!
//! ```toml
//! [dependencies]
//! coursetrack = { version = "0.1", default-features = false }
//! ```
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use std::path::PathBuf;
//! use coursetrack::server::{AppState, create_router};
//! use coursetrack::store::{SqliteStore, Store};
//!
//! let store = SqliteStore::new(&PathBuf::from("./data/coursetrack.db")).unwrap();
//! store.initialize().unwrap();
//!
//! let state = Arc::new(AppState { store: Arc::new(store) });
//! let router = create_router(state);
//! // Serve with axum...
//! ```
//!
//! ## Feature Flags
//!
//! - `cli` (default): Includes the binary's CLI. Disable with
//!   `default-features = false`.

pub mod auth;
pub mod config;
pub mod error;
pub mod progress;
pub mod server;
pub mod store;
pub mod types;
