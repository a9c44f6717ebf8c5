//! journey-sync - Offline-first sync engine
//!
//! The client half of a food-discovery app keeps working while the server is
//! unreachable. Writes that cannot reach the API are queued locally and
//! replayed once connectivity returns; reads are served from the last
//! server snapshot layered with whatever the user did since.
//!
//! # Module Structure
//!
//! - **`shared`** - error type, configuration, entities, mutation model
//! - **`config`** - defaults and environment overrides on top of `shared::config`
//! - **`local_db`** - SQLite key-value store, cache snapshot and user identity
//! - **`api_client`** - typed access to the REST API
//! - **`offline`** - pending mutation queue, optimistic mirror, reconciliation
//! - **`sync`** - connectivity monitor, sync status, metrics, background service
//! - **`operations`** - favorites, budget transactions, itineraries, reservations
//!
//! # Usage
//!
//! ```rust,no_run
//! use journey_sync::config::Config;
//! use journey_sync::offline::OfflineManager;
//! use journey_sync::sync::SyncService;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::from_env()?;
//! let manager = OfflineManager::open(&config).await?;
//! let mut service = SyncService::new(manager.clone());
//! service.start();
//!
//! let favorite = manager.favorites_ops().add("42", Some("Spice Route")).await?;
//! println!("saved {:?}", favorite.id());
//! # Ok(())
//! # }
//! ```
//!
//! # Error Handling
//!
//! Every fallible call returns [`shared::error::Result`]. Connectivity
//! failures never reach the caller of a mutation operation: they turn into a
//! queued mutation and an optimistic record instead.

/// Shared types and data structures
pub mod shared;

/// Runtime configuration
pub mod config;

/// Local SQLite persistence
pub mod local_db;

/// REST API client
pub mod api_client;

/// Offline queue, optimistic mirror and reconciliation
pub mod offline;

/// Connectivity monitoring and background sync
pub mod sync;

/// Mutation-issuing operations
pub mod operations;
