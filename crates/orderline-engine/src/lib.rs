//! # orderline-engine: Mutation Safety for Orderline
//!
//! Wraps the pure admission rules of `orderline-core` in the concurrency
//! control that keeps two writers from corrupting the same record.
//!
//! ## Module Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      orderline-engine                                   │
//! │                                                                         │
//! │  orchestrator  OrderProcessor: validate → sanitize → lock → stamp      │
//! │  catalog       MenuCatalog: identity index + per-item locks            │
//! │  lock          LockManager: TTL locks, tokens, version checks          │
//! │  sweeper       LockSweeper: periodic expired-lock eviction             │
//! │  clock         Clock trait, SystemClock, ManualClock                   │
//! │  config        EngineConfig: TOML + env overrides                      │
//! │  telemetry     tracing subscriber setup                                │
//! │  error         EngineError, LockError, LockConflict                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Wiring
//! ```rust,no_run
//! use std::sync::Arc;
//! use orderline_engine::{EngineConfig, LockSweeper, MenuCatalog, OrderProcessor};
//!
//! # async fn wire() {
//! let config = EngineConfig::load_or_default(None);
//! let processor = OrderProcessor::from_config(&config);
//! let catalog = MenuCatalog::with_rules(processor.locks().clone(), config.validation);
//!
//! let (sweeper, handle) = LockSweeper::new(
//!     processor.locks().clone(),
//!     config.locks.sweep_interval(),
//! );
//! tokio::spawn(sweeper.run());
//! # let _ = (catalog, handle);
//! # }
//! ```

pub mod catalog;
pub mod clock;
pub mod config;
pub mod error;
pub mod lock;
pub mod orchestrator;
pub mod sweeper;
pub mod telemetry;

pub use catalog::{CatalogOutcome, MenuCatalog};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{EngineConfig, LockSettings};
pub use error::{EngineError, EngineResult, LockConflict, LockError};
pub use lock::{LockGrant, LockGuard, LockManager, LockToken, DEFAULT_LOCK_TTL};
pub use orchestrator::{LockInfo, OrderProcessor, ProcessOutcome};
pub use sweeper::{LockSweeper, LockSweeperHandle};
