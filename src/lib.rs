//! PitchLink client state core
//!
//! Reactive stores behind the PitchLink screens:
//!
//! - **stores::content**: editorial and live-match content with free, premium
//!   and personalized views
//! - **stores::preferences**: personalization settings persisted to secure storage
//! - **stores::errors**: bounded error history and keyed loading flags
//! - **stores::session**: onboarding and sign-in flags
//! - **database**: secure key-value storage backends
//!
//! Each store exposes `snapshot()` and `subscribe()`; subscribers are woken
//! after every visible change.

pub mod config;
pub mod database;
pub mod error;
pub mod models;
pub mod pitchlink;
pub mod sources;
pub mod stores;
pub mod traits;

pub use config::{AppConfig, StorageKeys};
pub use error::{RequestError, StorageError};
pub use pitchlink::PitchLink;
