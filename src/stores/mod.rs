//! State containers observed by the app's screens

pub mod content;
pub mod errors;
pub mod preferences;
pub mod session;

pub use content::{ContentStore, LoadOutcome};
pub use errors::{ErrorState, ErrorStore, MAX_ERRORS};
pub use preferences::PreferencesStore;
pub use session::SessionFlags;
