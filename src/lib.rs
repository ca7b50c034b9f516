// Library surface for headless/integration tests and reuse.
// Keep this lean to avoid coupling to bin-only types in main.rs.
pub mod app_dirs;
pub mod binding;
pub mod clock;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod live_value;
pub mod runtime;
pub mod session;
pub mod shell;
pub mod template;
pub mod timer_state;
pub mod ui;

pub use error::{Error, Result};
