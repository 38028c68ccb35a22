//! Pieces of the `docai` binary that are worth testing on their own.

pub mod completer;
pub mod render;

pub use completer::CommandCompleter;
pub use render::{render_answer, render_candidates, render_reasoning, render_status};

use tracing_subscriber::EnvFilter;

/// Log to stderr, filtered by `RUST_LOG` or else the configured level.
pub fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).with_target(false).with_writer(std::io::stderr).try_init();
}
