//! Process signal listeners.

pub use tokio::signal::ctrl_c;
