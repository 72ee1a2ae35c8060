//! Async abstraction layer for the media sync workspace.
//!
//! All core-* and provider-* crates depend on this crate instead of reaching
//! for tokio directly, so the executor, timers and synchronization primitives
//! are chosen in exactly one place.
//!
//! # Modules
//!
//! - `task`: Task spawning and execution
//! - `time`: Sleep, timeouts, intervals and a tokio-aware `Instant`
//! - `sync`: Synchronization primitives and cancellation tokens
//! - `signal`: Ctrl-C listener for graceful shutdown
//! - `runtime`: Blocking entry points used by the attribute macros
//!
//! # Examples
//!
//! ```rust
//! use core_async::task;
//! use core_async::time::{sleep, Duration};
//!
//! async fn example() {
//!     let handle = task::spawn(async {
//!         sleep(Duration::from_secs(1)).await;
//!         42
//!     });
//!     assert_eq!(handle.await.unwrap(), 42);
//! }
//! ```

// Re-export the async entry-point/test macros so downstream crates never need
// direct Tokio dependencies.
pub use core_async_macros::{main, test};

pub mod runtime;
pub mod signal;
pub mod sync;
pub mod task;
pub mod time;

pub use task::spawn;
pub use tokio::select;
pub use time::{sleep, Duration, Instant};
