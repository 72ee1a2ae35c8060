//! Time-related abstractions.
//!
//! `Instant` is Tokio's instant rather than `std::time::Instant`: it follows
//! the runtime clock, so code measured under a paused test runtime observes
//! the virtual time that `sleep` advanced.
//!
//! # Examples
//!
//! ```rust
//! use core_async::time::{sleep, Duration, Instant};
//!
//! async fn example() {
//!     let start = Instant::now();
//!     sleep(Duration::from_secs(1)).await;
//!     println!("Took {:?}", start.elapsed());
//! }
//! ```

pub use tokio::time::{
    advance, interval, interval_at, pause, resume, sleep, sleep_until, timeout, Instant,
    Interval, MissedTickBehavior, Sleep, Timeout,
};

pub use tokio::time::error::Elapsed;

pub use std::time::{Duration, SystemTime, UNIX_EPOCH};
