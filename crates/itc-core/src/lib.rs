//! itc-core: Interval Tree Clocks.
//!
//! Causality tracking for a set of replicas that fork and join at will,
//! without globally assigned replica ids.
//!
//! ```
//! use itc_core::Stamp;
//!
//! let mut a = Stamp::seed();
//! let mut b = a.fork()?;
//! a.event()?;
//! b.event()?;
//! assert!(a.concurrent(&b));
//!
//! a.join(b);
//! let bytes = a.marshal();
//! assert_eq!(Stamp::unmarshal(&bytes)?, a);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Conventions
//!
//! - **Errors**: clock and codec operations return typed errors from
//!   [`error`]; configuration loading returns `anyhow::Result`.
//! - **Logging**: `tracing` macros (`debug!`, `trace!`). No subscriber is
//!   installed here.

pub mod bits;
pub mod clock;
pub mod config;
pub mod error;

pub use clock::{Event, Id, Stamp};
pub use config::{CodecConfig, ItcConfig};
pub use error::{ClockError, DecodeError, ErrorCode};
