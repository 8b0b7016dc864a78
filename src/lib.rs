//! relayd library.
//!
//! Exposes the reactor, scheduler and domain core for the binary and for
//! host integration tests.  Only [`drivers::sysfs`] and [`reactor`] touch
//! real file descriptors; everything else runs against port traits.

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod drivers;
pub mod error;
pub mod events;
pub mod pins;
pub mod reactor;
pub mod scheduler;
