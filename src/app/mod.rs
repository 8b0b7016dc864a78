//! Application core: domain logic behind port traits.
//!
//! Gesture state, device shadows and the screen idle policy live in
//! [`service::RelayService`].  Hardware and the message bus are reached
//! only through the traits in [`ports`], so the whole core runs against
//! mocks on the host.

pub mod commands;
pub mod events;
pub mod ports;
pub mod service;
