//! Device-level drivers: button gesture classification and sysfs/evdev
//! file access.

pub mod button;
pub mod sysfs;
