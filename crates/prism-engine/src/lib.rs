//! Prism engine crate.
//!
//! Presents a fixed pipeline to a window every frame, rebuilding render
//! targets whenever the surface size changes.

pub mod device;
pub mod logging;
pub mod present;
pub mod window;
