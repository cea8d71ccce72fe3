//! Window + runtime loop.
//!
//! Owns the `winit` EventLoop and Window, and drives the frame presenter once
//! per redraw.

#[cfg(not(target_arch = "wasm32"))]
mod entry;
mod runtime;
#[cfg(target_arch = "wasm32")]
mod web;

#[cfg(not(target_arch = "wasm32"))]
use entry::WindowEntry;
#[cfg(target_arch = "wasm32")]
use web::WindowEntry;

pub use runtime::{Runtime, RuntimeConfig};
