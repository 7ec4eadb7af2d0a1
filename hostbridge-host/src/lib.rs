//! hostbridge host
//!
//! The native half of the command bridge: a [`Dispatcher`] holding the
//! commands a host answers, an async [`serve`] loop that answers invoke
//! envelopes from a guest, and a C ABI so non-Rust embedders can host
//! commands too.
//!
//! Compiled as both an rlib (used by the CLI) and a cdylib (loaded by C
//! embedders). All C entry points are `extern "C"` with `#[no_mangle]`.

pub mod demo;
pub mod dispatcher;
pub mod ffi;
mod handle;
pub mod server;

pub use dispatcher::{CommandHandler, Dispatcher, HostResult};
pub use server::{serve, ServeOptions, ServeStats};
