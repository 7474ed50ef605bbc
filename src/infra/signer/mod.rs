//! Signing backends for Flow transaction messages.

pub mod local;
pub mod remote;

pub use self::{local::Local, remote::Remote};
