//! Serialization utilities for use with [`serde_with::serde_as`] macros.

mod base64;
mod hex;

pub use self::{base64::Base64, hex::Hex};
