#![forbid(unsafe_code)]

mod domain;
mod infra;
mod run;
#[cfg(test)]
mod tests;
mod util;

pub use run::start;
