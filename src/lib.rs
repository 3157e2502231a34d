#![forbid(unsafe_code)]

pub mod cli;
pub mod config;
pub mod core;
pub mod docker;
pub mod error;
pub mod git;
pub mod graph;
pub mod util;

#[cfg(test)]
pub(crate) mod test_support;
