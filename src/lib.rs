// src/lib.rs

#[macro_use]
pub mod macros;

pub mod cli;
pub mod config;
pub mod error;
pub mod input;
pub mod locate;
pub mod net;
pub mod progress;
pub mod reconcile;
pub mod repair;
pub mod run;
pub mod store;
