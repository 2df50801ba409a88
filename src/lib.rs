//! SDM Invoke: run command handlers on a software delivery machine from a terminal
//!
//! Fills in missing parameters (from context or interactively), sends the invocation
//! to the automation process over HTTP, and waits on a local callback listener for
//! the correlated completion notification.

pub mod cli;
pub mod config;
pub mod context;
pub mod correlation;
pub mod error;
pub mod github;
pub mod hooks;
pub mod invocation;
pub mod invoker;
pub mod listener;
pub mod logging;
pub mod metadata;
pub mod orchestrator;
pub mod port;
pub mod prompt;
pub mod resolver;
