//! MFA-gated AWS credential broker.
//!
//! Session credentials obtained with an MFA code are cached in
//! `~/.aws/credcache.json`; every run then assumes the configured role and
//! either prints `export` statements or execs a command with the role
//! credentials in its environment.

pub mod aws;
pub mod cli;
pub mod commands;
pub mod config;
pub mod constants;
pub mod dispatch;
pub mod error;
pub mod pinentry;
