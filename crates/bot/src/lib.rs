//! Countersign bot library.
//!
//! This crate provides the bot functionality as a library, allowing it to be
//! tested and reused. The binary in `main.rs` wires it to an axum server.
//!
//! # Security
//!
//! This crate holds live Slack credentials:
//! - a bot token able to post, edit and delete messages in finance channels
//! - the signing secret used to authenticate inbound interactions
//!
//! Keep both out of logs; config types redact them in `Debug` output.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod error;
pub mod routes;
pub mod services;
pub mod slack;
pub mod state;
