//! Shared test harness: mocked collaborators, config builder, server wrapper

#![allow(dead_code)]

pub mod backends;
pub mod config;
pub mod server;
