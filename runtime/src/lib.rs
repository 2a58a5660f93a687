// Copyright 2026 Rankscope Contributors
// SPDX-License-Identifier: Apache-2.0

//! Rankscope runtime: result history, CSV bulk checks, scheduled
//! re-checks, email and webhook reports, the HTTP API and the CLI.
//!
//! The library crate exposes these modules for integration testing.

pub mod cli;
pub mod config;
pub mod csv_io;
pub mod notify;
pub mod rest;
pub mod scheduler;
pub mod server;
pub mod store;
