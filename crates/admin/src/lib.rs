//! Gazetteer admin library.
//!
//! Everything the admin server and the CLI share: configuration, the
//! Postgres repositories, the directory and auth services, session
//! middleware and the JSON API routes.
//!
//! # Security
//!
//! Every `/api/*` route requires a logged-in, active user. There is no
//! finer-grained authorization: any user may edit the whole directory.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
