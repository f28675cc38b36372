//! # groups
//!
//! Session authentication and access control for the groups application.
//!
//! Users register with an email and password. Logging in issues an opaque session token,
//! carried as an `HttpOnly` cookie or a bearer header, that expires a fixed time after login.
//! Protected routes sit behind an access gate that redirects anonymous requests to the login
//! page.
//!
//! - [`store`]: credential and session stores (in memory or PostgreSQL)
//! - [`auth`]: registration, login, logout and session resolution
//! - [`api`]: the axum router, the access gate and the server
//! - [`cli`]: command line, logging and startup

pub mod api;
pub mod auth;
pub mod cli;
pub mod clock;
pub mod store;

pub use api::GIT_COMMIT_HASH;
