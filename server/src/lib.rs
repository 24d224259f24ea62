//! Form uploader library
//!
//! This library exposes the core functionality of the form uploader for
//! testing and embedding.

pub mod app;
pub mod config;
pub mod crypto;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;
pub mod storage;
