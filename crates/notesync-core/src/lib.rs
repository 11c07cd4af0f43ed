//! notesync-core - Core library for NoteSync
//!
//! This crate contains the shared models, the hosted backend clients, the
//! session context and the view-models used by every NoteSync interface.

pub mod auth;
pub mod config;
pub mod error;
pub mod media;
pub mod models;
pub mod remote;
pub mod routes;
pub mod session;
pub mod util;
pub mod views;

pub use error::{Error, Result};
pub use models::{Note, NoteId};
