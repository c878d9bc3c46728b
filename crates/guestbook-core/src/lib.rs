//! Core types for the guestbook client.
//!
//! This crate is deliberately free of HTTP and terminal dependencies. It owns
//! the domain model (users, notes, neighborhoods), token decoding, and the
//! session lifecycle on top of an abstract [`storage::SessionStorage`].

// Native `async fn` in traits; the storage trait spells out `Send` bounds
// explicitly where it matters.
#![allow(async_fn_in_trait)]

pub mod error;
pub mod neighborhood;
pub mod note;
pub mod session;
pub mod storage;
pub mod token;
pub mod user;

pub use error::{Error, Result};
