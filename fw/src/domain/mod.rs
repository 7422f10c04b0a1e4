//! Domain types for feedwatch
//!
//! A [`Record`] is one decoded broadcast indicator observation. Records are
//! produced only by [`Record::decode`] (or the remote lookup, which uses the
//! same schema) and are shared immutably once built.

mod record;

pub use record::{DecodeError, Record};
