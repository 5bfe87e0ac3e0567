//! Diagnostic reports over a feed or the written documents.
//!
//! These back the `inspect` and `stop-codes` commands. They log what they
//! find and write nothing.

pub mod inspect;
pub mod stop_codes;
pub mod utility;
