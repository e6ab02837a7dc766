//! Types shared between the mail client and the dev backend.

pub mod domain;
pub mod error;
pub mod protocol;
