//! Records module - Poem record types and the record service client

pub mod client;
pub mod types;

pub use client::{RecordServiceClient, RecordStore};
pub use types::{NewPoemRecord, PoemRecord};
