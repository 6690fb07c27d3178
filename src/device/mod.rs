//! Linux kernel input devices: capability probing, node scanning and the
//! per-device reader thread.

pub mod codes;
pub mod contacts;
pub mod probe;
pub mod query;
pub mod reader;
pub mod record;
pub mod scan;

#[cfg(test)]
pub(crate) mod fake;
