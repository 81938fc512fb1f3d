//! DRIFT retrieval HTTP service.

pub mod bootstrap;
pub mod server;
