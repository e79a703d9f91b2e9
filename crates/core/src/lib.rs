// PIRA Core - Configuration Model, Functor Resolution & Orchestration
// NO process or instrumentation tooling dependencies (adapters live in infra crates)

pub mod application;
pub mod domain;
pub mod error;
pub mod port;

pub use error::{AppError, Result};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
