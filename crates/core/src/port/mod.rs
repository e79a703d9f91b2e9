// Port Layer - Interfaces for external collaborators

pub mod functor;
pub mod id_provider; // For deterministic testing
pub mod shell;
pub mod time_provider;

// Re-exports
pub use functor::{
    kwarg_env_name, Functor, FunctorContext, FunctorError, FunctorMethod, FunctorResolver,
};
pub use id_provider::IdProvider;
pub use shell::{ShellCommand, ShellError, ShellExecutor, ShellOutput};
pub use time_provider::TimeProvider;
