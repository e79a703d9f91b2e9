// PIRA Infrastructure - System Adapters
// Implements: ShellExecutor, FunctorResolver

pub mod instrumentation_file;
pub mod script_functor;
pub mod shell_executor;

pub use script_functor::{ScriptFunctor, ScriptFunctorResolver};
pub use shell_executor::SystemShell;
