// Domain Layer - Configuration model, argument mapping and naming rules

pub mod argmap;
pub mod configuration;
pub mod error;
pub mod naming;
pub mod target;

// Re-exports
pub use argmap::{ArgValue, ArgumentMapping, MapperMode, Parameter};
pub use configuration::{
    Build, Configuration, FunctorPaths, ItemMode, PiraItem, RunOptions, SchemaVersion, Target,
};
pub use error::{ConfigError, LookupError};
pub use naming::{FunctorName, FunctorRole};
pub use target::{ExtrapConfiguration, InstrumentConfig, InvocationConfiguration, TargetConfiguration};
