// Application Layer - Use Cases and Orchestration

pub mod analysis;
pub mod builder;
pub mod loader;
pub mod run_config;
pub mod targets;

// Re-exports
pub use analysis::{AnalysisOutcome, Analyzer};
pub use builder::{BuildError, BuildFailure, BuildOutcome, BuildReport, Builder, StepStatus};
pub use loader::{
    detect_schema, ConfigurationLoader, ConfigurationParser, DetectingParser, LegacyConfigurationLoader,
    LegacyParser, SimplifiedConfigurationLoader, SimplifiedParser,
};
pub use run_config::{RunConfiguration, RunConfigurationGenerator};
pub use targets::make_targets;
