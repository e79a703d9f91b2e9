// Execution Target Value Objects

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One (build, item, flavor) execution target, created just before building or running
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetConfiguration {
    pub build: String,
    pub item: String,
    pub flavor: String,
    /// Unique database identity of this target
    pub db_item_id: String,
    pub compile_time_filtering: bool,
    /// Generated instrumentation selection file; only meaningful for runtime filtering
    pub instr_file: Option<String>,
    pub args_for_invocation: Option<String>,
}

impl TargetConfiguration {
    pub fn new(
        build: impl Into<String>,
        item: impl Into<String>,
        flavor: impl Into<String>,
        db_item_id: impl Into<String>,
        compile_time_filtering: bool,
    ) -> Self {
        Self {
            build: build.into(),
            item: item.into(),
            flavor: flavor.into(),
            db_item_id: db_item_id.into(),
            compile_time_filtering,
            instr_file: None,
            args_for_invocation: None,
        }
    }

    pub fn with_instr_file(mut self, instr_file: impl Into<String>) -> Self {
        self.instr_file = Some(instr_file.into());
        self
    }

    pub fn with_args(mut self, args: impl Into<String>) -> Self {
        self.args_for_invocation = Some(args.into());
        self
    }

    pub fn is_compile_time_filtering(&self) -> bool {
        self.compile_time_filtering
    }

    /// Instrumentation file, but only for runtime-filter targets
    pub fn runtime_instr_file(&self) -> Option<&str> {
        if self.compile_time_filtering {
            None
        } else {
            self.instr_file.as_deref()
        }
    }
}

/// Whether the current phase is an instrumentation run and of which refinement iteration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstrumentConfig {
    pub is_instrumentation_run: bool,
    pub instrumentation_iteration: Option<u32>,
}

impl InstrumentConfig {
    pub fn new(is_instrumentation_run: bool, instrumentation_iteration: Option<u32>) -> Self {
        Self {
            is_instrumentation_run,
            instrumentation_iteration,
        }
    }

    /// Vanilla (uninstrumented) phase
    pub fn vanilla() -> Self {
        Self::default()
    }

    pub fn instrumented(iteration: u32) -> Self {
        Self::new(true, Some(iteration))
    }
}

/// Process-wide invocation parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvocationConfiguration {
    pub path_to_config: PathBuf,
    pub compile_time_filtering: bool,
    pub num_repetitions: u32,
}

impl InvocationConfiguration {
    pub fn new(path_to_config: impl Into<PathBuf>, compile_time_filtering: bool, num_repetitions: u32) -> Self {
        Self {
            path_to_config: path_to_config.into(),
            compile_time_filtering,
            num_repetitions,
        }
    }
}

/// Output location and naming for the external performance-model generator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtrapConfiguration {
    pub dir: PathBuf,
    pub prefix: String,
    pub postfix: String,
}

impl ExtrapConfiguration {
    pub fn new(dir: impl Into<PathBuf>, prefix: impl Into<String>, postfix: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            prefix: prefix.into(),
            postfix: postfix.into(),
        }
    }
}
