// Functor Port
// Externally pluggable orchestration steps (build, clean, run generation, analysis)

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

use crate::domain::FunctorName;

/// Execution contract a functor advertises
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctorMethod {
    /// Active functors perform their side effect themselves;
    /// passive ones return a command the orchestrator runs
    pub active: bool,
}

/// Everything a functor invocation receives
#[derive(Debug, Clone, PartialEq)]
pub struct FunctorContext {
    pub benchmark: String,
    pub working_dir: PathBuf,
    /// Named options (e.g. `compiler`)
    pub kwargs: BTreeMap<String, String>,
    /// Expanded invocation arguments (run generation only)
    pub args: Vec<String>,
}

impl FunctorContext {
    pub fn new(benchmark: impl Into<String>, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            benchmark: benchmark.into(),
            working_dir: working_dir.into(),
            kwargs: BTreeMap::new(),
            args: Vec::new(),
        }
    }

    pub fn kwarg(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.kwargs.insert(key.into(), value.into());
        self
    }

    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    /// Keyword arguments as `PIRA_<KEY>` environment pairs
    pub fn kwarg_env(&self) -> impl Iterator<Item = (String, String)> + '_ {
        self.kwargs.iter().map(|(k, v)| (kwarg_env_name(k), v.clone()))
    }
}

const KWARG_ENV_PREFIX: &str = "PIRA_";

/// Environment variable carrying one keyword argument
pub fn kwarg_env_name(key: &str) -> String {
    format!("{KWARG_ENV_PREFIX}{}", key.to_ascii_uppercase())
}

/// Functor errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FunctorError {
    #[error("Functor directory does not exist: {0}")]
    MissingDirectory(PathBuf),

    #[error("Functor '{file}' not found in {dir}")]
    MissingFile { dir: PathBuf, file: String },

    #[error("Functor '{functor}' violated the protocol: {reason}")]
    Protocol { functor: String, reason: String },

    #[error("Functor '{functor}' failed: {reason}")]
    Invocation { functor: String, reason: String },

    #[error("Functor '{functor}' does not support {mode} invocation")]
    Unsupported { functor: String, mode: &'static str },
}

/// A resolved functor
#[async_trait]
pub trait Functor: Send + Sync {
    /// Resolved name, for logging
    fn name(&self) -> &str;

    fn get_method(&self) -> FunctorMethod;

    fn is_active(&self) -> bool {
        self.get_method().active
    }

    /// Perform the step. Returns the functor's trimmed output; the builder
    /// ignores it, run generators report the generated script path.
    async fn active(&self, ctx: &FunctorContext) -> Result<String, FunctorError>;

    /// Return the command that performs the step
    async fn passive(&self, ctx: &FunctorContext) -> Result<String, FunctorError>;
}

/// Maps a search directory and functor name to an implementation.
/// Resolution never mutates process-wide state.
#[async_trait]
pub trait FunctorResolver: Send + Sync {
    /// # Errors
    /// - FunctorError::MissingDirectory if `search_dir` does not exist
    /// - FunctorError::MissingFile if no functor of that name is there
    async fn resolve(
        &self,
        search_dir: &Path,
        name: &FunctorName,
    ) -> Result<Arc<dyn Functor>, FunctorError>;
}

/// File name of a functor relative to its search directory.
/// DB-relative names carry a leading `/` that must not make the join absolute.
pub fn relative_file_name(name: &FunctorName) -> String {
    name.file_name().trim_start_matches('/').to_string()
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// One recorded invocation
    #[derive(Debug, Clone, PartialEq)]
    pub struct FunctorCall {
        pub functor: String,
        pub mode: &'static str,
        pub benchmark: String,
        pub working_dir: PathBuf,
    }

    /// Functor with fixed behavior
    pub struct StaticFunctor {
        name: String,
        active: bool,
        output: String,
        fail: Option<String>,
        calls: Arc<Mutex<Vec<FunctorCall>>>,
    }

    impl StaticFunctor {
        /// Passive functor returning `command`
        pub fn passive(name: impl Into<String>, command: impl Into<String>) -> Self {
            Self {
                name: name.into(),
                active: false,
                output: command.into(),
                fail: None,
                calls: Arc::new(Mutex::new(Vec::new())),
            }
        }

        /// Active functor reporting `output`
        pub fn active(name: impl Into<String>, output: impl Into<String>) -> Self {
            Self {
                active: true,
                ..Self::passive(name, output)
            }
        }

        pub fn failing(mut self, reason: impl Into<String>) -> Self {
            self.fail = Some(reason.into());
            self
        }

        pub fn sharing_calls(mut self, calls: Arc<Mutex<Vec<FunctorCall>>>) -> Self {
            self.calls = calls;
            self
        }

        fn record(&self, mode: &'static str, ctx: &FunctorContext) -> Result<String, FunctorError> {
            self.calls.lock().unwrap().push(FunctorCall {
                functor: self.name.clone(),
                mode,
                benchmark: ctx.benchmark.clone(),
                working_dir: ctx.working_dir.clone(),
            });
            match &self.fail {
                Some(reason) => Err(FunctorError::Invocation {
                    functor: self.name.clone(),
                    reason: reason.clone(),
                }),
                None => Ok(self.output.clone()),
            }
        }
    }

    #[async_trait]
    impl Functor for StaticFunctor {
        fn name(&self) -> &str {
            &self.name
        }

        fn get_method(&self) -> FunctorMethod {
            FunctorMethod {
                active: self.active,
            }
        }

        async fn active(&self, ctx: &FunctorContext) -> Result<String, FunctorError> {
            self.record("active", ctx)
        }

        async fn passive(&self, ctx: &FunctorContext) -> Result<String, FunctorError> {
            self.record("passive", ctx)
        }
    }

    /// In-memory resolver keyed by (search dir, file name)
    #[derive(Default)]
    pub struct FunctorRegistry {
        functors: Mutex<HashMap<(PathBuf, String), Arc<dyn Functor>>>,
        calls: Arc<Mutex<Vec<FunctorCall>>>,
    }

    impl FunctorRegistry {
        pub fn new() -> Self {
            Self::default()
        }

        /// Register a functor; its invocations are recorded in this registry
        pub fn register(&self, dir: impl Into<PathBuf>, file: impl Into<String>, functor: StaticFunctor) {
            let functor = functor.sharing_calls(Arc::clone(&self.calls));
            self.functors
                .lock()
                .unwrap()
                .insert((dir.into(), file.into()), Arc::new(functor));
        }

        pub fn calls(&self) -> Vec<FunctorCall> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl FunctorResolver for FunctorRegistry {
        async fn resolve(
            &self,
            search_dir: &Path,
            name: &FunctorName,
        ) -> Result<Arc<dyn Functor>, FunctorError> {
            let file = relative_file_name(name);
            self.functors
                .lock()
                .unwrap()
                .get(&(search_dir.to_path_buf(), file.clone()))
                .cloned()
                .ok_or(FunctorError::MissingFile {
                    dir: search_dir.to_path_buf(),
                    file,
                })
        }
    }
}
