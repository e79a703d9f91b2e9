// Builder - clean + build of one (build, item, flavor) target

mod scope;

pub use scope::{BuildPhase, DirectoryScope};

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::domain::{Configuration, FunctorName, FunctorRole, LookupError, TargetConfiguration};
use crate::port::{
    Functor, FunctorContext, FunctorError, FunctorResolver, ShellCommand, ShellError, ShellExecutor,
};

/// Compiler handed to build functors unless overridden
pub const DEFAULT_COMPILER: &str = "clang++";

/// Result of one build step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StepStatus {
    /// Not reached
    Pending,
    Succeeded,
    Failed,
    /// Handled inside an active functor
    Delegated,
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepStatus::Pending => write!(f, "pending"),
            StepStatus::Succeeded => write!(f, "ok"),
            StepStatus::Failed => write!(f, "failed"),
            StepStatus::Delegated => write!(f, "delegated"),
        }
    }
}

/// Per-step record of a build attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildOutcome {
    pub build: String,
    pub item: String,
    pub flavor: String,
    /// Build functor ran in active mode
    pub active: Option<bool>,
    pub clean: StepStatus,
    pub build_step: StepStatus,
}

impl BuildOutcome {
    fn new(build: &str, item: &str, flavor: &str) -> Self {
        Self {
            build: build.to_string(),
            item: item.to_string(),
            flavor: flavor.to_string(),
            active: None,
            clean: StepStatus::Pending,
            build_step: StepStatus::Pending,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.build_step, StepStatus::Succeeded)
            && matches!(self.clean, StepStatus::Succeeded | StepStatus::Delegated)
    }
}

/// Why a build attempt stopped
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BuildFailure {
    #[error("directory does not exist: {0}")]
    Directory(PathBuf),

    #[error(transparent)]
    Lookup(#[from] LookupError),

    #[error(transparent)]
    Functor(#[from] FunctorError),

    #[error(transparent)]
    Shell(#[from] ShellError),
}

/// Failed build, with what had succeeded before the failure
#[derive(Error, Debug, Clone, PartialEq)]
#[error("build of '{}' ({}) in {} failed (clean: {}, build: {}): {source}",
    .outcome.item, .outcome.flavor, .outcome.build, .outcome.clean, .outcome.build_step)]
pub struct BuildError {
    pub outcome: BuildOutcome,
    pub source: BuildFailure,
}

impl BuildError {
    fn new(outcome: &BuildOutcome, source: impl Into<BuildFailure>) -> Self {
        Self {
            outcome: outcome.clone(),
            source: source.into(),
        }
    }
}

/// Outcomes of a sweep over many targets
#[derive(Debug, Default)]
pub struct BuildReport {
    pub results: Vec<Result<BuildOutcome, BuildError>>,
}

impl BuildReport {
    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.results.len() - self.succeeded()
    }
}

/// Builds targets of one configuration.
///
/// Steps run strictly one after another; each gets its working directory
/// explicitly, so builders never share process state.
pub struct Builder {
    config: Arc<Configuration>,
    resolver: Arc<dyn FunctorResolver>,
    shell: Arc<dyn ShellExecutor>,
    no_instrumentation: bool,
    dry_run: bool,
    kwargs: BTreeMap<String, String>,
}

impl Builder {
    pub fn new(
        config: Arc<Configuration>,
        resolver: Arc<dyn FunctorResolver>,
        shell: Arc<dyn ShellExecutor>,
    ) -> Self {
        let mut kwargs = BTreeMap::new();
        kwargs.insert("compiler".to_string(), DEFAULT_COMPILER.to_string());
        Self {
            config,
            resolver,
            shell,
            no_instrumentation: false,
            dry_run: false,
            kwargs,
        }
    }

    /// Use `no_instr_` build functors
    pub fn no_instrumentation(mut self, no_instrumentation: bool) -> Self {
        self.no_instrumentation = no_instrumentation;
        self
    }

    /// Log clean/build commands instead of running them.
    /// Active build functors are not invoked at all.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn with_kwarg(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.kwargs.insert(key.into(), value.into());
        self
    }

    pub async fn build_target(&self, target: &TargetConfiguration) -> Result<BuildOutcome, BuildError> {
        self.build(&target.build, &target.item, &target.flavor).await
    }

    /// Clean and build one target inside its build directory
    ///
    /// # Errors
    /// BuildError with the partial outcome: which of clean/build had already
    /// succeeded when the lookup, resolution or shell failure happened.
    pub async fn build(&self, build: &str, benchmark: &str, flavor: &str) -> Result<BuildOutcome, BuildError> {
        let mut outcome = BuildOutcome::new(build, benchmark, flavor);

        let item = self
            .config
            .get_item(build, benchmark)
            .map_err(|e| BuildError::new(&outcome, e))?;
        if !item.declares_flavor(flavor) {
            return Err(BuildError::new(
                &outcome,
                LookupError::UnknownFlavor {
                    item: benchmark.to_string(),
                    flavor: flavor.to_string(),
                },
            ));
        }

        let mut scope = DirectoryScope::acquire(build)
            .map_err(|dir| BuildError::new(&outcome, BuildFailure::Directory(dir)))?;

        info!(build = %build, item = %benchmark, flavor = %flavor, "Building target");

        let build_name = FunctorName::new(FunctorRole::Build, &item.benchmark_name, flavor)
            .no_instr(self.no_instrumentation);
        let build_functor = self
            .resolver
            .resolve(Path::new(&item.functors.builder), &build_name)
            .await
            .map_err(|e| BuildError::new(&outcome, e))?;

        let ctx = self.functor_context(benchmark, scope.dir());

        let dispatched = if build_functor.is_active() {
            outcome.active = Some(true);
            outcome.clean = StepStatus::Delegated;
            self.run_active(&*build_functor, &ctx, &mut outcome).await
        } else {
            outcome.active = Some(false);
            self.run_passive(&*build_functor, &ctx, &scope, &mut outcome)
                .await
        };

        match dispatched {
            Ok(()) => {
                scope.mark_built();
                info!(build = %build, item = %benchmark, flavor = %flavor, "Target built");
                Ok(outcome)
            }
            Err(failure) => {
                error!(
                    build = %build,
                    item = %benchmark,
                    flavor = %flavor,
                    clean = %outcome.clean,
                    build_step = %outcome.build_step,
                    error = %failure,
                    "Build failed"
                );
                Err(BuildError::new(&outcome, failure))
            }
        }
    }

    /// Build every target of the configuration; failures do not stop the sweep
    pub async fn build_all(&self) -> BuildReport {
        let mut report = BuildReport::default();
        for target in self.config.targets() {
            let result = self.build(target.build, target.item, target.flavor).await;
            if let Err(e) = &result {
                warn!(error = %e, "Continuing after failed target");
            }
            report.results.push(result);
        }
        report
    }

    fn functor_context(&self, benchmark: &str, dir: &Path) -> FunctorContext {
        let mut ctx = FunctorContext::new(benchmark, dir);
        ctx.kwargs = self.kwargs.clone();
        ctx
    }

    async fn run_active(
        &self,
        functor: &dyn Functor,
        ctx: &FunctorContext,
        outcome: &mut BuildOutcome,
    ) -> Result<(), BuildFailure> {
        if self.dry_run {
            info!(functor = %functor.name(), "Dry run, not invoking active build functor");
            outcome.build_step = StepStatus::Succeeded;
            return Ok(());
        }

        debug!(functor = %functor.name(), "Invoking active build functor");
        match functor.active(ctx).await {
            Ok(_) => {
                outcome.build_step = StepStatus::Succeeded;
                Ok(())
            }
            Err(e) => {
                outcome.build_step = StepStatus::Failed;
                Err(e.into())
            }
        }
    }

    async fn run_passive(
        &self,
        build_functor: &dyn Functor,
        ctx: &FunctorContext,
        scope: &DirectoryScope,
        outcome: &mut BuildOutcome,
    ) -> Result<(), BuildFailure> {
        let item = self.config.get_item(&outcome.build, &outcome.item)?;
        let clean_name = FunctorName::new(FunctorRole::Clean, &item.benchmark_name, &outcome.flavor);
        let clean_functor = self
            .resolver
            .resolve(Path::new(&item.functors.cleaner), &clean_name)
            .await?;

        let command_build = build_functor.passive(ctx).await?;
        let command_clean = clean_functor.passive(ctx).await?;

        let bench_dir = scope
            .benchmark_dir(&outcome.item)
            .map_err(BuildFailure::Directory)?;

        debug!(dir = %bench_dir.display(), command = %command_clean, "Making clean");
        let clean = self.shell_command(command_clean, &bench_dir, ctx);
        if let Err(e) = self.shell.run(&clean).await {
            outcome.clean = StepStatus::Failed;
            return Err(e.into());
        }
        outcome.clean = StepStatus::Succeeded;

        debug!(dir = %bench_dir.display(), command = %command_build, "Building");
        let build = self.shell_command(command_build, &bench_dir, ctx);
        if let Err(e) = self.shell.run(&build).await {
            outcome.build_step = StepStatus::Failed;
            return Err(e.into());
        }
        outcome.build_step = StepStatus::Succeeded;
        Ok(())
    }

    /// Passive commands see the same `PIRA_<KEY>` variables as the functor
    fn shell_command(&self, command: String, dir: &Path, ctx: &FunctorContext) -> ShellCommand {
        ctx.kwarg_env().fold(
            ShellCommand::new(command).in_dir(dir).dry_run(self.dry_run),
            |cmd, (key, value)| cmd.env(key, value),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        ArgumentMapping, FunctorPaths, MapperMode, PiraItem, RunOptions, SchemaVersion,
    };
    use crate::port::functor::mocks::{FunctorRegistry, StaticFunctor};
    use crate::port::shell::mocks::RecordingShell;

    struct Fixture {
        _root: tempfile::TempDir,
        build_dir: String,
        functor_dir: String,
        config: Arc<Configuration>,
    }

    fn fixture() -> Fixture {
        let root = tempfile::tempdir().unwrap();
        let build_dir = root.path().join("build");
        std::fs::create_dir_all(build_dir.join("astar")).unwrap();
        let build_dir = build_dir.display().to_string();
        let functor_dir = root.path().join("functors").display().to_string();

        let mut item = PiraItem::new(
            "astar",
            FunctorPaths::uniform(functor_dir.clone()),
            RunOptions::Mapped(ArgumentMapping::empty(MapperMode::Linear)),
        );
        item.flavors = vec!["ct".to_string()];

        let mut config = Configuration::new(SchemaVersion::Simplified);
        config.add_item(&build_dir, item).unwrap();

        Fixture {
            _root: root,
            build_dir,
            functor_dir,
            config: Arc::new(config),
        }
    }

    fn builder(f: &Fixture, registry: Arc<FunctorRegistry>, shell: RecordingShell) -> Builder {
        Builder::new(Arc::clone(&f.config), registry, Arc::new(shell))
    }

    #[tokio::test]
    async fn test_passive_build_runs_clean_then_build_in_benchmark_dir() {
        let f = fixture();
        let registry = Arc::new(FunctorRegistry::new());
        registry.register(&f.functor_dir, "astar_ct", StaticFunctor::passive("astar_ct", "make all"));
        registry.register(&f.functor_dir, "clean_astar_ct", StaticFunctor::passive("clean", "make clean"));
        let shell = RecordingShell::new();

        let outcome = builder(&f, registry, shell.clone())
            .build(&f.build_dir, "astar", "ct")
            .await
            .unwrap();

        assert!(outcome.is_success());
        assert_eq!(outcome.active, Some(false));
        assert_eq!(shell.commands(), vec!["make clean", "make all"]);
        let expected_dir = Path::new(&f.build_dir).join("astar");
        assert!(shell
            .calls()
            .iter()
            .all(|c| c.working_dir.as_deref() == Some(expected_dir.as_path())));
    }

    #[tokio::test]
    async fn test_passive_commands_receive_kwargs_as_env() {
        let f = fixture();
        let registry = Arc::new(FunctorRegistry::new());
        registry.register(&f.functor_dir, "astar_ct", StaticFunctor::passive("b", "make all"));
        registry.register(&f.functor_dir, "clean_astar_ct", StaticFunctor::passive("c", "make clean"));
        let shell = RecordingShell::new();

        builder(&f, registry, shell.clone())
            .with_kwarg("compiler", "g++")
            .build(&f.build_dir, "astar", "ct")
            .await
            .unwrap();

        let calls = shell.calls();
        assert_eq!(calls.len(), 2);
        for call in calls {
            assert_eq!(
                call.env,
                vec![("PIRA_COMPILER".to_string(), "g++".to_string())]
            );
        }
    }

    #[tokio::test]
    async fn test_failed_clean_skips_build() {
        let f = fixture();
        let registry = Arc::new(FunctorRegistry::new());
        registry.register(&f.functor_dir, "astar_ct", StaticFunctor::passive("b", "make all"));
        registry.register(&f.functor_dir, "clean_astar_ct", StaticFunctor::passive("c", "make clean"));
        let shell = RecordingShell::new().fail_on("make clean");

        let err = builder(&f, registry, shell.clone())
            .build(&f.build_dir, "astar", "ct")
            .await
            .unwrap_err();

        assert_eq!(err.outcome.clean, StepStatus::Failed);
        assert_eq!(err.outcome.build_step, StepStatus::Pending);
        assert_eq!(shell.commands(), vec!["make clean"]);
        assert!(matches!(err.source, BuildFailure::Shell(ShellError::Failed { .. })));
    }

    #[tokio::test]
    async fn test_dry_run_does_not_invoke_active_functor() {
        let f = fixture();
        let registry = Arc::new(FunctorRegistry::new());
        registry.register(&f.functor_dir, "astar_ct", StaticFunctor::active("astar_ct", ""));

        let outcome = builder(&f, Arc::clone(&registry), RecordingShell::new())
            .dry_run(true)
            .build(&f.build_dir, "astar", "ct")
            .await
            .unwrap();

        assert!(outcome.is_success());
        assert_eq!(outcome.active, Some(true));
        assert!(registry.calls().is_empty());
    }

    #[tokio::test]
    async fn test_active_build_delegates_everything() {
        let f = fixture();
        let registry = Arc::new(FunctorRegistry::new());
        registry.register(&f.functor_dir, "astar_ct", StaticFunctor::active("astar_ct", ""));
        let shell = RecordingShell::new();

        let outcome = builder(&f, Arc::clone(&registry), shell.clone())
            .build(&f.build_dir, "astar", "ct")
            .await
            .unwrap();

        assert_eq!(outcome.clean, StepStatus::Delegated);
        assert_eq!(outcome.build_step, StepStatus::Succeeded);
        assert!(shell.commands().is_empty());
        let calls = registry.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].mode, "active");
        assert_eq!(calls[0].working_dir, PathBuf::from(&f.build_dir));
    }

    #[tokio::test]
    async fn test_no_instr_uses_no_instr_functor() {
        let f = fixture();
        let registry = Arc::new(FunctorRegistry::new());
        registry.register(&f.functor_dir, "no_instr_astar_ct", StaticFunctor::active("ni", ""));

        let outcome = builder(&f, registry, RecordingShell::new())
            .no_instrumentation(true)
            .build(&f.build_dir, "astar", "ct")
            .await;

        assert!(outcome.is_ok());
    }

    #[tokio::test]
    async fn test_failed_build_reports_partial_success() {
        let f = fixture();
        let registry = Arc::new(FunctorRegistry::new());
        registry.register(&f.functor_dir, "astar_ct", StaticFunctor::passive("b", "make all"));
        registry.register(&f.functor_dir, "clean_astar_ct", StaticFunctor::passive("c", "make clean"));
        let shell = RecordingShell::new().fail_on("make all");

        let err = builder(&f, registry, shell)
            .build(&f.build_dir, "astar", "ct")
            .await
            .unwrap_err();

        assert_eq!(err.outcome.clean, StepStatus::Succeeded);
        assert_eq!(err.outcome.build_step, StepStatus::Failed);
        assert!(matches!(err.source, BuildFailure::Shell(ShellError::Failed { .. })));
    }

    #[tokio::test]
    async fn test_missing_functor_is_reported() {
        let f = fixture();
        let registry = Arc::new(FunctorRegistry::new());

        let err = builder(&f, registry, RecordingShell::new())
            .build(&f.build_dir, "astar", "ct")
            .await
            .unwrap_err();

        assert_eq!(err.outcome.build_step, StepStatus::Pending);
        assert!(matches!(err.source, BuildFailure::Functor(FunctorError::MissingFile { .. })));
    }

    #[tokio::test]
    async fn test_missing_build_directory_fails() {
        let f = fixture();
        let mut item = f.config.get_item(&f.build_dir, "astar").unwrap().clone();
        item.name = "gone".to_string();
        let mut config = Configuration::new(SchemaVersion::Simplified);
        config.add_item("/nonexistent/root", item).unwrap();

        let builder = Builder::new(
            Arc::new(config),
            Arc::new(FunctorRegistry::new()),
            Arc::new(RecordingShell::new()),
        );
        let err = builder.build("/nonexistent/root", "gone", "ct").await.unwrap_err();
        assert_eq!(err.source, BuildFailure::Directory(PathBuf::from("/nonexistent/root")));
    }

    #[tokio::test]
    async fn test_unknown_targets_are_lookup_failures() {
        let f = fixture();
        let b = builder(&f, Arc::new(FunctorRegistry::new()), RecordingShell::new());

        let err = b.build(&f.build_dir, "astar", "vanilla").await.unwrap_err();
        assert!(matches!(err.source, BuildFailure::Lookup(LookupError::UnknownFlavor { .. })));

        let err = b.build(&f.build_dir, "gcc", "ct").await.unwrap_err();
        assert!(matches!(err.source, BuildFailure::Lookup(LookupError::UnknownItem { .. })));
    }

    #[tokio::test]
    async fn test_build_all_continues_after_failure() {
        let f = fixture();
        let report = builder(&f, Arc::new(FunctorRegistry::new()), RecordingShell::new())
            .build_all()
            .await;
        assert_eq!(report.results.len(), 1);
        assert_eq!(report.failed(), 1);
        assert_eq!(report.succeeded(), 0);
    }
}
