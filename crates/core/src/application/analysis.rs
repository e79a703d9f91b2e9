// Analyzer - runs the instrumentation-selection analysis of one target

use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

use crate::domain::naming::{cube_file_path, instr_file_path, ipcg_file_name, previous_instr_file_path};
use crate::domain::{Configuration, FunctorName, FunctorRole, InstrumentConfig, TargetConfiguration};
use crate::error::Result;
use crate::port::{FunctorContext, FunctorResolver, ShellCommand, ShellExecutor};

/// What an analysis step did
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisOutcome {
    /// Passive functor: the command that was run and its output
    Command { command: String, output: String },
    /// Active functor output
    Delegated { output: String },
}

pub struct Analyzer {
    config: Arc<Configuration>,
    resolver: Arc<dyn FunctorResolver>,
    shell: Arc<dyn ShellExecutor>,
    dry_run: bool,
}

impl Analyzer {
    pub fn new(
        config: Arc<Configuration>,
        resolver: Arc<dyn FunctorResolver>,
        shell: Arc<dyn ShellExecutor>,
    ) -> Self {
        Self {
            config,
            resolver,
            shell,
            dry_run: false,
        }
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Run the `analyse_` functor of `target`
    ///
    /// A passive functor's command is run in the analyzer directory as
    /// `<cmd> <ipcg>`, followed by the iteration's cube file for
    /// instrumentation runs.
    pub async fn analyze(&self, target: &TargetConfiguration, instrument: &InstrumentConfig) -> Result<AnalysisOutcome> {
        let item = self.config.get_item(&target.build, &target.item)?;
        let name = FunctorName::new(FunctorRole::Analyze, &item.benchmark_name, &target.flavor);
        let functor = self
            .resolver
            .resolve(Path::new(&item.functors.analyzer), &name)
            .await?;

        let ctx = FunctorContext::new(&item.benchmark_name, &item.analyzer_dir);
        if functor.is_active() {
            if self.dry_run {
                info!(functor = %name, "Dry run, not invoking active analysis functor");
                return Ok(AnalysisOutcome::Delegated { output: String::new() });
            }
            let output = functor.active(&ctx).await?;
            debug!(functor = %name, "Active analysis finished");
            return Ok(AnalysisOutcome::Delegated { output });
        }

        let base = functor.passive(&ctx).await?;
        let ipcg = ipcg_file_name(&item.analyzer_dir, &item.benchmark_name, &target.flavor);
        let command = match instrument.instrumentation_iteration {
            Some(iteration) if instrument.is_instrumentation_run => {
                let cube = cube_file_path(&item.cubes_dir, &target.flavor, &item.benchmark_name, iteration)?;
                format!("{base} {ipcg} {cube}")
            }
            _ => format!("{base} {ipcg}"),
        };

        info!(
            item = %target.item,
            flavor = %target.flavor,
            instrumented = instrument.is_instrumentation_run,
            command = %command,
            "Running analyzer"
        );
        let shell_command = ShellCommand::new(&command)
            .in_dir(&item.analyzer_dir)
            .dry_run(self.dry_run);
        let output = self.shell.run(&shell_command).await?;
        debug!(output = %output.stdout, "Output of analyzer");

        Ok(AnalysisOutcome::Command {
            command,
            output: output.stdout,
        })
    }

    /// Instrumentation selection file the analysis of `target` produces
    pub fn instr_file_for(&self, target: &TargetConfiguration) -> Result<String> {
        let item = self.config.get_item(&target.build, &target.item)?;
        Ok(instr_file_path(&item.analyzer_dir, &target.flavor, &item.benchmark_name))
    }

    /// Selection file of the previous refinement iteration
    pub fn previous_instr_file_for(&self, target: &TargetConfiguration) -> Result<String> {
        let item = self.config.get_item(&target.build, &target.item)?;
        Ok(previous_instr_file_path(&item.analyzer_dir, &target.flavor, &item.benchmark_name))
    }
}
