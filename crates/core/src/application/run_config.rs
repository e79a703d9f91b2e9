// Run-Configuration Generator - materializes the run matrix for the batch system

use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

use crate::domain::{Configuration, ExtrapConfiguration, FunctorName, FunctorRole, InvocationConfiguration};
use crate::error::Result;
use crate::port::{FunctorContext, FunctorError, FunctorResolver};

/// One submittable unit: a generated script for (benchmark, flavor)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunConfiguration {
    pub build: String,
    pub benchmark: String,
    pub flavor: String,
    pub script: PathBuf,
    /// Expanded invocation arguments handed to the generator
    pub args: Vec<String>,
}

impl RunConfiguration {
    pub fn key(&self) -> (&str, &str) {
        (&self.benchmark, &self.flavor)
    }
}

pub struct RunConfigurationGenerator {
    config: Arc<Configuration>,
    resolver: Arc<dyn FunctorResolver>,
    kwargs: BTreeMap<String, String>,
}

impl RunConfigurationGenerator {
    pub fn new(config: Arc<Configuration>, resolver: Arc<dyn FunctorResolver>) -> Self {
        Self {
            config,
            resolver,
            kwargs: BTreeMap::new(),
        }
    }

    pub fn with_invocation(mut self, invocation: &InvocationConfiguration) -> Self {
        self.kwargs
            .insert("repetitions".to_string(), invocation.num_repetitions.to_string());
        self.kwargs.insert(
            "config".to_string(),
            invocation.path_to_config.display().to_string(),
        );
        self
    }

    pub fn with_extrap(mut self, extrap: &ExtrapConfiguration) -> Self {
        self.kwargs
            .insert("extrap_dir".to_string(), extrap.dir.display().to_string());
        self.kwargs
            .insert("extrap_prefix".to_string(), extrap.prefix.clone());
        self
    }

    /// Invoke every (flavor, item) run generator, flavor-major
    ///
    /// Generators are always invoked actively; their trimmed output is the
    /// generated script path. The first failure aborts generation.
    pub async fn generate_run_configurations(&self) -> Result<Vec<RunConfiguration>> {
        let mut run_configs = Vec::new();

        for flavor in self.config.all_flavors() {
            for build in self.config.builds() {
                for item in build.items.iter().filter(|i| i.declares_flavor(flavor)) {
                    let name = FunctorName::new(FunctorRole::Run, &item.benchmark_name, flavor);
                    let generator = self
                        .resolver
                        .resolve(Path::new(&item.functors.runner), &name)
                        .await?;

                    let args = item.run_options.as_list();
                    let mut ctx = FunctorContext::new(&item.benchmark_name, &build.directory)
                        .with_args(args.clone());
                    ctx.kwargs = self.kwargs.clone();

                    let script = generator.active(&ctx).await?;
                    if script.is_empty() {
                        return Err(FunctorError::Protocol {
                            functor: name.to_string(),
                            reason: "run generator printed no script path".to_string(),
                        }
                        .into());
                    }

                    debug!(
                        build = %build.directory,
                        item = %item.name,
                        flavor = %flavor,
                        script = %script,
                        "Generated run configuration"
                    );
                    run_configs.push(RunConfiguration {
                        build: build.directory.clone(),
                        benchmark: item.benchmark_name.clone(),
                        flavor: flavor.to_string(),
                        script: PathBuf::from(script),
                        args,
                    });
                }
            }
        }

        info!(count = run_configs.len(), "Run matrix generated");
        Ok(run_configs)
    }
}
