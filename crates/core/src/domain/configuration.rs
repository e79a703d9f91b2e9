// Configuration Domain Model
// One canonical representation populated by both the legacy and the simplified loader

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::domain::argmap::{ArgValue, ArgumentMapping};
use crate::domain::error::{ConfigError, LookupError};

/// On-disk schema generation a configuration was read from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaVersion {
    /// `description` object with per-field item tables
    Legacy,
    /// `builds` → `items` objects with an alias table
    Simplified,
}

impl fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaVersion::Legacy => write!(f, "legacy"),
            SchemaVersion::Simplified => write!(f, "simplified"),
        }
    }
}

/// Instrumentation filtering mode of an item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemMode {
    /// Filter applied when compiling (`CT`)
    CompileTime,
    /// Filter file read at runtime (`RT`)
    Runtime,
    Other(String),
}

impl ItemMode {
    pub fn parse(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "ct" | "compile-time" | "compile_time" => ItemMode::CompileTime,
            "rt" | "runtime" | "run-time" => ItemMode::Runtime,
            _ => ItemMode::Other(s.to_string()),
        }
    }

    pub fn is_compile_time(&self) -> bool {
        matches!(self, ItemMode::CompileTime)
    }
}

impl fmt::Display for ItemMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemMode::CompileTime => write!(f, "CT"),
            ItemMode::Runtime => write!(f, "RT"),
            ItemMode::Other(s) => f.write_str(s),
        }
    }
}

/// Directories functors are resolved from, per role
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctorPaths {
    pub builder: String,
    pub cleaner: String,
    pub runner: String,
    pub analyzer: String,
}

impl FunctorPaths {
    /// Every role resolved from the same directory
    pub fn uniform(base: impl Into<String>) -> Self {
        let base = base.into();
        Self {
            builder: base.clone(),
            cleaner: base.clone(),
            runner: base.clone(),
            analyzer: base,
        }
    }
}

/// How invocation arguments of an item are declared
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RunOptions {
    /// Parameter table expanded by a mapper
    Mapped(ArgumentMapping),
    /// Explicit argument list
    Listed(Vec<ArgValue>),
}

impl RunOptions {
    pub fn as_list(&self) -> Vec<String> {
        match self {
            RunOptions::Mapped(mapping) => mapping.as_list(),
            RunOptions::Listed(values) => values.iter().map(|v| v.to_string()).collect(),
        }
    }

    pub fn mapping(&self) -> Option<&ArgumentMapping> {
        match self {
            RunOptions::Mapped(mapping) => Some(mapping),
            RunOptions::Listed(_) => None,
        }
    }
}

/// One benchmark within a build
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PiraItem {
    /// Unique within its build
    pub name: String,
    /// Name used in functor and artifact names
    pub benchmark_name: String,
    pub flavors: Vec<String>,
    pub analyzer_dir: String,
    /// Profile output (cube) directory
    pub cubes_dir: String,
    pub functors: FunctorPaths,
    pub mode: Option<ItemMode>,
    pub run_options: RunOptions,

    // Legacy-only metadata
    pub analyzer_functor: Option<String>,
    pub slurm_analysis_functor: Option<String>,
    pub submitter: Option<String>,
    pub batch_script: Option<String>,
}

impl PiraItem {
    pub fn new(name: impl Into<String>, functors: FunctorPaths, run_options: RunOptions) -> Self {
        let name = name.into();
        Self {
            benchmark_name: name.clone(),
            name,
            flavors: Vec::new(),
            analyzer_dir: String::new(),
            cubes_dir: String::new(),
            functors,
            mode: None,
            run_options,
            analyzer_functor: None,
            slurm_analysis_functor: None,
            submitter: None,
            batch_script: None,
        }
    }

    pub fn declares_flavor(&self, flavor: &str) -> bool {
        self.flavors.iter().any(|f| f == flavor)
    }
}

/// A build root and its items in declaration order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Build {
    pub directory: String,
    pub prefix: Option<String>,
    pub items: Vec<PiraItem>,
}

/// One (build, item, flavor) triple
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Target<'a> {
    pub build: &'a str,
    pub item: &'a str,
    pub flavor: &'a str,
}

/// Loaded configuration; read-only once a loader has returned it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Configuration {
    schema: SchemaVersion,
    builds: Vec<Build>,
    global_flavors: Vec<String>,
    global_submitters: BTreeMap<String, String>,
}

impl Configuration {
    pub fn new(schema: SchemaVersion) -> Self {
        Self {
            schema,
            builds: Vec::new(),
            global_flavors: Vec::new(),
            global_submitters: BTreeMap::new(),
        }
    }

    // ------------------------------------------------------------------
    // Population (loaders only)
    // ------------------------------------------------------------------

    /// Register a build root; a no-op if it already exists
    pub fn add_build(&mut self, directory: impl Into<String>) -> &mut Build {
        let directory = directory.into();
        let idx = match self.builds.iter().position(|b| b.directory == directory) {
            Some(idx) => idx,
            None => {
                self.builds.push(Build {
                    directory,
                    prefix: None,
                    items: Vec::new(),
                });
                self.builds.len() - 1
            }
        };
        &mut self.builds[idx]
    }

    /// Append an item to a build, creating the build on first use
    pub fn add_item(&mut self, directory: &str, item: PiraItem) -> Result<(), ConfigError> {
        let build = self.add_build(directory);
        if build.items.iter().any(|i| i.name == item.name) {
            return Err(ConfigError::DuplicateItem {
                build: directory.to_string(),
                item: item.name,
            });
        }
        build.items.push(item);
        Ok(())
    }

    pub fn set_global_flavors(&mut self, flavors: Vec<String>) {
        self.global_flavors = flavors;
    }

    pub fn set_global_submitter(&mut self, flavor: impl Into<String>, submitter: impl Into<String>) {
        self.global_submitters.insert(flavor.into(), submitter.into());
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub fn schema(&self) -> SchemaVersion {
        self.schema
    }

    pub fn builds(&self) -> &[Build] {
        &self.builds
    }

    pub fn get_builds(&self) -> Vec<&str> {
        self.builds.iter().map(|b| b.directory.as_str()).collect()
    }

    pub fn build(&self, build: &str) -> Result<&Build, LookupError> {
        self.builds
            .iter()
            .find(|b| b.directory == build)
            .ok_or_else(|| LookupError::UnknownBuild(build.to_string()))
    }

    pub fn get_items(&self, build: &str) -> Result<Vec<&str>, LookupError> {
        Ok(self.build(build)?.items.iter().map(|i| i.name.as_str()).collect())
    }

    /// Exactly one item per name and build; absence is an error, never a default
    pub fn get_item(&self, build: &str, item: &str) -> Result<&PiraItem, LookupError> {
        self.build(build)?
            .items
            .iter()
            .find(|i| i.name == item)
            .ok_or_else(|| LookupError::UnknownItem {
                build: build.to_string(),
                item: item.to_string(),
            })
    }

    pub fn get_prefix(&self, build: &str) -> Result<Option<&str>, LookupError> {
        Ok(self.build(build)?.prefix.as_deref())
    }

    pub fn get_flavors(&self, build: &str, item: &str) -> Result<&[String], LookupError> {
        Ok(&self.get_item(build, item)?.flavors)
    }

    pub fn has_local_flavors(&self, build: &str, item: &str) -> Result<bool, LookupError> {
        Ok(!self.get_flavors(build, item)?.is_empty())
    }

    /// Union of item flavors of a build, first-seen order
    pub fn get_build_flavors(&self, build: &str) -> Result<Vec<&str>, LookupError> {
        let mut flavors: Vec<&str> = Vec::new();
        for item in &self.build(build)?.items {
            for flavor in &item.flavors {
                if !flavors.contains(&flavor.as_str()) {
                    flavors.push(flavor);
                }
            }
        }
        Ok(flavors)
    }

    pub fn get_args(&self, build: &str, item: &str) -> Result<Vec<String>, LookupError> {
        Ok(self.get_item(build, item)?.run_options.as_list())
    }

    pub fn get_run_options(&self, build: &str, item: &str) -> Result<&RunOptions, LookupError> {
        Ok(&self.get_item(build, item)?.run_options)
    }

    pub fn get_benchmark_name(&self, build: &str, item: &str) -> Result<&str, LookupError> {
        Ok(&self.get_item(build, item)?.benchmark_name)
    }

    pub fn get_builder_path(&self, build: &str, item: &str) -> Result<&str, LookupError> {
        Ok(&self.get_item(build, item)?.functors.builder)
    }

    pub fn get_cleaner_path(&self, build: &str, item: &str) -> Result<&str, LookupError> {
        Ok(&self.get_item(build, item)?.functors.cleaner)
    }

    pub fn get_runner_path(&self, build: &str, item: &str) -> Result<&str, LookupError> {
        Ok(&self.get_item(build, item)?.functors.runner)
    }

    pub fn get_analyzer_path(&self, build: &str, item: &str) -> Result<&str, LookupError> {
        Ok(&self.get_item(build, item)?.functors.analyzer)
    }

    pub fn get_analyser_dir(&self, build: &str, item: &str) -> Result<&str, LookupError> {
        Ok(&self.get_item(build, item)?.analyzer_dir)
    }

    pub fn get_analyser_exp_dir(&self, build: &str, item: &str) -> Result<&str, LookupError> {
        Ok(&self.get_item(build, item)?.cubes_dir)
    }

    pub fn get_mode(&self, build: &str, item: &str) -> Result<Option<&ItemMode>, LookupError> {
        Ok(self.get_item(build, item)?.mode.as_ref())
    }

    pub fn get_analyse_func(&self, build: &str, item: &str) -> Result<&str, LookupError> {
        let it = self.get_item(build, item)?;
        Ok(it.analyzer_functor.as_deref().unwrap_or(&it.functors.analyzer))
    }

    pub fn get_analyse_slurm_func(&self, build: &str, item: &str) -> Result<&str, LookupError> {
        let it = self.get_item(build, item)?;
        it.slurm_analysis_functor
            .as_deref()
            .ok_or_else(|| LookupError::MissingEntry {
                item: item.to_string(),
                what: "slurm analysis functor",
            })
    }

    pub fn get_submitter_func(&self, build: &str, item: &str) -> Result<Option<&str>, LookupError> {
        Ok(self.get_item(build, item)?.submitter.as_deref())
    }

    pub fn is_submitter(&self, build: &str, item: &str) -> Result<bool, LookupError> {
        Ok(self
            .get_submitter_func(build, item)?
            .is_some_and(|s| !s.is_empty()))
    }

    pub fn get_batch_script_func(&self, build: &str, item: &str) -> Result<Option<&str>, LookupError> {
        Ok(self.get_item(build, item)?.batch_script.as_deref())
    }

    pub fn get_global_flavors(&self) -> &[String] {
        &self.global_flavors
    }

    pub fn get_global_submitter(&self, flavor: &str) -> Option<&str> {
        self.global_submitters.get(flavor).map(String::as_str)
    }

    /// Every declared flavor, first-seen order across builds and items
    pub fn all_flavors(&self) -> Vec<&str> {
        let mut flavors: Vec<&str> = Vec::new();
        for item in self.builds.iter().flat_map(|b| &b.items) {
            for flavor in &item.flavors {
                if !flavors.contains(&flavor.as_str()) {
                    flavors.push(flavor);
                }
            }
        }
        flavors
    }

    /// Every (build, item, flavor) triple, build-major
    pub fn targets(&self) -> Vec<Target<'_>> {
        self.builds
            .iter()
            .flat_map(|b| {
                b.items.iter().flat_map(move |i| {
                    i.flavors.iter().map(move |f| Target {
                        build: &b.directory,
                        item: &i.name,
                        flavor: f,
                    })
                })
            })
            .collect()
    }
}
