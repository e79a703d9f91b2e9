// Functor & Artifact Naming
// Binding contract between a configuration and external functor implementations

use std::fmt;

use crate::domain::error::{ConfigError, Result};

/// Orchestration step a functor implements
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FunctorRole {
    Build,
    Clean,
    Analyze,
    Run,
}

impl fmt::Display for FunctorRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FunctorRole::Build => write!(f, "build"),
            FunctorRole::Clean => write!(f, "clean"),
            FunctorRole::Analyze => write!(f, "analyze"),
            FunctorRole::Run => write!(f, "run"),
        }
    }
}

/// Inputs that fully determine a functor's name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FunctorName {
    pub role: FunctorRole,
    /// Addressed by absolute / DB-relative path instead of a relative filename
    pub for_db: bool,
    /// Uninstrumented build variant (build role only)
    pub no_instr: bool,
    pub benchmark: String,
    pub flavor: String,
}

impl FunctorName {
    pub fn new(role: FunctorRole, benchmark: impl Into<String>, flavor: impl Into<String>) -> Self {
        Self {
            role,
            for_db: false,
            no_instr: false,
            benchmark: benchmark.into(),
            flavor: flavor.into(),
        }
    }

    pub fn for_db(mut self) -> Self {
        self.for_db = true;
        self
    }

    pub fn no_instr(mut self, no_instr: bool) -> Self {
        self.no_instr = no_instr;
        self
    }

    /// Canonical file name for this functor
    pub fn file_name(&self) -> String {
        match self.role {
            FunctorRole::Build => {
                builder_functor_filename(self.for_db, self.no_instr, &self.benchmark, &self.flavor)
            }
            FunctorRole::Clean => clean_functor_filename(&self.benchmark, &self.flavor),
            FunctorRole::Analyze => analyse_functor_filename(self.for_db, &self.benchmark, &self.flavor),
            FunctorRole::Run => runner_functor_filename(self.for_db, &self.benchmark, &self.flavor),
        }
    }
}

impl fmt::Display for FunctorName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.file_name())
    }
}

fn concat_with_sep(a: &str, b: &str, sep: &str) -> String {
    format!("{a}{sep}{b}")
}

pub fn runner_functor_filename(for_db: bool, benchmark: &str, flavor: &str) -> String {
    if for_db {
        format!("/runner_{}", concat_with_sep(benchmark, flavor, ""))
    } else {
        format!("runner_{}", concat_with_sep(benchmark, flavor, "_"))
    }
}

/// Build functor name. The DB form ignores `no_instr`.
pub fn builder_functor_filename(for_db: bool, no_instr: bool, benchmark: &str, flavor: &str) -> String {
    if for_db {
        format!("/{}", concat_with_sep(benchmark, flavor, ""))
    } else if no_instr {
        format!("no_instr_{}", concat_with_sep(benchmark, flavor, "_"))
    } else {
        concat_with_sep(benchmark, flavor, "_")
    }
}

pub fn clean_functor_filename(benchmark: &str, flavor: &str) -> String {
    format!("clean_{}", concat_with_sep(benchmark, flavor, "_"))
}

pub fn analyse_functor_filename(for_db: bool, benchmark: &str, flavor: &str) -> String {
    if for_db {
        format!("/analyse_{}", concat_with_sep(benchmark, flavor, ""))
    } else {
        format!("analyse_{}", concat_with_sep(benchmark, flavor, "_"))
    }
}

// ----------------------------------------------------------------------------
// Instrumentation & profile artifact paths
// ----------------------------------------------------------------------------

pub fn instr_file_path(analyzer_dir: &str, flavor: &str, benchmark: &str) -> String {
    format!("{analyzer_dir}/out/instrumented-{flavor}-{benchmark}.txt")
}

pub fn previous_instr_file_path(analyzer_dir: &str, flavor: &str, benchmark: &str) -> String {
    format!("{analyzer_dir}/out/instrumented-{flavor}-{benchmark}previous.txt")
}

/// Call-graph file consumed by the analyzer
pub fn ipcg_file_name(base_dir: &str, benchmark: &str, flavor: &str) -> String {
    format!("{base_dir}/{flavor}-{benchmark}.ipcg")
}

/// Profile output directory of one refinement iteration
pub fn cube_dir_path(experiment_dir: &str, flavor: &str, iteration: u32) -> String {
    format!("{experiment_dir}-{flavor}-{iteration}")
}

/// Cube file of one refinement iteration; the directory must pass
/// `checked_cube_dir_path` since the path ends up on a command line
pub fn cube_file_path(experiment_dir: &str, flavor: &str, benchmark: &str, iteration: u32) -> Result<String> {
    let dir = checked_cube_dir_path(experiment_dir, flavor, iteration)?;
    Ok(format!("{dir}/{flavor}-{benchmark}.cubex"))
}

/// Only `[A-Za-z0-9/._-]` is accepted
pub fn is_valid_file_name(name: &str) -> bool {
    name.chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '/' | '.' | '_' | '-'))
}

pub fn checked_cube_dir_path(experiment_dir: &str, flavor: &str, iteration: u32) -> Result<String> {
    let path = cube_dir_path(experiment_dir, flavor, iteration);
    if is_valid_file_name(&path) {
        Ok(path)
    } else {
        Err(ConfigError::InvalidPath(path))
    }
}
