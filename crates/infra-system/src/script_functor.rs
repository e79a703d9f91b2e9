// Script functor resolver
// Functors are executables in a search directory, driven by a small CLI protocol:
//   <file> method              -> {"active": bool}
//   <file> passive <benchmark> -> command string on stdout
//   <file> active <benchmark>  -> performs the step, stdout is its output
// Keyword arguments travel as PIRA_<KEY> environment variables.
// Located files are stored as absolute paths, so a relative search directory
// keeps working when the functor runs in another directory.
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use tokio::process::Command;
use tracing::{debug, info, warn};

use pira_core::domain::FunctorName;
use pira_core::port::functor::relative_file_name;
use pira_core::port::{Functor, FunctorContext, FunctorError, FunctorMethod, FunctorResolver};

const SCRIPT_EXTENSION: &str = "sh";

/// One functor executable
#[derive(Debug, Clone)]
pub struct ScriptFunctor {
    name: String,
    path: PathBuf,
    method: FunctorMethod,
}

impl ScriptFunctor {
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn command(&self) -> Command {
        if self.path.extension().is_some_and(|e| e == SCRIPT_EXTENSION) {
            let mut cmd = Command::new("sh");
            cmd.arg(&self.path);
            cmd
        } else {
            Command::new(&self.path)
        }
    }

    async fn invoke(&self, mode: &'static str, ctx: &FunctorContext) -> Result<String, FunctorError> {
        let mut cmd = self.command();
        cmd.arg(mode)
            .arg(&ctx.benchmark)
            .args(&ctx.args)
            .envs(ctx.kwarg_env())
            .current_dir(&ctx.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        debug!(
            functor = %self.name,
            mode = mode,
            benchmark = %ctx.benchmark,
            working_dir = %ctx.working_dir.display(),
            "Invoking functor"
        );

        let output = cmd.output().await.map_err(|e| FunctorError::Invocation {
            functor: self.name.clone(),
            reason: e.to_string(),
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            warn!(functor = %self.name, mode = mode, exit_code = ?output.status.code(), "Functor failed");
            return Err(FunctorError::Invocation {
                functor: self.name.clone(),
                reason: format!("exit {:?}: {}", output.status.code(), stderr),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

#[async_trait]
impl Functor for ScriptFunctor {
    fn name(&self) -> &str {
        &self.name
    }

    fn get_method(&self) -> FunctorMethod {
        self.method
    }

    async fn active(&self, ctx: &FunctorContext) -> Result<String, FunctorError> {
        self.invoke("active", ctx).await
    }

    async fn passive(&self, ctx: &FunctorContext) -> Result<String, FunctorError> {
        let command = self.invoke("passive", ctx).await?;
        if command.is_empty() {
            return Err(FunctorError::Protocol {
                functor: self.name.clone(),
                reason: "passive invocation printed no command".to_string(),
            });
        }
        Ok(command)
    }
}

/// Resolves functors to executables below a search directory.
/// Nothing process-wide is touched; every resolution is independent.
#[derive(Debug, Default, Clone, Copy)]
pub struct ScriptFunctorResolver;

impl ScriptFunctorResolver {
    pub fn new() -> Self {
        Self
    }

    fn locate(search_dir: &Path, file: &str) -> Option<PathBuf> {
        let plain = search_dir.join(file);
        if plain.is_file() {
            return Some(plain);
        }
        let script = search_dir.join(format!("{file}.{SCRIPT_EXTENSION}"));
        script.is_file().then_some(script)
    }

    async fn query_method(functor: &ScriptFunctor, search_dir: &Path) -> Result<FunctorMethod, FunctorError> {
        let output = functor
            .command()
            .arg("method")
            .current_dir(search_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| FunctorError::Invocation {
                functor: functor.name.clone(),
                reason: e.to_string(),
            })?;

        if !output.status.success() {
            return Err(FunctorError::Protocol {
                functor: functor.name.clone(),
                reason: format!("method query exited with {:?}", output.status.code()),
            });
        }

        serde_json::from_slice(&output.stdout).map_err(|e| FunctorError::Protocol {
            functor: functor.name.clone(),
            reason: format!("method query did not print {{\"active\": bool}}: {e}"),
        })
    }
}

#[async_trait]
impl FunctorResolver for ScriptFunctorResolver {
    async fn resolve(
        &self,
        search_dir: &Path,
        name: &FunctorName,
    ) -> Result<Arc<dyn Functor>, FunctorError> {
        let missing_dir = || {
            warn!(dir = %search_dir.display(), "Functor directory does not exist");
            FunctorError::MissingDirectory(search_dir.to_path_buf())
        };
        if !search_dir.is_dir() {
            return Err(missing_dir());
        }
        let root = search_dir.canonicalize().map_err(|_| missing_dir())?;

        let file = relative_file_name(name);
        let path = Self::locate(&root, &file).ok_or_else(|| {
            warn!(dir = %search_dir.display(), file = %file, "Functor file does not exist");
            FunctorError::MissingFile {
                dir: search_dir.to_path_buf(),
                file: file.clone(),
            }
        })?;

        let mut functor = ScriptFunctor {
            name: file,
            path,
            method: FunctorMethod { active: false },
        };
        functor.method = Self::query_method(&functor, &root).await?;

        info!(
            functor = %functor.name,
            path = %functor.path.display(),
            active = functor.method.active,
            "Resolved functor"
        );
        Ok(Arc::new(functor))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pira_core::domain::FunctorRole;

    const PASSIVE_SCRIPT: &str = r#"
case "$1" in
  method) echo '{"active": false}' ;;
  passive) echo "make CXX=$PIRA_COMPILER $2" ;;
  *) exit 2 ;;
esac
"#;

    const ACTIVE_SCRIPT: &str = r#"
case "$1" in
  method) echo '{"active": true}' ;;
  active) pwd > built.txt; echo "done $2 $3" ;;
  *) exit 2 ;;
esac
"#;

    fn write(dir: &Path, file: &str, body: &str) {
        std::fs::write(dir.join(file), body).unwrap();
    }

    #[tokio::test]
    async fn test_resolve_passive_script() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "astar_ct.sh", PASSIVE_SCRIPT);

        let name = FunctorName::new(FunctorRole::Build, "astar", "ct");
        let functor = ScriptFunctorResolver.resolve(dir.path(), &name).await.unwrap();
        assert!(!functor.is_active());

        let ctx = FunctorContext::new("astar", dir.path()).kwarg("compiler", "clang++");
        assert_eq!(functor.passive(&ctx).await.unwrap(), "make CXX=clang++ astar");
    }

    #[tokio::test]
    async fn test_active_script_runs_in_context_dir() {
        let functors = tempfile::tempdir().unwrap();
        let work = tempfile::tempdir().unwrap();
        write(functors.path(), "runner_astar_ct.sh", ACTIVE_SCRIPT);

        let name = FunctorName::new(FunctorRole::Run, "astar", "ct");
        let functor = ScriptFunctorResolver.resolve(functors.path(), &name).await.unwrap();
        assert!(functor.is_active());

        let ctx = FunctorContext::new("astar", work.path()).with_args(vec!["4".to_string()]);
        assert_eq!(functor.active(&ctx).await.unwrap(), "done astar 4");
        assert!(work.path().join("built.txt").exists());
    }

    #[tokio::test]
    async fn test_missing_directory_and_file_are_errors() {
        let name = FunctorName::new(FunctorRole::Clean, "astar", "ct");
        let result = ScriptFunctorResolver
            .resolve(Path::new("/nonexistent/functors"), &name)
            .await;
        assert!(matches!(result, Err(FunctorError::MissingDirectory(_))));

        let dir = tempfile::tempdir().unwrap();
        let result = ScriptFunctorResolver.resolve(dir.path(), &name).await;
        assert!(matches!(
            result,
            Err(FunctorError::MissingFile { file, .. }) if file == "clean_astar_ct"
        ));
    }

    #[tokio::test]
    async fn test_bad_method_output_is_a_protocol_error() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "astar_ct.sh", "echo not-json");

        let name = FunctorName::new(FunctorRole::Build, "astar", "ct");
        let result = ScriptFunctorResolver.resolve(dir.path(), &name).await;
        assert!(matches!(result, Err(FunctorError::Protocol { .. })));
    }

    /// `path` spelled relative to the process directory, without changing it
    fn relative_to_cwd(path: &Path) -> PathBuf {
        let cwd = std::env::current_dir().unwrap();
        let mut rel = PathBuf::new();
        for _ in cwd.components().skip(1) {
            rel.push("..");
        }
        rel.push(path.strip_prefix("/").unwrap());
        rel
    }

    #[tokio::test]
    async fn test_resolve_from_relative_search_dir() {
        let functors = tempfile::tempdir().unwrap();
        let work = tempfile::tempdir().unwrap();
        write(functors.path(), "astar_ct.sh", PASSIVE_SCRIPT);
        let search_dir = relative_to_cwd(functors.path());
        assert!(search_dir.is_relative());

        let name = FunctorName::new(FunctorRole::Build, "astar", "ct");
        let functor = ScriptFunctorResolver.resolve(&search_dir, &name).await.unwrap();
        assert!(!functor.is_active());

        // Invoked from a different directory than the search directory
        let ctx = FunctorContext::new("astar", work.path()).kwarg("compiler", "g++");
        assert_eq!(functor.passive(&ctx).await.unwrap(), "make CXX=g++ astar");
    }
}
