// Configuration Loader - JSON document to configuration model, cached by path

mod json;
pub mod legacy;
pub mod simplified;

pub use legacy::LegacyParser;
pub use simplified::SimplifiedParser;

use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

use crate::domain::{ConfigError, Configuration, SchemaVersion};
use crate::error::{AppError, Result};

/// Turns a parsed JSON document into a configuration
pub trait ConfigurationParser: Send + Sync {
    fn parse(&self, tree: &Value) -> std::result::Result<Configuration, ConfigError>;
}

/// Schema generation of a document: a top-level `description` object marks the legacy form
pub fn detect_schema(tree: &Value) -> std::result::Result<SchemaVersion, ConfigError> {
    if tree.get("description").is_some_and(Value::is_object) {
        Ok(SchemaVersion::Legacy)
    } else if tree.get("builds").is_some() {
        Ok(SchemaVersion::Simplified)
    } else {
        Err(ConfigError::UnknownSchema(
            "neither 'description' nor 'builds' at top level".to_string(),
        ))
    }
}

/// Picks the parser from the document itself
#[derive(Debug, Default, Clone, Copy)]
pub struct DetectingParser;

impl ConfigurationParser for DetectingParser {
    fn parse(&self, tree: &Value) -> std::result::Result<Configuration, ConfigError> {
        let schema = detect_schema(tree)?;
        debug!(schema = %schema, "Detected configuration schema");
        match schema {
            SchemaVersion::Legacy => LegacyParser.parse(tree),
            SchemaVersion::Simplified => SimplifiedParser.parse(tree),
        }
    }
}

/// Loads configurations from disk; repeat requests for a path return the cached model
pub struct ConfigurationLoader<P> {
    parser: P,
    cache: Mutex<HashMap<PathBuf, Arc<Configuration>>>,
}

pub type LegacyConfigurationLoader = ConfigurationLoader<LegacyParser>;
pub type SimplifiedConfigurationLoader = ConfigurationLoader<SimplifiedParser>;

impl<P: ConfigurationParser> ConfigurationLoader<P> {
    pub fn new(parser: P) -> Self {
        Self {
            parser,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Load and parse `path`, or return the model constructed by an earlier call
    ///
    /// # Errors
    /// - ConfigError::Unreadable if the file cannot be read
    /// - Serialization if it is not JSON
    /// - any ConfigError from the parser
    pub fn load_conf(&self, path: impl AsRef<Path>) -> Result<Arc<Configuration>> {
        let path = path.as_ref();

        if let Some(conf) = self.lock_cache()?.get(path) {
            debug!(path = %path.display(), "Configuration cache hit");
            return Ok(Arc::clone(conf));
        }

        info!(path = %path.display(), "Loading configuration");
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Unreadable {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        let tree: Value = serde_json::from_str(&content)?;
        let conf = Arc::new(self.parser.parse(&tree)?);

        info!(
            path = %path.display(),
            schema = %conf.schema(),
            builds = conf.builds().len(),
            "Configuration loaded"
        );

        self.lock_cache()?
            .insert(path.to_path_buf(), Arc::clone(&conf));
        Ok(conf)
    }

    pub fn is_cached(&self, path: impl AsRef<Path>) -> bool {
        self.lock_cache()
            .map(|cache| cache.contains_key(path.as_ref()))
            .unwrap_or(false)
    }

    fn lock_cache(&self) -> Result<std::sync::MutexGuard<'_, HashMap<PathBuf, Arc<Configuration>>>> {
        self.cache
            .lock()
            .map_err(|e| AppError::Internal(format!("configuration cache poisoned: {e}")))
    }
}

impl LegacyConfigurationLoader {
    pub fn legacy() -> Self {
        Self::new(LegacyParser)
    }
}

impl SimplifiedConfigurationLoader {
    pub fn simplified() -> Self {
        Self::new(SimplifiedParser)
    }
}

impl ConfigurationLoader<DetectingParser> {
    pub fn detecting() -> Self {
        Self::new(DetectingParser)
    }
}
