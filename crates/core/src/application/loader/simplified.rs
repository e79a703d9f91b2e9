// Simplified Configuration Parser
// `builds` → `items` objects, with an optional directory alias table

use serde_json::{Map, Value};
use std::collections::HashMap;
use tracing::{debug, warn};

use super::json::{field, list_field, object, string_field};
use super::ConfigurationParser;
use crate::domain::{
    ArgValue, ArgumentMapping, ConfigError, Configuration, FunctorPaths, ItemMode, MapperMode,
    Parameter, PiraItem, RunOptions, SchemaVersion,
};

const DIRS: &str = "directories";
const BUILDS: &str = "builds";
const ITEMS: &str = "items";
const ANALYZER: &str = "analyzer";
const CUBES: &str = "cubes";
const FLAVORS: &str = "flavors";
const FUNCTORS: &str = "functors";
const MODE: &str = "mode";
const ARGMAP: &str = "argmap";
const MAPPER: &str = "mapper";
const PIRA_FILE: &str = "pira-file";
const NAMES: &str = "names";

/// Build keys starting with this marker name an entry of the alias table
pub const ESCAPE_MARKER: char = '%';

pub type AliasTable = HashMap<String, String>;

/// Parser for the item-object schema
#[derive(Debug, Default, Clone, Copy)]
pub struct SimplifiedParser;

pub fn is_escaped(key: &str) -> bool {
    key.starts_with(ESCAPE_MARKER)
}

/// Resolve a build key: escaped keys go through the alias table, others are literal paths
pub fn resolve_build_key(key: &str, aliases: &AliasTable) -> Result<String, ConfigError> {
    match key.strip_prefix(ESCAPE_MARKER) {
        Some(alias) => aliases
            .get(alias)
            .cloned()
            .ok_or_else(|| ConfigError::UnknownAlias(alias.to_string())),
        None => Ok(key.to_string()),
    }
}

/// Alias table of the document. Anything unreadable degrades to an empty table.
pub fn parse_aliases(tree: &Value) -> AliasTable {
    match tree.get(DIRS) {
        Some(Value::Object(entries)) => entries
            .iter()
            .map(|(alias, path)| {
                let path = super::json::canonic_string(path);
                (alias.clone(), shellexpand::tilde(&path).into_owned())
            })
            .collect(),
        Some(other) => {
            warn!(found = %other, "Directory alias table is not an object, ignoring it");
            AliasTable::new()
        }
        None => {
            debug!("No directory alias table");
            AliasTable::new()
        }
    }
}

/// Parse an `argmap` block into a mapping
pub fn parse_argmap(argmap: &Value, context: &str) -> Result<ArgumentMapping, ConfigError> {
    let mode: MapperMode = string_field(argmap, MAPPER, context)?.parse()?;

    match argmap.get(PIRA_FILE) {
        Some(file_block) => {
            let names = list_field(file_block, NAMES, PIRA_FILE)?;
            let block = file_block.as_object().ok_or_else(|| ConfigError::WrongType {
                field: PIRA_FILE.to_string(),
                context: context.to_string(),
                expected: "object",
            })?;

            let mut params = Vec::with_capacity(block.len());
            for name in &names {
                let values = block
                    .get(name)
                    .ok_or_else(|| ConfigError::MissingParameter(name.clone()))?;
                params.push(Parameter {
                    name: name.clone(),
                    values: ArgValue::sequence(values),
                });
            }
            for (key, values) in block {
                if key != NAMES && !names.contains(key) {
                    warn!(param = %key, "Parameter in 'pira-file' block not listed in names, appending");
                    params.push(Parameter {
                        name: key.clone(),
                        values: ArgValue::sequence(values),
                    });
                }
            }

            Ok(ArgumentMapping::new(mode, params)?.with_file_names(names))
        }
        None => {
            let block = argmap.as_object().ok_or_else(|| ConfigError::WrongType {
                field: ARGMAP.to_string(),
                context: context.to_string(),
                expected: "object",
            })?;
            let params = inline_params(block);
            ArgumentMapping::new(mode, params)
        }
    }
}

fn inline_params(block: &Map<String, Value>) -> Vec<Parameter> {
    block
        .iter()
        .filter(|(key, _)| key.as_str() != MAPPER)
        .map(|(key, values)| Parameter {
            name: key.clone(),
            values: ArgValue::sequence(values),
        })
        .collect()
}

fn create_item(item_key: &str, item_tree: &Value) -> Result<PiraItem, ConfigError> {
    let functors = string_field(item_tree, FUNCTORS, item_key)?;
    let mapping = parse_argmap(field(item_tree, ARGMAP, item_key)?, item_key)?;

    let mut item = PiraItem::new(
        item_key,
        FunctorPaths::uniform(functors),
        RunOptions::Mapped(mapping),
    );
    item.analyzer_dir = string_field(item_tree, ANALYZER, item_key)?;
    item.cubes_dir = string_field(item_tree, CUBES, item_key)?;
    item.flavors = list_field(item_tree, FLAVORS, item_key)?;
    item.mode = item_tree
        .get(MODE)
        .map(|m| ItemMode::parse(&super::json::canonic_string(m)));
    Ok(item)
}

impl ConfigurationParser for SimplifiedParser {
    fn parse(&self, tree: &Value) -> Result<Configuration, ConfigError> {
        let aliases = parse_aliases(tree);
        let mut conf = Configuration::new(SchemaVersion::Simplified);

        for (build_key, build_tree) in object(tree, BUILDS, "root")? {
            let directory = resolve_build_key(build_key, &aliases)?;
            for (item_key, item_tree) in object(build_tree, ITEMS, build_key)? {
                let item = create_item(item_key, item_tree)?;
                debug!(build = %directory, item = %item_key, flavors = ?item.flavors, "Parsed item");
                conf.add_item(&directory, item)?;
            }
        }

        Ok(conf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn item_json(argmap: Value) -> Value {
        json!({
            "analyzer": "/an",
            "cubes": "/cubes",
            "flavors": ["ct"],
            "functors": "/functors",
            "mode": "CT",
            "argmap": argmap
        })
    }

    #[test]
    fn test_alias_resolution() {
        let aliases: AliasTable = [("astar".to_string(), "/bench/astar".to_string())].into();
        assert_eq!(resolve_build_key("%astar", &aliases).unwrap(), "/bench/astar");
        assert_eq!(resolve_build_key("/bench/x", &aliases).unwrap(), "/bench/x");
        assert_eq!(
            resolve_build_key("%gcc", &aliases),
            Err(ConfigError::UnknownAlias("gcc".to_string()))
        );
        assert!(is_escaped("%astar"));
        assert!(!is_escaped("/bench/x"));
    }

    #[test]
    fn test_malformed_alias_table_degrades_to_empty() {
        assert!(parse_aliases(&json!({"directories": ["a"]})).is_empty());
        assert!(parse_aliases(&json!({})).is_empty());
    }

    #[test]
    fn test_literal_keys_need_no_alias_table() {
        let doc = json!({
            "directories": 42,
            "builds": {"/bench/x": {"items": {"x": item_json(json!({"mapper": "linear"}))}}}
        });
        let conf = SimplifiedParser.parse(&doc).unwrap();
        assert_eq!(conf.get_builds(), vec!["/bench/x"]);
        assert_eq!(conf.get_args("/bench/x", "x").unwrap(), vec![""]);
    }

    #[test]
    fn test_parse_simplified_document() {
        let doc = json!({
            "directories": {"astar": "/bench/astar"},
            "builds": {
                "%astar": {
                    "items": {
                        "astar": item_json(json!({
                            "mapper": "cartesian-product",
                            "size": [1, 2],
                            "input": ["a", "b"]
                        }))
                    }
                }
            }
        });

        let conf = SimplifiedParser.parse(&doc).unwrap();
        let (b, i) = ("/bench/astar", "astar");
        assert_eq!(conf.get_builds(), vec![b]);
        assert_eq!(conf.get_flavors(b, i).unwrap(), &["ct"]);
        assert_eq!(conf.get_builder_path(b, i).unwrap(), "/functors");
        assert_eq!(conf.get_runner_path(b, i).unwrap(), "/functors");
        assert_eq!(conf.get_analyser_dir(b, i).unwrap(), "/an");
        assert_eq!(conf.get_analyser_exp_dir(b, i).unwrap(), "/cubes");
        assert_eq!(conf.get_benchmark_name(b, i).unwrap(), "astar");
        assert_eq!(conf.get_mode(b, i).unwrap(), Some(&ItemMode::CompileTime));
        assert_eq!(conf.get_args(b, i).unwrap(), vec!["1 a", "1 b", "2 a", "2 b"]);
    }

    #[test]
    fn test_file_backed_argmap_uses_names_order() {
        let argmap = json!({
            "mapper": "linear",
            "pira-file": {
                "names": ["input", "threads"],
                "threads": [1, 2],
                "input": ["small.in", "large.in"]
            }
        });

        let mapping = parse_argmap(&argmap, "astar").unwrap();
        assert!(mapping.is_file_backed());
        assert_eq!(mapping.parameter_names(), vec!["input", "threads"]);
        assert_eq!(mapping.as_list(), vec!["small.in 1", "large.in 2"]);
    }

    #[test]
    fn test_file_backed_argmap_missing_parameter() {
        let argmap = json!({
            "mapper": "linear",
            "pira-file": {"names": ["input"]}
        });
        assert_eq!(
            parse_argmap(&argmap, "astar"),
            Err(ConfigError::MissingParameter("input".to_string()))
        );
    }

    #[test]
    fn test_linear_length_mismatch_aborts_load() {
        let doc = json!({
            "builds": {"/b": {"items": {"x": item_json(json!({
                "mapper": "linear",
                "a": [1, 2],
                "b": [1]
            }))}}}
        });
        assert!(matches!(
            SimplifiedParser.parse(&doc),
            Err(ConfigError::LengthMismatch { .. })
        ));
    }

    #[test]
    fn test_unknown_alias_aborts_load() {
        let doc = json!({
            "builds": {"%missing": {"items": {}}}
        });
        assert_eq!(
            SimplifiedParser.parse(&doc),
            Err(ConfigError::UnknownAlias("missing".to_string()))
        );
    }
}
