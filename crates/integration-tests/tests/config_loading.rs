//! Configuration loading across both schema generations

use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use pira_core::application::{ConfigurationLoader, LegacyConfigurationLoader, SimplifiedConfigurationLoader};
use pira_core::domain::{ConfigError, Configuration, SchemaVersion};
use pira_core::AppError;

fn legacy_document() -> serde_json::Value {
    json!({
        "description": {
            "directories": ["/bench/cpu2006", "/bench/npb"],
            "glob-flavors": ["ct", "vanilla"],
            "glob-submitter": {"ct": "sbatch", "vanilla": "sbatch"},
            "builds": {
                "/bench/cpu2006": {
                    "prefix": "cpu",
                    "items": ["cpu2006/astar", "cpu2006/gcc"],
                    "flavors": {
                        "builders": {"cpu2006/astar": "/f/build", "cpu2006/gcc": "/f/build"},
                        "instrument-analysis": {
                            "cpu2006/astar": ["/f/analyse", "/exp/astar", "/an/astar"],
                            "cpu2006/gcc": ["/f/analyse", "/exp/gcc", "/an/gcc", "/f/slurm"]
                        },
                        "run": {
                            "cpu2006/astar": {"args": ["-i", "rivers.cfg"], "runner": "/f/run", "submitter": "", "batch_script": ""},
                            "cpu2006/gcc": {"args": [1, true, 2.5], "runner": "/f/run", "submitter": "sbatch", "batch_script": "gcc.sh"}
                        },
                        "cpu2006/astar": ["ct"],
                        "cpu2006/gcc": ["vanilla", "ct"]
                    }
                },
                "/bench/npb": {
                    "prefix": "npb",
                    "items": ["bt"],
                    "flavors": {
                        "builders": {"bt": "/f/npb"},
                        "instrument-analysis": {"bt": ["/f/analyse", "/exp/bt", "/an/bt"]},
                        "run": {"bt": {"args": [], "runner": "/f/npb", "submitter": "", "batch_script": ""}},
                        "bt": ["ct"]
                    }
                }
            }
        }
    })
}

fn write(dir: &Path, name: &str, doc: &serde_json::Value) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, doc.to_string()).unwrap();
    path
}

/// Every getter's answer for every (build, item)
fn snapshot(conf: &Configuration) -> Vec<String> {
    let mut out = Vec::new();
    for build in conf.get_builds() {
        out.push(format!("{build} prefix={:?}", conf.get_prefix(build).unwrap()));
        out.push(format!("{build} flavors={:?}", conf.get_build_flavors(build).unwrap()));
        for item in conf.get_items(build).unwrap() {
            out.push(format!(
                "{build}/{item}: {:?} {:?} {} {} {} {} {} {} {} {:?} {:?}",
                conf.get_flavors(build, item).unwrap(),
                conf.get_args(build, item).unwrap(),
                conf.get_benchmark_name(build, item).unwrap(),
                conf.get_builder_path(build, item).unwrap(),
                conf.get_cleaner_path(build, item).unwrap(),
                conf.get_runner_path(build, item).unwrap(),
                conf.get_analyse_func(build, item).unwrap(),
                conf.get_analyser_exp_dir(build, item).unwrap(),
                conf.get_analyser_dir(build, item).unwrap(),
                conf.get_submitter_func(build, item).unwrap(),
                conf.get_batch_script_func(build, item).unwrap(),
            ));
        }
    }
    out
}

#[test]
fn test_legacy_load_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(dir.path(), "legacy.json", &legacy_document());

    let loader = LegacyConfigurationLoader::legacy();
    let first = loader.load_conf(&path).unwrap();
    let second = loader.load_conf(&path).unwrap();
    assert!(Arc::ptr_eq(&first, &second));

    // A fresh loader re-reads the file and yields identical answers
    let fresh = LegacyConfigurationLoader::legacy().load_conf(&path).unwrap();
    assert_eq!(*first, *fresh);
    assert_eq!(snapshot(&first), snapshot(&fresh));
}

#[test]
fn test_legacy_queries() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(dir.path(), "legacy.json", &legacy_document());
    let conf = LegacyConfigurationLoader::legacy().load_conf(&path).unwrap();

    let cpu = "/bench/cpu2006";
    assert_eq!(conf.get_items(cpu).unwrap(), vec!["cpu2006/astar", "cpu2006/gcc"]);
    assert_eq!(conf.get_build_flavors(cpu).unwrap(), vec!["ct", "vanilla"]);
    assert_eq!(conf.get_benchmark_name(cpu, "cpu2006/gcc").unwrap(), "gcc");
    // Scalars keep their type in the model and are stringified on expansion
    assert_eq!(conf.get_args(cpu, "cpu2006/gcc").unwrap(), vec!["1", "true", "2.5"]);
    assert!(conf.is_submitter(cpu, "cpu2006/gcc").unwrap());
    assert!(!conf.is_submitter(cpu, "cpu2006/astar").unwrap());
    assert_eq!(conf.get_analyse_slurm_func(cpu, "cpu2006/gcc").unwrap(), "/f/slurm");
    assert!(conf.get_analyse_slurm_func(cpu, "cpu2006/astar").is_err());
    assert_eq!(conf.get_global_submitter("vanilla"), Some("sbatch"));
    assert_eq!(conf.all_flavors(), vec!["ct", "vanilla"]);
}

#[test]
fn test_unknown_lookups_fail() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(dir.path(), "legacy.json", &legacy_document());
    let conf = LegacyConfigurationLoader::legacy().load_conf(&path).unwrap();

    assert!(conf.get_items("/bench/other").is_err());
    assert!(conf.get_flavors("/bench/cpu2006", "bt").is_err());
}

#[test]
fn test_detecting_loader_handles_both_schemas() {
    let dir = tempfile::tempdir().unwrap();
    let legacy = write(dir.path(), "legacy.json", &legacy_document());
    let simplified = write(
        dir.path(),
        "simplified.json",
        &json!({
            "builds": {"/bench/x": {"items": {"x": {
                "analyzer": "/an", "cubes": "/c", "flavors": ["ct"], "functors": "/f",
                "argmap": {"mapper": "linear"}
            }}}}
        }),
    );

    let loader = ConfigurationLoader::detecting();
    assert_eq!(loader.load_conf(&legacy).unwrap().schema(), SchemaVersion::Legacy);
    assert_eq!(loader.load_conf(&simplified).unwrap().schema(), SchemaVersion::Simplified);
}

#[test]
fn test_wrong_loader_for_schema_fails() {
    let dir = tempfile::tempdir().unwrap();
    let legacy = write(dir.path(), "legacy.json", &legacy_document());

    let result = SimplifiedConfigurationLoader::simplified().load_conf(&legacy);
    assert!(matches!(result, Err(AppError::Config(ConfigError::MissingField { .. }))));
}
