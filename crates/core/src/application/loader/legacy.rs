// Legacy Configuration Parser
// `description` object with per-field item tables

use serde_json::Value;
use tracing::debug;

use super::json::{field, list_field, object, string_field};
use super::ConfigurationParser;
use crate::domain::{
    ArgValue, ConfigError, Configuration, FunctorPaths, PiraItem, RunOptions, SchemaVersion,
};

const DESC: &str = "description";
const DIRS: &str = "directories";
const G_FLAVORS: &str = "glob-flavors";
const G_SUBMITTER: &str = "glob-submitter";
const BUILDS: &str = "builds";
const PREFIX: &str = "prefix";
const ITEMS: &str = "items";
const FLAVORS: &str = "flavors";
const BUILDERS: &str = "builders";
const INSTRUMENT_ANALYSIS: &str = "instrument-analysis";
const RUN: &str = "run";
const ARGS: &str = "args";
const RUNNER: &str = "runner";
const SUBMITTER: &str = "submitter";
const BATCH_SCRIPT: &str = "batch_script";

/// Parser for the nested-mapping schema
#[derive(Debug, Default, Clone, Copy)]
pub struct LegacyParser;

/// Last `/` component of an item key
pub fn benchmark_name(item: &str) -> &str {
    item.rsplit('/').next().unwrap_or(item)
}

impl ConfigurationParser for LegacyParser {
    fn parse(&self, tree: &Value) -> Result<Configuration, ConfigError> {
        let desc = field(tree, DESC, "root")?;
        let mut conf = Configuration::new(SchemaVersion::Legacy);

        let directories = list_field(desc, DIRS, DESC)?;

        let global_flavors = list_field(desc, G_FLAVORS, DESC)?;
        let submitters = field(desc, G_SUBMITTER, DESC)?;
        for flavor in &global_flavors {
            let submitter = string_field(submitters, flavor, G_SUBMITTER)?;
            conf.set_global_submitter(flavor.clone(), submitter);
        }
        conf.set_global_flavors(global_flavors);

        let builds = object(desc, BUILDS, DESC)?;
        for dir in &directories {
            let build_tree = builds.get(dir).ok_or_else(|| ConfigError::MissingField {
                field: dir.clone(),
                context: BUILDS.to_string(),
            })?;
            let prefix = string_field(build_tree, PREFIX, dir)?;
            conf.add_build(dir.as_str()).prefix = Some(prefix);

            let flavors_tree = field(build_tree, FLAVORS, dir)?;
            for item in list_field(build_tree, ITEMS, dir)? {
                let parsed = parse_item(flavors_tree, &item)?;
                debug!(build = %dir, item = %item, flavors = ?parsed.flavors, "Parsed legacy item");
                conf.add_item(dir, parsed)?;
            }
        }

        Ok(conf)
    }
}

fn parse_item(flavors_tree: &Value, item: &str) -> Result<PiraItem, ConfigError> {
    let analysis = list_field(field(flavors_tree, INSTRUMENT_ANALYSIS, FLAVORS)?, item, INSTRUMENT_ANALYSIS)?;
    let analysis_entry = |idx: usize| -> Result<String, ConfigError> {
        analysis.get(idx).cloned().ok_or_else(|| ConfigError::MissingField {
            field: format!("{INSTRUMENT_ANALYSIS}[{idx}]"),
            context: item.to_string(),
        })
    };
    let analyzer_functor = analysis_entry(0)?;
    let experiment_dir = analysis_entry(1)?;
    let analyzer_dir = analysis_entry(2)?;

    let builders = string_field(field(flavors_tree, BUILDERS, FLAVORS)?, item, BUILDERS)?;

    let run = field(field(flavors_tree, RUN, FLAVORS)?, item, RUN)?;
    let args = ArgValue::sequence(field(run, ARGS, item)?);
    let runner = string_field(run, RUNNER, item)?;
    let submitter = string_field(run, SUBMITTER, item)?;
    let batch_script = string_field(run, BATCH_SCRIPT, item)?;

    let functors = FunctorPaths {
        builder: builders.clone(),
        cleaner: builders,
        runner,
        analyzer: analyzer_functor.clone(),
    };

    let mut parsed = PiraItem::new(item, functors, RunOptions::Listed(args));
    parsed.benchmark_name = benchmark_name(item).to_string();
    parsed.flavors = list_field(flavors_tree, item, FLAVORS)?;
    parsed.analyzer_dir = analyzer_dir;
    parsed.cubes_dir = experiment_dir;
    parsed.analyzer_functor = Some(analyzer_functor);
    parsed.slurm_analysis_functor = analysis.get(3).cloned();
    parsed.submitter = Some(submitter);
    parsed.batch_script = Some(batch_script);
    Ok(parsed)
}
