// Target creation - one TargetConfiguration per (build, item, flavor)

use tracing::debug;

use crate::domain::naming::instr_file_path;
use crate::domain::{Configuration, InvocationConfiguration, TargetConfiguration};
use crate::port::IdProvider;

/// Targets of every declared (build, item, flavor), build-major.
/// Runtime-filtering targets carry the path of their selection file.
pub fn make_targets(
    config: &Configuration,
    ids: &dyn IdProvider,
    invocation: &InvocationConfiguration,
) -> Vec<TargetConfiguration> {
    let mut targets = Vec::new();
    for build in config.builds() {
        for item in &build.items {
            for flavor in &item.flavors {
                let mut target = TargetConfiguration::new(
                    &build.directory,
                    &item.name,
                    flavor,
                    ids.generate_id(),
                    invocation.compile_time_filtering,
                );
                if !invocation.compile_time_filtering {
                    target = target.with_instr_file(instr_file_path(
                        &item.analyzer_dir,
                        flavor,
                        &item.benchmark_name,
                    ));
                }
                if let Some(args) = item.run_options.as_list().first() {
                    target = target.with_args(args.clone());
                }
                targets.push(target);
            }
        }
    }
    debug!(count = targets.len(), "Created targets");
    targets
}
