//! The run driver: wires the CDB, the action catalog, and the worker
//! pool together into one end-to-end execution.

use crate::cli::ui::{print_error, print_success};
use crate::core::actions::{self, ActionDescriptor, AnalyzerOptions};
use crate::core::cdb::{self, CompileCommand, Normalized, RawEntry};
use crate::core::estimator::JobSizeEstimator;
use crate::core::parallel::task::{Job, UnitJob};
use crate::core::parallel::worklist::{FifoWorklist, PriorityWorklist, Worklist};
use crate::core::parallel::pool::WorkerPool;
use crate::core::{plugin, reducers};
use crate::error::{PandaError, PandaResult};
use crate::options::Options;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

/// Action keys that name a whole-CDB reducer rather than a per-unit
/// [`ActionDescriptor`] in the catalog — enabling them toggles a
/// reducer instead of selecting a catalog entry.
const REDUCER_ACTION_KEYS: [&str; 3] = ["invocation-list", "input-file-list", "source-file-list"];

/// Run the full scheduler end to end: load the CDB, enqueue one job
/// per selected action per selected unit, enqueue the CDB-level
/// reducers, drain the pool, then run the reducers that depend on
/// per-unit output, and finally report elapsed wall time.
pub async fn run(options: Options) -> PandaResult<()> {
    let start = Instant::now();

    let entries = load_cdb(&options.cdb_path)?;
    let commands = normalize_entries(entries, options.allow_list.as_deref());

    let analyzer = AnalyzerOptions {
        output_root: options.output_root.to_string_lossy().into_owned(),
        verbose: options.verbose,
    };
    let mut catalog: std::collections::HashMap<String, ActionDescriptor> = actions::builtin_catalog(&analyzer)
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();
    for descriptor in plugin::load_plugins(&options.plugins)? {
        catalog.insert(descriptor.key().to_string(), descriptor);
    }

    let selected: Vec<&ActionDescriptor> = options
        .enabled_actions
        .iter()
        .filter(|key| !REDUCER_ACTION_KEYS.contains(&key.as_str()))
        .filter_map(|key| catalog.get(key.as_str()))
        .collect();
    for key in &options.enabled_actions {
        if !REDUCER_ACTION_KEYS.contains(&key.as_str()) && !catalog.contains_key(key.as_str()) {
            log::warn!("unknown action `{key}` ignored");
        }
    }

    let worklist: Arc<dyn Worklist> = match options.strategy.direction() {
        None => Arc::new(FifoWorklist::new()),
        Some(dir) => Arc::new(PriorityWorklist::new(dir)),
    };

    let estimator = options.metric.build();
    enqueue_unit_jobs(&worklist, &commands, &selected, &options, estimator.as_ref()).await;
    enqueue_reducer_jobs(&worklist, &commands, &options).await;

    for _ in 0..options.workers {
        worklist.push_stop().await;
    }

    let pool = WorkerPool::spawn(options.workers, worklist);
    let failures = pool.join().await;

    run_post_pool_reducers(&commands, &options).await?;

    let elapsed = start.elapsed().as_secs_f64();
    if failures > 0 {
        log::warn!("{failures} task(s) reported failure");
    }
    print_success(&format!("done in {elapsed:.3}s ({failures} failure(s))"));
    Ok(())
}

fn load_cdb(path: &std::path::Path) -> PandaResult<Vec<RawEntry>> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| PandaError::invalid_cdb(path.display().to_string(), e.to_string()))?;
    serde_json::from_str(&text)
        .map_err(|e| PandaError::invalid_cdb(path.display().to_string(), e.to_string()))
}

fn normalize_entries(entries: Vec<RawEntry>, allow_list: Option<&[PathBuf]>) -> Vec<CompileCommand> {
    let allow: Option<HashSet<PathBuf>> = allow_list.map(|l| l.iter().cloned().collect());

    entries
        .into_iter()
        .filter_map(|entry| match cdb::normalize(&entry) {
            Normalized::Ok(cmd) => Some(cmd),
            Normalized::InvalidEntry(reason) => {
                log::warn!("skipping compilation-database entry: {reason}");
                None
            }
        })
        .filter(|cmd| match &allow {
            None => true,
            Some(set) => set.contains(&cmd.file) || set.iter().any(|p| cmd.file.ends_with(p)),
        })
        .collect()
}

async fn enqueue_unit_jobs(
    worklist: &Arc<dyn Worklist>,
    commands: &[CompileCommand],
    actions: &[&ActionDescriptor],
    options: &Options,
    estimator: &dyn JobSizeEstimator,
) {
    for command in commands {
        for action in actions {
            let default_tool = match command.language {
                crate::core::cdb::Language::Cxx => options.cxx_compiler.clone(),
                _ => options.c_compiler.clone(),
            };
            let action = clone_action_with_tool(action, options);
            let size = estimator.estimate(&command.file);
            let job: Arc<dyn Job> = Arc::new(UnitJob {
                command: command.clone(),
                action,
                output_root: options.output_root.clone(),
                default_tool,
            });
            worklist.push_task(job, size).await;
        }
    }
}

fn clone_action_with_tool(action: &ActionDescriptor, options: &Options) -> ActionDescriptor {
    match action {
        ActionDescriptor::Singleton(s) if s.key == "extdef-map" => {
            let mut s = s.clone();
            if s.tool.is_empty() {
                s.tool = options.extdef_mapper.clone();
            }
            ActionDescriptor::Singleton(s)
        }
        other => other.clone(),
    }
}

async fn enqueue_reducer_jobs(worklist: &Arc<dyn Worklist>, commands: &[CompileCommand], options: &Options) {
    if options.enabled_actions.iter().any(|a| a == "invocation-list") {
        let commands_for_invocations = commands.to_vec();
        let dest = options.output_root.join(&options.ivcl_file);
        let resource_dir_tool = options.resource_dir_tool.clone();

        let job: Arc<dyn Job> = Arc::new(crate::core::parallel::task::ReducerJob {
            name: "invocation-list".to_string(),
            run: move || {
                let commands = commands_for_invocations.clone();
                let dest = dest.clone();
                let tool = resource_dir_tool.clone();
                Box::pin(async move {
                    match reducers::write_invocation_list(&commands, &dest, &tool).await {
                        Ok(()) => crate::core::parallel::task::JobOutcome {
                            success: true,
                            message: "invocation-list: ok".to_string(),
                        },
                        Err(e) => crate::core::parallel::task::JobOutcome {
                            success: false,
                            message: format!("invocation-list: {e}"),
                        },
                    }
                }) as crate::core::parallel::task::futures_outcome::BoxFuture
            },
        });
        // Reducer tasks get size 0: under longest-first this sorts to
        // the back of the queue, under shortest-first to the front,
        // with insertion order as the tie-break either way.
        worklist.push_task(job, 0).await;
    }

    if options.enabled_actions.iter().any(|a| a == "input-file-list") {
        let commands_for_ifl = commands.to_vec();
        let dest = options.output_root.join(&options.ifl_file);
        let job: Arc<dyn Job> = Arc::new(crate::core::parallel::task::ReducerJob {
            name: "input-file-list".to_string(),
            run: move || {
                let commands = commands_for_ifl.clone();
                let dest = dest.clone();
                Box::pin(async move {
                    match reducers::write_input_file_list(&commands, &dest) {
                        Ok(()) => crate::core::parallel::task::JobOutcome {
                            success: true,
                            message: "input-file-list: ok".to_string(),
                        },
                        Err(e) => crate::core::parallel::task::JobOutcome {
                            success: false,
                            message: format!("input-file-list: {e}"),
                        },
                    }
                }) as crate::core::parallel::task::futures_outcome::BoxFuture
            },
        });
        worklist.push_task(job, 0).await;
    }
}

/// Reducers that must run after the pool has finished (they read the
/// per-unit output artifacts the pool's jobs just wrote), so they
/// cannot be jobs on the same worklist.
async fn run_post_pool_reducers(commands: &[CompileCommand], options: &Options) -> PandaResult<()> {
    if options.enabled_actions.iter().any(|a| a == "extdef-map") {
        let dest = options.output_root.join(&options.efm_file);
        let result = reducers::merge_external_function_map(
            &options.output_root,
            &dest,
            options.workers,
            options.ast_ctu,
        );
        if let Err(e) = result {
            print_error(&format!("external-function-map reducer failed: {e}"));
        }
    }

    if options.enabled_actions.iter().any(|a| a == "source-file-list") {
        let dest = options.output_root.join(&options.sfl_file);
        reducers::write_source_file_list(
            commands,
            &options.output_root,
            &dest,
            options.sfl_prefix.as_deref(),
        )?;
    }

    Ok(())
}
