//! Resolved, immutable run configuration.
//!
//! [`Options`] is the single record every subsystem reads from; it is
//! built once from parsed CLI arguments via [`Options::from_cli`] and
//! never mutated afterward. Composite aliases and conflicting-flag
//! validation are resolved here, before the scheduler is touched.

use crate::cli::Args;
use crate::core::estimator::Metric;
use crate::core::parallel::worklist::Direction;
use crate::error::{PandaError, PandaResult};
use std::path::PathBuf;

/// Queueing strategy selected on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Plain FIFO order.
    Fifo,
    /// Largest-estimated-job-first.
    Ljf,
    /// Smallest-estimated-job-first.
    Sjf,
}

impl std::str::FromStr for Strategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fifo" => Ok(Strategy::Fifo),
            "ljf" => Ok(Strategy::Ljf),
            "sjf" => Ok(Strategy::Sjf),
            other => Err(format!("unknown scheduler strategy `{other}`")),
        }
    }
}

impl Strategy {
    /// The priority-worklist direction this strategy implies, or
    /// `None` for plain FIFO.
    pub fn direction(self) -> Option<Direction> {
        match self {
            Strategy::Fifo => None,
            Strategy::Ljf => Some(Direction::LongestFirst),
            Strategy::Sjf => Some(Direction::ShortestFirst),
        }
    }
}

/// Fully resolved run configuration.
pub struct Options {
    /// Path to the compilation-database JSON file.
    pub cdb_path: PathBuf,
    /// Root directory every action's output is written under.
    pub output_root: PathBuf,
    /// Number of pool workers.
    pub workers: usize,
    /// Default compiler invoked for C translation units.
    pub c_compiler: String,
    /// Default compiler invoked for C++ translation units.
    pub cxx_compiler: String,
    /// Binary used for the `extdef-map` singleton action.
    pub extdef_mapper: String,
    /// Binary `-print-resource-dir` is queried against for the
    /// invocation-list reducer.
    pub resource_dir_tool: String,
    /// Queueing strategy.
    pub strategy: Strategy,
    /// Job-size metric used when `strategy` is not FIFO.
    pub metric: Metric,
    /// Built-in action keys enabled for this run.
    pub enabled_actions: Vec<String>,
    /// Plugin descriptor files to load.
    pub plugins: Vec<PathBuf>,
    /// Optional prefix filter applied by the source-file-list reducer.
    pub sfl_prefix: Option<String>,
    /// Filename the external-function-map reducer writes under `output_root`.
    pub efm_file: String,
    /// Filename the invocation-list reducer writes under `output_root`.
    pub ivcl_file: String,
    /// Filename the input-file-list reducer writes under `output_root`.
    pub ifl_file: String,
    /// Filename the source-file-list reducer writes under `output_root`.
    pub sfl_file: String,
    /// Optional allow-list of source files to restrict replay to.
    pub allow_list: Option<Vec<PathBuf>>,
    /// Whether the analyzer action should log progress.
    pub verbose: bool,
    /// Whether the external-function-map reducer should rewrite values
    /// to their per-unit AST output path (set by
    /// `--ctu-loading-ast-files`).
    pub ast_ctu: bool,
}

impl Options {
    /// Resolve CLI arguments into a validated [`Options`] record.
    ///
    /// Applies the composite-alias expansion:
    /// `--ctu-on-demand-parsing` enables the `extdef-map` action in its
    /// source form plus the `invocation-list` and `input-file-list`
    /// reducers; `--ctu-loading-ast-files` enables `ast` plus
    /// `extdef-map` in its AST form (setting [`Options::ast_ctu`]) plus
    /// `input-file-list`. The two are mutually exclusive, since one
    /// implies the source form of `extdef-map` and the other its AST
    /// form.
    pub fn from_cli(args: Args) -> PandaResult<Self> {
        if args.jobs == 0 {
            return Err(PandaError::InvalidJobCount(args.jobs));
        }

        if args.ctu_on_demand_parsing && args.ctu_loading_ast_files {
            return Err(PandaError::ConflictingFlags(
                "--ctu-on-demand-parsing and --ctu-loading-ast-files are mutually exclusive"
                    .to_string(),
            ));
        }

        let mut enabled_actions: Vec<String> = args.actions.clone();
        let mut ast_ctu = false;
        if args.ctu_on_demand_parsing {
            enabled_actions.extend([
                "extdef-map".to_string(),
                "invocation-list".to_string(),
                "input-file-list".to_string(),
            ]);
        }
        if args.ctu_loading_ast_files {
            enabled_actions.extend([
                "ast".to_string(),
                "extdef-map".to_string(),
                "input-file-list".to_string(),
            ]);
            ast_ctu = true;
        }
        enabled_actions.sort();
        enabled_actions.dedup();

        let allow_list = match &args.file_list {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .map_err(|e| PandaError::unreadable_file_list(path.display().to_string(), e.to_string()))?;
                Some(
                    text.lines()
                        .map(str::trim)
                        .filter(|l| !l.is_empty())
                        .map(PathBuf::from)
                        .collect(),
                )
            }
            None if !args.files.is_empty() => Some(args.files.iter().cloned().collect()),
            None => None,
        };

        let cwd = std::env::current_dir()?;
        let output_root = absolutize(&cwd, &args.output);

        Ok(Options {
            cdb_path: absolutize(&cwd, &args.cdb),
            output_root,
            workers: args.jobs,
            c_compiler: args.cc,
            cxx_compiler: args.cxx,
            extdef_mapper: args.extdef_mapper,
            resource_dir_tool: args.resource_dir_tool,
            strategy: args.strategy,
            metric: args.metric,
            enabled_actions,
            plugins: args.plugin,
            sfl_prefix: args.sfl_prefix,
            efm_file: args.efm,
            ivcl_file: args.ivcl,
            ifl_file: args.ifl,
            sfl_file: args.sfl,
            allow_list,
            verbose: args.verbose,
            ast_ctu,
        })
    }
}

fn absolutize(cwd: &std::path::Path, path: &std::path::Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        cwd.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Args;
    use std::path::PathBuf;

    fn base_args() -> Args {
        Args {
            cdb: PathBuf::from("compile_commands.json"),
            output: PathBuf::from("out"),
            jobs: 4,
            cc: "gcc".into(),
            cxx: "g++".into(),
            extdef_mapper: "clang-extdef-mapping".into(),
            resource_dir_tool: "clang".into(),
            strategy: Strategy::Fifo,
            metric: Metric::Loc,
            actions: vec!["syntax".into()],
            plugin: vec![],
            sfl_prefix: None,
            efm: "externalDefMap.txt".into(),
            ivcl: "invocations.yaml".into(),
            ifl: "inputs.ifl".into(),
            sfl: "source-files.txt".into(),
            file_list: None,
            files: vec![],
            ctu_on_demand_parsing: false,
            ctu_loading_ast_files: false,
            verbose: false,
        }
    }

    #[test]
    fn rejects_zero_jobs() {
        let mut args = base_args();
        args.jobs = 0;
        assert!(Options::from_cli(args).is_err());
    }

    #[test]
    fn ctu_on_demand_parsing_expands_to_extdef_map_and_list_reducers() {
        let mut args = base_args();
        args.ctu_on_demand_parsing = true;
        let opts = Options::from_cli(args).unwrap();
        for key in ["extdef-map", "invocation-list", "input-file-list"] {
            assert!(opts.enabled_actions.iter().any(|a| a == key));
        }
        assert!(!opts.ast_ctu);
    }

    #[test]
    fn ctu_loading_ast_files_expands_to_ast_extdef_map_and_sets_ast_ctu() {
        let mut args = base_args();
        args.ctu_loading_ast_files = true;
        let opts = Options::from_cli(args).unwrap();
        for key in ["ast", "extdef-map", "input-file-list"] {
            assert!(opts.enabled_actions.iter().any(|a| a == key));
        }
        assert!(opts.ast_ctu);
    }

    #[test]
    fn rejects_both_composite_aliases_together() {
        let mut args = base_args();
        args.ctu_on_demand_parsing = true;
        args.ctu_loading_ast_files = true;
        assert!(Options::from_cli(args).is_err());
    }

    #[test]
    fn output_root_is_absolutized() {
        let mut args = base_args();
        args.output = PathBuf::from("relative-out");
        let opts = Options::from_cli(args).unwrap();
        assert!(opts.output_root.is_absolute());
    }
}
