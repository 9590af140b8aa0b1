//! Command-line interface for panda-rs.
//!
//! There is exactly one command: replay a compilation database through
//! a chosen set of compiler-based tools. The interface is therefore a
//! single flat argument struct rather than a subcommand tree.

pub mod ui;

pub use ui::{print_error, print_success, print_warning};

use crate::core::estimator::Metric;
use crate::options::Strategy;
use clap::Parser;
use std::path::PathBuf;

/// Replay a JSON compilation database through a set of compiler-based tools.
#[derive(Parser, Debug, Clone)]
#[command(name = "panda-rs")]
#[command(about = "Concurrent compiler-based tool scheduler")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Args {
    /// Path to the compilation database (compile_commands.json).
    #[arg(short = 'p', long = "cdb", default_value = "compile_commands.json")]
    pub cdb: PathBuf,

    /// Directory every action's output is written under.
    #[arg(short = 'o', long = "output", default_value = "panda-output")]
    pub output: PathBuf,

    /// Number of worker tasks.
    #[arg(short = 'j', long = "jobs", default_value_t = 1)]
    pub jobs: usize,

    /// Default C compiler invoked for replay.
    #[arg(long = "cc", default_value = "cc")]
    pub cc: String,

    /// Default C++ compiler invoked for replay.
    #[arg(long = "cxx", default_value = "c++")]
    pub cxx: String,

    /// Binary used for the `extdef-map` singleton action.
    #[arg(long = "extdef-mapper", default_value = "clang-extdef-mapping")]
    pub extdef_mapper: String,

    /// Binary queried for `-print-resource-dir` by the invocation-list reducer.
    #[arg(long = "resource-dir-tool", default_value = "clang")]
    pub resource_dir_tool: String,

    /// Queueing strategy: fifo, ljf (longest job first), or sjf (shortest job first).
    #[arg(long = "strategy", default_value = "ljf")]
    pub strategy: Strategy,

    /// Job-size metric used when `--strategy` is not `fifo`.
    #[arg(long = "metric", default_value = "semicolon")]
    pub metric: Metric,

    /// Built-in action keys to run against every unit
    /// (syntax, compile, preprocess, ast, bitcode, llvm-ir, asm, dep, analyze, extdef-map).
    #[arg(short = 'a', long = "action", num_args = 1)]
    pub actions: Vec<String>,

    /// Path to a plugin action descriptor, may be repeated.
    #[arg(long = "plugin")]
    pub plugin: Vec<PathBuf>,

    /// Restrict the source-file-list reducer's output to files starting with this prefix.
    #[arg(long = "sfl-prefix")]
    pub sfl_prefix: Option<String>,

    /// Filename the external-function-map reducer writes under the output root.
    #[arg(long = "efm", default_value = "externalDefMap.txt")]
    pub efm: String,

    /// Filename the invocation-list reducer writes under the output root.
    #[arg(long = "ivcl", default_value = "invocations.yaml")]
    pub ivcl: String,

    /// Filename the input-file-list reducer writes under the output root.
    #[arg(long = "ifl", default_value = "inputs.ifl")]
    pub ifl: String,

    /// Filename the source-file-list reducer writes under the output root.
    #[arg(long = "sfl", default_value = "source-files.txt")]
    pub sfl: String,

    /// Restrict replay to the source files listed in this file, one per line.
    #[arg(long = "file-list")]
    pub file_list: Option<PathBuf>,

    /// Restrict replay to these source files.
    pub files: Vec<PathBuf>,

    /// Enable `dep`, `ast`, and `analyze` for on-demand cross-translation-unit parsing.
    #[arg(long = "ctu-on-demand-parsing")]
    pub ctu_on_demand_parsing: bool,

    /// Enable `ast` and `analyze` for pre-loaded cross-translation-unit AST files.
    #[arg(long = "ctu-loading-ast-files")]
    pub ctu_loading_ast_files: bool,

    /// Raise log verbosity and enable analyzer progress output.
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_invocation() {
        let args = Args::parse_from(["panda-rs"]);
        assert_eq!(args.cdb, PathBuf::from("compile_commands.json"));
        assert_eq!(args.jobs, 1);
        assert_eq!(args.strategy, Strategy::Ljf);
        assert_eq!(args.metric, Metric::Semicolon);
        assert_eq!(args.efm, "externalDefMap.txt");
        assert_eq!(args.ivcl, "invocations.yaml");
        assert_eq!(args.ifl, "inputs.ifl");
        assert_eq!(args.sfl, "source-files.txt");
    }

    #[test]
    fn parses_reducer_filename_overrides() {
        let args = Args::parse_from([
            "panda-rs", "--efm", "efm.txt", "--ivcl", "ivcl.txt", "--ifl", "ifl.txt", "--sfl", "sfl.txt",
        ]);
        assert_eq!(args.efm, "efm.txt");
        assert_eq!(args.ivcl, "ivcl.txt");
        assert_eq!(args.ifl, "ifl.txt");
        assert_eq!(args.sfl, "sfl.txt");
    }

    #[test]
    fn parses_repeated_plugin_flags() {
        let args = Args::parse_from(["panda-rs", "--plugin", "a.json", "--plugin", "b.json"]);
        assert_eq!(args.plugin, vec![PathBuf::from("a.json"), PathBuf::from("b.json")]);
    }

    #[test]
    fn parses_positional_file_filters() {
        let args = Args::parse_from(["panda-rs", "a.c", "b.cpp"]);
        assert_eq!(args.files, vec![PathBuf::from("a.c"), PathBuf::from("b.cpp")]);
    }
}
