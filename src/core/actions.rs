//! Declarative descriptors for per-unit actions (compiler-based tools).
//!
//! An [`ActionDescriptor`] is either [`ActionDescriptor::Integrated`]
//! (a replayed compilation with extra flags) or
//! [`ActionDescriptor::Singleton`] (a standalone tool invoked once per
//! unit, with the unit's pruned argv appended after a `--`
//! separator). The built-in catalog in [`builtin_catalog`] matches the
//! action table verbatim.

use crate::core::cdb::Language;
use std::collections::HashMap;

/// Which standard stream a singleton action's output should be captured from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureStream {
    /// Capture the tool's stdout.
    Stdout,
    /// Capture the tool's stderr.
    Stderr,
}

/// Per-language tool binary override.
#[derive(Debug, Clone)]
pub struct ToolOverride {
    /// Binary to invoke for C translation units.
    pub c: String,
    /// Binary to invoke for C++ translation units.
    pub cxx: String,
}

impl ToolOverride {
    /// Resolve the binary for the given language; `Unknown` units are
    /// never dispatched, so callers need not handle that case here.
    pub fn resolve(&self, language: Language) -> &str {
        match language {
            Language::C => &self.c,
            Language::Cxx => &self.cxx,
            Language::Unknown => &self.c,
        }
    }
}

/// Extension applied to an action's output file, possibly differing by language.
#[derive(Debug, Clone)]
pub enum OutputExt {
    /// Same extension for both C and C++ units.
    Same(String),
    /// `(c, c++)` extension pair.
    ByLanguage(String, String),
}

impl OutputExt {
    /// Resolve the extension string for the given language.
    pub fn resolve(&self, language: Language) -> &str {
        match self {
            OutputExt::Same(ext) => ext,
            OutputExt::ByLanguage(c, cxx) => match language {
                Language::Cxx => cxx,
                _ => c,
            },
        }
    }
}

/// A replayed compilation with extra flags.
#[derive(Debug, Clone)]
pub struct IntegratedAction {
    /// Unique key identifying this action (e.g. `"syntax"`).
    pub key: String,
    /// Human-readable banner shown when the action runs.
    pub prompt: String,
    /// Extra argv fragment appended to the replay command.
    pub extra_args: Vec<String>,
    /// Flag preceding the output path, e.g. `-o` or `-MF`. `None` when
    /// the action produces no file.
    pub output_opt: Option<String>,
    /// Output extension(s), present iff `output_opt` is set.
    pub output_ext: Option<OutputExt>,
    /// Optional per-language tool override; falls back to the
    /// configured default compiler when absent.
    pub tool: Option<ToolOverride>,
}

/// A standalone tool invoked once per unit, driving the compilation as
/// tail arguments.
#[derive(Debug, Clone)]
pub struct SingletonAction {
    /// Unique key identifying this action (e.g. `"extdef-map"`).
    pub key: String,
    /// Human-readable banner shown when the action runs.
    pub prompt: String,
    /// Binary to invoke.
    pub tool: String,
    /// Extra argv fragment placed after the source file, before `--`.
    pub extra_args: Vec<String>,
    /// Output extension, present iff output is captured.
    pub output_ext: Option<String>,
    /// Exactly one of stdout/stderr, required iff `output_ext` is set.
    pub capture_stream: Option<CaptureStream>,
}

/// A per-unit action descriptor: either a replayed compilation or a
/// standalone tool invocation.
#[derive(Debug, Clone)]
pub enum ActionDescriptor {
    /// See [`IntegratedAction`].
    Integrated(IntegratedAction),
    /// See [`SingletonAction`].
    Singleton(SingletonAction),
}

impl ActionDescriptor {
    /// The action's unique catalog key.
    pub fn key(&self) -> &str {
        match self {
            ActionDescriptor::Integrated(a) => &a.key,
            ActionDescriptor::Singleton(a) => &a.key,
        }
    }

    /// The action's human-readable banner.
    pub fn prompt(&self) -> &str {
        match self {
            ActionDescriptor::Integrated(a) => &a.prompt,
            ActionDescriptor::Singleton(a) => &a.prompt,
        }
    }
}

/// Verbose-mode toggle for the analyzer action's `-analyzer-display-progress` flag.
pub struct AnalyzerOptions {
    /// Root directory `csa-reports/` is created under.
    pub output_root: String,
    /// Whether to append `-Xanalyzer -analyzer-display-progress`.
    pub verbose: bool,
}

/// Build the built-in Integrated action catalog, keyed by CLI switch letter.
///
/// The `analyze` action is parameterized by `analyzer` (output root and
/// verbosity) per the "rebuild its argv once after options are parsed
/// and freeze it" design note — callers invoke this once, after CLI
/// parsing, and share the resulting immutable map across workers.
pub fn builtin_catalog(analyzer: &AnalyzerOptions) -> HashMap<&'static str, ActionDescriptor> {
    let mut m = HashMap::new();

    m.insert(
        "syntax",
        ActionDescriptor::Integrated(IntegratedAction {
            key: "syntax".into(),
            prompt: "check syntax".into(),
            extra_args: split("-fsyntax-only -Wall"),
            output_opt: None,
            output_ext: None,
            tool: None,
        }),
    );
    m.insert(
        "compile",
        ActionDescriptor::Integrated(IntegratedAction {
            key: "compile".into(),
            prompt: "generate object".into(),
            extra_args: split("-c -w"),
            output_opt: Some("-o".into()),
            output_ext: Some(OutputExt::Same(".o".into())),
            tool: None,
        }),
    );
    m.insert(
        "preprocess",
        ActionDescriptor::Integrated(IntegratedAction {
            key: "preprocess".into(),
            prompt: "preprocess".into(),
            extra_args: split("-E"),
            output_opt: Some("-o".into()),
            output_ext: Some(OutputExt::ByLanguage(".i".into(), ".ii".into())),
            tool: None,
        }),
    );
    m.insert(
        "ast",
        ActionDescriptor::Integrated(IntegratedAction {
            key: "ast".into(),
            prompt: "emit AST".into(),
            extra_args: split("-emit-ast -w"),
            output_opt: Some("-o".into()),
            output_ext: Some(OutputExt::Same(".ast".into())),
            tool: None,
        }),
    );
    m.insert(
        "bitcode",
        ActionDescriptor::Integrated(IntegratedAction {
            key: "bitcode".into(),
            prompt: "emit bitcode".into(),
            extra_args: split("-c -emit-llvm -w"),
            output_opt: Some("-o".into()),
            output_ext: Some(OutputExt::Same(".bc".into())),
            tool: None,
        }),
    );
    m.insert(
        "llvm-ir",
        ActionDescriptor::Integrated(IntegratedAction {
            key: "llvm-ir".into(),
            prompt: "emit LLVM IR".into(),
            extra_args: split("-c -emit-llvm -S -w"),
            output_opt: Some("-o".into()),
            output_ext: Some(OutputExt::Same(".ll".into())),
            tool: None,
        }),
    );
    m.insert(
        "asm",
        ActionDescriptor::Integrated(IntegratedAction {
            key: "asm".into(),
            prompt: "emit assembly".into(),
            extra_args: split("-S -w"),
            output_opt: Some("-o".into()),
            output_ext: Some(OutputExt::Same(".s".into())),
            tool: None,
        }),
    );
    m.insert(
        "dep",
        ActionDescriptor::Integrated(IntegratedAction {
            key: "dep".into(),
            prompt: "emit dependency".into(),
            extra_args: split("-fsyntax-only -w -M"),
            output_opt: Some("-MF".into()),
            output_ext: Some(OutputExt::Same(".d".into())),
            tool: None,
        }),
    );

    let mut analyze_args = split(
        "--analyze -Xanalyzer -analyzer-output=html -Xanalyzer -analyzer-disable-checker=deadcode",
    );
    analyze_args.push("-o".into());
    analyze_args.push(format!("{}/csa-reports", analyzer.output_root));
    if analyzer.verbose {
        analyze_args.push("-Xanalyzer".into());
        analyze_args.push("-analyzer-display-progress".into());
    }
    m.insert(
        "analyze",
        ActionDescriptor::Integrated(IntegratedAction {
            key: "analyze".into(),
            prompt: "run static analyzer".into(),
            extra_args: analyze_args,
            output_opt: None,
            output_ext: None,
            tool: None,
        }),
    );

    m.insert(
        "extdef-map",
        ActionDescriptor::Singleton(SingletonAction {
            key: "extdef-map".into(),
            prompt: "map external definitions".into(),
            tool: String::new(), // filled in by the driver from Options::extdef_mapper
            extra_args: Vec::new(),
            output_ext: Some(".extdef".into()),
            capture_stream: Some(CaptureStream::Stdout),
        }),
    );

    m
}

fn split(s: &str) -> Vec<String> {
    s.split_whitespace().map(str::to_string).collect()
}
