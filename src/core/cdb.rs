//! Compilation-database entry parsing and normalization.
//!
//! Converts one raw JSON compilation-database entry into a
//! [`CompileCommand`] ready for replay: paths are absolutized, the
//! source language is inferred (and may be overridden by an explicit
//! `-x` flag), and build-specific flags that would interfere with
//! replay are pruned from the argument list.

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Source language of a translation unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    /// C source.
    C,
    /// C++ source.
    Cxx,
    /// Could not be determined from the file extension or an `-x` flag.
    Unknown,
}

impl Language {
    /// Infer a language from a source file's extension.
    ///
    /// `.c` maps to [`Language::C`]; the usual set of C++ extensions
    /// (`.C`, `.cc`, `.CC`, `.cp`, `.cpp`, `.CPP`, `.cxx`, `.CXX`,
    /// `.c++`, `.C++`) maps to [`Language::Cxx`]; anything else is
    /// [`Language::Unknown`].
    pub fn from_extension(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("c") => Language::C,
            Some("C") | Some("cc") | Some("CC") | Some("cp") | Some("cpp") | Some("CPP")
            | Some("cxx") | Some("CXX") | Some("c++") | Some("C++") => Language::Cxx,
            _ => Language::Unknown,
        }
    }

    /// Parse an explicit `-x` language name (e.g. `c`, `c++`), as found
    /// in compiler argv. Unrecognized values fall back to
    /// [`Language::Unknown`]; no validation is performed beyond this
    /// coarse mapping, matching the "no validation" rule in the
    /// normalizer's specification.
    pub fn from_x_flag(value: &str) -> Self {
        match value {
            "c" => Language::C,
            "c++" => Language::Cxx,
            _ => Language::Unknown,
        }
    }
}

/// One raw entry from a JSON compilation database.
#[derive(Debug, Deserialize)]
pub struct RawEntry {
    /// Working directory the compiler was originally launched in.
    pub directory: Option<String>,
    /// Path to the primary source file, relative to `directory` unless absolute.
    pub file: Option<String>,
    /// Shell-quoted command line, mutually usable with `arguments`.
    pub command: Option<String>,
    /// Pre-tokenized argv, mutually usable with `command`.
    pub arguments: Option<Vec<String>>,
}

/// A normalized, replay-ready translation-unit invocation.
#[derive(Debug, Clone)]
pub struct CompileCommand {
    /// Absolute working directory to launch replay commands in.
    pub directory: PathBuf,
    /// Absolute path to the primary source file.
    pub file: PathBuf,
    /// Inferred (or `-x`-overridden) source language.
    pub language: Language,
    /// argv[0] of the original command, retained for invocation-list emission.
    pub compiler: String,
    /// Pruned, replay-ready argv tail (excludes argv[0]).
    pub arguments: Vec<String>,
}

/// Outcome of normalizing one raw CDB entry.
pub enum Normalized {
    /// Successfully normalized.
    Ok(CompileCommand),
    /// The entry was missing a required field; callers should log a
    /// warning with the returned reason and skip the unit.
    InvalidEntry(&'static str),
}

/// Normalize one raw CDB entry into a [`CompileCommand`].
///
/// Fails with [`Normalized::InvalidEntry`] if `file`, `directory`, or
/// both of `arguments`/`command` are missing. When `command` is given
/// instead of `arguments`, it is split using POSIX shell word rules
/// (quoting and escapes honored) via [`shlex::split`].
pub fn normalize(entry: &RawEntry) -> Normalized {
    let Some(directory) = entry.directory.as_deref() else {
        return Normalized::InvalidEntry("missing `directory`");
    };
    let Some(file) = entry.file.as_deref() else {
        return Normalized::InvalidEntry("missing `file`");
    };

    let mut argv = match (&entry.arguments, &entry.command) {
        (Some(args), _) => args.clone(),
        (None, Some(command)) => match shlex::split(command) {
            Some(tokens) => tokens,
            None => return Normalized::InvalidEntry("unterminated quote in `command`"),
        },
        (None, None) => return Normalized::InvalidEntry("missing `arguments` or `command`"),
    };

    if argv.is_empty() {
        return Normalized::InvalidEntry("empty argument vector");
    }
    let compiler = argv.remove(0);

    let directory = PathBuf::from(directory);
    let file_path = Path::new(file);
    let file = if file_path.is_absolute() {
        file_path.to_path_buf()
    } else {
        directory.join(file_path)
    };

    let mut language = Language::from_extension(&file);
    let arguments = prune_and_scan_language(&argv, &mut language);

    Normalized::Ok(CompileCommand {
        directory,
        file,
        language,
        compiler,
        arguments,
    })
}

const DROP_SINGLE: &[&str] = &["-c", "-fsyntax-only", "-save-temps"];
const DROP_WITH_NEXT: &[&str] = &["-o", "-MF", "-MT", "-MQ", "-MJ"];
const DROP_PREFIXES: &[&str] = &["-M", "-W", "-g"];

/// Apply the replay-pruning rules from the data model while also
/// scanning for an explicit `-x` language override. Pruning is
/// idempotent: none of the dropped token classes can reappear in the
/// output, so re-running this over its own output is a no-op.
fn prune_and_scan_language(argv: &[String], language: &mut Language) -> Vec<String> {
    let mut out = Vec::with_capacity(argv.len());
    let mut i = 0;
    while i < argv.len() {
        let tok = argv[i].as_str();

        if let Some(value) = tok.strip_prefix("-x") {
            if !value.is_empty() {
                *language = Language::from_x_flag(value);
                i += 1;
                continue;
            } else if let Some(next) = argv.get(i + 1) {
                *language = Language::from_x_flag(next);
                i += 2;
                continue;
            }
        }

        if DROP_SINGLE.contains(&tok) {
            i += 1;
            continue;
        }
        if DROP_WITH_NEXT.contains(&tok) {
            i += 2;
            continue;
        }
        if tok.starts_with("-o=") {
            i += 1;
            continue;
        }
        if tok.len() >= 2 && DROP_PREFIXES.contains(&&tok[..2]) {
            i += 1;
            continue;
        }

        out.push(argv[i].clone());
        i += 1;
    }
    out
}

/// Apply only the pruning rules, without language scanning. Exposed
/// for the idempotence property test (prune(prune(a)) == prune(a)).
pub fn prune(argv: &[String]) -> Vec<String> {
    let mut ignored = Language::Unknown;
    prune_and_scan_language(argv, &mut ignored)
}
