//! Whole-CDB reducer passes, run once after every per-unit job has
//! completed.
//!
//! Each reducer aggregates the per-unit `extdef-map`/output artifacts
//! scattered under the output root into a single CDB-level file. The
//! CPU-bound merge step of the external-function-map reducer is
//! parallelized with a dedicated [`rayon`] thread pool sized to the
//! worker count, since `tokio` workers are the wrong tool for a
//! pure-CPU fold over thousands of small files. See
//! [`merge_external_function_map`] for the AST-rewrite behavior
//! gated behind cross-translation-unit AST loading.

use crate::core::cdb::CompileCommand;
use crate::error::{PandaError, PandaResult};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Merge every per-unit `.extdef` file under `output_root` into one
/// external-function map at `dest`.
///
/// Each input line is either the legacy format (`<usr> <path>`,
/// separated by the first run of whitespace) or the length-prefixed
/// format (`<len> <usr bytes> <path>`, where `len` is the USR's byte
/// length so the separator itself may be any single byte, not
/// necessarily ASCII space). When `ast_ctu` is set (AST-based
/// cross-translation-unit loading was requested), each value is
/// rewritten to `output_root + path + ".ast"` — the per-unit AST
/// output path, matching [`crate::core::parallel::task::UnitJob`]'s
/// output-path convention — since AST-loading CTU consumes the AST
/// artifact rather than the original source. Malformed lines are
/// skipped and logged, not fatal.
pub fn merge_external_function_map(
    output_root: &Path,
    dest: &Path,
    worker_count: usize,
    ast_ctu: bool,
) -> PandaResult<()> {
    let inputs = collect_files_with_extension(output_root, "extdef")?;

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(worker_count.max(1))
        .build()
        .map_err(|e| PandaError::config(format!("failed to build reducer thread pool: {e}")))?;

    let merged: BTreeSet<String> = pool.install(|| {
        use rayon::prelude::*;
        inputs
            .par_iter()
            .flat_map(|path| parse_extdef_file(path, output_root, ast_ctu).unwrap_or_default())
            .collect()
    });

    write_lines(dest, merged.iter())
}

fn parse_extdef_file(path: &Path, output_root: &Path, ast_ctu: bool) -> Option<Vec<String>> {
    let text = std::fs::read_to_string(path).ok()?;
    let mut out = Vec::new();
    for line in text.lines() {
        if line.is_empty() {
            continue;
        }
        if let Some((usr, value)) = parse_extdef_line(line) {
            let value = if ast_ctu { rewrite_ast_path(&value, output_root) } else { value };
            out.push(format!("{usr} {value}"));
        } else {
            log::warn!("skipping malformed extdef line in {}: {line}", path.display());
        }
    }
    Some(out)
}

/// Parse one extdef line in either the length-prefixed or legacy
/// format, returning `(usr, ast_path)`.
fn parse_extdef_line(line: &str) -> Option<(String, String)> {
    let mut chars = line.char_indices();
    let mut digits_end = 0;
    for (i, c) in chars.by_ref() {
        if c.is_ascii_digit() {
            digits_end = i + c.len_utf8();
        } else {
            break;
        }
    }

    if digits_end > 0 {
        if let Ok(len) = line[..digits_end].parse::<usize>() {
            let remainder = &line[digits_end..];
            if let Some(sep_len) = remainder.chars().next().map(char::len_utf8) {
                let after_sep = &remainder[sep_len..];
                if after_sep.len() >= len {
                    let usr = &after_sep[..len];
                    let tail = after_sep[len..].trim_start();
                    if !tail.is_empty() {
                        return Some((usr.to_string(), tail.to_string()));
                    }
                }
            }
        }
    }

    // Legacy format: `<usr> <path>`, split on the first run of whitespace.
    let mut parts = line.splitn(2, char::is_whitespace);
    let usr = parts.next()?;
    let path = parts.next()?.trim_start();
    if usr.is_empty() || path.is_empty() {
        return None;
    }
    Some((usr.to_string(), path.to_string()))
}

fn rewrite_ast_path(path: &str, output_root: &Path) -> String {
    format!("{}{path}.ast", output_root.to_string_lossy())
}

/// Aggregate the project's full header+source closure from each unit's
/// `.d` dependency output (written by the `dep` action).
///
/// Each dependency file is tokenized on whitespace; the rule-target
/// token (the one ending in `:`) and line-continuation backslashes are
/// discarded, and the remaining tokens are resolved against the unit's
/// working directory. Only tokens naming an existing regular file
/// survive. A unit with no `.d` file is warned about and skipped, not
/// fatal — it usually means the `dep` action was not enabled for this
/// run.
pub fn write_source_file_list(
    commands: &[CompileCommand],
    output_root: &Path,
    dest: &Path,
    sfl_prefix: Option<&str>,
) -> PandaResult<()> {
    let mut files: BTreeSet<String> = BTreeSet::new();

    for c in commands {
        let dep_path = unit_artifact_path(output_root, &c.file, ".d");
        let text = match std::fs::read_to_string(&dep_path) {
            Ok(t) => t,
            Err(_) => {
                log::warn!(
                    "no dependency output for {} at {} (re-run with the `dep` action enabled)",
                    c.file.display(),
                    dep_path.display()
                );
                continue;
            }
        };
        for token in text.split_whitespace() {
            if token == "\\" || token.ends_with(':') {
                continue;
            }
            let resolved = resolve_against(&c.directory, token);
            if std::fs::metadata(&resolved).map(|m| m.is_file()).unwrap_or(false) {
                files.insert(resolved.to_string_lossy().into_owned());
            }
        }
    }

    let mut files: Vec<String> = files
        .into_iter()
        .filter(|f| sfl_prefix.map(|p| f.starts_with(p)).unwrap_or(true))
        .collect();
    files.sort();
    write_lines(dest, files.iter())
}

fn resolve_against(directory: &Path, token: &str) -> PathBuf {
    let p = Path::new(token);
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        directory.join(p)
    }
}

/// `<outputRoot><absoluteSourcePath><ext>`, matching
/// [`crate::core::parallel::task::UnitJob`]'s output-path convention.
fn unit_artifact_path(output_root: &Path, file: &Path, ext: &str) -> PathBuf {
    let mut p = output_root.to_path_buf();
    let abs = file.to_string_lossy();
    let abs = abs.strip_prefix('/').unwrap_or(&abs);
    p.push(&*abs);
    let mut os = p.into_os_string();
    os.push(ext);
    PathBuf::from(os)
}

/// Emit the line-delimited-JSON invocation list, resolving
/// `-resource-dir` once via a single `clang -print-resource-dir` call
/// shared by every record rather than re-invoking it per unit.
///
/// Each line is a single-key JSON object mapping the unit's absolute
/// file path to its replay argv
/// (`[compiler, ...arguments, "-c", "-working-directory=<dir>",
/// "-resource-dir=<R>"]`), not a multi-field record — consumers expect
/// a `file → argv` map per line, per the invocation-list file format.
pub async fn write_invocation_list(
    commands: &[CompileCommand],
    dest: &Path,
    resource_dir_tool: &str,
) -> PandaResult<()> {
    let resource_dir = resolve_resource_dir(resource_dir_tool).await;

    let mut out = String::new();
    for c in commands {
        let mut argv: Vec<&str> = vec![c.compiler.as_str()];
        argv.extend(c.arguments.iter().map(String::as_str));
        argv.push("-c");

        let working_directory = format!("-working-directory={}", c.directory.display());
        argv.push(&working_directory);

        let resource_dir_arg = resource_dir.as_ref().map(|dir| format!("-resource-dir={dir}"));
        if let Some(arg) = &resource_dir_arg {
            argv.push(arg);
        }

        let file = c.file.to_string_lossy();
        let mut record: std::collections::BTreeMap<&str, Vec<&str>> = std::collections::BTreeMap::new();
        record.insert(file.as_ref(), argv);

        out.push_str(&serde_json::to_string(&record).map_err(|e| {
            PandaError::config(format!("failed to serialize invocation record: {e}"))
        })?);
        out.push('\n');
    }

    std::fs::write(dest, out).map_err(PandaError::from)
}

async fn resolve_resource_dir(tool: &str) -> Option<String> {
    let output = tokio::process::Command::new(tool)
        .arg("-print-resource-dir")
        .output()
        .await
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Emit the plain input-file-list: one absolute source path per line,
/// in CDB order (no dedup, no filtering).
pub fn write_input_file_list(commands: &[CompileCommand], dest: &Path) -> PandaResult<()> {
    write_lines(dest, commands.iter().map(|c| c.file.to_string_lossy()))
}

fn collect_files_with_extension(root: &Path, ext: &str) -> PandaResult<Vec<PathBuf>> {
    let mut out = Vec::new();
    if !root.exists() {
        return Ok(out);
    }
    walk(root, ext, &mut out)?;
    Ok(out)
}

fn walk(dir: &Path, ext: &str, out: &mut Vec<PathBuf>) -> PandaResult<()> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            walk(&path, ext, out)?;
        } else if path.extension().and_then(|e| e.to_str()) == Some(ext) {
            out.push(path);
        }
    }
    Ok(())
}

fn write_lines<'a>(dest: &Path, lines: impl Iterator<Item = impl AsRef<str> + 'a>) -> PandaResult<()> {
    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut out = String::new();
    for line in lines {
        out.push_str(line.as_ref());
        out.push('\n');
    }
    std::fs::write(dest, out).map_err(PandaError::from)
}
