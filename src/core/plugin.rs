//! Loading and validating user-supplied action-plugin descriptors.
//!
//! A plugin file is a JSON document `{ "comment"?, "type": "Integrated"
//! | "Singleton", "action": {...} }`. Structural errors here are
//! fatal: per the design, partial runs are not permitted, so any
//! malformed plugin aborts the whole program before any work is
//! enqueued.

use crate::core::actions::{ActionDescriptor, CaptureStream, IntegratedAction, OutputExt, SingletonAction, ToolOverride};
use crate::error::{PandaError, PandaResult};
use serde_json::Value;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Load and validate a set of plugin descriptor files.
///
/// Input paths are deduplicated before loading. Any structural error
/// (unreadable file, invalid JSON, missing/malformed fields) returns
/// `Err` immediately — there is no partial-success mode.
pub fn load_plugins(paths: &[PathBuf]) -> PandaResult<Vec<ActionDescriptor>> {
    let unique: BTreeSet<&PathBuf> = paths.iter().collect();
    let mut out = Vec::with_capacity(unique.len());
    for path in unique {
        out.push(load_one(path)?);
    }
    Ok(out)
}

fn load_one(path: &Path) -> PandaResult<ActionDescriptor> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| PandaError::invalid_plugin(path.display().to_string(), e.to_string()))?;
    let doc: Value = serde_json::from_str(&text)
        .map_err(|e| PandaError::invalid_plugin(path.display().to_string(), e.to_string()))?;

    let err = |msg: &str| PandaError::invalid_plugin(path.display().to_string(), msg.to_string());

    let ty = doc
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| err("missing top-level `type`"))?;
    let action = doc.get("action").ok_or_else(|| err("missing top-level `action`"))?;

    match ty {
        "Integrated" => parse_integrated(action, &err).map(ActionDescriptor::Integrated),
        "Singleton" => parse_singleton(action, &err).map(ActionDescriptor::Singleton),
        other => Err(err(&format!("unknown plugin type `{other}`"))),
    }
}

fn get_str(v: &Value, key: &str) -> Option<String> {
    v.get(key).and_then(Value::as_str).map(str::to_string)
}

fn get_str_vec(v: &Value, key: &str) -> Option<Vec<String>> {
    v.get(key)?.as_array().map(|arr| {
        arr.iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect()
    })
}

fn parse_tool_override(v: &Value, err: &impl Fn(&str) -> PandaError) -> PandaResult<Option<ToolOverride>> {
    match v.get("tool") {
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(ToolOverride {
            c: s.clone(),
            cxx: s.clone(),
        })),
        Some(obj @ Value::Object(_)) => {
            let c = get_str(obj, "c").ok_or_else(|| err("`tool` object missing `c`"))?;
            let cxx = get_str(obj, "c++").ok_or_else(|| err("`tool` object missing `c++`"))?;
            Ok(Some(ToolOverride { c, cxx }))
        }
        Some(_) => Err(err("`tool` must be a string or an object")),
    }
}

fn parse_output_ext(v: &Value, err: &impl Fn(&str) -> PandaError) -> PandaResult<Option<OutputExt>> {
    match v.get("extension") {
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(OutputExt::Same(s.clone()))),
        Some(Value::Array(arr)) if arr.len() == 2 => {
            let c = arr[0].as_str().ok_or_else(|| err("`extension` array must contain strings"))?;
            let cxx = arr[1].as_str().ok_or_else(|| err("`extension` array must contain strings"))?;
            Ok(Some(OutputExt::ByLanguage(c.to_string(), cxx.to_string())))
        }
        Some(_) => Err(err("`extension` must be a string or a 2-element array")),
    }
}

fn parse_integrated(v: &Value, err: &impl Fn(&str) -> PandaError) -> PandaResult<IntegratedAction> {
    let prompt = get_str(v, "prompt").ok_or_else(|| err("Integrated action missing `prompt`"))?;
    let extra_args = get_str_vec(v, "args").ok_or_else(|| err("Integrated action missing `args`"))?;
    let output_ext = parse_output_ext(v, err)?;
    let output_opt = Some(get_str(v, "outopt").unwrap_or_else(|| "-o".to_string()));
    let tool = parse_tool_override(v, err)?;

    Ok(IntegratedAction {
        key: prompt.clone(),
        prompt,
        extra_args,
        output_opt: if output_ext.is_some() { output_opt } else { None },
        output_ext,
        tool,
    })
}

fn parse_singleton(v: &Value, err: &impl Fn(&str) -> PandaError) -> PandaResult<SingletonAction> {
    let prompt = get_str(v, "prompt").ok_or_else(|| err("Singleton action missing `prompt`"))?;
    let tool = get_str(v, "tool").ok_or_else(|| err("Singleton action missing `tool`"))?;
    let extra_args = get_str_vec(v, "args").ok_or_else(|| err("Singleton action missing `args`"))?;

    let output_ext = match v.get("extension") {
        None => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(_) => return Err(err("Singleton `extension` must be a string")),
    };

    let capture_stream = if output_ext.is_some() {
        let source = get_str(v, "source").ok_or_else(|| err("Singleton action with `extension` requires `source`"))?;
        Some(match source.as_str() {
            "stdout" => CaptureStream::Stdout,
            "stderr" => CaptureStream::Stderr,
            other => return Err(err(&format!("`source` must be stdout or stderr, got `{other}`"))),
        })
    } else {
        None
    };

    Ok(SingletonAction {
        key: prompt.clone(),
        prompt,
        tool,
        extra_args,
        output_ext,
        capture_stream,
    })
}

/// Substitute the literal substring `/path/to/output` in a plugin
/// argv token with the configured output root. Performed at
/// *execution* time (not load time), per the design note that action
/// descriptors must not capture the output root by value at catalog
/// build time.
pub fn substitute_output_root(token: &str, output_root: &str) -> String {
    token.replace("/path/to/output", output_root)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_plugin(json: &str) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(json.as_bytes()).unwrap();
        f
    }

    #[test]
    fn loads_valid_integrated_plugin() {
        let f = write_plugin(
            r#"{"type":"Integrated","action":{"prompt":"p","args":["-foo"],"extension":["q","qq"],"tool":"clang"}}"#,
        );
        let plugins = load_plugins(&[f.path().to_path_buf()]).unwrap();
        assert_eq!(plugins.len(), 1);
        match &plugins[0] {
            ActionDescriptor::Integrated(a) => {
                assert_eq!(a.prompt, "p");
                assert_eq!(a.output_opt.as_deref(), Some("-o"));
                let ext = a.output_ext.as_ref().unwrap();
                assert_eq!(ext.resolve(crate::core::cdb::Language::C), "q");
                assert_eq!(ext.resolve(crate::core::cdb::Language::Cxx), "qq");
            }
            _ => panic!("expected integrated"),
        }
    }

    #[test]
    fn loads_valid_singleton_plugin() {
        let f = write_plugin(
            r#"{"type":"Singleton","action":{"prompt":"q","tool":"clang-query","args":["-c","match gotoStmt()"],"extension":".q","source":"stdout"}}"#,
        );
        let plugins = load_plugins(&[f.path().to_path_buf()]).unwrap();
        match &plugins[0] {
            ActionDescriptor::Singleton(a) => {
                assert_eq!(a.tool, "clang-query");
                assert_eq!(a.output_ext.as_deref(), Some(".q"));
                assert_eq!(a.capture_stream, Some(CaptureStream::Stdout));
            }
            _ => panic!("expected singleton"),
        }
    }

    #[test]
    fn singleton_without_extension_has_no_capture() {
        let f = write_plugin(
            r#"{"type":"Singleton","action":{"prompt":"q","tool":"t","args":[]}}"#,
        );
        let plugins = load_plugins(&[f.path().to_path_buf()]).unwrap();
        match &plugins[0] {
            ActionDescriptor::Singleton(a) => {
                assert!(a.output_ext.is_none());
                assert!(a.capture_stream.is_none());
            }
            _ => panic!("expected singleton"),
        }
    }

    #[test]
    fn rejects_unknown_type() {
        let f = write_plugin(r#"{"type":"Bogus","action":{}}"#);
        assert!(load_plugins(&[f.path().to_path_buf()]).is_err());
    }

    #[test]
    fn rejects_missing_required_field() {
        let f = write_plugin(r#"{"type":"Integrated","action":{"args":[]}}"#);
        assert!(load_plugins(&[f.path().to_path_buf()]).is_err());
    }

    #[test]
    fn output_root_substitution_is_textual() {
        let out = substitute_output_root("--db=/path/to/output/map.db", "/out");
        assert_eq!(out, "--db=/out/map.db");
    }

    #[test]
    fn deduplicates_input_paths() {
        let f = write_plugin(r#"{"type":"Singleton","action":{"prompt":"q","tool":"t","args":[]}}"#);
        let path = f.path().to_path_buf();
        let plugins = load_plugins(&[path.clone(), path]).unwrap();
        assert_eq!(plugins.len(), 1);
    }
}
