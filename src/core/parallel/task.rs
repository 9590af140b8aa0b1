//! Unit of work executed by a pool worker.
//!
//! A [`Job`] is either a per-translation-unit replay (an
//! [`ActionDescriptor`] run against one [`CompileCommand`]) or a
//! whole-CDB reducer closure. Both are erased behind the same trait so
//! the worklist and pool need not distinguish them.

use crate::core::actions::{ActionDescriptor, CaptureStream};
use crate::core::cdb::CompileCommand;
use crate::core::parallel::process::{self, ProcessOutcome};
use crate::core::plugin::substitute_output_root;
use async_trait::async_trait;
use std::path::PathBuf;

/// Outcome of running one [`Job`].
#[derive(Debug, Clone)]
pub struct JobOutcome {
    /// Whether the job succeeded.
    pub success: bool,
    /// Human-readable summary, logged by the caller.
    pub message: String,
}

/// A unit of work a pool worker can execute.
#[async_trait]
pub trait Job: Send + Sync {
    /// Run the job to completion.
    async fn run(&self) -> JobOutcome;

    /// Short label used in progress logging.
    fn label(&self) -> String;
}

/// Replay a single translation unit through one action.
pub struct UnitJob {
    /// The normalized compile command being replayed.
    pub command: CompileCommand,
    /// Which action to run against it.
    pub action: ActionDescriptor,
    /// Root directory output files are written under.
    pub output_root: PathBuf,
    /// Default compiler binary, used when the action has no override.
    pub default_tool: String,
}

impl UnitJob {
    /// `<outputRoot><absoluteSourcePath><ext>` — the extension is
    /// appended to the full source filename, not substituted for its
    /// existing one, so `a.c` with ext `.ast` becomes `a.c.ast`.
    fn output_path(&self, ext: &str) -> PathBuf {
        let mut p = self.output_root.clone();
        let abs = self.command.file.to_string_lossy();
        let abs = abs.strip_prefix('/').unwrap_or(&abs);
        p.push(&*abs);
        let mut os = p.into_os_string();
        if !ext.starts_with('.') {
            os.push(".");
        }
        os.push(ext);
        PathBuf::from(os)
    }
}

#[async_trait]
impl Job for UnitJob {
    fn label(&self) -> String {
        format!("{}: {}", self.action.prompt(), self.command.file.display())
    }

    async fn run(&self) -> JobOutcome {
        match &self.action {
            ActionDescriptor::Integrated(action) => {
                let tool = action
                    .tool
                    .as_ref()
                    .map(|t| t.resolve(self.command.language))
                    .unwrap_or(&self.default_tool);

                let mut extra_args = action.extra_args.clone();
                apply_output_root_substitution(&mut extra_args, &self.output_root.to_string_lossy());

                let mut argv = self.command.arguments.clone();
                argv.extend(extra_args);

                if let (Some(opt), Some(ext)) = (&action.output_opt, &action.output_ext) {
                    let out = self.output_path(ext.resolve(self.command.language));
                    if let Some(parent) = out.parent() {
                        let _ = tokio::fs::create_dir_all(parent).await;
                    }
                    argv.push(opt.clone());
                    argv.push(out.to_string_lossy().into_owned());
                }

                let outcome = process::run(&self.command.directory, tool, &argv).await;
                to_job_outcome(&self.label(), outcome)
            }
            ActionDescriptor::Singleton(action) => {
                let mut extra_args = action.extra_args.clone();
                apply_output_root_substitution(&mut extra_args, &self.output_root.to_string_lossy());

                let mut argv = vec![self.command.file.to_string_lossy().into_owned()];
                argv.extend(extra_args);
                argv.push("--".to_string());
                argv.push("-w".to_string());
                argv.extend(self.command.arguments.iter().cloned());

                let outcome = process::run(&self.command.directory, &action.tool, &argv).await;

                if let (Some(ext), Some(stream)) = (&action.output_ext, &action.capture_stream) {
                    let out = self.output_path(ext);
                    if let Some(parent) = out.parent() {
                        let _ = tokio::fs::create_dir_all(parent).await;
                    }
                    let body = match stream {
                        CaptureStream::Stdout => &outcome.stdout,
                        CaptureStream::Stderr => &outcome.stderr,
                    };
                    if let Err(e) = tokio::fs::write(&out, body).await {
                        return JobOutcome {
                            success: false,
                            message: format!(
                                "{}: failed to write {}: {e}",
                                self.label(),
                                out.display()
                            ),
                        };
                    }
                }

                to_job_outcome(&self.label(), outcome)
            }
        }
    }
}

fn to_job_outcome(label: &str, outcome: ProcessOutcome) -> JobOutcome {
    if outcome.success {
        JobOutcome {
            success: true,
            message: format!("{label}: ok"),
        }
    } else {
        JobOutcome {
            success: false,
            message: format!(
                "{label}: failed ({}): {}",
                outcome
                    .exit_code
                    .map(|c| c.to_string())
                    .unwrap_or_else(|| "no exit code".to_string()),
                outcome.stderr.lines().next().unwrap_or("")
            ),
        }
    }
}

/// A whole-CDB reducer, run once after every unit job has completed.
/// Wraps an async closure so each reducer in `core::reducers` can stay
/// a free function.
pub struct ReducerJob<F> {
    /// Label shown in progress logging.
    pub name: String,
    /// The reducer body.
    pub run: F,
}

#[async_trait]
impl<F> Job for ReducerJob<F>
where
    F: Fn() -> futures_outcome::BoxFuture + Send + Sync + 'static,
{
    fn label(&self) -> String {
        self.name.clone()
    }

    async fn run(&self) -> JobOutcome {
        (self.run)().await
    }
}

/// Tiny local alias so `ReducerJob` doesn't need a `futures` dependency
/// just for `BoxFuture`.
pub mod futures_outcome {
    use super::JobOutcome;
    use std::future::Future;
    use std::pin::Pin;

    /// A boxed, `Send` future resolving to a [`JobOutcome`].
    pub type BoxFuture = Pin<Box<dyn Future<Output = JobOutcome> + Send>>;
}

/// Substitute `/path/to/output` in an already-pruned argv, for plugin
/// actions loaded via [`crate::core::plugin`]. Exposed here so
/// `UnitJob` can apply it uniformly regardless of action source.
pub fn apply_output_root_substitution(argv: &mut [String], output_root: &str) {
    for tok in argv.iter_mut() {
        *tok = substitute_output_root(tok, output_root);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::actions::{IntegratedAction, OutputExt};
    use crate::core::cdb::Language;
    use tempfile::TempDir;

    fn compile_command(dir: &std::path::Path, file: &str) -> CompileCommand {
        CompileCommand {
            directory: dir.to_path_buf(),
            file: dir.join(file),
            language: Language::C,
            compiler: "cc".to_string(),
            arguments: vec![dir.join(file).to_string_lossy().into_owned()],
        }
    }

    #[tokio::test]
    async fn integrated_job_without_output_runs_and_reports_success() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("a.c");
        tokio::fs::write(&file, "int main(){return 0;}").await.unwrap();

        let job = UnitJob {
            command: compile_command(tmp.path(), "a.c"),
            action: ActionDescriptor::Integrated(IntegratedAction {
                key: "syntax".into(),
                prompt: "check syntax".into(),
                extra_args: vec![],
                output_opt: None,
                output_ext: None,
                tool: None,
            }),
            output_root: tmp.path().join("out"),
            default_tool: "true".to_string(),
        };

        let outcome = job.run().await;
        assert!(outcome.success, "{}", outcome.message);
    }

    #[tokio::test]
    async fn integrated_job_with_output_creates_parent_dir() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("a.c");
        tokio::fs::write(&file, "").await.unwrap();

        let job = UnitJob {
            command: compile_command(tmp.path(), "a.c"),
            action: ActionDescriptor::Integrated(IntegratedAction {
                key: "compile".into(),
                prompt: "generate object".into(),
                extra_args: vec![],
                output_opt: Some("-o".into()),
                output_ext: Some(OutputExt::Same(".o".into())),
                tool: None,
            }),
            output_root: tmp.path().join("out"),
            default_tool: "true".to_string(),
        };

        let outcome = job.run().await;
        assert!(outcome.success, "{}", outcome.message);
    }

    #[test]
    fn output_path_appends_extension_without_dropping_the_original() {
        let job = UnitJob {
            command: compile_command(std::path::Path::new("/src/a"), "b.c"),
            action: ActionDescriptor::Integrated(IntegratedAction {
                key: "ast".into(),
                prompt: "emit AST".into(),
                extra_args: vec![],
                output_opt: Some("-o".into()),
                output_ext: Some(OutputExt::Same(".ast".into())),
                tool: None,
            }),
            output_root: PathBuf::from("/out"),
            default_tool: "true".to_string(),
        };
        assert_eq!(job.output_path(".ast"), PathBuf::from("/out/src/a/b.c.ast"));
    }

    #[test]
    fn output_root_substitution_applies_to_every_token() {
        let mut argv = vec!["--db=/path/to/output/x".to_string(), "-q".to_string()];
        apply_output_root_substitution(&mut argv, "/final");
        assert_eq!(argv[0], "--db=/final/x");
        assert_eq!(argv[1], "-q");
    }
}
