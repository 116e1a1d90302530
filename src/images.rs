//! Image builders invoked by the `insert_images` page operation
//!
//! A builder turns the run's context plus per-item arguments into one or more
//! image files. Builders are looked up by name in an [`ImageBuilderRegistry`];
//! failures are reported to the caller, which skips the image.

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use tracing::debug;

use crate::params::ParameterSet;

/// Free-form arguments from the page configuration
pub type ImageArgs = Map<String, Value>;

/// What a builder knows about the current run
#[derive(Debug, Clone)]
pub struct ImageContext {
    /// Scratch directory removed at the end of the run
    pub workdir: PathBuf,
    pub params: ParameterSet,
    pub badge_base: Option<PathBuf>,
    pub badge_rival: Option<PathBuf>,
}

impl ImageContext {
    /// A fresh file name inside the scratch directory
    pub fn scratch_file(&self, prefix: &str, extension: &str) -> PathBuf {
        self.workdir
            .join(format!("{}_{}.{}", prefix, uuid::Uuid::new_v4().simple(), extension))
    }
}

#[async_trait]
pub trait ImageBuilder: Send + Sync {
    async fn build(&self, ctx: &ImageContext, args: &ImageArgs) -> Result<Vec<PathBuf>>;
}

/// Returns the base team's or the rival's badge file
///
/// `team: coach_team` (or `base`) selects the base team; anything else the
/// rival.
#[derive(Debug, Default, Clone, Copy)]
pub struct TeamBadge;

#[async_trait]
impl ImageBuilder for TeamBadge {
    async fn build(&self, ctx: &ImageContext, args: &ImageArgs) -> Result<Vec<PathBuf>> {
        let base = matches!(
            args.get("team").and_then(Value::as_str),
            Some("coach_team" | "base")
        );
        let (badge, owner) = if base {
            (ctx.badge_base.as_ref(), ctx.params.team())
        } else {
            (ctx.badge_rival.as_ref(), ctx.params.rival())
        };
        match badge {
            Some(path) if tokio::fs::try_exists(path).await.unwrap_or(false) => {
                Ok(vec![path.clone()])
            }
            _ => bail!("no badge available for {}", owner),
        }
    }
}

/// Runs an external chart renderer
///
/// The program receives the run parameters, every configured argument as
/// `--key value`, and `--output <file>`. It either prints the produced paths
/// one per line or writes the output file.
#[derive(Debug, Clone)]
pub struct CommandImageBuilder {
    program: String,
    args: Vec<String>,
}

impl CommandImageBuilder {
    pub fn from_command_line(line: &str) -> Option<Self> {
        let mut parts = shell_words::split(line).ok()?.into_iter();
        let program = parts.next()?;
        Some(Self {
            program,
            args: parts.collect(),
        })
    }

    fn argument_value(value: &Value) -> String {
        match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

#[async_trait]
impl ImageBuilder for CommandImageBuilder {
    async fn build(&self, ctx: &ImageContext, args: &ImageArgs) -> Result<Vec<PathBuf>> {
        let output_path = ctx.scratch_file("chart", "png");
        let mut command = tokio::process::Command::new(&self.program);
        command
            .args(&self.args)
            .arg("--team")
            .arg(ctx.params.team())
            .arg("--rival")
            .arg(ctx.params.rival())
            .arg("--season")
            .arg(ctx.params.season())
            .arg("--output")
            .arg(&output_path)
            .stdin(Stdio::null());
        for (key, value) in args {
            command.arg(format!("--{}", key)).arg(Self::argument_value(value));
        }

        let output = command
            .output()
            .await
            .with_context(|| format!("failed to execute {}", self.program))?;
        if !output.status.success() {
            return Err(anyhow!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            ));
        }

        let printed: Vec<PathBuf> = String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(PathBuf::from)
            .collect();
        let produced = if printed.is_empty() {
            vec![output_path]
        } else {
            printed
        };

        let mut existing = Vec::with_capacity(produced.len());
        for path in produced {
            if tokio::fs::try_exists(&path).await.unwrap_or(false) {
                existing.push(path);
            } else {
                debug!("{} reported {} but it does not exist", self.program, path.display());
            }
        }
        if existing.is_empty() {
            bail!("{} produced no image", self.program);
        }
        Ok(existing)
    }
}

/// Named image builders
#[derive(Clone, Default)]
pub struct ImageBuilderRegistry {
    builders: BTreeMap<String, Arc<dyn ImageBuilder>>,
}

impl std::fmt::Debug for ImageBuilderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageBuilderRegistry")
            .field("builders", &self.names())
            .finish()
    }
}

impl ImageBuilderRegistry {
    /// Registry holding the built-in badge builder
    pub fn with_defaults() -> Self {
        let badge: Arc<dyn ImageBuilder> = Arc::new(TeamBadge);
        let mut registry = Self::default();
        registry.register("team_badge", Arc::clone(&badge));
        registry.register("team_square_image", badge);
        registry
    }

    pub fn register(&mut self, name: impl Into<String>, builder: Arc<dyn ImageBuilder>) {
        self.builders.insert(name.into(), builder);
    }

    /// Register every `name = "command line"` entry as a [`CommandImageBuilder`]
    pub fn register_commands<'a>(
        &mut self,
        commands: impl IntoIterator<Item = (&'a String, &'a String)>,
    ) {
        for (name, line) in commands {
            if let Some(builder) = CommandImageBuilder::from_command_line(line) {
                self.register(name.clone(), Arc::new(builder));
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn ImageBuilder>> {
        self.builders.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.builders.contains_key(name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.builders.keys().map(String::as_str).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::Field;
    use tempfile::TempDir;

    fn context(dir: &TempDir, with_badges: bool) -> ImageContext {
        let params =
            ParameterSet::new("Alpha FC", "Beta United", "League", Field::Home, "2024-2025", 5)
                .unwrap();
        let (badge_base, badge_rival) = if with_badges {
            let base = dir.path().join("badge_coach.png");
            let rival = dir.path().join("badge_rival.png");
            std::fs::write(&base, b"base").unwrap();
            std::fs::write(&rival, b"rival").unwrap();
            (Some(base), Some(rival))
        } else {
            (None, None)
        };
        ImageContext {
            workdir: dir.path().to_path_buf(),
            params,
            badge_base,
            badge_rival,
        }
    }

    fn args(team: &str) -> ImageArgs {
        let mut args = ImageArgs::new();
        args.insert("team".into(), Value::String(team.into()));
        args
    }

    #[tokio::test]
    async fn test_team_badge_selects_side() {
        let dir = TempDir::new().unwrap();
        let ctx = context(&dir, true);

        let base = TeamBadge.build(&ctx, &args("coach_team")).await.unwrap();
        assert_eq!(base, vec![dir.path().join("badge_coach.png")]);

        let rival = TeamBadge.build(&ctx, &args("opponent_team")).await.unwrap();
        assert_eq!(rival, vec![dir.path().join("badge_rival.png")]);
    }

    #[tokio::test]
    async fn test_team_badge_without_file_fails() {
        let dir = TempDir::new().unwrap();
        let ctx = context(&dir, false);
        let err = TeamBadge.build(&ctx, &args("base")).await.unwrap_err();
        assert!(err.to_string().contains("Alpha FC"));
    }

    #[test]
    fn test_registry_defaults_and_commands() {
        let mut registry = ImageBuilderRegistry::with_defaults();
        assert!(registry.contains("team_badge"));
        assert!(registry.contains("team_square_image"));
        assert!(!registry.contains("plot_team_overview"));

        let commands: BTreeMap<String, String> =
            [("plot_team_overview".to_string(), "python plot.py --dpi 180".to_string())]
                .into_iter()
                .collect();
        registry.register_commands(&commands);
        assert!(registry.contains("plot_team_overview"));
        assert_eq!(registry.names().len(), 3);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_command_builder_reads_printed_paths() {
        let dir = TempDir::new().unwrap();
        let ctx = context(&dir, true);
        let chart = dir.path().join("chart.png");
        std::fs::write(&chart, b"png").unwrap();

        let builder = CommandImageBuilder {
            program: "sh".into(),
            args: vec!["-c".into(), format!("echo {}", chart.display()), "sh".into()],
        };
        let produced = builder.build(&ctx, &ImageArgs::new()).await.unwrap();
        assert_eq!(produced, vec![chart]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_command_builder_failure() {
        let dir = TempDir::new().unwrap();
        let ctx = context(&dir, true);
        let builder = CommandImageBuilder {
            program: "sh".into(),
            args: vec!["-c".into(), "exit 3".into(), "sh".into()],
        };
        assert!(builder.build(&ctx, &ImageArgs::new()).await.is_err());
    }
}
