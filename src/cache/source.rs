//! Dataset-construction collaborators
//!
//! A [`DatasetSource`] turns a [`ParameterSet`] into the five artifacts of a
//! cache entry. The queries and metric formulas live outside this crate; the
//! sources here only run them and collect their output.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tempfile::TempDir;
use thiserror::Error;
use tracing::{debug, info};

use super::types::{ArtifactKind, ArtifactSet};
use crate::params::ParameterSet;
use crate::retry::Transient;
use crate::table::{read_csv_path, DataTable};

/// Exit status a data command uses to signal a temporary failure
pub const EXIT_TEMPFAIL: i32 = 75;

/// Failure of a dataset source
#[derive(Debug, Error)]
pub enum SourceError {
    /// The backing service is temporarily unavailable
    #[error("data source unavailable: {0}")]
    Unavailable(String),

    /// The computation itself failed
    #[error("data source failed: {0}")]
    Failed(String),

    /// The source finished without producing an artifact
    #[error("data source did not produce {kind} (expected at {})", path.display())]
    MissingArtifact { kind: ArtifactKind, path: PathBuf },

    /// An artifact could not be read back
    #[error("could not read {kind}: {message}")]
    Unreadable { kind: ArtifactKind, message: String },
}

impl Transient for SourceError {
    fn is_transient(&self) -> bool {
        matches!(self, SourceError::Unavailable(_))
    }
}

/// Computes the artifacts of a cache entry
#[async_trait]
pub trait DatasetSource: Send + Sync {
    async fn compute(&self, params: &ParameterSet) -> Result<ArtifactSet, SourceError>;
}

/// Read the five artifact files from `dir`
pub(crate) fn read_artifacts(dir: &Path) -> Result<ArtifactSet, SourceError> {
    ArtifactSet::try_build(|kind| {
        let path = dir.join(kind.file_name());
        if !path.is_file() {
            return Err(SourceError::MissingArtifact { kind, path });
        }
        read_csv_path(&path).map_err(|e| SourceError::Unreadable {
            kind,
            message: e.to_string(),
        })
    })
}

/// Runs an external program that writes the five CSV artifacts
///
/// The program receives the parameters as flags followed by `--output <dir>`:
///
/// ```text
/// <program> [args...] --team T --rival R --competition C --field home \
///     --season S --sample-size N --output /tmp/.tmpXXXX
/// ```
///
/// Exit status [`EXIT_TEMPFAIL`] is reported as [`SourceError::Unavailable`]
/// so the call can be retried; any other non-zero status is a hard failure.
#[derive(Debug, Clone)]
pub struct CommandSource {
    program: String,
    args: Vec<String>,
}

impl CommandSource {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Split a command line such as `python "build data.py" --fast` with shell quoting rules
    pub fn from_command_line(line: &str) -> Option<Self> {
        let mut parts = shell_words::split(line).ok()?.into_iter();
        let program = parts.next()?;
        Some(Self::new(program).with_args(parts))
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    fn parameter_args(params: &ParameterSet, output: &Path) -> Vec<String> {
        vec![
            "--team".into(),
            params.team().into(),
            "--rival".into(),
            params.rival().into(),
            "--competition".into(),
            params.competition().into(),
            "--field".into(),
            params.field().as_str().into(),
            "--season".into(),
            params.season().into(),
            "--sample-size".into(),
            params.sample_size().to_string(),
            "--output".into(),
            output.display().to_string(),
        ]
    }
}

#[async_trait]
impl DatasetSource for CommandSource {
    async fn compute(&self, params: &ParameterSet) -> Result<ArtifactSet, SourceError> {
        let workdir = TempDir::new()
            .map_err(|e| SourceError::Failed(format!("cannot create output dir: {}", e)))?;

        info!("Computing datasets with {}", self.program);
        let output = tokio::process::Command::new(&self.program)
            .args(&self.args)
            .args(Self::parameter_args(params, workdir.path()))
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| SourceError::Failed(format!("failed to execute {}: {}", self.program, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let message = format!("{} exited with {}: {}", self.program, output.status, stderr.trim());
            return Err(match output.status.code() {
                Some(EXIT_TEMPFAIL) => SourceError::Unavailable(message),
                _ => SourceError::Failed(message),
            });
        }

        debug!("Reading artifacts from {}", workdir.path().display());
        read_artifacts(workdir.path())
    }
}

/// Serves artifacts that were computed ahead of time into a directory
#[derive(Debug, Clone)]
pub struct DirectorySource {
    dir: PathBuf,
}

impl DirectorySource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl DatasetSource for DirectorySource {
    async fn compute(&self, _params: &ParameterSet) -> Result<ArtifactSet, SourceError> {
        let dir = self.dir.clone();
        tokio::task::spawn_blocking(move || read_artifacts(&dir))
            .await
            .map_err(|e| SourceError::Failed(e.to_string()))?
    }
}

/// Convenience for building a source result from in-memory tables
pub fn artifacts_from_tables<F>(mut table_for: F) -> ArtifactSet
where
    F: FnMut(ArtifactKind) -> DataTable,
{
    let built: Result<ArtifactSet, std::convert::Infallible> =
        ArtifactSet::try_build(|kind| Ok(table_for(kind)));
    match built {
        Ok(set) => set,
        Err(never) => match never {},
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::Field;
    use crate::table::{write_csv_path, Value};

    fn params() -> ParameterSet {
        ParameterSet::new("Alpha FC", "Beta United", "league", Field::Away, "2024-2025", 5).unwrap()
    }

    #[test]
    fn test_unavailable_is_the_only_transient_error() {
        assert!(SourceError::Unavailable("busy".into()).is_transient());
        assert!(!SourceError::Failed("boom".into()).is_transient());
        assert!(!SourceError::MissingArtifact {
            kind: ArtifactKind::Roster,
            path: PathBuf::from("df_players.csv"),
        }
        .is_transient());
    }

    #[test]
    fn test_parameter_args_carry_every_field() {
        let args = CommandSource::parameter_args(&params(), Path::new("/tmp/out"));
        let joined = args.join(" ");
        assert_eq!(
            joined,
            "--team Alpha FC --rival Beta United --competition league --field away \
             --season 2024-2025 --sample-size 5 --output /tmp/out"
        );
    }

    #[test]
    fn test_from_command_line() {
        let source = CommandSource::from_command_line("python build.py --fast").unwrap();
        assert_eq!(source.program(), "python");
        assert_eq!(source.args, vec!["build.py", "--fast"]);
        assert!(CommandSource::from_command_line("   ").is_none());

        let quoted = CommandSource::from_command_line(r#"python "build data.py""#).unwrap();
        assert_eq!(quoted.args, vec!["build data.py"]);
    }

    #[tokio::test]
    async fn test_directory_source_reports_missing_artifact() {
        let temp = TempDir::new().unwrap();
        let table = DataTable::from_rows(vec!["teamName"], vec![vec![Value::text("Alpha FC")]]);
        for kind in [ArtifactKind::Events, ArtifactKind::TeamAggregate] {
            write_csv_path(&table, &temp.path().join(kind.file_name())).unwrap();
        }

        let err = DirectorySource::new(temp.path())
            .compute(&params())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SourceError::MissingArtifact {
                kind: ArtifactKind::PairAggregate,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_directory_source_reads_all_artifacts() {
        let temp = TempDir::new().unwrap();
        for kind in ArtifactKind::ALL {
            let table =
                DataTable::from_rows(vec!["source"], vec![vec![Value::text(kind.file_name())]]);
            write_csv_path(&table, &temp.path().join(kind.file_name())).unwrap();
        }

        let set = DirectorySource::new(temp.path()).compute(&params()).await.unwrap();
        assert_eq!(set.roster.get(0, "source"), &Value::text("df_players.csv"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_command_source_tempfail_is_unavailable() {
        let source = CommandSource::new("sh").with_args(["-c", "exit 75", "sh"]);
        let err = source.compute(&params()).await.unwrap_err();
        assert!(err.is_transient());

        let source = CommandSource::new("sh").with_args(["-c", "exit 3", "sh"]);
        let err = source.compute(&params()).await.unwrap_err();
        assert!(matches!(err, SourceError::Failed(_)));
    }
}
