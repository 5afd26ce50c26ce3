//! Pre-publish command execution.
//!
//! Runs the optional `publish.cmd` from the build config through the shell,
//! with extra environment loaded from `publish.env`. Output is captured so the
//! caller can echo it between its own status lines.

use std::{
    fs,
    io::{self, Read},
    path::{Path, PathBuf},
    process::Command,
};

use tracing::{debug, info};

use crate::{
    artifact::resolve,
    model::{CommandResult, PrePublishSpec},
};

#[derive(Debug, thiserror::Error)]
pub enum PrePublishError {
    #[error("failed to read env file {}: {source}", .path.display())]
    EnvLoad { path: PathBuf, source: io::Error },

    #[error("invalid line {line} in env file {}: expected KEY=VALUE", .path.display())]
    EnvParse { path: PathBuf, line: usize },

    #[error("failed to launch `{cmd}`: {source}")]
    Launch { cmd: String, source: io::Error },
}

/// Runs a pre-publish step.
///
/// Loading the environment and launching the command are separate so the
/// caller can report a bad env file before announcing the command.
pub trait CommandRunner {
    /// Load the extra environment named by `spec.env`.
    fn load_env(&self, spec: &PrePublishSpec) -> Result<Vec<(String, String)>, PrePublishError>;

    /// Launch `cmd` with `envs` added to the current environment.
    ///
    /// Returns `Err` only when the command could not be started at all.
    fn execute(&self, cmd: &str, envs: &[(String, String)])
    -> Result<CommandResult, PrePublishError>;

    /// Load the environment and run the command. An empty command is a no-op.
    fn run(&self, spec: &PrePublishSpec) -> Result<CommandResult, PrePublishError> {
        if spec.is_skip() {
            return Ok(CommandResult::default());
        }
        let envs = self.load_env(spec)?;
        self.execute(&spec.cmd, &envs)
    }
}

/// Runs commands through the system shell inside the project directory.
pub struct ShellRunner {
    root: PathBuf,
}

impl ShellRunner {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl CommandRunner for ShellRunner {
    fn load_env(&self, spec: &PrePublishSpec) -> Result<Vec<(String, String)>, PrePublishError> {
        if spec.env.as_os_str().is_empty() {
            return Ok(Vec::new());
        }
        load_env_file(&resolve(&self.root, &spec.env))
    }

    fn execute(
        &self,
        cmd: &str,
        envs: &[(String, String)],
    ) -> Result<CommandResult, PrePublishError> {
        let launch = |source| PrePublishError::Launch {
            cmd: cmd.to_string(),
            source,
        };
        debug!(cmd, vars = envs.len(), "spawning pre-publish command");

        // Both streams share one pipe so the output keeps the order it was written in.
        let (mut reader, writer) = io::pipe().map_err(launch)?;
        let mut command = shell(cmd);
        command
            .current_dir(&self.root)
            .envs(envs.iter().map(|(k, v)| (k, v)))
            .stdout(writer.try_clone().map_err(launch)?)
            .stderr(writer);
        let mut child = command.spawn().map_err(launch)?;

        // The parent's write ends live in `command`; drop them or the read never ends.
        drop(command);

        let mut output = Vec::new();
        let read = reader.read_to_end(&mut output);
        let status = child.wait().map_err(launch)?;
        read.map_err(launch)?;

        // Killed by a signal: no code to report.
        let exit_code = status.code().unwrap_or(-1);
        info!(exit_code, "pre-publish command finished");

        Ok(CommandResult {
            output: String::from_utf8_lossy(&output).into_owned(),
            exit_code,
        })
    }
}

#[cfg(not(windows))]
fn shell(cmd: &str) -> Command {
    let mut command = Command::new("sh");
    command.arg("-c").arg(cmd);
    command
}

#[cfg(windows)]
fn shell(cmd: &str) -> Command {
    let mut command = Command::new("cmd");
    command.arg("/C").arg(cmd);
    command
}

/// Read `KEY=VALUE` pairs from an env file.
///
/// Blank lines and `#` comments are skipped, an `export ` prefix is allowed,
/// and matching surrounding quotes are stripped from values.
pub fn load_env_file(path: &Path) -> Result<Vec<(String, String)>, PrePublishError> {
    let contents = fs::read_to_string(path).map_err(|source| PrePublishError::EnvLoad {
        path: path.to_path_buf(),
        source,
    })?;
    parse_env(&contents).map_err(|line| PrePublishError::EnvParse {
        path: path.to_path_buf(),
        line,
    })
}

/// Parse env file contents. On failure, returns the 1-based line number.
fn parse_env(contents: &str) -> Result<Vec<(String, String)>, usize> {
    let mut vars = Vec::new();
    for (index, line) in contents.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let line = line.strip_prefix("export ").unwrap_or(line);
        let Some((key, value)) = line.split_once('=') else {
            return Err(index + 1);
        };
        let key = key.trim();
        if key.is_empty() {
            return Err(index + 1);
        }
        vars.push((key.to_string(), unquote(value.trim()).to_string()));
    }
    Ok(vars)
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if let Some(inner) = value
            .strip_prefix(quote)
            .and_then(|v| v.strip_suffix(quote))
        {
            return inner;
        }
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;

    use tempfile::TempDir;

    fn spec(cmd: &str, env: &str) -> PrePublishSpec {
        PrePublishSpec {
            cmd: cmd.into(),
            env: PathBuf::from(env),
        }
    }

    #[test]
    fn parse_env_pairs() {
        let vars = parse_env("A=1\n\n# comment\nexport B = two\nC=\"quoted value\"\nD=x=y\n").unwrap();
        assert_eq!(
            vars,
            vec![
                ("A".into(), "1".into()),
                ("B".into(), "two".into()),
                ("C".into(), "quoted value".into()),
                ("D".into(), "x=y".into()),
            ]
        );
    }

    #[test]
    fn parse_env_rejects_line_without_equals() {
        assert_eq!(parse_env("A=1\nGARBAGE\n").unwrap_err(), 2);
    }

    #[test]
    fn parse_env_rejects_empty_key() {
        assert_eq!(parse_env("=value").unwrap_err(), 1);
    }

    #[test]
    fn missing_env_file_is_env_load_error() {
        let dir = TempDir::new().unwrap();
        let err = load_env_file(&dir.path().join("nope.env")).unwrap_err();
        assert!(matches!(err, PrePublishError::EnvLoad { .. }));
    }

    #[test]
    fn empty_cmd_is_a_no_op() {
        let runner = ShellRunner::new("/definitely/not/a/dir");
        let result = runner.run(&spec("", "missing.env")).unwrap();

        assert!(result.success());
        assert!(result.output.is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn nonzero_exit_is_reported_not_raised() {
        let dir = TempDir::new().unwrap();
        let runner = ShellRunner::new(dir.path());

        let result = runner.run(&spec("exit 2", "")).unwrap();
        assert_eq!(result.exit_code, 2);
        assert!(!result.success());
    }

    #[cfg(unix)]
    #[test]
    fn env_file_is_injected_and_output_combined() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("publish.env"), "GREETING=hello\n").unwrap();
        let runner = ShellRunner::new(dir.path());

        let result = runner
            .run(&spec("echo $GREETING; echo oops >&2", "publish.env"))
            .unwrap();

        assert!(result.success());
        assert_eq!(result.output, "hello\noops\n");
    }

    #[cfg(unix)]
    #[test]
    fn interleaved_streams_keep_write_order() {
        let dir = TempDir::new().unwrap();
        let runner = ShellRunner::new(dir.path());

        let result = runner
            .run(&spec("echo one; echo two >&2; echo three; echo four >&2", ""))
            .unwrap();

        assert_eq!(result.output, "one\ntwo\nthree\nfour\n");
    }

    #[cfg(unix)]
    #[test]
    fn large_output_does_not_block() {
        let dir = TempDir::new().unwrap();
        let runner = ShellRunner::new(dir.path());

        let result = runner
            .run(&spec("i=0; while [ $i -lt 20000 ]; do echo line; i=$((i+1)); done", ""))
            .unwrap();

        assert!(result.success());
        assert_eq!(result.output.lines().count(), 20000);
    }

    #[test]
    fn empty_env_path_loads_nothing() {
        let runner = ShellRunner::new("/definitely/not/a/dir");
        assert!(runner.load_env(&spec("build", "")).unwrap().is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn unreadable_env_file_fails_before_spawning() {
        let dir = TempDir::new().unwrap();
        let runner = ShellRunner::new(dir.path());

        let err = runner.run(&spec("touch ran", "none")).unwrap_err();
        assert!(matches!(err, PrePublishError::EnvLoad { .. }));
        assert!(!dir.path().join("ran").exists());
    }

    #[test]
    fn missing_working_directory_is_launch_error() {
        let dir = TempDir::new().unwrap();
        let runner = ShellRunner::new(dir.path().join("gone"));

        let err = runner.run(&spec("true", "")).unwrap_err();
        assert!(matches!(err, PrePublishError::Launch { .. }));
    }
}
