//! Builder stage - packages the fetched source into a standalone executable.
//!
//! The packaging tool runs from inside the work dir and is expected to leave
//! its executable under `dist/`.

mod tool;

pub use tool::{BuildInvocation, BuildTool, CustomCommand, OUTPUT_DIR, find_on_path};

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use log::{debug, info, warn};
use tokio::process::Command;

use crate::config::Config;
use crate::error::{InstallError, Result};

/// Number of trailing stderr lines kept in error messages
const STDERR_TAIL_LINES: usize = 10;

/// The executable produced by a successful build
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltArtifact {
    pub path: PathBuf,
    /// Command line that produced it
    pub command: String,
}

/// Runs an external packaging tool against a source file
#[derive(Debug, Clone)]
pub struct Builder {
    work_dir: PathBuf,
    binary_name: String,
    tool: BuildTool,
    custom: Option<CustomCommand>,
    timeout: Option<Duration>,
    preflight: bool,
}

impl Builder {
    /// Create a builder using PyInstaller, no timeout, with the PATH preflight enabled
    pub fn new(work_dir: impl Into<PathBuf>, binary_name: impl Into<String>) -> Self {
        Self {
            work_dir: work_dir.into(),
            binary_name: binary_name.into(),
            tool: BuildTool::default(),
            custom: None,
            timeout: None,
            preflight: true,
        }
    }

    /// Create a builder from the resolved configuration
    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.work_dir, &config.binary_name)
            .tool(config.build.tool)
            .custom_command(config.build.command.clone())
            .timeout_ms(config.build.timeout_ms)
    }

    /// Set the packaging tool
    pub fn tool(mut self, tool: BuildTool) -> Self {
        self.tool = tool;
        self
    }

    /// Set the program used by [`BuildTool::Command`]
    pub fn custom_command(mut self, custom: Option<CustomCommand>) -> Self {
        self.custom = custom;
        self
    }

    /// Set the timeout in milliseconds, `0` disables it
    pub fn timeout_ms(mut self, ms: u64) -> Self {
        self.timeout = (ms > 0).then(|| Duration::from_millis(ms));
        self
    }

    /// Check that the tool is on PATH before spawning it
    pub fn preflight(mut self, enabled: bool) -> Self {
        self.preflight = enabled;
        self
    }

    /// Resolve the invocation that would build `source`
    pub fn invocation(&self, source: &Path) -> Result<BuildInvocation> {
        let relative = source.strip_prefix(&self.work_dir).unwrap_or(source);
        let source_name = relative.to_string_lossy();
        BuildInvocation::resolve(self.tool, self.custom.as_ref(), &source_name, &self.binary_name).ok_or_else(|| {
            match self.tool {
                BuildTool::Command => InstallError::Build("build.tool is 'command' but build.command.program is empty".to_string()),
                _ => InstallError::Build(format!(
                    "No known build tool for {}; set build.tool explicitly",
                    source.display()
                )),
            }
        })
    }

    /// Locate the program that would build `source`
    pub fn check_tool(&self, source: &Path) -> Result<PathBuf> {
        let invocation = self.invocation(source)?;
        find_on_path(&invocation.program, &self.work_dir).ok_or_else(|| {
            InstallError::Build(format!(
                "{} not found on PATH; install it before running the build",
                invocation.program
            ))
        })
    }

    /// Build `source` and return the produced executable
    pub async fn build(&self, source: &Path) -> Result<BuiltArtifact> {
        let invocation = self.invocation(source)?;
        let command_line = invocation.command_line();
        info!("Building with {}: {}", invocation.tool, command_line);

        if self.preflight {
            self.check_tool(source)?;
        }

        tokio::fs::create_dir_all(self.work_dir.join(OUTPUT_DIR)).await?;

        let child = Command::new(&invocation.program)
            .args(&invocation.args)
            .current_dir(&self.work_dir)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| InstallError::Build(format!("Command failed: {}: {}", command_line, e)))?;

        let output = match self.timeout {
            Some(timeout) => tokio::time::timeout(timeout, child.wait_with_output())
                .await
                .map_err(|_| {
                    InstallError::Build(format!(
                        "Command timed out after {}ms: {}",
                        timeout.as_millis(),
                        command_line
                    ))
                })??,
            None => child.wait_with_output().await?,
        };

        debug!("Build stdout: {}", String::from_utf8_lossy(&output.stdout).trim());

        if !output.status.success() {
            let code = output
                .status
                .code()
                .map(|c| c.to_string())
                .unwrap_or_else(|| "signal".to_string());
            let mut message = format!("Command failed: {} (exit code {})", command_line, code);
            let stderr = stderr_tail(&output.stderr);
            if !stderr.is_empty() {
                message.push_str(&format!("\nstderr: {}", stderr));
            }
            warn!("{}", message);
            return Err(InstallError::Build(message));
        }

        let path = self.work_dir.join(&invocation.output);
        if !path.is_file() {
            return Err(InstallError::Build(format!(
                "{} succeeded but produced no executable at {}",
                command_line,
                path.display()
            )));
        }

        info!("Built {}", path.display());
        Ok(BuiltArtifact {
            path,
            command: command_line,
        })
    }
}

fn stderr_tail(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let lines: Vec<&str> = text.trim().lines().collect();
    let start = lines.len().saturating_sub(STDERR_TAIL_LINES);
    lines[start..].join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sh(script: &str) -> Option<CustomCommand> {
        Some(CustomCommand {
            program: "sh".to_string(),
            args: vec!["-c".to_string(), script.to_string()],
        })
    }

    fn write_source(dir: &TempDir) -> PathBuf {
        let source = dir.path().join("tool.sh");
        std::fs::write(&source, "#!/bin/sh\necho hi\n").unwrap();
        source
    }

    #[tokio::test]
    async fn test_build_with_custom_command() {
        let dir = TempDir::new().unwrap();
        let source = write_source(&dir);
        let builder = Builder::new(dir.path(), "tool")
            .tool(BuildTool::Command)
            .custom_command(sh("cp {source} {out_dir}/{name}"));

        let artifact = builder.build(&source).await.unwrap();
        assert_eq!(artifact.path, dir.path().join("dist").join("tool"));
        assert!(artifact.path.is_file());
        assert_eq!(artifact.command, "sh -c cp tool.sh dist/tool");
    }

    #[tokio::test]
    async fn test_build_nonzero_exit_reports_code_and_stderr() {
        let dir = TempDir::new().unwrap();
        let source = write_source(&dir);
        let builder = Builder::new(dir.path(), "tool")
            .tool(BuildTool::Command)
            .custom_command(sh("echo boom >&2; exit 3"));

        let err = builder.build(&source).await.unwrap_err();
        let msg = err.to_string();
        assert!(matches!(err, InstallError::Build(_)));
        assert!(msg.contains("exit code 3"), "{msg}");
        assert!(msg.contains("boom"), "{msg}");
    }

    #[tokio::test]
    async fn test_build_success_without_output_is_error() {
        let dir = TempDir::new().unwrap();
        let source = write_source(&dir);
        let builder = Builder::new(dir.path(), "tool")
            .tool(BuildTool::Command)
            .custom_command(sh("true"));

        let err = builder.build(&source).await.unwrap_err();
        assert!(err.to_string().contains("produced no executable"));
    }

    #[tokio::test]
    async fn test_build_missing_tool_preflight() {
        let dir = TempDir::new().unwrap();
        let source = write_source(&dir);
        let builder = Builder::new(dir.path(), "tool")
            .tool(BuildTool::Command)
            .custom_command(Some(CustomCommand {
                program: "no-such-packager-91c2".to_string(),
                args: Vec::new(),
            }));

        let err = builder.build(&source).await.unwrap_err();
        assert!(err.to_string().contains("not found on PATH"));
        // preflight fails before the output dir is prepared
        assert!(!dir.path().join("dist").exists());
    }

    #[tokio::test]
    async fn test_build_missing_tool_without_preflight_fails_to_spawn() {
        let dir = TempDir::new().unwrap();
        let source = write_source(&dir);
        let builder = Builder::new(dir.path(), "tool")
            .tool(BuildTool::Command)
            .custom_command(Some(CustomCommand {
                program: "no-such-packager-91c2".to_string(),
                args: Vec::new(),
            }))
            .preflight(false);

        let err = builder.build(&source).await.unwrap_err();
        assert!(err.to_string().contains("Command failed: no-such-packager-91c2"));
    }

    #[tokio::test]
    async fn test_build_timeout() {
        let dir = TempDir::new().unwrap();
        let source = write_source(&dir);
        let builder = Builder::new(dir.path(), "tool")
            .tool(BuildTool::Command)
            .custom_command(sh("sleep 5"))
            .timeout_ms(100);

        let err = builder.build(&source).await.unwrap_err();
        assert!(err.to_string().contains("timed out after 100ms"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_build_preflight_rejects_non_executable_program() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let source = write_source(&dir);
        let packager = dir.path().join("pack.sh");
        std::fs::write(&packager, "#!/bin/sh\ncp \"$1\" dist/tool\n").unwrap();
        std::fs::set_permissions(&packager, std::fs::Permissions::from_mode(0o644)).unwrap();

        let builder = Builder::new(dir.path(), "tool")
            .tool(BuildTool::Command)
            .custom_command(Some(CustomCommand {
                program: "./pack.sh".to_string(),
                args: vec!["{source}".to_string()],
            }));

        let err = builder.build(&source).await.unwrap_err();
        assert!(err.to_string().contains("not found on PATH"), "{err}");

        // relative to the work dir, not the test's cwd
        std::fs::set_permissions(&packager, std::fs::Permissions::from_mode(0o755)).unwrap();
        let artifact = builder.build(&source).await.unwrap();
        assert!(artifact.path.is_file());
    }

    #[test]
    fn test_invocation_unknown_extension_with_auto() {
        let builder = Builder::new("/tmp/work", "tool").tool(BuildTool::Auto);
        let err = builder.invocation(Path::new("/tmp/work/tool.rb")).unwrap_err();
        assert!(err.to_string().contains("No known build tool"));
    }

    #[test]
    fn test_invocation_uses_path_relative_to_work_dir() {
        let builder = Builder::new("/tmp/work", "fileshare");
        let inv = builder.invocation(Path::new("/tmp/work/fileshare.py")).unwrap();
        assert_eq!(inv.args.last().map(String::as_str), Some("fileshare.py"));
    }

    #[test]
    fn test_stderr_tail_keeps_last_lines() {
        let text: String = (0..20).map(|i| format!("line {}\n", i)).collect();
        let tail = stderr_tail(text.as_bytes());
        assert!(tail.starts_with("line 10"));
        assert!(tail.ends_with("line 19"));
    }
}
