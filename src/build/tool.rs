//! Packaging tools the Builder knows how to drive.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Name of the conventional output subdirectory inside the work dir
pub const OUTPUT_DIR: &str = "dist";

/// Which external tool turns the source file into an executable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum BuildTool {
    /// `pyinstaller --onefile`
    #[default]
    Pyinstaller,
    /// `go build`
    Go,
    /// `g++`
    Cxx,
    /// `make`, expected to leave the binary in `dist/`
    Make,
    /// Pick one of the above from the source file extension
    Auto,
    /// A user-supplied program, see [`CustomCommand`]
    Command,
}

impl BuildTool {
    /// Detect the tool from a source file's extension
    pub fn detect(source: &Path) -> Option<BuildTool> {
        let ext = source.extension()?.to_str()?;
        match ext {
            "py" => Some(BuildTool::Pyinstaller),
            "go" => Some(BuildTool::Go),
            "cpp" | "cc" | "cxx" => Some(BuildTool::Cxx),
            _ => None,
        }
    }

    /// Human-readable label used in progress messages
    pub fn label(&self) -> &'static str {
        match self {
            BuildTool::Pyinstaller => "PyInstaller",
            BuildTool::Go => "go build",
            BuildTool::Cxx => "g++",
            BuildTool::Make => "make",
            BuildTool::Auto => "auto-detect",
            BuildTool::Command => "custom command",
        }
    }
}

impl std::fmt::Display for BuildTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// A custom build program.
///
/// `{source}`, `{name}` and `{out_dir}` in `args` are replaced with the
/// source file name, the binary name and the output directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CustomCommand {
    pub program: String,
    pub args: Vec<String>,
}

/// A fully resolved process invocation, run from inside the work dir
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildInvocation {
    pub tool: BuildTool,
    pub program: String,
    pub args: Vec<String>,
    /// Expected executable, relative to the work dir
    pub output: PathBuf,
}

impl BuildInvocation {
    /// Resolve the invocation for `tool`.
    ///
    /// `source` is the source file name relative to the work dir. Returns
    /// `None` when `Auto` cannot detect a tool or `Command` has no program.
    pub fn resolve(
        tool: BuildTool,
        custom: Option<&CustomCommand>,
        source: &str,
        binary_name: &str,
    ) -> Option<Self> {
        let tool = match tool {
            BuildTool::Auto => BuildTool::detect(Path::new(source))?,
            other => other,
        };
        let output = Path::new(OUTPUT_DIR).join(binary_name);
        let out_path = output.to_string_lossy().to_string();

        let (program, args): (String, Vec<String>) = match tool {
            BuildTool::Pyinstaller => (
                "pyinstaller".to_string(),
                vec![
                    "--onefile".to_string(),
                    "--name".to_string(),
                    binary_name.to_string(),
                    source.to_string(),
                ],
            ),
            BuildTool::Go => (
                "go".to_string(),
                vec!["build".to_string(), "-o".to_string(), out_path, source.to_string()],
            ),
            BuildTool::Cxx => (
                "g++".to_string(),
                vec![source.to_string(), "-o".to_string(), out_path],
            ),
            BuildTool::Make => ("make".to_string(), Vec::new()),
            BuildTool::Command => {
                let custom = custom.filter(|c| !c.program.trim().is_empty())?;
                let args = custom
                    .args
                    .iter()
                    .map(|a| {
                        a.replace("{source}", source)
                            .replace("{name}", binary_name)
                            .replace("{out_dir}", OUTPUT_DIR)
                    })
                    .collect();
                (custom.program.clone(), args)
            }
            // detect() never yields Auto
            BuildTool::Auto => return None,
        };

        Some(Self {
            tool,
            program,
            args,
            output,
        })
    }

    /// Shell-style rendering for messages and logs
    pub fn command_line(&self) -> String {
        if self.args.is_empty() {
            self.program.clone()
        } else {
            format!("{} {}", self.program, self.args.join(" "))
        }
    }
}

/// Locate an executable `program` on `PATH`.
///
/// A program containing a separator is taken as a path, resolved against
/// `base` when relative since that is where the build is spawned.
pub fn find_on_path(program: &str, base: &Path) -> Option<PathBuf> {
    if program.contains(std::path::MAIN_SEPARATOR) {
        let path = base.join(program);
        return is_executable(&path).then(|| PathBuf::from(program));
    }
    let paths = std::env::var_os("PATH")?;
    std::env::split_paths(&paths)
        .map(|dir| dir.join(program))
        .find(|candidate| is_executable(candidate))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path).is_ok_and(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}
