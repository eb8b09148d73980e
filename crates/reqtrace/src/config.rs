//! Resolved configuration for a validation run.
//!
//! Paths are configuration, not rediscovered state: the CLI resolves them
//! once, here, and passes them explicitly into every component. No
//! component infers anything from the process working directory.

use std::path::PathBuf;
use std::time::Duration;

/// Where everything lives and how the test suite is built.
#[derive(Debug, Clone)]
pub struct Config {
    /// The transition spec document.
    pub spec_path: PathBuf,
    /// Directory holding the `test_*.c` sources.
    pub tests_dir: PathBuf,
    /// Directory the build command runs in.
    pub workspace_dir: PathBuf,
    /// Directory the build drops test binaries into.
    pub build_dir: PathBuf,
    /// Build command, program plus arguments.
    pub build_command: Vec<String>,
    pub build_timeout: Duration,
    pub binary_timeout: Duration,
}

impl Config {
    /// Resolve a config from CLI overrides, defaulting everything relative
    /// to the workspace directory.
    pub fn resolve(
        workspace: Option<PathBuf>,
        spec: Option<PathBuf>,
        tests: Option<PathBuf>,
        build_dir: Option<PathBuf>,
        build_cmd: Option<&str>,
    ) -> Self {
        let workspace_dir = workspace.unwrap_or_else(|| PathBuf::from("."));
        let spec_path = spec.unwrap_or_else(|| workspace_dir.join("specs/state_transitions.yaml"));
        let tests_dir = tests.unwrap_or_else(|| workspace_dir.join("tests"));
        let build_dir = build_dir.unwrap_or_else(|| workspace_dir.join("build"));
        let build_command = match build_cmd {
            Some(cmd) => cmd.split_whitespace().map(str::to_string).collect(),
            None => vec!["make".to_string(), "all".to_string()],
        };

        Config {
            spec_path,
            tests_dir,
            workspace_dir,
            build_dir,
            build_command,
            build_timeout: Duration::from_secs(120),
            binary_timeout: Duration::from_secs(60),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_hang_off_workspace() {
        let config = Config::resolve(Some(PathBuf::from("/fw/native")), None, None, None, None);
        assert_eq!(
            config.spec_path,
            PathBuf::from("/fw/native/specs/state_transitions.yaml")
        );
        assert_eq!(config.tests_dir, PathBuf::from("/fw/native/tests"));
        assert_eq!(config.build_dir, PathBuf::from("/fw/native/build"));
        assert_eq!(config.build_command, ["make", "all"]);
        assert!(config.binary_timeout < config.build_timeout);
    }

    #[test]
    fn test_overrides_win() {
        let config = Config::resolve(
            Some(PathBuf::from("/fw")),
            Some(PathBuf::from("/elsewhere/spec.yaml")),
            None,
            None,
            Some("ninja tests"),
        );
        assert_eq!(config.spec_path, PathBuf::from("/elsewhere/spec.yaml"));
        assert_eq!(config.build_command, ["ninja", "tests"]);
    }
}
