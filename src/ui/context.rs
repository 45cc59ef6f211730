//! Detecting interactive vs CI environments

use std::io::IsTerminal;

/// Common CI environment indicators
const CI_VARS: &[&str] = &[
    "CI",
    "GITHUB_ACTIONS",
    "GITLAB_CI",
    "CIRCLECI",
    "TRAVIS",
    "JENKINS_URL",
    "BUILDKITE",
    "TEAMCITY_VERSION",
    "TF_BUILD",
];

/// Determines how output is rendered
#[derive(Debug, Clone)]
pub struct UiContext {
    interactive: bool,
}

impl UiContext {
    /// Detect the current environment
    pub fn detect() -> Self {
        Self {
            interactive: std::io::stdout().is_terminal()
                && !CI_VARS.iter().any(|var| std::env::var_os(var).is_some()),
        }
    }

    /// Plain output regardless of environment
    pub fn non_interactive() -> Self {
        Self { interactive: false }
    }

    /// Whether to use colors and symbols
    pub fn use_fancy_output(&self) -> bool {
        self.interactive
    }
}
