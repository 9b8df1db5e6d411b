//! Shell-template command runner.

use crate::domain::ValidatorId;
use crate::error::{AdminError, ExitStatusText};
use crate::ports::CommandRunner;
use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

const VALIDATOR_PLACEHOLDER: &str = "{validator}";
const COMMAND_PLACEHOLDER: &str = "{command}";

/// Runs commands through `bash -c` using a template such as
/// `kurtosis service exec my-enclave l2-cl-{validator}-heimdall-bor-validator '{command}'`.
#[derive(Clone, Debug)]
pub struct ShellCommandRunner {
    template: String,
}

impl ShellCommandRunner {
    /// Template must contain `{command}`; `{validator}` is optional.
    pub fn new(template: impl Into<String>) -> Result<Self, String> {
        let template = template.into();
        if !template.contains(COMMAND_PLACEHOLDER) {
            return Err(format!(
                "exec template '{}' has no {} placeholder",
                template, COMMAND_PLACEHOLDER
            ));
        }
        Ok(Self { template })
    }

    /// Shell line for `command` on `validator_id`.
    pub fn render(&self, validator_id: ValidatorId, command: &str) -> String {
        self.template
            .replace(VALIDATOR_PLACEHOLDER, &validator_id.to_string())
            .replace(COMMAND_PLACEHOLDER, command)
    }
}

/// Stdout then stderr, each starting on its own line, trimmed.
fn combine_streams(stdout: &[u8], stderr: &[u8]) -> String {
    let mut combined = String::from_utf8_lossy(stdout).into_owned();
    if !combined.is_empty() && !combined.ends_with('\n') {
        combined.push('\n');
    }
    combined.push_str(&String::from_utf8_lossy(stderr));
    combined.trim().to_string()
}

#[async_trait]
impl CommandRunner for ShellCommandRunner {
    async fn run(&self, validator_id: ValidatorId, command: &str) -> Result<String, AdminError> {
        let line = self.render(validator_id, command);
        debug!(validator_id, %line, "running command");

        let output = Command::new("bash")
            .arg("-c")
            .arg(&line)
            .output()
            .await
            .map_err(|e| AdminError::Spawn {
                validator_id,
                reason: e.to_string(),
            })?;

        let combined = combine_streams(&output.stdout, &output.stderr);

        if !output.status.success() {
            return Err(AdminError::CommandFailed {
                validator_id,
                status: ExitStatusText(output.status.code()),
                output: combined,
            });
        }
        Ok(combined)
    }
}
