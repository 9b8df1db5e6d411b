//! Validator administration through `heimdalld` commands.

use super::calc_output::parse_calc_output;
use crate::domain::{BlockRange, DowntimeRequest, ProducerAddress, ValidatorId};
use crate::error::{AdminError, EstimationError, SubmissionError};
use crate::ports::{CommandRunner, ValidatorAdmin};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug, Deserialize)]
struct PrivValidatorKey {
    #[serde(default)]
    address: String,
}

/// Extract the signer address from `priv_validator_key.json` output.
///
/// The JSON may be preceded and followed by noise lines; parsing starts at
/// the first `{` and stops after the first complete object.
pub fn parse_key_file(
    validator_id: ValidatorId,
    output: &str,
) -> Result<ProducerAddress, AdminError> {
    let invalid = |reason: String| AdminError::InvalidKeyFile {
        validator_id,
        reason,
    };

    let start = output
        .find('{')
        .ok_or_else(|| invalid(format!("no JSON in output: {}", output)))?;
    let json = &output[start..];

    let key = serde_json::Deserializer::from_str(json)
        .into_iter::<PrivValidatorKey>()
        .next()
        .ok_or_else(|| invalid(format!("no JSON in output: {}", output)))?
        .map_err(|e| invalid(format!("{}; raw: {}", e, json)))?;
    if key.address.trim().is_empty() {
        return Err(invalid(format!("address field empty: {}", json)));
    }
    Ok(ProducerAddress::new(key.address))
}

/// [`ValidatorAdmin`] built on `heimdalld` invoked through a [`CommandRunner`].
pub struct HeimdallCliAdmin {
    runner: Arc<dyn CommandRunner>,
    home: String,
}

impl HeimdallCliAdmin {
    pub fn new(runner: Arc<dyn CommandRunner>, home: impl Into<String>) -> Self {
        Self {
            runner,
            home: home.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn key_file_command(&self) -> String {
        format!("cat {}/config/priv_validator_key.json", self.home)
    }

    pub fn downtime_command(
        &self,
        request: &DowntimeRequest,
        producer: &ProducerAddress,
        calc_only: bool,
    ) -> String {
        let mut command = format!(
            "heimdalld tx bor producer-downtime --producer-address {} \
             --start-timestamp-utc {} --end-timestamp-utc {} --home {}",
            producer,
            request.start_unix(),
            request.end_unix(),
            self.home
        );
        if calc_only {
            command.push_str(" --calc-only");
        }
        command
    }
}

#[async_trait]
impl ValidatorAdmin for HeimdallCliAdmin {
    async fn producer_address(
        &self,
        validator_id: ValidatorId,
    ) -> Result<ProducerAddress, AdminError> {
        let output = self
            .runner
            .run(validator_id, &self.key_file_command())
            .await?;
        parse_key_file(validator_id, &output)
    }

    async fn estimate_downtime(
        &self,
        validator_id: ValidatorId,
        request: &DowntimeRequest,
        producer: &ProducerAddress,
    ) -> Result<BlockRange, EstimationError> {
        let command = self.downtime_command(request, producer, true);
        let output = self.runner.run(validator_id, &command).await?;
        debug!(validator_id, %output, "calc-only output");
        parse_calc_output(&output)
    }

    async fn submit_downtime(
        &self,
        validator_id: ValidatorId,
        request: &DowntimeRequest,
        producer: &ProducerAddress,
    ) -> Result<(), SubmissionError> {
        let command = self.downtime_command(request, producer, false);
        let output = self
            .runner
            .run(validator_id, &command)
            .await
            .map_err(|source| SubmissionError::Rejected {
                validator_id,
                source,
            })?;
        info!(validator_id, %output, "producer-downtime output");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::MockCommandRunner;
    use chrono::{DateTime, Utc};
    use std::time::Duration;

    fn request() -> DowntimeRequest {
        DowntimeRequest::starting_in(
            DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap(),
            Duration::from_secs(180),
            Duration::from_secs(180),
        )
        .unwrap()
    }

    #[test]
    fn test_key_file_with_noise_prefix() {
        let output = "0\n{\n  \"address\": \"0xABCD\",\n  \"pub_key\": {}\n}";
        assert_eq!(
            parse_key_file(1, output).unwrap(),
            ProducerAddress::new("0xabcd")
        );
    }

    #[test]
    fn test_key_file_with_trailing_stderr() {
        let output = "{\"address\": \"0xA1\"}\nwarning: using default keyring";
        assert_eq!(
            parse_key_file(1, output).unwrap(),
            ProducerAddress::new("0xa1")
        );
    }

    #[test]
    fn test_key_file_failures() {
        assert!(matches!(
            parse_key_file(1, "permission denied"),
            Err(AdminError::InvalidKeyFile { validator_id: 1, .. })
        ));
        assert!(matches!(
            parse_key_file(2, "{\"pub_key\": {}}"),
            Err(AdminError::InvalidKeyFile { validator_id: 2, .. })
        ));
        assert!(parse_key_file(3, "{not json").is_err());
    }

    #[test]
    fn test_command_strings() {
        let admin = HeimdallCliAdmin::new(Arc::new(MockCommandRunner::new()), "/etc/heimdall/");
        let producer = ProducerAddress::new("0xa2");

        assert_eq!(
            admin.key_file_command(),
            "cat /etc/heimdall/config/priv_validator_key.json"
        );
        assert_eq!(
            admin.downtime_command(&request(), &producer, false),
            "heimdalld tx bor producer-downtime --producer-address 0xa2 \
             --start-timestamp-utc 1700000180 --end-timestamp-utc 1700000360 --home /etc/heimdall"
        );
        assert!(admin
            .downtime_command(&request(), &producer, true)
            .ends_with("--home /etc/heimdall --calc-only"));
    }

    #[tokio::test]
    async fn test_estimate_runs_calc_only_on_validator() {
        let runner = Arc::new(MockCommandRunner::new().respond(
            "--calc-only",
            "Calculated start block: 140\nCalculated end block: 160",
        ));
        let admin = HeimdallCliAdmin::new(runner.clone(), "/etc/heimdall");

        let range = admin
            .estimate_downtime(1, &request(), &ProducerAddress::new("0xa1"))
            .await
            .unwrap();

        assert_eq!(range, BlockRange::new(140, 160).unwrap());
        let commands = runner.commands();
        assert_eq!(commands.len(), 1);
        assert_eq!(commands[0].0, 1);
        assert!(commands[0].1.contains("--producer-address 0xa1"));
    }

    #[tokio::test]
    async fn test_submit_failure_is_rejection() {
        let runner = Arc::new(MockCommandRunner::new().fail("producer-downtime", 1));
        let admin = HeimdallCliAdmin::new(runner, "/etc/heimdall");

        let err = admin
            .submit_downtime(2, &request(), &ProducerAddress::new("0xa2"))
            .await
            .unwrap_err();
        assert!(matches!(err, SubmissionError::Rejected { validator_id: 2, .. }));
    }

    #[tokio::test]
    async fn test_producer_address_reads_key_file() {
        let runner = Arc::new(
            MockCommandRunner::new().respond("priv_validator_key.json", "{\"address\":\"0xA1\"}"),
        );
        let admin = HeimdallCliAdmin::new(runner.clone(), "/etc/heimdall");

        assert_eq!(
            admin.producer_address(4).await.unwrap(),
            ProducerAddress::new("0xa1")
        );
        assert_eq!(runner.commands()[0].0, 4);
    }
}
