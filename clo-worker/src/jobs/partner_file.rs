use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use clo_scheduler::PartnerFilePayload;

use crate::collaborators::{ResultCode, SettlementFileProcessor};
use crate::error::JobResult;
use crate::orchestration::{OrchestratedExecutionResult, OrchestratedTask};

/// Runs one partner file pipeline (clearing, rebate, statement, extract...)
pub struct PartnerFileTask {
    payload: PartnerFilePayload,
    processor: Arc<dyn SettlementFileProcessor>,
}

impl PartnerFileTask {
    pub fn new(payload: PartnerFilePayload, processor: Arc<dyn SettlementFileProcessor>) -> Self {
        Self { payload, processor }
    }
}

#[async_trait]
impl OrchestratedTask for PartnerFileTask {
    fn name(&self) -> &str {
        self.payload.pipeline.name()
    }

    async fn execute(&self) -> JobResult<OrchestratedExecutionResult> {
        let pipeline = self.payload.pipeline;
        let file_name = self.payload.file_name.as_deref();

        let code = self.processor.process(pipeline, file_name).await?;
        match code {
            code if code.is_success() => {
                info!(%pipeline, file_name, "Processed partner files");
                Ok(OrchestratedExecutionResult::Success)
            }
            code if code.is_already_processed() => {
                info!(%pipeline, file_name, result_code = %code, "Partner file already processed");
                Ok(OrchestratedExecutionResult::Success)
            }
            // Empty inbox on a recurring pipeline run
            ResultCode::FileNotFound if file_name.is_none() => {
                debug!(%pipeline, "No partner files pending");
                Ok(OrchestratedExecutionResult::Success)
            }
            code => {
                warn!(%pipeline, file_name, result_code = %code, "Partner file processing failed");
                Ok(OrchestratedExecutionResult::NonTerminalError)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::InMemorySettlementFileProcessor;
    use clo_scheduler::ScheduledJobType;

    #[tokio::test]
    async fn test_named_file_must_exist() {
        let files = InMemorySettlementFileProcessor::new();
        let task = PartnerFileTask::new(
            PartnerFilePayload::new(ScheduledJobType::ProcessFirstDataExtract).with_file_name("fd-001.txt"),
            Arc::new(files.clone()),
        );

        assert_eq!(task.execute().await.unwrap(), OrchestratedExecutionResult::NonTerminalError);

        files.add_pending(ScheduledJobType::ProcessFirstDataExtract, "fd-001.txt");
        assert_eq!(task.execute().await.unwrap(), OrchestratedExecutionResult::Success);
        // Redelivery of the same file is benign
        assert_eq!(task.execute().await.unwrap(), OrchestratedExecutionResult::Success);
        assert_eq!(files.processed().len(), 1);
    }

    #[tokio::test]
    async fn test_empty_inbox_is_success() {
        let task = PartnerFileTask::new(
            PartnerFilePayload::new(ScheduledJobType::ProcessMasterCardClearing),
            Arc::new(InMemorySettlementFileProcessor::new()),
        );
        assert_eq!(task.execute().await.unwrap(), OrchestratedExecutionResult::Success);
    }
}
