//! The linear fine-tuning flow: prepare dataset, upload it, submit the job.
//!
//! Each step runs only after the previous one succeeded. A failure is
//! returned as-is and nothing already done is undone; an uploaded dataset
//! stays in place if submission fails.

use crate::dataset::{DatasetPreparer, DatasetSummary, UploadOutput};
use crate::error::BedrockError;
use crate::services::{CustomizationService, StorageService};
use crate::types::{CreateCustomizationJobRequest, JobHandle};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, instrument};

/// Inputs for one run: a local dataset and the job to train on it.
///
/// The dataset is uploaded to the request's training data location.
#[derive(Debug, Clone)]
pub struct JobPlan {
    /// Local JSONL file.
    pub dataset_path: PathBuf,
    /// Job to submit once the dataset is in place.
    pub request: CreateCustomizationJobRequest,
}

impl JobPlan {
    /// Create a plan.
    pub fn new(dataset_path: impl Into<PathBuf>, request: CreateCustomizationJobRequest) -> Self {
        Self {
            dataset_path: dataset_path.into(),
            request,
        }
    }
}

/// What a successful run produced.
#[derive(Debug, Clone)]
pub struct WorkflowOutcome {
    /// Dataset statistics.
    pub dataset: DatasetSummary,
    /// Upload result.
    pub upload: UploadOutput,
    /// Submitted job.
    pub job: JobHandle,
}

/// Runs [`JobPlan`]s.
pub struct FineTuneWorkflow {
    datasets: DatasetPreparer,
    jobs: Arc<dyn CustomizationService>,
}

impl FineTuneWorkflow {
    /// Create a workflow over the given services.
    pub fn new(storage: Arc<dyn StorageService>, jobs: Arc<dyn CustomizationService>) -> Self {
        Self {
            datasets: DatasetPreparer::new(storage),
            jobs,
        }
    }

    /// Prepare, upload, submit.
    #[instrument(skip(self, plan), fields(job_name = %plan.request.job_name))]
    pub async fn run(&self, plan: JobPlan) -> Result<WorkflowOutcome, BedrockError> {
        let dataset = self.datasets.prepare(&plan.dataset_path).await?;
        let upload = self
            .datasets
            .upload(&dataset, &plan.request.training_data)
            .await?;
        let job = self.jobs.submit(plan.request).await?;

        info!(job_arn = %job.job_arn, records = dataset.summary.record_count, "Fine-tuning started");
        Ok(WorkflowOutcome {
            dataset: dataset.summary,
            upload,
            job,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ServiceError;
    use crate::services::{PutObjectOutput, PutObjectRequest};
    use crate::types::{
        CustomizationJob, Hyperparameters, ListJobsRequest, ListJobsResponse, S3Uri,
    };
    use async_trait::async_trait;
    use mockall::mock;
    use std::io::Write;

    mock! {
        Storage {}

        #[async_trait]
        impl StorageService for Storage {
            async fn put_object(&self, request: PutObjectRequest) -> Result<PutObjectOutput, BedrockError>;
        }
    }

    mock! {
        Jobs {}

        #[async_trait]
        impl CustomizationService for Jobs {
            async fn submit(&self, request: CreateCustomizationJobRequest) -> Result<JobHandle, BedrockError>;
            async fn get_job(&self, job_identifier: &str) -> Result<CustomizationJob, BedrockError>;
            async fn list_jobs(&self, request: ListJobsRequest) -> Result<ListJobsResponse, BedrockError>;
            async fn stop_job(&self, job_identifier: &str) -> Result<(), BedrockError>;
        }
    }

    const LINE: &str = r#"{"messages":[{"role":"user","content":"hi"},{"role":"assistant","content":"hello"}]}"#;

    fn plan(contents: &str) -> (tempfile::NamedTempFile, JobPlan) {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "{}", contents).unwrap();
        let request = CreateCustomizationJobRequest::new(
            "support-ft-1",
            "support-model-1",
            "arn:aws:iam::123456789012:role/BedrockFineTune",
            "anthropic.claude-3-haiku-20240307-v1:0:200k",
            S3Uri::new("datasets", "train.jsonl"),
            S3Uri::new("datasets", "output/"),
        )
        .with_hyperparameters(Hyperparameters::new().epoch_count(5));
        let plan = JobPlan::new(file.path(), request);
        (file, plan)
    }

    fn stored() -> PutObjectOutput {
        PutObjectOutput {
            e_tag: Some("\"e\"".into()),
            version_id: None,
            request_id: None,
        }
    }

    #[tokio::test]
    async fn test_run_uploads_then_submits() {
        let (_file, plan) = plan(LINE);

        let mut storage = MockStorage::new();
        storage
            .expect_put_object()
            .withf(|r| r.bucket == "datasets" && r.key == "train.jsonl")
            .times(1)
            .returning(|_| Ok(stored()));

        let mut jobs = MockJobs::new();
        jobs.expect_submit()
            .withf(|r| r.training_data.to_string() == "s3://datasets/train.jsonl")
            .times(1)
            .returning(|_| {
                Ok(JobHandle {
                    job_arn: "arn:job".into(),
                })
            });

        let outcome = FineTuneWorkflow::new(Arc::new(storage), Arc::new(jobs))
            .run(plan)
            .await
            .unwrap();

        assert_eq!(outcome.job.job_arn, "arn:job");
        assert_eq!(outcome.dataset.record_count, 1);
        assert_eq!(outcome.upload.location, S3Uri::new("datasets", "train.jsonl"));
    }

    #[tokio::test]
    async fn test_invalid_dataset_stops_before_upload() {
        let (_file, plan) = plan(r#"{"messages":[{"role":"user","content":"hi"}]}"#);

        let mut storage = MockStorage::new();
        storage.expect_put_object().times(0);
        let mut jobs = MockJobs::new();
        jobs.expect_submit().times(0);

        let err = FineTuneWorkflow::new(Arc::new(storage), Arc::new(jobs))
            .run(plan)
            .await
            .unwrap_err();
        assert!(err.is_dataset_error());
    }

    #[tokio::test]
    async fn test_upload_failure_skips_submit() {
        let (_file, plan) = plan(LINE);

        let mut storage = MockStorage::new();
        storage.expect_put_object().times(1).returning(|_| {
            Err(ServiceError {
                service: "s3".into(),
                status: 403,
                code: Some("AccessDenied".into()),
                message: Some("Access Denied".into()),
                request_id: None,
            }
            .into())
        });
        let mut jobs = MockJobs::new();
        jobs.expect_submit().times(0);

        let err = FineTuneWorkflow::new(Arc::new(storage), Arc::new(jobs))
            .run(plan)
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), Some("AccessDenied"));
    }
}
