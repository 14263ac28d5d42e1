//! Model customization jobs on the Bedrock control plane.

use super::{encode_segment, parse_json, to_json, ServiceContext};
use crate::error::BedrockError;
use crate::types::{
    CreateCustomizationJobRequest, CustomizationJob, JobHandle, JobStatus, ListJobsRequest,
    ListJobsResponse,
};
use async_trait::async_trait;
use tracing::{debug, info, instrument, warn};

/// Customization job operations.
#[async_trait]
pub trait CustomizationService: Send + Sync {
    /// Submit a new job.
    async fn submit(&self, request: CreateCustomizationJobRequest)
        -> Result<JobHandle, BedrockError>;

    /// Describe a job by name or ARN.
    async fn get_job(&self, job_identifier: &str) -> Result<CustomizationJob, BedrockError>;

    /// List jobs.
    async fn list_jobs(&self, request: ListJobsRequest) -> Result<ListJobsResponse, BedrockError>;

    /// Request that a running job stop.
    async fn stop_job(&self, job_identifier: &str) -> Result<(), BedrockError>;

    /// Current status of a job. One request; callers poll on their own schedule.
    async fn poll_status(&self, job_identifier: &str) -> Result<JobStatus, BedrockError> {
        let job = self.get_job(job_identifier).await?;
        match &job.status {
            JobStatus::Unknown(status) => warn!(job = job_identifier, %status, "Unrecognized job status"),
            status => info!(job = job_identifier, %status, "Job status"),
        }
        Ok(job.status)
    }
}

/// Bedrock implementation of [`CustomizationService`].
pub struct CustomizationServiceImpl {
    context: ServiceContext,
}

impl CustomizationServiceImpl {
    pub(crate) fn new(context: ServiceContext) -> Self {
        Self { context }
    }

    fn jobs_url(&self) -> String {
        format!("{}/model-customization-jobs", self.context.config.api_endpoint())
    }

    fn job_url(&self, job_identifier: &str) -> String {
        format!("{}/{}", self.jobs_url(), encode_segment(job_identifier))
    }
}

#[async_trait]
impl CustomizationService for CustomizationServiceImpl {
    #[instrument(skip(self, request), fields(job_name = %request.job_name, base_model = %request.base_model_identifier))]
    async fn submit(
        &self,
        request: CreateCustomizationJobRequest,
    ) -> Result<JobHandle, BedrockError> {
        let body = to_json("CreateModelCustomizationJob", &request.to_wire())?;
        debug!(
            training_data = %request.training_data,
            output_data = %request.output_data,
            hyperparameters = request.hyperparameters.len(),
            "Submitting customization job"
        );

        let response = self
            .context
            .execute_json("POST", self.jobs_url(), Some(body))
            .await?;
        let handle: JobHandle = parse_json("CreateModelCustomizationJob", &response.body)?;

        info!(job_arn = %handle.job_arn, "Customization job submitted");
        Ok(handle)
    }

    #[instrument(skip(self))]
    async fn get_job(&self, job_identifier: &str) -> Result<CustomizationJob, BedrockError> {
        let response = self
            .context
            .execute_json("GET", self.job_url(job_identifier), None)
            .await?;
        parse_json("GetModelCustomizationJob", &response.body)
    }

    #[instrument(skip(self, request))]
    async fn list_jobs(&self, request: ListJobsRequest) -> Result<ListJobsResponse, BedrockError> {
        let mut url = self.jobs_url();
        let params = request.query_params();
        if !params.is_empty() {
            let query: Vec<String> = params
                .iter()
                .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
                .collect();
            url.push('?');
            url.push_str(&query.join("&"));
        }

        let response = self.context.execute_json("GET", url, None).await?;
        let page: ListJobsResponse = parse_json("ListModelCustomizationJobs", &response.body)?;
        debug!(count = page.jobs.len(), more = page.next_token.is_some(), "Listed jobs");
        Ok(page)
    }

    #[instrument(skip(self))]
    async fn stop_job(&self, job_identifier: &str) -> Result<(), BedrockError> {
        let url = format!("{}/stop", self.job_url(job_identifier));
        self.context.execute_json("POST", url, None).await?;
        info!("Stop requested");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BedrockConfig;
    use crate::mocks::{MockCredentialsProvider, MockResponse, MockTransport, TestFixtures};
    use crate::signing::SigV4Signer;
    use crate::types::{Hyperparameters, S3Uri};
    use std::sync::Arc;

    fn service(transport: Arc<MockTransport>) -> CustomizationServiceImpl {
        let config = Arc::new(BedrockConfig::default());
        let signer = Arc::new(SigV4Signer::bedrock(
            Arc::new(MockCredentialsProvider::new()),
            config.region.clone(),
        ));
        CustomizationServiceImpl::new(ServiceContext::new(config, transport, signer))
    }

    fn request() -> CreateCustomizationJobRequest {
        CreateCustomizationJobRequest::new(
            "support-ft-1",
            "support-model-1",
            "arn:aws:iam::123456789012:role/BedrockFineTune",
            "anthropic.claude-3-haiku-20240307-v1:0:200k",
            S3Uri::new("datasets", "train.jsonl"),
            S3Uri::new("datasets", "output/"),
        )
        .with_hyperparameters(
            Hyperparameters::new()
                .epoch_count(5)
                .batch_size(4)
                .learning_rate_multiplier("1.0"),
        )
    }

    #[tokio::test]
    async fn test_submit_posts_job() {
        let transport = Arc::new(MockTransport::with_responses(vec![MockResponse::json(
            TestFixtures::create_job_response(),
        )]));
        let jobs = service(transport.clone());

        let handle = jobs.submit(request()).await.unwrap();
        assert_eq!(handle.job_arn, TestFixtures::JOB_ARN);

        let sent = transport.last_request().unwrap();
        assert_eq!(sent.method, "POST");
        assert_eq!(
            sent.url,
            "https://bedrock.us-east-1.amazonaws.com/model-customization-jobs"
        );
        let body: serde_json::Value = serde_json::from_str(sent.body_str().unwrap()).unwrap();
        assert_eq!(body["hyperParameters"]["epochCount"], "5");
        assert_eq!(body["trainingDataConfig"]["s3Uri"], "s3://datasets/train.jsonl");
        assert!(sent
            .get_header("authorization")
            .unwrap()
            .contains("/us-east-1/bedrock/aws4_request"));
    }

    #[tokio::test]
    async fn test_submit_validation_error_unchanged() {
        let transport = Arc::new(MockTransport::with_responses(vec![MockResponse::aws_error(
            400,
            "ValidationException",
            "epochCount must be between 1 and 10",
        )]));
        let jobs = service(transport.clone());

        let err = jobs.submit(request()).await.unwrap_err();
        match err {
            BedrockError::Service(e) => {
                assert_eq!(e.service, "bedrock");
                assert_eq!(e.status, 400);
                assert_eq!(e.code.as_deref(), Some("ValidationException"));
                assert_eq!(e.message.as_deref(), Some("epochCount must be between 1 and 10"));
                assert_eq!(e.request_id.as_deref(), Some("mock-request-id"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(transport.request_count(), 1);
    }

    #[tokio::test]
    async fn test_poll_status_reaches_terminal() {
        let transport = Arc::new(MockTransport::with_responses(vec![
            MockResponse::json(TestFixtures::job("InProgress")),
            MockResponse::json(TestFixtures::job("Completed")),
        ]));
        let jobs = service(transport.clone());

        let first = jobs.poll_status(TestFixtures::JOB_ARN).await.unwrap();
        let second = jobs.poll_status(TestFixtures::JOB_ARN).await.unwrap();

        assert_eq!(first, JobStatus::InProgress);
        assert_eq!(second, JobStatus::Completed);
        assert!(second.is_terminal());

        let url = transport.last_request().unwrap().url;
        assert!(url.starts_with("https://bedrock.us-east-1.amazonaws.com/model-customization-jobs/arn%3Aaws%3Abedrock"));
    }

    #[tokio::test]
    async fn test_get_job_bad_body() {
        let transport = Arc::new(MockTransport::with_responses(vec![MockResponse::error(
            200, "not json",
        )]));
        let err = service(transport).get_job("job").await.unwrap_err();
        assert!(matches!(err, BedrockError::Response(_)));
    }

    #[tokio::test]
    async fn test_list_jobs_query() {
        let transport = Arc::new(MockTransport::with_responses(vec![MockResponse::json(
            serde_json::json!({
                "modelCustomizationJobSummaries": [{
                    "jobArn": TestFixtures::JOB_ARN,
                    "jobName": "support-ft-1",
                    "status": "InProgress"
                }],
                "nextToken": "page-2"
            }),
        )]));
        let jobs = service(transport.clone());

        let page = jobs
            .list_jobs(ListJobsRequest::new().with_name_contains("support ft").with_max_results(5))
            .await
            .unwrap();

        assert_eq!(page.jobs.len(), 1);
        assert_eq!(page.next_token.as_deref(), Some("page-2"));
        assert!(transport
            .last_request()
            .unwrap()
            .url
            .ends_with("/model-customization-jobs?nameContains=support%20ft&maxResults=5"));
    }

    #[tokio::test]
    async fn test_stop_job() {
        let transport = Arc::new(MockTransport::with_responses(vec![MockResponse::ok()]));
        service(transport.clone()).stop_job("support-ft-1").await.unwrap();

        let sent = transport.last_request().unwrap();
        assert_eq!(sent.method, "POST");
        assert!(sent.url.ends_with("/model-customization-jobs/support-ft-1/stop"));
    }
}
