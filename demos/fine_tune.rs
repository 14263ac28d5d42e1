//! Fine-tune a model end to end.
//!
//! ```bash
//! export AWS_REGION=us-east-1
//! export FT_DATASET=./train.jsonl
//! export FT_BUCKET=my-datasets
//! export FT_ROLE_ARN=arn:aws:iam::123456789012:role/BedrockFineTune
//! cargo run --example fine_tune
//! ```
//!
//! Optional: `FT_BASE_MODEL`, `FT_JOB_NAME`, `FT_PROVISIONED_MODEL_ARN` (skip
//! straight to invocation against an existing deployment).

use bedrock_finetune::{
    BedrockClient, BedrockClientBuilder, CreateCustomizationJobRequest, Hyperparameters,
    JobPlan, JobStatus, MessagesRequest, ProvisionedThroughputRequest, S3Uri,
};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

const POLL_INTERVAL: Duration = Duration::from_secs(60);

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("bedrock_finetune=info")),
        )
        .init();

    let client = BedrockClientBuilder::new().from_env().build()?;

    let deployed = match std::env::var("FT_PROVISIONED_MODEL_ARN") {
        Ok(arn) => arn,
        Err(_) => {
            let dataset = env_or("FT_DATASET", "train.jsonl");
            let bucket = std::env::var("FT_BUCKET")?;
            let role_arn = std::env::var("FT_ROLE_ARN")?;
            let job_name = env_or("FT_JOB_NAME", &format!("ft-{}", chrono::Utc::now().format("%Y%m%d%H%M%S")));

            let request = CreateCustomizationJobRequest::new(
                job_name.clone(),
                format!("{}-model", job_name),
                role_arn,
                env_or("FT_BASE_MODEL", "anthropic.claude-3-haiku-20240307-v1:0:200k"),
                S3Uri::new(bucket.clone(), format!("{}/train.jsonl", job_name)),
                S3Uri::new(bucket, format!("{}/output/", job_name)),
            )
            .with_hyperparameters(
                Hyperparameters::new()
                    .epoch_count(5)
                    .batch_size(4)
                    .learning_rate_multiplier("1.0"),
            );

            let outcome = client.workflow().run(JobPlan::new(dataset, request)).await?;
            println!(
                "Uploaded {} records ({} bytes) and submitted {}",
                outcome.dataset.record_count, outcome.dataset.size_bytes, outcome.job
            );

            let status = loop {
                let status = client.customization().poll_status(outcome.job.id()).await?;
                println!("Job status: {}", status);
                if status.is_terminal() {
                    break status;
                }
                tokio::time::sleep(POLL_INTERVAL).await;
            };

            let job = client.customization().get_job(outcome.job.id()).await?;
            if status != JobStatus::Completed {
                println!(
                    "Job ended as {}: {}",
                    status,
                    job.failure_message.as_deref().unwrap_or("no failure message")
                );
                return Ok(());
            }

            let model_arn = job.output_model_arn.ok_or("completed job has no output model")?;
            let provisioned_arn = client
                .provisioning()
                .create(ProvisionedThroughputRequest::new(
                    format!("{}-pt", job_name),
                    model_arn,
                    1,
                ))
                .await?;

            loop {
                let pt = client.provisioning().get(&provisioned_arn).await?;
                println!("Provisioned throughput: {}", pt.status);
                if pt.status.is_ready() {
                    break;
                }
                if let bedrock_finetune::ProvisionedStatus::Failed = pt.status {
                    return Err(pt.failure_message.unwrap_or_default().into());
                }
                tokio::time::sleep(POLL_INTERVAL).await;
            }
            provisioned_arn
        }
    };

    let text = client
        .runtime()
        .invoke_text(
            &deployed,
            MessagesRequest::user(1000, "Summarize the customer's issue in one sentence.")
                .with_system("You are a support assistant."),
        )
        .await?;
    println!("Model says: {}", text);

    Ok(())
}
