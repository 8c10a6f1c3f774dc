use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{GeneratedImage, ImageGenerator, JobHandle, JobStatus, Submission, read_json};
use crate::error::Result;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InferenceParameters {
    pub prompt: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub guidance: f64,
    pub width: u32,
    pub height: u32,
    pub num_inference_steps: u32,
    pub num_samples: u32,
    pub enable_safety_check: bool,
}

impl InferenceParameters {
    pub fn txt2img(prompt: &str) -> Self {
        Self {
            prompt: prompt.to_string(),
            kind: "txt2img".to_string(),
            guidance: 7.0,
            width: 512,
            height: 512,
            num_inference_steps: 30,
            num_samples: 1,
            enable_safety_check: false,
        }
    }
}

#[derive(Debug, Serialize)]
struct CreateInferenceRequest {
    parameters: InferenceParameters,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Inference {
    pub id: String,
    #[serde(default)]
    pub model_id: Option<String>,
    pub status: String,
    #[serde(default)]
    pub images: Vec<InferenceImage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InferenceImage {
    pub id: String,
    pub url: String,
}

#[derive(Debug, Deserialize)]
struct InferenceResponse {
    inference: Inference,
}

impl Inference {
    pub fn job_status(&self) -> JobStatus {
        match self.status.as_str() {
            "succeeded" => match self.images.first() {
                Some(image) => JobStatus::Succeeded(GeneratedImage {
                    file_url: image.url.clone(),
                    ..Default::default()
                }),
                None => JobStatus::Failed("succeeded without any image".to_string()),
            },
            "failed" | "canceled" => JobStatus::Failed(format!("status '{}'", self.status)),
            _ => JobStatus::Pending,
        }
    }
}

/// Scenario txt2img inferences against a single model.
pub struct ScenarioClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl ScenarioClient {
    pub fn new(
        http: reqwest::Client,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
        }
    }

    pub async fn create_inference(&self, prompt: &str) -> Result<Inference> {
        let body = CreateInferenceRequest {
            parameters: InferenceParameters::txt2img(prompt),
        };
        let response = self
            .http
            .post(format!("{}/models/{}/inferences", self.base_url, self.model))
            .header("Authorization", format!("Basic {}", self.api_key))
            .json(&body)
            .send()
            .await?;

        let created: InferenceResponse = read_json(response).await?;
        Ok(created.inference)
    }

    pub async fn get_inference(&self, inference_id: &str) -> Result<Inference> {
        let response = self
            .http
            .get(format!(
                "{}/models/{}/inferences/{}",
                self.base_url, self.model, inference_id
            ))
            .header("Authorization", format!("Basic {}", self.api_key))
            .send()
            .await?;

        let current: InferenceResponse = read_json(response).await?;
        Ok(current.inference)
    }
}

#[async_trait]
impl ImageGenerator for ScenarioClient {
    fn model_id(&self) -> String {
        self.model.clone()
    }

    async fn submit(&self, prompt: &str) -> Result<Submission> {
        let inference = self.create_inference(prompt).await?;
        Ok(Submission {
            handle: JobHandle(inference.id.clone()),
            status: inference.job_status(),
        })
    }

    async fn status(&self, handle: &JobHandle) -> Result<JobStatus> {
        Ok(self.get_inference(&handle.0).await?.job_status())
    }
}
