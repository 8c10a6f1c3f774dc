use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{GeneratedImage, ImageGenerator, JobHandle, JobStatus, Submission, read_json};
use crate::error::{Error, Result};

// Skybox styles offered by Blockade Labs, by their numeric style id.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum_macros::Display,
    strum_macros::EnumString,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum SkyboxStyle {
    FantasyLand,
    DigitalPainting,
}

impl SkyboxStyle {
    pub fn id(self) -> u32 {
        match self {
            SkyboxStyle::FantasyLand => 2,
            SkyboxStyle::DigitalPainting => 5,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SkyboxRequest {
    pub id: i64,
    pub status: String,
    pub file_url: Option<String>,
    pub thumb_url: Option<String>,
    pub depth_map_url: Option<String>,
    pub error_message: Option<String>,
}

impl SkyboxRequest {
    pub fn job_status(&self) -> JobStatus {
        match self.status.as_str() {
            "complete" => match self.file_url.as_deref().filter(|url| !url.is_empty()) {
                Some(file_url) => JobStatus::Succeeded(GeneratedImage {
                    file_url: file_url.to_string(),
                    thumb_url: self.thumb_url.clone().filter(|url| !url.is_empty()),
                    depth_map_url: self.depth_map_url.clone().filter(|url| !url.is_empty()),
                }),
                None => JobStatus::Failed("completed without a file url".to_string()),
            },
            "error" | "abort" => JobStatus::Failed(
                self.error_message
                    .clone()
                    .unwrap_or_else(|| format!("status '{}'", self.status)),
            ),
            _ => JobStatus::Pending,
        }
    }
}

#[derive(Debug, Deserialize)]
struct SkyboxStatusResponse {
    request: SkyboxRequest,
}

/// Blockade Labs skybox generation.
pub struct SkyboxClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    style: SkyboxStyle,
}

impl SkyboxClient {
    pub fn new(
        http: reqwest::Client,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        style: SkyboxStyle,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            style,
        }
    }

    pub async fn create_skybox(&self, prompt: &str) -> Result<SkyboxRequest> {
        let style_id = self.style.id().to_string();
        let response = self
            .http
            .post(format!("{}/skybox", self.base_url))
            .header("x-api-key", &self.api_key)
            .form(&[("prompt", prompt), ("skybox_style_id", style_id.as_str())])
            .send()
            .await?;

        read_json(response).await
    }

    pub async fn get_skybox_status(&self, request_id: &str) -> Result<SkyboxRequest> {
        let response = self
            .http
            .get(format!("{}/imagine/requests/{}", self.base_url, request_id))
            .header("x-api-key", &self.api_key)
            .send()
            .await?;

        let status: SkyboxStatusResponse = read_json(response).await?;
        Ok(status.request)
    }
}

#[async_trait]
impl ImageGenerator for SkyboxClient {
    fn model_id(&self) -> String {
        self.style.to_string()
    }

    async fn submit(&self, prompt: &str) -> Result<Submission> {
        log::info!("Creating skybox...");
        let request = self.create_skybox(prompt).await?;
        if request.id <= 0 {
            return Err(Error::Upstream(format!(
                "skybox submission returned no request id (status '{}')",
                request.status
            )));
        }

        Ok(Submission {
            handle: JobHandle(request.id.to_string()),
            status: request.job_status(),
        })
    }

    async fn status(&self, handle: &JobHandle) -> Result<JobStatus> {
        let request = self.get_skybox_status(&handle.0).await?;
        Ok(request.job_status())
    }
}
