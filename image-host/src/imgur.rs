use crate::ImageHost;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use dogecloud_core::{CoreError, HostedImage, ImageHostError, ImgurSettings};
use reqwest::Client;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, error, info};
use url::Url;

#[derive(Debug, Deserialize)]
struct ImgurEnvelope {
    data: ImgurImageData,
    #[serde(default)]
    success: bool,
}

#[derive(Debug, Deserialize)]
struct ImgurImageData {
    id: String,
    link: String,
}

/// Pull the image id and public link out of an upload response body.
pub fn parse_upload_response(body: &str) -> Result<HostedImage, ImageHostError> {
    let envelope: ImgurEnvelope =
        serde_json::from_str(body).map_err(|e| ImageHostError::InvalidResponse {
            details: e.to_string(),
        })?;

    if !envelope.success {
        return Err(ImageHostError::InvalidResponse {
            details: "upload response did not report success".to_string(),
        });
    }

    Ok(HostedImage {
        id: envelope.data.id,
        link: envelope.data.link,
    })
}

/// Anonymous uploads, authorized by the application's client id only.
#[derive(Debug)]
pub struct ImgurClient {
    http_client: Client,
    client_id: String,
    upload_url: Url,
}

impl ImgurClient {
    pub fn new(settings: &ImgurSettings) -> Result<Self, CoreError> {
        let base = settings.api_base.trim_end_matches('/');
        let upload_url =
            Url::parse(&format!("{}/image", base)).map_err(|e| CoreError::InvalidInput {
                message: format!("invalid Imgur API base {}: {}", settings.api_base, e),
            })?;

        let http_client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;

        Ok(Self {
            http_client,
            client_id: settings.client_id.clone(),
            upload_url,
        })
    }

    pub fn upload_url(&self) -> &Url {
        &self.upload_url
    }

    pub async fn upload_bytes(&self, bytes: &[u8]) -> Result<HostedImage, CoreError> {
        let encoded = STANDARD.encode(bytes);
        debug!("Uploading {} bytes to {}", bytes.len(), self.upload_url);

        let response = self
            .http_client
            .post(self.upload_url.clone())
            .header("Authorization", format!("Client-ID {}", self.client_id))
            .form(&[("image", encoded.as_str()), ("type", "base64")])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            error!("Imgur upload failed with status {}", status);
            return Err(ImageHostError::UploadFailed {
                status_code: status.as_u16(),
                reason: body.chars().take(200).collect(),
            }
            .into());
        }

        let image = parse_upload_response(&body)?;
        info!("Uploaded image {} to {}", image.id, image.link);
        Ok(image)
    }
}

impl ImageHost for ImgurClient {
    async fn upload(&self, path: &Path) -> Result<HostedImage, CoreError> {
        let bytes = tokio::fs::read(path).await.map_err(|e| {
            error!("Could not read {} for upload: {}", path.display(), e);
            ImageHostError::UnreadableFile {
                path: path.display().to_string(),
            }
        })?;
        self.upload_bytes(&bytes).await
    }
}
