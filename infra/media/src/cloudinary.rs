//! Cloudinary upload API client.
//!
//! Requests are signed: the parameters (minus `file`, `api_key`, `resource_type`,
//! `cloud_name` and `signature_algorithm`) are sorted by name, joined as `k=v&k=v`, suffixed
//! with the API secret and hashed with SHA-256.

use crate::StoredImage;
use crate::error::{MediaError, MediaErrorExt};
use reqwest::{Client, multipart};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;
use tracing::{debug, instrument};

const DEFAULT_BASE_URL: &str = "https://api.cloudinary.com/v1_1";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const SIGNATURE_ALGORITHM: &str = "sha256";
const UNSIGNED_PARAMS: &[&str] =
    &["file", "api_key", "resource_type", "cloud_name", "signature_algorithm", "signature"];

/// Account credentials and upload defaults.
#[derive(Clone)]
pub struct Cloudinary {
    cloud_name: String,
    api_key: String,
    api_secret: String,
    folder: Option<String>,
    base_url: String,
    client: Client,
}

impl fmt::Debug for Cloudinary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cloudinary")
            .field("cloud_name", &self.cloud_name)
            .field("api_key", &self.api_key)
            .field("api_secret", &"***")
            .field("folder", &self.folder)
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    public_id: String,
    secure_url: String,
}

#[derive(Debug, Deserialize)]
struct DestroyResponse {
    result: String,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

impl Cloudinary {
    /// # Errors
    /// Returns [`MediaError::Transport`] if the HTTP client cannot be created.
    pub fn new(
        cloud_name: impl Into<String>,
        api_key: impl Into<String>,
        api_secret: impl Into<String>,
    ) -> Result<Self, MediaError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Building Cloudinary HTTP client")?;

        Ok(Self {
            cloud_name: cloud_name.into(),
            api_key: api_key.into(),
            api_secret: api_secret.into(),
            folder: None,
            base_url: DEFAULT_BASE_URL.to_owned(),
            client,
        })
    }

    /// Folder new uploads are placed in.
    #[must_use]
    pub fn folder(mut self, folder: impl Into<String>) -> Self {
        self.folder = Some(folder.into()).filter(|f: &String| !f.trim().is_empty());
        self
    }

    /// Overrides `https://api.cloudinary.com/v1_1`.
    #[must_use]
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_owned();
        self
    }

    #[must_use]
    pub fn cloud_name(&self) -> &str {
        &self.cloud_name
    }

    fn endpoint(&self, action: &str) -> String {
        format!("{}/{}/image/{action}", self.base_url, self.cloud_name)
    }

    /// Signs `params` with the API secret.
    #[must_use]
    pub fn sign(&self, params: &BTreeMap<&str, String>) -> String {
        sign(params, &self.api_secret)
    }

    fn signed_params(&self, mut params: BTreeMap<&'static str, String>) -> BTreeMap<&'static str, String> {
        params.insert("timestamp", chrono::Utc::now().timestamp().to_string());
        let signature = self.sign(&params);
        params.insert("api_key", self.api_key.clone());
        params.insert("signature_algorithm", SIGNATURE_ALGORITHM.to_owned());
        params.insert("signature", signature);
        params
    }

    #[instrument(skip(self, bytes), fields(cloud = %self.cloud_name, size = bytes.len()))]
    pub(crate) async fn upload(&self, filename: &str, bytes: Vec<u8>) -> Result<StoredImage, MediaError> {
        let mut params = BTreeMap::new();
        if let Some(folder) = &self.folder {
            params.insert("folder", folder.clone());
        }

        let form = self
            .signed_params(params)
            .into_iter()
            .fold(multipart::Form::new(), |form, (name, value)| form.text(name, value))
            .part("file", multipart::Part::bytes(bytes).file_name(filename.to_owned()));

        let response = self
            .client
            .post(self.endpoint("upload"))
            .multipart(form)
            .send()
            .await
            .context("Uploading image")?;

        let uploaded: UploadResponse = parse(response, "Uploading image").await?;
        debug!(public_id = %uploaded.public_id, "Image uploaded");

        Ok(StoredImage { name: uploaded.public_id, url: uploaded.secure_url })
    }

    #[instrument(skip(self), fields(cloud = %self.cloud_name))]
    pub(crate) async fn destroy(&self, public_id: &str) -> Result<(), MediaError> {
        let params = BTreeMap::from([("public_id", public_id.to_owned())]);

        let response = self
            .client
            .post(self.endpoint("destroy"))
            .form(&self.signed_params(params))
            .send()
            .await
            .context("Deleting image")?;

        let destroyed: DestroyResponse = parse(response, "Deleting image").await?;
        // "not found" means it is already gone
        match destroyed.result.as_str() {
            "ok" | "not found" => Ok(()),
            other => Err(MediaError::Rejected {
                status: 200,
                message: other.to_owned().into(),
                context: Some(format!("Deleting {public_id}").into()),
            }),
        }
    }
}

/// SHA-256 of the sorted, `&`-joined parameters followed by the secret, hex encoded.
#[must_use]
pub fn sign(params: &BTreeMap<&str, String>, api_secret: &str) -> String {
    let payload = params
        .iter()
        .filter(|&(name, value)| !UNSIGNED_PARAMS.contains(name) && !value.is_empty())
        .map(|(name, value)| format!("{name}={value}"))
        .collect::<Vec<_>>()
        .join("&");

    hex::encode(Sha256::digest(format!("{payload}{api_secret}").as_bytes()))
}

async fn parse<T: DeserializeOwned>(
    response: reqwest::Response,
    action: &'static str,
) -> Result<T, MediaError> {
    let status = response.status();
    if status.is_success() {
        return response.json::<T>().await.context(action);
    }

    let message = match response.json::<ErrorResponse>().await {
        Ok(body) => body.error.message,
        Err(_) => status.canonical_reason().unwrap_or("unknown error").to_owned(),
    };
    Err(MediaError::Rejected { status: status.as_u16(), message: message.into(), context: Some(action.into()) })
}
