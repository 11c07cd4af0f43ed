//! Object storage client for avatar uploads.

use reqwest::Client;
use serde::Deserialize;

use super::ObjectStore;
use crate::config::ClientConfig;
use crate::session::SessionContext;
use crate::util::compact_text;
use crate::{Error, Result};

/// Cache lifetime stamped on uploaded objects, in seconds.
pub const UPLOAD_CACHE_SECONDS: u32 = 3600;

/// Storage client bound to one bucket.
#[derive(Debug, Clone)]
pub struct SupabaseStorageClient {
    storage_url: String,
    anon_key: String,
    bucket: String,
    client: Client,
    session: SessionContext,
}

impl SupabaseStorageClient {
    pub fn new(config: &ClientConfig, session: SessionContext) -> Result<Self> {
        Ok(Self {
            storage_url: config.storage_url(),
            anon_key: config.supabase_anon_key.clone(),
            bucket: config.avatar_bucket.clone(),
            client: Client::builder().build()?,
            session,
        })
    }

    fn object_url(&self, path: &str) -> String {
        format!(
            "{}/object/{}/{}",
            self.storage_url,
            urlencoding::encode(&self.bucket),
            encode_object_path(path)
        )
    }
}

impl ObjectStore for SupabaseStorageClient {
    async fn upload(
        &self,
        path: &str,
        bytes: &[u8],
        content_type: &str,
        upsert: bool,
    ) -> Result<()> {
        let token = self
            .session
            .access_token()
            .ok_or(Error::NotAuthenticated)?;

        tracing::debug!("Uploading {} bytes to {}/{}", bytes.len(), self.bucket, path);
        let response = self
            .client
            .post(self.object_url(path))
            .header("apikey", &self.anon_key)
            .bearer_auth(token)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .header(
                reqwest::header::CACHE_CONTROL,
                format!("max-age={UPLOAD_CACHE_SECONDS}"),
            )
            .header("x-upsert", if upsert { "true" } else { "false" })
            .body(bytes.to_vec())
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Storage(format!(
                "Upload request failed with HTTP {status}: {}",
                storage_error_message(&body)
            )));
        }
        Ok(())
    }

    fn public_url(&self, path: &str) -> String {
        format!(
            "{}/object/public/{}/{}",
            self.storage_url,
            urlencoding::encode(&self.bucket),
            encode_object_path(path)
        )
    }
}

/// Percent-encode each segment, keeping `/` separators.
fn encode_object_path(path: &str) -> String {
    path.trim_start_matches('/')
        .split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

#[derive(Debug, Deserialize)]
struct StorageErrorResponse {
    message: Option<String>,
    error: Option<String>,
}

fn storage_error_message(body: &str) -> String {
    serde_json::from_str::<StorageErrorResponse>(body)
        .ok()
        .and_then(|payload| payload.message.or(payload.error))
        .filter(|message| !message.trim().is_empty())
        .map_or_else(|| compact_text(body), |message| compact_text(&message))
}
