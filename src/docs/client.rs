use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response};
use tracing::instrument;

use super::schema::{
    ChatMessage, ChatReply, ChatRequest, DownloadLink, ErrorBody, FileListPayload, FileRecord,
    MessageBody, RenameBody, SuggestedName, SuggestedTags, TagsBody, UploadSlot,
};
use super::tags::normalize;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::session::SessionStore;

/// The backend's file endpoints. Each call is one independent round trip;
/// nothing is retried.
#[async_trait]
pub trait FileDirectory: Send + Sync {
    /// Full listing. Unrecognised payload shapes yield an empty list.
    async fn list_files(&self) -> Result<Vec<FileRecord>>;

    /// Ask the backend to allocate a storage location for a new file.
    async fn request_upload_slot(&self, filename: &str, tags: &[String]) -> Result<UploadSlot>;

    /// Send the file bytes straight to the storage URL (no auth header).
    async fn put_payload(&self, upload_url: &str, bytes: Vec<u8>) -> Result<()>;

    async fn delete_file(&self, file_id: &str) -> Result<()>;

    async fn rename_file(&self, file_id: &str, new_filename: &str) -> Result<()>;

    async fn set_tags(&self, file_id: &str, tags: &[String]) -> Result<()>;

    async fn request_download_url(&self, file_id: &str) -> Result<String>;

    /// Returns the backend's confirmation message.
    async fn share_file(&self, file_id: &str, recipient: &str) -> Result<String>;

    async fn suggest_name(&self, filename: &str) -> Result<String>;

    async fn suggest_tags(&self, filename: &str) -> Result<Vec<String>>;

    /// Fetch bytes from a download URL (no auth header).
    async fn fetch_payload(&self, download_url: &str) -> Result<Vec<u8>>;
}

/// `FileDirectory` over HTTP, authorised by the shared session.
#[derive(Clone)]
pub struct HttpDirectory {
    base: String,
    session: Arc<SessionStore>,
    http: reqwest::Client,
}

impl HttpDirectory {
    pub fn new(base: impl Into<String>, session: Arc<SessionStore>) -> Self {
        Self::with_client(base, session, reqwest::Client::new())
    }

    pub fn from_config(config: &Config, session: Arc<SessionStore>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;
        Ok(Self::with_client(config.api_base()?, session, http))
    }

    pub fn with_client(
        base: impl Into<String>,
        session: Arc<SessionStore>,
        http: reqwest::Client,
    ) -> Self {
        let base = base.into().trim_end_matches('/').to_string();
        Self { base, session, http }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    fn file_url(&self, file_id: &str, action: &str) -> String {
        self.url(&format!("/files/{}/{}", urlencoding::encode(file_id), action))
    }

    fn authed(&self, method: Method, url: String) -> Result<RequestBuilder> {
        let token = self.session.bearer()?;
        Ok(self.http.request(method, url).bearer_auth(token))
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = request.send().await?;
        check_status(response).await
    }

    async fn send_json<T: serde::de::DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = self.send(request).await?;
        let body = response.bytes().await?;
        serde_json::from_slice(&body).map_err(|e| Error::Malformed(e.to_string()))
    }

    /// General-purpose assistant chat through the backend's model proxy.
    #[instrument(skip(self, messages), fields(turns = messages.len()))]
    pub async fn ask(&self, messages: &[ChatMessage], model: &str, max_tokens: u32) -> Result<String> {
        let body = ChatRequest {
            messages,
            model,
            max_tokens,
        };
        let request = self.authed(Method::POST, self.url("/api/claude"))?.json(&body);
        let reply: ChatReply = self.send_json(request).await?;
        Ok(reply.text())
    }
}

/// Map a non-2xx response to `Error::Api`, preferring the body's `detail`.
async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&text)
        .ok()
        .and_then(|b| b.message())
        .or_else(|| {
            let trimmed = text.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        })
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_string());
    tracing::debug!(status = status.as_u16(), %message, "backend returned an error");
    Err(Error::api(status.as_u16(), message))
}

#[async_trait]
impl FileDirectory for HttpDirectory {
    #[instrument(skip(self))]
    async fn list_files(&self) -> Result<Vec<FileRecord>> {
        let request = self.authed(Method::GET, self.url("/files"))?;
        let body: serde_json::Value = self.send_json(request).await?;
        match FileListPayload::decode(&body) {
            Some(files) => {
                tracing::debug!(count = files.len(), "fetched file list");
                Ok(files)
            }
            None => {
                tracing::warn!(response = %body, "unexpected /files response");
                Ok(Vec::new())
            }
        }
    }

    #[instrument(skip(self))]
    async fn request_upload_slot(&self, filename: &str, tags: &[String]) -> Result<UploadSlot> {
        let tags = serde_json::to_string(tags)?;
        let request = self
            .authed(Method::POST, self.url("/upload"))?
            .query(&[("filename", filename), ("tags", tags.as_str())]);
        self.send_json(request).await
    }

    #[instrument(skip(self, upload_url, bytes), fields(len = bytes.len()))]
    async fn put_payload(&self, upload_url: &str, bytes: Vec<u8>) -> Result<()> {
        let request = self.http.put(upload_url).body(bytes);
        self.send(request).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete_file(&self, file_id: &str) -> Result<()> {
        let request = self
            .authed(Method::DELETE, self.url("/delete"))?
            .query(&[("fileId", file_id)]);
        self.send(request).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn rename_file(&self, file_id: &str, new_filename: &str) -> Result<()> {
        let request = self
            .authed(Method::PUT, self.file_url(file_id, "rename"))?
            .json(&RenameBody { new_filename });
        self.send(request).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn set_tags(&self, file_id: &str, tags: &[String]) -> Result<()> {
        let request = self
            .authed(Method::PUT, self.file_url(file_id, "tags"))?
            .json(&TagsBody { tags });
        self.send(request).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn request_download_url(&self, file_id: &str) -> Result<String> {
        let request = self
            .authed(Method::GET, self.url("/download"))?
            .query(&[("fileId", file_id)]);
        let link: DownloadLink = self.send_json(request).await?;
        link.download_url
            .filter(|u| !u.is_empty())
            .ok_or_else(|| Error::Malformed("no downloadUrl in response".into()))
    }

    #[instrument(skip(self))]
    async fn share_file(&self, file_id: &str, recipient: &str) -> Result<String> {
        let request = self
            .authed(Method::POST, self.url("/share"))?
            .query(&[("fileId", file_id), ("recipient", recipient)]);
        let body: MessageBody = self.send_json(request).await?;
        Ok(body
            .message
            .unwrap_or_else(|| format!("Shared with {recipient}")))
    }

    #[instrument(skip(self))]
    async fn suggest_name(&self, filename: &str) -> Result<String> {
        let request = self
            .authed(Method::GET, self.url("/suggest-name"))?
            .query(&[("filename", filename)]);
        let body: SuggestedName = self.send_json(request).await?;
        body.suggested_name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .ok_or_else(|| Error::Malformed("no suggested_name in response".into()))
    }

    #[instrument(skip(self))]
    async fn suggest_tags(&self, filename: &str) -> Result<Vec<String>> {
        let request = self
            .authed(Method::GET, self.url("/suggest-tags"))?
            .query(&[("filename", filename)]);
        let body: SuggestedTags = self.send_json(request).await?;
        Ok(normalize(body.tags.unwrap_or_default()))
    }

    #[instrument(skip(self, download_url))]
    async fn fetch_payload(&self, download_url: &str) -> Result<Vec<u8>> {
        let response = self.send(self.http.get(download_url)).await?;
        Ok(response.bytes().await?.to_vec())
    }
}
