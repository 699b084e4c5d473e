use serde::{Deserialize, Deserializer, Serialize};

use super::tags::normalize;

/// A file as listed by the backend. Read-only projection: the client
/// replaces the whole list after every mutation and never edits records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    pub file_id: String,
    #[serde(default = "unknown_filename")]
    pub filename: String,
    /// Upload time, epoch seconds.
    #[serde(default, deserialize_with = "epoch_seconds")]
    pub created_at: Option<i64>,
    /// Size in bytes.
    #[serde(default, deserialize_with = "byte_size")]
    pub size: Option<u64>,
    /// Lowercase, deduplicated.
    #[serde(default, deserialize_with = "tag_list")]
    pub tags: Vec<String>,
}

impl FileRecord {
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

fn unknown_filename() -> String {
    "unknown".to_string()
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrText {
    Int(i64),
    Float(f64),
    Text(String),
}

impl NumberOrText {
    fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            Self::Float(f) if f.is_finite() => Some(*f as i64),
            Self::Float(_) => None,
            Self::Text(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()).map(|f| f as i64),
        }
    }
}

// DynamoDB hands `createdAt` back as a decimal string.
fn epoch_seconds<'de, D: Deserializer<'de>>(de: D) -> Result<Option<i64>, D::Error> {
    let raw = Option::<NumberOrText>::deserialize(de)?;
    Ok(raw.as_ref().and_then(NumberOrText::as_i64).filter(|s| *s > 0))
}

fn byte_size<'de, D: Deserializer<'de>>(de: D) -> Result<Option<u64>, D::Error> {
    let raw = Option::<NumberOrText>::deserialize(de)?;
    Ok(raw
        .as_ref()
        .and_then(NumberOrText::as_i64)
        .and_then(|n| u64::try_from(n).ok()))
}

// Null entries inside the array are dropped along with a null array.
fn tag_list<'de, D: Deserializer<'de>>(de: D) -> Result<Vec<String>, D::Error> {
    let raw = Option::<Vec<Option<String>>>::deserialize(de)?;
    Ok(normalize(raw.unwrap_or_default().into_iter().flatten()))
}

/// `GET /files` answers either a bare array or `{"files": [...]}`. Items are
/// kept raw so one unreadable record does not sink the whole listing.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum FileListPayload {
    Bare(Vec<serde_json::Value>),
    Wrapped { files: Vec<serde_json::Value> },
}

impl FileListPayload {
    /// Decode a listing body. Records that fail to decode are skipped with a
    /// warning; only an unrecognised outer shape yields `None`, and the
    /// caller falls back to an empty list.
    pub fn decode(body: &serde_json::Value) -> Option<Vec<FileRecord>> {
        let items = match FileListPayload::deserialize(body) {
            Ok(FileListPayload::Bare(items)) | Ok(FileListPayload::Wrapped { files: items }) => items,
            Err(_) => return None,
        };
        let files = items
            .iter()
            .enumerate()
            .filter_map(|(index, item)| match FileRecord::deserialize(item) {
                Ok(record) => Some(record),
                Err(e) => {
                    tracing::warn!(index, error = %e, "skipping unreadable file record");
                    None
                }
            })
            .collect();
        Some(files)
    }
}

/// Storage location allocated by `POST /upload`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadSlot {
    pub upload_url: String,
    #[serde(default)]
    pub file_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct DownloadLink {
    #[serde(default)]
    pub download_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MessageBody {
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct RenameBody<'a> {
    pub new_filename: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct TagsBody<'a> {
    pub tags: &'a [String],
}

#[derive(Debug, Deserialize)]
pub(crate) struct SuggestedName {
    #[serde(default)]
    pub suggested_name: Option<String>,
}

/// The model may fail server-side and return `{"tags": null}`.
#[derive(Debug, Deserialize)]
pub(crate) struct SuggestedTags {
    #[serde(default)]
    pub tags: Option<Vec<String>>,
}

/// Error body produced by the backend framework.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub detail: Option<serde_json::Value>,
}

impl ErrorBody {
    pub fn message(&self) -> Option<String> {
        match self.detail.as_ref()? {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Null => None,
            other => Some(other.to_string()),
        }
    }
}

/// One turn of an assistant conversation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct ChatRequest<'a> {
    pub messages: &'a [ChatMessage],
    pub model: &'a str,
    pub max_tokens: u32,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatReply {
    #[serde(default)]
    pub content: Vec<ChatBlock>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatBlock {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub text: Option<String>,
}

impl ChatReply {
    /// Text blocks joined by newlines; other block types are skipped.
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter(|b| b.kind == "text")
            .filter_map(|b| b.text.as_deref())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn record_accepts_backend_shape() {
        let rec: FileRecord = serde_json::from_value(json!({
            "fileId": "f1",
            "filename": "Invoice.pdf",
            "createdAt": "1700000000",
            "tags": ["Finance", "invoice", "finance"]
        }))
        .unwrap();
        assert_eq!(rec.created_at, Some(1_700_000_000));
        assert_eq!(rec.size, None);
        assert_eq!(rec.tags, vec!["finance", "invoice"]);
    }

    #[test]
    fn record_tolerates_nulls_and_numbers() {
        let rec: FileRecord = serde_json::from_value(json!({
            "fileId": "f2",
            "filename": "a.txt",
            "createdAt": 1700000001,
            "size": 2048,
            "tags": null
        }))
        .unwrap();
        assert_eq!(rec.created_at, Some(1_700_000_001));
        assert_eq!(rec.size, Some(2048));
        assert!(rec.tags.is_empty());

        let zero: FileRecord =
            serde_json::from_value(json!({ "fileId": "f3", "createdAt": "0" })).unwrap();
        assert_eq!(zero.created_at, None);
        assert_eq!(zero.filename, "unknown");
    }

    #[test]
    fn list_payload_accepts_both_shapes() {
        let bare = json!([{ "fileId": "a", "filename": "x" }]);
        let wrapped = json!({ "files": [{ "fileId": "b", "filename": "y" }] });
        assert_eq!(FileListPayload::decode(&bare).unwrap()[0].file_id, "a");
        assert_eq!(FileListPayload::decode(&wrapped).unwrap()[0].file_id, "b");
        assert!(FileListPayload::decode(&json!({ "items": [] })).is_none());
        assert!(FileListPayload::decode(&json!("nope")).is_none());
    }

    #[test]
    fn one_bad_record_does_not_empty_the_listing() {
        let bare = json!([
            { "fileId": "a", "filename": "a.pdf", "tags": ["x"] },
            { "fileId": "b", "filename": "b.pdf", "tags": ["y", null] },
            { "filename": "orphan.pdf" }
        ]);
        let files = FileListPayload::decode(&bare).unwrap();
        assert_eq!(files.len(), 2);
        assert_eq!(files[1].tags, vec!["y"]);

        let wrapped = json!({ "files": [{ "fileId": "a" }, { "filename": "orphan.pdf" }] });
        let files = FileListPayload::decode(&wrapped).unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].file_id, "a");
    }

    #[test]
    fn error_detail_string_or_structured() {
        let plain: ErrorBody = serde_json::from_value(json!({ "detail": "File not found" })).unwrap();
        assert_eq!(plain.message().as_deref(), Some("File not found"));
        let nested: ErrorBody =
            serde_json::from_value(json!({ "detail": [{ "msg": "field required" }] })).unwrap();
        assert!(nested.message().unwrap().contains("field required"));
        let none: ErrorBody = serde_json::from_value(json!({})).unwrap();
        assert!(none.message().is_none());
    }

    #[test]
    fn chat_reply_joins_text_blocks() {
        let reply: ChatReply = serde_json::from_value(json!({
            "content": [
                { "type": "text", "text": "Lambda runs code." },
                { "type": "tool_use", "id": "x" },
                { "type": "text", "text": "No servers." }
            ]
        }))
        .unwrap();
        assert_eq!(reply.text(), "Lambda runs code.\nNo servers.");
    }
}
