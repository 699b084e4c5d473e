//! Scripted in-memory directory for workflow tests.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Notify;

use super::client::FileDirectory;
use super::schema::{FileRecord, UploadSlot};
use crate::error::{Error, Result};

pub(crate) struct FakeDirectory {
    files: Mutex<Vec<FileRecord>>,
    calls: Mutex<Vec<String>>,
    failing_deletes: Mutex<HashSet<String>>,
    fail_list: Mutex<bool>,
    fail_upload: Mutex<bool>,
    suggested_name: Mutex<Option<String>>,
    suggested_tags: Mutex<Option<Vec<String>>>,
    gates: Mutex<HashMap<&'static str, Arc<Notify>>>,
    next_id: Mutex<u32>,
}

impl FakeDirectory {
    pub fn new(files: Vec<FileRecord>) -> Self {
        Self {
            files: Mutex::new(files),
            calls: Mutex::new(Vec::new()),
            failing_deletes: Mutex::new(HashSet::new()),
            fail_list: Mutex::new(false),
            fail_upload: Mutex::new(false),
            suggested_name: Mutex::new(None),
            suggested_tags: Mutex::new(None),
            gates: Mutex::new(HashMap::new()),
            next_id: Mutex::new(100),
        }
    }

    /// `None` makes the corresponding suggestion call fail.
    pub fn set_suggestions(&self, name: Option<&str>, tags: Option<Vec<&str>>) {
        *self.suggested_name.lock() = name.map(str::to_string);
        *self.suggested_tags.lock() = tags.map(|t| t.into_iter().map(str::to_string).collect());
    }

    /// Hold every `call` ("list", "suggest-name", "slot", "delete",
    /// "rename", "tags") after it is recorded, one release per `notify_one`.
    pub fn gate(&self, call: &'static str) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.gates.lock().insert(call, gate.clone());
        gate
    }

    /// Stop holding new `call`s; ones already waiting stay held.
    pub fn ungate(&self, call: &str) {
        self.gates.lock().remove(call);
    }

    async fn pass_gate(&self, call: &str) {
        let gate = self.gates.lock().get(call).cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }
    }

    pub fn fail_delete(&self, file_id: &str) {
        self.failing_deletes.lock().insert(file_id.to_string());
    }

    pub fn fail_list(&self, fail: bool) {
        *self.fail_list.lock() = fail;
    }

    pub fn fail_upload(&self, fail: bool) {
        *self.fail_upload.lock() = fail;
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    /// Number of recorded calls starting with `prefix`.
    pub fn count(&self, prefix: &str) -> usize {
        self.calls.lock().iter().filter(|c| c.starts_with(prefix)).count()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }

    fn record(&self, call: String) {
        self.calls.lock().push(call);
    }

    fn not_found() -> Error {
        Error::api(404, "File not found")
    }
}

#[async_trait]
impl FileDirectory for FakeDirectory {
    async fn list_files(&self) -> Result<Vec<FileRecord>> {
        self.record("list".into());
        self.pass_gate("list").await;
        if *self.fail_list.lock() {
            return Err(Error::api(500, "Failed to fetch files from database"));
        }
        Ok(self.files.lock().clone())
    }

    async fn request_upload_slot(&self, filename: &str, tags: &[String]) -> Result<UploadSlot> {
        self.record(format!("slot:{filename}:{}", tags.join(",")));
        self.pass_gate("slot").await;
        if *self.fail_upload.lock() {
            return Err(Error::api(400, "Filename cannot be empty"));
        }
        let id = {
            let mut next = self.next_id.lock();
            *next += 1;
            *next
        };
        self.files.lock().push(FileRecord {
            file_id: id.to_string(),
            filename: filename.to_string(),
            created_at: Some(1_700_000_000),
            size: None,
            tags: tags.to_vec(),
        });
        Ok(UploadSlot {
            upload_url: format!("https://storage.test/put/{id}"),
            file_id: Some(id.to_string()),
        })
    }

    async fn put_payload(&self, upload_url: &str, bytes: Vec<u8>) -> Result<()> {
        self.record(format!("put:{upload_url}:{}", bytes.len()));
        Ok(())
    }

    async fn delete_file(&self, file_id: &str) -> Result<()> {
        self.record(format!("delete:{file_id}"));
        self.pass_gate("delete").await;
        if self.failing_deletes.lock().contains(file_id) {
            return Err(Self::not_found());
        }
        self.files.lock().retain(|f| f.file_id != file_id);
        Ok(())
    }

    async fn rename_file(&self, file_id: &str, new_filename: &str) -> Result<()> {
        self.record(format!("rename:{file_id}:{new_filename}"));
        self.pass_gate("rename").await;
        let mut files = self.files.lock();
        let file = files.iter_mut().find(|f| f.file_id == file_id).ok_or_else(Self::not_found)?;
        file.filename = new_filename.to_string();
        Ok(())
    }

    async fn set_tags(&self, file_id: &str, tags: &[String]) -> Result<()> {
        self.record(format!("tags:{file_id}:{}", tags.join(",")));
        self.pass_gate("tags").await;
        let mut files = self.files.lock();
        let file = files.iter_mut().find(|f| f.file_id == file_id).ok_or_else(Self::not_found)?;
        file.tags = tags.to_vec();
        Ok(())
    }

    async fn request_download_url(&self, file_id: &str) -> Result<String> {
        self.record(format!("download:{file_id}"));
        Ok(format!("https://storage.test/get/{file_id}"))
    }

    async fn share_file(&self, file_id: &str, recipient: &str) -> Result<String> {
        self.record(format!("share:{file_id}:{recipient}"));
        Ok(format!("File shared with {recipient}"))
    }

    async fn suggest_name(&self, filename: &str) -> Result<String> {
        self.record(format!("suggest-name:{filename}"));
        self.pass_gate("suggest-name").await;
        let name = self.suggested_name.lock().clone();
        name.ok_or_else(|| Error::api(500, "model unavailable"))
    }

    async fn suggest_tags(&self, filename: &str) -> Result<Vec<String>> {
        self.record(format!("suggest-tags:{filename}"));
        let tags = self.suggested_tags.lock().clone();
        tags.ok_or_else(|| Error::api(500, "model unavailable"))
    }

    async fn fetch_payload(&self, download_url: &str) -> Result<Vec<u8>> {
        self.record(format!("fetch:{download_url}"));
        Ok(b"file contents".to_vec())
    }
}
