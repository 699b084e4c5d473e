//! The directory view: the last fetched listing plus the transient UI state
//! layered on it, and the user workflows that mutate the backend.
//!
//! Every mutating workflow ends by refetching the whole listing; nothing is
//! patched locally. Each workflow holds an in-flight guard, so triggering the
//! same workflow again while it runs is refused instead of sending duplicate
//! requests.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use super::client::FileDirectory;
use super::describe::FileRow;
use super::index::{FileFilter, FileIndex};
use super::modal::{Modal, ModalCommit};
use super::schema::FileRecord;
use super::selection::{delete_sequentially, BulkDeleteReport, Selection};
use super::toast::{Toast, ToastKind, ToastSlot};
use super::upload::{fetch_suggestions, StagedFile, UploadRequest, UploadSnapshot, UploadWorkflow};
use crate::error::{Error, Result};
use crate::session::{Claims, SessionStore};

/// How long a row shows "copied" after its link was copied.
pub const COPIED_INDICATOR: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Workflow {
    Suggest,
    Upload,
    BulkDelete,
    SaveModal,
    Share,
    CopyLink,
    Download,
}

impl Workflow {
    pub fn label(self) -> &'static str {
        match self {
            Self::Suggest => "Suggestion",
            Self::Upload => "Upload",
            Self::BulkDelete => "Delete",
            Self::SaveModal => "Save",
            Self::Share => "Share",
            Self::CopyLink => "Copy link",
            Self::Download => "Download",
        }
    }
}

#[derive(Default)]
struct InFlight {
    active: Mutex<HashSet<Workflow>>,
}

struct InFlightGuard<'a> {
    owner: &'a InFlight,
    workflow: Workflow,
}

impl InFlight {
    fn enter(&self, workflow: Workflow) -> Result<InFlightGuard<'_>> {
        if !self.active.lock().insert(workflow) {
            tracing::debug!(?workflow, "re-entrant trigger refused");
            return Err(Error::Busy(workflow.label()));
        }
        Ok(InFlightGuard {
            owner: self,
            workflow,
        })
    }

    fn is_active(&self, workflow: Workflow) -> bool {
        self.active.lock().contains(&workflow)
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.owner.active.lock().remove(&self.workflow);
    }
}

struct ViewState {
    index: FileIndex,
    filter: FileFilter,
    selection: Selection,
    modal: Modal,
    toast: ToastSlot,
    upload: UploadWorkflow,
    copied: Option<(String, Instant)>,
}

pub struct Dashboard {
    session: Arc<SessionStore>,
    directory: Arc<dyn FileDirectory>,
    state: Mutex<ViewState>,
    in_flight: InFlight,
    fetch_seq: AtomicU64,
}

impl Dashboard {
    /// The directory view only exists for a logged-in session.
    pub fn new(
        session: Arc<SessionStore>,
        directory: Arc<dyn FileDirectory>,
        toast_ttl: Duration,
    ) -> Result<Self> {
        if !session.is_authenticated() {
            return Err(Error::NotAuthenticated);
        }
        Ok(Self {
            session,
            directory,
            state: Mutex::new(ViewState {
                index: FileIndex::new(),
                filter: FileFilter::default(),
                selection: Selection::new(),
                modal: Modal::default(),
                toast: ToastSlot::new(toast_ttl),
                upload: UploadWorkflow::new(),
                copied: None,
            }),
            in_flight: InFlight::default(),
            fetch_seq: AtomicU64::new(0),
        })
    }

    pub fn claims(&self) -> Option<Claims> {
        self.session.claims()
    }

    fn notify(&self, kind: ToastKind, message: impl Into<String>) {
        self.state.lock().toast.show(kind, message);
    }

    fn notify_error(&self, prefix: &str, err: &Error) {
        self.notify(ToastKind::Error, format!("{prefix}: {err}"));
    }

    // ---- listing ----------------------------------------------------------

    /// Refetch the whole listing and rebuild the taxonomy. Returns the
    /// number of files applied, or `None` when a newer listing had already
    /// been applied and this response was discarded.
    pub async fn refresh(&self) -> Result<Option<usize>> {
        self.fetch().await.inspect_err(|e| self.notify_error("Failed to fetch files", e))
    }

    async fn fetch(&self) -> Result<Option<usize>> {
        let seq = self.fetch_seq.fetch_add(1, Ordering::SeqCst) + 1;
        let files = self.directory.list_files().await?;
        let count = files.len();
        if self.state.lock().index.replace(seq, files) {
            Ok(Some(count))
        } else {
            tracing::debug!(seq, "listing superseded by a newer fetch");
            Ok(None)
        }
    }

    /// Refetch after a workflow. A failure is logged and leaves the
    /// workflow's own toast in place.
    async fn refetch_after(&self, workflow: Workflow) {
        if let Err(e) = self.fetch().await {
            tracing::warn!(?workflow, error = %e, "refetch after workflow failed");
        }
    }

    /// Files passing the current filter, in listing order.
    pub fn visible(&self) -> Vec<FileRecord> {
        let state = self.state.lock();
        let files = state.index.filtered(&state.filter).into_iter().cloned().collect();
        files
    }

    pub fn rows(&self) -> Vec<FileRow> {
        let mut state = self.state.lock();
        let copied = Self::live_copied(&mut state, Instant::now());
        let rows = state
            .index
            .filtered(&state.filter)
            .into_iter()
            .map(|f| {
                let is_copied = copied.as_deref() == Some(f.file_id.as_str());
                FileRow::new(f, state.selection.contains(&f.file_id), is_copied)
            })
            .collect();
        rows
    }

    pub fn all_files(&self) -> Vec<FileRecord> {
        self.state.lock().index.files().to_vec()
    }

    pub fn taxonomy(&self) -> Vec<String> {
        self.state.lock().index.taxonomy().to_vec()
    }

    pub fn filter(&self) -> FileFilter {
        self.state.lock().filter.clone()
    }

    pub fn set_search(&self, search: &str) {
        self.state.lock().filter.set_search(search);
    }

    pub fn set_tag_filter(&self, tag: Option<&str>) {
        self.state.lock().filter.set_tag(tag);
    }

    fn lookup(&self, file_id: &str) -> Result<FileRecord> {
        self.state
            .lock()
            .index
            .get(file_id)
            .cloned()
            .ok_or_else(|| Error::rejected(format!("No file with id {file_id}")))
    }

    // ---- selection --------------------------------------------------------

    pub fn toggle_selection(&self, file_id: &str) -> Result<bool> {
        let file = self.lookup(file_id)?;
        Ok(self.state.lock().selection.toggle(&file))
    }

    pub fn selection(&self) -> Vec<FileRecord> {
        self.state.lock().selection.files().to_vec()
    }

    /// Delete every selected file, one request at a time, after `confirm`
    /// approves. Always refetches and clears the selection afterwards, even
    /// when some deletions failed.
    pub async fn delete_selected<F>(&self, confirm: F) -> Result<BulkDeleteReport>
    where
        F: FnOnce(&[FileRecord]) -> bool,
    {
        let _guard = self.in_flight.enter(Workflow::BulkDelete)?;
        let files = self.selection();
        if files.is_empty() {
            let err = Error::rejected("No files selected!");
            self.notify_error("Delete", &err);
            return Err(err);
        }
        if !confirm(&files) {
            return Err(Error::rejected("Deletion cancelled"));
        }

        let report = delete_sequentially(self.directory.as_ref(), &files).await;
        let kind = if report.all_succeeded() {
            ToastKind::Success
        } else {
            ToastKind::Error
        };
        tracing::info!(attempted = report.attempted, failed = report.failed.len(), "bulk delete finished");
        self.notify(kind, report.summary());

        self.refetch_after(Workflow::BulkDelete).await;
        self.state.lock().selection.clear();
        Ok(report)
    }

    // ---- upload -----------------------------------------------------------

    /// Stage `file` and wait for both suggestions. Editing is disabled
    /// until the slower of the two settles.
    pub async fn stage_upload(&self, file: StagedFile) -> Result<UploadSnapshot> {
        let _guard = self.in_flight.enter(Workflow::Suggest)?;
        let ticket = {
            let mut state = self.state.lock();
            state.upload.select(file);
            state.upload.begin_suggestions()?
        };
        let suggestions = fetch_suggestions(self.directory.as_ref(), &ticket.filename).await;
        let mut state = self.state.lock();
        state.upload.finish_suggestions(&ticket, suggestions);
        Ok(state.upload.snapshot())
    }

    /// Stage `file` for editing without asking for suggestions.
    pub fn stage_upload_plain(&self, file: StagedFile) -> Result<UploadSnapshot> {
        let mut state = self.state.lock();
        state.upload.select(file);
        state.upload.skip_suggestions()?;
        Ok(state.upload.snapshot())
    }

    pub fn upload_state(&self) -> UploadSnapshot {
        self.state.lock().upload.snapshot()
    }

    pub fn set_upload_filename(&self, filename: &str) -> Result<()> {
        self.state.lock().upload.set_filename(filename)
    }

    pub fn set_upload_tags<I, S>(&self, tags: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.state.lock().upload.set_tags(tags)
    }

    pub fn add_upload_tag(&self, tag: &str) -> Result<bool> {
        self.state.lock().upload.add_tag(tag)
    }

    pub fn remove_upload_tag(&self, tag: &str) -> Result<bool> {
        self.state.lock().upload.remove_tag(tag)
    }

    pub fn clear_upload(&self) {
        self.state.lock().upload.clear();
    }

    /// Two-phase upload: allocate a slot, then send the bytes to it. On
    /// success the staging is cleared and the listing refetched; on failure
    /// the staging is kept for a retry.
    pub async fn submit_upload(&self) -> Result<()> {
        let _guard = self.in_flight.enter(Workflow::Upload)?;
        let UploadRequest {
            filename,
            tags,
            bytes,
        } = {
            let mut state = self.state.lock();
            match state.upload.begin_submit() {
                Ok(request) => request,
                Err(e) => {
                    state.toast.show(ToastKind::Error, e.to_string());
                    return Err(e);
                }
            }
        };

        let outcome = async {
            let slot = self.directory.request_upload_slot(&filename, &tags).await?;
            self.directory.put_payload(&slot.upload_url, bytes).await
        }
        .await;

        self.state.lock().upload.finish_submit(outcome.is_ok());
        match outcome {
            Ok(()) => {
                tracing::info!(%filename, "upload complete");
                self.notify(ToastKind::Success, "File uploaded successfully!");
                self.refetch_after(Workflow::Upload).await;
                Ok(())
            }
            Err(e) => {
                self.notify_error("Upload failed", &e);
                Err(e)
            }
        }
    }

    // ---- modals -----------------------------------------------------------

    pub fn open_rename(&self, file_id: &str) -> Result<()> {
        let file = self.lookup(file_id)?;
        self.state.lock().modal.open_rename(&file);
        Ok(())
    }

    pub fn open_tag_editor(&self, file_id: &str) -> Result<()> {
        let file = self.lookup(file_id)?;
        self.state.lock().modal.open_tag_editor(&file);
        Ok(())
    }

    /// Edit the open modal in place.
    pub fn edit_modal<T>(&self, edit: impl FnOnce(&mut Modal) -> Result<T>) -> Result<T> {
        edit(&mut self.state.lock().modal)
    }

    pub fn modal(&self) -> Modal {
        self.state.lock().modal.clone()
    }

    pub fn cancel_modal(&self) {
        self.state.lock().modal.cancel();
    }

    /// Send the modal's change. Closes the modal and refetches on success;
    /// leaves it open with its edits on failure.
    pub async fn save_modal(&self) -> Result<()> {
        let _guard = self.in_flight.enter(Workflow::SaveModal)?;
        let commit = {
            let mut state = self.state.lock();
            match state.modal.commit() {
                Ok(commit) => commit,
                Err(e) => {
                    state.toast.show(ToastKind::Error, e.to_string());
                    return Err(e);
                }
            }
        };

        let outcome = match &commit {
            ModalCommit::Unchanged => {
                self.cancel_modal();
                return Ok(());
            }
            ModalCommit::Rename {
                file_id,
                new_filename,
            } => self
                .directory
                .rename_file(file_id, new_filename)
                .await
                .map(|()| "File renamed successfully!"),
            ModalCommit::SetTags { file_id, tags } => self
                .directory
                .set_tags(file_id, tags)
                .await
                .map(|()| "Tags updated successfully!"),
        };

        match outcome {
            Ok(message) => {
                {
                    let mut state = self.state.lock();
                    state.modal.cancel();
                    state.toast.show(ToastKind::Success, message);
                }
                self.refetch_after(Workflow::SaveModal).await;
                Ok(())
            }
            Err(e) => {
                self.notify_error("Save failed", &e);
                Err(e)
            }
        }
    }

    // ---- sharing and links -------------------------------------------------

    pub async fn share(&self, file_id: &str, recipient: &str) -> Result<String> {
        let _guard = self.in_flight.enter(Workflow::Share)?;
        let recipient = recipient.trim();
        if recipient.is_empty() {
            let err = Error::rejected("Enter a recipient to share with");
            self.notify_error("Share", &err);
            return Err(err);
        }
        match self.directory.share_file(file_id, recipient).await {
            Ok(message) => {
                self.notify(ToastKind::Success, message.clone());
                self.refetch_after(Workflow::Share).await;
                Ok(message)
            }
            Err(e) => {
                self.notify_error("Share failed", &e);
                Err(e)
            }
        }
    }

    /// Resolve a download link and mark the row as copied for a moment.
    pub async fn copy_link(&self, file_id: &str) -> Result<String> {
        let _guard = self.in_flight.enter(Workflow::CopyLink)?;
        match self.directory.request_download_url(file_id).await {
            Ok(url) => {
                {
                    let mut state = self.state.lock();
                    state.copied = Some((file_id.to_string(), Instant::now()));
                    state.toast.show(ToastKind::Success, "Link copied!");
                }
                self.refetch_after(Workflow::CopyLink).await;
                Ok(url)
            }
            Err(e) => {
                self.notify_error("Failed to copy link", &e);
                Err(e)
            }
        }
    }

    fn live_copied(state: &mut ViewState, now: Instant) -> Option<String> {
        match &state.copied {
            Some((id, at)) if now.saturating_duration_since(*at) < COPIED_INDICATOR => Some(id.clone()),
            Some(_) => {
                state.copied = None;
                None
            }
            None => None,
        }
    }

    pub fn copied_file(&self) -> Option<String> {
        self.copied_file_at(Instant::now())
    }

    /// The file whose link was copied, if its indicator is still live at `now`.
    pub fn copied_file_at(&self, now: Instant) -> Option<String> {
        Self::live_copied(&mut self.state.lock(), now)
    }

    /// Resolve the download link and fetch the file's bytes.
    pub async fn download(&self, file_id: &str) -> Result<Vec<u8>> {
        let _guard = self.in_flight.enter(Workflow::Download)?;
        let outcome = async {
            let url = self.directory.request_download_url(file_id).await?;
            self.directory.fetch_payload(&url).await
        }
        .await;
        if let Err(e) = &outcome {
            self.notify_error("Error downloading file", e);
        }
        outcome
    }

    pub fn is_busy(&self, workflow: Workflow) -> bool {
        self.in_flight.is_active(workflow)
    }

    // ---- notifications and session -----------------------------------------

    pub fn toast(&self) -> Option<Toast> {
        self.state.lock().toast.current().cloned()
    }

    pub fn dismiss_toast(&self) {
        self.state.lock().toast.dismiss();
    }

    /// End the session and drop every piece of per-user view state.
    pub fn logout(&self) -> Result<()> {
        {
            let mut state = self.state.lock();
            state.index.clear();
            state.selection.clear();
            state.modal.cancel();
            state.upload.clear();
            state.copied = None;
            state.toast.dismiss();
        }
        self.session.logout()
    }
}
