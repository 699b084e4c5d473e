//! Upload staging.
//!
//! `Idle -> FileSelected -> SuggestionsLoading -> ReadyToSubmit -> Uploading -> Idle`
//!
//! The state machine itself is synchronous; the network legs run outside it
//! and report back through `finish_*`, so no lock is held while awaiting.

use super::client::FileDirectory;
use super::tags::{canonical, normalize};
use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadPhase {
    Idle,
    FileSelected,
    SuggestionsLoading,
    ReadyToSubmit,
    Uploading,
}

/// A local file chosen for upload.
#[derive(Clone, PartialEq, Eq)]
pub struct StagedFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl std::fmt::Debug for StagedFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StagedFile")
            .field("name", &self.name)
            .field("len", &self.bytes.len())
            .finish()
    }
}

impl StagedFile {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }
}

/// Outcome of the two suggestion calls after fallbacks were applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Suggestions {
    pub filename: String,
    pub tags: Vec<String>,
}

/// Handed out by `begin_suggestions`; results are only accepted for the
/// file that was staged when the ticket was issued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuggestionTicket {
    pub generation: u64,
    pub filename: String,
}

/// Everything `submit` needs, copied out so the staged state survives a
/// failed attempt.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub filename: String,
    pub tags: Vec<String>,
    pub bytes: Vec<u8>,
}

/// Read-only view for rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadSnapshot {
    pub phase: UploadPhase,
    pub staged_name: Option<String>,
    pub filename: String,
    pub tags: Vec<String>,
    pub can_edit: bool,
    pub can_submit: bool,
}

#[derive(Debug, Clone)]
pub struct UploadWorkflow {
    phase: UploadPhase,
    staged: Option<StagedFile>,
    filename: String,
    tags: Vec<String>,
    generation: u64,
}

impl Default for UploadWorkflow {
    fn default() -> Self {
        Self {
            phase: UploadPhase::Idle,
            staged: None,
            filename: String::new(),
            tags: Vec::new(),
            generation: 0,
        }
    }
}

impl UploadWorkflow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> UploadPhase {
        self.phase
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn staged(&self) -> Option<&StagedFile> {
        self.staged.as_ref()
    }

    /// Stage `file`: the original name becomes the placeholder filename and
    /// tags are cleared. Any suggestions still in flight for a previous file
    /// are invalidated.
    pub fn select(&mut self, file: StagedFile) {
        self.filename = file.name.clone();
        self.tags.clear();
        self.staged = Some(file);
        self.generation += 1;
        self.phase = UploadPhase::FileSelected;
    }

    pub fn begin_suggestions(&mut self) -> Result<SuggestionTicket> {
        if self.phase != UploadPhase::FileSelected {
            return Err(Error::rejected("Select a file first!"));
        }
        let filename = match &self.staged {
            Some(file) => file.name.clone(),
            None => return Err(Error::rejected("Select a file first!")),
        };
        self.phase = UploadPhase::SuggestionsLoading;
        Ok(SuggestionTicket {
            generation: self.generation,
            filename,
        })
    }

    /// Apply suggestions for `ticket`. Returns `false` when the ticket is
    /// stale (another file was staged or the staging was cleared).
    pub fn finish_suggestions(&mut self, ticket: &SuggestionTicket, suggestions: Suggestions) -> bool {
        if ticket.generation != self.generation || self.phase != UploadPhase::SuggestionsLoading {
            tracing::debug!(ticket = ticket.generation, current = self.generation, "dropping stale suggestions");
            return false;
        }
        self.filename = suggestions.filename;
        self.tags = normalize(suggestions.tags);
        self.phase = UploadPhase::ReadyToSubmit;
        true
    }

    /// Go straight to editing with the placeholder name and no tags.
    pub fn skip_suggestions(&mut self) -> Result<()> {
        if self.phase != UploadPhase::FileSelected {
            return Err(Error::rejected("Select a file first!"));
        }
        self.phase = UploadPhase::ReadyToSubmit;
        Ok(())
    }

    /// Editors are enabled only once both suggestions have settled.
    pub fn can_edit(&self) -> bool {
        self.phase == UploadPhase::ReadyToSubmit
    }

    pub fn can_submit(&self) -> bool {
        self.can_edit() && self.staged.is_some() && !self.filename.trim().is_empty()
    }

    fn ensure_editable(&self) -> Result<()> {
        match self.phase {
            UploadPhase::ReadyToSubmit => Ok(()),
            UploadPhase::SuggestionsLoading => Err(Error::rejected("Suggestions are still loading")),
            UploadPhase::Uploading => Err(Error::rejected("Upload in progress")),
            UploadPhase::Idle | UploadPhase::FileSelected => Err(Error::rejected("Select a file first!")),
        }
    }

    pub fn set_filename(&mut self, filename: impl Into<String>) -> Result<()> {
        self.ensure_editable()?;
        self.filename = filename.into();
        Ok(())
    }

    pub fn set_tags<I, S>(&mut self, tags: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.ensure_editable()?;
        self.tags = normalize(tags);
        Ok(())
    }

    pub fn add_tag(&mut self, tag: &str) -> Result<bool> {
        self.ensure_editable()?;
        match canonical(tag) {
            Some(tag) if !self.tags.contains(&tag) => {
                self.tags.push(tag);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    pub fn remove_tag(&mut self, tag: &str) -> Result<bool> {
        self.ensure_editable()?;
        let before = self.tags.len();
        if let Some(tag) = canonical(tag) {
            self.tags.retain(|t| *t != tag);
        }
        Ok(self.tags.len() != before)
    }

    /// Validate and move to `Uploading`. Nothing changes on rejection.
    pub fn begin_submit(&mut self) -> Result<UploadRequest> {
        let Some(file) = &self.staged else {
            return Err(Error::rejected("Select a file first!"));
        };
        let filename = self.filename.trim();
        if filename.is_empty() {
            return Err(Error::rejected("Filename cannot be empty"));
        }
        self.ensure_editable()?;
        let request = UploadRequest {
            filename: filename.to_string(),
            tags: self.tags.clone(),
            bytes: file.bytes.clone(),
        };
        self.phase = UploadPhase::Uploading;
        Ok(request)
    }

    /// Success clears the staging; failure returns to `ReadyToSubmit` with
    /// everything intact so the user can retry.
    pub fn finish_submit(&mut self, succeeded: bool) {
        if self.phase != UploadPhase::Uploading {
            return;
        }
        if succeeded {
            self.clear();
        } else {
            self.phase = UploadPhase::ReadyToSubmit;
        }
    }

    pub fn clear(&mut self) {
        self.staged = None;
        self.filename.clear();
        self.tags.clear();
        self.generation += 1;
        self.phase = UploadPhase::Idle;
    }

    pub fn snapshot(&self) -> UploadSnapshot {
        UploadSnapshot {
            phase: self.phase,
            staged_name: self.staged.as_ref().map(|f| f.name.clone()),
            filename: self.filename.clone(),
            tags: self.tags.clone(),
            can_edit: self.can_edit(),
            can_submit: self.can_submit(),
        }
    }
}

/// Ask for a name and tags concurrently and wait for both. Each call falls
/// back on its own: the original filename, or no tags.
pub async fn fetch_suggestions(directory: &dyn FileDirectory, filename: &str) -> Suggestions {
    let (name, tags) = tokio::join!(directory.suggest_name(filename), directory.suggest_tags(filename));
    let filename = match name {
        Ok(name) => name,
        Err(e) => {
            tracing::warn!(error = %e, "name suggestion failed, keeping original");
            filename.to_string()
        }
    };
    let tags = match tags {
        Ok(tags) => tags,
        Err(e) => {
            tracing::warn!(error = %e, "tag suggestion failed");
            Vec::new()
        }
    };
    Suggestions { filename, tags }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docs::testing::FakeDirectory;

    fn staged(name: &str) -> StagedFile {
        StagedFile::new(name, b"jpeg bytes".to_vec())
    }

    #[test]
    fn select_stages_placeholder_and_clears_tags() {
        let mut up = UploadWorkflow::new();
        up.select(staged("a.txt"));
        up.skip_suggestions().unwrap();
        up.set_tags(["x"]).unwrap();
        up.select(staged("IMG_01.jpg"));
        assert_eq!(up.phase(), UploadPhase::FileSelected);
        assert_eq!(up.filename(), "IMG_01.jpg");
        assert!(up.tags().is_empty());
        assert!(!up.can_edit());
    }

    #[test]
    fn editing_locked_while_loading() {
        let mut up = UploadWorkflow::new();
        up.select(staged("a.txt"));
        let ticket = up.begin_suggestions().unwrap();
        assert!(up.set_filename("b.txt").is_err());
        assert!(up.begin_submit().is_err());
        assert!(up.finish_suggestions(
            &ticket,
            Suggestions { filename: "a_clean.txt".into(), tags: vec!["Notes".into()] }
        ));
        assert_eq!(up.filename(), "a_clean.txt");
        assert_eq!(up.tags(), ["notes"]);
        assert!(up.can_submit());
    }

    #[test]
    fn stale_suggestions_are_dropped() {
        let mut up = UploadWorkflow::new();
        up.select(staged("first.txt"));
        let old = up.begin_suggestions().unwrap();
        up.select(staged("second.txt"));
        let fresh = Suggestions { filename: "x".into(), tags: vec![] };
        assert!(!up.finish_suggestions(&old, fresh));
        assert_eq!(up.filename(), "second.txt");
        assert_eq!(up.phase(), UploadPhase::FileSelected);
    }

    #[test]
    fn submit_rejected_without_file_or_name() {
        let mut up = UploadWorkflow::new();
        assert!(matches!(up.begin_submit(), Err(Error::Rejected(_))));

        up.select(staged("a.txt"));
        up.skip_suggestions().unwrap();
        up.set_filename("   ").unwrap();
        assert!(!up.can_submit());
        assert!(matches!(up.begin_submit(), Err(Error::Rejected(_))));
        assert_eq!(up.phase(), UploadPhase::ReadyToSubmit);
    }

    #[test]
    fn failed_submit_keeps_staging() {
        let mut up = UploadWorkflow::new();
        up.select(staged("a.txt"));
        up.skip_suggestions().unwrap();
        up.add_tag("Draft").unwrap();
        let request = up.begin_submit().unwrap();
        assert_eq!(request.filename, "a.txt");
        assert_eq!(up.phase(), UploadPhase::Uploading);
        up.finish_submit(false);
        assert_eq!(up.phase(), UploadPhase::ReadyToSubmit);
        assert_eq!(up.tags(), ["draft"]);
        assert!(up.staged().is_some());

        up.begin_submit().unwrap();
        up.finish_submit(true);
        assert_eq!(up.phase(), UploadPhase::Idle);
        assert!(up.staged().is_none());
    }

    #[test]
    fn tag_edits_normalise() {
        let mut up = UploadWorkflow::new();
        up.select(staged("a.txt"));
        up.skip_suggestions().unwrap();
        assert!(up.add_tag(" Photo ").unwrap());
        assert!(!up.add_tag("photo").unwrap());
        assert!(up.remove_tag("PHOTO").unwrap());
        assert!(!up.remove_tag("photo").unwrap());
    }

    #[tokio::test]
    async fn name_failure_falls_back_tags_still_apply() {
        let dir = FakeDirectory::new(vec![]);
        dir.set_suggestions(None, Some(vec!["photo"]));
        let s = fetch_suggestions(&dir, "IMG_01.jpg").await;
        assert_eq!(s.filename, "IMG_01.jpg");
        assert_eq!(s.tags, vec!["photo"]);
        assert_eq!(dir.count("suggest-"), 2);
    }

    #[tokio::test]
    async fn both_failures_fall_back() {
        let dir = FakeDirectory::new(vec![]);
        dir.set_suggestions(None, None);
        let s = fetch_suggestions(&dir, "report.docx").await;
        assert_eq!(s, Suggestions { filename: "report.docx".into(), tags: vec![] });
    }
}
