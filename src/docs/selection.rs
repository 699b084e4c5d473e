use super::client::FileDirectory;
use super::schema::FileRecord;
use crate::error::Error;

/// Files picked for a bulk action, in the order they were picked.
///
/// Independent of the display filter: a selected file stays selected when
/// it is filtered out of view.
#[derive(Debug, Clone, Default)]
pub struct Selection {
    items: Vec<FileRecord>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flip membership of `file`. Returns whether it is selected now.
    pub fn toggle(&mut self, file: &FileRecord) -> bool {
        if let Some(pos) = self.items.iter().position(|f| f.file_id == file.file_id) {
            self.items.remove(pos);
            false
        } else {
            self.items.push(file.clone());
            true
        }
    }

    pub fn contains(&self, file_id: &str) -> bool {
        self.items.iter().any(|f| f.file_id == file_id)
    }

    pub fn files(&self) -> &[FileRecord] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}

/// Result of a bulk delete. Per-item errors are kept for diagnostics; the
/// user only sees the summary.
#[derive(Debug, Default)]
pub struct BulkDeleteReport {
    pub attempted: usize,
    pub failed: Vec<(FileRecord, Error)>,
}

impl BulkDeleteReport {
    pub fn all_succeeded(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn summary(&self) -> String {
        if self.all_succeeded() {
            format!("Deleted {} file(s).", self.attempted)
        } else {
            format!(
                "Some files failed to delete ({} of {}).",
                self.failed.len(),
                self.attempted
            )
        }
    }
}

/// Delete `files` one at a time so each failure is attributable and does
/// not stop the rest.
pub async fn delete_sequentially(directory: &dyn FileDirectory, files: &[FileRecord]) -> BulkDeleteReport {
    let mut report = BulkDeleteReport::default();
    for file in files {
        report.attempted += 1;
        if let Err(e) = directory.delete_file(&file.file_id).await {
            tracing::warn!(file_id = %file.file_id, filename = %file.filename, error = %e, "delete failed");
            report.failed.push((file.clone(), e));
        }
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docs::index::record;
    use crate::docs::testing::FakeDirectory;

    #[test]
    fn toggle_adds_then_removes() {
        let mut sel = Selection::new();
        let a = record("a", "a.txt", &[]);
        assert!(sel.toggle(&a));
        assert!(sel.contains("a"));
        assert!(!sel.toggle(&a));
        assert!(sel.is_empty());
    }

    #[tokio::test]
    async fn one_call_per_file_in_order() {
        let files = vec![record("1", "a", &[]), record("2", "b", &[]), record("3", "c", &[])];
        let dir = FakeDirectory::new(files.clone());
        dir.fail_delete("2");
        let report = delete_sequentially(&dir, &files).await;
        assert_eq!(report.attempted, 3);
        assert_eq!(dir.calls(), vec!["delete:1", "delete:2", "delete:3"]);
        assert!(!report.all_succeeded());
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0.file_id, "2");
        assert!(report.summary().starts_with("Some files failed"));
    }

    #[tokio::test]
    async fn all_succeeded_when_no_failures() {
        let files = vec![record("1", "a", &[])];
        let dir = FakeDirectory::new(files.clone());
        let report = delete_sequentially(&dir, &files).await;
        assert!(report.all_succeeded());
        assert_eq!(report.summary(), "Deleted 1 file(s).");
    }
}
