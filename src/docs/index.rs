use std::collections::BTreeSet;

use super::schema::FileRecord;
use super::tags::canonical;

/// Sorted, deduplicated union of every file's tags.
pub fn taxonomy(files: &[FileRecord]) -> Vec<String> {
    files
        .iter()
        .flat_map(|f| f.tags.iter().cloned())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Display filter: filename substring (case-insensitive) AND optional tag.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileFilter {
    search: String,
    tag: Option<String>,
}

impl FileFilter {
    pub fn new(search: impl Into<String>, tag: Option<&str>) -> Self {
        let mut filter = Self::default();
        filter.set_search(search);
        filter.set_tag(tag);
        filter
    }

    /// Case-insensitive substring; whitespace is part of the needle.
    pub fn set_search(&mut self, search: impl Into<String>) {
        self.search = search.into().to_lowercase();
    }

    /// Select a tag to filter by; `None` or a blank tag clears it.
    pub fn set_tag(&mut self, tag: Option<&str>) {
        self.tag = tag.and_then(canonical);
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    pub fn is_empty(&self) -> bool {
        self.search.is_empty() && self.tag.is_none()
    }

    pub fn matches(&self, file: &FileRecord) -> bool {
        let name_ok =
            self.search.is_empty() || file.filename.to_lowercase().contains(&self.search);
        let tag_ok = self.tag.as_deref().map_or(true, |t| file.has_tag(t));
        name_ok && tag_ok
    }

    /// Keep matching files, preserving order.
    pub fn apply<'a, I>(&self, files: I) -> Vec<&'a FileRecord>
    where
        I: IntoIterator<Item = &'a FileRecord>,
    {
        files.into_iter().filter(|f| self.matches(f)).collect()
    }
}

/// The last successful listing plus the taxonomy derived from it.
///
/// Replaced wholesale on every fetch; no record is ever edited in place.
#[derive(Debug, Clone, Default)]
pub struct FileIndex {
    files: Vec<FileRecord>,
    taxonomy: Vec<String>,
    generation: u64,
}

impl FileIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Swap in a fresh listing. Returns `false` and keeps the current data
    /// when `generation` is not newer than the one already applied, so a
    /// slow earlier fetch cannot overwrite a later one.
    pub fn replace(&mut self, generation: u64, files: Vec<FileRecord>) -> bool {
        if generation <= self.generation {
            tracing::debug!(generation, current = self.generation, "dropping stale listing");
            return false;
        }
        self.taxonomy = taxonomy(&files);
        self.files = files;
        self.generation = generation;
        true
    }

    pub fn clear(&mut self) {
        self.files.clear();
        self.taxonomy.clear();
    }

    pub fn files(&self) -> &[FileRecord] {
        &self.files
    }

    pub fn taxonomy(&self) -> &[String] {
        &self.taxonomy
    }

    pub fn get(&self, file_id: &str) -> Option<&FileRecord> {
        self.files.iter().find(|f| f.file_id == file_id)
    }

    pub fn filtered(&self, filter: &FileFilter) -> Vec<&FileRecord> {
        filter.apply(&self.files)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

#[cfg(test)]
pub(crate) fn record(id: &str, filename: &str, tags: &[&str]) -> FileRecord {
    FileRecord {
        file_id: id.to_string(),
        filename: filename.to_string(),
        created_at: Some(1_700_000_000),
        size: None,
        tags: tags.iter().map(|t| t.to_string()).collect(),
    }
}
