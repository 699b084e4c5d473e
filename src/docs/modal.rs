use super::schema::FileRecord;
use super::tags::{canonical, normalize};
use crate::error::{Error, Result};

/// The one modal that may be open over the directory view. Opening a
/// modal replaces whatever was open before.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Modal {
    #[default]
    Closed,
    Rename {
        file: FileRecord,
        input: String,
    },
    EditTags {
        file: FileRecord,
        /// Working copy; the file's tags are untouched until save.
        working: Vec<String>,
    },
}

/// What saving the modal has to send to the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModalCommit {
    Rename { file_id: String, new_filename: String },
    SetTags { file_id: String, tags: Vec<String> },
    /// Nothing changed; close without a request.
    Unchanged,
}

impl Modal {
    pub fn open_rename(&mut self, file: &FileRecord) {
        *self = Modal::Rename {
            file: file.clone(),
            input: file.filename.clone(),
        };
    }

    pub fn open_tag_editor(&mut self, file: &FileRecord) {
        *self = Modal::EditTags {
            file: file.clone(),
            working: file.tags.clone(),
        };
    }

    pub fn is_open(&self) -> bool {
        !matches!(self, Modal::Closed)
    }

    pub fn target(&self) -> Option<&FileRecord> {
        match self {
            Modal::Closed => None,
            Modal::Rename { file, .. } | Modal::EditTags { file, .. } => Some(file),
        }
    }

    /// Discard edits.
    pub fn cancel(&mut self) {
        *self = Modal::Closed;
    }

    pub fn set_rename_input(&mut self, value: impl Into<String>) -> Result<()> {
        match self {
            Modal::Rename { input, .. } => {
                *input = value.into();
                Ok(())
            }
            _ => Err(Error::rejected("No rename in progress")),
        }
    }

    fn working_tags(&mut self) -> Result<&mut Vec<String>> {
        match self {
            Modal::EditTags { working, .. } => Ok(working),
            _ => Err(Error::rejected("No tag edit in progress")),
        }
    }

    pub fn add_tag(&mut self, tag: &str) -> Result<bool> {
        let working = self.working_tags()?;
        match canonical(tag) {
            Some(tag) if !working.contains(&tag) => {
                working.push(tag);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    pub fn remove_tag(&mut self, tag: &str) -> Result<bool> {
        let working = self.working_tags()?;
        let before = working.len();
        if let Some(tag) = canonical(tag) {
            working.retain(|t| *t != tag);
        }
        Ok(working.len() != before)
    }

    pub fn set_tags<I, S>(&mut self, tags: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        *self.working_tags()? = normalize(tags);
        Ok(())
    }

    /// Work out what saving would send. Rejects an empty rename; a rename to
    /// the current name, or an unchanged tag set, needs no request.
    pub fn commit(&self) -> Result<ModalCommit> {
        match self {
            Modal::Closed => Err(Error::rejected("Nothing to save")),
            Modal::Rename { file, input } => {
                let new_filename = input.trim();
                if new_filename.is_empty() {
                    return Err(Error::rejected("Filename cannot be empty"));
                }
                if new_filename == file.filename {
                    return Ok(ModalCommit::Unchanged);
                }
                Ok(ModalCommit::Rename {
                    file_id: file.file_id.clone(),
                    new_filename: new_filename.to_string(),
                })
            }
            Modal::EditTags { file, working } => {
                let mut old = file.tags.clone();
                let mut new = working.clone();
                old.sort();
                new.sort();
                if old == new {
                    return Ok(ModalCommit::Unchanged);
                }
                Ok(ModalCommit::SetTags {
                    file_id: file.file_id.clone(),
                    tags: working.clone(),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docs::index::record;

    #[test]
    fn opening_one_modal_replaces_the_other() {
        let a = record("a", "a.txt", &["x"]);
        let b = record("b", "b.txt", &[]);
        let mut modal = Modal::default();
        modal.open_rename(&a);
        modal.open_tag_editor(&b);
        assert!(matches!(&modal, Modal::EditTags { file, .. } if file.file_id == "b"));
        assert!(modal.set_rename_input("z").is_err());
    }

    #[test]
    fn rename_to_same_trimmed_name_is_noop() {
        let mut modal = Modal::default();
        modal.open_rename(&record("a", "a.txt", &[]));
        modal.set_rename_input("  a.txt ").unwrap();
        assert_eq!(modal.commit().unwrap(), ModalCommit::Unchanged);
    }

    #[test]
    fn empty_rename_rejected() {
        let mut modal = Modal::default();
        modal.open_rename(&record("a", "a.txt", &[]));
        modal.set_rename_input("   ").unwrap();
        assert!(matches!(modal.commit(), Err(Error::Rejected(_))));
    }

    #[test]
    fn rename_commit_is_trimmed() {
        let mut modal = Modal::default();
        modal.open_rename(&record("a", "a.txt", &[]));
        modal.set_rename_input(" b.txt ").unwrap();
        assert_eq!(
            modal.commit().unwrap(),
            ModalCommit::Rename { file_id: "a".into(), new_filename: "b.txt".into() }
        );
    }

    #[test]
    fn tag_edits_stay_on_working_copy_until_save() {
        let file = record("a", "a.txt", &["x", "y"]);
        let mut modal = Modal::default();
        modal.open_tag_editor(&file);
        assert!(modal.add_tag("Z").unwrap());
        assert!(modal.remove_tag("x").unwrap());
        assert_eq!(file.tags, vec!["x", "y"]);
        assert_eq!(
            modal.commit().unwrap(),
            ModalCommit::SetTags { file_id: "a".into(), tags: vec!["y".into(), "z".into()] }
        );
        modal.cancel();
        assert!(!modal.is_open());
    }

    #[test]
    fn reordered_tags_are_unchanged() {
        let mut modal = Modal::default();
        modal.open_tag_editor(&record("a", "a.txt", &["x", "y"]));
        modal.set_tags(["y", "x"]).unwrap();
        assert_eq!(modal.commit().unwrap(), ModalCommit::Unchanged);
    }
}
