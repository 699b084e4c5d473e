/// Broad file category, used to pick an icon for a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileKind {
    Image,
    Pdf,
    Document,
    Spreadsheet,
    Presentation,
    Archive,
    Audio,
    Video,
    Code,
    Text,
    Other,
}

impl FileKind {
    /// Classify by extension (case-insensitive). Names without an
    /// extension are `Other`.
    pub fn from_filename(filename: &str) -> Self {
        let ext = match filename.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() => ext.to_lowercase(),
            _ => return Self::Other,
        };
        match ext.as_str() {
            "png" | "jpg" | "jpeg" | "gif" | "webp" | "bmp" | "svg" | "heic" | "tiff" => Self::Image,
            "pdf" => Self::Pdf,
            "doc" | "docx" | "odt" | "rtf" | "pages" => Self::Document,
            "xls" | "xlsx" | "ods" | "csv" | "numbers" => Self::Spreadsheet,
            "ppt" | "pptx" | "odp" | "key" => Self::Presentation,
            "zip" | "tar" | "gz" | "tgz" | "rar" | "7z" | "bz2" | "xz" => Self::Archive,
            "mp3" | "wav" | "ogg" | "flac" | "m4a" | "aac" => Self::Audio,
            "mp4" | "webm" | "mov" | "avi" | "mkv" => Self::Video,
            "rs" | "py" | "js" | "jsx" | "ts" | "tsx" | "java" | "c" | "h" | "cpp" | "go"
            | "rb" | "sh" | "json" | "xml" | "yaml" | "yml" | "toml" | "html" | "htm" | "css" => {
                Self::Code
            }
            "txt" | "md" | "markdown" | "log" => Self::Text,
            _ => Self::Other,
        }
    }

    pub fn icon(self) -> &'static str {
        match self {
            Self::Image => "🖼️",
            Self::Pdf => "📕",
            Self::Document => "📝",
            Self::Spreadsheet => "📊",
            Self::Presentation => "📽️",
            Self::Archive => "🗜️",
            Self::Audio => "🎵",
            Self::Video => "🎬",
            Self::Code => "💻",
            Self::Text => "📄",
            Self::Other => "📁",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Pdf => "pdf",
            Self::Document => "document",
            Self::Spreadsheet => "spreadsheet",
            Self::Presentation => "presentation",
            Self::Archive => "archive",
            Self::Audio => "audio",
            Self::Video => "video",
            Self::Code => "code",
            Self::Text => "text",
            Self::Other => "file",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispatches_on_extension() {
        assert_eq!(FileKind::from_filename("IMG_01.JPG"), FileKind::Image);
        assert_eq!(FileKind::from_filename("report.final.pdf"), FileKind::Pdf);
        assert_eq!(FileKind::from_filename("Budget_Q4.xlsx"), FileKind::Spreadsheet);
        assert_eq!(FileKind::from_filename("notes.md"), FileKind::Text);
        assert_eq!(FileKind::from_filename("backup.tar.gz"), FileKind::Archive);
    }

    #[test]
    fn no_extension_is_other() {
        assert_eq!(FileKind::from_filename("README"), FileKind::Other);
        assert_eq!(FileKind::from_filename(".bashrc"), FileKind::Other);
        assert_eq!(FileKind::from_filename("weird.unknownext"), FileKind::Other);
        assert_eq!(FileKind::Other.icon(), "📁");
    }
}
