use bytes::Bytes;

/// Extensions the screener accepts. Checked at the HTTP boundary only; the
/// uploader forwards whatever it is given.
pub const ACCEPTED_EXTENSIONS: &[&str] = &[".pdf", ".docx", ".doc"];

/// A resume file as received from the candidate.
#[derive(Debug, Clone)]
pub struct ResumeFile {
    pub name: String,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

impl ResumeFile {
    pub fn new(name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            content_type: None,
            bytes: bytes.into(),
        }
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    pub fn has_accepted_extension(&self) -> bool {
        let name = self.name.to_lowercase();
        ACCEPTED_EXTENSIONS.iter().any(|ext| name.ends_with(ext))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_resume_extensions_case_insensitively() {
        assert!(ResumeFile::new("jane.PDF", "x").has_accepted_extension());
        assert!(ResumeFile::new("jane.docx", "x").has_accepted_extension());
        assert!(ResumeFile::new("jane.doc", "x").has_accepted_extension());
    }

    #[test]
    fn test_rejects_other_extensions() {
        assert!(!ResumeFile::new("jane.txt", "x").has_accepted_extension());
        assert!(!ResumeFile::new("pdf", "x").has_accepted_extension());
    }

    #[test]
    fn test_size_is_byte_length() {
        assert_eq!(ResumeFile::new("a.pdf", vec![0u8; 42]).size(), 42);
    }
}
