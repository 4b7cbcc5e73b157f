//! Deterministic object keys for archived documents.
//!
//! Layout (existing archives depend on it):
//! - `uploads/{study}/{year}/{code}/{type}[_answers].pdf`
//! - `uploads/{study}/{code}/{type}_{date}[_answers].pdf` when an exam date is given

use super::descriptor::{EXAM_DATE_FORMAT, Filing, UploadDescriptor};
use std::fmt;

pub const KEY_PREFIX: &str = "uploads";
const ANSWERS_SUFFIX: &str = "_answers";
const EXTENSION: &str = "pdf";

/// Slash-delimited location of a document inside the bucket.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectKey(String);

impl ObjectKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ObjectKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl UploadDescriptor {
    /// Derive the archive key. Identical descriptors always yield identical keys.
    pub fn object_key(&self) -> ObjectKey {
        let suffix = if self.answers { ANSWERS_SUFFIX } else { "" };

        let key = match self.filing {
            Filing::ByYear(year) => format!(
                "{KEY_PREFIX}/{}/{}/{}/{}{suffix}.{EXTENSION}",
                self.study, year, self.code, self.kind,
            ),
            Filing::ByDate(date) => format!(
                "{KEY_PREFIX}/{}/{}/{}_{}{suffix}.{EXTENSION}",
                self.study,
                self.code,
                self.kind,
                date.format(EXAM_DATE_FORMAT),
            ),
        };

        ObjectKey(key)
    }
}
