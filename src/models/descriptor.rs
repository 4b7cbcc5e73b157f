//! Describes an archived document: which study, year and course it belongs to
//! and what kind of document it is.
//!
//! Browsers constrain these fields with `<select>` elements, but nothing stops a
//! client from posting arbitrary values, so every field is validated here before
//! the archive is touched.

use chrono::NaiveDate;
use std::{fmt, str::FromStr};
use thiserror::Error;

/// Date format accepted for the optional exam date (`<input type="date">`).
pub const EXAM_DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DescriptorError {
    #[error("missing form field `{0}`")]
    MissingField(&'static str),
    #[error("invalid {field} `{value}`: expected one of {expected}")]
    InvalidChoice {
        field: &'static str,
        value: String,
        expected: String,
    },
    #[error("invalid course code `{0}`: expected two uppercase letters followed by four digits")]
    InvalidCourseCode(String),
    #[error("invalid exam date `{0}`: expected YYYY-MM-DD")]
    InvalidDate(String),
}

/// Declares a closed set of form choices together with their wire names.
macro_rules! form_choice {
    ($(#[$meta:meta])* $name:ident, $field:literal, { $($variant:ident => $wire:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Name used in form values and object keys.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $wire),+
                }
            }
        }

        impl FromStr for $name {
            type Err = DescriptorError;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                match value {
                    $($wire => Ok($name::$variant),)+
                    other => Err(DescriptorError::InvalidChoice {
                        field: $field,
                        value: other.to_string(),
                        expected: Self::ALL
                            .iter()
                            .map(|choice| choice.as_str())
                            .collect::<Vec<_>>()
                            .join(", "),
                    }),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

form_choice!(
    /// Study programme the document belongs to.
    Study, "study", {
        ComputerScience => "computer-science",
        AppliedMathematics => "applied-mathematics",
    }
);

form_choice!(
    /// Academic year in which the course is taught.
    AcademicYear, "year", {
        FirstYear => "first-year",
        SecondYear => "second-year",
        ThirdYear => "third-year",
        Master => "master",
    }
);

form_choice!(
    /// Kind of archived document.
    DocumentType, "type", {
        Exam => "exam",
        Midterm => "midterm",
        Resit => "resit",
        Summary => "summary",
    }
);

/// Course code such as `CS1010`: two uppercase ASCII letters and four digits.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CourseCode(String);

impl CourseCode {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for CourseCode {
    type Err = DescriptorError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let bytes = value.as_bytes();
        let valid = bytes.len() == 6
            && bytes[..2].iter().all(u8::is_ascii_uppercase)
            && bytes[2..].iter().all(u8::is_ascii_digit);
        if valid {
            Ok(Self(value.to_string()))
        } else {
            Err(DescriptorError::InvalidCourseCode(value.to_string()))
        }
    }
}

impl fmt::Display for CourseCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where in the course tree a document is filed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Filing {
    /// Under the academic year the course is taught in.
    ByYear(AcademicYear),
    /// Directly under the course, with the exam date in the file name.
    ByDate(NaiveDate),
}

/// A validated upload request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadDescriptor {
    pub study: Study,
    pub filing: Filing,
    pub code: CourseCode,
    pub kind: DocumentType,
    pub answers: bool,
}

/// Text fields as they arrive in the multipart body, before validation.
#[derive(Debug, Default, Clone)]
pub struct RawUploadForm {
    pub study: Option<String>,
    pub year: Option<String>,
    pub code: Option<String>,
    pub kind: Option<String>,
    pub answers: Option<String>,
    pub date: Option<String>,
}

impl RawUploadForm {
    /// Record a text field by its form name. Unknown names are ignored.
    pub fn set(&mut self, name: &str, value: String) {
        let slot = match name {
            "study" => &mut self.study,
            "year" => &mut self.year,
            "code" => &mut self.code,
            "type" => &mut self.kind,
            "answers" => &mut self.answers,
            "date" => &mut self.date,
            _ => return,
        };
        *slot = Some(value);
    }

    pub fn validate(self) -> Result<UploadDescriptor, DescriptorError> {
        let study: Study = required(self.study.as_deref(), "study")?.parse()?;
        let code: CourseCode = required(self.code.as_deref(), "code")?.parse()?;
        let kind: DocumentType = required(self.kind.as_deref(), "type")?.parse()?;

        let exam_date = match present(self.date.as_deref()) {
            Some(raw) => Some(
                NaiveDate::parse_from_str(raw, EXAM_DATE_FORMAT)
                    .map_err(|_| DescriptorError::InvalidDate(raw.to_string()))?,
            ),
            None => None,
        };

        // A year sent alongside a date is still checked, but the date decides.
        let year = match present(self.year.as_deref()) {
            Some(raw) => Some(raw.parse::<AcademicYear>()?),
            None => None,
        };
        let filing = match (exam_date, year) {
            (Some(date), _) => Filing::ByDate(date),
            (None, Some(year)) => Filing::ByYear(year),
            (None, None) => return Err(DescriptorError::MissingField("year")),
        };

        Ok(UploadDescriptor {
            study,
            filing,
            code,
            kind,
            answers: is_checked(self.answers.as_deref()),
        })
    }
}

fn present(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn required<'a>(value: Option<&'a str>, field: &'static str) -> Result<&'a str, DescriptorError> {
    present(value).ok_or(DescriptorError::MissingField(field))
}

/// Checkbox semantics: browsers send `on` for a ticked box and omit it otherwise.
fn is_checked(value: Option<&str>) -> bool {
    matches!(
        value.map(str::trim).map(str::to_ascii_lowercase).as_deref(),
        Some("on" | "true" | "1")
    )
}
