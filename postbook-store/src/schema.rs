//! Versioned row schema for the ledger worksheet.
//!
//! ```text
//! V1: Id | Title of Post | Body of Post | Author | Time of creation
//! V2: Id | Title of Post | Body of Post | Author | Time of creation | Fullname
//! ```
//!
//! V1 sheets predate marker tracking; their rows load without a fullname.
//! Flushes always write V2.

use std::fmt;

/// Column headers, in sheet order.
pub const HEADERS: [&str; 6] = [
    "Id",
    "Title of Post",
    "Body of Post",
    "Author",
    "Time of creation",
    "Fullname",
];

pub const COL_ID: usize = 0;
pub const COL_TITLE: usize = 1;
pub const COL_BODY: usize = 2;
pub const COL_AUTHOR: usize = 3;
pub const COL_CREATED_AT: usize = 4;
pub const COL_FULLNAME: usize = 5;

/// Layout of a stored ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaVersion {
    /// Five columns, no fullname.
    V1,
    /// Six columns, fullname last.
    V2,
}

impl SchemaVersion {
    pub const CURRENT: SchemaVersion = SchemaVersion::V2;

    pub fn column_count(self) -> usize {
        match self {
            SchemaVersion::V1 => 5,
            SchemaVersion::V2 => 6,
        }
    }

    pub fn headers(self) -> &'static [&'static str] {
        &HEADERS[..self.column_count()]
    }

    pub fn has_fullname(self) -> bool {
        matches!(self, SchemaVersion::V2)
    }

    /// Detect the schema from a header row. Header matching ignores case and
    /// surrounding whitespace; trailing empty cells are ignored.
    pub fn detect<S: AsRef<str>>(header: &[S]) -> Option<SchemaVersion> {
        let mut cells: Vec<String> = header
            .iter()
            .map(|cell| cell.as_ref().trim().to_ascii_lowercase())
            .collect();
        while cells.last().is_some_and(|cell| cell.is_empty()) {
            cells.pop();
        }

        [SchemaVersion::V2, SchemaVersion::V1]
            .into_iter()
            .find(|version| {
                let expected = version.headers();
                cells.len() == expected.len()
                    && cells
                        .iter()
                        .zip(expected)
                        .all(|(cell, want)| *cell == want.to_ascii_lowercase())
            })
    }
}

impl fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaVersion::V1 => write!(f, "v1"),
            SchemaVersion::V2 => write!(f, "v2"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_current_header() {
        assert_eq!(SchemaVersion::detect(&HEADERS), Some(SchemaVersion::V2));
    }

    #[test]
    fn detects_legacy_header() {
        assert_eq!(
            SchemaVersion::detect(&HEADERS[..5]),
            Some(SchemaVersion::V1)
        );
    }

    #[test]
    fn detection_ignores_case_and_trailing_blanks() {
        let header = [
            " id ",
            "TITLE OF POST",
            "Body of Post",
            "author",
            "Time of Creation",
            "",
            "",
        ];
        assert_eq!(SchemaVersion::detect(&header), Some(SchemaVersion::V1));
    }

    #[test]
    fn unknown_header_is_rejected() {
        assert_eq!(SchemaVersion::detect(&["name", "value"]), None);
        assert_eq!(SchemaVersion::detect::<&str>(&[]), None);
    }
}
