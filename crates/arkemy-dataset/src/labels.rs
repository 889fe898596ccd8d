//! Tag columns and their display labels
//!
//! Tag columns keep their column id as the working value everywhere; the
//! label map is only consulted when rendering a name for a person to read.

use crate::table::RawTable;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Prefixes that mark a column as a tag column
pub const TAG_PREFIXES: [&str; 4] = ["project_tag", "phase_tag", "activity_tag", "record_tag"];

/// Column id to display label
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagLabels {
    labels: IndexMap<String, String>,
}

impl TagLabels {
    /// Empty mapping
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a label for a column
    pub fn insert(&mut self, column: impl Into<String>, label: impl Into<String>) {
        self.labels.insert(column.into(), label.into());
    }

    /// Collect labels from sentinel rows
    ///
    /// Every column whose name contains `tag` and whose cell is non-empty
    /// contributes one entry. Later rows override earlier ones.
    #[must_use]
    pub fn from_sentinel_rows<'a>(
        table: &RawTable,
        rows: impl IntoIterator<Item = &'a Vec<Option<String>>>,
    ) -> Self {
        let tag_positions: Vec<(usize, &String)> = table
            .columns()
            .iter()
            .enumerate()
            .filter(|(_, name)| name.to_ascii_lowercase().contains("tag"))
            .collect();

        let mut labels = Self::new();
        for row in rows {
            for &(idx, column) in &tag_positions {
                if let Some(label) = row.get(idx).and_then(Option::as_deref) {
                    let label = label.trim();
                    if !label.is_empty() {
                        labels.insert(column.clone(), label);
                    }
                }
            }
        }
        labels
    }

    /// Mapped label, or the column id itself when unmapped
    #[must_use]
    pub fn display_name<'a>(&'a self, column: &'a str) -> &'a str {
        self.labels.get(column).map_or(column, String::as_str)
    }

    /// Mapped label, if any
    #[inline]
    #[must_use]
    pub fn get(&self, column: &str) -> Option<&str> {
        self.labels.get(column).map(String::as_str)
    }

    /// Number of mapped columns
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Whether no label is mapped
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Mapped pairs in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.labels.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Tag columns of a header, grouped by prefix then numeric suffix
///
/// `project_tag`, `project_tag_1`, `project_tag_2` sort in that order;
/// a suffix that is not a number sorts as index 0.
#[must_use]
pub fn tag_columns<S: AsRef<str>>(columns: &[S]) -> Vec<String> {
    let mut tagged: Vec<(&str, u32, &str)> = columns
        .iter()
        .map(AsRef::as_ref)
        .filter_map(|col| {
            let prefix = TAG_PREFIXES.iter().find(|p| col.starts_with(**p))?;
            let index = col[prefix.len()..]
                .strip_prefix('_')
                .and_then(|rest| rest.parse().ok())
                .unwrap_or(0);
            Some((*prefix, index, col))
        })
        .collect();
    tagged.sort_unstable();
    tagged.into_iter().map(|(_, _, col)| col.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn tag_columns_sorted_by_prefix_then_index() {
        let columns = [
            "record_date",
            "project_tag_2",
            "record_tag_1",
            "project_tag_10",
            "phase_tag",
            "activity_tag_1",
            "project_tag_1",
            "hours_used",
        ];
        assert_eq!(
            tag_columns(&columns),
            vec![
                "activity_tag_1",
                "phase_tag",
                "project_tag_1",
                "project_tag_2",
                "project_tag_10",
                "record_tag_1",
            ]
        );
    }

    #[test]
    fn sentinel_rows_map_tag_columns_only() {
        let mut raw = RawTable::new(["record_kind", "project_tag_1", "phase_tag", "person_name"]);
        raw.push_row(vec![
            Some("label-mapping".to_string()),
            Some("Sector".to_string()),
            None,
            Some("ignored".to_string()),
        ]);
        let labels = TagLabels::from_sentinel_rows(&raw, raw.rows());
        assert_eq!(labels.len(), 1);
        assert_eq!(labels.display_name("project_tag_1"), "Sector");
        assert_eq!(labels.display_name("phase_tag"), "phase_tag");
        assert_eq!(labels.get("person_name"), None);
    }
}
