//! Study metadata as resolved from the archive.
//!
//! The archive reports a study as an ordered list of series, each an ordered
//! list of instance identifiers. Two payload shapes are accepted for a study:
//!
//! ```text
//! { "Series": [ { "Instances": ["I1", "I2"] } ] }      // inline series
//! { "Series": [ "series-id-1", "series-id-2" ] }        // series references
//! ```
//!
//! Only a reference in first position is resolved, with `GET /series/{id}`
//! answering a single `{ "Instances": [...] }` object. Selection never looks
//! past the first series, so later references stay unresolved. Instance
//! entries may be bare identifiers or objects carrying an `ID` field.

use std::fmt;

use serde::Deserialize;

use crate::error::ArchiveError;

// =============================================================================
// Domain types
// =============================================================================

/// Opaque archive key of a single instance (one image).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InstanceId(String);

impl InstanceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for InstanceId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// One acquisition series, instances in archive-reported order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Series {
    /// Archive key of the series, when the archive reported one
    pub id: Option<String>,

    /// Instances in archive order, empty while unresolved
    pub instances: Vec<InstanceId>,

    /// False for a series reference that was never fetched
    pub resolved: bool,
}

impl Series {
    pub fn new(instances: Vec<InstanceId>) -> Self {
        Self {
            id: None,
            instances,
            resolved: true,
        }
    }

    /// A series known only by its archive key.
    pub fn unresolved(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            instances: Vec::new(),
            resolved: false,
        }
    }
}

/// The resolved Study -> Series -> Instance hierarchy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudyMetadata {
    /// The study key that was resolved
    pub study_id: String,

    /// Series in archive order
    pub series: Vec<Series>,
}

impl StudyMetadata {
    pub fn new(study_id: impl Into<String>, series: Vec<Series>) -> Self {
        Self {
            study_id: study_id.into(),
            series,
        }
    }

    /// Total number of instances across resolved series.
    pub fn instance_count(&self) -> usize {
        self.series.iter().map(|s| s.instances.len()).sum()
    }

    /// Select the image to display: first instance of the first series.
    ///
    /// Returns `NoDisplayableImage` when the study has no series or its first
    /// series has no instances. Later series are never consulted, even when
    /// the first one is empty.
    pub fn displayable_instance(&self) -> Result<&InstanceId, ArchiveError> {
        self.series
            .first()
            .and_then(|series| series.instances.first())
            .ok_or_else(|| ArchiveError::NoDisplayableImage {
                study_id: self.study_id.clone(),
            })
    }
}

// =============================================================================
// Wire format
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct StudyPayload {
    pub(crate) series: Vec<SeriesEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum SeriesEntry {
    /// Series key to be resolved with a follow-up request
    Reference(String),
    /// Series embedded in the study payload
    Inline(SeriesPayload),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct SeriesPayload {
    #[serde(rename = "ID", default)]
    pub(crate) id: Option<String>,
    pub(crate) instances: Vec<InstanceEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum InstanceEntry {
    Id(String),
    Object {
        #[serde(rename = "ID")]
        id: String,
    },
}

impl From<InstanceEntry> for InstanceId {
    fn from(entry: InstanceEntry) -> Self {
        match entry {
            InstanceEntry::Id(id) | InstanceEntry::Object { id } => InstanceId(id),
        }
    }
}

impl SeriesPayload {
    pub(crate) fn into_series(self, fallback_id: Option<String>) -> Series {
        Series {
            id: self.id.or(fallback_id),
            instances: self.instances.into_iter().map(InstanceId::from).collect(),
            resolved: true,
        }
    }
}

impl StudyPayload {
    /// Key of the first series when it must be fetched before selection.
    pub(crate) fn first_reference(&self) -> Option<&str> {
        match self.series.first() {
            Some(SeriesEntry::Reference(id)) => Some(id),
            _ => None,
        }
    }

    /// Build the hierarchy, splicing in the fetched first series.
    ///
    /// Any other reference becomes an unresolved [`Series`].
    pub(crate) fn into_metadata(
        self,
        study_id: &str,
        mut first: Option<SeriesPayload>,
    ) -> StudyMetadata {
        let series = self
            .series
            .into_iter()
            .enumerate()
            .map(|(index, entry)| match entry {
                SeriesEntry::Inline(inline) => inline.into_series(None),
                SeriesEntry::Reference(id) => match first.take().filter(|_| index == 0) {
                    Some(resolved) => resolved.into_series(Some(id)),
                    None => Series::unresolved(id),
                },
            })
            .collect();

        StudyMetadata::new(study_id, series)
    }
}
