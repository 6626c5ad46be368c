//! Core domain types: catalog records and query parameters.

use serde::{Deserialize, Serialize};

/// Default page size for filtered searches.
pub const DEFAULT_MAX_RECORDS: u32 = 10;

// ---------------------------------------------------------------------------
// CatalogRecord
// ---------------------------------------------------------------------------

/// One catalog metadata item as returned by a [`RecordProvider`](crate::RecordProvider).
///
/// Required attributes are plain fields; nullable ones are `Option`s and
/// list-valued ones default to empty. `typename`, `schema` and `xml` are
/// written by the enrichment pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogRecord {
    /// Unique resource identifier.
    pub resource_uid: String,
    pub title: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    #[serde(default)]
    pub contact: Option<String>,
    #[serde(default)]
    pub publication_date: Option<String>,
    #[serde(default)]
    pub begin_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
    pub geo_extent: GeoExtent,
    /// Digital object identifier. An empty string counts as absent, see [`CatalogRecord::doi`].
    #[serde(default)]
    pub doi: Option<String>,
    #[serde(default)]
    pub variables: Vec<Variable>,
    #[serde(default)]
    pub description: Vec<DescriptionTag>,
    #[serde(default)]
    pub documentation: Vec<DocumentationEntry>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub typename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub xml: Option<String>,
}

impl CatalogRecord {
    /// The record's DOI, or `None` when it is missing or empty.
    pub fn doi(&self) -> Option<&str> {
        self.doi.as_deref().filter(|d| !d.is_empty())
    }
}

/// Geographic bounding box of a record.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GeoExtent {
    #[serde(rename = "bboxW")]
    pub west: f64,
    #[serde(rename = "bboxE")]
    pub east: f64,
    #[serde(rename = "bboxS")]
    pub south: f64,
    #[serde(rename = "bboxN")]
    pub north: f64,
}

/// A variable contained in the dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variable {
    pub label: String,
}

/// A key/value description tag such as `data-type` or `file-format`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DescriptionTag {
    pub id: String,
    pub value: String,
}

impl DescriptionTag {
    pub fn new(id: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            value: value.into(),
        }
    }
}

/// A documentation link attached to a record.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DocumentationEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

// ---------------------------------------------------------------------------
// Query parameters
// ---------------------------------------------------------------------------

/// A filter constraint: a SQL `where` fragment with `?` placeholders and the
/// positional values bound to them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Constraint {
    #[serde(rename = "where")]
    pub where_clause: String,
    #[serde(default)]
    pub values: Vec<String>,
}

impl Constraint {
    pub fn new(where_clause: impl Into<String>, values: Vec<String>) -> Self {
        Self {
            where_clause: where_clause.into(),
            values,
        }
    }

    /// A constraint that matches every record.
    pub fn all() -> Self {
        Self::new("1=1", Vec::new())
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// Sort specification for filtered searches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortBy {
    pub property: String,
    #[serde(default)]
    pub order: SortOrder,
}

impl std::str::FromStr for SortBy {
    type Err = crate::DynRepoError;

    /// Parse `property` or `property:asc|desc`.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let (property, order) = match s.split_once(':') {
            Some((p, o)) => (p, o),
            None => (s, "asc"),
        };
        if property.is_empty() {
            return Err(crate::DynRepoError::validation("empty sort property"));
        }
        let order = match order.to_ascii_lowercase().as_str() {
            "asc" => SortOrder::Asc,
            "desc" => SortOrder::Desc,
            other => {
                return Err(crate::DynRepoError::validation(format!(
                    "unknown sort order '{other}'"
                )));
            }
        };
        Ok(Self {
            property: property.to_string(),
            order,
        })
    }
}

/// Sort, type-name filter and pagination options for a filtered search.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryOptions {
    pub sort_by: Option<SortBy>,
    /// Restrict results to these type names. Empty means no restriction.
    pub typenames: Vec<String>,
    pub max_records: u32,
    /// Zero-based offset of the first returned record.
    pub start_position: u32,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            sort_by: None,
            typenames: Vec::new(),
            max_records: DEFAULT_MAX_RECORDS,
            start_position: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_deserializes_with_defaults() {
        let json = r#"{
            "resource_uid": "reanalysis-era5-single-levels",
            "title": "ERA5 hourly data on single levels",
            "abstract": "ERA5 is the fifth generation reanalysis.",
            "geo_extent": {"bboxW": -180, "bboxE": 180, "bboxS": -90, "bboxN": 90}
        }"#;
        let record: CatalogRecord = serde_json::from_str(json).expect("deserialize");
        assert_eq!(record.abstract_text, "ERA5 is the fifth generation reanalysis.");
        assert_eq!(record.geo_extent.west, -180.0);
        assert!(record.keywords.is_empty());
        assert!(record.documentation.is_empty());
        assert!(record.xml.is_none());
    }

    #[test]
    fn empty_doi_counts_as_absent() {
        let json = r#"{
            "resource_uid": "a", "title": "t", "abstract": "x", "doi": "",
            "geo_extent": {"bboxW": 0, "bboxE": 0, "bboxS": 0, "bboxN": 0}
        }"#;
        let record: CatalogRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.doi(), None);
    }

    #[test]
    fn documentation_entry_without_url() {
        let entry: DocumentationEntry = serde_json::from_str(r#"{"title": "no-url"}"#).unwrap();
        assert!(entry.url.is_none());
        assert_eq!(entry.title.as_deref(), Some("no-url"));
        assert!(entry.description.is_none());
    }

    #[test]
    fn sort_by_parsing() {
        let s: SortBy = "title".parse().unwrap();
        assert_eq!(s.order, SortOrder::Asc);
        let s: SortBy = "publication_date:DESC".parse().unwrap();
        assert_eq!(s.property, "publication_date");
        assert_eq!(s.order, SortOrder::Desc);
        assert!("title:sideways".parse::<SortBy>().is_err());
        assert!(":asc".parse::<SortBy>().is_err());
    }

    #[test]
    fn query_options_default_page() {
        let opts = QueryOptions::default();
        assert_eq!(opts.max_records, 10);
        assert_eq!(opts.start_position, 0);
        assert!(opts.typenames.is_empty());
    }

    #[test]
    fn records_fixture_validates() {
        let fixture = std::fs::read_to_string("../../../fixtures/json/records.fixture.json")
            .expect("read fixture");
        let records: Vec<CatalogRecord> =
            serde_json::from_str(&fixture).expect("deserialize fixture records");
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].variables.len(), 3);
        assert_eq!(records[0].documentation[1].url, None);
        assert_eq!(records[1].doi(), None);
        assert!(records[1].end_date.is_some());
    }
}
