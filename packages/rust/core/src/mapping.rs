//! Template variable derivation.
//!
//! [`TemplateVariables::from_record`] turns one [`CatalogRecord`] into the
//! flat mapping the ISO 19139 template is rendered against. Keys and values
//! are fixed by the deployed template; most are copies or deployment
//! constants, a few are derived (abstract, doi, resource URL, data type, file
//! format, documents).

use std::borrow::Cow;

use serde::Serialize;

use dynrepo_shared::{CatalogRecord, DescriptionTag, DocumentationEntry};

/// Organisation responsible for both the metadata and the dataset.
pub const ORGANISATION: &str = "ECMWF";
pub const METADATA_CONTACT_ROLE: &str = "pointOfContact";
pub const DATASET_CONTACT_ROLE: &str = "publisher";
pub const MD_STANDARD_NAME: &str = "ISO 19115:2003/19139";
pub const MD_STANDARD_VERSION: &str = "1.0";
pub const LICENCE_URL: &str =
    "https://cds.climate.copernicus.eu/api/v2/terms/static/20180314_Copernicus_License_V1.1.pdf";
pub const USE_LIMITATION: &str = "Content accessible through the CDS may only be used under the terms of the licenses attributed to each particular resource.";
pub const TOPIC: &str = "climatologyMeteorologyAtmosphere";
pub const RESOURCE_TYPE: &str = "dataset";
pub const LINEAGE: &str = "EC Copernicus program";
pub const FORMAT_VERSION: &str = "N/A";

/// Dataset landing page prefix; the DOI (or [`UNKNOWN`]) is appended.
pub const RESOURCE_BASE_URL: &str = "https://cds.climate.copernicus.eu/cdsapp#!/dataset/";

/// Line placed between the abstract and the variable list.
pub const VARIABLES_HEADING: &str = "\nVariables in the dataset / application are:\n";

pub const UNKNOWN: &str = "unknown";

const DATA_TYPE_TAG: &str = "data-type";
const FILE_FORMAT_TAG: &str = "file-format";
const GRIDDED: &str = "Gridded";

/// Spatial representation of a dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    Grid,
    Vector,
}

impl DataType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Grid => "grid",
            Self::Vector => "vector",
        }
    }
}

/// A documentation link as the template sees it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Document {
    pub document_url: String,
    pub document_title: Option<String>,
    pub document_description: Option<String>,
}

/// The mapping one record is rendered against.
///
/// Serializes to the exact key set the template expects; `doi` is omitted
/// entirely when the record has none, `creationdate` is always null.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TemplateVariables {
    pub file_identifier: String,
    pub responsible_organisation: &'static str,
    pub contactemail: Option<String>,
    pub responsible_organisation_role: &'static str,
    pub md_standard_name: &'static str,
    pub md_standard_vs: &'static str,
    pub title: String,
    pub abstract_md: String,
    pub publicationdate: Option<String>,
    pub creationdate: Option<String>,
    pub ds_responsible_organisation: &'static str,
    pub ds_contactemail: Option<String>,
    pub ds_responsible_organisation_role: &'static str,
    pub keywords: Vec<String>,
    pub licence_list: Vec<&'static str>,
    pub use_limitation: &'static str,
    pub topic: &'static str,
    #[serde(rename = "bboxW")]
    pub bbox_w: f64,
    #[serde(rename = "bboxE")]
    pub bbox_e: f64,
    #[serde(rename = "bboxS")]
    pub bbox_s: f64,
    #[serde(rename = "bboxN")]
    pub bbox_n: f64,
    pub begin_date: Option<String>,
    pub end_date: Option<String>,
    pub resource_url: String,
    pub resource_type: &'static str,
    pub lineage: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doi: Option<String>,
    pub data_type: DataType,
    pub file_format: String,
    pub format_version: &'static str,
    pub documents: Vec<Document>,
}

impl TemplateVariables {
    /// Derive the template mapping for `record`. Pure: the same record always
    /// yields the same mapping.
    pub fn from_record(record: &CatalogRecord) -> Self {
        let doi = record.doi().map(String::from);
        let (data_type, file_format) = classify(&record.description);

        Self {
            file_identifier: record.resource_uid.clone(),
            responsible_organisation: ORGANISATION,
            contactemail: record.contact.clone(),
            responsible_organisation_role: METADATA_CONTACT_ROLE,
            md_standard_name: MD_STANDARD_NAME,
            md_standard_vs: MD_STANDARD_VERSION,
            title: record.title.clone(),
            abstract_md: abstract_md(record),
            publicationdate: record.publication_date.clone(),
            creationdate: None,
            ds_responsible_organisation: ORGANISATION,
            ds_contactemail: record.contact.clone(),
            ds_responsible_organisation_role: DATASET_CONTACT_ROLE,
            keywords: record.keywords.clone(),
            licence_list: vec![LICENCE_URL],
            use_limitation: USE_LIMITATION,
            topic: TOPIC,
            bbox_w: record.geo_extent.west,
            bbox_e: record.geo_extent.east,
            bbox_s: record.geo_extent.south,
            bbox_n: record.geo_extent.north,
            begin_date: record.begin_date.clone(),
            end_date: record.end_date.clone(),
            resource_url: resource_url(doi.as_deref()),
            resource_type: RESOURCE_TYPE,
            lineage: LINEAGE,
            doi,
            data_type,
            file_format,
            format_version: FORMAT_VERSION,
            documents: documents(&record.documentation),
        }
    }
}

/// Escape `&`, `<` and `>` for inclusion in XML text. Quotes are kept as-is.
pub fn escape_xml(text: &str) -> Cow<'_, str> {
    quick_xml::escape::partial_escape(text)
}

/// Escaped abstract, followed by the sorted variable labels when there are any.
fn abstract_md(record: &CatalogRecord) -> String {
    let mut text = escape_xml(&record.abstract_text).into_owned();

    let mut labels: Vec<String> = record
        .variables
        .iter()
        .map(|v| escape_xml(&v.label).into_owned())
        .collect();
    if !labels.is_empty() {
        labels.sort();
        text.push_str(VARIABLES_HEADING);
        text.push_str(&labels.join(", "));
    }
    text
}

fn resource_url(doi: Option<&str>) -> String {
    format!("{RESOURCE_BASE_URL}{}", doi.unwrap_or(UNKNOWN))
}

/// Scan the description tags for the data type and file format.
///
/// Any `data-type = Gridded` tag makes the record a grid. Every
/// `file-format` tag overwrites the previous one, so the last one wins.
fn classify(tags: &[DescriptionTag]) -> (DataType, String) {
    let mut is_grid = false;
    let mut file_format = UNKNOWN.to_string();

    for tag in tags {
        if tag.id == DATA_TYPE_TAG && tag.value == GRIDDED {
            is_grid = true;
        } else if tag.id == FILE_FORMAT_TAG {
            file_format = tag.value.clone();
        }
    }

    let data_type = if is_grid {
        DataType::Grid
    } else {
        DataType::Vector
    };
    (data_type, file_format)
}

/// Documentation entries that carry a URL; the rest are dropped.
fn documents(entries: &[DocumentationEntry]) -> Vec<Document> {
    entries
        .iter()
        .filter_map(|entry| {
            let url = entry.url.as_deref().filter(|u| !u.is_empty())?;
            Some(Document {
                document_url: url.to_string(),
                document_title: entry.title.clone(),
                document_description: entry.description.clone(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use dynrepo_shared::{GeoExtent, Variable};

    fn base_record() -> CatalogRecord {
        CatalogRecord {
            resource_uid: "reanalysis-era5-pressure-levels".into(),
            title: "ERA5 hourly data on pressure levels".into(),
            abstract_text: "ERA5 is the fifth generation ECMWF reanalysis.".into(),
            contact: Some("copernicus-support@ecmwf.int".into()),
            publication_date: Some("2018-06-14".into()),
            begin_date: Some("1940-01-01".into()),
            end_date: Some("2024-05-31".into()),
            keywords: vec!["Product type: Reanalysis".into()],
            geo_extent: GeoExtent {
                west: -180.0,
                east: 180.0,
                south: -90.0,
                north: 90.0,
            },
            doi: None,
            variables: Vec::new(),
            description: Vec::new(),
            documentation: Vec::new(),
            typename: None,
            schema: None,
            xml: None,
        }
    }

    fn labels(names: &[&str]) -> Vec<Variable> {
        names
            .iter()
            .map(|l| Variable {
                label: (*l).to_string(),
            })
            .collect()
    }

    #[test]
    fn abstract_without_variables_is_only_escaped() {
        let mut record = base_record();
        record.abstract_text = "Temperature <2m> & wind".into();
        let vars = TemplateVariables::from_record(&record);
        assert_eq!(vars.abstract_md, "Temperature &lt;2m&gt; &amp; wind");
    }

    #[test]
    fn escaping_leaves_quotes() {
        assert_eq!(escape_xml(r#"say "hi" & 'bye'"#), r#"say "hi" &amp; 'bye'"#);
    }

    #[test]
    fn variable_labels_sorted_and_appended() {
        let mut record = base_record();
        record.abstract_text = "Abstract.".into();
        record.variables = labels(&["Wind", "Air"]);
        let vars = TemplateVariables::from_record(&record);
        assert_eq!(
            vars.abstract_md,
            "Abstract.\nVariables in the dataset / application are:\nAir, Wind"
        );
    }

    #[test]
    fn variable_labels_escaped_before_sorting() {
        let mut record = base_record();
        record.variables = labels(&["b<c", "a&b", "B"]);
        let vars = TemplateVariables::from_record(&record);
        assert!(vars.abstract_md.ends_with("B, a&amp;b, b&lt;c"));
    }

    #[test]
    fn doi_absent_from_mapping_when_missing_or_empty() {
        for doi in [None, Some(String::new())] {
            let mut record = base_record();
            record.doi = doi;
            let vars = TemplateVariables::from_record(&record);
            assert_eq!(vars.doi, None);
            assert_eq!(vars.resource_url, format!("{RESOURCE_BASE_URL}unknown"));

            let json = serde_json::to_value(&vars).unwrap();
            assert!(json.get("doi").is_none());
        }
    }

    #[test]
    fn doi_present_and_used_in_resource_url() {
        let mut record = base_record();
        record.doi = Some("10.24381/cds.bd0915c6".into());
        let vars = TemplateVariables::from_record(&record);
        assert_eq!(vars.doi.as_deref(), Some("10.24381/cds.bd0915c6"));
        assert_eq!(
            vars.resource_url,
            "https://cds.climate.copernicus.eu/cdsapp#!/dataset/10.24381/cds.bd0915c6"
        );

        let json = serde_json::to_value(&vars).unwrap();
        assert_eq!(json["doi"], "10.24381/cds.bd0915c6");
    }

    #[test]
    fn data_type_classification() {
        let cases: [(Vec<DescriptionTag>, DataType); 4] = [
            (vec![DescriptionTag::new("data-type", "Gridded")], DataType::Grid),
            (vec![], DataType::Vector),
            (vec![DescriptionTag::new("data-type", "Point")], DataType::Vector),
            (
                vec![
                    DescriptionTag::new("data-type", "Point"),
                    DescriptionTag::new("data-type", "Gridded"),
                ],
                DataType::Grid,
            ),
        ];
        for (tags, expected) in cases {
            let (data_type, _) = classify(&tags);
            assert_eq!(data_type, expected, "tags: {tags:?}");
        }
    }

    #[test]
    fn file_format_defaults_and_last_wins() {
        let (_, format) = classify(&[]);
        assert_eq!(format, "unknown");

        let (data_type, format) = classify(&[
            DescriptionTag::new("file-format", "GRIB"),
            DescriptionTag::new("data-type", "Gridded"),
            DescriptionTag::new("file-format", "NetCDF"),
        ]);
        assert_eq!(data_type, DataType::Grid);
        assert_eq!(format, "NetCDF");
    }

    #[test]
    fn documents_require_url() {
        let entries = vec![
            DocumentationEntry {
                url: Some("a".into()),
                title: Some("T".into()),
                description: Some("D".into()),
            },
            DocumentationEntry {
                url: None,
                title: Some("no-url".into()),
                description: None,
            },
            DocumentationEntry {
                url: Some(String::new()),
                title: Some("empty-url".into()),
                description: None,
            },
        ];
        let docs = documents(&entries);
        assert_eq!(
            docs,
            vec![Document {
                document_url: "a".into(),
                document_title: Some("T".into()),
                document_description: Some("D".into()),
            }]
        );
    }

    #[test]
    fn constants_and_copies() {
        let vars = TemplateVariables::from_record(&base_record());
        assert_eq!(vars.file_identifier, "reanalysis-era5-pressure-levels");
        assert_eq!(vars.responsible_organisation, "ECMWF");
        assert_eq!(vars.ds_responsible_organisation_role, "publisher");
        assert_eq!(vars.contactemail, vars.ds_contactemail);
        assert_eq!(vars.licence_list, vec![LICENCE_URL]);
        assert_eq!(vars.creationdate, None);
        assert_eq!(vars.format_version, "N/A");
        assert_eq!(vars.bbox_s, -90.0);

        let json = serde_json::to_value(&vars).unwrap();
        assert!(json["creationdate"].is_null());
        assert_eq!(json["bboxW"], -180.0);
        assert_eq!(json["data_type"], "vector");
        assert_eq!(json["topic"], "climatologyMeteorologyAtmosphere");
    }

    #[test]
    fn derivation_is_deterministic() {
        let mut record = base_record();
        record.variables = labels(&["Wind", "Air"]);
        record.description = vec![DescriptionTag::new("file-format", "GRIB")];
        let first = TemplateVariables::from_record(&record);
        let second = TemplateVariables::from_record(&record);
        assert_eq!(first, second);
    }

    #[test]
    fn fixture_records_map_as_expected() {
        let fixture = std::fs::read_to_string("../../../fixtures/json/records.fixture.json")
            .expect("read fixture");
        let records: Vec<CatalogRecord> = serde_json::from_str(&fixture).expect("deserialize");

        let era5 = TemplateVariables::from_record(&records[0]);
        assert!(era5.abstract_md.ends_with(
            "are:\n10m u-component of wind, 2m temperature, Total precipitation"
        ));
        assert_eq!(era5.data_type, DataType::Grid);
        assert_eq!(era5.file_format, "GRIB");
        assert_eq!(era5.documents.len(), 1);
        assert_eq!(era5.doi.as_deref(), Some("10.24381/cds.adbb2d47"));

        let insitu = TemplateVariables::from_record(&records[1]);
        assert_eq!(
            insitu.abstract_md,
            "Surface observations from land stations &lt;sub-daily &amp; monthly&gt;."
        );
        assert_eq!(insitu.data_type, DataType::Vector);
        assert_eq!(insitu.file_format, "CSV");
        assert!(insitu.documents.is_empty());
        assert_eq!(insitu.doi, None);
        assert!(insitu.resource_url.ends_with("/dataset/unknown"));
    }
}
