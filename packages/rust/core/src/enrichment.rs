//! Record enrichment.
//!
//! For every record: set the fixed ISO schema identity, derive the template
//! mapping, render it, and attach the result as `xml`. Records are processed
//! one after another with no state shared between them; the first failure
//! aborts the batch.

use tracing::debug;

use dynrepo_shared::{CatalogRecord, DynamicConfig, Result};

use crate::mapping::TemplateVariables;
use crate::render::{FileTemplateRenderer, TemplateRenderer};

/// Type name set on every enriched record.
pub const TYPENAME: &str = "gmd:MD_Metadata";

/// Schema namespace URI set on every enriched record.
pub const SCHEMA_URI: &str = "http://www.isotc211.org/2005/gmd";

/// Set the fixed schema-identity fields.
pub fn add_fixed_fields(record: &mut CatalogRecord) {
    record.typename = Some(TYPENAME.to_string());
    record.schema = Some(SCHEMA_URI.to_string());
}

/// Applies the enrichment pipeline using an injected renderer.
pub struct Enricher<R> {
    renderer: R,
    template_name: String,
}

impl Enricher<FileTemplateRenderer> {
    /// Build an enricher for the `[pycsw-dynamic]` template.
    pub fn from_config(config: &DynamicConfig) -> Result<Self> {
        let template_name = config.template_name()?;
        Ok(Self::new(
            FileTemplateRenderer::from_config(config),
            template_name,
        ))
    }
}

impl<R: TemplateRenderer> Enricher<R> {
    pub fn new(renderer: R, template_name: impl Into<String>) -> Self {
        Self {
            renderer,
            template_name: template_name.into(),
        }
    }

    pub fn template_name(&self) -> &str {
        &self.template_name
    }

    /// Enrich one record in place. Re-enriching recomputes everything from
    /// the record's source attributes and overwrites `xml`.
    pub fn enrich_record(&self, record: &mut CatalogRecord) -> Result<()> {
        debug!(
            resource_uid = %record.resource_uid,
            title = %record.title,
            "enriching record"
        );
        add_fixed_fields(record);

        let variables = TemplateVariables::from_record(record);
        let xml = self.renderer.render(&self.template_name, &variables)?;
        record.xml = Some(xml);
        Ok(())
    }

    /// Enrich every record, in order.
    pub fn enrich_records(&self, records: &mut [CatalogRecord]) -> Result<()> {
        for record in records.iter_mut() {
            self.enrich_record(record)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    use dynrepo_shared::{DescriptionTag, DynRepoError, GeoExtent, Variable};

    /// Renders a compact summary of the mapping and remembers what it saw.
    #[derive(Default)]
    struct RecordingRenderer {
        seen: RefCell<Vec<TemplateVariables>>,
    }

    impl TemplateRenderer for RecordingRenderer {
        fn render(&self, template_name: &str, variables: &TemplateVariables) -> Result<String> {
            self.seen.borrow_mut().push(variables.clone());
            Ok(format!(
                "<{template_name} id=\"{}\" type=\"{}\"/>",
                variables.file_identifier,
                variables.data_type.as_str()
            ))
        }
    }

    struct FailingRenderer;

    impl TemplateRenderer for FailingRenderer {
        fn render(&self, template_name: &str, _: &TemplateVariables) -> Result<String> {
            Err(DynRepoError::Template(format!("cannot load {template_name}")))
        }
    }

    fn record(uid: &str) -> CatalogRecord {
        CatalogRecord {
            resource_uid: uid.into(),
            title: format!("Dataset {uid}"),
            abstract_text: "Abstract".into(),
            contact: None,
            publication_date: None,
            begin_date: None,
            end_date: None,
            keywords: Vec::new(),
            geo_extent: GeoExtent::default(),
            doi: None,
            variables: vec![Variable {
                label: "Wind".into(),
            }],
            description: vec![DescriptionTag::new("data-type", "Gridded")],
            documentation: Vec::new(),
            typename: Some("csw:Record".into()),
            schema: None,
            xml: None,
        }
    }

    #[test]
    fn fixed_fields_overwrite_provider_values() {
        let mut rec = record("a");
        add_fixed_fields(&mut rec);
        assert_eq!(rec.typename.as_deref(), Some("gmd:MD_Metadata"));
        assert_eq!(rec.schema.as_deref(), Some("http://www.isotc211.org/2005/gmd"));
    }

    #[test]
    fn enrich_record_attaches_xml() {
        let renderer = RecordingRenderer::default();
        let enricher = Enricher::new(&renderer, "iso19139.xml");
        let mut rec = record("era5");

        enricher.enrich_record(&mut rec).unwrap();

        assert_eq!(
            rec.xml.as_deref(),
            Some(r#"<iso19139.xml id="era5" type="grid"/>"#)
        );
        assert_eq!(rec.typename.as_deref(), Some(TYPENAME));
        assert_eq!(rec.schema.as_deref(), Some(SCHEMA_URI));
    }

    #[test]
    fn enriching_twice_recomputes_identically() {
        let renderer = RecordingRenderer::default();
        let enricher = Enricher::new(&renderer, "iso.xml");
        let mut rec = record("era5");

        enricher.enrich_record(&mut rec).unwrap();
        let first_xml = rec.xml.clone();
        enricher.enrich_record(&mut rec).unwrap();

        let seen = renderer.seen.borrow();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0], seen[1]);
        assert_eq!(
            seen[1].abstract_md,
            "Abstract\nVariables in the dataset / application are:\nWind"
        );
        assert_eq!(rec.xml, first_xml);
    }

    #[test]
    fn enrich_records_keeps_order() {
        let renderer = RecordingRenderer::default();
        let enricher = Enricher::new(&renderer, "iso.xml");
        let mut records = vec![record("b"), record("a"), record("c")];

        enricher.enrich_records(&mut records).unwrap();

        let ids: Vec<_> = renderer
            .seen
            .borrow()
            .iter()
            .map(|v| v.file_identifier.clone())
            .collect();
        assert_eq!(ids, ["b", "a", "c"]);
        assert!(records.iter().all(|r| r.xml.is_some()));
    }

    #[test]
    fn render_failure_aborts_batch() {
        let enricher = Enricher::new(FailingRenderer, "iso.xml");
        let mut records = vec![record("a"), record("b")];

        let err = enricher.enrich_records(&mut records).unwrap_err();
        assert!(matches!(err, DynRepoError::Template(_)));
        assert!(records.iter().all(|r| r.xml.is_none()));
    }

    #[test]
    fn from_config_uses_template_file_name() {
        let config = DynamicConfig {
            iso_template: "/srv/templates/iso19139.xml".into(),
            strict_undefined: false,
        };
        let enricher = Enricher::from_config(&config).unwrap();
        assert_eq!(enricher.template_name(), "iso19139.xml");
    }
}
