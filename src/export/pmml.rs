//! PMML 4.4 export
//!
//! The scaler becomes `DerivedField`s in the transformation dictionary, the
//! imputers become `missingValueReplacement` on mining fields, and the
//! one-hot encoder is expressed natively through `CategoricalPredictor`s.

use chrono::{SecondsFormat, Utc};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use super::{ExportError, ExportFormat, ModelExporter};
use crate::pipeline::FittedPipeline;

pub const PMML_NAMESPACE: &str = "http://www.dmg.org/PMML-4_4";
pub const PMML_VERSION: &str = "4.4";

/// Name of the integer 0/1 target field
pub const TARGET_FIELD: &str = "target";

/// Name of the derived field holding the standardized value of `feature`.
pub fn scaled_field_name(feature: &str) -> String {
    format!("standardScaler({})", feature)
}

/// Encodes a fitted pipeline as a PMML `RegressionModel`
#[derive(Debug, Clone)]
pub struct PmmlExporter {
    /// Embed a description of the pipeline in the header annotation
    pub with_repr: bool,
}

impl Default for PmmlExporter {
    fn default() -> Self {
        Self { with_repr: true }
    }
}

impl PmmlExporter {
    pub fn new(with_repr: bool) -> Self {
        Self { with_repr }
    }
}

impl ModelExporter for PmmlExporter {
    fn format(&self) -> ExportFormat {
        ExportFormat::Pmml
    }

    fn encode(&self, model: &FittedPipeline) -> Result<Vec<u8>, ExportError> {
        let mut doc = PmmlWriter::new();

        doc.decl()?;
        doc.start(
            "PMML",
            &[("xmlns", PMML_NAMESPACE), ("version", PMML_VERSION)],
        )?;

        self.write_header(&mut doc, model)?;
        write_data_dictionary(&mut doc, model)?;
        write_transformations(&mut doc, model)?;
        write_regression_model(&mut doc, model)?;

        doc.end("PMML")?;
        Ok(doc.finish())
    }
}

impl PmmlExporter {
    fn write_header(
        &self,
        doc: &mut PmmlWriter,
        model: &FittedPipeline,
    ) -> Result<(), ExportError> {
        doc.start("Header", &[])?;
        doc.empty(
            "Application",
            &[
                ("name", env!("CARGO_PKG_NAME")),
                ("version", env!("CARGO_PKG_VERSION")),
            ],
        )?;
        if self.with_repr {
            doc.text_element("Annotation", &[], &model.describe())?;
        }
        let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
        doc.text_element("Timestamp", &[], &timestamp)?;
        doc.end("Header")
    }
}

fn write_data_dictionary(doc: &mut PmmlWriter, model: &FittedPipeline) -> Result<(), ExportError> {
    let pre = &model.preprocessor;
    let field_count = (1 + pre.numeric.len() + pre.categorical.len()).to_string();

    doc.start(
        "DataDictionary",
        &[("numberOfFields", field_count.as_str())],
    )?;

    doc.start(
        "DataField",
        &[
            ("name", TARGET_FIELD),
            ("optype", "categorical"),
            ("dataType", "integer"),
        ],
    )?;
    doc.empty("Value", &[("value", "0")])?;
    doc.empty("Value", &[("value", "1")])?;
    doc.end("DataField")?;

    for step in &pre.numeric {
        doc.empty(
            "DataField",
            &[
                ("name", step.name.as_str()),
                ("optype", "continuous"),
                ("dataType", "double"),
            ],
        )?;
    }

    for step in &pre.categorical {
        doc.start(
            "DataField",
            &[
                ("name", step.name.as_str()),
                ("optype", "categorical"),
                ("dataType", "string"),
            ],
        )?;
        for category in &step.categories {
            doc.empty("Value", &[("value", category.as_str())])?;
        }
        doc.end("DataField")?;
    }

    doc.end("DataDictionary")
}

/// `standardScaler(x) = (x - mean) / std`
fn write_transformations(doc: &mut PmmlWriter, model: &FittedPipeline) -> Result<(), ExportError> {
    let pre = &model.preprocessor;
    if pre.numeric.is_empty() {
        return Ok(());
    }

    doc.start("TransformationDictionary", &[])?;
    for step in &pre.numeric {
        let derived = scaled_field_name(step.name.as_str());
        doc.start(
            "DerivedField",
            &[
                ("name", derived.as_str()),
                ("optype", "continuous"),
                ("dataType", "double"),
            ],
        )?;
        doc.start("Apply", &[("function", "/")])?;
        doc.start("Apply", &[("function", "-")])?;
        doc.empty("FieldRef", &[("field", step.name.as_str())])?;
        doc.constant(step.mean)?;
        doc.end("Apply")?;
        doc.constant(step.scale)?;
        doc.end("Apply")?;
        doc.end("DerivedField")?;
    }
    doc.end("TransformationDictionary")
}

fn write_regression_model(doc: &mut PmmlWriter, model: &FittedPipeline) -> Result<(), ExportError> {
    let pre = &model.preprocessor;
    let classifier = &model.classifier;

    doc.start(
        "RegressionModel",
        &[
            ("functionName", "classification"),
            ("algorithmName", "LogisticRegression"),
            ("normalizationMethod", "logit"),
        ],
    )?;

    doc.start("MiningSchema", &[])?;
    doc.empty(
        "MiningField",
        &[("name", TARGET_FIELD), ("usageType", "target")],
    )?;
    for step in &pre.numeric {
        let replacement = step.impute_value.to_string();
        doc.empty(
            "MiningField",
            &[
                ("name", step.name.as_str()),
                ("missingValueReplacement", replacement.as_str()),
            ],
        )?;
    }
    for step in &pre.categorical {
        // Unseen categories match no predictor, i.e. an all-zero encoding
        doc.empty(
            "MiningField",
            &[
                ("name", step.name.as_str()),
                ("missingValueReplacement", step.impute_value.as_str()),
                ("invalidValueTreatment", "asIs"),
            ],
        )?;
    }
    doc.end("MiningSchema")?;

    doc.start("Output", &[])?;
    for class in ["0", "1"] {
        let name = format!("probability({})", class);
        doc.empty(
            "OutputField",
            &[
                ("name", name.as_str()),
                ("optype", "continuous"),
                ("dataType", "double"),
                ("feature", "probability"),
                ("value", class),
            ],
        )?;
    }
    doc.end("Output")?;

    let intercept = classifier.intercept.to_string();
    doc.start(
        "RegressionTable",
        &[("intercept", intercept.as_str()), ("targetCategory", "1")],
    )?;

    let mut weights = classifier.coefficients.iter();
    for step in &pre.numeric {
        let coefficient = weights.next().copied().unwrap_or(0.0).to_string();
        let derived = scaled_field_name(step.name.as_str());
        doc.empty(
            "NumericPredictor",
            &[
                ("name", derived.as_str()),
                ("coefficient", coefficient.as_str()),
            ],
        )?;
    }
    for step in &pre.categorical {
        for category in &step.categories {
            let coefficient = weights.next().copied().unwrap_or(0.0).to_string();
            doc.empty(
                "CategoricalPredictor",
                &[
                    ("name", step.name.as_str()),
                    ("value", category.as_str()),
                    ("coefficient", coefficient.as_str()),
                ],
            )?;
        }
    }
    doc.end("RegressionTable")?;

    doc.empty(
        "RegressionTable",
        &[("intercept", "0.0"), ("targetCategory", "0")],
    )?;

    doc.end("RegressionModel")
}

fn xml_error(e: impl std::fmt::Display) -> ExportError {
    ExportError::Xml(e.to_string())
}

/// Thin event-level wrapper over the quick-xml writer
struct PmmlWriter {
    inner: Writer<Vec<u8>>,
}

impl PmmlWriter {
    fn new() -> Self {
        Self {
            inner: Writer::new_with_indent(Vec::new(), b' ', 2),
        }
    }

    fn write(&mut self, event: Event<'_>) -> Result<(), ExportError> {
        self.inner.write_event(event).map_err(xml_error)
    }

    fn decl(&mut self) -> Result<(), ExportError> {
        let decl = BytesDecl::new("1.0", Some("UTF-8"), Some("yes"));
        self.write(Event::Decl(decl))
    }

    fn element<'a>(name: &'a str, attrs: &[(&'a str, &'a str)]) -> BytesStart<'a> {
        BytesStart::new(name).with_attributes(attrs.iter().copied())
    }

    fn start(&mut self, name: &str, attrs: &[(&str, &str)]) -> Result<(), ExportError> {
        self.write(Event::Start(Self::element(name, attrs)))
    }

    fn empty(&mut self, name: &str, attrs: &[(&str, &str)]) -> Result<(), ExportError> {
        self.write(Event::Empty(Self::element(name, attrs)))
    }

    fn end(&mut self, name: &str) -> Result<(), ExportError> {
        self.write(Event::End(BytesEnd::new(name)))
    }

    fn constant(&mut self, value: f64) -> Result<(), ExportError> {
        self.text_element("Constant", &[("dataType", "double")], &value.to_string())
    }

    fn text_element(
        &mut self,
        name: &str,
        attrs: &[(&str, &str)],
        text: &str,
    ) -> Result<(), ExportError> {
        self.start(name, attrs)?;
        self.write(Event::Text(BytesText::new(text)))?;
        self.end(name)
    }

    fn finish(self) -> Vec<u8> {
        let mut bytes = self.inner.into_inner();
        bytes.push(b'\n');
        bytes
    }
}
