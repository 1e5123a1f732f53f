//! Tests for the PMML exporter

use std::collections::HashMap;

use penguin_export::export::pmml::{scaled_field_name, PMML_NAMESPACE, TARGET_FIELD};
use penguin_export::export::{export_model, ModelExporter, PmmlExporter};
use penguin_export::pipeline::{sigmoid, FittedPipeline, Record};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use tempfile::TempDir;

#[path = "common/mod.rs"]
mod common;

/// A parsed element with its attributes, text and enclosing element names
#[derive(Debug, Clone)]
struct Element {
    name: String,
    attrs: HashMap<String, String>,
    text: String,
    parents: Vec<String>,
}

impl Element {
    fn attr(&self, key: &str) -> &str {
        self.attrs
            .get(key)
            .map(String::as_str)
            .unwrap_or_else(|| panic!("<{}> has no attribute {}", self.name, key))
    }

    fn within(&self, parent: &str) -> bool {
        self.parents.iter().any(|p| p == parent)
    }
}

fn to_element(start: &BytesStart, parents: &[String]) -> Element {
    let attrs = start
        .attributes()
        .map(|a| {
            let a = a.unwrap();
            (
                String::from_utf8(a.key.as_ref().to_vec()).unwrap(),
                a.unescape_value().unwrap().into_owned(),
            )
        })
        .collect();

    Element {
        name: String::from_utf8(start.name().as_ref().to_vec()).unwrap(),
        attrs,
        text: String::new(),
        parents: parents.to_vec(),
    }
}

/// Flatten a document into elements in document order.
fn parse(xml: &str) -> Vec<Element> {
    let mut reader = Reader::from_str(xml);
    let mut elements: Vec<Element> = Vec::new();
    let mut parents: Vec<String> = Vec::new();
    let mut open: Vec<usize> = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let element = to_element(&e, &parents);
                parents.push(element.name.clone());
                open.push(elements.len());
                elements.push(element);
            }
            Ok(Event::Empty(e)) => elements.push(to_element(&e, &parents)),
            Ok(Event::Text(t)) => {
                if let Some(&i) = open.last() {
                    elements[i].text.push_str(t.unescape().unwrap().trim());
                }
            }
            Ok(Event::End(_)) => {
                parents.pop();
                open.pop();
            }
            Ok(Event::Eof) => break,
            Err(e) => panic!("invalid XML: {e}"),
            _ => {}
        }
    }

    elements
}

fn render(model: &FittedPipeline, with_repr: bool) -> Vec<Element> {
    let bytes = PmmlExporter::new(with_repr).encode(model).unwrap();
    parse(&String::from_utf8(bytes).unwrap())
}

fn named<'a>(elements: &'a [Element], name: &str) -> Vec<&'a Element> {
    elements.iter().filter(|e| e.name == name).collect()
}

/// Score a record the way a PMML consumer would, using only the document.
fn score(
    elements: &[Element],
    numeric: &[(&str, Option<f64>)],
    categorical: &[(&str, Option<&str>)],
) -> f64 {
    let replacements: HashMap<&str, &str> = named(elements, "MiningField")
        .into_iter()
        .filter_map(|f| {
            f.attrs
                .get("missingValueReplacement")
                .map(|r| (f.attr("name"), r.as_str()))
        })
        .collect();

    // standardScaler(x) -> (x, mean, std)
    let mut derived: HashMap<String, (String, Vec<f64>)> = HashMap::new();
    let mut current: Option<String> = None;
    for e in elements {
        match e.name.as_str() {
            "DerivedField" => {
                current = Some(e.attr("name").to_string());
                derived.insert(e.attr("name").to_string(), (String::new(), Vec::new()));
            }
            "FieldRef" => {
                let entry = derived.get_mut(current.as_ref().unwrap()).unwrap();
                entry.0 = e.attr("field").to_string();
            }
            "Constant" => {
                let entry = derived.get_mut(current.as_ref().unwrap()).unwrap();
                entry.1.push(e.text.parse().unwrap());
            }
            _ => {}
        }
    }

    let table = named(elements, "RegressionTable")
        .into_iter()
        .find(|t| t.attr("targetCategory") == "1")
        .unwrap();
    let mut z: f64 = table.attr("intercept").parse().unwrap();

    for predictor in named(elements, "NumericPredictor") {
        let (field, constants) = &derived[predictor.attr("name")];
        let raw = numeric
            .iter()
            .find(|(name, _)| *name == field.as_str())
            .and_then(|(_, v)| *v)
            .unwrap_or_else(|| replacements[field.as_str()].parse().unwrap());
        let coefficient: f64 = predictor.attr("coefficient").parse().unwrap();
        z += coefficient * (raw - constants[0]) / constants[1];
    }

    for predictor in named(elements, "CategoricalPredictor") {
        let field = predictor.attr("name");
        let value = categorical
            .iter()
            .find(|(name, _)| *name == field)
            .and_then(|(_, v)| *v)
            .unwrap_or(replacements[field]);
        if value == predictor.attr("value") {
            z += predictor.attr("coefficient").parse::<f64>().unwrap();
        }
    }

    sigmoid(z)
}

#[test]
fn test_document_header() {
    let model = common::fit_default_model();
    let elements = render(&model, true);

    let root = &elements[0];
    assert_eq!(root.name, "PMML");
    assert_eq!(root.attr("xmlns"), PMML_NAMESPACE);
    assert_eq!(root.attr("version"), "4.4");

    let application = named(&elements, "Application");
    assert_eq!(application[0].attr("name"), "penguin-export");

    let annotation = named(&elements, "Annotation");
    assert_eq!(annotation.len(), 1);
    assert!(annotation[0].text.contains("LogisticRegression"));
    assert_eq!(named(&elements, "Timestamp").len(), 1);
}

#[test]
fn test_no_repr_omits_annotation() {
    let model = common::fit_default_model();
    let elements = render(&model, false);

    assert!(named(&elements, "Annotation").is_empty());
    assert_eq!(named(&elements, "Timestamp").len(), 1);
}

#[test]
fn test_data_dictionary_fields() {
    let model = common::fit_default_model();
    let elements = render(&model, true);

    let dictionary = named(&elements, "DataDictionary")[0];
    assert_eq!(dictionary.attr("numberOfFields"), "3");

    let fields = named(&elements, "DataField");
    let names: Vec<&str> = fields.iter().map(|f| f.attr("name")).collect();
    assert_eq!(names, vec![TARGET_FIELD, "bill_length_mm", "bill_depth_mm"]);

    assert_eq!(fields[0].attr("dataType"), "integer");
    assert_eq!(fields[0].attr("optype"), "categorical");
    let target_values: Vec<&str> = named(&elements, "Value")
        .iter()
        .filter(|v| v.within("DataField"))
        .map(|v| v.attr("value"))
        .collect();
    assert_eq!(target_values, vec!["0", "1"]);

    for field in &fields[1..] {
        assert_eq!(field.attr("optype"), "continuous");
        assert_eq!(field.attr("dataType"), "double");
    }
}

#[test]
fn test_scaler_as_derived_fields() {
    let model = common::fit_default_model();
    let elements = render(&model, true);

    let derived: Vec<&str> = named(&elements, "DerivedField")
        .iter()
        .map(|d| d.attr("name"))
        .collect();
    assert_eq!(
        derived,
        vec![
            scaled_field_name("bill_length_mm"),
            scaled_field_name("bill_depth_mm")
        ]
    );

    let constants: Vec<f64> = named(&elements, "Constant")
        .iter()
        .map(|c| c.text.parse().unwrap())
        .collect();
    let step = &model.preprocessor.numeric[0];
    assert_eq!(constants[0], step.mean);
    assert_eq!(constants[1], step.scale);
}

#[test]
fn test_regression_model_shape() {
    let model = common::fit_default_model();
    let elements = render(&model, true);

    let regression = named(&elements, "RegressionModel")[0];
    assert_eq!(regression.attr("functionName"), "classification");
    assert_eq!(regression.attr("normalizationMethod"), "logit");

    let tables = named(&elements, "RegressionTable");
    assert_eq!(tables.len(), 2);
    assert_eq!(tables[0].attr("targetCategory"), "1");
    assert_eq!(
        tables[0].attr("intercept").parse::<f64>().unwrap(),
        model.classifier.intercept
    );
    assert_eq!(tables[1].attr("targetCategory"), "0");
    assert_eq!(tables[1].attr("intercept").parse::<f64>().unwrap(), 0.0);

    let predictors = named(&elements, "NumericPredictor");
    assert_eq!(predictors.len(), 2);
    assert!(predictors.iter().all(|p| p.within("RegressionTable")));

    let outputs: Vec<&str> = named(&elements, "OutputField")
        .iter()
        .map(|o| o.attr("name"))
        .collect();
    assert_eq!(outputs, vec!["probability(0)", "probability(1)"]);
}

#[test]
fn test_mining_schema_imputation() {
    let model = common::fit_island_model();
    let elements = render(&model, true);

    let fields = named(&elements, "MiningField");
    assert_eq!(fields[0].attr("name"), TARGET_FIELD);
    assert_eq!(fields[0].attr("usageType"), "target");

    let length = fields.iter().find(|f| f.attr("name") == "bill_length_mm").unwrap();
    assert_eq!(
        length.attr("missingValueReplacement").parse::<f64>().unwrap(),
        model.preprocessor.numeric[0].impute_value
    );

    let island = fields.iter().find(|f| f.attr("name") == "island").unwrap();
    assert_eq!(island.attr("missingValueReplacement"), "Biscoe");
    assert_eq!(island.attr("invalidValueTreatment"), "asIs");
}

#[test]
fn test_categorical_predictors_per_category() {
    let model = common::fit_island_model();
    let elements = render(&model, true);

    let predictors = named(&elements, "CategoricalPredictor");
    let values: Vec<&str> = predictors.iter().map(|p| p.attr("value")).collect();
    assert_eq!(values, vec!["Biscoe", "Dream", "Torgersen"]);
    assert!(predictors.iter().all(|p| p.attr("name") == "island"));

    let island_values: Vec<&str> = named(&elements, "Value")
        .iter()
        .skip(2)
        .map(|v| v.attr("value"))
        .collect();
    assert_eq!(island_values, vec!["Biscoe", "Dream", "Torgersen"]);
}

#[test]
fn test_document_scores_match_pipeline() {
    let model = common::fit_default_model();
    let elements = render(&model, true);

    for (length, depth) in [
        (Some(38.0), Some(18.5)),
        (Some(48.0), Some(14.5)),
        (None, Some(16.0)),
        (Some(45.0), None),
    ] {
        let expected = model.predict_proba(&Record::new(vec![length, depth], Vec::new()));
        let actual = score(
            &elements,
            &[("bill_length_mm", length), ("bill_depth_mm", depth)],
            &[],
        );
        assert!(
            (actual - expected[1]).abs() < 1e-9,
            "{length:?}, {depth:?}: document {actual} vs pipeline {}",
            expected[1]
        );
    }
}

#[test]
fn test_island_document_scores_match_pipeline() {
    let model = common::fit_island_model();
    let elements = render(&model, true);

    for island in [Some("Dream"), Some("Torgersen"), Some("Anvers"), None] {
        let expected = model.predict_proba(&Record::new(
            vec![Some(44.0), Some(16.5)],
            vec![island.map(str::to_string)],
        ));
        let actual = score(
            &elements,
            &[("bill_length_mm", Some(44.0)), ("bill_depth_mm", Some(16.5))],
            &[("island", island)],
        );
        assert!(
            (actual - expected[1]).abs() < 1e-9,
            "{island:?}: document {actual} vs pipeline {}",
            expected[1]
        );
    }
}

#[test]
fn test_export_writes_pmml_file() {
    let model = common::fit_default_model();
    let temp_dir = TempDir::new().unwrap();
    let out_dir = temp_dir.path().join("nested").join("model");

    let path = export_model(&PmmlExporter::default(), &model, &out_dir, "penguin").unwrap();

    assert_eq!(path, out_dir.join("penguin.pmml"));
    let xml = std::fs::read_to_string(&path).unwrap();
    assert!(xml.starts_with("<?xml"));
    assert!(!parse(&xml).is_empty());
}
