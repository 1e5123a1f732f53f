//! ONNX export
//!
//! Builds the same graph skl2onnx emits for an imputer + scaler + logistic
//! regression pipeline, using the `ai.onnx.ml` operators:
//!
//! ```text
//! input ─ Imputer ─ Scaler ─────────────┐
//! <cat> ─ OneHotEncoder ─ Flatten ──────┼─ Concat ─ LinearClassifier ─┬─ label
//!                                       │                             └─ Normalizer ─ probabilities
//! ```

pub mod proto;

use std::collections::HashSet;

use prost::Message;

use super::{ExportError, ExportFormat, ModelExporter};
use crate::pipeline::FittedPipeline;
use proto::{
    data_type, AttributeProto, GraphProto, ModelProto, NodeProto, OperatorSetIdProto,
    StringStringEntryProto, ValueInfoProto,
};

pub const MIN_OPSET: i64 = 9;
pub const MAX_OPSET: i64 = 18;
pub const DEFAULT_OPSET: i64 = 15;

/// Opset of the `ai.onnx.ml` domain; every operator used exists since version 1
pub const ML_OPSET: i64 = 1;

pub const ML_DOMAIN: &str = "ai.onnx.ml";

/// Name of the float input carrying the numeric features
pub const NUMERIC_INPUT: &str = "input";
pub const LABEL_OUTPUT: &str = "label";
pub const PROBABILITY_OUTPUT: &str = "probabilities";

/// IR version matching a default-domain opset.
pub fn ir_version_for(opset: i64) -> Result<i64, ExportError> {
    let ir = match opset {
        9 => 4,
        10 => 5,
        11 => 6,
        12..=14 => 7,
        15..=18 => 8,
        other => return Err(ExportError::UnsupportedOpset(other)),
    };
    Ok(ir)
}

/// Encodes a fitted pipeline as an ONNX `ModelProto`
#[derive(Debug, Clone)]
pub struct OnnxExporter {
    pub target_opset: i64,
}

impl Default for OnnxExporter {
    fn default() -> Self {
        Self {
            target_opset: DEFAULT_OPSET,
        }
    }
}

impl OnnxExporter {
    pub fn new(target_opset: i64) -> Self {
        Self { target_opset }
    }

    pub fn build_model(&self, model: &FittedPipeline) -> Result<ModelProto, ExportError> {
        let ir_version = ir_version_for(self.target_opset)?;

        Ok(ModelProto {
            ir_version: Some(ir_version),
            producer_name: Some(env!("CARGO_PKG_NAME").to_string()),
            producer_version: Some(env!("CARGO_PKG_VERSION").to_string()),
            domain: Some("ai.onnx".to_string()),
            model_version: Some(0),
            doc_string: Some(model.describe()),
            graph: Some(build_graph(model)?),
            opset_import: vec![
                OperatorSetIdProto {
                    domain: Some(String::new()),
                    version: Some(self.target_opset),
                },
                OperatorSetIdProto {
                    domain: Some(ML_DOMAIN.to_string()),
                    version: Some(ML_OPSET),
                },
            ],
            metadata_props: vec![
                metadata("class_0", &model.classes.negative),
                metadata("class_1", &model.classes.positive),
                metadata("features", &model.preprocessor.column_names().join(",")),
            ],
        })
    }
}

impl ModelExporter for OnnxExporter {
    fn format(&self) -> ExportFormat {
        ExportFormat::Onnx
    }

    fn encode(&self, model: &FittedPipeline) -> Result<Vec<u8>, ExportError> {
        Ok(self.build_model(model)?.encode_to_vec())
    }
}

fn metadata(key: &str, value: &str) -> StringStringEntryProto {
    StringStringEntryProto {
        key: Some(key.to_string()),
        value: Some(value.to_string()),
    }
}

/// Accumulates nodes with unique names
struct GraphBuilder {
    nodes: Vec<NodeProto>,
}

impl GraphBuilder {
    fn add(
        &mut self,
        op_type: &str,
        domain: &str,
        inputs: &[&str],
        outputs: &[&str],
        attribute: Vec<AttributeProto>,
    ) {
        let name = format!("{}{}", op_type, self.nodes.len());
        self.nodes.push(NodeProto {
            input: inputs.iter().map(|s| s.to_string()).collect(),
            output: outputs.iter().map(|s| s.to_string()).collect(),
            name: Some(name),
            op_type: Some(op_type.to_string()),
            attribute,
            domain: Some(domain.to_string()),
        });
    }
}

/// Every value in an ONNX graph must be produced exactly once; feature
/// names become graph inputs and can clash with intermediate names.
fn check_unique_values(graph: &GraphProto) -> Result<(), ExportError> {
    let mut seen = HashSet::new();
    let inputs = graph.input.iter().filter_map(|v| v.name.as_deref());
    let outputs = graph.node.iter().flat_map(|n| &n.output).map(String::as_str);
    for name in inputs.chain(outputs) {
        if !seen.insert(name) {
            return Err(ExportError::DuplicateValueName(name.to_string()));
        }
    }
    Ok(())
}

fn build_graph(model: &FittedPipeline) -> Result<GraphProto, ExportError> {
    let pre = &model.preprocessor;
    let mut graph = GraphBuilder { nodes: Vec::new() };
    let mut inputs = Vec::new();
    let mut blocks: Vec<String> = Vec::new();

    if !pre.numeric.is_empty() {
        inputs.push(ValueInfoProto::tensor(
            NUMERIC_INPUT,
            data_type::FLOAT,
            &[pre.numeric.len() as i64],
        ));

        let impute: Vec<f32> = pre.numeric.iter().map(|s| s.impute_value as f32).collect();
        let offset: Vec<f32> = pre.numeric.iter().map(|s| s.mean as f32).collect();
        let scale: Vec<f32> = pre.numeric.iter().map(|s| (1.0 / s.scale) as f32).collect();

        graph.add(
            "Imputer",
            ML_DOMAIN,
            &[NUMERIC_INPUT],
            &["imputed"],
            vec![
                AttributeProto::floats("imputed_value_floats", impute),
                AttributeProto::float("replaced_value_float", f32::NAN),
            ],
        );
        graph.add(
            "Scaler",
            ML_DOMAIN,
            &["imputed"],
            &["scaled"],
            vec![
                AttributeProto::floats("offset", offset),
                AttributeProto::floats("scale", scale),
            ],
        );
        blocks.push("scaled".to_string());
    }

    for step in &pre.categorical {
        inputs.push(ValueInfoProto::tensor(&step.name, data_type::STRING, &[1]));

        let onehot = format!("{}_onehot", step.name);
        let encoded = format!("{}_encoded", step.name);
        graph.add(
            "OneHotEncoder",
            ML_DOMAIN,
            &[step.name.as_str()],
            &[onehot.as_str()],
            vec![
                AttributeProto::strings("cats_strings", &step.categories),
                AttributeProto::int("zeros", 1),
            ],
        );
        // [N, 1, K] -> [N, K]
        graph.add(
            "Flatten",
            "",
            &[onehot.as_str()],
            &[encoded.as_str()],
            vec![AttributeProto::int("axis", 1)],
        );
        blocks.push(encoded);
    }

    let features = if blocks.len() == 1 {
        blocks.remove(0)
    } else {
        let refs: Vec<&str> = blocks.iter().map(|s| s.as_str()).collect();
        graph.add(
            "Concat",
            "",
            &refs,
            &["features"],
            vec![AttributeProto::int("axis", 1)],
        );
        "features".to_string()
    };

    // Binary scores are [-z, z] so the logistic transform yields [1 - p, p]
    let weights = &model.classifier.coefficients;
    let coefficients: Vec<f32> = weights
        .iter()
        .map(|w| -w as f32)
        .chain(weights.iter().map(|&w| w as f32))
        .collect();
    let b = model.classifier.intercept;

    graph.add(
        "LinearClassifier",
        ML_DOMAIN,
        &[features.as_str()],
        &[LABEL_OUTPUT, "probability_tensor"],
        vec![
            AttributeProto::ints("classlabels_ints", vec![0, 1]),
            AttributeProto::floats("coefficients", coefficients),
            AttributeProto::floats("intercepts", vec![-b as f32, b as f32]),
            AttributeProto::int("multi_class", 0),
            AttributeProto::string("post_transform", "LOGISTIC"),
        ],
    );
    graph.add(
        "Normalizer",
        ML_DOMAIN,
        &["probability_tensor"],
        &[PROBABILITY_OUTPUT],
        vec![AttributeProto::string("norm", "L1")],
    );

    let graph = GraphProto {
        node: graph.nodes,
        name: Some(format!(
            "{}_pipeline",
            env!("CARGO_PKG_NAME").replace('-', "_")
        )),
        doc_string: None,
        input: inputs,
        output: vec![
            ValueInfoProto::tensor(LABEL_OUTPUT, data_type::INT64, &[]),
            ValueInfoProto::tensor(PROBABILITY_OUTPUT, data_type::FLOAT, &[2]),
        ],
    };
    check_unique_values(&graph)?;
    Ok(graph)
}
