//! Penguin export CLI
//!
//! Fits the penguin classifier and writes it as ONNX or PMML.

use std::time::Instant;

use anyhow::{Context, Result};
use console::style;

use penguin_export::cli::{Cli, Commands, TrainArgs};
use penguin_export::export::{
    artifact_path, export_model, ModelExporter, OnnxExporter, PmmlExporter,
};
use penguin_export::pipeline::{fit_pipeline, load_dataset_with_progress, select_training_set};
use penguin_export::report::{export_model_summary, ExportParams, TrainingSummary};
use penguin_export::utils::{
    create_spinner, finish_with_success, finish_with_warning, print_banner, print_config,
    print_count, print_info, print_step_header, print_step_time, print_success, print_warning,
    ConfigCard,
};

fn main() -> Result<()> {
    let cli = Cli::parse_validated();

    let exporter: Box<dyn ModelExporter> = match &cli.command {
        Commands::Onnx { target_opset, .. } => Box::new(OnnxExporter::new(*target_opset)),
        Commands::Pmml { no_repr, .. } => Box::new(PmmlExporter::new(!*no_repr)),
    };

    run(cli.command.train_args(), exporter.as_ref())
}

fn run(args: &TrainArgs, exporter: &dyn ModelExporter) -> Result<()> {
    let features = args.feature_spec();
    let classes = args.class_mapping();
    let output_path = artifact_path(&args.output_dir, &args.name, exporter.format());

    print_banner(env!("CARGO_PKG_VERSION"));
    print_config(&ConfigCard {
        input: &args.input,
        output: &output_path,
        label: &args.label,
        classes: (classes.negative.as_str(), classes.positive.as_str()),
        features: &features.numeric,
        categorical: &features.categorical,
        c: args.c,
        max_iter: args.max_iter,
    });

    // Step 1: Load dataset
    print_step_header(1, "Load Dataset");
    let step_start = Instant::now();
    let (df, rows, cols, memory_mb) =
        load_dataset_with_progress(&args.input, args.infer_schema_length)?;
    println!("\n    {} Dataset Statistics:", style("✧").cyan());
    println!("      Rows: {}", rows);
    println!("      Columns: {}", cols);
    println!("      Estimated memory: {:.2} MB", memory_mb);
    print_step_time(step_start.elapsed());

    // Step 2: Filter classes and select features
    print_step_header(2, "Select Training Data");
    let step_start = Instant::now();
    let data = select_training_set(&df, &args.label, &features, &classes, args.missing_policy())?;
    drop(df);

    let class_counts = data.class_counts();
    print_count(
        "row(s) kept",
        data.len(),
        Some(&format!("({} dropped)", rows - data.len())),
    );
    for (class, name, count) in [
        (0, &classes.negative, class_counts.0),
        (1, &classes.positive, class_counts.1),
    ] {
        print_count(&format!("{} (class {})", name, class), count, None);
    }
    print_step_time(step_start.elapsed());

    // Step 3: Fit pipeline
    print_step_header(3, "Fit Pipeline");
    let step_start = Instant::now();
    let spinner = create_spinner("Fitting imputer, scaler and logistic regression...");
    let model = match fit_pipeline(&data, &args.solver_config()) {
        Ok(model) => model,
        Err(e) => {
            spinner.finish_and_clear();
            return Err(e.into());
        }
    };

    if model.classifier.converged {
        finish_with_success(
            &spinner,
            &format!("Converged after {} iteration(s)", model.classifier.n_iter),
        );
    } else {
        finish_with_warning(&spinner, "Solver did not converge");
        print_warning(&format!(
            "Stopped at max_iter={}; increase --max-iter or --tol",
            args.max_iter
        ));
    }
    print_step_time(step_start.elapsed());

    // Step 4: Export
    print_step_header(4, &format!("Export {}", exporter.format()));
    let step_start = Instant::now();
    let path = export_model(exporter, &model, &args.output_dir, &args.name)
        .with_context(|| format!("Failed to export {} model", exporter.format()))?;
    print_success(&format!("Wrote {}", path.display()));

    if let Some(json_path) = &args.summary_json {
        let input = args.input.display().to_string();
        let artifact = path.display().to_string();
        export_model_summary(
            &model,
            json_path,
            &ExportParams {
                input_file: &input,
                label_column: &args.label,
                artifact: &artifact,
            },
        )?;
        print_info(&format!("Parameters written to {}", json_path.display()));
    }
    print_step_time(step_start.elapsed());

    TrainingSummary::new(rows, class_counts, &model).display();

    println!();
    println!("Saved {}", path.display());

    Ok(())
}
