//! Fitted model summary table

use comfy_table::{presets::UTF8_FULL_CONDENSED, Attribute, Cell, Color, Table};
use console::style;

use crate::pipeline::FittedPipeline;

/// Row counts and fitted parameters shown after training
#[derive(Debug, Clone)]
pub struct TrainingSummary {
    pub rows_loaded: usize,
    pub rows_used: usize,
    pub class_counts: (usize, usize),
    pub class_names: (String, String),
    pub n_iter: usize,
    pub converged: bool,
    pub intercept: f64,
    /// `(design column, coefficient)` in design-matrix order
    pub coefficients: Vec<(String, f64)>,
}

impl TrainingSummary {
    pub fn new(rows_loaded: usize, class_counts: (usize, usize), model: &FittedPipeline) -> Self {
        let coefficients = model
            .preprocessor
            .column_names()
            .into_iter()
            .zip(model.classifier.coefficients.iter().copied())
            .collect();

        Self {
            rows_loaded,
            rows_used: model.n_samples,
            class_counts,
            class_names: (model.classes.negative.clone(), model.classes.positive.clone()),
            n_iter: model.classifier.n_iter,
            converged: model.classifier.converged,
            intercept: model.classifier.intercept,
            coefficients,
        }
    }

    /// Build the comfy-table rendering without printing it.
    pub fn to_table(&self) -> Table {
        let mut table = Table::new();
        table.load_preset(UTF8_FULL_CONDENSED);
        table.set_header(vec![
            Cell::new("Metric").add_attribute(Attribute::Bold),
            Cell::new("Value").add_attribute(Attribute::Bold),
        ]);

        table.add_row(vec![
            Cell::new("📁 Rows loaded"),
            Cell::new(self.rows_loaded),
        ]);
        table.add_row(vec![Cell::new("🧮 Rows used"), Cell::new(self.rows_used)]);
        table.add_row(vec![
            Cell::new(format!("0 · {}", self.class_names.0)),
            Cell::new(self.class_counts.0),
        ]);
        table.add_row(vec![
            Cell::new(format!("1 · {}", self.class_names.1)),
            Cell::new(self.class_counts.1),
        ]);
        let (converged, color) = if self.converged {
            ("yes", Color::Green)
        } else {
            ("no", Color::Red)
        };
        table.add_row(vec![
            Cell::new("🔁 Iterations"),
            Cell::new(self.n_iter).fg(color),
        ]);
        table.add_row(vec![
            Cell::new("✅ Converged"),
            Cell::new(converged).fg(color),
        ]);
        table.add_row(vec![
            Cell::new("Intercept"),
            Cell::new(format!("{:+.6}", self.intercept)).add_attribute(Attribute::Bold),
        ]);

        for (name, coefficient) in &self.coefficients {
            let color = if *coefficient >= 0.0 {
                Color::Cyan
            } else {
                Color::Yellow
            };
            table.add_row(vec![
                Cell::new(name),
                Cell::new(format!("{:+.6}", coefficient)).fg(color),
            ]);
        }

        table
    }

    pub fn display(&self) {
        println!();
        println!("    {} {}", style("📋").cyan(), style("MODEL SUMMARY").white().bold());
        println!("    {}", style("─".repeat(50)).dim());
        println!();

        // Indent the table
        for line in self.to_table().to_string().lines() {
            println!("    {}", line);
        }
    }
}
