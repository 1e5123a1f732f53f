//! Shared test utilities and fixture generators

#![allow(dead_code)]

use penguin_export::pipeline::{
    fit_pipeline, select_training_set, ClassMapping, FeatureSpec, FittedPipeline, MissingPolicy,
    SolverConfig,
};
use polars::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::PathBuf;
use tempfile::TempDir;

pub const ADELIE_ROWS: usize = 60;
pub const GENTOO_ROWS: usize = 50;
pub const CHINSTRAP_ROWS: usize = 30;

/// Adelie rows with a null bill length (i % 20 == 7)
pub const ADELIE_NULL_LENGTH: usize = 3;
/// Adelie rows with a null sex (i % 15 == 3)
pub const ADELIE_NULL_SEX: usize = 4;
/// Gentoo rows with a null bill depth (j % 25 == 10)
pub const GENTOO_NULL_DEPTH: usize = 2;

/// Create a penguins-shaped DataFrame with known missing-value patterns
///
/// This DataFrame includes:
/// - `species`: Adelie, Gentoo and Chinstrap
/// - `island`: Adelie spread over three islands, Gentoo on Biscoe, Chinstrap on Dream
/// - `bill_length_mm` / `bill_depth_mm`: Adelie and Gentoo ranges don't overlap
/// - `sex`: unused by the model, with a few nulls to exercise `dropna()` semantics
pub fn create_penguin_dataframe() -> DataFrame {
    let mut rng = StdRng::seed_from_u64(42);
    let total = ADELIE_ROWS + GENTOO_ROWS + CHINSTRAP_ROWS;

    let mut species = Vec::with_capacity(total);
    let mut island = Vec::with_capacity(total);
    let mut length: Vec<Option<f64>> = Vec::with_capacity(total);
    let mut depth: Vec<Option<f64>> = Vec::with_capacity(total);
    let mut sex: Vec<Option<&str>> = Vec::with_capacity(total);

    for i in 0..ADELIE_ROWS {
        species.push("Adelie");
        island.push(["Torgersen", "Biscoe", "Dream"][i % 3]);
        length.push((i % 20 != 7).then(|| rng.gen_range(35.0..42.0)));
        depth.push(Some(rng.gen_range(17.0..20.5)));
        sex.push((i % 15 != 3).then_some(if i % 2 == 0 { "male" } else { "female" }));
    }
    for j in 0..GENTOO_ROWS {
        species.push("Gentoo");
        island.push("Biscoe");
        length.push(Some(rng.gen_range(44.0..51.0)));
        depth.push((j % 25 != 10).then(|| rng.gen_range(13.5..16.0)));
        sex.push(Some(if j % 2 == 0 { "male" } else { "female" }));
    }
    for k in 0..CHINSTRAP_ROWS {
        species.push("Chinstrap");
        island.push("Dream");
        length.push(Some(rng.gen_range(45.0..52.0)));
        depth.push(Some(rng.gen_range(17.0..19.5)));
        sex.push(Some(if k % 2 == 0 { "male" } else { "female" }));
    }

    df! {
        "species" => species,
        "island" => island,
        "bill_length_mm" => length,
        "bill_depth_mm" => depth,
        "sex" => sex,
    }
    .unwrap()
}

/// Fit the default two-feature pipeline on the fixture
pub fn fit_default_model() -> FittedPipeline {
    fit_fixture_model(FeatureSpec::default(), MissingPolicy::DropAll)
}

/// Fit a pipeline with bill length, bill depth and one-hot island
pub fn fit_island_model() -> FittedPipeline {
    fit_fixture_model(
        FeatureSpec::new(
            vec!["bill_length_mm".to_string(), "bill_depth_mm".to_string()],
            vec!["island".to_string()],
        ),
        MissingPolicy::Impute,
    )
}

pub fn fit_fixture_model(features: FeatureSpec, policy: MissingPolicy) -> FittedPipeline {
    let df = create_penguin_dataframe();
    let data = select_training_set(&df, "species", &features, &ClassMapping::default(), policy)
        .unwrap();
    fit_pipeline(&data, &SolverConfig::default()).unwrap()
}

/// Create a temporary directory with a test CSV file
pub fn create_temp_csv(df: &mut DataFrame) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let csv_path = temp_dir.path().join("penguins.csv");

    let mut file = std::fs::File::create(&csv_path).unwrap();
    CsvWriter::new(&mut file).finish(df).unwrap();

    (temp_dir, csv_path)
}

/// Create a temporary directory with a test Parquet file
pub fn create_temp_parquet(df: &mut DataFrame) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let parquet_path = temp_dir.path().join("penguins.parquet");

    let file = std::fs::File::create(&parquet_path).unwrap();
    ParquetWriter::new(file).finish(df).unwrap();

    (temp_dir, parquet_path)
}
