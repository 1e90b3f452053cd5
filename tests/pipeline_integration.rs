//! Integration tests for the full fit / transform workflow
//!
//! These tests run the default credit-score schema over the fixture file and
//! verify the end-to-end results.

use credit_features::config::PipelineConfig;
use credit_features::error::PipelineError;
use credit_features::io::{load_partition, output_to_dataframe, save_output};
use credit_features::label::CreditScore;
use credit_features::pipeline::Pipeline;
use credit_features::record::{Partition, RawCell, Split};
use credit_features::report::Condition;
use credit_features::schema::credit::{CUSTOMER_KEY, LABEL_COLUMN, credit_score_registry};
use credit_features::split::split_by_key;
use credit_features::stats::{ImputeStatistic, Stats};
use std::sync::Arc;

const FIXTURE: &str = "testdata/credit_sample.csv";

fn train() -> Partition {
    load_partition(FIXTURE, Split::Train).expect("fixture should load")
}

fn pipeline() -> Pipeline {
    Pipeline::new(
        credit_score_registry().expect("default schema is valid"),
        PipelineConfig::credit_score(),
    )
    .expect("pipeline should build")
}

#[test]
fn test_fit_transform_fixture() {
    let mut pipeline = pipeline();
    let fitted = pipeline.fit_transform(&train()).expect("fit should succeed");
    let output = &fitted.output;

    assert_eq!(output.matrix.n_rows(), 12);
    assert_eq!(fitted.stats.train_rows(), 12);
    assert!(
        !output.matrix.columns().iter().any(|c| c == LABEL_COLUMN),
        "Label must not be a feature"
    );
    assert!(!output.matrix.columns().iter().any(|c| c == CUSTOMER_KEY));

    let tail: Vec<&str> = output.matrix.columns()[output.matrix.width() - 3..]
        .iter()
        .map(String::as_str)
        .collect();
    assert_eq!(tail, ["debt_to_income", "emi_to_salary", "has_delayed_payments"]);

    let labels = output.labels.as_ref().expect("label column configured");
    assert_eq!(labels.values.len(), 12);
    assert_eq!(labels.values[0], Some(CreditScore::Good));
    assert_eq!(labels.values[8], Some(CreditScore::Poor));
    assert_eq!(output.report.unparsed_labels, 0);
    assert_eq!(output.keys[0].name, CUSTOMER_KEY);
    assert_eq!(output.keys[0].values[4].as_deref(), Some("CUS_0x21b1"));
}

#[test]
fn test_report_counts_recovered_conditions() {
    let mut pipeline = pipeline();
    let report = pipeline.fit_transform(&train()).unwrap().output.report;

    assert_eq!(report.count("Age", Condition::Corrupted), 1);
    assert_eq!(report.count("Age", Condition::ParseError), 1);
    assert_eq!(report.count("Annual_Income", Condition::ParseError), 1);
    assert_eq!(report.count("Num_Bank_Accounts", Condition::Corrupted), 1);
    assert_eq!(report.count("Monthly_Balance", Condition::Corrupted), 1);
    assert_eq!(report.count("Monthly_Balance", Condition::ParseError), 1);
    assert_eq!(report.count("Occupation", Condition::Sentinel), 1);
    assert_eq!(report.count("Payment_Behaviour", Condition::Sentinel), 1);
    assert_eq!(report.count("Credit_Mix", Condition::Sentinel), 2);
    assert_eq!(report.count("Credit_History_Age", Condition::Sentinel), 1);
    assert_eq!(report.count("Credit_History_Age", Condition::Absent), 1);
    assert_eq!(report.total(Condition::UnseenCategory), 0);
}

#[test]
fn test_corrupted_and_noisy_values_are_imputed() {
    let mut pipeline = pipeline();
    let fitted = pipeline.fit_transform(&train()).unwrap();
    let matrix = &fitted.output.matrix;

    let age = fitted.stats.column("Age").unwrap();
    assert_eq!(age.impute_number(), Some(28.0));
    assert_eq!(matrix.get(2, "Age"), Some(28.0));
    assert_eq!(matrix.get(7, "Age"), Some(28.0));

    let balance = fitted.stats.column("Monthly_Balance").unwrap();
    let fill = balance.impute_number().unwrap();
    assert_eq!(matrix.get(6, "Monthly_Balance"), Some(fill));
    assert_eq!(matrix.get(11, "Monthly_Balance"), Some(fill));
    assert!(fill.abs() < 1e6);
    assert_eq!(balance.impute_statistic, ImputeStatistic::Median);
}

#[test]
fn test_informative_missing_columns() {
    let mut pipeline = pipeline();
    let fitted = pipeline.fit_transform(&train()).unwrap();
    let matrix = &fitted.output.matrix;

    assert_eq!(matrix.get(0, "Credit_Mix_Unknown"), Some(1.0));
    assert_eq!(matrix.get(0, "Credit_Mix_was_missing"), Some(1.0));
    assert_eq!(matrix.get(1, "Credit_Mix_Good"), Some(1.0));
    assert_eq!(matrix.get(1, "Credit_Mix_was_missing"), Some(0.0));
    assert_eq!(matrix.get(5, "Payment_Behaviour_was_missing"), Some(1.0));
}

#[test]
fn test_one_sided_delay_keeps_negative_values() {
    let mut pipeline = pipeline();
    let fitted = pipeline.fit_transform(&train()).unwrap();
    let delay = fitted.stats.column("Delay_from_due_date").unwrap();

    assert_eq!(delay.lower_bound, None);
    assert!(delay.upper_bound.is_some());
    assert_eq!(fitted.output.matrix.get(1, "Delay_from_due_date"), Some(-1.0));
    assert_eq!(fitted.output.matrix.get(10, "Delay_from_due_date"), Some(-3.0));
}

#[test]
fn test_persisted_stats_reproduce_matrix() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let stats_path = dir.path().join("stats.json");

    let mut fitting = pipeline();
    let fitted = fitting.fit_transform(&train())?;
    fitted.stats.to_file(&stats_path)?;

    let loaded = Arc::new(Stats::from_file(&stats_path)?);
    assert_eq!(*loaded, *fitted.stats);

    let rehydrated = Pipeline::from_stats(
        credit_score_registry()?,
        PipelineConfig::credit_score(),
        loaded,
    )?;
    let replayed = rehydrated.transform(&train())?;
    assert_eq!(replayed.matrix, fitted.output.matrix);
    assert_eq!(
        replayed.matrix.fingerprint(),
        fitted.output.matrix.fingerprint()
    );
    Ok(())
}

#[test]
fn test_unseen_category_on_production_batch() {
    let mut pipeline = pipeline();
    pipeline.fit_transform(&train()).unwrap();

    let source = train();
    let mut records = source.records().to_vec();
    records[0].insert("Occupation".to_owned(), RawCell::text("Freelancer"));
    let batch = Partition::new(Split::Production, source.columns().to_vec(), records);

    let output = pipeline.transform(&batch).unwrap();
    assert_eq!(output.matrix.get(0, "Occupation_Unknown"), Some(1.0));
    assert_eq!(output.matrix.get(0, "Occupation_Scientist"), Some(0.0));
    assert_eq!(output.report.count("Occupation", Condition::UnseenCategory), 1);
    assert_eq!(output.matrix.n_rows(), 12);
}

#[test]
fn test_stats_mismatch_rejected() {
    let mut pipeline = pipeline();
    let fitted = pipeline.fit_transform(&train()).unwrap();

    let mut registry = credit_score_registry().unwrap();
    registry.derived.clear();
    let err = Pipeline::from_stats(registry, PipelineConfig::credit_score(), fitted.stats)
        .unwrap_err();
    assert!(matches!(err, PipelineError::StatsMismatch(_)));
}

#[test]
fn test_snapshot_matches_fit_baseline() {
    let mut pipeline = pipeline();
    let fitted = pipeline.fit_transform(&train()).unwrap();

    let snapshot = pipeline.snapshot(&train()).unwrap();
    assert_eq!(snapshot.rows, fitted.stats.baseline().rows);
    assert_eq!(snapshot.columns, fitted.stats.baseline().columns);

    let balance = snapshot.column("Monthly_Balance").unwrap();
    assert_eq!(balance.missing, 2);
    assert_eq!(balance.corrupted, 1);
}

#[test]
fn test_split_extremes() {
    let (kept, held) = split_by_key(train(), CUSTOMER_KEY, 0.0).unwrap();
    assert_eq!((kept.len(), held.len()), (12, 0));
    assert_eq!(kept.split(), Split::Train);

    let (kept, held) = split_by_key(train(), CUSTOMER_KEY, 1.0).unwrap();
    assert_eq!((kept.len(), held.len()), (0, 12));
    assert_eq!(held.split(), Split::Holdout);
}

#[test]
fn test_split_keeps_customers_together() {
    let (kept, held) = split_by_key(train(), CUSTOMER_KEY, 0.5).unwrap();
    assert_eq!(kept.len() + held.len(), 12);

    let customers = |p: &Partition| -> Vec<String> {
        p.records()
            .iter()
            .filter_map(|r| match r.get(CUSTOMER_KEY) {
                Some(RawCell::Text(s)) => Some(s.clone()),
                _ => None,
            })
            .collect()
    };
    let held_customers = customers(&held);
    assert!(
        customers(&kept)
            .iter()
            .all(|c| !held_customers.contains(c))
    );
}

#[test]
fn test_save_output_csv_and_parquet() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let mut pipeline = pipeline();
    let fitted = pipeline.fit_transform(&train())?;

    let frame = output_to_dataframe(&fitted.output)?;
    assert_eq!(frame.width(), fitted.output.matrix.width() + 2);
    assert_eq!(frame.height(), 12);

    let csv_path = dir.path().join("features.csv");
    save_output(&fitted.output, &csv_path)?;
    let reloaded = load_partition(&csv_path, Split::Holdout)?;
    assert_eq!(reloaded.len(), 12);
    assert_eq!(reloaded.columns().first().map(String::as_str), Some(CUSTOMER_KEY));
    assert_eq!(reloaded.columns().last().map(String::as_str), Some(LABEL_COLUMN));

    let parquet_path = dir.path().join("features.parquet");
    save_output(&fitted.output, &parquet_path)?;
    assert!(parquet_path.exists());
    Ok(())
}

#[test]
fn test_huge_finite_value_keeps_stats_loadable() -> anyhow::Result<()> {
    let source = train();
    let mut records = source.records().to_vec();
    records[3].insert("Outstanding_Debt".to_owned(), RawCell::text("1e200"));
    let batch = Partition::new(Split::Train, source.columns().to_vec(), records);

    let mut pipeline = pipeline();
    let fitted = pipeline.fit_transform(&batch)?;
    let debt = fitted
        .stats
        .baseline()
        .column("Outstanding_Debt")
        .and_then(|c| c.numeric.as_ref())
        .expect("numeric summary");
    assert!(debt.std.is_finite());
    assert_eq!(debt.max, 1e200);

    let reloaded = Stats::from_json(&fitted.stats.to_json()?)?;
    assert_eq!(reloaded, *fitted.stats);

    let replayed = Pipeline::from_stats(
        credit_score_registry()?,
        PipelineConfig::credit_score(),
        Arc::new(reloaded),
    )?
    .transform(&batch)?;
    assert_eq!(replayed.matrix, fitted.output.matrix);
    Ok(())
}
