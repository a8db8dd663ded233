/// Scenario tests for the full reconciliation run.
///
/// Fixture orders:
/// - A1: 3.00 x 2 + 4.00 x 1 = 10.00, gross 10.00 -> balanced, no extra row
/// - A2: 5.00 x 1 = 5.00, gross 7.50 -> balancing row of +2.50
/// - A3: 4.00 x 2 = 8.00, gross 6.99 -> balancing row of -1.01 (overcharge)
/// - A4: item key missing from the item table, gross 12.00 -> balancing row of +12.00
/// - A5: placed exactly on 2023-01-01, item price unreadable, gross 0.00 -> kept, zero cost
/// - OLD: placed 2022-12-31 -> dropped by the retention floor

use aov_reconciler::config::ReconConfig;
use aov_reconciler::data_utils::round_to;
use aov_reconciler::export::ExportFormat;
use aov_reconciler::{ReconError, ReconciliationPipeline};
use polars::prelude::*;
use std::collections::HashMap;
use std::fs;

fn orders() -> DataFrame {
    df![
        "PrimaryKeyAlt" => ["A1", "A1", "A2", "A3", "A4", "A5", "OLD"],
        "PrimaryKeyItem" => ["A1-1", "A1-2", "A2-1", "A3-1", "A4-1", "A5-1", "OLD-1"],
        "OrderPlacedDate" => ["2023-02-10", "2023-02-10", "2023-02-11", "2023-02-12", "2023-02-13", "2023-01-01", "2022-12-31"],
        "ProductPLU" => ["p-100", "p-200", "p-300", "p-400", "p-500", "p-600", "p-700"],
        "ProductName" => ["Burger", "Fries", "Salad", "Wrap", "Pizza", "Water", "Soup"],
        "Quantity" => ["2", "1", "1", "2", "1", "1", "1"],
        "GrossAOV" => ["10.00", "10.00", "7.50", "6.99", "12.00", "0.00", "4.00"],
        "PromotionsOnItems" => ["0", "0", "0.5", "0", "", "0", "0"],
        "DriverTip" => ["1.50", "1.50", "0", "2", "0", "0", "0"]
    ]
    .unwrap()
}

fn items() -> DataFrame {
    df![
        "PrimaryKeyItem" => ["A1-1", "A1-2", "A2-1", "A3-1", "A5-1", "OLD-1"],
        "ItemPrice" => ["3.00", "4.00", "5.00", "4.00", "free", "4.00"],
        "ItemQuantity" => ["2", "1", "1", "2", "1", "1"]
    ]
    .unwrap()
}

fn pipeline(dir: &std::path::Path) -> ReconciliationPipeline {
    ReconciliationPipeline::new(ReconConfig {
        output_dir: dir.to_path_buf(),
        ..ReconConfig::default()
    })
}

fn strs(df: &DataFrame, name: &str) -> Vec<String> {
    df.column(name)
        .unwrap()
        .str()
        .unwrap()
        .into_iter()
        .map(|v| v.unwrap_or_default().to_string())
        .collect()
}

fn u32s(df: &DataFrame, name: &str) -> Vec<u32> {
    df.column(name).unwrap().u32().unwrap().into_iter().map(|v| v.unwrap()).collect()
}

fn f64s(df: &DataFrame, name: &str) -> Vec<f64> {
    df.column(name).unwrap().f64().unwrap().into_iter().map(|v| v.unwrap()).collect()
}

#[test]
fn test_scenario_balanced_order_gets_no_balancing_row() {
    let dir = tempfile::tempdir().unwrap();
    let output = pipeline(dir.path()).run(orders(), items()).unwrap();
    let balanced = &output.balanced;

    let keys = strs(balanced, "PrimaryKeyAlt");
    let item_index = u32s(balanced, "ItemIndex");
    let costs = f64s(balanced, "TotalItemCost");

    let a1: Vec<(u32, f64)> = keys
        .iter()
        .zip(item_index.iter().zip(costs.iter()))
        .filter(|(k, _)| k.as_str() == "A1")
        .map(|(_, (i, c))| (*i, *c))
        .collect();
    assert_eq!(a1, vec![(1, 6.0), (2, 4.0)]);
}

#[test]
fn test_scenario_shortfall_gets_balancing_row() {
    let dir = tempfile::tempdir().unwrap();
    let output = pipeline(dir.path()).run(orders(), items()).unwrap();
    let balanced = &output.balanced;

    let keys = strs(balanced, "PrimaryKeyAlt");
    let names = strs(balanced, "ProductName");
    let plus = strs(balanced, "ProductPLU");
    let item_index = u32s(balanced, "ItemIndex");
    let costs = f64s(balanced, "TotalItemCost");
    let prices = f64s(balanced, "ItemPrice");
    let quantities = f64s(balanced, "Quantity");

    let rows: Vec<usize> = (0..keys.len()).filter(|&i| keys[i] == "A2").collect();
    assert_eq!(rows.len(), 2);

    let last = rows[1];
    assert_eq!(item_index[last], 500);
    assert_eq!(names[last], "Balancing Item");
    assert_eq!(plus[last], "x-xx-xxxx-x");
    assert_eq!(costs[last], 2.5);
    assert_eq!(prices[last], 2.5);
    assert_eq!(quantities[last], 1.0);
    assert_eq!(round_to(costs[rows[0]] + costs[last], 2), 7.5);
}

#[test]
fn test_negative_and_full_value_balancing_rows() {
    let dir = tempfile::tempdir().unwrap();
    let output = pipeline(dir.path()).run(orders(), items()).unwrap();
    let report = &output.summary.report;

    let differences: HashMap<&str, f64> = report
        .discrepancies
        .iter()
        .map(|d| (d.order_key.as_str(), d.price_difference))
        .collect();

    assert_eq!(differences.len(), 3);
    assert_eq!(differences["A2"], 2.5);
    assert_eq!(differences["A3"], -1.01);
    assert_eq!(differences["A4"], 12.0);
    assert_eq!(output.summary.balancing_items, 3);
}

#[test]
fn test_conservation_per_order() {
    let dir = tempfile::tempdir().unwrap();
    let output = pipeline(dir.path()).run(orders(), items()).unwrap();
    let balanced = &output.balanced;

    let keys = strs(balanced, "PrimaryKeyAlt");
    let costs = f64s(balanced, "TotalItemCost");
    let gross = f64s(balanced, "GrossAOV");

    let mut sums: HashMap<&str, (f64, f64)> = HashMap::new();
    for i in 0..keys.len() {
        let entry = sums.entry(keys[i].as_str()).or_insert((0.0, gross[i]));
        entry.0 += costs[i];
    }

    assert_eq!(sums.len(), 5);
    for (key, (sum, gross)) in sums {
        assert_eq!(round_to(sum, 2), round_to(gross, 2), "order {} does not balance", key);
    }
}

#[test]
fn test_index_contiguity_and_single_balancing_row() {
    let dir = tempfile::tempdir().unwrap();
    let output = pipeline(dir.path()).run(orders(), items()).unwrap();

    let line_items = &output.line_items;
    let order_index = u32s(line_items, "PrimaryKeyIndex");
    let item_index = u32s(line_items, "ItemIndex");
    assert_eq!(order_index[0], 0);
    assert_eq!(item_index[0], 1);
    for (order_pair, item_pair) in order_index.windows(2).zip(item_index.windows(2)) {
        match order_pair[1] - order_pair[0] {
            0 => assert_eq!(item_pair[1], item_pair[0] + 1),
            1 => assert_eq!(item_pair[1], 1),
            step => panic!("order index jumped by {}", step),
        }
    }

    let balanced = &output.balanced;
    let keys = strs(balanced, "PrimaryKeyAlt");
    let balanced_items = u32s(balanced, "ItemIndex");
    let mut sentinel_counts: HashMap<&str, usize> = HashMap::new();
    for (key, item) in keys.iter().zip(balanced_items.iter()) {
        if *item == 500 {
            *sentinel_counts.entry(key.as_str()).or_default() += 1;
        }
    }
    assert!(sentinel_counts.values().all(|&n| n == 1));
}

#[test]
fn test_retention_floor_and_zero_fill() {
    let dir = tempfile::tempdir().unwrap();
    let output = pipeline(dir.path()).run(orders(), items()).unwrap();
    let balanced = &output.balanced;

    let keys = strs(balanced, "PrimaryKeyAlt");
    assert!(!keys.iter().any(|k| k == "OLD"));

    let row = keys.iter().position(|k| k == "A5").unwrap();
    assert_eq!(f64s(balanced, "ItemPrice")[row], 0.0);
    assert_eq!(f64s(balanced, "TotalItemCost")[row], 0.0);
    assert_eq!(balanced.column("ItemPrice").unwrap().null_count(), 0);
    assert_eq!(balanced.column("ItemQuantity").unwrap().null_count(), 0);
    assert_eq!(balanced.column("TotalItemCost").unwrap().null_count(), 0);
}

#[test]
fn test_rows_sorted_by_order_then_item() {
    let dir = tempfile::tempdir().unwrap();
    let output = pipeline(dir.path()).run(orders(), items()).unwrap();
    let balanced = &output.balanced;

    let keys = strs(balanced, "PrimaryKeyAlt");
    let item_index = u32s(balanced, "ItemIndex");
    let sequence: Vec<(&str, u32)> = keys.iter().map(|k| k.as_str()).zip(item_index).collect();
    assert_eq!(
        sequence,
        vec![
            ("A1", 1),
            ("A1", 2),
            ("A2", 1),
            ("A2", 500),
            ("A3", 1),
            ("A3", 500),
            ("A4", 1),
            ("A4", 500),
            ("A5", 1),
        ]
    );
    assert_eq!(
        &balanced.get_column_names()[..4],
        &["PrimaryKeyAlt", "PrimaryKeyItem", "PrimaryKeyIndex", "ItemIndex"]
    );
}

#[test]
fn test_outputs_written_and_idempotent() {
    let first_dir = tempfile::tempdir().unwrap();
    let second_dir = tempfile::tempdir().unwrap();

    let first = pipeline(first_dir.path()).run(orders(), items()).unwrap();
    let second = pipeline(second_dir.path()).run(orders(), items()).unwrap();

    for (a, b) in [
        (&first.summary.item_detail_path, &second.summary.item_detail_path),
        (&first.summary.balanced_detail_path, &second.summary.balanced_detail_path),
    ] {
        let a = fs::read(a.as_ref().unwrap()).unwrap();
        let b = fs::read(b.as_ref().unwrap()).unwrap();
        assert!(!a.is_empty());
        assert_eq!(a, b);
    }

    let checkpoint = fs::read_to_string(first_dir.path().join("Final Item Detail Master.csv")).unwrap();
    assert_eq!(checkpoint.lines().count(), 1 + 6);
    assert!(!checkpoint.contains("Balancing Item"));

    let processed = fs::read_to_string(
        first_dir
            .path()
            .join("Processed Item Detail Data With Balancing Items.csv"),
    )
    .unwrap();
    assert_eq!(processed.lines().count(), 1 + 9);
}

#[test]
fn test_dry_run_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let output = pipeline(dir.path()).dry_run(orders(), items()).unwrap();

    assert!(output.summary.item_detail_path.is_none());
    assert!(output.summary.balanced_detail_path.is_none());
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    assert_eq!(output.summary.report.discrepancies.len(), 3);
}

#[test]
fn test_split_order_rejected_when_validating() {
    let orders = df![
        "PrimaryKeyAlt" => ["A1", "A2", "A1"],
        "PrimaryKeyItem" => ["A1-1", "A2-1", "A1-2"],
        "OrderPlacedDate" => ["2023-05-01", "2023-05-01", "2023-05-01"],
        "ProductPLU" => ["p-1", "p-2", "p-3"],
        "ProductName" => ["Burger", "Salad", "Fries"],
        "Quantity" => ["1", "1", "1"],
        "GrossAOV" => ["7.00", "5.00", "7.00"],
        "PromotionsOnItems" => ["0", "0", "0"],
        "DriverTip" => ["0", "0", "0"]
    ]
    .unwrap();
    let items = df![
        "PrimaryKeyItem" => ["A1-1", "A2-1", "A1-2"],
        "ItemPrice" => ["3.00", "5.00", "4.00"],
        "ItemQuantity" => ["1", "1", "1"]
    ]
    .unwrap();

    let dir = tempfile::tempdir().unwrap();
    let err = pipeline(dir.path())
        .run(orders.clone(), items.clone())
        .unwrap_err();
    assert!(matches!(err, ReconError::DataQuality(_)));
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);

    let lenient = ReconciliationPipeline::new(ReconConfig {
        output_dir: dir.path().to_path_buf(),
        validate_preconditions: false,
        ..ReconConfig::default()
    });
    let output = lenient.run(orders, items).unwrap();
    assert_eq!(u32s(&output.line_items, "PrimaryKeyIndex"), vec![0, 1, 2]);
    assert!(output.summary.report.discrepancies.is_empty());
}

#[test]
fn test_run_from_csv_files_with_parquet_output() {
    let dir = tempfile::tempdir().unwrap();
    let orders_path = dir.path().join("orders.csv");
    let items_path = dir.path().join("items.csv");
    fs::write(
        &orders_path,
        "PrimaryKeyAlt,PrimaryKeyItem,OrderPlacedDate,ProductPLU,ProductName,Quantity,GrossAOV,PromotionsOnItems,DriverTip,Channel\n\
         A2,A2-1,2023-02-11,p-300,Salad,1,7.50,0,0,web\n",
    )
    .unwrap();
    fs::write(&items_path, "PrimaryKeyItem,ItemPrice,ItemQuantity\nA2-1,5.00,1\n").unwrap();

    let out_dir = dir.path().join("out");
    let pipeline = ReconciliationPipeline::new(ReconConfig {
        orders_path,
        items_path,
        output_dir: out_dir.clone(),
        export_format: ExportFormat::Parquet,
        ..ReconConfig::default()
    });

    let output = pipeline.run_from_files().unwrap();
    assert_eq!(output.balanced.height(), 2);
    assert_eq!(output.balanced.get_column_names().last(), Some(&"Channel"));

    let path = out_dir.join("Processed Item Detail Data With Balancing Items.parquet");
    let read_back = ParquetReader::new(fs::File::open(&path).unwrap()).finish().unwrap();
    assert!(read_back.equals(&output.balanced));
}
