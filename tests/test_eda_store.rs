//! Integration test: EDA summary and saved results

use polars::prelude::*;
use tabular_insight::prelude::*;
use tabular_insight::utils::DataLoader;

fn shop_frame() -> DataFrame {
    df!(
        "Order Date" => &["2024-01-05", "2024-01-19", "2024-02-02", "2024-03-14", "2024-03-30", "2024-04-08"],
        "Product Name" => &["tea", "coffee", "tea", "cocoa", "tea", "coffee"],
        "Product Category" => &["leaf", "bean", "leaf", "powder", "leaf", "bean"],
        "Units" => &[3, 1, 4, 1, 5, 9],
        "Sales" => &[6.0, 4.5, 8.0, 2.5, 10.0, 40.5]
    )
    .unwrap()
}

#[test]
fn test_eda_with_product_charts() {
    let table = Table::from_dataframe(&shop_frame()).unwrap();
    let report = summarize(&table, &TopValueCharts::default()).unwrap();

    assert_eq!(report.shape, (6, 6));
    assert_eq!(report.inferred_target.as_deref(), Some("sales"));
    assert_eq!(report.date_column_used.as_deref(), Some("order date"));
    assert!(report.month_feature_added);

    let names: Vec<&str> = report.graphs.iter().map(|(k, _)| k.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "top_product_names_bar",
            "monthly_product_names_trend",
            "top_product_types_bar",
            "monthly_product_types_trend"
        ]
    );

    let json = report.to_json();
    assert_eq!(json["columns"][5], "month");
    assert_eq!(json["dtypes"]["units"], "int32");
    assert_eq!(json["dtypes"]["sales"], "float64");
    assert_eq!(json["dtypes"]["product name"], "object");
    assert_eq!(json["dtypes"]["month"], "float64");
    assert_eq!(json["descriptive_stats"]["product name"]["top"], "tea");
    assert_eq!(json["descriptive_stats"]["product name"]["freq"], 3);
    assert_eq!(json["example_rows"].as_array().unwrap().len(), 5);
}

#[test]
fn test_eda_then_train_shares_one_record() {
    let df = shop_frame();
    let table = Table::from_dataframe(&df).unwrap();
    let store = InMemoryResultStore::new();
    let shape = format!("{} rows, {} columns", df.height(), df.width());

    let report = summarize(&table, &NoCharts).unwrap();
    store.save_eda("ana", "shop.csv", report.to_json(), report.inferred_target.as_deref(), &shape);

    let result = TrainingPipeline::default().run(&table, None, "decision_tree").unwrap();
    let saved = store.save_model("ana", "shop.csv", result.to_json(), "decision_tree", Some(&result.target_column), &shape);

    assert_eq!(store.len(), 1);
    assert_eq!(saved.inferred_target, "sales");
    assert_eq!(saved.data_shape, "6 rows, 5 columns");
    assert_eq!(saved.eda_result["inferred_target"], "sales");
    assert_eq!(saved.model_result["target_column"], "sales");
    assert_eq!(saved.model_name, "decision_tree");
}

#[test]
fn test_file_info_shape_label() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("shop.csv");
    std::fs::write(&path, "a,revenue\n1,2\n3,4\n").unwrap();

    let info = DataLoader::new().file_info(&path).unwrap();
    assert_eq!(info.file_name, "shop.csv");
    assert_eq!(info.shape_label(), "2 rows, 2 columns");
}
