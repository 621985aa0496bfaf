//! Integration test: JSON-safe payloads

use chrono::NaiveDate;
use polars::prelude::*;
use serde_json::{json, Value};
use tabular_insight::prelude::*;
use tabular_insight::sanitize::sanitize_json;

fn assert_json_safe(value: &Value) {
    match value {
        Value::Number(n) => assert!(n.as_f64().is_some_and(f64::is_finite)),
        Value::Array(items) => items.iter().for_each(assert_json_safe),
        Value::Object(map) => map.values().for_each(assert_json_safe),
        _ => {}
    }
}

#[test]
fn test_nested_structure() {
    let when = NaiveDate::from_ymd_opt(2024, 12, 31).unwrap();
    let raw = RawValue::Map(vec![
        ("shape".to_string(), RawValue::Tuple(vec![RawValue::UInt(3), RawValue::UInt(2)])),
        (
            "stats".to_string(),
            RawValue::Map(vec![
                ("mean".to_string(), RawValue::Float(1.25)),
                ("std".to_string(), RawValue::Float(f64::NAN)),
                ("max".to_string(), RawValue::Float(f64::INFINITY)),
            ]),
        ),
        ("rows".to_string(), RawValue::Seq(vec![RawValue::Map(vec![("d".to_string(), when.into())])])),
        ("label".to_string(), RawValue::Str("ok".to_string())),
    ]);

    let value = sanitize(raw);
    assert_eq!(
        value,
        json!({
            "shape": [3, 2],
            "stats": {"mean": 1.25, "std": null, "max": null},
            "rows": [{"d": "2024-12-31"}],
            "label": "ok"
        })
    );
    assert_eq!(sanitize_json(value.clone()), value);
}

#[test]
fn test_pipeline_payload_is_json_safe() {
    // Constant target: R² is undefined
    let df = df!(
        "x" => &(0..20).map(|i| i as f64).collect::<Vec<_>>(),
        "sales" => &vec![5.0; 20]
    )
    .unwrap();

    let result = TrainingPipeline::default().run_dataframe(&df, None, "lightgbm").unwrap();
    assert_eq!(result.r2_score(), 0.0);

    let json = result.to_json();
    assert_json_safe(&json);
    assert_eq!(json["r2_score"], 0.0);
    assert_eq!(sanitize_json(json.clone()), json);
}

#[test]
fn test_eda_payload_is_json_safe() {
    let df = df!(
        "date" => &["2024-01-01", "2024-02-01", "2024-03-01"],
        "constant" => &[1.0, 1.0, 1.0],
        "revenue" => &[10.0, 12.0, 9.0]
    )
    .unwrap();

    let report = summarize(&Table::from_dataframe(&df).unwrap(), &NoCharts).unwrap();
    let json = report.to_json();
    assert_json_safe(&json);
    assert_eq!(json["correlation_matrix"]["constant"]["revenue"], Value::Null);
    assert_eq!(sanitize_json(json.clone()), json);
}
