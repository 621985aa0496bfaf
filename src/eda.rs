//! Exploratory summary of an uploaded table

use crate::error::Result;
use crate::preprocessing::{temporal, Column, ColumnData, Table, TargetInferer, DATE_MARKER, MONTH_FEATURE};
use crate::sanitize::{sanitize, RawValue};
use crate::utils::round_to;
use crate::visualization::ChartRenderer;
use serde_json::Value;
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Rows echoed in `example_rows`
const EXAMPLE_ROWS: usize = 5;

/// Category values drawn by [`TopValueCharts`]
const TOP_VALUES: usize = 5;

/// Columns the chart generator may specialize on
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnHints {
    pub product_name: Option<String>,
    pub product_type: Option<String>,
}

impl ColumnHints {
    /// First column naming a product name, and first naming a product type or category
    pub fn detect(table: &Table) -> Self {
        let names = table.names();
        let product_name = names
            .iter()
            .find(|n| n.contains("product") && n.contains("name"))
            .map(|n| n.to_string());
        let product_type = names
            .iter()
            .find(|n| n.contains("product") && (n.contains("type") || n.contains("category")))
            .map(|n| n.to_string());
        Self { product_name, product_type }
    }
}

/// Produces named base64 images for a table
pub trait ChartGenerator {
    fn generate(&self, table: &Table, hints: &ColumnHints) -> Result<Vec<(String, String)>>;
}

/// Generator that draws nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCharts;

impl ChartGenerator for NoCharts {
    fn generate(&self, _table: &Table, _hints: &ColumnHints) -> Result<Vec<(String, String)>> {
        Ok(Vec::new())
    }
}

/// Top-value bar charts and monthly trends for the hinted product columns
#[derive(Debug, Clone, Copy, Default)]
pub struct TopValueCharts {
    renderer: ChartRenderer,
}

impl TopValueCharts {
    pub fn new(renderer: ChartRenderer) -> Self {
        Self { renderer }
    }

    fn charts_for(&self, table: &Table, column: &str, label: &str, out: &mut Vec<(String, String)>) -> Result<()> {
        let Some(ColumnData::Text(values)) = table.column(column).map(|c| &c.data) else {
            return Ok(());
        };
        let top = top_values(values, TOP_VALUES);
        if top.is_empty() {
            return Ok(());
        }

        let counts: Vec<f64> = top.iter().map(|(_, n)| *n as f64).collect();
        out.push((format!("top_{}_bar", label), self.renderer.bar(&counts)?));

        if let Some(ColumnData::Numeric(months)) = table.column(MONTH_FEATURE).map(|c| &c.data) {
            let series: Vec<Vec<(f64, f64)>> = top
                .iter()
                .map(|(value, _)| {
                    (1..=12)
                        .map(|m| {
                            let n = values
                                .iter()
                                .zip(months)
                                .filter(|(v, mo)| v.as_deref() == Some(value.as_str()) && **mo == Some(m as f64))
                                .count();
                            (m as f64, n as f64)
                        })
                        .collect()
                })
                .collect();
            out.push((format!("monthly_{}_trend", label), self.renderer.lines(&series)?));
        }
        Ok(())
    }
}

impl ChartGenerator for TopValueCharts {
    fn generate(&self, table: &Table, hints: &ColumnHints) -> Result<Vec<(String, String)>> {
        let mut out = Vec::new();
        if let Some(col) = &hints.product_name {
            self.charts_for(table, col, "product_names", &mut out)?;
        }
        if let Some(col) = &hints.product_type {
            self.charts_for(table, col, "product_types", &mut out)?;
        }
        Ok(out)
    }
}

/// Summary payload for one table
#[derive(Debug, Clone)]
pub struct EdaReport {
    pub shape: (usize, usize),
    pub columns: Vec<String>,
    pub inferred_target: Option<String>,
    pub date_column_used: Option<String>,
    pub month_feature_added: bool,
    pub graphs: Vec<(String, String)>,
    body: Vec<(String, RawValue)>,
}

impl EdaReport {
    pub fn to_raw(&self) -> RawValue {
        let mut entries = vec![
            ("shape".to_string(), RawValue::Tuple(vec![self.shape.0.into(), self.shape.1.into()])),
            ("columns".to_string(), self.columns.clone().into()),
        ];
        entries.extend(self.body.iter().cloned());
        entries.push(("inferred_target".to_string(), self.inferred_target.clone().into()));
        entries.push(("date_column_used".to_string(), self.date_column_used.clone().into()));
        entries.push(("month_feature_added".to_string(), self.month_feature_added.into()));
        entries.push((
            "graphs".to_string(),
            RawValue::Map(self.graphs.iter().map(|(k, v)| (k.clone(), v.clone().into())).collect()),
        ));
        RawValue::Map(entries)
    }

    pub fn to_json(&self) -> Value {
        sanitize(self.to_raw())
    }
}

/// Summarize `table`: shape, dtypes, missing and unique counts, descriptive
/// statistics, correlations, example rows and the inferred target.
///
/// The first parseable date column contributes a `month` column first, so
/// every statistic sees it. Chart failures leave `graphs` empty.
pub fn summarize(table: &Table, charts: &dyn ChartGenerator) -> Result<EdaReport> {
    let mut table = table.clone();
    let date_column_used = add_month(&mut table)?;
    let inferred_target = TargetInferer::new().infer(&table.names()).map(str::to_string);
    let hints = ColumnHints::detect(&table);

    let graphs = match charts.generate(&table, &hints) {
        Ok(graphs) => graphs,
        Err(e) => {
            warn!(error = %e, "EDA charts omitted");
            Vec::new()
        }
    };

    let per_column = |f: &dyn Fn(&Column) -> RawValue| -> RawValue {
        RawValue::Map(table.columns().iter().map(|c| (c.name.clone(), f(c))).collect())
    };

    let body = vec![
        ("dtypes".to_string(), per_column(&|c: &Column| RawValue::from(c.dtype_label()))),
        ("missing_values".to_string(), per_column(&|c: &Column| RawValue::from(c.data.null_count()))),
        ("descriptive_stats".to_string(), per_column(&describe)),
        ("correlation_matrix".to_string(), correlation_matrix(&table)),
        ("unique_values".to_string(), per_column(&|c: &Column| RawValue::from(c.data.n_unique()))),
        ("example_rows".to_string(), example_rows(&table)),
    ];

    info!(
        rows = table.height(),
        columns = table.width(),
        target = ?inferred_target,
        date_column = ?date_column_used,
        graphs = graphs.len(),
        "EDA summary built"
    );

    Ok(EdaReport {
        shape: table.shape(),
        columns: table.names().into_iter().map(str::to_string).collect(),
        month_feature_added: table.column(MONTH_FEATURE).is_some(),
        inferred_target,
        date_column_used,
        graphs,
        body,
    })
}

/// Append `month` from the first date-named column with any parseable value.
/// The source column is kept.
fn add_month(table: &mut Table) -> Result<Option<String>> {
    let candidates: Vec<String> = table
        .columns()
        .iter()
        .filter(|c| c.name.contains(DATE_MARKER))
        .map(|c| c.name.clone())
        .collect();

    for name in candidates {
        let Some(column) = table.column(&name) else { continue };
        let months = temporal::months(&column.data);
        if months.iter().all(Option::is_none) {
            debug!(column = %name, "Date column did not parse, trying next");
            continue;
        }
        table.upsert(Column::numeric(MONTH_FEATURE, months))?;
        return Ok(Some(name));
    }
    Ok(None)
}

fn describe(column: &Column) -> RawValue {
    match &column.data {
        ColumnData::Numeric(values) => {
            let present: Vec<f64> = values.iter().flatten().copied().collect();
            let count = present.len();
            let mean = if count > 0 { present.iter().sum::<f64>() / count as f64 } else { f64::NAN };
            let std = if count > 1 {
                (present.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (count - 1) as f64).sqrt()
            } else {
                f64::NAN
            };
            let min = present.iter().copied().fold(f64::INFINITY, f64::min);
            let max = present.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            RawValue::Map(vec![
                ("count".to_string(), count.into()),
                ("mean".to_string(), mean.into()),
                ("std".to_string(), std.into()),
                ("min".to_string(), if count > 0 { min.into() } else { RawValue::Null }),
                ("max".to_string(), if count > 0 { max.into() } else { RawValue::Null }),
            ])
        }
        ColumnData::Text(values) => {
            let count = values.iter().flatten().count();
            let top = top_values(values, 1).into_iter().next();
            RawValue::Map(vec![
                ("count".to_string(), count.into()),
                ("unique".to_string(), column.data.n_unique().into()),
                ("top".to_string(), top.as_ref().map(|(v, _)| v.clone()).into()),
                ("freq".to_string(), top.map(|(_, n)| n).into()),
            ])
        }
    }
}

/// Pairwise Pearson correlation of numeric columns over rows where both are
/// present, rounded to 2 decimals; undefined entries become null.
fn correlation_matrix(table: &Table) -> RawValue {
    let numeric: Vec<(&str, &[Option<f64>])> = table
        .columns()
        .iter()
        .filter_map(|c| match &c.data {
            ColumnData::Numeric(v) => Some((c.name.as_str(), v.as_slice())),
            ColumnData::Text(_) => None,
        })
        .collect();

    RawValue::Map(
        numeric
            .iter()
            .map(|(name, a)| {
                let row = numeric
                    .iter()
                    .map(|(other, b)| (other.to_string(), round_to(pearson(a, b), 2).into()))
                    .collect();
                (name.to_string(), RawValue::Map(row))
            })
            .collect(),
    )
}

fn pearson(a: &[Option<f64>], b: &[Option<f64>]) -> f64 {
    let pairs: Vec<(f64, f64)> = a.iter().zip(b).filter_map(|(x, y)| Some(((*x)?, (*y)?))).collect();
    if pairs.len() < 2 {
        return f64::NAN;
    }
    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|p| p.0).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|p| p.1).sum::<f64>() / n;
    let (mut cov, mut var_x, mut var_y) = (0.0, 0.0, 0.0);
    for (x, y) in &pairs {
        cov += (x - mean_x) * (y - mean_y);
        var_x += (x - mean_x).powi(2);
        var_y += (y - mean_y).powi(2);
    }
    cov / (var_x * var_y).sqrt()
}

fn example_rows(table: &Table) -> RawValue {
    let head = table.head(EXAMPLE_ROWS);
    RawValue::Seq(
        (0..head.height())
            .map(|i| {
                RawValue::Map(
                    head.columns()
                        .iter()
                        .map(|c| {
                            let value = match &c.data {
                                ColumnData::Numeric(v) => RawValue::from(v[i]),
                                ColumnData::Text(v) => RawValue::from(v[i].clone()),
                            };
                            (c.name.clone(), value)
                        })
                        .collect(),
                )
            })
            .collect(),
    )
}

/// Most frequent values, descending by count; ties by first appearance
fn top_values(values: &[Option<String>], k: usize) -> Vec<(String, usize)> {
    let mut counts: HashMap<&str, (usize, usize)> = HashMap::new();
    for (i, v) in values.iter().enumerate() {
        if let Some(v) = v {
            counts.entry(v.as_str()).or_insert((0, i)).0 += 1;
        }
    }
    let mut ranked: Vec<(&str, (usize, usize))> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1 .0.cmp(&a.1 .0).then(a.1 .1.cmp(&b.1 .1)));
    ranked.into_iter().take(k).map(|(v, (n, _))| (v.to_string(), n)).collect()
}
