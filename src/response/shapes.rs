//! Fixed-field response shapes and their default literals.
//!
//! Each shape is built from a loosely-typed JSON object. Known fields are
//! decoded leniently: a missing field, or one with the wrong JSON type, is
//! replaced by the shape's default literal. Keys the shape does not know about
//! are preserved in `extra` so nothing the agent said is silently lost.
//!
//! Payloads that declare their own shape are not rebuilt here; the builders
//! only supply values for the keys such a payload leaves out.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

// ─────────────────────────────────────────────────────────────────────────────
// Field reader
// ─────────────────────────────────────────────────────────────────────────────

/// Pulls typed fields out of a payload object, leaving the rest behind.
#[derive(Debug)]
struct FieldReader {
    fields: Map<String, Value>,
}

impl FieldReader {
    fn new(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    /// Decode the first alias that holds a `T`.
    fn take<T: DeserializeOwned>(&mut self, aliases: &[&str]) -> Option<T> {
        self.take_with(aliases, decode)
    }

    fn take_count(&mut self, aliases: &[&str]) -> Option<u64> {
        self.take_with(aliases, count)
    }

    /// The canonical (first) key is always consumed so a wrongly-typed value
    /// cannot reappear in `extra`. Fallback aliases are consumed only when used.
    fn take_with<T>(&mut self, aliases: &[&str], convert: impl Fn(Value) -> Option<T>) -> Option<T> {
        let (canonical, fallbacks) = aliases.split_first()?;
        if let Some(value) = self.fields.remove(*canonical).and_then(&convert) {
            return Some(value);
        }
        for alias in fallbacks {
            if let Some(value) = self.fields.get(*alias).cloned().and_then(&convert) {
                self.fields.remove(*alias);
                return Some(value);
            }
        }
        None
    }

    fn take_or<T: DeserializeOwned>(&mut self, aliases: &[&str], default: impl FnOnce() -> T) -> T {
        self.take(aliases).unwrap_or_else(default)
    }

    fn take_string_or(&mut self, aliases: &[&str], default: &str) -> String {
        self.take_or(aliases, || default.to_string())
    }

    /// Drop a key whose value is replaced by a canonical constant.
    fn discard(&mut self, key: &str) {
        self.fields.remove(key);
    }

    /// Move the named keys (when present) into a separate object.
    fn split_off(&mut self, keys: &[&str]) -> Map<String, Value> {
        keys.iter()
            .filter_map(|key| self.fields.remove(*key).map(|value| ((*key).to_string(), value)))
            .collect()
    }

    fn into_extra(self) -> Map<String, Value> {
        self.fields
    }
}

fn decode<T: DeserializeOwned>(value: Value) -> Option<T> {
    serde_json::from_value(value).ok()
}

/// Non-negative integers, including integral floats such as `3245.0`.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
fn count(value: Value) -> Option<u64> {
    value.as_u64().or_else(|| {
        let float = value.as_f64()?;
        (float >= 0.0 && float.fract() == 0.0 && float < u64::MAX as f64).then(|| float as u64)
    })
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}

// ─────────────────────────────────────────────────────────────────────────────
// Table
// ─────────────────────────────────────────────────────────────────────────────

const TABLE_DATA_TYPE: &str = "VOC_TABLE";
const DEFAULT_TABLE_TOTAL: u64 = 3333;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableData {
    pub data_type: String,
    pub columns: Vec<String>,
    /// One JSON array per row; cells keep their original JSON types.
    pub rows: Vec<Value>,
    pub total_count: u64,
    pub period: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TableData {
    pub fn from_fields(fields: Map<String, Value>) -> Self {
        let mut reader = FieldReader::new(fields);
        reader.discard("data_type");

        let columns = reader.take_or(&["columns"], || strings(&["날짜", "카테고리", "건수", "비중"]));
        let supplied_rows: Option<Vec<Value>> = reader.take(&["rows", "table_data", "data"]);
        let total_count = reader.take_count(&["total_count"]).unwrap_or_else(|| {
            supplied_rows
                .as_ref()
                .map_or(DEFAULT_TABLE_TOTAL, |rows| rows.len() as u64)
        });
        let rows = supplied_rows.unwrap_or_else(default_table_rows);

        Self {
            data_type: TABLE_DATA_TYPE.to_string(),
            columns,
            rows,
            total_count,
            period: reader.take_string_or(&["period"], "2025년 1월"),
            extra: reader.into_extra(),
        }
    }
}

fn default_table_rows() -> Vec<Value> {
    vec![
        json!(["2025-01-01", "통화", 1500, "45%"]),
        json!(["2025-01-01", "가격", 1000, "30%"]),
        json!(["2025-01-01", "서비스", 833, "25%"]),
    ]
}

// ─────────────────────────────────────────────────────────────────────────────
// Pie chart
// ─────────────────────────────────────────────────────────────────────────────

/// Parallel label/value/percentage series of a categorical chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSeries {
    pub labels: Vec<String>,
    pub values: Vec<Value>,
    pub percentages: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ChartSeries {
    fn from_fields(fields: Map<String, Value>) -> Self {
        let mut reader = FieldReader::new(fields);
        Self {
            labels: reader.take_or(&["labels"], || strings(&["통화", "가격", "서비스", "기타"])),
            values: reader.take_or(&["values"], || vec![json!(45), json!(30), json!(20), json!(5)]),
            percentages: reader.take_or(&["percentages"], || strings(&["45%", "30%", "20%", "5%"])),
            extra: reader.into_extra(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PieChartData {
    pub chart_type: String,
    pub title: String,
    pub data: ChartSeries,
    pub total_count: u64,
    pub insights: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PieChartData {
    pub fn from_fields(fields: Map<String, Value>) -> Self {
        let mut reader = FieldReader::new(fields);
        reader.discard("chart_type");

        // Series live under `data`, legacy `chart_data`, or flat at top level.
        let series = match reader.take::<Map<String, Value>>(&["data", "chart_data"]) {
            Some(nested) => nested,
            None => reader.split_off(&["labels", "values", "percentages"]),
        };

        Self {
            chart_type: "pie_chart".to_string(),
            title: reader.take_string_or(&["title"], "2025년 1월 VOC 카테고리별 분포"),
            data: ChartSeries::from_fields(series),
            total_count: reader.take_count(&["total_count"]).unwrap_or(10_000),
            insights: reader.take_or(&["insights"], || {
                strings(&[
                    "통화 카테고리가 전체의 45%로 가장 높은 비중",
                    "상위 3개 카테고리가 전체의 95% 차지",
                ])
            }),
            extra: reader.into_extra(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Line chart
// ─────────────────────────────────────────────────────────────────────────────

/// One sample of an hourly series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlyPoint {
    pub hour: String,
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineChartData {
    pub analysis_type: String,
    pub chart_type: String,
    pub period: String,
    pub categories: Vec<String>,
    pub time_series_data: BTreeMap<String, Vec<HourlyPoint>>,
    pub peak_hours: BTreeMap<String, String>,
    pub insights: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

const SAMPLE_HOURS: [&str; 9] = [
    "00:00", "06:00", "09:00", "10:00", "12:00", "15:00", "18:00", "21:00", "23:00",
];

impl LineChartData {
    pub fn from_fields(fields: Map<String, Value>) -> Self {
        let mut reader = FieldReader::new(fields);
        reader.discard("analysis_type");
        reader.discard("chart_type");

        Self {
            analysis_type: "FEEDBACK_OVER_TIME".to_string(),
            chart_type: "line_chart".to_string(),
            period: reader.take_string_or(&["period"], "2025년 1월"),
            categories: reader.take_or(&["categories"], || strings(&["통화", "가격", "서비스"])),
            time_series_data: reader.take_or(&["time_series_data"], default_time_series),
            peak_hours: reader.take_or(&["peak_hours"], || {
                [
                    ("통화", "10:00-12:00"),
                    ("가격", "14:00-16:00"),
                    ("서비스", "16:00-18:00"),
                ]
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect()
            }),
            insights: reader.take_or(&["insights"], || {
                strings(&[
                    "통화 관련 피드백은 오전 10-12시에 집중",
                    "가격 문의는 오후 2-4시에 가장 많음",
                    "서비스 관련 문의는 저녁 시간대 증가",
                ])
            }),
            extra: reader.into_extra(),
        }
    }
}

fn default_time_series() -> BTreeMap<String, Vec<HourlyPoint>> {
    let series: [(&str, [u32; 9]); 3] = [
        ("통화", [45, 35, 55, 60, 52, 47, 48, 40, 36]),
        ("가격", [25, 18, 32, 35, 30, 40, 32, 26, 22]),
        ("서비스", [20, 15, 25, 27, 24, 22, 28, 22, 18]),
    ];
    series
        .into_iter()
        .map(|(category, values)| {
            let points = SAMPLE_HOURS
                .iter()
                .zip(values)
                .map(|(hour, value)| HourlyPoint {
                    hour: (*hour).to_string(),
                    value: json!(value),
                })
                .collect();
            (category.to_string(), points)
        })
        .collect()
}

// ─────────────────────────────────────────────────────────────────────────────
// VOC analysis
// ─────────────────────────────────────────────────────────────────────────────

const ANALYSIS_TYPE: &str = "VOC_DATA_ANALYSIS";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisCategories {
    #[serde(rename = "주요 카테고리")]
    pub main: Vec<String>,
    #[serde(rename = "분석 결과")]
    pub shares: BTreeMap<String, String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisData {
    pub analysis_type: String,
    pub period: String,
    pub total_voc_count: u64,
    pub categories: AnalysisCategories,
    pub insights: Vec<String>,
    pub recommendation: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AnalysisData {
    pub fn from_fields(fields: Map<String, Value>) -> Self {
        let mut reader = FieldReader::new(fields);
        reader.discard("analysis_type");

        let categories = match reader.take::<Map<String, Value>>(&["categories"]) {
            Some(existing) => {
                let mut inner = FieldReader::new(existing);
                AnalysisCategories {
                    main: inner.take_or(&["주요 카테고리"], default_main_categories),
                    shares: inner.take_or(&["분석 결과"], default_category_shares),
                    extra: inner.into_extra(),
                }
            }
            None => AnalysisCategories {
                main: reader.take_or(&["main_categories"], default_main_categories),
                shares: reader
                    .take::<Map<String, Value>>(&["category_distribution"])
                    .map_or_else(default_category_shares, |dist| category_shares(&dist)),
                extra: Map::new(),
            },
        };

        Self {
            analysis_type: ANALYSIS_TYPE.to_string(),
            period: reader.take_string_or(&["period"], "2025년도 1월"),
            total_voc_count: reader
                .take_count(&["total_voc_count", "total_count"])
                .unwrap_or(10_000),
            categories,
            insights: reader.take_or(&["insights"], || {
                strings(&[
                    "전체 VOC 건수는 10,000건으로 전월 대비 증가",
                    "통화 관련 문의가 45%로 가장 높은 비중",
                    "가격 문의는 30%, 서비스 관련은 25%",
                ])
            }),
            recommendation: reader.take_string_or(&["recommendation"], "통화 품질 개선에 우선 집중 필요"),
            extra: reader.into_extra(),
        }
    }
}

fn default_main_categories() -> Vec<String> {
    strings(&["통화", "가격", "서비스"])
}

fn default_category_shares() -> BTreeMap<String, String> {
    [("통화", 45), ("가격", 30), ("서비스", 25)]
        .into_iter()
        .map(|(category, pct)| (format!("{category} 카테고리 비중"), format!("{pct}%")))
        .collect()
}

/// `{"통화": 45}` becomes `{"통화 카테고리 비중": "45%"}`.
fn category_shares(distribution: &Map<String, Value>) -> BTreeMap<String, String> {
    distribution
        .iter()
        .map(|(category, pct)| {
            let pct = match pct {
                Value::String(s) => s.trim_end_matches('%').to_string(),
                other => other.to_string(),
            };
            (format!("{category} 카테고리 비중"), format!("{pct}%"))
        })
        .collect()
}

// ─────────────────────────────────────────────────────────────────────────────
// Dashboard
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardData {
    pub dashboard_url: String,
    pub dashboard_id: String,
    pub title: String,
    pub description: String,
    pub widgets: Vec<Value>,
    pub filters: Vec<Value>,
    /// Left empty when the agent does not report it; normalization is pure.
    pub created_at: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl DashboardData {
    pub fn from_fields(fields: Map<String, Value>) -> Self {
        let mut reader = FieldReader::new(fields);
        Self {
            dashboard_url: reader.take_string_or(&["dashboard_url", "quicksight_url"], ""),
            dashboard_id: reader.take_string_or(&["dashboard_id"], ""),
            title: reader.take_string_or(&["title"], "QuickSight Dashboard"),
            description: reader.take_string_or(&["description"], ""),
            widgets: reader.take_or(&["widgets"], Vec::new),
            filters: reader.take_or(&["filters"], Vec::new),
            created_at: reader.take_string_or(&["created_at"], ""),
            extra: reader.into_extra(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Supervisor shapes
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentChainData {
    pub agent_chain: Vec<Value>,
    pub summary: String,
    pub total_agents: u64,
    pub execution_time: Value,
    pub final_result: Value,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AgentChainData {
    pub fn from_fields(fields: Map<String, Value>) -> Self {
        let mut reader = FieldReader::new(fields);
        let agent_chain: Vec<Value> = reader.take_or(&["agent_chain"], Vec::new);
        let total_agents = reader
            .take_count(&["total_agents"])
            .unwrap_or(agent_chain.len() as u64);
        Self {
            agent_chain,
            summary: reader.take_string_or(&["summary"], ""),
            total_agents,
            execution_time: reader
                .take::<Value>(&["execution_time"])
                .filter(|v| !v.is_null())
                .unwrap_or_else(|| json!("")),
            final_result: reader
                .take::<Value>(&["final_result"])
                .filter(|v| !v.is_null())
                .unwrap_or_else(|| json!({})),
            extra: reader.into_extra(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntegratedSummary {
    pub summary: String,
    pub key_findings: Vec<Value>,
    pub sources: Vec<Value>,
    pub visualizations: Vec<Value>,
    pub recommendations: Vec<Value>,
    pub confidence: f64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntegratedAnalysisData {
    pub integrated_analysis: IntegratedSummary,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl IntegratedAnalysisData {
    pub fn from_fields(fields: Map<String, Value>) -> Self {
        let mut reader = FieldReader::new(fields);
        let mut inner = FieldReader::new(reader.take_or(&["integrated_analysis"], Map::new));
        let integrated_analysis = IntegratedSummary {
            summary: inner.take_string_or(&["summary"], ""),
            key_findings: inner.take_or(&["key_findings"], Vec::new),
            sources: inner.take_or(&["sources"], Vec::new),
            visualizations: inner.take_or(&["visualizations"], Vec::new),
            recommendations: inner.take_or(&["recommendations"], Vec::new),
            confidence: inner.take_or(&["confidence"], || 0.0),
            extra: inner.into_extra(),
        };
        Self {
            integrated_analysis,
            extra: reader.into_extra(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Error
// ─────────────────────────────────────────────────────────────────────────────

pub const DEFAULT_ERROR_MESSAGE: &str = "알 수 없는 오류가 발생했습니다.";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorData {
    /// The agent's error marker, flattened to a string.
    pub error: String,
    pub message: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ErrorData {
    pub fn from_fields(fields: Map<String, Value>) -> Self {
        let mut reader = FieldReader::new(fields);
        let marker = reader.take::<Value>(&["error"]).unwrap_or(Value::Null);
        let nested_message = marker
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string);

        let error = match marker {
            Value::String(s) => s,
            Value::Null => "error".to_string(),
            other => other.to_string(),
        };
        let message = reader
            .take::<String>(&["message"])
            .or(nested_message)
            .or_else(|| (!error.is_empty() && error != "error").then(|| error.clone()))
            .unwrap_or_else(|| DEFAULT_ERROR_MESSAGE.to_string());

        Self {
            error,
            message,
            extra: reader.into_extra(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obj(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_table_defaults() {
        let table = TableData::from_fields(Map::new());
        assert_eq!(table.data_type, "VOC_TABLE");
        assert_eq!(table.columns, vec!["날짜", "카테고리", "건수", "비중"]);
        assert_eq!(table.rows.len(), 3);
        assert_eq!(table.total_count, 3333);
        assert_eq!(table.period, "2025년 1월");
    }

    #[test]
    fn test_table_rows_from_data_array() {
        let table = TableData::from_fields(obj(json!({
            "data": [["2025-01-02", "가격", 10, "100%"]],
            "source": "athena"
        })));
        assert_eq!(table.rows, vec![json!(["2025-01-02", "가격", 10, "100%"])]);
        assert_eq!(table.total_count, 1);
        assert_eq!(table.extra.get("source"), Some(&json!("athena")));
    }

    #[test]
    fn test_wrong_type_falls_back_to_default() {
        let table = TableData::from_fields(obj(json!({"columns": "date,count", "total_count": "many"})));
        assert_eq!(table.columns.len(), 4);
        assert_eq!(table.total_count, 3333);
        assert!(table.extra.is_empty());
    }

    #[test]
    fn test_counts_accept_integral_floats() {
        let pie = PieChartData::from_fields(obj(json!({"total_count": 3245.0})));
        assert_eq!(pie.total_count, 3245);

        let fractional = PieChartData::from_fields(obj(json!({"total_count": 12.5})));
        assert_eq!(fractional.total_count, 10_000);

        let analysis = AnalysisData::from_fields(obj(json!({"total_count": 88.0})));
        assert_eq!(analysis.total_voc_count, 88);
    }

    #[test]
    fn test_pie_series_sources() {
        let legacy = PieChartData::from_fields(obj(json!({
            "chart_data": {"labels": ["A", "B"], "values": [1, 2]}
        })));
        assert_eq!(legacy.data.labels, vec!["A", "B"]);
        assert_eq!(legacy.data.values, vec![json!(1), json!(2)]);
        assert_eq!(legacy.data.percentages, vec!["45%", "30%", "20%", "5%"]);

        let flat = PieChartData::from_fields(obj(json!({"labels": ["X"], "chart_type": "pie"})));
        assert_eq!(flat.chart_type, "pie_chart");
        assert_eq!(flat.data.labels, vec!["X"]);
        assert!(flat.extra.is_empty());
    }

    #[test]
    fn test_line_chart_defaults() {
        let line = LineChartData::from_fields(Map::new());
        assert_eq!(line.chart_type, "line_chart");
        assert_eq!(line.analysis_type, "FEEDBACK_OVER_TIME");
        let calls = &line.time_series_data["통화"];
        assert_eq!(calls.len(), 9);
        assert_eq!(calls[3].hour, "10:00");
        assert_eq!(calls[3].value, json!(60));
        assert_eq!(line.peak_hours["가격"], "14:00-16:00");
    }

    #[test]
    fn test_analysis_from_distribution() {
        let analysis = AnalysisData::from_fields(obj(json!({
            "total_count": 3245,
            "category_distribution": {"지연": 45, "수하물": "30%"}
        })));
        assert_eq!(analysis.total_voc_count, 3245);
        assert_eq!(analysis.categories.shares["지연 카테고리 비중"], "45%");
        assert_eq!(analysis.categories.shares["수하물 카테고리 비중"], "30%");
        assert_eq!(analysis.categories.main, vec!["통화", "가격", "서비스"]);
        assert_eq!(analysis.recommendation, "통화 품질 개선에 우선 집중 필요");
    }

    #[test]
    fn test_analysis_serializes_korean_category_keys() {
        let value = serde_json::to_value(AnalysisData::from_fields(Map::new())).unwrap();
        assert_eq!(value["categories"]["주요 카테고리"], json!(["통화", "가격", "서비스"]));
        assert_eq!(value["categories"]["분석 결과"]["통화 카테고리 비중"], json!("45%"));
    }

    #[test]
    fn test_agent_chain_counts_agents() {
        let chain = AgentChainData::from_fields(obj(json!({
            "agent_chain": [{"agent": "db"}, {"agent": "viz"}]
        })));
        assert_eq!(chain.total_agents, 2);
        assert_eq!(chain.final_result, json!({}));
        assert_eq!(chain.execution_time, json!(""));
    }

    #[test]
    fn test_error_message_resolution() {
        let plain = ErrorData::from_fields(obj(json!({"error": "throttled"})));
        assert_eq!(plain.message, "throttled");

        let nested = ErrorData::from_fields(obj(json!({"error": {"message": "denied"}})));
        assert_eq!(nested.message, "denied");

        let bare = ErrorData::from_fields(obj(json!({"error": null})));
        assert_eq!(bare.message, DEFAULT_ERROR_MESSAGE);
    }
}
