//! Response normalization.
//!
//! Agents answer with plain text, JSON embedded in text, or structured JSON
//! of varying shape. The frontend only understands a fixed set of tagged
//! shapes, so every final payload passes through [`normalize`] before it
//! leaves the gateway.
//!
//! # Shape selection
//!
//! 1. Non-object payloads are returned as [`NormalizedResponse::Text`].
//! 2. Objects carrying a discriminator field (`chart_type`, `data_type`,
//!    `analysis_type`, ...) keep every field they supply, whatever its type.
//!    Only the marker is rewritten to its canonical value and absent keys
//!    are filled in.
//! 3. Other objects are classified by keywords in the user's query and
//!    rebuilt field by field into that shape.
//!
//! Every shape has a fixed field set; missing fields are filled with default
//! literals, never with `null`.
//!
//! # Example
//!
//! ```rust
//! use kicksight_gateway::agent::AgentMode;
//! use kicksight_gateway::response::{AgentPayload, ResponseKind, normalize};
//!
//! let payload = AgentPayload::Structured(serde_json::json!({ "note": "n/a" }));
//! let result = normalize(&payload, "카테고리 분포를 원형 차트로", AgentMode::QuickSight);
//! assert_eq!(result.kind(), ResponseKind::PieChart);
//! ```

mod classify;
mod extract;
mod shapes;

pub use classify::{ResponseKind, chart_kind, classify_query, detect_discriminator};
pub use extract::{extract_json, parse_json_document};
pub use shapes::{
    AgentChainData, AnalysisCategories, AnalysisData, ChartSeries, DashboardData,
    DEFAULT_ERROR_MESSAGE, ErrorData, HourlyPoint, IntegratedAnalysisData, IntegratedSummary,
    LineChartData, PieChartData, TableData,
};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::agent::AgentMode;

/// A final agent answer before normalization.
#[derive(Debug, Clone, PartialEq)]
pub enum AgentPayload {
    /// JSON recovered from the agent's text.
    Structured(Value),
    /// Text that did not contain a JSON document.
    Text(String),
}

impl AgentPayload {
    /// Classify raw agent text, recovering embedded JSON where possible.
    pub fn from_text(text: &str) -> Self {
        extract_json(text).map_or_else(|| Self::Text(text.trim().to_string()), Self::Structured)
    }
}

/// The gateway's response contract with the frontend.
///
/// Serialized as `{"type": "<kind>", "data": {...}}`. Shape bodies are JSON
/// objects holding at least the fixed fields of the matching builder
/// ([`TableData`], [`PieChartData`], ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum NormalizedResponse {
    Text(Value),
    Table(Map<String, Value>),
    PieChart(Map<String, Value>),
    LineChart(Map<String, Value>),
    Analysis(Map<String, Value>),
    Dashboard(Map<String, Value>),
    AgentChain(Map<String, Value>),
    IntegratedAnalysis(Map<String, Value>),
    Error(Map<String, Value>),
}

impl NormalizedResponse {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(Value::String(text.into()))
    }

    pub fn kind(&self) -> ResponseKind {
        match self {
            Self::Text(_) => ResponseKind::Text,
            Self::Table(_) => ResponseKind::Table,
            Self::PieChart(_) => ResponseKind::PieChart,
            Self::LineChart(_) => ResponseKind::LineChart,
            Self::Analysis(_) => ResponseKind::Analysis,
            Self::Dashboard(_) => ResponseKind::Dashboard,
            Self::AgentChain(_) => ResponseKind::AgentChain,
            Self::IntegratedAnalysis(_) => ResponseKind::IntegratedAnalysis,
            Self::Error(_) => ResponseKind::Error,
        }
    }

    /// Split into the tag and the `data` body.
    pub fn into_parts(self) -> (ResponseKind, Value) {
        let kind = self.kind();
        let data = serde_json::to_value(self)
            .ok()
            .and_then(|mut tagged| tagged.get_mut("data").map(Value::take))
            .unwrap_or(Value::Null);
        (kind, data)
    }

    fn tagged(kind: ResponseKind, data: Map<String, Value>) -> Self {
        match kind {
            ResponseKind::Text => Self::Text(Value::Object(data)),
            ResponseKind::Table => Self::Table(data),
            ResponseKind::PieChart => Self::PieChart(data),
            ResponseKind::LineChart => Self::LineChart(data),
            ResponseKind::Analysis => Self::Analysis(data),
            ResponseKind::Dashboard => Self::Dashboard(data),
            ResponseKind::AgentChain => Self::AgentChain(data),
            ResponseKind::IntegratedAnalysis => Self::IntegratedAnalysis(data),
            ResponseKind::Error => Self::Error(data),
        }
    }
}

/// Build `kind` from loosely-typed fields, defaulting anything unusable.
fn build_shape(kind: ResponseKind, fields: Map<String, Value>) -> Map<String, Value> {
    match kind {
        ResponseKind::Text => fields,
        ResponseKind::Table => shape_fields(TableData::from_fields(fields)),
        ResponseKind::PieChart => shape_fields(PieChartData::from_fields(fields)),
        ResponseKind::LineChart => shape_fields(LineChartData::from_fields(fields)),
        ResponseKind::Analysis => shape_fields(AnalysisData::from_fields(fields)),
        ResponseKind::Dashboard => shape_fields(DashboardData::from_fields(fields)),
        ResponseKind::AgentChain => shape_fields(AgentChainData::from_fields(fields)),
        ResponseKind::IntegratedAnalysis => {
            shape_fields(IntegratedAnalysisData::from_fields(fields))
        }
        ResponseKind::Error => shape_fields(ErrorData::from_fields(fields)),
    }
}

fn shape_fields(shape: impl Serialize) -> Map<String, Value> {
    match serde_json::to_value(shape) {
        Ok(Value::Object(map)) => map,
        _ => Map::new(),
    }
}

/// Keys holding the shape's own marker, rewritten to the canonical value.
fn marker_keys(kind: ResponseKind) -> &'static [&'static str] {
    match kind {
        ResponseKind::Table => &["data_type"],
        ResponseKind::PieChart => &["chart_type"],
        ResponseKind::LineChart => &["analysis_type", "chart_type"],
        ResponseKind::Analysis => &["analysis_type"],
        ResponseKind::Text
        | ResponseKind::Dashboard
        | ResponseKind::AgentChain
        | ResponseKind::IntegratedAnalysis
        | ResponseKind::Error => &[],
    }
}

/// A declared shape keeps the agent's values; `built` only fills gaps.
fn pass_through(
    kind: ResponseKind,
    mut fields: Map<String, Value>,
    built: Map<String, Value>,
) -> Map<String, Value> {
    for key in marker_keys(kind) {
        if let Some(marker) = built.get(*key) {
            fields.insert((*key).to_string(), marker.clone());
        }
    }
    fill_missing(&mut fields, built);
    fields
}

/// Insert every key of `defaults` absent from `target`, recursing into
/// objects present on both sides. Present values are never replaced.
fn fill_missing(target: &mut Map<String, Value>, defaults: Map<String, Value>) {
    for (key, default) in defaults {
        match target.get_mut(&key) {
            Some(Value::Object(present)) => {
                if let Value::Object(nested) = default {
                    fill_missing(present, nested);
                }
            }
            Some(_) => {}
            None => {
                target.insert(key, default);
            }
        }
    }
}

/// Normalize an agent payload into one of the fixed response shapes.
///
/// Total: unrecognized input degrades to [`NormalizedResponse::Text`].
pub fn normalize(payload: &AgentPayload, query: &str, mode: AgentMode) -> NormalizedResponse {
    match payload {
        AgentPayload::Text(text) => NormalizedResponse::text(text.clone()),
        AgentPayload::Structured(value) => normalize_value(value, query, mode),
    }
}

/// Normalize an already-parsed JSON value.
pub fn normalize_value(value: &Value, query: &str, mode: AgentMode) -> NormalizedResponse {
    let Value::Object(fields) = value else {
        return NormalizedResponse::Text(value.clone());
    };

    let (kind, data) = match detect_discriminator(fields, mode) {
        Some(kind) => {
            tracing::trace!(kind = %kind, "Payload declares its shape");
            let built = build_shape(kind, fields.clone());
            (kind, pass_through(kind, fields.clone(), built))
        }
        None => {
            let kind = classify_query(query);
            tracing::trace!(kind = %kind, query_len = query.len(), "Shape chosen from query");
            (kind, build_shape(kind, fields.clone()))
        }
    };
    NormalizedResponse::tagged(kind, data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const PIE_QUERY: &str = "2025년 1월 VOC 카테고리별 분포를 원형 차트로 보여줘";

    #[test]
    fn test_plain_text_is_text() {
        let payload = AgentPayload::Text("안녕하세요".to_string());
        let result = normalize(&payload, PIE_QUERY, AgentMode::QuickSight);
        assert_eq!(result, NormalizedResponse::text("안녕하세요"));
    }

    #[test]
    fn test_structured_non_object_is_text() {
        let payload = AgentPayload::Structured(json!([1, 2, 3]));
        let result = normalize(&payload, PIE_QUERY, AgentMode::QuickSight);
        assert_eq!(result, NormalizedResponse::Text(json!([1, 2, 3])));
    }

    #[test]
    fn test_keyword_classification_fills_pie_defaults() {
        let payload = AgentPayload::Structured(json!({"summary": "카테고리 분포"}));
        let (kind, data) = normalize(&payload, PIE_QUERY, AgentMode::QuickSight).into_parts();
        assert_eq!(kind, ResponseKind::PieChart);
        assert_eq!(data["data"]["labels"], json!(["통화", "가격", "서비스", "기타"]));
        assert_eq!(data["data"]["values"], json!([45, 30, 20, 5]));
        assert_eq!(data["summary"], json!("카테고리 분포"));
    }

    #[test]
    fn test_discriminator_beats_keywords() {
        let payload = AgentPayload::Structured(json!({
            "data_type": "VOC_TABLE",
            "rows": [["2025-01-03", "통화", 7, "70%"]]
        }));
        let result = normalize(&payload, PIE_QUERY, AgentMode::QuickSight);
        assert_eq!(result.kind(), ResponseKind::Table);
    }

    #[test]
    fn test_declared_shape_keeps_supplied_values() {
        let pie = normalize_value(
            &json!({"chart_type": "pie", "total_count": 3245.0, "insights": "통화 비중 최대"}),
            "",
            AgentMode::QuickSight,
        );
        let (kind, data) = pie.into_parts();
        assert_eq!(kind, ResponseKind::PieChart);
        assert_eq!(data["chart_type"], "pie_chart");
        assert_eq!(data["total_count"], json!(3245.0));
        assert_eq!(data["insights"], "통화 비중 최대");
        // Absent keys still get their defaults.
        assert_eq!(data["title"], "2025년 1월 VOC 카테고리별 분포");
        assert_eq!(data["data"]["values"], json!([45, 30, 20, 5]));

        let series = json!([{"hour": "00:00", "통화": 12}]);
        let line = normalize_value(
            &json!({"chart_type": "line_chart", "time_series_data": series.clone()}),
            PIE_QUERY,
            AgentMode::QuickSight,
        );
        let (kind, data) = line.into_parts();
        assert_eq!(kind, ResponseKind::LineChart);
        assert_eq!(data["time_series_data"], series);
        assert_eq!(data["analysis_type"], "FEEDBACK_OVER_TIME");
        assert_eq!(data["categories"], json!(["통화", "가격", "서비스"]));
    }

    #[test]
    fn test_declared_shape_fills_nested_gaps_only() {
        let (_, data) = normalize_value(
            &json!({
                "chart_type": "pie_chart",
                "data": {"labels": "A,B", "values": [1, 2]}
            }),
            "",
            AgentMode::QuickSight,
        )
        .into_parts();
        assert_eq!(data["data"]["labels"], "A,B");
        assert_eq!(data["data"]["values"], json!([1, 2]));
        assert_eq!(data["data"]["percentages"], json!(["45%", "30%", "20%", "5%"]));
    }

    #[test]
    fn test_keyword_shape_replaces_unusable_fields() {
        let (kind, data) = normalize_value(
            &json!({"columns": "date,count", "rows": [["a", 1]]}),
            "테이블로 보여줘",
            AgentMode::QuickSight,
        )
        .into_parts();
        assert_eq!(kind, ResponseKind::Table);
        assert_eq!(data["columns"], json!(["날짜", "카테고리", "건수", "비중"]));
        assert_eq!(data["total_count"], 1);
    }

    #[test]
    fn test_unclassified_object_is_text() {
        let payload = AgentPayload::Structured(json!({"answer": 42}));
        let result = normalize(&payload, "hello", AgentMode::Supervisor);
        assert_eq!(result, NormalizedResponse::Text(json!({"answer": 42})));
    }

    #[test]
    fn test_normalization_is_idempotent() {
        let queries = ["VOC 분석", "테이블", PIE_QUERY, "시간대별 추이", "아무거나"];
        for query in queries {
            let first = normalize_value(&json!({"period": "2025년 2월"}), query, AgentMode::QuickSight);
            let (kind, data) = first.clone().into_parts();
            if kind == ResponseKind::Text {
                continue;
            }
            // Canonical data carries its own discriminator, so the query no longer matters.
            let second = normalize_value(&data, "unrelated", AgentMode::QuickSight);
            assert_eq!(second, first, "shape {kind} changed on re-normalization");
        }
    }

    #[test]
    fn test_supervisor_shapes_idempotent() {
        let chain = normalize_value(
            &json!({"agent_chain": [{"agent": "db"}], "summary": "done"}),
            "",
            AgentMode::Supervisor,
        );
        let (_, data) = chain.clone().into_parts();
        assert_eq!(normalize_value(&data, "", AgentMode::Supervisor), chain);

        let integrated = normalize_value(
            &json!({"integrated_analysis": {"summary": "s", "confidence": 0.8}}),
            "",
            AgentMode::Supervisor,
        );
        let (kind, data) = integrated.clone().into_parts();
        assert_eq!(kind, ResponseKind::IntegratedAnalysis);
        assert_eq!(data["integrated_analysis"]["key_findings"], json!([]));
        assert_eq!(normalize_value(&data, "", AgentMode::Supervisor), integrated);
    }

    #[test]
    fn test_dashboard_and_error_idempotent() {
        for (payload, kind) in [
            (json!({"quicksight_url": "https://qs/d/1"}), ResponseKind::Dashboard),
            (json!({"error": "boom"}), ResponseKind::Error),
        ] {
            let first = normalize_value(&payload, "", AgentMode::QuickSight);
            assert_eq!(first.kind(), kind);
            let (_, data) = first.clone().into_parts();
            assert_eq!(normalize_value(&data, "", AgentMode::QuickSight), first);
        }
    }

    #[test]
    fn test_payload_from_text() {
        assert_eq!(
            AgentPayload::from_text("```json\n{\"a\": 1}\n```"),
            AgentPayload::Structured(json!({"a": 1}))
        );
        assert_eq!(
            AgentPayload::from_text("  plain answer \n"),
            AgentPayload::Text("plain answer".to_string())
        );
    }

    #[test]
    fn test_serialized_wire_shape() {
        let value = serde_json::to_value(NormalizedResponse::text("hi")).unwrap();
        assert_eq!(value, json!({"type": "text", "data": "hi"}));
    }
}
