//! Shape selection: discriminator fields first, query keywords second.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::agent::AgentMode;

/// Canonical tag of a [`NormalizedResponse`](super::NormalizedResponse).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseKind {
    Text,
    Table,
    PieChart,
    LineChart,
    Analysis,
    Dashboard,
    AgentChain,
    IntegratedAnalysis,
    Error,
}

impl ResponseKind {
    /// Wire name, as used in `response_type` and the `type` tag.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Table => "table",
            Self::PieChart => "pie_chart",
            Self::LineChart => "line_chart",
            Self::Analysis => "analysis",
            Self::Dashboard => "dashboard",
            Self::AgentChain => "agent_chain",
            Self::IntegratedAnalysis => "integrated_analysis",
            Self::Error => "error",
        }
    }
}

impl std::fmt::Display for ResponseKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Detect a shape the payload already declares through a marker field.
///
/// First match wins: `error`, then (supervisor only) `agent_chain` and
/// `integrated_analysis`, then `chart_type`, table markers, the analysis
/// marker, and finally dashboard URLs.
pub fn detect_discriminator(obj: &Map<String, Value>, mode: AgentMode) -> Option<ResponseKind> {
    if obj.contains_key("error") {
        return Some(ResponseKind::Error);
    }

    if mode == AgentMode::Supervisor {
        if obj.contains_key("agent_chain") {
            return Some(ResponseKind::AgentChain);
        }
        if obj.contains_key("integrated_analysis") {
            return Some(ResponseKind::IntegratedAnalysis);
        }
    }

    if let Some(chart_type) = obj.get("chart_type") {
        return Some(chart_kind(chart_type.as_str().unwrap_or_default()));
    }

    if obj.get("data_type").and_then(Value::as_str) == Some("VOC_TABLE")
        || obj.contains_key("table_data")
    {
        return Some(ResponseKind::Table);
    }

    match obj.get("analysis_type").and_then(Value::as_str) {
        Some("VOC_DATA_ANALYSIS") => return Some(ResponseKind::Analysis),
        Some("FEEDBACK_OVER_TIME") => return Some(ResponseKind::LineChart),
        _ => {}
    }

    if obj.contains_key("dashboard_url") || obj.contains_key("quicksight_url") {
        return Some(ResponseKind::Dashboard);
    }

    None
}

/// Map a free-form chart type marker onto a chart shape.
///
/// Anything that is not a pie or doughnut renders as a line chart.
pub fn chart_kind(chart_type: &str) -> ResponseKind {
    match chart_type.to_ascii_lowercase().as_str() {
        "pie" | "pie_chart" | "doughnut" | "doughnut_chart" => ResponseKind::PieChart,
        _ => ResponseKind::LineChart,
    }
}

const ANALYSIS_KEYWORDS: &[&str] = &["분석", "analysis", "analyze"];
const DOMAIN_KEYWORDS: &[&str] = &["voc"];
const TABLE_KEYWORDS: &[&str] = &["테이블", "table"];
const PIE_KEYWORDS: &[&str] = &["원형", "파이", "pie", "circular"];
const LINE_KEYWORDS: &[&str] = &["시간대", "추이", "trend", "over time"];

/// Guess the intended shape from the user's query text.
pub fn classify_query(query: &str) -> ResponseKind {
    let query = query.to_lowercase();
    let mentions = |keywords: &[&str]| keywords.iter().any(|k| query.contains(k));

    if mentions(ANALYSIS_KEYWORDS) && mentions(DOMAIN_KEYWORDS) {
        ResponseKind::Analysis
    } else if mentions(TABLE_KEYWORDS) {
        ResponseKind::Table
    } else if mentions(PIE_KEYWORDS) {
        ResponseKind::PieChart
    } else if mentions(LINE_KEYWORDS) {
        ResponseKind::LineChart
    } else {
        ResponseKind::Text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn obj(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_classify_query_keywords() {
        assert_eq!(classify_query("2025년 1월 VOC 분석해줘"), ResponseKind::Analysis);
        assert_eq!(classify_query("Analyze the VOC backlog"), ResponseKind::Analysis);
        assert_eq!(classify_query("카테고리별 건수를 테이블로"), ResponseKind::Table);
        assert_eq!(
            classify_query("2025년 1월 VOC 카테고리별 분포를 원형 차트로 보여줘"),
            ResponseKind::PieChart
        );
        assert_eq!(classify_query("Show a PIE chart"), ResponseKind::PieChart);
        assert_eq!(classify_query("시간대별 피드백 추이"), ResponseKind::LineChart);
        assert_eq!(classify_query("complaints over time"), ResponseKind::LineChart);
        assert_eq!(classify_query("안녕하세요"), ResponseKind::Text);
    }

    #[test]
    fn test_analysis_requires_domain_keyword() {
        assert_eq!(classify_query("분석해줘"), ResponseKind::Text);
        assert_eq!(classify_query("trend analysis"), ResponseKind::LineChart);
    }

    #[test]
    fn test_discriminator_precedence() {
        let both = obj(json!({"error": "boom", "chart_type": "pie"}));
        assert_eq!(
            detect_discriminator(&both, AgentMode::QuickSight),
            Some(ResponseKind::Error)
        );

        let chart = obj(json!({"chart_type": "doughnut", "data_type": "VOC_TABLE"}));
        assert_eq!(
            detect_discriminator(&chart, AgentMode::QuickSight),
            Some(ResponseKind::PieChart)
        );

        let bar = obj(json!({"chart_type": "bar"}));
        assert_eq!(
            detect_discriminator(&bar, AgentMode::QuickSight),
            Some(ResponseKind::LineChart)
        );
    }

    #[test]
    fn test_supervisor_only_markers() {
        let chain = obj(json!({"agent_chain": [], "dashboard_url": "https://x"}));
        assert_eq!(
            detect_discriminator(&chain, AgentMode::Supervisor),
            Some(ResponseKind::AgentChain)
        );
        assert_eq!(
            detect_discriminator(&chain, AgentMode::QuickSight),
            Some(ResponseKind::Dashboard)
        );
    }

    #[test]
    fn test_no_discriminator() {
        let plain = obj(json!({"answer": 42}));
        assert_eq!(detect_discriminator(&plain, AgentMode::Supervisor), None);
    }
}
