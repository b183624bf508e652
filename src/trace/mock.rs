//! Canned supervisor trace for frontend development.

use chrono::{DateTime, TimeDelta, Utc};
use serde_json::json;

use crate::agent::AgentMode;
use crate::events::ClientEvent;
use crate::response::NormalizedResponse;

/// Synthetic gap between consecutive mock event timestamps, in milliseconds.
pub const MOCK_EVENT_SPACING_MS: i64 = 500;

const PLAN: &str = "To address this request, I'll need to:\n\
1. Refine the query for precise VOC data analysis\n\
2. Get the database query results\n\
3. Create a visualization dashboard\n\
4. Prepare a comprehensive analysis response";

const ANALYSIS_THOUGHT: &str = "이 요청을 처리하기 위해 2025년 1월 VOC 데이터에 대한 종합 분석을 수행해야 합니다. \
이를 위해 여러 가지 분석을 포함하는 SQL 쿼리를 생성해야 합니다. \
먼저 필요한 데이터를 추출하고 분석하기 위해 voc_data_analysis 함수를 사용하겠습니다.\n\
</thinking>\n\n\
voc_data_analysis: {\"start_date\": \"2025-01-01\", \"end_date\": \"2025-01-31\", \"analysis_type\": \"comprehensive\"}\n\n\
<thinking>\n\
voc_data_analysis 함수를 통해 2025년 1월의 VOC 데이터에 대한 종합 분석 결과를 얻었습니다. \
이제 이 결과를 바탕으로 사용자의 요청에 맞게 정보를 정리하여 제공하겠습니다.";

const DASHBOARD_THOUGHT: &str = "To create a dashboard for the January 2025 VOC data analysis, \
I'll need to generate a QuickSight dashboard configuration JSON that includes the requested visualizations...";

/// The fixed mock sequence, timestamped from `started_at` at
/// [`MOCK_EVENT_SPACING_MS`] intervals.
///
/// A non-empty `user_message` is echoed in the `stream_start` message.
pub fn mock_trace(user_message: &str, started_at: DateTime<Utc>) -> Vec<ClientEvent> {
    let at = |index: i64| started_at + TimeDelta::milliseconds(MOCK_EVENT_SPACING_MS * index);
    let anonymous_agent = |index: i64| ClientEvent::AgentStart {
        agent: String::new(),
        display_name: String::new(),
        message: " 호출 중...".to_string(),
        timestamp: at(index),
    };

    let mut start_message = format!("{} 분석을 시작합니다...", AgentMode::Supervisor.display_name());
    if !user_message.is_empty() {
        start_message.push_str(&format!("   (사용자 요청: {user_message})"));
    }

    vec![
        ClientEvent::StreamStart {
            message: start_message,
            timestamp: at(0),
        },
        ClientEvent::Reasoning {
            content: PLAN.to_string(),
            timestamp: at(1),
        },
        anonymous_agent(2),
        anonymous_agent(3),
        anonymous_agent(4),
        ClientEvent::KnowledgeBase {
            references_count: 5,
            message: "Knowledge Base에서 5개의 참조를 찾았습니다.".to_string(),
            timestamp: at(5),
        },
        ClientEvent::Reasoning {
            content: ANALYSIS_THOUGHT.to_string(),
            timestamp: at(6),
        },
        anonymous_agent(7),
        ClientEvent::Reasoning {
            content: DASHBOARD_THOUGHT.to_string(),
            timestamp: at(8),
        },
        ClientEvent::FinalResponse {
            success: true,
            result: sample_report(),
            timestamp: at(9),
        },
    ]
}

fn sample_report() -> NormalizedResponse {
    NormalizedResponse::Text(json!({
        "query_id": "VOC_2025_01_ANALYSIS",
        "query": "SELECT COUNT(*), category_name, channel, priority, status \
                  FROM voc_reports WHERE year = 2025 AND month = 1 \
                  GROUP BY category_name, channel, priority, status",
        "explanation": "2025년 1월 VOC 데이터의 종합 분석 결과입니다.",
        "sample_analysis": "총 3,245건의 VOC 접수, 불만 유형 45%…",
        "csv_url": "https://example.com/voc-analysis/2025-01/data.csv",
        "chart_url": "https://example.com/quicksight/2025-01",
        "visualization_analysis_result": "모바일 앱을 통한 불만 접수가 가장 많았으며, 주로 지연과 수하물 관련...",
    }))
}
