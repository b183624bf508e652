//! Amazon Bedrock Agents runtime.

use std::time::Duration;

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_config::timeout::TimeoutConfig;
use aws_credential_types::Credentials;
use aws_sdk_bedrockagentruntime::Client;
use aws_sdk_bedrockagentruntime::config::Region;
use aws_sdk_bedrockagentruntime::error::DisplayErrorContext;
use aws_sdk_bedrockagentruntime::types::{
    InvocationInput, Observation as BedrockObservation, OrchestrationTrace, ResponseStream, Trace,
};
use tracing::{debug, info, trace};

use super::{AgentError, AgentRuntime, InvokeRequest, UpstreamStream};
use crate::config::AwsConfig;
use crate::trace::{Observation, TraceEvent};

/// Invokes agents through the Bedrock Agent Runtime `InvokeAgent` API.
#[derive(Debug, Clone)]
pub struct BedrockRuntime {
    client: Client,
}

impl BedrockRuntime {
    /// Build a client for the configured region and timeouts.
    ///
    /// Static credentials are used when both halves are configured; otherwise
    /// the SDK's default provider chain applies.
    pub async fn from_config(aws: &AwsConfig) -> Self {
        let timeouts = TimeoutConfig::builder()
            .connect_timeout(Duration::from_secs(aws.connect_timeout_secs))
            .read_timeout(Duration::from_secs(aws.read_timeout_secs))
            .build();

        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(aws.region.clone()))
            .timeout_config(timeouts);

        if let (Some(access_key), Some(secret_key)) = (&aws.access_key_id, &aws.secret_access_key) {
            loader = loader.credentials_provider(Credentials::new(
                access_key,
                secret_key,
                None, // session token
                None, // expiry
                "kicksight-config",
            ));
        }

        let shared = loader.load().await;
        info!(
            name: "bedrock.client.ready",
            region = %aws.region,
            static_credentials = aws.access_key_id.is_some(),
            "Bedrock agent runtime client ready"
        );

        Self {
            client: Client::new(&shared),
        }
    }
}

fn transport_error<E: std::error::Error>(err: &E) -> AgentError {
    AgentError::Transport(DisplayErrorContext(err).to_string())
}

#[async_trait]
impl AgentRuntime for BedrockRuntime {
    async fn invoke(&self, request: InvokeRequest) -> Result<UpstreamStream, AgentError> {
        let output = self
            .client
            .invoke_agent()
            .agent_id(&request.target.agent_id)
            .agent_alias_id(&request.target.alias_id)
            .session_id(&request.session_id)
            .input_text(&request.prompt)
            .enable_trace(request.enable_trace)
            .send()
            .await
            .map_err(|e| transport_error(&e))?;

        let mut completion = output.completion;
        let stream = async_stream::try_stream! {
            let mut mapper = TraceMapper::default();
            while let Some(event) = completion.recv().await.map_err(|e| transport_error(&e))? {
                if let Some(mapped) = mapper.map(&event) {
                    trace!(event = ?mapped, "Bedrock stream event");
                    yield mapped;
                }
            }
            debug!("Bedrock completion stream ended");
        };

        Ok(Box::pin(stream))
    }

    fn name(&self) -> &'static str {
        "bedrock"
    }
}

/// Maps Bedrock `ResponseStream` members onto [`TraceEvent`]s.
///
/// Action-group outputs do not repeat the action group's name, so the mapper
/// remembers the most recent invocation input.
#[derive(Debug, Default)]
pub struct TraceMapper {
    last_invoked: Option<String>,
}

impl TraceMapper {
    /// Map one stream member. Chunks without bytes map to nothing.
    pub fn map(&mut self, event: &ResponseStream) -> Option<TraceEvent> {
        match event {
            ResponseStream::Chunk(part) => part.bytes().map(|bytes| TraceEvent::ResponseChunk {
                text: String::from_utf8_lossy(bytes.as_ref()).into_owned(),
            }),
            ResponseStream::Trace(part) => Some(match part.trace() {
                Some(Trace::OrchestrationTrace(orchestration)) => self.map_orchestration(orchestration),
                Some(other) => unrecognized(trace_kind(other)),
                None => unrecognized("empty_trace"),
            }),
            _ => Some(unrecognized("stream_member")),
        }
    }

    fn map_orchestration(&mut self, orchestration: &OrchestrationTrace) -> TraceEvent {
        match orchestration {
            OrchestrationTrace::Rationale(rationale) => TraceEvent::Reasoning {
                text: rationale.text().unwrap_or_default().to_string(),
            },
            OrchestrationTrace::InvocationInput(input) => {
                let name = invocation_name(input);
                self.last_invoked = Some(name.clone());
                TraceEvent::SubAgentInvocation { name }
            }
            OrchestrationTrace::Observation(observation) => {
                TraceEvent::SubAgentObservation(self.map_observation(observation))
            }
            _ => unrecognized("orchestration"),
        }
    }

    fn map_observation(&self, observation: &BedrockObservation) -> Observation {
        if let Some(lookup) = observation.knowledge_base_lookup_output() {
            return Observation::KnowledgeBaseLookup {
                references_count: lookup.retrieved_references().len(),
            };
        }

        if let Some(output) = observation.action_group_invocation_output() {
            return Observation::ActionResult {
                action_group_name: self.last_invoked.clone().unwrap_or_default(),
                text: output.text().unwrap_or_default().to_string(),
            };
        }

        if let Some(output) = observation.agent_collaborator_invocation_output() {
            let name = output
                .agent_collaborator_name()
                .map(str::to_string)
                .or_else(|| self.last_invoked.clone())
                .unwrap_or_default();
            return Observation::ActionResult {
                action_group_name: name,
                text: output
                    .output()
                    .and_then(|payload| payload.text())
                    .unwrap_or_default()
                    .to_string(),
            };
        }

        Observation::Other
    }
}

/// Collaborator name, else action group name, else empty.
fn invocation_name(input: &InvocationInput) -> String {
    input
        .agent_collaborator_invocation_input()
        .and_then(|collaborator| collaborator.agent_collaborator_name())
        .or_else(|| {
            input
                .action_group_invocation_input()
                .and_then(|action| action.action_group_name())
        })
        .unwrap_or_default()
        .to_string()
}

fn unrecognized(kind: &str) -> TraceEvent {
    TraceEvent::Unrecognized {
        kind: kind.to_string(),
    }
}

fn trace_kind(trace: &Trace) -> &'static str {
    match trace {
        Trace::PreProcessingTrace(_) => "pre_processing",
        Trace::PostProcessingTrace(_) => "post_processing",
        Trace::FailureTrace(_) => "failure",
        Trace::GuardrailTrace(_) => "guardrail",
        _ => "trace",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_bedrockagentruntime::primitives::Blob;
    use aws_sdk_bedrockagentruntime::types::{
        ActionGroupInvocationOutput, KnowledgeBaseLookupOutput, PayloadPart, Rationale,
        RetrievedReference, TracePart,
    };

    fn orchestration(trace: OrchestrationTrace) -> ResponseStream {
        ResponseStream::Trace(
            TracePart::builder()
                .trace(Trace::OrchestrationTrace(trace))
                .build(),
        )
    }

    #[test]
    fn test_chunk_bytes_become_text() {
        let mut mapper = TraceMapper::default();
        let chunk = ResponseStream::Chunk(PayloadPart::builder().bytes(Blob::new("안녕")).build());
        assert_eq!(
            mapper.map(&chunk),
            Some(TraceEvent::ResponseChunk { text: "안녕".into() })
        );
    }

    #[test]
    fn test_rationale_is_reasoning() {
        let mut mapper = TraceMapper::default();
        let event = orchestration(OrchestrationTrace::Rationale(
            Rationale::builder().text("Refine the query first").build(),
        ));
        assert_eq!(
            mapper.map(&event),
            Some(TraceEvent::Reasoning { text: "Refine the query first".into() })
        );
    }

    #[test]
    fn test_knowledge_base_reference_count() {
        let mut mapper = TraceMapper::default();
        let lookup = KnowledgeBaseLookupOutput::builder()
            .retrieved_references(RetrievedReference::builder().build())
            .retrieved_references(RetrievedReference::builder().build())
            .build();
        let event = orchestration(OrchestrationTrace::Observation(
            BedrockObservation::builder().knowledge_base_lookup_output(lookup).build(),
        ));
        assert_eq!(
            mapper.map(&event),
            Some(TraceEvent::SubAgentObservation(Observation::KnowledgeBaseLookup {
                references_count: 2
            }))
        );
    }

    #[test]
    fn test_action_output_without_prior_input() {
        let mut mapper = TraceMapper::default();
        let output = ActionGroupInvocationOutput::builder().text("rows: 42").build();
        let event = orchestration(OrchestrationTrace::Observation(
            BedrockObservation::builder().action_group_invocation_output(output).build(),
        ));
        assert_eq!(
            mapper.map(&event),
            Some(TraceEvent::SubAgentObservation(Observation::ActionResult {
                action_group_name: String::new(),
                text: "rows: 42".into(),
            }))
        );
    }

    #[test]
    fn test_empty_observation_is_other() {
        let mut mapper = TraceMapper::default();
        let event = orchestration(OrchestrationTrace::Observation(BedrockObservation::builder().build()));
        assert_eq!(
            mapper.map(&event),
            Some(TraceEvent::SubAgentObservation(Observation::Other))
        );
    }
}
