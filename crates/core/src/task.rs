//! Inbound event shape and the task record it becomes.
//!
//! ```text
//! InboundEvent (loose, caller-provided) --validate--> TaskRecord --to_bytes--> queue
//! queue --from_slice--> TaskRecord (one independent copy per delivery attempt)
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};
use crate::id::{ConversationSid, ExecutionSid, FlowSid, ServiceSid};

/// Raw inbound webhook payload.
///
/// Every field is optional here; presence is checked by [`InboundEvent::validate`]
/// so that a missing field is a validation outcome rather than a parse failure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboundEvent {
    #[serde(default)]
    pub flow_sid: Option<String>,
    #[serde(default)]
    pub execution_sid: Option<String>,
    #[serde(default)]
    pub conversation_sid: Option<String>,
    #[serde(default)]
    pub service_sid: Option<String>,
}

impl InboundEvent {
    /// Check required correlation fields and build the task record.
    ///
    /// Empty strings count as missing. An empty `serviceSid` becomes `None`.
    pub fn validate(self) -> DomainResult<TaskRecord> {
        let mut missing = Vec::new();

        let flow_sid = required(self.flow_sid, "flowSid", &mut missing);
        let execution_sid = required(self.execution_sid, "executionSid", &mut missing);
        let conversation_sid = required(self.conversation_sid, "conversationSid", &mut missing);

        let (Some(flow_sid), Some(execution_sid), Some(conversation_sid)) =
            (flow_sid, execution_sid, conversation_sid)
        else {
            return Err(DomainError::MissingFields(missing));
        };

        let service_sid = self
            .service_sid
            .filter(|s| !s.is_empty())
            .map(ServiceSid::new)
            .transpose()?;

        Ok(TaskRecord {
            flow_sid: FlowSid::new(flow_sid)?,
            execution_sid: ExecutionSid::new(execution_sid)?,
            conversation_sid: ConversationSid::new(conversation_sid)?,
            service_sid,
        })
    }
}

fn required(
    value: Option<String>,
    name: &'static str,
    missing: &mut Vec<&'static str>,
) -> Option<String> {
    match value {
        Some(v) if !v.is_empty() => Some(v),
        _ => {
            missing.push(name);
            None
        }
    }
}

/// The unit of work passed through the queue.
///
/// Immutable once built. Serialized as a flat JSON object with camelCase keys;
/// an absent `serviceSid` is written as `null`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRecord {
    flow_sid: FlowSid,
    execution_sid: ExecutionSid,
    conversation_sid: ConversationSid,
    #[serde(default)]
    service_sid: Option<ServiceSid>,
}

impl TaskRecord {
    pub fn new(
        flow_sid: FlowSid,
        execution_sid: ExecutionSid,
        conversation_sid: ConversationSid,
        service_sid: Option<ServiceSid>,
    ) -> Self {
        Self {
            flow_sid,
            execution_sid,
            conversation_sid,
            service_sid,
        }
    }

    pub fn flow_sid(&self) -> &FlowSid {
        &self.flow_sid
    }

    pub fn execution_sid(&self) -> &ExecutionSid {
        &self.execution_sid
    }

    pub fn conversation_sid(&self) -> &ConversationSid {
        &self.conversation_sid
    }

    pub fn service_sid(&self) -> Option<&ServiceSid> {
        self.service_sid.as_ref()
    }

    /// UTF-8 JSON bytes, as published to the queue.
    pub fn to_bytes(&self) -> DomainResult<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| DomainError::malformed(e.to_string()))
    }

    /// Decode a record previously produced by [`TaskRecord::to_bytes`].
    pub fn from_slice(bytes: &[u8]) -> DomainResult<Self> {
        serde_json::from_slice(bytes).map_err(|e| DomainError::malformed(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event(flow: Option<&str>, exec: Option<&str>, conv: Option<&str>) -> InboundEvent {
        InboundEvent {
            flow_sid: flow.map(str::to_string),
            execution_sid: exec.map(str::to_string),
            conversation_sid: conv.map(str::to_string),
            service_sid: None,
        }
    }

    #[test]
    fn valid_event_becomes_record_with_null_service() {
        let record = event(Some("FW1"), Some("FN1"), Some("CH1")).validate().unwrap();

        let encoded: serde_json::Value = serde_json::from_slice(&record.to_bytes().unwrap()).unwrap();
        assert_eq!(
            encoded,
            json!({
                "flowSid": "FW1",
                "executionSid": "FN1",
                "conversationSid": "CH1",
                "serviceSid": null,
            })
        );
    }

    #[test]
    fn missing_conversation_is_reported_by_name() {
        let err = event(Some("FW1"), Some("FN1"), None).validate().unwrap_err();
        assert_eq!(err.missing_fields(), &["conversationSid"]);
    }

    #[test]
    fn empty_strings_count_as_missing() {
        let err = event(Some(""), Some("FN1"), Some("")).validate().unwrap_err();
        assert_eq!(err.missing_fields(), &["flowSid", "conversationSid"]);
    }

    #[test]
    fn empty_service_sid_is_dropped() {
        let mut ev = event(Some("FW1"), Some("FN1"), Some("CH1"));
        ev.service_sid = Some(String::new());
        assert!(ev.validate().unwrap().service_sid().is_none());
    }

    #[test]
    fn inbound_event_ignores_unknown_fields() {
        let ev: InboundEvent = serde_json::from_value(json!({
            "flowSid": "FW1",
            "executionSid": "FN1",
            "conversationSid": "CH1",
            "serviceSid": "IS1",
            "extra": 42,
        }))
        .unwrap();

        let record = ev.validate().unwrap();
        assert_eq!(record.service_sid().map(|s| s.as_str()), Some("IS1"));
    }

    #[test]
    fn decoding_rejects_record_without_required_field() {
        let bytes = br#"{"flowSid":"FW1","executionSid":"FN1"}"#;
        assert!(matches!(
            TaskRecord::from_slice(bytes),
            Err(DomainError::Malformed(_))
        ));
    }

    #[test]
    fn decoding_accepts_absent_service_sid() {
        let bytes = br#"{"flowSid":"FW1","executionSid":"FN1","conversationSid":"CH1"}"#;
        let record = TaskRecord::from_slice(bytes).unwrap();
        assert_eq!(record.conversation_sid().as_str(), "CH1");
        assert!(record.service_sid().is_none());
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        fn field() -> impl Strategy<Value = Option<String>> {
            prop_oneof![
                Just(None),
                Just(Some(String::new())),
                "[A-Z]{2}[0-9a-f]{1,32}".prop_map(Some),
            ]
        }

        fn present(v: &Option<String>) -> bool {
            v.as_deref().is_some_and(|s| !s.is_empty())
        }

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 256,
                ..ProptestConfig::default()
            })]

            /// Property: validation succeeds exactly when all three required
            /// fields are present and non-empty, and every absent one is named.
            #[test]
            fn validation_accepts_iff_all_required_present(
                flow in field(),
                exec in field(),
                conv in field(),
            ) {
                let all_present = present(&flow) && present(&exec) && present(&conv);
                let expected_missing: Vec<&str> = [
                    ("flowSid", &flow),
                    ("executionSid", &exec),
                    ("conversationSid", &conv),
                ]
                .into_iter()
                .filter(|(_, v)| !present(v))
                .map(|(name, _)| name)
                .collect();

                let ev = InboundEvent {
                    flow_sid: flow,
                    execution_sid: exec,
                    conversation_sid: conv,
                    service_sid: None,
                };

                match ev.validate() {
                    Ok(_) => prop_assert!(all_present),
                    Err(err) => {
                        prop_assert!(!all_present);
                        prop_assert_eq!(err.missing_fields(), expected_missing.as_slice());
                    }
                }
            }
        }
    }
}
