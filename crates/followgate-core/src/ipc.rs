use serde::{Deserialize, Serialize};

/// Messages into the page runtime (JSON-lines over Unix socket).
///
/// The three `INSTAGRAM_*` variants are relayed from the popup page; the rest
/// come from `followctl`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMsg {
    #[serde(rename = "INSTAGRAM_LOGIN_SUCCESS")]
    LoginSuccess {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        generation: Option<u64>,
    },
    #[serde(rename = "INSTAGRAM_LOGIN_ATTEMPT")]
    LoginAttempt {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        generation: Option<u64>,
    },
    #[serde(rename = "INSTAGRAM_POPUP_CLOSED_WITHOUT_LOGIN")]
    PopupClosedWithoutLogin {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        generation: Option<u64>,
    },
    /// Open a fresh verification popup.
    #[serde(rename = "verify")]
    Verify,
    /// The opener window regained focus.
    #[serde(rename = "focus")]
    Focus,
    /// Abandon the current verification popup.
    #[serde(rename = "cancel")]
    Cancel,
    #[serde(rename = "set_field")]
    SetField { field: String, value: String },
    #[serde(rename = "toggle_skill")]
    ToggleSkill { skill: String },
    #[serde(rename = "submit")]
    Submit,
    #[serde(rename = "get_status")]
    GetStatus,
    /// Any other `type`. Ignored by the runtime.
    #[serde(other)]
    Unknown,
}

/// Messages from the page runtime back to a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerMsg {
    #[serde(rename = "status")]
    Status {
        generation: u64,
        state: String,
        followed: bool,
        submitted: bool,
        /// Categories of the notifications currently visible.
        notifications: Vec<String>,
    },
    #[serde(rename = "ack")]
    Ack { ok: bool, message: String },
}

impl ServerMsg {
    pub fn ok(message: impl Into<String>) -> Self {
        ServerMsg::Ack { ok: true, message: message.into() }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        ServerMsg::Ack { ok: false, message: message.into() }
    }
}

/// Serialize a message as a JSON line (with trailing newline).
pub fn encode(msg: &impl Serialize) -> String {
    let mut s = serde_json::to_string(msg).expect("serialize IPC message");
    s.push('\n');
    s
}

/// Deserialize a JSON line. Returns None on empty/whitespace input or
/// anything that is not a tagged object.
pub fn decode_client(line: &str) -> Option<ClientMsg> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }
    serde_json::from_str(trimmed).ok()
}

pub fn decode_server(line: &str) -> Option<ServerMsg> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }
    serde_json::from_str(trimmed).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_produces_single_trailing_newline() {
        let encoded = encode(&ClientMsg::Verify);
        assert!(encoded.ends_with('\n'));
        assert_eq!(encoded.matches('\n').count(), 1);
    }

    // --- popup contract uses the page's message names ---

    #[test]
    fn decodes_bare_success_message() {
        let msg = decode_client(r#"{"type":"INSTAGRAM_LOGIN_SUCCESS"}"#).unwrap();
        assert_eq!(msg, ClientMsg::LoginSuccess { generation: None });
    }

    #[test]
    fn decodes_tagged_attempt_message() {
        let msg = decode_client(r#"{"type":"INSTAGRAM_LOGIN_ATTEMPT","generation":4}"#).unwrap();
        assert_eq!(msg, ClientMsg::LoginAttempt { generation: Some(4) });
    }

    #[test]
    fn decodes_closed_without_login_message() {
        let msg = decode_client(
            r#"{"type":"INSTAGRAM_POPUP_CLOSED_WITHOUT_LOGIN","generation":2}"#,
        )
        .unwrap();
        assert_eq!(msg, ClientMsg::PopupClosedWithoutLogin { generation: Some(2) });
    }

    #[test]
    fn extra_payload_fields_are_tolerated() {
        let msg = decode_client(
            r#"{"type":"INSTAGRAM_LOGIN_SUCCESS","generation":1,"username":"someone"}"#,
        )
        .unwrap();
        assert_eq!(msg, ClientMsg::LoginSuccess { generation: Some(1) });
    }

    #[test]
    fn untagged_generation_is_omitted_when_encoding() {
        let encoded = encode(&ClientMsg::LoginAttempt { generation: None });
        assert!(!encoded.contains("generation"));
    }

    #[test]
    fn set_field_carries_field_and_value() {
        let line = encode(&ClientMsg::SetField {
            field: "email".into(),
            value: "a@b.co".into(),
        });
        assert!(line.contains("\"type\":\"set_field\""));
        assert_eq!(
            decode_client(&line),
            Some(ClientMsg::SetField { field: "email".into(), value: "a@b.co".into() })
        );
    }

    // --- unrelated messages are recognised as such, never an error ---

    #[test]
    fn unknown_type_decodes_to_unknown() {
        let msg = decode_client(r#"{"type":"webpackOk"}"#).unwrap();
        assert_eq!(msg, ClientMsg::Unknown);
    }

    #[test]
    fn missing_type_field_is_rejected() {
        assert!(decode_client(r#"{"generation":1}"#).is_none());
    }

    #[test]
    fn garbage_and_blank_lines_are_rejected() {
        assert!(decode_client("").is_none());
        assert!(decode_client("   \n").is_none());
        assert!(decode_client("not json").is_none());
    }

    #[test]
    fn status_reply_decodes() {
        let line = encode(&ServerMsg::Status {
            generation: 3,
            state: "succeeded".into(),
            followed: true,
            submitted: false,
            notifications: vec!["success".into()],
        });
        match decode_server(&line) {
            Some(ServerMsg::Status { generation, followed, notifications, .. }) => {
                assert_eq!(generation, 3);
                assert!(followed);
                assert_eq!(notifications, vec!["success"]);
            }
            other => panic!("expected Status, got {other:?}"),
        }
    }

    #[test]
    fn ack_helpers_set_ok_flag() {
        assert_eq!(ServerMsg::ok("done"), ServerMsg::Ack { ok: true, message: "done".into() });
        assert!(matches!(ServerMsg::failed("no"), ServerMsg::Ack { ok: false, .. }));
    }
}
