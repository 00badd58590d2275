use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::{MultisigRecord, RequestId, SignPayload};
use crate::ports::PortError;

/// Which world posted a window message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageOrigin {
    #[serde(rename = "MESSAGE_ORIGIN_PAGE")]
    Page,
    #[serde(rename = "MESSAGE_ORIGIN_CONTENT")]
    Content,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Hop {
    FromPage,
    FromGateway,
    FromContent,
    FromBackgroundToGateway,
    ToPage,
    InGateway,
    FromContentToGateway,
    FromPageToGateway,
    Extension,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    GetMultisigs,
    MultisigData,
    SignPayload,
    PopupGetMultisigs,
    Multisigs,
}

#[derive(Debug, Clone, PartialEq)]
pub enum WindowMessage {
    /// `FROM_PAGE` / `get_multisigs`
    GetMultisigs { request_id: RequestId },
    /// `FROM_GATEWAY` / `multisig_data`
    MultisigData { multisig_data: Value },
    /// `FROM_PAGE_TO_GATEWAY` / `sign_payload`
    ProposeSignPayload { payload: SignPayload },
    /// `FROM_CONTENT_TO_GATEWAY` / `sign_payload`
    ContentSignPayload { payload: SignPayload },
    /// `FROM_BACKGROUND_TO_GATEWAY` / `sign_payload`
    BackgroundSignPayload { payload: SignPayload },
    /// `IN_GATEWAY` / `sign_payload`
    InGatewaySignPayload { payload: SignPayload },
    /// `TO_PAGE` / `multisigs`
    Multisigs {
        request_id: RequestId,
        multisigs: Vec<MultisigRecord>,
    },
    /// `FROM_CONTENT`: relayed from the extension port.
    FromContent { data: Value },
    /// `EXTENSION`: page traffic passed straight through to the port.
    Extension { data: Value },
}

impl WindowMessage {
    pub fn hop(&self) -> Hop {
        match self {
            Self::GetMultisigs { .. } => Hop::FromPage,
            Self::MultisigData { .. } => Hop::FromGateway,
            Self::ProposeSignPayload { .. } => Hop::FromPageToGateway,
            Self::ContentSignPayload { .. } => Hop::FromContentToGateway,
            Self::BackgroundSignPayload { .. } => Hop::FromBackgroundToGateway,
            Self::InGatewaySignPayload { .. } => Hop::InGateway,
            Self::Multisigs { .. } => Hop::ToPage,
            Self::FromContent { .. } => Hop::FromContent,
            Self::Extension { .. } => Hop::Extension,
        }
    }

    pub fn operation(&self) -> Option<Operation> {
        match self {
            Self::GetMultisigs { .. } => Some(Operation::GetMultisigs),
            Self::MultisigData { .. } => Some(Operation::MultisigData),
            Self::ProposeSignPayload { .. }
            | Self::ContentSignPayload { .. }
            | Self::BackgroundSignPayload { .. }
            | Self::InGatewaySignPayload { .. } => Some(Operation::SignPayload),
            Self::Multisigs { .. } => Some(Operation::Multisigs),
            Self::FromContent { .. } | Self::Extension { .. } => None,
        }
    }
}

/// A window message together with the sentinel of the world that posted it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "WireEnvelope", into = "WireEnvelope")]
pub struct WindowEnvelope {
    pub origin: MessageOrigin,
    pub message: WindowMessage,
}

impl WindowEnvelope {
    pub fn page(message: WindowMessage) -> Self {
        Self {
            origin: MessageOrigin::Page,
            message,
        }
    }

    pub fn content(message: WindowMessage) -> Self {
        Self {
            origin: MessageOrigin::Content,
            message,
        }
    }

    pub fn to_value(&self) -> Result<Value, PortError> {
        serde_json::to_value(self)
            .map_err(|e| PortError::Validation(format!("window envelope encode failed: {e}")))
    }

    pub fn parse(raw: &Value) -> Result<Self, PortError> {
        Self::deserialize(raw)
            .map_err(|e| PortError::Validation(format!("unrecognised window message: {e}")))
    }

    /// Parses `raw` and checks its origin sentinel. Unknown shapes and foreign
    /// origins yield `None`; neither is an error for a window listener.
    pub fn accept(raw: &Value, expected: MessageOrigin) -> Option<Self> {
        match Self::parse(raw) {
            Ok(envelope) if envelope.origin == expected => Some(envelope),
            Ok(envelope) => {
                tracing::trace!(
                    origin = ?envelope.origin,
                    expected = ?expected,
                    hop = ?envelope.message.hop(),
                    "dropping window message from foreign origin"
                );
                None
            }
            Err(e) => {
                tracing::trace!(error = %e, "ignoring window message");
                None
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireEnvelope {
    origin: MessageOrigin,
    #[serde(rename = "type")]
    hop: Hop,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<Operation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    request_id: Option<RequestId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    payload: Option<SignPayload>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    multisig_data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    multisigs: Option<Vec<MultisigRecord>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

impl WireEnvelope {
    fn bare(origin: MessageOrigin, hop: Hop, text: Option<Operation>) -> Self {
        Self {
            origin,
            hop,
            text,
            request_id: None,
            payload: None,
            multisig_data: None,
            multisigs: None,
            data: None,
        }
    }

    fn take_payload(&mut self) -> Result<SignPayload, PortError> {
        self.payload
            .take()
            .ok_or_else(|| PortError::Validation(format!("{:?}/sign_payload without payload", self.hop)))
    }

    fn take_request_id(&mut self) -> Result<RequestId, PortError> {
        self.request_id
            .take()
            .ok_or_else(|| PortError::Validation(format!("{:?} without requestId", self.hop)))
    }
}

impl TryFrom<WireEnvelope> for WindowEnvelope {
    type Error = PortError;

    fn try_from(mut wire: WireEnvelope) -> Result<Self, Self::Error> {
        use Hop as H;
        use Operation as O;

        let message = match (wire.hop, wire.text) {
            (H::FromPage, Some(O::GetMultisigs)) => WindowMessage::GetMultisigs {
                request_id: wire.take_request_id()?,
            },
            (H::FromGateway, Some(O::MultisigData)) => WindowMessage::MultisigData {
                multisig_data: wire.multisig_data.take().ok_or_else(|| {
                    PortError::Validation("multisig_data without multisigData".to_owned())
                })?,
            },
            (H::FromPageToGateway, Some(O::SignPayload)) => WindowMessage::ProposeSignPayload {
                payload: wire.take_payload()?,
            },
            (H::FromContentToGateway, Some(O::SignPayload)) => WindowMessage::ContentSignPayload {
                payload: wire.take_payload()?,
            },
            (H::FromBackgroundToGateway, Some(O::SignPayload)) => {
                WindowMessage::BackgroundSignPayload {
                    payload: wire.take_payload()?,
                }
            }
            (H::InGateway, Some(O::SignPayload)) => WindowMessage::InGatewaySignPayload {
                payload: wire.take_payload()?,
            },
            (H::ToPage, Some(O::Multisigs)) => WindowMessage::Multisigs {
                request_id: wire.take_request_id()?,
                multisigs: wire.multisigs.take().unwrap_or_default(),
            },
            (H::FromContent, _) => WindowMessage::FromContent {
                data: wire.data.take().unwrap_or(Value::Null),
            },
            (H::Extension, _) => WindowMessage::Extension {
                data: wire.data.take().unwrap_or(Value::Null),
            },
            (hop, text) => {
                return Err(PortError::Validation(format!(
                    "no window message for {hop:?}/{text:?}"
                )))
            }
        };
        Ok(Self {
            origin: wire.origin,
            message,
        })
    }
}

impl From<WindowEnvelope> for WireEnvelope {
    fn from(envelope: WindowEnvelope) -> Self {
        let hop = envelope.message.hop();
        let mut wire = WireEnvelope::bare(envelope.origin, hop, envelope.message.operation());
        match envelope.message {
            WindowMessage::GetMultisigs { request_id } => wire.request_id = Some(request_id),
            WindowMessage::MultisigData { multisig_data } => {
                wire.multisig_data = Some(multisig_data)
            }
            WindowMessage::ProposeSignPayload { payload }
            | WindowMessage::ContentSignPayload { payload }
            | WindowMessage::BackgroundSignPayload { payload }
            | WindowMessage::InGatewaySignPayload { payload } => wire.payload = Some(payload),
            WindowMessage::Multisigs {
                request_id,
                multisigs,
            } => {
                wire.request_id = Some(request_id);
                wire.multisigs = Some(multisigs);
            }
            WindowMessage::FromContent { data } | WindowMessage::Extension { data } => {
                wire.data = Some(data)
            }
        }
        wire
    }
}

/// Content script -> background, via `runtime.sendMessage`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "text", rename_all = "snake_case")]
pub enum RuntimeRequest {
    MultisigData {
        #[serde(rename = "multisigData")]
        multisig_data: Value,
    },
    PopupGetMultisigs,
    GetMultisigs {
        hostname: String,
    },
    SignPayload {
        hostname: String,
        payload: SignPayload,
    },
}

impl RuntimeRequest {
    /// Also accepts the popup's bare `"popup_get_multisigs"` string.
    pub fn from_wire(raw: &Value) -> Result<Self, PortError> {
        if let Some(text) = raw.as_str() {
            return match text {
                "popup_get_multisigs" => Ok(Self::PopupGetMultisigs),
                other => Err(PortError::Validation(format!(
                    "unrecognised runtime message: {other}"
                ))),
            };
        }
        Self::deserialize(raw)
            .map_err(|e| PortError::Validation(format!("unrecognised runtime message: {e}")))
    }

    pub fn operation(&self) -> Operation {
        match self {
            Self::MultisigData { .. } => Operation::MultisigData,
            Self::PopupGetMultisigs => Operation::PopupGetMultisigs,
            Self::GetMultisigs { .. } => Operation::GetMultisigs,
            Self::SignPayload { .. } => Operation::SignPayload,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RuntimeResponse {
    Multisigs(Vec<MultisigRecord>),
}

impl RuntimeResponse {
    pub fn into_multisigs(self) -> Vec<MultisigRecord> {
        match self {
            Self::Multisigs(list) => list,
        }
    }
}

/// Background -> content script of one specific tab.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "text", rename_all = "snake_case")]
pub enum TabNotification {
    SignPayload { payload: SignPayload },
}
