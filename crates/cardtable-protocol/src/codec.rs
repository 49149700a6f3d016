//! Wire payload encoding.
//!
//! A message's payload is a JSON object whose `type` key carries the
//! variant's wire token and whose remaining keys are the variant's
//! fields, flat at the top level. Encoding serializes the variant struct
//! and injects the token; decoding parses the payload and hands it to
//! the family's registry, which picks the constructor by token.

use serde::Serialize;
use serde_json::Value;

use crate::ProtocolError;
use crate::registry::Registry;

/// Serializes a variant body and stamps its wire token onto it.
pub(crate) fn encode_with_token(
    token: &str,
    body: &impl Serialize,
) -> Result<Vec<u8>, ProtocolError> {
    let mut payload = serde_json::to_value(body).map_err(ProtocolError::Encode)?;
    let Some(fields) = payload.as_object_mut() else {
        return Err(ProtocolError::InvalidMessage(
            "message body must serialize to an object".into(),
        ));
    };
    fields.insert("type".into(), Value::String(token.into()));
    serde_json::to_vec(&payload).map_err(ProtocolError::Encode)
}

/// Parses payload bytes and rehydrates the typed message via `registry`.
pub(crate) fn decode_with_registry<T>(
    registry: &Registry<T>,
    payload: &[u8],
) -> Result<T, ProtocolError> {
    let value: Value =
        serde_json::from_slice(payload).map_err(ProtocolError::Decode)?;
    registry.decode_value(value)
}
