//! Request encoding and response decoding
//!
//! The codec turns a logical command and its data points into a sealed frame
//! for the session's protocol dialect, and turns device frames back into JSON.

use std::sync::Arc;

use bytes::Bytes;
use chrono::Utc;
use serde_json::{Map, Value};
use tracing::{debug, trace};
use tuyalink_types::{DeviceKind, ProtocolVersion};

use crate::{
    catalog::{CommandCatalog, SystemField},
    command::Command,
    constants::{V31_SIGNATURE_SIZE, VERSION_HEADER_SIZE, opcodes},
    crypto,
    error::{Error, Result},
    packet::{CrcCheck, Frame},
    session::Session,
};

/// Decoded device reply
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    /// Opcode of the reply frame
    pub opcode: u8,

    /// Sequence word echoed by the device
    pub seqno: u32,

    /// Device status word
    pub return_code: Option<u32>,

    /// JSON body, `None` when the device sent an empty payload
    pub body: Option<Value>,
}

impl Response {
    /// Data point values reported by the device
    pub fn dps(&self) -> Option<&Value> {
        self.body.as_ref().and_then(|body| body.get("dps"))
    }
}

/// Frame builder and parser
#[derive(Debug, Clone)]
pub struct PacketCodec {
    catalog: Arc<CommandCatalog>,
    crc_check: CrcCheck,
}

impl PacketCodec {
    pub fn new(catalog: Arc<CommandCatalog>) -> Self {
        Self {
            catalog,
            crc_check: CrcCheck::default(),
        }
    }

    pub fn with_crc_check(mut self, check: CrcCheck) -> Self {
        self.crc_check = check;
        self
    }

    pub fn set_crc_check(&mut self, check: CrcCheck) {
        self.crc_check = check;
    }

    pub fn crc_check(&self) -> CrcCheck {
        self.crc_check
    }

    pub fn catalog(&self) -> &CommandCatalog {
        &self.catalog
    }

    /// Build the request frame for `command`, stamped with the current time
    pub fn encode(
        &self,
        session: &Session,
        command: Command,
        data: Option<&Value>,
    ) -> Result<Frame> {
        self.encode_at(session, command, data, Utc::now().timestamp())
    }

    /// Build the request frame for `command` with an explicit timestamp
    pub fn encode_at(
        &self,
        session: &Session,
        command: Command,
        data: Option<&Value>,
        timestamp: i64,
    ) -> Result<Frame> {
        let entry = self.catalog.lookup(command, session.kind())?;

        let mut body = Map::new();
        for field in &entry.fields {
            let value = match field {
                SystemField::Timestamp => timestamp.to_string(),
                _ => session.device_id().to_owned(),
            };
            body.insert(field.key().to_owned(), Value::String(value));
        }

        if entry.requests_dps_mask() {
            body.insert("dps".to_owned(), session.dps_mask().clone());
        } else if let Some(data) = data {
            body.insert("dps".to_owned(), data.clone());
        }

        let mut json = serde_json::to_vec(&Value::Object(body))?;
        // Firmware rejects payloads containing spaces, even inside values
        json.retain(|&b| b != b' ');
        debug!(
            command = %command,
            opcode = format!("0x{:02X}", entry.opcode),
            json = %String::from_utf8_lossy(&json),
            "Encoding request"
        );

        let payload = Self::seal(session, entry.opcode, command, &json)?;
        let frame = Frame::new(entry.opcode, payload);

        // Surface the length limit here rather than at send time
        frame.encode()?;

        Ok(frame)
    }

    fn seal(session: &Session, opcode: u8, command: Command, json: &[u8]) -> Result<Vec<u8>> {
        let key = session.local_key();
        let tag = session.version().tag();

        match session.version() {
            ProtocolVersion::V3_3 => {
                let ciphertext = crypto::encrypt(key, json, false)?;
                if opcode == opcodes::DP_QUERY {
                    return Ok(ciphertext);
                }

                let mut payload = Vec::with_capacity(VERSION_HEADER_SIZE + ciphertext.len());
                payload.extend_from_slice(tag);
                payload.resize(VERSION_HEADER_SIZE, 0);
                payload.extend_from_slice(&ciphertext);
                Ok(payload)
            }
            ProtocolVersion::V3_1 if command == Command::Control => {
                let ciphertext = crypto::encrypt(key, json, true)?;
                let signature = crypto::sign_v31(&ciphertext, tag, key);

                let capacity = tag.len() + signature.len() + ciphertext.len();
                let mut payload = Vec::with_capacity(capacity);
                payload.extend_from_slice(tag);
                payload.extend_from_slice(signature.as_bytes());
                payload.extend_from_slice(&ciphertext);
                Ok(payload)
            }
            ProtocolVersion::V3_1 => Ok(json.to_vec()),
        }
    }

    /// Decode a device reply
    pub fn decode(&self, session: &Session, buf: &[u8]) -> Result<Response> {
        let frame = Frame::decode_response(buf, self.crc_check)?;
        trace!("Received: {:?}", frame);

        let body = self.decode_payload(session, &frame.payload)?;

        Ok(Response {
            opcode: frame.opcode,
            seqno: frame.seqno,
            return_code: frame.return_code,
            body,
        })
    }

    /// Decode the payload region of a device reply
    pub fn decode_payload(&self, session: &Session, payload: &[u8]) -> Result<Option<Value>> {
        let mut payload = payload;
        if session.kind() == DeviceKind::LegacyLongId {
            payload = &payload[payload.len().min(VERSION_HEADER_SIZE)..];
        }

        if payload.is_empty() {
            return Ok(None);
        }

        let key = session.local_key();
        let v31 = ProtocolVersion::V3_1.tag();
        let v33 = ProtocolVersion::V3_3.tag();

        if payload[0] == b'{' {
            match parse_json(payload) {
                Ok(value) => return Ok(Some(value)),
                // Ciphertext may start with '{' by chance
                Err(_) if session.version() == ProtocolVersion::V3_3 => {}
                Err(e) => return Err(e),
            }
        } else if payload.starts_with(v31) {
            let rest = &payload[v31.len()..];
            if rest.len() < V31_SIGNATURE_SIZE {
                return Err(Error::UnexpectedPayload {
                    raw: Bytes::copy_from_slice(payload),
                });
            }

            let plain = crypto::decrypt(key, &rest[V31_SIGNATURE_SIZE..], true)?;
            trace!("Decrypted v3.1 payload: {}", String::from_utf8_lossy(&plain));
            return parse_json(&plain).map(Some);
        } else if payload.starts_with(v33) && payload.len() > VERSION_HEADER_SIZE {
            let plain = crypto::decrypt(key, &payload[VERSION_HEADER_SIZE..], false)?;
            trace!("Decrypted v3.3 payload: {}", String::from_utf8_lossy(&plain));
            return parse_json(&plain).map(Some);
        }

        if session.version() == ProtocolVersion::V3_3 {
            let plain = crypto::decrypt(key, payload, false)?;
            trace!("Decrypted v3.3 payload: {}", String::from_utf8_lossy(&plain));
            return parse_json(&plain).map(Some);
        }

        Err(Error::UnexpectedPayload {
            raw: Bytes::copy_from_slice(payload),
        })
    }
}

impl Default for PacketCodec {
    fn default() -> Self {
        Self::new(Arc::new(CommandCatalog::standard()))
    }
}

fn parse_json(bytes: &[u8]) -> Result<Value> {
    serde_json::from_slice(bytes).map_err(|source| Error::MalformedJson {
        source,
        raw: Bytes::copy_from_slice(bytes),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use serde_json::json;

    const KEY: &str = "0123456789abcdef";
    const T: i64 = 1_600_000_000;

    fn session(version: ProtocolVersion) -> Session {
        Session::new("abc123", KEY).with_version(version)
    }

    /// Re-frame a request the way a device would echo it
    fn as_reply(frame: &Frame) -> Vec<u8> {
        frame.clone().with_return_code(0).encode().unwrap().to_vec()
    }

    #[test]
    fn test_status_v31_plain() {
        let codec = PacketCodec::default();
        let frame = codec
            .encode_at(&session(ProtocolVersion::V3_1), Command::Status, None, T)
            .unwrap();

        let encoded = frame.encode().unwrap();
        assert_eq!(encoded[11], 0x08);

        let body: Value = serde_json::from_slice(&encoded[16..encoded.len() - 8]).unwrap();
        assert_eq!(body, json!({ "gwId": "abc123", "devId": "abc123" }));
    }

    #[test]
    fn test_spaces_are_stripped_from_values() {
        let codec = PacketCodec::default();
        let dps = json!({ "5": "scene one" });
        let frame = codec
            .encode_at(&session(ProtocolVersion::V3_1), Command::DataPointQuery, Some(&dps), T)
            .unwrap();

        assert!(!frame.payload.contains(&b' '));

        let body: Value = serde_json::from_slice(&frame.payload).unwrap();
        assert_eq!(body["dps"], json!({ "5": "sceneone" }));
    }

    #[test]
    fn test_status_v33_encrypted() {
        let codec = PacketCodec::default();
        let frame = codec
            .encode_at(&session(ProtocolVersion::V3_3), Command::Status, None, T)
            .unwrap();

        assert!(serde_json::from_slice::<Value>(&frame.payload).is_err());
        assert_eq!(&frame.payload[..3], b"3.3");
        assert_eq!(&frame.payload[3..15], &[0u8; 12]);

        let plain = crypto::decrypt(KEY.as_bytes(), &frame.payload[15..], false).unwrap();
        let body: Value = serde_json::from_slice(&plain).unwrap();
        assert_eq!(body["gwId"], "abc123");
        assert_eq!(body["devId"], "abc123");
    }

    #[test]
    fn test_dp_query_v33_has_no_version_header() {
        let codec = PacketCodec::default();
        let frame = codec
            .encode_at(&session(ProtocolVersion::V3_3), Command::DataPointQuery, None, T)
            .unwrap();

        assert_eq!(frame.opcode, opcodes::DP_QUERY);
        assert_eq!(frame.payload.len() % 16, 0);

        let plain = crypto::decrypt(KEY.as_bytes(), &frame.payload, false).unwrap();
        assert_eq!(
            plain,
            br#"{"gwId":"abc123","devId":"abc123","uid":"abc123","t":"1600000000"}"#
        );
    }

    #[test]
    fn test_control_v31_signed() {
        let codec = PacketCodec::default();
        let dps = json!({ "1": true });
        let frame = codec
            .encode_at(&session(ProtocolVersion::V3_1), Command::Control, Some(&dps), T)
            .unwrap();

        let payload = &frame.payload;
        assert_eq!(&payload[..3], b"3.1");

        let ciphertext = &payload[3 + 24..];
        let signature = crypto::sign_v31(ciphertext, b"3.1", KEY.as_bytes());
        assert_eq!(&payload[3..27], signature.as_bytes());

        let plain = crypto::decrypt(KEY.as_bytes(), ciphertext, true).unwrap();
        assert_eq!(
            plain,
            br#"{"devId":"abc123","uid":"abc123","t":"1600000000","dps":{"1":true}}"#
        );
    }

    #[test]
    fn test_legacy_query_sends_dps_mask() {
        let codec = PacketCodec::default();
        let mut session = Session::new("bf0123456789abcdefghij", KEY);
        session.set_dps_mask(json!({ "1": null, "2": null }));

        let ignored = json!({ "9": 1 });
        let frame = codec
            .encode_at(&session, Command::DataPointQuery, Some(&ignored), T)
            .unwrap();

        assert_eq!(frame.opcode, opcodes::CONTROL_NEW);
        let body: Value = serde_json::from_slice(&frame.payload).unwrap();
        assert_eq!(body["dps"], json!({ "1": null, "2": null }));
        assert!(body.get("gwId").is_none());
    }

    #[test]
    fn test_unsupported_command() {
        let codec = PacketCodec::default();
        let session = Session::new("bf0123456789abcdefghij", KEY);

        let result = codec.encode(&session, Command::Status, None);
        assert!(matches!(result, Err(Error::UnsupportedCommand { .. })));
    }

    #[test]
    fn test_oversized_payload_rejected() {
        let codec = PacketCodec::default();
        let dps: Map<String, Value> = (1..=30)
            .map(|i| (i.to_string(), Value::String("on".repeat(4))))
            .collect();
        let dps = Value::Object(dps);

        for version in [ProtocolVersion::V3_1, ProtocolVersion::V3_3] {
            let result = codec.encode(&session(version), Command::Control, Some(&dps));
            assert!(matches!(result, Err(Error::PayloadTooLarge { max: 255, .. })));
        }
    }

    #[test]
    fn test_decode_plain_reply() {
        let codec = PacketCodec::default();
        let body = br#"{"devId":"abc123","dps":{"1":false}}"#;
        let reply = Frame::new(opcodes::DP_QUERY, body.to_vec())
            .with_return_code(0);

        let response = codec
            .decode(&session(ProtocolVersion::V3_1), &reply.encode().unwrap())
            .unwrap();

        assert_eq!(response.return_code, Some(0));
        assert_eq!(response.dps(), Some(&json!({ "1": false })));
    }

    #[test]
    fn test_decode_v31_encrypted_reply() {
        let codec = PacketCodec::default();
        let ciphertext = crypto::encrypt(KEY.as_bytes(), br#"{"dps":{"2":7}}"#, true).unwrap();

        let mut payload = b"3.1".to_vec();
        payload.extend_from_slice(b"0123456789abcdef");
        payload.extend_from_slice(&ciphertext);

        let reply = Frame::new(opcodes::STATUS, payload).with_return_code(0);
        let response = codec
            .decode(&session(ProtocolVersion::V3_1), &reply.encode().unwrap())
            .unwrap();

        assert_eq!(response.dps(), Some(&json!({ "2": 7 })));
    }

    #[test]
    fn test_decode_v33_reply() {
        let codec = PacketCodec::default();
        let ciphertext = crypto::encrypt(KEY.as_bytes(), br#"{"dps":{"1":true}}"#, false).unwrap();
        let reply = Frame::new(opcodes::DP_QUERY, ciphertext).with_return_code(0);

        let response = codec
            .decode(&session(ProtocolVersion::V3_3), &reply.encode().unwrap())
            .unwrap();

        assert_eq!(response.dps(), Some(&json!({ "1": true })));
    }

    #[test]
    fn test_decode_legacy_skips_version_header() {
        let codec = PacketCodec::default();
        let session =
            Session::new("bf0123456789abcdefghij", KEY).with_version(ProtocolVersion::V3_3);

        let mut payload = b"3.3".to_vec();
        payload.resize(15, 0);
        payload.extend(crypto::encrypt(KEY.as_bytes(), br#"{"dps":{"1":1}}"#, false).unwrap());
        let reply = Frame::new(opcodes::CONTROL_NEW, payload).with_return_code(0);

        let response = codec.decode(&session, &reply.encode().unwrap()).unwrap();
        assert_eq!(response.dps(), Some(&json!({ "1": 1 })));
    }

    #[test]
    fn test_decode_empty_reply() {
        let codec = PacketCodec::default();
        let reply = Frame::new(opcodes::CONTROL, Bytes::new()).with_return_code(0);

        let response = codec
            .decode(&session(ProtocolVersion::V3_3), &reply.encode().unwrap())
            .unwrap();
        assert!(response.body.is_none());
        assert!(response.dps().is_none());
    }

    #[test]
    fn test_decode_unexpected_payload() {
        let codec = PacketCodec::default();
        let reply = Frame::new(opcodes::STATUS, b"garbage".to_vec()).with_return_code(0);

        let result = codec.decode(&session(ProtocolVersion::V3_1), &reply.encode().unwrap());
        match result {
            Err(Error::UnexpectedPayload { raw }) => assert_eq!(raw.as_ref(), b"garbage"),
            other => panic!("Expected UnexpectedPayload, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_malformed_json_keeps_raw_bytes() {
        let codec = PacketCodec::default();
        let reply = Frame::new(opcodes::STATUS, b"{\"dps\":".to_vec()).with_return_code(0);

        let result = codec.decode(&session(ProtocolVersion::V3_1), &reply.encode().unwrap());
        match result {
            Err(Error::MalformedJson { raw, .. }) => assert_eq!(raw.as_ref(), b"{\"dps\":"),
            other => panic!("Expected MalformedJson, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_rejects_bad_crc() {
        let codec = PacketCodec::default();
        let reply = Frame::new(opcodes::STATUS, b"{}".to_vec()).with_return_code(0);
        let mut bytes = reply.encode().unwrap();
        let crc_at = bytes.len() - 8;
        bytes[crc_at] ^= 0x01;

        let result = codec.decode(&session(ProtocolVersion::V3_1), &bytes);
        assert!(matches!(result, Err(Error::ChecksumMismatch { .. })));

        let lenient = PacketCodec::default().with_crc_check(CrcCheck::Lenient);
        let response = lenient.decode(&session(ProtocolVersion::V3_1), &bytes).unwrap();
        assert_eq!(response.body, Some(json!({})));
    }

    fn data_points() -> impl Strategy<Value = Value> {
        prop::collection::btree_map(
            "[1-9][0-9]{0,2}",
            prop_oneof![
                any::<bool>().prop_map(Value::from),
                (0u32..1000).prop_map(Value::from),
                "[a-z]{0,8}".prop_map(Value::from),
            ],
            0..5,
        )
        .prop_map(|map| Value::Object(map.into_iter().collect()))
    }

    proptest! {
        #[test]
        fn prop_round_trip(
            dps in data_points(),
            v33 in any::<bool>(),
            command in prop::sample::select(vec![
                Command::Control,
                Command::Status,
                Command::DataPointQuery,
                Command::DataPointQueryNew,
            ]),
        ) {
            let version = if v33 { ProtocolVersion::V3_3 } else { ProtocolVersion::V3_1 };
            // Signed v3.1 control requests are not a reply dialect
            prop_assume!(!(version == ProtocolVersion::V3_1 && command == Command::Control));

            let codec = PacketCodec::default();
            let entry = codec.catalog().lookup(command, DeviceKind::Standard).unwrap();
            let mut expected = Map::new();
            for field in &entry.fields {
                let value = match field {
                    SystemField::Timestamp => T.to_string(),
                    _ => "abc123".to_owned(),
                };
                expected.insert(field.key().to_owned(), Value::String(value));
            }
            expected.insert("dps".to_owned(), dps.clone());
            let expected = Value::Object(expected);
            prop_assume!(serde_json::to_vec(&expected).unwrap().len() < 200);

            let session = session(version);
            let frame = codec.encode_at(&session, command, Some(&dps), T).unwrap();
            let response = codec.decode(&session, &as_reply(&frame)).unwrap();
            prop_assert_eq!(response.body, Some(expected));
        }
    }
}
