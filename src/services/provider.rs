//! Client for the hosted WhatsApp gateway.
//!
//! The gateway is a black box: it returns message records in one of a few
//! envelope shapes, and serves media as base64 on demand. Anything it
//! refuses to do degrades to an empty page or a `None` payload here;
//! callers log and continue.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::ProviderConfig;
use crate::schema::{DeliveryStatus, MediaKind};

const REQUEST_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(20);

/// Millisecond timestamps start around 1e12; the gateway reports seconds.
const MS_THRESHOLD: i64 = 1_000_000_000_000;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageKey {
    pub remote_jid: String,
    #[serde(default)]
    pub from_me: bool,
    pub id: String,
    /// Real phone JID supplied alongside opaque linked identifiers.
    #[serde(default)]
    pub sender_pn: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExtendedTextMessage {
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MediaMessage {
    #[serde(default)]
    pub caption: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub mimetype: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentMessage {
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub mimetype: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationMessage {
    #[serde(default)]
    pub degrees_latitude: Option<f64>,
    #[serde(default)]
    pub degrees_longitude: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactMessage {
    #[serde(default)]
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReactionMessage {
    #[serde(default)]
    pub text: Option<String>,
}

/// Provider payload union: at most one field is populated per message.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderPayload {
    #[serde(default)]
    pub conversation: Option<String>,
    #[serde(default)]
    pub extended_text_message: Option<ExtendedTextMessage>,
    #[serde(default)]
    pub image_message: Option<MediaMessage>,
    #[serde(default)]
    pub audio_message: Option<MediaMessage>,
    #[serde(default)]
    pub document_message: Option<DocumentMessage>,
    #[serde(default)]
    pub video_message: Option<MediaMessage>,
    #[serde(default)]
    pub sticker_message: Option<MediaMessage>,
    #[serde(default)]
    pub location_message: Option<LocationMessage>,
    #[serde(default)]
    pub contact_message: Option<ContactMessage>,
    #[serde(default)]
    pub reaction_message: Option<ReactionMessage>,
}

/// The gateway emits timestamps as seconds, sometimes stringly typed.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum TimestampValue {
    Int(i64),
    Str(String),
}

impl TimestampValue {
    pub fn epoch_ms(&self) -> Option<i64> {
        let raw = match self {
            Self::Int(n) => *n,
            Self::Str(s) => s.trim().parse().ok()?,
        };
        if raw <= 0 {
            return None;
        }
        Some(if raw < MS_THRESHOLD { raw * 1000 } else { raw })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderMessage {
    pub key: MessageKey,
    #[serde(default)]
    pub push_name: Option<String>,
    #[serde(default)]
    pub message: Option<ProviderPayload>,
    #[serde(default)]
    pub message_timestamp: Option<TimestampValue>,
    #[serde(default)]
    pub status: Option<String>,
}

impl ProviderMessage {
    pub fn timestamp_ms(&self) -> Option<i64> {
        self.message_timestamp.as_ref().and_then(TimestampValue::epoch_ms)
    }

    pub fn delivery_status(&self) -> DeliveryStatus {
        match self.status.as_deref() {
            Some(s) if s.eq_ignore_ascii_case("READ") => DeliveryStatus::Read,
            Some(s) if s.eq_ignore_ascii_case("DELIVERY_ACK") => DeliveryStatus::Delivered,
            _ => DeliveryStatus::Sent,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaPayload {
    pub base64: String,
    pub mimetype: String,
}

/// Pull the record array out of whichever envelope shape the gateway used.
/// Unknown shapes fail closed to an empty page.
pub fn parse_message_envelope(body: &Value) -> Vec<Value> {
    if let Some(records) = body.pointer("/messages/records").and_then(Value::as_array) {
        return records.clone();
    }
    if let Some(records) = body.get("messages").and_then(Value::as_array) {
        return records.clone();
    }
    if let Some(records) = body.as_array() {
        return records.clone();
    }
    Vec::new()
}

/// Decode records, dropping any that are missing identity fields.
pub fn decode_records(records: Vec<Value>) -> Vec<ProviderMessage> {
    records
        .into_iter()
        .filter_map(|record| match serde_json::from_value::<ProviderMessage>(record) {
            Ok(msg) if !msg.key.remote_jid.is_empty() && !msg.key.id.is_empty() => Some(msg),
            Ok(_) => None,
            Err(e) => {
                tracing::debug!(error = %e, "dropping undecodable provider record");
                None
            }
        })
        .collect()
}

/// Seam for the reconciler; the HTTP client below is the real thing.
#[async_trait::async_trait]
pub trait MessageSource: Send + Sync {
    async fn recent_messages(&self, limit: usize) -> anyhow::Result<Vec<ProviderMessage>>;
}

pub struct ProviderClient {
    client: reqwest::Client,
    config: ProviderConfig,
}

impl ProviderClient {
    pub fn new(config: ProviderConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self { client, config })
    }

    pub fn instance(&self) -> &str {
        &self.config.instance
    }

    fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}/{}",
            self.config.base_url, path, self.config.instance
        )
    }

    async fn post_json(&self, url: &str, body: Value) -> anyhow::Result<Value> {
        let resp = self
            .client
            .post(url)
            .header("apikey", &self.config.api_key)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            anyhow::bail!("provider returned {status}");
        }
        Ok(resp.json().await?)
    }

    /// Fetch media bytes for a message. Never errors past this boundary:
    /// the UI renders the message list regardless and offers a retry.
    pub async fn fetch_media(&self, message_key: &str, kind: MediaKind) -> Option<MediaPayload> {
        let url = self.endpoint("chat/getBase64FromMediaMessage");
        let body = serde_json::json!({
            "message": { "key": { "id": message_key } },
            "convertToMp4": false,
        });

        match self.post_json(&url, body).await {
            Ok(json) => {
                let base64 = json.get("base64").and_then(Value::as_str)?.to_string();
                let mimetype = json
                    .get("mimetype")
                    .and_then(Value::as_str)
                    .unwrap_or("application/octet-stream")
                    .to_string();
                Some(MediaPayload { base64, mimetype })
            }
            Err(e) => {
                tracing::warn!(message_key, kind = ?kind, error = %e, "media fetch failed");
                None
            }
        }
    }
}

#[async_trait::async_trait]
impl MessageSource for ProviderClient {
    async fn recent_messages(&self, limit: usize) -> anyhow::Result<Vec<ProviderMessage>> {
        let url = self.endpoint("chat/findMessages");
        let body = serde_json::json!({
            "where": {},
            "page": 1,
            "offset": limit,
        });

        let json = self.post_json(&url, body).await?;
        if let Some(total) = json.pointer("/messages/total").and_then(Value::as_i64) {
            tracing::debug!(total, limit, "provider message window");
        }

        Ok(decode_records(parse_message_envelope(&json)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_records_under_key_envelope() {
        let body = serde_json::json!({
            "messages": {
                "total": 1,
                "records": [{ "key": { "remoteJid": "a@s.whatsapp.net", "id": "m1" } }]
            }
        });
        assert_eq!(parse_message_envelope(&body).len(), 1);
    }

    #[test]
    fn parses_bare_array_envelope() {
        let body = serde_json::json!([
            { "key": { "remoteJid": "a@s.whatsapp.net", "id": "m1" } },
            { "key": { "remoteJid": "b@s.whatsapp.net", "id": "m2" } }
        ]);
        assert_eq!(parse_message_envelope(&body).len(), 2);
    }

    #[test]
    fn parses_flat_messages_array_envelope() {
        let body = serde_json::json!({
            "messages": [{ "key": { "remoteJid": "a@s.whatsapp.net", "id": "m1" } }]
        });
        assert_eq!(parse_message_envelope(&body).len(), 1);
    }

    #[test]
    fn unknown_envelope_fails_closed() {
        let body = serde_json::json!({ "data": { "whatever": true } });
        assert!(parse_message_envelope(&body).is_empty());
    }

    #[test]
    fn drops_records_without_identity_fields() {
        let records = vec![
            serde_json::json!({ "key": { "remoteJid": "a@s.whatsapp.net", "id": "m1" } }),
            serde_json::json!({ "key": { "remoteJid": "", "id": "m2" } }),
            serde_json::json!({ "pushName": "no key at all" }),
        ];
        let decoded = decode_records(records);
        assert_eq!(decoded.len(), 1);
        assert_eq!(decoded[0].key.id, "m1");
    }

    #[test]
    fn coerces_second_and_string_timestamps_to_millis() {
        assert_eq!(TimestampValue::Int(1_700_000_000).epoch_ms(), Some(1_700_000_000_000));
        assert_eq!(
            TimestampValue::Int(1_700_000_000_123).epoch_ms(),
            Some(1_700_000_000_123)
        );
        assert_eq!(
            TimestampValue::Str("1700000000".into()).epoch_ms(),
            Some(1_700_000_000_000)
        );
        assert_eq!(TimestampValue::Str("nope".into()).epoch_ms(), None);
        assert_eq!(TimestampValue::Int(0).epoch_ms(), None);
    }

    #[test]
    fn maps_provider_status_strings() {
        let mut msg: ProviderMessage = serde_json::from_value(serde_json::json!({
            "key": { "remoteJid": "a@s.whatsapp.net", "id": "m1" },
            "status": "READ"
        }))
        .unwrap();
        assert_eq!(msg.delivery_status(), DeliveryStatus::Read);

        msg.status = Some("DELIVERY_ACK".into());
        assert_eq!(msg.delivery_status(), DeliveryStatus::Delivered);

        msg.status = Some("SERVER_ACK".into());
        assert_eq!(msg.delivery_status(), DeliveryStatus::Sent);

        msg.status = None;
        assert_eq!(msg.delivery_status(), DeliveryStatus::Sent);
    }
}
