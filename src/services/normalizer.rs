//! Provider payloads into displayable content.
//!
//! The gateway's payload union is flattened into a closed sum type first,
//! so the normalization match stays exhaustive and a new media kind cannot
//! be silently skipped.

use crate::schema::MediaKind;
use crate::services::provider::{
    ContactMessage, DocumentMessage, LocationMessage, MediaMessage, ProviderPayload,
    ReactionMessage,
};

const DOCUMENT_PLACEHOLDER: &str = "Document";
const ATTACHMENT_PLACEHOLDER: &str = "[Attachment]";
const REACTION_PLACEHOLDER: &str = "[Reaction]";

/// Exactly one view per payload, picked in precedence order.
#[derive(Debug)]
pub enum PayloadView<'a> {
    Empty,
    Text(&'a str),
    Image(&'a MediaMessage),
    Audio(&'a MediaMessage),
    Document(&'a DocumentMessage),
    Video(&'a MediaMessage),
    Sticker(&'a MediaMessage),
    Location(&'a LocationMessage),
    ContactCard(&'a ContactMessage),
    Reaction(&'a ReactionMessage),
    Unsupported,
}

impl<'a> PayloadView<'a> {
    pub fn from_payload(payload: Option<&'a ProviderPayload>) -> Self {
        let Some(p) = payload else {
            return Self::Empty;
        };

        if let Some(text) = p.conversation.as_deref() {
            return Self::Text(text);
        }
        if let Some(text) = p.extended_text_message.as_ref().and_then(|m| m.text.as_deref()) {
            return Self::Text(text);
        }
        if let Some(m) = p.image_message.as_ref() {
            return Self::Image(m);
        }
        if let Some(m) = p.audio_message.as_ref() {
            return Self::Audio(m);
        }
        if let Some(m) = p.document_message.as_ref() {
            return Self::Document(m);
        }
        if let Some(m) = p.video_message.as_ref() {
            return Self::Video(m);
        }
        if let Some(m) = p.sticker_message.as_ref() {
            return Self::Sticker(m);
        }
        if let Some(m) = p.location_message.as_ref() {
            return Self::Location(m);
        }
        if let Some(m) = p.contact_message.as_ref() {
            return Self::ContactCard(m);
        }
        if let Some(m) = p.reaction_message.as_ref() {
            return Self::Reaction(m);
        }
        Self::Unsupported
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedContent {
    pub text: String,
    pub media_kind: MediaKind,
    pub media_locator: Option<String>,
}

impl NormalizedContent {
    fn new(text: impl Into<String>, media_kind: MediaKind, media_locator: Option<String>) -> Self {
        Self {
            text: text.into(),
            media_kind,
            media_locator,
        }
    }

    /// Nothing to display and nothing to fingerprint; the reconciler drops
    /// these.
    pub fn is_content_free(&self) -> bool {
        self.text.is_empty() && self.media_kind == MediaKind::Other
    }
}

pub fn normalize(view: &PayloadView<'_>) -> NormalizedContent {
    match view {
        PayloadView::Empty => NormalizedContent::new("", MediaKind::Other, None),
        PayloadView::Text(text) => NormalizedContent::new(*text, MediaKind::Text, None),
        PayloadView::Image(m) => NormalizedContent::new(
            m.caption.as_deref().unwrap_or(""),
            MediaKind::Image,
            m.url.clone(),
        ),
        PayloadView::Audio(m) => NormalizedContent::new("", MediaKind::Audio, m.url.clone()),
        PayloadView::Document(m) => NormalizedContent::new(
            m.file_name.as_deref().unwrap_or(DOCUMENT_PLACEHOLDER),
            MediaKind::Document,
            m.url.clone(),
        ),
        PayloadView::Video(m) => NormalizedContent::new(
            m.caption.as_deref().unwrap_or(""),
            MediaKind::Video,
            m.url.clone(),
        ),
        PayloadView::Sticker(m) => NormalizedContent::new("", MediaKind::Sticker, m.url.clone()),
        PayloadView::Location(m) => {
            let lat = m.degrees_latitude.unwrap_or(0.0);
            let lon = m.degrees_longitude.unwrap_or(0.0);
            NormalizedContent::new(
                format!("Location: {lat:.6}, {lon:.6}"),
                MediaKind::Other,
                None,
            )
        }
        PayloadView::ContactCard(m) => NormalizedContent::new(
            format!("Contact: {}", m.display_name.as_deref().unwrap_or("unknown")),
            MediaKind::Other,
            None,
        ),
        PayloadView::Reaction(m) => NormalizedContent::new(
            match m.text.as_deref() {
                Some(glyph) if !glyph.is_empty() => glyph,
                _ => REACTION_PLACEHOLDER,
            },
            MediaKind::Other,
            None,
        ),
        PayloadView::Unsupported => {
            NormalizedContent::new(ATTACHMENT_PLACEHOLDER, MediaKind::Other, None)
        }
    }
}

pub fn normalize_payload(payload: Option<&ProviderPayload>) -> NormalizedContent {
    normalize(&PayloadView::from_payload(payload))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(value: serde_json::Value) -> ProviderPayload {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn null_payload_is_content_free() {
        let out = normalize_payload(None);
        assert_eq!(out.text, "");
        assert_eq!(out.media_kind, MediaKind::Other);
        assert!(out.is_content_free());
    }

    #[test]
    fn plain_text_wins() {
        let p = payload(serde_json::json!({ "conversation": "hello there" }));
        let out = normalize_payload(Some(&p));
        assert_eq!(out.text, "hello there");
        assert_eq!(out.media_kind, MediaKind::Text);
        assert!(out.media_locator.is_none());
    }

    #[test]
    fn extended_text_is_text() {
        let p = payload(serde_json::json!({ "extendedTextMessage": { "text": "quoted reply" } }));
        let out = normalize_payload(Some(&p));
        assert_eq!(out.text, "quoted reply");
        assert_eq!(out.media_kind, MediaKind::Text);
    }

    #[test]
    fn image_caption_becomes_text() {
        let p = payload(serde_json::json!({
            "imageMessage": { "caption": "hello", "url": "https://cdn/x.enc" }
        }));
        let out = normalize_payload(Some(&p));
        assert_eq!(out.text, "hello");
        assert_eq!(out.media_kind, MediaKind::Image);
        assert_eq!(out.media_locator.as_deref(), Some("https://cdn/x.enc"));
    }

    #[test]
    fn captionless_image_is_kept_as_media() {
        let p = payload(serde_json::json!({ "imageMessage": { "url": "https://cdn/x.enc" } }));
        let out = normalize_payload(Some(&p));
        assert_eq!(out.text, "");
        assert_eq!(out.media_kind, MediaKind::Image);
        assert!(!out.is_content_free());
    }

    #[test]
    fn audio_has_no_text() {
        let p = payload(serde_json::json!({ "audioMessage": { "url": "https://cdn/a.enc" } }));
        let out = normalize_payload(Some(&p));
        assert_eq!(out.text, "");
        assert_eq!(out.media_kind, MediaKind::Audio);
    }

    #[test]
    fn document_uses_filename_with_placeholder_fallback() {
        let p = payload(serde_json::json!({
            "documentMessage": { "fileName": "results.pdf", "url": "https://cdn/d.enc" }
        }));
        assert_eq!(normalize_payload(Some(&p)).text, "results.pdf");

        let p = payload(serde_json::json!({ "documentMessage": { "url": "https://cdn/d.enc" } }));
        let out = normalize_payload(Some(&p));
        assert_eq!(out.text, DOCUMENT_PLACEHOLDER);
        assert_eq!(out.media_kind, MediaKind::Document);
    }

    #[test]
    fn location_synthesizes_coordinates() {
        let p = payload(serde_json::json!({
            "locationMessage": { "degreesLatitude": 25.204849, "degreesLongitude": 55.270783 }
        }));
        let out = normalize_payload(Some(&p));
        assert_eq!(out.text, "Location: 25.204849, 55.270783");
        assert_eq!(out.media_kind, MediaKind::Other);
        assert!(!out.is_content_free());
    }

    #[test]
    fn contact_card_synthesizes_name() {
        let p = payload(serde_json::json!({ "contactMessage": { "displayName": "Dr. Rami" } }));
        assert_eq!(normalize_payload(Some(&p)).text, "Contact: Dr. Rami");
    }

    #[test]
    fn reaction_emits_glyph_or_default() {
        let p = payload(serde_json::json!({ "reactionMessage": { "text": "👍" } }));
        assert_eq!(normalize_payload(Some(&p)).text, "👍");

        let p = payload(serde_json::json!({ "reactionMessage": {} }));
        assert_eq!(normalize_payload(Some(&p)).text, REACTION_PLACEHOLDER);
    }

    #[test]
    fn unrecognized_payload_gets_attachment_placeholder() {
        let p = payload(serde_json::json!({ "pollCreationMessage": { "name": "poll" } }));
        let out = normalize_payload(Some(&p));
        assert_eq!(out.text, ATTACHMENT_PLACEHOLDER);
        assert_eq!(out.media_kind, MediaKind::Other);
        assert!(!out.is_content_free());
    }
}
