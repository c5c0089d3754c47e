//! Conversation summaries for the monitor view.

use std::collections::HashMap;

use crate::schema::{ChatMessage, Conversation, Direction, Patient};

/// Display-name lookup over the patient roster. Matching is fuzzy
/// (digits-only containment in either direction) because the booking
/// system stores numbers in whatever format the front desk typed. Used
/// for display only, never for identity merging.
pub struct PatientNameIndex {
    entries: Vec<(String, String)>,
}

fn digits(raw: &str) -> String {
    raw.chars().filter(char::is_ascii_digit).collect()
}

impl PatientNameIndex {
    pub fn build(patients: &[Patient]) -> Self {
        let entries = patients
            .iter()
            .filter_map(|p| {
                let d = digits(&p.phone);
                // too short to be a phone number, would match everything
                (d.len() >= 7).then(|| (d, p.name.clone()))
            })
            .collect();
        Self { entries }
    }

    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn resolve(&self, contact_key: &str) -> Option<&str> {
        let key = digits(contact_key);
        if key.is_empty() {
            return None;
        }
        self.entries
            .iter()
            .find(|(d, _)| d.contains(&key) || key.contains(d.as_str()))
            .map(|(_, name)| name.as_str())
    }
}

/// The contact's own name as the provider observed it: the push name on
/// an incoming message.
fn provider_observed_name(messages: &[ChatMessage]) -> Option<&str> {
    messages
        .iter()
        .rev()
        .find(|m| {
            m.direction == Direction::In
                && !m.sender_label.is_empty()
                && m.sender_label != m.contact_key
        })
        .map(|m| m.sender_label.as_str())
}

/// Fold reconciled timelines into summaries, most recent conversation
/// first.
pub fn aggregate(
    timelines: HashMap<String, Vec<ChatMessage>>,
    names: &PatientNameIndex,
) -> Vec<Conversation> {
    let mut conversations: Vec<Conversation> = timelines
        .into_iter()
        .filter_map(|(contact_key, messages)| {
            let last_message = messages.last()?.clone();
            let display_name = names
                .resolve(&contact_key)
                .map(str::to_string)
                .or_else(|| provider_observed_name(&messages).map(str::to_string))
                .unwrap_or_else(|| contact_key.clone());
            let unread_count = messages.iter().filter(|m| m.is_unread_incoming()).count();

            Some(Conversation {
                contact_key,
                display_name,
                messages,
                last_message,
                unread_count,
            })
        })
        .collect();

    conversations.sort_by(|a, b| {
        b.last_message
            .timestamp_ms
            .cmp(&a.last_message.timestamp_ms)
            .then_with(|| a.contact_key.cmp(&b.contact_key))
    });
    conversations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{DeliveryStatus, MediaKind};
    use uuid::Uuid;

    fn patient(name: &str, phone: &str) -> Patient {
        Patient {
            id: Uuid::new_v4(),
            name: name.to_string(),
            phone: phone.to_string(),
        }
    }

    fn message(
        contact: &str,
        id: &str,
        direction: Direction,
        ts: i64,
        status: DeliveryStatus,
    ) -> ChatMessage {
        ChatMessage {
            id: id.to_string(),
            source_message_key: id.to_string(),
            contact_key: contact.to_string(),
            sender_label: contact.to_string(),
            direction,
            text: "hello".to_string(),
            media_kind: MediaKind::Text,
            media_locator: None,
            timestamp_ms: ts,
            delivery_status: status,
            is_automated: false,
        }
    }

    #[test]
    fn fuzzy_match_tolerates_formatting_and_prefixes() {
        let index = PatientNameIndex::build(&[patient("Amal Haddad", "+971 50 123 4567")]);
        assert_eq!(index.resolve("971501234567"), Some("Amal Haddad"));
        // national format stored, international key
        let index = PatientNameIndex::build(&[patient("Amal Haddad", "050-123-4567")]);
        assert_eq!(index.resolve("501234567"), Some("Amal Haddad"));
    }

    #[test]
    fn short_or_missing_numbers_never_match() {
        let index = PatientNameIndex::build(&[patient("Reception test", "123")]);
        assert_eq!(index.resolve("971501234567"), None);
        assert_eq!(index.resolve(""), None);
    }

    #[test]
    fn display_name_falls_back_from_patient_to_provider_to_key() {
        let mut timelines = HashMap::new();

        let mut named = message("971500000001", "m1", Direction::In, 1_000, DeliveryStatus::Read);
        named.sender_label = "Sara".to_string();
        timelines.insert("971500000001".to_string(), vec![named]);

        let anon = message("971500000002", "m2", Direction::In, 2_000, DeliveryStatus::Read);
        timelines.insert("971500000002".to_string(), vec![anon]);

        let index = PatientNameIndex::build(&[patient("Sara Al Amin", "971500000001")]);
        let conversations = aggregate(timelines, &index);

        assert_eq!(conversations[1].display_name, "Sara Al Amin");
        assert_eq!(conversations[0].display_name, "971500000002");

        // without a patient match the provider-observed name wins
        let mut timelines = HashMap::new();
        let mut named = message("971500000001", "m1", Direction::In, 1_000, DeliveryStatus::Read);
        named.sender_label = "Sara".to_string();
        timelines.insert("971500000001".to_string(), vec![named]);
        let conversations = aggregate(timelines, &PatientNameIndex::empty());
        assert_eq!(conversations[0].display_name, "Sara");
    }

    #[test]
    fn unread_counts_incoming_not_yet_read() {
        let mut timelines = HashMap::new();
        timelines.insert(
            "971500000001".to_string(),
            vec![
                message("971500000001", "m1", Direction::In, 1_000, DeliveryStatus::Delivered),
                message("971500000001", "m2", Direction::Out, 2_000, DeliveryStatus::Delivered),
                message("971500000001", "m3", Direction::In, 3_000, DeliveryStatus::Read),
                message("971500000001", "m4", Direction::In, 4_000, DeliveryStatus::Sent),
            ],
        );

        let conversations = aggregate(timelines, &PatientNameIndex::empty());
        assert_eq!(conversations[0].unread_count, 2);
        assert_eq!(conversations[0].last_message.id, "m4");
    }

    #[test]
    fn conversations_are_ordered_most_recent_first() {
        let mut timelines = HashMap::new();
        timelines.insert(
            "971500000001".to_string(),
            vec![message("971500000001", "m1", Direction::In, 1_000, DeliveryStatus::Read)],
        );
        timelines.insert(
            "971500000002".to_string(),
            vec![message("971500000002", "m2", Direction::In, 5_000, DeliveryStatus::Read)],
        );
        timelines.insert(
            "971500000003".to_string(),
            vec![message("971500000003", "m3", Direction::In, 3_000, DeliveryStatus::Read)],
        );

        let conversations = aggregate(timelines, &PatientNameIndex::empty());
        let order: Vec<&str> = conversations.iter().map(|c| c.contact_key.as_str()).collect();
        assert_eq!(order, vec!["971500000002", "971500000003", "971500000001"]);
    }

    #[test]
    fn empty_timelines_produce_no_conversations() {
        let mut timelines = HashMap::new();
        timelines.insert("971500000001".to_string(), Vec::new());
        assert!(aggregate(timelines, &PatientNameIndex::empty()).is_empty());
    }
}
