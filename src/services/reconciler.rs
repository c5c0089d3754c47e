//! Merges the provider window, the chat-history log and the bot outgoing
//! log into one deduplicated timeline per contact.
//!
//! Every cycle recomputes the view from scratch; only the attribution
//! index is memoized (it is a full-table scan). A source that fails
//! contributes nothing and the cycle still returns whatever the others
//! produced.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::RwLock;
use tokio::task::JoinSet;

use crate::config::MonitorConfig;
use crate::schema::{
    BotMessageRow, ChatLogRow, ChatMessage, ChatRole, DeliveryStatus, Direction, MediaKind,
};
use crate::services::attribution::{self, AttributionIndex, fingerprint, fingerprints_match};
use crate::services::identity::resolve_contact_key;
use crate::services::normalizer::normalize_payload;
use crate::services::provider::{MessageSource, ProviderMessage};
use crate::services::stores::{GenerationLog, OutgoingLog};

const ASSISTANT_LABEL: &str = "Assistant";

pub struct Reconciler {
    provider: Arc<dyn MessageSource>,
    generation_log: Arc<dyn GenerationLog>,
    outgoing_log: Arc<dyn OutgoingLog>,
    config: MonitorConfig,
    attribution: RwLock<Option<Arc<AttributionIndex>>>,
}

impl Reconciler {
    pub fn new(
        provider: Arc<dyn MessageSource>,
        generation_log: Arc<dyn GenerationLog>,
        outgoing_log: Arc<dyn OutgoingLog>,
        config: MonitorConfig,
    ) -> Self {
        Self {
            provider,
            generation_log,
            outgoing_log,
            config,
            attribution: RwLock::new(None),
        }
    }

    /// One reconciled, ascending timeline per contact key. Never fails;
    /// sources that error are logged and skipped.
    pub async fn reconcile(&self) -> HashMap<String, Vec<ChatMessage>> {
        let (provider_res, history_res, outgoing_keys_res) = tokio::join!(
            self.provider.recent_messages(self.config.window_size),
            self.generation_log.read_all(),
            self.outgoing_log.contact_keys(),
        );

        let provider_records = provider_res.unwrap_or_else(|e| {
            tracing::warn!(source = "provider", error = %e, "source fetch failed, contributing nothing");
            Vec::new()
        });

        let (history_rows, index) = match history_res {
            Ok(rows) => {
                let index = self.attribution_snapshot(&rows).await;
                (rows, Some(index))
            }
            Err(e) => {
                tracing::warn!(source = "generation_log", error = %e, "source fetch failed, contributing nothing");
                // a stale index still beats phrase matching
                (Vec::new(), self.attribution.read().await.clone())
            }
        };

        let outgoing_contacts = outgoing_keys_res.unwrap_or_else(|e| {
            tracing::warn!(source = "outgoing_log", error = %e, "source fetch failed, contributing nothing");
            Vec::new()
        });

        let mut provider_by_contact: HashMap<String, Vec<ChatMessage>> = HashMap::new();
        for record in &provider_records {
            if let Some(msg) = self.canonicalize_provider(record, index.as_deref()) {
                provider_by_contact
                    .entry(msg.contact_key.clone())
                    .or_default()
                    .push(msg);
            }
        }

        let mut history_by_contact: HashMap<String, Vec<ChatLogRow>> = HashMap::new();
        for row in history_rows {
            history_by_contact
                .entry(row.phone.clone())
                .or_default()
                .push(row);
        }
        // the store guarantees no ordering
        for rows in history_by_contact.values_mut() {
            rows.sort_by(|a, b| {
                a.created_at
                    .cmp(&b.created_at)
                    .then_with(|| a.message.cmp(&b.message))
            });
        }

        // log-only conversations must surface even when the provider
        // window no longer covers them
        let mut contacts: HashSet<String> = provider_by_contact.keys().cloned().collect();
        contacts.extend(history_by_contact.keys().cloned());
        contacts.extend(outgoing_contacts);
        let mut contacts: Vec<String> = contacts.into_iter().collect();
        contacts.sort();

        let bot_by_contact = self.backfill_outgoing(&contacts).await;

        let mut timelines = HashMap::new();
        for contact in contacts {
            let provider_msgs = provider_by_contact.remove(&contact).unwrap_or_default();
            let mut log_msgs = history_to_messages(
                &contact,
                history_by_contact
                    .get(&contact)
                    .map_or(&[][..], Vec::as_slice),
            );
            log_msgs.extend(bot_to_messages(
                &contact,
                bot_by_contact.get(&contact).map_or(&[][..], Vec::as_slice),
            ));

            let merged = self.merge_contact(provider_msgs, log_msgs);
            if !merged.is_empty() {
                timelines.insert(contact, merged);
            }
        }
        timelines
    }

    /// Per-contact outgoing-log reads through a fixed-width task pool so a
    /// large contact universe does not turn into one query per contact all
    /// at once.
    async fn backfill_outgoing(
        &self,
        contacts: &[String],
    ) -> HashMap<String, Vec<BotMessageRow>> {
        let mut results = HashMap::new();
        let mut tasks = JoinSet::new();
        let mut queue = contacts.iter().cloned();

        loop {
            while tasks.len() < self.config.backfill_batch
                && let Some(contact) = queue.next()
            {
                let log = self.outgoing_log.clone();
                tasks.spawn(async move {
                    let rows = log.for_contact(&contact).await;
                    (contact, rows)
                });
            }

            match tasks.join_next().await {
                Some(Ok((contact, Ok(rows)))) => {
                    if !rows.is_empty() {
                        results.insert(contact, rows);
                    }
                }
                Some(Ok((contact, Err(e)))) => {
                    tracing::warn!(source = "outgoing_log", contact, error = %e, "backfill read failed");
                }
                Some(Err(e)) => {
                    tracing::warn!(error = %e, "backfill task failed");
                }
                None => break,
            }
        }
        results
    }

    async fn attribution_snapshot(&self, rows: &[ChatLogRow]) -> Arc<AttributionIndex> {
        let now = Instant::now();
        {
            let guard = self.attribution.read().await;
            if let Some(index) = guard.as_ref()
                && !index.is_stale(now, self.config.attribution_ttl)
            {
                return index.clone();
            }
        }

        // racing rebuilds produce the same snapshot; last writer wins
        let fresh = Arc::new(AttributionIndex::build(
            rows,
            self.config.fingerprint_len,
            now,
        ));
        *self.attribution.write().await = Some(fresh.clone());
        fresh
    }

    fn canonicalize_provider(
        &self,
        record: &ProviderMessage,
        index: Option<&AttributionIndex>,
    ) -> Option<ChatMessage> {
        let contact_key =
            match resolve_contact_key(&record.key.remote_jid, record.key.sender_pn.as_deref()) {
                Ok(key) => key,
                Err(e) => {
                    tracing::debug!(message_id = %record.key.id, reason = %e, "skipping message without canonical identity");
                    return None;
                }
            };

        let content = normalize_payload(record.message.as_ref());
        if content.is_content_free() {
            return None;
        }

        let Some(timestamp_ms) = record.timestamp_ms() else {
            tracing::debug!(message_id = %record.key.id, "skipping message without timestamp");
            return None;
        };

        let direction = if record.key.from_me {
            Direction::Out
        } else {
            Direction::In
        };
        let is_automated = direction == Direction::Out
            && attribution::is_automated(&content.text, &contact_key, index, &self.config);

        Some(ChatMessage {
            id: record.key.id.clone(),
            source_message_key: record.key.id.clone(),
            sender_label: record
                .push_name
                .clone()
                .unwrap_or_else(|| contact_key.clone()),
            contact_key,
            direction,
            text: content.text,
            media_kind: content.media_kind,
            media_locator: content.media_locator,
            timestamp_ms,
            delivery_status: record.delivery_status(),
            is_automated,
        })
    }

    /// Provider copies win a duplicate pair: they carry the media key and
    /// delivery status.
    fn merge_contact(
        &self,
        provider_msgs: Vec<ChatMessage>,
        mut log_msgs: Vec<ChatMessage>,
    ) -> Vec<ChatMessage> {
        log_msgs.sort_by(|a, b| {
            a.timestamp_ms
                .cmp(&b.timestamp_ms)
                .then_with(|| a.id.cmp(&b.id))
        });

        let mut merged = provider_msgs;
        for candidate in log_msgs {
            let duplicate = merged.iter().any(|m| self.is_duplicate(m, &candidate));
            if !duplicate {
                merged.push(candidate);
            }
        }

        // stable: ties keep input order
        merged.sort_by_key(|m| m.timestamp_ms);
        merged
    }

    fn is_duplicate(&self, a: &ChatMessage, b: &ChatMessage) -> bool {
        if a.direction != b.direction {
            return false;
        }
        if (a.timestamp_ms - b.timestamp_ms).abs() > self.config.dedup_tolerance_ms {
            return false;
        }
        fingerprints_match(
            &fingerprint(&a.text, self.config.fingerprint_len),
            &fingerprint(&b.text, self.config.fingerprint_len),
        )
    }
}

fn history_to_messages(contact: &str, rows: &[ChatLogRow]) -> Vec<ChatMessage> {
    rows.iter()
        .enumerate()
        .filter_map(|(i, row)| {
            let (direction, is_automated, sender_label) = match row.role()? {
                ChatRole::Assistant => (Direction::Out, true, ASSISTANT_LABEL.to_string()),
                ChatRole::Human => (Direction::In, false, contact.to_string()),
                // pipeline internals, not conversation turns
                ChatRole::Tool => return None,
            };

            let text = row.message.trim();
            if text.is_empty() {
                return None;
            }
            let timestamp_ms = row.created_at.timestamp_millis();

            Some(ChatMessage {
                id: format!("hist-{timestamp_ms}-{i}"),
                source_message_key: String::new(),
                contact_key: contact.to_string(),
                sender_label,
                direction,
                text: text.to_string(),
                media_kind: MediaKind::Text,
                media_locator: None,
                timestamp_ms,
                delivery_status: DeliveryStatus::default(),
                is_automated,
            })
        })
        .collect()
}

fn bot_to_messages(contact: &str, rows: &[BotMessageRow]) -> Vec<ChatMessage> {
    rows.iter()
        .enumerate()
        .filter_map(|(i, row)| {
            let text = row.message.trim();
            if text.is_empty() {
                return None;
            }

            let incoming = row.is_incoming();
            let timestamp_ms = row.created_at.timestamp_millis();

            Some(ChatMessage {
                id: format!("bot-{timestamp_ms}-{i}"),
                source_message_key: String::new(),
                contact_key: contact.to_string(),
                sender_label: if incoming {
                    contact.to_string()
                } else {
                    ASSISTANT_LABEL.to_string()
                },
                direction: if incoming { Direction::In } else { Direction::Out },
                text: text.to_string(),
                media_kind: MediaKind::Text,
                media_locator: None,
                timestamp_ms,
                delivery_status: DeliveryStatus::default(),
                is_automated: !incoming,
            })
        })
        .collect()
}
