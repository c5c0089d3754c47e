//! Canonical contact keys from provider JIDs.
//!
//! The provider addresses one-to-one chats as `<number>@s.whatsapp.net`
//! (or the legacy `@c.us`), but some identities arrive as an opaque
//! `<linked-id>@lid` that does not contain the phone number at all. For
//! those the provider supplies the real JID in a secondary field; without
//! it the message cannot be keyed and is skipped.

const USER_SUFFIXES: &[&str] = &["@s.whatsapp.net", "@c.us"];
const LINKED_SUFFIX: &str = "@lid";
const GROUP_SUFFIX: &str = "@g.us";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentityError {
    /// Linked-form identifier with no alternate to recover the number from.
    #[error("unresolvable linked identifier: {0}")]
    Unresolvable(String),
    /// Group threads are not tracked.
    #[error("group chat identifier: {0}")]
    GroupChat(String),
}

fn strip_user_suffix(jid: &str) -> String {
    for suffix in USER_SUFFIXES {
        if let Some(stripped) = jid.strip_suffix(suffix) {
            return stripped.to_string();
        }
    }
    jid.to_string()
}

/// Resolve a provider identifier (plus the optional alternate supplied for
/// linked identities) into a canonical phone-number key.
pub fn resolve_contact_key(
    primary: &str,
    alternate: Option<&str>,
) -> Result<String, IdentityError> {
    if primary.ends_with(GROUP_SUFFIX) {
        return Err(IdentityError::GroupChat(primary.to_string()));
    }

    if primary.ends_with(LINKED_SUFFIX) {
        return match alternate {
            Some(alt) if !alt.is_empty() && !alt.ends_with(LINKED_SUFFIX) => {
                Ok(strip_user_suffix(alt))
            }
            _ => Err(IdentityError::Unresolvable(primary.to_string())),
        };
    }

    Ok(strip_user_suffix(primary))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_standard_suffix() {
        assert_eq!(
            resolve_contact_key("971501234567@s.whatsapp.net", None).unwrap(),
            "971501234567"
        );
        assert_eq!(
            resolve_contact_key("971501234567@c.us", None).unwrap(),
            "971501234567"
        );
    }

    #[test]
    fn linked_identifier_resolves_through_alternate() {
        assert_eq!(
            resolve_contact_key("8839201@lid", Some("971501234567@s.whatsapp.net")).unwrap(),
            "971501234567"
        );
    }

    #[test]
    fn linked_identifier_without_alternate_is_rejected() {
        assert_eq!(
            resolve_contact_key("8839201@lid", None),
            Err(IdentityError::Unresolvable("8839201@lid".to_string()))
        );
        assert!(resolve_contact_key("8839201@lid", Some("")).is_err());
    }

    #[test]
    fn linked_alternate_cannot_itself_be_linked() {
        assert!(resolve_contact_key("8839201@lid", Some("99@lid")).is_err());
    }

    #[test]
    fn group_chats_are_always_rejected() {
        assert_eq!(
            resolve_contact_key("1234@g.us", None),
            Err(IdentityError::GroupChat("1234@g.us".to_string()))
        );
        assert!(resolve_contact_key("1234@g.us", Some("971501234567@s.whatsapp.net")).is_err());
    }

    #[test]
    fn bare_number_passes_through() {
        assert_eq!(resolve_contact_key("971501234567", None).unwrap(), "971501234567");
    }
}
