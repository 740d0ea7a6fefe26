//! JSON shapes of the XRPC endpoints used by [`crate::XrpcDirectory`].

use likewatch_types::{AccountId, Handle, Liker, Profile, Timestamp};
use serde::{Deserialize, Serialize};

/// Collection NSID of attestation records.
pub const VERIFICATION_COLLECTION: &str = "app.bsky.graph.verification";

#[derive(Debug, Serialize)]
pub struct CreateSessionRequest<'a> {
    pub identifier: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub access_jwt: String,
    pub refresh_jwt: String,
    pub did: String,
    pub handle: String,
}

#[derive(Debug, Deserialize)]
pub struct ActorView {
    pub did: String,
    pub handle: String,
    #[serde(default, rename = "displayName")]
    pub display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LikeView {
    pub actor: ActorView,
}

#[derive(Debug, Deserialize)]
pub struct GetLikesResponse {
    #[serde(default)]
    pub cursor: Option<String>,
    pub likes: Vec<LikeView>,
}

impl From<ActorView> for Liker {
    fn from(actor: ActorView) -> Self {
        Liker {
            account_id: AccountId::new(actor.did),
            handle: Handle::new(actor.handle),
            display_name: actor.display_name,
        }
    }
}

impl From<ActorView> for Profile {
    fn from(actor: ActorView) -> Self {
        Profile {
            handle: Handle::new(actor.handle),
            display_name: actor.display_name,
        }
    }
}

/// The attestation record body.
#[derive(Debug, Serialize)]
pub struct VerificationRecord<'a> {
    #[serde(rename = "$type")]
    pub record_type: &'static str,
    pub subject: &'a str,
    pub handle: &'a str,
    #[serde(rename = "displayName")]
    pub display_name: &'a str,
    #[serde(rename = "createdAt")]
    pub created_at: String,
}

impl<'a> VerificationRecord<'a> {
    pub fn new(
        subject: &'a AccountId,
        handle: &'a Handle,
        display_name: &'a str,
        issued_at: Timestamp,
    ) -> Self {
        Self {
            record_type: VERIFICATION_COLLECTION,
            subject: subject.as_str(),
            handle: handle.as_str(),
            display_name,
            created_at: issued_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CreateRecordRequest<'a> {
    pub repo: &'a str,
    pub collection: &'static str,
    pub record: VerificationRecord<'a>,
}

#[derive(Debug, Deserialize)]
pub struct CreateRecordResponse {
    pub uri: String,
}

/// Error body returned by XRPC endpoints on non-2xx responses.
#[derive(Debug, Default, Deserialize)]
pub struct XrpcErrorBody {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl XrpcErrorBody {
    /// Whether the body reports a deactivated, suspended or taken-down account.
    pub fn is_account_deactivated(&self) -> bool {
        const NAMES: [&str; 3] = ["AccountDeactivated", "AccountTakedown", "AccountSuspended"];
        if self.error.as_deref().is_some_and(|e| NAMES.contains(&e)) {
            return true;
        }
        self.message.as_deref().is_some_and(|m| {
            let m = m.to_ascii_lowercase();
            m.contains("deactivated") || m.contains("suspended") || m.contains("taken down")
        })
    }

    /// Whether the body reports that the account or its repo no longer
    /// exists (`RepoNotFound`, or `getProfile`'s "Profile not found").
    pub fn is_account_missing(&self) -> bool {
        if self.error.as_deref() == Some("RepoNotFound") {
            return true;
        }
        self.message.as_deref().is_some_and(|m| {
            let m = m.to_ascii_lowercase();
            m.contains("profile not found") || m.contains("could not find repo")
        })
    }

    pub fn is_expired_token(&self) -> bool {
        self.error.as_deref() == Some("ExpiredToken")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_likes_response_parses_into_likers() {
        let json = r#"{
            "uri": "at://did:plc:op/app.bsky.feed.post/1",
            "cursor": "abc",
            "likes": [
                {"indexedAt": "x", "createdAt": "y",
                 "actor": {"did": "did:plc:alice", "handle": "alice.test", "displayName": "Alice"}},
                {"indexedAt": "x", "createdAt": "y",
                 "actor": {"did": "did:plc:bob", "handle": "bob.test"}}
            ]
        }"#;
        let resp: GetLikesResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.cursor.as_deref(), Some("abc"));
        let likers: Vec<Liker> = resp.likes.into_iter().map(|l| l.actor.into()).collect();
        assert_eq!(likers[0].account_id, AccountId::new("did:plc:alice"));
        assert_eq!(likers[0].display_name.as_deref(), Some("Alice"));
        assert_eq!(likers[1].display_name, None);
        assert_eq!(likers[1].effective_display_name(), "bob.test");
    }

    #[test]
    fn verification_record_serializes_with_lexicon_field_names() {
        let subject = AccountId::new("did:plc:alice");
        let handle = Handle::new("alice.test");
        let record = VerificationRecord::new(&subject, &handle, "Alice", Timestamp::new(0));
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["$type"], "app.bsky.graph.verification");
        assert_eq!(value["subject"], "did:plc:alice");
        assert_eq!(value["displayName"], "Alice");
        assert_eq!(value["createdAt"], "1970-01-01T00:00:00.000Z");
    }

    #[test]
    fn deactivation_detected_by_error_name_or_message() {
        let by_name: XrpcErrorBody =
            serde_json::from_str(r#"{"error":"AccountDeactivated"}"#).unwrap();
        assert!(by_name.is_account_deactivated());

        let by_message: XrpcErrorBody = serde_json::from_str(
            r#"{"error":"InvalidRequest","message":"Account is deactivated"}"#,
        )
        .unwrap();
        assert!(by_message.is_account_deactivated());

        let other: XrpcErrorBody =
            serde_json::from_str(r#"{"error":"InvalidRequest","message":"Profile not found"}"#)
                .unwrap();
        assert!(!other.is_account_deactivated());
        assert!(!XrpcErrorBody::default().is_account_deactivated());
    }

    #[test]
    fn removed_account_detected_as_missing() {
        let not_found: XrpcErrorBody =
            serde_json::from_str(r#"{"error":"InvalidRequest","message":"Profile not found"}"#)
                .unwrap();
        assert!(not_found.is_account_missing());
        assert!(!not_found.is_account_deactivated());

        let no_repo: XrpcErrorBody =
            serde_json::from_str(r#"{"error":"RepoNotFound","message":"Could not find repo"}"#)
                .unwrap();
        assert!(no_repo.is_account_missing());

        let other: XrpcErrorBody =
            serde_json::from_str(r#"{"error":"InternalServerError","message":"boom"}"#).unwrap();
        assert!(!other.is_account_missing());
    }
}
