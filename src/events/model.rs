//! Event records and their type-specific payloads.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::github::{CommitSummary, FileChange, PullRequestDetail, RawEvent};

pub const PUSH_EVENT: &str = "PushEvent";
pub const PULL_REQUEST_EVENT: &str = "PullRequestEvent";
pub const PULL_REQUEST_REVIEW_EVENT: &str = "PullRequestReviewEvent";
pub const ISSUES_EVENT: &str = "IssuesEvent";
pub const ISSUE_COMMENT_EVENT: &str = "IssueCommentEvent";
pub const CREATE_EVENT: &str = "CreateEvent";
pub const DELETE_EVENT: &str = "DeleteEvent";
pub const WATCH_EVENT: &str = "WatchEvent";
pub const FORK_EVENT: &str = "ForkEvent";
pub const RELEASE_EVENT: &str = "ReleaseEvent";

/// Suffix GitHub appends to every event type name.
pub const EVENT_SUFFIX: &str = "Event";

/// One activity record from the user's event feed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Event {
    /// GitHub's event id; primary key in the store.
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub repo: String,
    pub actor: String,
    pub created_at: DateTime<Utc>,
    pub public: bool,
    pub payload: EventPayload,
    pub enriched: bool,
}

impl Event {
    /// Convert a feed entry. Returns `None` when `created_at` is not RFC 3339.
    pub fn from_raw(raw: RawEvent) -> Option<Self> {
        let created_at = DateTime::parse_from_rfc3339(&raw.created_at)
            .ok()?
            .with_timezone(&Utc);
        let payload = EventPayload::decode(&raw.event_type, raw.payload);

        Some(Self {
            id: raw.id,
            event_type: raw.event_type,
            repo: raw.repo.name,
            actor: raw.actor.login,
            created_at,
            public: raw.public,
            payload,
            enriched: false,
        })
    }

    /// Type name without the `Event` suffix (`PushEvent` -> `Push`).
    pub fn action_type(&self) -> &str {
        strip_event_suffix(&self.event_type)
    }

    /// Pull request number for pull-request events.
    pub fn pull_request_number(&self) -> Option<u64> {
        match &self.payload {
            EventPayload::PullRequest(pr) => {
                Some(if pr.number != 0 {
                    pr.number
                } else {
                    pr.pull_request.number
                })
            }
            _ => None,
        }
    }

    /// Push events whose payload carries no commit count.
    pub fn push_missing_size(&self) -> bool {
        matches!(&self.payload, EventPayload::Push(push) if push.size.is_none())
    }
}

/// `PushEvent` -> `Push`; names without the suffix are returned unchanged.
pub fn strip_event_suffix(event_type: &str) -> &str {
    event_type
        .strip_suffix(EVENT_SUFFIX)
        .filter(|s| !s.is_empty())
        .unwrap_or(event_type)
}

/// `Push` -> `PushEvent`; names already ending in `Event` are kept.
pub fn event_type_for_action(action: &str) -> String {
    if action.ends_with(EVENT_SUFFIX) {
        action.to_string()
    } else {
        format!("{action}{EVENT_SUFFIX}")
    }
}

/// Type-specific payload, keyed by the event type discriminator.
///
/// Field names follow GitHub's payload JSON so the same structs decode the
/// feed and the stored documents. Types this crate does not model, and
/// payloads that fail to decode into their variant, are kept verbatim in
/// [`EventPayload::Other`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum EventPayload {
    Push(PushPayload),
    PullRequest(PullRequestPayload),
    PullRequestReview(PullRequestReviewPayload),
    Issues(IssuesPayload),
    IssueComment(IssueCommentPayload),
    Create(RefPayload),
    Delete(RefPayload),
    Watch(WatchPayload),
    Fork(ForkPayload),
    Release(ReleasePayload),
    Other(Value),
}

impl EventPayload {
    /// Decode a payload for the given event type.
    pub fn decode(event_type: &str, value: Value) -> Self {
        match event_type {
            PUSH_EVENT => decode_as(value, EventPayload::Push),
            PULL_REQUEST_EVENT => decode_as(value, EventPayload::PullRequest),
            PULL_REQUEST_REVIEW_EVENT => decode_as(value, EventPayload::PullRequestReview),
            ISSUES_EVENT => decode_as(value, EventPayload::Issues),
            ISSUE_COMMENT_EVENT => decode_as(value, EventPayload::IssueComment),
            CREATE_EVENT => decode_as(value, EventPayload::Create),
            DELETE_EVENT => decode_as(value, EventPayload::Delete),
            WATCH_EVENT => decode_as(value, EventPayload::Watch),
            FORK_EVENT => decode_as(value, EventPayload::Fork),
            RELEASE_EVENT => decode_as(value, EventPayload::Release),
            _ => EventPayload::Other(value),
        }
    }

    /// JSON document stored for this payload.
    pub fn to_value(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}

fn decode_as<T, F>(value: Value, wrap: F) -> EventPayload
where
    T: DeserializeOwned,
    F: FnOnce(T) -> EventPayload,
{
    match serde_json::from_value::<T>(value.clone()) {
        Ok(payload) => wrap(payload),
        Err(err) => {
            tracing::debug!(error = %err, "payload did not match its event type, keeping raw JSON");
            EventPayload::Other(value)
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PushPayload {
    pub push_id: Option<u64>,
    /// Number of commits in the push. Absent in trimmed feed payloads until
    /// enrichment fills it in.
    pub size: Option<u64>,
    pub distinct_size: Option<u64>,
    #[serde(rename = "ref")]
    pub git_ref: Option<String>,
    pub head: Option<String>,
    pub before: Option<String>,
    pub commits: Vec<CommitSummary>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<FileChange>,
}

impl PushPayload {
    /// Branch name from `refs/heads/<branch>`.
    pub fn branch(&self) -> Option<&str> {
        self.git_ref
            .as_deref()
            .map(|r| r.strip_prefix("refs/heads/").unwrap_or(r))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PullRequestPayload {
    pub action: String,
    pub number: u64,
    pub pull_request: PullRequestDetail,
    /// Commits merged in by enrichment.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub commit_list: Vec<CommitSummary>,
    /// Changed files merged in by enrichment.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<FileChange>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PullRequestReviewPayload {
    pub action: String,
    pub review: Option<ReviewRef>,
    pub pull_request: PullRequestDetail,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReviewRef {
    pub state: String,
    pub html_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IssueRef {
    pub number: u64,
    pub title: String,
    pub state: String,
    pub html_url: Option<String>,
    /// Present when the "issue" is a pull request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pull_request: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IssuesPayload {
    pub action: String,
    pub issue: IssueRef,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommentRef {
    pub body: String,
    pub html_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IssueCommentPayload {
    pub action: String,
    pub issue: IssueRef,
    pub comment: CommentRef,
}

/// Payload of `CreateEvent` and `DeleteEvent`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RefPayload {
    #[serde(rename = "ref")]
    pub git_ref: Option<String>,
    pub ref_type: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchPayload {
    pub action: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForkPayload {
    pub forkee: Option<ForkeeRef>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForkeeRef {
    pub full_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReleasePayload {
    pub action: String,
    pub release: Option<ReleaseRef>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReleaseRef {
    pub tag_name: String,
    pub name: Option<String>,
    pub html_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::github::{types::ActorRef, types::RepoRef};
    use serde_json::json;

    fn raw(event_type: &str, payload: Value) -> RawEvent {
        RawEvent {
            id: "1001".to_string(),
            event_type: event_type.to_string(),
            actor: ActorRef {
                login: "octocat".to_string(),
            },
            repo: RepoRef {
                name: "octocat/hello".to_string(),
            },
            payload,
            public: true,
            created_at: "2024-05-01T12:00:00Z".to_string(),
        }
    }

    #[test]
    fn test_push_payload_without_size() {
        let event = Event::from_raw(raw(
            PUSH_EVENT,
            json!({"push_id": 7, "ref": "refs/heads/main", "head": "bbb", "before": "aaa"}),
        ))
        .unwrap();

        assert!(event.push_missing_size());
        match &event.payload {
            EventPayload::Push(push) => {
                assert_eq!(push.branch(), Some("main"));
                assert_eq!(push.head.as_deref(), Some("bbb"));
                assert!(push.commits.is_empty());
            }
            other => panic!("expected push payload, got {other:?}"),
        }
    }

    #[test]
    fn test_pull_request_number() {
        let event = Event::from_raw(raw(
            PULL_REQUEST_EVENT,
            json!({"action": "opened", "number": 12, "pull_request": {"number": 12, "title": "Add parser"}}),
        ))
        .unwrap();
        assert_eq!(event.pull_request_number(), Some(12));
        assert!(!event.enriched);
    }

    #[test]
    fn test_unknown_type_kept_raw() {
        let payload = json!({"member": {"login": "someone"}, "action": "added"});
        let event = Event::from_raw(raw("MemberEvent", payload.clone())).unwrap();
        assert_eq!(event.payload, EventPayload::Other(payload));
        assert_eq!(event.action_type(), "Member");
    }

    #[test]
    fn test_mismatched_payload_kept_raw() {
        let payload = json!({"action": "opened", "issue": "not-an-object"});
        let decoded = EventPayload::decode(ISSUES_EVENT, payload.clone());
        assert_eq!(decoded, EventPayload::Other(payload));
    }

    #[test]
    fn test_bad_timestamp_rejected() {
        let mut event = raw(WATCH_EVENT, json!({"action": "started"}));
        event.created_at = "yesterday".to_string();
        assert!(Event::from_raw(event).is_none());
    }

    #[test]
    fn test_stored_payload_decodes_back() {
        let event = Event::from_raw(raw(
            PUSH_EVENT,
            json!({"ref": "refs/heads/dev", "size": 2, "commits": [{"sha": "a1", "message": "one"}]}),
        ))
        .unwrap();
        let stored = event.payload.to_value().unwrap();
        assert_eq!(EventPayload::decode(PUSH_EVENT, stored), event.payload);
    }

    #[test]
    fn test_type_name_helpers() {
        assert_eq!(strip_event_suffix("IssueCommentEvent"), "IssueComment");
        assert_eq!(strip_event_suffix("Event"), "Event");
        assert_eq!(event_type_for_action("Push"), "PushEvent");
        assert_eq!(event_type_for_action("PushEvent"), "PushEvent");
    }
}
