//! Human-readable one-line summaries of events.
//!
//! The summary is derived only from the event type and payload, so it is
//! stable across reads and can be used for substring filtering.

use super::model::{Event, EventPayload};

/// Summarize an event, e.g. `Pushed 3 commits to main`.
pub fn describe(event: &Event) -> String {
    match &event.payload {
        EventPayload::Push(push) => {
            let count = push.size.unwrap_or(push.commits.len() as u64);
            let noun = if count == 1 { "commit" } else { "commits" };
            match push.branch() {
                Some(branch) => format!("Pushed {count} {noun} to {branch}"),
                None => format!("Pushed {count} {noun}"),
            }
        }
        EventPayload::PullRequest(pr) => {
            let number = event.pull_request_number().unwrap_or_default();
            let verb = if pr.action == "closed" && pr.pull_request.merged == Some(true) {
                "Merged".to_string()
            } else {
                capitalize(&pr.action)
            };
            with_title(
                format!("{verb} pull request #{number}"),
                &pr.pull_request.title,
            )
        }
        EventPayload::PullRequestReview(review) => with_title(
            format!("Reviewed pull request #{}", review.pull_request.number),
            &review.pull_request.title,
        ),
        EventPayload::Issues(issues) => with_title(
            format!("{} issue #{}", capitalize(&issues.action), issues.issue.number),
            &issues.issue.title,
        ),
        EventPayload::IssueComment(comment) => {
            let target = if comment.issue.pull_request.is_some() {
                "pull request"
            } else {
                "issue"
            };
            with_title(
                format!("Commented on {target} #{}", comment.issue.number),
                &comment.issue.title,
            )
        }
        EventPayload::Create(created) => match (created.ref_type.as_str(), &created.git_ref) {
            ("repository", _) | (_, None) => format!("Created repository {}", event.repo),
            (kind, Some(name)) => format!("Created {kind} {name}"),
        },
        EventPayload::Delete(deleted) => match &deleted.git_ref {
            Some(name) => format!("Deleted {} {}", deleted.ref_type, name),
            None => format!("Deleted {}", deleted.ref_type),
        },
        EventPayload::Watch(_) => format!("Starred {}", event.repo),
        EventPayload::Fork(fork) => match &fork.forkee {
            Some(forkee) => format!("Forked {} to {}", event.repo, forkee.full_name),
            None => format!("Forked {}", event.repo),
        },
        EventPayload::Release(release) => {
            let tag = release
                .release
                .as_ref()
                .map(|r| r.tag_name.as_str())
                .unwrap_or_default();
            format!("{} release {}", capitalize(&release.action), tag)
                .trim_end()
                .to_string()
        }
        EventPayload::Other(_) => format!("{} activity in {}", event.action_type(), event.repo),
    }
}

/// Case-insensitive substring match against the summary.
pub fn matches_description(event: &Event, needle: &str) -> bool {
    let needle = needle.trim().to_lowercase();
    needle.is_empty() || describe(event).to_lowercase().contains(&needle)
}

fn with_title(prefix: String, title: &str) -> String {
    if title.is_empty() {
        prefix
    } else {
        format!("{prefix}: {title}")
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => "Updated".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::model::{
        IssueCommentPayload, IssueRef, PullRequestPayload, PushPayload, RefPayload,
    };
    use crate::github::PullRequestDetail;
    use chrono::Utc;
    use serde_json::json;

    fn event(event_type: &str, payload: EventPayload) -> Event {
        Event {
            id: "1".to_string(),
            event_type: event_type.to_string(),
            repo: "octocat/hello".to_string(),
            actor: "octocat".to_string(),
            created_at: Utc::now(),
            public: true,
            payload,
            enriched: false,
        }
    }

    #[test]
    fn test_push_description() {
        let push = PushPayload {
            size: Some(1),
            git_ref: Some("refs/heads/main".to_string()),
            ..Default::default()
        };
        assert_eq!(
            describe(&event("PushEvent", EventPayload::Push(push))),
            "Pushed 1 commit to main"
        );
    }

    #[test]
    fn test_merged_pull_request() {
        let pr = PullRequestPayload {
            action: "closed".to_string(),
            number: 9,
            pull_request: PullRequestDetail {
                number: 9,
                title: "Speed up parser".to_string(),
                merged: Some(true),
                ..Default::default()
            },
            ..Default::default()
        };
        assert_eq!(
            describe(&event("PullRequestEvent", EventPayload::PullRequest(pr))),
            "Merged pull request #9: Speed up parser"
        );
    }

    #[test]
    fn test_issue_comment_on_issue_and_pr() {
        let mut payload = IssueCommentPayload {
            action: "created".to_string(),
            issue: IssueRef {
                number: 4,
                title: "Crash on start".to_string(),
                ..Default::default()
            },
            ..Default::default()
        };
        let on_issue = event(
            "IssueCommentEvent",
            EventPayload::IssueComment(payload.clone()),
        );
        assert_eq!(describe(&on_issue), "Commented on issue #4: Crash on start");
        assert!(matches_description(&on_issue, "commented on issue"));

        payload.issue.pull_request = Some(json!({"url": "https://api.github.com/x"}));
        let on_pr = event("IssueCommentEvent", EventPayload::IssueComment(payload));
        assert!(!matches_description(&on_pr, "commented on issue"));
    }

    #[test]
    fn test_create_branch_and_repository() {
        let branch = RefPayload {
            git_ref: Some("feature/x".to_string()),
            ref_type: "branch".to_string(),
            description: None,
        };
        assert_eq!(
            describe(&event("CreateEvent", EventPayload::Create(branch))),
            "Created branch feature/x"
        );

        let repo = RefPayload {
            ref_type: "repository".to_string(),
            ..Default::default()
        };
        assert_eq!(
            describe(&event("CreateEvent", EventPayload::Create(repo))),
            "Created repository octocat/hello"
        );
    }

    #[test]
    fn test_other_event() {
        let e = event("GollumEvent", EventPayload::Other(json!({})));
        assert_eq!(describe(&e), "Gollum activity in octocat/hello");
    }

    #[test]
    fn test_empty_needle_matches_everything() {
        let e = event("GollumEvent", EventPayload::Other(json!({})));
        assert!(matches_description(&e, "  "));
    }
}
