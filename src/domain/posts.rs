//! Post lifecycle rules.
//!
//! Status is always explicit. Timestamps are metadata attached to a status and
//! are checked against it; they are never used to work out what the status is.

use postboard_api_types::{Post, PostStatus, PostWriteRequest};
use time::OffsetDateTime;

use super::error::{DomainError, PostField};

/// Upper bound on post body length, counted in characters.
pub const CONTENT_MAX_CHARS: usize = 3000;
const LABEL_PREVIEW_CHARS: usize = 30;
const UNTITLED_LABEL: &str = "Untitled Post";

/// Check a write request before it is sent to the backend.
///
/// `now` is truncated to the minute because schedule times are entered with
/// minute resolution; a time in the current minute counts as present.
pub fn validate(request: &PostWriteRequest, now: OffsetDateTime) -> Result<(), DomainError> {
    if request.content.trim().is_empty() {
        return Err(DomainError::validation(
            PostField::Content,
            "content must not be empty",
        ));
    }

    let length = request.content.chars().count();
    if length > CONTENT_MAX_CHARS {
        return Err(DomainError::validation(
            PostField::Content,
            format!("content is {length} characters; the limit is {CONTENT_MAX_CHARS}"),
        ));
    }

    match (request.status, request.scheduled_for) {
        (PostStatus::Scheduled, None) => {
            return Err(DomainError::validation(
                PostField::ScheduledFor,
                "a scheduled post needs a publish time",
            ));
        }
        (PostStatus::Draft, Some(_)) => {
            return Err(DomainError::validation(
                PostField::ScheduledFor,
                "a draft must not carry a publish time",
            ));
        }
        _ => {}
    }

    if let Some(scheduled_for) = request.scheduled_for {
        let floor = now
            .replace_second(0)
            .and_then(|value| value.replace_nanosecond(0))
            .unwrap_or(now);
        if scheduled_for < floor {
            return Err(DomainError::validation(
                PostField::ScheduledFor,
                "publish time is in the past",
            ));
        }
    }

    Ok(())
}

/// Report status/timestamp inconsistencies on a post received from the backend.
pub fn check_invariants(post: &Post) -> Result<(), DomainError> {
    let id = post.id.as_str();
    match post.status {
        PostStatus::Scheduled => {
            if post.scheduled_for.is_none() {
                return Err(DomainError::invariant(id, "scheduled without scheduledFor"));
            }
            if post.published_at.is_some() {
                return Err(DomainError::invariant(id, "scheduled but already has publishedAt"));
            }
        }
        PostStatus::Published => {
            if post.published_at.is_none() {
                return Err(DomainError::invariant(id, "published without publishedAt"));
            }
        }
        PostStatus::Draft => {}
    }

    if post.engagement.is_some() && post.status != PostStatus::Published {
        return Err(DomainError::invariant(
            id,
            "engagement present on an unpublished post",
        ));
    }

    Ok(())
}

/// The instant a post is placed on the calendar at.
///
/// `scheduledFor` wins over `publishedAt`. Drafts have none, whatever stale
/// timestamps they may still carry.
pub fn effective_date(post: &Post) -> Option<OffsetDateTime> {
    match post.status {
        PostStatus::Draft => None,
        PostStatus::Scheduled | PostStatus::Published => post.scheduled_for.or(post.published_at),
    }
}

/// Short label for compact views: the title, else a content preview.
pub fn display_label(post: &Post) -> String {
    if let Some(title) = post.title.as_deref().filter(|title| !title.trim().is_empty()) {
        return title.to_string();
    }

    let mut chars = post.content.chars();
    let preview: String = chars.by_ref().take(LABEL_PREVIEW_CHARS).collect();
    if chars.next().is_some() {
        format!("{preview}...")
    } else {
        preview
    }
}

pub fn list_title(post: &Post) -> &str {
    post.title
        .as_deref()
        .filter(|title| !title.trim().is_empty())
        .unwrap_or(UNTITLED_LABEL)
}

/// Split a free-text hashtag field on whitespace, keeping order and duplicates.
pub fn normalize_hashtags(text: &str) -> Vec<String> {
    text.split_whitespace().map(str::to_string).collect()
}

pub fn join_hashtags(hashtags: &[String]) -> String {
    hashtags.join(" ")
}
