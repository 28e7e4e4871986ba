//! Status-tab and text-search filtering over the post collection.

use std::str::FromStr;

use postboard_api_types::{Post, PostStatus};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown status filter `{0}` (expected all, draft, scheduled or published)")]
pub struct InvalidStatusFilter(String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StatusFilter {
    #[default]
    All,
    Draft,
    Scheduled,
    Published,
}

impl StatusFilter {
    /// Tabs in display order.
    pub const TABS: [StatusFilter; 4] = [
        StatusFilter::All,
        StatusFilter::Draft,
        StatusFilter::Scheduled,
        StatusFilter::Published,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            StatusFilter::All => "all",
            StatusFilter::Draft => "draft",
            StatusFilter::Scheduled => "scheduled",
            StatusFilter::Published => "published",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            StatusFilter::All => "All Posts",
            StatusFilter::Draft => "Drafts",
            StatusFilter::Scheduled => "Scheduled",
            StatusFilter::Published => "Published",
        }
    }

    pub fn matches(self, status: PostStatus) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Draft => status == PostStatus::Draft,
            StatusFilter::Scheduled => status == PostStatus::Scheduled,
            StatusFilter::Published => status == PostStatus::Published,
        }
    }
}

impl From<PostStatus> for StatusFilter {
    fn from(status: PostStatus) -> Self {
        match status {
            PostStatus::Draft => StatusFilter::Draft,
            PostStatus::Scheduled => StatusFilter::Scheduled,
            PostStatus::Published => StatusFilter::Published,
        }
    }
}

impl FromStr for StatusFilter {
    type Err = InvalidStatusFilter;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        StatusFilter::TABS
            .into_iter()
            .find(|tab| tab.as_str().eq_ignore_ascii_case(value.trim()))
            .ok_or_else(|| InvalidStatusFilter(value.to_string()))
    }
}

/// Active tab and search text, passed by value into the filter.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FilterState {
    status: StatusFilter,
    query: String,
}

impl FilterState {
    pub fn new(status: StatusFilter, query: impl Into<String>) -> Self {
        Self {
            status,
            query: query.into(),
        }
    }

    #[must_use]
    pub fn with_status(&self, status: StatusFilter) -> Self {
        Self {
            status,
            query: self.query.clone(),
        }
    }

    #[must_use]
    pub fn with_query(&self, query: impl Into<String>) -> Self {
        Self {
            status: self.status,
            query: query.into(),
        }
    }

    pub fn status(&self) -> StatusFilter {
        self.status
    }

    pub fn query(&self) -> &str {
        &self.query
    }
}

/// Case-insensitive substring match on content or title.
pub fn matches_query(post: &Post, query: &str) -> bool {
    query.is_empty() || contains_lowered(post, &query.to_lowercase())
}

fn contains_lowered(post: &Post, needle: &str) -> bool {
    post.content.to_lowercase().contains(needle)
        || post
            .title
            .as_deref()
            .is_some_and(|title| title.to_lowercase().contains(needle))
}

/// Keep posts passing both the status filter and the query, in input order.
pub fn apply<'a, I>(posts: I, status: StatusFilter, query: &str) -> Vec<&'a Post>
where
    I: IntoIterator<Item = &'a Post>,
{
    let needle = query.to_lowercase();
    posts
        .into_iter()
        .filter(|post| status.matches(post.status))
        .filter(|post| needle.is_empty() || contains_lowered(post, &needle))
        .collect()
}

pub fn filter_posts<'a, I>(posts: I, state: &FilterState) -> Vec<&'a Post>
where
    I: IntoIterator<Item = &'a Post>,
{
    apply(posts, state.status, &state.query)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatusCounts {
    pub all: usize,
    pub draft: usize,
    pub scheduled: usize,
    pub published: usize,
}

impl StatusCounts {
    pub fn get(&self, tab: StatusFilter) -> usize {
        match tab {
            StatusFilter::All => self.all,
            StatusFilter::Draft => self.draft,
            StatusFilter::Scheduled => self.scheduled,
            StatusFilter::Published => self.published,
        }
    }
}

pub fn status_counts<'a, I>(posts: I) -> StatusCounts
where
    I: IntoIterator<Item = &'a Post>,
{
    posts
        .into_iter()
        .fold(StatusCounts::default(), |mut counts, post| {
            counts.all += 1;
            match post.status {
                PostStatus::Draft => counts.draft += 1,
                PostStatus::Scheduled => counts.scheduled += 1,
                PostStatus::Published => counts.published += 1,
            }
            counts
        })
}
