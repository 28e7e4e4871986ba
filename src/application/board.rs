//! Dashboard state: the loaded post collection and the views derived from it.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono_tz::Tz;
use postboard_api_types::{Post, PostId};
use time::Date;
use tracing::{info, instrument, warn};

use crate::application::calendar::{
    CalendarGrid, CalendarGridBuilder, first_of_month, next_month, previous_month,
};
use crate::application::filter::{
    FilterState, StatusCounts, StatusFilter, apply, filter_posts, status_counts,
};
use crate::application::modal::ModalController;
use crate::application::ports::{ApiError, ContentApi, GenerationApi};
use crate::domain::posts::check_invariants;
use crate::util::clock::{Clock, SystemClock};
use crate::util::timezone::localized_date;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewMode {
    #[default]
    Calendar,
    List,
}

/// Holds the fetched posts, the month being viewed and the list filter.
///
/// Editors opened from the board mark it stale after a successful save so the
/// next [`ContentBoard::refresh_if_stale`] refetches.
pub struct ContentBoard {
    content: Arc<dyn ContentApi>,
    generator: Arc<dyn GenerationApi>,
    clock: Arc<dyn Clock>,
    grid: CalendarGridBuilder,
    posts: Vec<Post>,
    reference: Date,
    view: ViewMode,
    filter: FilterState,
    stale: Arc<AtomicBool>,
}

impl ContentBoard {
    pub fn new(
        content: Arc<dyn ContentApi>,
        generator: Arc<dyn GenerationApi>,
        grid: CalendarGridBuilder,
    ) -> Self {
        Self::with_clock(content, generator, grid, Arc::new(SystemClock))
    }

    /// The reference date starts at today in the builder's zone.
    pub fn with_clock(
        content: Arc<dyn ContentApi>,
        generator: Arc<dyn GenerationApi>,
        grid: CalendarGridBuilder,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let reference = localized_date(clock.now(), grid.timezone());
        Self {
            content,
            generator,
            clock,
            grid,
            posts: Vec::new(),
            reference,
            view: ViewMode::default(),
            filter: FilterState::default(),
            stale: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn timezone(&self) -> Tz {
        self.grid.timezone()
    }

    /// Replace the collection with the backend's current list.
    ///
    /// Posts whose status and timestamps disagree are kept but logged.
    #[instrument(skip_all)]
    pub async fn refresh(&mut self) -> Result<usize, ApiError> {
        let posts = self.content.list_posts().await?;
        for post in &posts {
            if let Err(err) = check_invariants(post) {
                warn!(error = %err, "backend returned an inconsistent post");
            }
        }

        self.posts = posts;
        self.stale.store(false, Ordering::Release);
        info!(count = self.posts.len(), "posts refreshed");
        Ok(self.posts.len())
    }

    /// Refetch only if a save happened since the last refresh.
    pub async fn refresh_if_stale(&mut self) -> Result<bool, ApiError> {
        if !self.is_stale() {
            return Ok(false);
        }
        self.refresh().await?;
        Ok(true)
    }

    pub fn is_stale(&self) -> bool {
        self.stale.load(Ordering::Acquire)
    }

    pub fn posts(&self) -> &[Post] {
        &self.posts
    }

    pub fn find(&self, id: &PostId) -> Option<&Post> {
        self.posts.iter().find(|post| &post.id == id)
    }

    /// Global search: the query alone, ignoring the status tab.
    pub fn search_results(&self) -> Vec<&Post> {
        apply(&self.posts, StatusFilter::All, self.filter.query())
    }

    /// Month grid over the search results; the status tab does not apply.
    pub fn grid(&self) -> CalendarGrid<'_> {
        self.grid.build(self.search_results(), self.reference)
    }

    pub fn list(&self) -> Vec<&Post> {
        filter_posts(&self.posts, &self.filter)
    }

    pub fn status_counts(&self) -> StatusCounts {
        status_counts(&self.posts)
    }

    pub fn reference(&self) -> Date {
        self.reference
    }

    pub fn next_month(&mut self) {
        self.reference = next_month(self.reference);
    }

    pub fn previous_month(&mut self) {
        self.reference = previous_month(self.reference);
    }

    pub fn select_date(&mut self, date: Date) {
        self.reference = first_of_month(date);
    }

    pub fn view(&self) -> ViewMode {
        self.view
    }

    pub fn set_view(&mut self, view: ViewMode) {
        self.view = view;
    }

    pub fn filter(&self) -> &FilterState {
        &self.filter
    }

    pub fn set_filter(&mut self, filter: FilterState) {
        self.filter = filter;
    }

    /// Open an editor on `post`, or on an empty draft when `None`.
    pub fn open_editor(&self, post: Option<&Post>) -> ModalController {
        let stale = Arc::clone(&self.stale);
        let controller = ModalController::new(
            Arc::clone(&self.content),
            Arc::clone(&self.generator),
            self.timezone(),
        )
        .with_clock(Arc::clone(&self.clock))
        .on_saved(move |_| stale.store(true, Ordering::Release));

        if let Err(err) = controller.load_from_post(post) {
            // A fresh controller is idle and open, so loading cannot be refused.
            warn!(error = %err, "new editor refused its initial draft");
        }
        controller
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::modal::SaveAction;
    use crate::util::clock::FixedClock;
    use async_trait::async_trait;
    use postboard_api_types::{
        GenerateContentRequest, GeneratedContent, PostStatus, PostType, PostWriteRequest,
    };
    use std::sync::Mutex;
    use std::sync::atomic::AtomicUsize;
    use time::macros::{date, datetime};

    #[derive(Default)]
    struct MemoryApi {
        posts: Mutex<Vec<Post>>,
        list_calls: AtomicUsize,
    }

    #[async_trait]
    impl ContentApi for MemoryApi {
        async fn list_posts(&self) -> Result<Vec<Post>, ApiError> {
            self.list_calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.posts.lock().unwrap().clone())
        }

        async fn create_post(&self, request: &PostWriteRequest) -> Result<Post, ApiError> {
            let mut posts = self.posts.lock().unwrap();
            let post = Post {
                id: PostId::from(format!("p-{}", posts.len() + 1)),
                title: request.title.clone(),
                content: request.content.clone(),
                kind: request.kind,
                hashtags: request.hashtags.clone(),
                status: request.status,
                scheduled_for: request.scheduled_for,
                published_at: None,
                engagement: None,
            };
            posts.push(post.clone());
            Ok(post)
        }

        async fn update_post(
            &self,
            id: &PostId,
            _request: &PostWriteRequest,
        ) -> Result<Post, ApiError> {
            Err(ApiError::Status {
                status: 404,
                body: format!("no post {id}"),
            })
        }
    }

    #[async_trait]
    impl GenerationApi for MemoryApi {
        async fn generate_content(
            &self,
            _request: &GenerateContentRequest,
        ) -> Result<GeneratedContent, ApiError> {
            Ok(GeneratedContent {
                content: "generated".into(),
                hashtags: Vec::new(),
            })
        }
    }

    fn scheduled(id: &str, content: &str, at: time::OffsetDateTime) -> Post {
        Post {
            id: PostId::from(id),
            title: None,
            content: content.into(),
            kind: PostType::Text,
            hashtags: Vec::new(),
            status: PostStatus::Scheduled,
            scheduled_for: Some(at),
            published_at: None,
            engagement: None,
        }
    }

    fn board(api: Arc<MemoryApi>) -> ContentBoard {
        ContentBoard::with_clock(
            api.clone(),
            api,
            CalendarGridBuilder::new(Tz::UTC),
            Arc::new(FixedClock(datetime!(2024-05-20 08:00 UTC))),
        )
    }

    #[tokio::test]
    async fn board_starts_on_today_and_navigates_by_month() {
        let mut board = board(Arc::new(MemoryApi::default()));
        assert_eq!(board.reference(), date!(2024 - 05 - 20));

        board.next_month();
        assert_eq!(board.reference(), date!(2024 - 06 - 01));
        board.previous_month();
        board.previous_month();
        assert_eq!(board.reference(), date!(2024 - 04 - 01));

        board.select_date(date!(2024 - 12 - 25));
        assert_eq!(board.grid().label(), "December 2024");
    }

    #[tokio::test]
    async fn list_applies_tab_while_search_ignores_it() {
        let api = Arc::new(MemoryApi::default());
        api.posts.lock().unwrap().extend([
            scheduled("a", "launch day", datetime!(2024-06-01 09:00 UTC)),
            Post {
                status: PostStatus::Draft,
                scheduled_for: None,
                ..scheduled("b", "launch prep", datetime!(2024-06-01 09:00 UTC))
            },
        ]);

        let mut board = board(api);
        board.refresh().await.expect("refresh");
        board.set_filter(FilterState::new(StatusFilter::Draft, "launch"));

        let listed: Vec<_> = board.list().into_iter().map(|p| p.id.as_str()).collect();
        let searched: Vec<_> = board
            .search_results()
            .into_iter()
            .map(|p| p.id.as_str())
            .collect();
        assert_eq!(listed, ["b"]);
        assert_eq!(searched, ["a", "b"]);
        assert_eq!(board.status_counts().all, 2);
        assert!(board.find(&PostId::from("a")).is_some());
    }

    #[tokio::test]
    async fn calendar_shows_only_search_matches() {
        let api = Arc::new(MemoryApi::default());
        api.posts.lock().unwrap().extend([
            scheduled("a", "launch day", datetime!(2024-06-03 09:00 UTC)),
            scheduled("b", "product update", datetime!(2024-06-03 15:00 UTC)),
        ]);

        let mut board = board(api);
        board.refresh().await.expect("refresh");
        board.select_date(date!(2024 - 06 - 03));
        assert_eq!(board.grid().cell(date!(2024 - 06 - 03)).expect("cell").total(), 2);

        board.set_filter(FilterState::new(StatusFilter::Draft, "LAUNCH"));
        let grid = board.grid();
        let cell = grid.cell(date!(2024 - 06 - 03)).expect("cell");
        let ids: Vec<_> = cell.visible.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, ["a"]);
    }

    #[tokio::test]
    async fn saving_from_an_editor_marks_the_board_stale() {
        let api = Arc::new(MemoryApi::default());
        let mut board = board(api.clone());
        assert!(board.refresh_if_stale().await.expect("initial load"));
        assert!(!board.refresh_if_stale().await.expect("already fresh"));

        let editor = board.open_editor(None);
        editor.set_content("Hello").expect("edit");
        editor.save(SaveAction::Draft).await.expect("save");

        assert!(board.is_stale());
        assert!(board.refresh_if_stale().await.expect("reload"));
        assert_eq!(board.posts().len(), 1);
        assert_eq!(api.list_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn drafts_stay_off_the_grid() {
        let api = Arc::new(MemoryApi::default());
        api.posts.lock().unwrap().push(Post {
            status: PostStatus::Draft,
            ..scheduled("d", "draft", datetime!(2024-05-21 09:00 UTC))
        });

        let mut board = board(api);
        board.refresh().await.expect("refresh");
        assert!(board.grid().days().all(|cell| cell.total() == 0));
    }
}
