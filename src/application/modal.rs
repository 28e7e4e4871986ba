//! Create/edit workflow for a single post.
//!
//! A [`ModalController`] owns one editable draft. At most one network operation
//! (save or generate) is outstanding per controller; a second request while
//! one is in flight is rejected without touching the network. Responses that
//! arrive after [`ModalController::close`] are dropped.

use std::fmt;
use std::sync::{Arc, Mutex};

use chrono_tz::Tz;
use postboard_api_types::{
    GenerateContentRequest, Post, PostId, PostStatus, PostType, PostWriteRequest,
};
use thiserror::Error;
use tracing::{Instrument, debug, info, info_span, warn};
use uuid::Uuid;

use crate::application::ports::{ApiError, ContentApi, GenerationApi};
use crate::domain::error::{DomainError, PostField};
use crate::domain::posts::{join_hashtags, normalize_hashtags, validate};
use crate::util::clock::{Clock, SystemClock};
use crate::util::lock::mutex_lock;
use crate::util::timezone::{format_local_input, parse_local_input};

type SavedCallback = Box<dyn Fn(&Post) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Save,
    Generate,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Operation::Save => "save",
            Operation::Generate => "generate",
        })
    }
}

#[derive(Debug, Error)]
pub enum ModalError {
    #[error(transparent)]
    Validation(#[from] DomainError),
    #[error("a {0} request is already in flight")]
    Busy(Operation),
    #[error("content generation failed: {0}")]
    Generation(#[source] ApiError),
    #[error("saving the post failed: {0}")]
    Save(#[source] ApiError),
    #[error("the draft was edited while content was generating; generated text discarded")]
    Superseded,
    #[error("the editor has been closed")]
    Closed,
    #[error("session expired; sign in again")]
    Unauthorized,
}

impl ModalError {
    /// Whether the same call may succeed if issued again.
    pub fn is_retryable(&self) -> bool {
        match self {
            ModalError::Generation(err) | ModalError::Save(err) => err.is_retryable(),
            ModalError::Busy(_) | ModalError::Superseded => true,
            ModalError::Validation(_) | ModalError::Closed | ModalError::Unauthorized => false,
        }
    }
}

/// How the caller wants the draft persisted. The status sent to the backend
/// comes from here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveAction {
    Draft,
    Schedule,
    PublishNow,
}

impl SaveAction {
    pub fn status(self) -> PostStatus {
        match self {
            SaveAction::Draft => PostStatus::Draft,
            SaveAction::Schedule => PostStatus::Scheduled,
            SaveAction::PublishNow => PostStatus::Published,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SaveAction::Draft => "Save Draft",
            SaveAction::Schedule => "Schedule Post",
            SaveAction::PublishNow => "Publish Now",
        }
    }
}

/// Form fields as the user edits them.
///
/// `hashtags` is free text and `scheduled_for` is a local `YYYY-MM-DDTHH:MM`
/// value; both are converted only when a request is built.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DraftForm {
    pub title: String,
    pub content: String,
    pub kind: PostType,
    pub hashtags: String,
    pub scheduled_for: String,
}

impl DraftForm {
    pub fn from_post(post: &Post, tz: Tz) -> Self {
        Self {
            title: post.title.clone().unwrap_or_default(),
            content: post.content.clone(),
            kind: post.kind,
            hashtags: join_hashtags(&post.hashtags),
            scheduled_for: post
                .scheduled_for
                .map(|at| format_local_input(at, tz))
                .unwrap_or_default(),
        }
    }

    pub fn content_length(&self) -> usize {
        self.content.chars().count()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Busy {
    Idle,
    Saving,
    Generating,
}

struct ModalState {
    draft: DraftForm,
    editing: Option<PostId>,
    busy: Busy,
    revision: u64,
    closed: bool,
}

impl ModalState {
    fn admit(&self) -> Result<(), ModalError> {
        if self.closed {
            return Err(ModalError::Closed);
        }
        match self.busy {
            Busy::Idle => Ok(()),
            Busy::Saving => Err(ModalError::Busy(Operation::Save)),
            Busy::Generating => Err(ModalError::Busy(Operation::Generate)),
        }
    }
}

/// Marks the controller busy for one admitted request.
///
/// Dropping the guard without [`InFlight::finish`] (the request future was
/// cancelled) returns the controller to idle.
struct InFlight<'a> {
    state: &'a Mutex<ModalState>,
    session: Uuid,
    armed: bool,
}

impl<'a> InFlight<'a> {
    fn begin(
        state: &'a Mutex<ModalState>,
        guard: &mut ModalState,
        busy: Busy,
        session: Uuid,
    ) -> Self {
        guard.busy = busy;
        Self {
            state,
            session,
            armed: true,
        }
    }

    fn finish(mut self, guard: &mut ModalState) {
        guard.busy = Busy::Idle;
        self.armed = false;
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut state = mutex_lock(self.state, "application::modal");
        debug!(session = %self.session, busy = ?state.busy, "request cancelled");
        state.busy = Busy::Idle;
    }
}

pub struct ModalController {
    session: Uuid,
    content: Arc<dyn ContentApi>,
    generator: Arc<dyn GenerationApi>,
    clock: Arc<dyn Clock>,
    tz: Tz,
    on_saved: Option<SavedCallback>,
    state: Mutex<ModalState>,
}

impl fmt::Debug for ModalController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModalController")
            .field("session", &self.session)
            .field("tz", &self.tz)
            .finish_non_exhaustive()
    }
}

impl ModalController {
    /// A controller holding an empty create draft.
    pub fn new(content: Arc<dyn ContentApi>, generator: Arc<dyn GenerationApi>, tz: Tz) -> Self {
        Self {
            session: Uuid::new_v4(),
            content,
            generator,
            clock: Arc::new(SystemClock),
            tz,
            on_saved: None,
            state: Mutex::new(ModalState {
                draft: DraftForm::default(),
                editing: None,
                busy: Busy::Idle,
                revision: 0,
                closed: false,
            }),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Register the completion signal fired after every successful save.
    pub fn on_saved(mut self, callback: impl Fn(&Post) + Send + Sync + 'static) -> Self {
        self.on_saved = Some(Box::new(callback));
        self
    }

    pub fn session_id(&self) -> Uuid {
        self.session
    }

    /// Reset the draft from `post` (edit) or to empty defaults (create).
    pub fn load_from_post(&self, post: Option<&Post>) -> Result<(), ModalError> {
        let mut state = self.lock();
        state.admit()?;
        state.draft = post
            .map(|post| DraftForm::from_post(post, self.tz))
            .unwrap_or_default();
        state.editing = post.map(|post| post.id.clone());
        state.revision += 1;
        debug!(session = %self.session, editing = ?state.editing, "draft loaded");
        Ok(())
    }

    pub fn draft(&self) -> DraftForm {
        self.lock().draft.clone()
    }

    /// Identifier of the post being edited; `None` while creating.
    pub fn editing(&self) -> Option<PostId> {
        self.lock().editing.clone()
    }

    /// Apply a user edit to the draft.
    ///
    /// Edits are accepted while a request is in flight, but they make any
    /// pending generation result stale.
    pub fn edit(&self, apply: impl FnOnce(&mut DraftForm)) -> Result<(), ModalError> {
        let mut state = self.lock();
        if state.closed {
            return Err(ModalError::Closed);
        }
        apply(&mut state.draft);
        state.revision += 1;
        Ok(())
    }

    pub fn set_title(&self, title: impl Into<String>) -> Result<(), ModalError> {
        let title = title.into();
        self.edit(|draft| draft.title = title)
    }

    pub fn set_content(&self, content: impl Into<String>) -> Result<(), ModalError> {
        let content = content.into();
        self.edit(|draft| draft.content = content)
    }

    pub fn set_kind(&self, kind: PostType) -> Result<(), ModalError> {
        self.edit(|draft| draft.kind = kind)
    }

    pub fn set_hashtags(&self, hashtags: impl Into<String>) -> Result<(), ModalError> {
        let hashtags = hashtags.into();
        self.edit(|draft| draft.hashtags = hashtags)
    }

    pub fn set_scheduled_for(&self, local: impl Into<String>) -> Result<(), ModalError> {
        let local = local.into();
        self.edit(|draft| draft.scheduled_for = local)
    }

    pub fn is_saving(&self) -> bool {
        self.lock().busy == Busy::Saving
    }

    pub fn is_generating(&self) -> bool {
        self.lock().busy == Busy::Generating
    }

    pub fn is_busy(&self) -> bool {
        self.lock().busy != Busy::Idle
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// The action the primary button offers: schedule when a time is entered.
    pub fn default_action(&self) -> SaveAction {
        if self.lock().draft.scheduled_for.trim().is_empty() {
            SaveAction::Draft
        } else {
            SaveAction::Schedule
        }
    }

    /// Whether the primary button should be enabled.
    pub fn can_save(&self) -> bool {
        let state = self.lock();
        !state.closed && state.busy == Busy::Idle && !state.draft.content.trim().is_empty()
    }

    /// Convert the current draft into a validated write request.
    pub fn build_request(&self, action: SaveAction) -> Result<PostWriteRequest, ModalError> {
        let draft = self.draft();
        self.request_from(&draft, action)
    }

    fn request_from(
        &self,
        draft: &DraftForm,
        action: SaveAction,
    ) -> Result<PostWriteRequest, ModalError> {
        let scheduled_for = match action {
            SaveAction::Schedule if !draft.scheduled_for.trim().is_empty() => Some(
                parse_local_input(&draft.scheduled_for, self.tz).map_err(|err| {
                    DomainError::validation(PostField::ScheduledFor, err.to_string())
                })?,
            ),
            _ => None,
        };

        let title = draft.title.trim();
        let request = PostWriteRequest {
            title: (!title.is_empty()).then(|| title.to_string()),
            content: draft.content.clone(),
            kind: draft.kind,
            hashtags: normalize_hashtags(&draft.hashtags),
            status: action.status(),
            scheduled_for,
        };

        validate(&request, self.clock.now())?;
        Ok(request)
    }

    /// Ask the generation collaborator for content and hashtags.
    ///
    /// `topic` defaults to the draft title and `kind` to the draft type. On
    /// success only `content` and `hashtags` are overwritten.
    pub async fn generate(
        &self,
        topic: Option<&str>,
        kind: Option<PostType>,
    ) -> Result<(), ModalError> {
        let (request, issued_at, in_flight) = {
            let mut state = self.lock();
            if let Err(err) = state.admit() {
                record_generate("rejected");
                warn!(session = %self.session, error = %err, "generate rejected");
                return Err(err);
            }
            let request = GenerateContentRequest {
                kind: kind.unwrap_or(state.draft.kind),
                topic: topic
                    .map(str::to_string)
                    .unwrap_or_else(|| state.draft.title.clone()),
            };
            let in_flight =
                InFlight::begin(&self.state, &mut state, Busy::Generating, self.session);
            (request, state.revision, in_flight)
        };

        let span = info_span!(
            "modal.generate",
            session = %self.session,
            kind = request.kind.as_str()
        );
        let result = self
            .generator
            .generate_content(&request)
            .instrument(span)
            .await;

        let mut state = self.lock();
        in_flight.finish(&mut state);
        if state.closed {
            record_generate("closed");
            debug!(session = %self.session, "generation response ignored after close");
            return Err(ModalError::Closed);
        }

        match result {
            Ok(generated) => {
                if state.revision != issued_at {
                    record_generate("superseded");
                    info!(session = %self.session, "draft edited during generation; discarding");
                    return Err(ModalError::Superseded);
                }
                state.draft.content = generated.content;
                state.draft.hashtags = join_hashtags(&generated.hashtags);
                state.revision += 1;
                record_generate("ok");
                info!(session = %self.session, "generated content applied");
                Ok(())
            }
            Err(ApiError::Unauthorized) => {
                record_generate("unauthorized");
                Err(ModalError::Unauthorized)
            }
            Err(err) => {
                record_generate("error");
                warn!(session = %self.session, error = %err, "content generation failed");
                Err(ModalError::Generation(err))
            }
        }
    }

    /// Validate and persist the draft, creating or updating as appropriate.
    ///
    /// Validation failures return before any request is issued. On failure the
    /// draft is kept for a retry. After a successful create, later saves update
    /// the created post.
    pub async fn save(&self, action: SaveAction) -> Result<Post, ModalError> {
        let (request, editing, in_flight) = {
            let mut state = self.lock();
            if let Err(err) = state.admit() {
                record_save("rejected");
                warn!(session = %self.session, error = %err, "save rejected");
                return Err(err);
            }
            let request = match self.request_from(&state.draft, action) {
                Ok(request) => request,
                Err(err) => {
                    record_save("invalid");
                    debug!(session = %self.session, error = %err, "draft failed validation");
                    return Err(err);
                }
            };
            let in_flight =
                InFlight::begin(&self.state, &mut state, Busy::Saving, self.session);
            (request, state.editing.clone(), in_flight)
        };

        let span = info_span!(
            "modal.save",
            session = %self.session,
            status = request.status.as_str(),
            post_id = editing.as_ref().map(PostId::as_str),
        );
        let result = async {
            match editing.as_ref() {
                Some(id) => self.content.update_post(id, &request).await,
                None => self.content.create_post(&request).await,
            }
        }
        .instrument(span)
        .await;

        let saved = {
            let mut state = self.lock();
            in_flight.finish(&mut state);
            if state.closed {
                record_save("closed");
                debug!(session = %self.session, "save response ignored after close");
                return Err(ModalError::Closed);
            }

            match result {
                Ok(post) => {
                    state.editing = Some(post.id.clone());
                    post
                }
                Err(ApiError::Unauthorized) => {
                    record_save("unauthorized");
                    return Err(ModalError::Unauthorized);
                }
                Err(err) => {
                    record_save("error");
                    warn!(session = %self.session, error = %err, "saving post failed");
                    return Err(ModalError::Save(err));
                }
            }
        };

        record_save("ok");
        info!(
            session = %self.session,
            post_id = %saved.id,
            status = saved.status.as_str(),
            "post saved"
        );
        if let Some(callback) = self.on_saved.as_ref() {
            callback(&saved);
        }
        Ok(saved)
    }

    /// Tear the session down; pending responses will be ignored.
    pub fn close(&self) {
        let mut state = self.lock();
        if !state.closed {
            state.closed = true;
            debug!(session = %self.session, busy = ?state.busy, "editor closed");
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ModalState> {
        mutex_lock(&self.state, "application::modal")
    }
}

fn record_save(outcome: &'static str) {
    metrics::counter!("postboard_modal_save_total", "outcome" => outcome).increment(1);
}

fn record_generate(outcome: &'static str) {
    metrics::counter!("postboard_modal_generate_total", "outcome" => outcome).increment(1);
}
