use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono_tz::Tz;
use postboard::api_types::{
    GenerateContentRequest, GeneratedContent, Post, PostId, PostStatus, PostType,
    PostWriteRequest,
};
use postboard::application::modal::{ModalController, ModalError, Operation, SaveAction};
use postboard::application::ports::{ApiError, ContentApi, GenerationApi};
use postboard::domain::error::PostField;
use postboard::util::clock::FixedClock;
use time::macros::datetime;
use tokio::sync::Notify;

#[derive(Default)]
struct StubApi {
    gated: AtomicBool,
    entered: Notify,
    release: Notify,
    create_calls: AtomicUsize,
    update_calls: AtomicUsize,
    generate_calls: AtomicUsize,
    failure: Mutex<Option<ApiError>>,
    last_write: Mutex<Option<PostWriteRequest>>,
    last_generate: Mutex<Option<GenerateContentRequest>>,
}

impl StubApi {
    fn gated() -> Arc<Self> {
        let api = Self::default();
        api.gated.store(true, Ordering::SeqCst);
        Arc::new(api)
    }

    fn failing(err: ApiError) -> Arc<Self> {
        let api = Self::default();
        *api.failure.lock().unwrap() = Some(err);
        Arc::new(api)
    }

    async fn pass_gate(&self) {
        if self.gated.load(Ordering::SeqCst) {
            self.entered.notify_one();
            self.release.notified().await;
        }
    }

    fn failure(&self) -> Option<ApiError> {
        self.failure.lock().unwrap().clone()
    }

    fn echo(&self, id: &str, request: &PostWriteRequest) -> Post {
        *self.last_write.lock().unwrap() = Some(request.clone());
        Post {
            id: PostId::from(id),
            title: request.title.clone(),
            content: request.content.clone(),
            kind: request.kind,
            hashtags: request.hashtags.clone(),
            status: request.status,
            scheduled_for: request.scheduled_for,
            published_at: (request.status == PostStatus::Published)
                .then_some(datetime!(2024-05-01 00:00 UTC)),
            engagement: None,
        }
    }
}

#[async_trait]
impl ContentApi for StubApi {
    async fn list_posts(&self) -> Result<Vec<Post>, ApiError> {
        Ok(Vec::new())
    }

    async fn create_post(&self, request: &PostWriteRequest) -> Result<Post, ApiError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        self.pass_gate().await;
        match self.failure() {
            Some(err) => Err(err),
            None => Ok(self.echo("created-1", request)),
        }
    }

    async fn update_post(&self, id: &PostId, request: &PostWriteRequest) -> Result<Post, ApiError> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        self.pass_gate().await;
        match self.failure() {
            Some(err) => Err(err),
            None => Ok(self.echo(id.as_str(), request)),
        }
    }
}

#[async_trait]
impl GenerationApi for StubApi {
    async fn generate_content(
        &self,
        request: &GenerateContentRequest,
    ) -> Result<GeneratedContent, ApiError> {
        self.generate_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_generate.lock().unwrap() = Some(request.clone());
        self.pass_gate().await;
        match self.failure() {
            Some(err) => Err(err),
            None => Ok(GeneratedContent {
                content: format!("All about {}", request.topic),
                hashtags: vec!["#ai".to_string(), "#draft".to_string()],
            }),
        }
    }
}

fn editor(api: &Arc<StubApi>) -> ModalController {
    ModalController::new(api.clone(), api.clone(), Tz::UTC)
        .with_clock(Arc::new(FixedClock(datetime!(2024-05-01 12:00 UTC))))
}

#[tokio::test]
async fn empty_content_fails_validation_without_network() {
    let api = Arc::new(StubApi::default());
    let modal = editor(&api);

    let err = modal.save(SaveAction::Draft).await.expect_err("empty draft");
    match err {
        ModalError::Validation(inner) => assert_eq!(inner.field(), Some(PostField::Content)),
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(api.create_calls.load(Ordering::SeqCst), 0);
    assert!(!modal.is_saving());
}

#[tokio::test]
async fn scheduled_save_yields_scheduled_post() {
    let api = Arc::new(StubApi::default());
    let modal = editor(&api);
    modal.set_content("Hello").unwrap();
    modal.set_scheduled_for("2024-06-01T09:00").unwrap();

    assert_eq!(modal.default_action(), SaveAction::Schedule);
    let post = modal.save(modal.default_action()).await.expect("saved");

    assert_eq!(post.status, PostStatus::Scheduled);
    assert_eq!(post.scheduled_for, Some(datetime!(2024-06-01 09:00 UTC)));
    assert_eq!(api.create_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn draft_without_schedule_stays_draft() {
    let api = Arc::new(StubApi::default());
    let modal = editor(&api);
    modal.set_content("Hello").unwrap();

    let post = modal.save(modal.default_action()).await.expect("saved");
    assert_eq!(post.status, PostStatus::Draft);
    assert_eq!(post.scheduled_for, None);
}

#[tokio::test]
async fn generate_while_saving_is_rejected_without_a_request() {
    let api = StubApi::gated();
    let modal = editor(&api);
    modal.set_content("Hello").unwrap();

    let save = modal.save(SaveAction::Draft);
    let probe = async {
        api.entered.notified().await;
        assert!(modal.is_saving());
        let generated = modal.generate(Some("launch"), None).await;
        let second_save = modal.save(SaveAction::Draft).await;
        api.release.notify_one();
        (generated, second_save)
    };

    let (saved, (generated, second_save)) = tokio::join!(save, probe);

    assert!(matches!(generated, Err(ModalError::Busy(Operation::Save))));
    assert!(matches!(second_save, Err(ModalError::Busy(Operation::Save))));
    assert_eq!(api.generate_calls.load(Ordering::SeqCst), 0);
    assert_eq!(api.create_calls.load(Ordering::SeqCst), 1);
    assert_eq!(saved.expect("first save completes").status, PostStatus::Draft);
    assert!(!modal.is_busy());
}

#[tokio::test]
async fn save_while_generating_is_rejected() {
    let api = StubApi::gated();
    let modal = editor(&api);
    modal.set_title("Launch").unwrap();
    modal.set_content("Hello").unwrap();

    let generate = modal.generate(None, None);
    let probe = async {
        api.entered.notified().await;
        let result = modal.save(SaveAction::Draft).await;
        api.release.notify_one();
        result
    };

    let (generated, saved) = tokio::join!(generate, probe);
    assert!(matches!(saved, Err(ModalError::Busy(Operation::Generate))));
    assert_eq!(api.create_calls.load(Ordering::SeqCst), 0);
    generated.expect("generation completes");
}

#[tokio::test]
async fn generation_fills_content_and_tags_only() {
    let api = Arc::new(StubApi::default());
    let modal = editor(&api);
    modal.set_title("Q3 roadmap").unwrap();
    modal.set_kind(PostType::Article).unwrap();

    modal.generate(None, None).await.expect("generated");

    let draft = modal.draft();
    assert_eq!(draft.title, "Q3 roadmap");
    assert_eq!(draft.content, "All about Q3 roadmap");
    assert_eq!(draft.hashtags, "#ai #draft");

    let sent = api.last_generate.lock().unwrap().clone().expect("request recorded");
    assert_eq!(sent.topic, "Q3 roadmap");
    assert_eq!(sent.kind, PostType::Article);
}

#[tokio::test]
async fn edits_during_generation_supersede_the_result() {
    let api = StubApi::gated();
    let modal = editor(&api);

    let generate = modal.generate(Some("launch"), None);
    let probe = async {
        api.entered.notified().await;
        modal.set_content("typed by hand").unwrap();
        api.release.notify_one();
    };

    let (generated, ()) = tokio::join!(generate, probe);
    assert!(matches!(generated, Err(ModalError::Superseded)));
    assert_eq!(modal.draft().content, "typed by hand");
}

#[tokio::test]
async fn responses_after_close_are_dropped() {
    let api = StubApi::gated();
    let saved_signals = Arc::new(AtomicUsize::new(0));
    let signals = saved_signals.clone();
    let modal = editor(&api).on_saved(move |_| {
        signals.fetch_add(1, Ordering::SeqCst);
    });
    modal.set_content("Hello").unwrap();

    let save = modal.save(SaveAction::Draft);
    let probe = async {
        api.entered.notified().await;
        modal.close();
        api.release.notify_one();
    };

    let (saved, ()) = tokio::join!(save, probe);
    assert!(matches!(saved, Err(ModalError::Closed)));
    assert_eq!(saved_signals.load(Ordering::SeqCst), 0);
    assert!(matches!(
        modal.generate(None, None).await,
        Err(ModalError::Closed)
    ));
}

#[tokio::test]
async fn failed_save_keeps_the_draft_for_retry() {
    let api = StubApi::failing(ApiError::Status {
        status: 503,
        body: "maintenance".into(),
    });
    let modal = editor(&api);
    modal.set_content("Hello").unwrap();
    modal.set_hashtags("#one #two").unwrap();

    let err = modal.save(SaveAction::Draft).await.expect_err("server down");
    assert!(matches!(err, ModalError::Save(_)));
    assert!(err.is_retryable());

    let draft = modal.draft();
    assert_eq!(draft.content, "Hello");
    assert_eq!(draft.hashtags, "#one #two");
    assert!(!modal.is_saving());
}

#[tokio::test]
async fn rejected_credential_surfaces_as_unauthorized() {
    let api = StubApi::failing(ApiError::Unauthorized);
    let modal = editor(&api);
    modal.set_content("Hello").unwrap();

    let err = modal.save(SaveAction::Draft).await.expect_err("unauthorized");
    assert!(matches!(err, ModalError::Unauthorized));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn edit_session_updates_and_signals_completion() {
    let api = Arc::new(StubApi::default());
    let saved_ids = Arc::new(Mutex::new(Vec::new()));
    let recorder = saved_ids.clone();
    let modal = editor(&api).on_saved(move |post| {
        recorder.lock().unwrap().push(post.id.clone());
    });

    let existing = Post {
        id: PostId::from("p-7"),
        title: Some("Launch".into()),
        content: "Product Launch Day".into(),
        kind: PostType::Text,
        hashtags: vec!["#launch".into()],
        status: PostStatus::Scheduled,
        scheduled_for: Some(datetime!(2024-06-01 09:00 UTC)),
        published_at: None,
        engagement: None,
    };
    modal.load_from_post(Some(&existing)).unwrap();
    modal.set_content("Product Launch Day, updated").unwrap();

    let post = modal.save(SaveAction::Schedule).await.expect("updated");
    assert_eq!(post.id, PostId::from("p-7"));
    assert_eq!(api.update_calls.load(Ordering::SeqCst), 1);
    assert_eq!(api.create_calls.load(Ordering::SeqCst), 0);

    let sent = api.last_write.lock().unwrap().clone().expect("request recorded");
    assert_eq!(sent.hashtags, vec!["#launch"]);
    assert_eq!(sent.scheduled_for, existing.scheduled_for);

    modal.set_scheduled_for("").unwrap();
    let draft = modal.save(SaveAction::Draft).await.expect("unscheduled");
    assert_eq!(draft.status, PostStatus::Draft);
    assert_eq!(draft.scheduled_for, None);
    assert_eq!(saved_ids.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn created_post_is_updated_on_the_next_save() {
    let api = Arc::new(StubApi::default());
    let modal = editor(&api);
    modal.set_content("Hello").unwrap();

    modal.save(SaveAction::Draft).await.expect("created");
    assert_eq!(modal.editing(), Some(PostId::from("created-1")));

    modal.save(SaveAction::PublishNow).await.expect("published");
    assert_eq!(api.create_calls.load(Ordering::SeqCst), 1);
    assert_eq!(api.update_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn cancelled_save_releases_the_editor() {
    let api = StubApi::gated();
    let modal = editor(&api);
    modal.set_title("Launch").unwrap();
    modal.set_content("Hello").unwrap();

    let cancelled =
        tokio::time::timeout(Duration::from_millis(50), modal.save(SaveAction::Draft)).await;
    assert!(cancelled.is_err());
    assert!(!modal.is_busy());
    assert!(modal.can_save());
    assert_eq!(modal.draft().content, "Hello");

    api.gated.store(false, Ordering::SeqCst);
    modal.generate(None, None).await.expect("editor accepts new work");
    let saved = modal.save(SaveAction::Draft).await.expect("retry succeeds");
    assert_eq!(saved.content, "All about Launch");
}

#[tokio::test]
async fn cancelled_generation_releases_the_editor() {
    let api = StubApi::gated();
    let modal = editor(&api);
    modal.set_content("Hello").unwrap();

    let cancelled =
        tokio::time::timeout(Duration::from_millis(50), modal.generate(Some("t"), None)).await;
    assert!(cancelled.is_err());
    assert!(!modal.is_generating());

    modal.load_from_post(None).expect("reload after cancel");
    assert_eq!(modal.draft().content, "");
}
