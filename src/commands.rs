use std::fs;

use postboard::{
    api_types::{PostId, PostStatus},
    application::{
        board::{ContentBoard, ViewMode},
        calendar::parse_month_key,
        error::AppError,
        filter::{FilterState, StatusFilter},
        modal::{ModalController, SaveAction},
    },
    config::{CalendarArgs, EditArgs, EditPostArgs, ListArgs},
    infra::error::InfraError,
};
use tracing::{info, instrument};

use crate::print;

#[instrument(skip_all)]
pub async fn calendar(board: &mut ContentBoard, args: CalendarArgs) -> Result<(), AppError> {
    if let Some(month) = args.month.as_deref() {
        board.select_date(parse_month_key(month)?);
    }
    board.set_view(ViewMode::Calendar);
    board.set_filter(FilterState::new(
        StatusFilter::All,
        args.search.unwrap_or_default(),
    ));
    board.refresh().await?;

    print!("{}", print::render_calendar(&board.grid())?);
    Ok(())
}

#[instrument(skip_all)]
pub async fn list(board: &mut ContentBoard, args: ListArgs) -> Result<(), AppError> {
    board.set_view(ViewMode::List);
    board.set_filter(FilterState::new(
        args.status.into(),
        args.search.unwrap_or_default(),
    ));
    board.refresh().await?;

    let text = print::render_list(
        &board.list(),
        board.status_counts(),
        board.filter(),
        board.timezone(),
    )?;
    print!("{text}");
    Ok(())
}

#[instrument(skip_all)]
pub async fn create(board: &ContentBoard, args: EditArgs) -> Result<(), AppError> {
    let editor = board.open_editor(None);
    let action = prepare(&editor, &args, None).await?;
    let saved = editor.save(action).await?;
    info!(post_id = %saved.id, "post created");
    print::print_json(&saved)
}

#[instrument(skip_all, fields(post_id = %args.id))]
pub async fn edit(board: &mut ContentBoard, args: EditPostArgs) -> Result<(), AppError> {
    board.refresh().await?;
    let id = PostId::new(args.id);
    let current = board
        .find(&id)
        .cloned()
        .ok_or_else(|| AppError::not_found(id.as_str()))?;

    let editor = board.open_editor(Some(&current));
    let action = prepare(&editor, &args.edit, Some(current.status)).await?;
    let saved = editor.save(action).await?;
    info!(post_id = %saved.id, "post updated");
    print::print_json(&saved)
}

/// Copy the requested edits into the draft, generate if asked, and decide how
/// the draft will be saved.
async fn prepare(
    editor: &ModalController,
    args: &EditArgs,
    current: Option<PostStatus>,
) -> Result<SaveAction, AppError> {
    if let Some(title) = args.title.as_ref() {
        editor.set_title(title.clone())?;
    }
    if let Some(kind) = args.kind {
        editor.set_kind(kind.into())?;
    }
    if let Some(topic) = args.generate.as_deref() {
        let topic = Some(topic.trim()).filter(|topic| !topic.is_empty());
        editor.generate(topic, None).await?;
    }
    if let Some(content) = read_content(args)? {
        editor.set_content(content)?;
    }
    if let Some(hashtags) = args.hashtags.as_ref() {
        editor.set_hashtags(hashtags.clone())?;
    }
    if let Some(schedule) = args.schedule.as_ref() {
        editor.set_scheduled_for(schedule.clone())?;
    }
    if args.clear_schedule {
        editor.set_scheduled_for(String::new())?;
    }

    Ok(choose_action(editor, args, current))
}

fn choose_action(
    editor: &ModalController,
    args: &EditArgs,
    current: Option<PostStatus>,
) -> SaveAction {
    if args.publish_now {
        return SaveAction::PublishNow;
    }
    if args.clear_schedule {
        return SaveAction::Draft;
    }
    match (current, args.schedule.is_some()) {
        // A published post keeps its status unless explicitly rescheduled.
        (Some(PostStatus::Published), false) => SaveAction::PublishNow,
        _ => editor.default_action(),
    }
}

fn read_content(args: &EditArgs) -> Result<Option<String>, AppError> {
    if let Some(path) = args.content_file.as_ref() {
        let data =
            fs::read_to_string(path).map_err(|err| InfraError::content_file(path, err))?;
        return Ok(Some(data));
    }
    Ok(args.content.clone())
}

