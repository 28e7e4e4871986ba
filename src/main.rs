use std::{process, sync::Arc};

use postboard::{
    application::{board::ContentBoard, calendar::CalendarGridBuilder, error::AppError},
    config::{self, CliArgs, Settings},
    infra::{http::HttpApiClient, session::Session, telemetry},
};
use tracing::{Dispatch, Level, dispatcher, error, info};
use tracing_subscriber::fmt as tracing_fmt;

mod commands;
mod print;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(error.exit_code());
    }
}

fn report_application_error(error: &AppError) {
    let report = error.report();
    if dispatcher::has_been_set() {
        error!(error = %error, chain = ?report.messages, "command failed");
    } else {
        let subscriber = tracing_fmt()
            .with_writer(std::io::stderr)
            .with_max_level(Level::ERROR)
            .finish();
        let dispatch = Dispatch::new(subscriber);
        dispatcher::with_default(&dispatch, || {
            error!(error = %error, chain = ?report.messages, "command failed");
        });
    }
    eprintln!("error: {error}");
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()?;
    telemetry::init(&settings.logging)?;

    let session = Arc::new(Session::new());
    if let Some(token) = config::resolve_token(&cli_args)? {
        session.sign_in(token);
    } else {
        info!("no credential configured; requests are sent unauthenticated");
    }

    let board = build_board(&settings, Arc::clone(&session))?;
    dispatch(cli_args, &settings, board).await
}

fn build_board(settings: &Settings, session: Arc<Session>) -> Result<ContentBoard, AppError> {
    let client = Arc::new(HttpApiClient::new(&settings.api, session)?);
    let grid = CalendarGridBuilder::new(settings.display.timezone)
        .with_week_start(settings.display.week_start)
        .with_visible_per_day(settings.display.visible_per_day);
    Ok(ContentBoard::new(client.clone(), client, grid))
}

async fn dispatch(
    cli_args: CliArgs,
    settings: &Settings,
    mut board: ContentBoard,
) -> Result<(), AppError> {
    info!(
        api = %settings.api.base_url,
        timezone = %settings.display.timezone,
        "postboard starting"
    );

    match cli_args.command_or_default() {
        config::Command::Calendar(args) => commands::calendar(&mut board, args).await,
        config::Command::List(args) => commands::list(&mut board, args).await,
        config::Command::Create(args) => commands::create(&board, args).await,
        config::Command::Edit(args) => commands::edit(&mut board, args).await,
    }
}
