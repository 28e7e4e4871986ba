use std::fmt::{self, Write as _};

use chrono_tz::Tz;
use postboard::{
    api_types::{Post, PostStatus},
    application::{
        calendar::CalendarGrid,
        error::AppError,
        filter::{FilterState, StatusCounts, StatusFilter},
    },
    domain::posts::{display_label, effective_date, list_title},
    util::timezone::format_local_input,
};
use serde::Serialize;

const CELL_WIDTH: usize = 6;

pub fn print_json<T: Serialize>(value: &T) -> Result<(), AppError> {
    let out = serde_json::to_string_pretty(value)
        .map_err(|e| AppError::unexpected(format!("failed to render output: {e}")))?;
    println!("{out}");
    Ok(())
}

const PREVIEW_CHARS: usize = 80;

/// Month grid followed by an agenda of the days that have posts.
pub fn render_calendar(grid: &CalendarGrid<'_>) -> Result<String, AppError> {
    let mut out = String::new();
    write_calendar(&mut out, grid).map_err(render_failed)?;
    Ok(out)
}

/// Tab bar with counts, then one entry per post.
pub fn render_list(
    posts: &[&Post],
    counts: StatusCounts,
    filter: &FilterState,
    tz: Tz,
) -> Result<String, AppError> {
    let mut out = String::new();
    write_list(&mut out, posts, counts, filter, tz).map_err(render_failed)?;
    Ok(out)
}

fn render_failed(err: fmt::Error) -> AppError {
    AppError::unexpected(format!("failed to render output: {err}"))
}

fn write_calendar(out: &mut String, grid: &CalendarGrid<'_>) -> fmt::Result {
    writeln!(out, "{}", grid.label())?;
    for header in grid.weekday_headers() {
        write!(out, "{header:>CELL_WIDTH$}")?;
    }
    out.push('\n');

    for week in &grid.weeks {
        for cell in &week.days {
            let day = if cell.in_month {
                cell.date.day().to_string()
            } else {
                String::from(".")
            };
            let marker = if cell.total() > 0 { "*" } else { "" };
            write!(out, "{:>CELL_WIDTH$}", format!("{day}{marker}"))?;
        }
        out.push('\n');
    }

    for cell in grid.days().filter(|cell| cell.total() > 0) {
        writeln!(out, "\n{}", cell.key())?;
        for post in &cell.visible {
            writeln!(
                out,
                "  [{}] {} ({})",
                post.status,
                display_label(post),
                post.kind.label()
            )?;
        }
        if let Some(more) = cell.overflow_label() {
            writeln!(out, "  {more}")?;
        }
    }
    Ok(())
}

fn write_list(
    out: &mut String,
    posts: &[&Post],
    counts: StatusCounts,
    filter: &FilterState,
    tz: Tz,
) -> fmt::Result {
    let tabs: Vec<String> = StatusFilter::TABS
        .into_iter()
        .map(|tab| {
            let label = format!("{} ({})", tab.label(), counts.get(tab));
            if tab == filter.status() {
                format!("[{label}]")
            } else {
                label
            }
        })
        .collect();
    writeln!(out, "{}", tabs.join("  "))?;
    if !filter.query().is_empty() {
        writeln!(out, "search: {}", filter.query())?;
    }

    if posts.is_empty() {
        out.push_str("no posts match\n");
        return Ok(());
    }

    for post in posts {
        let when = effective_date(post)
            .map(|at| format_local_input(at, tz).replace('T', " "))
            .unwrap_or_else(|| String::from("-"));
        writeln!(
            out,
            "{id}\t{status}\t{when}\t{title}",
            id = post.id,
            status = post.status,
            title = list_title(post),
        )?;
        writeln!(out, "    {}", preview(&post.content))?;
        if post.status == PostStatus::Published {
            let stats = post.engagement.clone().unwrap_or_default();
            writeln!(
                out,
                "    impressions {}  likes {}  comments {}  shares {}",
                stats.impressions, stats.likes, stats.comments, stats.shares
            )?;
        }
    }
    Ok(())
}

/// Single-line excerpt of the post body.
fn preview(content: &str) -> String {
    let flat = content.split_whitespace().collect::<Vec<_>>().join(" ");
    let mut chars = flat.chars();
    let head: String = chars.by_ref().take(PREVIEW_CHARS).collect();
    if chars.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}
