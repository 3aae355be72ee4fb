use super::app::{App, AppEvent};
use super::theme::Theme;
use crate::fingerprint::format_technologies;
use crate::scan::events::EventReceiver;
use crossterm::{
    event::{self, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame, Terminal,
};
use std::io;
use std::time::Duration;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

const HELP: &str = "\
CONTROLS:
  s          Start the scan
  p          Pause/Resume the scan
  r          Restart the scan
  t          Toggle detected technologies
  h          Toggle this help
  q/Ctrl+C   Quit
  Up/k       Scroll up in results
  Down/j     Scroll down in results

FILTERS:
  1          Show only 2xx responses
  2          Show only 3xx responses
  3          Show only 4xx responses
  4          Show only 5xx responses
  5          Show all responses

STATUS COLOURS:
  Green 2xx   Yellow 3xx   Magenta 4xx   Red 5xx

Press 'h' again to return to the main view.";

/// Interactive terminal front end. Returns once the user quits.
pub async fn run(app: &mut App, theme: &Theme, mut events: EventReceiver) -> io::Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    let outcome = event_loop(&mut terminal, app, theme, &mut events).await;

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    outcome
}

async fn event_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    theme: &Theme,
    events: &mut EventReceiver,
) -> io::Result<()> {
    let size = terminal.size()?;
    app.handle_event(AppEvent::Resize(size.width, size.height));

    while !app.should_quit() {
        terminal.draw(|f| draw(f, app, theme))?;

        if event::poll(POLL_INTERVAL)? {
            match event::read()? {
                Event::Key(key) => app.handle_event(AppEvent::Key(key)),
                Event::Resize(width, height) => app.handle_event(AppEvent::Resize(width, height)),
                _ => {}
            }
        }

        while let Ok(event) = events.try_recv() {
            app.handle_event(AppEvent::Scan(event));
        }
        app.handle_event(AppEvent::Tick);

        // let spawned scan tasks make progress between frames
        tokio::task::yield_now().await;
    }

    Ok(())
}

fn draw(f: &mut Frame, app: &App, theme: &Theme) {
    let config_rows = if app.plane().config().recursive { 6 } else { 5 };
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(config_rows + 2),
            Constraint::Length(6),
            Constraint::Min(7),
            Constraint::Length(3),
        ])
        .split(f.area());

    draw_config(f, app, theme, chunks[0]);
    draw_progress(f, app, theme, chunks[1]);
    if app.show_help() {
        draw_help(f, theme, chunks[2]);
    } else if app.show_tech() {
        draw_technologies(f, app, theme, chunks[2]);
    } else {
        draw_results(f, app, theme, chunks[2]);
    }
    draw_controls(f, app, theme, chunks[3]);
}

fn draw_config(f: &mut Frame, app: &App, theme: &Theme, area: Rect) {
    let config = app.plane().config();
    let mut rows = vec![
        ("Target", config.target.clone()),
        ("Wordlist", config.wordlist.display().to_string()),
        ("Threads", config.threads.to_string()),
        ("Method", config.method.clone()),
        ("Status Codes", config.status_codes_display()),
    ];
    if config.recursive {
        rows.push(("Max Depth", config.max_depth.to_string()));
    }

    let lines: Vec<Line> = rows
        .into_iter()
        .map(|(label, value)| {
            Line::from(vec![
                Span::styled(format!("{:<12} : ", label), theme.header),
                Span::styled(value, theme.info),
            ])
        })
        .collect();

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(theme.border)
        .title(Span::styled(" dircrawler ", theme.header));
    f.render_widget(Paragraph::new(lines).block(block), area);
}

fn draw_progress(f: &mut Frame, app: &App, theme: &Theme, area: Rect) {
    let stats = app.stats();
    let status = app.state().label();
    let elapsed = if stats.elapsed.is_empty() { "00:00:00" } else { &stats.elapsed };

    let mut lines = vec![Line::from(Span::styled(
        format!(
            "[{}] Elapsed: {} | Found: {} | RPS: {:.2} | Processed: {}",
            status, elapsed, stats.found_count, stats.requests_per_second, stats.processed_count
        ),
        theme.progress,
    ))];
    if !stats.current_path.is_empty() {
        lines.push(Line::from(Span::styled(
            format!("[>] Current: {}", stats.current_path),
            theme.info,
        )));
    }
    if stats.recursion_active {
        lines.push(Line::from(Span::styled(
            format!("[~] Recursion: {} additional directories", stats.recursion_count),
            theme.info,
        )));
    }
    if let Some(notice) = app.notice() {
        lines.push(Line::from(Span::styled(notice.to_string(), theme.error)));
    }

    let block = Block::default().borders(Borders::ALL).border_style(theme.border);
    f.render_widget(Paragraph::new(lines).block(block), area);
}

fn draw_results(f: &mut Frame, app: &App, theme: &Theme, area: Rect) {
    let filtered = app.filtered_results();
    let rows = app.visible_rows().min(area.height.saturating_sub(2) as usize).max(1);
    let start = app.scroll().min(filtered.len());
    let end = (start + rows).min(filtered.len());

    let mut lines: Vec<Line> = filtered[start..end]
        .iter()
        .map(|result| Line::from(Span::styled(format!("  {}", result), theme.status(result.status))))
        .collect();
    if lines.is_empty() {
        lines.push(Line::from(Span::styled("No results yet...", theme.info)));
    }

    let mut title = match app.status_filter() {
        Some(class) => format!(" Results ({}xx only) ", class),
        None => " Results ".to_string(),
    };
    if filtered.len() > rows {
        title.push_str(&format!("- showing {}-{} of {} ", start + 1, end, filtered.len()));
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(theme.border)
        .title(Span::styled(title, theme.header));
    f.render_widget(Paragraph::new(lines).block(block), area);
}

fn draw_technologies(f: &mut Frame, app: &App, theme: &Theme, area: Rect) {
    let lines: Vec<Line> = match app.technologies() {
        None if app.plane().config().tech_detect => {
            vec![Line::from(Span::styled("Detection runs when the scan is paused or completes", theme.info))]
        }
        None => vec![Line::from(Span::styled("Technology detection disabled (use -T)", theme.info))],
        Some(found) if found.is_empty() => vec![Line::from(Span::styled("No technologies detected", theme.info))],
        Some(found) => found
            .iter()
            .map(|(name, version)| {
                Line::from(vec![
                    Span::styled(format!("  {}", name), theme.success),
                    Span::styled(
                        version.as_deref().map(|v| format!(" v{}", v)).unwrap_or_default(),
                        theme.info,
                    ),
                ])
            })
            .collect(),
    };

    let title = match app.technologies() {
        Some(found) if !found.is_empty() => format!(" Technologies: {} ", format_technologies(found)),
        _ => " Technologies ".to_string(),
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(theme.border)
        .title(Span::styled(title, theme.header));
    f.render_widget(Paragraph::new(lines).block(block).wrap(Wrap { trim: false }), area);
}

fn draw_help(f: &mut Frame, theme: &Theme, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(theme.border)
        .title(Span::styled(" Help ", theme.header));
    f.render_widget(Paragraph::new(HELP).style(theme.info).block(block), area);
}

fn draw_controls(f: &mut Frame, app: &App, theme: &Theme, area: Rect) {
    let mut controls = vec!["s: Start", "p: Pause/Resume", "r: Restart", "t: Tech", "h: Help", "q: Quit"];
    if !app.results().is_empty() {
        controls.extend(["Up/Down: Scroll", "1-5: Filter by status"]);
    }
    let block = Block::default().borders(Borders::ALL).border_style(theme.border);
    f.render_widget(
        Paragraph::new(Span::styled(controls.join(" | "), theme.info)).block(block),
        area,
    );
}
