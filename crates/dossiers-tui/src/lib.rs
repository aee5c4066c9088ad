// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use crossterm::{execute, terminal};
use dossiers_app::{
    AppCommand, AppEvent, DatasetSummary, MissionSnapshot, MonthlyRates, Page, Session, Trigger,
    month_label_fr,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::symbols::Marker;
use ratatui::text::{Line, Span};
use ratatui::widgets::{
    Axis, Block, Borders, Chart, Clear, Dataset, GraphType, Paragraph, Wrap,
};
use std::io;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;

const DASHBOARD_TITLE: &str = "TABLEAU DE BORD DE SUIVI DES DOSSIERS";
const DASHBOARD_SUBTITLE: &str = "Inspection Générale des Finances : état d'avancement des dossiers en cours";
const COMPLETION_SERIES: &str = "taux de réalisation";
const ON_TIME_SERIES: &str = "taux de respect des délais";
const FOCUS_MARK: &str = "›";

/// Everything the router needs from the outside world.
pub trait AppRuntime {
    fn load_dataset_summary(&mut self) -> Result<DatasetSummary>;
    fn load_mission_snapshot(&mut self) -> Result<MissionSnapshot>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UiOptions {
    pub status_clear: Duration,
}

impl Default for UiOptions {
    fn default() -> Self {
        Self {
            status_clear: Duration::from_secs(4),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InternalEvent {
    ClearStatus { token: u64 },
}

/// Render-only state. Nothing here survives a page change except the
/// cached loads and the status token.
#[derive(Debug, Clone, PartialEq)]
struct ViewData {
    focus: usize,
    help_visible: bool,
    dataset: Option<DatasetSummary>,
    missions: Option<MissionSnapshot>,
    status_token: u64,
    status_clear: Duration,
}

impl ViewData {
    fn new(options: UiOptions) -> Self {
        Self {
            focus: 0,
            help_visible: false,
            dataset: None,
            missions: None,
            status_token: 0,
            status_clear: options.status_clear,
        }
    }
}

pub fn run_app<R: AppRuntime>(
    session: &mut Session,
    runtime: &mut R,
    options: UiOptions,
) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, terminal::EnterAlternateScreen).context("enter alternate screen")?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;

    let mut view_data = ViewData::new(options);
    let (internal_tx, internal_rx) = mpsc::channel();

    initial_refresh(session, runtime, &mut view_data, &internal_tx);

    let mut result = Ok(());
    loop {
        process_internal_events(session, &view_data, &internal_rx);

        if let Err(error) = terminal.draw(|frame| render(frame, session, &view_data)) {
            result = Err(error).context("draw frame");
            break;
        }

        let has_event = match event::poll(Duration::from_millis(120)).context("poll event") {
            Ok(has_event) => has_event,
            Err(error) => {
                result = Err(error);
                break;
            }
        };
        if has_event {
            match event::read().context("read event") {
                Ok(Event::Key(key)) => {
                    if handle_key_event(session, runtime, &mut view_data, &internal_tx, key) {
                        break;
                    }
                }
                Ok(_) => {}
                Err(error) => {
                    result = Err(error);
                    break;
                }
            }
        }
    }

    disable_raw_mode().context("disable raw mode")?;
    execute!(io::stdout(), terminal::LeaveAlternateScreen).context("leave alternate screen")?;
    result
}

fn initial_refresh<R: AppRuntime>(
    session: &mut Session,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
) {
    if let Err(error) = refresh_view_data(session, runtime, view_data) {
        tracing::warn!(page = ?session.page, error = %error, "initial page data load failed");
        emit_status(session, view_data, internal_tx, format!("load failed: {error}"));
    }
}

fn process_internal_events(
    session: &mut Session,
    view_data: &ViewData,
    rx: &Receiver<InternalEvent>,
) {
    while let Ok(event) = rx.try_recv() {
        match event {
            InternalEvent::ClearStatus { token } if token == view_data.status_token => {
                session.dispatch(AppCommand::ClearStatus);
            }
            InternalEvent::ClearStatus { .. } => {}
        }
    }
}

fn schedule_status_clear(internal_tx: &Sender<InternalEvent>, token: u64, delay: Duration) {
    let sender = internal_tx.clone();
    thread::spawn(move || {
        thread::sleep(delay);
        let _ = sender.send(InternalEvent::ClearStatus { token });
    });
}

fn emit_status(
    session: &mut Session,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    message: impl Into<String>,
) {
    session.dispatch(AppCommand::SetStatus(message.into()));
    view_data.status_token = view_data.status_token.saturating_add(1);
    schedule_status_clear(internal_tx, view_data.status_token, view_data.status_clear);
}

/// Returns true when the loop should exit.
fn handle_key_event<R: AppRuntime>(
    session: &mut Session,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) -> bool {
    if key.modifiers.contains(KeyModifiers::CONTROL)
        && matches!(key.code, KeyCode::Char('q') | KeyCode::Char('c'))
    {
        return true;
    }

    if view_data.help_visible {
        if matches!(key.code, KeyCode::Esc | KeyCode::Char('?')) {
            view_data.help_visible = false;
        }
        return false;
    }

    match key.code {
        KeyCode::Char('q') => return true,
        KeyCode::Char('?') => view_data.help_visible = true,
        KeyCode::Up | KeyCode::Char('k') | KeyCode::BackTab => {
            move_focus(session.page, view_data, -1);
        }
        KeyCode::Down | KeyCode::Char('j') | KeyCode::Tab => {
            move_focus(session.page, view_data, 1);
        }
        KeyCode::Enter => {
            if let Some(trigger) = session.page.triggers().get(view_data.focus).copied() {
                fire_trigger(session, runtime, view_data, internal_tx, trigger);
            }
        }
        KeyCode::Char(digit @ '1'..='9') => {
            let index = usize::from(digit as u8 - b'1');
            match session.page.triggers().get(index).copied() {
                Some(trigger) => fire_trigger(session, runtime, view_data, internal_tx, trigger),
                None => emit_status(
                    session,
                    view_data,
                    internal_tx,
                    format!("no action {digit} on this page"),
                ),
            }
        }
        KeyCode::Esc | KeyCode::Backspace => {
            if session.page.offers(Trigger::ReturnHome) {
                fire_trigger(session, runtime, view_data, internal_tx, Trigger::ReturnHome);
            }
        }
        _ => {}
    }
    false
}

fn move_focus(page: Page, view_data: &mut ViewData, delta: isize) {
    let len = page.triggers().len() as isize;
    if len == 0 {
        view_data.focus = 0;
        return;
    }
    let current = view_data.focus.min(len as usize - 1) as isize;
    view_data.focus = (current + delta).rem_euclid(len) as usize;
}

fn fire_trigger<R: AppRuntime>(
    session: &mut Session,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    trigger: Trigger,
) {
    let events = session.dispatch(AppCommand::Trigger(trigger));
    if !should_refresh_view(&events) {
        return;
    }

    view_data.focus = 0;
    if let Err(error) = refresh_view_data(session, runtime, view_data) {
        tracing::warn!(page = ?session.page, error = %error, "page data load failed");
        emit_status(session, view_data, internal_tx, format!("load failed: {error}"));
    }
}

fn should_refresh_view(events: &[AppEvent]) -> bool {
    events
        .iter()
        .any(|event| matches!(event, AppEvent::PageChanged(_)))
}

/// Loads whatever the current page shows. Other pages keep their last
/// load so a failed refresh does not blank them.
fn refresh_view_data<R: AppRuntime>(
    session: &Session,
    runtime: &mut R,
    view_data: &mut ViewData,
) -> Result<()> {
    match session.page {
        Page::Home => {
            view_data.dataset = Some(runtime.load_dataset_summary()?);
        }
        Page::MissionAudit => {
            view_data.missions = None;
            view_data.missions = Some(runtime.load_mission_snapshot()?);
        }
        Page::MissionInspection | Page::MissionStudy => {}
    }
    Ok(())
}

fn render(frame: &mut ratatui::Frame<'_>, session: &Session, view_data: &ViewData) {
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4),
            Constraint::Min(1),
            Constraint::Length(3),
            Constraint::Length(3),
        ])
        .split(frame.area());

    let header = Paragraph::new(vec![
        Line::from(Span::styled(
            DASHBOARD_TITLE,
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(DASHBOARD_SUBTITLE),
    ])
    .block(Block::default().title("IGF").borders(Borders::ALL));
    frame.render_widget(header, layout[0]);

    match session.page {
        Page::Home => render_home(frame, layout[1], view_data),
        Page::MissionAudit => render_mission_audit(frame, layout[1], view_data),
        Page::MissionInspection | Page::MissionStudy => {
            let body = Paragraph::new(session.page.heading())
                .wrap(Wrap { trim: true })
                .block(
                    Block::default()
                        .title(session.page.label())
                        .borders(Borders::ALL),
                );
            frame.render_widget(body, layout[1]);
        }
    }

    frame.render_widget(action_bar(session.page, view_data.focus), layout[2]);

    let status_widget = Paragraph::new(status_text(session, view_data))
        .style(Style::default().fg(Color::Yellow))
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(status_widget, layout[3]);

    if view_data.help_visible {
        let area = centered_rect(70, 50, frame.area());
        frame.render_widget(Clear, area);
        let help = Paragraph::new(help_overlay_text())
            .block(Block::default().title("aide").borders(Borders::ALL));
        frame.render_widget(help, area);
    }
}

fn render_home(frame: &mut ratatui::Frame<'_>, area: Rect, view_data: &ViewData) {
    let body = Paragraph::new(render_home_text(view_data))
        .wrap(Wrap { trim: false })
        .block(
            Block::default()
                .title(Page::Home.label())
                .borders(Borders::ALL),
        );
    frame.render_widget(body, area);
}

fn render_home_text(view_data: &ViewData) -> String {
    let mut lines = vec![
        Page::Home.heading().to_owned(),
        "Bienvenue sur la page d'accueil.".to_owned(),
        String::new(),
    ];
    for (index, trigger) in Page::Home.triggers().iter().enumerate() {
        let marker = if index == view_data.focus {
            FOCUS_MARK
        } else {
            " "
        };
        lines.push(format!("{marker} {}. {}", index + 1, trigger.label()));
    }
    lines.push(String::new());
    lines.push(dataset_summary_text(view_data.dataset.as_ref()));
    lines.join("\n")
}

fn dataset_summary_text(summary: Option<&DatasetSummary>) -> String {
    match summary {
        Some(summary) => format!(
            "données PIB : {} pays, {} lignes ({}-{}), {} valeurs manquantes",
            summary.countries,
            summary.records,
            summary.year_range.min(),
            summary.year_range.max(),
            summary.missing_values,
        ),
        None => "données PIB : non chargées".to_owned(),
    }
}

fn render_mission_audit(frame: &mut ratatui::Frame<'_>, area: Rect, view_data: &ViewData) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2),
            Constraint::Length(5),
            Constraint::Min(8),
        ])
        .split(area);

    let heading = Paragraph::new(Span::styled(
        Page::MissionAudit.heading(),
        Style::default().add_modifier(Modifier::BOLD),
    ))
    .wrap(Wrap { trim: true });
    frame.render_widget(heading, rows[0]);

    let Some(snapshot) = view_data.missions.as_ref() else {
        let missing = Paragraph::new("données de suivi indisponibles")
            .style(Style::default().fg(Color::Red))
            .block(Block::default().borders(Borders::ALL));
        frame.render_widget(missing, rows[1]);
        return;
    };

    let counters = snapshot.counters.labeled();
    let cells = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(counters.map(|_| Constraint::Ratio(1, counters.len() as u32)))
        .split(rows[1]);
    for ((label, value), cell) in counters.iter().zip(cells.iter()) {
        let counter = Paragraph::new(vec![
            Line::from(Span::styled(
                value.to_string(),
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            )),
            Line::from(*label),
        ])
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL));
        frame.render_widget(counter, *cell);
    }

    let (completion, on_time) = chart_points(&snapshot.monthly);
    let datasets = vec![
        Dataset::default()
            .name(COMPLETION_SERIES)
            .marker(Marker::Braille)
            .graph_type(GraphType::Line)
            .style(Style::default().fg(Color::Cyan))
            .data(&completion),
        Dataset::default()
            .name(ON_TIME_SERIES)
            .marker(Marker::Braille)
            .graph_type(GraphType::Line)
            .style(Style::default().fg(Color::Green))
            .data(&on_time),
    ];
    let x_max = completion.len().saturating_sub(1).max(1) as f64;
    let chart = Chart::new(datasets)
        .block(
            Block::default()
                .title("taux mensuels (%)")
                .borders(Borders::ALL),
        )
        .x_axis(
            Axis::default()
                .bounds([0.0, x_max])
                .labels(month_axis_labels(&snapshot.monthly))
                .style(Style::default().fg(Color::DarkGray)),
        )
        .y_axis(
            Axis::default()
                .bounds([0.0, 100.0])
                .labels(["0", "50", "100"])
                .style(Style::default().fg(Color::DarkGray)),
        );
    frame.render_widget(chart, rows[2]);
}

type ChartSeries = Vec<(f64, f64)>;

fn chart_points(monthly: &[MonthlyRates]) -> (ChartSeries, ChartSeries) {
    monthly
        .iter()
        .enumerate()
        .map(|(index, point)| {
            let x = index as f64;
            ((x, point.completion_rate), (x, point.on_time_rate))
        })
        .unzip()
}

fn month_axis_labels(monthly: &[MonthlyRates]) -> Vec<&'static str> {
    monthly
        .iter()
        .map(|point| month_label_fr(point.month))
        .collect()
}

fn action_bar(page: Page, focus: usize) -> Paragraph<'static> {
    let mut spans = Vec::new();
    for (index, label) in action_labels(page).into_iter().enumerate() {
        if index > 0 {
            spans.push(Span::raw("   "));
        }
        let style = if index == focus {
            Style::default()
                .fg(Color::Black)
                .bg(Color::Cyan)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::Cyan)
        };
        spans.push(Span::styled(label, style));
    }
    Paragraph::new(Line::from(spans)).block(Block::default().title("actions").borders(Borders::ALL))
}

fn action_labels(page: Page) -> Vec<String> {
    page.triggers()
        .iter()
        .enumerate()
        .map(|(index, trigger)| format!("[{}] {}", index + 1, trigger.label()))
        .collect()
}

fn status_text(session: &Session, view_data: &ViewData) -> String {
    if view_data.help_visible {
        return String::new();
    }

    let back = if session.page.offers(Trigger::ReturnHome) {
        " | esc retour"
    } else {
        ""
    };
    let hints = format!("j/k choisir | enter valider | 1-9 action{back} | ? aide | q quitter");
    let page = session.page.label().to_uppercase();
    match &session.status_line {
        Some(status) => format!("{page} | {status} | {hints}"),
        None => format!("{page} | {hints}"),
    }
}

fn help_overlay_text() -> &'static str {
    "global: q or ctrl+q quit | ? help\n\
actions: j/k or up/down or tab/shift+tab move | enter activate | 1-9 activate by number\n\
pages: esc or backspace back to accueil\n\
help: esc or ? close"
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
