use anyhow::{Context, Result};
use crossterm::{
    event::{Event, EventStream, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use futures::StreamExt;
use ratatui::{
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
    Frame, Terminal,
};
use std::io;
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver};

use crate::controller::{
    ImageState, ListEntry, Message, SearchController, SubmitOutcome, IMAGE_UNAVAILABLE,
};
use crate::fetcher::PhotoService;
use crate::image_view::ImageView;

/// Runs the interactive photo browser until the user quits.
/// When `initial_tags` is given a search for them starts right away.
pub async fn run_viewer(service: Arc<dyn PhotoService>, initial_tags: Option<String>) -> Result<()> {
    // Setup terminal
    enable_raw_mode().context("Failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let (tx, rx) = mpsc::unbounded_channel();
    let mut app = ViewerApp::new(SearchController::new(service, tx));
    if let Some(tags) = initial_tags {
        app.input = tags;
        app.submit();
    }

    let res = run_app(&mut terminal, &mut app, rx).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    res
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Focus {
    Input,
    List,
}

struct ViewerApp {
    controller: SearchController,
    input: String,
    focus: Focus,
    list_state: ListState,
    should_quit: bool,
}

impl ViewerApp {
    fn new(controller: SearchController) -> Self {
        Self {
            controller,
            input: String::new(),
            focus: Focus::Input,
            list_state: ListState::default(),
            should_quit: false,
        }
    }

    fn submit(&mut self) {
        if self.controller.submit_search(&self.input) == SubmitOutcome::Started {
            self.list_state.select(None);
            self.focus = Focus::List;
        }
    }

    fn on_key(&mut self, key: KeyEvent) {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.should_quit = true;
            return;
        }

        // Modal error box swallows one key, ahead of the cancel prompt
        if self.controller.notification().is_some() {
            self.controller.dismiss_notification();
            return;
        }

        if self.controller.awaiting_confirmation().is_some() {
            let answer = match key.code {
                KeyCode::Char('y') | KeyCode::Char('Y') => true,
                KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => false,
                _ => return,
            };
            if let Ok(SubmitOutcome::Started) = self.controller.resolve_confirmation(answer) {
                self.list_state.select(None);
                self.focus = Focus::List;
            }
            return;
        }

        match self.focus {
            Focus::Input => match key.code {
                KeyCode::Enter => self.submit(),
                KeyCode::Char(c) => self.input.push(c),
                KeyCode::Backspace => {
                    self.input.pop();
                }
                KeyCode::Tab | KeyCode::Esc => self.focus = Focus::List,
                _ => {}
            },
            Focus::List => match key.code {
                KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
                KeyCode::Tab | KeyCode::Char('/') => self.focus = Focus::Input,
                KeyCode::Char('j') | KeyCode::Down => self.move_selection(1),
                KeyCode::Char('k') | KeyCode::Up => self.move_selection(-1),
                KeyCode::Char('g') | KeyCode::Home => self.select(0),
                KeyCode::Char('G') | KeyCode::End => self.select(usize::MAX),
                _ => {}
            },
        }
    }

    fn move_selection(&mut self, delta: isize) {
        let target = match self.controller.selected() {
            Some(current) => current.saturating_add_signed(delta),
            None => 0,
        };
        self.select(target);
    }

    /// Selects `index`, clamped to the result list. Only a change of
    /// selection triggers a fetch.
    fn select(&mut self, index: usize) {
        let Some(len) = self.controller.result().map(|r| r.len()) else {
            return;
        };
        if len == 0 {
            return;
        }
        let index = index.min(len - 1);
        if self.controller.selected() == Some(index) {
            return;
        }
        if self.controller.select_photo(index).is_ok() {
            self.list_state.select(Some(index));
        }
    }
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut ViewerApp,
    mut rx: UnboundedReceiver<Message>,
) -> Result<()> {
    let mut events = EventStream::new();

    loop {
        terminal.draw(|f| ui(f, app))?;

        tokio::select! {
            event = events.next() => match event {
                Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => app.on_key(key),
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(e).context("Failed to read terminal event"),
                None => return Ok(()),
            },
            Some(message) = rx.recv() => app.controller.handle(message),
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

fn ui(f: &mut Frame, app: &mut ViewerApp) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Tag input
            Constraint::Min(6),    // Results and image
            Constraint::Length(3), // Footer
        ])
        .split(f.size());

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(chunks[1]);

    render_input(f, chunks[0], app);
    render_results(f, body[0], app);
    render_image(f, body[1], app);
    render_footer(f, chunks[2]);

    // Same precedence as on_key: the error box sits above the cancel prompt
    if let Some(notification) = app.controller.notification() {
        let text = vec![
            Line::from(notification.message.clone()),
            Line::from(""),
            Line::from(Span::styled(
                "Press any key",
                Style::default().fg(Color::DarkGray),
            )),
        ];
        render_modal(f, &format!(" {} ", notification.title), text, Color::Red);
    } else if let Some(query) = app.controller.awaiting_confirmation() {
        let text = vec![
            Line::from("Cancel the current Flickr search?"),
            Line::from(Span::styled(
                format!("New tags: {}", query.as_str()),
                Style::default().fg(Color::Yellow),
            )),
            Line::from(""),
            Line::from(" y  Yes    n  No "),
        ];
        render_modal(f, " Are you sure? ", text, Color::Cyan);
    }
}

fn border_style(active: bool) -> Style {
    if active {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default().fg(Color::Blue)
    }
}

fn render_input(f: &mut Frame, area: Rect, app: &ViewerApp) {
    let focused = app.focus == Focus::Input;
    let input = Paragraph::new(app.input.as_str()).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(border_style(focused))
            .title(" Tags (space separated) "),
    );
    f.render_widget(input, area);

    if focused {
        let cursor_x = area.x + 1 + app.input.chars().count() as u16;
        f.set_cursor(cursor_x.min(area.right().saturating_sub(2)), area.y + 1);
    }
}

fn render_results(f: &mut Frame, area: Rect, app: &mut ViewerApp) {
    let entries = app.controller.list_entries();
    let title = match app.controller.result() {
        Some(result) => format!(" Results ({}) ", result.len()),
        None => " Results ".to_string(),
    };

    let items: Vec<ListItem> = entries
        .iter()
        .map(|entry| match entry {
            ListEntry::Placeholder(text) => ListItem::new(Span::styled(
                *text,
                Style::default()
                    .fg(Color::DarkGray)
                    .add_modifier(Modifier::ITALIC),
            )),
            ListEntry::Photo(record) => ListItem::new(record.display_title()),
        })
        .collect();

    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(border_style(app.focus == Focus::List))
                .title(title),
        )
        .highlight_style(
            Style::default()
                .fg(Color::Black)
                .bg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        );

    f.render_stateful_widget(list, area, &mut app.list_state);
}

fn render_image(f: &mut Frame, area: Rect, app: &ViewerApp) {
    let title = match (app.controller.selected(), app.controller.result()) {
        (Some(index), Some(result)) => result
            .get(index)
            .map(|r| format!(" {} ", r.image_url()))
            .unwrap_or_default(),
        _ => " Photo ".to_string(),
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Gray))
        .title(title)
        .title_alignment(Alignment::Right);
    let inner = block.inner(area);
    f.render_widget(block, area);

    let placeholder = |text: String| {
        Paragraph::new(text)
            .style(Style::default().fg(Color::DarkGray))
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true })
    };

    match app.controller.image() {
        ImageState::Blank => {}
        ImageState::Loading { .. } => f.render_widget(placeholder("Loading image...".to_string()), inner),
        ImageState::Ready { image, .. } => f.render_widget(ImageView::new(image), inner),
        ImageState::Unavailable { reason, .. } => {
            f.render_widget(placeholder(format!("{}\n\n{}", IMAGE_UNAVAILABLE, reason)), inner)
        }
    }
}

fn render_footer(f: &mut Frame, area: Rect) {
    let key = |k: &'static str| Span::styled(k, Style::default().bg(Color::DarkGray).fg(Color::White));
    let footer_text = Line::from(vec![
        key(" Enter "),
        Span::raw(" Search  "),
        key(" Tab "),
        Span::raw(" Switch focus  "),
        key(" j/k "),
        Span::raw(" Select photo  "),
        key(" q "),
        Span::raw(" Quit  "),
    ]);

    let footer = Paragraph::new(footer_text)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Blue)),
        )
        .alignment(Alignment::Center);

    f.render_widget(footer, area);
}

fn render_modal(f: &mut Frame, title: &str, text: Vec<Line>, color: Color) {
    let area = centered_rect(50, 7, f.size());
    let modal = Paragraph::new(text)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(color))
                .title(title.to_string())
                .title_alignment(Alignment::Center),
        )
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true });

    f.render_widget(Clear, area);
    f.render_widget(modal, area);
}

fn centered_rect(percent_x: u16, height: u16, r: Rect) -> Rect {
    let width = (u32::from(r.width) * u32::from(percent_x) / 100) as u16;
    let height = height.min(r.height);
    Rect {
        x: r.x + (r.width - width) / 2,
        y: r.y + (r.height - height) / 2,
        width,
        height,
    }
}
