use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, Wrap},
};
use throbber_widgets_tui::{BRAILLE_SIX, Throbber, WhichUse};

use crate::app::App;
use crate::form::{FormField, SecretForm};
use crate::i18n::{I18nKey, t};
use crate::model::{AppScreen, Element, FormMode, PendingDelete};

/// Widest the microagent hint text may grow, in columns.
const DEFAULT_PANEL_MAX_WIDTH: u16 = 57;

/// Draw router
pub fn draw_ui(f: &mut Frame<'_>, app: &mut App) {
    let area = f.area();
    let outer_block = Block::default()
        .borders(Borders::ALL)
        .title(tab_title(app.screen));
    let inner = outer_block.inner(area);
    f.render_widget(outer_block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(4),
            Constraint::Length(3),
        ])
        .split(inner);

    draw_header(f, app, chunks[0]);
    match app.screen {
        AppScreen::Secrets => draw_secrets_screen(f, app, chunks[1]),
        AppScreen::Microagents => draw_microagent_default(f, chunks[1]),
    }
    draw_footer(f, app, chunks[2]);
}

fn tab_title(screen: AppScreen) -> Line<'static> {
    let active = Style::default()
        .fg(Color::Cyan)
        .add_modifier(Modifier::BOLD);
    let inactive = Style::default().fg(Color::DarkGray);
    let (secrets, microagents) = match screen {
        AppScreen::Secrets => (active, inactive),
        AppScreen::Microagents => (inactive, active),
    };
    Line::from(vec![
        Span::raw(" "),
        Span::styled(t(I18nKey::SecretsTitle), secrets),
        Span::raw(" | "),
        Span::styled(t(I18nKey::MicroagentsTitle), microagents),
        Span::raw(" "),
    ])
}

fn draw_header(f: &mut Frame<'_>, app: &App, area: Rect) {
    let text = if app.search_mode {
        format!("Search: {}_", app.search_query)
    } else if !app.search_query.is_empty() {
        format!("Filter: {} [/: change] [Esc: quit]", app.search_query)
    } else {
        match app.screen {
            AppScreen::Secrets => "[q: quit] [Tab: microagents] [a: add] [e: edit] [d: delete] [/: search] [r: refresh]".to_string(),
            AppScreen::Microagents => "[q: quit] [Tab: secrets]".to_string(),
        }
    };
    let header = Paragraph::new(text)
        .style(Style::default().fg(Color::Cyan))
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(header, area);
}

fn draw_footer(f: &mut Frame<'_>, app: &mut App, area: Rect) {
    let footer = Paragraph::new(app.message.clone().unwrap_or_default())
        .style(Style::default().fg(Color::Cyan))
        .block(Block::default().borders(Borders::ALL).title("Message"));
    f.render_widget(footer, area);

    if app.is_busy() {
        let throbber = Throbber::default()
            .label(" Working...")
            .style(Style::default().fg(Color::Yellow))
            .throbber_set(BRAILLE_SIX)
            .use_type(WhichUse::Spin);
        let width = 14.min(area.width.saturating_sub(2));
        let spinner_area = Rect {
            x: area.right().saturating_sub(width + 1),
            y: area.y + 1,
            width,
            height: 1.min(area.height),
        };
        f.render_stateful_widget(throbber, spinner_area, &mut app.throbber_state);
    }
}

/// Static hint shown when no microagent is configured.
pub fn draw_microagent_default(f: &mut Frame<'_>, area: Rect) {
    let width = DEFAULT_PANEL_MAX_WIDTH.min(area.width);
    let hint = t(I18nKey::CanLearnAboutRepositories);
    let rows = Layout::vertical([
        Constraint::Fill(1),
        Constraint::Length(2),
        Constraint::Length(wrapped_line_count(hint, width)),
        Constraint::Fill(1),
    ])
    .split(area);
    let [_, column, _] = Layout::horizontal([
        Constraint::Fill(1),
        Constraint::Length(width),
        Constraint::Fill(1),
    ])
    .areas(rows[2]);

    let title = Paragraph::new(t(I18nKey::ReadyToAddMicroagent))
        .alignment(Alignment::Center)
        .style(
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        );
    f.render_widget(title, rows[1]);

    let body = Paragraph::new(hint)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .style(Style::default().fg(Color::Gray));
    f.render_widget(body, column);
}

/// Lines a greedy word wrap of `text` takes at `width` columns.
fn wrapped_line_count(text: &str, width: u16) -> u16 {
    let width = usize::from(width.max(1));
    let mut lines = 0usize;
    let mut current = 0usize;
    for word in text.split_whitespace() {
        let len = word.chars().count();
        if current > 0 && current + 1 + len <= width {
            current += 1 + len;
            continue;
        }
        if current > 0 {
            lines += 1;
        }
        // words longer than the line are broken across rows
        lines += (len.max(1) - 1) / width;
        current = (len - 1) % width + 1;
    }
    if current > 0 {
        lines += 1;
    }
    u16::try_from(lines).unwrap_or(u16::MAX)
}

fn element_height(element: &Element) -> Constraint {
    match element {
        Element::SkeletonRows(n) => Constraint::Length(*n as u16),
        Element::ConnectGitButton | Element::AddSecretButton { .. } => Constraint::Length(3),
        Element::NoSecretsMessage => Constraint::Length(1),
        Element::SecretsTable => Constraint::Min(4),
        Element::SecretForm(_) => Constraint::Min(12),
        Element::ConfirmationModal => Constraint::Length(0),
    }
}

fn draw_secrets_screen(f: &mut Frame<'_>, app: &mut App, area: Rect) {
    let elements = app.elements();
    let inline: Vec<&Element> = elements
        .iter()
        .filter(|e| **e != Element::ConfirmationModal)
        .collect();
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(inline.iter().map(|e| element_height(e)))
        .split(area);

    for (element, chunk) in inline.iter().zip(chunks.iter()) {
        match element {
            Element::SkeletonRows(n) => draw_skeleton(f, *n, *chunk),
            Element::ConnectGitButton => {
                draw_button(f, t(I18nKey::ConnectGitProvider), "c", false, *chunk)
            }
            Element::NoSecretsMessage => {
                let p = Paragraph::new(t(I18nKey::NoSecretsFound))
                    .style(Style::default().fg(Color::Gray));
                f.render_widget(p, *chunk);
            }
            Element::AddSecretButton { disabled } => {
                draw_button(f, t(I18nKey::AddNewSecret), "a", *disabled, *chunk)
            }
            Element::SecretsTable => draw_secrets_table(f, app, *chunk),
            Element::SecretForm(_) => {
                if let Some(form) = app.form() {
                    draw_secret_form(f, form, *chunk);
                }
            }
            Element::ConfirmationModal => {}
        }
    }

    if elements.contains(&Element::ConfirmationModal) {
        let full = f.area();
        draw_confirmation_modal(f, &app.pending_delete, full);
    }
}

fn draw_skeleton(f: &mut Frame<'_>, rows: usize, area: Rect) {
    let bar = "░".repeat(area.width.saturating_sub(2) as usize);
    let lines: Vec<Line> = (0..rows).map(|_| Line::from(bar.clone())).collect();
    let p = Paragraph::new(lines).style(Style::default().fg(Color::DarkGray));
    f.render_widget(p, area);
}

fn draw_button(f: &mut Frame<'_>, label: &str, key: &str, disabled: bool, area: Rect) {
    let style = if disabled {
        Style::default().fg(Color::DarkGray)
    } else {
        Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD)
    };
    let width = (label.len() as u16 + key.len() as u16 + 8).min(area.width);
    let button_area = Rect { width, ..area };
    let p = Paragraph::new(format!("[{}] {}", key, label))
        .alignment(Alignment::Center)
        .style(style)
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(p, button_area);
}

fn draw_secrets_table(f: &mut Frame<'_>, app: &mut App, area: Rect) {
    let header_style = Style::default().add_modifier(Modifier::BOLD);
    let header = Row::new(vec![
        Cell::from(t(I18nKey::Name)),
        Cell::from(t(I18nKey::Description)),
        Cell::from(Line::from(t(I18nKey::Actions)).alignment(Alignment::Right)),
    ])
    .style(header_style);

    let rows: Vec<Row> = app
        .visible_secrets()
        .into_iter()
        .map(|s| {
            Row::new(vec![
                Cell::from(s.name.clone()),
                Cell::from(s.description.clone()),
                Cell::from(Line::from("e: edit  d: delete").alignment(Alignment::Right)),
            ])
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Percentage(25),
            Constraint::Percentage(50),
            Constraint::Percentage(25),
        ],
    )
    .header(header)
    .block(Block::default().borders(Borders::ALL))
    .row_highlight_style(
        Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD),
    );
    f.render_stateful_widget(table, area, &mut app.table_state);
}

fn draw_secret_form(f: &mut Frame<'_>, form: &SecretForm, area: Rect) {
    let title = match form.mode {
        FormMode::Add => t(I18nKey::AddNewSecret),
        FormMode::Edit => t(I18nKey::EditSecret),
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .title(title)
        .title_alignment(Alignment::Center);
    let inner = block.inner(area);
    f.render_widget(block, area);

    let fields = form.fields();
    let mut constraints: Vec<Constraint> = fields.iter().map(|_| Constraint::Length(3)).collect();
    constraints.push(Constraint::Length(1));
    constraints.push(Constraint::Min(1));
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints(constraints)
        .split(inner);

    for (field, chunk) in fields.iter().zip(chunks.iter()) {
        let (label, text) = match field {
            FormField::Name => (t(I18nKey::Name), form.name.clone()),
            FormField::Value => (t(I18nKey::Value), "*".repeat(form.value.chars().count())),
            FormField::Description => (t(I18nKey::Description), form.description.clone()),
        };
        let style = if *field == form.focus {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default().fg(Color::White)
        };
        let p = Paragraph::new(text)
            .style(style)
            .block(Block::default().borders(Borders::ALL).title(label));
        f.render_widget(p, *chunk);
    }

    let error_area = chunks[fields.len()];
    if let Some(error) = &form.error {
        let p = Paragraph::new(error.as_str()).style(Style::default().fg(Color::Red));
        f.render_widget(p, error_area);
    }

    let p_help = Paragraph::new(t(I18nKey::FormHelp))
        .style(Style::default().fg(Color::Gray))
        .alignment(Alignment::Center);
    f.render_widget(p_help, chunks[fields.len() + 1]);
}

fn draw_confirmation_modal(f: &mut Frame<'_>, pending: &PendingDelete, area: Rect) {
    let Some(name) = pending.target() else {
        return;
    };
    let area_confirm = centered_rect(50, 30, area);
    f.render_widget(Clear, area_confirm);
    let block = Block::default()
        .borders(Borders::ALL)
        .title("Confirm Delete")
        .style(Style::default().bg(Color::Red));
    let footer = match pending {
        PendingDelete::InFlight(_) => "Deleting...",
        _ => t(I18nKey::ConfirmHelp),
    };
    let text = format!("\n{}\n'{}'\n\n{}", t(I18nKey::ConfirmDeleteKey), name, footer);
    let p = Paragraph::new(text)
        .block(block)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: false })
        .style(
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        );
    f.render_widget(p, area_confirm);
}

/// Helper to center a rect
fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AppConfig, Secret};
    use ratatui::{Terminal, backend::TestBackend};

    fn render_lines(app: &mut App, width: u16, height: u16) -> Vec<String> {
        let backend = TestBackend::new(width, height);
        let mut terminal = Terminal::new(backend).unwrap();
        terminal.draw(|f| draw_ui(f, app)).unwrap();
        let buffer = terminal.backend().buffer();
        (0..height)
            .map(|y| (0..width).map(|x| buffer[(x, y)].symbol()).collect())
            .collect()
    }

    fn render(app: &mut App) -> String {
        render_lines(app, 120, 40).concat()
    }

    #[test]
    fn test_secrets_table_renders_rows_and_headers() {
        let mut app = App::new(String::new());
        app.on_secrets_loaded(vec![
            Secret::new("GITHUB_TOKEN", "ci"),
            Secret::new("OPENAI_KEY", "llm"),
        ]);
        let screen = render(&mut app);
        assert!(screen.contains("Actions"));
        assert!(screen.contains("GITHUB_TOKEN"));
        assert!(screen.contains("OPENAI_KEY"));
        assert!(screen.contains(t(I18nKey::AddNewSecret)));
        assert!(!screen.contains(t(I18nKey::NoSecretsFound)));
    }

    #[test]
    fn test_modal_and_connect_button() {
        let mut app = App::new(String::new());
        app.config = Some(AppConfig::from_mode_str("saas"));
        app.on_secrets_loaded(vec![Secret::new("A", "")]);
        app.request_delete("A");
        let screen = render(&mut app);
        assert!(screen.contains("Confirm Delete"));
        assert!(screen.contains(t(I18nKey::ConnectGitProvider)));
        assert!(!screen.contains(t(I18nKey::AddNewSecret)));
    }

    #[test]
    fn test_confirmed_delete_leaves_the_drawn_table() {
        let mut app = App::new(String::new());
        app.on_secrets_loaded(vec![
            Secret::new("STALE_TOKEN", ""),
            Secret::new("KEEP_TOKEN", ""),
        ]);
        assert!(render(&mut app).contains("STALE_TOKEN"));

        app.request_delete("STALE_TOKEN");
        assert_eq!(app.confirm_delete().as_deref(), Some("STALE_TOKEN"));
        let lines = render_lines(&mut app, 120, 40);
        assert!(lines.iter().any(|l| l.contains("KEEP_TOKEN")));
        // only the in-flight confirmation still names it
        for line in lines.iter().filter(|l| l.contains("STALE_TOKEN")) {
            assert!(line.contains("'STALE_TOKEN'"), "row still drawn: {}", line);
        }

        app.on_delete_settled("STALE_TOKEN", &Ok(()));
        assert!(!render(&mut app).contains("STALE_TOKEN"));
    }

    #[test]
    fn test_wrapped_line_count() {
        assert_eq!(wrapped_line_count("", 10), 0);
        assert_eq!(wrapped_line_count("one two", 7), 1);
        assert_eq!(wrapped_line_count("one two", 6), 2);
        assert_eq!(wrapped_line_count("abcdefghij", 4), 3);
    }

    #[test]
    fn test_microagent_hint_fits_narrow_terminal() {
        let mut app = App::new(String::new());
        app.screen = AppScreen::Microagents;
        let screen = render_lines(&mut app, 30, 40).concat();
        // last word of the hint survives wrapping
        assert!(screen.contains("microagent."));
    }

    #[test]
    fn test_microagent_panel_is_centered_text() {
        let mut app = App::new(String::new());
        app.screen = AppScreen::Microagents;
        let screen = render(&mut app);
        assert!(screen.contains(t(I18nKey::ReadyToAddMicroagent)));
        assert!(screen.contains("The agent can learn"));
    }
}
