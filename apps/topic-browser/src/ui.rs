use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Clear, Paragraph},
};
use rest_widgets::ScrollListView;

use crate::app::{App, Pane};
use crate::models::Topic;

pub fn render(frame: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(9),
            Constraint::Min(8),
            Constraint::Length(1),
        ])
        .split(frame.area());

    render_picker(frame, app, chunks[0]);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(chunks[1]);
    render_feed(frame, app, body[0]);
    render_bookmarks(frame, app, body[1]);

    render_status(frame, app, chunks[2]);

    if let Some(prompt) = &app.prompt {
        render_confirm(frame, &prompt.message);
    }
}

fn pane_block(title: String, focused: bool) -> Block<'static> {
    let color = if focused { Color::Cyan } else { Color::DarkGray };
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(color))
        .title(title)
}

fn render_picker(frame: &mut Frame, app: &mut App, area: Rect) {
    let block = pane_block(" Topics ".to_string(), app.focus == Pane::Picker);
    let inner = block.inner(area);
    frame.render_widget(block, area);
    frame.render_stateful_widget(&app.picker, inner, &mut app.picker_state);
}

fn topic_line(topic: &Topic, selected: bool) -> Line<'static> {
    let mut name = Style::default().add_modifier(Modifier::BOLD);
    if topic.featured || topic.curated {
        name = name.fg(Color::Yellow);
    }
    if selected {
        name = name.add_modifier(Modifier::REVERSED);
    }
    let description = topic.short_description.clone().unwrap_or_default();
    Line::from(vec![
        Span::styled(topic.title().to_string(), name),
        Span::raw("  "),
        Span::styled(description, Style::default().fg(Color::Gray)),
    ])
}

fn render_feed(frame: &mut Frame, app: &mut App, area: Rect) {
    let title = format!(" Feed: {} ", app.config.github.feed_query);
    let view = ScrollListView::new(&app.feed, topic_line)
        .translator(app.translator.as_ref())
        .block(pane_block(title, app.focus == Pane::Feed));
    frame.render_stateful_widget(view, area, &mut app.feed_state);
}

fn render_bookmarks(frame: &mut Frame, app: &mut App, area: Rect) {
    let block = pane_block(" Bookmarks ".to_string(), app.focus == Pane::Bookmarks);
    let inner = block.inner(area);
    frame.render_widget(block, area);
    frame.render_stateful_widget(app.bookmarks.as_ref(), inner, &mut app.table_state);
}

fn render_status(frame: &mut Frame, app: &App, area: Rect) {
    let status = app.status_text();
    let style = Style::default().bg(Color::DarkGray);

    let paragraph = Paragraph::new(format!(" {} ", status)).style(style);

    frame.render_widget(paragraph, area);
}

fn render_confirm(frame: &mut Frame, message: &str) {
    let area = centered_rect(50, 20, frame.area());
    frame.render_widget(Clear, area);

    let content = format!("{}\n\n(y) Yes  (n) No", message);

    let dialog = Paragraph::new(content)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Red))
                .title(" Confirm "),
        )
        .alignment(Alignment::Center);

    frame.render_widget(dialog, area);
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
