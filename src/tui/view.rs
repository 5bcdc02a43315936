//! Panel rendering

use super::app::{App, ToolActivity};
use super::theme::Theme;
use crate::persona::MISSION_BANNER;
use crate::store::{Message, Role};
use crate::tools::directive;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::Style;
use ratatui::text::{Line, Span};
use ratatui::widgets::{
    Block, Borders, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState, Wrap,
};
use ratatui::Frame;

/// Longest tool output preview shown in the activity panel
const PREVIEW_CHARS: usize = 80;

pub fn draw(f: &mut Frame, app: &mut App, theme: &Theme) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(5),
            Constraint::Length(1),
            Constraint::Length(3),
        ])
        .split(f.area());

    let middle = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(70), Constraint::Percentage(30)])
        .split(rows[1]);

    draw_mission(f, theme, rows[0]);
    draw_conversation(f, app, theme, middle[0]);
    draw_tool_log(f, app, theme, middle[1]);
    draw_status(f, app, theme, rows[2]);
    draw_input(f, app, theme, rows[3]);
}

fn draw_mission(f: &mut Frame, theme: &Theme, area: Rect) {
    let para = Paragraph::new(Line::from(Span::styled(MISSION_BANNER, theme.mission)))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(theme.border),
        )
        .wrap(Wrap { trim: true });
    f.render_widget(para, area);
}

fn draw_conversation(f: &mut Frame, app: &mut App, theme: &Theme, area: Rect) {
    let block = Block::default()
        .title(" Dialogue ")
        .borders(Borders::ALL)
        .border_style(theme.border);

    let lines: Vec<Line> = app
        .conversation
        .iter()
        .flat_map(|message| message_lines(message, theme))
        .collect();

    let inner_width = u32::from(area.width.saturating_sub(2));
    let inner_height = u32::from(area.height.saturating_sub(2));
    let total_lines = wrapped_height(&lines, inner_width);
    let max_scroll = total_lines.saturating_sub(inner_height);
    let max_scroll_u16 = u16::try_from(max_scroll).unwrap_or(u16::MAX);
    let scroll = match app.conversation_scroll {
        Some(offset) => offset.min(max_scroll_u16),
        None => max_scroll_u16,
    };
    if app.conversation_scroll.is_some() {
        app.conversation_scroll = Some(scroll);
    }
    app.viewport_height = u16::try_from(inner_height).unwrap_or(u16::MAX);

    let para = Paragraph::new(lines)
        .block(block)
        .wrap(Wrap { trim: false })
        .scroll((scroll, 0));
    f.render_widget(para, area);

    if total_lines > inner_height {
        let mut scrollbar_state =
            ScrollbarState::new(usize::from(max_scroll_u16)).position(usize::from(scroll));
        f.render_stateful_widget(
            Scrollbar::new(ScrollbarOrientation::VerticalRight)
                .begin_symbol(None)
                .end_symbol(None),
            area,
            &mut scrollbar_state,
        );
    }
}

fn draw_tool_log(f: &mut Frame, app: &App, theme: &Theme, area: Rect) {
    let block = Block::default()
        .title(" Tools ")
        .borders(Borders::ALL)
        .border_style(theme.border);

    let lines: Vec<Line> = if app.tool_log.is_empty() {
        vec![Line::from(Span::styled("No tool activity yet.", theme.border))]
    } else {
        app.tool_log
            .iter()
            .map(|entry| match &entry.activity {
                ToolActivity::Started => Line::from(vec![
                    Span::styled("... ", theme.tool_started),
                    Span::styled(entry.label.clone(), theme.tool_directive),
                ]),
                ToolActivity::Finished { success, output } => Line::from(vec![
                    if *success {
                        Span::styled(" OK ", theme.tool_result)
                    } else {
                        Span::styled("ERR ", theme.tool_failed)
                    },
                    Span::raw(preview(output)),
                ]),
            })
            .collect()
    };

    // Newest entries stay visible
    let inner_height = usize::from(area.height.saturating_sub(2));
    let skip = lines.len().saturating_sub(inner_height);
    let visible: Vec<Line> = lines.into_iter().skip(skip).collect();

    f.render_widget(Paragraph::new(visible).block(block), area);
}

fn draw_status(f: &mut Frame, app: &App, theme: &Theme, area: Rect) {
    let text = format!(" {}", app.status_line());
    f.render_widget(Paragraph::new(text).style(theme.status), area);
}

fn draw_input(f: &mut Frame, app: &App, theme: &Theme, area: Rect) {
    let block = Block::default()
        .title(" Speak to the agents (Enter to send, Esc to quit) ")
        .borders(Borders::ALL)
        .border_style(theme.border);
    let para = Paragraph::new(format!("> {}", app.input))
        .style(theme.input)
        .block(block);
    f.render_widget(para, area);

    // Cursor after the typed text
    let typed = u16::try_from(app.input.chars().count()).unwrap_or(u16::MAX);
    let x = area.x.saturating_add(3).saturating_add(typed);
    let max_x = area.x + area.width.saturating_sub(2);
    f.set_cursor_position((x.min(max_x), area.y + 1));
}

/// Render one message, prefixing its first line with the author
fn message_lines<'a>(message: &'a Message, theme: &Theme) -> Vec<Line<'a>> {
    let (label, label_style, body_style) = match message.role {
        Role::User => ("You", theme.user, Style::default()),
        Role::System if message.is_tool_result() => ("Tool", theme.tool_result, theme.tool_result),
        Role::System => ("System", theme.system, theme.system),
        Role::Agent(agent) => (agent.display_name(), theme.role(message.role), Style::default()),
    };

    let mut lines = Vec::new();
    for (i, text) in message.content.split('\n').enumerate() {
        let mut spans = Vec::new();
        if i == 0 {
            spans.push(Span::styled(format!("{label}: "), label_style));
        }
        spans.extend(highlight_directive(text, body_style, theme));
        lines.push(Line::from(spans));
    }
    lines.push(Line::default());
    lines
}

/// Split `text` so an embedded tool directive gets its own style
fn highlight_directive<'a>(text: &'a str, base: Style, theme: &Theme) -> Vec<Span<'a>> {
    let Some(range) = directive::find_span(text) else {
        return vec![Span::styled(text, base)];
    };
    let before = text.get(..range.start).unwrap_or_default();
    let tool = text.get(range.clone()).unwrap_or_default();
    let after = text.get(range.end..).unwrap_or_default();

    let mut spans = Vec::with_capacity(3);
    if !before.is_empty() {
        spans.push(Span::styled(before, base));
    }
    spans.push(Span::styled(tool, theme.tool_directive));
    if !after.is_empty() {
        spans.push(Span::styled(after, base));
    }
    spans
}

/// Row count once lines are wrapped to `width` columns
fn wrapped_height(lines: &[Line], width: u32) -> u32 {
    if width == 0 {
        return 0;
    }
    lines
        .iter()
        .map(|line| {
            let w = u32::try_from(line.width()).unwrap_or(u32::MAX);
            w.div_ceil(width).max(1)
        })
        .sum()
}

fn preview(output: &str) -> String {
    let first = output.lines().next().unwrap_or_default();
    if first.chars().count() > PREVIEW_CHARS || output.lines().nth(1).is_some() {
        let head: String = first.chars().take(PREVIEW_CHARS).collect();
        format!("{head}...")
    } else {
        first.to_string()
    }
}
