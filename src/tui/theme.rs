//! Colors and styles for the terminal surface

use crate::persona::AgentId;
use crate::store::Role;
use ratatui::style::{Color, Modifier, Style};

/// Every style the view uses, built once and passed in
#[derive(Debug, Clone, Copy)]
pub struct Theme {
    pub mission: Style,
    pub border: Style,
    pub user: Style,
    pub system: Style,
    pub ether: Style,
    pub aurora: Style,
    pub tool_directive: Style,
    pub tool_result: Style,
    pub tool_started: Style,
    pub tool_failed: Style,
    pub status: Style,
    pub input: Style,
}

impl Theme {
    pub fn role(&self, role: Role) -> Style {
        match role {
            Role::User => self.user,
            Role::System => self.system,
            Role::Agent(AgentId::Ether) => self.ether,
            Role::Agent(AgentId::Aurora) => self.aurora,
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            mission: Style::default()
                .fg(Color::Magenta)
                .add_modifier(Modifier::BOLD),
            border: Style::default().fg(Color::DarkGray),
            user: Style::default()
                .fg(Color::Green)
                .add_modifier(Modifier::BOLD),
            system: Style::default().fg(Color::Yellow),
            ether: Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
            aurora: Style::default()
                .fg(Color::LightMagenta)
                .add_modifier(Modifier::BOLD),
            tool_directive: Style::default()
                .fg(Color::Black)
                .bg(Color::Yellow),
            tool_result: Style::default().fg(Color::Gray),
            tool_started: Style::default().fg(Color::Yellow),
            tool_failed: Style::default().fg(Color::Red),
            status: Style::default().fg(Color::Black).bg(Color::Cyan),
            input: Style::default().fg(Color::White),
        }
    }
}
