use ratatui::style::{Color, Modifier, Style};

/// Colours used by the renderers. Passed explicitly, never global.
#[derive(Debug, Clone)]
pub struct Theme {
    pub success: Style,
    pub redirect: Style,
    pub client_error: Style,
    pub server_error: Style,
    pub neutral: Style,
    pub header: Style,
    pub border: Style,
    pub info: Style,
    pub progress: Style,
    pub error: Style,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            success: Style::default().fg(Color::Green),
            redirect: Style::default().fg(Color::Yellow),
            client_error: Style::default().fg(Color::Magenta),
            server_error: Style::default().fg(Color::Red),
            neutral: Style::default().fg(Color::Gray),
            header: Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            border: Style::default().fg(Color::Blue),
            info: Style::default().fg(Color::Gray),
            progress: Style::default().fg(Color::Yellow),
            error: Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        }
    }
}

impl Theme {
    pub fn status(&self, status: u16) -> Style {
        match status {
            200..=299 => self.success,
            300..=399 => self.redirect,
            400..=499 => self.client_error,
            500.. => self.server_error,
            _ => self.neutral,
        }
    }
}
