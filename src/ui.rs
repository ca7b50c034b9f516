use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget, Wrap},
};
use unicode_width::UnicodeWidthStr;

use crate::shell::{Orientation, TimerScreen};

const HORIZONTAL_MARGIN: u16 = 2;
const VERTICAL_MARGIN: u16 = 1;
const HINT: &str = "r rebuild screen · q quit";

impl Widget for &TimerScreen {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let bold_style = Style::default().add_modifier(Modifier::BOLD);
        let label_style = Style::default().patch(bold_style).fg(Color::Cyan);
        let dim_style = Style::default().add_modifier(Modifier::DIM);

        let outer = Layout::default()
            .direction(Direction::Vertical)
            .horizontal_margin(HORIZONTAL_MARGIN)
            .vertical_margin(VERTICAL_MARGIN)
            .constraints([Constraint::Min(3), Constraint::Length(1)])
            .split(area);

        let hint = Paragraph::new(Span::styled(HINT, dim_style)).alignment(Alignment::Center);

        match self.orientation() {
            Orientation::Landscape => {
                let columns = Layout::default()
                    .direction(Direction::Horizontal)
                    .constraints([Constraint::Percentage(65), Constraint::Percentage(35)])
                    .split(outer[0]);

                render_label(self, columns[0], buf, label_style);
                render_details(self, columns[1], buf, dim_style);
            }
            Orientation::Portrait => {
                let rows = Layout::default()
                    .direction(Direction::Vertical)
                    .constraints([Constraint::Min(3), Constraint::Length(5)])
                    .split(outer[0]);

                render_label(self, rows[0], buf, label_style);
                render_details(self, rows[1], buf, dim_style);
            }
        }

        hint.render(outer[1], buf);
    }
}

fn render_label(screen: &TimerScreen, area: Rect, buf: &mut Buffer, style: Style) {
    let block = Block::default().borders(Borders::ALL).title("Elapsed");
    let inner = block.inner(area);
    block.render(area, buf);

    let text = screen.text();
    // wrapped labels need more than the single centre row
    let lines = if inner.width == 0 {
        1
    } else {
        (text.width() as u16).div_ceil(inner.width).max(1)
    };

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(inner.height.saturating_sub(lines) / 2),
            Constraint::Length(lines),
            Constraint::Min(0),
        ])
        .split(inner);

    Paragraph::new(Span::styled(text, style))
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .render(rows[1], buf);
}

fn render_details(screen: &TimerScreen, area: Rect, buf: &mut Buffer, style: Style) {
    let rows = [
        ("layout", screen.orientation().to_string()),
        ("screen", format!("#{}", screen.generation())),
        ("period", format!("{}ms", screen.period().as_millis())),
    ];
    let key_width = rows.iter().map(|(k, _)| k.width()).max().unwrap_or(0);

    let lines: Vec<Line> = rows
        .into_iter()
        .map(|(key, value)| {
            Line::from(vec![
                Span::styled(format!("{key:<key_width$}  "), style),
                Span::raw(value),
            ])
        })
        .collect();

    Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title("Session"))
        .render(area, buf);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::dispatcher::MainThread;
    use crate::session::SessionStore;

    fn rendered(screen: &TimerScreen, width: u16, height: u16) -> String {
        let area = Rect::new(0, 0, width, height);
        let mut buffer = Buffer::empty(area);
        screen.render(area, &mut buffer);
        buffer.content().iter().map(|c| c.symbol()).collect()
    }

    #[test]
    fn landscape_shows_label_and_details() {
        let (_main, handle) = MainThread::new();
        let mut store = SessionStore::new();
        let screen =
            TimerScreen::start(&mut store, &handle, &Settings::default(), (100, 24), 1).unwrap();

        let out = rendered(&screen, 100, 24);
        assert!(out.contains("0 seconds"));
        assert!(out.contains("Landscape"));
        assert!(out.contains("1000ms"));
    }

    #[test]
    fn portrait_shows_label() {
        let (_main, handle) = MainThread::new();
        let mut store = SessionStore::new();
        let screen =
            TimerScreen::start(&mut store, &handle, &Settings::default(), (40, 40), 3).unwrap();

        let out = rendered(&screen, 40, 40);
        assert!(out.contains("0 seconds"));
        assert!(out.contains("Portrait"));
        assert!(out.contains("#3"));
    }

    #[test]
    fn tiny_area_does_not_panic() {
        let (_main, handle) = MainThread::new();
        let mut store = SessionStore::new();
        let screen =
            TimerScreen::start(&mut store, &handle, &Settings::default(), (4, 2), 1).unwrap();
        let area = Rect::new(0, 0, 4, 2);
        let mut buffer = Buffer::empty(area);
        (&screen).render(area, &mut buffer);
        assert_eq!(*buffer.area(), area);
    }
}
