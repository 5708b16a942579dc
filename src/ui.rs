use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Flex, Layout, Position, Rect},
    style::{Color, Modifier, Style, Stylize},
    symbols::border,
    text::{Line, Span},
    widgets::{Block, Cell, Clear, Paragraph, Row, Table, Wrap},
};

use crate::domain::{LoadStatus, SortKey};
use crate::model::{Model, UIData};

const STATUSLINE_HEIGHT: u16 = 1;
const SEARCHBAR_HEIGHT: u16 = 3;

#[derive(Debug, Default)]
pub struct DirectoryUI;

impl DirectoryUI {
    pub fn new() -> Self {
        Self
    }

    pub fn draw(&self, model: &Model, frame: &mut Frame) {
        let uidata = model.get_uidata();
        let [title_area, body_area, status_area] = Layout::vertical([
            Constraint::Length(1),
            Constraint::Min(0),
            Constraint::Length(STATUSLINE_HEIGHT),
        ])
        .areas(frame.area());

        frame.render_widget(
            Line::from(uidata.title.as_str().bold().fg(Color::Blue)).centered(),
            title_area,
        );

        match &uidata.load_status {
            LoadStatus::Loading => Self::draw_message(frame, body_area, Line::from("Loading...")),
            LoadStatus::Failed(message) => Self::draw_message(
                frame,
                body_area,
                Line::from(format!("Error: {message}")).fg(Color::Red),
            ),
            LoadStatus::Ready => Self::draw_directory(uidata, frame, body_area),
        }

        Self::draw_statusline(uidata, frame, status_area);

        if uidata.show_popup {
            Self::draw_popup(uidata, frame);
        }
    }

    fn draw_message(frame: &mut Frame, area: Rect, line: Line) {
        let [area] = Layout::vertical([Constraint::Length(1)])
            .flex(Flex::Center)
            .areas(area);
        frame.render_widget(Paragraph::new(line).alignment(Alignment::Center), area);
    }

    fn draw_directory(uidata: &UIData, frame: &mut Frame, area: Rect) {
        let [bar_area, table_area, pager_area] = Layout::vertical([
            Constraint::Length(SEARCHBAR_HEIGHT),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .areas(area);
        let [search_area, sort_area] =
            Layout::horizontal([Constraint::Percentage(70), Constraint::Percentage(30)])
                .areas(bar_area);

        let search_text = if uidata.active_cmdinput {
            uidata.cmdinput.input.as_str()
        } else {
            uidata.search_term.as_str()
        };
        let search = if search_text.is_empty() && !uidata.active_cmdinput {
            Paragraph::new("Search by name, location, or industry".dark_gray())
        } else {
            Paragraph::new(search_text)
        };
        let search_border = if uidata.active_cmdinput {
            border::THICK
        } else {
            border::PLAIN
        };
        let search_block = Block::bordered()
            .title(" / Search ")
            .border_set(search_border);
        frame.render_widget(search.block(search_block), search_area);
        if uidata.active_cmdinput {
            frame.set_cursor_position(Position::new(
                search_area.x + 1 + uidata.cmdinput.cursor_pos as u16,
                search_area.y + 1,
            ));
        }

        let sort_label = match uidata.sort_key {
            SortKey::None => uidata.sort_key.label().dark_gray(),
            key => key.label().into(),
        };
        frame.render_widget(
            Paragraph::new(sort_label).block(Block::bordered().title(" s Sort ")),
            sort_area,
        );

        Self::draw_records(uidata, frame, table_area);
        Self::draw_pager(uidata, frame, pager_area);
    }

    fn draw_records(uidata: &UIData, frame: &mut Frame, area: Rect) {
        let width = uidata.max_column_width;
        let header = Row::new(["Name", "Location", "Industry"])
            .style(Style::default().add_modifier(Modifier::BOLD).fg(Color::Blue));
        let rows = uidata.records.iter().map(|r| {
            Row::new([
                Cell::from(truncate(&r.name, width)),
                Cell::from(truncate(&r.location, width)),
                Cell::from(truncate(&r.industry, width)),
            ])
        });
        let table = Table::new(
            rows,
            [
                Constraint::Percentage(40),
                Constraint::Percentage(30),
                Constraint::Percentage(30),
            ],
        )
        .header(header)
        .block(Block::bordered().title(format!(
            " {} of {} companies ",
            uidata.nmatches, uidata.ncatalog
        )));
        frame.render_widget(table, area);
    }

    fn draw_pager(uidata: &UIData, frame: &mut Frame, area: Rect) {
        let button = |label: &'static str, enabled: bool| {
            if enabled {
                Span::from(label).bold().fg(Color::Blue)
            } else {
                Span::from(label).fg(Color::DarkGray).add_modifier(Modifier::DIM)
            }
        };
        let pager = Line::from(vec![
            button("< Prev", uidata.has_previous),
            format!("   Page {} of {}   ", uidata.current_page, uidata.total_pages).into(),
            button("Next >", uidata.has_next),
        ])
        .centered();
        frame.render_widget(pager, area);
    }

    fn draw_statusline(uidata: &UIData, frame: &mut Frame, area: Rect) {
        let line = Line::from(vec![
            uidata.status_message.as_str().into(),
            Span::from("  ? help  q quit").dark_gray(),
        ]);
        frame.render_widget(line, area);
    }

    fn draw_popup(uidata: &UIData, frame: &mut Frame) {
        let [area] = Layout::horizontal([Constraint::Percentage(60)])
            .flex(Flex::Center)
            .areas(frame.area());
        let [area] = Layout::vertical([Constraint::Percentage(70)])
            .flex(Flex::Center)
            .areas(area);
        let popup = Paragraph::new(uidata.popup_message.as_str())
            .wrap(Wrap { trim: false })
            .block(
                Block::bordered()
                    .title(" Help ")
                    .title_bottom(Line::from(" Esc close ").centered())
                    .border_set(border::THICK),
            );
        frame.render_widget(Clear, area);
        frame.render_widget(popup, area);
    }
}

fn truncate(value: &str, width: usize) -> String {
    if width < 3 || value.chars().count() <= width {
        return value.to_string();
    }
    let mut reduced: String = value.chars().take(width - 3).collect();
    reduced.push_str("...");
    reduced
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DirConfig, DirError, Message, Record};
    use ratatui::{Terminal, backend::TestBackend};

    fn render(model: &Model) -> String {
        let mut terminal = Terminal::new(TestBackend::new(80, 20)).unwrap();
        let ui = DirectoryUI::new();
        terminal.draw(|f| ui.draw(model, f)).unwrap();
        let buffer = terminal.backend().buffer();
        let mut text = String::new();
        for y in 0..buffer.area.height {
            for x in 0..buffer.area.width {
                text.push_str(buffer[(x, y)].symbol());
            }
            text.push('\n');
        }
        text
    }

    #[test]
    fn shows_loading_indicator() {
        let model = Model::init(&DirConfig::default());
        assert!(render(&model).contains("Loading..."));
    }

    #[test]
    fn shows_failure_message() {
        let mut model = Model::init(&DirConfig::default());
        model.update(Message::Loaded(Err(DirError::LoadingFailed(
            "network unreachable".into(),
        ))));
        let text = render(&model);
        assert!(text.contains("Error: network unreachable"));
        assert!(!text.contains("Page 1 of 1"));
    }

    #[test]
    fn shows_visible_page() {
        let mut model = Model::init(&DirConfig::default());
        let records = (1..=7)
            .map(|i| Record::new(i.to_string(), format!("Firm {i}"), "Oslo", "Shipping"))
            .collect();
        model.update(Message::Loaded(Ok(records)));
        let text = render(&model);
        assert!(text.contains("Companies Directory"));
        assert!(text.contains("Firm 5"));
        assert!(!text.contains("Firm 6"));
        assert!(text.contains("Page 1 of 2"));
        assert!(text.contains("7 of 7 companies"));

        model.update(Message::NextPage);
        let text = render(&model);
        assert!(text.contains("Firm 7"));
        assert!(text.contains("Page 2 of 2"));
    }

    #[test]
    fn truncates_long_values() {
        assert_eq!(truncate("Everstone Capital", 8), "Evers...");
        assert_eq!(truncate("Acme", 8), "Acme");
        assert_eq!(truncate("Acme", 2), "Acme");
    }
}
