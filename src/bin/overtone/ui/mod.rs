//! TUI rendering for overtone
//!
//! Draws both voices' controls side by side above the spectrum.

pub mod spectrum;
mod status;
mod voice_panel;

use ratatui::{
    layout::{Constraint, Direction, Flex, Layout, Rect},
    style::{Color, Style},
    text::Line,
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use overtone::synth::VoiceId;

use super::app::App;

use spectrum::{render_measured, render_partials};
use status::{render_status, AudioStats};
use voice_panel::render_voice;

const HELP: &str = " [Tab] Voice  [↑↓] Field  [←→] Adjust  [0-9 . -] Type  [Space] Mute  \
                    [P] Play  [S] Stop  [A] Add  [D] Delete  [Q] Quit";

pub fn render(frame: &mut Frame, app: &App) {
    let area = frame.area();

    // Status, voices, spectrum, help
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(10),
            Constraint::Length(12),
            Constraint::Length(1),
        ])
        .split(area);

    let stats = AudioStats::from_buffer(&app.scope);
    render_status(frame, chunks[0], app, &stats);

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(chunks[1]);
    for (voice, column) in app.synth.voices().iter().zip(columns.iter()) {
        let focused = (voice.id() == app.focus.voice).then(|| app.focused_field()).flatten();
        render_voice(frame, *column, voice, focused, app.synth.config());
    }

    let spectrum = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(chunks[2]);
    render_partials(frame, spectrum[0], &app.partials, app.synth.config().max_amplitude);
    let measured = app
        .analyzer
        .as_ref()
        .map(|analyzer| analyzer.data())
        .unwrap_or_default();
    render_measured(frame, spectrum[1], measured);

    let help = Paragraph::new(HELP).style(Style::default().fg(Color::DarkGray));
    frame.render_widget(help, chunks[3]);

    if let Some(message) = &app.alert {
        render_alert(frame, area, message);
    }
}

/// Modal box over everything else
fn render_alert(frame: &mut Frame, area: Rect, message: &str) {
    let popup = centered(area, 50, 7);
    let block = Block::default()
        .title(" Invalid input ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Red));
    let text = vec![
        Line::from(message.to_string()),
        Line::from(""),
        Line::from("[Enter] OK").style(Style::default().fg(Color::DarkGray)),
    ];
    let paragraph = Paragraph::new(text).block(block).wrap(Wrap { trim: true });

    frame.render_widget(Clear, popup);
    frame.render_widget(paragraph, popup);
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let [row] = Layout::vertical([Constraint::Length(height)])
        .flex(Flex::Center)
        .areas(area);
    let [cell] = Layout::horizontal([Constraint::Length(width)])
        .flex(Flex::Center)
        .areas(row);
    cell
}

pub(crate) fn voice_color(voice: VoiceId) -> Color {
    match voice {
        VoiceId::One => Color::Cyan,
        VoiceId::Two => Color::Magenta,
    }
}
