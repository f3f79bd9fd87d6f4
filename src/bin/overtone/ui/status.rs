//! Status bar - engine state, clock, per-voice play state and output level

use ratatui::{
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use overtone::engine::{AudioEngine, EngineState};

use super::{super::app::App, voice_color};

pub struct AudioStats {
    pub peak: f32,
    pub rms: f32,
}

impl AudioStats {
    pub fn from_buffer(buffer: &[f32]) -> Self {
        if buffer.is_empty() {
            return Self { peak: 0.0, rms: 0.0 };
        }
        let peak = buffer.iter().fold(0.0f32, |acc, &x| acc.max(x.abs()));
        let rms = (buffer.iter().map(|&x| x * x).sum::<f32>() / buffer.len() as f32).sqrt();
        Self { peak, rms }
    }
}

pub fn render_status(frame: &mut Frame, area: Rect, app: &App, stats: &AudioStats) {
    let block = Block::default().title(" overtone ").borders(Borders::ALL);

    let mut spans = Vec::new();
    match app.synth.engine() {
        Some(engine) if engine.state() == EngineState::Running => {
            spans.push(Span::styled(
                format!(" {:.1}kHz  ", engine.sample_rate() / 1000.0),
                Style::default().fg(Color::DarkGray),
            ));
            spans.push(Span::styled(
                format!("t={:.2}s  ", engine.current_time()),
                Style::default().fg(Color::White),
            ));
        }
        Some(_) => spans.push(Span::styled(" engine closed  ", Style::default().fg(Color::Yellow))),
        None => spans.push(Span::styled(" no audio yet  ", Style::default().fg(Color::DarkGray))),
    }

    for voice in app.synth.voices() {
        let (symbol, label) = if voice.is_playing() {
            ("▶", "playing")
        } else {
            ("■", "stopped")
        };
        spans.push(Span::styled(
            format!("Voice {} {symbol} {label}  ", voice.id()),
            Style::default().fg(voice_color(voice.id())),
        ));
    }

    spans.push(Span::styled(
        format!("Peak: {:.2}  RMS: {:.2}", stats.peak, stats.rms),
        Style::default().fg(Color::Magenta),
    ));

    if let Some(message) = &app.status {
        spans.push(Span::styled(format!("  {message}"), Style::default().fg(Color::Red)));
    }

    let paragraph = Paragraph::new(Line::from(spans)).block(block);
    frame.render_widget(paragraph, area);
}
