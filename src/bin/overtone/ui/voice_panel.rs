//! Controls of one voice: frequency, amplitude and the overtone rows

use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use overtone::{synth::Voice, SynthConfig};

use super::{super::app::Field, voice_color};

const SLIDER_WIDTH: usize = 20;

pub fn render_voice(
    frame: &mut Frame,
    area: Rect,
    voice: &Voice,
    focused: Option<Field>,
    config: &SynthConfig,
) {
    let controls = voice.controls();
    let color = voice_color(voice.id());
    let state = if voice.is_playing() { "▶" } else { "■" };

    let block = Block::default()
        .title(format!(" Voice {} {state} ", voice.id()))
        .borders(Borders::ALL)
        .border_style(if focused.is_some() {
            Style::default().fg(color)
        } else {
            Style::default().fg(Color::DarkGray)
        });

    let style_for = |field: Field| {
        if focused == Some(field) {
            Style::default().add_modifier(Modifier::REVERSED)
        } else {
            Style::default()
        }
    };

    let mut lines = vec![
        Line::from(vec![
            Span::raw("Frequency  "),
            Span::styled(format!("[{:<8}]", controls.frequency_input), style_for(Field::FrequencyInput)),
            Span::raw(" Hz"),
        ]),
        Line::from(vec![
            Span::raw("Slider     "),
            Span::styled(
                slider(controls.frequency_slider, config.max_frequency),
                style_for(Field::FrequencySlider).fg(color),
            ),
            Span::raw(format!(" {:.1} Hz", controls.frequency_slider)),
        ]),
        Line::from(vec![
            Span::raw("Amplitude  "),
            Span::styled(slider(controls.amplitude, config.max_amplitude), style_for(Field::Amplitude).fg(color)),
            Span::raw(format!(" {:.2}", controls.amplitude)),
        ]),
        Line::from(""),
        Line::from(Span::styled("Overtones", Style::default().add_modifier(Modifier::BOLD))),
    ];

    if controls.rows.is_empty() {
        lines.push(Line::from(Span::styled(
            "  none - press A to add",
            Style::default().fg(Color::DarkGray),
        )));
    }

    for (index, row) in controls.rows.iter().enumerate() {
        let mute = if row.muted { "[x] mute" } else { "[ ] mute" };
        let live = voice.live_overtone(row.id).is_some();
        lines.push(Line::from(vec![
            Span::styled(
                format!("  {:>2} ", index + 1),
                Style::default().fg(if live { color } else { Color::DarkGray }),
            ),
            Span::raw("ratio "),
            Span::styled(format!("[{:<6}]", row.ratio), style_for(Field::Ratio(row.id))),
            Span::raw("  amp "),
            Span::styled(format!("[{:<6}]", row.multiplier), style_for(Field::Multiplier(row.id))),
            Span::raw("  "),
            Span::styled(mute, style_for(Field::Mute(row.id))),
        ]));
    }

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn slider(value: f32, max: f32) -> String {
    let fraction = if max > 0.0 { (value / max).clamp(0.0, 1.0) } else { 0.0 };
    let filled = (fraction * SLIDER_WIDTH as f32).round() as usize;
    let mut bar = "━".repeat(filled);
    bar.push('○');
    bar.push_str(&"─".repeat(SLIDER_WIDTH - filled));
    bar
}
