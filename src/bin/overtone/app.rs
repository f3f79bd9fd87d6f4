//! Overtone - key handling and the main event loop

use color_eyre::eyre::Result as EyreResult;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use log::error;
use ratatui::DefaultTerminal;
use std::time::Duration;

use overtone::{
    engine::{AudioEngine, RealtimeProvider},
    synth::{
        voice::{format_number, parse_number},
        Partial, RowId, SynthCommand, SynthState, Voice, VoiceId,
    },
    SynthConfig,
};

use super::ui::{self, spectrum::SpectrumAnalyzer};

/// Samples kept for the output spectrum (also the FFT size)
pub const VIS_BUFFER_SIZE: usize = 1024;

const FREQUENCY_STEP: f32 = 10.0;
const AMPLITUDE_STEP: f32 = 0.05;
const RATIO_STEP: f32 = 0.1;
const MULTIPLIER_STEP: f32 = 0.05;

/// An editable control of the focused voice
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    FrequencyInput,
    FrequencySlider,
    Amplitude,
    Ratio(RowId),
    Multiplier(RowId),
    Mute(RowId),
}

impl Field {
    fn row(self) -> Option<RowId> {
        match self {
            Field::Ratio(row) | Field::Multiplier(row) | Field::Mute(row) => Some(row),
            _ => None,
        }
    }
}

/// Controls of a voice in display order
pub fn fields(voice: &Voice) -> Vec<Field> {
    let mut fields = vec![Field::FrequencyInput, Field::FrequencySlider, Field::Amplitude];
    for row in &voice.controls().rows {
        fields.extend([Field::Ratio(row.id), Field::Multiplier(row.id), Field::Mute(row.id)]);
    }
    fields
}

#[derive(Debug, Clone, Copy)]
pub struct Focus {
    pub voice: VoiceId,
    pub index: usize,
}

pub struct App {
    pub(crate) synth: SynthState<RealtimeProvider>,
    pub(crate) focus: Focus,
    /// Blocking message; all input except dismissal is ignored while set
    pub(crate) alert: Option<String>,
    /// Last non-blocking error, shown in the status bar
    pub(crate) status: Option<String>,
    pub(crate) partials: Vec<Partial>,
    pub(crate) scope: Vec<f32>,
    pub(crate) analyzer: Option<SpectrumAnalyzer>,
    should_quit: bool,
}

impl App {
    pub fn new(config: SynthConfig) -> Self {
        let provider = RealtimeProvider::new(config.engine.clone());
        let synth = SynthState::new(provider, config);
        let partials = synth.spectrum();
        Self {
            synth,
            focus: Focus {
                voice: VoiceId::One,
                index: 0,
            },
            alert: None,
            status: None,
            partials,
            scope: Vec::with_capacity(VIS_BUFFER_SIZE * 2),
            analyzer: None,
            should_quit: false,
        }
    }

    /// Run the UI event loop
    pub fn run(&mut self, terminal: &mut DefaultTerminal) -> EyreResult<()> {
        while !self.should_quit {
            self.poll_audio();

            terminal.draw(|frame| ui::render(frame, self))?;

            // ~60fps
            if event::poll(Duration::from_millis(16))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        self.handle_key(key);
                    }
                }
            }
        }

        if let Err(err) = self.synth.close_engine() {
            error!("failed to shut down audio cleanly: {err}");
        }
        Ok(())
    }

    pub fn focused_field(&self) -> Option<Field> {
        fields(self.synth.voice(self.focus.voice))
            .get(self.focus.index)
            .copied()
    }

    /// Pull rendered samples from the engine and feed the analyzer
    fn poll_audio(&mut self) {
        let Some(engine) = self.synth.engine_mut() else {
            return;
        };
        if engine.is_closed() {
            return;
        }
        let sample_rate = engine.sample_rate();
        engine.drain_scope(&mut self.scope);

        if self.scope.len() > VIS_BUFFER_SIZE {
            let excess = self.scope.len() - VIS_BUFFER_SIZE;
            self.scope.drain(0..excess);
        }

        let analyzer = self
            .analyzer
            .get_or_insert_with(|| SpectrumAnalyzer::new(VIS_BUFFER_SIZE, sample_rate));
        analyzer.update(&self.scope);
    }

    fn handle_key(&mut self, key: KeyEvent) {
        if self.alert.is_some() {
            if matches!(key.code, KeyCode::Enter | KeyCode::Esc | KeyCode::Char(' ')) {
                self.alert = None;
            }
            return;
        }

        let voice = self.focus.voice;
        let field = self.focused_field();
        let command = match key.code {
            KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => {
                self.should_quit = true;
                None
            }
            KeyCode::Tab | KeyCode::BackTab => {
                self.focus = Focus {
                    voice: match voice {
                        VoiceId::One => VoiceId::Two,
                        VoiceId::Two => VoiceId::One,
                    },
                    index: 0,
                };
                None
            }
            KeyCode::Up => {
                self.focus.index = self.focus.index.saturating_sub(1);
                None
            }
            KeyCode::Down => {
                let last = fields(self.synth.voice(voice)).len() - 1;
                self.focus.index = (self.focus.index + 1).min(last);
                None
            }
            KeyCode::Char('p') | KeyCode::Char('P') => Some(SynthCommand::PlayVoice(voice)),
            KeyCode::Char('s') | KeyCode::Char('S') => Some(SynthCommand::StopVoice(voice)),
            KeyCode::Char('a') | KeyCode::Char('A') => Some(SynthCommand::AddOvertone(voice)),
            KeyCode::Char('d') | KeyCode::Char('D') | KeyCode::Delete => field
                .and_then(Field::row)
                .map(|row| SynthCommand::DeleteOvertone { voice, row }),
            KeyCode::Left => field.and_then(|field| self.adjust(field, -1.0)),
            KeyCode::Right => field.and_then(|field| self.adjust(field, 1.0)),
            KeyCode::Char(' ') | KeyCode::Enter => match field {
                Some(Field::Mute(row)) => self.toggle_mute(row),
                _ => None,
            },
            KeyCode::Char(c) if c.is_ascii_digit() || c == '.' || c == '-' => {
                field.and_then(|field| self.edit_text(field, |text| text.push(c)))
            }
            KeyCode::Backspace => field.and_then(|field| {
                self.edit_text(field, |text| {
                    text.pop();
                })
            }),
            _ => None,
        };

        if let Some(command) = command {
            self.dispatch(command);
        }
    }

    fn dispatch(&mut self, command: SynthCommand) {
        match self.synth.dispatch(command) {
            Ok(outcome) => {
                self.status = None;
                if outcome.redraw_spectrum {
                    self.partials = self.synth.spectrum();
                }
            }
            Err(err) if err.is_user_facing() => {
                self.alert = Some(err.to_string());
                self.partials = self.synth.spectrum();
            }
            Err(err) => {
                error!("{err}");
                self.status = Some(err.to_string());
                self.partials = self.synth.spectrum();
            }
        }

        // Rows may have disappeared
        let count = fields(self.synth.voice(self.focus.voice)).len();
        self.focus.index = self.focus.index.min(count - 1);
    }

    /// Build the command for typing into a text field
    fn edit_text(&self, field: Field, edit: impl FnOnce(&mut String)) -> Option<SynthCommand> {
        let voice = self.focus.voice;
        let controls = self.synth.voice(voice).controls();
        match field {
            Field::FrequencyInput => {
                let mut text = controls.frequency_input.clone();
                edit(&mut text);
                Some(SynthCommand::SetFrequencyInput { voice, text })
            }
            Field::Ratio(row) => {
                let mut text = controls.row(row)?.ratio.clone();
                edit(&mut text);
                Some(SynthCommand::SetOvertoneRatio { voice, row, text })
            }
            Field::Multiplier(row) => {
                let mut text = controls.row(row)?.multiplier.clone();
                edit(&mut text);
                Some(SynthCommand::SetOvertoneAmplitude { voice, row, text })
            }
            _ => None,
        }
    }

    /// Build the command for nudging a field left (-1) or right (+1)
    fn adjust(&self, field: Field, direction: f32) -> Option<SynthCommand> {
        let voice = self.focus.voice;
        let controls = self.synth.voice(voice).controls();
        match field {
            Field::FrequencyInput | Field::FrequencySlider => Some(SynthCommand::SetFrequencySlider {
                voice,
                value: controls.frequency_slider + direction * FREQUENCY_STEP,
            }),
            Field::Amplitude => Some(SynthCommand::SetAmplitude {
                voice,
                value: round2(controls.amplitude + direction * AMPLITUDE_STEP),
            }),
            Field::Ratio(row) => {
                let current = parse_number(&controls.row(row)?.ratio).unwrap_or(0.0);
                Some(SynthCommand::SetOvertoneRatio {
                    voice,
                    row,
                    text: format_number(round2(current + direction * RATIO_STEP)),
                })
            }
            Field::Multiplier(row) => {
                let current = parse_number(&controls.row(row)?.multiplier).unwrap_or(0.0);
                Some(SynthCommand::SetOvertoneAmplitude {
                    voice,
                    row,
                    text: format_number(round2(current + direction * MULTIPLIER_STEP)),
                })
            }
            Field::Mute(row) => self.toggle_mute(row),
        }
    }

    fn toggle_mute(&self, row: RowId) -> Option<SynthCommand> {
        let voice = self.focus.voice;
        let muted = self.synth.voice(voice).controls().row(row)?.muted;
        Some(SynthCommand::SetOvertoneMute {
            voice,
            row,
            muted: !muted,
        })
    }
}

fn round2(value: f32) -> f32 {
    (value * 100.0).round() / 100.0
}
