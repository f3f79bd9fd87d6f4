//! Control edits: keep displayed values, voice state and any live nodes in
//! agreement.
//!
//! Every operation updates the voice's controls first. If the voice is
//! sounding, the affected node parameters are then pushed to the engine
//! directly; structural edits (adding or deleting a row) restart the voice.

use log::debug;

use crate::engine::{AudioEngine, EngineError, EngineProvider};

use super::{
    error::SynthError,
    message::{Outcome, SynthCommand},
    state::SynthState,
    voice::{format_number, parse_number, OvertoneRow, RowId, VoiceId},
};

impl<P: EngineProvider> SynthState<P> {
    /// Apply one user command.
    pub fn dispatch(&mut self, command: SynthCommand) -> Result<Outcome, SynthError> {
        match command {
            SynthCommand::PlayVoice(voice) => {
                self.play_voice(voice)?;
                Ok(Outcome::unchanged())
            }
            SynthCommand::StopVoice(voice) => {
                self.stop_voice(voice)?;
                Ok(Outcome::unchanged())
            }
            SynthCommand::SetFrequencyInput { voice, text } => {
                self.set_frequency_input(voice, text)
            }
            SynthCommand::SetFrequencySlider { voice, value } => {
                self.set_frequency_slider(voice, value)
            }
            SynthCommand::SetAmplitude { voice, value } => self.set_amplitude(voice, value),
            SynthCommand::AddOvertone(voice) => self.add_overtone(voice).map(Outcome::row_added),
            SynthCommand::DeleteOvertone { voice, row } => self.delete_overtone(voice, row),
            SynthCommand::SetOvertoneRatio { voice, row, text } => {
                self.set_overtone_ratio(voice, row, text)
            }
            SynthCommand::SetOvertoneAmplitude { voice, row, text } => {
                self.set_overtone_multiplier(voice, row, text)
            }
            SynthCommand::SetOvertoneMute { voice, row, muted } => {
                self.set_overtone_muted(voice, row, muted)
            }
        }
    }

    /// The frequency number input changed.
    ///
    /// The text is always displayed as typed. Only a number above zero is
    /// accepted; it is clamped to `max_frequency` (the display then shows the
    /// clamp value) and copied to the slider.
    pub fn set_frequency_input(
        &mut self,
        voice: VoiceId,
        text: impl Into<String>,
    ) -> Result<Outcome, SynthError> {
        let max = self.config.max_frequency;
        let controls = &mut self.voices[voice.index()].controls;
        controls.frequency_input = text.into();

        let value = match parse_number(&controls.frequency_input) {
            Some(value) if value > 0.0 => value,
            _ => return Ok(Outcome::unchanged()),
        };
        let value = if value > max {
            controls.frequency_input = format_number(max);
            max
        } else {
            value
        };
        controls.frequency_slider = value;

        self.push_frequency(voice, value)?;
        Ok(Outcome::redraw())
    }

    /// The frequency slider moved. Same acceptance rules as the text input;
    /// the input then shows the slider value.
    pub fn set_frequency_slider(&mut self, voice: VoiceId, value: f32) -> Result<Outcome, SynthError> {
        if !value.is_finite() || value <= 0.0 {
            return Ok(Outcome::unchanged());
        }
        let value = value.min(self.config.max_frequency);
        let controls = &mut self.voices[voice.index()].controls;
        controls.frequency_slider = value;
        controls.frequency_input = format_number(value);

        self.push_frequency(voice, value)?;
        Ok(Outcome::redraw())
    }

    /// The amplitude slider moved. Clamped to `0..=max_amplitude`.
    pub fn set_amplitude(&mut self, voice: VoiceId, value: f32) -> Result<Outcome, SynthError> {
        if !value.is_finite() {
            return Ok(Outcome::unchanged());
        }
        let value = value.clamp(0.0, self.config.max_amplitude);
        self.voices[voice.index()].controls.amplitude = value;

        if let Some(gain) = self.voices[voice.index()].fundamental_gain {
            self.live_engine()?.set_gain(gain, value)?;
            self.update_overtone_gains(voice)?;
        }
        Ok(Outcome::redraw())
    }

    /// Recompute every live overtone's gain as `base * multiplier`, or 0 when
    /// muted. Rows whose multiplier does not parse are left as they are.
    pub fn update_overtone_gains(&mut self, voice: VoiceId) -> Result<(), SynthError> {
        let state = &self.voices[voice.index()];
        if !state.is_playing() {
            return Ok(());
        }
        let base = state.controls.amplitude;
        let updates: Vec<_> = state
            .overtones
            .iter()
            .enumerate()
            .filter_map(|(idx, live)| {
                let row = state.controls.row(live.row)?;
                Some((idx, live.gain, row.effective_gain(base)?))
            })
            .collect();

        let engine = self.live_engine()?;
        for &(_, gain, level) in &updates {
            engine.set_gain(gain, level)?;
        }
        let overtones = &mut self.voices[voice.index()].overtones;
        for (idx, ..) in updates {
            overtones[idx].pending_gain = false;
        }
        Ok(())
    }

    /// Recompute every live overtone's frequency as `fundamental * ratio`.
    /// Rows whose ratio does not parse, or whose product overflows, are left
    /// as they are.
    pub fn update_overtone_frequencies(&mut self, voice: VoiceId) -> Result<Outcome, SynthError> {
        let fundamental = self.live_fundamental_frequency(voice);
        if let Some(fundamental) = fundamental {
            self.retune_overtones(voice, fundamental)?;
        }
        Ok(Outcome::redraw())
    }

    /// Append an overtone row with the default ratio and multiplier.
    ///
    /// A sounding voice is restarted to pick it up, which resets every
    /// oscillator's phase.
    pub fn add_overtone(&mut self, voice: VoiceId) -> Result<RowId, SynthError> {
        let row = self.voices[voice.index()].push_row(&self.config);
        debug!("voice {voice}: added overtone {row}");
        self.restart_if_playing(voice)?;
        Ok(row)
    }

    /// Remove an overtone row, restarting the voice if it is sounding.
    pub fn delete_overtone(&mut self, voice: VoiceId, row: RowId) -> Result<Outcome, SynthError> {
        let rows = &mut self.voices[voice.index()].controls.rows;
        let idx = rows
            .iter()
            .position(|r| r.id == row)
            .ok_or(SynthError::UnknownRow { voice, row })?;
        rows.remove(idx);
        debug!("voice {voice}: deleted overtone {row}");

        self.restart_if_playing(voice)?;
        Ok(Outcome::redraw())
    }

    pub fn set_overtone_ratio(
        &mut self,
        voice: VoiceId,
        row: RowId,
        text: impl Into<String>,
    ) -> Result<Outcome, SynthError> {
        self.row_mut(voice, row)?.ratio = text.into();
        self.update_overtone_frequencies(voice)
    }

    pub fn set_overtone_multiplier(
        &mut self,
        voice: VoiceId,
        row: RowId,
        text: impl Into<String>,
    ) -> Result<Outcome, SynthError> {
        self.row_mut(voice, row)?.multiplier = text.into();
        self.update_overtone_gains(voice)?;
        Ok(Outcome::redraw())
    }

    pub fn set_overtone_muted(
        &mut self,
        voice: VoiceId,
        row: RowId,
        muted: bool,
    ) -> Result<Outcome, SynthError> {
        self.row_mut(voice, row)?.muted = muted;
        self.update_overtone_gains(voice)?;
        Ok(Outcome::redraw())
    }

    fn row_mut(&mut self, voice: VoiceId, row: RowId) -> Result<&mut OvertoneRow, SynthError> {
        self.voices[voice.index()]
            .controls
            .row_mut(row)
            .ok_or(SynthError::UnknownRow { voice, row })
    }

    /// Rebuild a sounding voice. If its frequency input no longer holds a
    /// valid number the voice is stopped instead, so the live overtones never
    /// fall out of step with the rows.
    fn restart_if_playing(&mut self, voice: VoiceId) -> Result<(), SynthError> {
        if !self.is_voice_playing(voice) {
            return Ok(());
        }
        match self.play_voice(voice) {
            Err(err @ SynthError::InvalidFrequency { .. }) => {
                self.stop_voice(voice)?;
                Err(err)
            }
            result => result,
        }
    }

    /// Move a sounding voice's fundamental and overtones to `frequency`.
    fn push_frequency(&mut self, voice: VoiceId, frequency: f32) -> Result<(), SynthError> {
        let Some(osc) = self.voices[voice.index()].fundamental_osc else {
            return Ok(());
        };
        self.live_engine()?.set_frequency(osc, frequency)?;
        self.retune_overtones(voice, frequency)
    }

    /// Retune every overtone whose row evaluates. An overtone that was built
    /// silent also gets its gain once its row is fully valid.
    fn retune_overtones(&mut self, voice: VoiceId, fundamental: f32) -> Result<(), SynthError> {
        let state = &self.voices[voice.index()];
        let base = state.controls.amplitude;
        let updates: Vec<_> = state
            .overtones
            .iter()
            .enumerate()
            .filter_map(|(idx, live)| {
                let row = state.controls.row(live.row)?;
                let hz = row.frequency(fundamental)?;
                let level = live.pending_gain.then(|| row.effective_gain(base)).flatten();
                Some((idx, live.oscillator, hz, live.gain, level))
            })
            .collect();

        let engine = self.live_engine()?;
        for &(_, osc, hz, gain, level) in &updates {
            engine.set_frequency(osc, hz)?;
            if let Some(level) = level {
                engine.set_gain(gain, level)?;
            }
        }
        let overtones = &mut self.voices[voice.index()].overtones;
        for (idx, .., level) in updates {
            if level.is_some() {
                overtones[idx].pending_gain = false;
            }
        }
        Ok(())
    }

    /// Frequency the voice's fundamental is actually playing at.
    fn live_fundamental_frequency(&self, voice: VoiceId) -> Option<f32> {
        let osc = self.voices[voice.index()].fundamental_osc?;
        self.engine.as_ref()?.graph().frequency(osc)
    }

    /// The engine a sounding voice lives in.
    fn live_engine(&mut self) -> Result<&mut P::Engine, SynthError> {
        self.engine
            .as_mut()
            .filter(|engine| !engine.is_closed())
            .ok_or(SynthError::Engine(EngineError::Closed))
    }
}
