//! Voice lifecycle against the shared engine: open the engine lazily, build a
//! voice's oscillator/gain pairs on play, and tear them down on stop.

use log::{debug, info, warn};

use crate::{
    config::{OvertoneGain, SynthConfig},
    engine::{AudioEngine, EngineError, EngineProvider},
    graph::Target,
};

use super::{
    error::SynthError,
    spectrum::{partials, Partial},
    voice::{parse_number, LiveOvertone, OvertoneRow, Voice, VoiceId},
};

/// Both voices plus the engine they share.
///
/// The engine is opened through `provider` the first time a voice plays and
/// reused from then on, unless it has been closed.
pub struct SynthState<P: EngineProvider> {
    pub(crate) voices: [Voice; 2],
    pub(crate) engine: Option<P::Engine>,
    provider: P,
    pub(crate) config: SynthConfig,
}

impl<P: EngineProvider> SynthState<P> {
    pub fn new(provider: P, config: SynthConfig) -> Self {
        let voices = VoiceId::ALL.map(|id| Voice::new(id, &config));
        Self {
            voices,
            engine: None,
            provider,
            config,
        }
    }

    pub fn config(&self) -> &SynthConfig {
        &self.config
    }

    pub fn voice(&self, id: VoiceId) -> &Voice {
        &self.voices[id.index()]
    }

    pub fn voices(&self) -> &[Voice; 2] {
        &self.voices
    }

    pub fn engine(&self) -> Option<&P::Engine> {
        self.engine.as_ref()
    }

    pub fn engine_mut(&mut self) -> Option<&mut P::Engine> {
        self.engine.as_mut()
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Partials of both voices, as currently configured.
    pub fn spectrum(&self) -> Vec<Partial> {
        self.voices
            .iter()
            .flat_map(|voice| partials(voice, &self.config))
            .collect()
    }

    /// Return the shared engine, opening it if there is none or it was closed.
    pub fn ensure_engine(&mut self) -> Result<&mut P::Engine, SynthError> {
        open_engine(&mut self.engine, &mut self.provider, &mut self.voices)
    }

    /// Stop both voices and close the engine. The next play reopens it.
    ///
    /// The engine is closed even if releasing a voice failed; the first such
    /// error is returned.
    pub fn close_engine(&mut self) -> Result<(), SynthError> {
        let mut result = Ok(());
        for id in VoiceId::ALL {
            if let Err(err) = self.stop_voice(id) {
                result = result.and(Err(err));
            }
        }
        if let Some(engine) = self.engine.as_mut() {
            engine.close();
        }
        // Whatever was still held died with the engine.
        for voice in self.voices.iter_mut() {
            voice.clear_live();
        }
        result
    }

    pub fn is_voice_playing(&self, id: VoiceId) -> bool {
        self.voice(id).is_playing()
    }

    /// Silence a voice and release its nodes. Does nothing if it is not
    /// sounding.
    ///
    /// A handle is only forgotten once the engine accepted the commands that
    /// release it. If some were refused (a full command queue), the voice
    /// keeps the rest and stays playing; calling `stop_voice` again finishes
    /// the job, since commands on already released nodes are no-ops. With no
    /// open engine the handles are simply dropped.
    pub fn stop_voice(&mut self, id: VoiceId) -> Result<(), SynthError> {
        let voice = &mut self.voices[id.index()];
        let Some(osc) = voice.fundamental_osc else {
            return Ok(());
        };
        let Some(engine) = self.engine.as_mut().filter(|engine| !engine.is_closed()) else {
            voice.clear_live();
            return Ok(());
        };

        let mut failure: Option<EngineError> = None;
        let mut record = |result: Result<(), EngineError>| match result {
            Ok(()) => true,
            Err(err) => {
                failure.get_or_insert(err);
                false
            }
        };

        record(engine.stop(osc));
        record(engine.disconnect(osc));
        // A stopped oscillator is inert, only its gain needs disconnecting.
        let before = voice.overtones.len();
        voice.overtones.retain(|overtone| {
            let released =
                record(engine.stop(overtone.oscillator)) & record(engine.disconnect(overtone.gain));
            !released
        });
        let released = before - voice.overtones.len();
        if let Some(gain) = voice.fundamental_gain {
            record(engine.disconnect(gain));
        }

        if let Some(err) = failure {
            warn!(
                "voice {id}: stop incomplete, {} overtones still held: {err}",
                voice.overtones.len()
            );
            return Err(err.into());
        }
        voice.clear_live();
        debug!("voice {id} stopped ({released} overtones released)");
        Ok(())
    }

    /// Start a voice from its current controls, replacing whatever it was
    /// playing.
    ///
    /// Fails with `SynthError::InvalidFrequency`, without touching the engine,
    /// if the frequency input is not a number above zero.
    pub fn play_voice(&mut self, id: VoiceId) -> Result<(), SynthError> {
        let controls = &self.voices[id.index()].controls;
        let frequency = match parse_number(&controls.frequency_input) {
            Some(frequency) if frequency > 0.0 => frequency,
            _ => {
                warn!(
                    "voice {id}: refusing to play invalid frequency {:?}",
                    controls.frequency_input
                );
                return Err(SynthError::InvalidFrequency { voice: id });
            }
        };
        let amplitude = controls.amplitude;

        self.ensure_engine()?;
        self.stop_voice(id)?;

        let engine = open_engine(&mut self.engine, &mut self.provider, &mut self.voices)?;
        let voice = &mut self.voices[id.index()];
        if let Err(err) = build_voice(engine, voice, &self.config, frequency, amplitude) {
            // Release whatever was built before the failure.
            if let Err(release) = self.stop_voice(id) {
                warn!("voice {id}: partial build not fully released: {release}");
            }
            return Err(err.into());
        }

        debug!(
            "voice {id} playing {frequency} Hz at {amplitude} with {} overtones",
            self.voices[id.index()].overtones.len()
        );
        Ok(())
    }
}

fn open_engine<'a, P: EngineProvider>(
    slot: &'a mut Option<P::Engine>,
    provider: &mut P,
    voices: &mut [Voice; 2],
) -> Result<&'a mut P::Engine, SynthError> {
    if slot.as_ref().map_or(true, |engine| engine.is_closed()) {
        if slot.is_some() {
            info!("audio engine was closed, reopening");
        }
        // Handles into a previous engine mean nothing to the new one.
        for voice in voices.iter_mut() {
            voice.clear_live();
        }
        *slot = Some(provider.open()?);
    }
    slot.as_mut().ok_or(SynthError::Engine(EngineError::Closed))
}

/// Create, wire and start the fundamental and one pair per overtone row.
///
/// Handles are recorded on the voice as soon as they exist, so a failed build
/// can be torn down with `stop_voice`.
fn build_voice<E: AudioEngine>(
    engine: &mut E,
    voice: &mut Voice,
    config: &SynthConfig,
    frequency: f32,
    amplitude: f32,
) -> Result<(), EngineError> {
    let osc = engine.create_oscillator(config.waveform)?;
    voice.fundamental_osc = Some(osc);
    let gain = engine.create_gain()?;
    voice.fundamental_gain = Some(gain);

    engine.set_frequency(osc, frequency)?;
    engine.set_gain(gain, amplitude)?;
    engine.connect(osc, Target::Node(gain))?;
    engine.connect(gain, Target::Destination)?;
    engine.start(osc)?;

    for row in &voice.controls.rows {
        let osc = engine.create_oscillator(config.waveform)?;
        let gain = match engine.create_gain() {
            Ok(gain) => gain,
            Err(err) => {
                let _ = engine.stop(osc);
                return Err(err);
            }
        };
        let (hz, level) = creation_params(row, frequency, amplitude, config.overtone_gain);
        voice.overtones.push(LiveOvertone {
            row: row.id,
            oscillator: osc,
            gain,
            pending_gain: level.is_none(),
        });

        engine.set_frequency(osc, hz)?;
        engine.set_gain(gain, level.unwrap_or(0.0))?;
        engine.connect(osc, Target::Node(gain))?;
        engine.connect(gain, Target::Destination)?;
        engine.start(osc)?;
    }

    Ok(())
}

/// Frequency and gain of a freshly built overtone.
///
/// A row whose ratio cannot be evaluated plays at the fundamental frequency.
/// The gain is `None` when the row cannot be evaluated at all (ratio or
/// multiplier malformed, or an overflowing product); such an overtone is
/// built silent and picks up its gain from the next valid edit.
fn creation_params(
    row: &OvertoneRow,
    frequency: f32,
    amplitude: f32,
    policy: OvertoneGain,
) -> (f32, Option<f32>) {
    let Some(hz) = row.frequency(frequency) else {
        return (frequency, None);
    };
    let level = match policy {
        OvertoneGain::AsEntered if row.muted => row.multiplier_value().map(|_| 0.0),
        OvertoneGain::AsEntered => row.multiplier_value(),
        OvertoneGain::Scaled => row.effective_gain(amplitude),
    };
    (hz, level)
}
