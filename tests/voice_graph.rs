use overtone::{
    engine::{AudioEngine, EngineError, EngineProvider, EngineState, OfflineEngine, OfflineProvider},
    graph::{GraphCommand, SignalGraph},
    synth::{SynthCommand, SynthError, SynthState, VoiceId},
    EngineConfig, OvertoneGain, SynthConfig,
};

fn synth() -> SynthState<OfflineProvider> {
    SynthState::new(OfflineProvider::default(), SynthConfig::default())
}

fn synth_with(config: SynthConfig) -> SynthState<OfflineProvider> {
    SynthState::new(
        OfflineProvider::new(48_000.0, config.engine.clone()),
        config,
    )
}

fn engine(state: &SynthState<OfflineProvider>) -> &OfflineEngine {
    state.engine().expect("engine should be open")
}

fn fundamental_frequency(state: &SynthState<OfflineProvider>, voice: VoiceId) -> Option<f32> {
    let osc = state.voice(voice).fundamental_oscillator()?;
    engine(state).graph().frequency(osc)
}

fn overtone_frequency(state: &SynthState<OfflineProvider>, voice: VoiceId, idx: usize) -> Option<f32> {
    let live = state.voice(voice).overtones().get(idx)?;
    engine(state).graph().frequency(live.oscillator)
}

fn overtone_gain(state: &SynthState<OfflineProvider>, voice: VoiceId, idx: usize) -> Option<f32> {
    let live = state.voice(voice).overtones().get(idx)?;
    engine(state).graph().gain(live.gain)
}

fn peak(buffer: &[f32]) -> f32 {
    buffer.iter().fold(0.0f32, |acc, s| acc.max(s.abs()))
}

fn approx(a: f32, b: f32) -> bool {
    (a - b).abs() < 1e-5
}

#[test]
fn stop_is_idempotent() {
    for voice in VoiceId::ALL {
        let mut state = synth();
        state.play_voice(voice).unwrap();
        assert!(state.is_voice_playing(voice));

        state.stop_voice(voice).unwrap();
        state.stop_voice(voice).unwrap();
        assert!(!state.is_voice_playing(voice));
        assert!(engine(&state).graph().is_empty());
    }
}

#[test]
fn stop_on_fresh_state_does_not_open_engine() {
    let mut state = synth();
    state.stop_voice(VoiceId::One).unwrap();
    assert!(state.engine().is_none());
    assert_eq!(state.provider().opened(), 0);
}

#[test]
fn play_sets_fundamental_frequency_and_amplitude() {
    let mut state = synth();
    state.set_frequency_input(VoiceId::Two, "330").unwrap();
    state.set_amplitude(VoiceId::Two, 0.25).unwrap();
    state.play_voice(VoiceId::Two).unwrap();

    assert!(state.is_voice_playing(VoiceId::Two));
    assert!(!state.is_voice_playing(VoiceId::One));
    assert_eq!(fundamental_frequency(&state, VoiceId::Two), Some(330.0));

    let gain = state.voice(VoiceId::Two).fundamental_gain().unwrap();
    assert_eq!(engine(&state).graph().gain(gain), Some(0.25));
}

#[test]
fn invalid_frequency_blocks_play() {
    for text in ["abc", "-5", "0", ""] {
        let mut state = synth();
        state.set_frequency_input(VoiceId::One, text).unwrap();

        let err = state.play_voice(VoiceId::One).unwrap_err();
        assert_eq!(err, SynthError::InvalidFrequency { voice: VoiceId::One });
        assert!(err.is_user_facing());
        assert_eq!(
            err.to_string(),
            "Please enter a valid frequency above 0 Hz for Voice 1."
        );
        assert!(!state.is_voice_playing(VoiceId::One));
        assert!(state.engine().is_none(), "no engine for input {text:?}");
    }
}

#[test]
fn invalid_frequency_while_playing_leaves_voice_untouched() {
    let mut state = synth();
    state.play_voice(VoiceId::One).unwrap();
    let nodes = engine(&state).graph().len();

    state.set_frequency_input(VoiceId::One, "abc").unwrap();
    assert!(state.play_voice(VoiceId::One).is_err());
    assert!(state.is_voice_playing(VoiceId::One));
    assert_eq!(engine(&state).graph().len(), nodes);
    assert_eq!(fundamental_frequency(&state, VoiceId::One), Some(440.0));
}

#[test]
fn replay_keeps_one_graph_per_voice() {
    let mut state = synth();
    state.add_overtone(VoiceId::One).unwrap();
    state.play_voice(VoiceId::One).unwrap();
    state.play_voice(VoiceId::One).unwrap();
    state.play_voice(VoiceId::One).unwrap();

    // fundamental pair + one overtone pair
    assert_eq!(engine(&state).graph().len(), 4);
    assert_eq!(engine(&state).graph().running_oscillators(), 2);
}

#[test]
fn engine_is_shared_between_voices() {
    let mut state = synth();
    state.play_voice(VoiceId::One).unwrap();
    state.play_voice(VoiceId::Two).unwrap();
    state.stop_voice(VoiceId::One).unwrap();
    state.play_voice(VoiceId::One).unwrap();

    assert_eq!(state.provider().opened(), 1);
    assert_eq!(engine(&state).graph().running_oscillators(), 2);
}

#[test]
fn closed_engine_is_reopened() {
    let mut state = synth();
    state.play_voice(VoiceId::One).unwrap();
    state.close_engine().unwrap();
    assert!(!state.is_voice_playing(VoiceId::One));
    assert!(engine(&state).is_closed());

    state.play_voice(VoiceId::Two).unwrap();
    assert_eq!(state.provider().opened(), 2);
    assert!(!engine(&state).is_closed());
    assert_eq!(fundamental_frequency(&state, VoiceId::Two), Some(440.0));
}

#[test]
fn added_overtone_on_sounding_voice_tracks_ratio() {
    let mut state = synth();
    state.play_voice(VoiceId::One).unwrap();

    let row = state.add_overtone(VoiceId::One).unwrap();
    assert_eq!(state.voice(VoiceId::One).overtones().len(), 1);
    assert_eq!(overtone_frequency(&state, VoiceId::One, 0), Some(440.0));

    state.set_overtone_ratio(VoiceId::One, row, "1.5").unwrap();
    assert_eq!(overtone_frequency(&state, VoiceId::One, 0), Some(660.0));

    // Bad ratios are ignored
    state.set_overtone_ratio(VoiceId::One, row, "x").unwrap();
    assert_eq!(overtone_frequency(&state, VoiceId::One, 0), Some(660.0));
}

#[test]
fn adding_to_silent_voice_only_requests_redraw() {
    let mut state = synth();
    let outcome = state.dispatch(SynthCommand::AddOvertone(VoiceId::Two)).unwrap();
    assert!(outcome.redraw_spectrum);
    assert!(outcome.created_row.is_some());
    assert!(state.engine().is_none());
    assert_eq!(state.voice(VoiceId::Two).controls().rows.len(), 1);
}

#[test]
fn mute_round_trip_restores_scaled_gain() {
    let mut state = synth();
    state.set_amplitude(VoiceId::One, 0.5).unwrap();
    let row = state.add_overtone(VoiceId::One).unwrap();
    state.set_overtone_multiplier(VoiceId::One, row, "0.8").unwrap();
    state.play_voice(VoiceId::One).unwrap();

    state.set_overtone_muted(VoiceId::One, row, true).unwrap();
    assert_eq!(overtone_gain(&state, VoiceId::One, 0), Some(0.0));

    state.set_overtone_muted(VoiceId::One, row, false).unwrap();
    assert!(approx(overtone_gain(&state, VoiceId::One, 0).unwrap(), 0.4));
}

#[test]
fn frequency_input_clamps_to_max() {
    let mut state = synth();
    state.play_voice(VoiceId::One).unwrap();
    state.set_frequency_input(VoiceId::One, "5000").unwrap();

    let controls = state.voice(VoiceId::One).controls();
    assert_eq!(controls.frequency_input, "2000");
    assert_eq!(controls.frequency_slider, 2000.0);
    assert_eq!(fundamental_frequency(&state, VoiceId::One), Some(2000.0));
}

#[test]
fn frequency_slider_clamps_and_syncs_input() {
    let mut state = synth();
    state.set_frequency_slider(VoiceId::Two, 2500.0).unwrap();
    let controls = state.voice(VoiceId::Two).controls();
    assert_eq!(controls.frequency_slider, 2000.0);
    assert_eq!(controls.frequency_input, "2000");

    state.set_frequency_slider(VoiceId::Two, 123.5).unwrap();
    assert_eq!(state.voice(VoiceId::Two).controls().frequency_input, "123.5");
}

#[test]
fn rejected_frequency_edits_keep_text_but_not_value() {
    let mut state = synth();
    state.play_voice(VoiceId::One).unwrap();

    let outcome = state.set_frequency_input(VoiceId::One, "-20").unwrap();
    assert!(!outcome.redraw_spectrum);

    let controls = state.voice(VoiceId::One).controls();
    assert_eq!(controls.frequency_input, "-20");
    assert_eq!(controls.frequency_slider, 440.0);
    assert_eq!(fundamental_frequency(&state, VoiceId::One), Some(440.0));

    state.set_frequency_slider(VoiceId::One, 0.0).unwrap();
    assert_eq!(fundamental_frequency(&state, VoiceId::One), Some(440.0));
}

#[test]
fn frequency_change_retunes_overtones() {
    let mut state = synth();
    let row = state.add_overtone(VoiceId::Two).unwrap();
    state.set_overtone_ratio(VoiceId::Two, row, "3").unwrap();
    state.play_voice(VoiceId::Two).unwrap();
    assert_eq!(overtone_frequency(&state, VoiceId::Two, 0), Some(1320.0));

    state.set_frequency_input(VoiceId::Two, "200").unwrap();
    assert_eq!(fundamental_frequency(&state, VoiceId::Two), Some(200.0));
    assert_eq!(overtone_frequency(&state, VoiceId::Two, 0), Some(600.0));

    state.set_frequency_slider(VoiceId::Two, 100.0).unwrap();
    assert_eq!(overtone_frequency(&state, VoiceId::Two, 0), Some(300.0));
}

#[test]
fn amplitude_change_rescales_overtones() {
    let mut state = synth();
    let row = state.add_overtone(VoiceId::One).unwrap();
    state.set_overtone_multiplier(VoiceId::One, row, "0.5").unwrap();
    state.play_voice(VoiceId::One).unwrap();

    state.set_amplitude(VoiceId::One, 0.8).unwrap();
    let gain = state.voice(VoiceId::One).fundamental_gain().unwrap();
    assert_eq!(engine(&state).graph().gain(gain), Some(0.8));
    assert!(approx(overtone_gain(&state, VoiceId::One, 0).unwrap(), 0.4));

    state.set_amplitude(VoiceId::One, 3.0).unwrap();
    assert_eq!(state.voice(VoiceId::One).controls().amplitude, 1.0);
}

#[test]
fn scenario_as_entered_creation_gain() {
    let mut state = synth();
    state.set_frequency_input(VoiceId::One, "440").unwrap();
    state.set_amplitude(VoiceId::One, 0.5).unwrap();
    state.play_voice(VoiceId::One).unwrap();

    let row = state.add_overtone(VoiceId::One).unwrap();
    state.set_overtone_ratio(VoiceId::One, row, "2.0").unwrap();
    state.set_overtone_multiplier(VoiceId::One, row, "0.8").unwrap();
    // Restart rebuilds the overtone through the creation path
    state.play_voice(VoiceId::One).unwrap();

    assert_eq!(fundamental_frequency(&state, VoiceId::One), Some(440.0));
    assert_eq!(overtone_frequency(&state, VoiceId::One, 0), Some(880.0));
    assert!(approx(overtone_gain(&state, VoiceId::One, 0).unwrap(), 0.8));
}

#[test]
fn scenario_scaled_creation_gain() {
    let mut state = synth_with(SynthConfig {
        overtone_gain: OvertoneGain::Scaled,
        ..SynthConfig::default()
    });
    state.set_amplitude(VoiceId::One, 0.5).unwrap();
    let row = state.add_overtone(VoiceId::One).unwrap();
    state.set_overtone_ratio(VoiceId::One, row, "2.0").unwrap();
    state.set_overtone_multiplier(VoiceId::One, row, "0.8").unwrap();
    state.play_voice(VoiceId::One).unwrap();

    assert_eq!(overtone_frequency(&state, VoiceId::One, 0), Some(880.0));
    assert!(approx(overtone_gain(&state, VoiceId::One, 0).unwrap(), 0.4));
}

#[test]
fn malformed_row_is_built_silent() {
    let mut state = synth();
    let row = state.add_overtone(VoiceId::One).unwrap();
    state.set_overtone_ratio(VoiceId::One, row, "two").unwrap();
    state.play_voice(VoiceId::One).unwrap();

    assert_eq!(overtone_frequency(&state, VoiceId::One, 0), Some(440.0));
    assert_eq!(overtone_gain(&state, VoiceId::One, 0), Some(0.0));
}

#[test]
fn delete_overtone_restarts_sounding_voice() {
    let mut state = synth();
    let first = state.add_overtone(VoiceId::One).unwrap();
    let second = state.add_overtone(VoiceId::One).unwrap();
    state.set_overtone_ratio(VoiceId::One, second, "4").unwrap();
    state.play_voice(VoiceId::One).unwrap();
    assert_eq!(state.voice(VoiceId::One).overtones().len(), 2);

    state
        .dispatch(SynthCommand::DeleteOvertone {
            voice: VoiceId::One,
            row: first,
        })
        .unwrap();
    let voice = state.voice(VoiceId::One);
    assert_eq!(voice.overtones().len(), 1);
    assert_eq!(voice.overtones()[0].row, second);
    assert_eq!(overtone_frequency(&state, VoiceId::One, 0), Some(1760.0));
    assert_eq!(engine(&state).graph().len(), 4);

    assert_eq!(
        state.delete_overtone(VoiceId::One, first),
        Err(SynthError::UnknownRow {
            voice: VoiceId::One,
            row: first
        })
    );
}

#[test]
fn restart_with_bad_input_stops_voice() {
    let mut state = synth();
    state.play_voice(VoiceId::One).unwrap();
    state.set_frequency_input(VoiceId::One, "abc").unwrap();

    let err = state.add_overtone(VoiceId::One).unwrap_err();
    assert!(err.is_user_facing());
    assert!(!state.is_voice_playing(VoiceId::One));
    assert_eq!(state.voice(VoiceId::One).controls().rows.len(), 1);
}

#[test]
fn full_graph_leaves_voice_stopped() {
    let mut state = synth_with(SynthConfig {
        engine: EngineConfig {
            max_nodes: 3,
            ..EngineConfig::default()
        },
        ..SynthConfig::default()
    });
    state.add_overtone(VoiceId::One).unwrap();

    assert!(matches!(
        state.play_voice(VoiceId::One),
        Err(SynthError::Engine(_))
    ));
    assert!(!state.is_voice_playing(VoiceId::One));
    assert!(engine(&state).graph().is_empty());
}

#[test]
fn rendered_output_follows_voice_state() {
    let mut state = synth();
    state.set_frequency_input(VoiceId::One, "1000").unwrap();
    state.set_amplitude(VoiceId::One, 0.5).unwrap();
    state.play_voice(VoiceId::One).unwrap();

    let mut out = vec![0.0f32; 4_800];
    state.engine_mut().unwrap().render(&mut out);
    assert!((peak(&out) - 0.5).abs() < 1e-3);

    state.stop_voice(VoiceId::One).unwrap();
    state.engine_mut().unwrap().render(&mut out);
    assert_eq!(peak(&out), 0.0);
}

#[test]
fn muted_overtone_is_not_heard() {
    let mut state = synth();
    state.set_amplitude(VoiceId::One, 0.0).unwrap();
    let row = state.add_overtone(VoiceId::One).unwrap();
    state.set_overtone_muted(VoiceId::One, row, true).unwrap();
    state.play_voice(VoiceId::One).unwrap();

    let mut out = vec![0.0f32; 1_024];
    state.engine_mut().unwrap().render(&mut out);
    assert_eq!(peak(&out), 0.0);
}

#[test]
fn spectrum_lists_both_voices() {
    let mut state = synth();
    let row = state.add_overtone(VoiceId::Two).unwrap();
    state.set_overtone_ratio(VoiceId::Two, row, "2").unwrap();

    let spectrum = state.spectrum();
    assert_eq!(spectrum.len(), 3);
    assert_eq!(spectrum[0].voice, VoiceId::One);
    assert_eq!(spectrum[2].voice, VoiceId::Two);
    assert_eq!(spectrum[2].frequency, 880.0);
}

#[test]
fn ratio_fixed_after_restart_restores_gain() {
    let mut state = synth();
    state.play_voice(VoiceId::One).unwrap();
    let row = state.add_overtone(VoiceId::One).unwrap();

    // Mid-edit text, then a restart rebuilds the row while it is unparseable
    state.set_overtone_ratio(VoiceId::One, row, "").unwrap();
    let other = state.add_overtone(VoiceId::One).unwrap();
    state.delete_overtone(VoiceId::One, other).unwrap();
    assert_eq!(overtone_gain(&state, VoiceId::One, 0), Some(0.0));

    state.set_overtone_ratio(VoiceId::One, row, "2").unwrap();
    assert_eq!(overtone_frequency(&state, VoiceId::One, 0), Some(880.0));
    assert!(approx(overtone_gain(&state, VoiceId::One, 0).unwrap(), 0.5));
}

#[test]
fn multiplier_fixed_while_sounding_restores_gain() {
    let mut state = synth();
    let row = state.add_overtone(VoiceId::One).unwrap();
    state.set_overtone_multiplier(VoiceId::One, row, "x").unwrap();
    state.play_voice(VoiceId::One).unwrap();
    assert_eq!(overtone_gain(&state, VoiceId::One, 0), Some(0.0));

    let outcome = state
        .dispatch(SynthCommand::SetOvertoneAmplitude {
            voice: VoiceId::One,
            row,
            text: "0.6".into(),
        })
        .unwrap();
    assert!(outcome.redraw_spectrum);
    assert!(approx(overtone_gain(&state, VoiceId::One, 0).unwrap(), 0.3));
}

#[test]
fn overflowing_ratio_is_built_silent() {
    let mut state = synth();
    let row = state.add_overtone(VoiceId::One).unwrap();
    state.set_overtone_ratio(VoiceId::One, row, "1e38").unwrap();

    state.play_voice(VoiceId::One).unwrap();
    assert!(state.is_voice_playing(VoiceId::One));
    assert_eq!(overtone_frequency(&state, VoiceId::One, 0), Some(440.0));
    assert_eq!(overtone_gain(&state, VoiceId::One, 0), Some(0.0));
    assert_eq!(state.spectrum().len(), 2);

    state.set_overtone_ratio(VoiceId::One, row, "3").unwrap();
    assert_eq!(overtone_frequency(&state, VoiceId::One, 0), Some(1320.0));
    assert!(approx(overtone_gain(&state, VoiceId::One, 0).unwrap(), 0.5));
}

#[test]
fn dispatch_slider_retunes_and_syncs_input() {
    let mut state = synth();
    let row = state.add_overtone(VoiceId::Two).unwrap();
    state.set_overtone_ratio(VoiceId::Two, row, "2").unwrap();
    state.play_voice(VoiceId::Two).unwrap();

    let outcome = state
        .dispatch(SynthCommand::SetFrequencySlider {
            voice: VoiceId::Two,
            value: 300.0,
        })
        .unwrap();
    assert!(outcome.redraw_spectrum);
    assert_eq!(state.voice(VoiceId::Two).controls().frequency_input, "300");
    assert_eq!(fundamental_frequency(&state, VoiceId::Two), Some(300.0));
    assert_eq!(overtone_frequency(&state, VoiceId::Two, 0), Some(600.0));
}

#[test]
fn dispatch_amplitude_rescales_voice() {
    let mut state = synth();
    let row = state.add_overtone(VoiceId::One).unwrap();
    state.set_overtone_multiplier(VoiceId::One, row, "0.5").unwrap();
    state.play_voice(VoiceId::One).unwrap();

    let outcome = state
        .dispatch(SynthCommand::SetAmplitude {
            voice: VoiceId::One,
            value: 0.6,
        })
        .unwrap();
    assert!(outcome.redraw_spectrum);
    let gain = state.voice(VoiceId::One).fundamental_gain().unwrap();
    assert_eq!(engine(&state).graph().gain(gain), Some(0.6));
    assert!(approx(overtone_gain(&state, VoiceId::One, 0).unwrap(), 0.3));
}

#[test]
fn dispatch_mute_toggles_overtone_gain() {
    let mut state = synth();
    let row = state.add_overtone(VoiceId::One).unwrap();
    state.set_overtone_multiplier(VoiceId::One, row, "0.4").unwrap();
    state.play_voice(VoiceId::One).unwrap();

    let mute = |muted| SynthCommand::SetOvertoneMute {
        voice: VoiceId::One,
        row,
        muted,
    };
    assert!(state.dispatch(mute(true)).unwrap().redraw_spectrum);
    assert_eq!(overtone_gain(&state, VoiceId::One, 0), Some(0.0));
    assert!(state.voice(VoiceId::One).controls().rows[0].muted);

    state.dispatch(mute(false)).unwrap();
    assert!(approx(overtone_gain(&state, VoiceId::One, 0).unwrap(), 0.2));
}

/// Offline engine whose command queue can be made to refuse everything,
/// the way a full realtime ring does.
struct RefusingEngine {
    inner: OfflineEngine,
    refuse: bool,
}

impl AudioEngine for RefusingEngine {
    fn state(&self) -> EngineState {
        self.inner.state()
    }

    fn current_time(&self) -> f64 {
        self.inner.current_time()
    }

    fn graph(&self) -> &SignalGraph {
        self.inner.graph()
    }

    fn apply(&mut self, command: GraphCommand) -> Result<(), EngineError> {
        if self.refuse {
            return Err(EngineError::QueueFull);
        }
        self.inner.apply(command)
    }

    fn close(&mut self) {
        self.inner.close()
    }
}

#[derive(Default)]
struct RefusingProvider(OfflineProvider);

impl EngineProvider for RefusingProvider {
    type Engine = RefusingEngine;

    fn open(&mut self) -> Result<RefusingEngine, EngineError> {
        Ok(RefusingEngine {
            inner: self.0.open()?,
            refuse: false,
        })
    }
}

fn refusing_synth() -> SynthState<RefusingProvider> {
    SynthState::new(RefusingProvider::default(), SynthConfig::default())
}

#[test]
fn refused_stop_keeps_handles_until_retried() {
    let mut state = refusing_synth();
    state.add_overtone(VoiceId::One).unwrap();
    state.play_voice(VoiceId::One).unwrap();
    state.engine_mut().unwrap().refuse = true;

    assert_eq!(
        state.stop_voice(VoiceId::One),
        Err(SynthError::Engine(EngineError::QueueFull))
    );
    assert!(state.is_voice_playing(VoiceId::One));
    assert_eq!(state.voice(VoiceId::One).overtones().len(), 1);
    assert_eq!(state.engine().unwrap().graph().running_oscillators(), 2);

    state.engine_mut().unwrap().refuse = false;
    state.stop_voice(VoiceId::One).unwrap();
    assert!(!state.is_voice_playing(VoiceId::One));
    assert!(state.voice(VoiceId::One).overtones().is_empty());
    assert!(state.engine().unwrap().graph().is_empty());
}

#[test]
fn close_engine_closes_even_when_stop_is_refused() {
    let mut state = refusing_synth();
    state.play_voice(VoiceId::One).unwrap();
    state.play_voice(VoiceId::Two).unwrap();
    state.engine_mut().unwrap().refuse = true;

    assert!(state.close_engine().is_err());
    assert!(state.engine().unwrap().is_closed());
    assert!(!state.is_voice_playing(VoiceId::One));
    assert!(!state.is_voice_playing(VoiceId::Two));

    state.play_voice(VoiceId::One).unwrap();
    assert_eq!(state.provider().0.opened(), 2);
    assert!(state.is_voice_playing(VoiceId::One));
}
