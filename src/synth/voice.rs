use std::fmt;

use crate::{config::SynthConfig, graph::NodeId};

/// One of the two independent voices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VoiceId {
    One,
    Two,
}

impl VoiceId {
    pub const ALL: [VoiceId; 2] = [VoiceId::One, VoiceId::Two];

    /// The user-facing voice number (1 or 2).
    pub fn number(self) -> u8 {
        match self {
            VoiceId::One => 1,
            VoiceId::Two => 2,
        }
    }

    pub(crate) fn index(self) -> usize {
        self.number() as usize - 1
    }
}

impl fmt::Display for VoiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.number())
    }
}

/// Identifies an overtone row within its voice. Never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RowId(pub(crate) u32);

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "row {}", self.0)
    }
}

/// The controls of one overtone row, as the user last entered them.
///
/// Ratio and multiplier are kept as text: what the user typed is what gets
/// displayed, even when it does not parse.
#[derive(Debug, Clone, PartialEq)]
pub struct OvertoneRow {
    pub id: RowId,
    pub ratio: String,
    pub multiplier: String,
    pub muted: bool,
}

impl OvertoneRow {
    pub fn ratio_value(&self) -> Option<f32> {
        parse_number(&self.ratio)
    }

    pub fn multiplier_value(&self) -> Option<f32> {
        parse_number(&self.multiplier)
    }

    /// `fundamental * ratio`, or `None` if the ratio does not parse or the
    /// product is not finite.
    pub fn frequency(&self, fundamental: f32) -> Option<f32> {
        Some(fundamental * self.ratio_value()?).filter(|hz| hz.is_finite())
    }

    /// `muted ? 0 : base * multiplier`, or `None` if the multiplier does not
    /// parse or the product is not finite.
    pub fn effective_gain(&self, base_amplitude: f32) -> Option<f32> {
        let multiplier = self.multiplier_value()?;
        if self.muted {
            return Some(0.0);
        }
        Some(base_amplitude * multiplier).filter(|gain| gain.is_finite())
    }
}

/// Everything the user can see and edit for one voice.
#[derive(Debug, Clone, PartialEq)]
pub struct VoiceControls {
    /// Frequency number input, exactly as displayed.
    pub frequency_input: String,
    pub frequency_slider: f32,
    pub amplitude: f32,
    pub rows: Vec<OvertoneRow>,
}

impl VoiceControls {
    pub fn new(config: &SynthConfig) -> Self {
        Self {
            frequency_input: format_number(config.default_frequency),
            frequency_slider: config.default_frequency,
            amplitude: config.default_amplitude,
            rows: Vec::new(),
        }
    }

    pub fn row(&self, id: RowId) -> Option<&OvertoneRow> {
        self.rows.iter().find(|row| row.id == id)
    }

    pub(crate) fn row_mut(&mut self, id: RowId) -> Option<&mut OvertoneRow> {
        self.rows.iter_mut().find(|row| row.id == id)
    }
}

/// Node handles of one sounding overtone and the row it mirrors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LiveOvertone {
    pub row: RowId,
    pub oscillator: NodeId,
    pub gain: NodeId,
    /// Built at gain 0 because the row could not be evaluated. The first
    /// valid gain pushed to it clears this.
    pub pending_gain: bool,
}

/// A fundamental plus overtones, with the handles of whatever is sounding.
///
/// `fundamental_osc` is `Some` exactly while the voice is sounding, and then
/// `overtones` holds one entry per row, in row order.
#[derive(Debug, Clone)]
pub struct Voice {
    id: VoiceId,
    pub(crate) controls: VoiceControls,
    pub(crate) fundamental_osc: Option<NodeId>,
    pub(crate) fundamental_gain: Option<NodeId>,
    pub(crate) overtones: Vec<LiveOvertone>,
    next_row: u32,
}

impl Voice {
    pub fn new(id: VoiceId, config: &SynthConfig) -> Self {
        Self {
            id,
            controls: VoiceControls::new(config),
            fundamental_osc: None,
            fundamental_gain: None,
            overtones: Vec::new(),
            next_row: 0,
        }
    }

    pub fn id(&self) -> VoiceId {
        self.id
    }

    pub fn controls(&self) -> &VoiceControls {
        &self.controls
    }

    pub fn is_playing(&self) -> bool {
        self.fundamental_osc.is_some()
    }

    pub fn fundamental_oscillator(&self) -> Option<NodeId> {
        self.fundamental_osc
    }

    pub fn fundamental_gain(&self) -> Option<NodeId> {
        self.fundamental_gain
    }

    pub fn overtones(&self) -> &[LiveOvertone] {
        &self.overtones
    }

    pub fn live_overtone(&self, row: RowId) -> Option<&LiveOvertone> {
        self.overtones.iter().find(|live| live.row == row)
    }

    pub(crate) fn push_row(&mut self, config: &SynthConfig) -> RowId {
        let id = RowId(self.next_row);
        self.next_row += 1;
        self.controls.rows.push(OvertoneRow {
            id,
            ratio: format_ratio(config.default_ratio),
            multiplier: format_ratio(config.default_multiplier),
            muted: false,
        });
        id
    }

    /// Forget every node handle without touching the engine.
    pub(crate) fn clear_live(&mut self) {
        self.fundamental_osc = None;
        self.fundamental_gain = None;
        self.overtones.clear();
    }
}

/// Parse a numeric control value. Rejects anything that is not a finite
/// number, including `inf` and `NaN`.
pub fn parse_number(text: &str) -> Option<f32> {
    text.trim()
        .parse::<f32>()
        .ok()
        .filter(|value| value.is_finite())
}

/// Display form of a number written back into a text control.
pub fn format_number(value: f32) -> String {
    format!("{value}")
}

/// Like `format_number`, but whole numbers keep one decimal ("1.0").
fn format_ratio(value: f32) -> String {
    if value.fract() == 0.0 {
        format!("{value:.1}")
    } else {
        format_number(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_number_rejects_garbage() {
        assert_eq!(parse_number(" 440 "), Some(440.0));
        assert_eq!(parse_number("-5"), Some(-5.0));
        assert_eq!(parse_number("2.5"), Some(2.5));
        assert_eq!(parse_number("abc"), None);
        assert_eq!(parse_number(""), None);
        assert_eq!(parse_number("inf"), None);
        assert_eq!(parse_number("NaN"), None);
    }

    #[test]
    fn format_drops_trailing_zero() {
        assert_eq!(format_number(2000.0), "2000");
        assert_eq!(format_number(440.5), "440.5");
        assert_eq!(format_ratio(1.0), "1.0");
        assert_eq!(format_ratio(1.5), "1.5");
    }

    #[test]
    fn new_rows_use_defaults_and_fresh_ids() {
        let config = SynthConfig::default();
        let mut voice = Voice::new(VoiceId::Two, &config);
        let a = voice.push_row(&config);
        let b = voice.push_row(&config);
        assert_ne!(a, b);

        let row = voice.controls().row(a).unwrap();
        assert_eq!(row.ratio, "1.0");
        assert_eq!(row.multiplier, "1.0");
        assert!(!row.muted);
    }

    #[test]
    fn effective_gain_respects_mute() {
        let mut row = OvertoneRow {
            id: RowId(0),
            ratio: "2".into(),
            multiplier: "0.8".into(),
            muted: false,
        };
        assert!((row.effective_gain(0.5).unwrap() - 0.4).abs() < 1e-6);
        row.muted = true;
        assert_eq!(row.effective_gain(0.5), Some(0.0));
        row.multiplier = "x".into();
        assert_eq!(row.effective_gain(0.5), None);
    }

    #[test]
    fn voice_numbers() {
        assert_eq!(VoiceId::Two.number(), 2);
        assert_eq!(VoiceId::One.to_string(), "1");
    }

    #[test]
    fn overflowing_products_are_rejected() {
        let row = OvertoneRow {
            id: RowId(0),
            ratio: "1e38".into(),
            multiplier: "1e38".into(),
            muted: false,
        };
        assert_eq!(row.frequency(440.0), None);
        assert_eq!(row.effective_gain(10.0), None);
        assert_eq!(row.frequency(0.0), Some(0.0));
    }
}
