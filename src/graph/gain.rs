/// Scales everything routed through it by a single factor.
///
/// Gain changes apply from the next rendered block; there is no ramping.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GainNode {
    gain: f32,
}

impl GainNode {
    pub fn new(gain: f32) -> Self {
        Self { gain }
    }

    pub fn gain(&self) -> f32 {
        self.gain
    }

    pub fn set_gain(&mut self, gain: f32) {
        self.gain = gain;
    }
}

impl Default for GainNode {
    fn default() -> Self {
        Self::new(1.0)
    }
}
