//! Spectrum widgets
//!
//! The partials chart draws what the controls ask for, one bar per partial.
//! The measured chart is a Hann-windowed FFT of the engine's output tap.

use ratatui::{
    layout::Rect,
    style::{Color, Style},
    symbols,
    widgets::{Axis, Block, Borders, Chart, Dataset, GraphType},
    Frame,
};
use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::sync::Arc;

use overtone::synth::{Partial, VoiceId};

use super::voice_color;

/// Number of bands in the measured spectrum
const SPECTRUM_BANDS: usize = 96;
const FLOOR_DB: f64 = -100.0;

pub struct SpectrumAnalyzer {
    window: Vec<f32>,
    /// FFT bin range `[start, end)` folded into each band
    bands: Vec<(usize, usize)>,
    fft: Arc<dyn Fft<f32>>,
    scratch: Vec<Complex<f32>>,
    /// (band centre Hz, magnitude dB)
    spectrum: Vec<(f64, f64)>,
}

impl SpectrumAnalyzer {
    /// `buffer_len` is the FFT size; bands cover 0 Hz to Nyquist linearly.
    pub fn new(buffer_len: usize, sample_rate: f32) -> Self {
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(buffer_len);

        let window: Vec<f32> = (0..buffer_len)
            .map(|i| {
                if buffer_len > 1 {
                    let denom = (buffer_len - 1) as f32;
                    0.5 * (1.0 - (2.0 * std::f32::consts::PI * i as f32 / denom).cos())
                } else {
                    1.0
                }
            })
            .collect();

        let half = (buffer_len / 2).max(1);
        let bin_hz = sample_rate as f64 / buffer_len.max(1) as f64;
        let band_count = SPECTRUM_BANDS.min(half);
        let mut bands = Vec::with_capacity(band_count);
        let mut spectrum = Vec::with_capacity(band_count);
        for band in 0..band_count {
            let start = band * half / band_count;
            let end = ((band + 1) * half / band_count).max(start + 1);
            bands.push((start, end));
            spectrum.push(((start + end) as f64 * 0.5 * bin_hz, FLOOR_DB));
        }

        Self {
            window,
            bands,
            fft,
            scratch: vec![Complex::new(0.0, 0.0); buffer_len],
            spectrum,
        }
    }

    /// Analyse `buffer`; ignored unless it holds exactly one FFT frame.
    pub fn update(&mut self, buffer: &[f32]) {
        if buffer.len() != self.window.len() {
            return;
        }

        for ((slot, &sample), &w) in self.scratch.iter_mut().zip(buffer).zip(&self.window) {
            *slot = Complex::new(sample * w, 0.0);
        }
        self.fft.process(&mut self.scratch);

        // Normalise so a full-scale sine sits near 0 dB
        let norm = 2.0 / self.window.iter().sum::<f32>().max(1e-6);
        for (&(start, end), (_, magnitude_db)) in self.bands.iter().zip(self.spectrum.iter_mut()) {
            let peak = self.scratch[start..end]
                .iter()
                .map(|bin| bin.norm() * norm)
                .fold(0.0f32, f32::max)
                .max(1e-6);
            *magnitude_db = (20.0 * (peak as f64).log10()).max(FLOOR_DB);
        }
    }

    pub fn data(&self) -> &[(f64, f64)] {
        &self.spectrum
    }
}

/// One bar per partial, coloured by voice
pub fn render_partials(frame: &mut Frame, area: Rect, partials: &[Partial], max_amplitude: f32) {
    let block = Block::default().title(" Partials ").borders(Borders::ALL);

    let points: Vec<(VoiceId, Vec<(f64, f64)>)> = VoiceId::ALL
        .iter()
        .map(|&voice| {
            let data = partials
                .iter()
                .filter(|partial| partial.voice == voice)
                .map(|partial| (partial.frequency as f64, partial.amplitude as f64))
                .collect();
            (voice, data)
        })
        .collect();

    let datasets = points
        .iter()
        .map(|(voice, data)| {
            Dataset::default()
                .name(format!("Voice {voice}"))
                .marker(symbols::Marker::Braille)
                .graph_type(GraphType::Bar)
                .style(Style::default().fg(voice_color(*voice)))
                .data(data)
        })
        .collect();

    let max_freq = partials
        .iter()
        .map(|partial| partial.frequency as f64)
        .fold(0.0, f64::max)
        .max(100.0)
        * 1.1;
    let max_amp = (max_amplitude as f64).max(0.1);

    let chart = Chart::new(datasets)
        .block(block)
        .x_axis(
            Axis::default()
                .bounds([0.0, max_freq])
                .labels(vec!["0".to_string(), format!("{:.0} Hz", max_freq)])
                .style(Style::default().fg(Color::DarkGray)),
        )
        .y_axis(
            Axis::default()
                .bounds([0.0, max_amp])
                .labels(vec!["0".to_string(), format!("{max_amp:.1}")])
                .style(Style::default().fg(Color::DarkGray)),
        );

    frame.render_widget(chart, area);
}

/// FFT of what the engine actually rendered
pub fn render_measured(frame: &mut Frame, area: Rect, spectrum: &[(f64, f64)]) {
    let block = Block::default().title(" Output ").borders(Borders::ALL);

    let dataset = Dataset::default()
        .marker(symbols::Marker::Braille)
        .graph_type(GraphType::Line)
        .style(Style::default().fg(Color::Green))
        .data(spectrum);

    let max_freq = spectrum
        .iter()
        .map(|(f, _)| *f)
        .fold(0.0, f64::max)
        .max(1.0);

    let chart = Chart::new(vec![dataset])
        .block(block)
        .x_axis(
            Axis::default()
                .bounds([0.0, max_freq])
                .labels(vec!["0".to_string(), format!("{:.1} kHz", max_freq / 1000.0)])
                .style(Style::default().fg(Color::DarkGray)),
        )
        .y_axis(
            Axis::default()
                .bounds([FLOOR_DB, 0.0])
                .labels(vec!["-100", "-50", "0"])
                .style(Style::default().fg(Color::DarkGray)),
        );

    frame.render_widget(chart, area);
}
