use std::sync::{Arc, Mutex};

use cpal::{
    traits::{DeviceTrait, HostTrait, StreamTrait},
    SampleFormat, SampleRate, Stream, SupportedStreamConfig, SupportedStreamConfigRange,
};
use thiserror::Error;

use crate::analysis::{AnalysisTap, SharedTap};
use crate::config::{ReleaseMode, SynthConfig, VoiceMode};
use crate::envelope::EnvelopeParams;
use crate::reverb::Reverb;
use crate::theory::Pitch;
use crate::voice::{Voice, Waveform};

pub type SharedGraph = Arc<Mutex<ToneGraph>>;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("no default audio output device")]
    NoOutputDevice,

    #[error("audio output config unavailable: {0}")]
    Config(#[from] cpal::DefaultStreamConfigError),

    #[error("audio output configs unavailable: {0}")]
    SupportedConfigs(#[from] cpal::SupportedStreamConfigsError),

    #[error("output device offers no usable sample format (default is {0:?})")]
    UnsupportedFormat(SampleFormat),

    #[error("failed to build audio stream: {0}")]
    Build(#[from] cpal::BuildStreamError),

    #[error("failed to start audio stream: {0}")]
    Play(#[from] cpal::PlayStreamError),

    #[error("failed to pause audio stream: {0}")]
    Pause(#[from] cpal::PauseStreamError),
}

/// Anything that can be told to start and stop pitches.
pub trait PitchSink {
    fn start_pitch(&mut self, pitch: Pitch);
    fn stop_pitch(&mut self, pitch: Pitch);
}

/// Voices -> reverb -> master gain. Runs inside the audio callback.
pub struct ToneGraph {
    voices: Vec<Voice>,
    voice_mode: VoiceMode,
    release: ReleaseMode,
    waveform: Waveform,
    envelope: EnvelopeParams,
    reverb: Reverb,
    reverb_mix: f32,
    master: f32,
    sample_rate: f32,
}

impl ToneGraph {
    pub fn new(config: &SynthConfig) -> Self {
        let sample_rate = 44_100.0;
        Self {
            voices: Vec::new(),
            voice_mode: config.voice_mode,
            release: config.release,
            waveform: config.waveform,
            envelope: EnvelopeParams::default(),
            reverb: Reverb::new(sample_rate, config.reverb_mix),
            reverb_mix: config.reverb_mix,
            master: config.master_gain.clamp(0.0, 1.0),
            sample_rate,
        }
    }

    pub fn set_sample_rate(&mut self, rate: f32) {
        self.sample_rate = rate.max(1.0);
        self.reverb = Reverb::new(self.sample_rate, self.reverb_mix);
    }

    pub fn start_pitch(&mut self, pitch: Pitch) {
        match self.voice_mode {
            // Hard cut: the replaced voice must not overlap the new attack.
            VoiceMode::Monophonic => self.voices.clear(),
            VoiceMode::Polyphonic => self.voices.retain(|voice| voice.pitch() != pitch),
        }
        let gate_length = self
            .release
            .sustain()
            .map(|sustain| (sustain.as_secs_f64() * f64::from(self.sample_rate)) as u64);
        self.voices.push(Voice::new(pitch, self.waveform, gate_length));
    }

    pub fn stop_pitch(&mut self, pitch: Pitch) {
        if matches!(self.release, ReleaseMode::Auto { .. }) {
            return;
        }
        for voice in self.voices.iter_mut().filter(|voice| voice.pitch() == pitch) {
            voice.release();
        }
    }

    /// Pitches with a voice that has not been released yet.
    pub fn held_pitches(&self) -> Vec<Pitch> {
        self.voices
            .iter()
            .filter(|voice| !voice.is_releasing() && !voice.is_finished())
            .map(|voice| voice.pitch())
            .collect()
    }

    #[cfg(test)]
    pub fn voice_count(&self) -> usize {
        self.voices.len()
    }

    pub fn next_sample(&mut self) -> f32 {
        let sample_rate = self.sample_rate;
        let envelope = self.envelope;
        let mixed = self
            .voices
            .iter_mut()
            .map(|voice| voice.sample(sample_rate, &envelope))
            .sum::<f32>();
        self.voices.retain(|voice| !voice.is_finished());
        self.reverb.process(mixed) * self.master
    }
}

struct AudioOutput {
    stream: Stream,
}

pub struct ToneEngine {
    graph: SharedGraph,
    tap: SharedTap,
    snapshot: Vec<f32>,
    held: usize,
    output: Option<AudioOutput>,
}

impl ToneEngine {
    /// Opens the default output device. There are no retries; a failure here
    /// disables the widgets that depend on sound.
    pub fn start(config: &SynthConfig) -> Result<Self, EngineError> {
        let mut engine = Self::detached(config);
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or(EngineError::NoOutputDevice)?;
        let default = device.default_output_config()?;
        let supported = match default.sample_format() {
            SampleFormat::F32 | SampleFormat::I16 | SampleFormat::U16 => default,
            other => {
                let ranges = device.supported_output_configs()?;
                let fallback = f32_config_near(default.sample_rate(), ranges)
                    .ok_or(EngineError::UnsupportedFormat(other))?;
                log::warn!(
                    "default sample format {other:?} not handled, using f32 at {} Hz",
                    fallback.sample_rate().0
                );
                fallback
            }
        };
        let stream_config = supported.config();
        let sample_rate = stream_config.sample_rate.0 as f32;
        if let Ok(mut graph) = engine.graph.lock() {
            graph.set_sample_rate(sample_rate);
        }
        let graph = engine.graph.clone();
        let tap = engine.tap.clone();
        let stream = match supported.sample_format() {
            SampleFormat::I16 => build_stream_i16(&device, &stream_config, graph, tap)?,
            SampleFormat::U16 => build_stream_u16(&device, &stream_config, graph, tap)?,
            _ => build_stream_f32(&device, &stream_config, graph, tap)?,
        };
        stream.play()?;
        log::info!(
            "audio output started: {} Hz, {} channels",
            stream_config.sample_rate.0,
            stream_config.channels
        );
        engine.output = Some(AudioOutput { stream });
        Ok(engine)
    }

    /// Builds the graph and tap without an output stream.
    fn detached(config: &SynthConfig) -> Self {
        let tap = AnalysisTap::new(config.analysis_size);
        let snapshot = vec![0.0; tap.len()];
        Self {
            graph: Arc::new(Mutex::new(ToneGraph::new(config))),
            tap: Arc::new(Mutex::new(tap)),
            snapshot,
            held: 0,
            output: None,
        }
    }

    /// Latest analysis snapshot. Never blocks: when the audio thread holds
    /// the tap, the previous frame's samples are returned.
    pub fn read_waveform(&mut self) -> &[f32] {
        if let Ok(tap) = self.tap.try_lock() {
            tap.snapshot_into(&mut self.snapshot);
        }
        &self.snapshot
    }

    /// Voices currently held (started and not yet released). Like
    /// [`ToneEngine::read_waveform`], keeps the last count while the audio
    /// thread holds the graph.
    pub fn held_count(&mut self) -> usize {
        if let Ok(graph) = self.graph.try_lock() {
            self.held = graph.held_pitches().len();
        }
        self.held
    }

    pub fn shutdown(&mut self) -> Result<(), EngineError> {
        if let Some(output) = self.output.take() {
            output.stream.pause()?;
            log::info!("audio output stopped");
        }
        Ok(())
    }
}

impl PitchSink for ToneEngine {
    fn start_pitch(&mut self, pitch: Pitch) {
        if let Ok(mut graph) = self.graph.lock() {
            log::debug!("start {pitch} ({:.2} Hz)", pitch.frequency());
            graph.start_pitch(pitch);
        }
    }

    fn stop_pitch(&mut self, pitch: Pitch) {
        if let Ok(mut graph) = self.graph.lock() {
            log::debug!("stop {pitch}");
            graph.stop_pitch(pitch);
        }
    }
}

/// An f32 config from `ranges`, at the rate closest to `preferred`.
fn f32_config_near(
    preferred: SampleRate,
    ranges: impl Iterator<Item = SupportedStreamConfigRange>,
) -> Option<SupportedStreamConfig> {
    ranges
        .filter(|range| {
            range.sample_format() == SampleFormat::F32
                && range.min_sample_rate() <= range.max_sample_rate()
        })
        .map(|range| {
            let rate = preferred.clamp(range.min_sample_rate(), range.max_sample_rate());
            range.with_sample_rate(rate)
        })
        .min_by_key(|config| config.sample_rate().0.abs_diff(preferred.0))
}

fn build_stream_f32(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    graph: SharedGraph,
    tap: SharedTap,
) -> Result<Stream, EngineError> {
    let channels = config.channels as usize;
    let stream = device.build_output_stream(
        config,
        move |output: &mut [f32], _| {
            fill_output_buffer(output, channels, &graph, &tap, |sample| sample);
        },
        move |err| log::error!("audio stream error: {err}"),
        None,
    )?;
    Ok(stream)
}

fn build_stream_i16(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    graph: SharedGraph,
    tap: SharedTap,
) -> Result<Stream, EngineError> {
    let channels = config.channels as usize;
    let stream = device.build_output_stream(
        config,
        move |output: &mut [i16], _| {
            fill_output_buffer(output, channels, &graph, &tap, |sample| {
                (sample * i16::MAX as f32) as i16
            });
        },
        move |err| log::error!("audio stream error: {err}"),
        None,
    )?;
    Ok(stream)
}

fn build_stream_u16(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    graph: SharedGraph,
    tap: SharedTap,
) -> Result<Stream, EngineError> {
    let channels = config.channels as usize;
    let stream = device.build_output_stream(
        config,
        move |output: &mut [u16], _| {
            fill_output_buffer(output, channels, &graph, &tap, |sample| {
                let scaled = (sample * 0.5 + 0.5).clamp(0.0, 1.0);
                (scaled * u16::MAX as f32) as u16
            });
        },
        move |err| log::error!("audio stream error: {err}"),
        None,
    )?;
    Ok(stream)
}

fn fill_output_buffer<T, F>(
    output: &mut [T],
    channels: usize,
    graph: &SharedGraph,
    tap: &SharedTap,
    mut convert: F,
) where
    F: FnMut(f32) -> T,
    T: Copy,
{
    let silence = convert(0.0);
    let Ok(mut graph) = graph.lock() else {
        output.fill(silence);
        return;
    };
    let mut tap = tap.lock().ok();
    for frame in output.chunks_mut(channels.max(1)) {
        let sample = graph.next_sample().clamp(-1.0, 1.0);
        if let Some(tap) = tap.as_mut() {
            tap.push(sample);
        }
        let value = convert(sample);
        for channel in frame {
            *channel = value;
        }
    }
}
