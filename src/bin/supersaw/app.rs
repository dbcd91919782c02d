//! Player - scripted note sequence driven through a `SynthHandle`

use std::{thread, time::Duration};

use color_eyre::eyre::{eyre, Result as EyreResult, WrapErr};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use tracing::{info, warn};

use supersaw::{
    synth::{PolySynth, SynthHandle},
    Note, SynthConfig, MAX_BLOCK_SIZE,
};

const QUEUE_CAPACITY: usize = 256;

/// Notes held together for a number of beats.
struct Step {
    notes: Vec<Note>,
    beats: f64,
}

pub struct Player {
    config: SynthConfig,
    bpm: f64,
    steps: Vec<Step>,
}

impl Player {
    pub fn new(config: SynthConfig) -> Self {
        Self {
            config,
            bpm: 120.0,
            steps: Vec::new(),
        }
    }

    pub fn bpm(mut self, bpm: f64) -> Self {
        self.bpm = bpm;
        self
    }

    /// Hold `notes` together for `beats`.
    pub fn step(mut self, notes: &[Note], beats: f64) -> Self {
        self.steps.push(Step {
            notes: notes.to_vec(),
            beats,
        });
        self
    }

    /// Play `notes` one after another, `beats` each.
    pub fn arpeggio(mut self, notes: &[Note], beats: f64) -> Self {
        for &note in notes {
            self = self.step(&[note], beats);
        }
        self
    }

    /// Open the default output device and play every step (blocks until done).
    pub fn run(self) -> EyreResult<()> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| eyre!("no default output device available"))?;
        let stream_config = device
            .default_output_config()
            .wrap_err("failed to fetch default output config")?;

        let sample_rate = stream_config.sample_rate().0 as f32;
        let channels = stream_config.channels() as usize;
        info!(sample_rate, channels, bpm = self.bpm, "opening output");

        let config = self.config.with_sample_rate(sample_rate);
        let release = config.envelope.release;
        let (mut synth, mut handle) = PolySynth::with_queue(config, QUEUE_CAPACITY)
            .wrap_err("failed to build synth")?;

        let mut render_buf = vec![0.0f32; MAX_BLOCK_SIZE];
        let stream = device.build_output_stream(
            &stream_config.into(),
            move |data: &mut [f32], _| {
                // Render mono blocks and copy to every channel
                for frame_chunk in data.chunks_mut(MAX_BLOCK_SIZE * channels) {
                    let frames = frame_chunk.len() / channels;
                    let block = &mut render_buf[..frames];
                    synth.render_block(block);

                    for (frame, &s) in frame_chunk.chunks_mut(channels).zip(block.iter()) {
                        frame.fill(s);
                    }
                }
            },
            |err| warn!(%err, "audio stream error"),
            None,
        )?;

        stream.play()?;

        let beat = Duration::from_secs_f64(60.0 / self.bpm);
        for step in &self.steps {
            for &note in &step.notes {
                handle.note_on(note)?;
            }
            thread::sleep(beat.mul_f64(step.beats));
            for &note in &step.notes {
                handle.note_off(note)?;
            }
            report_finished(&mut handle);
        }

        // Let the last release tail ring out
        thread::sleep(Duration::from_secs_f64(release + 0.1));
        report_finished(&mut handle);
        Ok(())
    }
}

fn report_finished(handle: &mut SynthHandle) {
    while let Some(note) = handle.poll_finished() {
        info!(note, "voice finished");
    }
}
