//! # Audio Framing Module
//!
//! The estimator only ever sees fixed-size frames; this module cuts audio
//! into those frames. Whole recordings are sliced in place, device callbacks
//! are accumulated and streamed to the analysis loop over a channel.
//!
//! ## Features
//! - Borrowed, lazily produced frames over an in-memory recording
//! - Chunk accumulation with a configurable hop between frames
//! - Non-blocking hand-off so a slow consumer never stalls the producer
//! - Live capture from the default input device (`capture` feature)

use crossbeam_channel::{Sender, TrySendError};

/// Frames of `frame_size` samples starting every `hop` samples.
///
/// Frames borrow from `samples` and are produced one at a time; a trailing
/// remainder shorter than a frame is not yielded.
pub fn frames(samples: &[f64], frame_size: usize, hop: usize) -> impl Iterator<Item = &[f64]> {
    let frame_size = frame_size.max(1);
    samples.windows(frame_size).step_by(hop.clamp(1, frame_size))
}

/// Samples after the last complete frame that [`frames`] leaves unused.
pub fn trailing_samples(len: usize, frame_size: usize, hop: usize) -> usize {
    let frame_size = frame_size.max(1);
    match len.checked_sub(frame_size) {
        Some(rest) => rest % hop.clamp(1, frame_size),
        None => len,
    }
}

/// Buffers incoming samples and emits every complete frame.
///
/// After a frame is emitted the buffer advances by `hop` samples, so
/// `hop < frame_size` yields overlapping frames.
#[cfg_attr(not(feature = "capture"), allow(dead_code))]
pub struct FrameAccumulator {
    buffer: Vec<f64>,
    frame_size: usize,
    hop: usize,
    sender: Sender<Vec<f64>>,
    dropped: usize,
}

#[cfg_attr(not(feature = "capture"), allow(dead_code))]
impl FrameAccumulator {
    pub fn new(frame_size: usize, hop: usize, sender: Sender<Vec<f64>>) -> Self {
        Self {
            buffer: Vec::new(),
            frame_size: frame_size.max(1),
            hop: hop.clamp(1, frame_size.max(1)),
            sender,
            dropped: 0,
        }
    }

    /// Appends `chunk` and sends every frame that is now complete.
    ///
    /// Returns `false` once the receiving side has gone away.
    pub fn push(&mut self, chunk: &[f64]) -> bool {
        self.buffer.extend_from_slice(chunk);

        let mut start = 0;
        let mut connected = true;
        while self.buffer.len() - start >= self.frame_size {
            let frame = self.buffer[start..start + self.frame_size].to_vec();
            match self.sender.try_send(frame) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => self.dropped += 1,
                Err(TrySendError::Disconnected(_)) => {
                    connected = false;
                    break;
                }
            }
            start += self.hop;
        }
        // Consumed samples are shifted out once per chunk, not once per frame.
        self.buffer.drain(..start);
        connected
    }

    /// Samples waiting for the next frame to complete.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// Frames discarded because the channel was full.
    pub fn dropped(&self) -> usize {
        self.dropped
    }
}

#[cfg(feature = "capture")]
pub use capture::start_audio_capture;

#[cfg(feature = "capture")]
mod capture {
    use super::FrameAccumulator;
    use anyhow::{anyhow, Result};
    use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
    use cpal::SupportedStreamConfigRange;
    use crossbeam_channel::Sender;
    use tracing::{error, info, warn};

    /// Starts capturing mono `f32` audio from the default input device.
    ///
    /// Device callbacks are cut into `frame_size` frames advancing by `hop`
    /// and sent on `sender`.
    ///
    /// # Returns
    /// * `Ok((stream, sample_rate))` - Running stream handle and the rate it runs at
    /// * `Err(e)` - No device, no mono f32 format, or the stream failed to start
    pub fn start_audio_capture(
        sender: Sender<Vec<f64>>,
        frame_size: usize,
        hop: usize,
        target_rate: u32,
    ) -> Result<(cpal::Stream, u32)> {
        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or_else(|| anyhow!("No input device available"))?;

        info!(device = %device.name()?, "using audio input device");

        let configs = device.supported_input_configs()?.collect::<Vec<_>>();
        let supported_config = find_supported_config(configs, target_rate)
            .ok_or_else(|| anyhow!("No suitable mono f32 input format found"))?;

        let rate = target_rate.clamp(
            supported_config.min_sample_rate().0,
            supported_config.max_sample_rate().0,
        );
        if rate != target_rate {
            warn!(requested = target_rate, actual = rate, "sample rate adjusted to device range");
        }
        let config: cpal::StreamConfig = supported_config
            .with_sample_rate(cpal::SampleRate(rate))
            .into();

        let mut accumulator = FrameAccumulator::new(frame_size, hop, sender);
        let mut scratch: Vec<f64> = Vec::new();
        let err_fn = |err: cpal::StreamError| error!("audio stream error: {}", err);

        let stream = device.build_input_stream(
            &config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                scratch.clear();
                scratch.extend(data.iter().map(|&s| s as f64));
                accumulator.push(&scratch);
            },
            err_fn,
            None,
        )?;

        stream.play()?;
        Ok((stream, rate))
    }

    /// Picks a mono f32 configuration, preferring ranges that contain the
    /// target rate, then the one whose bounds come closest to it.
    fn find_supported_config(
        configs: Vec<SupportedStreamConfigRange>,
        target_rate: u32,
    ) -> Option<SupportedStreamConfigRange> {
        configs
            .into_iter()
            .filter(|c| c.channels() == 1 && c.sample_format() == cpal::SampleFormat::F32)
            .min_by_key(|c| {
                let (min, max) = (c.min_sample_rate().0, c.max_sample_rate().0);
                if (min..=max).contains(&target_rate) {
                    0
                } else {
                    min.abs_diff(target_rate).min(max.abs_diff(target_rate))
                }
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emits_frames_once_enough_samples_arrive() {
        let (tx, rx) = crossbeam_channel::unbounded();
        let mut acc = FrameAccumulator::new(4, 4, tx);

        assert!(acc.push(&[1.0, 2.0, 3.0]));
        assert!(rx.try_recv().is_err());

        assert!(acc.push(&[4.0, 5.0, 6.0, 7.0, 8.0, 9.0]));
        assert_eq!(rx.try_recv().unwrap(), vec![1.0, 2.0, 3.0, 4.0]);
        assert_eq!(rx.try_recv().unwrap(), vec![5.0, 6.0, 7.0, 8.0]);
        assert!(rx.try_recv().is_err());
        assert_eq!(acc.pending(), 1);
    }

    #[test]
    fn hop_shorter_than_frame_overlaps() {
        let (tx, rx) = crossbeam_channel::unbounded();
        let mut acc = FrameAccumulator::new(4, 2, tx);
        acc.push(&[0.0, 1.0, 2.0, 3.0, 4.0, 5.0]);

        let frames: Vec<_> = rx.try_iter().collect();
        assert_eq!(frames, vec![vec![0.0, 1.0, 2.0, 3.0], vec![2.0, 3.0, 4.0, 5.0]]);
    }

    #[test]
    fn full_channel_drops_frames_instead_of_blocking() {
        let (tx, rx) = crossbeam_channel::bounded(1);
        let mut acc = FrameAccumulator::new(2, 2, tx);
        assert!(acc.push(&[0.0; 6]));
        assert_eq!(acc.dropped(), 2);
        assert_eq!(rx.len(), 1);
    }

    #[test]
    fn huge_frame_size_does_not_allocate_up_front() {
        let (tx, rx) = crossbeam_channel::unbounded();
        let mut acc = FrameAccumulator::new(usize::MAX, 1, tx);
        assert!(acc.push(&[0.0; 8]));
        assert_eq!(acc.pending(), 8);
        assert!(rx.try_recv().is_err());

        assert_eq!(frames(&[0.0; 8], usize::MAX, 1).count(), 0);
        assert_eq!(trailing_samples(8, usize::MAX, 1), 8);
    }

    #[test]
    fn many_small_hops_over_one_chunk() {
        let samples: Vec<f64> = (0..100).map(f64::from).collect();
        let (tx, rx) = crossbeam_channel::unbounded();
        let mut acc = FrameAccumulator::new(16, 4, tx);
        assert!(acc.push(&samples));

        let sent: Vec<_> = rx.try_iter().collect();
        assert_eq!(sent.len(), 22);
        assert_eq!(sent[21][0], 84.0);
        assert_eq!(acc.pending(), 100 - 22 * 4);
    }

    #[test]
    fn frames_borrow_the_recording() {
        let samples: Vec<f64> = (0..100).map(f64::from).collect();
        let mut count = 0;
        for (i, frame) in frames(&samples, 16, 4).enumerate() {
            assert_eq!(frame.len(), 16);
            assert_eq!(frame.as_ptr(), samples[i * 4..].as_ptr());
            count += 1;
        }
        assert_eq!(count, 22);
        assert_eq!(trailing_samples(samples.len(), 16, 4), 0);
        assert_eq!(trailing_samples(10, 16, 4), 10);
        assert_eq!(trailing_samples(35, 16, 16), 3);
    }

    #[test]
    fn frames_match_the_accumulator() {
        let samples: Vec<f64> = (0..37).map(f64::from).collect();
        let (tx, rx) = crossbeam_channel::unbounded();
        let mut acc = FrameAccumulator::new(8, 3, tx);
        for chunk in samples.chunks(5) {
            acc.push(chunk);
        }
        let streamed: Vec<Vec<f64>> = rx.try_iter().collect();
        let sliced: Vec<Vec<f64>> = frames(&samples, 8, 3).map(<[f64]>::to_vec).collect();
        assert_eq!(streamed, sliced);
    }

    #[test]
    fn reports_disconnected_receiver() {
        let (tx, rx) = crossbeam_channel::unbounded();
        drop(rx);
        let mut acc = FrameAccumulator::new(2, 2, tx);
        assert!(!acc.push(&[0.0; 2]));
    }
}
