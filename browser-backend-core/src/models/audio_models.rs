use serde::{Deserialize, Serialize};

use super::error::BackendError;

/// Name reported both as device name and device type name.
pub const DEVICE_TYPE_NAME: &str = "OpenAL";

/// Sample rates every browser audio context is required to accept.
pub const AVAILABLE_SAMPLE_RATES: [f64; 7] = [22050.0, 32000.0, 37800.0, 44100.0, 48000.0, 88200.0, 96000.0];

/// Buffer sizes matching the script-processor block sizes browsers support.
pub const AVAILABLE_BUFFER_SIZES: [usize; 7] = [256, 512, 1024, 2048, 4096, 8192, 16384];

pub const DEFAULT_BUFFER_SIZE: usize = 2048;

/// Largest supported buffer size; scratch buffers are sized against it.
pub const MAX_BUFFER_SIZE: usize = 16384;

pub const BIT_DEPTH: u16 = 16;

pub const INPUT_CHANNEL_NAMES: [&str; 1] = ["In #1"];
pub const OUTPUT_CHANNEL_NAMES: [&str; 2] = ["Out #1", "Out #2"];

/// Bit-mask of active channels, as handed over by the host device manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ChannelMask(pub u64);

impl ChannelMask {
    pub const NONE: ChannelMask = ChannelMask(0);

    /// Mask with the lowest `count` bits set.
    pub fn with_count(count: usize) -> Self {
        if count >= 64 {
            Self(u64::MAX)
        } else {
            Self((1u64 << count) - 1)
        }
    }

    /// Number of active channels (population count).
    pub fn count(&self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }
}

/// Fixed-point PCM layouts the buffer-queue API accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SampleFormat {
    Mono16,
    Stereo16,
}

impl SampleFormat {
    /// Only mono and stereo 16-bit layouts exist.
    pub fn for_channels(channels: usize) -> Option<Self> {
        match channels {
            1 => Some(Self::Mono16),
            2 => Some(Self::Stereo16),
            _ => None,
        }
    }

    pub fn channels(&self) -> usize {
        match self {
            Self::Mono16 => 1,
            Self::Stereo16 => 2,
        }
    }

    pub fn bytes_per_frame(&self) -> usize {
        self.channels() * 2
    }
}

/// Stream layout fixed at `open` time. Reopening requires a full close first.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamLayout {
    pub input_channels: usize,
    pub output_channels: usize,
    pub sample_rate: f64,
    pub buffer_size: usize,
    pub input_format: Option<SampleFormat>,
    pub output_format: SampleFormat,
}

impl StreamLayout {
    /// Derive and validate a layout from the host's channel masks.
    ///
    /// Fails with `BackendError::Configuration` when a channel count maps to no
    /// fixed-point layout, before any driver resource is touched.
    pub fn from_masks(
        input: ChannelMask,
        output: ChannelMask,
        sample_rate: f64,
        buffer_size: usize,
    ) -> Result<Self, BackendError> {
        let input_channels = input.count();
        let output_channels = output.count();

        let output_format = SampleFormat::for_channels(output_channels).ok_or_else(|| {
            BackendError::Configuration(format!("invalid output channel configuration: {} channels", output_channels))
        })?;

        let input_format = match input_channels {
            0 => None,
            n => Some(SampleFormat::for_channels(n).ok_or_else(|| {
                BackendError::Configuration(format!("invalid input channel configuration: {} channels", n))
            })?),
        };

        if !(sample_rate > 0.0) {
            return Err(BackendError::Configuration(format!("invalid sample rate: {}", sample_rate)));
        }
        if buffer_size == 0 || buffer_size > MAX_BUFFER_SIZE {
            return Err(BackendError::Configuration(format!("unsupported buffer size: {}", buffer_size)));
        }

        Ok(Self {
            input_channels,
            output_channels,
            sample_rate,
            buffer_size,
            input_format,
            output_format,
        })
    }

    /// One queue slot per channel, input and output combined.
    pub fn slot_count(&self) -> usize {
        self.input_channels + self.output_channels
    }

    /// Integral playback frequency handed to the driver.
    pub fn frequency(&self) -> u32 {
        self.sample_rate as u32
    }

    pub fn latency_samples(&self) -> usize {
        self.slot_count() * self.buffer_size
    }
}

/// Counters for debugging a running feed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedDiagnostics {
    pub callback_count: u64,
    pub slots_refilled: u64,
    pub captured_frames_total: u64,
    pub driver_errors: u64,
    pub playback_restarts: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mask_counts_set_bits() {
        assert_eq!(ChannelMask(0b101).count(), 2);
        assert_eq!(ChannelMask::with_count(2), ChannelMask(0b11));
        assert!(ChannelMask::NONE.is_empty());
    }

    #[test]
    fn layout_accepts_mono_and_stereo() {
        let layout = StreamLayout::from_masks(ChannelMask(1), ChannelMask(0b11), 44100.0, 512).unwrap();
        assert_eq!(layout.input_format, Some(SampleFormat::Mono16));
        assert_eq!(layout.output_format, SampleFormat::Stereo16);
        assert_eq!(layout.slot_count(), 3);
        assert_eq!(layout.latency_samples(), 3 * 512);
    }

    #[test]
    fn layout_rejects_unsupported_channel_counts() {
        let three = ChannelMask::with_count(3);
        assert!(matches!(
            StreamLayout::from_masks(ChannelMask::NONE, three, 44100.0, 512),
            Err(BackendError::Configuration(_))
        ));
        assert!(matches!(
            StreamLayout::from_masks(three, ChannelMask(1), 44100.0, 512),
            Err(BackendError::Configuration(_))
        ));
        assert!(matches!(
            StreamLayout::from_masks(ChannelMask::NONE, ChannelMask::NONE, 44100.0, 512),
            Err(BackendError::Configuration(_))
        ));
    }

    #[test]
    fn layout_rejects_oversized_buffers() {
        assert!(StreamLayout::from_masks(ChannelMask::NONE, ChannelMask(1), 44100.0, MAX_BUFFER_SIZE + 1).is_err());
        assert!(StreamLayout::from_masks(ChannelMask::NONE, ChannelMask(1), 0.0, 512).is_err());
    }
}
