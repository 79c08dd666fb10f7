use super::sample_converter::to_fixed;

/// Interleaved 16-bit ring holding captured input frames until the feed
/// pulls them.
///
/// Producers push planar float blocks (as delivered by the browser's audio
/// graph); the feed reads interleaved fixed-point frames. On overflow the
/// oldest frames are dropped and counted.
#[derive(Debug)]
pub struct CaptureRing {
    buffer: Vec<i16>,
    channels: usize,
    capacity_frames: usize,
    read_frame: usize,
    available: usize,
    dropped_frames: u64,
}

impl CaptureRing {
    pub fn new(channels: usize, capacity_frames: usize) -> Self {
        let channels = channels.max(1);
        let capacity_frames = capacity_frames.max(1);
        Self {
            buffer: vec![0; channels * capacity_frames],
            channels,
            capacity_frames,
            read_frame: 0,
            available: 0,
            dropped_frames: 0,
        }
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn capacity_frames(&self) -> usize {
        self.capacity_frames
    }

    /// Frames ready to be read.
    pub fn available(&self) -> usize {
        self.available
    }

    /// Frames lost to overflow since creation.
    pub fn dropped_frames(&self) -> u64 {
        self.dropped_frames
    }

    /// Append one planar block. The frame count is the shortest plane;
    /// missing channels repeat the last plane given (mono into stereo).
    pub fn push_planar<P: AsRef<[f32]>>(&mut self, planes: &[P]) -> usize {
        let Some(last) = planes.last() else {
            return 0;
        };
        let frames = planes.iter().map(|p| p.as_ref().len()).min().unwrap_or(0);
        if frames == 0 {
            return 0;
        }

        let skip = frames.saturating_sub(self.capacity_frames);
        let overflow = (self.available + frames - skip).saturating_sub(self.capacity_frames);
        if overflow > 0 {
            self.read_frame = (self.read_frame + overflow) % self.capacity_frames;
            self.available -= overflow;
        }
        self.dropped_frames += (skip + overflow) as u64;

        let mut write_frame = (self.read_frame + self.available) % self.capacity_frames;
        for i in skip..frames {
            let base = write_frame * self.channels;
            for c in 0..self.channels {
                let plane = planes.get(c).unwrap_or(last).as_ref();
                self.buffer[base + c] = to_fixed(plane[i]);
            }
            write_frame = (write_frame + 1) % self.capacity_frames;
        }
        self.available += frames - skip;
        frames - skip
    }

    /// Move up to `frames` frames into interleaved `dst`; returns the count.
    pub fn read(&mut self, dst: &mut [i16], frames: usize) -> usize {
        let count = frames.min(self.available).min(dst.len() / self.channels);
        for i in 0..count {
            let src = ((self.read_frame + i) % self.capacity_frames) * self.channels;
            dst[i * self.channels..(i + 1) * self.channels].copy_from_slice(&self.buffer[src..src + self.channels]);
        }
        self.read_frame = (self.read_frame + count) % self.capacity_frames;
        self.available -= count;
        count
    }

    pub fn clear(&mut self) {
        self.read_frame = 0;
        self.available = 0;
    }
}
