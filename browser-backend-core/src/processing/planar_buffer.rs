/// Owned planar float buffer, `channels x frames`.
///
/// Storage is one contiguous allocation; channel `c` occupies
/// `data[c * frames..(c + 1) * frames]`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PlanarBuffer {
    channels: usize,
    frames: usize,
    data: Vec<f32>,
}

impl PlanarBuffer {
    pub fn new(channels: usize, frames: usize) -> Self {
        Self {
            channels,
            frames,
            data: vec![0.0; channels * frames],
        }
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn frames(&self) -> usize {
        self.frames
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn clear(&mut self) {
        self.data.fill(0.0);
    }

    pub fn channel(&self, channel: usize) -> &[f32] {
        let start = channel * self.frames;
        &self.data[start..start + self.frames]
    }

    pub fn channel_mut(&mut self, channel: usize) -> &mut [f32] {
        let start = channel * self.frames;
        &mut self.data[start..start + self.frames]
    }

    pub fn sample(&self, channel: usize, frame: usize) -> f32 {
        self.data[channel * self.frames + frame]
    }

    pub fn set_sample(&mut self, channel: usize, frame: usize, value: f32) {
        self.data[channel * self.frames + frame] = value;
    }

    /// Fill every channel with the same value.
    pub fn fill(&mut self, value: f32) {
        self.data.fill(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channels_are_contiguous() {
        let mut buf = PlanarBuffer::new(2, 4);
        buf.channel_mut(1).copy_from_slice(&[1.0, 2.0, 3.0, 4.0]);

        assert_eq!(buf.channel(0), &[0.0; 4]);
        assert_eq!(buf.sample(1, 2), 3.0);

        buf.clear();
        assert_eq!(buf.channel(1), &[0.0; 4]);
    }

    #[test]
    fn empty_buffer() {
        let buf = PlanarBuffer::new(0, 512);
        assert!(buf.is_empty());
        assert_eq!(buf.channels(), 0);
    }
}
