use crate::consts::DIGITAL_CHANNELS_PER_POD;

/// Mask for `channel` within its pod byte. Channel 0 of a pod is the most significant bit.
pub const fn channel_mask(channel: usize) -> u8 {
    0x80 >> (channel % DIGITAL_CHANNELS_PER_POD)
}

/// Interleaved digital samples: one byte per pod per sample instant.
///
/// Byte `instant * pod_count + pod` holds the pod's channels at that instant.
/// Each frame's instants start after the previous frame's last one.
#[derive(Debug, Clone, Default)]
pub struct LogicBuffer {
    pod_count: usize,
    data: Vec<u8>,
    frame_start: usize,
}

impl LogicBuffer {
    pub fn new(pod_count: usize) -> Self {
        Self {
            pod_count,
            data: Vec::new(),
            frame_start: 0,
        }
    }

    /// Bytes per sample instant.
    pub fn unit_size(&self) -> usize {
        self.pod_count
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Sample instants accumulated so far.
    pub fn instants(&self) -> usize {
        if self.pod_count == 0 {
            0
        } else {
            self.data.len() / self.pod_count
        }
    }

    /// Instant at which the current frame began.
    pub fn frame_start(&self) -> usize {
        self.frame_start
    }

    pub fn clear(&mut self) {
        self.data.clear();
        self.frame_start = 0;
    }

    /// Starts the next frame after everything written so far.
    pub fn end_frame(&mut self) {
        self.frame_start = self.instants();
    }

    /// Stores whole pod bytes, one per instant, into the current frame.
    pub fn write_pod(&mut self, pod: usize, samples: &[u8]) {
        assert!(pod < self.pod_count, "pod {pod} of {}", self.pod_count);
        self.reserve(samples.len());
        for (i, &byte) in samples.iter().enumerate() {
            self.data[(self.frame_start + i) * self.pod_count + pod] = byte;
        }
    }

    /// Stores one channel's samples, non-zero meaning high, into its bit of the pod bytes.
    pub fn write_channel(&mut self, channel: usize, samples: &[u8]) {
        let pod = channel / DIGITAL_CHANNELS_PER_POD;
        assert!(pod < self.pod_count, "channel {channel} beyond {} pods", self.pod_count);
        let mask = channel_mask(channel);
        self.reserve(samples.len());
        for (i, &level) in samples.iter().enumerate() {
            let byte = &mut self.data[(self.frame_start + i) * self.pod_count + pod];
            if level != 0 {
                *byte |= mask;
            } else {
                *byte &= !mask;
            }
        }
    }

    fn reserve(&mut self, instants: usize) {
        let needed = (self.frame_start + instants) * self.pod_count;
        if self.data.len() < needed {
            self.data.resize(needed, 0);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_channel_mask_msb_first() {
        assert_eq!(channel_mask(0), 0x80);
        assert_eq!(channel_mask(7), 0x01);
        assert_eq!(channel_mask(9), 0x40);
    }

    #[test]
    fn test_channels_zero_and_nine() {
        let mut buf = LogicBuffer::new(2);
        buf.write_channel(0, &[1]);
        buf.write_channel(9, &[0]);
        assert_eq!(buf.as_bytes(), &[0x80, 0x00]);
        assert_eq!(buf.instants(), 1);
    }

    #[test]
    fn test_channels_share_pod_byte() {
        let mut buf = LogicBuffer::new(1);
        buf.write_channel(0, &[1, 0, 1]);
        buf.write_channel(7, &[1, 1, 0]);
        assert_eq!(buf.as_bytes(), &[0x81, 0x01, 0x80]);
    }

    #[test]
    fn test_pods_interleave() {
        let mut buf = LogicBuffer::new(2);
        buf.write_pod(1, &[0xB0, 0xB1]);
        buf.write_pod(0, &[0xA0, 0xA1]);
        assert_eq!(buf.as_bytes(), &[0xA0, 0xB0, 0xA1, 0xB1]);
    }

    #[test]
    fn test_frames_append() {
        let mut buf = LogicBuffer::new(1);
        buf.write_pod(0, &[1, 2]);
        buf.end_frame();
        assert_eq!(buf.frame_start(), 2);
        buf.write_pod(0, &[3]);
        assert_eq!(buf.as_bytes(), &[1, 2, 3]);

        buf.clear();
        assert!(buf.as_bytes().is_empty());
        assert_eq!(buf.frame_start(), 0);
    }

    #[test]
    fn test_empty_write_is_noop() {
        let mut buf = LogicBuffer::new(2);
        buf.write_pod(1, &[]);
        buf.write_channel(3, &[]);
        assert_eq!(buf.instants(), 0);
    }
}
