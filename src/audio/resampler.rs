// Sample-rate conversion (C5, ) - converts the FM chip's native
// output rate down to the mixer's per-frame sample count when HQ-FM is
// enabled, plus the host output ring buffer.
//
// Only the FM path is resampled; PSG is always produced directly at the
// mixer's target `size`.

use crate::config::SrcMethod;

/// Sample rate constants.
pub mod sample_rates {
    /// CD-DA / native FM chip rate used as the HQ-FM resampling source.
    pub const FM_NATIVE_RATE: f64 = 44_100.0;

    /// Standard audio sample rate: 44.1 kHz (CD quality)
    pub const AUDIO_44_1_KHZ: f64 = 44_100.0;

    /// Standard audio sample rate: 48 kHz (common for digital audio)
    pub const AUDIO_48_KHZ: f64 = 48_000.0;
}

/// Width (taps on each side of the center) of the windowed-sinc kernel.
const SINC_HALF_WIDTH: usize = 4;

/// A float stereo sample, as produced by the FM chip in HQ mode.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StereoSampleF32 {
    pub left: f32,
    pub right: f32,
}

/// Resamples the FM chip's native-rate float stereo stream down to the
/// mixer's target sample count, using either a sinc or linear kernel.
pub struct Resampler {
    method: SrcMethod,
    /// input_rate / output_rate.
    ratio: f64,
    time_position: f64,
}

impl Resampler {
    pub fn new(method: SrcMethod, input_rate: f64, output_rate: f64) -> Self {
        Self {
            method,
            ratio: input_rate / output_rate,
            time_position: 0.0,
        }
    }

    pub fn new_44_1_khz(method: SrcMethod) -> Self {
        Self::new(method, sample_rates::FM_NATIVE_RATE, sample_rates::AUDIO_44_1_KHZ)
    }

    pub fn new_48_khz(method: SrcMethod) -> Self {
        Self::new(method, sample_rates::FM_NATIVE_RATE, sample_rates::AUDIO_48_KHZ)
    }

    /// How many native-rate input samples are needed to produce
 /// `output_len` resampled output samples
    /// "ceil(size / src_ratio)".
    pub fn input_len_for(&self, output_len: usize) -> usize {
        ((output_len as f64) * self.ratio).ceil() as usize + SINC_HALF_WIDTH * 2
    }

    /// Resample `input` (native rate) down to `output_len` samples.
    pub fn resample(&mut self, input: &[StereoSampleF32], output_len: usize) -> Vec<StereoSampleF32> {
        match self.method {
            SrcMethod::Linear => self.resample_linear(input, output_len),
            SrcMethod::Sinc => self.resample_sinc(input, output_len),
        }
    }

    fn resample_linear(&mut self, input: &[StereoSampleF32], output_len: usize) -> Vec<StereoSampleF32> {
        let mut out = Vec::with_capacity(output_len);
        let mut pos = self.time_position;
        for _ in 0..output_len {
            let idx = pos.floor() as usize;
            let frac = pos - idx.floor();
            let s0 = input.get(idx).copied().unwrap_or_default();
            let s1 = input.get(idx + 1).copied().unwrap_or(s0);
            out.push(StereoSampleF32 {
                left: s0.left + (s1.left - s0.left) * frac as f32,
                right: s0.right + (s1.right - s0.right) * frac as f32,
            });
            pos += self.ratio;
        }
        self.time_position = pos - input.len() as f64;
        if self.time_position < 0.0 {
            self.time_position = 0.0;
        }
        out
    }

    /// Windowed-sinc (Lanczos, a=SINC_HALF_WIDTH) band-limited resample.
    fn resample_sinc(&mut self, input: &[StereoSampleF32], output_len: usize) -> Vec<StereoSampleF32> {
        let mut out = Vec::with_capacity(output_len);
        let mut pos = self.time_position;
        let a = SINC_HALF_WIDTH as isize;
        for _ in 0..output_len {
            let center = pos.floor() as isize;
            let mut left = 0.0f32;
            let mut right = 0.0f32;
            let mut weight_sum = 0.0f32;
            for tap in (center - a + 1)..=(center + a) {
                let x = pos - tap as f64;
                let w = lanczos_kernel(x, a as f64) as f32;
                let sample = if tap >= 0 {
                    input.get(tap as usize).copied().unwrap_or_default()
                } else {
                    StereoSampleF32::default()
                };
                left += sample.left * w;
                right += sample.right * w;
                weight_sum += w;
            }
            if weight_sum.abs() > f32::EPSILON {
                left /= weight_sum;
                right /= weight_sum;
            }
            out.push(StereoSampleF32 { left, right });
            pos += self.ratio;
        }
        self.time_position = pos - input.len() as f64;
        if self.time_position < 0.0 {
            self.time_position = 0.0;
        }
        out
    }

    pub fn reset(&mut self) {
        self.time_position = 0.0;
    }

    pub fn method(&self) -> SrcMethod {
        self.method
    }
}

fn sinc(x: f64) -> f64 {
    if x.abs() < 1e-9 {
        1.0
    } else {
        (std::f64::consts::PI * x).sin() / (std::f64::consts::PI * x)
    }
}

fn lanczos_kernel(x: f64, a: f64) -> f64 {
    if x.abs() >= a {
        0.0
    } else {
        sinc(x) * sinc(x / a)
    }
}

/// Ring buffer of interleaved 16-bit stereo samples "Host audio
/// output": granularity of one frame, feeding the host output callback.
pub struct AudioBuffer {
    buffer: Vec<i16>,
    read_pos: usize,
    write_pos: usize,
    count: usize,
}

impl AudioBuffer {
    /// Create a new buffer. `capacity` is in interleaved samples (not frames).
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: vec![0i16; capacity],
            read_pos: 0,
            write_pos: 0,
            count: 0,
        }
    }

    /// Create a buffer sized for approximately N milliseconds of stereo
    /// audio at the given sample rate.
    pub fn with_duration(milliseconds: u32, sample_rate: f64) -> Self {
        let frames = ((milliseconds as f64 / 1000.0) * sample_rate) as usize;
        Self::new(frames * 2)
    }

    pub fn push(&mut self, sample: i16) -> bool {
        if self.count >= self.buffer.len() {
            return false;
        }
        self.buffer[self.write_pos] = sample;
        self.write_pos = (self.write_pos + 1) % self.buffer.len();
        self.count += 1;
        true
    }

    /// Push one stereo frame (left, right). Returns the number of samples
    /// actually written (0 or 2; partial writes are rejected to avoid
    /// channel-phase drift).
    pub fn push_frame(&mut self, left: i16, right: i16) -> usize {
        if self.buffer.len() - self.count < 2 {
            return 0;
        }
        self.push(left);
        self.push(right);
        2
    }

    pub fn pop(&mut self) -> Option<i16> {
        if self.count == 0 {
            return None;
        }
        let sample = self.buffer[self.read_pos];
        self.read_pos = (self.read_pos + 1) % self.buffer.len();
        self.count -= 1;
        Some(sample)
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn is_full(&self) -> bool {
        self.count >= self.buffer.len()
    }

    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    pub fn clear(&mut self) {
        self.read_pos = 0;
        self.write_pos = 0;
        self.count = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resampler_creation() {
        let resampler = Resampler::new_44_1_khz(SrcMethod::Linear);
        assert_eq!(resampler.method(), SrcMethod::Linear);
    }

    #[test]
    fn test_input_len_for_matches_ratio() {
        let resampler = Resampler::new(SrcMethod::Linear, 44100.0, 48000.0);
        let needed = resampler.input_len_for(800);
        assert!(needed >= 800 * 44100 / 48000);
    }

    #[test]
    fn test_linear_resample_passthrough_at_unity_ratio() {
        let mut resampler = Resampler::new(SrcMethod::Linear, 1000.0, 1000.0);
        let input: Vec<StereoSampleF32> = (0..8)
            .map(|i| StereoSampleF32 { left: i as f32, right: -(i as f32) })
            .collect();
        let output = resampler.resample(&input, 8);
        for (i, s) in output.iter().enumerate() {
            assert!((s.left - i as f32).abs() < 0.01);
        }
    }

    #[test]
    fn test_sinc_resample_preserves_dc() {
        let mut resampler = Resampler::new(SrcMethod::Sinc, 2000.0, 1000.0);
        let input = vec![StereoSampleF32 { left: 1.0, right: 1.0 }; 64];
        let output = resampler.resample(&input, 16);
        for s in output.iter().skip(4).take(8) {
            assert!((s.left - 1.0).abs() < 0.1, "expected near-DC, got {}", s.left);
        }
    }

    #[test]
    fn test_audio_buffer_basic() {
        let mut buffer = AudioBuffer::new(10);
        assert_eq!(buffer.capacity(), 10);
        assert!(buffer.is_empty());

        for i in 0..5 {
            assert!(buffer.push(i as i16));
        }
        assert_eq!(buffer.len(), 5);

        for i in 0..5 {
            assert_eq!(buffer.pop(), Some(i as i16));
        }
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_audio_buffer_push_frame_rejects_partial() {
        let mut buffer = AudioBuffer::new(3);
        assert_eq!(buffer.push_frame(1, 2), 2);
        assert_eq!(buffer.push_frame(3, 4), 0);
        assert_eq!(buffer.pop(), Some(1));
    }

    #[test]
    fn test_audio_buffer_overflow() {
        let mut buffer = AudioBuffer::new(3);
        assert!(buffer.push(1));
        assert!(buffer.push(2));
        assert!(buffer.push(3));
        assert!(buffer.is_full());
        assert!(!buffer.push(4));
    }

    #[test]
    fn test_audio_buffer_underflow() {
        let mut buffer = AudioBuffer::new(3);
        assert_eq!(buffer.pop(), None);
    }

    #[test]
    fn test_audio_buffer_with_duration() {
        let buffer = AudioBuffer::with_duration(100, 44100.0);
        assert_eq!(buffer.capacity(), 8820);
    }
}
