// Audio mixer (C5) - per-frame linear FM+PSG mix, one-pole
// filter, clip.
//
// Unlike the NES APU's non-linear pulse/TND mixing curves, the Genesis
// path is a straight linear combine of two premultiplied sources followed
// by an optional one-pole low-pass and a final integer clip to i16.

use crate::cpu_iface::StereoSample;

/// Linear FM+PSG mixer producing clipped i16 stereo output.
pub struct Mixer {
    /// PSG premultiplier, percent.
    psg_preamp: i32,
    /// FM premultiplier, percent.
    fm_preamp: i32,
    low_pass: bool,
    boost: i32,
    /// Previous unboosted mixed sample, for the one-pole filter.
    prev: (i32, i32),
}

impl Mixer {
    pub fn new(psg_preamp: u32, fm_preamp: u32, low_pass: bool, boost: u32) -> Self {
        Self {
            psg_preamp: psg_preamp as i32,
            fm_preamp: fm_preamp as i32,
            low_pass,
            boost: boost as i32,
            prev: (0, 0),
        }
    }

    pub fn set_preamps(&mut self, psg_preamp: u32, fm_preamp: u32) {
        self.psg_preamp = psg_preamp as i32;
        self.fm_preamp = fm_preamp as i32;
    }

    pub fn set_low_pass(&mut self, enabled: bool) {
        self.low_pass = enabled;
    }

    pub fn set_boost(&mut self, boost: u32) {
        self.boost = boost as i32;
    }

    /// Reset the one-pole filter's history (call on seek/reset to avoid a
    /// stale carry-over click).
    pub fn reset_filter(&mut self) {
        self.prev = (0, 0);
    }

    /// Mix one stereo frame: PSG (mono i16) plus FM (stereo i32), premultiply
    /// each, optionally low-pass, then clip.
    pub fn mix_sample(&mut self, psg: i16, fm: StereoSample) -> (i16, i16) {
        let psg_term = (psg as i64 * self.psg_preamp as i64) / 100;

        let mut l = psg_term + (fm.left as i64 * self.fm_preamp as i64) / 100;
        let mut r = psg_term + (fm.right as i64 * self.fm_preamp as i64) / 100;

        // Saturate to 32-bit range before the low-pass / clip stages.
        l = l.clamp(i32::MIN as i64, i32::MAX as i64);
        r = r.clamp(i32::MIN as i64, i32::MAX as i64);

        if self.low_pass {
            let filtered_l = (self.prev.0 as i64 + l) >> 1;
            let filtered_r = (self.prev.1 as i64 + r) >> 1;
            self.prev = (l as i32, r as i32);
            l = filtered_l;
            r = filtered_r;
        } else {
            self.prev = (l as i32, r as i32);
        }

        let boosted_l = l * self.boost as i64;
        let boosted_r = r * self.boost as i64;

        (clip_i16(boosted_l), clip_i16(boosted_r))
    }

    /// Mix a full frame's worth of PSG+FM samples (one call per
    /// video frame, `size` samples). `psg` and `fm` must be the same length.
    pub fn mix_frame(&mut self, psg: &[i16], fm: &[StereoSample]) -> Vec<(i16, i16)> {
        debug_assert_eq!(psg.len(), fm.len());
        psg.iter()
            .zip(fm.iter())
            .map(|(&p, &f)| self.mix_sample(p, f))
            .collect()
    }
}

fn clip_i16(sample: i64) -> i16 {
    sample.clamp(i16::MIN as i64, i16::MAX as i64) as i16
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mix_silence() {
        let mut mixer = Mixer::new(100, 100, false, 1);
        let (l, r) = mixer.mix_sample(0, StereoSample::default());
        assert_eq!((l, r), (0, 0));
    }

    #[test]
    fn test_mix_is_linear_in_preamps() {
        let mut half = Mixer::new(50, 100, false, 1);
        let mut full = Mixer::new(100, 100, false, 1);
        let (l_half, _) = half.mix_sample(1000, StereoSample::default());
        let (l_full, _) = full.mix_sample(1000, StereoSample::default());
        assert_eq!(l_full, l_half * 2);
    }

    #[test]
    fn test_fm_preamp_linear() {
        let mut half = Mixer::new(0, 50, false, 1);
        let mut full = Mixer::new(0, 100, false, 1);
        let fm = StereoSample { left: 2000, right: -2000 };
        let (l_half, r_half) = half.mix_sample(0, fm);
        let (l_full, r_full) = full.mix_sample(0, fm);
        assert_eq!(l_full, l_half * 2);
        assert_eq!(r_full, r_half * 2);
    }

    #[test]
    fn test_clip_to_i16_range() {
        let mut mixer = Mixer::new(100, 100, false, 1);
        let fm = StereoSample { left: i32::MAX, right: i32::MIN };
        let (l, r) = mixer.mix_sample(i16::MAX, fm);
        assert_eq!(l, i16::MAX);
        assert_eq!(r, i16::MIN);
    }

    #[test]
    fn test_boost_multiplies_output() {
        let mut mixer = Mixer::new(100, 0, false, 2);
        let (l, _) = mixer.mix_sample(1000, StereoSample::default());
        assert_eq!(l, 2000);
    }

    #[test]
    fn test_low_pass_smooths_step() {
        let mut mixer = Mixer::new(100, 0, true, 1);
        let (l0, _) = mixer.mix_sample(0, StereoSample::default());
        let (l1, _) = mixer.mix_sample(1000, StereoSample::default());
        assert_eq!(l0, 0);
        // filtered step is the average of 0 and the new psg term
        assert_eq!(l1, 500);
    }

    #[test]
    fn test_mix_frame_matches_per_sample() {
        let mut a = Mixer::new(100, 100, false, 1);
        let mut b = Mixer::new(100, 100, false, 1);
        let psg = [100i16, 200, 300];
        let fm = [StereoSample { left: 10, right: -10 }; 3];
        let frame = a.mix_frame(&psg, &fm);
        let stepwise: Vec<(i16, i16)> = psg.iter().zip(fm.iter()).map(|(&p, &f)| b.mix_sample(p, f)).collect();
        assert_eq!(frame, stepwise);
    }
}
