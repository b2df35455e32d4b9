// Audio Mixer (C5) - per-frame FM+PSG mix with optional SRC, feeding the
// host output ring.
//
// # Usage
//
// ```no_run
// use genesis_frame_engine::audio::{AudioMixer, AudioConfig};
// use genesis_frame_engine::config::SrcMethod;
// use genesis_frame_engine::cpu_iface::{PsgChip, SoundChip, StereoSample};
//
// struct Silence;
// impl SoundChip for Silence {
//     fn generate(&mut self, count: usize, out: &mut [StereoSample]) {
//         out[..count].fill(StereoSample::default());
//     }
// }
// impl PsgChip for Silence {
//     fn generate(&mut self, count: usize, out: &mut [i16]) {
//         out[..count].fill(0);
//     }
// }
//
// let mut mixer = AudioMixer::new(AudioConfig::new(), 100, 100, true, 1, false, SrcMethod::Linear).unwrap();
// let size = AudioMixer::frame_buffer_size(48000, 59.94);
// let mut chip = Silence;
// mixer.run_frame(size, &mut chip, &mut chip);
// ```

pub mod mixer;
pub mod output;
pub mod resampler;

pub use mixer::Mixer;
pub use output::{AudioConfig, AudioOutput, AudioOutputBuilder};
pub use resampler::{sample_rates, AudioBuffer, Resampler, StereoSampleF32};

use crate::config::SrcMethod;
use crate::cpu_iface::{PsgChip, SoundChip, StereoSample};

/// Complete audio mixing pipeline for one emulated frame: PSG + FM (with
/// optional HQ-FM sample-rate conversion), linear mix, host ring output.
pub struct AudioMixer {
    mixer: Mixer,
    fm_resampler: Option<Resampler>,
    output: AudioOutput,

    psg_scratch: Vec<i16>,
    fm_native_scratch: Vec<StereoSample>,
    fm_float_scratch: Vec<StereoSampleF32>,

    samples_processed: u64,
    samples_output: u64,
}

impl AudioMixer {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        output_config: AudioConfig,
        psg_preamp: u32,
        fm_preamp: u32,
        low_pass: bool,
        boost: u32,
        hq_fm: bool,
        src_method: SrcMethod,
    ) -> Result<Self, String> {
        let fm_resampler = if hq_fm {
            Some(Resampler::new(
                src_method,
                sample_rates::FM_NATIVE_RATE,
                output_config.sample_rate as f64,
            ))
        } else {
            None
        };
        let output = AudioOutput::new(output_config)?;

        Ok(Self {
            mixer: Mixer::new(psg_preamp, fm_preamp, low_pass, boost),
            fm_resampler,
            output,
            psg_scratch: Vec::new(),
            fm_native_scratch: Vec::new(),
            fm_float_scratch: Vec::new(),
            samples_processed: 0,
            samples_output: 0,
        })
    }

 /// Per-frame sample count: `ceil(rate / vdp_rate) + 8`.
    pub fn frame_buffer_size(sample_rate: u32, vdp_rate: f64) -> usize {
        (sample_rate as f64 / vdp_rate).ceil() as usize + 8
    }

 /// Run one video frame's worth of mixing
    pub fn run_frame(&mut self, size: usize, fm: &mut dyn SoundChip, psg: &mut dyn PsgChip) {
        self.psg_scratch.clear();
        self.psg_scratch.resize(size, 0);
        psg.generate(size, &mut self.psg_scratch);

        let fm_samples = self.produce_fm_samples(size, fm);

        let mixed = self.mixer.mix_frame(&self.psg_scratch, &fm_samples);
        self.samples_processed += size as u64;
        for (l, r) in mixed {
            if self.output.push_frame(l, r) {
                self.samples_output += 1;
            }
        }
    }

    fn produce_fm_samples(&mut self, size: usize, fm: &mut dyn SoundChip) -> Vec<StereoSample> {
        match &mut self.fm_resampler {
            Some(resampler) => {
 // step 1: HQ-FM requests `ceil(size / src_ratio)`
                // native-rate samples, then resamples down to `size`.
                let native_len = resampler.input_len_for(size);
                self.fm_native_scratch.clear();
                self.fm_native_scratch.resize(native_len, StereoSample::default());
                fm.generate(native_len, &mut self.fm_native_scratch);

                self.fm_float_scratch.clear();
                self.fm_float_scratch.extend(self.fm_native_scratch.iter().map(|s| StereoSampleF32 {
                    left: s.left as f32,
                    right: s.right as f32,
                }));

                resampler
                    .resample(&self.fm_float_scratch, size)
                    .into_iter()
                    .map(|s| StereoSample {
                        left: s.left as i32,
                        right: s.right as i32,
                    })
                    .collect()
            }
            None => {
                self.fm_native_scratch.clear();
                self.fm_native_scratch.resize(size, StereoSample::default());
                fm.generate(size, &mut self.fm_native_scratch);
                self.fm_native_scratch.clone()
            }
        }
    }

    pub fn mixer_mut(&mut self) -> &mut Mixer {
        &mut self.mixer
    }

    pub fn output(&self) -> &AudioOutput {
        &self.output
    }

    pub fn stats(&self) -> AudioStats {
        AudioStats {
            samples_processed: self.samples_processed,
            samples_output: self.samples_output,
            buffer_len: self.output.buffer_len(),
            buffer_capacity: self.output.buffer_capacity(),
        }
    }

    pub fn reset_stats(&mut self) {
        self.samples_processed = 0;
        self.samples_output = 0;
    }

    pub fn pause(&self) -> Result<(), String> {
        self.output.pause()
    }

    pub fn resume(&self) -> Result<(), String> {
        self.output.resume()
    }
}

/// Audio mixing statistics.
#[derive(Debug, Clone, Copy)]
pub struct AudioStats {
    pub samples_processed: u64,
    pub samples_output: u64,
    pub buffer_len: usize,
    pub buffer_capacity: usize,
}

impl AudioStats {
    pub fn buffer_fullness(&self) -> f32 {
        if self.buffer_capacity == 0 {
            0.0
        } else {
            self.buffer_len as f32 / self.buffer_capacity as f32
        }
    }
}
