// Frame engine: the top-level coordinator owning every device and driving
// one video frame end to end. Grounded on `emulator::mod.rs`'s
// owned-devices-connected-via-explicit-handles role, generalized from the
// NES bus/PPU/APU trio to the VDP/CDD/mixer trio.

use std::path::Path;

use crate::cdd::error::TocError;
use crate::cdd::Cdd;
use crate::config::FrameEngineConfig;
use crate::cpu_iface::CpuStepper;
use crate::logging::{CddTickTrace, Logger};
use crate::scheduler::{FrameOutput, FrameScheduler};
use crate::vdp::Vdp;

#[cfg(feature = "audio")]
use crate::audio::{AudioConfig, AudioMixer};
#[cfg(feature = "audio")]
use crate::cpu_iface::{PsgChip, SoundChip};

/// Nominal CDD interrupt rate. Real hardware ticks the drive's servo loop
/// at this rate regardless of the video frame rate, so a whole number of
/// ticks rarely lines up with a single frame; the fractional remainder is
/// carried in `cdd_tick_accum`.
const CDD_TICK_RATE_HZ: f64 = 75.0;

/// Owns the VDP, CDD, audio mixer, logger, and configuration, and exposes
/// `run_frame` as the single entry point a host loop calls once per video
/// frame. CPU and sound-chip implementations are supplied per call as
/// trait objects; this crate never owns or constructs them.
pub struct FrameEngine {
    vdp: Vdp,
    cdd: Cdd,
    scheduler: FrameScheduler,
    #[cfg(feature = "audio")]
    audio: AudioMixer,
    logger: Logger,
    config: FrameEngineConfig,
    cdd_tick_accum: f64,
}

impl FrameEngine {
    #[cfg(feature = "audio")]
    pub fn new(config: FrameEngineConfig) -> Result<Self, String> {
        let vdp = Vdp::new(config.video.cell_mode);
        let output_config = AudioConfig::new()
            .with_sample_rate(config.audio.sample_rate)
            .with_channels(config.audio.channels);
        let audio = AudioMixer::new(
            output_config,
            config.audio.psg_preamp,
            config.audio.fm_preamp,
            config.audio.low_pass,
            config.audio.boost,
            config.audio.hq_fm,
            config.audio.src_method,
        )?;

        Ok(FrameEngine {
            vdp,
            cdd: Cdd::new(),
            scheduler: FrameScheduler::new(),
            audio,
            logger: Logger::new(),
            config,
            cdd_tick_accum: 0.0,
        })
    }

    #[cfg(not(feature = "audio"))]
    pub fn new(config: FrameEngineConfig) -> Result<Self, String> {
        Ok(FrameEngine {
            vdp: Vdp::new(config.video.cell_mode),
            cdd: Cdd::new(),
            scheduler: FrameScheduler::new(),
            logger: Logger::new(),
            config,
            cdd_tick_accum: 0.0,
        })
    }

    pub fn load_disc(&mut self, path: &Path) -> Result<bool, TocError> {
        self.cdd.load(path)
    }

    pub fn unload_disc(&mut self) {
        self.cdd.unload();
    }

    pub fn vdp(&self) -> &Vdp {
        &self.vdp
    }

    pub fn vdp_mut(&mut self) -> &mut Vdp {
        &mut self.vdp
    }

    pub fn cdd(&self) -> &Cdd {
        &self.cdd
    }

    pub fn cdd_mut(&mut self) -> &mut Cdd {
        &mut self.cdd
    }

    pub fn logger_mut(&mut self) -> &mut Logger {
        &mut self.logger
    }

    pub fn config(&self) -> &FrameEngineConfig {
        &self.config
    }

    pub fn request_soft_reset_at(&mut self, line: u16) {
        self.scheduler.request_soft_reset_at(line);
    }

    pub fn start_dma(&mut self, length: u32) {
        self.scheduler.start_dma(length);
    }

    /// Drive one video frame: the VDP/CPU scanline loop (C3), the CDD's
    /// ~75 Hz tick cadence (C4), and one audio-mixer call (C5).
    #[cfg(feature = "audio")]
    #[allow(clippy::too_many_arguments)]
    pub fn run_frame(
        &mut self,
        m68k: &mut dyn CpuStepper,
        z80: &mut dyn CpuStepper,
        fm: &mut dyn SoundChip,
        psg: &mut dyn PsgChip,
    ) -> FrameOutput {
        let output = self.run_video_frame(m68k, z80);
        self.tick_cdd();

        let size = AudioMixer::frame_buffer_size(
            self.config.audio.sample_rate,
            self.config.video.region.frame_rate_hz(),
        );
        self.audio.run_frame(size, fm, psg);

        output
    }

    #[cfg(not(feature = "audio"))]
    pub fn run_frame(&mut self, m68k: &mut dyn CpuStepper, z80: &mut dyn CpuStepper) -> FrameOutput {
        let output = self.run_video_frame(m68k, z80);
        self.tick_cdd();
        output
    }

    fn run_video_frame(&mut self, m68k: &mut dyn CpuStepper, z80: &mut dyn CpuStepper) -> FrameOutput {
        self.scheduler.run_frame(
            &mut self.vdp,
            self.config.video.region,
            self.config.video.cell_mode,
            self.config.video.output_depth,
            m68k,
            z80,
            Some(&mut self.logger),
        )
    }

    /// Advance the CDD by however many of its ~75 Hz interrupts fall within
    /// one video frame, carrying the fractional remainder across frames so
    /// the long-run average stays locked to 75 Hz independent of NTSC/PAL.
    fn tick_cdd(&mut self) {
        self.cdd_tick_accum += CDD_TICK_RATE_HZ / self.config.video.region.frame_rate_hz();
        while self.cdd_tick_accum >= 1.0 {
            self.cdd.process_command();
            self.cdd.update();
            self.cdd_tick_accum -= 1.0;

            if self.logger.is_cdd_trace_enabled() {
                let trace = CddTickTrace {
                    status: format!("{:?}", self.cdd.status),
                    lba: self.cdd.lba,
                    index: self.cdd.index,
                    last_command: Some(self.cdd.regs.cmd[0]),
                };
                self.logger.log_cdd_tick(trace);
            }
        }
    }
}
