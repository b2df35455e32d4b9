// Configuration management
//
// Handles frame-engine configuration and settings persistence.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::PathBuf;

/// Default configuration file path
const CONFIG_FILE: &str = "frame_engine_config.toml";

/// Video region, selects `lines_per_frame` / `vdp_height`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Region {
    Ntsc,
    Pal,
}

impl Region {
    /// Total scanlines per frame for this region.
    pub fn lines_per_frame(self) -> u16 {
        match self {
            Region::Ntsc => 262,
            Region::Pal => 313,
        }
    }

    /// Nominal video frame rate, used to derive the CDD's ~75 Hz tick
    /// cadence and the audio mixer's per-frame sample count.
    pub fn frame_rate_hz(self) -> f64 {
        match self {
            Region::Ntsc => 59.94,
            Region::Pal => 50.0,
        }
    }
}

/// Cell mode, selects SAT size and per-line sprite limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CellMode {
    /// 32-cell mode: 64-entry SAT, 8 sprites/line, 256px viewport.
    Cell32,
    /// 40-cell mode: 128-entry SAT, 20 sprites/line, 320px viewport.
    Cell40,
}

impl CellMode {
    pub fn sat_entries(self) -> usize {
        match self {
            CellMode::Cell32 => 64,
            CellMode::Cell40 => 128,
        }
    }

    pub fn sprites_per_line(self) -> usize {
        match self {
            CellMode::Cell32 => 16,
            CellMode::Cell40 => 20,
        }
    }

    pub fn viewport_width(self) -> usize {
        match self {
            CellMode::Cell32 => 256,
            CellMode::Cell40 => 320,
        }
    }
}

/// Output pixel depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PixelDepth {
    /// 8bpp 3:3:2
    Bpp8,
    /// 15bpp 5:5:5
    Bpp15,
    /// 16bpp 5:6:5
    Bpp16,
    /// 32bpp 8:8:8
    Bpp32,
}

/// Sample-rate conversion method for the FM path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SrcMethod {
    Linear,
    Sinc,
}

/// Video configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoConfig {
    pub region: Region,
    pub cell_mode: CellMode,
    pub output_depth: PixelDepth,
    pub ntsc_filter: bool,
}

/// Audio configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    pub sample_rate: u32,
    pub channels: u16,
    pub hq_fm: bool,
    pub src_method: SrcMethod,
    /// PSG premultiplier, percent.
    pub psg_preamp: u32,
    /// FM premultiplier, percent.
    pub fm_preamp: u32,
    pub low_pass: bool,
    /// Output boost multiplier.
    pub boost: u32,
}

/// Mega-CD CDD configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CddConfig {
    pub media_path: Option<PathBuf>,
    pub subcode_enabled: bool,
}

/// Host output buffering configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BufferConfig {
    pub host_ring_capacity_frames: u32,
}

/// Frame engine configuration
///
/// Stores all user-configurable settings for the frame engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameEngineConfig {
    pub video: VideoConfig,
    pub audio: AudioConfig,
    pub cdd: CddConfig,
    pub buffer: BufferConfig,
}

impl Default for FrameEngineConfig {
    fn default() -> Self {
        FrameEngineConfig {
            video: VideoConfig {
                region: Region::Ntsc,
                cell_mode: CellMode::Cell40,
                output_depth: PixelDepth::Bpp16,
                ntsc_filter: false,
            },
            audio: AudioConfig {
                sample_rate: 48000,
                channels: 2,
                hq_fm: false,
                src_method: SrcMethod::Linear,
                psg_preamp: 100,
                fm_preamp: 100,
                low_pass: true,
                boost: 1,
            },
            cdd: CddConfig {
                media_path: None,
                subcode_enabled: false,
            },
            buffer: BufferConfig {
                host_ring_capacity_frames: 4,
            },
        }
    }
}

impl FrameEngineConfig {
    /// Load configuration from file or create default
    ///
    /// If the configuration file doesn't exist, creates a default configuration
    /// and saves it to the file.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_else(|_| {
            let config = Self::default();
            let _ = config.save();
            config
        })
    }

    /// Load configuration from file
    pub fn load() -> Result<Self, io::Error> {
        let contents = fs::read_to_string(CONFIG_FILE)?;
        toml::from_str(&contents).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<(), io::Error> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        fs::write(CONFIG_FILE, contents)
    }
}
