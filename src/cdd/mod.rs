// CD-drive processor (C4): status machine, TOC construction, command
// protocol, and the two streaming paths (CD-DA audio and raw subcode) that
// run off the drive's own ~75 Hz tick. Grounded on `cdd_init`/`cdd_reset`/
// `cdd_update`/`cdd_process` in the original CD drive processor.

pub mod bcd;
pub mod command;
pub mod cue;
pub mod error;
pub mod fader;
pub mod overrides;
pub mod subcode;
pub mod toc;

use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use error::TocError;
use fader::Fader;
use toc::{Backing, Toc, TrackType};

/// `CD_SCAN_SPEED`: sectors advanced per tick while fast-forwarding or
/// rewinding.
pub const CD_SCAN_SPEED: i32 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CddStatus {
    NoDisc,
    Stop,
    Play,
    Seek,
    Ready,
    Scan,
    End,
    Open,
}

/// Host-facing command/status register window: 11 16-bit registers, with
/// RS0 the status nibble, RS1..RS8 the payload, and RS9 a checksum.
/// Only the low nibble of each entry is meaningful.
pub struct CddRegs {
    pub cmd: [u8; 10],
    pub stat: [u8; 10],
}

impl CddRegs {
    pub fn new() -> Self {
        CddRegs { cmd: [0; 10], stat: [0; 10] }
    }
}

impl Default for CddRegs {
    fn default() -> Self {
        Self::new()
    }
}

pub struct Cdd {
    pub toc: Toc,
    pub status: CddStatus,
    pub lba: i32,
    pub index: u8,
    pub latency: i32,
    pub scan_offset: i32,
    pub volume: i16,
    pub audio: [i16; 2],
    pub loaded: bool,
    pub regs: CddRegs,
    pub fader: Fader,
    pub subcode_enabled: bool,
    pub last_subcode: [u16; 48],
    mute: bool,
}

impl Cdd {
    pub fn new() -> Self {
        Cdd {
            toc: Toc::empty(),
            status: CddStatus::NoDisc,
            lba: 0,
            index: 0,
            latency: 0,
            scan_offset: 0,
            volume: fader::VOLUME_MAX as i16,
            audio: [0, 0],
            loaded: false,
            regs: CddRegs::new(),
            fader: Fader::new(),
            subcode_enabled: false,
            last_subcode: [0; 48],
            mute: true,
        }
    }

    pub fn load(&mut self, path: &Path) -> Result<bool, TocError> {
        let (toc, is_cd_file) = toc::load(path)?;
        self.toc = toc;
        self.loaded = self.toc.last > 0;
        self.lba = 0;
        self.index = 0;
        self.latency = 0;
        self.scan_offset = 0;
        self.mute = true;
        self.status = if self.loaded { CddStatus::Stop } else { CddStatus::NoDisc };
        Ok(is_cd_file)
    }

    /// Releases every backing stream (invariant 3: after `unload`, all
    /// backing streams are released and `sectorSize == 0`).
    pub fn unload(&mut self) {
        self.toc = Toc::empty();
        self.loaded = false;
        self.status = CddStatus::NoDisc;
        self.mute = true;
    }

    pub fn process_command(&mut self) {
        command::process(self);
    }

    fn current_track_kind(&self) -> Option<TrackType> {
        self.toc.tracks.get(self.index as usize).map(|t| t.kind)
    }

    fn seek_backing_for_lba(&mut self) {
        let Some(track) = self.toc.tracks.get(self.index as usize) else { return };
        if let Backing::File(f) = &track.backing {
            let byte_pos = self.lba as i64 * 2352 - track.offset;
            let _ = f.borrow_mut().seek(SeekFrom::Start(byte_pos.max(0) as u64));
        }
    }

    /// Per-interrupt update, called at the drive's native ~75 Hz cadence.
 /// Dispatches on `status`.
    pub fn update(&mut self) {
        match self.status {
            CddStatus::Seek => {
                self.latency -= 1;
                if self.latency <= 0 {
                    self.status = CddStatus::Ready;
                    self.regs.stat[1] = 0x00;
                }
            }
            CddStatus::Play => {
                if self.latency > 0 {
                    self.latency -= 1;
                    return;
                }
                if self.index as usize >= self.toc.last {
                    self.status = CddStatus::End;
                    return;
                }

                if self.subcode_enabled && self.toc.sub.is_some() {
                    self.tick_subcode();
                }

                self.mute = match self.current_track_kind() {
                    Some(TrackType::Audio) => {
                        let start = self.toc.tracks[self.index as usize].start;
                        self.lba < start
                    }
                    _ => true,
                };

                self.lba += 1;
                if let Some(track) = self.toc.tracks.get(self.index as usize) {
                    if self.lba >= track.end {
                        self.index += 1;
                        self.mute = true;
                        self.seek_backing_for_lba();
                    }
                }
            }
            CddStatus::Scan => {
                self.lba += self.scan_offset;
                self.clamp_lba_to_track_bounds();
                self.seek_backing_for_lba();
            }
            _ => {}
        }
    }

    fn clamp_lba_to_track_bounds(&mut self) {
        if self.toc.last == 0 {
            return;
        }
        loop {
            let idx = self.index as usize;
            let Some(track) = self.toc.tracks.get(idx) else { break };
            if self.lba < track.start && idx > 0 {
                self.index -= 1;
            } else if self.lba >= track.end && idx + 1 < self.toc.last {
                self.index += 1;
            } else {
                break;
            }
        }
        self.mute = match self.current_track_kind() {
            Some(TrackType::Audio) => false,
            _ => true,
        };
    }

    fn tick_subcode(&mut self) {
        let Some(sub) = self.toc.sub.clone() else { return };
        let mut file = sub.borrow_mut();
        let byte_pos = self.lba as u64 * 96;
        if file.seek(SeekFrom::Start(byte_pos)).is_err() {
            return;
        }
        let mut raw = [0u8; 96];
        if file.read_exact(&mut raw).is_err() {
            return;
        }
        drop(file);
        self.last_subcode = subcode::deinterleave(&raw);
    }

 /// Pull one CD-DA sample pair through the fader.
    /// Returns silence for DATA tracks or when playback is muted.
    pub fn read_audio_sample(&mut self) -> (i16, i16) {
        if self.mute || self.status != CddStatus::Play {
            let mut out = Vec::with_capacity(1);
            self.fader.drain_to_silence(&mut out);
            let last = self.fader.last_output();
            return (last[0], last[1]);
        }

        let Some(track) = self.toc.tracks.get(self.index as usize) else {
            return (0, 0);
        };
        if track.kind != TrackType::Audio {
            return (0, 0);
        }

        let sample = match &track.backing {
            Backing::File(f) => {
                let mut file = f.borrow_mut();
                let mut buf = [0u8; 4];
                if file.read_exact(&mut buf).is_err() {
                    (0, 0)
                } else {
                    let l = i16::from_le_bytes([buf[0], buf[1]]);
                    let r = i16::from_le_bytes([buf[2], buf[3]]);
                    (l, r)
                }
            }
            _ => (0, 0),
        };

        let mut out = Vec::with_capacity(1);
        self.fader.process(&[sample], self.volume as i32, &mut out);
        let last = self.fader.last_output();
        (last[0], last[1])
    }
}

impl Default for Cdd {
    fn default() -> Self {
        Self::new()
    }
}
