// TOC data model, construction, and sidecar-audio auto-discovery (,
// 4.4, 9). Grounded on `cdd_load`/`cdd_unload` in the original CD drive
// processor.
//
// Track backing handles are shared (`Rc<RefCell<File>>`) so that several
// consecutive tracks sharing one CUE `FILE` entry share one open handle;
// `unload` simply drops every `Rc` it holds and the file closes once the
// refcount reaches zero, replacing the original's "skip the second close"
// bookkeeping.

use std::cell::RefCell;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use super::cue::parse_cue;
use super::error::TocError;
use super::overrides;

pub const PREGAP_SECTORS: i64 = 150;
const MAX_TRACKS: usize = 99;

/// Soft cap on simultaneously open Vorbis decoder contexts for discs with
/// many audio tracks sharing separate files.
pub const MAX_OPEN_VORBIS_CONTEXTS: usize = 4;

pub type SharedFile = Rc<RefCell<File>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackType {
    Data,
    Audio,
}

/// A track's backing stream. `Vorbis` carries only the path; the decoder
/// context is opened lazily and may be closed again to cap live contexts
///, unlike `File` which stays open for the track's lifetime.
pub enum Backing {
    File(SharedFile),
    Vorbis(PathBuf),
    None,
}

pub struct Track {
    pub kind: TrackType,
    /// LBA this track starts at.
    pub start: i64,
    /// LBA this track ends at (exclusive).
    pub end: i64,
    /// Signed per-byte offset into the backing stream, encoding PREGAP and
 /// header skew.
    pub offset: i64,
    pub backing: Backing,
}

impl Track {
    pub(crate) fn empty() -> Self {
        Track {
            kind: TrackType::Audio,
            start: 0,
            end: 0,
            offset: 0,
            backing: Backing::None,
        }
    }
}

pub struct Toc {
    /// 0 => audio-only disc; else 2048 (COOKED) or 2352 (RAW).
    pub sector_size: u32,
    /// Number of tracks.
    pub last: usize,
    /// LBA of the lead-out.
    pub end: i64,
    pub tracks: Vec<Track>,
    pub sub: Option<SharedFile>,
}

impl Toc {
    pub(crate) fn empty() -> Self {
        Toc {
            sector_size: 0,
            last: 0,
            end: 0,
            tracks: Vec::new(),
            sub: None,
        }
    }

 /// Invariant 2: sum of `(end - start)` over tracks equals
    /// `toc.end` for a well-formed TOC.
    pub fn track_lengths_sum_to_end(&self) -> bool {
        let sum: i64 = self.tracks[..self.last].iter().map(|t| t.end - t.start).sum();
        sum == self.end
    }
}

const SEGA_DISC_MAGIC: &[u8] = b"SEGADISCSYSTEM";

const WAVE_HEADER: [u8; 32] = [
    0x57, 0x41, 0x56, 0x45, 0x66, 0x6d, 0x74, 0x20, 0x10, 0x00, 0x00, 0x00, 0x01, 0x00, 0x02, 0x00,
    0x44, 0xac, 0x00, 0x00, 0x10, 0xb1, 0x02, 0x00, 0x04, 0x00, 0x10, 0x00, 0x64, 0x61, 0x74, 0x61,
];

/// Sidecar filename templates tried in order, substituting the 1-based
/// track number.
const SIDECAR_TEMPLATES: [&str; 20] = [
    "{:02}.ogg", " {:02}.ogg", "-{:02}.ogg", "_{:02}.ogg", " - {:02}.ogg",
    "{}.ogg", " {}.ogg", "-{}.ogg", "_{}.ogg", " - {}.ogg",
    "{:02}.wav", " {:02}.wav", "-{:02}.wav", "_{:02}.wav", " - {:02}.wav",
    "{}.wav", " {}.wav", "-{}.wav", "_{}.wav", " - {}.wav",
];

fn read_exact_at(file: &mut File, offset: u64, buf: &mut [u8]) -> std::io::Result<()> {
    file.seek(SeekFrom::Start(offset))?;
    file.read_exact(buf)
}

/// Result of `load`: whether the mounted path was a CD image file (1) or a
/// bare audio folder / nothing (0)
pub fn load(path: &Path) -> Result<(Toc, bool), TocError> {
    let mut toc = Toc::empty();
    let mut is_cd_file = true;
    let mut header = vec![0u8; 0x210];

    let stem_base = base_stem_path(path);

    let mut data_fd = File::open(path)?;
    let ext_is_cue = has_extension(path, "cue");

    if !ext_is_cue {
        data_fd.read_exact(&mut header[..0x10])?;
        let mut sector_size = 0u32;
        if &header[..14] == SEGA_DISC_MAGIC {
            sector_size = 2048;
        } else {
            let mut second = [0u8; 0x10];
            data_fd.read_exact(&mut second)?;
            header[0x10..0x20].copy_from_slice(&second);
            if &second[..14] == SEGA_DISC_MAGIC {
                sector_size = 2352;
            }
        }

        if sector_size != 0 {
            let rest_len = 0x210usize.saturating_sub(0x20);
            let mut rest = vec![0u8; rest_len];
            let _ = data_fd.read_exact(&mut rest);
            header[0x20..].copy_from_slice(&rest);

            let end = data_fd.seek(SeekFrom::End(0))? as i64 / sector_size as i64;
            data_fd.seek(SeekFrom::Start(0))?;

            toc.sector_size = sector_size;
            let mut track0 = Track::empty();
            track0.kind = TrackType::Data;
            track0.start = 0;
            track0.end = end;
            track0.backing = Backing::File(Rc::new(RefCell::new(data_fd)));
            toc.tracks.push(track0);
            toc.end = end;
            toc.last = 1;
        } else {
            is_cd_file = false;
        }
    }

    let cue_path = stem_base.with_extension("cue");
    if let Ok(cue_text) = std::fs::read_to_string(&cue_path) {
        parse_cue(&cue_text, &cue_path, &mut toc)?;
    } else if ext_is_cue {
        let cue_text = std::fs::read_to_string(path)?;
        parse_cue(&cue_text, path, &mut toc)?;
    } else {
        discover_sidecar_tracks(&stem_base, &mut toc);
    }

    if toc.last == 0 {
        return Ok((toc, false));
    }

    let lead_out = toc.end;
    toc.tracks.get_mut(toc.last).map(|_| ());
    while toc.tracks.len() <= toc.last {
        toc.tracks.push(Track::empty());
    }
    toc.tracks[toc.last].start = lead_out;

    if toc.tracks[0].kind == TrackType::Data && toc.last == 1 {
        if let Some(over) = overrides::find_override(&header) {
            apply_override(&mut toc, over);
        } else {
            apply_default_toc(&mut toc);
        }
    }

    let sub_path = stem_base.with_extension("sub");
    toc.sub = File::open(sub_path).ok().map(|f| Rc::new(RefCell::new(f)));

    Ok((toc, is_cd_file))
}

fn base_stem_path(path: &Path) -> PathBuf {
    path.to_path_buf()
}

fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension()
        .map(|e| e.eq_ignore_ascii_case(ext))
        .unwrap_or(false)
}

/// Default 2-second PREGAP / 99-track cap used when sidecar-discovering
/// audio tracks without a CUE sheet.
fn discover_sidecar_tracks(stem: &Path, toc: &mut Toc) {
    let dir = stem.parent().unwrap_or_else(|| Path::new("."));
    let base = stem.file_stem().and_then(|s| s.to_str()).unwrap_or("").to_string();

    let mut offset = 1u32;
    let mut found_path = None;
    'outer: for tmpl in SIDECAR_TEMPLATES {
        for n in [toc.last as u32, toc.last as u32 + 1] {
            let suffix = format_template(tmpl, n);
            let candidate = dir.join(format!("{base}{suffix}"));
            if candidate.is_file() {
                offset = if n == toc.last as u32 { 0 } else { 1 };
                found_path = Some((tmpl, candidate));
                break 'outer;
            }
        }
    }

    let Some((tmpl, mut candidate)) = found_path else {
        return;
    };

    loop {
        if toc.last >= MAX_TRACKS {
            break;
        }
        let is_wav = tmpl.ends_with(".wav");
        let Ok(mut fd) = File::open(&candidate) else { break };

        let mut head = [0u8; 32];
        if read_exact_at(&mut fd, 8, &mut head).is_err() {
            break;
        }

        let mut track = Track::empty();
        track.kind = TrackType::Audio;

        if is_wav && head == WAVE_HEADER {
            track.start = toc.end + PREGAP_SECTORS;
            let len = fd.seek(SeekFrom::End(0)).unwrap_or(0) as i64;
            track.end = track.start + (len - 44 + 2351) / 2352;
            track.offset = track.start * 2352;

            if detect_leading_silence_pcm(&mut fd) {
                track.offset -= PREGAP_SECTORS * 2352;
                track.end -= PREGAP_SECTORS;
            }
            track.offset -= 44;
            toc.end = track.end;
            track.backing = Backing::File(Rc::new(RefCell::new(fd)));
        } else if !is_wav {
            // Vorbis path: defer PCM length discovery to lazy-open time;
            // record a conservative placeholder advanced by the decoder
            // the first time the track is actually streamed.
            track.start = toc.end + PREGAP_SECTORS;
            track.end = track.start;
            track.offset = track.start * 588;
            toc.end = track.end;
            track.backing = Backing::Vorbis(candidate.clone());
        } else {
            break;
        }

        toc.tracks.push(track);
        toc.last += 1;

        let next = format_template(tmpl, toc.last as u32 + offset);
        candidate = dir.join(format!("{base}{next}"));
        if !candidate.is_file() {
            break;
        }
    }
}

fn format_template(tmpl: &str, n: u32) -> String {
    if tmpl.contains("{:02}") {
        tmpl.replace("{:02}", &format!("{n:02}"))
    } else {
        tmpl.replace("{}", &n.to_string())
    }
}

/// "if bytes at file offset 100*2352 are zero, assume a 2-second
/// pause is already encoded and roll back offset/end by 150 sectors."
fn detect_leading_silence_pcm(fd: &mut File) -> bool {
    let mut probe = [0u8; 4];
    if read_exact_at(fd, 100 * 2352, &mut probe).is_err() {
        return false;
    }
    probe == [0, 0, 0, 0]
}

fn apply_override(toc: &mut Toc, over: &overrides::TocOverride) {
    toc.last = 0;
    toc.end = 0;
    toc.tracks.truncate(1);
    let data_backing = match &toc.tracks[0].backing {
        Backing::File(f) => Backing::File(f.clone()),
        _ => Backing::None,
    };
    toc.tracks.clear();
    for &len in over.track_lengths {
        let mut t = Track::empty();
        t.kind = if toc.last == 0 { TrackType::Data } else { TrackType::Audio };
        t.start = toc.end;
        t.end = t.start + len as i64;
        if toc.last == 0 {
            t.backing = match &data_backing {
                Backing::File(f) => Backing::File(f.clone()),
                _ => Backing::None,
            };
        }
        toc.end = t.end;
        toc.tracks.push(t);
        toc.last += 1;
    }
}

/// Default TOC: 99 tracks, 2s per audio track, used when no override
/// matches and no sidecar audio was found.
fn apply_default_toc(toc: &mut Toc) {
    loop {
        let mut t = Track::empty();
        t.kind = TrackType::Audio;
        t.start = toc.end + 2 * 75;
        t.end = t.start + 2 * 75;
        toc.end = t.end;
        toc.tracks.push(t);
        toc.last += 1;
        if toc.last >= MAX_TRACKS || toc.end >= 56 * 60 * 75 {
            break;
        }
    }
}
