// CUE sheet grammar parser. Grounded on the CUE-parsing
// region of the original CDD loader (`cdd_load`'s `fgets` loop).
//
// Recognized directives: `FILE "<path>" BINARY|MOTOROLA|WAVE|OGG`,
// `TRACK nn AUDIO|MODE1/2048|MODE1/2352`, `PREGAP mm:ss:ff`,
// `INDEX 00|01 mm:ss:ff`. Tracks must be numbered consecutively from 1; a
// gap aborts parsing and the TOC is truncated to the last complete track.
//
// Track end times are resolved lazily: every track's `end` stays 0 until
// its file group closes (a new FILE directive starts, or the sheet ends),
// at which point the group's backing stream is measured once and the
// trailing open track absorbs the remainder. This mirrors the original's
// "clear previous track end, recompute from the next track" dance for
// multiple tracks packed into one audio file, without depending on the
// exact order its stray end-of-file probes happened to run in.

use std::cell::RefCell;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use super::error::TocError;
use super::toc::{Backing, Toc, Track, TrackType};

const WAVE_HEADER: [u8; 32] = [
    0x57, 0x41, 0x56, 0x45, 0x66, 0x6d, 0x74, 0x20, 0x10, 0x00, 0x00, 0x00, 0x01, 0x00, 0x02, 0x00,
    0x44, 0xac, 0x00, 0x00, 0x10, 0xb1, 0x02, 0x00, 0x04, 0x00, 0x10, 0x00, 0x64, 0x61, 0x74, 0x61,
];

fn ensure_track(toc: &mut Toc, idx: usize) {
    while toc.tracks.len() <= idx {
        toc.tracks.push(Track {
            kind: TrackType::Audio,
            start: 0,
            end: 0,
            offset: 0,
            backing: Backing::None,
        });
    }
}

fn msf_to_sectors(mm: i64, ss: i64, ff: i64) -> i64 {
    ff + ss * 75 + mm * 60 * 75
}

fn parse_file_path(rest: &str) -> Option<String> {
    let rest = rest.trim_start();
    if let Some(stripped) = rest.strip_prefix('"') {
        stripped.split('"').next().map(|s| s.to_string())
    } else {
        rest.split_whitespace().next().map(|s| s.to_string())
    }
}

fn parse_track_number(rest: &str) -> Option<u32> {
    rest.trim_start().split_whitespace().next()?.parse().ok()
}

fn parse_mm_ss_ff(rest: &str) -> Option<(i64, i64, i64)> {
    let mut parts = rest.trim().splitn(3, ':');
    let mm: i64 = parts.next()?.trim().parse().ok()?;
    let ss: i64 = parts.next()?.trim().parse().ok()?;
    let ff: i64 = parts.next()?.trim().split_whitespace().next()?.parse().ok()?;
    Some((mm, ss, ff))
}

fn resolve_path(dir: &Path, fname: &str) -> PathBuf {
    let candidate = Path::new(fname);
    if candidate.is_absolute() {
        candidate.to_path_buf()
    } else {
        dir.join(candidate)
    }
}

/// Measure one backing stream's total audio/data content, in sectors,
/// regardless of how many tracks will end up sharing it.
fn measure_content_sectors(backing: &Backing, sector_size: u32, kind: TrackType) -> Option<i64> {
    match backing {
        Backing::File(f) => {
            let mut file = f.borrow_mut();
            let mut head = [0u8; 32];
            file.seek(SeekFrom::Start(8)).ok()?;
            let is_wav = file.read_exact(&mut head).is_ok() && head == WAVE_HEADER;
            let len = file.seek(SeekFrom::End(0)).ok()? as i64;
            file.seek(SeekFrom::Start(0)).ok()?;
            let content = if is_wav { len - 44 } else { len };
            Some(match kind {
                TrackType::Data => {
                    let s = sector_size.max(1) as i64;
                    (content + s - 1) / s
                }
                TrackType::Audio => (content + 2351) / 2352,
            })
        }
        Backing::Vorbis(path) => vorbis_total_sectors(path),
        Backing::None => None,
    }
}

#[cfg(feature = "vorbis")]
fn vorbis_total_sectors(path: &Path) -> Option<i64> {
    use lewton::inside_ogg::OggStreamReader;
    let file = File::open(path).ok()?;
    let mut reader = OggStreamReader::new(file).ok()?;
    if reader.ident_hdr.audio_sample_rate != 44100 || reader.ident_hdr.audio_channels != 2 {
        return None;
    }
    let mut frames: u64 = 0;
    while let Ok(Some(packet)) = reader.read_dec_packet_itl() {
        frames += (packet.len() / 2) as u64;
    }
    Some(((frames as i64) + 587) / 588)
}

#[cfg(not(feature = "vorbis"))]
fn vorbis_total_sectors(_path: &Path) -> Option<i64> {
    None
}

/// Resolve the currently-open file group's trailing track's `end`, using
/// the group's measured total content length. No-op if there is no open
/// track (every track so far already has a nonzero `end`).
fn finalize_group(toc: &mut Toc, group_base: i64, group_backing: &Backing, sector_size: u32) {
    if toc.last == 0 {
        return;
    }
    let last = toc.last - 1;
    if toc.tracks[last].end != 0 {
        return;
    }
    if let Some(sectors) = measure_content_sectors(group_backing, sector_size, toc.tracks[last].kind) {
        toc.tracks[last].end = group_base + sectors;
        toc.end = toc.tracks[last].end;
    }
}

pub fn parse_cue(text: &str, cue_path: &Path, toc: &mut Toc) -> Result<(), TocError> {
    let dir = cue_path.parent().unwrap_or_else(|| Path::new("."));
    let mut lines = text.lines();

    // If a DATA track was already constructed from the image header,
    // the CUE's own first TRACK/INDEX for it is redundant; skip lines up
 // through its "INDEX 01" line.
    if toc.last > 0 {
        for line in lines.by_ref() {
            if line.trim_start().contains("INDEX 01") {
                break;
            }
        }
    }

    let mut pregap: i64 = 0;
    let mut group_base: i64 = toc.end;
    let mut group_byte_offset: i64 = 0;
    let mut group_backing: Backing = match toc.tracks.last() {
        Some(t) => match &t.backing {
            Backing::File(f) => Backing::File(f.clone()),
            Backing::Vorbis(p) => Backing::Vorbis(p.clone()),
            Backing::None => Backing::None,
        },
        None => Backing::None,
    };

    for line in lines {
        let trimmed = line.trim_start();

        if let Some(rest) = trimmed.strip_prefix("FILE") {
            let Some(fname) = parse_file_path(rest) else { continue };
            let path = resolve_path(dir, &fname);

            finalize_group(toc, group_base, &group_backing, toc.sector_size);
            group_base = toc.end;

            ensure_track(toc, toc.last);
            pregap = 0;
            toc.tracks[toc.last].offset = 0;
            group_byte_offset = 0;

            let uses_binary_keyword = rest.contains("BINARY") || rest.contains("MOTOROLA");
            let backing = if uses_binary_keyword {
                let fd = File::open(&path)?;
                Backing::File(Rc::new(RefCell::new(fd)))
            } else {
                let mut fd = File::open(&path)?;
                let mut head = [0u8; 32];
                fd.seek(SeekFrom::Start(8))?;
                let read_ok = fd.read_exact(&mut head).is_ok();
                fd.seek(SeekFrom::Start(0))?;

                if read_ok && head == WAVE_HEADER {
                    toc.tracks[toc.last].offset -= 44;
                    group_byte_offset = -44;
                    Backing::File(Rc::new(RefCell::new(fd)))
                } else if path.extension().map(|e| e.eq_ignore_ascii_case("ogg")).unwrap_or(false) {
                    Backing::Vorbis(path)
                } else {
                    return Err(TocError::UnsupportedMedia(format!(
                        "{}: not a recognized WAVE or Vorbis stream",
                        path.display()
                    )));
                }
            };
            toc.tracks[toc.last].backing = match &backing {
                Backing::File(f) => Backing::File(f.clone()),
                Backing::Vorbis(p) => Backing::Vorbis(p.clone()),
                Backing::None => Backing::None,
            };
            group_backing = backing;
        } else if trimmed.starts_with("TRACK") {
            let rest = &trimmed[5..];
            let Some(number) = parse_track_number(rest) else { continue };

            if number != toc.last as u32 + 1 {
                return Err(TocError::NonConsecutiveTrack {
                    expected: toc.last as u32 + 1,
                    found: number,
                });
            }

            ensure_track(toc, toc.last);
            if toc.last == 0 {
                if rest.contains("MODE1/2048") {
                    toc.sector_size = 2048;
                    toc.tracks[0].kind = TrackType::Data;
                } else if rest.contains("MODE1/2352") {
                    toc.sector_size = 2352;
                    toc.tracks[0].kind = TrackType::Data;
                }
            } else if matches!(toc.tracks[toc.last].backing, Backing::None) {
                // No FILE preceded this TRACK: it shares the open group's
                // file. Borrow the group's backing and clear the
                // previous track's `end` so the group stays "open".
                toc.tracks[toc.last].backing = match &group_backing {
                    Backing::File(f) => Backing::File(f.clone()),
                    Backing::Vorbis(p) => Backing::Vorbis(p.clone()),
                    Backing::None => Backing::None,
                };
                toc.tracks[toc.last - 1].end = 0;
            }
        } else if let Some(rest) = trimmed.strip_prefix("PREGAP") {
            if let Some((mm, ss, ff)) = parse_mm_ss_ff(rest) {
                pregap += msf_to_sectors(mm, ss, ff);
            }
        } else if let Some(rest) = trimmed.strip_prefix("INDEX") {
            let rest = rest.trim_start();
            if let Some(num_rest) = rest.strip_prefix("00").or_else(|| rest.strip_prefix("0 ")) {
                if let Some((mm, ss, ff)) = parse_mm_ss_ff(num_rest) {
                    if toc.last > 0 && toc.tracks[toc.last - 1].end == 0 {
                        toc.tracks[toc.last - 1].end = group_base + msf_to_sectors(mm, ss, ff) + pregap;
                    }
                }
            } else if let Some(num_rest) = rest.strip_prefix("01").or_else(|| rest.strip_prefix("1 ")) {
                let Some((mm, ss, ff)) = parse_mm_ss_ff(num_rest) else { continue };
                let raw = msf_to_sectors(mm, ss, ff);

                ensure_track(toc, toc.last);
                if toc.tracks[toc.last].offset == 0 {
                    toc.tracks[toc.last].offset = group_byte_offset;
                }
                toc.tracks[toc.last].offset += pregap * 2352;
                toc.tracks[toc.last].offset += group_base * 2352;
                if matches!(toc.tracks[toc.last].backing, Backing::Vorbis(_)) {
                    toc.tracks[toc.last].offset /= 4;
                }

                toc.tracks[toc.last].start = group_base + raw + pregap;

                if toc.last > 0 && toc.tracks[toc.last - 1].end == 0 {
                    toc.tracks[toc.last - 1].end = group_base + raw;
                }

                toc.last += 1;
                if toc.last >= 99 {
                    break;
                }
            }
        }
    }

    finalize_group(toc, group_base, &group_backing, toc.sector_size);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_wav(path: &Path, pcm_bytes: usize) {
        let mut f = File::create(path).unwrap();
        f.write_all(b"RIFF\0\0\0\0").unwrap();
        f.write_all(&WAVE_HEADER).unwrap();
        f.write_all(&vec![0u8; pcm_bytes]).unwrap();
    }

    #[test]
    fn test_parse_mm_ss_ff() {
        assert_eq!(parse_mm_ss_ff("00:02:00"), Some((0, 2, 0)));
        assert_eq!(parse_mm_ss_ff("01:00:00 "), Some((1, 0, 0)));
    }

    #[test]
    fn test_msf_to_sectors() {
        assert_eq!(msf_to_sectors(1, 0, 0), 60 * 75);
        assert_eq!(msf_to_sectors(0, 2, 0), 150);
    }

    #[test]
    fn test_parse_file_path_quoted_and_bare() {
        assert_eq!(parse_file_path(" \"a.wav\" WAVE"), Some("a.wav".to_string()));
        assert_eq!(parse_file_path(" a.bin BINARY"), Some("a.bin".to_string()));
    }

    #[test]
    fn test_s1_two_audio_tracks_sharing_one_wav() {
        let tmp = std::env::temp_dir().join(format!("cue_test_{}_{}", std::process::id(), line!()));
        std::fs::create_dir_all(&tmp).unwrap();
        let wav_path = tmp.join("a.wav");
        write_wav(&wav_path, 60 * 44100 * 4);

        let cue_text = "FILE \"a.wav\" WAVE\nTRACK 01 AUDIO\nINDEX 01 00:00:00\nTRACK 02 AUDIO\nPREGAP 00:02:00\nINDEX 01 00:30:00\n";
        let cue_path = tmp.join("game.cue");
        std::fs::write(&cue_path, cue_text).unwrap();

        let mut toc = Toc {
            sector_size: 0,
            last: 0,
            end: 0,
            tracks: Vec::new(),
            sub: None,
        };
        parse_cue(cue_text, &cue_path, &mut toc).unwrap();

        assert_eq!(toc.last, 2);
        assert_eq!(toc.tracks[0].start, 0);
        assert_eq!(toc.tracks[0].end, 2250);
        assert_eq!(toc.tracks[1].start, 2400);
        assert_eq!(toc.tracks[1].end, 4500);
        assert_eq!(toc.tracks[1].offset, -44 + 150 * 2352);

        std::fs::remove_dir_all(&tmp).ok();
    }

    #[test]
    fn test_non_consecutive_track_number_aborts() {
        let tmp = std::env::temp_dir().join(format!("cue_test_b_{}_{}", std::process::id(), line!()));
        std::fs::create_dir_all(&tmp).unwrap();
        let wav_path = tmp.join("a.wav");
        write_wav(&wav_path, 10 * 44100 * 4);

        let cue_text = "FILE \"a.wav\" WAVE\nTRACK 01 AUDIO\nINDEX 01 00:00:00\nTRACK 03 AUDIO\nINDEX 01 00:05:00\n";
        let cue_path = tmp.join("game.cue");
        std::fs::write(&cue_path, cue_text).unwrap();

        let mut toc = Toc {
            sector_size: 0,
            last: 0,
            end: 0,
            tracks: Vec::new(),
            sub: None,
        };
        let result = parse_cue(cue_text, &cue_path, &mut toc);
        assert!(result.is_err());

        std::fs::remove_dir_all(&tmp).ok();
    }
}
