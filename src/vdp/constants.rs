// VDP constants

/// VRAM size in bytes (64 KiB).
pub(super) const VRAM_SIZE: usize = 0x10000;

/// CRAM size in 9-bit-packed words (64 color entries).
pub(super) const CRAM_WORDS: usize = 64;

/// VSRAM size in words (40 columns worth of per-column v-scroll).
pub(super) const VSRAM_WORDS: usize = 40;

/// Number of distinct pattern names addressable by a 16-bit name index.
pub(super) const PATTERN_COUNT: usize = 2048;

/// Bytes per decoded 8x8 4bpp pattern (64 pixels, one byte per pixel index).
pub(super) const PATTERN_BYTES: usize = 64;

/// Flip variants stored per pattern: none, h, v, hv.
pub(super) const FLIP_VARIANTS: usize = 4;

/// Base offsets (in pattern-cache units of `PATTERN_BYTES`) for each flip
/// variant, matching the four quadrants of the packed pattern cache.
pub(super) const FLIP_VARIANT_BASE: [usize; FLIP_VARIANTS] =
    [0x00000, 0x20000, 0x40000, 0x60000];

/// `name_lut` size: sprite-size-class × cell coordinate entries.
pub(super) const NAME_LUT_SIZE: usize = 1024;

/// Active display height for 224-line mode (most titles).
pub const VDP_HEIGHT_224: u16 = 224;

/// Active display height for 240-line mode (PAL-only extended mode).
pub const VDP_HEIGHT_240: u16 = 240;

/// Cycles subtracted from a line when HINT fires at line start (the
/// "HINT-before-render" early-out).
pub const HINT_EARLY_OUT_CYCLES: u32 = 36;

/// 68k cycles run immediately after VBLANK is raised, before Z80 catches up
/// (the "VINT-after-HINT" delay).
pub const VINT_M68K_DELAY_CYCLES: u32 = 84;

/// Remaining Z80 cycles of its first post-VBLANK scanline.
pub const VINT_Z80_TAIL_CYCLES: u32 = 39;
