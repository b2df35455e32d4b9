// Background rendering: planes A/B, window clipping (C2, )

use super::pattern_cache::PatternCache;
use super::registers::{interlace_mode2, window_inverted, REGISTER_COUNT};

/// One decoded nametable entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NameEntry {
    pub name: u16,
    pub palette: u8,
    pub priority: bool,
    pub hflip: bool,
    pub vflip: bool,
}

impl NameEntry {
    pub fn decode(word: u16) -> Self {
        NameEntry {
            name: word & 0x07FF,
            palette: ((word >> 13) & 0x03) as u8,
            priority: word & 0x8000 != 0,
            hflip: word & 0x0800 != 0,
            vflip: word & 0x1000 != 0,
        }
    }

    /// Flip-variant index into the pattern cache (0=none,1=h,2=v,3=hv).
    fn flip_variant(self) -> usize {
        match (self.hflip, self.vflip) {
            (false, false) => 0,
            (true, false) => 1,
            (false, true) => 2,
            (true, true) => 3,
        }
    }

    pub fn pixel_word(self, color_index: u8) -> u8 {
        (self.priority as u8) << 6 | (self.palette << 4) | (color_index & 0x0F)
    }
}

/// Window/clip rectangle in effect for one line Window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WindowClip {
    pub left: u16,
    pub right: u16,
    pub enable: bool,
}

/// Recompute the window clip for the current line from R17/R18. Only
/// needs to run when those registers change, but is cheap enough to call
/// unconditionally per line.
pub fn compute_window_clip(regs: &[u8; REGISTER_COUNT], line: u16, width: u16) -> WindowClip {
    let r17 = regs[super::registers::R17_WINDOW_H];
    let r18 = regs[super::registers::R18_WINDOW_V];
    let h_pos = ((r17 & 0x1F) as u16) * 16;
    let h_right = r17 & 0x80 != 0;
    let v_pos = ((r18 & 0x1F) as u16) * 8;
    let v_down = r18 & 0x80 != 0;

    let vertical_hit = if v_down {
        line >= v_pos
    } else {
        v_pos != 0 && line < v_pos
    };

    if h_pos == 0 && !vertical_hit {
        return WindowClip {
            left: 0,
            right: 0,
            enable: false,
        };
    }

    if vertical_hit {
        return WindowClip {
            left: 0,
            right: width,
            enable: true,
        };
    }

    let (left, right) = if h_right {
        (h_pos, width)
    } else {
        (0, h_pos)
    };
    WindowClip {
        left,
        right,
        enable: left < right,
    }
}

/// Render one plane's raw pixel-word line (palette/priority byte per pixel,
/// no window/sprite compositing yet).
///
/// `nametable_row` holds one logical row of nametable words for the plane,
/// already selected by vertical scroll; `hscroll` is the horizontal scroll
/// value for this plane and line.
pub fn render_plane_line(
    nametable_row: &[u16],
    cache: &PatternCache,
    hscroll: u16,
    fine_row: u8,
    width: usize,
    regs: &[u8; REGISTER_COUNT],
) -> Vec<u8> {
    let im2 = interlace_mode2(regs);
    let mut out = vec![0u8; width];
    let tiles = nametable_row.len();
    let scroll = hscroll as usize % (tiles * 8).max(1);

    for x in 0..width {
        let src_x = (x + scroll) % (tiles * 8).max(1);
        let tile_index = src_x / 8;
        let col_in_tile = src_x % 8;
        let entry = NameEntry::decode(nametable_row[tile_index]);
        let variant = entry.flip_variant();

        // DRAW_COLUMN_IM2: a 16-row tile is two consecutive 8-row pattern
        // names, picked by `fine_row`'s bit 3; vflip (attribute bit 12)
        // both selects the vertically-reversed cache variant (reversing
        // rows within each 8-row half, as usual) and XORs the half
        // selector, so a vflipped tile shows its lower half first.
        let cache_row = if im2 {
            let local_row = fine_row & 0x07;
            let half = ((fine_row >> 3) ^ entry.vflip as u8) & 0x01;
            let effective_name = ((entry.name & 0x03FF) << 1) | half as u16;
            cache.row(effective_name, variant, local_row)
        } else {
            cache.row(entry.name, variant, fine_row & 0x07)
        };

        let col = if entry.hflip {
            7 - col_in_tile
        } else {
            col_in_tile
        };
        out[x] = entry.pixel_word(cache_row[col]);
    }
    out
}

/// Apply the documented window-plane-A fine-hscroll bug: when the window's
/// left clip starts at a non-zero scroll offset, the first column read from
/// plane A uses nametable index `n` rather than `n-1`.
pub fn plane_a_column_index(hscroll_fine_start: u16, window_on_left: bool, column: usize) -> usize {
    if window_on_left && hscroll_fine_start != 0 && column == 0 {
        column
    } else {
        column.wrapping_sub(1).min(column)
    }
}

/// Render the window's substitute row for plane A: the window cannot
/// scroll, so columns are addressed directly (modulo the fine-hscroll bug
/// at the clip boundary) rather than through the plane's `hscroll` value.
pub fn render_window_line(
    nametable_row: &[u16],
    cache: &PatternCache,
    fine_row: u8,
    width: usize,
    hscroll_fine_start: u16,
    window_on_left: bool,
) -> Vec<u8> {
    let mut out = vec![0u8; width];
    let tiles = nametable_row.len().max(1);

    for x in 0..width {
        let cell = x / 8;
        let col_in_tile = x % 8;
        let tile_index = plane_a_column_index(hscroll_fine_start, window_on_left, cell) % tiles;
        let entry = NameEntry::decode(nametable_row[tile_index]);
        let variant = entry.flip_variant();
        let row = fine_row & 0x07;
        let cache_row = cache.row(entry.name, variant, row);
        let col = if entry.hflip {
            7 - col_in_tile
        } else {
            col_in_tile
        };
        out[x] = entry.pixel_word(cache_row[col]);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_entry_decode() {
        let word = 0x8000 | (0b10 << 13) | 0x0800 | 0x1234;
        let entry = NameEntry::decode(word);
        assert!(entry.priority);
        assert_eq!(entry.palette, 0b10);
        assert!(entry.hflip);
        assert!(!entry.vflip);
        assert_eq!(entry.name, 0x1234 & 0x07FF);
    }

    #[test]
    fn test_flip_variant_mapping() {
        assert_eq!(NameEntry::decode(0).flip_variant(), 0);
        assert_eq!(NameEntry::decode(0x0800).flip_variant(), 1);
        assert_eq!(NameEntry::decode(0x1000).flip_variant(), 2);
        assert_eq!(NameEntry::decode(0x1800).flip_variant(), 3);
    }

    #[test]
    fn test_window_clip_disabled_when_inactive() {
        let regs = [0u8; REGISTER_COUNT];
        let clip = compute_window_clip(&regs, 100, 320);
        assert!(!clip.enable);
    }

    #[test]
    fn test_window_clip_vertical_hit_covers_full_width() {
        let mut regs = [0u8; REGISTER_COUNT];
        regs[super::super::registers::R18_WINDOW_V] = 0x85; // down, pos=5*8=40
        let clip = compute_window_clip(&regs, 100, 320);
        assert!(clip.enable);
        assert_eq!(clip.left, 0);
        assert_eq!(clip.right, 320);
    }

    #[test]
    fn test_window_inverted_flag_readable() {
        let mut regs = [0u8; REGISTER_COUNT];
        regs[super::registers::R17_WINDOW_H] = 0x80;
        assert!(window_inverted(&regs));
    }

    #[test]
    fn test_plane_a_column_index_bug_only_on_first_left_column() {
        // Normal case: reads index n-1.
        assert_eq!(plane_a_column_index(8, true, 5), 4);
        // Bug: window on the left, nonzero fine scroll, first column -> n.
        assert_eq!(plane_a_column_index(8, true, 0), 0);
        // No bug when scroll is exactly zero.
        assert_eq!(plane_a_column_index(0, true, 0), 0);
        // No bug when the window is on the right half.
        assert_eq!(plane_a_column_index(8, false, 0), 0);
    }

    #[test]
    fn test_render_window_line_uses_unscrolled_addressing() {
        let mut cache = PatternCache::new();
        let mut vram = vec![0u8; 64];
        vram[0] = 0x01;
        vram[1] = 0x23;
        vram[2] = 0x45;
        vram[3] = 0x67;
        cache.update(0, &vram);

        // Two tiles: name 0 (decoded pattern above), name 0 again.
        let nametable_row = vec![0u16, 0u16];
        let out = render_window_line(&nametable_row, &cache, 0, 16, 0, true);
        assert_eq!(out[0] & 0x0F, 0);
        assert_eq!(out[7] & 0x0F, 7);
    }
}
