// VDP - Pattern/Color LUT Engine (C1) + Raster Pipeline (C2)
//
// Owns VRAM/CRAM/VSRAM, the register file, the pattern cache and priority
// LUTs, and renders one scanline at a time into a host pixel buffer. The
// frame scheduler (see `crate::scheduler`) drives this one line per call.

pub mod background;
pub mod constants;
pub mod luts;
pub mod output;
pub mod pattern_cache;
pub mod registers;
pub mod scroll;
pub mod sprite;

use crate::config::{CellMode, PixelDepth};
use background::{compute_window_clip, render_plane_line, render_window_line, WindowClip};
use constants::{NAME_LUT_SIZE, VRAM_SIZE, VSRAM_WORDS};
use luts::LutEngine;
use pattern_cache::PatternCache;
use registers::{
    display_enabled, full_palette_enabled, left_column_blank, window_inverted, REGISTER_COUNT,
};
use sprite::{build_name_lut, draw_line, parse_line, SpriteObject};

/// VBLANK flag.
pub const STATUS_VBLANK: u16 = 1 << 3;
/// Interlace odd-frame carry.
pub const STATUS_ODD_FRAME: u16 = 1 << 4;
/// Sprite collision flag.
pub const STATUS_SPRITE_COLLISION: u16 = 1 << 5;
/// Sprite overflow flag.
pub const STATUS_SPRITE_OVERFLOW: u16 = 1 << 6;

pub struct Vdp {
    pub regs: [u8; REGISTER_COUNT],
    pub vram: Vec<u8>,
    pub cram: [u16; 64],
    pub vsram: [u16; VSRAM_WORDS],
    pub status: u16,

    pattern_cache: PatternCache,
    luts: LutEngine,
    name_lut: Box<[u16; NAME_LUT_SIZE]>,

    /// Horizontal scroll table, one 32-bit `(b<<16)|a` entry per line.
    pub hscroll_table: Vec<u32>,

    cell_mode: CellMode,
    /// Double-buffered sprite lists: `sprite_lists[parse_target]` is being
    /// filled for the next line while the other is drawn for this one.
    sprite_lists: [Vec<SpriteObject>; 2],
    parse_target: usize,
    window_clip: WindowClip,
    odd_frame: bool,
}

impl Vdp {
    pub fn new(cell_mode: CellMode) -> Self {
        let height_lines = 313usize;
        Vdp {
            regs: [0u8; REGISTER_COUNT],
            vram: vec![0u8; VRAM_SIZE],
            cram: [0u16; 64],
            vsram: [0u16; VSRAM_WORDS],
            status: 0,
            pattern_cache: PatternCache::new(),
            luts: LutEngine::new(),
            name_lut: build_name_lut(),
            hscroll_table: vec![0u32; height_lines],
            cell_mode,
            sprite_lists: [Vec::new(), Vec::new()],
            parse_target: 0,
            window_clip: WindowClip::default(),
            odd_frame: false,
        }
    }

    pub fn write_register(&mut self, index: usize, value: u8) {
        if index < REGISTER_COUNT {
            self.regs[index] = value;
        }
    }

    /// Write a byte to VRAM, marking the owning pattern name's row dirty.
    pub fn write_vram(&mut self, addr: u16, value: u8) {
        self.vram[addr as usize] = value;
        let pattern_bytes = 32usize;
        let name = (addr as usize / pattern_bytes) as u16;
        let row = ((addr as usize % pattern_bytes) / 4) as u8;
        self.pattern_cache.mark_dirty(name, row);
    }

    pub fn toggle_odd_frame(&mut self) {
        self.odd_frame = !self.odd_frame;
        if self.odd_frame {
            self.status |= STATUS_ODD_FRAME;
        } else {
            self.status &= !STATUS_ODD_FRAME;
        }
    }

    /// Parse sprites covering `next_line` into the currently-inactive
    /// buffer: the previous line's list is consumed for drawing while the
    /// next line's is parsed from the SAT copy here.
    pub fn pre_parse_sprites(&mut self, sat: &[SpriteObject], next_line: i16) {
        let limit = self.cell_mode.sprites_per_line();
        let (visible, overflow) = parse_line(sat, next_line, limit);
        let target = 1 - self.parse_target;
        self.sprite_lists[target] = visible;
        if overflow {
            self.status |= STATUS_SPRITE_OVERFLOW;
        }
        self.parse_target = target;
    }

    fn active_sprite_list(&self) -> &[SpriteObject] {
        &self.sprite_lists[1 - self.parse_target]
    }

    /// Number of sprites parsed for the line currently being drawn, for
    /// trace logging.
    pub fn active_sprite_count(&self) -> usize {
        self.active_sprite_list().len()
    }

    /// Render the overscan/border strip: the whole line is filled with the
    /// background color (used when display is disabled or we're in a
    /// vertical border).
    pub fn render_border_line(&self) -> Vec<u32> {
        let width = self.cell_mode.viewport_width();
        let bg_color = self.background_color_pixel();
        let line = output::fill_border(width, bg_color);
        self.remap_to_host(&line)
    }

    fn background_color_pixel(&self) -> u8 {
        // Backdrop color is palette/color index stored in R7 on real
        // hardware; approximated here as a direct pixel word with palette
        // bits 5:4 and color bits 3:0 taken from R7.
        self.regs.get(7).copied().unwrap_or(0) & 0x3F
    }

    /// Render one visible scanline into a host pixel buffer of the
    /// configured output depth.
    pub fn render_line(
        &mut self,
        line: u16,
        plane_a_nametable: &[u16],
        plane_b_nametable: &[u16],
        shadow_highlight: bool,
        output_depth: PixelDepth,
    ) -> Vec<u32> {
        let width = self.cell_mode.viewport_width();

        if !display_enabled(&self.regs) {
            let line = output::fill_border(width, self.background_color_pixel());
            return self.remap_to_host_depth(&line, output_depth);
        }

        self.window_clip = compute_window_clip(&self.regs, line, width as u16);

        let hscroll = scroll::read_hscroll(&self.regs, &self.hscroll_table, line);
        // IM2 tiles are 16 rows tall (two stacked 8-row patterns); see
        // `render_plane_line`'s DRAW_COLUMN_IM2 path.
        let fine_row = if self.interlace_mode2() {
            (line % 16) as u8
        } else {
            (line % 8) as u8
        };

        let mut plane_a = render_plane_line(
            plane_a_nametable,
            &self.pattern_cache,
            hscroll.a,
            fine_row,
            width,
            &self.regs,
        );
        let plane_b = render_plane_line(
            plane_b_nametable,
            &self.pattern_cache,
            hscroll.b,
            fine_row,
            width,
            &self.regs,
        );

        // Window: substitute plane A's content with the window's own
        // (unscrolled) reading of the same nametable within its clip range.
        if self.window_clip.enable {
            let window_on_left = !window_inverted(&self.regs);
            let window_line = render_window_line(
                plane_a_nametable,
                &self.pattern_cache,
                fine_row,
                width,
                hscroll.a,
                window_on_left,
            );
            let left = self.window_clip.left as usize;
            let right = (self.window_clip.right as usize).min(width);
            if left < right {
                plane_a[left..right].copy_from_slice(&window_line[left..right]);
            }
        }

        let mut merged = output::merge_line(&plane_a, &plane_b, &vec![0u8; width], &self.luts, shadow_highlight);

        let sprites = self.active_sprite_list().to_vec();
        let result = draw_line(
            &sprites,
            line as i16,
            &mut merged,
            &self.pattern_cache,
            &self.name_lut,
            width,
        );
        if result.overflow {
            self.status |= STATUS_SPRITE_OVERFLOW;
        }
        if result.collision {
            self.status |= STATUS_SPRITE_COLLISION;
        }

        output::apply_left_column_mask(
            &mut merged,
            left_column_blank(&self.regs),
            self.background_color_pixel(),
        );

        self.remap_to_host_depth(&merged, output_depth)
    }

    fn remap_to_host(&self, line: &[u8]) -> Vec<u32> {
        self.remap_to_host_depth(line, PixelDepth::Bpp16)
    }

    fn remap_to_host_depth(&self, line: &[u8], depth: PixelDepth) -> Vec<u32> {
        let full_palette = full_palette_enabled(&self.regs);
        line.iter()
            .map(|&pixel| {
                let rgb = output::pixel_to_rgb(pixel, &self.cram, full_palette);
                output::pack_pixel(rgb, depth)
            })
            .collect()
    }

    /// Re-decode any pattern cache entries dirtied by VRAM writes since the
    /// last call. Must run before rendering the line(s) that depend on
 /// them
    pub fn update_pattern_cache(&mut self, names: impl IntoIterator<Item = u16>) {
        for name in names {
            if self.pattern_cache.is_dirty(name) {
                self.pattern_cache.update(name, &self.vram);
            }
        }
    }

    /// HINT reload value (R10): the frame scheduler reloads its down-counter
    /// from this on underflow.
    pub fn hint_reload(&self) -> u8 {
        self.regs[10]
    }

    pub fn hint_irq_enabled(&self) -> bool {
        registers::hint_irq_enabled(&self.regs)
    }

    pub fn vint_irq_enabled(&self) -> bool {
        registers::vint_irq_enabled(&self.regs)
    }

    pub fn interlace_mode2(&self) -> bool {
        registers::interlace_mode2(&self.regs)
    }

    /// Plane A/B nametable base addresses, decoded from R2/R4 (Mode 5
    /// layout: R2 bits 5:3 select a 0x400-aligned base for plane A, R4 bits
    /// 2:0 select a 0x2000-aligned base for plane B).
    pub fn plane_nametable_bases(&self) -> (u16, u16) {
        let a = ((self.regs[2] as u16) & 0b0011_1000) << 10;
        let b = ((self.regs[4] as u16) & 0b0000_0111) << 13;
        (a, b)
    }

    /// Read one row of a plane's nametable (`width_cells` 16-bit entries
    /// starting at `base + row * width_cells * 2`), for the scheduler to
    /// hand to `render_line`.
    pub fn read_nametable_row(&self, base: u16, row: u16, width_cells: usize) -> Vec<u16> {
        let row_base = base as usize + row as usize * width_cells * 2;
        (0..width_cells)
            .map(|col| {
                let addr = row_base + col * 2;
                if addr + 1 < self.vram.len() {
                    u16::from_be_bytes([self.vram[addr], self.vram[addr + 1]])
                } else {
                    0
                }
            })
            .collect()
    }

    /// Sprite Attribute Table base address, decoded from R5 (Mode 5 layout:
    /// 32-cell mode aligns to a 0x200 boundary with all 7 bits significant;
    /// 40-cell mode drops bit 0, aligning to a 0x400 boundary).
    fn sat_base(&self) -> u16 {
        match self.cell_mode {
            CellMode::Cell32 => ((self.regs[5] as u16) & 0x7F) << 9,
            CellMode::Cell40 => ((self.regs[5] as u16) & 0x7E) << 9,
        }
    }

    /// Decode every SAT slot from VRAM in table order (not link order), for
    /// `pre_parse_sprites` to walk.
    pub fn read_sat(&self) -> Vec<SpriteObject> {
        let base = self.sat_base() as usize;
        let entries = self.cell_mode.sat_entries();
        let mut sat = Vec::with_capacity(entries);
        for i in 0..entries {
            let addr = base + i * 8;
            if addr + 7 >= self.vram.len() {
                sat.push(SpriteObject { ypos: -128, xpos: 0, attr: 0, size: 0, link: 0 });
                continue;
            }
            let word0 = u16::from_be_bytes([self.vram[addr], self.vram[addr + 1]]);
            let ypos = (word0 & 0x3FF) as i16 - 128;
            let size = self.vram[addr + 2] & 0x0F;
            let link = self.vram[addr + 3] & 0x7F;
            let attr = u16::from_be_bytes([self.vram[addr + 4], self.vram[addr + 5]]);
            let xpos = u16::from_be_bytes([self.vram[addr + 6], self.vram[addr + 7]]) & 0x1FF;
            sat.push(SpriteObject { ypos, xpos, attr, size, link });
        }
        sat
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vdp_new_has_blank_status() {
        let vdp = Vdp::new(CellMode::Cell40);
        assert_eq!(vdp.status, 0);
    }

    #[test]
    fn test_write_vram_marks_pattern_dirty() {
        let mut vdp = Vdp::new(CellMode::Cell40);
        vdp.update_pattern_cache([0u16]);
        vdp.write_vram(0, 0xFF);
        assert!(vdp.pattern_cache.is_dirty(0));
    }

    #[test]
    fn test_toggle_odd_frame_sets_status_bit() {
        let mut vdp = Vdp::new(CellMode::Cell40);
        vdp.toggle_odd_frame();
        assert_eq!(vdp.status & STATUS_ODD_FRAME, STATUS_ODD_FRAME);
        vdp.toggle_odd_frame();
        assert_eq!(vdp.status & STATUS_ODD_FRAME, 0);
    }

    #[test]
    fn test_render_line_disabled_display_is_background_fill() {
        let mut vdp = Vdp::new(CellMode::Cell40);
        let plane = vec![0u16; 40];
        let line = vdp.render_line(0, &plane, &plane, false, PixelDepth::Bpp16);
        assert_eq!(line.len(), 320);
    }

    #[test]
    fn test_sprite_overflow_propagates_to_status() {
        let mut vdp = Vdp::new(CellMode::Cell40);
        let mut sat = Vec::new();
        for i in 0..25u8 {
            sat.push(SpriteObject {
                ypos: 0,
                xpos: i as u16,
                attr: 1,
                size: 0,
                link: if i + 1 < 25 { i + 1 } else { 0 },
            });
        }
        vdp.pre_parse_sprites(&sat, 0);
        assert_eq!(vdp.status & STATUS_SPRITE_OVERFLOW, STATUS_SPRITE_OVERFLOW);
    }
}
