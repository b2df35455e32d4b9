// VDP Benchmarks
// Performance benchmarks for the raster pipeline's hot per-line path and
// the pattern cache rebuild path.

use criterion::{criterion_group, criterion_main, Criterion};
use genesis_frame_engine::config::{CellMode, PixelDepth};
use genesis_frame_engine::Vdp;
use std::hint::black_box;

/// Fill VRAM with a repeating pattern and nametable, and set up register
/// state so `render_line` exercises the whole pipeline (planes, scroll,
/// sprites, merge, depth remap).
fn populated_vdp(cell_mode: CellMode) -> Vdp {
    let mut vdp = Vdp::new(cell_mode);

    for name in 0..256u16 {
        let base = name as u32 * 32;
        for row in 0..8u32 {
            let offset = base + row * 4;
            if offset + 4 <= 0x10000 {
                for (i, byte) in [0x12u8, 0x34, 0x56, 0x78].iter().enumerate() {
                    vdp.write_vram((offset + i as u32) as u16, *byte);
                }
            }
        }
    }

    for reg in 0..24u8 {
        vdp.write_register(reg, 0);
    }
    vdp.write_register(1, 0x40); // display enable

    vdp
}

fn bench_render_line(c: &mut Criterion) {
    let mut group = c.benchmark_group("vdp_render_line");
    group.sample_size(30);

    group.bench_function("cell40_bpp16", |b| {
        let mut vdp = populated_vdp(CellMode::Cell40);
        let plane_a = vec![0u16; 40];
        let plane_b = vec![0u16; 40];
        let sat = vdp.read_sat();
        vdp.pre_parse_sprites(&sat, 0);

        b.iter(|| {
            black_box(vdp.render_line(0, &plane_a, &plane_b, false, PixelDepth::Bpp16));
        });
    });

    group.bench_function("cell32_bpp32", |b| {
        let mut vdp = populated_vdp(CellMode::Cell32);
        let plane_a = vec![0u16; 32];
        let plane_b = vec![0u16; 32];
        let sat = vdp.read_sat();
        vdp.pre_parse_sprites(&sat, 0);

        b.iter(|| {
            black_box(vdp.render_line(0, &plane_a, &plane_b, false, PixelDepth::Bpp32));
        });
    });

    group.finish();
}

fn bench_full_frame(c: &mut Criterion) {
    let mut group = c.benchmark_group("vdp_full_frame");
    group.sample_size(10);

    group.bench_function("all_lines_cell40", |b| {
        b.iter(|| {
            let mut vdp = populated_vdp(CellMode::Cell40);
            let plane_a = vec![0u16; 40];
            let plane_b = vec![0u16; 40];
            for line in 0..224u16 {
                let sat = vdp.read_sat();
                vdp.pre_parse_sprites(&sat, line as i16);
                black_box(vdp.render_line(line, &plane_a, &plane_b, false, PixelDepth::Bpp16));
            }
        });
    });

    group.finish();
}

fn bench_pattern_cache_rebuild(c: &mut Criterion) {
    let mut group = c.benchmark_group("vdp_vram_write");

    group.bench_function("write_vram_sequential", |b| {
        let mut vdp = populated_vdp(CellMode::Cell40);
        b.iter(|| {
            for offset in 0..512u16 {
                vdp.write_vram(offset, black_box(0xAA));
            }
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_render_line,
    bench_full_frame,
    bench_pattern_cache_rebuild
);
criterion_main!(benches);
