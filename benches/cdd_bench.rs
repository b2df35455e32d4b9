// CDD Benchmarks
// Performance benchmarks for the CD-drive processor's per-interrupt update
// path, command dispatch, and the CD-DA fader.

use criterion::{criterion_group, criterion_main, Criterion};
use genesis_frame_engine::cdd::command;
use genesis_frame_engine::cdd::fader::{Fader, VOLUME_MAX};
use genesis_frame_engine::cdd::toc::{Backing, Track, TrackType};
use genesis_frame_engine::{Cdd, CddStatus};
use std::hint::black_box;

fn playing_cdd() -> Cdd {
    let mut cdd = Cdd::new();
    let t0 = Track {
        kind: TrackType::Data,
        start: 0,
        end: 1_000_000,
        offset: 0,
        backing: Backing::None,
    };
    cdd.toc.tracks.push(t0);
    cdd.toc.last = 1;
    cdd.toc.end = 1_000_000;
    cdd.status = CddStatus::Play;
    cdd.index = 0;
    cdd
}

fn bench_update(c: &mut Criterion) {
    let mut group = c.benchmark_group("cdd_update");

    group.bench_function("play_tick", |b| {
        let mut cdd = playing_cdd();
        b.iter(|| {
            cdd.update();
            black_box(cdd.lba);
        });
    });

    group.bench_function("scan_tick", |b| {
        let mut cdd = playing_cdd();
        cdd.status = CddStatus::Scan;
        cdd.scan_offset = genesis_frame_engine::cdd::CD_SCAN_SPEED;
        b.iter(|| {
            cdd.update();
            black_box(cdd.lba);
        });
    });

    group.finish();
}

fn bench_command_dispatch(c: &mut Criterion) {
    let mut group = c.benchmark_group("cdd_command");

    group.bench_function("process_status", |b| {
        let mut cdd = Cdd::new();
        cdd.regs.cmd[0] = 0x00; // CMD_STATUS
        b.iter(|| {
            command::process(&mut cdd);
            black_box(&cdd.regs.stat);
        });
    });

    group.finish();
}

fn bench_fader(c: &mut Criterion) {
    let mut group = c.benchmark_group("cdd_fader");

    group.bench_function("process_1024_samples", |b| {
        let pcm = vec![(0x4000i16, 0x4000i16); 1024];
        b.iter(|| {
            let mut fader = Fader::new();
            fader.set_cur_vol(0);
            let mut out = Vec::with_capacity(1024);
            fader.process(black_box(&pcm), VOLUME_MAX, &mut out);
            black_box(out.len());
        });
    });

    group.finish();
}

criterion_group!(benches, bench_update, bench_command_dispatch, bench_fader);
criterion_main!(benches);
