use std::io::Write;

use criterion::{Criterion, criterion_group, criterion_main};
use sym560_device::RegisterWindow;
use tempfile::NamedTempFile;

const WINDOW_LEN: usize = 0x200;

fn mapped_window() -> (NamedTempFile, RegisterWindow) {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(&[0u8; WINDOW_LEN]).unwrap();
    file.flush().unwrap();
    let win = RegisterWindow::map_file(file.path(), 0).unwrap();
    (file, win)
}

fn bench_register_reads(c: &mut Criterion) {
    let (_file, win) = mapped_window();
    win.write_u32(0x118, 0xA5A5_5A5A).unwrap();

    let mut group = c.benchmark_group("register_read");
    group.bench_function("u8", |b| {
        b.iter(|| win.read(std::hint::black_box(0x118), 1).unwrap())
    });
    group.bench_function("u32_aligned", |b| {
        b.iter(|| win.read(std::hint::black_box(0x118), 4).unwrap())
    });
    group.bench_function("u32_unaligned", |b| {
        b.iter(|| win.read(std::hint::black_box(0x119), 4).unwrap())
    });
    group.finish();
}

fn bench_register_writes(c: &mut Criterion) {
    let (_file, win) = mapped_window();

    let mut group = c.benchmark_group("register_write");
    group.bench_function("u8", |b| {
        b.iter(|| win.write(0x118, 1, std::hint::black_box(0x47)).unwrap())
    });
    group.bench_function("u32_aligned", |b| {
        b.iter(|| {
            win.write(0x118, 4, std::hint::black_box(0xDEAD_BEEF))
                .unwrap()
        })
    });
    group.bench_function("u32_unaligned", |b| {
        b.iter(|| {
            win.write(0x119, 4, std::hint::black_box(0xDEAD_BEEF))
                .unwrap()
        })
    });
    group.finish();
}

criterion_group!(benches, bench_register_reads, bench_register_writes);
criterion_main!(benches);
