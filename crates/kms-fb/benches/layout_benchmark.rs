// SPDX-FileCopyrightText: Copyright 2025 Au-Zone Technologies
// SPDX-License-Identifier: Apache-2.0

//! Criterion benchmarks for layout calculation, NV12 conversion and CPU
//! views on the in-memory backend.
//!
//! ## Run
//! ```bash
//! cargo bench --bench layout_benchmark
//! ```
//!
//! ## Machine-readable output
//! ```bash
//! cargo bench --bench layout_benchmark -- --output-format bencher
//! ```

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use four_char_code::FourCharCode;
use kms_fb::convert::{nv12_to_xrgb8888, xrgb8888_to_nv12, Nv12Layout};
use kms_fb::{
    calc_fb_layout, DeviceInfo, Framebuffer, MemoryBackend, PixelFormat, Tiling, NV12, XRGB8888,
};

// =============================================================================
// Resolution and format matrices
// =============================================================================

const RESOLUTIONS: &[(u32, u32)] = &[(640, 480), (1280, 720), (1920, 1080), (3840, 2160)];

const FORMATS: &[(&str, FourCharCode)] = &[("XR24", XRGB8888), ("NV12", NV12)];

fn config_id(width: u32, height: u32, format: &str) -> String {
    format!("{width}x{height}/{format}")
}

// =============================================================================
// Layout Benchmarks
// =============================================================================

fn bench_layout(c: &mut Criterion) {
    let mut group = c.benchmark_group("layout");

    let devices = [("gen9", DeviceInfo::default()), ("gen3", DeviceInfo::new(3))];

    for (device_name, device) in devices {
        for &(name, code) in FORMATS {
            let Ok(format) = PixelFormat::lookup(code) else {
                eprintln!("Skipping unknown format {name}");
                continue;
            };
            for tiling in Tiling::ALL {
                let id = format!("{device_name}/{name}/{tiling}");
                group.bench_function(BenchmarkId::new("1920x1080", id), |b| {
                    b.iter(|| {
                        let layout = calc_fb_layout(
                            black_box(&device),
                            black_box(1920),
                            black_box(1080),
                            format,
                            tiling,
                        );
                        black_box(layout.ok());
                    });
                });
            }
        }
    }

    group.finish();
}

// =============================================================================
// Conversion Benchmarks
// =============================================================================

fn bench_convert(c: &mut Criterion) {
    let mut group = c.benchmark_group("convert");
    group.sample_size(10);

    for &(width, height) in RESOLUTIONS {
        let stride = width as usize;
        let layout = Nv12Layout {
            stride,
            y_offset: 0,
            uv_offset: stride * height as usize,
        };
        let mut nv12 = vec![0x80u8; stride * height as usize * 3 / 2];
        let rgb_stride = width as usize * 4;
        let mut rgb = vec![0u8; rgb_stride * height as usize];

        group.throughput(Throughput::Bytes(rgb.len() as u64));

        group.bench_with_input(
            BenchmarkId::new("nv12_to_xrgb8888", config_id(width, height, "NV12")),
            &(width, height),
            |b, &(w, h)| {
                b.iter(|| {
                    nv12_to_xrgb8888(w, h, &nv12, &layout, &mut rgb, rgb_stride)
                        .expect("decode failed");
                    black_box(&rgb);
                });
            },
        );

        group.bench_with_input(
            BenchmarkId::new("xrgb8888_to_nv12", config_id(width, height, "XR24")),
            &(width, height),
            |b, &(w, h)| {
                b.iter(|| {
                    xrgb8888_to_nv12(w, h, &rgb, rgb_stride, &mut nv12, &layout)
                        .expect("encode failed");
                    black_box(&nv12);
                });
            },
        );
    }

    group.finish();
}

// =============================================================================
// CPU View Benchmarks
// =============================================================================

fn bench_view(c: &mut Criterion) {
    let mut group = c.benchmark_group("cpu_view");
    group.sample_size(10);

    let device = DeviceInfo::default();

    for &(width, height) in RESOLUTIONS {
        for &(name, code) in FORMATS {
            for tiling in [Tiling::Linear, Tiling::Y] {
                let mut backend = MemoryBackend::new();
                let mut fb =
                    match Framebuffer::create(&mut backend, &device, width, height, code, tiling) {
                        Ok(fb) => fb,
                        Err(e) => {
                            eprintln!("Skipping {}: {e}", config_id(width, height, name));
                            continue;
                        }
                    };

                group.throughput(Throughput::Bytes(fb.size() as u64));
                group.bench_function(
                    BenchmarkId::new(tiling.to_string(), config_id(width, height, name)),
                    |b| {
                        b.iter(|| {
                            let mut view = fb.cpu_view(&mut backend).expect("view failed");
                            black_box(view.pixels().len());
                            view.finish().expect("release failed");
                        });
                    },
                );
            }
        }
    }

    group.finish();
}

criterion_group!(benches, bench_layout, bench_convert, bench_view);
criterion_main!(benches);
