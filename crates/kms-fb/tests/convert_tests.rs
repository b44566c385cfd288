// SPDX-FileCopyrightText: Copyright 2025 Au-Zone Technologies
// SPDX-License-Identifier: Apache-2.0

//! NV12 <-> XRGB8888 conversion tests.
//!
//! Run with: cargo test --test convert_tests

use four_char_code::four_char_code;
use kms_fb::convert::{ensure_convertible, nv12_to_xrgb8888, xrgb8888_to_nv12, Nv12Layout};
use kms_fb::format::drm_fourcc;
use kms_fb::{Error, PixelFormat, NV12, XRGB8888};

/// NV12 image in a tightly packed buffer.
struct Nv12Image {
    width: u32,
    height: u32,
    layout: Nv12Layout,
    data: Vec<u8>,
}

impl Nv12Image {
    fn new(width: u32, height: u32) -> Self {
        let stride = (width as usize).div_ceil(2) * 2;
        let chroma_rows = (height as usize).div_ceil(2);
        let layout = Nv12Layout {
            stride,
            y_offset: 0,
            uv_offset: stride * height as usize,
        };
        Self {
            width,
            height,
            layout,
            data: vec![0; stride * (height as usize + chroma_rows)],
        }
    }

    /// Smooth luma ramp and gentle chroma ramps that stay clear of clamping.
    fn gradient(width: u32, height: u32) -> Self {
        let mut img = Self::new(width, height);
        for i in 0..height as usize {
            for j in 0..width as usize {
                img.data[i * img.layout.stride + j] = (60 + (2 * i + j) % 120) as u8;
            }
        }
        for i in 0..(height as usize).div_ceil(2) {
            for j in 0..(width as usize).div_ceil(2) {
                let at = img.layout.uv_offset + i * img.layout.stride + 2 * j;
                img.data[at] = (112 + j % 32) as u8;
                img.data[at + 1] = (144 - i % 32) as u8;
            }
        }
        img
    }

    fn y(&self, x: usize, y: usize) -> u8 {
        self.data[self.layout.y_offset + y * self.layout.stride + x]
    }

    fn uv(&self, x: usize, y: usize) -> (u8, u8) {
        let at = self.layout.uv_offset + (y / 2) * self.layout.stride + (x & !1);
        (self.data[at], self.data[at + 1])
    }

    fn decode(&self) -> (Vec<u8>, usize) {
        let stride = self.width as usize * 4;
        let mut rgb = vec![0u8; stride * self.height as usize];
        nv12_to_xrgb8888(
            self.width,
            self.height,
            &self.data,
            &self.layout,
            &mut rgb,
            stride,
        )
        .unwrap();
        (rgb, stride)
    }
}

fn analytic_rgb(y: u8, cb: u8, cr: u8) -> [f64; 3] {
    let luma = 1.164 * (y as f64 - 16.0);
    let (cb, cr) = (cb as f64 - 128.0, cr as f64 - 128.0);
    [
        luma + 1.793 * cr,
        luma - 0.213 * cb - 0.533 * cr,
        luma + 2.112 * cb,
    ]
}

// =============================================================================
// Decode Tests
// =============================================================================

#[test]
fn test_decode_matches_analytic_transform() {
    let _ = env_logger::try_init();

    for (width, height) in [(64, 32), (9, 9), (17, 4)] {
        let img = Nv12Image::gradient(width, height);
        let (rgb, stride) = img.decode();

        for y in 0..height as usize {
            for x in 0..width as usize {
                let (cb, cr) = img.uv(x, y);
                let [r, g, b] = analytic_rgb(img.y(x, y), cb, cr);
                let px = &rgb[y * stride + x * 4..][..3];

                for (got, want) in [(px[2], r), (px[1], g), (px[0], b)] {
                    let want = want.clamp(0.0, 255.0);
                    assert!(
                        (got as f64 - want).abs() <= 1.0,
                        "{width}x{height} pixel ({x}, {y}): got {got}, want {want:.2}"
                    );
                }
            }
        }
    }
}

#[test]
fn test_decode_odd_height_uses_last_chroma_row() {
    let mut img = Nv12Image::new(4, 3);
    img.data[..12].fill(128);
    // Neutral chroma for rows 0-1, strong red difference for the last row.
    let uv = img.layout.uv_offset;
    img.data[uv..uv + 4].copy_from_slice(&[128, 128, 128, 128]);
    img.data[uv + 4..uv + 8].copy_from_slice(&[128, 200, 128, 200]);

    let (rgb, stride) = img.decode();
    let red = |x: usize, y: usize| rgb[y * stride + x * 4 + 2];
    let green = |x: usize, y: usize| rgb[y * stride + x * 4 + 1];

    assert_eq!(red(0, 0), red(0, 1));
    assert_eq!(red(0, 0), green(0, 0));
    assert!(red(3, 2) > red(3, 1) + 100);
}

#[test]
fn test_decode_leaves_padding_byte_alone() {
    let img = Nv12Image::gradient(4, 2);
    let mut rgb = vec![0xaa; 4 * 4 * 2];
    nv12_to_xrgb8888(4, 2, &img.data, &img.layout, &mut rgb, 16).unwrap();
    assert!(rgb.chunks_exact(4).all(|px| px[3] == 0xaa));
}

// =============================================================================
// Encode Tests
// =============================================================================

#[test]
fn test_encode_unpaired_row_is_not_averaged() {
    let mut rgb = vec![0u8; 2 * 4 * 3];
    rgb[16..24].fill(255);

    let mut img = Nv12Image::new(2, 3);
    xrgb8888_to_nv12(2, 3, &rgb, 8, &mut img.data, &img.layout).unwrap();

    assert_eq!(img.y(0, 0), 16);
    assert_eq!(img.y(1, 2), 235);
    assert_eq!(img.uv(0, 0), (128, 128));
    assert_eq!(img.uv(0, 2), (127, 143));
}

#[test]
fn test_encode_averages_row_pairs() {
    // Column 0: red over blue. Column 1 is ignored by chroma sampling.
    let mut rgb = vec![0u8; 2 * 4 * 2];
    rgb[2] = 255;
    rgb[8] = 255;
    rgb[4..7].fill(77);

    let mut img = Nv12Image::new(2, 2);
    xrgb8888_to_nv12(2, 2, &rgb, 8, &mut img.data, &img.layout).unwrap();

    let u = (-0.101f32 / 2.0 * 255.0 + 0.439f32 / 2.0 * 255.0 + 128.0) as u8;
    let v = (0.439f32 / 2.0 * 255.0 + -0.040f32 / 2.0 * 255.0 + 128.0) as u8;
    assert_eq!(img.uv(0, 0), (u, v));
}

#[test]
fn test_round_trip_stays_within_tolerance() {
    let _ = env_logger::try_init();

    for (width, height) in [(64, 32), (33, 17), (9, 9)] {
        let original = Nv12Image::gradient(width, height);
        let (rgb, stride) = original.decode();

        let mut encoded = Nv12Image::new(width, height);
        xrgb8888_to_nv12(
            width,
            height,
            &rgb,
            stride,
            &mut encoded.data,
            &encoded.layout,
        )
        .unwrap();

        for y in 0..height as usize {
            for x in 0..width as usize {
                let (a, b) = (original.y(x, y), encoded.y(x, y));
                assert!(a.abs_diff(b) <= 2, "luma ({x}, {y}): {a} vs {b}");
            }
        }

        // The Cr row of the encode matrix does not sum to zero, so chroma is
        // checked against the analytic transform rather than the source.
        for y in (0..height as usize).step_by(2) {
            for x in (0..width as usize).step_by(2) {
                let (cb, cr) = original.uv(x, y);
                let top = analytic_rgb(original.y(x, y), cb, cr);
                let (want_u, want_v) = if y + 1 < height as usize {
                    let bottom = analytic_rgb(original.y(x, y + 1), cb, cr);
                    let (u0, v0) = analytic_chroma(top);
                    let (u1, v1) = analytic_chroma(bottom);
                    ((u0 + u1) / 2.0, (v0 + v1) / 2.0)
                } else {
                    analytic_chroma(top)
                };

                let (u, v) = encoded.uv(x, y);
                assert!(
                    (u as f64 - want_u).abs() <= 2.0,
                    "cb ({x}, {y}): {u} vs {want_u:.2}"
                );
                assert!(
                    (v as f64 - want_v).abs() <= 2.0,
                    "cr ({x}, {y}): {v} vs {want_v:.2}"
                );
                assert!(u.abs_diff(cb) <= 3, "cb ({x}, {y}) drifted: {cb} -> {u}");
            }
        }
    }
}

fn analytic_chroma([r, g, b]: [f64; 3]) -> (f64, f64) {
    (
        -0.101 * r - 0.339 * g + 0.439 * b + 128.0,
        0.439 * r - 0.339 * g - 0.040 * b + 128.0,
    )
}

// =============================================================================
// Error Handling Tests
// =============================================================================

#[test]
fn test_only_nv12_is_convertible() {
    let nv12 = PixelFormat::lookup(NV12).unwrap();
    assert!(ensure_convertible(nv12).is_ok());

    let nv21 = PixelFormat {
        code: four_char_code!("NV21"),
        drm_id: drm_fourcc(b"NV21"),
        name: "NV21",
        ..*nv12
    };
    assert_eq!(
        ensure_convertible(&nv21).unwrap_err(),
        Error::ConversionNotImplemented("NV21")
    );

    let xrgb = PixelFormat::lookup(XRGB8888).unwrap();
    assert!(ensure_convertible(xrgb).is_err());
}

#[test]
fn test_short_destination_is_rejected() {
    let img = Nv12Image::gradient(8, 8);
    let mut rgb = vec![0u8; 8 * 4 * 7];
    let err = nv12_to_xrgb8888(8, 8, &img.data, &img.layout, &mut rgb, 32).unwrap_err();
    assert!(matches!(err, Error::BufferTooSmall { .. }));
}
