//! Block transforms used as embedding domains.
//!
//! Both transforms are orthonormal, so a change of `d` to one coefficient
//! moves every pixel of the block by at most `d` times the largest basis
//! value, and pixel rounding moves a coefficient by a bounded amount.

use std::f32::consts::PI;

pub trait BlockTransform: Send + Sync {
    /// Edge length of the square block.
    fn size(&self) -> usize;

    /// Row-major pixels to row-major coefficients.
    fn forward(&self, block: &[f32]) -> Vec<f32>;

    /// Row-major coefficients to row-major pixels.
    fn inverse(&self, coeffs: &[f32]) -> Vec<f32>;
}

const N: usize = 8;

/// Orthonormal 8x8 DCT-II. Coefficient `(u, v)` lives at index `v * 8 + u`.
#[derive(Debug, Clone)]
pub struct Dct8 {
    basis: [[f32; N]; N],
}

impl Dct8 {
    pub fn new() -> Self {
        let mut basis = [[0f32; N]; N];
        for (u, row) in basis.iter_mut().enumerate() {
            let alpha = if u == 0 {
                (1.0 / N as f32).sqrt()
            } else {
                (2.0 / N as f32).sqrt()
            };
            for (x, value) in row.iter_mut().enumerate() {
                *value = alpha * (((2 * x + 1) as f32 * u as f32 * PI) / (2 * N) as f32).cos();
            }
        }
        Self { basis }
    }
}

impl Default for Dct8 {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockTransform for Dct8 {
    fn size(&self) -> usize {
        N
    }

    fn forward(&self, block: &[f32]) -> Vec<f32> {
        // Rows first, then columns.
        let mut rows = [0f32; N * N];
        for y in 0..N {
            for u in 0..N {
                rows[y * N + u] = (0..N).map(|x| self.basis[u][x] * block[y * N + x]).sum();
            }
        }
        let mut out = vec![0f32; N * N];
        for v in 0..N {
            for u in 0..N {
                out[v * N + u] = (0..N).map(|y| self.basis[v][y] * rows[y * N + u]).sum();
            }
        }
        out
    }

    fn inverse(&self, coeffs: &[f32]) -> Vec<f32> {
        let mut rows = [0f32; N * N];
        for v in 0..N {
            for x in 0..N {
                rows[v * N + x] = (0..N).map(|u| self.basis[u][x] * coeffs[v * N + u]).sum();
            }
        }
        let mut out = vec![0f32; N * N];
        for y in 0..N {
            for x in 0..N {
                out[y * N + x] = (0..N).map(|v| self.basis[v][y] * rows[v * N + x]).sum();
            }
        }
        out
    }
}

/// Single-level orthonormal 2D Haar wavelet on 2x2 blocks.
///
/// Coefficient order: `[LL, LH, HL, HH]` (approximation, horizontal,
/// vertical and diagonal detail).
#[derive(Debug, Clone, Copy, Default)]
pub struct Haar2;

impl BlockTransform for Haar2 {
    fn size(&self) -> usize {
        2
    }

    fn forward(&self, b: &[f32]) -> Vec<f32> {
        let (p0, p1, p2, p3) = (b[0], b[1], b[2], b[3]);
        vec![
            (p0 + p1 + p2 + p3) / 2.0,
            (p0 - p1 + p2 - p3) / 2.0,
            (p0 + p1 - p2 - p3) / 2.0,
            (p0 - p1 - p2 + p3) / 2.0,
        ]
    }

    fn inverse(&self, c: &[f32]) -> Vec<f32> {
        let (ll, lh, hl, hh) = (c[0], c[1], c[2], c[3]);
        vec![
            (ll + lh + hl + hh) / 2.0,
            (ll - lh + hl - hh) / 2.0,
            (ll + lh - hl - hh) / 2.0,
            (ll - lh - hl + hh) / 2.0,
        ]
    }
}
