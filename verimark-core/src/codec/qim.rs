//! Quantization index modulation.
//!
//! Bit 0 snaps a coefficient onto the lattice `k * step`, bit 1 onto
//! `k * step + step / 2`. The two lattices interleave, so the distances from
//! any value to the nearest point of each add up to `step / 2`.

/// A decoded bit and how far the coefficient sits from the decision boundary,
/// normalised to `0.0..=1.0` (1.0 = exactly on a lattice point).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Detection {
    pub bit: bool,
    pub margin: f32,
}

fn offset(bit: bool, step: f32) -> f32 {
    if bit {
        step / 2.0
    } else {
        0.0
    }
}

/// Nearest point of `bit`'s lattice to `value`.
pub fn quantize(value: f32, bit: bool, step: f32) -> f32 {
    let offset = offset(bit, step);
    ((value - offset) / step).round() * step + offset
}

pub fn detect(value: f32, step: f32) -> Detection {
    let d0 = (value - quantize(value, false, step)).abs();
    let d1 = (value - quantize(value, true, step)).abs();
    Detection {
        bit: d1 < d0,
        margin: ((d0 - d1).abs() / (step / 2.0)).clamp(0.0, 1.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quantized_values_decode_with_full_margin() {
        for value in [-37.2f32, 0.0, 3.9, 118.4] {
            for bit in [false, true] {
                let q = quantize(value, bit, 24.0);
                let d = detect(q, 24.0);
                assert_eq!(d.bit, bit);
                assert!(d.margin > 0.99);
            }
        }
    }

    #[test]
    fn test_small_noise_keeps_bit() {
        let q = quantize(51.0, true, 24.0);
        let d = detect(q + 1.5, 24.0);
        assert!(d.bit);
        assert!(d.margin > 0.6 && d.margin < 0.8);
    }

    #[test]
    fn test_boundary_has_zero_margin() {
        let d = detect(6.0, 24.0);
        assert!(d.margin < 1e-5);
    }
}
