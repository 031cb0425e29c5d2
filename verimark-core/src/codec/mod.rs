//! Shared building blocks for the watermark and steganography codecs.
//!
//! A [`BlockCarrier`] names where one bit lives inside an image block
//! (transform, coefficient, colour channel). A [`SlotCodec`] maps logical bit
//! slots onto the carrier's blocks and reads or writes them with
//! [`qim`] modulation.

pub mod qim;
pub mod raster;
pub mod transform;

use qim::Detection;
use raster::Plane;
use transform::BlockTransform;

pub use raster::Raster;

/// Expand bytes into bits, most significant first.
pub fn to_bits(bytes: &[u8]) -> Vec<bool> {
    bytes
        .iter()
        .flat_map(|byte| (0..8).rev().map(move |i| (byte >> i) & 1 == 1))
        .collect()
}

/// Pack bits (most significant first) into bytes. Trailing bits that do not
/// fill a byte are dropped.
pub fn from_bits(bits: &[bool]) -> Vec<u8> {
    bits.chunks_exact(8)
        .map(|chunk| chunk.iter().fold(0u8, |acc, &bit| (acc << 1) | bit as u8))
        .collect()
}

/// Bijection from logical slots to block indices.
///
/// `spread` walks the blocks with a stride coprime to their count, so
/// consecutive slots land far apart and every block is used once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotLayout {
    total: usize,
    stride: usize,
}

impl SlotLayout {
    pub fn sequential(total: usize) -> Self {
        Self { total, stride: 1 }
    }

    pub fn spread(total: usize) -> Self {
        if total < 3 {
            return Self::sequential(total);
        }
        let mut stride = ((total as f64) * 0.618_034) as usize;
        while gcd(stride, total) != 1 {
            stride += 1;
        }
        Self { total, stride }
    }

    pub fn capacity(&self) -> usize {
        self.total
    }

    pub fn block_for(&self, slot: usize) -> usize {
        ((slot as u64 * self.stride as u64) % self.total as u64) as usize
    }
}

fn gcd(mut a: usize, mut b: usize) -> usize {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}

/// One modulated coefficient per block of one colour channel.
pub struct BlockCarrier {
    transform: Box<dyn BlockTransform>,
    coefficient: usize,
    channel: usize,
}

impl BlockCarrier {
    pub fn new(transform: Box<dyn BlockTransform>, coefficient: usize, channel: usize) -> Self {
        Self {
            transform,
            coefficient,
            channel,
        }
    }

    pub fn block_size(&self) -> usize {
        self.transform.size()
    }

    pub fn channel(&self) -> usize {
        self.channel
    }

    /// Top-left corners of every full block, in raster order.
    pub fn origins(&self, width: usize, height: usize) -> Vec<(usize, usize)> {
        let size = self.block_size();
        let (cols, rows) = (width / size, height / size);
        (0..rows)
            .flat_map(|r| (0..cols).map(move |c| (c * size, r * size)))
            .collect()
    }

    pub fn read(&self, plane: &Plane, (x, y): (usize, usize)) -> f32 {
        let block = plane.block(x, y, self.block_size());
        self.transform.forward(&block)[self.coefficient]
    }

    /// Set the carrier coefficient of the block at `(x, y)` to `value`.
    ///
    /// The block is kept inside the pixel range: it is first shifted by a
    /// constant (which only moves the DC coefficient), and whatever still
    /// clips is re-targeted for a few rounds so the unclipped pixels absorb
    /// the difference.
    pub fn write(&self, plane: &mut Plane, (x, y): (usize, usize), value: f32) {
        let size = self.block_size();
        let mut pixels = plane.block(x, y, size);
        for _ in 0..FIT_ROUNDS {
            let mut coeffs = self.transform.forward(&pixels);
            if (coeffs[self.coefficient] - value).abs() <= FIT_TOLERANCE {
                break;
            }
            coeffs[self.coefficient] = value;
            pixels = self.transform.inverse(&coeffs);
            fit_to_range(&mut pixels);
        }
        plane.set_block(x, y, size, &pixels);
    }
}

/// Signed margin of `value` for `bit`: positive when it decodes correctly.
fn decode_score(value: f32, bit: bool, step: f32) -> f32 {
    let detection = qim::detect(value, step);
    if detection.bit == bit {
        detection.margin
    } else {
        -detection.margin
    }
}

/// Re-targeting rounds for blocks that clip.
const FIT_ROUNDS: usize = 8;

const FIT_TOLERANCE: f32 = 1e-3;

/// Move `pixels` into `0..=255` with a constant offset, centring blocks whose
/// range is too wide, then clamp.
fn fit_to_range(pixels: &mut [f32]) {
    let (lo, hi) = pixels
        .iter()
        .fold((f32::MAX, f32::MIN), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    let shift = if hi - lo > 255.0 {
        127.5 - (lo + hi) / 2.0
    } else if hi > 255.0 {
        255.0 - hi
    } else if lo < 0.0 {
        -lo
    } else {
        0.0
    };
    for v in pixels.iter_mut() {
        *v = (*v + shift).clamp(0.0, 255.0);
    }
}

/// What was read from one slot.
#[derive(Debug, Clone, Copy)]
pub struct SlotReading {
    /// Top-left pixel of the block holding the slot.
    pub origin: (usize, usize),
    pub coefficient: f32,
    pub detection: Detection,
}

/// Slot-addressed access to a carrier over one image.
pub struct SlotCodec<'a> {
    carrier: &'a BlockCarrier,
    origins: Vec<(usize, usize)>,
    layout: SlotLayout,
}

impl<'a> SlotCodec<'a> {
    pub fn spread(carrier: &'a BlockCarrier, width: usize, height: usize) -> Self {
        let origins = carrier.origins(width, height);
        let layout = SlotLayout::spread(origins.len());
        Self {
            carrier,
            origins,
            layout,
        }
    }

    pub fn sequential(carrier: &'a BlockCarrier, width: usize, height: usize) -> Self {
        let origins = carrier.origins(width, height);
        let layout = SlotLayout::sequential(origins.len());
        Self {
            carrier,
            origins,
            layout,
        }
    }

    pub fn capacity(&self) -> usize {
        self.layout.capacity()
    }

    pub fn block_size(&self) -> usize {
        self.carrier.block_size()
    }

    pub fn origin(&self, slot: usize) -> (usize, usize) {
        self.origins[self.layout.block_for(slot)]
    }

    /// Write `bit` into `slot`.
    ///
    /// The nearest lattice point is tried first. When clipping keeps the
    /// block from reaching it, the point one step away on the other side is
    /// tried too and the write that decodes better is kept.
    pub fn embed(&self, plane: &mut Plane, slot: usize, bit: bool, step: f32) {
        let (x, y) = self.origin(slot);
        let size = self.block_size();
        let current = self.carrier.read(plane, (x, y));
        let nearest = qim::quantize(current, bit, step);

        let before = plane.block(x, y, size);
        self.carrier.write(plane, (x, y), nearest);
        let reached = self.carrier.read(plane, (x, y));
        if (reached - nearest).abs() <= step / 8.0 {
            return;
        }

        let first = plane.block(x, y, size);
        let first_score = decode_score(reached, bit, step);
        plane.set_block(x, y, size, &before);
        let other = if nearest > current {
            nearest - step
        } else {
            nearest + step
        };
        self.carrier.write(plane, (x, y), other);
        let second_score = decode_score(self.carrier.read(plane, (x, y)), bit, step);
        if second_score < first_score {
            plane.set_block(x, y, size, &first);
        }
    }

    pub fn read(&self, plane: &Plane, slot: usize, step: f32) -> SlotReading {
        let origin = self.origin(slot);
        let coefficient = self.carrier.read(plane, origin);
        SlotReading {
            origin,
            coefficient,
            detection: qim::detect(coefficient, step),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use transform::{Dct8, Haar2};

    #[test]
    fn test_bits_roundtrip_msb_first() {
        let bits = to_bits(&[0b1000_0001, 0xFF]);
        assert_eq!(bits.len(), 16);
        assert!(bits[0] && !bits[1] && bits[7]);
        assert_eq!(from_bits(&bits), vec![0b1000_0001, 0xFF]);
    }

    #[test]
    fn test_spread_layout_is_a_permutation() {
        for total in [1usize, 2, 3, 64, 1024, 1000, 4097] {
            let layout = SlotLayout::spread(total);
            let blocks: HashSet<_> = (0..total).map(|s| layout.block_for(s)).collect();
            assert_eq!(blocks.len(), total, "total={total}");
        }
    }

    #[test]
    fn test_spread_layout_separates_neighbours() {
        let layout = SlotLayout::spread(1024);
        let a = layout.block_for(0);
        let b = layout.block_for(1);
        assert!(a.abs_diff(b) > 100);
    }

    #[test]
    fn test_origins_cover_full_blocks_only() {
        let carrier = BlockCarrier::new(Box::new(Dct8::new()), 19, 2);
        let origins = carrier.origins(20, 17);
        assert_eq!(origins, vec![(0, 0), (8, 0), (0, 8), (8, 8)]);

        let haar = BlockCarrier::new(Box::new(Haar2), 1, 2);
        assert_eq!(haar.origins(5, 4).len(), 4);
    }

    #[test]
    fn test_carrier_write_then_read() {
        let image = image::RgbaImage::from_pixel(16, 16, image::Rgba([90, 120, 140, 255]));
        let mut plane = Plane::read(&image, 2);
        let carrier = BlockCarrier::new(Box::new(Dct8::new()), 19, 2);

        carrier.write(&mut plane, (8, 0), 12.0);
        assert!((carrier.read(&plane, (8, 0)) - 12.0).abs() < 1e-3);
        assert!(carrier.read(&plane, (0, 0)).abs() < 1e-3);
    }

    #[test]
    fn test_write_on_saturated_blocks_keeps_value() {
        for (level, value) in [(255u8, 14.0f32), (255, -14.0), (0, 14.0), (0, -14.0)] {
            let image =
                image::RgbaImage::from_pixel(16, 16, image::Rgba([level, level, level, 255]));
            for carrier in [
                BlockCarrier::new(Box::new(Dct8::new()), 19, 2),
                BlockCarrier::new(Box::new(Haar2), 1, 2),
            ] {
                let mut plane = Plane::read(&image, 2);
                carrier.write(&mut plane, (0, 0), value);

                let mut written = image.clone();
                plane.write(&mut written);
                let read_back = carrier.read(&Plane::read(&written, 2), (0, 0));
                assert!(
                    (read_back - value).abs() < 2.0,
                    "level={level} value={value} read={read_back}"
                );
            }
        }
    }

    #[test]
    fn test_embed_on_full_contrast_block() {
        // Black/white columns: the detail coefficient is already at its
        // extreme and can only shrink.
        let image = image::RgbaImage::from_fn(2, 2, |x, _| {
            let v = if x == 0 { 0 } else { 255 };
            image::Rgba([v, v, v, 255])
        });
        let carrier = BlockCarrier::new(Box::new(Haar2), 1, 2);
        let slots = SlotCodec::sequential(&carrier, 2, 2);
        for bit in [false, true] {
            for step in [12.0f32, 28.0, 40.0] {
                let mut plane = Plane::read(&image, 2);
                slots.embed(&mut plane, 0, bit, step);
                let reading = slots.read(&plane, 0, step);
                assert_eq!(reading.detection.bit, bit, "bit={bit} step={step}");
            }
        }
    }

    #[test]
    fn test_fit_to_range_shifts_then_clamps() {
        let mut inside = [250.0, 262.0, 255.0, 240.0];
        fit_to_range(&mut inside);
        assert_eq!(inside, [243.0, 255.0, 248.0, 233.0]);

        let mut wide = [-10.0, 270.0];
        fit_to_range(&mut wide);
        assert_eq!(wide, [0.0, 255.0]);
    }
}
