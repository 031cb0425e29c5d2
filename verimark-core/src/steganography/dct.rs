//! Steganography in 8x8 DCT blocks of the green channel.
//!
//! Blocks are used in raster order with one bit each and no repetition. The
//! header sits in the first blocks at a fixed step; the body step follows
//! the `quality` stored in the header.

use image::RgbaImage;

use crate::codec::raster::Plane;
use crate::codec::transform::Dct8;
use crate::codec::{BlockCarrier, SlotCodec};
use crate::context::{OperationContext, Stage};
use crate::error::{Result, VerimarkError};

const GREEN: usize = 1;

/// Coefficient (u=4, v=1).
const COEFFICIENT: usize = 8 + 4;

const HEADER_STEP: f32 = 16.0;

fn carrier() -> BlockCarrier {
    BlockCarrier::new(Box::new(Dct8::new()), COEFFICIENT, GREEN)
}

pub(super) fn body_step(quality: u8) -> f32 {
    8.0 + (100 - quality.min(100)) as f32 / 10.0
}

pub(super) fn embed(
    image: &mut RgbaImage,
    header: &[bool],
    body: &[bool],
    quality: u8,
    lossless: bool,
    ctx: &OperationContext,
) -> Result<()> {
    let carrier = carrier();
    let slots = SlotCodec::sequential(&carrier, image.width() as usize, image.height() as usize);
    let needed = header.len() + body.len();
    if needed > slots.capacity() {
        return Err(VerimarkError::CapacityExceeded {
            needed,
            available: slots.capacity(),
        });
    }

    let original = Plane::read(image, carrier.channel());
    let mut plane = original.clone();
    for (slot, &bit) in header.iter().enumerate() {
        slots.embed(&mut plane, slot, bit, HEADER_STEP);
    }
    let step = body_step(quality);
    for (i, &bit) in body.iter().enumerate() {
        slots.embed(&mut plane, header.len() + i, bit, step);
        ctx.tick(Stage::Embedding, i + 1, body.len(), 256)?;
    }
    if lossless {
        plane.write(image);
    } else {
        plane.write_as_luma(&original, image);
    }
    Ok(())
}

pub(super) fn read_header(image: &RgbaImage, bits: usize) -> Option<Vec<bool>> {
    let carrier = carrier();
    let slots = SlotCodec::sequential(&carrier, image.width() as usize, image.height() as usize);
    if slots.capacity() < bits {
        return None;
    }
    let plane = Plane::read(image, carrier.channel());
    Some(
        (0..bits)
            .map(|slot| slots.read(&plane, slot, HEADER_STEP).detection.bit)
            .collect(),
    )
}

pub(super) fn read_body(
    image: &RgbaImage,
    start: usize,
    count: usize,
    quality: u8,
    ctx: &OperationContext,
) -> Result<Option<Vec<bool>>> {
    let carrier = carrier();
    let slots = SlotCodec::sequential(&carrier, image.width() as usize, image.height() as usize);
    if start + count > slots.capacity() {
        return Ok(None);
    }
    let plane = Plane::read(image, carrier.channel());
    let step = body_step(quality);
    let mut bits = Vec::with_capacity(count);
    for i in 0..count {
        bits.push(slots.read(&plane, start + i, step).detection.bit);
        ctx.tick(Stage::Extracting, i + 1, count, 256)?;
    }
    Ok(Some(bits))
}
