//! Least-significant-bit carrier over the RGB samples of an RGBA buffer.
//!
//! Bit position `p` lives in pixel `p / 3`, channel `p % 3`. The header
//! always occupies the first positions; the body either follows it or is
//! scattered over a keyed sample of the remaining positions.

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::context::{OperationContext, Stage};
use crate::error::{Result, VerimarkError};

#[derive(Debug, Clone, Copy)]
pub(super) enum Layout {
    Sequential,
    Keyed([u8; 32]),
}

/// Usable bit positions in an RGBA buffer.
pub(super) fn capacity(buf: &[u8]) -> usize {
    buf.len() / 4 * 3
}

fn index(position: usize) -> usize {
    (position / 3) * 4 + position % 3
}

fn set_bit(buf: &mut [u8], position: usize, bit: bool) {
    let i = index(position);
    buf[i] = (buf[i] & !1) | bit as u8;
}

fn get_bit(buf: &[u8], position: usize) -> bool {
    buf[index(position)] & 1 == 1
}

/// Positions of `count` body bits placed after `start` header bits.
fn body_positions(layout: Layout, start: usize, capacity: usize, count: usize) -> Vec<usize> {
    match layout {
        Layout::Sequential => (start..start + count).collect(),
        Layout::Keyed(seed) => {
            let mut rng = StdRng::from_seed(seed);
            rand::seq::index::sample(&mut rng, capacity - start, count)
                .into_iter()
                .map(|i| start + i)
                .collect()
        }
    }
}

pub(super) fn embed(
    buf: &mut [u8],
    header: &[bool],
    body: &[bool],
    layout: Layout,
    ctx: &OperationContext,
) -> Result<()> {
    let needed = header.len() + body.len();
    let available = capacity(buf);
    if needed > available {
        return Err(VerimarkError::CapacityExceeded { needed, available });
    }

    for (position, &bit) in header.iter().enumerate() {
        set_bit(buf, position, bit);
    }
    let positions = body_positions(layout, header.len(), available, body.len());
    for (i, (&position, &bit)) in positions.iter().zip(body).enumerate() {
        set_bit(buf, position, bit);
        ctx.tick(Stage::Embedding, i + 1, body.len(), 4096)?;
    }
    Ok(())
}

/// The first `bits` positions, or `None` if the buffer is smaller.
pub(super) fn read_header(buf: &[u8], bits: usize) -> Option<Vec<bool>> {
    (capacity(buf) >= bits).then(|| (0..bits).map(|p| get_bit(buf, p)).collect())
}

/// `count` body bits after `start` header bits, or `None` if they cannot
/// fit in the buffer.
pub(super) fn read_body(
    buf: &[u8],
    start: usize,
    count: usize,
    layout: Layout,
    ctx: &OperationContext,
) -> Result<Option<Vec<bool>>> {
    let available = capacity(buf);
    if start + count > available {
        return Ok(None);
    }
    let positions = body_positions(layout, start, available, count);
    let mut bits = Vec::with_capacity(count);
    for (i, &position) in positions.iter().enumerate() {
        bits.push(get_bit(buf, position));
        ctx.tick(Stage::Extracting, i + 1, count, 4096)?;
    }
    Ok(Some(bits))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buffer(pixels: usize) -> Vec<u8> {
        (0..pixels * 4).map(|i| (i * 31 % 256) as u8).collect()
    }

    #[test]
    fn test_alpha_channel_is_untouched() {
        let mut buf = buffer(8);
        let before = buf.clone();
        let bits = vec![true; capacity(&buf)];
        embed(&mut buf, &bits, &[], Layout::Sequential, &OperationContext::default()).unwrap();
        for (i, (a, b)) in buf.iter().zip(&before).enumerate() {
            if i % 4 == 3 {
                assert_eq!(a, b);
            } else {
                assert_eq!(a & 1, 1);
                assert_eq!(a >> 1, b >> 1);
            }
        }
    }

    #[test]
    fn test_keyed_layout_roundtrip_and_key_dependence() {
        let ctx = OperationContext::default();
        let mut buf = buffer(64);
        let header = vec![true, false, true];
        let body: Vec<bool> = (0..40).map(|i| i % 3 == 0).collect();
        let key = Layout::Keyed([7; 32]);
        embed(&mut buf, &header, &body, key, &ctx).unwrap();

        assert_eq!(read_header(&buf, 3).unwrap(), header);
        assert_eq!(read_body(&buf, 3, 40, key, &ctx).unwrap().unwrap(), body);

        let a = body_positions(key, 3, 192, 40);
        let b = body_positions(Layout::Keyed([8; 32]), 3, 192, 40);
        assert_ne!(a, b);
        assert!(a.iter().all(|&p| (3..192).contains(&p)));
    }

    #[test]
    fn test_capacity_checks() {
        let ctx = OperationContext::default();
        let mut buf = buffer(2);
        let err = embed(&mut buf, &[true; 4], &[true; 3], Layout::Sequential, &ctx).unwrap_err();
        assert!(matches!(
            err,
            VerimarkError::CapacityExceeded {
                needed: 7,
                available: 6
            }
        ));
        assert!(read_header(&buf, 7).is_none());
        assert!(read_body(&buf, 4, 3, Layout::Sequential, &ctx).unwrap().is_none());
    }
}
