use tracing::{debug, info, instrument, warn};

use super::frame::{self, Header, FLAG_ENCRYPTED, FLAG_PASSWORD_TAG, HEADER_BITS, HEADER_COPIES};
use super::extract::extract_watermark_with_context;
use super::{WatermarkAlgorithm, WatermarkOptions};
use crate::codec::raster::Plane;
use crate::codec::{to_bits, Raster, SlotCodec};
use crate::context::{OperationContext, Stage};
use crate::crypto;
use crate::error::{Result, VerimarkError};
use crate::media::{require_present, MediaFile};

/// Embed an invisible watermark, returning a new file in the same format.
///
/// # Errors
///
/// - `InputError` if `file` is empty
/// - `UnsupportedType` if `file` is not a writable image, or for `dwt` on a
///   lossy container
/// - `PasswordError` if encryption is requested without a password
/// - `InvalidOptions` for out-of-range strength or redundancy
/// - `CapacityExceeded` if the image is too small for the payload
/// - `IntegrityError` if the encoded result does not read back, which can
///   happen on lossy containers or heavily clipped content
pub fn embed_watermark(file: &MediaFile, options: &WatermarkOptions) -> Result<MediaFile> {
    embed_watermark_with_context(file, options, &OperationContext::default())
}

#[instrument(
    level = "debug",
    skip_all,
    fields(algorithm = ?options.algorithm, bytes = file.len())
)]
pub fn embed_watermark_with_context(
    file: &MediaFile,
    options: &WatermarkOptions,
    ctx: &OperationContext,
) -> Result<MediaFile> {
    require_present(file)?;
    options.validate()?;

    ctx.report(Stage::Decoding, 0.0);
    let mut raster = Raster::decode(file)?;
    raster.ensure_writable()?;
    let lossless = raster.is_lossless();
    if !lossless {
        if options.algorithm == WatermarkAlgorithm::Dwt {
            return Err(VerimarkError::UnsupportedType(format!(
                "dwt watermarks need a lossless container (PNG or WebP); use dct for {:?}",
                raster.format
            )));
        }
        warn!(
            format = ?raster.format,
            "Lossy container; embedding into luma and checking the re-encoded result"
        );
    }

    let (payload, flags) = build_payload(options)?;
    let mut body = payload;
    body.extend_from_slice(&crypto::checksum(&body));
    let body_len = u16::try_from(body.len()).map_err(|_| {
        VerimarkError::InvalidOptions(format!(
            "watermark content too long ({} bytes)",
            body.len()
        ))
    })?;

    let header = Header {
        strength: options.resolved_strength(),
        redundancy: options.resolved_redundancy(),
        flags,
        content_type: options.kind.into(),
        body_len,
    };

    let carrier = options.algorithm.carrier();
    let (width, height) = (raster.width() as usize, raster.height() as usize);
    let slots = SlotCodec::spread(&carrier, width, height);
    let needed = header.total_slots();
    if needed > slots.capacity() {
        return Err(VerimarkError::CapacityExceeded {
            needed,
            available: slots.capacity(),
        });
    }

    let original = Plane::read(&raster.image, carrier.channel());
    let mut plane = original.clone();
    let header_bits = to_bits(&header.to_bytes());
    let body_bits = to_bits(&body);
    let body_step = header.body_step();

    let mut done = 0;
    for copy in 0..HEADER_COPIES {
        for (i, &bit) in header_bits.iter().enumerate() {
            slots.embed(&mut plane, frame::header_slot(i, copy), bit, frame::HEADER_STEP);
            done += 1;
            ctx.tick(Stage::Embedding, done, needed, 256)?;
        }
    }
    for copy in 0..header.redundancy as usize {
        for (j, &bit) in body_bits.iter().enumerate() {
            slots.embed(&mut plane, frame::body_slot(&header, j, copy), bit, body_step);
            done += 1;
            ctx.tick(Stage::Embedding, done, needed, 256)?;
        }
    }
    debug_assert_eq!(done, needed);
    debug!(
        header_bits = HEADER_BITS,
        body_bits = body_bits.len(),
        slots = needed,
        capacity = slots.capacity(),
        "Embedded watermark bits"
    );

    if lossless {
        plane.write(&mut raster.image);
    } else {
        plane.write_as_luma(&original, &mut raster.image);
    }
    ctx.check_cancelled()?;
    ctx.report(Stage::Encoding, 0.0);
    let marked = file.with_data(raster.encode()?);
    ensure_readable(&marked, options, ctx)?;
    ctx.report(Stage::Encoding, 1.0);

    info!(
        algorithm = ?options.algorithm,
        strength = header.strength,
        redundancy = header.redundancy,
        encrypted = header.is_encrypted(),
        "Watermark embedded"
    );

    Ok(marked)
}

/// Read the encoded output back and fail if it does not verify.
///
/// Pixel clipping and lossy re-encoding can both erase a mark; the caller
/// gets an error instead of a file that will never verify.
fn ensure_readable(
    marked: &MediaFile,
    options: &WatermarkOptions,
    ctx: &OperationContext,
) -> Result<()> {
    let quiet = OperationContext::new(ctx.cancellation_token().clone());
    let result = extract_watermark_with_context(marked, options.effective_password(), &quiet)?;
    let intact = result.is_verified
        && result.original_watermark.as_deref() == Some(options.payload_content());
    if !intact {
        warn!(failure = ?result.failure, "Embedded watermark did not survive encoding");
        return Err(VerimarkError::IntegrityError(
            "The watermark could not be read back from the encoded image; \
             try a higher strength or a lossless format"
                .into(),
        ));
    }
    debug!(confidence = result.confidence_score, "Embedded watermark reads back");
    Ok(())
}

/// Payload bytes and header flags for the requested protection.
fn build_payload(options: &WatermarkOptions) -> Result<(Vec<u8>, u8)> {
    let content = options.payload_content().as_bytes();
    match (options.encryption, options.effective_password()) {
        (true, Some(password)) => Ok((crypto::seal(password, content)?, FLAG_ENCRYPTED)),
        (true, None) => Err(VerimarkError::PasswordError(
            "Encryption requires a password".into(),
        )),
        (false, Some(password)) => {
            let mut bytes = content.to_vec();
            bytes.extend_from_slice(&crypto::keyed_tag(password, content));
            Ok((bytes, FLAG_PASSWORD_TAG))
        }
        (false, None) => Ok((content.to_vec(), 0)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::watermark::{WatermarkAlgorithm, WatermarkType};

    fn png(width: u32, height: u32) -> MediaFile {
        let image = image::RgbaImage::from_fn(width, height, |x, y| {
            image::Rgba([(x % 200) as u8 + 20, (y % 200) as u8 + 20, 110, 255])
        });
        let raster = Raster {
            image,
            format: image::ImageFormat::Png,
        };
        MediaFile::new(Some("c.png".into()), "image/png", raster.encode().unwrap())
    }

    #[test]
    fn test_payload_flags() {
        let plain = WatermarkOptions::text("hi");
        assert_eq!(build_payload(&plain).unwrap(), (b"hi".to_vec(), 0));

        let tagged = WatermarkOptions::text("hi").with_password("pw");
        let (bytes, flags) = build_payload(&tagged).unwrap();
        assert_eq!(flags, FLAG_PASSWORD_TAG);
        assert_eq!(bytes.len(), 2 + crypto::CHECKSUM_LEN);

        let sealed = tagged.with_encryption(true);
        let (bytes, flags) = build_payload(&sealed).unwrap();
        assert_eq!(flags, FLAG_ENCRYPTED);
        assert_eq!(bytes.len(), 2 + crypto::SEAL_OVERHEAD);
    }

    #[test]
    fn test_qr_payload_replaces_content() {
        let options = WatermarkOptions::new(WatermarkType::Image, "logo")
            .with_qr_code("https://example.com");
        let (bytes, _) = build_payload(&options).unwrap();
        assert_eq!(bytes, b"https://example.com");
    }

    #[test]
    fn test_embed_preserves_name_and_type() {
        let file = png(64, 64);
        let options = WatermarkOptions::text("A").with_algorithm(WatermarkAlgorithm::Dwt);
        let marked = embed_watermark(&file, &options).unwrap();
        assert_eq!(marked.name, file.name);
        assert_eq!(marked.mime_type, "image/png");
        assert_ne!(marked.data, file.data);
    }

    #[test]
    fn test_small_image_is_capacity_exceeded() {
        let file = png(32, 32);
        let err = embed_watermark(&file, &WatermarkOptions::text("HELLO")).unwrap_err();
        assert!(matches!(err, VerimarkError::CapacityExceeded { available: 16, .. }));
    }

    #[test]
    fn test_empty_file_is_input_error() {
        let file = MediaFile::new(None, "image/png", Vec::new());
        assert!(matches!(
            embed_watermark(&file, &WatermarkOptions::text("x")),
            Err(VerimarkError::InputError(_))
        ));
    }

    #[test]
    fn test_cancelled_context_stops_embedding() {
        let ctx = OperationContext::default();
        ctx.cancellation_token().cancel();
        let options = WatermarkOptions::text("x").with_algorithm(WatermarkAlgorithm::Dwt);
        assert!(matches!(
            embed_watermark_with_context(&png(64, 64), &options, &ctx),
            Err(VerimarkError::Cancelled)
        ));
    }
}
