use std::collections::BTreeMap;

use tracing::{debug, info, instrument};

use super::frame::{self, Header, HEADER_BITS, HEADER_COPIES, HEADER_SLOTS, HEADER_STEP};
use super::{
    DetectionPoint, FrequencyData, SignalAnalysis, TamperedArea, VerificationFailure,
    VerificationResult, WatermarkAlgorithm, FREQUENCY_SAMPLES, MAX_DETECTION_POINTS,
};
use crate::codec::raster::Plane;
use crate::codec::{from_bits, qim, Raster, SlotCodec, SlotReading};
use crate::context::{OperationContext, Stage};
use crate::crypto::{self, CHECKSUM_LEN};
use crate::error::{Result, VerimarkError};
use crate::media::{require_present, MediaFile};

/// Edge of the square pixel cells used for tamper localisation.
const TAMPER_CELL: usize = 32;

/// Extract and verify a watermark.
///
/// A missing, corrupted or locked watermark is not an error: the result has
/// `is_verified == false` and `failure` says why. Errors are reserved for
/// unusable input.
///
/// # Errors
///
/// - `InputError` if `file` is empty
/// - `UnsupportedType` if `file` is not an image
pub fn extract_watermark(file: &MediaFile, password: Option<&str>) -> Result<VerificationResult> {
    extract_watermark_with_context(file, password, &OperationContext::default())
}

#[instrument(level = "debug", skip_all, fields(bytes = file.len()))]
pub fn extract_watermark_with_context(
    file: &MediaFile,
    password: Option<&str>,
    ctx: &OperationContext,
) -> Result<VerificationResult> {
    require_present(file)?;
    ctx.report(Stage::Decoding, 0.0);
    let raster = Raster::decode(file)?;
    let password = password.filter(|p| !p.is_empty());

    let mut first_miss: Option<SignalAnalysis> = None;
    for algorithm in [WatermarkAlgorithm::Dct, WatermarkAlgorithm::Dwt] {
        ctx.check_cancelled()?;
        match scan(algorithm, &raster, ctx)? {
            Scan::Found {
                header,
                body,
                mut analysis,
            } => {
                if !raster.is_lossless() && !analysis.tampered_areas.is_empty() {
                    // Lossy re-encoding flips isolated slots everywhere.
                    debug!(
                        cells = analysis.tampered_areas.len(),
                        "Skipping tamper localisation on a lossy container"
                    );
                    analysis.tampered_areas.clear();
                }
                let outcome = body
                    .ok_or(VerificationFailure::IntegrityFailed)
                    .and_then(|body| decode_body(&header, &body, password));
                return Ok(match outcome {
                    Ok(content) => {
                        info!(
                            algorithm = ?algorithm,
                            confidence = analysis.confidence_score,
                            tampered = analysis.tampered_areas.len(),
                            "Watermark verified"
                        );
                        VerificationResult::verified(content, header.content_type, analysis)
                    }
                    Err(failure) => {
                        info!(algorithm = ?algorithm, ?failure, "Watermark found but not verified");
                        VerificationResult::rejected(failure, analysis)
                    }
                });
            }
            Scan::Missing(analysis) => {
                debug!(algorithm = ?algorithm, "No watermark header found");
                first_miss.get_or_insert(analysis);
            }
        }
    }

    Ok(VerificationResult::rejected(
        VerificationFailure::NotDetected,
        first_miss.unwrap_or_default(),
    ))
}

enum Scan {
    /// A valid header. `body` is `None` when the header claims more slots
    /// than the image has.
    Found {
        header: Header,
        body: Option<Vec<u8>>,
        analysis: SignalAnalysis,
    },
    Missing(SignalAnalysis),
}

/// One read slot after majority decoding.
struct Mark {
    reading: SlotReading,
    /// Lattice value of the majority bit nearest to the measured coefficient.
    ideal: f32,
    agrees: bool,
    redundant: bool,
}

fn scan(algorithm: WatermarkAlgorithm, raster: &Raster, ctx: &OperationContext) -> Result<Scan> {
    let carrier = algorithm.carrier();
    let (width, height) = (raster.width() as usize, raster.height() as usize);
    let slots = SlotCodec::spread(&carrier, width, height);
    if slots.capacity() < HEADER_SLOTS {
        return Ok(Scan::Missing(SignalAnalysis::default()));
    }
    let plane = Plane::read(&raster.image, carrier.channel());
    let geometry = Geometry {
        width,
        height,
        block: slots.block_size(),
    };

    let mut header_readings = Vec::with_capacity(HEADER_SLOTS);
    for copy in 0..HEADER_COPIES {
        for bit in 0..HEADER_BITS {
            header_readings.push(slots.read(&plane, frame::header_slot(bit, copy), HEADER_STEP));
        }
    }
    let header_bits = majority(&header_readings, HEADER_BITS);
    let mut marks = to_marks(&header_readings, &header_bits, HEADER_STEP);

    let Some(header) = Header::from_bytes(&from_bits(&header_bits)) else {
        // Without a header there is no watermark to be confident in or to
        // disagree with.
        let analysis = SignalAnalysis {
            confidence_score: 0.0,
            tampered_areas: Vec::new(),
            ..analyse(&marks, 0, geometry)
        };
        return Ok(Scan::Missing(analysis));
    };
    debug!(?header, "Found watermark header");

    let total = header.total_slots();
    if total > slots.capacity() {
        return Ok(Scan::Found {
            header,
            body: None,
            analysis: analyse(&marks, marks.len(), geometry),
        });
    }

    let step = header.body_step();
    let body_bits = header.body_bits();
    let mut body_readings = Vec::with_capacity(body_bits * header.redundancy as usize);
    for copy in 0..header.redundancy as usize {
        for bit in 0..body_bits {
            body_readings.push(slots.read(&plane, frame::body_slot(&header, bit, copy), step));
            ctx.tick(Stage::Extracting, HEADER_SLOTS + body_readings.len(), total, 256)?;
        }
    }
    let decided = majority(&body_readings, body_bits);
    let body_start = marks.len();
    let mut body_marks = to_marks(&body_readings, &decided, step);
    if header.redundancy < 2 {
        body_marks.iter_mut().for_each(|m| m.redundant = false);
    }
    marks.append(&mut body_marks);

    Ok(Scan::Found {
        header,
        body: Some(from_bits(&decided)),
        analysis: analyse(&marks, body_start, geometry),
    })
}

/// Soft-decision majority over copy-major readings (`copy * bits + bit`).
fn majority(readings: &[SlotReading], bits: usize) -> Vec<bool> {
    if bits == 0 {
        return Vec::new();
    }
    let copies = readings.len() / bits;
    (0..bits)
        .map(|bit| {
            let score: f32 = (0..copies)
                .map(|copy| {
                    let d = readings[copy * bits + bit].detection;
                    if d.bit {
                        d.margin
                    } else {
                        -d.margin
                    }
                })
                .sum();
            score > 0.0
        })
        .collect()
}

fn to_marks(readings: &[SlotReading], decided: &[bool], step: f32) -> Vec<Mark> {
    let bits = decided.len();
    readings
        .iter()
        .enumerate()
        .map(|(i, reading)| {
            let bit = decided[i % bits];
            Mark {
                reading: *reading,
                ideal: qim::quantize(reading.coefficient, bit, step),
                agrees: reading.detection.bit == bit,
                redundant: true,
            }
        })
        .collect()
}

fn decode_body(
    header: &Header,
    body: &[u8],
    password: Option<&str>,
) -> std::result::Result<String, VerificationFailure> {
    if body.len() < CHECKSUM_LEN {
        return Err(VerificationFailure::IntegrityFailed);
    }
    let (payload, stored) = body.split_at(body.len() - CHECKSUM_LEN);
    if crypto::checksum(payload).as_slice() != stored {
        return Err(VerificationFailure::IntegrityFailed);
    }

    let content = if header.is_encrypted() {
        let password = password.ok_or(VerificationFailure::PasswordRequired)?;
        crypto::open(password, payload).map_err(|e| match e {
            VerimarkError::PasswordError(_) => VerificationFailure::InvalidPassword,
            _ => VerificationFailure::IntegrityFailed,
        })?
    } else if header.is_password_tagged() {
        let password = password.ok_or(VerificationFailure::PasswordRequired)?;
        if payload.len() < CHECKSUM_LEN {
            return Err(VerificationFailure::IntegrityFailed);
        }
        let (content, tag) = payload.split_at(payload.len() - CHECKSUM_LEN);
        if crypto::keyed_tag(password, content).as_slice() != tag {
            return Err(VerificationFailure::InvalidPassword);
        }
        content.to_vec()
    } else {
        payload.to_vec()
    };

    String::from_utf8(content).map_err(|_| VerificationFailure::IntegrityFailed)
}

#[derive(Debug, Clone, Copy)]
struct Geometry {
    width: usize,
    height: usize,
    block: usize,
}

fn analyse(marks: &[Mark], body_start: usize, geometry: Geometry) -> SignalAnalysis {
    if marks.is_empty() {
        return SignalAnalysis::default();
    }

    // Mean margin with disagreeing slots counted as zero, so the score is
    // the mean margin scaled by the agreement ratio.
    let confidence_score = marks
        .iter()
        .map(|m| if m.agrees { m.reading.detection.margin } else { 0.0 })
        .sum::<f32>()
        / marks.len() as f32;

    let sampled = if body_start < marks.len() {
        &marks[body_start..]
    } else {
        marks
    };
    let sampled = &sampled[..sampled.len().min(FREQUENCY_SAMPLES)];
    let frequency_data = FrequencyData {
        original: sampled.iter().map(|m| m.ideal).collect(),
        modified: sampled.iter().map(|m| m.reading.coefficient).collect(),
    };

    let count = marks.len().min(MAX_DETECTION_POINTS);
    let detection_points = (0..count)
        .map(|i| {
            let mark = &marks[i * marks.len() / count];
            let (x, y) = mark.reading.origin;
            let half = geometry.block as f32 / 2.0;
            DetectionPoint {
                x: percent(x as f32 + half, geometry.width),
                y: percent(y as f32 + half, geometry.height),
                confidence: mark.reading.detection.margin,
            }
        })
        .collect();

    SignalAnalysis {
        confidence_score,
        tampered_areas: tampered_areas(marks, geometry),
        frequency_data,
        detection_points,
    }
}

fn percent(position: f32, extent: usize) -> f32 {
    ((position / extent as f32) * 10_000.0).round() / 100.0
}

/// Cells where redundant copies disagree with the majority.
///
/// A cell is flagged when at least two of its slots and at least a fifth of
/// them disagree. Flagged cells touching horizontally are merged.
fn tampered_areas(marks: &[Mark], geometry: Geometry) -> Vec<TamperedArea> {
    let mut cells: BTreeMap<(usize, usize), (usize, usize)> = BTreeMap::new();
    for mark in marks.iter().filter(|m| m.redundant) {
        let (x, y) = mark.reading.origin;
        let entry = cells
            .entry((y / TAMPER_CELL, x / TAMPER_CELL))
            .or_default();
        entry.0 += 1;
        if !mark.agrees {
            entry.1 += 1;
        }
    }

    let mut areas: Vec<TamperedArea> = Vec::new();
    let mut last: Option<(usize, usize)> = None;
    for (&(row, col), &(total, bad)) in &cells {
        if bad < 2 || bad * 5 < total {
            continue;
        }
        let x = col * TAMPER_CELL;
        let y = row * TAMPER_CELL;
        let width = TAMPER_CELL.min(geometry.width - x) as u32;
        let height = TAMPER_CELL.min(geometry.height - y) as u32;
        let extends = matches!(last, Some((r, c)) if r == row && c + 1 == col);
        match areas.last_mut() {
            Some(area) if extends => area.width += width,
            _ => areas.push(TamperedArea {
                x: x as u32,
                y: y as u32,
                width,
                height,
            }),
        }
        last = Some((row, col));
    }
    areas
}
