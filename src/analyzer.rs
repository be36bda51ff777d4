//! The complexity analyzer: GOP scheduling and per-frame metric assembly.
//!
//! One [`ComplexityAnalyzer::analyze`] call drives the whole pipeline on a
//! single thread. Frames are held in a ring of `subgop_size + 1` slots:
//! slot 0 is the most recent anchor (I or P), slot `subgop_size` the next
//! anchor, and the slots between them the B pictures of the current subGOP.
//! When a subGOP completes, the new anchor swaps into slot 0.
//!
//! Records are produced in encoding order (each subGOP's P before its Bs)
//! and re-sorted to display order through a single held-back slot: an I or P
//! record is retained until the next I/P or end of stream flushes it, after
//! the intervening B records.

use tracing::{debug, trace, warn};

use crate::common::dispatch::KernelSet;
use crate::common::{Dim, MbMode, MB_WIDTH};
use crate::error::AnalyzerError;
use crate::frame::YuvFrame;
use crate::mv_field::MvField;
use crate::normalize::{self, ComplexityWeights, ScoreVersion};
use crate::results::{AnalysisResults, FrameRecord, PictureType, VideoMetadata};
use crate::source::{FrameSource, SourceError};

/// Output format version carried in the result metadata.
const FORMAT_VERSION: &str = "2.0.0";

// Per-type bit weights, applied as `(weight * bits + 128) >> 8`. I pictures
// run at the lowest QP of the three and so cost the most bits for the same
// residual; B pictures at the highest.
const I_FRAME_BIT_WEIGHT: i64 = 282;
const P_FRAME_BIT_WEIGHT: i64 = 269;
const B_FRAME_BIT_WEIGHT: i64 = 256;

/// Analyzer parameters.
#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    /// I-to-I distance in frames.
    pub gop_size: usize,
    /// Consecutive B pictures between anchors.
    pub b_frames: usize,
    /// Stop after this many frames; 0 analyzes the whole sequence.
    pub num_frames: usize,
    /// Weights for the v2 unified score.
    pub weights: ComplexityWeights,
    /// Which unified score feeds the per-GOP averages.
    pub score_version: ScoreVersion,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        AnalyzerConfig {
            gop_size: 150,
            b_frames: 0,
            num_frames: 0,
            weights: ComplexityWeights::default(),
            score_version: ScoreVersion::default(),
        }
    }
}

/// Simulates the motion-estimation front end over a frame source and
/// accumulates per-frame complexity records.
pub struct ComplexityAnalyzer<S: FrameSource> {
    source: S,
    dim: Dim,
    gop_size: usize,
    subgop_size: usize,
    num_frames: usize,
    weights: ComplexityWeights,
    score_version: ScoreVersion,
    kernels: &'static KernelSet,
    frames: Vec<YuvFrame>,
    p_field: MvField,
    b1_field: MvField,
    b2_field: MvField,
    mses: Vec<i32>,
    modes: Vec<MbMode>,
    records: Vec<FrameRecord>,
    pending: Option<FrameRecord>,
    gop_index: usize,
    gop_bits: i64,
    gop_error: i64,
}

impl<S: FrameSource> ComplexityAnalyzer<S> {
    /// Build an analyzer over `source`.
    ///
    /// Fails with [`AnalyzerError::InvalidConfig`] when the GOP size is
    /// zero, a weight is negative, or the source dimensions are not
    /// positive multiples of 16. Weights that do not sum to 1.0 are
    /// accepted with a warning.
    pub fn new(source: S, config: AnalyzerConfig) -> Result<Self, AnalyzerError> {
        if config.gop_size < 1 {
            return Err(AnalyzerError::InvalidConfig(
                "gop_size must be at least 1".into(),
            ));
        }
        if !config.weights.is_valid() {
            return Err(AnalyzerError::InvalidConfig(
                "complexity weights must be non-negative".into(),
            ));
        }
        if !config.weights.is_normalized() {
            warn!(
                sum = config.weights.sum(),
                "complexity weights do not sum to 1.0; scores may not be comparable"
            );
        }
        let dim = source.dim();
        if !dim.is_mb_aligned() {
            return Err(AnalyzerError::InvalidConfig(format!(
                "frame size {}x{} is not a positive multiple of {MB_WIDTH}",
                dim.width, dim.height
            )));
        }

        let subgop_size = config.b_frames + 1;
        let frames: Vec<YuvFrame> = (0..=subgop_size).map(|_| YuvFrame::new(dim)).collect();
        let plane_stride = frames[0].y().stride();
        let cells = (dim.mb_cols() + 2) * (dim.mb_rows() + 2);

        Ok(ComplexityAnalyzer {
            source,
            dim,
            gop_size: config.gop_size,
            subgop_size,
            num_frames: config.num_frames,
            weights: config.weights,
            score_version: config.score_version,
            kernels: KernelSet::detect(),
            frames,
            p_field: MvField::new(dim, plane_stride),
            b1_field: MvField::new(dim, plane_stride),
            b2_field: MvField::new(dim, plane_stride),
            mses: vec![0; cells],
            modes: vec![MbMode::Intra; cells],
            records: Vec::new(),
            pending: None,
            gop_index: 0,
            gop_bits: 0,
            gop_error: 0,
        })
    }

    /// Run the sequence to completion or end of stream.
    ///
    /// End of stream is the expected terminator and never surfaces as an
    /// error; a subGOP cut short by it is shortened, keeping every frame
    /// that was actually read. Any other source failure is propagated.
    pub fn analyze(&mut self) -> Result<(), AnalyzerError> {
        let mut td = 0usize;
        loop {
            let more = if self.num_frames > 0 {
                self.source.count() < self.num_frames
            } else {
                !self.source.at_eof()
            };
            if !more {
                break;
            }

            let mut eof = false;
            if self.source.count() % self.gop_size == 0 {
                if self.source.count() > 0 {
                    debug!(
                        gop = self.gop_index,
                        bits = self.gop_bits,
                        error = self.gop_error,
                        "GOP complete"
                    );
                    self.gop_index += 1;
                }
                self.gop_bits = 0;
                self.gop_error = 0;
                td = 0;
                match self.frames[0].read_from(&mut self.source) {
                    Ok(()) => self.process_i_picture(),
                    Err(SourceError::EndOfStream) => break,
                    Err(err) => return Err(err.into()),
                }
            } else {
                // The previous subGOP's P becomes the new forward anchor.
                self.frames.swap(0, self.subgop_size);
            }

            // Read ahead up to a subGOP, shortening on EOF or the GOP tail.
            let td_ref = td;
            while td < self.gop_size - 1 && td - td_ref < self.subgop_size {
                let slot = td + 1 - td_ref;
                match self.frames[slot].read_from(&mut self.source) {
                    Ok(()) => td += 1,
                    Err(SourceError::EndOfStream) => {
                        eof = true;
                        break;
                    }
                    Err(err) => return Err(err.into()),
                }
            }

            let filled = td - td_ref;
            if filled > 0 {
                self.process_p_picture(filled);
                for slot in 1..filled {
                    self.process_b_picture(slot, filled);
                }
            }
            if eof {
                break;
            }
        }

        if let Some(record) = self.pending.take() {
            self.records.push(record);
        }
        debug!(frames = self.source.count(), "analysis complete");
        Ok(())
    }

    /// Consume the analyzer, yielding the aggregated results.
    #[must_use]
    pub fn into_results(self, input_format: &str, input_filename: &str) -> AnalysisResults {
        let metadata = VideoMetadata {
            width: self.dim.width,
            height: self.dim.height,
            total_frames: self.records.len(),
            gop_size: self.gop_size,
            bframes: self.subgop_size - 1,
            input_format: input_format.to_owned(),
            input_filename: input_filename.to_owned(),
            version: FORMAT_VERSION.to_owned(),
        };
        AnalysisResults::from_records(metadata, self.records, self.score_version)
    }

    /// Per-frame records accumulated so far, in display order.
    #[must_use]
    pub fn records(&self) -> &[FrameRecord] {
        &self.records
    }

    fn process_i_picture(&mut self) {
        self.p_field.reset();
        self.b1_field.reset();
        self.b2_field.reset();

        let error = self.p_field.predict_spatial(
            &self.frames[0],
            self.kernels,
            &mut self.mses,
            &mut self.modes,
        );
        let bits = (I_FRAME_BIT_WEIGHT * self.p_field.bits() + 128) >> 8;
        self.gop_bits += bits;
        self.gop_error += error;
        trace!(pic = self.frames[0].pos(), error, bits, "I picture");

        let record = self.make_record(0, PictureType::I, error, bits, 0.0);
        self.push_record(record);
        self.frames[0].extend_borders();
    }

    fn process_p_picture(&mut self, slot: usize) {
        let error = self.p_field.predict_temporal(
            &self.frames[slot],
            &self.frames[0],
            self.kernels,
            &mut self.mses,
            &mut self.modes,
        );
        let bits = (P_FRAME_BIT_WEIGHT * self.p_field.bits() + 128) >> 8;
        self.gop_bits += bits;
        self.gop_error += error;
        trace!(pic = self.frames[slot].pos(), error, bits, "P picture");

        let motion = self.motion_magnitude();
        let record = self.make_record(slot, PictureType::P, error, bits, motion);
        self.push_record(record);
        self.frames[slot].extend_borders();
    }

    fn process_b_picture(&mut self, slot: usize, p_slot: usize) {
        let error = self.p_field.predict_bidirectional(
            &self.frames[slot],
            &self.frames[0],
            &self.frames[p_slot],
            &mut self.b1_field,
            &mut self.b2_field,
            self.kernels,
            &mut self.mses,
            &mut self.modes,
        );
        let bits = (B_FRAME_BIT_WEIGHT * self.p_field.bits() + 128) >> 8;
        self.gop_bits += bits;
        self.gop_error += error;
        trace!(pic = self.frames[slot].pos(), error, bits, "B picture");

        let motion = self.motion_magnitude();
        let record = self.make_record(slot, PictureType::B, error, bits, motion);
        self.push_record(record);
    }

    /// Mean 16x16 luma variance over the frame in `slot`.
    fn spatial_variance(&self, slot: usize) -> f64 {
        let plane = self.frames[slot].y();
        let stride = plane.stride();
        let data = plane.data();
        let mut total = 0i64;
        let blocks = self.dim.mb_cols() * self.dim.mb_rows();
        for row in 0..self.dim.mb_rows() {
            for col in 0..self.dim.mb_cols() {
                let idx = plane.index((col * MB_WIDTH) as i32, (row * MB_WIDTH) as i32);
                total += i64::from((self.kernels.variance16)(&data[idx..], stride, MB_WIDTH));
            }
        }
        total as f64 / blocks as f64
    }

    /// Mean motion-vector magnitude of the last search.
    fn motion_magnitude(&self) -> f64 {
        let mut total = 0.0;
        for row in 0..self.dim.mb_rows() {
            for col in 0..self.dim.mb_cols() {
                total += self.p_field.mv_at(col, row).magnitude();
            }
        }
        total / (self.dim.mb_cols() * self.dim.mb_rows()) as f64
    }

    /// Total residual energy recorded by the last search.
    fn ac_energy(&self) -> i64 {
        let stride_mb = self.p_field.stride_mb();
        let mut total = 0i64;
        for row in 0..self.dim.mb_rows() {
            let base = (row + 1) * stride_mb + 1;
            for col in 0..self.dim.mb_cols() {
                total += i64::from(self.mses[base + col]);
            }
        }
        total
    }

    fn make_record(
        &self,
        slot: usize,
        picture_type: PictureType,
        error: i64,
        bits: i64,
        motion_magnitude: f64,
    ) -> FrameRecord {
        let num_pixels = self.dim.width * self.dim.height;
        let spatial_variance = self.spatial_variance(slot);
        let ac_energy = self.ac_energy();
        let mse = error as f64;
        let bpp = normalize::bits_per_pixel(bits, num_pixels);

        let norm_spatial = normalize::normalize_variance(spatial_variance);
        let norm_motion =
            normalize::normalize_motion(motion_magnitude, self.dim.width, self.dim.height);
        let norm_residual = normalize::normalize_ac_energy(ac_energy, num_pixels);
        let norm_error = normalize::normalize_mse(mse);

        FrameRecord {
            pic_num: self.frames[slot].pos(),
            picture_type,
            count_intra: self.p_field.count_intra(),
            count_inter_p: self.p_field.count_inter_p(),
            count_inter_b: self.p_field.count_inter_b(),
            error,
            bits,
            spatial_variance,
            motion_magnitude,
            ac_energy,
            mse,
            bits_per_pixel: bpp,
            norm_spatial,
            norm_motion,
            norm_residual,
            norm_error,
            score_v1: normalize::score_v1(bpp),
            score_v2: normalize::score_v2(
                &self.weights,
                norm_spatial,
                norm_motion,
                norm_residual,
                norm_error,
            ),
        }
    }

    /// Encoding-to-display reordering through the single held-back slot.
    fn push_record(&mut self, record: FrameRecord) {
        match record.picture_type {
            PictureType::I | PictureType::P => {
                if let Some(held) = self.pending.replace(record) {
                    self.records.push(held);
                }
            }
            PictureType::B => self.records.push(record),
        }
    }
}
