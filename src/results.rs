//! Analysis result structures and GOP aggregation.
//!
//! Frame records arrive from the analyzer already in display order; GOPs are
//! derived after the fact: one begins at every I record and runs to the next
//! I record or the end of the list.

use serde::Serialize;
use std::fmt;

use crate::normalize::ScoreVersion;

/// Picture coding type assigned by the GOP scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PictureType {
    /// Intra picture, the GOP anchor.
    I,
    /// Forward-predicted picture.
    P,
    /// Bidirectionally predicted picture.
    B,
}

impl fmt::Display for PictureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PictureType::I => "I",
            PictureType::P => "P",
            PictureType::B => "B",
        })
    }
}

/// Everything recorded about one analyzed frame.
#[derive(Debug, Clone, Serialize)]
pub struct FrameRecord {
    /// 0-based display index.
    pub pic_num: usize,
    /// Assigned picture type.
    pub picture_type: PictureType,
    /// Macroblocks coded intra.
    pub count_intra: usize,
    /// Macroblocks coded forward-predicted.
    pub count_inter_p: usize,
    /// Macroblocks coded bidirectional.
    pub count_inter_b: usize,
    /// Frame reconstruction error: sum of chosen per-block residuals.
    pub error: i64,
    /// Type-weighted bit proxy.
    pub bits: i64,
    /// Mean 16x16 luma variance.
    pub spatial_variance: f64,
    /// Mean motion vector magnitude in samples (zero for I pictures).
    pub motion_magnitude: f64,
    /// Total residual energy across macroblocks.
    pub ac_energy: i64,
    /// Reconstruction error carried as a float for normalization.
    pub mse: f64,
    /// Bit proxy divided by pixel count.
    pub bits_per_pixel: f64,
    /// Normalized spatial complexity in [0, 1].
    pub norm_spatial: f64,
    /// Normalized motion complexity in [0, 1].
    pub norm_motion: f64,
    /// Normalized residual complexity in [0, 1].
    pub norm_residual: f64,
    /// Normalized reconstruction error in [0, 1].
    pub norm_error: f64,
    /// Unified score v1 (bits-per-pixel based).
    pub score_v1: f64,
    /// Unified score v2 (weighted combination).
    pub score_v2: f64,
}

/// Totals over one group of pictures.
#[derive(Debug, Clone, Serialize)]
pub struct GopRecord {
    /// 0-based GOP index.
    pub gop_index: usize,
    /// Display index of the opening I frame.
    pub start_frame: usize,
    /// Display index of the last member frame, inclusive.
    pub end_frame: usize,
    /// Sum of member frames' bit proxies.
    pub total_bits: i64,
    /// Mean of member frames' primary unified score (v1 or v2 per the
    /// configured [`ScoreVersion`]).
    pub avg_score: f64,
    /// Member I frames.
    pub count_i: usize,
    /// Member P frames.
    pub count_p: usize,
    /// Member B frames.
    pub count_b: usize,
}

/// Input description and analysis parameters, carried into the writers.
#[derive(Debug, Clone, Serialize)]
pub struct VideoMetadata {
    /// Luma width in samples.
    pub width: usize,
    /// Luma height in samples.
    pub height: usize,
    /// Number of frames analyzed.
    pub total_frames: usize,
    /// Configured I-to-I distance.
    pub gop_size: usize,
    /// Configured consecutive B pictures.
    pub bframes: usize,
    /// Input container kind ("y4m", "yuv", ...).
    pub input_format: String,
    /// Input path as given.
    pub input_filename: String,
    /// Output format version.
    pub version: String,
}

/// Complete output of one analysis run.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisResults {
    /// Input description.
    pub metadata: VideoMetadata,
    /// Per-frame records in display order.
    pub frames: Vec<FrameRecord>,
    /// Per-GOP totals derived from the frame list.
    pub gops: Vec<GopRecord>,
}

impl AnalysisResults {
    /// Assemble results from display-ordered records, deriving the GOP list.
    ///
    /// `score_version` selects which unified score each GOP averages.
    #[must_use]
    pub fn from_records(
        metadata: VideoMetadata,
        frames: Vec<FrameRecord>,
        score_version: ScoreVersion,
    ) -> AnalysisResults {
        let gops = derive_gops(&frames, score_version);
        AnalysisResults {
            metadata,
            frames,
            gops,
        }
    }
}

fn derive_gops(frames: &[FrameRecord], score_version: ScoreVersion) -> Vec<GopRecord> {
    let mut gops = Vec::new();
    let mut start = 0usize;
    for i in 1..=frames.len() {
        let boundary = i == frames.len() || frames[i].picture_type == PictureType::I;
        if !boundary {
            continue;
        }
        let members = &frames[start..i];
        let mut gop = GopRecord {
            gop_index: gops.len(),
            start_frame: members[0].pic_num,
            end_frame: members[members.len() - 1].pic_num,
            total_bits: 0,
            avg_score: 0.0,
            count_i: 0,
            count_p: 0,
            count_b: 0,
        };
        for frame in members {
            gop.total_bits += frame.bits;
            gop.avg_score += match score_version {
                ScoreVersion::V1 => frame.score_v1,
                ScoreVersion::V2 => frame.score_v2,
            };
            match frame.picture_type {
                PictureType::I => gop.count_i += 1,
                PictureType::P => gop.count_p += 1,
                PictureType::B => gop.count_b += 1,
            }
        }
        gop.avg_score /= members.len() as f64;
        gops.push(gop);
        start = i;
    }
    gops
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(pic_num: usize, picture_type: PictureType) -> FrameRecord {
        FrameRecord {
            pic_num,
            picture_type,
            count_intra: 0,
            count_inter_p: 0,
            count_inter_b: 0,
            error: 0,
            bits: 100,
            spatial_variance: 0.0,
            motion_magnitude: 0.0,
            ac_energy: 0,
            mse: 0.0,
            bits_per_pixel: 0.0,
            norm_spatial: 0.0,
            norm_motion: 0.0,
            norm_residual: 0.0,
            norm_error: 0.0,
            score_v1: 0.0,
            score_v2: 0.5,
        }
    }

    #[test]
    fn empty_record_list_yields_no_gops() {
        assert!(derive_gops(&[], ScoreVersion::V2).is_empty());
    }

    #[test]
    fn gops_split_at_i_frames() {
        let frames = vec![
            record(0, PictureType::I),
            record(1, PictureType::P),
            record(2, PictureType::P),
            record(3, PictureType::I),
            record(4, PictureType::P),
        ];
        let gops = derive_gops(&frames, ScoreVersion::V2);
        assert_eq!(gops.len(), 2);
        assert_eq!(gops[0].start_frame, 0);
        assert_eq!(gops[0].end_frame, 2);
        assert_eq!(gops[0].count_i, 1);
        assert_eq!(gops[0].count_p, 2);
        assert_eq!(gops[0].total_bits, 300);
        assert_eq!(gops[1].gop_index, 1);
        assert_eq!(gops[1].start_frame, 3);
        assert_eq!(gops[1].end_frame, 4);
    }

    #[test]
    fn single_gop_covers_whole_list() {
        let frames = vec![
            record(0, PictureType::I),
            record(1, PictureType::B),
            record(2, PictureType::P),
        ];
        let gops = derive_gops(&frames, ScoreVersion::V2);
        assert_eq!(gops.len(), 1);
        assert_eq!(gops[0].end_frame, 2);
        assert_eq!(gops[0].count_b, 1);
        assert!((gops[0].avg_score - 0.5).abs() < 1e-12);
    }

    #[test]
    fn score_version_selects_the_averaged_score() {
        let mut frames = vec![record(0, PictureType::I), record(1, PictureType::P)];
        frames[0].score_v1 = 0.8;
        frames[1].score_v1 = 0.4;

        let v1 = derive_gops(&frames, ScoreVersion::V1);
        assert!((v1[0].avg_score - 0.6).abs() < 1e-12);
        let v2 = derive_gops(&frames, ScoreVersion::V2);
        assert!((v2[0].avg_score - 0.5).abs() < 1e-12);
    }
}
