//! CSV writer: the historical flat schema with Unix line endings.

use std::io::Write;

use super::{DetailLevel, OutputError};
use crate::results::AnalysisResults;

pub(super) fn write(
    out: &mut dyn Write,
    results: &AnalysisResults,
    detail: DetailLevel,
) -> Result<(), OutputError> {
    match detail {
        DetailLevel::Frame => {
            writeln!(out, "picNum,picType,count_I,count_P,count_B,error,bits")?;
            for frame in &results.frames {
                writeln!(
                    out,
                    "{},{},{},{},{},{},{}",
                    frame.pic_num,
                    frame.picture_type,
                    frame.count_intra,
                    frame.count_inter_p,
                    frame.count_inter_b,
                    frame.error,
                    frame.bits
                )?;
            }
        }
        DetailLevel::Gop => {
            writeln!(
                out,
                "gop,frames,total_bits,avg_complexity,i_frames,p_frames,b_frames"
            )?;
            for gop in &results.gops {
                let frames = gop.end_frame - gop.start_frame + 1;
                writeln!(
                    out,
                    "{},{},{},{:.2},{},{},{}",
                    gop.gop_index,
                    frames,
                    gop.total_bits,
                    gop.avg_score,
                    gop.count_i,
                    gop.count_p,
                    gop.count_b
                )?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::ScoreVersion;
    use crate::results::{FrameRecord, PictureType, VideoMetadata};

    fn sample_results() -> AnalysisResults {
        let metadata = VideoMetadata {
            width: 64,
            height: 64,
            total_frames: 2,
            gop_size: 150,
            bframes: 0,
            input_format: "yuv".into(),
            input_filename: "test.yuv".into(),
            version: "2.0.0".into(),
        };
        let frames = vec![
            FrameRecord {
                pic_num: 0,
                picture_type: PictureType::I,
                count_intra: 16,
                count_inter_p: 0,
                count_inter_b: 0,
                error: 1234,
                bits: 4321,
                spatial_variance: 10.0,
                motion_magnitude: 0.0,
                ac_energy: 1234,
                mse: 1234.0,
                bits_per_pixel: 1.05,
                norm_spatial: 0.01,
                norm_motion: 0.0,
                norm_residual: 0.001,
                norm_error: 0.14,
                score_v1: 1.0,
                score_v2: 0.05,
            },
            FrameRecord {
                pic_num: 1,
                picture_type: PictureType::P,
                count_intra: 0,
                count_inter_p: 16,
                count_inter_b: 0,
                error: 56,
                bits: 789,
                spatial_variance: 10.0,
                motion_magnitude: 1.5,
                ac_energy: 56,
                mse: 56.0,
                bits_per_pixel: 0.19,
                norm_spatial: 0.01,
                norm_motion: 0.16,
                norm_residual: 0.0,
                norm_error: 0.03,
                score_v1: 0.38,
                score_v2: 0.06,
            },
        ];
        AnalysisResults::from_records(metadata, frames, ScoreVersion::V2)
    }

    #[test]
    fn frame_rows_match_legacy_schema() {
        let mut buf = Vec::new();
        write(&mut buf, &sample_results(), DetailLevel::Frame).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next().unwrap(),
            "picNum,picType,count_I,count_P,count_B,error,bits"
        );
        assert_eq!(lines.next().unwrap(), "0,I,16,0,0,1234,4321");
        assert_eq!(lines.next().unwrap(), "1,P,0,16,0,56,789");
        assert!(lines.next().is_none());
        assert!(!text.contains('\r'));
    }

    #[test]
    fn gop_rows_cover_whole_sequence() {
        let mut buf = Vec::new();
        write(&mut buf, &sample_results(), DetailLevel::Gop).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next().unwrap(),
            "gop,frames,total_bits,avg_complexity,i_frames,p_frames,b_frames"
        );
        let row = lines.next().unwrap();
        assert!(row.starts_with("0,2,5110,"));
        assert!(row.ends_with(",1,1,0"));
    }
}
