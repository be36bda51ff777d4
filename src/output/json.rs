//! JSON writer: metadata plus GOP objects, frames nested per GOP.

use std::io::Write;

use serde_json::json;

use super::{DetailLevel, OutputError};
use crate::results::{AnalysisResults, FrameRecord};

fn frame_object(frame: &FrameRecord) -> serde_json::Value {
    json!({
        "frame_num": frame.pic_num,
        "type": frame.picture_type,
        "block_modes": {
            "intra": frame.count_intra,
            "inter_p": frame.count_inter_p,
            "inter_b": frame.count_inter_b,
        },
        "error": frame.error,
        "estimated_bits": frame.bits,
        "bits_per_pixel": frame.bits_per_pixel,
        "complexity": {
            "spatial_variance": frame.spatial_variance,
            "motion_magnitude": frame.motion_magnitude,
            "ac_energy": frame.ac_energy,
            "norm_spatial": frame.norm_spatial,
            "norm_motion": frame.norm_motion,
            "norm_residual": frame.norm_residual,
            "norm_error": frame.norm_error,
            "score_v1": frame.score_v1,
            "score_v2": frame.score_v2,
        },
    })
}

pub(super) fn write(
    out: &mut dyn Write,
    results: &AnalysisResults,
    detail: DetailLevel,
) -> Result<(), OutputError> {
    let gops: Vec<serde_json::Value> = results
        .gops
        .iter()
        .map(|gop| {
            let mut obj = json!({
                "gop_num": gop.gop_index,
                "start_frame": gop.start_frame,
                "end_frame": gop.end_frame,
                "total_bits": gop.total_bits,
                "avg_complexity": gop.avg_score,
                "i_frame_count": gop.count_i,
                "p_frame_count": gop.count_p,
                "b_frame_count": gop.count_b,
            });
            if detail == DetailLevel::Frame {
                let frames: Vec<serde_json::Value> = results
                    .frames
                    .iter()
                    .filter(|f| f.pic_num >= gop.start_frame && f.pic_num <= gop.end_frame)
                    .map(frame_object)
                    .collect();
                obj["frames"] = serde_json::Value::Array(frames);
            }
            obj
        })
        .collect();

    let document = json!({
        "metadata": {
            "width": results.metadata.width,
            "height": results.metadata.height,
            "frames": results.metadata.total_frames,
            "gop_size": results.metadata.gop_size,
            "bframes": results.metadata.bframes,
            "input_format": results.metadata.input_format,
            "input_filename": results.metadata.input_filename,
            "version": results.metadata.version,
        },
        "gops": gops,
    });

    serde_json::to_writer_pretty(&mut *out, &document)?;
    writeln!(out)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::ScoreVersion;
    use crate::results::{PictureType, VideoMetadata};

    #[test]
    fn document_nests_frames_in_gops() {
        let metadata = VideoMetadata {
            width: 64,
            height: 64,
            total_frames: 1,
            gop_size: 150,
            bframes: 0,
            input_format: "y4m".into(),
            input_filename: "x.y4m".into(),
            version: "2.0.0".into(),
        };
        let frames = vec![FrameRecord {
            pic_num: 0,
            picture_type: PictureType::I,
            count_intra: 16,
            count_inter_p: 0,
            count_inter_b: 0,
            error: 10,
            bits: 20,
            spatial_variance: 1.0,
            motion_magnitude: 0.0,
            ac_energy: 10,
            mse: 10.0,
            bits_per_pixel: 0.005,
            norm_spatial: 0.004,
            norm_motion: 0.0,
            norm_residual: 0.0,
            norm_error: 0.012,
            score_v1: 0.01,
            score_v2: 0.004,
        }];
        let results = AnalysisResults::from_records(metadata, frames, ScoreVersion::V2);

        let mut buf = Vec::new();
        write(&mut buf, &results, DetailLevel::Frame).unwrap();
        let doc: serde_json::Value = serde_json::from_slice(&buf).unwrap();

        assert_eq!(doc["metadata"]["width"], 64);
        assert_eq!(doc["gops"][0]["i_frame_count"], 1);
        assert_eq!(doc["gops"][0]["frames"][0]["type"], "I");
        assert_eq!(doc["gops"][0]["frames"][0]["block_modes"]["intra"], 16);

        let mut gop_only = Vec::new();
        write(&mut gop_only, &results, DetailLevel::Gop).unwrap();
        let doc: serde_json::Value = serde_json::from_slice(&gop_only).unwrap();
        assert!(doc["gops"][0].get("frames").is_none());
    }
}
