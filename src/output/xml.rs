//! XML writer.
//!
//! Emits the same nesting as the JSON document with attribute-carrying
//! elements. Serialization is hand-rolled over `io::Write`; the only text
//! content is attribute values, escaped per the XML 1.0 rules.

use std::io::Write;

use super::{DetailLevel, OutputError};
use crate::results::{AnalysisResults, FrameRecord};

fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

fn write_frame(out: &mut dyn Write, frame: &FrameRecord) -> Result<(), OutputError> {
    writeln!(
        out,
        "      <frame num=\"{}\" type=\"{}\">",
        frame.pic_num, frame.picture_type
    )?;
    writeln!(
        out,
        "        <complexity spatial=\"{}\" motion=\"{}\" ac_energy=\"{}\" \
         norm_spatial=\"{}\" norm_motion=\"{}\" norm_residual=\"{}\" norm_error=\"{}\" \
         score_v1=\"{}\" score_v2=\"{}\"/>",
        frame.spatial_variance,
        frame.motion_magnitude,
        frame.ac_energy,
        frame.norm_spatial,
        frame.norm_motion,
        frame.norm_residual,
        frame.norm_error,
        frame.score_v1,
        frame.score_v2
    )?;
    writeln!(
        out,
        "        <block_modes intra=\"{}\" inter_p=\"{}\" inter_b=\"{}\"/>",
        frame.count_intra, frame.count_inter_p, frame.count_inter_b
    )?;
    writeln!(out, "        <error value=\"{}\"/>", frame.error)?;
    writeln!(
        out,
        "        <bits estimated=\"{}\" per_pixel=\"{}\"/>",
        frame.bits, frame.bits_per_pixel
    )?;
    writeln!(out, "      </frame>")?;
    Ok(())
}

pub(super) fn write(
    out: &mut dyn Write,
    results: &AnalysisResults,
    detail: DetailLevel,
) -> Result<(), OutputError> {
    writeln!(out, "<?xml version=\"1.0\" encoding=\"UTF-8\"?>")?;
    writeln!(
        out,
        "<motion_analysis version=\"{}\">",
        escape(&results.metadata.version)
    )?;

    writeln!(out, "  <metadata>")?;
    writeln!(
        out,
        "    <video width=\"{}\" height=\"{}\" frames=\"{}\"/>",
        results.metadata.width, results.metadata.height, results.metadata.total_frames
    )?;
    writeln!(
        out,
        "    <encoding gop_size=\"{}\" bframes=\"{}\"/>",
        results.metadata.gop_size, results.metadata.bframes
    )?;
    writeln!(
        out,
        "    <input format=\"{}\" filename=\"{}\"/>",
        escape(&results.metadata.input_format),
        escape(&results.metadata.input_filename)
    )?;
    writeln!(out, "  </metadata>")?;

    writeln!(out, "  <gops>")?;
    for gop in &results.gops {
        writeln!(
            out,
            "    <gop num=\"{}\" start=\"{}\" end=\"{}\" total_bits=\"{}\" \
             avg_complexity=\"{}\" i_frames=\"{}\" p_frames=\"{}\" b_frames=\"{}\">",
            gop.gop_index,
            gop.start_frame,
            gop.end_frame,
            gop.total_bits,
            gop.avg_score,
            gop.count_i,
            gop.count_p,
            gop.count_b
        )?;
        if detail == DetailLevel::Frame {
            for frame in results
                .frames
                .iter()
                .filter(|f| f.pic_num >= gop.start_frame && f.pic_num <= gop.end_frame)
            {
                write_frame(out, frame)?;
            }
        }
        writeln!(out, "    </gop>")?;
    }
    writeln!(out, "  </gops>")?;
    writeln!(out, "</motion_analysis>")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_markup_characters() {
        assert_eq!(escape("a<b>&\"c'"), "a&lt;b&gt;&amp;&quot;c&apos;");
        assert_eq!(escape("plain"), "plain");
    }
}
