//! Video complexity analysis via simulated motion estimation.
//!
//! Copyright (C) 2026 Imazen LLC
//!
//! This program is free software: you can redistribute it and/or modify
//! it under the terms of the GNU Affero General Public License as published
//! by the Free Software Foundation, either version 3 of the License, or
//! (at your option) any later version.
//!
//! For commercial licensing inquiries: support@imazen.io
//!
//! This crate estimates, per frame and per group-of-pictures, how expensive a
//! decoded video sequence would be to compress. It runs the motion-estimation
//! front end of a block-based encoder — intra, forward and bidirectional
//! block matching over 16x16 macroblocks — without any transform, entropy
//! coding or bitstream output, and derives complexity metrics from the
//! residual energies and the bit-cost proxies the searches produce.
//!
//! # Features
//!
//! - `simd` (default): SSE2 pixel kernels on x86-64, verified through
//!   [`archmage`] tokens. Scalar reference kernels are always available and
//!   numerically authoritative.
//!
//! # Pipeline
//!
//! ```rust,no_run
//! use zenmotion::{AnalyzerConfig, ComplexityAnalyzer, source};
//!
//! let src = source::open_source("input.y4m".as_ref(), None)?;
//! let mut analyzer = ComplexityAnalyzer::new(src, AnalyzerConfig::default())?;
//! analyzer.analyze()?;
//! let results = analyzer.into_results("y4m", "input.y4m");
//! for frame in &results.frames {
//!     println!("{} {} {:.3}", frame.pic_num, frame.picture_type, frame.score_v2);
//! }
//! # Ok::<(), zenmotion::AnalyzerError>(())
//! ```
//!
//! # Safety
//!
//! This crate uses `#![forbid(unsafe_code)]`. With the `simd` feature the
//! [`archmage`] `#[arcane]` proc macro generates the unsafe intrinsic blocks
//! internally; its token model guarantees the target features were verified
//! at runtime before any SIMD path is taken.
//!
//! [`archmage`]: https://docs.rs/archmage

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod common;

mod analyzer;
mod error;
mod frame;
mod mv_field;
mod normalize;
mod results;
mod search;

/// Frame sources: raw planar YUV and Y4M readers.
pub mod source;

/// Result serialization: CSV, JSON and XML writers.
pub mod output;

pub use analyzer::{AnalyzerConfig, ComplexityAnalyzer};
pub use common::dispatch::KernelSet;
pub use common::{Dim, MbMode, MotionVector};
pub use error::AnalyzerError;
pub use frame::{Plane, YuvFrame};
pub use mv_field::MvField;
pub use normalize::{ComplexityWeights, ScoreVersion};
pub use output::{DetailLevel, OutputError, OutputFormat};
pub use results::{AnalysisResults, FrameRecord, GopRecord, PictureType, VideoMetadata};
pub use source::{FrameSource, SourceError};
