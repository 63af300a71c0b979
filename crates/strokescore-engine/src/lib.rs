//! strokescore-engine: Pure stroke geometry analysis and scoring (sans-IO).
//!
//! Measures the geometry of hand-drawn brush strokes in a binary ink mask
//! and scores a user's drawing against a reference:
//! ink mask -> distance field -> skeleton -> thickness profile ->
//! turning points -> stroke separation -> center-tip -> scores.
//!
//! This crate has **no I/O dependencies** -- it operates on in-memory
//! masks and byte slices and returns structured, serializable data. File
//! access and presentation choices belong to the caller (see the
//! `strokescore` CLI).
//!
//! Structured logging is available through the optional `tracing`
//! feature; without it the engine emits nothing.

pub mod analysis;
pub mod center_tip;
pub mod config;
pub mod distance;
pub mod dynamics;
pub mod edge;
pub mod grayscale;
pub mod mask;
pub mod pressure;
pub mod report;
pub mod scoring;
pub mod shape;
pub mod skeleton;
pub mod smooth;
pub mod strokes;
pub mod thickness;
pub mod turning;
pub mod types;

pub use analysis::{Comparison, MaskAnalysis, analyze_mask, compare, compare_analyses, compare_images};
pub use config::AnalysisConfig;
pub use report::{ComparisonSummary, ReportConfig, render_text};
pub use scoring::{Grade, ScoreBreakdown};
pub use skeleton::Skeleton;
pub use types::{BinaryMask, Dimensions, EngineError, PixelPoint, Point};
