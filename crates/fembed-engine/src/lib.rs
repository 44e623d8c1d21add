//! Core face embedding engine.
//!
//! This crate provides:
//! - The [`InferenceEngine`] trait, the opaque "image + config ->
//!   detection or nothing" seam the rest of the service is built on
//! - [`OnnxFaceEngine`], the ONNX Runtime implementation
//! - [`StrategyController`], the multi-strategy detection fallback loop
//! - [`BatchRunner`], sequential batch execution with per-item isolation
//! - [`ReadinessState`], the two-phase load-then-serve lifecycle

pub mod batch;
pub mod engine;
pub mod error;
pub mod image;
pub mod onnx;
pub mod state;
pub mod strategy;

pub use batch::BatchRunner;
pub use engine::InferenceEngine;
pub use error::{EngineError, EngineResult};
pub use image::FaceImage;
pub use onnx::{OnnxEngineConfig, OnnxFaceEngine, EMBEDDING_DIM};
pub use state::{EngineStatus, ReadinessState};
pub use strategy::StrategyController;
