//! Prediction and inference
//!
//! Load the trained ensemble and generate predictions.

pub mod inference;

pub use inference::{format_prediction, MatchPrediction, Predictor};
