// src/lib.rs

//! SOPA Tracker Library
//!
//! Reads the Forest Service's Schedule of Proposed Actions pages, keeps a
//! per-unit dataset of project updates and merges newer monthly snapshots
//! into it.

pub mod error;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod storage;
pub mod utils;
