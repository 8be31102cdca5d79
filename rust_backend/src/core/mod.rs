//! Core domain models for transient follow-up tiling.
//!
//! This module defines the value types shared by the skymap filter, the tile
//! builder and the scheduler, plus the angle helpers they all rely on.

pub mod domain;
pub mod geometry;
