//! # Formats Module
//!
//! Canonical binary encoding for status snapshots.
//!
//! This module contains:
//! - Binary persistence format (postcard + header)
//! - Optional BLAKE3 payload checksums (feature `crypto-hash`)
//!
//! Note: File I/O remains in the app layer. This module only handles
//! format conversion (pure transformations).

mod persistence;

pub use persistence::*;
