//! Copy planning.
//!
//! This module contains pure logic for choosing a copy strategy and splitting
//! large objects into part ranges. No I/O operations - just decision making.

use package_import_common::MAX_MULTIPART_PARTS;

use crate::types::ObjectLocation;

/// Byte range of one multipart part. Both bounds are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartRange {
    /// 1-based part number.
    pub part_number: i32,
    /// First byte offset.
    pub first_byte: u64,
    /// Last byte offset (inclusive).
    pub last_byte: u64,
}

impl PartRange {
    /// Length of this part in bytes.
    pub fn length(&self) -> u64 {
        self.last_byte - self.first_byte + 1
    }

    /// HTTP range header value, e.g. `bytes=0-104857599`.
    pub fn http_range(&self) -> String {
        format!("bytes={}-{}", self.first_byte, self.last_byte)
    }
}

/// Determine if an object must be copied with multipart copy.
///
/// Objects strictly larger than `threshold` need it.
pub fn needs_multipart(size: u64, threshold: u64) -> bool {
    size > threshold
}

/// Split an object of `size` bytes into parts of `part_size` bytes.
///
/// Parts are numbered from 1 and cover the object contiguously. The last
/// part may be shorter than `part_size`.
///
/// # Returns
/// The part ranges in increasing order; empty if `size` or `part_size` is 0.
pub fn generate_parts(size: u64, part_size: u64) -> Vec<PartRange> {
    if size == 0 || part_size == 0 {
        return Vec::new();
    }

    let mut parts = Vec::with_capacity(expected_part_count(size, part_size).min(MAX_MULTIPART_PARTS));
    let mut first_byte = 0u64;
    let mut part_number = 1i32;

    while first_byte < size {
        let last_byte: u64 = std::cmp::min(first_byte.saturating_add(part_size - 1), size - 1);
        parts.push(PartRange {
            part_number,
            first_byte,
            last_byte,
        });
        first_byte = last_byte + 1;
        part_number += 1;
    }

    parts
}

/// Calculate the number of parts for an object: `ceil(size / part_size)`.
pub fn expected_part_count(size: u64, part_size: u64) -> usize {
    if size == 0 || part_size == 0 {
        return 0;
    }
    size.div_ceil(part_size) as usize
}

/// How a staged object is copied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyStrategy {
    /// One server-side copy request.
    Single,
    /// Initiate, copy byte-range parts, complete.
    Multipart,
}

/// Determine the copy strategy based on object size.
pub fn copy_strategy(size: u64, threshold: u64) -> CopyStrategy {
    if needs_multipart(size, threshold) {
        CopyStrategy::Multipart
    } else {
        CopyStrategy::Single
    }
}

/// The decision for one staged object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyPlan {
    pub source: ObjectLocation,
    pub destination: ObjectLocation,
    /// Size in bytes, from the listing.
    pub size: u64,
    pub strategy: CopyStrategy,
}

impl CopyPlan {
    /// Plan a copy, choosing the strategy from `size` and `threshold`.
    pub fn new(
        source: ObjectLocation,
        destination: ObjectLocation,
        size: u64,
        threshold: u64,
    ) -> Self {
        Self {
            source,
            destination,
            size,
            strategy: copy_strategy(size, threshold),
        }
    }
}
