// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! CONTEXT: Tunable limits for the message queue subsystem
//! INTENT: Defaults, TOML loading and validation; read once at start-up
//! DEPS: serde, toml, std::fs

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Largest segment size accepted by [`Limits::validate`].
pub const MAX_SEGMENT_SIZE: usize = 1024;
/// Smallest segment size accepted by [`Limits::validate`].
pub const MIN_SEGMENT_SIZE: usize = 8;
/// Segment indices are 16-bit signed on the wire of the classic layout.
pub const MAX_SEGMENT_COUNT: usize = 32767;
/// Identifier index field is 16 bits wide.
pub const MAX_QUEUES: usize = 1 << 16;

/// System-wide limits, fixed for the lifetime of a subsystem instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Limits {
    /// Number of queue descriptors in the table.
    pub max_queues: usize,
    /// Default and ceiling byte capacity of a single queue.
    pub max_queue_bytes: usize,
    /// Number of message headers shared by all queues.
    pub max_headers: usize,
    /// Bytes per pool segment; a power of two in `8..=1024`.
    pub segment_size: usize,
    /// Number of pool segments.
    pub segment_count: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_queues: 40,
            max_queue_bytes: 2048,
            max_headers: 40,
            segment_size: 8,
            segment_count: 2048,
        }
    }
}

/// Errors produced while loading or validating [`Limits`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Segment size is not a power of two within bounds.
    #[error("segment_size {0} is not a power of two in 8..=1024")]
    SegmentSize(usize),
    /// Segment count is zero or exceeds 32767.
    #[error("segment_count {0} outside 1..=32767")]
    SegmentCount(usize),
    /// Queue count is zero or does not fit the identifier index.
    #[error("max_queues {0} outside 1..=65536")]
    QueueCount(usize),
    /// A limit that must be positive was zero.
    #[error("{0} must be non-zero")]
    Zero(&'static str),
    /// Configuration file could not be read.
    #[error("failed to read limits file {path}: {source}")]
    Read {
        /// File that failed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// Configuration file is not valid TOML for [`Limits`].
    #[error("failed to parse limits: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    #[serde(default)]
    limits: Limits,
}

impl Limits {
    /// Largest message accepted by the segment pool.
    pub const fn max_message_bytes(&self) -> usize {
        self.segment_size * self.segment_count
    }

    /// Number of segments needed to hold `len` bytes.
    pub const fn segments_for(&self, len: usize) -> usize {
        len.div_ceil(self.segment_size)
    }

    /// Checks every limit against the bounds the pools rely on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.segment_size.is_power_of_two()
            || !(MIN_SEGMENT_SIZE..=MAX_SEGMENT_SIZE).contains(&self.segment_size)
        {
            return Err(ConfigError::SegmentSize(self.segment_size));
        }
        if !(1..=MAX_SEGMENT_COUNT).contains(&self.segment_count) {
            return Err(ConfigError::SegmentCount(self.segment_count));
        }
        if !(1..=MAX_QUEUES).contains(&self.max_queues) {
            return Err(ConfigError::QueueCount(self.max_queues));
        }
        if self.max_queue_bytes == 0 {
            return Err(ConfigError::Zero("max_queue_bytes"));
        }
        if self.max_headers == 0 {
            return Err(ConfigError::Zero("max_headers"));
        }
        Ok(())
    }

    /// Parses a TOML document with an optional `[limits]` table.
    pub fn from_toml_str(data: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig = toml::from_str(data)?;
        raw.limits.validate()?;
        Ok(raw.limits)
    }

    /// Reads and validates limits from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let data = fs::read_to_string(path)
            .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
        Self::from_toml_str(&data)
    }
}
