//! Chunked transfer plumbing shared by Depot transports.
//!
//! - [`chunked`]: async chunk reader for upload sources and a `.part`
//!   writer for download destinations, plus SHA-256 helpers.
//! - [`checksum`]: applies a [`ChecksumPolicy`](depot_protocol::ChecksumPolicy)
//!   to a computed digest.
//! - [`monitor`]: drives the per-transfer event sequence.
//! - [`validation`]: keeps repository paths inside the repository root.

mod checksum;
mod chunked;
mod monitor;
mod validation;

pub use checksum::{CHECKSUM_EXTENSION, parse_checksum_file, verify_checksum};
pub use chunked::{ChunkReader, PartFileWriter, Sha256Digest, checksum_bytes};
pub use monitor::TransferMonitor;
pub use validation::validate_resource_path;

/// Default chunk size: 64 KiB.
///
/// Each chunk becomes one PROGRESSED event, so this also sets the
/// granularity of progress reporting.
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;
