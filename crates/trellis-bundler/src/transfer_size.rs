//! Estimated transfer size calculation.
//!
//! Approximates over-the-wire size by gzip-compressing artifact contents
//! at the default level, matching what most static hosts apply. Only
//! meaningful for optimized builds; development output is served
//! uncompressed.

use std::io::Write;

use flate2::write::GzEncoder;
use flate2::Compression;

use crate::output::OutputFile;

/// Gzip-compressed byte size of one artifact.
pub fn estimate_transfer_size(file: &OutputFile) -> std::io::Result<u64> {
    // Tiny files do not compress; skip the encoder round trip.
    if file.contents.len() < 64 {
        return Ok(file.contents.len() as u64);
    }
    let mut encoder = GzEncoder::new(Vec::new(), Compression::new(6));
    encoder.write_all(&file.contents)?;
    Ok(encoder.finish()?.len() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::OutputFileType;

    #[test]
    fn repetitive_content_compresses_well() {
        let file = OutputFile::text(
            "main.js",
            "const x = 1;\n".repeat(500),
            OutputFileType::Browser,
        );
        let estimate = estimate_transfer_size(&file).unwrap();
        assert!(estimate < file.size() / 10);
    }

    #[test]
    fn tiny_files_report_raw_size() {
        let file = OutputFile::text("a.js", "hi", OutputFileType::Browser);
        assert_eq!(estimate_transfer_size(&file).unwrap(), 2);
    }
}
