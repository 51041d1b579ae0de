//! Page payload compression for the disk backed content stores.
//!
//! Every codec works on whole records: the store hands over the serialized
//! bytes of one block and writes back whatever comes out. Nothing here keeps
//! framing state between records.

use std::io;

use serde::{Deserialize, Serialize};

/// Upper bound for a single decompressed record
pub const MAX_DECOMPRESS_SIZE: usize = 1024 * 1024 * 1024; // 1GB

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, bincode::Encode, bincode::Decode)]
pub struct CompressionConfig
{
    pub compression_type: CompressionType,
    pub compression_level: i8,
}

impl Default for CompressionConfig
{
    fn default() -> Self
    {
        Self::new()
    }
}

impl CompressionConfig
{
    /// No compression. Pages hold the serialized block as is.
    pub const fn new() -> Self
    {
        Self {
            compression_type: CompressionType::NONE,
            compression_level: 0,
        }
    }

    pub const fn with_compression_type(mut self, compression_type: CompressionType) -> Self
    {
        self.compression_type = compression_type;
        self.compression_level = default_compression_level(compression_type);
        self
    }

    pub const fn with_compression_level(mut self, compression_level: i8) -> Self
    {
        self.compression_level = compression_level;
        self
    }

    pub fn is_none(&self) -> bool
    {
        self.compression_type == CompressionType::NONE
    }

    pub fn compress(&self, bytes: &[u8]) -> Result<Vec<u8>, io::Error>
    {
        match self.compression_type {
            CompressionType::NONE => Ok(bytes.to_vec()),
            CompressionType::ZSTD => zstd::stream::encode_all(bytes, self.compression_level as i32),
            CompressionType::LZ4 => Ok(lz4_flex::compress_prepend_size(bytes)),
            CompressionType::SNAPPY => snap::raw::Encoder::new()
                .compress_vec(bytes)
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e)),
        }
    }

    pub fn decompress(&self, bytes: &[u8]) -> Result<Vec<u8>, io::Error>
    {
        let out = match self.compression_type {
            CompressionType::NONE => bytes.to_vec(),
            CompressionType::ZSTD => zstd::stream::decode_all(bytes)?,
            CompressionType::LZ4 => lz4_flex::decompress_size_prepended(bytes)
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?,
            CompressionType::SNAPPY => {
                let len = snap::raw::decompress_len(bytes).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
                if len > MAX_DECOMPRESS_SIZE {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidData,
                        format!("snappy record of {len} bytes exceeds the decompression limit"),
                    ));
                }
                snap::raw::Decoder::new()
                    .decompress_vec(bytes)
                    .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?
            }
        };

        if out.len() > MAX_DECOMPRESS_SIZE {
            log::error!("Decompressed record is {} bytes, over the limit", out.len());
            return Err(io::Error::new(io::ErrorKind::InvalidData, "decompressed record too large"));
        }

        Ok(out)
    }
}

#[derive(PartialEq, Eq, Debug, Clone, Copy, Default, Serialize, Deserialize, bincode::Encode, bincode::Decode)]
pub enum CompressionType
{
    #[default]
    NONE,
    ZSTD,   // 3 is the default level
    LZ4,    // level is ignored
    SNAPPY, // level is ignored
}

pub const fn default_compression_level(ct: CompressionType) -> i8
{
    match ct {
        CompressionType::ZSTD => 3,
        _ => 0,
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    fn sample() -> Vec<u8>
    {
        let mut data = Vec::with_capacity(64 * 1024);
        for i in 0..64 * 1024_u32 {
            data.push((i % 251) as u8);
        }
        data
    }

    #[test]
    fn test_codecs_restore_input()
    {
        let data = sample();
        for ct in [
            CompressionType::NONE,
            CompressionType::ZSTD,
            CompressionType::LZ4,
            CompressionType::SNAPPY,
        ] {
            let config = CompressionConfig::new().with_compression_type(ct);
            let compressed = config.compress(&data).unwrap();
            let restored = config.decompress(&compressed).unwrap();
            assert_eq!(restored, data, "codec {:?}", ct);
        }
    }

    #[test]
    fn test_zstd_shrinks_repetitive_pages()
    {
        let data = vec![b'a'; 16384];
        let config = CompressionConfig::new().with_compression_type(CompressionType::ZSTD);
        let compressed = config.compress(&data).unwrap();
        assert!(compressed.len() < data.len() / 10);
    }

    #[test]
    fn test_corrupt_lz4_is_an_error()
    {
        let config = CompressionConfig::new().with_compression_type(CompressionType::LZ4);
        let result = config.decompress(&[8, 0, 0, 0, 0xff]);
        assert!(result.is_err());
    }

    #[test]
    fn test_parsing_compression_config()
    {
        let config: CompressionConfig =
            serde_yml::from_str("compression_type: ZSTD\ncompression_level: 5\n").unwrap();
        assert_eq!(config.compression_type, CompressionType::ZSTD);
        assert_eq!(config.compression_level, 5);
        assert!(!config.is_none());
        assert!(CompressionConfig::default().is_none());
    }
}
