use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use md5::{Digest, Md5};

use crate::ReadError;

// ---------------------------------------------------------------------------
// Block arithmetic and digests
// ---------------------------------------------------------------------------

/// Number of blocks needed to upload `file_size` bytes.
///
/// Returns `ceil(file_size / block_size)`, except that an empty file still
/// takes one (zero-length) block.
///
/// # Panics
///
/// Panics if `block_size` is zero.
pub fn block_count(file_size: u64, block_size: usize) -> u64 {
    assert!(block_size > 0, "block size must be positive");
    file_size.div_ceil(block_size as u64).max(1)
}

/// Computes MD5 of `data` and returns the lowercase hex digest.
pub fn md5_hex(data: &[u8]) -> String {
    hex::encode(Md5::digest(data))
}

/// A contiguous byte range of a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    /// 1-based block number (the storage tier's part number).
    pub index: u64,
    /// Byte offset of the first byte within the file.
    pub offset: u64,
    pub data: Bytes,
}

impl Block {
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

// ---------------------------------------------------------------------------
// BlockReader
// ---------------------------------------------------------------------------

/// Reads a file sequentially in fixed-size blocks.
///
/// The number of blocks produced is fixed when the reader is opened and
/// always equals [`block_count`] of the size seen at that moment.
pub struct BlockReader {
    file: File,
    path: PathBuf,
    block_size: usize,
    file_size: u64,
    offset: u64,
    next_index: u64,
}

impl BlockReader {
    /// Opens `path` for block reading.
    pub fn open(path: &Path, block_size: usize) -> Result<Self, ReadError> {
        if block_size == 0 {
            return Err(ReadError::InvalidBlockSize(block_size));
        }
        let file = File::open(path)?;
        let file_size = file.metadata()?.len();
        Ok(Self {
            file,
            path: path.to_path_buf(),
            block_size,
            file_size,
            offset: 0,
            next_index: 1,
        })
    }

    /// Reads the next block. Returns `None` once every block was produced.
    pub fn next_block(&mut self) -> Result<Option<Block>, ReadError> {
        if self.next_index > self.total_blocks() {
            return Ok(None);
        }

        let remaining = self.file_size - self.offset;
        let want = remaining.min(self.block_size as u64) as usize;
        let mut buf = vec![0u8; want];
        let mut filled = 0;
        while filled < want {
            let n = self.file.read(&mut buf[filled..])?;
            if n == 0 {
                return Err(ReadError::Truncated {
                    expected: self.file_size,
                    actual: self.offset + filled as u64,
                });
            }
            filled += n;
        }

        let block = Block {
            index: self.next_index,
            offset: self.offset,
            data: Bytes::from(buf),
        };
        self.offset += want as u64;
        self.next_index += 1;
        Ok(Some(block))
    }

    /// Total number of blocks this reader produces.
    pub fn total_blocks(&self) -> u64 {
        block_count(self.file_size, self.block_size)
    }

    /// File size in bytes, as seen when opened.
    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn create_test_file(dir: &Path, name: &str, data: &[u8]) -> PathBuf {
        let path = dir.join(name);
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(data).unwrap();
        path
    }

    #[test]
    fn block_count_rounds_up() {
        assert_eq!(block_count(10, 4), 3);
        assert_eq!(block_count(8, 4), 2);
        assert_eq!(block_count(1, 4), 1);
        assert_eq!(block_count(4 * 1024 * 1024 + 1, 4 * 1024 * 1024), 2);
    }

    #[test]
    fn block_count_empty_file_is_one_block() {
        assert_eq!(block_count(0, 4), 1);
        assert_eq!(block_count(0, 1), 1);
    }

    #[test]
    fn block_count_matches_ceiling_for_many_sizes() {
        for block_size in [1usize, 3, 7, 64] {
            for size in 1u64..200 {
                let expected = (size + block_size as u64 - 1) / block_size as u64;
                assert_eq!(block_count(size, block_size), expected, "{size}/{block_size}");
            }
        }
    }

    #[test]
    #[should_panic]
    fn block_count_zero_block_size_panics() {
        block_count(10, 0);
    }

    #[test]
    fn md5_hex_known_digest() {
        assert_eq!(md5_hex(b""), "d41d8cd98f00b204e9800998ecf8427e");
        assert_eq!(md5_hex(b"hello world"), "5eb63bbbe01eeed093cb22bb8f5acdc3");
    }

    #[test]
    fn reader_reads_all_blocks() {
        let dir = TempDir::new().unwrap();
        let path = create_test_file(dir.path(), "test.bin", b"AABBCCDDEE");

        let mut reader = BlockReader::open(&path, 4).unwrap();
        assert_eq!(reader.file_size(), 10);
        assert_eq!(reader.total_blocks(), 3);

        let b1 = reader.next_block().unwrap().unwrap();
        assert_eq!(b1.index, 1);
        assert_eq!(b1.offset, 0);
        assert_eq!(&b1.data[..], b"AABB");

        let b2 = reader.next_block().unwrap().unwrap();
        assert_eq!(b2.index, 2);
        assert_eq!(b2.offset, 4);
        assert_eq!(&b2.data[..], b"CCDD");

        let b3 = reader.next_block().unwrap().unwrap();
        assert_eq!(b3.index, 3);
        assert_eq!(b3.offset, 8);
        assert_eq!(&b3.data[..], b"EE");

        assert!(reader.next_block().unwrap().is_none());
    }

    #[test]
    fn reader_exact_multiple_has_no_trailing_block() {
        let dir = TempDir::new().unwrap();
        let path = create_test_file(dir.path(), "test.bin", b"12345678");

        let mut reader = BlockReader::open(&path, 4).unwrap();
        assert!(reader.next_block().unwrap().is_some());
        assert!(reader.next_block().unwrap().is_some());
        assert!(reader.next_block().unwrap().is_none());
    }

    #[test]
    fn reader_empty_file_yields_one_empty_block() {
        let dir = TempDir::new().unwrap();
        let path = create_test_file(dir.path(), "empty.bin", b"");

        let mut reader = BlockReader::open(&path, 4).unwrap();
        assert_eq!(reader.total_blocks(), 1);

        let block = reader.next_block().unwrap().unwrap();
        assert_eq!(block.index, 1);
        assert!(block.is_empty());
        assert!(reader.next_block().unwrap().is_none());
    }

    #[test]
    fn reader_rejects_zero_block_size() {
        let dir = TempDir::new().unwrap();
        let path = create_test_file(dir.path(), "test.bin", b"x");
        assert!(matches!(
            BlockReader::open(&path, 0),
            Err(ReadError::InvalidBlockSize(0))
        ));
    }

    #[test]
    fn reader_missing_file_is_io_error() {
        let dir = TempDir::new().unwrap();
        let result = BlockReader::open(&dir.path().join("missing"), 4);
        assert!(matches!(result, Err(ReadError::Io(_))));
    }

    #[test]
    fn reader_detects_truncation() {
        let dir = TempDir::new().unwrap();
        let path = create_test_file(dir.path(), "test.bin", b"0123456789");

        let mut reader = BlockReader::open(&path, 4).unwrap();
        reader.next_block().unwrap().unwrap();
        std::fs::OpenOptions::new()
            .write(true)
            .open(&path)
            .unwrap()
            .set_len(5)
            .unwrap();

        assert!(matches!(
            reader.next_block(),
            Err(ReadError::Truncated {
                expected: 10,
                actual: 5
            })
        ));
    }

    #[test]
    fn blocks_reassemble_to_original() {
        let dir = TempDir::new().unwrap();
        let original = b"The quick brown fox jumps over the lazy dog";
        let path = create_test_file(dir.path(), "test.txt", original);

        let mut reader = BlockReader::open(&path, 10).unwrap();
        let mut out = Vec::new();
        let mut expected_index = 1;
        while let Some(block) = reader.next_block().unwrap() {
            assert_eq!(block.index, expected_index);
            assert_eq!(block.offset, out.len() as u64);
            out.extend_from_slice(&block.data);
            expected_index += 1;
        }
        assert_eq!(&out, original);
        assert_eq!(expected_index - 1, reader.total_blocks());
    }
}
