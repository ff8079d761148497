//! Reading and writing object files on disk.
//!
//! The object format is a flat sequence of big-endian words:
//! ```text
//! [origin] [word 0] [word 1] ... [word N-1]
//! ```
//! Word 0 is loaded at `origin`, word 1 at `origin + 1`, and so on.
//! There is no header, length, or checksum, so the payload simply runs
//! to the end of the stream.

use std::io::{ErrorKind, Read, Write};

use crate::sim::mem::MEM_SIZE;
use crate::sim::SimErr;

use super::ObjectFile;

impl ObjectFile {
    /// Reads an object file from a byte stream.
    ///
    /// This raises the loader errors:
    /// - [`SimErr::FileTooShort`] if the stream ends before the origin or holds no payload,
    /// - [`SimErr::FileTooLong`] if the payload runs past the end of memory or ends in half a word,
    /// - [`SimErr::FileRead`] if the stream fails.
    ///
    /// ```
    /// use lc3_sim::asm::ObjectFile;
    ///
    /// let bytes: &[u8] = &[0x30, 0x00, 0x12, 0x34, 0x56, 0x78];
    /// let obj = ObjectFile::read_from(bytes).unwrap();
    /// assert_eq!(obj.origin(), 0x3000);
    /// assert_eq!(obj.words(), [0x1234, 0x5678]);
    /// ```
    pub fn read_from(mut reader: impl Read) -> Result<Self, SimErr> {
        let mut origin = [0; 2];
        reader.read_exact(&mut origin)
            .map_err(|e| match e.kind() {
                ErrorKind::UnexpectedEof => SimErr::FileTooShort,
                _ => SimErr::FileRead(e),
            })?;
        let origin = u16::from_be_bytes(origin);

        // read one byte past the limit to detect payloads that are too long
        let max_bytes = (MEM_SIZE - usize::from(origin)) * 2;
        let mut payload = Vec::with_capacity(max_bytes.min(0x1000));
        reader.take(max_bytes as u64 + 1)
            .read_to_end(&mut payload)
            .map_err(SimErr::FileRead)?;

        if payload.len() > max_bytes || payload.len() % 2 != 0 {
            return Err(SimErr::FileTooLong);
        }
        let words = payload.chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();

        ObjectFile::new(origin, words)
    }

    /// Serializes the object file into bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        std::iter::once(self.origin)
            .chain(self.words.iter().copied())
            .flat_map(u16::to_be_bytes)
            .collect()
    }

    /// Writes the object file to a byte stream.
    pub fn write_to(&self, mut writer: impl Write) -> std::io::Result<()> {
        writer.write_all(&self.to_bytes())?;
        writer.flush()
    }
}

#[cfg(test)]
mod tests {
    use std::io::{Read, Seek, SeekFrom};

    use crate::asm::ObjectFile;
    use crate::sim::SimErr;

    fn read(bytes: &[u8]) -> Result<ObjectFile, SimErr> {
        ObjectFile::read_from(bytes)
    }

    #[test]
    fn test_to_bytes() {
        let obj = ObjectFile::new(0x3000, vec![0x5020, 0xF025]).unwrap();
        assert_eq!(obj.to_bytes(), [0x30, 0x00, 0x50, 0x20, 0xF0, 0x25]);
    }

    #[test]
    fn test_too_short() {
        assert!(matches!(read(&[]), Err(SimErr::FileTooShort)));
        assert!(matches!(read(&[0x30]), Err(SimErr::FileTooShort)));
        // origin without payload
        assert!(matches!(read(&[0x30, 0x00]), Err(SimErr::FileTooShort)));
    }

    #[test]
    fn test_too_long() {
        // dangling byte
        assert!(matches!(read(&[0x30, 0x00, 0x12, 0x34, 0x56]), Err(SimErr::FileTooLong)));
        // one word past the end of memory
        assert!(matches!(read(&[0xFF, 0xFF, 0x00, 0x01, 0x00, 0x02]), Err(SimErr::FileTooLong)));

        // exactly up to the end of memory
        let obj = read(&[0xFF, 0xFE, 0x00, 0x01, 0x00, 0x02]).unwrap();
        assert_eq!(obj.end(), 0x10000);
    }

    #[test]
    fn test_read_error() {
        struct Broken;
        impl Read for Broken {
            fn read(&mut self, _: &mut [u8]) -> std::io::Result<usize> {
                Err(std::io::Error::other("disk on fire"))
            }
        }

        assert!(matches!(ObjectFile::read_from(Broken), Err(SimErr::FileRead(_))));
    }

    #[test]
    fn test_file_roundtrip() {
        let obj = ObjectFile::new(0x4000, vec![0x1234, 0x0000, 0xFFFF]).unwrap();

        let mut file = tempfile::tempfile().unwrap();
        obj.write_to(&mut file).unwrap();
        file.seek(SeekFrom::Start(0)).unwrap();

        assert_eq!(ObjectFile::read_from(&mut file).unwrap(), obj);
    }
}
