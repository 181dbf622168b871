//! Storage collaborator: where the bitmap and font data come from.
//!
//! The original board reads from a FAT filesystem on an SD card; this crate
//! only needs the trivial contract the drawing code relies on (open a file,
//! read N bytes at an offset), so the demo binary embeds its assets in flash
//! behind the same trait.

pub trait Storage {
    type Handle;
    type Error: core::fmt::Debug;

    fn mount(&mut self) -> Result<(), Self::Error>;
    fn unmount(&mut self) -> Result<(), Self::Error>;
    fn open(&mut self, path: &str) -> Result<Self::Handle, Self::Error>;
    fn seek(&mut self, handle: &mut Self::Handle, offset: u64) -> Result<(), Self::Error>;
    /// Read up to `buf.len()` bytes at the handle's position; returns how
    /// many were read (0 at end of file).
    fn read(&mut self, handle: &mut Self::Handle, buf: &mut [u8]) -> Result<usize, Self::Error>;
}

#[derive(Debug, PartialEq, Eq)]
pub enum SliceStorageError {
    NotMounted,
    NotFound,
}

/// Read-only storage over byte slices baked into the binary.
pub struct SliceStorage<'a> {
    files: &'a [(&'a str, &'a [u8])],
    mounted: bool,
}

#[derive(Debug)]
pub struct SliceFile<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> SliceStorage<'a> {
    pub const fn new(files: &'a [(&'a str, &'a [u8])]) -> Self {
        Self {
            files,
            mounted: false,
        }
    }
}

impl<'a> Storage for SliceStorage<'a> {
    type Handle = SliceFile<'a>;
    type Error = SliceStorageError;

    fn mount(&mut self) -> Result<(), Self::Error> {
        self.mounted = true;
        Ok(())
    }

    fn unmount(&mut self) -> Result<(), Self::Error> {
        self.mounted = false;
        Ok(())
    }

    fn open(&mut self, path: &str) -> Result<SliceFile<'a>, Self::Error> {
        if !self.mounted {
            return Err(SliceStorageError::NotMounted);
        }
        self.files
            .iter()
            .find(|(name, _)| *name == path)
            .map(|&(_, data)| SliceFile { data, pos: 0 })
            .ok_or(SliceStorageError::NotFound)
    }

    fn seek(&mut self, handle: &mut SliceFile<'a>, offset: u64) -> Result<(), Self::Error> {
        // Seeking past the end is not an error; the next read just comes up
        // short, same as fseek/fread.
        handle.pos = (offset as usize).min(handle.data.len());
        Ok(())
    }

    fn read(&mut self, handle: &mut SliceFile<'a>, buf: &mut [u8]) -> Result<usize, Self::Error> {
        let n = buf.len().min(handle.data.len() - handle.pos);
        buf[..n].copy_from_slice(&handle.data[handle.pos..handle.pos + n]);
        handle.pos += n;
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static FILES: &[(&str, &[u8])] = &[
        ("android1.bin", &[1, 2, 3, 4, 5, 6, 7, 8]),
        ("unicode", &[0xAA; 4]),
    ];

    fn mounted() -> SliceStorage<'static> {
        let mut s = SliceStorage::new(FILES);
        s.mount().unwrap();
        s
    }

    #[test]
    fn open_requires_mount() {
        let mut s = SliceStorage::new(FILES);
        assert_eq!(
            s.open("android1.bin").unwrap_err(),
            SliceStorageError::NotMounted
        );
        s.mount().unwrap();
        s.open("android1.bin").unwrap();
        s.unmount().unwrap();
        assert_eq!(
            s.open("android1.bin").unwrap_err(),
            SliceStorageError::NotMounted
        );
    }

    #[test]
    fn missing_files_are_reported() {
        let mut s = mounted();
        assert_eq!(s.open("nope.bin").unwrap_err(), SliceStorageError::NotFound);
    }

    #[test]
    fn reads_advance_the_position() {
        let mut s = mounted();
        let mut f = s.open("android1.bin").unwrap();
        let mut buf = [0u8; 3];
        assert_eq!(s.read(&mut f, &mut buf).unwrap(), 3);
        assert_eq!(buf, [1, 2, 3]);
        assert_eq!(s.read(&mut f, &mut buf).unwrap(), 3);
        assert_eq!(buf, [4, 5, 6]);
    }

    #[test]
    fn seek_then_read_at_offset() {
        let mut s = mounted();
        let mut f = s.open("android1.bin").unwrap();
        s.seek(&mut f, 6).unwrap();
        let mut buf = [0u8; 4];
        assert_eq!(s.read(&mut f, &mut buf).unwrap(), 2);
        assert_eq!(buf[..2], [7, 8]);
        // At EOF now.
        assert_eq!(s.read(&mut f, &mut buf).unwrap(), 0);
    }

    #[test]
    fn seek_past_end_reads_nothing() {
        let mut s = mounted();
        let mut f = s.open("unicode").unwrap();
        s.seek(&mut f, 100).unwrap();
        let mut buf = [0u8; 4];
        assert_eq!(s.read(&mut f, &mut buf).unwrap(), 0);
    }

    #[test]
    fn handles_are_independent() {
        let mut s = mounted();
        let mut a = s.open("android1.bin").unwrap();
        let mut b = s.open("android1.bin").unwrap();
        let mut buf = [0u8; 4];
        s.read(&mut a, &mut buf).unwrap();
        assert_eq!(s.read(&mut b, &mut buf).unwrap(), 4);
        assert_eq!(buf, [1, 2, 3, 4]);
    }
}
