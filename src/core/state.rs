// pico-retro/src/core/state.rs

//! Save-state byte stream.
//!
//! Presents the host's fixed serialization buffer to the engine's state
//! writer as a seekable stream. Overruns truncate and log instead of faulting.
//! State size depends on which add-ons are active, so `retro_serialize_size`
//! runs a full probe pass that only moves the cursor.

use std::io::{self, Read, Seek, SeekFrom, Write};

use log::error;

enum Backing<'a> {
    /// Size probe: no buffer, writes only advance the cursor.
    Probe,
    Load(&'a [u8]),
    Save(&'a mut [u8]),
}

/// Stream over a save-state buffer, one per (de)serialize call.
pub struct SaveStateStream<'a> {
    backing: Backing<'a>,
    pos: usize,
}

impl<'a> SaveStateStream<'a> {
    pub fn probe() -> Self {
        Self { backing: Backing::Probe, pos: 0 }
    }

    pub fn load(data: &'a [u8]) -> Self {
        Self { backing: Backing::Load(data), pos: 0 }
    }

    pub fn save(data: &'a mut [u8]) -> Self {
        Self { backing: Backing::Save(data), pos: 0 }
    }

    pub fn size(&self) -> usize {
        match &self.backing {
            Backing::Probe => 0,
            Backing::Load(buf) => buf.len(),
            Backing::Save(buf) => buf.len(),
        }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn is_probe(&self) -> bool {
        matches!(self.backing, Backing::Probe)
    }

    pub fn is_eof(&self) -> bool {
        self.pos >= self.size()
    }

    /// Advance the cursor without touching the buffer.
    pub fn skip(&mut self, len: usize) -> usize {
        self.pos = self.pos.saturating_add(len);
        len
    }

    /// Clamp a transfer of `len` bytes to the buffer end, logging the overrun.
    fn clamp(&self, len: usize) -> usize {
        let size = self.size();
        let end = self.pos.saturating_add(len);
        if end > size {
            error!("savestate error: {}/{}", end, size);
            size.saturating_sub(self.pos)
        } else {
            len
        }
    }
}

impl Read for SaveStateStream<'_> {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        if !matches!(self.backing, Backing::Load(_)) {
            return Err(io::Error::new(
                io::ErrorKind::Unsupported,
                "savestate stream is not open for loading",
            ));
        }
        let len = self.clamp(out.len());
        if len == 0 {
            return Ok(0);
        }
        if let Backing::Load(buf) = &self.backing {
            out[..len].copy_from_slice(&buf[self.pos..self.pos + len]);
        }
        self.pos += len;
        Ok(len)
    }
}

impl Write for SaveStateStream<'_> {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        if self.is_probe() {
            return Ok(self.skip(data.len()));
        }
        if !matches!(self.backing, Backing::Save(_)) {
            return Err(io::Error::new(
                io::ErrorKind::Unsupported,
                "savestate stream is not open for saving",
            ));
        }
        let len = self.clamp(data.len());
        if len == 0 {
            return Ok(0);
        }
        let pos = self.pos;
        if let Backing::Save(buf) = &mut self.backing {
            buf[pos..pos + len].copy_from_slice(&data[..len]);
        }
        self.pos += len;
        Ok(len)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Seek for SaveStateStream<'_> {
    fn seek(&mut self, target: SeekFrom) -> io::Result<u64> {
        let invalid = |msg: &'static str| io::Error::new(io::ErrorKind::InvalidInput, msg);
        let (base, offset) = match target {
            SeekFrom::Start(off) => {
                let off = i64::try_from(off).map_err(|_| invalid("seek offset overflow"))?;
                (0u64, off)
            }
            SeekFrom::Current(off) => (self.pos as u64, off),
            SeekFrom::End(off) => (self.size() as u64, off),
        };
        let pos = base.checked_add_signed(offset).ok_or_else(|| invalid("seek before start"))?;
        self.pos = usize::try_from(pos).map_err(|_| invalid("seek offset overflow"))?;
        Ok(pos)
    }
}
