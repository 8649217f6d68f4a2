//! Snapshot container framing.
//!
//! A snapshot is a fixed header followed by the machine's field walk. The
//! header carries the memory layout so a snapshot from a differently sized
//! machine is refused before any state is touched.

use emu_core::{SnapshotError, SnapshotReader, SnapshotWriter, StateVisitor};

use crate::bus::AmigaBus;

pub const MAGIC: [u8; 4] = *b"AMSN";
pub const VERSION: u8 = 1;
/// Magic, version, then four little-endian u32 sizes.
pub const HEADER_LEN: usize = 4 + 1 + 4 * 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Header {
    chip_ram: u32,
    slow_ram: u32,
    fast_ram: u32,
    rom: u32,
}

impl Header {
    pub(crate) fn of(bus: &AmigaBus) -> Self {
        Self {
            chip_ram: bus.memory.chip_ram.len() as u32,
            slow_ram: bus.memory.slow_ram.len() as u32,
            fast_ram: bus.zorro.fast_ram_size() as u32,
            rom: bus.memory.kickstart.len() as u32,
        }
    }

    pub(crate) fn write(mut self, writer: &mut SnapshotWriter) {
        let (mut magic, mut version) = (MAGIC, VERSION);
        writer.visit_bytes(&mut magic);
        writer.visit_u8(&mut version);
        self.visit_sizes(writer);
    }

    pub(crate) fn read(data: &[u8]) -> Result<Self, SnapshotError> {
        if data.len() < HEADER_LEN {
            return Err(SnapshotError::Truncated { needed: HEADER_LEN, available: data.len() });
        }
        if data[..4] != MAGIC {
            return Err(SnapshotError::BadMagic);
        }
        if data[4] != VERSION {
            return Err(SnapshotError::UnsupportedVersion(data[4]));
        }
        let mut header = Self { chip_ram: 0, slow_ram: 0, fast_ram: 0, rom: 0 };
        let mut reader = SnapshotReader::new(&data[5..HEADER_LEN]);
        header.visit_sizes(&mut reader);
        reader.status()?;
        Ok(header)
    }

    /// Refuse a snapshot taken on a machine with a different layout.
    pub(crate) fn check(&self, machine: &Header) -> Result<(), SnapshotError> {
        let fields = [
            (self.chip_ram, machine.chip_ram, "chip RAM"),
            (self.slow_ram, machine.slow_ram, "slow RAM"),
            (self.fast_ram, machine.fast_ram, "fast RAM"),
            (self.rom, machine.rom, "Kickstart size"),
        ];
        match fields.into_iter().find(|(theirs, ours, _)| theirs != ours) {
            Some((_, _, what)) => Err(SnapshotError::LayoutMismatch(what)),
            None => Ok(()),
        }
    }

    fn visit_sizes(&mut self, visitor: &mut dyn StateVisitor) {
        visitor.visit_u32(&mut self.chip_ram);
        visitor.visit_u32(&mut self.slow_ram);
        visitor.visit_u32(&mut self.fast_ram);
        visitor.visit_u32(&mut self.rom);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header() -> Header {
        Header { chip_ram: 512 * 1024, slow_ram: 0, fast_ram: 0, rom: 256 * 1024 }
    }

    #[test]
    fn header_round_trips() {
        let mut writer = SnapshotWriter::new();
        header().write(&mut writer);
        let bytes = writer.into_bytes();
        assert_eq!(bytes.len(), HEADER_LEN);
        assert_eq!(Header::read(&bytes), Ok(header()));
    }

    #[test]
    fn bad_magic_and_version_are_refused() {
        let mut writer = SnapshotWriter::new();
        header().write(&mut writer);
        let mut bytes = writer.into_bytes();

        bytes[4] = 9;
        assert_eq!(Header::read(&bytes), Err(SnapshotError::UnsupportedVersion(9)));
        bytes[0] = b'X';
        assert_eq!(Header::read(&bytes), Err(SnapshotError::BadMagic));
        assert!(matches!(Header::read(&bytes[..3]), Err(SnapshotError::Truncated { .. })));
    }

    #[test]
    fn layout_mismatch_names_the_region() {
        let other = Header { fast_ram: 1024 * 1024, ..header() };
        assert_eq!(header().check(&other), Err(SnapshotError::LayoutMismatch("fast RAM")));
        assert_eq!(header().check(&header()), Ok(()));
    }
}
