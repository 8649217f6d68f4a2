//! Word access to chip RAM for the DMA channels.

/// Chip RAM as seen by Agnus DMA. Addresses are byte addresses; callers
/// keep them even. Implementors wrap at the installed size.
pub trait ChipMemory {
    fn read_chip_word(&self, addr: u32) -> u16;
    fn write_chip_word(&mut self, addr: u32, value: u16);
}

/// A flat big-endian byte array, mirrored at its length.
impl ChipMemory for [u8] {
    fn read_chip_word(&self, addr: u32) -> u16 {
        if self.len() < 2 {
            return 0;
        }
        let i = (addr as usize & !1) % self.len();
        u16::from_be_bytes([self[i], self[(i + 1) % self.len()]])
    }

    fn write_chip_word(&mut self, addr: u32, value: u16) {
        if self.len() < 2 {
            return;
        }
        let len = self.len();
        let i = (addr as usize & !1) % len;
        let [hi, lo] = value.to_be_bytes();
        self[i] = hi;
        self[(i + 1) % len] = lo;
    }
}

impl ChipMemory for Vec<u8> {
    fn read_chip_word(&self, addr: u32) -> u16 {
        self.as_slice().read_chip_word(addr)
    }

    fn write_chip_word(&mut self, addr: u32, value: u16) {
        self.as_mut_slice().write_chip_word(addr, value);
    }
}
