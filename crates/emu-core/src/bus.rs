//! Memory and I/O bus interface.

/// Byte-addressed bus with a 24-bit address space.
///
/// The CPU reaches memory and chip registers through this trait. Address
/// decoding and routing live in the implementor. Addresses above 24 bits are
/// folded by the implementor, not the caller.
pub trait Bus {
    /// Read a byte. May have side effects (e.g. acknowledging a CIA ICR).
    fn read(&mut self, address: u32) -> u8;

    /// Write a byte.
    fn write(&mut self, address: u32, value: u8);

    /// Read a big-endian word from an even address.
    fn read_word(&mut self, address: u32) -> u16 {
        let hi = self.read(address);
        let lo = self.read(address.wrapping_add(1));
        u16::from_be_bytes([hi, lo])
    }

    /// Write a big-endian word to an even address.
    fn write_word(&mut self, address: u32, value: u16) {
        let [hi, lo] = value.to_be_bytes();
        self.write(address, hi);
        self.write(address.wrapping_add(1), lo);
    }
}
