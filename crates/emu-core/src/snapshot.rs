//! Field visitors for snapshot sizing, saving and loading.
//!
//! Snapshots are an ordered concatenation of every component's fields in
//! little-endian order. Only same-build round trips are supported; the
//! layout is not a wire protocol.

use crate::SnapshotError;

/// Receives each persistent field of a component, in order.
///
/// The same `visit_state` walk drives all three visitors, so a writer and a
/// reader always agree on field order.
pub trait StateVisitor {
    fn visit_u8(&mut self, value: &mut u8);
    fn visit_u16(&mut self, value: &mut u16);
    fn visit_u32(&mut self, value: &mut u32);
    fn visit_u64(&mut self, value: &mut u64);
    fn visit_bytes(&mut self, bytes: &mut [u8]);

    /// Report a decoded value the component cannot represent. Only the
    /// reader acts on this.
    fn reject(&mut self, _field: &'static str) {}

    fn visit_bool(&mut self, value: &mut bool) {
        let mut raw = u8::from(*value);
        self.visit_u8(&mut raw);
        *value = raw != 0;
    }

    fn visit_i16(&mut self, value: &mut i16) {
        let mut raw = *value as u16;
        self.visit_u16(&mut raw);
        *value = raw as i16;
    }

    fn visit_i64(&mut self, value: &mut i64) {
        let mut raw = *value as u64;
        self.visit_u64(&mut raw);
        *value = raw as i64;
    }

    fn visit_u16_slice(&mut self, values: &mut [u16]) {
        for value in values {
            self.visit_u16(value);
        }
    }

    fn visit_u32_slice(&mut self, values: &mut [u32]) {
        for value in values {
            self.visit_u32(value);
        }
    }
}

/// Counts the bytes a walk would produce.
#[derive(Debug, Default, Clone, Copy)]
pub struct SizeCounter {
    bytes: usize,
}

impl SizeCounter {
    #[must_use]
    pub fn bytes(&self) -> usize {
        self.bytes
    }
}

impl StateVisitor for SizeCounter {
    fn visit_u8(&mut self, _value: &mut u8) {
        self.bytes += 1;
    }

    fn visit_u16(&mut self, _value: &mut u16) {
        self.bytes += 2;
    }

    fn visit_u32(&mut self, _value: &mut u32) {
        self.bytes += 4;
    }

    fn visit_u64(&mut self, _value: &mut u64) {
        self.bytes += 8;
    }

    fn visit_bytes(&mut self, bytes: &mut [u8]) {
        self.bytes += bytes.len();
    }
}

/// Appends fields to a growing byte buffer.
#[derive(Debug, Default, Clone)]
pub struct SnapshotWriter {
    data: Vec<u8>,
}

impl SnapshotWriter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self { data: Vec::with_capacity(capacity) }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }
}

impl StateVisitor for SnapshotWriter {
    fn visit_u8(&mut self, value: &mut u8) {
        self.data.push(*value);
    }

    fn visit_u16(&mut self, value: &mut u16) {
        self.data.extend_from_slice(&value.to_le_bytes());
    }

    fn visit_u32(&mut self, value: &mut u32) {
        self.data.extend_from_slice(&value.to_le_bytes());
    }

    fn visit_u64(&mut self, value: &mut u64) {
        self.data.extend_from_slice(&value.to_le_bytes());
    }

    fn visit_bytes(&mut self, bytes: &mut [u8]) {
        self.data.extend_from_slice(bytes);
    }
}

/// Reads fields back from a byte slice.
///
/// The first failure sticks: later fields are left untouched and
/// [`SnapshotReader::status`] reports the original error.
#[derive(Debug, Clone)]
pub struct SnapshotReader<'a> {
    data: &'a [u8],
    pos: usize,
    error: Option<SnapshotError>,
}

impl<'a> SnapshotReader<'a> {
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0, error: None }
    }

    /// Bytes consumed so far.
    #[must_use]
    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn status(&self) -> Result<(), SnapshotError> {
        match &self.error {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    fn take<const N: usize>(&mut self) -> Option<[u8; N]> {
        if self.error.is_some() {
            return None;
        }
        let end = self.pos + N;
        if end > self.data.len() {
            self.error = Some(SnapshotError::Truncated {
                needed: end,
                available: self.data.len(),
            });
            return None;
        }
        let mut out = [0u8; N];
        out.copy_from_slice(&self.data[self.pos..end]);
        self.pos = end;
        Some(out)
    }
}

impl StateVisitor for SnapshotReader<'_> {
    fn visit_u8(&mut self, value: &mut u8) {
        if let Some([b]) = self.take::<1>() {
            *value = b;
        }
    }

    fn visit_u16(&mut self, value: &mut u16) {
        if let Some(raw) = self.take::<2>() {
            *value = u16::from_le_bytes(raw);
        }
    }

    fn visit_u32(&mut self, value: &mut u32) {
        if let Some(raw) = self.take::<4>() {
            *value = u32::from_le_bytes(raw);
        }
    }

    fn visit_u64(&mut self, value: &mut u64) {
        if let Some(raw) = self.take::<8>() {
            *value = u64::from_le_bytes(raw);
        }
    }

    fn visit_bytes(&mut self, bytes: &mut [u8]) {
        if self.error.is_some() {
            return;
        }
        let end = self.pos + bytes.len();
        if end > self.data.len() {
            self.error = Some(SnapshotError::Truncated {
                needed: end,
                available: self.data.len(),
            });
            return;
        }
        bytes.copy_from_slice(&self.data[self.pos..end]);
        self.pos = end;
    }

    fn reject(&mut self, field: &'static str) {
        if self.error.is_none() {
            log::debug!("snapshot field {field} out of range at offset {}", self.pos);
            self.error = Some(SnapshotError::Malformed(field));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writer_is_little_endian() {
        let mut w = SnapshotWriter::new();
        w.visit_u16(&mut 0x1234);
        w.visit_u32(&mut 0xAABB_CCDD);
        assert_eq!(w.into_bytes(), vec![0x34, 0x12, 0xDD, 0xCC, 0xBB, 0xAA]);
    }

    #[test]
    fn reader_error_is_sticky() {
        let data = [1u8, 2];
        let mut r = SnapshotReader::new(&data);
        let mut a = 0u32;
        let mut b = 0u8;
        r.visit_u32(&mut a);
        r.visit_u8(&mut b);
        assert_eq!(a, 0);
        assert_eq!(b, 0, "reads after a failure must not consume input");
        assert_eq!(r.position(), 0);
        assert_eq!(
            r.status(),
            Err(SnapshotError::Truncated { needed: 4, available: 2 })
        );
    }

    #[test]
    fn reject_marks_malformed() {
        let mut r = SnapshotReader::new(&[]);
        r.reject("copper state");
        assert_eq!(r.status(), Err(SnapshotError::Malformed("copper state")));
    }

    #[test]
    fn signed_fields_survive_round_trip() {
        let mut w = SnapshotWriter::new();
        w.visit_i16(&mut -2);
        w.visit_i64(&mut -40);
        let bytes = w.into_bytes();

        let mut r = SnapshotReader::new(&bytes);
        let (mut m, mut t) = (0i16, 0i64);
        r.visit_i16(&mut m);
        r.visit_i64(&mut t);
        assert_eq!((m, t), (-2, -40));
        assert!(r.status().is_ok());
    }

    #[test]
    fn size_counter_matches_writer() {
        let mut c = SizeCounter::default();
        let mut w = SnapshotWriter::new();
        for v in [&mut c as &mut dyn StateVisitor, &mut w] {
            v.visit_bool(&mut true);
            v.visit_u64(&mut 9);
            v.visit_u16_slice(&mut [1, 2, 3]);
            v.visit_bytes(&mut [0; 5]);
        }
        assert_eq!(c.bytes(), w.len());
        assert_eq!(c.bytes(), 1 + 8 + 6 + 5);
    }
}
