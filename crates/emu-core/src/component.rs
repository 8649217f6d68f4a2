//! Capability interface shared by every emulated chip.

use crate::{SizeCounter, SnapshotError, SnapshotReader, SnapshotWriter, StateVisitor};

/// A hardware component the machine can reset and snapshot.
///
/// Each component lists its fields once, in [`Component::visit_state`]. Size,
/// save and load all walk that same list, so the three can never disagree
/// about layout.
pub trait Component {
    /// Short name for logs and inspection paths.
    fn name(&self) -> &'static str;

    /// Return to power-on (`hard`) or reset-line (`!hard`) state.
    fn reset(&mut self, hard: bool);

    /// Walk every persistent field in a fixed order.
    fn visit_state(&mut self, visitor: &mut dyn StateVisitor);

    /// Bytes this component occupies in a snapshot.
    fn serialized_size(&mut self) -> usize {
        let mut counter = SizeCounter::default();
        self.visit_state(&mut counter);
        counter.bytes()
    }

    fn save(&mut self, writer: &mut SnapshotWriter) {
        self.visit_state(writer);
    }

    fn load(&mut self, reader: &mut SnapshotReader<'_>) -> Result<(), SnapshotError> {
        self.visit_state(reader);
        reader.status()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default, PartialEq, Debug)]
    struct Counter {
        value: u16,
        armed: bool,
        history: [u8; 3],
    }

    impl Component for Counter {
        fn name(&self) -> &'static str {
            "counter"
        }

        fn reset(&mut self, _hard: bool) {
            *self = Self::default();
        }

        fn visit_state(&mut self, visitor: &mut dyn StateVisitor) {
            visitor.visit_u16(&mut self.value);
            visitor.visit_bool(&mut self.armed);
            visitor.visit_bytes(&mut self.history);
        }
    }

    #[test]
    fn size_save_and_load_agree() {
        let mut original = Counter { value: 0x1234, armed: true, history: [7, 8, 9] };
        assert_eq!(original.serialized_size(), 6);

        let mut writer = SnapshotWriter::new();
        original.save(&mut writer);
        let bytes = writer.into_bytes();
        assert_eq!(bytes.len(), 6);

        let mut restored = Counter::default();
        let mut reader = SnapshotReader::new(&bytes);
        restored.load(&mut reader).expect("load");
        assert_eq!(restored, original);
        assert_eq!(reader.position(), 6);
    }

    #[test]
    fn short_input_reports_truncation() {
        let mut restored = Counter::default();
        let mut reader = SnapshotReader::new(&[0x34, 0x12]);
        let err = restored.load(&mut reader).unwrap_err();
        assert!(matches!(err, SnapshotError::Truncated { .. }));
    }
}
