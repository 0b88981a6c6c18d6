//! Machine memory.

use intcode_core::{Error, Result, Word};
use std::sync::Arc;

/// Upper bound on the number of cells a machine may grow to
pub const MAX_CELLS: usize = 1 << 24;

/// Growable cell storage holding both code and data.
///
/// Any access past the end zero-extends the storage up to and including the
/// accessed address, so no address below [`MAX_CELLS`] is ever out of bounds.
/// Storage starts out shared with the program image and is copied on the
/// first access that changes it.
#[derive(Debug, Clone)]
pub struct Memory<W> {
    cells: Arc<Vec<W>>,
}

impl<W: Word> Memory<W> {
    pub fn new() -> Self {
        Self {
            cells: Arc::new(Vec::new()),
        }
    }

    pub fn from_shared(source: &Arc<Vec<W>>) -> Self {
        Self {
            cells: Arc::clone(source),
        }
    }

    /// Replace the contents with `source`
    pub fn reset(&mut self, source: &Arc<Vec<W>>) {
        self.cells = Arc::clone(source);
    }

    pub fn read(&mut self, address: usize) -> Result<W> {
        self.ensure(address)?;
        Ok(self.cells[address].clone())
    }

    pub fn write(&mut self, address: usize, value: W) -> Result<()> {
        self.ensure(address)?;
        Arc::make_mut(&mut self.cells)[address] = value;
        Ok(())
    }

    /// Zero-extend so that `address` is valid
    pub fn ensure(&mut self, address: usize) -> Result<()> {
        if address >= MAX_CELLS {
            return Err(Error::AddressOutOfRange {
                address,
                limit: MAX_CELLS,
            });
        }
        if address >= self.cells.len() {
            Arc::make_mut(&mut self.cells).resize(address + 1, W::zero());
        }
        Ok(())
    }

    /// Read without extending
    pub fn get(&self, address: usize) -> Option<&W> {
        self.cells.get(address)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn as_slice(&self) -> &[W] {
        &self.cells
    }

    /// True while no write has separated this memory from `source`
    pub fn shares_storage_with(&self, source: &Arc<Vec<W>>) -> bool {
        Arc::ptr_eq(&self.cells, source)
    }
}

impl<W: Word> Default for Memory<W> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_bigint::BigInt;
    use proptest::prelude::*;

    #[test]
    fn test_read_extends_with_zeros() {
        let mut memory = Memory::<i64>::from_shared(&Arc::new(vec![1, 2, 3]));
        assert_eq!(memory.read(1).unwrap(), 2);
        assert_eq!(memory.read(10).unwrap(), 0);
        assert_eq!(memory.len(), 11);
        assert_eq!(memory.get(11), None);
    }

    #[test]
    fn test_write_extends() {
        let mut memory = Memory::<BigInt>::new();
        assert!(memory.is_empty());
        memory.write(4, BigInt::from(7)).unwrap();
        assert_eq!(memory.len(), 5);
        assert_eq!(memory.as_slice()[..4], vec![BigInt::from(0); 4][..]);
        assert_eq!(memory.read(4).unwrap(), BigInt::from(7));
    }

    #[test]
    fn test_copy_on_write() {
        let image = Arc::new(vec![1i32, 2, 3]);
        let mut memory = Memory::from_shared(&image);
        assert_eq!(memory.read(2).unwrap(), 3);
        assert!(memory.shares_storage_with(&image));

        memory.write(0, 42).unwrap();
        assert!(!memory.shares_storage_with(&image));
        assert_eq!(image[0], 1);
        assert_eq!(memory.read(0).unwrap(), 42);

        memory.reset(&image);
        assert!(memory.shares_storage_with(&image));
        assert_eq!(memory.read(0).unwrap(), 1);
    }

    #[test]
    fn test_clone_is_independent() {
        let image = Arc::new(vec![5i64; 4]);
        let mut original = Memory::from_shared(&image);
        original.write(0, 6).unwrap();
        let mut copy = original.clone();
        copy.write(0, 7).unwrap();
        assert_eq!(original.read(0).unwrap(), 6);
        assert_eq!(copy.read(0).unwrap(), 7);
    }

    #[test]
    fn test_limit_is_enforced() {
        let mut memory = Memory::<i64>::new();
        assert!(matches!(
            memory.write(MAX_CELLS, 1),
            Err(Error::AddressOutOfRange { address, .. }) if address == MAX_CELLS
        ));
        assert!(memory.read(usize::MAX).is_err());
        assert!(memory.is_empty());

        memory.write(1_000, 1).unwrap();
        assert_eq!(memory.len(), 1_001);
    }

    proptest! {
        #[test]
        fn prop_unwritten_cells_read_zero(address in 0usize..100_000) {
            let mut memory = Memory::<i64>::from_shared(&Arc::new(vec![9, 9, 9]));
            let expected = if address < 3 { 9 } else { 0 };
            prop_assert_eq!(memory.read(address).unwrap(), expected);
            prop_assert!(memory.len() >= address + 1);
        }

        #[test]
        fn prop_write_then_read(writes in prop::collection::vec((0usize..2_000, any::<i64>()), 1..20)) {
            let mut memory = Memory::<i64>::new();
            let mut expected = std::collections::HashMap::new();
            for (address, value) in writes {
                memory.write(address, value).unwrap();
                expected.insert(address, value);
            }
            for (address, value) in expected {
                prop_assert_eq!(memory.read(address).unwrap(), value);
            }
        }
    }
}
