//! Function tables for `call_indirect`

use super::RuntimeError;
use crate::parser::module::Limits;

/// Largest table we are willing to allocate up front.
pub const MAX_TABLE_ELEMENTS: u32 = 10_000_000;

/// A funcref table. Each slot holds a function index or is uninitialised.
#[derive(Debug, Clone)]
pub struct Table {
    elements: Vec<Option<u32>>,
}

impl Table {
    pub fn new(limits: Limits) -> Result<Self, RuntimeError> {
        if limits.min > MAX_TABLE_ELEMENTS {
            return Err(RuntimeError::TableSizeExceeded);
        }
        Ok(Table {
            elements: vec![None; limits.min as usize],
        })
    }

    pub fn size(&self) -> u32 {
        self.elements.len() as u32
    }

    /// Function index stored at `idx`; missing and empty slots are both
    /// undefined elements.
    pub fn get(&self, idx: u32) -> Result<u32, RuntimeError> {
        self.elements
            .get(idx as usize)
            .copied()
            .flatten()
            .ok_or(RuntimeError::UndefinedElement(idx))
    }

    /// Copy an element segment into the table starting at `offset`.
    pub fn init(&mut self, offset: u32, functions: &[u32]) -> Result<(), RuntimeError> {
        let start = offset as usize;
        let end = start
            .checked_add(functions.len())
            .filter(|end| *end <= self.elements.len())
            .ok_or(RuntimeError::TableOutOfBounds)?;
        for (slot, func_idx) in self.elements[start..end].iter_mut().zip(functions) {
            *slot = Some(*func_idx);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_and_get() {
        let mut table = Table::new(Limits { min: 4, max: None }).unwrap();
        assert_eq!(table.size(), 4);
        table.init(1, &[7, 8]).unwrap();

        assert_eq!(table.get(1).unwrap(), 7);
        assert_eq!(table.get(2).unwrap(), 8);
        assert!(matches!(table.get(0), Err(RuntimeError::UndefinedElement(0))));
        assert!(matches!(table.get(4), Err(RuntimeError::UndefinedElement(4))));
    }

    #[test]
    fn test_init_out_of_bounds() {
        let mut table = Table::new(Limits { min: 2, max: None }).unwrap();
        assert!(matches!(
            table.init(1, &[1, 2]),
            Err(RuntimeError::TableOutOfBounds)
        ));
        assert!(table.init(2, &[]).is_ok());
        assert!(table.init(3, &[]).is_err());
    }

    #[test]
    fn test_oversized_table() {
        assert!(matches!(
            Table::new(Limits {
                min: u32::MAX,
                max: None
            }),
            Err(RuntimeError::TableSizeExceeded)
        ));
    }
}
