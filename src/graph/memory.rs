use super::design::*;
use super::item::*;
use super::validation::*;
use super::procedural::*;
use super::vector_signal::*;
use crate::vector::Vector;

use std::cell::{Cell, RefCell};

/// A memory: a fixed-size array of rows that all have the same width.
///
/// Rows are read through selection signals (see [`select`] and
/// [`select_constant`]) and written by memory-write statements inside a
/// [`ClockedBlock`], with the same two-phase discipline as registers: writes
/// requested during the compute step become visible only at the end of the
/// block's update step.
///
/// A memory that no clocked block writes is a ROM; its contents are whatever
/// initial rows were set during construction. The synthesis backend emits the
/// initial contents as an auxiliary file loaded with `$readmemh`.
///
/// # Examples
///
/// ```
/// use ripple::*;
///
/// let design = Design::new();
///
/// let table = design.memory(4, 8);
/// for row in 0..4 {
///     table.set_row(row, Vector::of(8, row as u64 * 3));
/// }
/// let index = design.vector_input_pin("index", 2).signal;
/// design.vector_output_pin("entry", table.select(index));
/// design.finalize_construction().unwrap();
/// ```
///
/// [`select`]: #method.select
/// [`select_constant`]: #method.select_constant
/// [`ClockedBlock`]: ./struct.ClockedBlock.html
#[must_use]
pub struct Memory<'a> {
    pub(crate) core: ItemCore<'a>,
    row_count: usize,
    column_count: u32,
    rows: RefCell<Vec<Vector>>,
    updates: RefCell<Vec<(usize, Vector)>>,
    clocked_block: Cell<Option<&'a ClockedBlock<'a>>>,
}

impl<'a> Design<'a> {
    /// Creates a memory with `row_count` rows of `column_count` bits each.
    ///
    /// All rows are initially zero.
    ///
    /// # Panics
    ///
    /// Panics if `row_count` is zero, or if `column_count` is less than
    /// [`MIN_SIGNAL_BIT_WIDTH`] or greater than [`MAX_SIGNAL_BIT_WIDTH`].
    ///
    /// [`MIN_SIGNAL_BIT_WIDTH`]: ./constant.MIN_SIGNAL_BIT_WIDTH.html
    /// [`MAX_SIGNAL_BIT_WIDTH`]: ./constant.MAX_SIGNAL_BIT_WIDTH.html
    pub fn memory(&'a self, row_count: usize, column_count: u32) -> &'a Memory<'a> {
        if row_count == 0 {
            panic!("Cannot create a memory with 0 rows.");
        }
        if column_count < MIN_SIGNAL_BIT_WIDTH {
            panic!(
                "Cannot create a memory with {} column bit(s). Signals must not be narrower than {} bit(s).",
                column_count, MIN_SIGNAL_BIT_WIDTH
            );
        }
        if column_count > MAX_SIGNAL_BIT_WIDTH {
            panic!(
                "Cannot create a memory with {} column bit(s). Signals must not be wider than {} bit(s).",
                column_count, MAX_SIGNAL_BIT_WIDTH
            );
        }
        let memory = self.memory_arena.alloc(Memory {
            core: ItemCore::new(self),
            row_count,
            column_count,
            rows: RefCell::new(vec![Vector::of(column_count, 0); row_count]),
            updates: RefCell::new(Vec::new()),
            clocked_block: Cell::new(None),
        });
        self.register_item(ItemRef::Memory(memory));
        memory
    }
}

impl<'a> Memory<'a> {
    /// Returns this memory as a graph item.
    pub fn as_item(&'a self) -> ItemRef<'a> {
        ItemRef::Memory(self)
    }

    /// Returns the number of rows in this memory.
    pub fn row_count(&self) -> usize {
        self.row_count
    }

    /// Returns the width of each row, in bits.
    pub fn column_count(&self) -> u32 {
        self.column_count
    }

    /// Sets the display name of this memory.
    pub fn set_name(&self, name: impl Into<String>) {
        self.core.set_name(name);
    }

    /// Returns the current value of the row at `row_index`.
    ///
    /// # Panics
    ///
    /// Panics if `row_index` is out of range.
    pub fn row(&self, row_index: usize) -> Vector {
        self.check_row_index(row_index);
        self.rows.borrow()[row_index]
    }

    /// Sets the row at `row_index`, typically to specify initial memory contents
    /// during construction.
    ///
    /// # Panics
    ///
    /// Panics if `row_index` is out of range or if `row`'s width doesn't match
    /// this memory's column count.
    pub fn set_row(&self, row_index: usize, row: Vector) {
        self.check_row_index(row_index);
        if row.width() != self.column_count {
            panic!(
                "Attempted to set a memory row with a width of {} bits, but this memory has {} column bit(s).",
                row.width(),
                self.column_count
            );
        }
        self.rows.borrow_mut()[row_index] = row;
    }

    fn check_row_index(&self, row_index: usize) {
        if row_index >= self.row_count {
            panic!(
                "Invalid row index {} for a memory with {} row(s).",
                row_index, self.row_count
            );
        }
    }

    /// Creates a `VectorSignal` that represents the row of this memory addressed
    /// by the `index` signal, interpreted as an unsigned number.
    ///
    /// # Panics
    ///
    /// Panics if `index` belongs to a different design, or if this memory has
    /// fewer than `2^index.width()` rows.
    pub fn select(&'a self, index: &'a VectorSignal<'a>) -> &'a VectorSignal<'a> {
        check_same_design(&self.core, &index.core);
        if (self.row_count as u64) < addressable_bits(index.width()) {
            panic!(
                "Attempted to select a row from a memory with {} row(s) using an index signal with a width of {} bits, but that index addresses {} row(s).",
                self.row_count,
                index.width(),
                addressable_bits(index.width())
            );
        }
        self.core
            .design()
            .alloc_vector_signal(VectorSignalData::MemorySelection {
                memory: self,
                index,
            })
    }

    /// Creates a `VectorSignal` that represents the row of this memory at the
    /// fixed index `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range.
    pub fn select_constant(&'a self, index: u32) -> &'a VectorSignal<'a> {
        self.check_row_index(index as usize);
        self.core
            .design()
            .alloc_vector_signal(VectorSignalData::MemoryConstantSelection {
                memory: self,
                index,
            })
    }

    pub(crate) fn request_update(&self, row_index: usize, value: Vector) {
        self.updates.borrow_mut().push((row_index, value));
    }

    pub(crate) fn apply_updates(&self) {
        let mut rows = self.rows.borrow_mut();
        for (row_index, value) in self.updates.borrow_mut().drain(..) {
            rows[row_index] = value;
        }
    }

    /// Returns the contents of this memory in the row format used by memory
    /// initialization files: one zero-padded hex row per line.
    pub fn initialization_file_contents(&self) -> String {
        let mut contents = String::new();
        for row in self.rows.borrow().iter() {
            contents.push_str(&row.digits());
            contents.push('\n');
        }
        contents
    }

    pub(crate) fn validate(&self, context: &mut ValidationContext) {
        let driving_blocks = self
            .core
            .design()
            .clocked_blocks()
            .iter()
            .filter(|block| block.assigns_memory(self.core.index()))
            .count();
        if driving_blocks > 1 {
            context.report_error("multiple clocked blocks assign to this memory");
        }
    }

    pub(crate) fn finalize_after_validation(&self) {
        for block in self.core.design().clocked_blocks() {
            if block.assigns_memory(self.core.index()) {
                self.clocked_block.set(Some(block));
            }
        }
    }

    /// Returns the clocked block that writes this memory. Returns `None` before
    /// construction is finalized and for ROMs.
    pub fn clocked_block(&self) -> Option<&'a ClockedBlock<'a>> {
        self.clocked_block.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_start_at_zero_and_can_be_set() {
        let design = Design::new();

        let memory = design.memory(4, 8);
        assert_eq!(memory.row(2), Vector::of(8, 0));
        memory.set_row(2, Vector::of(8, 0xab));
        assert_eq!(memory.row(2), Vector::of(8, 0xab));
    }

    #[test]
    fn selection_reads_the_addressed_row() {
        let design = Design::new();

        let memory = design.memory(4, 8);
        memory.set_row(3, Vector::of(8, 0x17));
        let index = design.lit(3, 2);
        assert_eq!(memory.select(index).value(), Vector::of(8, 0x17));
        assert_eq!(memory.select_constant(3).value(), Vector::of(8, 0x17));
    }

    #[test]
    fn updates_are_two_phase() {
        let design = Design::new();

        let memory = design.memory(2, 4);
        memory.request_update(1, Vector::of(4, 9));
        assert_eq!(memory.row(1), Vector::of(4, 0));
        memory.apply_updates();
        assert_eq!(memory.row(1), Vector::of(4, 9));
    }

    #[test]
    fn initialization_file_has_one_padded_row_per_line() {
        let design = Design::new();

        let memory = design.memory(2, 12);
        memory.set_row(0, Vector::of(12, 0xa));
        memory.set_row(1, Vector::of(12, 0xbcd));
        assert_eq!(memory.initialization_file_contents(), "00a\nbcd\n");
    }

    #[test]
    #[should_panic(expected = "Cannot create a memory with 0 rows.")]
    fn zero_rows_error() {
        let design = Design::new();

        // Panic
        let _ = design.memory(0, 8);
    }

    #[test]
    #[should_panic(
        expected = "Attempted to select a row from a memory with 4 row(s) using an index signal with a width of 3 bits, but that index addresses 8 row(s)."
    )]
    fn select_index_too_wide_error() {
        let design = Design::new();

        let memory = design.memory(4, 8);
        let index = design.lit(0, 3);

        // Panic
        let _ = memory.select(index);
    }

    #[test]
    #[should_panic(
        expected = "Attempted to set a memory row with a width of 8 bits, but this memory has 4 column bit(s)."
    )]
    fn set_row_width_mismatch_error() {
        let design = Design::new();

        let memory = design.memory(4, 4);

        // Panic
        memory.set_row(0, Vector::of(8, 0));
    }
}
