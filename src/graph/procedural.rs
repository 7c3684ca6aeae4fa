use super::bit_signal::*;
use super::clock::*;
use super::design::*;
use super::item::*;
use super::memory::*;
use super::register::*;
use super::validation::*;
use super::vector_signal::*;
use crate::vector::Vector;

use std::cell::{Cell, Ref, RefCell};

/// A clocked block of statements, equivalent to an `always` block triggered by a
/// clock edge (plus an `initial` block for register initial values).
///
/// Per clock edge, a block first executes its statements to compute the next
/// state of every register and memory it assigns ("compute" step) and only then
/// commits those next values into the current values ("update" step). The split
/// guarantees that every block triggered by the same edge samples the pre-edge
/// state.
///
/// Which registers and memories a block assigns is derived from its statement
/// tree when the design's construction is finalized; afterwards the association
/// is frozen.
///
/// # Examples
///
/// ```
/// use ripple::*;
///
/// let design = Design::new();
///
/// let clk = design.bit_input_pin("clk");
/// let clock = design.clock(clk.signal);
/// let counter = design.vector_register(4);
/// counter.set_name("counter");
///
/// let block = clock.clocked_block();
/// block.statements().assign(counter, counter.signal + design.lit(1, 4));
/// design.finalize_construction().unwrap();
/// assert!(counter.clocked_block().is_some());
/// ```
#[must_use]
pub struct ClockedBlock<'a> {
    pub(crate) core: ItemCore<'a>,
    clock: &'a Clock<'a>,
    statements: StatementSequence<'a>,
    assigned_bit_registers: RefCell<Vec<BitRegister<'a>>>,
    assigned_vector_registers: RefCell<Vec<VectorRegister<'a>>>,
    assigned_memories: RefCell<Vec<&'a Memory<'a>>>,
    assigned_state_determined: Cell<bool>,
}

impl<'a> ClockedBlock<'a> {
    pub(crate) fn new(design: &'a Design<'a>, clock: &'a Clock<'a>) -> &'a ClockedBlock<'a> {
        let block = design.clocked_block_arena.alloc(ClockedBlock {
            core: ItemCore::new(design),
            clock,
            statements: StatementSequence::new(design),
            assigned_bit_registers: RefCell::new(Vec::new()),
            assigned_vector_registers: RefCell::new(Vec::new()),
            assigned_memories: RefCell::new(Vec::new()),
            assigned_state_determined: Cell::new(false),
        });
        design.register_item(ItemRef::ClockedBlock(block));
        block
    }

    /// Returns this block as a graph item.
    pub fn as_item(&'a self) -> ItemRef<'a> {
        ItemRef::ClockedBlock(self)
    }

    /// Returns the clock that triggers this block.
    pub fn clock(&self) -> &'a Clock<'a> {
        self.clock
    }

    /// Returns the statement sequence of this block.
    pub fn statements(&'a self) -> &'a StatementSequence<'a> {
        &self.statements
    }

    /// Sets the display name of this block.
    pub fn set_name(&self, name: impl Into<String>) {
        self.core.set_name(name);
    }

    pub(crate) fn determine_assigned_state(&self) {
        if self.assigned_state_determined.get() {
            return;
        }
        self.assigned_state_determined.set(true);
        self.statements.collect_assigned_state(
            &mut self.assigned_bit_registers.borrow_mut(),
            &mut self.assigned_vector_registers.borrow_mut(),
            &mut self.assigned_memories.borrow_mut(),
        );
    }

    pub(crate) fn assigns_bit_register(&self, register_index: usize) -> bool {
        self.assigned_bit_registers
            .borrow()
            .iter()
            .any(|register| register.signal.core.index() == register_index)
    }

    pub(crate) fn assigns_vector_register(&self, register_index: usize) -> bool {
        self.assigned_vector_registers
            .borrow()
            .iter()
            .any(|register| register.signal.core.index() == register_index)
    }

    pub(crate) fn assigns_memory(&self, memory_index: usize) -> bool {
        self.assigned_memories
            .borrow()
            .iter()
            .any(|memory| memory.core.index() == memory_index)
    }

    pub(crate) fn validate(&self, context: &mut ValidationContext) {
        if self.statements.is_effectively_nop() {
            context.report_warning("this clocked block has no effect");
        }
    }

    /// Computes the next state of this block by executing its statements. This
    /// step must not change any signal values; it only stores pending next
    /// values.
    pub fn compute_next_state(&self) {
        self.statements.execute();
    }

    /// Commits the next state computed by [`compute_next_state`] into the current
    /// state of every register and memory this block assigns.
    ///
    /// [`compute_next_state`]: #method.compute_next_state
    pub fn update_state(&self) {
        for register in self.assigned_bit_registers.borrow().iter() {
            register.update_value();
        }
        for register in self.assigned_vector_registers.borrow().iter() {
            register.update_value();
        }
        for memory in self.assigned_memories.borrow().iter() {
            memory.apply_updates();
        }
    }
}

/// A sequence of statements inside a [`ClockedBlock`] or a [`WhenStatement`]
/// branch.
///
/// Statements are added through the factory methods ([`assign`], [`assign_bit`],
/// [`write_memory`], [`when`]) and execute in the order they were added.
///
/// [`ClockedBlock`]: ./struct.ClockedBlock.html
/// [`WhenStatement`]: ./struct.WhenStatement.html
/// [`assign`]: #method.assign
/// [`assign_bit`]: #method.assign_bit
/// [`write_memory`]: #method.write_memory
/// [`when`]: #method.when
pub struct StatementSequence<'a> {
    design: &'a Design<'a>,
    statements: RefCell<Vec<Statement<'a>>>,
}

#[derive(Clone, Copy)]
pub(crate) enum Statement<'a> {
    AssignBit {
        register: BitRegister<'a>,
        source: &'a BitSignal<'a>,
    },
    AssignVector {
        register: VectorRegister<'a>,
        source: &'a VectorSignal<'a>,
    },
    WriteMemory {
        memory: &'a Memory<'a>,
        index: &'a VectorSignal<'a>,
        source: &'a VectorSignal<'a>,
    },
    When(&'a WhenStatement<'a>),
}

impl<'a> StatementSequence<'a> {
    pub(crate) fn new(design: &'a Design<'a>) -> StatementSequence<'a> {
        StatementSequence {
            design,
            statements: RefCell::new(Vec::new()),
        }
    }

    pub(crate) fn statement_list(&self) -> Ref<'_, Vec<Statement<'a>>> {
        self.statements.borrow()
    }

    /// Adds a statement that assigns `source` to the bit register `register`.
    ///
    /// # Panics
    ///
    /// Panics if `source` belongs to a different design than the register.
    pub fn assign_bit(&self, register: BitRegister<'a>, source: &'a BitSignal<'a>) {
        check_same_design_signal(&register.signal.core, &source.core);
        self.statements.borrow_mut().push(Statement::AssignBit { register, source });
    }

    /// Adds a statement that assigns the constant `value` to the bit register
    /// `register`.
    pub fn assign_bit_value(&self, register: BitRegister<'a>, value: bool) {
        let constant = self.design.bit_constant(value);
        self.assign_bit(register, constant);
    }

    /// Adds a statement that assigns `source` to the vector register `register`.
    ///
    /// # Panics
    ///
    /// Panics if `source` belongs to a different design than the register, or if
    /// their bit widths aren't equal.
    pub fn assign(&self, register: VectorRegister<'a>, source: &'a VectorSignal<'a>) {
        check_same_design_signal(&register.signal.core, &source.core);
        if source.width() != register.width() {
            panic!(
                "Attempted to assign a signal with a width of {} bits to a register with a width of {} bits.",
                source.width(),
                register.width()
            );
        }
        self.statements
            .borrow_mut()
            .push(Statement::AssignVector { register, source });
    }

    /// Adds a statement that assigns the constant `value` to the vector register
    /// `register`.
    ///
    /// # Panics
    ///
    /// Panics if `value`'s width doesn't match the register's width.
    pub fn assign_value(&self, register: VectorRegister<'a>, value: Vector) {
        let constant = self.design.constant(value);
        self.assign(register, constant);
    }

    /// Adds a statement that writes `source` to the row of `memory` addressed by
    /// the `index` signal.
    ///
    /// # Panics
    ///
    /// Panics if the operands belong to different designs, if the memory has
    /// fewer than `2^index.width()` rows, or if `source`'s width doesn't match
    /// the memory's column count.
    pub fn write_memory(
        &self,
        memory: &'a Memory<'a>,
        index: &'a VectorSignal<'a>,
        source: &'a VectorSignal<'a>,
    ) {
        check_same_design(&memory.core, &index.core);
        check_same_design(&memory.core, &source.core);
        if (memory.row_count() as u64) < addressable_bits(index.width()) {
            panic!(
                "Attempted to write a row of a memory with {} row(s) using an index signal with a width of {} bits, but that index addresses {} row(s).",
                memory.row_count(),
                index.width(),
                addressable_bits(index.width())
            );
        }
        if source.width() != memory.column_count() {
            panic!(
                "Attempted to write a value with a width of {} bits to a memory with {} column bit(s).",
                source.width(),
                memory.column_count()
            );
        }
        self.statements.borrow_mut().push(Statement::WriteMemory {
            memory,
            index,
            source,
        });
    }

    /// Adds an if/else statement on `condition` and returns it so branches can be
    /// filled in.
    ///
    /// # Panics
    ///
    /// Panics if `condition` belongs to a different design.
    pub fn when(&self, condition: &'a BitSignal<'a>) -> &'a WhenStatement<'a> {
        let design = self.design;
        if !std::ptr::eq(condition.core.design(), design) {
            panic!("Attempted to combine signals from different designs.");
        }
        let when = design.when_arena.alloc(WhenStatement {
            condition,
            then_branch: StatementSequence::new(design),
            otherwise_branch: StatementSequence::new(design),
        });
        self.statements.borrow_mut().push(Statement::When(when));
        when
    }

    /// Returns true iff executing this sequence can have no effect.
    pub fn is_effectively_nop(&self) -> bool {
        self.statements.borrow().iter().all(|statement| match statement {
            Statement::When(when) => when.is_effectively_nop(),
            _ => false,
        })
    }

    pub(crate) fn execute(&self) {
        for statement in self.statements.borrow().iter() {
            match *statement {
                Statement::AssignBit { register, source } => {
                    register.set_next(source.value());
                }
                Statement::AssignVector { register, source } => {
                    register.set_next(source.value());
                }
                Statement::WriteMemory {
                    memory,
                    index,
                    source,
                } => {
                    memory.request_update(index.value().to_u32() as usize, source.value());
                }
                Statement::When(when) => {
                    if when.condition.value() {
                        when.then_branch.execute();
                    } else {
                        when.otherwise_branch.execute();
                    }
                }
            }
        }
    }

    pub(crate) fn collect_assigned_state(
        &self,
        bit_registers: &mut Vec<BitRegister<'a>>,
        vector_registers: &mut Vec<VectorRegister<'a>>,
        memories: &mut Vec<&'a Memory<'a>>,
    ) {
        for statement in self.statements.borrow().iter() {
            match *statement {
                Statement::AssignBit { register, .. } => {
                    if !bit_registers
                        .iter()
                        .any(|existing| existing.signal.core.index() == register.signal.core.index())
                    {
                        bit_registers.push(register);
                    }
                }
                Statement::AssignVector { register, .. } => {
                    if !vector_registers
                        .iter()
                        .any(|existing| existing.signal.core.index() == register.signal.core.index())
                    {
                        vector_registers.push(register);
                    }
                }
                Statement::WriteMemory { memory, .. } => {
                    if !memories
                        .iter()
                        .any(|existing| existing.core.index() == memory.core.index())
                    {
                        memories.push(memory);
                    }
                }
                Statement::When(when) => {
                    when.then_branch
                        .collect_assigned_state(bit_registers, vector_registers, memories);
                    when.otherwise_branch
                        .collect_assigned_state(bit_registers, vector_registers, memories);
                }
            }
        }
    }
}

/// An if/else statement on a bit condition.
///
/// Both branches are statement sequences; an empty `otherwise` branch is not
/// emitted by the synthesis backend.
pub struct WhenStatement<'a> {
    pub(crate) condition: &'a BitSignal<'a>,
    then_branch: StatementSequence<'a>,
    otherwise_branch: StatementSequence<'a>,
}

impl<'a> WhenStatement<'a> {
    /// Returns the condition of this statement.
    pub fn condition(&self) -> &'a BitSignal<'a> {
        self.condition
    }

    /// Returns the branch executed when the condition is high.
    pub fn then_branch(&'a self) -> &'a StatementSequence<'a> {
        &self.then_branch
    }

    /// Returns the branch executed when the condition is low.
    pub fn otherwise_branch(&'a self) -> &'a StatementSequence<'a> {
        &self.otherwise_branch
    }

    pub(crate) fn is_effectively_nop(&self) -> bool {
        self.then_branch.is_effectively_nop() && self.otherwise_branch.is_effectively_nop()
    }

    pub(crate) fn then_branch_ref(&self) -> &StatementSequence<'a> {
        &self.then_branch
    }

    pub(crate) fn otherwise_branch_ref(&self) -> &StatementSequence<'a> {
        &self.otherwise_branch
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_discovers_its_assigned_registers() {
        let design = Design::new();

        let clock = design.clock(design.low());
        let counter = design.vector_register(4);
        counter.set_name("counter");
        let other = design.vector_register(4);
        other.set_name("other");
        other.disable_error_if_not_assigned();

        let block = clock.clocked_block();
        block.statements().assign(counter, counter.signal + design.lit(1, 4));

        design.finalize_construction().unwrap();
        assert!(counter.clocked_block().is_some());
        assert!(other.clocked_block().is_none());
    }

    #[test]
    fn unassigned_register_fails_validation() {
        let design = Design::new();

        let register = design.vector_register(4);
        register.set_name("lonely");

        let error = design.finalize_construction().unwrap_err();
        assert_eq!(error.problems.len(), 1);
        assert_eq!(error.problems[0].item, "lonely");
    }

    #[test]
    fn doubly_assigned_register_fails_validation() {
        let design = Design::new();

        let clock = design.clock(design.low());
        let register = design.bit_register();
        register.set_name("contested");

        let block_a = clock.clocked_block();
        block_a.statements().assign_bit(register, design.low());
        let block_b = clock.clocked_block();
        block_b.statements().assign_bit(register, design.high());

        let error = design.finalize_construction().unwrap_err();
        assert_eq!(error.problems.len(), 1);
        assert_eq!(
            error.problems[0].message,
            "multiple clocked blocks assign to this register"
        );
    }

    #[test]
    fn when_statement_executes_the_taken_branch() {
        let design = Design::new();

        let clock = design.clock(design.low());
        let register = design.vector_register(4);
        let condition = design.bit_connector();

        let block = clock.clocked_block();
        let when = block.statements().when(condition.signal);
        when.then_branch().assign_value(register, Vector::of(4, 0xa));
        when.otherwise_branch().assign_value(register, Vector::of(4, 0x5));

        condition.set_connected(design.high());
        design.prepare_simulation().unwrap();

        clock.simulate_edge();
        assert_eq!(register.signal.value(), Vector::of(4, 0xa));
    }

    #[test]
    fn update_is_deferred_until_all_blocks_computed() {
        let design = Design::new();

        let clock = design.clock(design.low());
        let a = design.bit_register();
        a.set_initial_value(true);
        let b = design.bit_register();

        // b samples a's pre-edge value even though a is updated by the same edge.
        let block_a = clock.clocked_block();
        block_a.statements().assign_bit(a, !a.signal);
        let block_b = clock.clocked_block();
        block_b.statements().assign_bit(b, a.signal);

        design.prepare_simulation().unwrap();
        clock.simulate_edge();
        assert!(!a.signal.value());
        assert!(b.signal.value());
    }

    #[test]
    #[should_panic(
        expected = "Attempted to assign a signal with a width of 3 bits to a register with a width of 4 bits."
    )]
    fn assign_width_mismatch_error() {
        let design = Design::new();

        let clock = design.clock(design.low());
        let register = design.vector_register(4);
        let block = clock.clocked_block();

        // Panic
        block.statements().assign(register, design.lit(0, 3));
    }

    #[test]
    #[should_panic(
        expected = "Attempted to write a value with a width of 3 bits to a memory with 8 column bit(s)."
    )]
    fn write_memory_width_mismatch_error() {
        let design = Design::new();

        let clock = design.clock(design.low());
        let memory = design.memory(4, 8);
        let block = clock.clocked_block();

        // Panic
        block
            .statements()
            .write_memory(memory, design.lit(0, 2), design.lit(0, 3));
    }
}
