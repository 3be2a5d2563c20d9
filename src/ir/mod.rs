//! The QuailBASIC intermediate representation.
//!
//! The IR is a linear, append-only sequence of fixed-shape three-address
//! instructions. Each instruction holds an [`OpCode`], up to two operand
//! ids, one result id, and a back-reference to its source location.
//! Instruction positions double as program-counter values for the
//! interpreter.
//!
//! # Patching
//!
//! Forward branch targets are unknown while a control-flow construct is
//! still open, so `op1`/`op2` are the only mutable parts of an emitted
//! instruction: [`Ir::emit`] returns an [`InstrIdx`] that
//! [`Ir::patch_op1`]/[`Ir::patch_op2`] accept. Opcode and result never
//! change, and instructions are never reordered. All patches happen
//! before lowering returns; a finished IR contains no unresolved
//! goto-target placeholder.
//!
//! # Interpreter contract
//!
//! A downstream interpreter executing this IR maintains:
//!
//! - a value vector indexed by [`SymbolId`](crate::symbols::SymbolId);
//! - a label→pc map, precomputed from LABEL instructions, plus a
//!   line-number→pc map over instruction source lines (GOTO/GOSUB may
//!   reference a line number before its instructions appear);
//! - a return-label stack driven by PUSH_RETLABEL/RETURN;
//! - a UDF runtime-scope stack driven by PUSH_RT_SCOPE / POP_RT_SCOPE /
//!   GOTO_CALLER;
//! - a PARAM queue: PARAM1 pushes one operand id, PARAM2 pushes two, and
//!   the next non-PARAM opcode drains as many as its arity needs, in
//!   push order.
//!
//! PRINT USING reuses one format id for every item of a print list; the
//! interpreter treats the format string as cyclic per item.

mod opcode;

pub use opcode::OpCode;

use crate::ast::Span;
use crate::symbols::SymbolId;
use log::trace;
use std::fmt;

/// Source back-reference of an instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceRef {
    /// BASIC line number (explicit, or synthetic for unnumbered lines).
    pub line: u32,
    /// Byte range in the source text.
    pub span: Span,
}

impl SourceRef {
    /// Creates a source reference.
    pub fn new(line: u32, span: Span) -> Self {
        Self { line, span }
    }
}

/// Position of an instruction in the IR.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InstrIdx(usize);

impl InstrIdx {
    /// The raw position.
    pub fn index(&self) -> usize {
        self.0
    }
}

/// One three-address instruction.
///
/// Operands are read through accessors; mutation is only possible via
/// [`Ir::patch_op1`]/[`Ir::patch_op2`], keeping opcode and result
/// immutable after emission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    source: SourceRef,
    opcode: OpCode,
    op1: SymbolId,
    op2: SymbolId,
    result: SymbolId,
}

impl Instruction {
    /// The source location this instruction was lowered from.
    pub fn source(&self) -> SourceRef {
        self.source
    }

    /// The opcode.
    pub fn opcode(&self) -> OpCode {
        self.opcode
    }

    /// First operand id (possibly null).
    pub fn op1(&self) -> SymbolId {
        self.op1
    }

    /// Second operand id (possibly null).
    pub fn op2(&self) -> SymbolId {
        self.op2
    }

    /// Result id (possibly null).
    pub fn result(&self) -> SymbolId {
        self.result
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{:4}] {:12} {:>4} {:>4} {:>4}",
            self.source.line,
            self.opcode.mnemonic(),
            self.op1,
            self.op2,
            self.result
        )
    }
}

/// The instruction stream.
#[derive(Debug, Default)]
pub struct Ir {
    instructions: Vec<Instruction>,
}

impl Ir {
    /// Creates an empty IR.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an instruction and returns its position.
    pub fn emit(
        &mut self,
        source: SourceRef,
        opcode: OpCode,
        op1: SymbolId,
        op2: SymbolId,
        result: SymbolId,
    ) -> InstrIdx {
        let idx = InstrIdx(self.instructions.len());
        let instruction = Instruction {
            source,
            opcode,
            op1,
            op2,
            result,
        };
        trace!("emit {:4}: {}", idx.index(), instruction);
        self.instructions.push(instruction);
        idx
    }

    /// Rewrites op1 of an already-emitted instruction.
    pub fn patch_op1(&mut self, idx: InstrIdx, id: SymbolId) {
        self.instructions[idx.0].op1 = id;
    }

    /// Rewrites op2 of an already-emitted instruction.
    pub fn patch_op2(&mut self, idx: InstrIdx, id: SymbolId) {
        self.instructions[idx.0].op2 = id;
    }

    /// The instruction at a position.
    pub fn get(&self, idx: InstrIdx) -> &Instruction {
        &self.instructions[idx.0]
    }

    /// All instructions, in emission order.
    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    /// Number of emitted instructions.
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    /// Returns true if nothing has been emitted.
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbols::SymbolTable;
    use crate::symbols::types::DataType;

    fn src(line: u32) -> SourceRef {
        SourceRef::new(line, Span::new(0, 0))
    }

    #[test]
    fn test_emit_preserves_order() {
        let mut symbols = SymbolTable::new();
        let a = symbols.add_tmp(DataType::Int32);
        let b = symbols.add_tmp(DataType::Int32);
        let c = symbols.add_tmp(DataType::Int32);

        let mut ir = Ir::new();
        ir.emit(src(10), OpCode::Value, a, SymbolId::NULL, a);
        ir.emit(src(10), OpCode::Value, b, SymbolId::NULL, b);
        ir.emit(src(20), OpCode::AddI32, a, b, c);

        let ops: Vec<_> = ir.instructions().iter().map(|i| i.opcode()).collect();
        assert_eq!(ops, vec![OpCode::Value, OpCode::Value, OpCode::AddI32]);
        assert_eq!(ir.instructions()[2].result(), c);
    }

    #[test]
    fn test_patching_rewrites_only_operands() {
        let mut symbols = SymbolTable::new();
        let placeholder = symbols.add_goto_target();
        let label = symbols.add_label();

        let mut ir = Ir::new();
        let jump = ir.emit(
            src(10),
            OpCode::GotoLabel,
            placeholder,
            SymbolId::NULL,
            SymbolId::NULL,
        );
        ir.emit(src(20), OpCode::Label, label, SymbolId::NULL, SymbolId::NULL);

        ir.patch_op1(jump, label);
        assert_eq!(ir.get(jump).op1(), label);
        assert_eq!(ir.get(jump).opcode(), OpCode::GotoLabel);
        assert_eq!(ir.get(jump).result(), SymbolId::NULL);
    }
}
