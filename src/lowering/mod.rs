//! Lowering: parse tree to IR.
//!
//! This is the compiler's main pass. It walks the [`Program`] tree once,
//! allocating symbol-table entries and appending instructions for every
//! construct. All semantic checks live here: numeric/string segregation,
//! promotion, entity-kind checks, balanced control flow. A semantic
//! error aborts the compilation immediately; there is no recovery.
//!
//! # Control-flow state
//!
//! Because the dialect is line-structured, WHILE/WEND, FOR/NEXT and the
//! multi-line IF THEN BEGIN family arrive as separate statements. Open
//! constructs are tracked on explicit stacks; closing statements pop
//! them and back-patch the forward branches recorded when the construct
//! opened. Constructs still open at end of program are semantic errors.
//!
//! # Determinism
//!
//! The walk is single-threaded and allocates ids in visit order, so
//! lowering the same tree twice yields byte-identical IR.

mod control_flow;
mod expressions;
mod functions;
mod statements;

use crate::ast::{Line, Program, Span, Statement, StatementKind};
use crate::error::{CompileError, ErrorKind, InternalError, SemanticError};
use crate::ir::{InstrIdx, Ir, OpCode, SourceRef};
use crate::symbols::{DataType, SymbolEntry, SymbolId, SymbolTable, Value, VariableName};
use control_flow::{ForState, IfState, UdfState, WhileState};
use log::debug;
use std::collections::{HashMap, HashSet};

/// The reserved id denoting an absent operand.
pub(crate) const NULL_ID: SymbolId = SymbolId::NULL;

/// Compilation options.
#[derive(Debug, Clone, Copy, Default)]
pub struct Options {
    /// Whether the graphics/sound runtime is available. Graphics and
    /// sound constructs without it are internal (configuration) errors.
    pub graphics: bool,
}

/// The output of a successful compilation.
#[derive(Debug)]
pub struct Compilation {
    /// The emitted instruction stream.
    pub ir: Ir,
    /// The symbol table the instructions refer into.
    pub symbols: SymbolTable,
}

/// Lowers a program to IR.
///
/// `source` is the original source text; node spans index into it to
/// produce error excerpts. Passing an empty string degrades excerpts
/// but nothing else.
pub fn lower(
    source: &str,
    program: &Program,
    options: Options,
) -> Result<Compilation, CompileError> {
    let mut lowerer = Lowerer::new(source, options);
    lowerer.lower_program(program)?;
    lowerer.finish()
}

/// The tree walker.
pub(crate) struct Lowerer<'src> {
    source: &'src str,
    pub(crate) ir: Ir,
    pub(crate) symbols: SymbolTable,
    options: Options,
    /// Line number of the line currently being lowered.
    pub(crate) current_line: u32,
    /// Generator for lines without an explicit number.
    synthetic_line: u32,
    /// Per-UDF lowering state, keyed by the UDF's id.
    pub(crate) udf_states: HashMap<SymbolId, UdfState>,
    pub(crate) while_stack: Vec<WhileState>,
    pub(crate) for_stack: Vec<ForState>,
    pub(crate) if_stack: Vec<IfState>,
    /// VariableNames that have been LET or DIM'd, for the contexts that
    /// require prior definition.
    pub(crate) defined: HashSet<VariableName>,
}

impl<'src> Lowerer<'src> {
    fn new(source: &'src str, options: Options) -> Self {
        Self {
            source,
            ir: Ir::new(),
            symbols: SymbolTable::new(),
            options,
            current_line: 0,
            synthetic_line: 0,
            udf_states: HashMap::new(),
            while_stack: Vec::new(),
            for_stack: Vec::new(),
            if_stack: Vec::new(),
            defined: HashSet::new(),
        }
    }

    fn lower_program(&mut self, program: &Program) -> Result<(), CompileError> {
        for line in &program.lines {
            self.lower_line(line)?;
        }
        Ok(())
    }

    fn lower_line(&mut self, line: &Line) -> Result<(), CompileError> {
        self.current_line = match line.number {
            Some(n) => n,
            None => {
                self.synthetic_line += 1;
                self.synthetic_line
            }
        };
        debug!(
            "lowering line {} ({} statements)",
            self.current_line,
            line.statements.len()
        );
        for statement in &line.statements {
            self.lower_statement(statement)?;
        }
        Ok(())
    }

    fn lower_statement(&mut self, statement: &Statement) -> Result<(), CompileError> {
        let span = statement.span;
        match &statement.kind {
            StatementKind::Let { target, value } => self.lower_let(target, value, span),
            StatementKind::Print { file_number, items } => {
                self.lower_print(file_number.as_ref(), items, span)
            }
            StatementKind::PrintUsing {
                file_number,
                format,
                items,
            } => self.lower_print_using(file_number.as_ref(), format, items, span),
            StatementKind::Write { file_number, exprs } => {
                self.lower_write(file_number.as_ref(), exprs, span)
            }
            StatementKind::Dim {
                name,
                suffix,
                dimensions,
            } => self.lower_dim(name, *suffix, dimensions, span),
            StatementKind::DefFn {
                name,
                suffix,
                params,
                body,
            } => self.lower_def_fn(name, *suffix, params, body, span),
            StatementKind::End => {
                self.emit(span, OpCode::End, NULL_ID, NULL_ID, NULL_ID);
                Ok(())
            }
            StatementKind::While { condition } => self.lower_while(condition, span),
            StatementKind::Wend => self.lower_wend(span),
            StatementKind::For {
                var,
                init,
                end,
                step,
            } => self.lower_for(var, init, end, step.as_ref(), span),
            StatementKind::Next { vars } => self.lower_next(vars, span),
            StatementKind::If {
                condition,
                then_body,
                else_body,
            } => self.lower_if(condition, then_body, else_body.as_ref(), span),
            StatementKind::IfThenBegin { condition } => self.lower_if_then_begin(condition, span),
            StatementKind::ElseBegin => self.lower_else_begin(span),
            StatementKind::EndIf => self.lower_end_if(span),
            StatementKind::Gosub { line } => self.lower_gosub(*line, span),
            StatementKind::GosubLabel { label } => self.lower_gosub_label(label, span),
            StatementKind::Return { line } => self.lower_return(*line, span),
            StatementKind::Goto { line } => self.lower_goto(*line, span),
            StatementKind::GotoLabel { label } => self.lower_goto_label(label, span),
            StatementKind::Label { name } => self.lower_label_stmt(name, span),
            StatementKind::Swap { left, right } => self.lower_swap(left, right, span),
            StatementKind::Open {
                filename,
                file_number,
                mode,
                access,
                lock,
                record_len,
            } => self.lower_open(
                filename,
                file_number,
                *mode,
                *access,
                *lock,
                record_len.as_ref(),
                span,
            ),
            StatementKind::Close { file_numbers } => self.lower_close(file_numbers, span),
            StatementKind::Field { file_number, parts } => {
                self.lower_field(file_number, parts, span)
            }
            StatementKind::Put {
                file_number,
                record,
            } => self.lower_put_get(OpCode::Putf, file_number, record.as_ref(), span),
            StatementKind::Get {
                file_number,
                record,
            } => self.lower_put_get(OpCode::Getf, file_number, record.as_ref(), span),
            StatementKind::MidStmt {
                target,
                start,
                len,
                replacement,
            } => self.lower_mid_stmt(target, start, len.as_ref(), replacement, span),
            StatementKind::Randomize { seed } => self.lower_randomize(seed, span),
            StatementKind::RandomizeTimer => {
                self.emit(span, OpCode::RandomizeTimer, NULL_ID, NULL_ID, NULL_ID);
                Ok(())
            }
            StatementKind::DefType { data_type, ranges } => {
                self.lower_deftype(*data_type, ranges);
                Ok(())
            }
            StatementKind::Lset { target, value } => self.lower_lset(target, value, span),
            StatementKind::Rset { target, value } => self.lower_rset(target, value, span),
            StatementKind::Input { prompt, vars } => self.lower_input(prompt.as_ref(), vars, span),
            StatementKind::InputHash { file_number, vars } => {
                self.lower_input_hash(file_number, vars, span)
            }
            StatementKind::LineInput { prompt, var } => {
                self.lower_line_input(prompt.as_ref(), var, span)
            }
            StatementKind::LineInputHash { file_number, var } => {
                self.lower_line_input_hash(file_number, var, span)
            }
            StatementKind::Read { vars } => self.lower_read(vars, span),
            StatementKind::Restore => {
                self.emit(span, OpCode::Restore, NULL_ID, NULL_ID, NULL_ID);
                Ok(())
            }
            StatementKind::Data { values } => self.lower_data(values, span),
            StatementKind::Ref { src, dst } => self.lower_ref(src, dst, span),
            StatementKind::ArrayFill { array, value } => self.lower_array_fill(array, value, span),
            StatementKind::Array1dSort { array } => self.lower_array1d_sort(array, span),
            StatementKind::ArrayCopy { src, dst } => self.lower_array_copy(src, dst, span),
            StatementKind::Array1dCopy {
                src,
                src0,
                dst,
                dst0,
                len,
            } => self.lower_array1d_copy(src, src0, dst, dst0, len, span),
            StatementKind::Array2dShiftHor { array, by } => {
                self.lower_array2d_shift(OpCode::Array2dShiftHor, array, by, span)
            }
            StatementKind::Array2dShiftVer { array, by } => {
                self.lower_array2d_shift(OpCode::Array2dShiftVer, array, by, span)
            }
            StatementKind::Screen {
                title,
                width,
                height,
                manual_repaint,
            } => self.lower_screen(title, width, height, *manual_repaint, span),
            StatementKind::Repaint => {
                self.assert_graphics(span)?;
                self.emit(span, OpCode::Repaint, NULL_ID, NULL_ID, NULL_ID);
                Ok(())
            }
            StatementKind::Circle {
                x,
                y,
                r1,
                r2,
                start,
                end,
                fill,
            } => self.lower_circle(x, y, r1, r2, start.as_ref(), end.as_ref(), fill.as_ref(), span),
            StatementKind::DrawLine { x1, y1, x2, y2, bf } => {
                self.lower_draw_line(x1, y1, x2, y2, bf.as_ref(), span)
            }
            StatementKind::Color { r, g, b } => self.lower_color(r, g, b, span),
            StatementKind::Paint { x, y, r, g, b } => self.lower_paint(x, y, r, g, b, span),
            StatementKind::Pset { x, y, r, g, b } => {
                self.lower_pset(x, y, r.as_ref(), g.as_ref(), b.as_ref(), span)
            }
            StatementKind::GraphicsGet {
                x1,
                y1,
                x2,
                y2,
                target,
            } => self.lower_graphics_get(x1, y1, x2, y2, target, span),
            StatementKind::GraphicsPut {
                x,
                y,
                source,
                action,
            } => self.lower_graphics_put(x, y, source, action.as_ref(), span),
            StatementKind::Draw { path } => self.lower_draw(path, span),
            StatementKind::Font { name, style, size } => self.lower_font(name, style, size, span),
            StatementKind::DrawStr { text, x, y } => self.lower_draw_str(text, x, y, span),
            StatementKind::LoadImg { path, target } => {
                self.lower_img(OpCode::LoadImg, path, target, span)
            }
            StatementKind::SaveImg { path, source } => {
                self.lower_img(OpCode::SaveImg, path, source, span)
            }
            StatementKind::Cls => {
                self.assert_graphics(span)?;
                self.emit(span, OpCode::Cls, NULL_ID, NULL_ID, NULL_ID);
                Ok(())
            }
            StatementKind::Beep => {
                self.assert_graphics(span)?;
                self.emit(span, OpCode::Beep, NULL_ID, NULL_ID, NULL_ID);
                Ok(())
            }
            StatementKind::Sleep { millis } => self.lower_sleep(millis, span),
            StatementKind::LoadWav { path, target } => self.lower_load_wav(path, target, span),
            StatementKind::PlayWav { source } => self.lower_wav_op(OpCode::PlayWav, source, span),
            StatementKind::StopWav { source } => self.lower_wav_op(OpCode::StopWav, source, span),
            StatementKind::LoopWav { source } => self.lower_wav_op(OpCode::LoopWav, source, span),
        }
    }

    /// Post-walk balance checks, then hand the results over.
    fn finish(self) -> Result<Compilation, CompileError> {
        if !self.while_stack.is_empty() {
            return Err(SemanticError::new(
                ErrorKind::WhileWithoutWend,
                "<end of program>",
                "WHILE without WEND",
            )
            .into());
        }
        if !self.for_stack.is_empty() {
            return Err(SemanticError::new(
                ErrorKind::ForWithoutNext,
                "<end of program>",
                "FOR without NEXT",
            )
            .into());
        }
        if !self.if_stack.is_empty() {
            return Err(SemanticError::new(
                ErrorKind::MismatchedEndIf,
                "<end of program>",
                "IF THEN BEGIN without END IF",
            )
            .into());
        }
        Ok(Compilation {
            ir: self.ir,
            symbols: self.symbols,
        })
    }

    // ========================================================================
    // Shared helpers
    // ========================================================================

    /// The source excerpt a span covers (best-effort).
    pub(crate) fn snippet(&self, span: Span) -> String {
        self.source
            .get(span.start..span.end)
            .unwrap_or_default()
            .to_string()
    }

    /// Appends an instruction at the current line.
    pub(crate) fn emit(
        &mut self,
        span: Span,
        opcode: OpCode,
        op1: SymbolId,
        op2: SymbolId,
        result: SymbolId,
    ) -> InstrIdx {
        self.ir
            .emit(SourceRef::new(self.current_line, span), opcode, op1, op2, result)
    }

    /// Shorthand for building a semantic error with the span's excerpt.
    pub(crate) fn semantic(
        &self,
        kind: ErrorKind,
        span: Span,
        reason: impl Into<String>,
    ) -> CompileError {
        SemanticError::new(kind, self.snippet(span), reason).into()
    }

    /// The data type of an entry's value. Labels reaching an expression
    /// position is a compiler bug.
    pub(crate) fn dt(&self, id: SymbolId) -> Result<DataType, CompileError> {
        self.symbols
            .data_type(id)
            .ok_or_else(|| InternalError::new(format!("no data type for symbol {}", id)).into())
    }

    /// Requires a numeric type.
    pub(crate) fn assert_numeric(&self, dt: DataType, span: Span) -> Result<(), CompileError> {
        if dt.is_numeric() {
            Ok(())
        } else {
            Err(self.semantic(
                ErrorKind::DataTypeMismatch,
                span,
                format!("expected a numeric expression, found {}", dt),
            ))
        }
    }

    /// Requires two numeric types.
    pub(crate) fn assert_numeric2(
        &self,
        dt1: DataType,
        dt2: DataType,
        span: Span,
    ) -> Result<(), CompileError> {
        self.assert_numeric(dt1, span)?;
        self.assert_numeric(dt2, span)
    }

    /// Requires a string type.
    pub(crate) fn assert_string(&self, dt: DataType, span: Span) -> Result<(), CompileError> {
        if dt.is_string() {
            Ok(())
        } else {
            Err(self.semantic(
                ErrorKind::DataTypeMismatch,
                span,
                format!("expected a string expression, found {}", dt),
            ))
        }
    }

    /// The promotion-lattice join, or a mismatch error if a string is
    /// involved.
    pub(crate) fn upcast(
        &self,
        dt1: DataType,
        dt2: DataType,
        span: Span,
    ) -> Result<DataType, CompileError> {
        dt1.upcast(dt2).ok_or_else(|| {
            self.semantic(
                ErrorKind::DataTypeMismatch,
                span,
                format!("{} does not combine with {}", dt1, dt2),
            )
        })
    }

    /// Rejects mixing exactly one string with one numeric operand.
    pub(crate) fn check_string_numeric_match(
        &self,
        dt1: DataType,
        dt2: DataType,
        span: Span,
    ) -> Result<(), CompileError> {
        if dt1.is_string() != dt2.is_string() {
            Err(self.semantic(
                ErrorKind::DataTypeMismatch,
                span,
                format!("data type {} mismatches with {}", dt1, dt2),
            ))
        } else {
            Ok(())
        }
    }

    /// A fresh temporary of the referent's type.
    pub(crate) fn tmp_compatible(&mut self, id: SymbolId) -> Result<SymbolId, CompileError> {
        self.symbols.add_tmp_compatible_with(id).ok_or_else(|| {
            InternalError::new(format!("symbol {} has no data type to copy", id)).into()
        })
    }

    /// Requires a Variable or ArrayRef entry (a storage operand).
    pub(crate) fn assert_storage(&self, id: SymbolId, span: Span) -> Result<(), CompileError> {
        match self.symbols.get(id) {
            Some(entry) if entry.is_storage() => Ok(()),
            Some(_) => Err(self.semantic(
                ErrorKind::BadArgument,
                span,
                "expected a variable or array element",
            )),
            None => Err(InternalError::new(format!("dangling symbol id {}", id)).into()),
        }
    }

    /// The VariableName behind a Variable or ArrayRef id, if any.
    pub(crate) fn variable_name_of(&self, id: SymbolId) -> Option<VariableName> {
        match self.symbols.get(id)? {
            SymbolEntry::Variable { name, .. } => Some(name.clone()),
            SymbolEntry::ArrayRef { variable } => self.variable_name_of(*variable),
            _ => None,
        }
    }

    /// Requires the variable behind `id` to have been LET or DIM'd.
    pub(crate) fn assert_defined(&self, id: SymbolId, span: Span) -> Result<(), CompileError> {
        match self.variable_name_of(id) {
            Some(name) if self.defined.contains(&name) => Ok(()),
            Some(name) => Err(self.semantic(
                ErrorKind::NotDefined,
                span,
                format!("variable {} used before it is defined", name),
            )),
            None => Err(self.semantic(
                ErrorKind::BadArgument,
                span,
                "expected a variable",
            )),
        }
    }

    /// Requires the graphics runtime to be configured.
    pub(crate) fn assert_graphics(&self, _span: Span) -> Result<(), CompileError> {
        if self.options.graphics {
            Ok(())
        } else {
            Err(InternalError::new("graphics runtime is not enabled").into())
        }
    }

    /// A temporary holding a line number, used as a GOTO/RETURN operand.
    pub(crate) fn linenum_operand(&mut self, line: u32) -> SymbolId {
        self.symbols.add_tmp_value(Value::Int32(line as i32))
    }

    /// A string temporary.
    pub(crate) fn str_tmp(&mut self, text: &str) -> SymbolId {
        self.symbols.add_tmp_value(Value::Str(text.to_string()))
    }

    /// An INT32 temporary with a preloaded value.
    pub(crate) fn int_tmp(&mut self, value: i32) -> SymbolId {
        self.symbols.add_tmp_value(Value::Int32(value))
    }
}
