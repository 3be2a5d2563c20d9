//! Statement lowering.
//!
//! Everything that is not an expression or a control-flow construct:
//! assignment, the PRINT family, declarations, file I/O, DATA/READ,
//! array statements, graphics and sound. Statements whose opcodes need
//! more than two operands push the extras through PARAM1/PARAM2; the
//! push count and order match each consumer's documented arity.

use super::{Lowerer, NULL_ID};
use crate::ast::{
    DataValue, Expr, FileAccessMode, FileOpenMode, LockMode, PrintItem, Span, VarRef,
};
use crate::error::{CompileError, ErrorKind};
use crate::ir::OpCode;
use crate::numbers;
use crate::symbols::{DataType, SymbolEntry, SymbolId, TypeSuffix, VariableName};

/// Record length used when OPEN has no LEN clause.
const DEFAULT_RECORD_LEN: i32 = 128;

impl<'src> Lowerer<'src> {
    // ========================================================================
    // Small expression helpers
    // ========================================================================

    /// Lowers an expression and requires it numeric.
    fn numeric_expr(&mut self, expr: &Expr, span: Span) -> Result<SymbolId, CompileError> {
        let id = self.lower_expr(expr)?;
        let dt = self.dt(id)?;
        self.assert_numeric(dt, span)?;
        Ok(id)
    }

    /// Lowers an expression and requires it string.
    fn string_expr(&mut self, expr: &Expr, span: Span) -> Result<SymbolId, CompileError> {
        let id = self.lower_expr(expr)?;
        let dt = self.dt(id)?;
        self.assert_string(dt, span)?;
        Ok(id)
    }

    /// Lowers a whole-array reference, checking definedness, optional
    /// rank, and optionally a numeric element type.
    pub(crate) fn array_variable(
        &mut self,
        var: &VarRef,
        rank: Option<usize>,
        numeric: bool,
        span: Span,
    ) -> Result<SymbolId, CompileError> {
        let id = self.lower_variable(var, span)?;
        self.assert_storage(id, span)?;
        self.assert_defined(id, span)?;
        let info = match self.symbols.get(id) {
            Some(SymbolEntry::Variable {
                array: Some(info), ..
            }) => info.clone(),
            _ => {
                return Err(self.semantic(
                    ErrorKind::BadArgument,
                    span,
                    "expected an array variable",
                ))
            }
        };
        if let Some(rank) = rank {
            if info.rank() != rank {
                return Err(self.semantic(
                    ErrorKind::BadArgument,
                    span,
                    format!("expected a {}-dimensional array", rank),
                ));
            }
        }
        if numeric {
            let dt = self.dt(id)?;
            self.assert_numeric(dt, span)?;
        }
        Ok(id)
    }

    // ========================================================================
    // Assignment and declarations
    // ========================================================================

    /// Lowers `[LET] target = value`.
    ///
    /// Numeric assignment across types routes the value through a COPY
    /// into a temporary of the target's type, so the stored cell always
    /// holds the declared type.
    pub(super) fn lower_let(
        &mut self,
        target: &VarRef,
        value: &Expr,
        span: Span,
    ) -> Result<(), CompileError> {
        let target_dt = self.symbols.resolve_type(&target.name, target.suffix);
        let target_name = VariableName::new(&target.name, target_dt);
        let existing_udf = self
            .symbols
            .lookup(&target_name)
            .map(|id| matches!(self.symbols.get(id), Some(SymbolEntry::Udf { .. })))
            .unwrap_or(false);
        if target_name.is_udf_name() || existing_udf {
            return Err(self.semantic(
                ErrorKind::BadAssignment,
                span,
                format!("cannot assign to function {}", target_name),
            ));
        }

        let target_id = self.lower_variable(target, span)?;
        let value_id = self.lower_expr(value)?;

        let lhs_dt = self.dt(target_id)?;
        let rhs_dt = self.dt(value_id)?;
        self.check_string_numeric_match(lhs_dt, rhs_dt, span)?;

        let value_id = if lhs_dt != rhs_dt {
            let coerced = self.symbols.add_tmp(lhs_dt);
            self.emit(span, OpCode::Copy, coerced, value_id, coerced);
            coerced
        } else {
            value_id
        };

        self.emit(span, OpCode::Assign, target_id, value_id, target_id);
        self.defined.insert(target_name);
        Ok(())
    }

    /// Lowers `DIM name(d1, ...)`.
    pub(super) fn lower_dim(
        &mut self,
        name: &str,
        suffix: Option<TypeSuffix>,
        dimensions: &[String],
        span: Span,
    ) -> Result<(), CompileError> {
        let snippet = self.snippet(span);
        let mut dims = Vec::with_capacity(dimensions.len());
        for text in dimensions {
            dims.push(numbers::parse_int32(text, 10, &snippet)?);
        }
        let dt = self.symbols.resolve_type(name, suffix);
        let var_name = VariableName::new(name, dt);
        let (id, _) = self.symbols.variable_or_udf(&var_name, |n| SymbolEntry::Variable {
            name: n.clone(),
            array: Some(crate::symbols::ArrayInfo {
                dimensions: Vec::new(),
            }),
        });
        if !self.symbols.set_array_dimensions(id, dims) {
            return Err(self.semantic(
                ErrorKind::BadArgument,
                span,
                format!("{} is a function and cannot be dimensioned", var_name),
            ));
        }
        self.defined.insert(var_name);
        Ok(())
    }

    /// Applies a DEFINT/DEFLNG/DEFSNG/DEFDBL/DEFSTR statement.
    pub(super) fn lower_deftype(&mut self, data_type: DataType, ranges: &[(char, char)]) {
        for &(from, to) in ranges {
            let from = from.to_ascii_uppercase();
            let to = to.to_ascii_uppercase();
            for letter in from..=to {
                self.symbols.set_default_data_type(letter, data_type);
            }
        }
    }

    // ========================================================================
    // PRINT family
    // ========================================================================

    /// Lowers `PRINT [#filenum,] items`.
    pub(super) fn lower_print(
        &mut self,
        file_number: Option<&Expr>,
        items: &[PrintItem],
        span: Span,
    ) -> Result<(), CompileError> {
        let file_id = match file_number {
            Some(expr) => Some(self.numeric_expr(expr, span)?),
            None => None,
        };

        let mut ends_with_newline = true;
        for item in items {
            match item {
                PrintItem::Expr(expr) => {
                    let id = self.lower_expr(expr)?;
                    self.emit(span, OpCode::Print, id, NULL_ID, NULL_ID);
                    ends_with_newline = true;
                }
                PrintItem::Separator => ends_with_newline = false,
            }
        }

        if ends_with_newline || file_id.is_some() {
            let newline = self.str_tmp("\n");
            self.emit(span, OpCode::Print, newline, NULL_ID, NULL_ID);
        }

        self.emit(span, OpCode::Flush, file_id.unwrap_or(NULL_ID), NULL_ID, NULL_ID);
        Ok(())
    }

    /// Lowers `PRINT [#filenum,] USING format; items`. Every item reuses
    /// the same format id.
    pub(super) fn lower_print_using(
        &mut self,
        file_number: Option<&Expr>,
        format: &Expr,
        items: &[PrintItem],
        span: Span,
    ) -> Result<(), CompileError> {
        let file_id = match file_number {
            Some(expr) => Some(self.numeric_expr(expr, span)?),
            None => None,
        };
        let format_id = self.lower_expr(format)?;

        let mut ends_with_newline = true;
        for item in items {
            match item {
                PrintItem::Expr(expr) => {
                    let id = self.lower_expr(expr)?;
                    self.emit(span, OpCode::PrintUsing, format_id, id, NULL_ID);
                    ends_with_newline = true;
                }
                PrintItem::Separator => ends_with_newline = false,
            }
        }

        if ends_with_newline || file_id.is_some() {
            let newline = self.str_tmp("\n");
            self.emit(span, OpCode::Print, newline, NULL_ID, NULL_ID);
        }

        self.emit(span, OpCode::Flush, file_id.unwrap_or(NULL_ID), NULL_ID, NULL_ID);
        Ok(())
    }

    /// Lowers `WRITE [#filenum,] exprs`: commas between items, always a
    /// trailing newline.
    pub(super) fn lower_write(
        &mut self,
        file_number: Option<&Expr>,
        exprs: &[Expr],
        span: Span,
    ) -> Result<(), CompileError> {
        let file_id = match file_number {
            Some(expr) => Some(self.numeric_expr(expr, span)?),
            None => None,
        };

        for (i, expr) in exprs.iter().enumerate() {
            let id = self.lower_expr(expr)?;
            self.emit(span, OpCode::Write, id, NULL_ID, NULL_ID);
            if i + 1 < exprs.len() {
                let comma = self.str_tmp(",");
                self.emit(span, OpCode::Print, comma, NULL_ID, NULL_ID);
            }
        }

        let newline = self.str_tmp("\n");
        self.emit(span, OpCode::Print, newline, NULL_ID, NULL_ID);
        self.emit(span, OpCode::Flush, file_id.unwrap_or(NULL_ID), NULL_ID, NULL_ID);
        Ok(())
    }

    // ========================================================================
    // SWAP, LSET, RSET, MID$
    // ========================================================================

    /// Lowers `SWAP a, b`. Operand types must match exactly.
    pub(super) fn lower_swap(
        &mut self,
        left: &VarRef,
        right: &VarRef,
        span: Span,
    ) -> Result<(), CompileError> {
        let left_id = self.lower_variable(left, span)?;
        let right_id = self.lower_variable(right, span)?;
        let dt1 = self.dt(left_id)?;
        let dt2 = self.dt(right_id)?;
        if dt1 != dt2 {
            return Err(self.semantic(
                ErrorKind::DataTypeMismatch,
                span,
                format!("{} doesn't match {}", dt1, dt2),
            ));
        }
        self.emit(span, OpCode::Swap, left_id, right_id, NULL_ID);
        Ok(())
    }

    /// Lowers `LSET var = expr`.
    pub(super) fn lower_lset(
        &mut self,
        target: &VarRef,
        value: &Expr,
        span: Span,
    ) -> Result<(), CompileError> {
        let target_id = self.lower_variable(target, span)?;
        self.assert_storage(target_id, span)?;
        let target_dt = self.dt(target_id)?;
        self.assert_string(target_dt, span)?;
        let value_id = self.string_expr(value, span)?;
        self.emit(span, OpCode::Lset, target_id, value_id, NULL_ID);
        Ok(())
    }

    /// Lowers `RSET var = expr`. The target must already be defined.
    pub(super) fn lower_rset(
        &mut self,
        target: &VarRef,
        value: &Expr,
        span: Span,
    ) -> Result<(), CompileError> {
        let target_id = self.lower_variable(target, span)?;
        self.assert_storage(target_id, span)?;
        self.assert_defined(target_id, span)?;
        let target_dt = self.dt(target_id)?;
        self.assert_string(target_dt, span)?;
        let value_id = self.string_expr(value, span)?;
        self.emit(span, OpCode::Rset, target_id, value_id, NULL_ID);
        Ok(())
    }

    /// Lowers `MID$(target, start [, len]) = replacement`.
    pub(super) fn lower_mid_stmt(
        &mut self,
        target: &VarRef,
        start: &Expr,
        len: Option<&Expr>,
        replacement: &Expr,
        span: Span,
    ) -> Result<(), CompileError> {
        let target_id = self.lower_variable(target, span)?;
        let start_id = self.numeric_expr(start, span)?;
        let len_id = match len {
            Some(expr) => self.numeric_expr(expr, span)?,
            None => self.int_tmp(-1),
        };
        let replacement_id = self.string_expr(replacement, span)?;

        self.assert_storage(target_id, span)?;
        self.assert_defined(target_id, span)?;
        let target_dt = self.dt(target_id)?;
        self.assert_string(target_dt, span)?;

        self.emit(span, OpCode::Param2, target_id, start_id, NULL_ID);
        self.emit(span, OpCode::MidDlrStmt, len_id, replacement_id, NULL_ID);
        Ok(())
    }

    // ========================================================================
    // Files
    // ========================================================================

    /// Lowers OPEN. The opcode takes (lockMode, recordLen); the other
    /// four operands arrive via two PARAM2 pushes: (filename,
    /// fileNumber) then (openMode, accessMode).
    #[allow(clippy::too_many_arguments)]
    pub(super) fn lower_open(
        &mut self,
        filename: &Expr,
        file_number: &str,
        mode: FileOpenMode,
        access: Option<FileAccessMode>,
        lock: Option<LockMode>,
        record_len: Option<&Expr>,
        span: Span,
    ) -> Result<(), CompileError> {
        let filename_id = self.string_expr(filename, span)?;
        let snippet = self.snippet(span);
        let file_number = numbers::parse_int32(file_number, 10, &snippet)?;
        let record_len_id = match record_len {
            Some(expr) => self.numeric_expr(expr, span)?,
            None => self.int_tmp(DEFAULT_RECORD_LEN),
        };
        let access = access.unwrap_or(FileAccessMode::ReadWrite);
        let lock = lock.unwrap_or(LockMode::Default);

        let file_number_id = self.int_tmp(file_number);
        self.emit(span, OpCode::Param2, filename_id, file_number_id, NULL_ID);
        let open_mode_id = self.str_tmp(mode.name());
        let access_mode_id = self.str_tmp(access.name());
        self.emit(span, OpCode::Param2, open_mode_id, access_mode_id, NULL_ID);
        let lock_mode_id = self.str_tmp(lock.name());
        self.emit(span, OpCode::Open, lock_mode_id, record_len_id, NULL_ID);
        Ok(())
    }

    /// Lowers `CLOSE [#n, ...]`: CLOSE_ALL when no numbers are listed,
    /// else one CLOSE per file number.
    pub(super) fn lower_close(
        &mut self,
        file_numbers: &[String],
        span: Span,
    ) -> Result<(), CompileError> {
        if file_numbers.is_empty() {
            self.emit(span, OpCode::CloseAll, NULL_ID, NULL_ID, NULL_ID);
            return Ok(());
        }
        let snippet = self.snippet(span);
        for text in file_numbers {
            let file_number = numbers::parse_int32(text, 10, &snippet)?;
            let id = self.int_tmp(file_number);
            self.emit(span, OpCode::Close, id, NULL_ID, NULL_ID);
        }
        Ok(())
    }

    /// Lowers FIELD: one PARAM2 per (variable, partLen), then FIELD with
    /// the file number and field count.
    pub(super) fn lower_field(
        &mut self,
        file_number: &Expr,
        parts: &[(VarRef, String)],
        span: Span,
    ) -> Result<(), CompileError> {
        let file_id = self.numeric_expr(file_number, span)?;
        let snippet = self.snippet(span);
        for (var, len_text) in parts {
            let part_len = numbers::parse_int32(len_text, 10, &snippet)?;
            let var_id = self.lower_variable(var, span)?;
            self.assert_storage(var_id, span)?;
            let len_id = self.int_tmp(part_len);
            self.emit(span, OpCode::Param2, var_id, len_id, NULL_ID);
        }
        let count_id = self.int_tmp(parts.len() as i32);
        self.emit(span, OpCode::Field, file_id, count_id, NULL_ID);
        Ok(())
    }

    /// Lowers `PUT`/`GET #filenum [, record]`.
    pub(super) fn lower_put_get(
        &mut self,
        opcode: OpCode,
        file_number: &str,
        record: Option<&Expr>,
        span: Span,
    ) -> Result<(), CompileError> {
        let snippet = self.snippet(span);
        let file_number = numbers::parse_int32(file_number, 10, &snippet)?;
        let record_id = match record {
            Some(expr) => self.numeric_expr(expr, span)?,
            None => NULL_ID,
        };
        let file_id = self.int_tmp(file_number);
        self.emit(span, opcode, file_id, record_id, NULL_ID);
        Ok(())
    }

    // ========================================================================
    // Input statements
    // ========================================================================

    /// Lowers `INPUT [prompt;] vars`.
    pub(super) fn lower_input(
        &mut self,
        prompt: Option<&Expr>,
        vars: &[VarRef],
        span: Span,
    ) -> Result<(), CompileError> {
        for var in vars {
            let var_id = self.lower_variable(var, span)?;
            self.assert_storage(var_id, span)?;
            self.emit(span, OpCode::Param1, var_id, NULL_ID, NULL_ID);
        }
        let prompt_id = match prompt {
            Some(expr) => self.string_expr(expr, span)?,
            None => self.str_tmp("?"),
        };
        self.emit(span, OpCode::Input, prompt_id, NULL_ID, NULL_ID);
        Ok(())
    }

    /// Lowers `INPUT #filenum, vars`.
    pub(super) fn lower_input_hash(
        &mut self,
        file_number: &Expr,
        vars: &[VarRef],
        span: Span,
    ) -> Result<(), CompileError> {
        for var in vars {
            let var_id = self.lower_variable(var, span)?;
            self.assert_storage(var_id, span)?;
            self.emit(span, OpCode::Param1, var_id, NULL_ID, NULL_ID);
        }
        let file_id = self.numeric_expr(file_number, span)?;
        self.emit(span, OpCode::Input, NULL_ID, file_id, NULL_ID);
        Ok(())
    }

    /// Lowers `LINE INPUT [prompt;] var`.
    pub(super) fn lower_line_input(
        &mut self,
        prompt: Option<&Expr>,
        var: &VarRef,
        span: Span,
    ) -> Result<(), CompileError> {
        let var_id = self.lower_variable(var, span)?;
        self.assert_storage(var_id, span)?;
        self.emit(span, OpCode::Param1, var_id, NULL_ID, NULL_ID);
        let prompt_id = match prompt {
            Some(expr) => self.string_expr(expr, span)?,
            None => self.str_tmp(""),
        };
        self.emit(span, OpCode::LineInput, prompt_id, NULL_ID, NULL_ID);
        Ok(())
    }

    /// Lowers `LINE INPUT #filenum, var`.
    pub(super) fn lower_line_input_hash(
        &mut self,
        file_number: &Expr,
        var: &VarRef,
        span: Span,
    ) -> Result<(), CompileError> {
        let var_id = self.lower_variable(var, span)?;
        self.assert_storage(var_id, span)?;
        self.emit(span, OpCode::Param1, var_id, NULL_ID, NULL_ID);
        let file_id = self.numeric_expr(file_number, span)?;
        self.emit(span, OpCode::LineInput, NULL_ID, file_id, NULL_ID);
        Ok(())
    }

    // ========================================================================
    // DATA / READ / RANDOMIZE
    // ========================================================================

    /// Lowers `READ vars`.
    pub(super) fn lower_read(&mut self, vars: &[VarRef], span: Span) -> Result<(), CompileError> {
        for var in vars {
            let var_id = self.lower_variable(var, span)?;
            self.assert_storage(var_id, span)?;
            self.emit(span, OpCode::Read, var_id, NULL_ID, NULL_ID);
        }
        Ok(())
    }

    /// Lowers `DATA values`: one DATA instruction per literal, feeding
    /// the interpreter's data pool in source order.
    pub(super) fn lower_data(
        &mut self,
        values: &[DataValue],
        span: Span,
    ) -> Result<(), CompileError> {
        for value in values {
            let id = match value {
                DataValue::Number(literal) => self.lower_number(literal, span)?,
                DataValue::Str(text) => self.str_tmp(text),
            };
            self.emit(span, OpCode::Data, id, NULL_ID, NULL_ID);
        }
        Ok(())
    }

    /// Lowers `RANDOMIZE seed`.
    pub(super) fn lower_randomize(&mut self, seed: &Expr, span: Span) -> Result<(), CompileError> {
        let seed_id = self.numeric_expr(seed, span)?;
        self.emit(span, OpCode::Randomize, seed_id, NULL_ID, NULL_ID);
        Ok(())
    }

    // ========================================================================
    // REF
    // ========================================================================

    /// Lowers `REF src AS dst`: dst becomes an alias of src. Kinds and
    /// data types must match, UDFs are rejected, and src must already
    /// be defined.
    pub(super) fn lower_ref(
        &mut self,
        src: &VarRef,
        dst: &VarRef,
        span: Span,
    ) -> Result<(), CompileError> {
        for var in [src, dst] {
            let dt = self.symbols.resolve_type(&var.name, var.suffix);
            let name = VariableName::new(&var.name, dt);
            if name.is_udf_name() {
                return Err(self.semantic(
                    ErrorKind::BadAssignment,
                    span,
                    "a function cannot be used with REF",
                ));
            }
        }
        let src_id = self.lower_variable(src, span)?;
        let dst_id = self.lower_variable(dst, span)?;
        self.assert_storage(src_id, span)?;
        self.assert_storage(dst_id, span)?;
        self.assert_defined(src_id, span)?;

        let src_is_array = self.is_whole_array(src_id);
        let dst_is_array = self.is_whole_array(dst_id);
        if src_is_array != dst_is_array {
            return Err(self.semantic(
                ErrorKind::DataTypeMismatch,
                span,
                "source kind is not compatible with destination kind",
            ));
        }
        let src_dt = self.dt(src_id)?;
        let dst_dt = self.dt(dst_id)?;
        if src_dt != dst_dt {
            return Err(self.semantic(
                ErrorKind::DataTypeMismatch,
                span,
                format!("data type {} mismatches with {}", src_dt, dst_dt),
            ));
        }
        self.emit(span, OpCode::VarRef, src_id, dst_id, NULL_ID);
        Ok(())
    }

    fn is_whole_array(&self, id: SymbolId) -> bool {
        matches!(
            self.symbols.get(id),
            Some(SymbolEntry::Variable { array: Some(_), .. })
        )
    }

    // ========================================================================
    // Array statements
    // ========================================================================

    /// Lowers `ARRAYFILL arr, value`.
    pub(super) fn lower_array_fill(
        &mut self,
        array: &VarRef,
        value: &Expr,
        span: Span,
    ) -> Result<(), CompileError> {
        let array_id = self.array_variable(array, None, false, span)?;
        let value_id = self.numeric_expr(value, span)?;
        self.emit(span, OpCode::ArrayFill, array_id, value_id, NULL_ID);
        Ok(())
    }

    /// Lowers `ARRAY1DSORT arr`.
    pub(super) fn lower_array1d_sort(
        &mut self,
        array: &VarRef,
        span: Span,
    ) -> Result<(), CompileError> {
        let array_id = self.array_variable(array, Some(1), false, span)?;
        self.emit(span, OpCode::Array1dSort, array_id, NULL_ID, NULL_ID);
        Ok(())
    }

    /// Lowers `ARRAYCOPY src, dst`.
    pub(super) fn lower_array_copy(
        &mut self,
        src: &VarRef,
        dst: &VarRef,
        span: Span,
    ) -> Result<(), CompileError> {
        let src_id = self.array_variable(src, None, false, span)?;
        let dst_id = self.array_variable(dst, None, false, span)?;
        self.emit(span, OpCode::ArrayCopy, src_id, dst_id, NULL_ID);
        Ok(())
    }

    /// Lowers `ARRAY1DCOPY src, src0, dst, dst0, len`.
    pub(super) fn lower_array1d_copy(
        &mut self,
        src: &VarRef,
        src0: &Expr,
        dst: &VarRef,
        dst0: &Expr,
        len: &Expr,
        span: Span,
    ) -> Result<(), CompileError> {
        let src_id = self.array_variable(src, Some(1), false, span)?;
        let dst_id = self.array_variable(dst, Some(1), false, span)?;
        let src0_id = self.numeric_expr(src0, span)?;
        let dst0_id = self.numeric_expr(dst0, span)?;
        let len_id = self.numeric_expr(len, span)?;
        self.emit(span, OpCode::Param2, src_id, src0_id, NULL_ID);
        self.emit(span, OpCode::Param2, dst_id, dst0_id, NULL_ID);
        self.emit(span, OpCode::Array1dCopy, len_id, NULL_ID, NULL_ID);
        Ok(())
    }

    /// Lowers `ARRAY2DSHIFTHOR`/`ARRAY2DSHIFTVER arr, by`.
    pub(super) fn lower_array2d_shift(
        &mut self,
        opcode: OpCode,
        array: &VarRef,
        by: &Expr,
        span: Span,
    ) -> Result<(), CompileError> {
        let array_id = self.array_variable(array, Some(2), false, span)?;
        let by_id = self.numeric_expr(by, span)?;
        self.emit(span, opcode, array_id, by_id, NULL_ID);
        Ok(())
    }

    // ========================================================================
    // Graphics
    // ========================================================================

    /// Lowers `SCREEN title, w, h [, MANUALREPAINT]`.
    pub(super) fn lower_screen(
        &mut self,
        title: &Expr,
        width: &Expr,
        height: &Expr,
        manual_repaint: bool,
        span: Span,
    ) -> Result<(), CompileError> {
        self.assert_graphics(span)?;
        let title_id = self.string_expr(title, span)?;
        let width_id = self.numeric_expr(width, span)?;
        let height_id = self.numeric_expr(height, span)?;
        self.emit(span, OpCode::Param2, width_id, height_id, NULL_ID);
        let repaint_id = self.int_tmp(if manual_repaint { 0 } else { -1 });
        self.emit(span, OpCode::Screen, title_id, repaint_id, NULL_ID);
        Ok(())
    }

    /// Lowers CIRCLE: PARAM2 (x, y), PARAM2 (start, end), PARAM1 (fill),
    /// then CIRCLE (r1, r2).
    #[allow(clippy::too_many_arguments)]
    pub(super) fn lower_circle(
        &mut self,
        x: &Expr,
        y: &Expr,
        r1: &Expr,
        r2: &Expr,
        start: Option<&Expr>,
        end: Option<&Expr>,
        fill: Option<&Expr>,
        span: Span,
    ) -> Result<(), CompileError> {
        self.assert_graphics(span)?;
        let x_id = self.numeric_expr(x, span)?;
        let y_id = self.numeric_expr(y, span)?;
        let r1_id = self.numeric_expr(r1, span)?;
        let r2_id = self.numeric_expr(r2, span)?;
        let start_id = match start {
            Some(expr) => self.numeric_expr(expr, span)?,
            None => NULL_ID,
        };
        let end_id = match end {
            Some(expr) => self.numeric_expr(expr, span)?,
            None => NULL_ID,
        };
        let fill_id = match fill {
            Some(expr) => self.string_expr(expr, span)?,
            None => NULL_ID,
        };
        self.emit(span, OpCode::Param2, x_id, y_id, NULL_ID);
        self.emit(span, OpCode::Param2, start_id, end_id, NULL_ID);
        self.emit(span, OpCode::Param1, fill_id, NULL_ID, NULL_ID);
        self.emit(span, OpCode::Circle, r1_id, r2_id, NULL_ID);
        Ok(())
    }

    /// Lowers LINE: PARAM2 (x1, y1), PARAM2 (x2, y2), then LINE (bf).
    pub(super) fn lower_draw_line(
        &mut self,
        x1: &Expr,
        y1: &Expr,
        x2: &Expr,
        y2: &Expr,
        bf: Option<&Expr>,
        span: Span,
    ) -> Result<(), CompileError> {
        self.assert_graphics(span)?;
        let x1_id = self.numeric_expr(x1, span)?;
        let y1_id = self.numeric_expr(y1, span)?;
        let x2_id = self.numeric_expr(x2, span)?;
        let y2_id = self.numeric_expr(y2, span)?;
        let bf_id = match bf {
            Some(expr) => self.string_expr(expr, span)?,
            None => NULL_ID,
        };
        self.emit(span, OpCode::Param2, x1_id, y1_id, NULL_ID);
        self.emit(span, OpCode::Param2, x2_id, y2_id, NULL_ID);
        self.emit(span, OpCode::Line, bf_id, NULL_ID, NULL_ID);
        Ok(())
    }

    /// Lowers `COLOR r, g, b`.
    pub(super) fn lower_color(
        &mut self,
        r: &Expr,
        g: &Expr,
        b: &Expr,
        span: Span,
    ) -> Result<(), CompileError> {
        let r_id = self.numeric_expr(r, span)?;
        let g_id = self.numeric_expr(g, span)?;
        let b_id = self.numeric_expr(b, span)?;
        self.emit(span, OpCode::Param2, r_id, g_id, NULL_ID);
        self.emit(span, OpCode::Color, b_id, NULL_ID, NULL_ID);
        Ok(())
    }

    /// Lowers `PAINT (x, y), r, g, b`.
    pub(super) fn lower_paint(
        &mut self,
        x: &Expr,
        y: &Expr,
        r: &Expr,
        g: &Expr,
        b: &Expr,
        span: Span,
    ) -> Result<(), CompileError> {
        self.assert_graphics(span)?;
        let x_id = self.numeric_expr(x, span)?;
        let y_id = self.numeric_expr(y, span)?;
        let r_id = self.numeric_expr(r, span)?;
        let g_id = self.numeric_expr(g, span)?;
        let b_id = self.numeric_expr(b, span)?;
        self.emit(span, OpCode::Param2, r_id, g_id, NULL_ID);
        self.emit(span, OpCode::Param1, b_id, NULL_ID, NULL_ID);
        self.emit(span, OpCode::Paint, x_id, y_id, NULL_ID);
        Ok(())
    }

    /// Lowers `PSET (x, y) [, r, g, b]`.
    pub(super) fn lower_pset(
        &mut self,
        x: &Expr,
        y: &Expr,
        r: Option<&Expr>,
        g: Option<&Expr>,
        b: Option<&Expr>,
        span: Span,
    ) -> Result<(), CompileError> {
        self.assert_graphics(span)?;
        let x_id = self.numeric_expr(x, span)?;
        let y_id = self.numeric_expr(y, span)?;
        let r_id = match r {
            Some(expr) => self.numeric_expr(expr, span)?,
            None => NULL_ID,
        };
        let g_id = match g {
            Some(expr) => self.numeric_expr(expr, span)?,
            None => NULL_ID,
        };
        let b_id = match b {
            Some(expr) => self.numeric_expr(expr, span)?,
            None => NULL_ID,
        };
        self.emit(span, OpCode::Param2, r_id, g_id, NULL_ID);
        self.emit(span, OpCode::Param1, b_id, NULL_ID, NULL_ID);
        self.emit(span, OpCode::Pset, x_id, y_id, NULL_ID);
        Ok(())
    }

    /// Lowers graphics `GET (x1, y1) - (x2, y2), arr`.
    pub(super) fn lower_graphics_get(
        &mut self,
        x1: &Expr,
        y1: &Expr,
        x2: &Expr,
        y2: &Expr,
        target: &VarRef,
        span: Span,
    ) -> Result<(), CompileError> {
        self.assert_graphics(span)?;
        let x1_id = self.numeric_expr(x1, span)?;
        let y1_id = self.numeric_expr(y1, span)?;
        let x2_id = self.numeric_expr(x2, span)?;
        let y2_id = self.numeric_expr(y2, span)?;
        let target_id = self.lower_variable(target, span)?;
        self.assert_storage(target_id, span)?;
        self.assert_defined(target_id, span)?;
        self.emit(span, OpCode::Param2, x1_id, y1_id, NULL_ID);
        self.emit(span, OpCode::Param2, x2_id, y2_id, NULL_ID);
        self.emit(span, OpCode::Gget, target_id, NULL_ID, NULL_ID);
        Ok(())
    }

    /// Lowers graphics `PUT (x, y), arr [, action]`.
    pub(super) fn lower_graphics_put(
        &mut self,
        x: &Expr,
        y: &Expr,
        source: &VarRef,
        action: Option<&Expr>,
        span: Span,
    ) -> Result<(), CompileError> {
        self.assert_graphics(span)?;
        let x_id = self.numeric_expr(x, span)?;
        let y_id = self.numeric_expr(y, span)?;
        let source_id = self.lower_variable(source, span)?;
        self.assert_storage(source_id, span)?;
        self.assert_defined(source_id, span)?;
        let action_id = match action {
            Some(expr) => self.string_expr(expr, span)?,
            None => NULL_ID,
        };
        self.emit(span, OpCode::Param2, x_id, y_id, NULL_ID);
        self.emit(span, OpCode::Gput, action_id, source_id, NULL_ID);
        Ok(())
    }

    /// Lowers `DRAW path$`.
    pub(super) fn lower_draw(&mut self, path: &Expr, span: Span) -> Result<(), CompileError> {
        self.assert_graphics(span)?;
        let path_id = self.string_expr(path, span)?;
        self.emit(span, OpCode::Draw, path_id, NULL_ID, NULL_ID);
        Ok(())
    }

    /// Lowers `FONT name$, style$, size`.
    pub(super) fn lower_font(
        &mut self,
        name: &Expr,
        style: &Expr,
        size: &Expr,
        span: Span,
    ) -> Result<(), CompileError> {
        self.assert_graphics(span)?;
        let name_id = self.string_expr(name, span)?;
        let style_id = self.string_expr(style, span)?;
        let size_id = self.numeric_expr(size, span)?;
        self.emit(span, OpCode::Param2, style_id, size_id, NULL_ID);
        self.emit(span, OpCode::Font, name_id, NULL_ID, NULL_ID);
        Ok(())
    }

    /// Lowers `DRAWSTR text$, x, y`.
    pub(super) fn lower_draw_str(
        &mut self,
        text: &Expr,
        x: &Expr,
        y: &Expr,
        span: Span,
    ) -> Result<(), CompileError> {
        let text_id = self.string_expr(text, span)?;
        let x_id = self.numeric_expr(x, span)?;
        let y_id = self.numeric_expr(y, span)?;
        self.emit(span, OpCode::Param2, x_id, y_id, NULL_ID);
        self.emit(span, OpCode::DrawStr, text_id, NULL_ID, NULL_ID);
        Ok(())
    }

    /// Lowers `LOADIMG`/`SAVEIMG path$, arr`.
    pub(super) fn lower_img(
        &mut self,
        opcode: OpCode,
        path: &Expr,
        var: &VarRef,
        span: Span,
    ) -> Result<(), CompileError> {
        self.assert_graphics(span)?;
        let path_id = self.string_expr(path, span)?;
        let var_id = self.lower_variable(var, span)?;
        self.assert_storage(var_id, span)?;
        self.assert_defined(var_id, span)?;
        self.emit(span, opcode, path_id, var_id, NULL_ID);
        Ok(())
    }

    /// Lowers `SLEEP millis`.
    pub(super) fn lower_sleep(&mut self, millis: &Expr, span: Span) -> Result<(), CompileError> {
        let millis_id = self.numeric_expr(millis, span)?;
        self.emit(span, OpCode::Sleep, millis_id, NULL_ID, NULL_ID);
        Ok(())
    }

    // ========================================================================
    // Sound
    // ========================================================================

    /// Lowers `LOADWAV path$, var`: the variable receives the clip
    /// handle and counts as defined afterwards.
    pub(super) fn lower_load_wav(
        &mut self,
        path: &Expr,
        target: &VarRef,
        span: Span,
    ) -> Result<(), CompileError> {
        self.assert_graphics(span)?;
        let path_id = self.string_expr(path, span)?;
        let target_id = self.lower_variable(target, span)?;
        self.assert_storage(target_id, span)?;
        self.emit(span, OpCode::LoadWav, path_id, target_id, NULL_ID);
        if let Some(name) = self.variable_name_of(target_id) {
            self.defined.insert(name);
        }
        Ok(())
    }

    /// Lowers `PLAYWAV`/`STOPWAV`/`LOOPWAV var`. The handle variable
    /// must have been loaded (defined) first.
    pub(super) fn lower_wav_op(
        &mut self,
        opcode: OpCode,
        source: &VarRef,
        span: Span,
    ) -> Result<(), CompileError> {
        self.assert_graphics(span)?;
        let source_id = self.lower_variable(source, span)?;
        self.assert_storage(source_id, span)?;
        self.assert_defined(source_id, span)?;
        self.emit(span, opcode, source_id, NULL_ID, NULL_ID);
        Ok(())
    }
}
