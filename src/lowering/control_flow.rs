//! Control-flow lowering.
//!
//! Structured constructs compile down to conditional and unconditional
//! gotos over labels. Forward targets are unknown when a construct
//! opens, so the opening statement records the instruction positions to
//! patch and pushes a state onto the matching stack; the closing
//! statement pops it, emits the trailing labels, and back-patches.
//!
//! The emitted shapes (single-line IF, IF THEN BEGIN, WHILE/WEND,
//! FOR/NEXT, GOSUB/RETURN, DEF FN) are documented per method.

use super::expressions::{arith_opcode, compare_opcode, ArithFamily, Rel};
use super::{Lowerer, NULL_ID};
use crate::ast::{Expr, IfBody, Span, VarRef};
use crate::error::{CompileError, ErrorKind};
use crate::ir::{InstrIdx, OpCode};
use crate::symbols::{DataType, SymbolEntry, SymbolId, VariableName};

/// Per-UDF lowering state: where calls jump to.
#[derive(Debug, Clone, Copy)]
pub(crate) struct UdfState {
    /// Label at the start of the function body.
    pub label_func_start: SymbolId,
}

/// An open WHILE.
#[derive(Debug)]
pub(crate) struct WhileState {
    /// Label re-entered by WEND.
    label_before_while: SymbolId,
    /// The conditional exit jump, patched to the label after WEND.
    goto_after_wend: InstrIdx,
}

/// An open FOR.
#[derive(Debug)]
pub(crate) struct ForState {
    /// The loop variable, for NEXT matching.
    variable: VariableName,
    /// Label NEXT jumps back to (the step application).
    label_apply_step: SymbolId,
    /// The exit jump, patched to the label after NEXT.
    goto_after_next: InstrIdx,
}

/// An open IF THEN BEGIN.
#[derive(Debug)]
pub(crate) struct IfState {
    /// The condition-false jump, patched at END IF.
    goto_false: InstrIdx,
    /// The jump from the end of the THEN arm past the ELSE arm.
    goto_after: Option<InstrIdx>,
    /// Label opening the ELSE arm, if one was seen.
    label_before_else: Option<SymbolId>,
}

impl<'src> Lowerer<'src> {
    // ========================================================================
    // Single-line IF
    // ========================================================================

    /// Lowers `IF cond THEN ... [ELSE ...]`.
    ///
    /// ```text
    ///   <cond>
    ///   GOTO_LABEL_IF cond -> L_then
    ///   GOTO_LABEL -> L_after_then | L_before_else     ; patched
    ///   LABEL L_then
    ///   <then>
    ///   GOTO_LABEL -> L_after_then | L_after_else      ; patched
    ///   LABEL L_after_then
    ///   [LABEL L_before_else, <else>, LABEL L_after_else]
    /// ```
    pub(super) fn lower_if(
        &mut self,
        condition: &Expr,
        then_body: &IfBody,
        else_body: Option<&IfBody>,
        span: Span,
    ) -> Result<(), CompileError> {
        let cond_id = self.lower_expr(condition)?;

        let label_then = self.symbols.add_label();
        self.emit(span, OpCode::GotoLabelIf, cond_id, label_then, NULL_ID);
        let false_target = self.symbols.add_goto_target();
        let goto_false = self.emit(span, OpCode::GotoLabel, false_target, NULL_ID, NULL_ID);
        self.emit(span, OpCode::Label, label_then, NULL_ID, NULL_ID);

        self.lower_if_body(then_body, span)?;

        let after_target = self.symbols.add_goto_target();
        let goto_after = self.emit(span, OpCode::GotoLabel, after_target, NULL_ID, NULL_ID);
        let label_after_then = self.symbols.add_label();
        self.emit(span, OpCode::Label, label_after_then, NULL_ID, NULL_ID);

        match else_body {
            None => {
                self.ir.patch_op1(goto_false, label_after_then);
                self.ir.patch_op1(goto_after, label_after_then);
            }
            Some(body) => {
                let label_before_else = self.symbols.add_label();
                self.emit(span, OpCode::Label, label_before_else, NULL_ID, NULL_ID);
                self.lower_if_body(body, span)?;
                let label_after_else = self.symbols.add_label();
                self.emit(span, OpCode::Label, label_after_else, NULL_ID, NULL_ID);
                self.ir.patch_op1(goto_false, label_before_else);
                self.ir.patch_op1(goto_after, label_after_else);
            }
        }
        Ok(())
    }

    fn lower_if_body(&mut self, body: &IfBody, span: Span) -> Result<(), CompileError> {
        match body {
            IfBody::LineNumber(line) => {
                let target = self.linenum_operand(*line);
                self.emit(span, OpCode::GotoLineNum, target, NULL_ID, NULL_ID);
                Ok(())
            }
            IfBody::Statements(statements) => {
                for statement in statements {
                    self.lower_statement(statement)?;
                }
                Ok(())
            }
        }
    }

    // ========================================================================
    // IF THEN BEGIN ... ELSE BEGIN ... END IF
    // ========================================================================

    /// Opens a multi-line IF.
    pub(super) fn lower_if_then_begin(
        &mut self,
        condition: &Expr,
        span: Span,
    ) -> Result<(), CompileError> {
        let cond_id = self.lower_expr(condition)?;
        let label_then = self.symbols.add_label();
        self.emit(span, OpCode::GotoLabelIf, cond_id, label_then, NULL_ID);
        let false_target = self.symbols.add_goto_target();
        let goto_false = self.emit(span, OpCode::GotoLabel, false_target, NULL_ID, NULL_ID);
        self.emit(span, OpCode::Label, label_then, NULL_ID, NULL_ID);
        self.if_stack.push(IfState {
            goto_false,
            goto_after: None,
            label_before_else: None,
        });
        Ok(())
    }

    /// Switches the innermost open IF into its ELSE arm.
    pub(super) fn lower_else_begin(&mut self, span: Span) -> Result<(), CompileError> {
        if self.if_stack.is_empty() {
            return Err(self.semantic(
                ErrorKind::MismatchedElseBegin,
                span,
                "ELSE BEGIN without IF THEN BEGIN",
            ));
        }
        let after_target = self.symbols.add_goto_target();
        let goto_after = self.emit(span, OpCode::GotoLabel, after_target, NULL_ID, NULL_ID);
        let label_after_then = self.symbols.add_label();
        self.emit(span, OpCode::Label, label_after_then, NULL_ID, NULL_ID);
        let label_before_else = self.symbols.add_label();
        self.emit(span, OpCode::Label, label_before_else, NULL_ID, NULL_ID);

        let state = self.if_stack.last_mut().expect("checked non-empty");
        state.goto_after = Some(goto_after);
        state.label_before_else = Some(label_before_else);
        Ok(())
    }

    /// Closes the innermost open IF, patching all pending jumps.
    pub(super) fn lower_end_if(&mut self, span: Span) -> Result<(), CompileError> {
        let state = self.if_stack.pop().ok_or_else(|| {
            self.semantic(
                ErrorKind::MismatchedEndIf,
                span,
                "END IF without IF THEN BEGIN",
            )
        })?;

        match state.label_before_else {
            None => {
                let after_target = self.symbols.add_goto_target();
                let goto_after = self.emit(span, OpCode::GotoLabel, after_target, NULL_ID, NULL_ID);
                let label_after_then = self.symbols.add_label();
                self.emit(span, OpCode::Label, label_after_then, NULL_ID, NULL_ID);
                let label_after_else = self.symbols.add_label();
                self.emit(span, OpCode::Label, label_after_else, NULL_ID, NULL_ID);
                self.ir.patch_op1(state.goto_false, label_after_then);
                self.ir.patch_op1(goto_after, label_after_then);
            }
            Some(label_before_else) => {
                let label_after_else = self.symbols.add_label();
                self.emit(span, OpCode::Label, label_after_else, NULL_ID, NULL_ID);
                self.ir.patch_op1(state.goto_false, label_before_else);
                let goto_after = state
                    .goto_after
                    .expect("ELSE BEGIN always records its exit jump");
                self.ir.patch_op1(goto_after, label_after_else);
            }
        }
        Ok(())
    }

    // ========================================================================
    // WHILE / WEND
    // ========================================================================

    /// Opens a WHILE loop.
    ///
    /// ```text
    ///   LABEL L_before
    ///   <cond>
    ///   NOT cond -> t
    ///   GOTO_LABEL_IF t -> L_after_wend                ; patched at WEND
    /// ```
    pub(super) fn lower_while(&mut self, condition: &Expr, span: Span) -> Result<(), CompileError> {
        let label_before_while = self.symbols.add_label();
        self.emit(span, OpCode::Label, label_before_while, NULL_ID, NULL_ID);

        let cond_id = self.lower_expr(condition)?;
        let negated = self.symbols.add_tmp(DataType::Int64);
        self.emit(span, OpCode::Not, cond_id, NULL_ID, negated);
        let exit_target = self.symbols.add_goto_target();
        let goto_after_wend = self.emit(span, OpCode::GotoLabelIf, negated, exit_target, NULL_ID);

        self.while_stack.push(WhileState {
            label_before_while,
            goto_after_wend,
        });
        Ok(())
    }

    /// Closes the innermost WHILE.
    pub(super) fn lower_wend(&mut self, span: Span) -> Result<(), CompileError> {
        let state = self.while_stack.pop().ok_or_else(|| {
            self.semantic(ErrorKind::WendWithoutWhile, span, "WEND without WHILE")
        })?;
        self.emit(
            span,
            OpCode::GotoLabel,
            state.label_before_while,
            NULL_ID,
            NULL_ID,
        );
        let label_after_wend = self.symbols.add_label();
        self.emit(span, OpCode::Label, label_after_wend, NULL_ID, NULL_ID);
        self.ir.patch_op2(state.goto_after_wend, label_after_wend);
        Ok(())
    }

    // ========================================================================
    // FOR / NEXT
    // ========================================================================

    /// Opens a FOR loop.
    ///
    /// The exit condition `(step >= 0 AND var > end) OR (step < 0 AND
    /// var < end)` runs before the first iteration and after every step
    /// application, so equal init/end runs the body once regardless of
    /// step sign and an empty range skips entirely.
    pub(super) fn lower_for(
        &mut self,
        var: &VarRef,
        init: &Expr,
        end: &Expr,
        step: Option<&Expr>,
        span: Span,
    ) -> Result<(), CompileError> {
        let var_id = self.lower_variable(var, span)?;
        let variable = match self.symbols.get(var_id) {
            Some(SymbolEntry::Variable { name, .. }) => name.clone(),
            _ => {
                return Err(self.semantic(
                    ErrorKind::BadArgument,
                    span,
                    "FOR loop variable must be a scalar variable",
                ))
            }
        };
        let var_dt = self.dt(var_id)?;
        if var_dt.is_string() {
            return Err(self.semantic(
                ErrorKind::DataTypeMismatch,
                span,
                "FOR loop variable must be numeric",
            ));
        }

        let init_id = self.lower_expr(init)?;
        let end_id = self.lower_expr(end)?;
        let init_dt = self.dt(init_id)?;
        let end_dt = self.dt(end_id)?;
        self.assert_numeric2(init_dt, end_dt, span)?;

        // stepCopy = step, or the constant 1
        let step_id = match step {
            Some(step_expr) => {
                let raw = self.lower_expr(step_expr)?;
                let raw_dt = self.dt(raw)?;
                self.assert_numeric(raw_dt, span)?;
                let copy = self.tmp_compatible(raw)?;
                self.emit(span, OpCode::Copy, copy, raw, copy);
                copy
            }
            None => {
                let one = self.int_tmp(1);
                self.emit(span, OpCode::Value, one, NULL_ID, one);
                one
            }
        };

        // var = init
        self.emit(span, OpCode::Assign, var_id, init_id, var_id);
        // endCopy = end
        let end_copy = self.tmp_compatible(end_id)?;
        self.emit(span, OpCode::Assign, end_copy, end_id, end_copy);

        // Jump over the step application on the first pass.
        let check_target = self.symbols.add_goto_target();
        let goto_check = self.emit(span, OpCode::GotoLabel, check_target, NULL_ID, NULL_ID);

        // L_apply_step: var = var + step (typed by the loop variable)
        let label_apply_step = self.symbols.add_label();
        self.emit(span, OpCode::Label, label_apply_step, NULL_ID, NULL_ID);
        let stepped = self.tmp_compatible(var_id)?;
        let add_op = arith_opcode(ArithFamily::Add, var_dt)?;
        self.emit(span, add_op, var_id, step_id, stepped);
        self.emit(span, OpCode::Assign, var_id, stepped, var_id);

        // L_check: (step >= 0 AND var > end) OR (step < 0 AND var < end)
        let label_check = self.symbols.add_label();
        self.emit(span, OpCode::Label, label_check, NULL_ID, NULL_ID);
        self.ir.patch_op1(goto_check, label_check);

        let step_dt = self.dt(step_id)?;
        let end_copy_dt = self.dt(end_copy)?;
        let zero = self.int_tmp(0);

        let step_ge_zero = self.symbols.add_tmp(DataType::Int32);
        let ge_op = compare_opcode(Rel::Ge, step_dt, DataType::Int32)?;
        self.emit(span, ge_op, step_id, zero, step_ge_zero);

        let var_gt_end = self.symbols.add_tmp(DataType::Int32);
        let gt_op = compare_opcode(Rel::Gt, var_dt, end_copy_dt)?;
        self.emit(span, gt_op, var_id, end_copy, var_gt_end);

        let ascending_done = self.symbols.add_tmp(DataType::Int32);
        self.emit(span, OpCode::And, step_ge_zero, var_gt_end, ascending_done);

        let step_lt_zero = self.symbols.add_tmp(DataType::Int32);
        let lt_op = compare_opcode(Rel::Lt, step_dt, DataType::Int32)?;
        self.emit(span, lt_op, step_id, zero, step_lt_zero);

        let var_lt_end = self.symbols.add_tmp(DataType::Int32);
        let lt_end_op = compare_opcode(Rel::Lt, var_dt, end_copy_dt)?;
        self.emit(span, lt_end_op, var_id, end_copy, var_lt_end);

        let descending_done = self.symbols.add_tmp(DataType::Int32);
        self.emit(span, OpCode::And, step_lt_zero, var_lt_end, descending_done);

        let done = self.symbols.add_tmp(DataType::Int32);
        self.emit(span, OpCode::Or, ascending_done, descending_done, done);

        let exit_target = self.symbols.add_goto_target();
        let goto_after_next = self.emit(span, OpCode::GotoLabelIf, done, exit_target, NULL_ID);

        self.for_stack.push(ForState {
            variable,
            label_apply_step,
            goto_after_next,
        });
        Ok(())
    }

    /// Closes one or more FOR loops.
    ///
    /// A bare NEXT closes the innermost loop; `NEXT I, J` closes one
    /// loop per listed variable, innermost first, and each must match.
    pub(super) fn lower_next(&mut self, vars: &[VarRef], span: Span) -> Result<(), CompileError> {
        let mut states = Vec::with_capacity(vars.len().max(1));
        if vars.is_empty() {
            let state = self.for_stack.pop().ok_or_else(|| {
                self.semantic(ErrorKind::NextWithoutFor, span, "NEXT without FOR")
            })?;
            states.push(state);
        } else {
            for var in vars {
                let (id, _) = self.resolve_variable(var);
                let variable = match self.symbols.get(id) {
                    Some(SymbolEntry::Variable { name, .. }) => name.clone(),
                    _ => {
                        return Err(self.semantic(
                            ErrorKind::BadArgument,
                            span,
                            "NEXT expects a scalar variable",
                        ))
                    }
                };
                let state = self.for_stack.pop().ok_or_else(|| {
                    self.semantic(ErrorKind::NextWithoutFor, span, "NEXT without FOR")
                })?;
                if state.variable != variable {
                    return Err(self.semantic(
                        ErrorKind::NextWithoutFor,
                        span,
                        format!("NEXT {} without FOR", variable),
                    ));
                }
                states.push(state);
            }
        }

        for state in states {
            self.emit(
                span,
                OpCode::GotoLabel,
                state.label_apply_step,
                NULL_ID,
                NULL_ID,
            );
            let label_after_next = self.symbols.add_label();
            self.emit(span, OpCode::Label, label_after_next, NULL_ID, NULL_ID);
            self.ir.patch_op2(state.goto_after_next, label_after_next);
        }
        Ok(())
    }

    // ========================================================================
    // GOSUB / RETURN / GOTO / LABEL
    // ========================================================================

    /// Lowers `GOSUB linenum`.
    pub(super) fn lower_gosub(&mut self, line: u32, span: Span) -> Result<(), CompileError> {
        let ret_target = self.symbols.add_goto_target();
        let push_ret = self.emit(span, OpCode::PushRetLabel, ret_target, NULL_ID, NULL_ID);
        let line_id = self.linenum_operand(line);
        self.emit(span, OpCode::GotoLineNum, line_id, NULL_ID, NULL_ID);
        let label_return = self.symbols.add_label();
        self.emit(span, OpCode::Label, label_return, NULL_ID, NULL_ID);
        self.ir.patch_op1(push_ret, label_return);
        Ok(())
    }

    /// Lowers `GOSUB "label"`.
    pub(super) fn lower_gosub_label(&mut self, label: &str, span: Span) -> Result<(), CompileError> {
        let target = self.symbols.add_named_label(label);
        let ret_target = self.symbols.add_goto_target();
        let push_ret = self.emit(span, OpCode::PushRetLabel, ret_target, NULL_ID, NULL_ID);
        self.emit(span, OpCode::GotoLabel, target, NULL_ID, NULL_ID);
        let label_return = self.symbols.add_label();
        self.emit(span, OpCode::Label, label_return, NULL_ID, NULL_ID);
        self.ir.patch_op1(push_ret, label_return);
        Ok(())
    }

    /// Lowers `RETURN [linenum]`. A bare RETURN jumps to the pushed
    /// return label; an explicit line number drops the pushed label and
    /// jumps there instead.
    pub(super) fn lower_return(&mut self, line: Option<u32>, span: Span) -> Result<(), CompileError> {
        let op1 = match line {
            Some(line) => self.linenum_operand(line),
            None => NULL_ID,
        };
        self.emit(span, OpCode::Return, op1, NULL_ID, NULL_ID);
        Ok(())
    }

    /// Lowers `GOTO linenum`.
    pub(super) fn lower_goto(&mut self, line: u32, span: Span) -> Result<(), CompileError> {
        let line_id = self.linenum_operand(line);
        self.emit(span, OpCode::GotoLineNum, line_id, NULL_ID, NULL_ID);
        Ok(())
    }

    /// Lowers `GOTO "label"`.
    pub(super) fn lower_goto_label(&mut self, label: &str, span: Span) -> Result<(), CompileError> {
        let target = self.symbols.add_named_label(label);
        self.emit(span, OpCode::GotoLabel, target, NULL_ID, NULL_ID);
        Ok(())
    }

    /// Lowers `LABEL "name"`.
    pub(super) fn lower_label_stmt(&mut self, name: &str, span: Span) -> Result<(), CompileError> {
        let label = self.symbols.add_named_label(name);
        self.emit(span, OpCode::Label, label, NULL_ID, NULL_ID);
        Ok(())
    }

    // ========================================================================
    // DEF FN
    // ========================================================================

    /// Lowers `DEF FNname(params) = body`.
    ///
    /// The body is emitted inline but jumped over in straight-line
    /// execution:
    ///
    /// ```text
    ///   GOTO_LABEL -> L_post_decl                      ; patched
    ///   LABEL L_func_start
    ///   <param declarations, body>
    ///   COPY fn <- body
    ///   GOTO_CALLER
    ///   LABEL L_post_decl
    /// ```
    pub(super) fn lower_def_fn(
        &mut self,
        name: &str,
        suffix: Option<crate::symbols::TypeSuffix>,
        params: &[VarRef],
        body: &Expr,
        span: Span,
    ) -> Result<(), CompileError> {
        let dt = self.symbols.resolve_type(name, suffix);
        let fn_name = VariableName::new(name, dt);
        let (udf_id, _) = self.symbols.variable_or_udf(&fn_name, |n| SymbolEntry::Udf {
            name: n.clone(),
            params: Vec::new(),
        });
        if !matches!(self.symbols.get(udf_id), Some(SymbolEntry::Udf { .. })) {
            return Err(self.semantic(
                ErrorKind::BadAssignment,
                span,
                format!("{} is already a variable and cannot be a function", fn_name),
            ));
        }
        if self.udf_states.contains_key(&udf_id) {
            return Err(self.semantic(
                ErrorKind::BadAssignment,
                span,
                format!("function {} is already defined", fn_name),
            ));
        }

        // Straight-line execution skips the body.
        let post_target = self.symbols.add_goto_target();
        let goto_post_decl = self.emit(span, OpCode::GotoLabel, post_target, NULL_ID, NULL_ID);
        let label_func_start = self.symbols.add_label();
        self.emit(span, OpCode::Label, label_func_start, NULL_ID, NULL_ID);

        // The state must exist before the body lowers so recursive
        // calls inside the body resolve.
        self.udf_states
            .insert(udf_id, UdfState { label_func_start });
        self.symbols.push_declaration_scope(udf_id);

        // Parameters are declared in the child scope, shadowing any
        // globals of the same identity, and registered before the body
        // so arity is known to recursive call sites.
        for param in params {
            let param_dt = self.symbols.resolve_type(&param.name, param.suffix);
            let param_name = VariableName::new(&param.name, param_dt);
            let param_id = self
                .symbols
                .declare_in_current_scope(&param_name, |n| SymbolEntry::Variable {
                    name: n.clone(),
                    array: None,
                });
            self.emit(param.span, OpCode::Variable, param_id, NULL_ID, param_id);
            self.symbols.declare_udf_param(udf_id, param_id);
        }

        let body_id = self.lower_expr(body)?;
        let body_dt = self.dt(body_id)?;
        let return_dt = self.dt(udf_id)?;
        self.check_string_numeric_match(return_dt, body_dt, span)?;

        self.emit(span, OpCode::Copy, udf_id, body_id, udf_id);
        self.symbols.pop_scope();
        self.emit(span, OpCode::GotoCaller, NULL_ID, NULL_ID, NULL_ID);
        let label_post_decl = self.symbols.add_label();
        self.emit(span, OpCode::Label, label_post_decl, NULL_ID, NULL_ID);
        self.ir.patch_op1(goto_post_decl, label_post_decl);
        Ok(())
    }
}
