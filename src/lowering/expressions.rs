//! Expression lowering.
//!
//! Every expression lowers to zero or more instructions and resolves to
//! the symbol id holding its value. Binary numeric operations pick an
//! opcode specialised to the promotion-lattice join of their operand
//! types; comparisons and logical operations produce INT64 booleans
//! (0 / -1).

use super::{Lowerer, NULL_ID};
use crate::ast::{BinaryOp, Expr, ExprKind, IntegerSigil, NumberLiteral, Span, VarRef};
use crate::error::{CompileError, ErrorKind, InternalError};
use crate::ir::OpCode;
use crate::numbers;
use crate::symbols::{DataType, SymbolEntry, SymbolId, Value, VariableName};

/// Arithmetic opcode families specialised per result type.
#[derive(Debug, Clone, Copy)]
pub(crate) enum ArithFamily {
    Add,
    Sub,
    Mul,
    Exp,
}

/// Relational operator families.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Rel {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

/// Selects the typed opcode of an arithmetic family for a numeric
/// result type. A string type here is a compiler bug: callers assert
/// numeric operands first.
pub(crate) fn arith_opcode(family: ArithFamily, dt: DataType) -> Result<OpCode, CompileError> {
    use DataType::*;
    use OpCode::*;
    let opcode = match (family, dt) {
        (ArithFamily::Add, Int32) => AddI32,
        (ArithFamily::Add, Int64) => AddI64,
        (ArithFamily::Add, Float32) => AddF32,
        (ArithFamily::Add, Float64) => AddF64,
        (ArithFamily::Sub, Int32) => SubI32,
        (ArithFamily::Sub, Int64) => SubI64,
        (ArithFamily::Sub, Float32) => SubF32,
        (ArithFamily::Sub, Float64) => SubF64,
        (ArithFamily::Mul, Int32) => MulI32,
        (ArithFamily::Mul, Int64) => MulI64,
        (ArithFamily::Mul, Float32) => MulF32,
        (ArithFamily::Mul, Float64) => MulF64,
        (ArithFamily::Exp, Int32) => ExpI32,
        (ArithFamily::Exp, Int64) => ExpI64,
        (ArithFamily::Exp, Float32) => ExpF32,
        (ArithFamily::Exp, Float64) => ExpF64,
        (_, String) => {
            return Err(InternalError::new("arithmetic opcode requested for STRING").into())
        }
    };
    Ok(opcode)
}

/// Selects the typed opcode of a relational family for an operand pair:
/// the string variant when both sides are strings, else the variant of
/// the numeric join.
pub(crate) fn compare_opcode(rel: Rel, dt1: DataType, dt2: DataType) -> Result<OpCode, CompileError> {
    use DataType::*;
    use OpCode::*;
    if dt1.is_string() && dt2.is_string() {
        return Ok(match rel {
            Rel::Eq => EqStr,
            Rel::Ne => NeStr,
            Rel::Lt => LtStr,
            Rel::Le => LeStr,
            Rel::Gt => GtStr,
            Rel::Ge => GeStr,
        });
    }
    let join = dt1
        .upcast(dt2)
        .ok_or_else(|| InternalError::new("comparison opcode requested for mixed string"))?;
    Ok(match (rel, join) {
        (Rel::Eq, Int32) => EqI32,
        (Rel::Eq, Int64) => EqI64,
        (Rel::Eq, Float32) => EqF32,
        (Rel::Eq, Float64) => EqF64,
        (Rel::Ne, Int32) => NeI32,
        (Rel::Ne, Int64) => NeI64,
        (Rel::Ne, Float32) => NeF32,
        (Rel::Ne, Float64) => NeF64,
        (Rel::Lt, Int32) => LtI32,
        (Rel::Lt, Int64) => LtI64,
        (Rel::Lt, Float32) => LtF32,
        (Rel::Lt, Float64) => LtF64,
        (Rel::Le, Int32) => LeI32,
        (Rel::Le, Int64) => LeI64,
        (Rel::Le, Float32) => LeF32,
        (Rel::Le, Float64) => LeF64,
        (Rel::Gt, Int32) => GtI32,
        (Rel::Gt, Int64) => GtI64,
        (Rel::Gt, Float32) => GtF32,
        (Rel::Gt, Float64) => GtF64,
        (Rel::Ge, Int32) => GeI32,
        (Rel::Ge, Int64) => GeI64,
        (Rel::Ge, Float32) => GeF32,
        (Rel::Ge, Float64) => GeF64,
        (_, String) => unreachable!("string join handled above"),
    })
}

/// Factory for entries created through a name reference: names with the
/// `FN` prefix become UDFs, everything else a scalar variable.
pub(crate) fn scalar_or_udf_entry(name: &VariableName) -> SymbolEntry {
    if name.is_udf_name() {
        SymbolEntry::Udf {
            name: name.clone(),
            params: Vec::new(),
        }
    } else {
        SymbolEntry::Variable {
            name: name.clone(),
            array: None,
        }
    }
}

/// Shape of an existing entry, captured before mutating the table.
enum VarShape {
    Scalar,
    Array,
    Udf,
}

impl<'src> Lowerer<'src> {
    /// Lowers an expression, returning the id holding its value.
    pub(crate) fn lower_expr(&mut self, expr: &Expr) -> Result<SymbolId, CompileError> {
        match &expr.kind {
            ExprKind::Number(literal) => self.lower_number(literal, expr.span),
            ExprKind::Str(text) => {
                let id = self.symbols.add_tmp_value(Value::Str(text.clone()));
                self.emit(expr.span, OpCode::Value, id, NULL_ID, id);
                Ok(id)
            }
            ExprKind::Variable(var) => {
                let id = self.lower_variable(var, expr.span)?;
                // A UDF's return cell is clobbered by its next call, so
                // the value is copied out immediately.
                if matches!(self.symbols.get(id), Some(SymbolEntry::Udf { .. })) {
                    let copy = self.tmp_compatible(id)?;
                    self.emit(expr.span, OpCode::Copy, copy, id, copy);
                    Ok(copy)
                } else {
                    Ok(id)
                }
            }
            ExprKind::Neg(inner) => {
                let inner_id = self.lower_expr(inner)?;
                let dt = self.dt(inner_id)?;
                if dt.is_string() {
                    return Err(self.semantic(
                        ErrorKind::DataTypeMismatch,
                        expr.span,
                        "unary minus cannot be applied to a string",
                    ));
                }
                let result = self.tmp_compatible(inner_id)?;
                self.emit(expr.span, OpCode::UnaryMinus, inner_id, NULL_ID, result);
                Ok(result)
            }
            ExprKind::Not(inner) => {
                let inner_id = self.lower_expr(inner)?;
                let dt = self.dt(inner_id)?;
                self.assert_numeric(dt, expr.span)?;
                let result = self.symbols.add_tmp(DataType::Int64);
                self.emit(expr.span, OpCode::Not, inner_id, NULL_ID, result);
                Ok(result)
            }
            ExprKind::Binary { op, lhs, rhs } => self.lower_binary(*op, lhs, rhs, expr.span),
            ExprKind::Grouped(inner) => self.lower_expr(inner),
            ExprKind::Builtin(builtin) => self.lower_builtin(builtin, expr.span),
        }
    }

    /// Lowers a numeric literal into a preloaded temporary.
    pub(crate) fn lower_number(
        &mut self,
        literal: &NumberLiteral,
        span: Span,
    ) -> Result<SymbolId, CompileError> {
        let snippet = self.snippet(span);
        let value = match literal {
            NumberLiteral::Integer {
                digits,
                base,
                sigil,
            } => match sigil {
                Some(IntegerSigil::Long) => {
                    Value::Int64(numbers::parse_int64(digits, base.radix(), &snippet)?)
                }
                Some(IntegerSigil::Double) => {
                    Value::Float64(numbers::parse_int64(digits, base.radix(), &snippet)? as f64)
                }
                Some(IntegerSigil::Single) => {
                    Value::Float32(numbers::parse_int32(digits, base.radix(), &snippet)? as f32)
                }
                None => Value::Int32(numbers::parse_int32(digits, base.radix(), &snippet)?),
            },
            NumberLiteral::Single { digits } => {
                Value::Float32(numbers::parse_float32(digits, &snippet)?)
            }
            NumberLiteral::Double { digits } => {
                Value::Float64(numbers::parse_float64(digits, &snippet)?)
            }
        };
        let id = self.symbols.add_tmp_value(value);
        self.emit(span, OpCode::Value, id, NULL_ID, id);
        Ok(id)
    }

    /// Resolves a name to its entry without emitting instructions.
    pub(crate) fn resolve_variable(&mut self, var: &VarRef) -> (SymbolId, VariableName) {
        let dt = self.symbols.resolve_type(&var.name, var.suffix);
        let name = VariableName::new(&var.name, dt);
        let (id, _) = self.symbols.variable_or_udf(&name, scalar_or_udf_entry);
        (id, name)
    }

    /// Lowers a variable reference: a scalar read, an array-element
    /// binding, or a UDF call, ending with a VARIABLE instruction that
    /// publishes the resulting id.
    pub(crate) fn lower_variable(
        &mut self,
        var: &VarRef,
        span: Span,
    ) -> Result<SymbolId, CompileError> {
        let (id, name) = self.resolve_variable(var);

        let shape = match self.symbols.get(id) {
            Some(SymbolEntry::Variable { array: None, .. }) => VarShape::Scalar,
            Some(SymbolEntry::Variable { array: Some(_), .. }) => VarShape::Array,
            Some(SymbolEntry::Udf { .. }) => VarShape::Udf,
            other => {
                return Err(InternalError::new(format!(
                    "name {} resolved to non-variable entry {:?}",
                    name, other
                ))
                .into())
            }
        };

        let ref_id = match shape {
            VarShape::Scalar => {
                if !var.indices.is_empty() {
                    return Err(self.semantic(
                        ErrorKind::ScalarVariableCannotBeIndexed,
                        span,
                        format!("scalar variable cannot be indexed: {}", name),
                    ));
                }
                id
            }
            VarShape::Array => {
                if var.indices.is_empty() {
                    // Whole-array reference (array statements/builtins).
                    id
                } else {
                    let mut index_ids = Vec::with_capacity(var.indices.len());
                    for index in &var.indices {
                        index_ids.push(self.lower_expr(index)?);
                    }
                    self.emit(span, OpCode::ResetArrayIdx, id, NULL_ID, NULL_ID);
                    for index_id in index_ids {
                        self.emit(span, OpCode::SetArrayIdx, id, index_id, NULL_ID);
                    }
                    let ref_id = self.symbols.add_array_reference(id);
                    self.emit(span, OpCode::ArrayRef, id, ref_id, ref_id);
                    ref_id
                }
            }
            VarShape::Udf => self.lower_udf_call(id, &name, var, span)?,
        };

        self.emit(span, OpCode::Variable, ref_id, NULL_ID, ref_id);
        Ok(ref_id)
    }

    /// Lowers a UDF call site.
    ///
    /// The emitted protocol: PUSH_RT_SCOPE (op2 patched to the caller's
    /// return label), one COPY per actual into the declared parameter,
    /// GOTO_LABEL to the function start, the return LABEL, POP_RT_SCOPE.
    /// The call's value id is the UDF's return-value id.
    fn lower_udf_call(
        &mut self,
        udf_id: SymbolId,
        name: &VariableName,
        var: &VarRef,
        span: Span,
    ) -> Result<SymbolId, CompileError> {
        let state = *self.udf_states.get(&udf_id).ok_or_else(|| {
            self.semantic(
                ErrorKind::NotDefined,
                span,
                format!("function {} called before DEF FN", name),
            )
        })?;
        let params = match self.symbols.get(udf_id) {
            Some(SymbolEntry::Udf { params, .. }) => params.clone(),
            other => {
                return Err(
                    InternalError::new(format!("UDF id resolved to {:?}", other)).into(),
                )
            }
        };
        if var.indices.len() != params.len() {
            return Err(self.semantic(
                ErrorKind::InsufficientUdfArgs,
                span,
                format!(
                    "{} expects {} arguments, {} passed",
                    name,
                    params.len(),
                    var.indices.len()
                ),
            ));
        }

        let mut arg_ids = Vec::with_capacity(var.indices.len());
        for arg in &var.indices {
            arg_ids.push(self.lower_expr(arg)?);
        }

        let push_scope = self.emit(span, OpCode::PushRtScope, udf_id, NULL_ID, NULL_ID);
        for (param, arg) in params.iter().zip(arg_ids) {
            self.emit(span, OpCode::Copy, *param, arg, *param);
        }
        self.emit(span, OpCode::GotoLabel, state.label_func_start, NULL_ID, NULL_ID);
        let caller_return = self.symbols.add_label();
        self.emit(span, OpCode::Label, caller_return, NULL_ID, NULL_ID);
        self.ir.patch_op2(push_scope, caller_return);
        self.emit(span, OpCode::PopRtScope, udf_id, NULL_ID, NULL_ID);
        Ok(udf_id)
    }

    /// Lowers a binary operation.
    fn lower_binary(
        &mut self,
        op: BinaryOp,
        lhs: &Expr,
        rhs: &Expr,
        span: Span,
    ) -> Result<SymbolId, CompileError> {
        let lhs_id = self.lower_expr(lhs)?;
        let rhs_id = self.lower_expr(rhs)?;
        let dt1 = self.dt(lhs_id)?;
        let dt2 = self.dt(rhs_id)?;

        match op {
            BinaryOp::Add => {
                if dt1.is_string() && dt2.is_string() {
                    let result = self.symbols.add_tmp(DataType::String);
                    self.emit(span, OpCode::Concat, lhs_id, rhs_id, result);
                    return Ok(result);
                }
                self.typed_arith(ArithFamily::Add, lhs_id, rhs_id, dt1, dt2, span)
            }
            BinaryOp::Sub => self.typed_arith(ArithFamily::Sub, lhs_id, rhs_id, dt1, dt2, span),
            BinaryOp::Mul => self.typed_arith(ArithFamily::Mul, lhs_id, rhs_id, dt1, dt2, span),
            BinaryOp::Exp => self.typed_arith(ArithFamily::Exp, lhs_id, rhs_id, dt1, dt2, span),
            BinaryOp::IntDiv | BinaryOp::Mod => {
                self.assert_numeric2(dt1, dt2, span)?;
                let join = self.upcast(dt1, dt2, span)?;
                let result = self.symbols.add_tmp(join);
                let opcode = if matches!(op, BinaryOp::IntDiv) {
                    OpCode::Idiv
                } else {
                    OpCode::Mod
                };
                self.emit(span, opcode, lhs_id, rhs_id, result);
                Ok(result)
            }
            BinaryOp::FloatDiv => {
                self.assert_numeric2(dt1, dt2, span)?;
                let result = self.symbols.add_tmp(DataType::Float64);
                self.emit(span, OpCode::Fdiv, lhs_id, rhs_id, result);
                Ok(result)
            }
            BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt
            | BinaryOp::Ge => {
                self.check_string_numeric_match(dt1, dt2, span)?;
                let rel = match op {
                    BinaryOp::Eq => Rel::Eq,
                    BinaryOp::Ne => Rel::Ne,
                    BinaryOp::Lt => Rel::Lt,
                    BinaryOp::Le => Rel::Le,
                    BinaryOp::Gt => Rel::Gt,
                    _ => Rel::Ge,
                };
                let opcode = compare_opcode(rel, dt1, dt2)?;
                let result = self.symbols.add_tmp(DataType::Int64);
                self.emit(span, opcode, lhs_id, rhs_id, result);
                Ok(result)
            }
            BinaryOp::And | BinaryOp::Or | BinaryOp::Xor | BinaryOp::Eqv | BinaryOp::Imp
            | BinaryOp::Shl | BinaryOp::Shr => {
                self.assert_numeric2(dt1, dt2, span)?;
                let opcode = match op {
                    BinaryOp::And => OpCode::And,
                    BinaryOp::Or => OpCode::Or,
                    BinaryOp::Xor => OpCode::Xor,
                    BinaryOp::Eqv => OpCode::Eqv,
                    BinaryOp::Imp => OpCode::Imp,
                    BinaryOp::Shl => OpCode::LeftShift,
                    _ => OpCode::RightShift,
                };
                let result = self.symbols.add_tmp(DataType::Int64);
                self.emit(span, opcode, lhs_id, rhs_id, result);
                Ok(result)
            }
        }
    }

    /// Emits a typed arithmetic instruction for the operand join.
    fn typed_arith(
        &mut self,
        family: ArithFamily,
        lhs_id: SymbolId,
        rhs_id: SymbolId,
        dt1: DataType,
        dt2: DataType,
        span: Span,
    ) -> Result<SymbolId, CompileError> {
        self.assert_numeric2(dt1, dt2, span)?;
        let join = self.upcast(dt1, dt2, span)?;
        let opcode = arith_opcode(family, join)?;
        let result = self.symbols.add_tmp(join);
        self.emit(span, opcode, lhs_id, rhs_id, result);
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arith_opcode_selection() {
        assert_eq!(
            arith_opcode(ArithFamily::Add, DataType::Float32).unwrap(),
            OpCode::AddF32
        );
        assert_eq!(
            arith_opcode(ArithFamily::Exp, DataType::Int64).unwrap(),
            OpCode::ExpI64
        );
        assert!(arith_opcode(ArithFamily::Mul, DataType::String).is_err());
    }

    #[test]
    fn test_compare_opcode_selection() {
        assert_eq!(
            compare_opcode(Rel::Eq, DataType::String, DataType::String).unwrap(),
            OpCode::EqStr
        );
        assert_eq!(
            compare_opcode(Rel::Gt, DataType::Int32, DataType::Float64).unwrap(),
            OpCode::GtF64
        );
        assert_eq!(
            compare_opcode(Rel::Le, DataType::Int32, DataType::Int32).unwrap(),
            OpCode::LeI32
        );
    }

    #[test]
    fn test_fn_prefix_makes_udf() {
        let name = VariableName::new("FNF", DataType::Float64);
        assert!(matches!(
            scalar_or_udf_entry(&name),
            SymbolEntry::Udf { .. }
        ));
        let name = VariableName::new("FN", DataType::Float64);
        assert!(matches!(
            scalar_or_udf_entry(&name),
            SymbolEntry::Variable { .. }
        ));
        let name = VariableName::new("COUNT", DataType::Int32);
        assert!(matches!(
            scalar_or_udf_entry(&name),
            SymbolEntry::Variable { .. }
        ));
    }
}
