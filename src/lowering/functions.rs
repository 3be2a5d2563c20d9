//! Builtin function lowering.
//!
//! Each builtin is one opcode with fixed operand and result types. The
//! one-argument builtins share a single lowering shape driven by a small
//! table; the rest have bespoke operand layouts, with PARAM2/PARAM1
//! pushes where a builtin needs more than two operands.

use super::{Lowerer, NULL_ID};
use crate::ast::{Array1dFunc, Builtin, Expr, Span, UnaryFunc, VarRef};
use crate::error::CompileError;
use crate::ir::OpCode;
use crate::symbols::{DataType, SymbolId};

/// What a one-argument builtin expects.
#[derive(Debug, Clone, Copy)]
enum ArgKind {
    Numeric,
    Str,
}

/// What a one-argument builtin produces.
#[derive(Debug, Clone, Copy)]
enum ResultSpec {
    /// Same type as the argument.
    Compatible,
    /// A fixed type.
    Fixed(DataType),
}

/// The (argument kind, result type, opcode) of a one-argument builtin.
fn unary_spec(func: UnaryFunc) -> (ArgKind, ResultSpec, OpCode) {
    use ArgKind::*;
    use DataType::*;
    use ResultSpec::*;
    match func {
        UnaryFunc::Abs => (Numeric, Compatible, OpCode::Abs),
        UnaryFunc::Int => (Numeric, Compatible, OpCode::Int),
        UnaryFunc::Fix => (Numeric, Compatible, OpCode::Fix),
        UnaryFunc::Asc => (Str, Fixed(Int32), OpCode::Asc),
        UnaryFunc::Sin => (Numeric, Fixed(Float64), OpCode::Sin),
        UnaryFunc::Cos => (Numeric, Fixed(Float64), OpCode::Cos),
        UnaryFunc::Tan => (Numeric, Fixed(Float64), OpCode::Tan),
        UnaryFunc::Asin => (Numeric, Fixed(Float64), OpCode::Asin),
        UnaryFunc::Acos => (Numeric, Fixed(Float64), OpCode::Acos),
        UnaryFunc::Atn => (Numeric, Fixed(Float64), OpCode::Atn),
        UnaryFunc::Sinh => (Numeric, Fixed(Float64), OpCode::Sinh),
        UnaryFunc::Cosh => (Numeric, Fixed(Float64), OpCode::Cosh),
        UnaryFunc::Tanh => (Numeric, Fixed(Float64), OpCode::Tanh),
        UnaryFunc::Sqr => (Numeric, Fixed(Float64), OpCode::Sqr),
        UnaryFunc::Exp => (Numeric, Fixed(Float64), OpCode::Eexp),
        UnaryFunc::Log => (Numeric, Fixed(Float64), OpCode::Log),
        UnaryFunc::Log10 => (Numeric, Fixed(Float64), OpCode::Log10),
        UnaryFunc::Log2 => (Numeric, Fixed(Float64), OpCode::Log2),
        UnaryFunc::ToRad => (Numeric, Fixed(Float64), OpCode::ToRad),
        UnaryFunc::ToDeg => (Numeric, Fixed(Float64), OpCode::ToDeg),
        UnaryFunc::Floor => (Numeric, Fixed(Float64), OpCode::Floor),
        UnaryFunc::Ceil => (Numeric, Fixed(Float64), OpCode::Ceil),
        UnaryFunc::Round => (Numeric, Fixed(Float64), OpCode::Round),
        UnaryFunc::Sgn => (Numeric, Fixed(Int32), OpCode::Sgn),
        UnaryFunc::Cint => (Numeric, Fixed(Int32), OpCode::Cint),
        UnaryFunc::Clng => (Numeric, Fixed(Int64), OpCode::Clng),
        UnaryFunc::Csng => (Numeric, Fixed(Float32), OpCode::Csng),
        UnaryFunc::Cdbl => (Numeric, Fixed(Float64), OpCode::Cdbl),
        UnaryFunc::Cvi => (Str, Fixed(Int32), OpCode::Cvi),
        UnaryFunc::Cvl => (Str, Fixed(Int64), OpCode::Cvl),
        UnaryFunc::Cvs => (Str, Fixed(Float32), OpCode::Cvs),
        UnaryFunc::Cvd => (Str, Fixed(Float64), OpCode::Cvd),
        UnaryFunc::MkiDlr => (Numeric, Fixed(String), OpCode::MkiDlr),
        UnaryFunc::MklDlr => (Numeric, Fixed(String), OpCode::MklDlr),
        UnaryFunc::MksDlr => (Numeric, Fixed(String), OpCode::MksDlr),
        UnaryFunc::MkdDlr => (Numeric, Fixed(String), OpCode::MkdDlr),
        UnaryFunc::SpaceDlr => (Numeric, Fixed(String), OpCode::SpaceDlr),
        UnaryFunc::StrDlr => (Numeric, Fixed(String), OpCode::StrDlr),
        UnaryFunc::ChrDlr => (Numeric, Fixed(String), OpCode::ChrDlr),
        UnaryFunc::HexDlr => (Numeric, Fixed(String), OpCode::HexDlr),
        UnaryFunc::OctDlr => (Numeric, Fixed(String), OpCode::OctDlr),
        UnaryFunc::Val => (Str, Fixed(Float64), OpCode::Val),
        UnaryFunc::Len => (Str, Fixed(Int32), OpCode::Len),
    }
}

impl<'src> Lowerer<'src> {
    /// Lowers a builtin call, returning its result id.
    pub(crate) fn lower_builtin(
        &mut self,
        builtin: &Builtin,
        span: Span,
    ) -> Result<SymbolId, CompileError> {
        match builtin {
            Builtin::Unary { func, arg } => self.lower_unary_builtin(*func, arg, span),

            Builtin::Rnd => self.nullary(OpCode::Rnd, DataType::Float64, span),
            Builtin::Timer => self.nullary(OpCode::Timer, DataType::Float64, span),
            Builtin::E => self.nullary(OpCode::E, DataType::Float64, span),
            Builtin::Pi => self.nullary(OpCode::Pi, DataType::Float64, span),
            Builtin::InkeyDlr => {
                self.assert_graphics(span)?;
                self.nullary(OpCode::InkeyDlr, DataType::String, span)
            }

            Builtin::Min(a, b) => self.lower_min_max(OpCode::Min, a, b, span),
            Builtin::Max(a, b) => self.lower_min_max(OpCode::Max, a, b, span),

            Builtin::LeftDlr(string, n) => self.lower_string_n(OpCode::LeftDlr, string, n, span),
            Builtin::RightDlr(string, n) => self.lower_string_n(OpCode::RightDlr, string, n, span),

            Builtin::StringDlr(n, char_or_string) => {
                let n_id = self.lower_expr(n)?;
                let n_dt = self.dt(n_id)?;
                self.assert_numeric(n_dt, span)?;
                let fill_id = self.lower_expr(char_or_string)?;
                let result = self.symbols.add_tmp(DataType::String);
                self.emit(span, OpCode::StringDlr, n_id, fill_id, result);
                Ok(result)
            }

            Builtin::Instr {
                start,
                haystack,
                needle,
            } => {
                let start_id = match start {
                    Some(expr) => {
                        let id = self.lower_expr(expr)?;
                        let dt = self.dt(id)?;
                        self.assert_numeric(dt, span)?;
                        id
                    }
                    None => self.int_tmp(1),
                };
                let haystack_id = self.lower_expr(haystack)?;
                let needle_id = self.lower_expr(needle)?;
                let haystack_dt = self.dt(haystack_id)?;
                let needle_dt = self.dt(needle_id)?;
                self.assert_string(haystack_dt, span)?;
                self.assert_string(needle_dt, span)?;
                self.emit(span, OpCode::Param2, haystack_id, needle_id, NULL_ID);
                let result = self.symbols.add_tmp(DataType::Int32);
                self.emit(span, OpCode::Instr, start_id, NULL_ID, result);
                Ok(result)
            }

            Builtin::MidDlr { string, start, len } => {
                let string_id = self.lower_expr(string)?;
                let start_id = self.lower_expr(start)?;
                let len_id = match len {
                    Some(expr) => {
                        let id = self.lower_expr(expr)?;
                        let dt = self.dt(id)?;
                        self.assert_numeric(dt, span)?;
                        id
                    }
                    None => self.int_tmp(i32::MAX),
                };
                let string_dt = self.dt(string_id)?;
                let start_dt = self.dt(start_id)?;
                self.assert_string(string_dt, span)?;
                self.assert_numeric(start_dt, span)?;
                self.emit(span, OpCode::Param2, string_id, start_id, NULL_ID);
                let result = self.symbols.add_tmp(DataType::String);
                self.emit(span, OpCode::MidDlr, len_id, NULL_ID, result);
                Ok(result)
            }

            Builtin::InputDlr { count, file_number } => {
                let count_id = self.lower_expr(count)?;
                let count_dt = self.dt(count_id)?;
                self.assert_numeric(count_dt, span)?;
                let file_id = match file_number {
                    Some(expr) => {
                        let id = self.lower_expr(expr)?;
                        let dt = self.dt(id)?;
                        self.assert_numeric(dt, span)?;
                        id
                    }
                    None => self.int_tmp(-1),
                };
                let result = self.symbols.add_tmp(DataType::String);
                self.emit(span, OpCode::InputDlr, count_id, file_id, result);
                Ok(result)
            }

            Builtin::EnvironDlr(name) => {
                let name_id = self.lower_expr(name)?;
                let name_dt = self.dt(name_id)?;
                self.assert_string(name_dt, span)?;
                let result = self.symbols.add_tmp(DataType::String);
                self.emit(span, OpCode::EnvironDlr, name_id, NULL_ID, result);
                Ok(result)
            }

            Builtin::Loc(file) => self.lower_file_state(OpCode::Loc, file, DataType::Int32, span),
            Builtin::Lof(file) => self.lower_file_state(OpCode::Lof, file, DataType::Int64, span),
            Builtin::Eof(file) => self.lower_file_state(OpCode::Eof, file, DataType::Int32, span),

            Builtin::Array1d { func, array } => self.lower_array1d(*func, array, span),

            Builtin::Array1dPct { array, pct } => {
                let array_id = self.array_variable(array, Some(1), true, span)?;
                let pct_id = self.lower_expr(pct)?;
                let pct_dt = self.dt(pct_id)?;
                self.assert_numeric(pct_dt, span)?;
                let result = self.symbols.add_tmp(DataType::Float64);
                self.emit(span, OpCode::Array1dPct, array_id, pct_id, result);
                Ok(result)
            }

            Builtin::Array1dBinSearch { array, needle } => {
                let array_id = self.array_variable(array, Some(1), false, span)?;
                let needle_id = self.lower_expr(needle)?;
                let needle_dt = self.dt(needle_id)?;
                self.assert_numeric(needle_dt, span)?;
                let result = self.symbols.add_tmp(DataType::Int32);
                self.emit(span, OpCode::Array1dBinSearch, array_id, needle_id, result);
                Ok(result)
            }

            Builtin::Hsb2Rgb { h, s, b } => {
                let h_id = self.lower_expr(h)?;
                let s_id = self.lower_expr(s)?;
                let b_id = self.lower_expr(b)?;
                for id in [h_id, s_id, b_id] {
                    let dt = self.dt(id)?;
                    self.assert_numeric(dt, span)?;
                }
                self.emit(span, OpCode::Param2, h_id, s_id, NULL_ID);
                let result = self.symbols.add_tmp(DataType::Int32);
                self.emit(span, OpCode::Hsb2Rgb, b_id, NULL_ID, result);
                Ok(result)
            }

            Builtin::DictNew {
                key_suffix,
                value_suffix,
                pairs,
            } => {
                for (key, value) in pairs {
                    let key_id = self.lower_expr(key)?;
                    let value_id = self.lower_expr(value)?;
                    self.emit(span, OpCode::Param2, key_id, value_id, NULL_ID);
                }
                let key_type = self.symbols.add_tmp(key_suffix.data_type());
                let value_type = self.symbols.add_tmp(value_suffix.data_type());
                let result = self.symbols.add_tmp(DataType::Int32);
                self.emit(span, OpCode::Dict, key_type, value_type, result);
                Ok(result)
            }

            Builtin::DictPut { dict, key, value } => {
                let dict_id = self.lower_expr(dict)?;
                let key_id = self.lower_expr(key)?;
                let value_id = self.lower_expr(value)?;
                self.emit(span, OpCode::Param2, key_id, value_id, NULL_ID);
                let result = self.symbols.add_tmp(DataType::Int32);
                self.emit(span, OpCode::DictPut, dict_id, NULL_ID, result);
                Ok(result)
            }

            Builtin::DictGet { dict, key, default } => {
                let dict_id = self.lower_expr(dict)?;
                let key_id = self.lower_expr(key)?;
                let default_id = self.lower_expr(default)?;
                self.emit(span, OpCode::Param2, key_id, default_id, NULL_ID);
                let result = self.tmp_compatible(default_id)?;
                self.emit(span, OpCode::DictGet, dict_id, NULL_ID, result);
                Ok(result)
            }

            Builtin::DictContainsKey { dict, key } => {
                let dict_id = self.lower_expr(dict)?;
                let key_id = self.lower_expr(key)?;
                let result = self.symbols.add_tmp(DataType::Int64);
                self.emit(span, OpCode::DictContainsKey, dict_id, key_id, result);
                Ok(result)
            }

            Builtin::DictClear(dict) => {
                let dict_id = self.lower_expr(dict)?;
                let result = self.symbols.add_tmp(DataType::Int64);
                self.emit(span, OpCode::DictClear, dict_id, NULL_ID, result);
                Ok(result)
            }

            Builtin::DictSize(dict) => {
                let dict_id = self.lower_expr(dict)?;
                let result = self.symbols.add_tmp(DataType::Int32);
                self.emit(span, OpCode::DictSize, dict_id, NULL_ID, result);
                Ok(result)
            }

            Builtin::SetNew {
                value_suffix,
                values,
            } => {
                for value in values {
                    let value_id = self.lower_expr(value)?;
                    self.emit(span, OpCode::Param1, value_id, NULL_ID, NULL_ID);
                }
                let value_type = self.symbols.add_tmp(value_suffix.data_type());
                let result = self.symbols.add_tmp(DataType::Int32);
                self.emit(span, OpCode::Set, value_type, NULL_ID, result);
                Ok(result)
            }

            Builtin::SetAdd { set, value } => {
                let set_id = self.lower_expr(set)?;
                let value_id = self.lower_expr(value)?;
                let result = self.symbols.add_tmp(DataType::Int32);
                self.emit(span, OpCode::SetAdd, set_id, value_id, result);
                Ok(result)
            }

            Builtin::SetContains { set, value } => {
                let set_id = self.lower_expr(set)?;
                let value_id = self.lower_expr(value)?;
                let result = self.symbols.add_tmp(DataType::Int64);
                self.emit(span, OpCode::SetContains, set_id, value_id, result);
                Ok(result)
            }

            Builtin::SetClear(set) => {
                let set_id = self.lower_expr(set)?;
                let result = self.symbols.add_tmp(DataType::Int64);
                self.emit(span, OpCode::SetClear, set_id, NULL_ID, result);
                Ok(result)
            }

            Builtin::SetSize(set) => {
                let set_id = self.lower_expr(set)?;
                let result = self.symbols.add_tmp(DataType::Int32);
                self.emit(span, OpCode::SetSize, set_id, NULL_ID, result);
                Ok(result)
            }
        }
    }

    /// Lowers a one-argument builtin through the spec table.
    fn lower_unary_builtin(
        &mut self,
        func: UnaryFunc,
        arg: &Expr,
        span: Span,
    ) -> Result<SymbolId, CompileError> {
        let (arg_kind, result_spec, opcode) = unary_spec(func);
        let arg_id = self.lower_expr(arg)?;
        let arg_dt = self.dt(arg_id)?;
        match arg_kind {
            ArgKind::Numeric => self.assert_numeric(arg_dt, span)?,
            ArgKind::Str => self.assert_string(arg_dt, span)?,
        }
        let result = match result_spec {
            ResultSpec::Compatible => self.tmp_compatible(arg_id)?,
            ResultSpec::Fixed(dt) => self.symbols.add_tmp(dt),
        };
        self.emit(span, opcode, arg_id, NULL_ID, result);
        Ok(result)
    }

    /// A builtin with no operands and a fixed result type.
    fn nullary(
        &mut self,
        opcode: OpCode,
        result_type: DataType,
        span: Span,
    ) -> Result<SymbolId, CompileError> {
        let result = self.symbols.add_tmp(result_type);
        self.emit(span, opcode, NULL_ID, NULL_ID, result);
        Ok(result)
    }

    /// MIN/MAX: both numeric, result is the operand join.
    fn lower_min_max(
        &mut self,
        opcode: OpCode,
        a: &Expr,
        b: &Expr,
        span: Span,
    ) -> Result<SymbolId, CompileError> {
        let a_id = self.lower_expr(a)?;
        let b_id = self.lower_expr(b)?;
        let a_dt = self.dt(a_id)?;
        let b_dt = self.dt(b_id)?;
        self.assert_numeric2(a_dt, b_dt, span)?;
        let join = self.upcast(a_dt, b_dt, span)?;
        let result = self.symbols.add_tmp(join);
        self.emit(span, opcode, a_id, b_id, result);
        Ok(result)
    }

    /// LEFT$/RIGHT$: (string, count) to string.
    fn lower_string_n(
        &mut self,
        opcode: OpCode,
        string: &Expr,
        n: &Expr,
        span: Span,
    ) -> Result<SymbolId, CompileError> {
        let string_id = self.lower_expr(string)?;
        let n_id = self.lower_expr(n)?;
        let string_dt = self.dt(string_id)?;
        let n_dt = self.dt(n_id)?;
        self.assert_string(string_dt, span)?;
        self.assert_numeric(n_dt, span)?;
        let result = self.symbols.add_tmp(DataType::String);
        self.emit(span, opcode, string_id, n_id, result);
        Ok(result)
    }

    /// LOC/LOF/EOF: numeric file number to a fixed integer type.
    fn lower_file_state(
        &mut self,
        opcode: OpCode,
        file: &Expr,
        result_type: DataType,
        span: Span,
    ) -> Result<SymbolId, CompileError> {
        let file_id = self.lower_expr(file)?;
        let file_dt = self.dt(file_id)?;
        self.assert_numeric(file_dt, span)?;
        let result = self.symbols.add_tmp(result_type);
        self.emit(span, opcode, file_id, NULL_ID, result);
        Ok(result)
    }

    /// The shared 1-D statistics shape.
    fn lower_array1d(
        &mut self,
        func: Array1dFunc,
        array: &VarRef,
        span: Span,
    ) -> Result<SymbolId, CompileError> {
        let array_id = self.array_variable(array, Some(1), true, span)?;
        let (opcode, result) = match func {
            Array1dFunc::Min => (OpCode::Array1dMin, self.tmp_compatible(array_id)?),
            Array1dFunc::Max => (OpCode::Array1dMax, self.tmp_compatible(array_id)?),
            Array1dFunc::Mean => (OpCode::Array1dMean, self.symbols.add_tmp(DataType::Float64)),
            Array1dFunc::Sum => (OpCode::Array1dSum, self.symbols.add_tmp(DataType::Float64)),
            Array1dFunc::Std => (OpCode::Array1dStd, self.symbols.add_tmp(DataType::Float64)),
            Array1dFunc::Median => (
                OpCode::Array1dMedian,
                self.symbols.add_tmp(DataType::Float64),
            ),
        };
        self.emit(span, opcode, array_id, NULL_ID, result);
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unary_spec_result_types() {
        let (_, result, opcode) = unary_spec(UnaryFunc::Sin);
        assert!(matches!(result, ResultSpec::Fixed(DataType::Float64)));
        assert_eq!(opcode, OpCode::Sin);

        let (arg, result, _) = unary_spec(UnaryFunc::Len);
        assert!(matches!(arg, ArgKind::Str));
        assert!(matches!(result, ResultSpec::Fixed(DataType::Int32)));

        let (_, result, _) = unary_spec(UnaryFunc::Abs);
        assert!(matches!(result, ResultSpec::Compatible));
    }
}
