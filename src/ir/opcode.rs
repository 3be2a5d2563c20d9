//! The opcode set of the QuailBASIC IR.
//!
//! Every instruction carries one opcode plus up to two operand ids and a
//! result id. Arithmetic and comparison opcodes are specialised per
//! upcast result type so the interpreter never re-derives promotion;
//! opcodes needing more than two operands take the extras from the
//! PARAM1/PARAM2 side channel (see the module docs in [`crate::ir`]).

use std::fmt;

/// An IR opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpCode {
    // ==================== Data movement ====================
    /// Bind a variable/arrayref/UDF result as an expression value.
    Variable,
    /// Bind a preloaded temporary as an expression value.
    Value,
    /// Store op2 into op1 (coercing to op1's type).
    Assign,
    /// Coerce op2 to the result's type, then store into op1 (= result).
    Copy,
    /// Negate op1 into result.
    UnaryMinus,

    // ==================== Array indexing ====================
    /// Clear the pending index vector of array op1.
    ResetArrayIdx,
    /// Append index op2 to the pending index vector of array op1.
    SetArrayIdx,
    /// Bind arrayref op2 to array op1 at the pending index vector.
    ArrayRef,

    // ==================== Arithmetic ====================
    AddI32,
    AddI64,
    AddF32,
    AddF64,
    SubI32,
    SubI64,
    SubF32,
    SubF64,
    MulI32,
    MulI64,
    MulF32,
    MulF64,
    ExpI32,
    ExpI64,
    ExpF32,
    ExpF64,
    /// Integer division; result type is the operand upcast.
    Idiv,
    /// Float division; result is always DOUBLE.
    Fdiv,
    Mod,
    /// String concatenation.
    Concat,

    // ==================== Comparison (result INT64, 0/-1) ====================
    EqI32,
    EqI64,
    EqF32,
    EqF64,
    EqStr,
    NeI32,
    NeI64,
    NeF32,
    NeF64,
    NeStr,
    LtI32,
    LtI64,
    LtF32,
    LtF64,
    LtStr,
    LeI32,
    LeI64,
    LeF32,
    LeF64,
    LeStr,
    GtI32,
    GtI64,
    GtF32,
    GtF64,
    GtStr,
    GeI32,
    GeI64,
    GeF32,
    GeF64,
    GeStr,

    // ==================== Logical / bitwise (integer domain) ====================
    Not,
    And,
    Or,
    Xor,
    Eqv,
    Imp,
    LeftShift,
    RightShift,

    // ==================== Control flow ====================
    /// Jump to the line number held by op1.
    GotoLineNum,
    /// Jump to label op1.
    GotoLabel,
    /// Jump to label op2 if op1 is non-zero.
    GotoLabelIf,
    /// Jump to the return label of the innermost runtime scope.
    GotoCaller,
    /// Declare label op1 at this position.
    Label,
    /// Open a runtime scope for UDF op1; op2 is the caller-return label.
    PushRtScope,
    /// Close the runtime scope of UDF op1.
    PopRtScope,
    /// Push return label op1 for a matching RETURN.
    PushRetLabel,
    /// Return to the pushed label, or to the line number in op1.
    Return,
    /// Halt execution.
    End,

    // ==================== Console / printing ====================
    Print,
    PrintUsing,
    Write,
    Flush,

    // ==================== Math builtins ====================
    Abs,
    Sin,
    Cos,
    Tan,
    Asin,
    Acos,
    Atn,
    Sinh,
    Cosh,
    Tanh,
    Sqr,
    /// e^x (EXP builtin; the exponent operator has its own opcodes).
    Eexp,
    Log,
    Log10,
    Log2,
    ToRad,
    ToDeg,
    Floor,
    Ceil,
    Round,
    E,
    Pi,
    Min,
    Max,
    Sgn,
    Int,
    Fix,
    Rnd,
    Timer,

    // ==================== Conversions ====================
    Cint,
    Clng,
    Csng,
    Cdbl,
    Cvi,
    Cvl,
    Cvs,
    Cvd,
    MkiDlr,
    MklDlr,
    MksDlr,
    MkdDlr,
    Val,
    StrDlr,
    HexDlr,
    OctDlr,

    // ==================== String builtins ====================
    Len,
    Asc,
    ChrDlr,
    SpaceDlr,
    StringDlr,
    LeftDlr,
    RightDlr,
    MidDlr,
    /// MID$ used as a statement (in-place replacement).
    MidDlrStmt,
    Instr,
    InputDlr,
    EnvironDlr,
    InkeyDlr,

    // ==================== Files ====================
    Open,
    CloseAll,
    Close,
    Field,
    Putf,
    Getf,
    Loc,
    Lof,
    Eof,
    Randomize,
    RandomizeTimer,
    Lset,
    Rset,
    Input,
    LineInput,
    Restore,
    Data,
    Read,

    // ==================== Array statements and statistics ====================
    ArrayFill,
    Array1dMin,
    Array1dMax,
    Array1dMean,
    Array1dSum,
    Array1dStd,
    Array1dMedian,
    Array1dPct,
    Array1dSort,
    Array1dBinSearch,
    Array1dCopy,
    ArrayCopy,
    Array2dShiftHor,
    Array2dShiftVer,

    // ==================== Dictionaries and sets ====================
    Dict,
    DictPut,
    DictGet,
    DictContainsKey,
    DictClear,
    DictSize,
    Set,
    SetAdd,
    SetContains,
    SetClear,
    SetSize,

    // ==================== Graphics ====================
    Screen,
    Repaint,
    Circle,
    Line,
    Color,
    Paint,
    Pset,
    Gput,
    Gget,
    LoadImg,
    SaveImg,
    DrawStr,
    Draw,
    Font,
    Cls,
    Beep,
    Hsb2Rgb,
    Sleep,

    // ==================== Sound ====================
    LoadWav,
    PlayWav,
    StopWav,
    LoopWav,

    // ==================== Misc ====================
    Swap,
    /// Rebind variable op2 to alias variable op1.
    VarRef,

    // ==================== Parameter side channel ====================
    /// Push one extra operand for the next non-PARAM opcode.
    Param1,
    /// Push two extra operands for the next non-PARAM opcode.
    Param2,
}

impl OpCode {
    /// Short mnemonic used when listing IR.
    pub fn mnemonic(&self) -> &'static str {
        use OpCode::*;
        match self {
            Variable => "var",
            Value => "val",
            Assign => ":=",
            Copy => "<-",
            UnaryMinus => "u-",
            ResetArrayIdx => "resetArrIdx",
            SetArrayIdx => "setArrIdx",
            ArrayRef => "arrayref",
            AddI32 => "+i32",
            AddI64 => "+i64",
            AddF32 => "+f32",
            AddF64 => "+f64",
            SubI32 => "-i32",
            SubI64 => "-i64",
            SubF32 => "-f32",
            SubF64 => "-f64",
            MulI32 => "*i32",
            MulI64 => "*i64",
            MulF32 => "*f32",
            MulF64 => "*f64",
            ExpI32 => "^i32",
            ExpI64 => "^i64",
            ExpF32 => "^f32",
            ExpF64 => "^f64",
            Idiv => "\\",
            Fdiv => "/",
            Mod => "mod",
            Concat => "concat",
            EqI32 => "=i32",
            EqI64 => "=i64",
            EqF32 => "=f32",
            EqF64 => "=f64",
            EqStr => "=str",
            NeI32 => "<>i32",
            NeI64 => "<>i64",
            NeF32 => "<>f32",
            NeF64 => "<>f64",
            NeStr => "<>str",
            LtI32 => "<i32",
            LtI64 => "<i64",
            LtF32 => "<f32",
            LtF64 => "<f64",
            LtStr => "<str",
            LeI32 => "<=i32",
            LeI64 => "<=i64",
            LeF32 => "<=f32",
            LeF64 => "<=f64",
            LeStr => "<=str",
            GtI32 => ">i32",
            GtI64 => ">i64",
            GtF32 => ">f32",
            GtF64 => ">f64",
            GtStr => ">str",
            GeI32 => ">=i32",
            GeI64 => ">=i64",
            GeF32 => ">=f32",
            GeF64 => ">=f64",
            GeStr => ">=str",
            Not => "not",
            And => "and",
            Or => "or",
            Xor => "xor",
            Eqv => "eqv",
            Imp => "imp",
            LeftShift => "<<",
            RightShift => ">>",
            GotoLineNum => "goto",
            GotoLabel => "gotoLabel",
            GotoLabelIf => "gotoLabelIf",
            GotoCaller => "gotoCaller",
            Label => "label",
            PushRtScope => "pushRtScope",
            PopRtScope => "popRtScope",
            PushRetLabel => "pushRetLabel",
            Return => "ret",
            End => "end",
            Print => "?",
            PrintUsing => "?f",
            Write => "write",
            Flush => "flush",
            Abs => "abs",
            Sin => "sin",
            Cos => "cos",
            Tan => "tan",
            Asin => "asin",
            Acos => "acos",
            Atn => "atn",
            Sinh => "sinh",
            Cosh => "cosh",
            Tanh => "tanh",
            Sqr => "sqr",
            Eexp => "exp",
            Log => "log",
            Log10 => "log10",
            Log2 => "log2",
            ToRad => "torad",
            ToDeg => "todeg",
            Floor => "floor",
            Ceil => "ceil",
            Round => "round",
            E => "e",
            Pi => "pi",
            Min => "min",
            Max => "max",
            Sgn => "sgn",
            Int => "int",
            Fix => "fix",
            Rnd => "rnd",
            Timer => "timer",
            Cint => "cint",
            Clng => "clng",
            Csng => "csng",
            Cdbl => "cdbl",
            Cvi => "cvi",
            Cvl => "cvl",
            Cvs => "cvs",
            Cvd => "cvd",
            MkiDlr => "mki$",
            MklDlr => "mkl$",
            MksDlr => "mks$",
            MkdDlr => "mkd$",
            Val => "val$",
            StrDlr => "str$",
            HexDlr => "hex$",
            OctDlr => "oct$",
            Len => "len",
            Asc => "asc",
            ChrDlr => "chr$",
            SpaceDlr => "space$",
            StringDlr => "string$",
            LeftDlr => "left$",
            RightDlr => "right$",
            MidDlr => "mid$",
            MidDlrStmt => "mid$stmt",
            Instr => "instr",
            InputDlr => "input$",
            EnvironDlr => "environ$",
            InkeyDlr => "inkey$",
            Open => "open",
            CloseAll => "closeAll",
            Close => "close",
            Field => "field",
            Putf => "putf",
            Getf => "getf",
            Loc => "loc",
            Lof => "lof",
            Eof => "eof",
            Randomize => "randomize",
            RandomizeTimer => "randomizeTimer",
            Lset => "lset",
            Rset => "rset",
            Input => "input",
            LineInput => "lineInput",
            Restore => "restore",
            Data => "data",
            Read => "read",
            ArrayFill => "arrayfill",
            Array1dMin => "array1dmin",
            Array1dMax => "array1dmax",
            Array1dMean => "array1dmean",
            Array1dSum => "array1dsum",
            Array1dStd => "array1dstd",
            Array1dMedian => "array1dmedian",
            Array1dPct => "array1dpct",
            Array1dSort => "array1dsort",
            Array1dBinSearch => "array1dbinsearch",
            Array1dCopy => "array1dcopy",
            ArrayCopy => "arraycopy",
            Array2dShiftHor => "array2dshifthor",
            Array2dShiftVer => "array2dshiftver",
            Dict => "dict",
            DictPut => "dictput",
            DictGet => "dictget",
            DictContainsKey => "dictcontainskey",
            DictClear => "dictclear",
            DictSize => "dictsize",
            Set => "set",
            SetAdd => "setadd",
            SetContains => "setcontains",
            SetClear => "setclear",
            SetSize => "setsize",
            Screen => "screen",
            Repaint => "repaint",
            Circle => "circle",
            Line => "line",
            Color => "color",
            Paint => "paint",
            Pset => "pset",
            Gput => "gput",
            Gget => "gget",
            LoadImg => "loadimg",
            SaveImg => "saveimg",
            DrawStr => "drawstr",
            Draw => "draw",
            Font => "font",
            Cls => "cls",
            Beep => "beep",
            Hsb2Rgb => "hsb2rgb",
            Sleep => "sleep",
            LoadWav => "loadwav",
            PlayWav => "playwav",
            StopWav => "stopwav",
            LoopWav => "loopwav",
            Swap => "swap",
            VarRef => "varref",
            Param1 => "param1",
            Param2 => "param2",
        }
    }
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mnemonics() {
        assert_eq!(OpCode::Assign.mnemonic(), ":=");
        assert_eq!(OpCode::AddF32.mnemonic(), "+f32");
        assert_eq!(OpCode::GeStr.mnemonic(), ">=str");
        assert_eq!(OpCode::ChrDlr.to_string(), "chr$");
    }
}
