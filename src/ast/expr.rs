//! Expression nodes.

use super::Span;
use crate::symbols::TypeSuffix;

/// An expression node.
#[derive(Debug, Clone)]
pub struct Expr {
    /// The expression kind.
    pub kind: ExprKind,
    /// Byte range in the source.
    pub span: Span,
}

impl Expr {
    /// Creates an expression with an explicit span.
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Self { kind, span }
    }

    /// Creates an expression with a zero span (tree-builder convenience).
    pub fn of(kind: ExprKind) -> Self {
        Self::new(kind, Span::default())
    }

    /// A decimal integer literal.
    pub fn integer(digits: &str) -> Self {
        Self::of(ExprKind::Number(NumberLiteral::Integer {
            digits: digits.to_string(),
            base: NumberBase::Decimal,
            sigil: None,
        }))
    }

    /// An integer literal with a sigil (`@`, `#`, or `!`).
    pub fn integer_sigil(digits: &str, base: NumberBase, sigil: IntegerSigil) -> Self {
        Self::of(ExprKind::Number(NumberLiteral::Integer {
            digits: digits.to_string(),
            base,
            sigil: Some(sigil),
        }))
    }

    /// A single-precision float literal (`3.5!` or plain `3.5` typed single).
    pub fn single(digits: &str) -> Self {
        Self::of(ExprKind::Number(NumberLiteral::Single {
            digits: digits.to_string(),
        }))
    }

    /// A double-precision float literal.
    pub fn double(digits: &str) -> Self {
        Self::of(ExprKind::Number(NumberLiteral::Double {
            digits: digits.to_string(),
        }))
    }

    /// A string literal (content without quotes).
    pub fn string(text: &str) -> Self {
        Self::of(ExprKind::Str(text.to_string()))
    }

    /// A scalar variable reference without a suffix.
    pub fn var(name: &str) -> Self {
        Self::of(ExprKind::Variable(VarRef::scalar(name)))
    }

    /// A scalar variable reference with a type suffix.
    pub fn var_sfx(name: &str, suffix: TypeSuffix) -> Self {
        Self::of(ExprKind::Variable(VarRef::suffixed(name, suffix)))
    }

    /// A variable reference node.
    pub fn var_ref(var: VarRef) -> Self {
        Self::of(ExprKind::Variable(var))
    }

    /// A binary operation.
    pub fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Self {
        Self::of(ExprKind::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        })
    }

    /// Unary minus.
    pub fn neg(inner: Expr) -> Self {
        Self::of(ExprKind::Neg(Box::new(inner)))
    }

    /// Logical/bitwise NOT.
    pub fn not(inner: Expr) -> Self {
        Self::of(ExprKind::Not(Box::new(inner)))
    }
}

/// Numeric base of an integer literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumberBase {
    /// Plain digits.
    Decimal,
    /// `&H` prefix.
    Hexadecimal,
    /// `&O` or bare `&` prefix.
    Octal,
}

impl NumberBase {
    /// The radix value.
    pub fn radix(&self) -> u32 {
        match self {
            NumberBase::Decimal => 10,
            NumberBase::Hexadecimal => 16,
            NumberBase::Octal => 8,
        }
    }
}

/// A sigil forcing an integer literal's storage type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntegerSigil {
    /// `@` — store as LONG.
    Long,
    /// `#` — store as DOUBLE.
    Double,
    /// `!` — store as SINGLE.
    Single,
}

/// A numeric literal. Sigils and base prefixes are already stripped from
/// `digits` by the tokenizer; only the digits themselves remain.
#[derive(Debug, Clone, PartialEq)]
pub enum NumberLiteral {
    /// An integer literal, possibly carrying a storage-forcing sigil.
    Integer {
        digits: String,
        base: NumberBase,
        sigil: Option<IntegerSigil>,
    },
    /// A single-precision float literal (`!`-suffixed float).
    Single { digits: String },
    /// A double-precision float literal (default float form).
    Double { digits: String },
}

/// A variable reference: scalar use, array subscripting, or UDF call,
/// disambiguated by the symbol table during lowering.
#[derive(Debug, Clone)]
pub struct VarRef {
    /// Bare name, without suffix.
    pub name: String,
    /// Declared type suffix, if written.
    pub suffix: Option<TypeSuffix>,
    /// Subscript expressions (array indices or UDF arguments).
    pub indices: Vec<Expr>,
    /// Byte range of the reference.
    pub span: Span,
}

impl VarRef {
    /// A bare scalar reference.
    pub fn scalar(name: &str) -> Self {
        Self {
            name: name.to_string(),
            suffix: None,
            indices: Vec::new(),
            span: Span::default(),
        }
    }

    /// A suffixed scalar reference.
    pub fn suffixed(name: &str, suffix: TypeSuffix) -> Self {
        Self {
            name: name.to_string(),
            suffix: Some(suffix),
            indices: Vec::new(),
            span: Span::default(),
        }
    }

    /// A subscripted reference.
    pub fn indexed(name: &str, suffix: Option<TypeSuffix>, indices: Vec<Expr>) -> Self {
        Self {
            name: name.to_string(),
            suffix,
            indices,
            span: Span::default(),
        }
    }
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    /// `^`
    Exp,
    /// `*`
    Mul,
    /// `\` integer division
    IntDiv,
    /// `/` float division (always DOUBLE)
    FloatDiv,
    /// `MOD`
    Mod,
    /// `+` (numeric addition or string concatenation)
    Add,
    /// `-`
    Sub,
    /// `=`
    Eq,
    /// `<>`
    Ne,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
    /// `AND`
    And,
    /// `OR`
    Or,
    /// `XOR`
    Xor,
    /// `EQV`
    Eqv,
    /// `IMP`
    Imp,
    /// `<<`
    Shl,
    /// `>>`
    Shr,
}

impl BinaryOp {
    /// Source spelling, for diagnostics.
    pub fn as_str(&self) -> &'static str {
        match self {
            BinaryOp::Exp => "^",
            BinaryOp::Mul => "*",
            BinaryOp::IntDiv => "\\",
            BinaryOp::FloatDiv => "/",
            BinaryOp::Mod => "MOD",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Eq => "=",
            BinaryOp::Ne => "<>",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::And => "AND",
            BinaryOp::Or => "OR",
            BinaryOp::Xor => "XOR",
            BinaryOp::Eqv => "EQV",
            BinaryOp::Imp => "IMP",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
        }
    }
}

/// The expression kinds.
#[derive(Debug, Clone)]
pub enum ExprKind {
    /// Numeric literal: `42`, `&HFF`, `3.14#`.
    Number(NumberLiteral),
    /// String literal, unquoted content.
    Str(String),
    /// Variable reference, array element, or UDF call.
    Variable(VarRef),
    /// Unary minus.
    Neg(Box<Expr>),
    /// Logical/bitwise NOT.
    Not(Box<Expr>),
    /// Binary operation.
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    /// Parenthesised expression, preserved for source fidelity.
    Grouped(Box<Expr>),
    /// Builtin function call.
    Builtin(Builtin),
}

/// One-argument builtins whose lowering differs only in the expected
/// argument kind and result type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryFunc {
    Abs,
    Asc,
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
    /// EXP(x) = e^x
    Exp,
    Log,
    Log10,
    Log2,
    ToRad,
    ToDeg,
    Floor,
    Ceil,
    Round,
    Sgn,
    Int,
    Fix,
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
    SpaceDlr,
    StrDlr,
    Val,
    Len,
    ChrDlr,
    HexDlr,
    OctDlr,
}

/// One-dimensional array statistics builtins sharing a lowering shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Array1dFunc {
    Min,
    Max,
    Mean,
    Sum,
    Std,
    Median,
}

/// Builtin function calls.
#[derive(Debug, Clone)]
pub enum Builtin {
    /// A one-argument builtin.
    Unary { func: UnaryFunc, arg: Box<Expr> },
    /// RND
    Rnd,
    /// TIMER
    Timer,
    /// E
    E,
    /// PI
    Pi,
    /// INKEY$ (graphics runtime only)
    InkeyDlr,
    /// MIN(a, b)
    Min(Box<Expr>, Box<Expr>),
    /// MAX(a, b)
    Max(Box<Expr>, Box<Expr>),
    /// LEFT$(x$, n)
    LeftDlr(Box<Expr>, Box<Expr>),
    /// RIGHT$(x$, n)
    RightDlr(Box<Expr>, Box<Expr>),
    /// STRING$(n, j | x$)
    StringDlr(Box<Expr>, Box<Expr>),
    /// INSTR([start,] haystack$, needle$)
    Instr {
        start: Option<Box<Expr>>,
        haystack: Box<Expr>,
        needle: Box<Expr>,
    },
    /// MID$(x$, start [, len])
    MidDlr {
        string: Box<Expr>,
        start: Box<Expr>,
        len: Option<Box<Expr>>,
    },
    /// INPUT$(n [, filenum])
    InputDlr {
        count: Box<Expr>,
        file_number: Option<Box<Expr>>,
    },
    /// ENVIRON$(name$)
    EnvironDlr(Box<Expr>),
    /// LOC(filenum)
    Loc(Box<Expr>),
    /// LOF(filenum)
    Lof(Box<Expr>),
    /// EOF(filenum)
    Eof(Box<Expr>),
    /// ARRAY1DMIN/MAX/MEAN/SUM/STD/MEDIAN(arr)
    Array1d { func: Array1dFunc, array: VarRef },
    /// ARRAY1DPCT(arr, pct)
    Array1dPct { array: VarRef, pct: Box<Expr> },
    /// ARRAY1DBINSEARCH(arr, needle)
    Array1dBinSearch { array: VarRef, needle: Box<Expr> },
    /// HSB2RGB(h, s, b)
    Hsb2Rgb {
        h: Box<Expr>,
        s: Box<Expr>,
        b: Box<Expr>,
    },
    /// DICT<k$, v$>(key, value, ...) — create a dictionary.
    DictNew {
        key_suffix: TypeSuffix,
        value_suffix: TypeSuffix,
        pairs: Vec<(Expr, Expr)>,
    },
    /// DICTPUT(dict, key, value)
    DictPut {
        dict: Box<Expr>,
        key: Box<Expr>,
        value: Box<Expr>,
    },
    /// DICTGET(dict, key, default)
    DictGet {
        dict: Box<Expr>,
        key: Box<Expr>,
        default: Box<Expr>,
    },
    /// DICTCONTAINSKEY(dict, key)
    DictContainsKey { dict: Box<Expr>, key: Box<Expr> },
    /// DICTCLEAR(dict)
    DictClear(Box<Expr>),
    /// DICTSIZE(dict)
    DictSize(Box<Expr>),
    /// SET<v$>(value, ...) — create a set.
    SetNew {
        value_suffix: TypeSuffix,
        values: Vec<Expr>,
    },
    /// SETADD(set, value)
    SetAdd { set: Box<Expr>, value: Box<Expr> },
    /// SETCONTAINS(set, value)
    SetContains { set: Box<Expr>, value: Box<Expr> },
    /// SETCLEAR(set)
    SetClear(Box<Expr>),
    /// SETSIZE(set)
    SetSize(Box<Expr>),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builders() {
        let e = Expr::binary(BinaryOp::Add, Expr::integer("2"), Expr::single("3"));
        match e.kind {
            ExprKind::Binary { op, .. } => assert_eq!(op, BinaryOp::Add),
            other => panic!("expected binary, got {:?}", other),
        }
    }

    #[test]
    fn test_number_base_radix() {
        assert_eq!(NumberBase::Decimal.radix(), 10);
        assert_eq!(NumberBase::Hexadecimal.radix(), 16);
        assert_eq!(NumberBase::Octal.radix(), 8);
    }

    #[test]
    fn test_binary_op_spelling() {
        assert_eq!(BinaryOp::IntDiv.as_str(), "\\");
        assert_eq!(BinaryOp::Mod.as_str(), "MOD");
    }
}
