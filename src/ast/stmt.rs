//! Statement nodes.

use super::{Expr, NumberLiteral, Span, VarRef};
use crate::symbols::{DataType, TypeSuffix};

/// A statement node.
#[derive(Debug, Clone)]
pub struct Statement {
    /// The statement kind.
    pub kind: StatementKind,
    /// Byte range in the source.
    pub span: Span,
}

impl Statement {
    /// Creates a statement with an explicit span.
    pub fn new(kind: StatementKind, span: Span) -> Self {
        Self { kind, span }
    }

    /// Creates a statement with a zero span (tree-builder convenience).
    pub fn of(kind: StatementKind) -> Self {
        Self::new(kind, Span::default())
    }
}

/// One item of a PRINT list: an expression or a `;`/`,` separator.
///
/// Lowering only cares about positions — a trailing separator suppresses
/// the appended newline — so the two separator spellings collapse.
#[derive(Debug, Clone)]
pub enum PrintItem {
    /// An expression to print.
    Expr(Expr),
    /// A `;` or `,` separator.
    Separator,
}

/// Body of a single-line IF branch: inline statements or a bare line
/// number (`THEN 100` jumps like `THEN GOTO 100`).
#[derive(Debug, Clone)]
pub enum IfBody {
    Statements(Vec<Statement>),
    LineNumber(u32),
}

/// A literal in a DATA statement.
#[derive(Debug, Clone)]
pub enum DataValue {
    Number(NumberLiteral),
    Str(String),
}

/// OPEN mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOpenMode {
    Random,
    Input,
    Output,
    Append,
}

impl FileOpenMode {
    /// Canonical name carried in the IR as a string operand.
    pub fn name(&self) -> &'static str {
        match self {
            FileOpenMode::Random => "RANDOM",
            FileOpenMode::Input => "INPUT",
            FileOpenMode::Output => "OUTPUT",
            FileOpenMode::Append => "APPEND",
        }
    }
}

/// OPEN ... ACCESS clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileAccessMode {
    ReadWrite,
    ReadOnly,
    WriteOnly,
}

impl FileAccessMode {
    /// Canonical name carried in the IR as a string operand.
    pub fn name(&self) -> &'static str {
        match self {
            FileAccessMode::ReadWrite => "READ_WRITE",
            FileAccessMode::ReadOnly => "READ_ONLY",
            FileAccessMode::WriteOnly => "WRITE_ONLY",
        }
    }
}

/// OPEN lock clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    Default,
    Shared,
    ReadWrite,
    Read,
    Write,
}

impl LockMode {
    /// Canonical name carried in the IR as a string operand.
    pub fn name(&self) -> &'static str {
        match self {
            LockMode::Default => "DEFAULT",
            LockMode::Shared => "SHARED",
            LockMode::ReadWrite => "READ_WRITE",
            LockMode::Read => "READ",
            LockMode::Write => "WRITE",
        }
    }
}

/// The statement kinds.
#[derive(Debug, Clone)]
pub enum StatementKind {
    /// `[LET] target = value`
    Let { target: VarRef, value: Expr },

    /// `PRINT [#filenum,] items`
    Print {
        file_number: Option<Expr>,
        items: Vec<PrintItem>,
    },

    /// `PRINT [#filenum,] USING format; items`
    PrintUsing {
        file_number: Option<Expr>,
        format: Expr,
        items: Vec<PrintItem>,
    },

    /// `WRITE [#filenum,] exprs`
    Write {
        file_number: Option<Expr>,
        exprs: Vec<Expr>,
    },

    /// `DIM name(d1, d2, ...)` — dimension sizes arrive as decimal text.
    Dim {
        name: String,
        suffix: Option<TypeSuffix>,
        dimensions: Vec<String>,
    },

    /// `DEF FNname(params) = body`
    DefFn {
        name: String,
        suffix: Option<TypeSuffix>,
        params: Vec<VarRef>,
        body: Expr,
    },

    /// `END`
    End,

    /// `WHILE condition`
    While { condition: Expr },

    /// `WEND`
    Wend,

    /// `FOR var = init TO end [STEP step]`
    For {
        var: VarRef,
        init: Expr,
        end: Expr,
        step: Option<Expr>,
    },

    /// `NEXT [var [, var ...]]`
    Next { vars: Vec<VarRef> },

    /// Single-line `IF condition THEN ... [ELSE ...]`
    If {
        condition: Expr,
        then_body: IfBody,
        else_body: Option<IfBody>,
    },

    /// `IF condition THEN BEGIN`
    IfThenBegin { condition: Expr },

    /// `ELSE BEGIN`
    ElseBegin,

    /// `END IF`
    EndIf,

    /// `GOSUB linenum`
    Gosub { line: u32 },

    /// `GOSUB "label"`
    GosubLabel { label: String },

    /// `RETURN [linenum]`
    Return { line: Option<u32> },

    /// `GOTO linenum`
    Goto { line: u32 },

    /// `GOTO "label"`
    GotoLabel { label: String },

    /// `LABEL "name"`
    Label { name: String },

    /// `SWAP a, b`
    Swap { left: VarRef, right: VarRef },

    /// `OPEN filename FOR mode [ACCESS ...] [lock] AS #filenum [LEN = reclen]`
    Open {
        filename: Expr,
        file_number: String,
        mode: FileOpenMode,
        access: Option<FileAccessMode>,
        lock: Option<LockMode>,
        record_len: Option<Expr>,
    },

    /// `CLOSE [#n [, #m ...]]` — file numbers as decimal text.
    Close { file_numbers: Vec<String> },

    /// `FIELD #filenum, len AS var, ...`
    Field {
        file_number: Expr,
        parts: Vec<(VarRef, String)>,
    },

    /// `PUT #filenum [, record]`
    Put {
        file_number: String,
        record: Option<Expr>,
    },

    /// `GET #filenum [, record]`
    Get {
        file_number: String,
        record: Option<Expr>,
    },

    /// `MID$(target, start [, len]) = replacement`
    MidStmt {
        target: VarRef,
        start: Expr,
        len: Option<Expr>,
        replacement: Expr,
    },

    /// `RANDOMIZE seed`
    Randomize { seed: Expr },

    /// `RANDOMIZE TIMER`
    RandomizeTimer,

    /// `DEFINT/DEFLNG/DEFSNG/DEFDBL/DEFSTR letter-ranges`
    DefType {
        data_type: DataType,
        ranges: Vec<(char, char)>,
    },

    /// `LSET var = expr`
    Lset { target: VarRef, value: Expr },

    /// `RSET var = expr`
    Rset { target: VarRef, value: Expr },

    /// `INPUT [prompt;] vars`
    Input {
        prompt: Option<Expr>,
        vars: Vec<VarRef>,
    },

    /// `INPUT #filenum, vars`
    InputHash { file_number: Expr, vars: Vec<VarRef> },

    /// `LINE INPUT [prompt;] var`
    LineInput { prompt: Option<Expr>, var: VarRef },

    /// `LINE INPUT #filenum, var`
    LineInputHash { file_number: Expr, var: VarRef },

    /// `READ vars`
    Read { vars: Vec<VarRef> },

    /// `RESTORE`
    Restore,

    /// `DATA values`
    Data { values: Vec<DataValue> },

    /// `REF src AS dst` — rebind dst to alias src.
    Ref { src: VarRef, dst: VarRef },

    /// `ARRAYFILL arr, value`
    ArrayFill { array: VarRef, value: Expr },

    /// `ARRAY1DSORT arr`
    Array1dSort { array: VarRef },

    /// `ARRAYCOPY src, dst`
    ArrayCopy { src: VarRef, dst: VarRef },

    /// `ARRAY1DCOPY src, src0, dst, dst0, len`
    Array1dCopy {
        src: VarRef,
        src0: Expr,
        dst: VarRef,
        dst0: Expr,
        len: Expr,
    },

    /// `ARRAY2DSHIFTHOR arr, by`
    Array2dShiftHor { array: VarRef, by: Expr },

    /// `ARRAY2DSHIFTVER arr, by`
    Array2dShiftVer { array: VarRef, by: Expr },

    // ==================== Graphics ====================
    /// `SCREEN title, w, h [, MANUALREPAINT]`
    Screen {
        title: Expr,
        width: Expr,
        height: Expr,
        manual_repaint: bool,
    },

    /// `REPAINT`
    Repaint,

    /// `CIRCLE (x, y), r1, r2 [, start, end] [, "F"]`
    Circle {
        x: Expr,
        y: Expr,
        r1: Expr,
        r2: Expr,
        start: Option<Expr>,
        end: Option<Expr>,
        fill: Option<Expr>,
    },

    /// `LINE (x1, y1) - (x2, y2) [, "BF"]`
    DrawLine {
        x1: Expr,
        y1: Expr,
        x2: Expr,
        y2: Expr,
        bf: Option<Expr>,
    },

    /// `COLOR r, g, b`
    Color { r: Expr, g: Expr, b: Expr },

    /// `PAINT (x, y), r, g, b`
    Paint {
        x: Expr,
        y: Expr,
        r: Expr,
        g: Expr,
        b: Expr,
    },

    /// `PSET (x, y) [, r, g, b]`
    Pset {
        x: Expr,
        y: Expr,
        r: Option<Expr>,
        g: Option<Expr>,
        b: Option<Expr>,
    },

    /// `GET (x1, y1) - (x2, y2), arr` (graphics capture)
    GraphicsGet {
        x1: Expr,
        y1: Expr,
        x2: Expr,
        y2: Expr,
        target: VarRef,
    },

    /// `PUT (x, y), arr [, action]` (graphics blit)
    GraphicsPut {
        x: Expr,
        y: Expr,
        source: VarRef,
        action: Option<Expr>,
    },

    /// `DRAW path$`
    Draw { path: Expr },

    /// `FONT name$, style$, size`
    Font { name: Expr, style: Expr, size: Expr },

    /// `DRAWSTR text$, x, y`
    DrawStr { text: Expr, x: Expr, y: Expr },

    /// `LOADIMG path$, arr`
    LoadImg { path: Expr, target: VarRef },

    /// `SAVEIMG path$, arr`
    SaveImg { path: Expr, source: VarRef },

    /// `CLS`
    Cls,

    /// `BEEP`
    Beep,

    /// `SLEEP millis`
    Sleep { millis: Expr },

    // ==================== Sound ====================
    /// `LOADWAV path$, var`
    LoadWav { path: Expr, target: VarRef },

    /// `PLAYWAV var`
    PlayWav { source: VarRef },

    /// `STOPWAV var`
    StopWav { source: VarRef },

    /// `LOOPWAV var`
    LoopWav { source: VarRef },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Expr;

    #[test]
    fn test_statement_builder() {
        let stmt = Statement::of(StatementKind::Let {
            target: VarRef::scalar("X"),
            value: Expr::integer("1"),
        });
        assert!(matches!(stmt.kind, StatementKind::Let { .. }));
        assert_eq!(stmt.span, Span::default());
    }

    #[test]
    fn test_mode_names() {
        assert_eq!(FileOpenMode::Random.name(), "RANDOM");
        assert_eq!(FileAccessMode::ReadWrite.name(), "READ_WRITE");
        assert_eq!(LockMode::Default.name(), "DEFAULT");
    }
}
