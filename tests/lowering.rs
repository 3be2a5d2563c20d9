//! IR-shape tests for the lowering pass.
//!
//! These tests build parse trees directly (the parser lives outside the
//! crate) and assert on the emitted opcode sequences, operand patching,
//! and semantic-error kinds.

use std::collections::HashSet;

use quailbasic::ast::{
    BinaryOp, Expr, IfBody, Line, PrintItem, Program, Statement, StatementKind, VarRef,
};
use quailbasic::error::ErrorKind;
use quailbasic::ir::OpCode;
use quailbasic::lowering::{lower, Compilation, Options};
use quailbasic::symbols::{DataType, LabelKind, SymbolEntry, TypeSuffix, Value};

fn compile(lines: Vec<Line>) -> Compilation {
    lower("", &Program::new(lines), Options::default()).expect("lowering failed")
}

fn compile_err(lines: Vec<Line>) -> ErrorKind {
    match lower("", &Program::new(lines), Options::default()) {
        Ok(_) => panic!("expected a semantic error"),
        Err(err) => err.semantic_kind().expect("expected a semantic error"),
    }
}

fn opcodes(compilation: &Compilation) -> Vec<OpCode> {
    compilation
        .ir
        .instructions()
        .iter()
        .map(|i| i.opcode())
        .collect()
}

fn let_stmt(target: VarRef, value: Expr) -> Statement {
    Statement::of(StatementKind::Let { target, value })
}

/// Every LABEL operand appears exactly once.
fn assert_labels_unique(compilation: &Compilation) {
    let mut seen = HashSet::new();
    for instr in compilation.ir.instructions() {
        if instr.opcode() == OpCode::Label {
            assert!(
                seen.insert(instr.op1()),
                "label {} declared twice",
                instr.op1()
            );
        }
    }
}

/// No operand still points at a goto-target placeholder.
fn assert_patches_complete(compilation: &Compilation) {
    for instr in compilation.ir.instructions() {
        for id in [instr.op1(), instr.op2()] {
            if id.is_null() {
                continue;
            }
            if let Some(SymbolEntry::Label(LabelKind::GotoTarget)) = compilation.symbols.get(id) {
                panic!("unpatched goto target {} in `{}`", id, instr);
            }
        }
    }
}

// ============================================================================
// Expression typing and promotion
// ============================================================================

#[test]
fn integer_plus_single_promotes_and_copy_coerces_into_double() {
    // LET X# = 2 + 3!
    let compilation = compile(vec![Line::numbered(
        10,
        vec![let_stmt(
            VarRef::suffixed("X", TypeSuffix::Hash),
            Expr::binary(BinaryOp::Add, Expr::integer("2"), Expr::single("3")),
        )],
    )]);

    let ops = opcodes(&compilation);
    assert_eq!(
        ops,
        vec![
            OpCode::Variable,
            OpCode::Value,
            OpCode::Value,
            OpCode::AddF32,
            OpCode::Copy,
            OpCode::Assign,
        ]
    );

    let instructions = compilation.ir.instructions();
    // The add produces a SINGLE temporary
    let add = &instructions[3];
    assert_eq!(
        compilation.symbols.data_type(add.result()),
        Some(DataType::Float32)
    );
    // The copy coerces it into a DOUBLE temporary
    let copy = &instructions[4];
    assert_eq!(
        compilation.symbols.data_type(copy.result()),
        Some(DataType::Float64)
    );
    // The assign stores that temporary into X#
    let assign = &instructions[5];
    assert_eq!(assign.op2(), copy.result());
    assert_eq!(
        compilation.symbols.data_type(assign.op1()),
        Some(DataType::Float64)
    );
}

#[test]
fn string_plus_string_concatenates() {
    let compilation = compile(vec![Line::numbered(
        10,
        vec![let_stmt(
            VarRef::suffixed("A", TypeSuffix::Dollar),
            Expr::binary(BinaryOp::Add, Expr::string("foo"), Expr::string("bar")),
        )],
    )]);
    let ops = opcodes(&compilation);
    assert_eq!(
        ops,
        vec![
            OpCode::Variable,
            OpCode::Value,
            OpCode::Value,
            OpCode::Concat,
            OpCode::Assign,
        ]
    );
}

#[test]
fn float_division_always_yields_double() {
    // LET X# = 1 / 2 over two INTEGER literals
    let compilation = compile(vec![Line::numbered(
        10,
        vec![let_stmt(
            VarRef::suffixed("X", TypeSuffix::Hash),
            Expr::binary(BinaryOp::FloatDiv, Expr::integer("1"), Expr::integer("2")),
        )],
    )]);
    let ops = opcodes(&compilation);
    // No coercion copy: FDIV already produced a DOUBLE
    assert_eq!(
        ops,
        vec![
            OpCode::Variable,
            OpCode::Value,
            OpCode::Value,
            OpCode::Fdiv,
            OpCode::Assign,
        ]
    );
    let fdiv = &compilation.ir.instructions()[3];
    assert_eq!(
        compilation.symbols.data_type(fdiv.result()),
        Some(DataType::Float64)
    );
}

#[test]
fn string_numeric_mixing_is_rejected() {
    let kind = compile_err(vec![Line::numbered(
        10,
        vec![let_stmt(
            VarRef::suffixed("A", TypeSuffix::Dollar),
            Expr::binary(BinaryOp::Add, Expr::string("x"), Expr::integer("1")),
        )],
    )]);
    assert_eq!(kind, ErrorKind::DataTypeMismatch);

    let kind = compile_err(vec![Line::numbered(
        10,
        vec![let_stmt(
            VarRef::suffixed("B", TypeSuffix::Percent),
            Expr::binary(BinaryOp::Lt, Expr::string("x"), Expr::integer("1")),
        )],
    )]);
    assert_eq!(kind, ErrorKind::DataTypeMismatch);
}

#[test]
fn comparison_results_are_long() {
    let compilation = compile(vec![Line::numbered(
        10,
        vec![let_stmt(
            VarRef::suffixed("B", TypeSuffix::Ampersand),
            Expr::binary(BinaryOp::Ge, Expr::integer("2"), Expr::double("1.5")),
        )],
    )]);
    let ops = opcodes(&compilation);
    assert!(ops.contains(&OpCode::GeF64));
    let cmp = compilation
        .ir
        .instructions()
        .iter()
        .find(|i| i.opcode() == OpCode::GeF64)
        .unwrap();
    assert_eq!(
        compilation.symbols.data_type(cmp.result()),
        Some(DataType::Int64)
    );
}

#[test]
fn assigning_string_to_numeric_is_rejected() {
    let kind = compile_err(vec![Line::numbered(
        10,
        vec![let_stmt(
            VarRef::suffixed("N", TypeSuffix::Percent),
            Expr::string("nope"),
        )],
    )]);
    assert_eq!(kind, ErrorKind::DataTypeMismatch);
}

// ============================================================================
// Variables, defaults, arrays
// ============================================================================

#[test]
fn deftype_changes_unsuffixed_resolution() {
    // DEFINT I-N: LET INDEX = 1 makes INDEX an INTEGER
    let compilation = compile(vec![
        Line::numbered(
            10,
            vec![Statement::of(StatementKind::DefType {
                data_type: DataType::Int32,
                ranges: vec![('I', 'N')],
            })],
        ),
        Line::numbered(
            20,
            vec![let_stmt(VarRef::scalar("INDEX"), Expr::integer("1"))],
        ),
        Line::numbered(30, vec![let_stmt(VarRef::scalar("X"), Expr::double("1.0"))]),
    ]);

    let assigns: Vec<_> = compilation
        .ir
        .instructions()
        .iter()
        .filter(|i| i.opcode() == OpCode::Assign)
        .collect();
    assert_eq!(
        compilation.symbols.data_type(assigns[0].op1()),
        Some(DataType::Int32)
    );
    // Unset letters default to DOUBLE
    assert_eq!(
        compilation.symbols.data_type(assigns[1].op1()),
        Some(DataType::Float64)
    );
}

#[test]
fn array_element_assignment_builds_index_vector() {
    let compilation = compile(vec![
        Line::numbered(
            10,
            vec![Statement::of(StatementKind::Dim {
                name: "A".to_string(),
                suffix: Some(TypeSuffix::Percent),
                dimensions: vec!["10".to_string()],
            })],
        ),
        Line::numbered(
            20,
            vec![let_stmt(
                VarRef::indexed("A", Some(TypeSuffix::Percent), vec![Expr::integer("2")]),
                Expr::integer("5"),
            )],
        ),
    ]);
    let ops = opcodes(&compilation);
    assert_eq!(
        ops,
        vec![
            OpCode::Value,
            OpCode::ResetArrayIdx,
            OpCode::SetArrayIdx,
            OpCode::ArrayRef,
            OpCode::Variable,
            OpCode::Value,
            OpCode::Assign,
        ]
    );
    // The assignment target is the array reference, typed as the element
    let assign = compilation.ir.instructions().last().unwrap();
    assert!(matches!(
        compilation.symbols.get(assign.op1()),
        Some(SymbolEntry::ArrayRef { .. })
    ));
    assert_eq!(
        compilation.symbols.data_type(assign.op1()),
        Some(DataType::Int32)
    );
}

#[test]
fn indexing_a_scalar_is_rejected() {
    // LET A% = 1 : LET B% = A%(0)
    let kind = compile_err(vec![Line::numbered(
        10,
        vec![
            let_stmt(VarRef::suffixed("A", TypeSuffix::Percent), Expr::integer("1")),
            let_stmt(
                VarRef::suffixed("B", TypeSuffix::Percent),
                Expr::var_ref(VarRef::indexed(
                    "A",
                    Some(TypeSuffix::Percent),
                    vec![Expr::integer("0")],
                )),
            ),
        ],
    )]);
    assert_eq!(kind, ErrorKind::ScalarVariableCannotBeIndexed);
}

#[test]
fn simultaneous_suffixes_are_distinct_variables() {
    let compilation = compile(vec![Line::numbered(
        10,
        vec![
            let_stmt(VarRef::suffixed("A", TypeSuffix::Percent), Expr::integer("1")),
            let_stmt(VarRef::suffixed("A", TypeSuffix::Exclamation), Expr::single("2")),
        ],
    )]);
    let assigns: Vec<_> = compilation
        .ir
        .instructions()
        .iter()
        .filter(|i| i.opcode() == OpCode::Assign)
        .collect();
    assert_ne!(assigns[0].op1(), assigns[1].op1());
}

// ============================================================================
// Control flow
// ============================================================================

#[test]
fn while_wend_shape_and_patching() {
    // WHILE 1 ... WEND
    let compilation = compile(vec![
        Line::numbered(
            10,
            vec![Statement::of(StatementKind::While {
                condition: Expr::integer("1"),
            })],
        ),
        Line::numbered(20, vec![Statement::of(StatementKind::Wend)]),
    ]);
    let ops = opcodes(&compilation);
    assert_eq!(
        ops,
        vec![
            OpCode::Label,
            OpCode::Value,
            OpCode::Not,
            OpCode::GotoLabelIf,
            OpCode::GotoLabel,
            OpCode::Label,
        ]
    );
    let instructions = compilation.ir.instructions();
    // Exit jump lands on the label after WEND
    assert_eq!(instructions[3].op2(), instructions[5].op1());
    // Back jump lands on the label before WHILE
    assert_eq!(instructions[4].op1(), instructions[0].op1());
    assert_labels_unique(&compilation);
    assert_patches_complete(&compilation);
}

#[test]
fn wend_without_while_is_rejected() {
    let kind = compile_err(vec![Line::numbered(
        10,
        vec![Statement::of(StatementKind::Wend)],
    )]);
    assert_eq!(kind, ErrorKind::WendWithoutWhile);
}

#[test]
fn while_without_wend_is_rejected_at_end_of_program() {
    let kind = compile_err(vec![Line::numbered(
        10,
        vec![Statement::of(StatementKind::While {
            condition: Expr::integer("1"),
        })],
    )]);
    assert_eq!(kind, ErrorKind::WhileWithoutWend);
}

fn for_program() -> Vec<Line> {
    // FOR I% = 5 TO 1 STEP -1 : LET T% = T% * 10 + I% : NEXT
    vec![
        Line::numbered(
            10,
            vec![Statement::of(StatementKind::For {
                var: VarRef::suffixed("I", TypeSuffix::Percent),
                init: Expr::integer("5"),
                end: Expr::integer("1"),
                step: Some(Expr::neg(Expr::integer("1"))),
            })],
        ),
        Line::numbered(
            20,
            vec![let_stmt(
                VarRef::suffixed("T", TypeSuffix::Percent),
                Expr::binary(
                    BinaryOp::Add,
                    Expr::binary(
                        BinaryOp::Mul,
                        Expr::var_sfx("T", TypeSuffix::Percent),
                        Expr::integer("10"),
                    ),
                    Expr::var_sfx("I", TypeSuffix::Percent),
                ),
            )],
        ),
        Line::numbered(30, vec![Statement::of(StatementKind::Next { vars: vec![] })]),
    ]
}

#[test]
fn for_next_emits_step_check_and_patches() {
    let compilation = compile(for_program());
    let ops = opcodes(&compilation);

    // The step-sign check: GE, GT, AND, LT, LT, AND, OR, conditional exit
    let check = [
        OpCode::GeI32,
        OpCode::GtI32,
        OpCode::And,
        OpCode::LtI32,
        OpCode::LtI32,
        OpCode::And,
        OpCode::Or,
        OpCode::GotoLabelIf,
    ];
    let pos = ops
        .windows(check.len())
        .position(|w| w == &check[..])
        .expect("FOR check sequence missing");

    // Increment uses the loop variable's type
    assert!(ops.contains(&OpCode::AddI32));

    // The conditional exit is patched to the label emitted at NEXT
    let instructions = compilation.ir.instructions();
    let exit = &instructions[pos + check.len() - 1];
    let last_label = instructions
        .iter()
        .rev()
        .find(|i| i.opcode() == OpCode::Label)
        .unwrap();
    assert_eq!(exit.op2(), last_label.op1());

    assert_labels_unique(&compilation);
    assert_patches_complete(&compilation);
}

#[test]
fn next_without_for_is_rejected() {
    let kind = compile_err(vec![Line::numbered(
        10,
        vec![Statement::of(StatementKind::Next { vars: vec![] })],
    )]);
    assert_eq!(kind, ErrorKind::NextWithoutFor);
}

#[test]
fn next_with_wrong_variable_is_rejected() {
    let kind = compile_err(vec![
        Line::numbered(
            10,
            vec![Statement::of(StatementKind::For {
                var: VarRef::suffixed("I", TypeSuffix::Percent),
                init: Expr::integer("1"),
                end: Expr::integer("3"),
                step: None,
            })],
        ),
        Line::numbered(
            20,
            vec![Statement::of(StatementKind::Next {
                vars: vec![VarRef::suffixed("J", TypeSuffix::Percent)],
            })],
        ),
    ]);
    assert_eq!(kind, ErrorKind::NextWithoutFor);
}

#[test]
fn for_without_next_is_rejected_at_end_of_program() {
    let kind = compile_err(vec![Line::numbered(
        10,
        vec![Statement::of(StatementKind::For {
            var: VarRef::suffixed("I", TypeSuffix::Percent),
            init: Expr::integer("1"),
            end: Expr::integer("3"),
            step: None,
        })],
    )]);
    assert_eq!(kind, ErrorKind::ForWithoutNext);
}

#[test]
fn nested_next_list_closes_loops_innermost_first() {
    let compilation = compile(vec![
        Line::numbered(
            10,
            vec![Statement::of(StatementKind::For {
                var: VarRef::suffixed("I", TypeSuffix::Percent),
                init: Expr::integer("1"),
                end: Expr::integer("3"),
                step: None,
            })],
        ),
        Line::numbered(
            20,
            vec![Statement::of(StatementKind::For {
                var: VarRef::suffixed("J", TypeSuffix::Percent),
                init: Expr::integer("1"),
                end: Expr::integer("3"),
                step: None,
            })],
        ),
        Line::numbered(
            30,
            vec![Statement::of(StatementKind::Next {
                vars: vec![
                    VarRef::suffixed("J", TypeSuffix::Percent),
                    VarRef::suffixed("I", TypeSuffix::Percent),
                ],
            })],
        ),
    ]);
    assert_labels_unique(&compilation);
    assert_patches_complete(&compilation);
}

#[test]
fn single_line_if_else_shape() {
    let compilation = compile(vec![Line::numbered(
        10,
        vec![Statement::of(StatementKind::If {
            condition: Expr::integer("1"),
            then_body: IfBody::Statements(vec![let_stmt(
                VarRef::suffixed("A", TypeSuffix::Percent),
                Expr::integer("1"),
            )]),
            else_body: Some(IfBody::Statements(vec![let_stmt(
                VarRef::suffixed("A", TypeSuffix::Percent),
                Expr::integer("2"),
            )])),
        })],
    )]);
    let ops = opcodes(&compilation);
    assert_eq!(ops[0], OpCode::Value); // condition
    assert_eq!(ops[1], OpCode::GotoLabelIf);
    assert_eq!(ops[2], OpCode::GotoLabel);
    assert_eq!(ops[3], OpCode::Label); // L_then
    let instructions = compilation.ir.instructions();
    assert_eq!(instructions[1].op2(), instructions[3].op1());
    assert_labels_unique(&compilation);
    assert_patches_complete(&compilation);
}

#[test]
fn then_line_number_becomes_goto() {
    let compilation = compile(vec![Line::numbered(
        10,
        vec![Statement::of(StatementKind::If {
            condition: Expr::integer("1"),
            then_body: IfBody::LineNumber(100),
            else_body: None,
        })],
    )]);
    let goto = compilation
        .ir
        .instructions()
        .iter()
        .find(|i| i.opcode() == OpCode::GotoLineNum)
        .expect("THEN linenum lowers to GOTO_LINENUM");
    assert!(matches!(
        compilation.symbols.get(goto.op1()),
        Some(SymbolEntry::Tmp {
            value: Some(Value::Int32(100)),
            ..
        })
    ));
}

#[test]
fn nested_if_then_begin_blocks_balance() {
    let compilation = compile(vec![
        Line::numbered(
            10,
            vec![Statement::of(StatementKind::IfThenBegin {
                condition: Expr::integer("1"),
            })],
        ),
        Line::numbered(
            20,
            vec![Statement::of(StatementKind::IfThenBegin {
                condition: Expr::integer("0"),
            })],
        ),
        Line::numbered(30, vec![Statement::of(StatementKind::ElseBegin)]),
        Line::numbered(40, vec![Statement::of(StatementKind::EndIf)]),
        Line::numbered(50, vec![Statement::of(StatementKind::EndIf)]),
    ]);
    assert_labels_unique(&compilation);
    assert_patches_complete(&compilation);
}

#[test]
fn mismatched_end_if_and_else_begin_are_rejected() {
    let kind = compile_err(vec![Line::numbered(
        10,
        vec![Statement::of(StatementKind::EndIf)],
    )]);
    assert_eq!(kind, ErrorKind::MismatchedEndIf);

    let kind = compile_err(vec![Line::numbered(
        10,
        vec![Statement::of(StatementKind::ElseBegin)],
    )]);
    assert_eq!(kind, ErrorKind::MismatchedElseBegin);

    // Unclosed IF THEN BEGIN at end of program
    let kind = compile_err(vec![Line::numbered(
        10,
        vec![Statement::of(StatementKind::IfThenBegin {
            condition: Expr::integer("1"),
        })],
    )]);
    assert_eq!(kind, ErrorKind::MismatchedEndIf);
}

#[test]
fn gosub_pushes_patched_return_label() {
    let compilation = compile(vec![Line::numbered(
        10,
        vec![Statement::of(StatementKind::Gosub { line: 100 })],
    )]);
    let ops = opcodes(&compilation);
    assert_eq!(
        ops,
        vec![OpCode::PushRetLabel, OpCode::GotoLineNum, OpCode::Label]
    );
    let instructions = compilation.ir.instructions();
    assert_eq!(instructions[0].op1(), instructions[2].op1());
    assert_patches_complete(&compilation);
}

#[test]
fn named_labels_intern_across_forward_references() {
    let compilation = compile(vec![
        Line::numbered(
            10,
            vec![Statement::of(StatementKind::GotoLabel {
                label: "loop".to_string(),
            })],
        ),
        Line::numbered(
            20,
            vec![Statement::of(StatementKind::Label {
                name: "LOOP".to_string(),
            })],
        ),
    ]);
    let instructions = compilation.ir.instructions();
    assert_eq!(instructions[0].opcode(), OpCode::GotoLabel);
    assert_eq!(instructions[1].opcode(), OpCode::Label);
    assert_eq!(instructions[0].op1(), instructions[1].op1());
    assert_labels_unique(&compilation);
}

// ============================================================================
// UDFs
// ============================================================================

fn def_fnf_recursive() -> Line {
    // DEF FNF(N) = N * FNF(N - 1)
    Line::numbered(
        10,
        vec![Statement::of(StatementKind::DefFn {
            name: "FNF".to_string(),
            suffix: None,
            params: vec![VarRef::scalar("N")],
            body: Expr::binary(
                BinaryOp::Mul,
                Expr::var("N"),
                Expr::var_ref(VarRef::indexed(
                    "FNF",
                    None,
                    vec![Expr::binary(BinaryOp::Sub, Expr::var("N"), Expr::integer("1"))],
                )),
            ),
        })],
    )
}

#[test]
fn recursive_udf_call_sites_are_balanced() {
    let compilation = compile(vec![
        def_fnf_recursive(),
        // LET R = FNF(5)
        Line::numbered(
            20,
            vec![let_stmt(
                VarRef::scalar("R"),
                Expr::var_ref(VarRef::indexed("FNF", None, vec![Expr::integer("5")])),
            )],
        ),
    ]);

    let instructions = compilation.ir.instructions();
    let pushes: Vec<_> = instructions
        .iter()
        .filter(|i| i.opcode() == OpCode::PushRtScope)
        .collect();
    let pops = instructions
        .iter()
        .filter(|i| i.opcode() == OpCode::PopRtScope)
        .count();
    // One recursive call inside the body plus the outer call site
    assert_eq!(pushes.len(), 2);
    assert_eq!(pops, 2);
    for push in &pushes {
        // op2 patched to the caller-return label
        assert!(!push.op2().is_null());
        assert!(matches!(
            compilation.symbols.get(push.op2()),
            Some(SymbolEntry::Label(LabelKind::Anonymous))
        ));
    }
    // The body returns through GOTO_CALLER exactly once
    let callers = instructions
        .iter()
        .filter(|i| i.opcode() == OpCode::GotoCaller)
        .count();
    assert_eq!(callers, 1);
    assert_labels_unique(&compilation);
    assert_patches_complete(&compilation);
}

#[test]
fn udf_arity_mismatch_is_rejected() {
    let kind = compile_err(vec![
        def_fnf_recursive(),
        Line::numbered(
            20,
            vec![let_stmt(
                VarRef::scalar("R"),
                Expr::var_ref(VarRef::indexed(
                    "FNF",
                    None,
                    vec![Expr::integer("5"), Expr::integer("6")],
                )),
            )],
        ),
    ]);
    assert_eq!(kind, ErrorKind::InsufficientUdfArgs);
}

#[test]
fn assigning_to_a_udf_is_rejected() {
    let kind = compile_err(vec![
        def_fnf_recursive(),
        Line::numbered(20, vec![let_stmt(VarRef::scalar("FNF"), Expr::integer("1"))]),
    ]);
    assert_eq!(kind, ErrorKind::BadAssignment);
}

#[test]
fn calling_an_undefined_fn_name_is_rejected() {
    let kind = compile_err(vec![Line::numbered(
        10,
        vec![let_stmt(
            VarRef::scalar("R"),
            Expr::var_ref(VarRef::indexed("FNMISSING", None, vec![Expr::integer("1")])),
        )],
    )]);
    assert_eq!(kind, ErrorKind::NotDefined);
}

#[test]
fn udf_parameters_shadow_globals_inside_the_body_only() {
    // LET N = 7, then DEF FNG(N) = N + 1, then LET M = N + 1
    let compilation = compile(vec![
        Line::numbered(10, vec![let_stmt(VarRef::scalar("N"), Expr::double("7"))]),
        Line::numbered(
            20,
            vec![Statement::of(StatementKind::DefFn {
                name: "FNG".to_string(),
                suffix: None,
                params: vec![VarRef::scalar("N")],
                body: Expr::binary(BinaryOp::Add, Expr::var("N"), Expr::integer("1")),
            })],
        ),
        Line::numbered(
            30,
            vec![let_stmt(
                VarRef::scalar("M"),
                Expr::binary(BinaryOp::Add, Expr::var("N"), Expr::integer("1")),
            )],
        ),
    ]);

    // The body's parameter id differs from the global N's id
    let instructions = compilation.ir.instructions();
    let global_n = instructions[0].op1(); // first LET target
    let assigns: Vec<_> = instructions
        .iter()
        .filter(|i| i.opcode() == OpCode::Assign)
        .collect();
    // Line 30 reads the global N again
    let adds: Vec<_> = instructions
        .iter()
        .filter(|i| i.opcode() == OpCode::AddF64)
        .collect();
    assert_eq!(adds.len(), 2);
    // Body add reads the parameter, not the global
    assert_ne!(adds[0].op1(), global_n);
    // Outer add reads the global
    assert_eq!(adds[1].op1(), global_n);
    assert_eq!(assigns.len(), 2);
}

// ============================================================================
// PRINT family
// ============================================================================

#[test]
fn print_appends_newline_and_flush() {
    let compilation = compile(vec![Line::numbered(
        10,
        vec![Statement::of(StatementKind::Print {
            file_number: None,
            items: vec![PrintItem::Expr(Expr::integer("1"))],
        })],
    )]);
    let ops = opcodes(&compilation);
    assert_eq!(
        ops,
        vec![OpCode::Value, OpCode::Print, OpCode::Print, OpCode::Flush]
    );
    // Flush with no file number carries a null operand
    assert!(compilation.ir.instructions()[3].op1().is_null());
}

#[test]
fn trailing_separator_suppresses_newline() {
    let compilation = compile(vec![Line::numbered(
        10,
        vec![Statement::of(StatementKind::Print {
            file_number: None,
            items: vec![PrintItem::Expr(Expr::integer("1")), PrintItem::Separator],
        })],
    )]);
    let ops = opcodes(&compilation);
    assert_eq!(ops, vec![OpCode::Value, OpCode::Print, OpCode::Flush]);
}

#[test]
fn print_using_shares_one_format_id() {
    let compilation = compile(vec![Line::numbered(
        10,
        vec![Statement::of(StatementKind::PrintUsing {
            file_number: None,
            format: Expr::string("##.#"),
            items: vec![
                PrintItem::Expr(Expr::integer("1")),
                PrintItem::Expr(Expr::integer("2")),
            ],
        })],
    )]);
    let usings: Vec<_> = compilation
        .ir
        .instructions()
        .iter()
        .filter(|i| i.opcode() == OpCode::PrintUsing)
        .collect();
    assert_eq!(usings.len(), 2);
    assert_eq!(usings[0].op1(), usings[1].op1());
}

#[test]
fn write_separates_with_commas_and_always_ends_line() {
    let compilation = compile(vec![Line::numbered(
        10,
        vec![Statement::of(StatementKind::Write {
            file_number: None,
            exprs: vec![Expr::integer("1"), Expr::integer("2")],
        })],
    )]);
    let ops = opcodes(&compilation);
    assert_eq!(
        ops,
        vec![
            OpCode::Value,
            OpCode::Write,
            OpCode::Print, // comma
            OpCode::Value,
            OpCode::Write,
            OpCode::Print, // newline
            OpCode::Flush,
        ]
    );
}

// ============================================================================
// Files and misc statements
// ============================================================================

#[test]
fn open_pushes_params_in_documented_order() {
    let compilation = compile(vec![Line::numbered(
        10,
        vec![Statement::of(StatementKind::Open {
            filename: Expr::string("data.txt"),
            file_number: "1".to_string(),
            mode: quailbasic::ast::FileOpenMode::Input,
            access: None,
            lock: None,
            record_len: None,
        })],
    )]);
    let ops = opcodes(&compilation);
    assert_eq!(
        ops,
        vec![OpCode::Value, OpCode::Param2, OpCode::Param2, OpCode::Open]
    );
    // Default record length is preloaded
    let open = compilation.ir.instructions().last().unwrap();
    assert!(matches!(
        compilation.symbols.get(open.op2()),
        Some(SymbolEntry::Tmp {
            value: Some(Value::Int32(128)),
            ..
        })
    ));
}

#[test]
fn close_without_numbers_closes_all() {
    let compilation = compile(vec![Line::numbered(
        10,
        vec![Statement::of(StatementKind::Close {
            file_numbers: vec![],
        })],
    )]);
    assert_eq!(opcodes(&compilation), vec![OpCode::CloseAll]);

    let compilation = compile(vec![Line::numbered(
        10,
        vec![Statement::of(StatementKind::Close {
            file_numbers: vec!["1".to_string(), "2".to_string()],
        })],
    )]);
    assert_eq!(opcodes(&compilation), vec![OpCode::Close, OpCode::Close]);
}

#[test]
fn swap_requires_identical_types() {
    let kind = compile_err(vec![Line::numbered(
        10,
        vec![
            let_stmt(VarRef::suffixed("A", TypeSuffix::Percent), Expr::integer("1")),
            let_stmt(VarRef::suffixed("B", TypeSuffix::Dollar), Expr::string("x")),
            Statement::of(StatementKind::Swap {
                left: VarRef::suffixed("A", TypeSuffix::Percent),
                right: VarRef::suffixed("B", TypeSuffix::Dollar),
            }),
        ],
    )]);
    assert_eq!(kind, ErrorKind::DataTypeMismatch);
}

#[test]
fn array_statistics_require_defined_arrays() {
    use quailbasic::ast::{Array1dFunc, Builtin};
    let kind = compile_err(vec![Line::numbered(
        10,
        vec![let_stmt(
            VarRef::scalar("M"),
            Expr::of(quailbasic::ast::ExprKind::Builtin(Builtin::Array1d {
                func: Array1dFunc::Mean,
                array: VarRef::suffixed("A", TypeSuffix::Percent),
            })),
        )],
    )]);
    assert_eq!(kind, ErrorKind::NotDefined);
}

#[test]
fn graphics_without_runtime_is_an_internal_error() {
    let result = lower(
        "",
        &Program::new(vec![Line::numbered(
            10,
            vec![Statement::of(StatementKind::Cls)],
        )]),
        Options::default(),
    );
    let err = result.expect_err("CLS without graphics should fail");
    assert!(err.semantic_kind().is_none());

    // With the runtime enabled it lowers fine
    let compilation = lower(
        "",
        &Program::new(vec![Line::numbered(
            10,
            vec![Statement::of(StatementKind::Cls)],
        )]),
        Options { graphics: true },
    )
    .unwrap();
    assert_eq!(opcodes(&compilation), vec![OpCode::Cls]);
}

// ============================================================================
// Determinism
// ============================================================================

#[test]
fn lowering_is_deterministic() {
    let first = compile(for_program());
    let second = compile(for_program());
    let tuples = |c: &Compilation| {
        c.ir
            .instructions()
            .iter()
            .map(|i| (i.opcode(), i.op1().raw(), i.op2().raw(), i.result().raw()))
            .collect::<Vec<_>>()
    };
    assert_eq!(tuples(&first), tuples(&second));
}
