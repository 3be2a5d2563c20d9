//! Symbol table for QuailBASIC lowering.
//!
//! The symbol table owns every named and anonymous entity the compiler
//! creates: variables, compiler temporaries, branch labels, array
//! references, and user-defined functions. Each entry gets a dense
//! integer [`SymbolId`]; instructions refer to entries only by id.
//!
//! # Identity Rules
//!
//! A logical variable is the pair *(bare name, data type)*: `A%` and `A!`
//! are two distinct variables that coexist, following the dialect's
//! suffix-sigil convention. Names are case-insensitive; `count%` and
//! `COUNT%` are the same variable.
//!
//! # Scope Rules
//!
//! There is one flat global scope, plus a child *declaration scope* per
//! DEF FN body so that function parameters shadow globals while the body
//! is being lowered. Temporaries always live in the flat pool and remain
//! addressable globally, matching the dialect's loose scoping.

pub mod types;

pub use types::{DataType, TypeSuffix};

use std::collections::HashMap;
use std::fmt;

/// Dense identifier of a symbol-table entry.
///
/// Ids are assigned in allocation order starting at zero. The reserved
/// [`SymbolId::NULL`] marks an absent operand in an instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SymbolId(i32);

impl SymbolId {
    /// The reserved id denoting absence.
    pub const NULL: SymbolId = SymbolId(-1);

    /// Returns true if this is the reserved null id.
    pub fn is_null(&self) -> bool {
        self.0 < 0
    }

    /// The raw id value (-1 for null).
    pub fn raw(&self) -> i32 {
        self.0
    }

    /// Index into the entry vector. Panics on the null id.
    pub fn index(&self) -> usize {
        debug_assert!(self.0 >= 0, "null symbol id has no index");
        self.0 as usize
    }
}

impl fmt::Display for SymbolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            write!(f, "~")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

/// A variable's identity: bare name plus declared data type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VariableName {
    name: String,
    data_type: DataType,
}

impl VariableName {
    /// Creates a variable name, normalizing case.
    pub fn new(name: &str, data_type: DataType) -> Self {
        Self {
            name: name.to_uppercase(),
            data_type,
        }
    }

    /// The bare name, uppercased.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The declared data type.
    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    /// Whether this name follows the `FN` user-function convention.
    pub fn is_udf_name(&self) -> bool {
        self.name.len() > 2 && self.name.starts_with("FN")
    }
}

impl fmt::Display for VariableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.name, self.data_type.suffix_char())
    }
}

/// A literal value preloaded into a temporary.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int32(i32),
    Int64(i64),
    Float32(f32),
    Float64(f64),
    Str(String),
}

impl Value {
    /// The data type of this value.
    pub fn data_type(&self) -> DataType {
        match self {
            Value::Int32(_) => DataType::Int32,
            Value::Int64(_) => DataType::Int64,
            Value::Float32(_) => DataType::Float32,
            Value::Float64(_) => DataType::Float64,
            Value::Str(_) => DataType::String,
        }
    }
}

/// Array storage shape, set by DIM.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArrayInfo {
    /// Declared size of each dimension.
    pub dimensions: Vec<i32>,
}

impl ArrayInfo {
    /// Number of dimensions.
    pub fn rank(&self) -> usize {
        self.dimensions.len()
    }
}

/// The kind of a branch-target entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LabelKind {
    /// Synthetic label emitted by a LABEL instruction.
    Anonymous,
    /// Named label from a `LABEL "name"` statement, interned by string.
    Named(String),
    /// Forward-reference placeholder; never a LABEL operand, always
    /// patched away before lowering completes.
    GotoTarget,
}

/// A symbol-table entry.
///
/// The entry kinds form a closed set, so this is a sum type; code that
/// expects a particular kind pattern-matches and treats the other arms
/// as errors.
#[derive(Debug, Clone)]
pub enum SymbolEntry {
    /// A scalar or array variable.
    Variable {
        name: VariableName,
        /// `Some` once the variable has been DIM'd as an array.
        array: Option<ArrayInfo>,
    },
    /// An l-value alias for one element of an array, bound by
    /// RESET_ARRAY_IDX/SET_ARRAY_IDX/ARRAYREF instructions at runtime.
    ArrayRef {
        /// The array variable this reference indexes into.
        variable: SymbolId,
    },
    /// A user-defined function. The entry's own id doubles as the
    /// function's return-value id.
    Udf {
        name: VariableName,
        /// Declared parameter ids, in declaration order.
        params: Vec<SymbolId>,
    },
    /// A compiler temporary with a fixed type and optional preloaded
    /// literal value.
    Tmp {
        data_type: DataType,
        value: Option<Value>,
    },
    /// A branch target.
    Label(LabelKind),
}

impl SymbolEntry {
    /// Returns true for Variable and ArrayRef entries, the two kinds
    /// statements may name as storage operands.
    pub fn is_storage(&self) -> bool {
        matches!(
            self,
            SymbolEntry::Variable { .. } | SymbolEntry::ArrayRef { .. }
        )
    }
}

/// A declaration scope: the global pool or one DEF FN body.
#[derive(Debug)]
struct Scope {
    /// The UDF whose body this scope belongs to (None for global).
    udf: Option<SymbolId>,
    /// Variable identities declared in this scope.
    names: HashMap<VariableName, SymbolId>,
}

/// The symbol table.
#[derive(Debug)]
pub struct SymbolTable {
    entries: Vec<SymbolEntry>,
    /// Scope stack; index 0 is the global scope.
    scopes: Vec<Scope>,
    /// Named labels, interned by (uppercased) name.
    named_labels: HashMap<String, SymbolId>,
    /// Default type by first letter, index 0 = 'A'. Letters never named
    /// by a DEFtype statement default to DOUBLE.
    default_types: [DataType; 26],
}

impl SymbolTable {
    /// Creates an empty table with only the global scope.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            scopes: vec![Scope {
                udf: None,
                names: HashMap::new(),
            }],
            named_labels: HashMap::new(),
            default_types: [DataType::Float64; 26],
        }
    }

    fn push_entry(&mut self, entry: SymbolEntry) -> SymbolId {
        let id = SymbolId(self.entries.len() as i32);
        self.entries.push(entry);
        id
    }

    /// Looks up an entry by id.
    pub fn get(&self, id: SymbolId) -> Option<&SymbolEntry> {
        if id.is_null() {
            return None;
        }
        self.entries.get(id.index())
    }

    fn get_mut(&mut self, id: SymbolId) -> Option<&mut SymbolEntry> {
        if id.is_null() {
            return None;
        }
        self.entries.get_mut(id.index())
    }

    /// Number of allocated entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no entries have been allocated.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over `(id, entry)` pairs in allocation order.
    pub fn iter(&self) -> impl Iterator<Item = (SymbolId, &SymbolEntry)> {
        self.entries
            .iter()
            .enumerate()
            .map(|(i, e)| (SymbolId(i as i32), e))
    }

    /// The data type an entry's value carries, following array
    /// references to their element type. Labels have none.
    pub fn data_type(&self, id: SymbolId) -> Option<DataType> {
        match self.get(id)? {
            SymbolEntry::Variable { name, .. } => Some(name.data_type()),
            SymbolEntry::ArrayRef { variable } => self.data_type(*variable),
            SymbolEntry::Udf { name, .. } => Some(name.data_type()),
            SymbolEntry::Tmp { data_type, .. } => Some(*data_type),
            SymbolEntry::Label(_) => None,
        }
    }

    // ========================================================================
    // Name resolution
    // ========================================================================

    /// Resolves a bare name plus optional suffix to a data type.
    ///
    /// A suffix dictates the type outright; otherwise the first letter of
    /// the name selects from the default-type table.
    pub fn resolve_type(&self, bare_name: &str, suffix: Option<TypeSuffix>) -> DataType {
        if let Some(suffix) = suffix {
            return suffix.data_type();
        }
        let first = bare_name
            .chars()
            .next()
            .map(|c| c.to_ascii_uppercase())
            .unwrap_or('A');
        if first.is_ascii_uppercase() {
            self.default_types[(first as usize) - ('A' as usize)]
        } else {
            DataType::Float64
        }
    }

    /// Sets the default data type for one first letter (DEFtype).
    pub fn set_default_data_type(&mut self, letter: char, data_type: DataType) {
        let upper = letter.to_ascii_uppercase();
        if upper.is_ascii_uppercase() {
            self.default_types[(upper as usize) - ('A' as usize)] = data_type;
        }
    }

    /// Idempotent get-or-create for a variable or UDF identity.
    ///
    /// Looks the name up through the scope chain (innermost first). When
    /// absent, `factory` builds the new entry, which is registered in the
    /// *current* scope. Returns the id and whether the entry was created
    /// by this call.
    pub fn variable_or_udf<F>(&mut self, name: &VariableName, factory: F) -> (SymbolId, bool)
    where
        F: FnOnce(&VariableName) -> SymbolEntry,
    {
        for scope in self.scopes.iter().rev() {
            if let Some(&id) = scope.names.get(name) {
                return (id, false);
            }
        }
        let id = self.push_entry(factory(name));
        self.scopes
            .last_mut()
            .expect("scope stack never empties")
            .names
            .insert(name.clone(), id);
        (id, true)
    }

    /// Looks a variable identity up without creating it.
    pub fn lookup(&self, name: &VariableName) -> Option<SymbolId> {
        for scope in self.scopes.iter().rev() {
            if let Some(&id) = scope.names.get(name) {
                return Some(id);
            }
        }
        None
    }

    /// Creates an entry in the current scope, shadowing any outer entry
    /// with the same identity.
    ///
    /// DEF FN parameter declarations use this so that a parameter named
    /// like an existing global gets its own id; ordinary references go
    /// through [`SymbolTable::variable_or_udf`] and see the chain.
    pub fn declare_in_current_scope<F>(&mut self, name: &VariableName, factory: F) -> SymbolId
    where
        F: FnOnce(&VariableName) -> SymbolEntry,
    {
        let scope = self.scopes.last_mut().expect("scope stack never empties");
        if let Some(&id) = scope.names.get(name) {
            return id;
        }
        let id = SymbolId(self.entries.len() as i32);
        self.entries.push(factory(name));
        self.scopes
            .last_mut()
            .expect("scope stack never empties")
            .names
            .insert(name.clone(), id);
        id
    }

    // ========================================================================
    // Temporaries
    // ========================================================================

    /// Allocates an uninitialized temporary of the given type.
    pub fn add_tmp(&mut self, data_type: DataType) -> SymbolId {
        self.push_entry(SymbolEntry::Tmp {
            data_type,
            value: None,
        })
    }

    /// Allocates a temporary preloaded with a literal value.
    pub fn add_tmp_value(&mut self, value: Value) -> SymbolId {
        self.push_entry(SymbolEntry::Tmp {
            data_type: value.data_type(),
            value: Some(value),
        })
    }

    /// Allocates a temporary with the same data type as the referent.
    ///
    /// Returns `None` if the referent has no data type (a label), which
    /// callers surface as an internal error.
    pub fn add_tmp_compatible_with(&mut self, id: SymbolId) -> Option<SymbolId> {
        let data_type = self.data_type(id)?;
        Some(self.add_tmp(data_type))
    }

    // ========================================================================
    // Labels
    // ========================================================================

    /// Allocates an anonymous label.
    pub fn add_label(&mut self) -> SymbolId {
        self.push_entry(SymbolEntry::Label(LabelKind::Anonymous))
    }

    /// Interns a named label, reusing the id on repeat mentions so a
    /// GOTO can precede or follow its LABEL statement.
    pub fn add_named_label(&mut self, name: &str) -> SymbolId {
        let key = name.to_uppercase();
        if let Some(&id) = self.named_labels.get(&key) {
            return id;
        }
        let id = self.push_entry(SymbolEntry::Label(LabelKind::Named(name.to_string())));
        self.named_labels.insert(key, id);
        id
    }

    /// Allocates a forward-reference placeholder. Every instruction
    /// operand holding one of these must be patched to a real label
    /// before lowering completes.
    pub fn add_goto_target(&mut self) -> SymbolId {
        self.push_entry(SymbolEntry::Label(LabelKind::GotoTarget))
    }

    // ========================================================================
    // Arrays and UDFs
    // ========================================================================

    /// Allocates an array-reference alias bound to a variable.
    pub fn add_array_reference(&mut self, variable: SymbolId) -> SymbolId {
        self.push_entry(SymbolEntry::ArrayRef { variable })
    }

    /// Records DIM'd dimensions on a variable entry.
    ///
    /// Returns false if the id is not a variable.
    pub fn set_array_dimensions(&mut self, id: SymbolId, dimensions: Vec<i32>) -> bool {
        match self.get_mut(id) {
            Some(SymbolEntry::Variable { array, .. }) => {
                *array = Some(ArrayInfo { dimensions });
                true
            }
            _ => false,
        }
    }

    /// Appends a declared parameter to a UDF entry.
    ///
    /// Returns false if the id is not a UDF.
    pub fn declare_udf_param(&mut self, udf: SymbolId, param: SymbolId) -> bool {
        match self.get_mut(udf) {
            Some(SymbolEntry::Udf { params, .. }) => {
                params.push(param);
                true
            }
            _ => false,
        }
    }

    // ========================================================================
    // Declaration scopes
    // ========================================================================

    /// Opens the declaration scope for a DEF FN body.
    pub fn push_declaration_scope(&mut self, udf: SymbolId) {
        self.scopes.push(Scope {
            udf: Some(udf),
            names: HashMap::new(),
        });
    }

    /// Closes the innermost declaration scope. The global scope is never
    /// popped.
    pub fn pop_scope(&mut self) {
        if self.scopes.len() > 1 {
            self.scopes.pop();
        }
    }

    /// The UDF whose body is currently being lowered, if any.
    pub fn current_udf(&self) -> Option<SymbolId> {
        self.scopes.last().and_then(|s| s.udf)
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}
