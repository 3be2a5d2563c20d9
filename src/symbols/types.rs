//! Data types for QuailBASIC lowering.
//!
//! The dialect has exactly five data types: four numeric types forming a
//! widening lattice, plus strings, which never mix with numbers.
//!
//! # Type Suffixes
//!
//! Variables declare their type with a trailing sigil:
//! - `%` INTEGER (count%)
//! - `&` or `@` LONG (total&)
//! - `!` SINGLE (ratio!)
//! - `#` DOUBLE (pi#)
//! - `$` STRING (name$)
//!
//! A variable without a suffix takes its type from the default-type table
//! (see [`crate::symbols::SymbolTable`]), which DEFINT/DEFLNG/DEFSNG/
//! DEFDBL/DEFSTR statements configure per first letter.

use std::fmt;

/// A QuailBASIC data type.
///
/// The numeric types are ordered `Int32 < Int64 < Float32 < Float64`;
/// binary numeric operations produce the join of their operand types.
/// `String` sits outside the lattice entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    /// 32-bit signed integer (`%`).
    Int32,
    /// 64-bit signed integer (`&` / `@`).
    Int64,
    /// 32-bit IEEE float (`!`).
    Float32,
    /// 64-bit IEEE float (`#`).
    Float64,
    /// Variable-length string (`$`).
    String,
}

impl DataType {
    /// Returns true for the four numeric types.
    pub fn is_numeric(&self) -> bool {
        !matches!(self, DataType::String)
    }

    /// Returns true for `String`.
    pub fn is_string(&self) -> bool {
        matches!(self, DataType::String)
    }

    /// Position in the widening lattice. Strings have no rank.
    fn rank(&self) -> Option<u8> {
        match self {
            DataType::Int32 => Some(1),
            DataType::Int64 => Some(2),
            DataType::Float32 => Some(3),
            DataType::Float64 => Some(4),
            DataType::String => None,
        }
    }

    /// The join of two numeric types in the widening lattice.
    ///
    /// Returns `None` if either side is a string; the caller turns that
    /// into a data-type-mismatch error with source context.
    pub fn upcast(self, other: DataType) -> Option<DataType> {
        let a = self.rank()?;
        let b = other.rank()?;
        Some(if a >= b { self } else { other })
    }

    /// The suffix sigil that declares this type.
    pub fn suffix_char(&self) -> char {
        match self {
            DataType::Int32 => '%',
            DataType::Int64 => '&',
            DataType::Float32 => '!',
            DataType::Float64 => '#',
            DataType::String => '$',
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Int32 => write!(f, "INTEGER"),
            DataType::Int64 => write!(f, "LONG"),
            DataType::Float32 => write!(f, "SINGLE"),
            DataType::Float64 => write!(f, "DOUBLE"),
            DataType::String => write!(f, "STRING"),
        }
    }
}

/// A type suffix as it appears in source.
///
/// The parse tree hands suffixes over as this closed enum, so an invalid
/// sigil is unrepresentable past the grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeSuffix {
    /// `%`
    Percent,
    /// `&`
    Ampersand,
    /// `@`
    At,
    /// `!`
    Exclamation,
    /// `#`
    Hash,
    /// `$`
    Dollar,
}

impl TypeSuffix {
    /// The data type this suffix declares.
    pub fn data_type(&self) -> DataType {
        match self {
            TypeSuffix::Percent => DataType::Int32,
            TypeSuffix::Ampersand | TypeSuffix::At => DataType::Int64,
            TypeSuffix::Exclamation => DataType::Float32,
            TypeSuffix::Hash => DataType::Float64,
            TypeSuffix::Dollar => DataType::String,
        }
    }
}
