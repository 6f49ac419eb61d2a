//! Schema registry: the header contract, column kinds, and the
//! category-keyed requirement table.
//!
//! Everything here is static. [`check_consistency`] cross-checks the
//! requirement table against the header contract and runs whenever a
//! dispatcher is built.

use serde::{Deserialize, Serialize};
use sheetmail_types::{Header, Result, SheetMailError};

pub const COD: &str = "COD";
pub const NOME: &str = "NOME";
pub const PAD: &str = "PAD";
pub const FISIO: &str = "FISIO";
pub const FONO: &str = "FONO";
pub const NUTRI: &str = "NUTRI";
pub const MEDICO: &str = "MEDICO";
pub const ENFERMEIRO: &str = "ENFERMEIRO";
pub const H12: &str = "12H";
pub const H24: &str = "24H";
pub const PONTUAL_3H: &str = "PONTUAL (3H)";

/// Exact first row every sheet must carry.
pub const HEADER_CONTRACT: [&str; 11] = [
    COD, NOME, PAD, FISIO, FONO, NUTRI, MEDICO, ENFERMEIRO, H12, H24, PONTUAL_3H,
];

/// Number of leading identity columns; every column after them holds a file.
const IDENTITY_COLUMNS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    Numeric,
    Text,
    Categorical,
    FileReference,
}

/// Kind of a contract column, `None` for names outside the contract.
pub fn column_kind(column: &str) -> Option<ColumnKind> {
    match column {
        COD => Some(ColumnKind::Numeric),
        NOME => Some(ColumnKind::Text),
        PAD => Some(ColumnKind::Categorical),
        FISIO | FONO | NUTRI | MEDICO | ENFERMEIRO | H12 | H24 | PONTUAL_3H => {
            Some(ColumnKind::FileReference)
        }
        _ => None,
    }
}

/// Contract columns after the identity columns, in contract order.
pub fn file_columns() -> &'static [&'static str] {
    &HEADER_CONTRACT[IDENTITY_COLUMNS..]
}

/// Reject any header that is not literally the contract.
pub fn check_header(header: &Header) -> Result<()> {
    if header.matches(&HEADER_CONTRACT) {
        Ok(())
    } else {
        Err(SheetMailError::SchemaMismatch)
    }
}

// ---------------------------------------------------------------------------
// Category
// ---------------------------------------------------------------------------

/// Allowed values of the `PAD` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Assistencia1,
    Assistencia2,
    Assistencia3,
    Plantao12h,
    Plantao24h,
    Pontual3h,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::Assistencia1,
        Category::Assistencia2,
        Category::Assistencia3,
        Category::Plantao12h,
        Category::Plantao24h,
        Category::Pontual3h,
    ];

    /// Literal cell text selecting this category.
    pub fn label(self) -> &'static str {
        match self {
            Category::Assistencia1 => "ASSISTENCIA 1 - NUTRI / MEDICO / ENFERMEIRO / FISIO / FONO",
            Category::Assistencia2 => "ASSISTENCIA 2 - FISIO / FONO",
            Category::Assistencia3 => "ASSISTENCIA 3 - FISIO",
            Category::Plantao12h => "12 H",
            Category::Plantao24h => "24 H",
            Category::Pontual3h => "PONTUAL (3H)",
        }
    }

    /// Match an already trimmed cell against the allowed labels.
    pub fn from_label(label: &str) -> Option<Category> {
        Category::ALL.into_iter().find(|c| c.label() == label)
    }

    /// File columns that become mandatory for this category, in send order.
    pub fn required_columns(self) -> &'static [&'static str] {
        match self {
            Category::Assistencia1 => &[NUTRI, MEDICO, ENFERMEIRO, FISIO, FONO],
            Category::Assistencia2 => &[FISIO, FONO],
            Category::Assistencia3 => &[FISIO],
            Category::Plantao12h => &[H12],
            Category::Plantao24h => &[H24],
            Category::Pontual3h => &[PONTUAL_3H],
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Verify the requirement table only names file columns of the contract and
/// that category labels are unique.
pub fn check_consistency() -> Result<()> {
    for (i, category) in Category::ALL.iter().enumerate() {
        if Category::ALL[..i].iter().any(|c| c.label() == category.label()) {
            return Err(SheetMailError::Other(format!(
                "Duplicate category label '{}'",
                category.label()
            )));
        }
        for column in category.required_columns() {
            if !HEADER_CONTRACT.contains(column) {
                return Err(SheetMailError::Other(format!(
                    "Category '{category}' requires unknown column '{column}'"
                )));
            }
            if column_kind(column) != Some(ColumnKind::FileReference) {
                return Err(SheetMailError::Other(format!(
                    "Category '{category}' requires non-file column '{column}'"
                )));
            }
        }
    }
    Ok(())
}
