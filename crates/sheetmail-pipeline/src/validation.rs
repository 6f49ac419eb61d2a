//! Row validation against the schema registry.
//!
//! [`validate`] is pure: the same row and header always yield the same
//! errors, in rule order. A category outside the allowed set stops the
//! row's evaluation, since the file rules depend on a valid category.

use serde::Serialize;
use sheetmail_types::{split_rows, Header, Result, Row, SheetMailError, ValidationError};

use crate::reference::is_recognized_reference;
use crate::schema::{self, Category, ColumnKind, COD, NOME, PAD};

/// Whether `value` reads as a number the way JavaScript's `Number()` does:
/// unsigned `0x`/`0b`/`0o` integers, a signed `Infinity`, or a signed
/// decimal with optional fraction and exponent. Blank is not a number.
fn is_numeric(value: &str) -> bool {
    let value = value.trim();
    if let Some((digits, radix)) = radix_digits(value) {
        return !digits.is_empty() && digits.chars().all(|c| c.is_digit(radix));
    }
    let unsigned = value.strip_prefix(['+', '-']).unwrap_or(value);
    if unsigned == "Infinity" {
        return true;
    }
    // f64 parsing also takes "inf" and "nan", which Number() rejects.
    unsigned.starts_with(|c: char| c.is_ascii_digit() || c == '.') && unsigned.parse::<f64>().is_ok()
}

fn radix_digits(value: &str) -> Option<(&str, u32)> {
    let radix = match value.get(..2)? {
        "0x" | "0X" => 16,
        "0b" | "0B" => 2,
        "0o" | "0O" => 8,
        _ => return None,
    };
    Some((&value[2..], radix))
}

fn non_empty(cell: Option<&str>) -> Option<&str> {
    cell.filter(|v| !v.is_empty())
}

/// Validate one data row. Errors carry the row's display index.
pub fn validate(row: &Row, header: &Header) -> Vec<ValidationError> {
    let n = row.display_index();
    let mut errors = Vec::new();

    let cod = row.get(header, COD);
    if !cod.map_or(false, is_numeric) {
        errors.push(ValidationError::new(
            n,
            format!("invalid identifier {COD} ({})", cod.unwrap_or_default()),
        ));
    }

    if non_empty(row.get(header, NOME)).is_none() {
        errors.push(ValidationError::new(n, format!("{NOME} is empty")));
    }

    let pad = row.get(header, PAD).map(str::trim).unwrap_or_default();
    let Some(category) = Category::from_label(pad) else {
        errors.push(ValidationError::new(
            n,
            format!("invalid category {PAD} ({pad})"),
        ));
        return errors;
    };

    for column in schema::file_columns() {
        if schema::column_kind(column) != Some(ColumnKind::FileReference) {
            continue;
        }
        if let Some(value) = non_empty(row.get(header, column)) {
            if !is_recognized_reference(value) {
                errors.push(ValidationError::new(
                    n,
                    format!("{column} is not a valid Google Drive link"),
                ));
            }
        }
    }

    for column in category.required_columns() {
        let present = non_empty(row.get(header, column)).map_or(false, is_recognized_reference);
        if !present {
            errors.push(ValidationError::new(
                n,
                format!("missing required field {column} for category \"{category}\""),
            ));
        }
    }

    errors
}

/// Category of a row that already passed [`validate`].
pub fn category_of(row: &Row, header: &Header) -> Option<Category> {
    Category::from_label(row.get(header, PAD)?.trim())
}

/// Validate every row of a data slice, flattening the errors in row order.
pub fn validate_rows(rows: &[Row], header: &Header) -> Vec<ValidationError> {
    rows.iter().flat_map(|row| validate(row, header)).collect()
}

/// A sheet checked without sending anything.
#[derive(Debug, Clone, Serialize)]
pub struct Preview {
    pub header: Header,
    pub rows: Vec<Row>,
    pub errors: Vec<ValidationError>,
}

/// Split raw sheet values, check the header, and validate every data row.
pub fn preview(rows: Vec<Vec<String>>) -> Result<Preview> {
    let (header, rows) = split_rows(rows).ok_or(SheetMailError::EmptyInput)?;
    schema::check_header(&header)?;
    let errors = validate_rows(&rows, &header);
    Ok(Preview {
        header,
        rows,
        errors,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::HEADER_CONTRACT;

    const LINK: &str = "https://drive.google.com/file/d/abcdefghijklmnopqrstuvwxy";

    fn header() -> Header {
        HEADER_CONTRACT.into_iter().collect()
    }

    fn row(ordinal: usize, cells: &[&str]) -> Row {
        Row::new(ordinal, cells.iter().map(|c| c.to_string()).collect())
    }

    fn messages(errors: &[ValidationError]) -> Vec<&str> {
        errors.iter().map(|e| e.message.as_str()).collect()
    }

    #[test]
    fn valid_12h_row_has_no_errors() {
        let r = row(0, &["7", "Ana", "12 H", "", "", "", "", "", LINK, "", ""]);
        assert!(validate(&r, &header()).is_empty());
    }

    #[test]
    fn bad_identifier_and_missing_required_file() {
        let r = row(0, &["abc", "Ana", "12 H", "", "", "", "", "", "", "", ""]);
        let errors = validate(&r, &header());
        assert_eq!(
            messages(&errors),
            vec![
                "invalid identifier COD (abc)",
                "missing required field 12H for category \"12 H\"",
            ]
        );
        assert!(errors.iter().all(|e| e.row == 2));
    }

    #[test]
    fn unknown_category_short_circuits_file_rules() {
        let r = row(3, &["1", "Ana", "PLANO X", "ftp://nope", "bad", "", "", "", "", "", ""]);
        let errors = validate(&r, &header());
        assert_eq!(messages(&errors), vec!["invalid category PAD (PLANO X)"]);
        assert_eq!(errors[0].row, 5);
    }

    #[test]
    fn category_is_trimmed_before_lookup() {
        let r = row(0, &["1", "Ana", "  24 H ", "", "", "", "", "", "", LINK, ""]);
        assert!(validate(&r, &header()).is_empty());
    }

    #[test]
    fn one_error_per_missing_required_column() {
        for category in Category::ALL {
            let required = category.required_columns();
            for missing in required {
                let cells: Vec<String> = HEADER_CONTRACT
                    .iter()
                    .map(|col| match *col {
                        COD => "10".to_string(),
                        NOME => "Bia".to_string(),
                        PAD => category.label().to_string(),
                        c if c == *missing => String::new(),
                        c if required.contains(&c) => LINK.to_string(),
                        _ => String::new(),
                    })
                    .collect();
                let errors = validate(&Row::new(0, cells), &header());
                assert_eq!(errors.len(), 1, "{category}: {:?}", messages(&errors));
                assert!(errors[0].message.contains(missing));
            }
        }
    }

    #[test]
    fn invalid_link_in_required_column_reports_both_rules() {
        let r = row(0, &["1", "Ana", "ASSISTENCIA 3 - FISIO", "https://example.com/x"]);
        assert_eq!(
            messages(&validate(&r, &header())),
            vec![
                "FISIO is not a valid Google Drive link",
                "missing required field FISIO for category \"ASSISTENCIA 3 - FISIO\"",
            ]
        );
    }

    #[test]
    fn invalid_link_in_optional_column_is_reported() {
        let r = row(0, &["1", "Ana", "12 H", "", "not a link", "", "", "", LINK]);
        assert_eq!(
            messages(&validate(&r, &header())),
            vec!["FONO is not a valid Google Drive link"]
        );
    }

    #[test]
    fn empty_name_and_blank_identifier() {
        let r = row(1, &["  ", "", "12 H", "", "", "", "", "", LINK]);
        assert_eq!(
            messages(&validate(&r, &header())),
            vec!["invalid identifier COD (  )", "NOME is empty"]
        );
    }

    #[test]
    fn numeric_identifier_forms() {
        assert!(is_numeric("42"));
        assert!(is_numeric(" 3.5 "));
        assert!(is_numeric("1e3"));
        assert!(!is_numeric("NaN"));
        assert!(!is_numeric(""));
        assert!(!is_numeric("12a"));
        assert!(is_numeric(".5"));
        assert!(is_numeric("-2E-3"));
        assert!(is_numeric("Infinity"));
        assert!(is_numeric("-Infinity"));
        assert!(!is_numeric("inf"));
        assert!(!is_numeric("-INF"));
        assert!(!is_numeric("infinity"));
        assert!(!is_numeric("nan"));
        assert!(!is_numeric("."));
        assert!(!is_numeric("1e"));
    }

    #[test]
    fn radix_prefixed_identifiers() {
        assert!(is_numeric("0x10"));
        assert!(is_numeric("0XfF"));
        assert!(is_numeric("0b1"));
        assert!(is_numeric("0o7"));
        assert!(!is_numeric("0x"));
        assert!(!is_numeric("0b2"));
        assert!(!is_numeric("0o8"));
        assert!(!is_numeric("-0x10"));
    }

    #[test]
    fn identifier_rule_follows_number_grammar() {
        let with_cod = |cod: &str| row(0, &[cod, "Ana", "12 H", "", "", "", "", "", LINK, "", ""]);
        assert!(validate(&with_cod("0x10"), &header()).is_empty());
        assert_eq!(
            messages(&validate(&with_cod("inf"), &header())),
            vec!["invalid identifier COD (inf)"]
        );
        assert_eq!(
            messages(&validate(&with_cod("-INF"), &header())),
            vec!["invalid identifier COD (-INF)"]
        );
    }

    #[test]
    fn columns_missing_from_header_read_as_missing() {
        let short: Header = ["NOME", "PAD", "12H"].into_iter().collect();
        let r = row(0, &["Ana", "12 H", LINK]);
        assert_eq!(messages(&validate(&r, &short)), vec!["invalid identifier COD ()"]);
    }

    #[test]
    fn validate_is_deterministic() {
        let r = row(0, &["x", "", "ASSISTENCIA 2 - FISIO / FONO", "bad"]);
        assert_eq!(validate(&r, &header()), validate(&r, &header()));
    }

    #[test]
    fn validate_rows_flattens_in_order() {
        let rows = vec![
            row(0, &["7", "Ana", "12 H", "", "", "", "", "", LINK]),
            row(1, &["x", "Bia", "12 H", "", "", "", "", "", LINK]),
            row(2, &["9", "", "12 H", "", "", "", "", "", LINK]),
        ];
        let errors = validate_rows(&rows, &header());
        assert_eq!(errors.iter().map(|e| e.row).collect::<Vec<_>>(), vec![3, 4]);
    }

    #[test]
    fn preview_checks_header_then_rows() {
        let mut values = vec![HEADER_CONTRACT.iter().map(|c| c.to_string()).collect::<Vec<_>>()];
        values.push(vec!["7".into(), "Ana".into(), "12 H".into()]);
        let preview = preview(values.clone()).unwrap();
        assert_eq!(preview.rows.len(), 1);
        assert_eq!(messages(&preview.errors), vec!["missing required field 12H for category \"12 H\""]);

        values[0].reverse();
        assert!(matches!(preview_err(values), SheetMailError::SchemaMismatch));
        assert!(matches!(preview_err(vec![]), SheetMailError::EmptyInput));
    }

    fn preview_err(values: Vec<Vec<String>>) -> SheetMailError {
        match preview(values) {
            Err(e) => e,
            Ok(p) => panic!("expected an error, got {p:?}"),
        }
    }

    #[test]
    fn category_of_reads_trimmed_pad() {
        let r = row(0, &["7", "Ana", " PONTUAL (3H) "]);
        assert_eq!(category_of(&r, &header()), Some(Category::Pontual3h));
    }
}
