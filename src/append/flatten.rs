//! Flattening of nested rows into bracketed column names.

use crate::value::{CellValue, Row};

/// Flatten nested maps into `parent[child]` fields, depth first.
///
/// Non-map values are returned as-is. An empty nested map contributes no
/// fields.
pub fn flatten(row: &Row) -> Vec<(String, &CellValue)> {
    let mut out = Vec::with_capacity(row.len());
    flatten_into(None, row, &mut out);
    out
}

fn flatten_into<'a>(prefix: Option<&str>, row: &'a Row, out: &mut Vec<(String, &'a CellValue)>) {
    for (key, value) in row {
        let field = match prefix {
            Some(prefix) => format!("{}[{}]", prefix, key),
            None => key.clone(),
        };
        match value {
            CellValue::Map(inner) => flatten_into(Some(field.as_str()), inner, out),
            other => out.push((field, other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(entries: Vec<(&str, CellValue)>) -> Row {
        entries
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect()
    }

    fn names(row: &Row) -> Vec<String> {
        flatten(row).into_iter().map(|(name, _)| name).collect()
    }

    #[test]
    fn test_flat_row_unchanged() {
        let r = row(vec![("name", "Ada".into()), ("age", 36i64.into())]);
        assert_eq!(names(&r), vec!["name", "age"]);
    }

    #[test]
    fn test_nested_map_uses_brackets() {
        let address = row(vec![("city", "London".into()), ("zip", "N1".into())]);
        let r = row(vec![
            ("name", "Ada".into()),
            ("address", CellValue::Map(address)),
            ("email", "ada@example.com".into()),
        ]);

        let flat = flatten(&r);
        let names: Vec<&str> = flat.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(
            names,
            vec!["name", "address[city]", "address[zip]", "email"]
        );
        assert_eq!(flat[1].1, &CellValue::String("London".to_string()));
    }

    #[test]
    fn test_deep_nesting_extends_path() {
        let inner = row(vec![("c", true.into())]);
        let middle = row(vec![("b", CellValue::Map(inner))]);
        let r = row(vec![("a", CellValue::Map(middle))]);
        assert_eq!(names(&r), vec!["a[b][c]"]);
    }

    #[test]
    fn test_empty_nested_map_contributes_nothing() {
        let r = row(vec![("a", CellValue::Map(Row::new())), ("b", 1i64.into())]);
        assert_eq!(names(&r), vec!["b"]);
    }

    #[test]
    fn test_lists_are_not_flattened() {
        let r = row(vec![("tags", CellValue::List(vec!["x".into()]))]);
        assert_eq!(names(&r), vec!["tags"]);
    }
}
