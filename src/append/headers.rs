//! Header row reconciliation for a single sheet.

use std::collections::HashMap;

/// The header row of one sheet, plus any headers added during a batch.
///
/// Fields are matched by exact name. A name seen for the first time is
/// appended once; later lookups return the same column.
#[derive(Debug, Clone, Default)]
pub struct SheetHeaders {
    headers: Vec<String>,
    positions: HashMap<String, usize>,
    existing: usize,
}

impl SheetHeaders {
    /// Start from the header row already present in the sheet.
    pub fn new(existing: Vec<String>) -> Self {
        let mut positions = HashMap::with_capacity(existing.len());
        for (idx, name) in existing.iter().enumerate() {
            // Duplicate headers resolve to the leftmost column.
            positions.entry(name.clone()).or_insert(idx);
        }
        Self {
            existing: existing.len(),
            headers: existing,
            positions,
        }
    }

    /// Column index for `field`, appending a new header if it is unknown.
    pub fn position_or_insert(&mut self, field: &str) -> usize {
        if let Some(&idx) = self.positions.get(field) {
            return idx;
        }
        let idx = self.headers.len();
        self.headers.push(field.to_string());
        self.positions.insert(field.to_string(), idx);
        idx
    }

    /// All headers, existing first, then new ones in order of first use.
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Headers added since construction.
    pub fn added(&self) -> &[String] {
        &self.headers[self.existing..]
    }

    pub fn has_added(&self) -> bool {
        self.headers.len() > self.existing
    }

    /// Current width of the header row.
    pub(crate) fn len(&self) -> usize {
        self.headers.len()
    }
}
