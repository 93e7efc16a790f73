use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeKind {
    Int,
    Float,
    Bool,
    Str,
}

impl fmt::Display for AttributeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AttributeKind::Int => "INT",
            AttributeKind::Float => "FLOAT",
            AttributeKind::Bool => "BOOLEAN",
            AttributeKind::Str => "STRING",
        };
        f.write_str(name)
    }
}

/// A single attribute value.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
}

impl AttributeValue {
    pub fn kind(&self) -> AttributeKind {
        match self {
            AttributeValue::Int(_) => AttributeKind::Int,
            AttributeValue::Float(_) => AttributeKind::Float,
            AttributeValue::Bool(_) => AttributeKind::Bool,
            AttributeValue::Str(_) => AttributeKind::Str,
        }
    }
}

/// A named per-site data column.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeColumn {
    Int(Vec<i64>),
    Float(Vec<f64>),
    Bool(Vec<bool>),
    Str(Vec<String>),
}

impl AttributeColumn {
    /// A column of `len` zero, `false` or empty-string values.
    pub fn with_default(kind: AttributeKind, len: usize) -> Self {
        match kind {
            AttributeKind::Int => AttributeColumn::Int(vec![0; len]),
            AttributeKind::Float => AttributeColumn::Float(vec![0.0; len]),
            AttributeKind::Bool => AttributeColumn::Bool(vec![false; len]),
            AttributeKind::Str => AttributeColumn::Str(vec![String::new(); len]),
        }
    }

    pub fn kind(&self) -> AttributeKind {
        match self {
            AttributeColumn::Int(_) => AttributeKind::Int,
            AttributeColumn::Float(_) => AttributeKind::Float,
            AttributeColumn::Bool(_) => AttributeKind::Bool,
            AttributeColumn::Str(_) => AttributeKind::Str,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            AttributeColumn::Int(v) => v.len(),
            AttributeColumn::Float(v) => v.len(),
            AttributeColumn::Bool(v) => v.len(),
            AttributeColumn::Str(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, index: usize) -> Option<AttributeValue> {
        match self {
            AttributeColumn::Int(v) => v.get(index).map(|&x| AttributeValue::Int(x)),
            AttributeColumn::Float(v) => v.get(index).map(|&x| AttributeValue::Float(x)),
            AttributeColumn::Bool(v) => v.get(index).map(|&x| AttributeValue::Bool(x)),
            AttributeColumn::Str(v) => v.get(index).map(|x| AttributeValue::Str(x.clone())),
        }
    }

    /// Keeps only the rows whose entry in `keep` is `true`.
    pub fn retain(&mut self, keep: &[bool]) {
        fn filter<T>(values: &mut Vec<T>, keep: &[bool]) {
            let mut flags = keep.iter();
            values.retain(|_| flags.next().copied().unwrap_or(false));
        }
        match self {
            AttributeColumn::Int(v) => filter(v, keep),
            AttributeColumn::Float(v) => filter(v, keep),
            AttributeColumn::Bool(v) => filter(v, keep),
            AttributeColumn::Str(v) => filter(v, keep),
        }
    }

    /// Repeats the whole column `times` times.
    pub fn tile(&mut self, times: usize) {
        fn repeat<T: Clone>(values: &mut Vec<T>, times: usize) {
            let original = std::mem::take(values);
            for _ in 0..times {
                values.extend(original.iter().cloned());
            }
        }
        match self {
            AttributeColumn::Int(v) => repeat(v, times),
            AttributeColumn::Float(v) => repeat(v, times),
            AttributeColumn::Bool(v) => repeat(v, times),
            AttributeColumn::Str(v) => repeat(v, times),
        }
    }

    /// Pads the column with default values up to `len` rows.
    pub fn pad_to(&mut self, len: usize) {
        match self {
            AttributeColumn::Int(v) => v.resize(len, 0),
            AttributeColumn::Float(v) => v.resize(len, 0.0),
            AttributeColumn::Bool(v) => v.resize(len, false),
            AttributeColumn::Str(v) => v.resize(len, String::new()),
        }
    }

    /// Appends the rows of `other`.
    ///
    /// # Return
    ///
    /// Returns `None` (leaving the column unchanged) if the kinds differ.
    pub fn append(&mut self, other: &AttributeColumn) -> Option<()> {
        match (self, other) {
            (AttributeColumn::Int(a), AttributeColumn::Int(b)) => a.extend_from_slice(b),
            (AttributeColumn::Float(a), AttributeColumn::Float(b)) => a.extend_from_slice(b),
            (AttributeColumn::Bool(a), AttributeColumn::Bool(b)) => a.extend_from_slice(b),
            (AttributeColumn::Str(a), AttributeColumn::Str(b)) => a.extend_from_slice(b),
            _ => return None,
        }
        Some(())
    }

    /// Writes `values` at `indices`.
    ///
    /// A single value is broadcast to every index; otherwise `values` must have one
    /// entry per index. Indices must be in range.
    ///
    /// # Return
    ///
    /// Returns `None` (leaving the column unchanged) on a kind or length mismatch, or
    /// an out-of-range index.
    pub fn set_indices(&mut self, indices: &[usize], values: &AttributeColumn) -> Option<()> {
        fn write<T: Clone>(target: &mut [T], indices: &[usize], values: &[T]) -> Option<()> {
            if values.len() != 1 && values.len() != indices.len() {
                return None;
            }
            if indices.iter().any(|&i| i >= target.len()) {
                return None;
            }
            for (n, &i) in indices.iter().enumerate() {
                target[i] = values[if values.len() == 1 { 0 } else { n }].clone();
            }
            Some(())
        }
        match (self, values) {
            (AttributeColumn::Int(a), AttributeColumn::Int(b)) => write(a, indices, b),
            (AttributeColumn::Float(a), AttributeColumn::Float(b)) => write(a, indices, b),
            (AttributeColumn::Bool(a), AttributeColumn::Bool(b)) => write(a, indices, b),
            (AttributeColumn::Str(a), AttributeColumn::Str(b)) => write(a, indices, b),
            _ => None,
        }
    }
}

impl From<Vec<i64>> for AttributeColumn {
    fn from(values: Vec<i64>) -> Self {
        AttributeColumn::Int(values)
    }
}

impl From<Vec<f64>> for AttributeColumn {
    fn from(values: Vec<f64>) -> Self {
        AttributeColumn::Float(values)
    }
}

impl From<Vec<bool>> for AttributeColumn {
    fn from(values: Vec<bool>) -> Self {
        AttributeColumn::Bool(values)
    }
}

impl From<Vec<String>> for AttributeColumn {
    fn from(values: Vec<String>) -> Self {
        AttributeColumn::Str(values)
    }
}

impl From<AttributeValue> for AttributeColumn {
    fn from(value: AttributeValue) -> Self {
        match value {
            AttributeValue::Int(x) => AttributeColumn::Int(vec![x]),
            AttributeValue::Float(x) => AttributeColumn::Float(vec![x]),
            AttributeValue::Bool(x) => AttributeColumn::Bool(vec![x]),
            AttributeValue::Str(x) => AttributeColumn::Str(vec![x]),
        }
    }
}
