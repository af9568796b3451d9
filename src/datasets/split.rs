use std::{fmt, ops::Range, str::FromStr};

/// One bound of a split slice
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Bound {
    /// An absolute row index, negative values count from the end
    Index(i64),

    /// A percentage of the split's rows, negative values count from the end
    Percent(f64),
}

impl Bound {
    /// Resolve the bound against a split with `len` rows, clamped to `0..=len`
    fn resolve(&self, len: usize) -> usize {
        let len_i = len as i64;

        let index = match *self {
            Bound::Index(index) => index,
            // Percent bounds round to the closest row, ties to even
            Bound::Percent(percent) => (percent * len as f64 / 100.0).round_ties_even() as i64,
        };

        let index = if index < 0 { len_i + index } else { index };

        index.clamp(0, len_i) as usize
    }
}

impl fmt::Display for Bound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Bound::Index(index) => write!(f, "{}", index),
            Bound::Percent(percent) => write!(f, "{}%", percent),
        }
    }
}

/// A split expression such as `train`, `train[:10%]` or `test[-500:]`
#[derive(Clone, Debug, PartialEq)]
pub struct Split {
    /// The name of the underlying split
    pub name: String,

    /// The inclusive start of the slice
    pub start: Option<Bound>,

    /// The exclusive end of the slice
    pub end: Option<Bound>,
}

impl Split {
    /// Select a whole split
    pub fn full(name: &str) -> Self {
        Self {
            name: name.to_string(),
            start: None,
            end: None,
        }
    }

    /// The range of rows selected from a split with `len` rows
    pub fn resolve(&self, len: usize) -> Range<usize> {
        let start = self.start.map_or(0, |bound| bound.resolve(len));
        let end = self.end.map_or(len, |bound| bound.resolve(len));

        start..end.max(start)
    }

    /// Whether the expression selects the whole split
    pub fn is_full(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }
}

impl FromStr for Split {
    type Err = SplitError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim();

        let Some((name, slice)) = value.split_once('[') else {
            return parse_name(value).map(Split::full);
        };

        let name = parse_name(name)?;

        let slice = slice
            .strip_suffix(']')
            .ok_or_else(|| SplitError::Malformed(value.to_string()))?;

        let (start, end) = slice
            .split_once(':')
            .ok_or_else(|| SplitError::Malformed(value.to_string()))?;

        Ok(Self {
            name: name.to_string(),
            start: parse_bound(start)?,
            end: parse_bound(end)?,
        })
    }
}

impl fmt::Display for Split {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_full() {
            return write!(f, "{}", self.name);
        }

        let start = self.start.map(|b| b.to_string()).unwrap_or_default();
        let end = self.end.map(|b| b.to_string()).unwrap_or_default();

        write!(f, "{}[{}:{}]", self.name, start, end)
    }
}

fn parse_name(name: &str) -> Result<&str, SplitError> {
    let name = name.trim();

    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.');

    if valid {
        Ok(name)
    } else {
        Err(SplitError::InvalidName(name.to_string()))
    }
}

fn parse_bound(bound: &str) -> Result<Option<Bound>, SplitError> {
    let bound = bound.trim();

    if bound.is_empty() {
        return Ok(None);
    }

    if let Some(percent) = bound.strip_suffix('%') {
        let percent: f64 = percent
            .trim()
            .parse()
            .map_err(|_| SplitError::InvalidBound(bound.to_string()))?;

        if !(-100.0..=100.0).contains(&percent) {
            return Err(SplitError::InvalidBound(bound.to_string()));
        }

        return Ok(Some(Bound::Percent(percent)));
    }

    bound
        .parse()
        .map(|index| Some(Bound::Index(index)))
        .map_err(|_| SplitError::InvalidBound(bound.to_string()))
}

/// Split Error
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum SplitError {
    /// The split name is empty or contains unsupported characters
    #[error("invalid split name: {0:?}")]
    InvalidName(String),

    /// The slice is not of the form `[start:end]`
    #[error("malformed split expression: {0}")]
    Malformed(String),

    /// A slice bound is neither an index nor a percentage between -100% and 100%
    #[error("invalid split bound: {0}")]
    InvalidBound(String),
}
