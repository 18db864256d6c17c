use crate::error::{SearchError, SearchResult};
use std::fmt::{Display, Formatter};
use std::path::Path;

/// The query that terminates every STP constraint file.
pub const QUERY: &str = "QUERY(FALSE);\nCOUNTEREXAMPLE;\n";

/// A negative assertion `variable != value`.
///
/// `variable` may address a bit range (e.g. `X0[7:4]`).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Exclusion {
    pub variable: String,
    pub value: String,
}

impl Exclusion {
    pub fn new(variable: impl Into<String>, value: impl Into<String>) -> Exclusion {
        Exclusion {
            variable: variable.into(),
            value: value.into(),
        }
    }
}

impl Display for Exclusion {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "ASSERT(NOT({} = {}));", self.variable, self.value)
    }
}

/// Insert `exclusions` into an existing STP file, in front of its trailing query.
pub fn append_exclusions(path: &Path, exclusions: &[Exclusion]) -> SearchResult<()> {
    if exclusions.is_empty() {
        return Ok(());
    }

    let content = std::fs::read_to_string(path).map_err(|e| SearchError::io(path, e))?;
    let body = match content.rfind("QUERY") {
        Some(position) => &content[..position],
        None => content.as_str(),
    };

    let mut patched = String::with_capacity(body.len() + exclusions.len() * 32 + QUERY.len());
    patched.push_str(body);
    if !patched.ends_with('\n') {
        patched.push('\n');
    }
    for exclusion in exclusions {
        patched.push_str(&exclusion.to_string());
        patched.push('\n');
    }
    patched.push_str(QUERY);

    std::fs::write(path, patched).map_err(|e| SearchError::io(path, e))
}
