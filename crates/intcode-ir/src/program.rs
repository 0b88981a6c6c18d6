//! Program text: the comma-separated cells a machine is loaded with.

use intcode_core::{Error, Result, Word};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

/// An immutable program image.
///
/// Cells are shared behind an `Arc`, so cloning a program or loading it into
/// several machines never copies the cells.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Program<W> {
    cells: Arc<Vec<W>>,
}

impl<W: Word> Program<W> {
    pub fn from_cells(cells: Vec<W>) -> Self {
        Self {
            cells: Arc::new(cells),
        }
    }

    /// Parse comma-separated integer literals. Whitespace around cells and a
    /// single trailing comma are accepted.
    pub fn parse(text: &str) -> Result<Self> {
        let text = text.trim();
        let text = text.strip_suffix(',').unwrap_or(text);
        if text.is_empty() {
            return Err(Error::Parse {
                index: 0,
                token: String::new(),
                reason: "empty program".to_string(),
            });
        }

        let cells = text
            .split(',')
            .enumerate()
            .map(|(index, token)| {
                let token = token.trim();
                W::parse_cell(token).map_err(|reason| Error::Parse {
                    index,
                    token: token.to_string(),
                    reason: format!("{} ({})", reason, W::KIND),
                })
            })
            .collect::<Result<Vec<W>>>()?;

        tracing::debug!("Parsed program with {} cells", cells.len());
        Ok(Self::from_cells(cells))
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text)
    }

    pub fn cells(&self) -> &[W] {
        &self.cells
    }

    /// The shared cell storage, used to seed machine memory without copying
    pub fn shared(&self) -> &Arc<Vec<W>> {
        &self.cells
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

impl<W: Word> FromStr for Program<W> {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl<W: Word> fmt::Display for Program<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, cell) in self.cells.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{}", cell)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_bigint::BigInt;

    #[test]
    fn test_parse_program() {
        let program = Program::<i64>::parse("1,9,10,3,2,3,11,0,99,30,40,50\n").unwrap();
        assert_eq!(program.len(), 12);
        assert_eq!(program.cells()[0], 1);
        assert_eq!(program.cells()[11], 50);
        assert!(!program.is_empty());
    }

    #[test]
    fn test_parse_whitespace_and_trailing_comma() {
        let program: Program<i32> = " 1, -2 ,3,\n".parse().unwrap();
        assert_eq!(program.cells(), &[1, -2, 3]);
        assert_eq!(program.to_string(), "1,-2,3");
    }

    #[test]
    fn test_parse_errors() {
        let err = Program::<i64>::parse("1,2,x,4").unwrap_err();
        match err {
            Error::Parse { index, token, .. } => {
                assert_eq!(index, 2);
                assert_eq!(token, "x");
            }
            other => panic!("unexpected error: {}", other),
        }

        assert!(Program::<i64>::parse("").is_err());
        assert!(Program::<i64>::parse("1,,2").is_err());
        // Fits in a BigInt but not in an i32
        assert!(Program::<i32>::parse("104,1125899906842624,99").is_err());
        assert!(Program::<BigInt>::parse("104,1125899906842624,99").is_ok());
    }

    #[test]
    fn test_clone_shares_cells() {
        let program = Program::<i64>::parse("99").unwrap();
        let copy = program.clone();
        assert!(Arc::ptr_eq(program.shared(), copy.shared()));
    }

    #[test]
    fn test_program_serialization() {
        let program = Program::<BigInt>::parse("104,1125899906842624,99").unwrap();
        let json = serde_json::to_string(&program).unwrap();
        let deserialized: Program<BigInt> = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, program);
    }
}
