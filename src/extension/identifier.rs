//! Extension identifiers.
//!
//! A store identifier is exactly 32 characters from the alphabet `a`-`p`
//! (the hex digits of a key hash shifted by ten letters).

use crate::error::{Error, Result};

use std::convert::TryFrom;
use std::fmt;
use std::str::FromStr;

/// Length of every valid identifier.
pub const ID_LEN: usize = 32;

/// A validated extension identifier.
///
/// ```rust
/// use crxdl::ExtensionId;
///
/// let id: ExtensionId = "gppongmhjkpfnbhagpmjfkannfbllamg".parse()?;
/// assert_eq!(id.as_str().len(), 32);
/// assert!("not-an-id".parse::<ExtensionId>().is_err());
/// # Ok::<(), crxdl::Error>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExtensionId(String);

impl ExtensionId {
    /// Get the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Check whether `value` is a well-formed identifier.
    pub fn is_valid(value: &str) -> bool {
        value.len() == ID_LEN && value.bytes().all(|b| (b'a'..=b'p').contains(&b))
    }
}

impl FromStr for ExtensionId {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        if Self::is_valid(value) {
            Ok(Self(value.to_owned()))
        } else {
            Err(Error::InvalidIdentifierFormat(value.to_owned()))
        }
    }
}

impl TryFrom<&str> for ExtensionId {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self> {
        value.parse()
    }
}

impl TryFrom<String> for ExtensionId {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        if Self::is_valid(&value) {
            Ok(Self(value))
        } else {
            Err(Error::InvalidIdentifierFormat(value))
        }
    }
}

impl AsRef<str> for ExtensionId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ExtensionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Parse a newline separated list of identifiers.
///
/// Surrounding whitespace is trimmed; blank lines and lines starting with `#`
/// are skipped. Each remaining line yields its own result so one malformed
/// entry does not hide the others.
pub fn parse_id_list(text: &str) -> Vec<Result<ExtensionId>> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(ExtensionId::from_str)
        .collect()
}
