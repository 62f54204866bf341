//! Common types shared across models.

use serde::{Deserialize, Deserializer, Serialize};
use std::borrow::Cow;
use std::hash::{Hash, Hasher};

/// Backend identifier.
///
/// GraphQL `ID` values arrive as either JSON numbers or strings depending on
/// the resolver, so comparisons always go through the string form: `3` and
/// `"3"` are the same id.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Id {
    Number(i64),
    Text(String),
}

impl Id {
    /// String form used for comparisons and GraphQL variables
    pub fn as_key(&self) -> Cow<'_, str> {
        match self {
            Id::Number(n) => Cow::Owned(n.to_string()),
            Id::Text(s) => Cow::Borrowed(s.trim()),
        }
    }
}

/// Read an explicit `null` as the type's default, the same as a missing key
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl PartialEq for Id {
    fn eq(&self, other: &Self) -> bool {
        self.as_key() == other.as_key()
    }
}

impl Eq for Id {}

impl Hash for Id {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_key().hash(state);
    }
}

impl std::fmt::Display for Id {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_key())
    }
}

impl From<i64> for Id {
    fn from(n: i64) -> Self {
        Id::Number(n)
    }
}

impl From<&str> for Id {
    fn from(s: &str) -> Self {
        Id::Text(s.to_string())
    }
}

impl From<String> for Id {
    fn from(s: String) -> Self {
        Id::Text(s)
    }
}

impl std::str::FromStr for Id {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Id::Text(s.to_string()))
    }
}

/// Named reference to a category or tag
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NamedRef {
    pub id: Id,
    #[serde(default)]
    pub name: String,
}
