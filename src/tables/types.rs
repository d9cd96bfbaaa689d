use std::fmt;
use std::str::FromStr;

use crate::constants::DEL_COMMAND;
use crate::constants::SET_COMMAND;
use crate::Error;
use crate::FieldValue;
use crate::UsageError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Set,
    Del,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Set => SET_COMMAND,
            Operation::Del => DEL_COMMAND,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operation {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            SET_COMMAND => Ok(Operation::Set),
            DEL_COMMAND => Ok(Operation::Del),
            other => Err(UsageError::UnknownOperation(other.to_string()).into()),
        }
    }
}

/// One observation of a key, resolved against the store when it was popped.
///
/// `fields` is empty for [`Operation::Del`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyOpFieldsValues {
    pub key: String,
    pub op: Operation,
    pub fields: Vec<FieldValue>,
}

impl KeyOpFieldsValues {
    pub fn set(
        key: impl Into<String>,
        fields: Vec<FieldValue>,
    ) -> Self {
        Self {
            key: key.into(),
            op: Operation::Set,
            fields,
        }
    }

    pub fn del(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            op: Operation::Del,
            fields: Vec::new(),
        }
    }

    pub fn is_set(&self) -> bool {
        self.op == Operation::Set
    }

    pub fn is_del(&self) -> bool {
        self.op == Operation::Del
    }

    /// Value of `field`, if present
    pub fn field(
        &self,
        field: &str,
    ) -> Option<&str> {
        self.fields
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, value)| value.as_str())
    }
}
