use std::fmt;

use crate::constants::GROUP_KEY_DELIMITER;
use crate::constants::LINE_SEPARATOR;
use crate::constants::WORD_SEPARATOR;
use crate::ProtocolError;
use crate::Result;

/// Returns `true` if `value` contains any character reserved by the wire format.
pub fn contains_reserved_delimiter(value: &str) -> bool {
    value
        .chars()
        .any(|c| c == GROUP_KEY_DELIMITER || c == WORD_SEPARATOR || c == LINE_SEPARATOR)
}

/// Identifies one watched thread pool: `namespace` (tenant), `group` (item id)
/// and `key` (thread-pool id).
///
/// On the wire the triple is written key first: `key+group+namespace`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GroupKey {
    namespace: String,
    group: String,
    key: String,
}

impl GroupKey {
    pub fn new(
        namespace: impl Into<String>,
        group: impl Into<String>,
        key: impl Into<String>,
    ) -> Result<Self> {
        let group_key = Self {
            namespace: namespace.into(),
            group: group.into(),
            key: key.into(),
        };
        for part in [&group_key.namespace, &group_key.group, &group_key.key] {
            if part.is_empty() || contains_reserved_delimiter(part) {
                return Err(ProtocolError::ReservedDelimiter(part.clone()).into());
            }
        }
        Ok(group_key)
    }

    /// Parses the `key+group+namespace` wire form.
    pub fn parse(wire: &str) -> Result<Self> {
        let parts: Vec<&str> = wire.split(GROUP_KEY_DELIMITER).collect();
        match parts.as_slice() {
            [key, group, namespace] => Self::new(*namespace, *group, *key)
                .map_err(|_| ProtocolError::InvalidGroupKey(wire.to_string()).into()),
            _ => Err(ProtocolError::InvalidGroupKey(wire.to_string()).into()),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn group(&self) -> &str {
        &self.group
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn to_wire(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for GroupKey {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(
            f,
            "{}{GROUP_KEY_DELIMITER}{}{GROUP_KEY_DELIMITER}{}",
            self.key, self.group, self.namespace
        )
    }
}
