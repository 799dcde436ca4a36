use crate::errors::{MapError, Result};

use super::entity::{DomainObject, EntityKind};
use super::value::Value;

/// Comparable key built from an entity kind's identity fields
///
/// Field order is fixed by the kind's schema, so two objects of the same kind
/// compare field by field regardless of how they were built. Objects of
/// different kinds never compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IdentityObject {
    kind: EntityKind,
    fields: Vec<(&'static str, Value)>,
}

impl IdentityObject {
    /// Snapshot an entity's current identity field values
    pub fn capture<T: DomainObject>(obj: &T) -> Self {
        let fields = T::KIND
            .identity_fields()
            .iter()
            .map(|name| (*name, obj.field(name)))
            .collect();
        Self {
            kind: T::KIND,
            fields,
        }
    }

    /// Build from explicit (field, value) pairs
    ///
    /// Fields not given are `Null`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` when a field is not part of the kind's schema.
    pub fn from_fields<'a, I>(kind: EntityKind, pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a str, Value)>,
    {
        let schema = kind.identity_fields();
        let mut fields: Vec<(&'static str, Value)> =
            schema.iter().map(|name| (*name, Value::Null)).collect();

        for (name, value) in pairs {
            let slot = fields
                .iter_mut()
                .find(|(field, _)| *field == name)
                .ok_or_else(|| MapError::UnknownField {
                    entity: kind,
                    field: name.to_string(),
                })?;
            slot.1 = value;
        }

        Ok(Self { kind, fields })
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    /// Value recorded for a field, if the field belongs to the schema
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(name, _)| *name == field)
            .map(|(_, value)| value)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&'static str, &Value)> {
        self.fields.iter().map(|(name, value)| (*name, value))
    }

    /// Fields whose values differ from `other`
    ///
    /// Comparing against another kind reports every field as changed.
    pub fn changed_fields(&self, other: &IdentityObject) -> Vec<&'static str> {
        if self.kind != other.kind {
            return self.fields.iter().map(|(name, _)| *name).collect();
        }
        self.fields
            .iter()
            .zip(other.fields.iter())
            .filter(|((_, a), (_, b))| a != b)
            .map(|((name, _), _)| *name)
            .collect()
    }
}

impl std::fmt::Display for IdentityObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}(", self.kind)?;
        for (i, (name, value)) in self.fields.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}={}", name, value)?;
        }
        write!(f, ")")
    }
}
