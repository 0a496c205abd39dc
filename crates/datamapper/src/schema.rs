//! Validated attribute schema for one record type.

use crate::attribute::{AttributeDefinition, RawDefinition};
use crate::error::{OrmError, OrmResult};
use std::collections::HashMap;

/// Ordered mapping of attribute name → definition.
///
/// A schema always has at least one primary-key attribute. It is read-only once
/// built and meant to be shared (usually behind an `Arc` inside a
/// [`Mapper`](crate::Mapper)) by every record of the type.
#[derive(Debug, Clone)]
pub struct AttributeSchema {
    attributes: Vec<(String, AttributeDefinition)>,
    index: HashMap<String, usize>,
    primary_keys: Vec<String>,
}

impl AttributeSchema {
    /// Build a schema from `(name, definition)` pairs, keeping their order.
    ///
    /// Fails with [`OrmError::Schema`] when no attribute is a primary key or a
    /// name is declared twice.
    pub fn build<N, I>(definitions: I) -> OrmResult<Self>
    where
        N: Into<String>,
        I: IntoIterator<Item = (N, AttributeDefinition)>,
    {
        let mut attributes: Vec<(String, AttributeDefinition)> = Vec::new();
        let mut index = HashMap::new();

        for (name, def) in definitions {
            let name = name.into();
            if name.is_empty() {
                return Err(OrmError::schema("empty attribute name"));
            }
            if index.contains_key(&name) {
                return Err(OrmError::schema(format!("attribute '{name}' declared twice")));
            }
            index.insert(name.clone(), attributes.len());
            attributes.push((name, def));
        }

        let primary_keys: Vec<String> = attributes
            .iter()
            .filter(|(_, def)| def.primary_key)
            .map(|(name, _)| name.clone())
            .collect();

        if primary_keys.is_empty() {
            return Err(OrmError::schema("no primary key"));
        }

        Ok(Self {
            attributes,
            index,
            primary_keys,
        })
    }

    /// Build a schema from a JSON object of `name → {type, primary_key, ...}`.
    ///
    /// Attributes keep the order in which the object declares them.
    pub fn from_json(json: &serde_json::Value) -> OrmResult<Self> {
        let obj = json
            .as_object()
            .ok_or_else(|| OrmError::schema("attribute definitions must be a JSON object"))?;

        let mut definitions = Vec::with_capacity(obj.len());
        for (name, raw) in obj {
            let raw: RawDefinition = serde_json::from_value(raw.clone())
                .map_err(|e| OrmError::schema(format!("attribute '{name}': {e}")))?;
            definitions.push((name.clone(), raw.normalize(name)?));
        }
        Self::build(definitions)
    }

    /// Derive a schema for a sub-type: `definitions` are added after the
    /// inherited ones and replace inherited attributes of the same name.
    pub fn extend<N, I>(&self, definitions: I) -> OrmResult<Self>
    where
        N: Into<String>,
        I: IntoIterator<Item = (N, AttributeDefinition)>,
    {
        let mut merged = self.attributes.clone();
        for (name, def) in definitions {
            let name = name.into();
            match merged.iter_mut().find(|(n, _)| *n == name) {
                Some(slot) => slot.1 = def,
                None => merged.push((name, def)),
            }
        }
        Self::build(merged)
    }

    pub fn get(&self, name: &str) -> Option<&AttributeDefinition> {
        self.index.get(name).map(|&i| &self.attributes[i].1)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Attributes in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &AttributeDefinition)> {
        self.attributes.iter().map(|(n, d)| (n.as_str(), d))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.attributes.iter().map(|(n, _)| n.as_str())
    }

    pub fn primary_keys(&self) -> &[String] {
        &self.primary_keys
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribute::AttrType;

    #[test]
    fn requires_primary_key() {
        let err = AttributeSchema::build(vec![(
            "name",
            AttributeDefinition::new(AttrType::String),
        )])
        .unwrap_err();
        assert!(err.is_schema());
        assert!(err.to_string().contains("primary key"));

        let empty: Vec<(String, AttributeDefinition)> = Vec::new();
        assert!(AttributeSchema::build(empty).unwrap_err().is_schema());
    }

    #[test]
    fn keeps_declaration_order() {
        let schema = AttributeSchema::build(vec![
            ("id", AttributeDefinition::new(AttrType::Integer).primary_key()),
            ("zeta", AttributeDefinition::new(AttrType::String)),
            ("alpha", AttributeDefinition::new(AttrType::String)),
        ])
        .unwrap();
        assert_eq!(schema.names().collect::<Vec<_>>(), vec!["id", "zeta", "alpha"]);
        assert_eq!(schema.primary_keys(), ["id".to_string()]);
        assert!(schema.contains("zeta"));
        assert!(schema.get("missing").is_none());
    }

    #[test]
    fn duplicate_names_rejected() {
        let err = AttributeSchema::build(vec![
            ("id", AttributeDefinition::new(AttrType::Integer).primary_key()),
            ("id", AttributeDefinition::new(AttrType::String)),
        ])
        .unwrap_err();
        assert!(err.is_schema());
    }

    #[test]
    fn from_json_object() {
        let schema = AttributeSchema::from_json(&serde_json::json!({
            "id": {"type": "integer", "primary_key": true, "auto_generate": true},
            "email": {"type": "string", "refuse_update": true},
        }))
        .unwrap();
        assert_eq!(schema.len(), 2);
        assert!(schema.get("id").unwrap().auto_generate);
        assert!(schema.get("email").unwrap().refuse_update);
        assert_eq!(schema.names().collect::<Vec<_>>(), vec!["id", "email"]);

        let err = AttributeSchema::from_json(&serde_json::json!({})).unwrap_err();
        assert!(err.is_schema());
    }

    #[test]
    fn extend_inherits_and_overrides() {
        let base = AttributeSchema::build(vec![
            ("id", AttributeDefinition::new(AttrType::Integer).primary_key()),
            ("foo", AttributeDefinition::new(AttrType::String)),
        ])
        .unwrap();
        let child = base
            .extend(vec![
                ("bar", AttributeDefinition::new(AttrType::String)),
                ("foo", AttributeDefinition::new(AttrType::String).allow_null()),
            ])
            .unwrap();
        assert_eq!(child.len(), 3);
        assert!(child.get("foo").unwrap().allow_null);
        assert_eq!(child.names().collect::<Vec<_>>(), vec!["id", "foo", "bar"]);
    }
}
