//! Firestore REST wire types, limited to the value kinds settings use.
//!
//! A [`Value`] carries at most one of its typed members. Members of kinds this
//! crate does not model (integers, maps, timestamps...) are ignored on read, so
//! such fields simply read as absent.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A single Firestore field value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Value {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub string_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub boolean_value: Option<bool>,
}

impl Value {
    pub fn string(value: impl Into<String>) -> Self {
        Self {
            string_value: Some(value.into()),
            ..Default::default()
        }
    }

    pub fn boolean(value: bool) -> Self {
        Self {
            boolean_value: Some(value),
            ..Default::default()
        }
    }
}

/// A document as returned by `GET` and sent by `PATCH`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    /// `projects/{p}/databases/{d}/documents/{collection}/{id}`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub fields: HashMap<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_time: Option<String>,
}

impl Document {
    pub fn new(fields: HashMap<String, Value>) -> Self {
        Self {
            fields,
            ..Default::default()
        }
    }

    /// Typed field accessor; `None` when the field is missing or has another type.
    pub fn field<T: FromFirestoreValue>(&self, name: &str) -> Option<T> {
        self.fields.get(name).and_then(T::from_firestore_value)
    }
}

pub trait ToFirestoreValue {
    fn to_firestore_value(&self) -> Value;
}

impl ToFirestoreValue for str {
    fn to_firestore_value(&self) -> Value {
        Value::string(self)
    }
}

impl ToFirestoreValue for String {
    fn to_firestore_value(&self) -> Value {
        Value::string(self.as_str())
    }
}

impl ToFirestoreValue for bool {
    fn to_firestore_value(&self) -> Value {
        Value::boolean(*self)
    }
}

pub trait FromFirestoreValue: Sized {
    fn from_firestore_value(value: &Value) -> Option<Self>;
}

impl FromFirestoreValue for String {
    fn from_firestore_value(value: &Value) -> Option<Self> {
        value.string_value.clone()
    }
}

impl FromFirestoreValue for bool {
    fn from_firestore_value(value: &Value) -> Option<Self> {
        value.boolean_value
    }
}
