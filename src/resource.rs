use crate::client::ApiVersion;
use serde::{Serialize, Serializer};
use serde_json::Value;
use std::borrow::Cow;
use std::fmt;

/// Resource is a read-only view over one JSON object returned by the API.
///
/// Both protocol generations expose the same accessors; each variant knows
/// where its schema keeps the fields. Absent fields read as `None`.
pub trait Resource: fmt::Debug {
    /// The underlying JSON object
    fn data(&self) -> &Value;

    fn guid(&self) -> Option<&str>;
    fn name(&self) -> Option<&str>;
    fn host(&self) -> Option<&str>;
    fn label(&self) -> Option<&str>;

    /// GUID of the owning space
    fn space_guid(&self) -> Option<&str>;

    /// GUID of the owning organization
    fn organization_guid(&self) -> Option<&str>;

    /// Look up a top-level field of the raw object
    fn get(&self, field: &str) -> Option<&Value> {
        self.data().get(field)
    }

    /// Whether the raw object has a top-level field
    fn contains(&self, field: &str) -> bool {
        self.get(field).is_some()
    }

    /// One-line summary: the GUID, a tab, then the host, label or name
    fn summary(&self) -> String {
        let title = self.host().or_else(|| self.label()).or_else(|| self.name());
        format!("{}\t{}", self.guid().unwrap_or("-"), title.unwrap_or("-"))
    }
}

impl<'a> Serialize for dyn Resource + 'a {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.data().serialize(serializer)
    }
}

impl<'a> fmt::Display for dyn Resource + 'a {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.summary())
    }
}

fn str_at<'v>(data: &'v Value, path: &[&str]) -> Option<&'v str> {
    path.iter()
        .try_fold(data, |value, key| value.get(key))
        .and_then(Value::as_str)
}

/// V2 resource: `{"metadata": {"guid": ...}, "entity": {"name": ...}}`
#[derive(Debug, Clone)]
pub struct V2Resource<'a> {
    data: Cow<'a, Value>,
}

impl<'a> V2Resource<'a> {
    pub fn new(data: Cow<'a, Value>) -> Self {
        V2Resource { data }
    }

    pub fn into_owned(self) -> V2Resource<'static> {
        V2Resource {
            data: Cow::Owned(self.data.into_owned()),
        }
    }

    /// Field of the `entity` sub-object
    pub fn entity(&self, field: &str) -> Option<&Value> {
        self.data.get("entity")?.get(field)
    }
}

impl Resource for V2Resource<'_> {
    fn data(&self) -> &Value {
        &self.data
    }

    fn guid(&self) -> Option<&str> {
        str_at(&self.data, &["metadata", "guid"])
    }

    fn name(&self) -> Option<&str> {
        str_at(&self.data, &["entity", "name"])
    }

    fn host(&self) -> Option<&str> {
        str_at(&self.data, &["entity", "host"])
    }

    fn label(&self) -> Option<&str> {
        str_at(&self.data, &["entity", "label"])
    }

    fn space_guid(&self) -> Option<&str> {
        str_at(&self.data, &["entity", "space_guid"])
    }

    fn organization_guid(&self) -> Option<&str> {
        str_at(&self.data, &["entity", "organization_guid"])
    }
}

/// V3 resource: flat fields plus `relationships.{space,organization}.data.guid`
#[derive(Debug, Clone)]
pub struct V3Resource<'a> {
    data: Cow<'a, Value>,
}

impl<'a> V3Resource<'a> {
    pub fn new(data: Cow<'a, Value>) -> Self {
        V3Resource { data }
    }

    pub fn into_owned(self) -> V3Resource<'static> {
        V3Resource {
            data: Cow::Owned(self.data.into_owned()),
        }
    }

    /// GUID of a named relationship, if the relationship is populated
    pub fn relationship_guid(&self, relationship: &str) -> Option<&str> {
        str_at(&self.data, &["relationships", relationship, "data", "guid"])
    }
}

impl Resource for V3Resource<'_> {
    fn data(&self) -> &Value {
        &self.data
    }

    fn guid(&self) -> Option<&str> {
        str_at(&self.data, &["guid"])
    }

    fn name(&self) -> Option<&str> {
        str_at(&self.data, &["name"])
    }

    fn host(&self) -> Option<&str> {
        str_at(&self.data, &["host"])
    }

    fn label(&self) -> Option<&str> {
        str_at(&self.data, &["label"])
    }

    fn space_guid(&self) -> Option<&str> {
        self.relationship_guid("space")
    }

    fn organization_guid(&self) -> Option<&str> {
        self.relationship_guid("organization")
    }
}

impl ApiVersion {
    /// Wrap a JSON object in this version's resource view
    pub fn resource<'a>(self, data: Cow<'a, Value>) -> Box<dyn Resource + 'a> {
        match self {
            ApiVersion::V2 => Box::new(V2Resource::new(data)),
            ApiVersion::V3 => Box::new(V3Resource::new(data)),
        }
    }
}
