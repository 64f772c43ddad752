use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use uuid::Uuid;

/// Revision number of a stored document, used for optimistic concurrency control.
///
/// Revision 0 means the document does not exist. The first write produces
/// revision 1 and every later write increments it by one.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Revision(i64);

impl Revision {
    /// Creates a revision from a raw value.
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    /// Returns the revision of a document that does not exist yet.
    pub fn initial() -> Self {
        Self(0)
    }

    /// Returns the revision produced by the first write.
    pub fn first() -> Self {
        Self(1)
    }

    /// Returns the next revision.
    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }

    /// Returns the raw revision value.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for Revision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for Revision {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

/// A stored JSON document with its storage metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Collection the document belongs to (e.g. "products").
    pub collection: String,

    /// Document key, unique within the collection.
    pub id: Uuid,

    /// Current revision.
    pub revision: Revision,

    /// Document content.
    pub body: serde_json::Value,

    /// When the document was first written.
    pub created_at: DateTime<Utc>,

    /// When the document was last written.
    pub updated_at: DateTime<Utc>,
}

impl Document {
    /// Deserializes the document body into a typed value.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.body.clone())
    }
}

/// A single write inside a [`WriteBatch`].
#[derive(Debug, Clone)]
pub enum WriteOp {
    /// Inserts or replaces a document.
    ///
    /// `expected == Revision::initial()` means the document must not exist yet.
    Put {
        collection: String,
        id: Uuid,
        body: serde_json::Value,
        expected: Revision,
    },

    /// Deletes a document that is currently at the expected revision.
    Delete {
        collection: String,
        id: Uuid,
        expected: Revision,
    },
}

impl WriteOp {
    /// Creates a put of an already serialized body.
    pub fn put(
        collection: impl Into<String>,
        id: Uuid,
        body: serde_json::Value,
        expected: Revision,
    ) -> Self {
        WriteOp::Put {
            collection: collection.into(),
            id,
            body,
            expected,
        }
    }

    /// Creates a put by serializing a value.
    pub fn put_json<T: Serialize>(
        collection: impl Into<String>,
        id: Uuid,
        value: &T,
        expected: Revision,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self::put(collection, id, serde_json::to_value(value)?, expected))
    }

    /// Creates a delete.
    pub fn delete(collection: impl Into<String>, id: Uuid, expected: Revision) -> Self {
        WriteOp::Delete {
            collection: collection.into(),
            id,
            expected,
        }
    }

    /// Returns the collection this op targets.
    pub fn collection(&self) -> &str {
        match self {
            WriteOp::Put { collection, .. } | WriteOp::Delete { collection, .. } => collection,
        }
    }

    /// Returns the document id this op targets.
    pub fn id(&self) -> Uuid {
        match self {
            WriteOp::Put { id, .. } | WriteOp::Delete { id, .. } => *id,
        }
    }

    /// Returns the revision the document must be at for this op to apply.
    pub fn expected(&self) -> Revision {
        match self {
            WriteOp::Put { expected, .. } | WriteOp::Delete { expected, .. } => *expected,
        }
    }
}

/// An ordered set of writes committed atomically.
#[derive(Debug, Clone, Default)]
pub struct WriteBatch {
    ops: Vec<WriteOp>,
}

impl WriteBatch {
    /// Creates an empty batch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an op and returns the batch.
    pub fn with(mut self, op: WriteOp) -> Self {
        self.ops.push(op);
        self
    }

    /// Appends an op.
    pub fn push(&mut self, op: WriteOp) {
        self.ops.push(op);
    }

    /// Returns the ops in commit order.
    pub fn ops(&self) -> &[WriteOp] {
        &self.ops
    }

    /// Consumes the batch, returning its ops.
    pub fn into_ops(self) -> Vec<WriteOp> {
        self.ops
    }

    /// Returns the number of ops.
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Returns true if the batch has no ops.
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

impl Extend<WriteOp> for WriteBatch {
    fn extend<I: IntoIterator<Item = WriteOp>>(&mut self, iter: I) {
        self.ops.extend(iter);
    }
}

impl FromIterator<WriteOp> for WriteBatch {
    fn from_iter<I: IntoIterator<Item = WriteOp>>(iter: I) -> Self {
        Self {
            ops: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn revision_ordering() {
        assert!(Revision::initial() < Revision::first());
        assert_eq!(Revision::first().next(), Revision::new(2));
    }

    #[test]
    fn decode_reads_body() {
        let doc = Document {
            collection: "things".to_string(),
            id: Uuid::new_v4(),
            revision: Revision::first(),
            body: serde_json::json!({"name": "widget"}),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        #[derive(Deserialize)]
        struct Thing {
            name: String,
        }

        let thing: Thing = doc.decode().unwrap();
        assert_eq!(thing.name, "widget");
    }

    #[test]
    fn batch_collects_ops_in_order() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let batch: WriteBatch = vec![
            WriteOp::put("things", a, serde_json::json!({}), Revision::initial()),
            WriteOp::delete("things", b, Revision::first()),
        ]
        .into_iter()
        .collect();

        assert_eq!(batch.len(), 2);
        assert_eq!(batch.ops()[0].id(), a);
        assert_eq!(batch.ops()[1].expected(), Revision::first());
    }
}
