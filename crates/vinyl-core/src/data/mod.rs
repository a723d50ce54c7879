//! Typed dataset objects and the key-unique collection that aggregates them.
//!
//! The calculator core never interprets dataset contents; payloads stay
//! opaque so heterogeneous backengines can exchange data through the same
//! collection type.

use crate::domain::{VinylError, VinylResult};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Value descriptor for a dataset class. Two datasets share a type iff
/// their descriptors compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DatasetType {
    name: String,
}

impl DatasetType {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Instantiates an empty dataset of this type under the given key.
    pub fn instantiate(&self, key: impl Into<String>) -> Dataset {
        Dataset {
            key: key.into(),
            data_type: self.clone(),
            payload: DatasetPayload::Empty,
        }
    }
}

impl Display for DatasetType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}

/// Contents of a dataset. The core only moves these around; the variants
/// exist so backengines have somewhere to put results and snapshots can
/// round-trip without external schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DatasetPayload {
    Empty,
    Number(f64),
    NumberArray(Vec<f64>),
    Text(String),
    Json(serde_json::Value),
}

impl DatasetPayload {
    pub const fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dataset {
    key: String,
    data_type: DatasetType,
    payload: DatasetPayload,
}

impl Dataset {
    pub fn new(key: impl Into<String>, data_type: DatasetType, payload: DatasetPayload) -> Self {
        Self {
            key: key.into(),
            data_type,
            payload,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn data_type(&self) -> &DatasetType {
        &self.data_type
    }

    pub fn payload(&self) -> &DatasetPayload {
        &self.payload
    }

    pub fn payload_mut(&mut self) -> &mut DatasetPayload {
        &mut self.payload
    }

    pub fn set_payload(&mut self, payload: DatasetPayload) {
        self.payload = payload;
    }
}

/// Ordered aggregate of datasets with unique keys. Insertion order is
/// preserved; cloning deep-copies every member.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatasetCollection {
    datasets: Vec<Dataset>,
}

impl DatasetCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_datasets(datasets: impl IntoIterator<Item = Dataset>) -> VinylResult<Self> {
        let mut collection = Self::new();
        for dataset in datasets {
            collection.add_dataset(dataset)?;
        }
        Ok(collection)
    }

    pub fn add_dataset(&mut self, dataset: Dataset) -> VinylResult<()> {
        if self.contains_key(dataset.key()) {
            return Err(VinylError::DuplicateDatasetKey {
                key: dataset.key().to_string(),
            });
        }
        self.datasets.push(dataset);
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&Dataset> {
        self.datasets.iter().find(|dataset| dataset.key() == key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Dataset> {
        self.datasets.iter_mut().find(|dataset| dataset.key() == key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.datasets.iter().any(|dataset| dataset.key() == key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.datasets.iter().map(Dataset::key)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Dataset> {
        self.datasets.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Dataset> {
        self.datasets.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.datasets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.datasets.is_empty()
    }
}

impl<'a> IntoIterator for &'a DatasetCollection {
    type Item = &'a Dataset;
    type IntoIter = std::slice::Iter<'a, Dataset>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
