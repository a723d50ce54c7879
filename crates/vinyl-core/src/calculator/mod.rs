//! The calculator entity: validated construction, output-slot setup,
//! derivation of independent variants, and snapshot persistence.

mod snapshot;

pub use snapshot::SNAPSHOT_SUFFIX;

use crate::data::{Dataset, DatasetCollection, DatasetType};
use crate::domain::{BackengineStatus, VinylError, VinylResult};
use crate::parameters::ParameterSet;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Accepted shapes for the calculator input. All are normalized to a
/// [`DatasetCollection`] at build time.
#[derive(Debug, Clone)]
pub enum InputSpec {
    Dataset(Dataset),
    List(Vec<Dataset>),
    Collection(DatasetCollection),
}

impl InputSpec {
    fn into_collection(self) -> VinylResult<DatasetCollection> {
        match self {
            Self::Dataset(dataset) => DatasetCollection::from_datasets([dataset]),
            Self::List(datasets) => DatasetCollection::from_datasets(datasets),
            Self::Collection(collection) => Ok(collection),
        }
    }
}

impl From<Dataset> for InputSpec {
    fn from(dataset: Dataset) -> Self {
        Self::Dataset(dataset)
    }
}

impl From<Vec<Dataset>> for InputSpec {
    fn from(datasets: Vec<Dataset>) -> Self {
        Self::List(datasets)
    }
}

impl From<DatasetCollection> for InputSpec {
    fn from(collection: DatasetCollection) -> Self {
        Self::Collection(collection)
    }
}

/// A single output key or a sequence of them.
#[derive(Debug, Clone)]
pub enum KeySpec {
    Single(String),
    List(Vec<String>),
}

impl KeySpec {
    fn into_keys(self) -> Vec<String> {
        match self {
            Self::Single(key) => vec![key],
            Self::List(keys) => keys,
        }
    }
}

impl From<&str> for KeySpec {
    fn from(key: &str) -> Self {
        Self::Single(key.to_string())
    }
}

impl From<String> for KeySpec {
    fn from(key: String) -> Self {
        Self::Single(key)
    }
}

impl From<Vec<String>> for KeySpec {
    fn from(keys: Vec<String>) -> Self {
        Self::List(keys)
    }
}

impl From<Vec<&str>> for KeySpec {
    fn from(keys: Vec<&str>) -> Self {
        Self::List(keys.into_iter().map(str::to_string).collect())
    }
}

/// A single dataset type descriptor or a sequence of them.
#[derive(Debug, Clone)]
pub enum TypeSpec {
    Single(DatasetType),
    List(Vec<DatasetType>),
}

impl TypeSpec {
    fn into_types(self) -> Vec<DatasetType> {
        match self {
            Self::Single(data_type) => vec![data_type],
            Self::List(data_types) => data_types,
        }
    }
}

impl From<DatasetType> for TypeSpec {
    fn from(data_type: DatasetType) -> Self {
        Self::Single(data_type)
    }
}

impl From<Vec<DatasetType>> for TypeSpec {
    fn from(data_types: Vec<DatasetType>) -> Self {
        Self::List(data_types)
    }
}

/// Output filenames; absent entries mean "no default filename".
#[derive(Debug, Clone)]
pub enum FilenameSpec {
    Single(Option<String>),
    List(Vec<Option<String>>),
}

impl FilenameSpec {
    fn into_filenames(self) -> Vec<Option<String>> {
        match self {
            Self::Single(filename) => vec![filename],
            Self::List(filenames) => filenames,
        }
    }
}

impl From<&str> for FilenameSpec {
    fn from(filename: &str) -> Self {
        Self::Single(Some(filename.to_string()))
    }
}

impl From<String> for FilenameSpec {
    fn from(filename: String) -> Self {
        Self::Single(Some(filename))
    }
}

impl From<Option<String>> for FilenameSpec {
    fn from(filename: Option<String>) -> Self {
        Self::Single(filename)
    }
}

impl From<Vec<Option<String>>> for FilenameSpec {
    fn from(filenames: Vec<Option<String>>) -> Self {
        Self::List(filenames)
    }
}

impl From<Vec<String>> for FilenameSpec {
    fn from(filenames: Vec<String>) -> Self {
        Self::List(filenames.into_iter().map(Some).collect())
    }
}

impl From<Vec<&str>> for FilenameSpec {
    fn from(filenames: Vec<&str>) -> Self {
        Self::List(filenames.into_iter().map(|f| Some(f.to_string())).collect())
    }
}

/// Validating constructor for [`CalculatorEntity`]. Every field check
/// happens in [`CalculatorBuilder::build`]; violations fail fast with a
/// `Type`-kind error naming the field.
#[derive(Debug, Clone)]
pub struct CalculatorBuilder {
    name: String,
    input: Option<InputSpec>,
    output_keys: Option<KeySpec>,
    output_data_types: Option<TypeSpec>,
    output_filenames: Option<FilenameSpec>,
    instrument_base_dir: PathBuf,
    calculator_base_dir: PathBuf,
    parameters: Option<ParameterSet>,
}

impl CalculatorBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            input: None,
            output_keys: None,
            output_data_types: None,
            output_filenames: None,
            instrument_base_dir: PathBuf::from("./"),
            calculator_base_dir: PathBuf::from("calculator"),
            parameters: None,
        }
    }

    pub fn input(mut self, input: impl Into<InputSpec>) -> Self {
        self.input = Some(input.into());
        self
    }

    pub fn output_keys(mut self, keys: impl Into<KeySpec>) -> Self {
        self.output_keys = Some(keys.into());
        self
    }

    pub fn output_data_types(mut self, data_types: impl Into<TypeSpec>) -> Self {
        self.output_data_types = Some(data_types.into());
        self
    }

    pub fn output_filenames(mut self, filenames: impl Into<FilenameSpec>) -> Self {
        self.output_filenames = Some(filenames.into());
        self
    }

    pub fn instrument_base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.instrument_base_dir = dir.into();
        self
    }

    pub fn calculator_base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.calculator_base_dir = dir.into();
        self
    }

    pub fn parameters(mut self, parameters: ParameterSet) -> Self {
        self.parameters = Some(parameters);
        self
    }

    pub fn build(self) -> VinylResult<CalculatorEntity> {
        if self.name.trim().is_empty() {
            return Err(VinylError::EmptyField { field: "name" });
        }

        let input = self
            .input
            .ok_or(VinylError::MissingField { field: "input" })?
            .into_collection()?;

        let output_keys = self
            .output_keys
            .ok_or(VinylError::MissingField {
                field: "output_keys",
            })?
            .into_keys();
        let mut seen_keys = HashSet::new();
        for key in &output_keys {
            if key.trim().is_empty() {
                return Err(VinylError::InvalidField {
                    field: "output_keys",
                    expected: "a sequence of non-empty strings",
                    actual: "an empty string".to_string(),
                });
            }
            if !seen_keys.insert(key.as_str()) {
                return Err(VinylError::InvalidField {
                    field: "output_keys",
                    expected: "unique keys",
                    actual: format!("duplicate key `{key}`"),
                });
            }
        }

        let output_data_types = self
            .output_data_types
            .ok_or(VinylError::MissingField {
                field: "output_data_types",
            })?
            .into_types();
        if output_data_types.len() != output_keys.len() {
            return Err(VinylError::OutputArityMismatch {
                field: "output_data_types",
                expected: output_keys.len(),
                actual: output_data_types.len(),
            });
        }

        let output_filenames = match self.output_filenames {
            Some(spec) => {
                let filenames = spec.into_filenames();
                if filenames.len() != output_keys.len() {
                    return Err(VinylError::OutputArityMismatch {
                        field: "output_filenames",
                        expected: output_keys.len(),
                        actual: filenames.len(),
                    });
                }
                filenames
            }
            None => vec![None; output_keys.len()],
        };

        // Output constructor: one empty dataset per declared key, in
        // declaration order. Runs exactly once per entity.
        let mut output = DatasetCollection::new();
        for (key, data_type) in output_keys.iter().zip(&output_data_types) {
            output.add_dataset(data_type.instantiate(key.clone()))?;
        }

        Ok(CalculatorEntity {
            name: self.name,
            input,
            output_keys,
            output_data_types,
            output_filenames,
            instrument_base_dir: self.instrument_base_dir,
            calculator_base_dir: self.calculator_base_dir,
            parameters: self.parameters,
            output,
        })
    }
}

/// Enumerated override set for [`CalculatorEntity::derive_with`]. Applied
/// by direct assignment into the clone, skipping build-time validation.
#[derive(Debug, Clone, Default)]
pub struct DeriveOverrides {
    pub name: Option<String>,
    pub input: Option<DatasetCollection>,
    pub output_filenames: Option<Vec<Option<String>>>,
    pub instrument_base_dir: Option<PathBuf>,
    pub calculator_base_dir: Option<PathBuf>,
}

/// State owned by every calculator: the validated field set plus the
/// derived output collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculatorEntity {
    name: String,
    input: DatasetCollection,
    output_keys: Vec<String>,
    output_data_types: Vec<DatasetType>,
    output_filenames: Vec<Option<String>>,
    instrument_base_dir: PathBuf,
    calculator_base_dir: PathBuf,
    parameters: Option<ParameterSet>,
    output: DatasetCollection,
}

impl CalculatorEntity {
    /// Restoring constructor: the full entity graph is read back from a
    /// snapshot file written by [`CalculatorEntity::dump`].
    pub fn from_snapshot(path: &Path) -> VinylResult<Self> {
        snapshot::read_snapshot(path)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn input(&self) -> &DatasetCollection {
        &self.input
    }

    pub fn input_mut(&mut self) -> &mut DatasetCollection {
        &mut self.input
    }

    pub fn output_keys(&self) -> &[String] {
        &self.output_keys
    }

    pub fn output_data_types(&self) -> &[DatasetType] {
        &self.output_data_types
    }

    pub fn output_filenames(&self) -> &[Option<String>] {
        &self.output_filenames
    }

    pub fn instrument_base_dir(&self) -> &Path {
        &self.instrument_base_dir
    }

    pub fn calculator_base_dir(&self) -> &Path {
        &self.calculator_base_dir
    }

    pub fn parameters(&self) -> Option<&ParameterSet> {
        self.parameters.as_ref()
    }

    pub fn parameters_mut(&mut self) -> Option<&mut ParameterSet> {
        self.parameters.as_mut()
    }

    /// The derived output collection; built once at construction and
    /// never rebuilt in place.
    pub fn output(&self) -> &DatasetCollection {
        &self.output
    }

    /// Alias of [`CalculatorEntity::output`]; both are views over the
    /// single owned collection.
    pub fn data(&self) -> &DatasetCollection {
        &self.output
    }

    /// Mutable access for backengines populating output slots.
    pub fn output_mut(&mut self) -> &mut DatasetCollection {
        &mut self.output
    }

    /// The only post-construction validated setter.
    pub fn set_parameters(&mut self, parameters: ParameterSet) {
        self.parameters = Some(parameters);
    }

    /// Resolved location of output `index`:
    /// `instrument_base_dir / calculator_base_dir / filename`. `None`
    /// when the slot has no default filename.
    pub fn resolved_output_path(&self, index: usize) -> Option<PathBuf> {
        let filename = self.output_filenames.get(index)?.as_ref()?;
        Some(
            self.instrument_base_dir
                .join(&self.calculator_base_dir)
                .join(filename),
        )
    }

    /// Independent deep copy; mutating the clone never affects `self`.
    pub fn derive(&self) -> Self {
        self.clone()
    }

    /// Deep copy with enumerated field overrides. Overrides are assigned
    /// directly (the documented fast path without build-time checks); a
    /// replacement parameter set goes through the validated setter and
    /// wins over any override.
    pub fn derive_with(
        &self,
        parameters: Option<ParameterSet>,
        overrides: DeriveOverrides,
    ) -> Self {
        let mut derived = self.clone();
        if let Some(name) = overrides.name {
            derived.name = name;
        }
        if let Some(input) = overrides.input {
            derived.input = input;
        }
        if let Some(output_filenames) = overrides.output_filenames {
            derived.output_filenames = output_filenames;
        }
        if let Some(instrument_base_dir) = overrides.instrument_base_dir {
            derived.instrument_base_dir = instrument_base_dir;
        }
        if let Some(calculator_base_dir) = overrides.calculator_base_dir {
            derived.calculator_base_dir = calculator_base_dir;
        }
        if let Some(parameters) = parameters {
            derived.set_parameters(parameters);
        }
        derived
    }

    /// Serializes the entity graph to a snapshot file and returns the
    /// path written. With no path a unique file is created in the current
    /// working directory (suffix [`SNAPSHOT_SUFFIX`]).
    pub fn dump(&self, path: Option<&Path>) -> VinylResult<PathBuf> {
        snapshot::write_snapshot(self, path, std::any::type_name::<Self>())
    }

    /// Replaces the entire state with the snapshot contents. The restore
    /// is buffered: on any failure the prior state is left untouched.
    pub fn restore(&mut self, path: &Path) -> VinylResult<()> {
        *self = snapshot::read_snapshot(path)?;
        Ok(())
    }
}

/// Capability set every concrete calculator implements. The two hooks
/// default to `NotImplemented` errors so an un-overridden calculator
/// fails loudly instead of silently doing nothing.
pub trait Calculator {
    fn entity(&self) -> &CalculatorEntity;

    fn entity_mut(&mut self) -> &mut CalculatorEntity;

    /// Builds the default parameter set used when construction supplied
    /// none.
    fn init_parameters(&self) -> VinylResult<ParameterSet> {
        Err(VinylError::NotImplemented {
            operation: "init_parameters",
        })
    }

    /// Runs the actual computation, populating the owned output
    /// collection.
    fn backengine(&mut self) -> VinylResult<BackengineStatus> {
        Err(VinylError::NotImplemented {
            operation: "backengine",
        })
    }

    /// Installs the default parameter set when the entity has none yet.
    fn ensure_parameters(&mut self) -> VinylResult<()> {
        if self.entity().parameters().is_none() {
            let parameters = self.init_parameters()?;
            self.entity_mut().set_parameters(parameters);
        }
        Ok(())
    }

    /// Serializes the whole calculator to a snapshot file. The generated
    /// filename prefix derives from the concrete type name.
    fn dump(&self, path: Option<&Path>) -> VinylResult<PathBuf>
    where
        Self: Sized,
    {
        snapshot::write_snapshot(self.entity(), path, std::any::type_name::<Self>())
    }

    /// Atomically replaces the calculator state from a snapshot file.
    fn restore(&mut self, path: &Path) -> VinylResult<()> {
        self.entity_mut().restore(path)
    }
}

#[cfg(test)]
mod tests {
    use super::{Calculator, CalculatorBuilder, DeriveOverrides};
    use crate::data::{DatasetPayload, DatasetType};
    use crate::domain::{VinylError, VinylErrorKind};
    use crate::parameters::ParameterSet;
    use std::path::PathBuf;

    fn minimal_builder() -> CalculatorBuilder {
        CalculatorBuilder::new("calc1")
            .input(DatasetType::new("NumberData").instantiate("in1"))
            .output_keys("out1")
            .output_data_types(DatasetType::new("NumberData"))
    }

    #[test]
    fn scalar_fields_normalize_to_one_element_sequences() {
        let entity = minimal_builder()
            .output_filenames("out1.h5")
            .build()
            .expect("minimal calculator builds");

        assert_eq!(entity.output_keys(), ["out1"]);
        assert_eq!(entity.output_data_types(), [DatasetType::new("NumberData")]);
        assert_eq!(entity.output_filenames(), [Some("out1.h5".to_string())]);
        assert_eq!(entity.input().len(), 1);
    }

    #[test]
    fn empty_name_is_rejected() {
        let error = CalculatorBuilder::new("  ")
            .input(DatasetType::new("NumberData").instantiate("in1"))
            .output_keys("out1")
            .output_data_types(DatasetType::new("NumberData"))
            .build()
            .expect_err("blank name must fail");
        assert_eq!(error, VinylError::EmptyField { field: "name" });
    }

    #[test]
    fn missing_input_is_rejected() {
        let error = CalculatorBuilder::new("calc1")
            .output_keys("out1")
            .output_data_types(DatasetType::new("NumberData"))
            .build()
            .expect_err("input is required");
        assert_eq!(error, VinylError::MissingField { field: "input" });
    }

    #[test]
    fn type_arity_must_match_key_arity() {
        let error = CalculatorBuilder::new("calc1")
            .input(DatasetType::new("NumberData").instantiate("in1"))
            .output_keys(vec!["out1", "out2"])
            .output_data_types(DatasetType::new("NumberData"))
            .build()
            .expect_err("one type for two keys must fail");
        assert_eq!(
            error,
            VinylError::OutputArityMismatch {
                field: "output_data_types",
                expected: 2,
                actual: 1,
            }
        );
    }

    #[test]
    fn filename_arity_must_match_key_arity() {
        let error = minimal_builder()
            .output_filenames(vec!["a.h5", "b.h5"])
            .build()
            .expect_err("two filenames for one key must fail");
        assert_eq!(error.kind(), VinylErrorKind::Type);
    }

    #[test]
    fn duplicate_output_keys_are_rejected() {
        let error = CalculatorBuilder::new("calc1")
            .input(DatasetType::new("NumberData").instantiate("in1"))
            .output_keys(vec!["twin", "twin"])
            .output_data_types(vec![
                DatasetType::new("NumberData"),
                DatasetType::new("NumberData"),
            ])
            .build()
            .expect_err("duplicate keys must fail");
        assert_eq!(error.kind(), VinylErrorKind::Type);
    }

    #[test]
    fn filenames_default_to_absent_per_key() {
        let entity = minimal_builder().build().expect("builds");
        assert_eq!(entity.output_filenames(), [None]);
        assert_eq!(entity.resolved_output_path(0), None);
    }

    #[test]
    fn resolved_output_path_joins_all_fragments() {
        let entity = minimal_builder()
            .output_filenames("signal.h5")
            .instrument_base_dir("instrument")
            .calculator_base_dir("source")
            .build()
            .expect("builds");

        assert_eq!(
            entity.resolved_output_path(0),
            Some(PathBuf::from("instrument/source/signal.h5"))
        );
    }

    #[test]
    fn derive_with_applies_overrides_and_parameter_precedence() {
        let entity = minimal_builder().build().expect("builds");

        let mut replacement = ParameterSet::new();
        replacement
            .new_parameter("times", None, None)
            .expect("fresh set accepts the parameter")
            .set_value(3)
            .expect("value is legal");

        let derived = entity.derive_with(
            Some(replacement.clone()),
            DeriveOverrides {
                name: Some("calc2".to_string()),
                calculator_base_dir: Some(PathBuf::from("elsewhere")),
                ..DeriveOverrides::default()
            },
        );

        assert_eq!(derived.name(), "calc2");
        assert_eq!(derived.calculator_base_dir(), PathBuf::from("elsewhere"));
        assert_eq!(derived.parameters(), Some(&replacement));
        // original untouched
        assert_eq!(entity.name(), "calc1");
        assert_eq!(entity.parameters(), None);
    }

    #[test]
    fn derived_clone_shares_no_mutable_state() {
        let entity = minimal_builder().build().expect("builds");
        let mut derived = entity.derive();

        derived
            .input_mut()
            .get_mut("in1")
            .expect("dataset present")
            .set_payload(DatasetPayload::Number(42.0));

        assert!(entity.input().get("in1").expect("present").payload().is_empty());
        assert!(
            !derived
                .input()
                .get("in1")
                .expect("present")
                .payload()
                .is_empty()
        );
    }

    #[test]
    fn un_overridden_hooks_fail_with_not_implemented() {
        struct Bare {
            entity: super::CalculatorEntity,
        }
        impl Calculator for Bare {
            fn entity(&self) -> &super::CalculatorEntity {
                &self.entity
            }
            fn entity_mut(&mut self) -> &mut super::CalculatorEntity {
                &mut self.entity
            }
        }

        let mut bare = Bare {
            entity: minimal_builder().build().expect("builds"),
        };

        let error = bare.backengine().expect_err("no override present");
        assert_eq!(error.kind(), VinylErrorKind::NotImplemented);

        let error = bare
            .ensure_parameters()
            .expect_err("auto-init needs an init_parameters override");
        assert_eq!(
            error,
            VinylError::NotImplemented {
                operation: "init_parameters"
            }
        );
    }
}
