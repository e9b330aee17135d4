// 🏠 Valuation Engine - apartment price estimate from a pre-trained linear model
//
// Feature layout is fixed by the column schema shipped with the model:
//   [0] area  [1] bathrooms  [2] bedrooms  [3..] one-hot location columns
//
// Schema and model are loaded once, then only read. An unknown location
// leaves every location bit at 0 and yields the location-agnostic baseline
// instead of an error. That fallback is an unverified assumption, not a
// confirmed requirement.

use anyhow::Context as AnyhowContext;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

/// Number of numeric columns preceding the location columns
pub const NUMERIC_FEATURES: usize = 3;

#[derive(Debug, Error, PartialEq)]
pub enum ValuationError {
    #[error("feature schema has {0} columns, need at least 3")]
    SchemaTooShort(usize),

    #[error("model expects {model} features but schema defines {schema}")]
    ArityMismatch { model: usize, schema: usize },
}

// ============================================================================
// FEATURE SCHEMA
// ============================================================================

#[derive(Debug, Deserialize)]
struct SchemaRow {
    column: String,
}

/// Ordered column names defining the feature vector layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureSchema {
    columns: Vec<String>,
}

impl FeatureSchema {
    pub fn new(columns: Vec<String>) -> Result<Self, ValuationError> {
        if columns.len() < NUMERIC_FEATURES {
            return Err(ValuationError::SchemaTooShort(columns.len()));
        }
        Ok(FeatureSchema { columns })
    }

    /// Load from a CSV file with a single `column` header, one name per row.
    pub fn from_csv_path<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let mut rdr = csv::Reader::from_path(path.as_ref())
            .with_context(|| format!("Failed to open column schema: {:?}", path.as_ref()))?;

        let mut columns = Vec::new();
        for result in rdr.deserialize() {
            let row: SchemaRow = result.context("Failed to read schema column")?;
            columns.push(row.column);
        }

        Ok(FeatureSchema::new(columns)?)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Location columns, in schema order
    pub fn locations(&self) -> &[String] {
        &self.columns[NUMERIC_FEATURES..]
    }

    /// Index of a location column; numeric columns never match
    pub fn location_index(&self, location: &str) -> Option<usize> {
        self.locations()
            .iter()
            .position(|c| c == location)
            .map(|idx| idx + NUMERIC_FEATURES)
    }
}

// ============================================================================
// MODEL
// ============================================================================

/// A trained regressor mapping a feature vector to one scalar.
pub trait RegressionModel: Send + Sync {
    /// Number of features the model was trained on
    fn arity(&self) -> usize;

    fn predict(&self, features: &[f64]) -> f64;
}

/// `intercept + Σ coefficients[i] * x[i]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearModel {
    pub intercept: f64,
    pub coefficients: Vec<f64>,
}

impl LinearModel {
    /// Load the JSON artifact `{ "intercept": .., "coefficients": [..] }`
    pub fn from_json_path<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read model artifact: {:?}", path.as_ref()))?;

        serde_json::from_str(&content).context("Failed to parse model artifact JSON")
    }
}

impl RegressionModel for LinearModel {
    fn arity(&self) -> usize {
        self.coefficients.len()
    }

    fn predict(&self, features: &[f64]) -> f64 {
        self.intercept
            + self
                .coefficients
                .iter()
                .zip(features)
                .map(|(w, x)| w * x)
                .sum::<f64>()
    }
}

// ============================================================================
// ENGINE
// ============================================================================

pub struct ValuationEngine {
    schema: FeatureSchema,
    model: Box<dyn RegressionModel>,
}

impl ValuationEngine {
    pub fn new<M>(schema: FeatureSchema, model: M) -> Result<Self, ValuationError>
    where
        M: RegressionModel + 'static,
    {
        if model.arity() != schema.len() {
            return Err(ValuationError::ArityMismatch {
                model: model.arity(),
                schema: schema.len(),
            });
        }

        Ok(ValuationEngine {
            schema,
            model: Box::new(model),
        })
    }

    /// Load the CSV column schema and JSON linear model artifacts.
    pub fn load<P: AsRef<Path>, Q: AsRef<Path>>(
        schema_path: P,
        model_path: Q,
    ) -> anyhow::Result<Self> {
        let schema = FeatureSchema::from_csv_path(schema_path)?;
        let model = LinearModel::from_json_path(model_path)?;
        let engine = ValuationEngine::new(schema, model)?;

        info!(
            features = engine.schema.len(),
            locations = engine.schema.locations().len(),
            "valuation model loaded"
        );
        Ok(engine)
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn locations(&self) -> &[String] {
        self.schema.locations()
    }

    /// Encode inputs in schema layout
    pub fn feature_vector(&self, location: &str, area: f64, bathrooms: u32, bedrooms: u32) -> Vec<f64> {
        let mut x = vec![0.0; self.schema.len()];
        x[0] = area;
        x[1] = f64::from(bathrooms);
        x[2] = f64::from(bedrooms);

        match self.schema.location_index(location) {
            Some(idx) => x[idx] = 1.0,
            None => debug!(location, "unknown location, using baseline"),
        }

        x
    }

    /// Estimated price, in the unit the model was trained on.
    pub fn predict(&self, location: &str, area: f64, bathrooms: u32, bedrooms: u32) -> f64 {
        let x = self.feature_vector(location, area, bathrooms, bedrooms);
        self.model.predict(&x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn test_schema() -> FeatureSchema {
        FeatureSchema::new(
            ["total_sqft", "bath", "bhk", "Whitefield", "Indira Nagar", "Hebbal"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        )
        .unwrap()
    }

    fn test_engine() -> ValuationEngine {
        let model = LinearModel {
            intercept: 10.0,
            coefficients: vec![0.05, 2.0, 3.0, 15.0, 40.0, -5.0],
        };
        ValuationEngine::new(test_schema(), model).unwrap()
    }

    #[test]
    fn test_known_location_sets_one_bit() {
        let engine = test_engine();
        let x = engine.feature_vector("Indira Nagar", 1200.0, 2, 3);

        assert_eq!(x, vec![1200.0, 2.0, 3.0, 0.0, 1.0, 0.0]);
        assert_eq!(x[NUMERIC_FEATURES..].iter().filter(|v| **v == 1.0).count(), 1);
    }

    #[test]
    fn test_predict_linear() {
        let engine = test_engine();
        // 10 + 0.05*1000 + 2*2 + 3*3 + 15
        let price = engine.predict("Whitefield", 1000.0, 2, 3);
        assert!((price - 88.0).abs() < 1e-9);
    }

    #[test]
    fn test_unknown_location_is_baseline() {
        let engine = test_engine();

        let x = engine.feature_vector("Atlantis", 1000.0, 2, 3);
        assert!(x[NUMERIC_FEATURES..].iter().all(|v| *v == 0.0));

        let unknown = engine.predict("Atlantis", 1000.0, 2, 3);
        let baseline = engine.model.predict(&[1000.0, 2.0, 3.0, 0.0, 0.0, 0.0]);
        assert_eq!(unknown, baseline);
    }

    #[test]
    fn test_numeric_column_names_are_not_locations() {
        let engine = test_engine();
        let x = engine.feature_vector("bath", 500.0, 1, 1);
        assert_eq!(x, vec![500.0, 1.0, 1.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_location_match_is_exact() {
        let engine = test_engine();
        let x = engine.feature_vector("whitefield", 500.0, 1, 1);
        assert_eq!(x[3], 0.0);
    }

    #[test]
    fn test_predict_idempotent() {
        let engine = test_engine();
        let first = engine.predict("Hebbal", 850.0, 1, 2);
        for _ in 0..5 {
            assert_eq!(engine.predict("Hebbal", 850.0, 1, 2), first);
        }
    }

    #[test]
    fn test_schema_too_short() {
        let err = FeatureSchema::new(vec!["total_sqft".to_string(), "bath".to_string()]).unwrap_err();
        assert_eq!(err, ValuationError::SchemaTooShort(2));
    }

    #[test]
    fn test_arity_mismatch() {
        let model = LinearModel {
            intercept: 0.0,
            coefficients: vec![1.0, 1.0, 1.0],
        };
        let err = ValuationEngine::new(test_schema(), model).err().unwrap();
        assert_eq!(err, ValuationError::ArityMismatch { model: 3, schema: 6 });
    }

    #[test]
    fn test_engine_shareable_across_threads() {
        let engine = std::sync::Arc::new(test_engine());
        let expected = engine.predict("Whitefield", 1000.0, 2, 3);

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let engine = engine.clone();
                std::thread::spawn(move || engine.predict("Whitefield", 1000.0, 2, 3))
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), expected);
        }
    }

    #[test]
    fn test_load_artifacts() {
        let dir = tempfile::tempdir().unwrap();

        let schema_path = dir.path().join("model_columns.csv");
        let mut f = std::fs::File::create(&schema_path).unwrap();
        writeln!(f, "column\ntotal_sqft\nbath\nbhk\nWhitefield\nHebbal").unwrap();

        let model_path = dir.path().join("model.json");
        std::fs::write(
            &model_path,
            r#"{"intercept": 1.5, "coefficients": [0.1, 1.0, 2.0, 30.0, 20.0]}"#,
        )
        .unwrap();

        let engine = ValuationEngine::load(&schema_path, &model_path).unwrap();
        assert_eq!(engine.locations(), ["Whitefield".to_string(), "Hebbal".to_string()]);

        // 1.5 + 0.1*100 + 1 + 2 + 20
        let price = engine.predict("Hebbal", 100.0, 1, 1);
        assert!((price - 34.5).abs() < 1e-9);
    }

    #[test]
    fn test_load_rejects_mismatched_artifacts() {
        let dir = tempfile::tempdir().unwrap();

        let schema_path = dir.path().join("model_columns.csv");
        std::fs::write(&schema_path, "column\ntotal_sqft\nbath\nbhk\nWhitefield\n").unwrap();
        let model_path = dir.path().join("model.json");
        std::fs::write(&model_path, r#"{"intercept": 0.0, "coefficients": [1.0]}"#).unwrap();

        assert!(ValuationEngine::load(&schema_path, &model_path).is_err());
        assert!(ValuationEngine::load(dir.path().join("missing.csv"), &model_path).is_err());
    }
}
