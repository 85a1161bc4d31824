use serde::Deserialize;
use std::{collections::HashSet, fs, path::Path};

use crate::error::LoadError;

#[derive(Deserialize)]
struct ArtifactJson {
    #[serde(alias = "feat_list")]
    feature_names: Vec<String>,
    coefficients: Vec<f64>,
    intercept: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NumericField {
    Sqft,
    Bedrooms,
    Bathrooms,
}

/// What a single column of the artifact's input vector means.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Feature {
    Numeric(NumericField),
    /// 1.0 when the request city equals the key exactly.
    CityOneHot(String),
}

const CITY_PREFIXES: [&str; 2] = ["citi_", "city_"];

impl Feature {
    pub fn resolve(name: &str) -> Result<Self, LoadError> {
        let numeric = match name {
            "sqft" => Some(NumericField::Sqft),
            "bed" | "bedrooms" => Some(NumericField::Bedrooms),
            "bath" | "bathrooms" => Some(NumericField::Bathrooms),
            _ => None,
        };
        if let Some(field) = numeric {
            return Ok(Feature::Numeric(field));
        }
        CITY_PREFIXES
            .iter()
            .find_map(|p| name.strip_prefix(p))
            .filter(|key| !key.is_empty())
            .map(|key| Feature::CityOneHot(key.to_string()))
            .ok_or_else(|| LoadError::UnsupportedFeature(name.to_string()))
    }
}

/// The artifact's authoritative input layout, resolved once at load.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureSchema {
    names: Vec<String>,
    features: Vec<Feature>,
}

impl FeatureSchema {
    pub fn resolve(names: Vec<String>) -> Result<Self, LoadError> {
        let mut seen = HashSet::with_capacity(names.len());
        let mut features = Vec::with_capacity(names.len());
        for name in &names {
            let feature = Feature::resolve(name)?;
            // "bed" and "bedrooms" would both feed the same column
            if !seen.insert(feature.clone()) {
                return Err(LoadError::DuplicateFeature(name.clone()));
            }
            features.push(feature);
        }
        Ok(Self { names, features })
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn city_keys(&self) -> impl Iterator<Item = &str> {
        self.features.iter().filter_map(|f| match f {
            Feature::CityOneHot(key) => Some(key.as_str()),
            Feature::Numeric(_) => None,
        })
    }
}

/// Linear model produced offline: `intercept + sum(coef_i * x_i)`.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainedArtifact {
    schema: FeatureSchema,
    coefficients: Vec<f64>,
    intercept: f64,
}

impl TrainedArtifact {
    pub fn new(
        feature_names: Vec<String>,
        coefficients: Vec<f64>,
        intercept: f64,
    ) -> Result<Self, LoadError> {
        if feature_names.len() != coefficients.len() {
            return Err(LoadError::SchemaMismatch {
                features: feature_names.len(),
                coefficients: coefficients.len(),
            });
        }
        let schema = FeatureSchema::resolve(feature_names)?;
        Ok(Self {
            schema,
            coefficients,
            intercept,
        })
    }

    pub fn load(path: &Path) -> Result<Self, LoadError> {
        let txt = fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let raw: ArtifactJson = serde_json::from_str(&txt).map_err(|e| LoadError::Artifact {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Self::new(raw.feature_names, raw.coefficients, raw.intercept)
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    pub fn intercept(&self) -> f64 {
        self.intercept
    }
}
