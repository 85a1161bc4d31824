use serde::{Deserialize, Serialize, Serializer};

use crate::error::ValidationError;

/// One row of the historical dataset. Columns other than these are ignored.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct HouseRecord {
    pub price: f64,
    pub sqft: u32,
    #[serde(rename = "bed")]
    pub bedrooms: u32,
    #[serde(rename = "bath")]
    pub bathrooms: f64,
    #[serde(rename = "citi", alias = "city")]
    pub city: String,
}

// ---------- Requests ----------

/// Wire shape of `POST /predict`. Signed/unbounded on purpose so that
/// out-of-range numbers surface as validation errors, not parse errors.
#[derive(Debug, Clone, Deserialize)]
pub struct PredictBody {
    pub sqft: i64,
    pub bed: i64,
    pub bath: f64,
    pub city: String,
}

impl PredictBody {
    pub fn validate(self) -> Result<PredictionRequest, ValidationError> {
        let sqft = positive_count("sqft", self.sqft)?;
        let bedrooms = positive_count("bed", self.bed)?;
        if !self.bath.is_finite() {
            return Err(ValidationError::NotFinite { field: "bath" });
        }
        if self.bath <= 0.0 {
            return Err(ValidationError::NonPositive { field: "bath" });
        }
        Ok(PredictionRequest {
            sqft,
            bedrooms,
            bathrooms: self.bath,
            city: self.city,
        })
    }
}

fn positive_count(field: &'static str, value: i64) -> Result<u32, ValidationError> {
    if value <= 0 {
        return Err(ValidationError::NonPositive { field });
    }
    u32::try_from(value).map_err(|_| ValidationError::Malformed {
        field,
        reason: format!("{} is out of range", value),
    })
}

/// A request that passed boundary validation.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionRequest {
    pub sqft: u32,
    pub bedrooms: u32,
    pub bathrooms: f64,
    pub city: String,
}

// ---------- Results ----------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PriceRange {
    Low,
    Mid,
    High,
}

/// Ordered key -> description pairs explaining a prediction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Factors(Vec<(String, String)>);

impl Factors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, key: impl Into<String>, description: impl Into<String>) {
        self.0.push((key.into(), description.into()));
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for Factors {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.0.iter().map(|(k, v)| (k, v)))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionResult {
    pub predicted_price: f64,
    pub price_range: PriceRange,
    pub confidence: f64,
    pub factors: Factors,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(sqft: i64, bed: i64, bath: f64) -> PredictBody {
        PredictBody {
            sqft,
            bed,
            bath,
            city: "Irvine, CA".into(),
        }
    }

    #[test]
    fn valid_body_passes() {
        let req = body(1500, 3, 2.5).validate().unwrap();
        assert_eq!(req.sqft, 1500);
        assert_eq!(req.bedrooms, 3);
        assert_eq!(req.bathrooms, 2.5);
        assert_eq!(req.city, "Irvine, CA");
    }

    #[test]
    fn non_positive_fields_rejected() {
        assert_eq!(
            body(0, 3, 2.0).validate(),
            Err(ValidationError::NonPositive { field: "sqft" })
        );
        assert_eq!(
            body(1200, -1, 2.0).validate(),
            Err(ValidationError::NonPositive { field: "bed" })
        );
        assert_eq!(
            body(1200, 2, 0.0).validate(),
            Err(ValidationError::NonPositive { field: "bath" })
        );
        assert_eq!(
            body(1200, 2, f64::NAN).validate(),
            Err(ValidationError::NotFinite { field: "bath" })
        );
    }

    #[test]
    fn oversized_count_is_malformed() {
        let err = body(i64::from(u32::MAX) + 1, 3, 2.0).validate().unwrap_err();
        assert!(matches!(err, ValidationError::Malformed { field: "sqft", .. }));
    }

    #[test]
    fn factors_serialize_in_insertion_order() {
        let mut f = Factors::new();
        f.push("mode", "heuristic");
        f.push("city_factor", "City adjustment factor: 1.00");
        f.push("bed_factor", "Bedroom adjustment: 1.00");
        let json = serde_json::to_string(&f).unwrap();
        assert_eq!(
            json,
            r#"{"mode":"heuristic","city_factor":"City adjustment factor: 1.00","bed_factor":"Bedroom adjustment: 1.00"}"#
        );
        assert_eq!(f.get("mode"), Some("heuristic"));
        assert_eq!(f.get("missing"), None);
    }

    #[test]
    fn price_range_serializes_as_label() {
        assert_eq!(serde_json::to_string(&PriceRange::Mid).unwrap(), "\"Mid\"");
    }
}
