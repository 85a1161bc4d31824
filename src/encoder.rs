use crate::model::{Feature, FeatureSchema, NumericField};
use crate::types::PredictionRequest;

/// Maps a request onto the artifact's input layout. Position `i` of the
/// output always carries `schema.names()[i]`.
///
/// A city matching none of the one-hot keys leaves every city column at 0.0;
/// that is the representation of an unseen category, not an error.
pub fn encode(req: &PredictionRequest, schema: &FeatureSchema) -> Vec<f64> {
    let mut v = Vec::with_capacity(schema.len());
    for feature in schema.features() {
        v.push(match feature {
            Feature::Numeric(NumericField::Sqft) => f64::from(req.sqft),
            Feature::Numeric(NumericField::Bedrooms) => f64::from(req.bedrooms),
            Feature::Numeric(NumericField::Bathrooms) => req.bathrooms,
            Feature::CityOneHot(key) => {
                if *key == req.city {
                    1.0
                } else {
                    0.0
                }
            }
        });
    }
    v
}

/// Whether `city` has its own one-hot column in `schema`.
pub fn knows_city(schema: &FeatureSchema, city: &str) -> bool {
    schema.city_keys().any(|k| k == city)
}

/// One-line summary of an encoded vector, for request logging.
pub fn describe(vector: &[f64], schema: &FeatureSchema) -> String {
    let nz = vector.iter().filter(|x| **x != 0.0).count();
    let sample: Vec<String> = schema
        .names()
        .iter()
        .zip(vector)
        .take(6)
        .map(|(name, x)| format!("{}={:.3}", name, x))
        .collect();
    format!(
        "in_dim={} nonzero={} sample=[{}]",
        vector.len(),
        nz,
        sample.join(", ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema(names: &[&str]) -> FeatureSchema {
        FeatureSchema::resolve(names.iter().map(|s| s.to_string()).collect()).unwrap()
    }

    fn req(city: &str) -> PredictionRequest {
        PredictionRequest {
            sqft: 1500,
            bedrooms: 3,
            bathrooms: 2.5,
            city: city.to_string(),
        }
    }

    #[test]
    fn values_follow_schema_order() {
        let s = schema(&["citi_B", "bath", "sqft", "citi_A", "bed"]);
        assert_eq!(encode(&req("A"), &s), vec![0.0, 2.5, 1500.0, 1.0, 3.0]);

        let reordered = schema(&["bed", "citi_A", "sqft", "bath", "citi_B"]);
        assert_eq!(encode(&req("A"), &reordered), vec![3.0, 1.0, 1500.0, 2.5, 0.0]);
    }

    #[test]
    fn unknown_city_is_all_zero() {
        let s = schema(&["sqft", "citi_Irvine, CA", "citi_Brawley, CA"]);
        assert_eq!(encode(&req("Nowhere"), &s), vec![1500.0, 0.0, 0.0]);
        assert!(!knows_city(&s, "Nowhere"));
        assert!(knows_city(&s, "Irvine, CA"));
    }

    #[test]
    fn city_match_is_exact() {
        let s = schema(&["citi_Irvine, CA"]);
        assert_eq!(encode(&req("irvine, ca"), &s), vec![0.0]);
        assert_eq!(encode(&req("Irvine"), &s), vec![0.0]);
        assert_eq!(encode(&req("Irvine, CA"), &s), vec![1.0]);
    }

    #[test]
    fn empty_schema_encodes_empty_vector() {
        assert!(encode(&req("A"), &schema(&[])).is_empty());
    }

    #[test]
    fn describe_reports_nonzero_count() {
        let s = schema(&["sqft", "citi_A", "citi_B"]);
        let line = describe(&encode(&req("A"), &s), &s);
        assert_eq!(
            line,
            "in_dim=3 nonzero=2 sample=[sqft=1500.000, citi_A=1.000, citi_B=0.000]"
        );
    }
}
