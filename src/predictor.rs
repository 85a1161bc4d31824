use std::sync::Arc;

use crate::encoder;
use crate::error::LoadError;
use crate::model::TrainedArtifact;
use crate::stats::{self, CityIndex, CityLookup, GlobalStats};
use crate::types::{Factors, HouseRecord, PredictionRequest, PredictionResult};

pub const MIN_PRICE: f64 = 100_000.0;
pub const MAX_PRICE: f64 = 3_000_000.0;

/// Confidence reported whenever a trained artifact produced the estimate.
pub const MODEL_CONFIDENCE: f64 = 0.9;

const HEURISTIC_CONFIDENCE_FLOOR: f64 = 0.60;
const HEURISTIC_CONFIDENCE_CAP: f64 = 0.85;
const BED_WEIGHT: f64 = 0.1;
const BATH_WEIGHT: f64 = 0.05;

/// Raw output of either variant before bounding and classification.
struct Estimate {
    price: f64,
    confidence: f64,
    factors: Factors,
}

// ---------- Model variant ----------

#[derive(Debug, Clone)]
pub struct LinearModel {
    artifact: TrainedArtifact,
}

impl LinearModel {
    pub fn new(artifact: TrainedArtifact) -> Self {
        Self { artifact }
    }

    pub fn artifact(&self) -> &TrainedArtifact {
        &self.artifact
    }

    /// `intercept + sum(coef_i * x_i)`; `x` must already be in schema order.
    pub fn score(&self, x: &[f64]) -> f64 {
        self.artifact
            .coefficients()
            .iter()
            .zip(x)
            .fold(self.artifact.intercept(), |acc, (c, v)| acc + c * v)
    }

    fn estimate(&self, req: &PredictionRequest) -> Estimate {
        let schema = self.artifact.schema();
        let x = encoder::encode(req, schema);

        let mut factors = Factors::new();
        factors.push("mode", "linear_model");
        factors.push("intercept", format!("{:.2}", self.artifact.intercept()));
        for ((name, c), v) in schema
            .names()
            .iter()
            .zip(self.artifact.coefficients())
            .zip(&x)
        {
            if *v != 0.0 {
                factors.push(
                    name.clone(),
                    format!("coefficient {:.2} x {} = {:.2}", c, v, c * v),
                );
            }
        }
        let city_encoding = if encoder::knows_city(schema, &req.city) {
            "known city"
        } else {
            "unknown city (all city columns zero)"
        };
        factors.push("city_encoding", city_encoding);

        Estimate {
            price: self.score(&x),
            confidence: MODEL_CONFIDENCE,
            factors,
        }
    }
}

// ---------- Heuristic variant ----------

/// Sqft-driven baseline adjusted by city, bedroom and bathroom factors.
#[derive(Debug, Clone)]
pub struct HeuristicModel {
    avg_price: f64,
    avg_sqft: f64,
    avg_bed: f64,
    avg_bath: f64,
    sqft_correlation: Option<f64>,
    cities: Arc<CityIndex>,
}

impl HeuristicModel {
    pub fn new(records: &[HouseRecord], global: &GlobalStats, cities: Arc<CityIndex>) -> Self {
        let price: Vec<f64> = records.iter().map(|r| r.price).collect();
        let sqft: Vec<f64> = records.iter().map(|r| f64::from(r.sqft)).collect();
        Self {
            avg_price: global.avg_price,
            avg_sqft: global.avg_sqft,
            avg_bed: global.avg_bed,
            avg_bath: global.avg_bath,
            sqft_correlation: stats::pearson(&price, &sqft),
            cities,
        }
    }

    pub fn price_per_sqft(&self) -> f64 {
        self.avg_price / self.avg_sqft
    }

    pub fn city_factor(&self, city: &str) -> f64 {
        match self.cities.lookup(city) {
            CityLookup::Known(s) => s.avg_price / self.avg_price,
            CityLookup::Unknown => 1.0,
        }
    }

    fn estimate(&self, req: &PredictionRequest) -> Estimate {
        let per_sqft = self.price_per_sqft();
        let city_factor = self.city_factor(&req.city);
        let bed_factor = 1.0 + BED_WEIGHT * (f64::from(req.bedrooms) - self.avg_bed);
        let bath_factor = 1.0 + BATH_WEIGHT * (req.bathrooms - self.avg_bath);

        let price = per_sqft * f64::from(req.sqft) * city_factor * bed_factor * bath_factor;

        let mut factors = Factors::new();
        factors.push("mode", "heuristic");
        factors.push(
            "sqft_factor",
            match self.sqft_correlation {
                Some(r) => format!("Square footage is the strongest predictor (correlation: {:.2})", r),
                None => "Square footage drives the baseline estimate".to_string(),
            },
        );
        factors.push("city_factor", format!("City adjustment factor: {:.2}", city_factor));
        factors.push("bed_factor", format!("Bedroom adjustment: {:.2}", bed_factor));
        factors.push("bath_factor", format!("Bathroom adjustment: {:.2}", bath_factor));
        factors.push("base_price_per_sqft", format!("${:.2}", per_sqft));

        Estimate {
            price,
            confidence: (city_factor * 0.8)
                .clamp(HEURISTIC_CONFIDENCE_FLOOR, HEURISTIC_CONFIDENCE_CAP),
            factors,
        }
    }
}

// ---------- Predictor ----------

/// Chosen once per context; never changes variant afterwards.
#[derive(Debug, Clone)]
pub enum PricePredictor {
    Model(LinearModel),
    Heuristic(HeuristicModel),
}

impl PricePredictor {
    /// The artifact wins whenever it is present; the heuristic needs at
    /// least one record.
    pub fn select(
        artifact: Option<TrainedArtifact>,
        records: &[HouseRecord],
        global: &GlobalStats,
        cities: Arc<CityIndex>,
    ) -> Result<Self, LoadError> {
        if let Some(artifact) = artifact {
            return Ok(PricePredictor::Model(LinearModel::new(artifact)));
        }
        if records.is_empty() || global.avg_sqft <= 0.0 {
            return Err(LoadError::NoPredictionSource);
        }
        Ok(PricePredictor::Heuristic(HeuristicModel::new(records, global, cities)))
    }

    pub fn mode(&self) -> &'static str {
        match self {
            PricePredictor::Model(_) => "linear_model",
            PricePredictor::Heuristic(_) => "heuristic",
        }
    }

    /// Summary of the vector the model scores for `req`. The heuristic
    /// works on raw fields and has none.
    pub fn describe_input(&self, req: &PredictionRequest) -> Option<String> {
        match self {
            PricePredictor::Model(m) => {
                let schema = m.artifact.schema();
                Some(encoder::describe(&encoder::encode(req, schema), schema))
            }
            PricePredictor::Heuristic(_) => None,
        }
    }

    pub fn predict(&self, req: &PredictionRequest) -> PredictionResult {
        let Estimate {
            price,
            confidence,
            mut factors,
        } = match self {
            PricePredictor::Model(m) => m.estimate(req),
            PricePredictor::Heuristic(h) => h.estimate(req),
        };

        let price = if price.is_finite() {
            price
        } else {
            tracing::warn!(
                "non-finite {} output for sqft={} bed={} bath={} city={:?}; substituting 0.0",
                self.mode(),
                req.sqft,
                req.bedrooms,
                req.bathrooms,
                req.city
            );
            factors.push("numeric_guard", "non-finite output replaced with 0.00");
            0.0
        };

        let predicted_price = price.clamp(MIN_PRICE, MAX_PRICE);
        PredictionResult {
            predicted_price,
            price_range: stats::classify(predicted_price),
            confidence,
            factors,
        }
    }
}
