use parking_lot::RwLock;
use serde::Serialize;
use std::sync::Arc;

use crate::config::ServiceConfig;
use crate::dataset::{DatasetStore, LoadStatus};
use crate::error::ApiError;
use crate::image::{self, ImageStatus};
use crate::model::TrainedArtifact;
use crate::predictor::PricePredictor;
use crate::stats::{self, CityIndex, CityStats, GlobalStats, VisualizationData};
use crate::types::{PredictionRequest, PredictionResult, PriceRange};

const COMBINED_NOTE: &str = "Data-based prediction with image analysis available on frontend";

// ---------- Context ----------

/// Everything a request may read, built once and never mutated. A reload
/// builds a fresh one.
#[derive(Debug)]
pub struct ServiceContext {
    dataset: DatasetStore,
    global: GlobalStats,
    cities: Arc<CityIndex>,
    predictor: Result<PricePredictor, String>,
    log_predictions: bool,
    image_model_url: String,
}

impl ServiceContext {
    /// Blocking: reads the dataset and (optionally) the artifact from disk.
    pub fn build(cfg: &ServiceConfig) -> Self {
        let dataset = DatasetStore::open(&cfg.data_path);
        let artifact = cfg.model_path.as_deref().and_then(|path| {
            match TrainedArtifact::load(path) {
                Ok(art) => {
                    tracing::info!(
                        "loaded model artifact {}; feature_names[{}]: {:?}",
                        path.display(),
                        art.schema().len(),
                        art.schema().names()
                    );
                    Some(art)
                }
                Err(e) => {
                    tracing::error!("model artifact unavailable, falling back to heuristic: {}", e);
                    None
                }
            }
        });
        Self::from_parts(dataset, artifact, cfg)
    }

    pub fn from_parts(
        dataset: DatasetStore,
        artifact: Option<TrainedArtifact>,
        cfg: &ServiceConfig,
    ) -> Self {
        let global = stats::compute_global(dataset.records());
        let cities = Arc::new(CityIndex::build(dataset.records()));
        let predictor =
            PricePredictor::select(artifact, dataset.records(), &global, Arc::clone(&cities))
                .map_err(|e| e.to_string());
        match &predictor {
            Ok(p) => tracing::info!("price predictor ready; mode={}", p.mode()),
            Err(e) => tracing::error!("price predictor unavailable: {}", e),
        }
        Self {
            dataset,
            global,
            cities,
            predictor,
            log_predictions: cfg.log_predictions,
            image_model_url: cfg.image_model_url.clone(),
        }
    }

    pub fn dataset(&self) -> &DatasetStore {
        &self.dataset
    }

    pub fn mode(&self) -> Option<&'static str> {
        self.predictor.as_ref().ok().map(PricePredictor::mode)
    }

    fn require_data(&self, what: &str) -> Result<(), ApiError> {
        match self.dataset.status() {
            LoadStatus::Loaded => Ok(()),
            LoadStatus::Failed(_) => Err(ApiError::Unavailable(format!("{} not available", what))),
        }
    }

    pub fn global_stats(&self) -> Result<&GlobalStats, ApiError> {
        self.require_data("House statistics")?;
        Ok(&self.global)
    }

    pub fn ranked_cities(&self) -> Result<Vec<CityStats>, ApiError> {
        self.require_data("City statistics")?;
        Ok(self.cities.ranked())
    }

    pub fn visualization(&self) -> Result<VisualizationData, ApiError> {
        if !self.dataset.is_loaded() || self.dataset.is_empty() {
            return Err(ApiError::Unavailable("House data not loaded".to_string()));
        }
        Ok(stats::visualization(self.dataset.records()))
    }

    pub fn predict(&self, req: &PredictionRequest) -> Result<PredictionResult, ApiError> {
        let predictor = self
            .predictor
            .as_ref()
            .map_err(|e| ApiError::Unavailable(format!("Prediction unavailable: {}", e)))?;
        let out = predictor.predict(req);
        if self.log_predictions {
            if let Some(input) = predictor.describe_input(req) {
                tracing::info!("encoded request: {}", input);
            }
            tracing::info!(
                "predict sqft={} bed={} bath={} city={:?} -> price={:.2} range={:?} confidence={:.2} mode={}",
                req.sqft,
                req.bedrooms,
                req.bathrooms,
                req.city,
                out.predicted_price,
                out.price_range,
                out.confidence,
                predictor.mode()
            );
        }
        Ok(out)
    }

    pub fn image_status(&self, bytes: &[u8], content_type: Option<&str>) -> ImageStatus {
        let status = image::pass_through(bytes, content_type, &self.image_model_url);
        if let ImageStatus::Error { message } = &status {
            tracing::warn!("{}", message);
        }
        status
    }

    /// Numeric prediction is returned unchanged next to the image status.
    pub fn predict_with_image(
        &self,
        req: &PredictionRequest,
        bytes: &[u8],
        content_type: Option<&str>,
    ) -> Result<CombinedResponse, ApiError> {
        let data_prediction = self.predict(req)?;
        let image_prediction = self.image_status(bytes, content_type);
        let combined_prediction = CombinedPrediction {
            predicted_price: data_prediction.predicted_price,
            price_range: data_prediction.price_range,
            confidence: data_prediction.confidence,
            note: COMBINED_NOTE.to_string(),
        };
        Ok(CombinedResponse {
            data_prediction,
            image_prediction,
            combined_prediction,
        })
    }

    pub fn summary(&self) -> ContextSummary {
        ContextSummary {
            dataset_loaded: self.dataset.is_loaded(),
            records: self.dataset.len(),
            cities: self.cities.len(),
            mode: self.mode(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CombinedPrediction {
    pub predicted_price: f64,
    pub price_range: PriceRange,
    pub confidence: f64,
    pub note: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CombinedResponse {
    pub data_prediction: PredictionResult,
    pub image_prediction: ImageStatus,
    pub combined_prediction: CombinedPrediction,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContextSummary {
    pub dataset_loaded: bool,
    pub records: usize,
    pub cities: usize,
    pub mode: Option<&'static str>,
}

// ---------- Server state ----------

#[derive(Clone)]
pub struct AppState {
    ctx: Arc<RwLock<Arc<ServiceContext>>>,
    config: Arc<ServiceConfig>,
}

impl AppState {
    pub fn new(ctx: ServiceContext, config: ServiceConfig) -> Self {
        Self {
            ctx: Arc::new(RwLock::new(Arc::new(ctx))),
            config: Arc::new(config),
        }
    }

    /// The context a request works against; unaffected by later swaps.
    pub fn snapshot(&self) -> Arc<ServiceContext> {
        self.ctx.read().clone()
    }

    pub fn replace(&self, ctx: ServiceContext) {
        *self.ctx.write() = Arc::new(ctx);
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Rebuilds the context from the configured sources off the async
    /// runtime, then swaps it in.
    pub async fn reload(&self) -> Result<ContextSummary, ApiError> {
        let cfg = Arc::clone(&self.config);
        let ctx = tokio::task::spawn_blocking(move || ServiceContext::build(&cfg))
            .await
            .map_err(|e| ApiError::Internal(format!("reload failed: {}", e)))?;
        let summary = ctx.summary();
        self.replace(ctx);
        tracing::info!(
            "context reloaded; records={} cities={} mode={:?}",
            summary.records,
            summary.cities,
            summary.mode
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::HouseRecord;

    fn records() -> Vec<HouseRecord> {
        vec![
            HouseRecord {
                price: 200_000.0,
                sqft: 1000,
                bedrooms: 3,
                bathrooms: 2.0,
                city: "X".into(),
            },
            HouseRecord {
                price: 600_000.0,
                sqft: 3000,
                bedrooms: 3,
                bathrooms: 2.0,
                city: "Y".into(),
            },
        ]
    }

    fn req(city: &str) -> PredictionRequest {
        PredictionRequest {
            sqft: 1500,
            bedrooms: 3,
            bathrooms: 2.0,
            city: city.into(),
        }
    }

    #[test]
    fn failed_dataset_degrades_stats_but_not_model_prediction() {
        let art = TrainedArtifact::new(vec!["sqft".into()], vec![300.0], 0.0).unwrap();
        let ctx = ServiceContext::from_parts(
            DatasetStore::failed("missing"),
            Some(art),
            &ServiceConfig::default(),
        );

        assert!(matches!(ctx.global_stats(), Err(ApiError::Unavailable(_))));
        assert!(matches!(ctx.ranked_cities(), Err(ApiError::Unavailable(_))));
        assert!(ctx.visualization().is_err());
        assert_eq!(ctx.predict(&req("X")).unwrap().predicted_price, 450_000.0);
    }

    #[test]
    fn no_sources_means_prediction_unavailable() {
        let ctx = ServiceContext::from_parts(
            DatasetStore::failed("missing"),
            None,
            &ServiceConfig::default(),
        );
        assert_eq!(ctx.mode(), None);
        assert!(matches!(ctx.predict(&req("X")), Err(ApiError::Unavailable(_))));
    }

    #[test]
    fn empty_dataset_serves_zero_stats() {
        let ctx = ServiceContext::from_parts(
            DatasetStore::from_records(Vec::new()),
            None,
            &ServiceConfig::default(),
        );
        let g = ctx.global_stats().unwrap();
        assert_eq!(g.total_houses, 0);
        assert!(ctx.ranked_cities().unwrap().is_empty());
    }

    #[test]
    fn combined_prediction_repeats_numeric_result() {
        let ctx = ServiceContext::from_parts(
            DatasetStore::from_records(records()),
            None,
            &ServiceConfig::default(),
        );
        let out = ctx.predict_with_image(&req("X"), b"jpegbytes", Some("image/jpeg")).unwrap();
        assert_eq!(out.combined_prediction.predicted_price, out.data_prediction.predicted_price);
        assert_eq!(out.combined_prediction.price_range, out.data_prediction.price_range);
        assert_eq!(out.combined_prediction.confidence, out.data_prediction.confidence);
        assert!(out.image_prediction.is_ready());
        assert_eq!(out.data_prediction, ctx.predict(&req("X")).unwrap());
    }

    #[test]
    fn logged_predictions_match_unlogged_ones() {
        let logged = ServiceConfig {
            log_predictions: true,
            ..ServiceConfig::default()
        };
        let art = || TrainedArtifact::new(vec!["sqft".into()], vec![300.0], 0.0).unwrap();
        let quiet = ServiceContext::from_parts(
            DatasetStore::from_records(records()),
            Some(art()),
            &ServiceConfig::default(),
        );
        let chatty = ServiceContext::from_parts(
            DatasetStore::from_records(records()),
            Some(art()),
            &logged,
        );
        assert_eq!(chatty.predict(&req("X")).unwrap(), quiet.predict(&req("X")).unwrap());
    }

    #[test]
    fn snapshot_survives_replace() {
        let cfg = ServiceConfig::default();
        let state = AppState::new(
            ServiceContext::from_parts(DatasetStore::from_records(records()), None, &cfg),
            cfg.clone(),
        );
        let before = state.snapshot();
        state.replace(ServiceContext::from_parts(DatasetStore::failed("gone"), None, &cfg));

        assert_eq!(before.summary().records, 2);
        assert_eq!(before.mode(), Some("heuristic"));
        assert_eq!(state.snapshot().summary().records, 0);
        assert!(!state.snapshot().summary().dataset_loaded);
    }
}
