use axum::{
    extract::{
        multipart::{Multipart, MultipartError, MultipartRejection},
        rejection::JsonRejection,
        DefaultBodyLimit, State,
    },
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::{collections::HashMap, fmt::Display, str::FromStr};

use crate::error::{ApiError, ValidationError};
use crate::image::ImageStatus;
use crate::service::{AppState, CombinedResponse, ContextSummary};
use crate::stats::{CityStats, GlobalStats, VisualizationData};
use crate::types::{PredictBody, PredictionResult};

const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/", get(root))
        .route("/stats", get(stats))
        .route("/cities", get(cities))
        .route("/predict", post(predict))
        .route("/predict-with-image", post(predict_with_image))
        .route("/image-predict", post(image_predict))
        .route("/visualization-data", get(visualization_data))
        .route("/reload", post(reload));

    // Nested "/" only answers "/api"; the trailing-slash form is registered here
    Router::new()
        .route("/api/", get(root))
        .nest("/api", api)
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(state)
}

// ---------- Handlers ----------

pub async fn root() -> Json<Value> {
    Json(json!({
        "message": "House Price Predictor API",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

pub async fn stats(State(state): State<AppState>) -> Result<Json<GlobalStats>, ApiError> {
    let ctx = state.snapshot();
    Ok(Json(ctx.global_stats()?.clone()))
}

pub async fn cities(State(state): State<AppState>) -> Result<Json<Vec<CityStats>>, ApiError> {
    Ok(Json(state.snapshot().ranked_cities()?))
}

pub async fn visualization_data(
    State(state): State<AppState>,
) -> Result<Json<VisualizationData>, ApiError> {
    Ok(Json(state.snapshot().visualization()?))
}

pub async fn predict(
    State(state): State<AppState>,
    payload: Result<Json<PredictBody>, JsonRejection>,
) -> Result<Json<PredictionResult>, ApiError> {
    let Json(body) = payload.map_err(|e| ValidationError::Body(e.body_text()))?;
    let req = body.validate()?;
    Ok(Json(state.snapshot().predict(&req)?))
}

pub async fn predict_with_image(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<CombinedResponse>, ApiError> {
    let multipart = multipart.map_err(|e| ValidationError::Body(e.body_text()))?;
    let form = read_form(multipart).await?;
    let req = form.predict_body()?.validate()?;
    let image = form
        .image
        .ok_or(ValidationError::Missing { field: "image" })?;

    let out = state
        .snapshot()
        .predict_with_image(&req, &image.bytes, image.content_type.as_deref())?;
    Ok(Json(out))
}

pub async fn image_predict(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<ImageStatus>, ApiError> {
    let multipart = multipart.map_err(|e| ValidationError::Body(e.body_text()))?;
    let image = read_form(multipart)
        .await?
        .image
        .ok_or(ValidationError::Missing { field: "image" })?;
    Ok(Json(
        state
            .snapshot()
            .image_status(&image.bytes, image.content_type.as_deref()),
    ))
}

pub async fn reload(State(state): State<AppState>) -> Result<Json<ContextSummary>, ApiError> {
    Ok(Json(state.reload().await?))
}

// ---------- Multipart form ----------

#[derive(Debug)]
pub struct ImageUpload {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

#[derive(Debug, Default)]
pub struct UploadForm {
    pub fields: HashMap<String, String>,
    pub image: Option<ImageUpload>,
}

fn form_error(e: MultipartError) -> ValidationError {
    ValidationError::Body(e.body_text())
}

pub async fn read_form(mut multipart: Multipart) -> Result<UploadForm, ValidationError> {
    let mut form = UploadForm::default();
    while let Some(field) = multipart.next_field().await.map_err(form_error)? {
        let name = field.name().unwrap_or_default().to_string();
        if name == "image" {
            let content_type = field.content_type().map(str::to_string);
            let bytes = field.bytes().await.map_err(form_error)?;
            tracing::info!("received image upload ({} bytes)", bytes.len());
            form.image = Some(ImageUpload {
                bytes: bytes.to_vec(),
                content_type,
            });
        } else {
            let text = field.text().await.map_err(form_error)?;
            form.fields.insert(name, text);
        }
    }
    Ok(form)
}

impl UploadForm {
    pub fn predict_body(&self) -> Result<PredictBody, ValidationError> {
        Ok(PredictBody {
            sqft: self.parse("sqft")?,
            bed: self.parse("bed")?,
            bath: self.parse("bath")?,
            city: self.text("city")?.to_string(),
        })
    }

    fn text(&self, field: &'static str) -> Result<&str, ValidationError> {
        self.fields
            .get(field)
            .map(String::as_str)
            .ok_or(ValidationError::Missing { field })
    }

    fn parse<T>(&self, field: &'static str) -> Result<T, ValidationError>
    where
        T: FromStr,
        T::Err: Display,
    {
        self.text(field)?
            .trim()
            .parse()
            .map_err(|e: T::Err| ValidationError::Malformed {
                field,
                reason: e.to_string(),
            })
    }
}
