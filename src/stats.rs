use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

use crate::types::{HouseRecord, PriceRange};

// Bucket edges are part of the public contract; clients match on them.
pub const LOW_MIN: u64 = 196_000;
pub const LOW_MAX: u64 = 796_666;
pub const MID_MIN: u64 = 796_667;
pub const MID_MAX: u64 = 1_398_333;
pub const HIGH_MIN: u64 = 1_398_334;
pub const HIGH_MAX: u64 = 2_000_000;

pub fn classify(price: f64) -> PriceRange {
    if price <= LOW_MAX as f64 {
        PriceRange::Low
    } else if price <= MID_MAX as f64 {
        PriceRange::Mid
    } else {
        PriceRange::High
    }
}

// ---------- Global ----------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceBucket {
    pub min: u64,
    pub max: u64,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceRanges {
    pub low: PriceBucket,
    pub mid: PriceBucket,
    pub high: PriceBucket,
}

impl PriceRanges {
    fn empty() -> Self {
        Self {
            low: PriceBucket { min: LOW_MIN, max: LOW_MAX, count: 0 },
            mid: PriceBucket { min: MID_MIN, max: MID_MAX, count: 0 },
            high: PriceBucket { min: HIGH_MIN, max: HIGH_MAX, count: 0 },
        }
    }

    fn bucket_mut(&mut self, range: PriceRange) -> &mut PriceBucket {
        match range {
            PriceRange::Low => &mut self.low,
            PriceRange::Mid => &mut self.mid,
            PriceRange::High => &mut self.high,
        }
    }

    pub fn total(&self) -> usize {
        self.low.count + self.mid.count + self.high.count
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GlobalStats {
    pub total_houses: usize,
    pub avg_price: f64,
    pub avg_sqft: f64,
    pub avg_bed: f64,
    pub avg_bath: f64,
    pub price_ranges: PriceRanges,
    pub bed_distribution: BTreeMap<String, usize>,
    pub bath_distribution: BTreeMap<String, usize>,
}

/// Zero-valued when `records` is empty.
pub fn compute_global(records: &[HouseRecord]) -> GlobalStats {
    let mut price_ranges = PriceRanges::empty();
    let mut bed_distribution = BTreeMap::new();
    let mut bath_distribution = BTreeMap::new();

    for r in records {
        price_ranges.bucket_mut(classify(r.price)).count += 1;
        *bed_distribution.entry(r.bedrooms.to_string()).or_insert(0) += 1;
        *bath_distribution.entry(bath_key(r.bathrooms)).or_insert(0) += 1;
    }

    GlobalStats {
        total_houses: records.len(),
        avg_price: mean(records.iter().map(|r| r.price)),
        avg_sqft: mean(records.iter().map(|r| f64::from(r.sqft))),
        avg_bed: mean(records.iter().map(|r| f64::from(r.bedrooms))),
        avg_bath: mean(records.iter().map(|r| r.bathrooms)),
        price_ranges,
        bed_distribution,
        bath_distribution,
    }
}

fn bath_key(bath: f64) -> String {
    if bath.fract() == 0.0 {
        format!("{:.1}", bath)
    } else {
        bath.to_string()
    }
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if n == 0 {
        0.0
    } else {
        sum / n as f64
    }
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

// ---------- Per city ----------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CityStats {
    pub city: String,
    pub avg_price: f64,
    pub house_count: usize,
    pub min_price: f64,
    pub max_price: f64,
    pub avg_sqft: f64,
    pub avg_bed: f64,
    pub avg_bath: f64,
}

#[derive(Default)]
struct CityAccum {
    count: usize,
    price_sum: f64,
    min_price: f64,
    max_price: f64,
    sqft_sum: f64,
    bed_sum: f64,
    bath_sum: f64,
}

pub fn compute_by_city(records: &[HouseRecord]) -> HashMap<String, CityStats> {
    let mut acc: HashMap<&str, CityAccum> = HashMap::new();
    for r in records {
        let a = acc.entry(r.city.as_str()).or_default();
        if a.count == 0 {
            a.min_price = r.price;
            a.max_price = r.price;
        } else {
            a.min_price = a.min_price.min(r.price);
            a.max_price = a.max_price.max(r.price);
        }
        a.count += 1;
        a.price_sum += r.price;
        a.sqft_sum += f64::from(r.sqft);
        a.bed_sum += f64::from(r.bedrooms);
        a.bath_sum += r.bathrooms;
    }

    acc.into_iter()
        .map(|(city, a)| {
            let n = a.count as f64;
            let stats = CityStats {
                city: city.to_string(),
                avg_price: round2(a.price_sum / n),
                house_count: a.count,
                min_price: round2(a.min_price),
                max_price: round2(a.max_price),
                avg_sqft: round2(a.sqft_sum / n),
                avg_bed: round2(a.bed_sum / n),
                avg_bath: round2(a.bath_sum / n),
            };
            (city.to_string(), stats)
        })
        .collect()
}

/// Outcome of looking a city up in the observed data.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CityLookup<'a> {
    Known(&'a CityStats),
    Unknown,
}

/// Per-city stats keyed by exact city name.
#[derive(Debug, Clone, Default)]
pub struct CityIndex {
    by_city: HashMap<String, CityStats>,
}

impl CityIndex {
    pub fn build(records: &[HouseRecord]) -> Self {
        Self {
            by_city: compute_by_city(records),
        }
    }

    pub fn lookup(&self, city: &str) -> CityLookup<'_> {
        match self.by_city.get(city) {
            Some(s) => CityLookup::Known(s),
            None => CityLookup::Unknown,
        }
    }

    pub fn len(&self) -> usize {
        self.by_city.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_city.is_empty()
    }

    /// Descending mean price; ties broken by city name so the order is stable.
    pub fn ranked(&self) -> Vec<CityStats> {
        let mut out: Vec<CityStats> = self.by_city.values().cloned().collect();
        out.sort_by(|a, b| {
            b.avg_price
                .total_cmp(&a.avg_price)
                .then_with(|| a.city.cmp(&b.city))
        });
        out
    }
}

// ---------- Visualization ----------

/// Pearson correlation; `None` when undefined (fewer than two points or a
/// constant series).
pub fn pearson(xs: &[f64], ys: &[f64]) -> Option<f64> {
    let n = xs.len().min(ys.len());
    if n < 2 {
        return None;
    }
    let mx = xs[..n].iter().sum::<f64>() / n as f64;
    let my = ys[..n].iter().sum::<f64>() / n as f64;
    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for (x, y) in xs[..n].iter().zip(&ys[..n]) {
        let dx = x - mx;
        let dy = y - my;
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }
    if sxx == 0.0 || syy == 0.0 {
        return None;
    }
    let r = sxy / (sxx.sqrt() * syy.sqrt());
    r.is_finite().then_some(r)
}

#[derive(Debug, Clone, Serialize)]
pub struct Series {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HistogramData {
    pub price: Vec<f64>,
    pub sqft: Vec<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScatterData {
    pub sqft_vs_price: Series,
    pub bed_vs_price: Series,
    pub bath_vs_price: Series,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationMatrix {
    pub price_sqft: Option<f64>,
    pub price_bed: Option<f64>,
    pub price_bath: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct VisualizationData {
    pub histogram_data: HistogramData,
    pub scatter_data: ScatterData,
    pub correlation_matrix: CorrelationMatrix,
}

pub fn visualization(records: &[HouseRecord]) -> VisualizationData {
    let price: Vec<f64> = records.iter().map(|r| r.price).collect();
    let sqft: Vec<f64> = records.iter().map(|r| f64::from(r.sqft)).collect();
    let bed: Vec<f64> = records.iter().map(|r| f64::from(r.bedrooms)).collect();
    let bath: Vec<f64> = records.iter().map(|r| r.bathrooms).collect();

    let correlation_matrix = CorrelationMatrix {
        price_sqft: pearson(&price, &sqft),
        price_bed: pearson(&price, &bed),
        price_bath: pearson(&price, &bath),
    };

    VisualizationData {
        histogram_data: HistogramData {
            price: price.clone(),
            sqft: sqft.clone(),
        },
        scatter_data: ScatterData {
            sqft_vs_price: Series { x: sqft, y: price.clone() },
            bed_vs_price: Series { x: bed, y: price.clone() },
            bath_vs_price: Series { x: bath, y: price },
        },
        correlation_matrix,
    }
}
