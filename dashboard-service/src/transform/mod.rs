use crate::pipeline::{Envelope, PipelineError, Transform};
use energy_client::domain::{BenchmarkRecord, Building, Period, Record};

/// Missing text attributes become this sentinel so every grouping key is defined.
pub const MISSING_TEXT: &str = "0";

/// Pure validation of a `BenchmarkRecord`.
///
/// Rules:
/// - `Year Ending` must be one of the concrete reporting years.
/// - latitude, when present, must be within [-90, 90].
/// - longitude, when present, must be within [-180, 180].
pub fn validate_benchmark(
    env: Envelope<BenchmarkRecord>,
) -> Result<Envelope<BenchmarkRecord>, PipelineError> {
    let b = &env.payload;

    if !Period::Year(b.year_ending).is_concrete() {
        return Err(PipelineError::Transform(format!(
            "Year Ending {} is outside the reporting years",
            b.year_ending
        )));
    }

    if let Some(lat) = b.latitude {
        if !(-90.0..=90.0).contains(&lat) {
            return Err(PipelineError::Transform(format!("latitude {lat} out of range")));
        }
    }

    if let Some(lon) = b.longitude {
        if !(-180.0..=180.0).contains(&lon) {
            return Err(PipelineError::Transform(format!("longitude {lon} out of range")));
        }
    }

    Ok(env)
}

#[derive(Clone, Default)]
pub struct BenchmarkValidation;

#[async_trait::async_trait]
impl Transform<BenchmarkRecord, BenchmarkRecord> for BenchmarkValidation {
    async fn apply(
        &self,
        input: Envelope<BenchmarkRecord>,
    ) -> Result<Envelope<BenchmarkRecord>, PipelineError> {
        match validate_benchmark(input) {
            Ok(env) => Ok(env),
            Err(e) => {
                metrics::counter!("dataset_records_rejected_total").increment(1);
                Err(e)
            }
        }
    }
}

fn whole(v: Option<f64>) -> i64 {
    v.map(|n| n as i64).unwrap_or(0)
}

fn text(v: Option<String>) -> String {
    v.unwrap_or_else(|| MISSING_TEXT.to_string())
}

/// Community board code: rounded half-to-even, printed as an integer.
pub fn community_board_code(board: Option<f64>) -> String {
    match board {
        Some(v) => format!("{}", v.round_ties_even() as i64),
        None => MISSING_TEXT.to_string(),
    }
}

/// Fill every missing key field with its sentinel and turn the raw row
/// into a concrete-year `Record`. Metrics pass through untouched; an
/// unreported ENERGY STAR Score is defaulted once the rollups exist.
///
/// `Census Tract` carries the community board code, not its own source
/// column.
pub fn normalize(raw: BenchmarkRecord) -> Record {
    let community_board = community_board_code(raw.community_board);

    Record {
        building: Building {
            property_id: whole(raw.property_id),
            property_name: text(raw.property_name),
            bbl: whole(raw.bbl),
            address: text(raw.address),
            city: text(raw.city),
            postcode: text(raw.postcode),
            property_type: text(raw.property_type),
            borough: text(raw.borough),
            council_district: whole(raw.council_district),
            census_tract: community_board.clone(),
            is_lowrise: text(raw.is_lowrise),
            latitude: raw.latitude.unwrap_or(0.0),
            longitude: raw.longitude.unwrap_or(0.0),
            year_built: whole(raw.year_built),
            community_board,
            nta: text(raw.nta),
        },
        period: Period::Year(raw.year_ending),
        metrics: raw.metrics,
    }
}
