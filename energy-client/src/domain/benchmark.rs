use super::Metrics;

/// A benchmarking submission as read from the source file: one building,
/// one reporting year. Identity fields may be absent; they are filled in
/// during normalization. `Census Tract` is not kept, it is rebuilt from the
/// community board.
#[derive(Debug, Clone, PartialEq)]
pub struct BenchmarkRecord {
    pub year_ending: i32,
    pub property_id: Option<f64>,
    pub property_name: Option<String>,
    pub bbl: Option<f64>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub postcode: Option<String>,
    pub property_type: Option<String>,
    pub borough: Option<String>,
    pub council_district: Option<f64>,
    pub is_lowrise: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub year_built: Option<f64>,
    pub community_board: Option<f64>,
    pub nta: Option<String>,
    pub metrics: Metrics,
}
