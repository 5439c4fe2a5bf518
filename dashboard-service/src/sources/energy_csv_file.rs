use std::{collections::HashMap, fs::File, path::PathBuf};

use csv::StringRecord;
use energy_client::domain::{Attribute, BenchmarkRecord, Metric, Metrics, YEAR_ENDING};
use futures::Stream;

use crate::pipeline::{Envelope, PipelineError, Source};

/// CSV source for `BenchmarkRecord`.
///
/// Columns are located by header name; all identity columns, `Year Ending`,
/// every metric column and `ENERGY STAR Score` must be present. Empty cells
/// are treated as missing values.
pub struct EnergyCsvFileSource {
    path: PathBuf,
}

impl EnergyCsvFileSource {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }
}

/// Every header the loader needs.
pub fn required_columns() -> impl Iterator<Item = &'static str> {
    Attribute::ALL
        .into_iter()
        .map(|a| a.column())
        .chain(std::iter::once(YEAR_ENDING))
        .chain(Metric::ALL.into_iter().map(|m| m.column()))
}

/// Header name to field position, checked against [`required_columns`].
struct HeaderIndex {
    positions: HashMap<&'static str, usize>,
}

impl HeaderIndex {
    fn new(headers: &StringRecord) -> Result<Self, PipelineError> {
        let names: Vec<&str> = headers
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').trim())
            .collect();
        let mut positions = HashMap::new();
        let mut missing = Vec::new();
        for column in required_columns() {
            match names.iter().position(|h| *h == column) {
                Some(idx) => {
                    positions.insert(column, idx);
                }
                None => missing.push(column),
            }
        }
        if !missing.is_empty() {
            return Err(PipelineError::Source(format!(
                "missing required column(s): {}",
                missing.join(", ")
            )));
        }
        Ok(Self { positions })
    }

    fn get<'r>(&self, record: &'r StringRecord, column: &'static str) -> &'r str {
        self.positions
            .get(column)
            .and_then(|idx| record.get(*idx))
            .unwrap_or("")
    }
}

fn parse_optional_f64(column: &str, s: &str, line: u64) -> Result<Option<f64>, PipelineError> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    trimmed
        .parse::<f64>()
        .map(|v| if v.is_nan() { None } else { Some(v) })
        .map_err(|e| {
            PipelineError::Source(format!("line {line}: invalid {column} '{trimmed}': {e}"))
        })
}

fn parse_optional_string(s: &str) -> Option<String> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn record_to_benchmark(
    record: &StringRecord,
    headers: &HeaderIndex,
    line: u64,
) -> Result<BenchmarkRecord, PipelineError> {
    let number =
        |a: Attribute| parse_optional_f64(a.column(), headers.get(record, a.column()), line);
    let text = |a: Attribute| parse_optional_string(headers.get(record, a.column()));

    let year = parse_optional_f64(YEAR_ENDING, headers.get(record, YEAR_ENDING), line)?
        .ok_or_else(|| PipelineError::Source(format!("line {line}: missing {YEAR_ENDING}")))?;
    if year.fract() != 0.0 {
        return Err(PipelineError::Source(format!("line {line}: invalid {YEAR_ENDING} '{year}'")));
    }

    let mut metrics = Metrics::missing();
    for m in Metric::ALL {
        if let Some(v) = parse_optional_f64(m.column(), headers.get(record, m.column()), line)? {
            metrics[m] = v;
        }
    }

    Ok(BenchmarkRecord {
        year_ending: year as i32,
        property_id: number(Attribute::PropertyId)?,
        property_name: text(Attribute::PropertyName),
        bbl: number(Attribute::Bbl)?,
        address: text(Attribute::Address),
        city: text(Attribute::City),
        postcode: text(Attribute::Postcode),
        property_type: text(Attribute::PropertyType),
        borough: text(Attribute::Borough),
        council_district: number(Attribute::CouncilDistrict)?,
        is_lowrise: text(Attribute::IsLowrise),
        latitude: number(Attribute::Latitude)?,
        longitude: number(Attribute::Longitude)?,
        year_built: number(Attribute::YearBuilt)?,
        community_board: number(Attribute::CommunityBoard)?,
        nta: text(Attribute::Nta),
        metrics,
    })
}

#[async_trait::async_trait]
impl Source<BenchmarkRecord> for EnergyCsvFileSource {
    async fn stream(
        &self,
    ) -> std::pin::Pin<
        Box<dyn Stream<Item = Result<Envelope<BenchmarkRecord>, PipelineError>> + Send>,
    > {
        let path = self.path.clone();
        let s = async_stream::try_stream! {
            let file = File::open(&path).map_err(|e| {
                PipelineError::Source(format!("failed to open dataset '{}': {e}", path.display()))
            })?;
            let mut rdr = csv::Reader::from_reader(file);
            let headers = rdr
                .headers()
                .map_err(|e| PipelineError::Source(format!("failed to read CSV headers: {e}")))?
                .clone();
            let index = HeaderIndex::new(&headers)?;

            for result in rdr.records() {
                let record = result.map_err(|e| PipelineError::Source(format!(
                    "failed to read CSV record: {e}"
                )))?;
                let line = record.position().map(|p| p.line()).unwrap_or(0);

                let benchmark = record_to_benchmark(&record, &index, line).map_err(|e| {
                    metrics::counter!("dataset_records_rejected_total").increment(1);
                    e
                })?;

                yield Envelope::new(benchmark);
            }
        };

        Box::pin(s)
    }
}
