use crate::core::climate::historical::HistoricalSeries;
use anyhow::{anyhow, bail};
use csv::ReaderBuilder as CsvReaderBuilder;
use std::io::Read;

/// Read a historical climate ensemble from CSV: a header row of series labels (e.g. years),
/// then one row per hour with one ambient temperature (ºC) per series.
pub fn ensemble_from_csv(file: impl Read) -> anyhow::Result<Vec<HistoricalSeries>> {
    let mut reader = CsvReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(file);

    let mut ensemble = reader
        .headers()?
        .iter()
        .map(|label| HistoricalSeries {
            label: label.to_string(),
            temperatures: vec![],
        })
        .collect::<Vec<_>>();
    if ensemble.is_empty() {
        bail!("Historical climate file has no series columns");
    }

    for (row, record) in reader.records().enumerate() {
        let record = record?;
        for (series, field) in ensemble.iter_mut().zip(record.iter()) {
            let temperature = field.parse::<f64>().map_err(|err| {
                anyhow!(
                    "Could not parse temperature '{field}' for series '{}' at hour {row}: {err}",
                    series.label
                )
            })?;
            series.temperatures.push(temperature);
        }
    }

    Ok(ensemble)
}
