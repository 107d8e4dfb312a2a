use csv::StringRecord;
use pq_core::{
    domain::{Channel, ChannelMap},
    table::RawSamples,
};
use time::{
    format_description::well_known::Rfc3339, macros::format_description, OffsetDateTime,
    PrimitiveDateTime,
};

use super::SourceError;

/// Parse a trend export: a leading timestamp column followed by one column
/// per channel.
///
/// Columns are matched by remote identifier when the header carries them,
/// otherwise by position in `channels`.
pub fn parse_trend_csv(
    body: &str,
    channels: &[Channel],
    map: &ChannelMap,
) -> Result<RawSamples, SourceError> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(body.as_bytes());
    let headers = rdr
        .headers()
        .map_err(|e| SourceError::Csv(format!("failed to read CSV headers: {e}")))?
        .clone();
    let positions = column_positions(&headers, channels, map)?;

    let mut samples = RawSamples::new(channels.to_vec());
    for (line, result) in rdr.records().enumerate() {
        let record =
            result.map_err(|e| SourceError::Csv(format!("failed to read CSV record: {e}")))?;
        let (ts, values) = parse_record(&record, &positions)
            .map_err(|e| SourceError::Csv(format!("record {}: {e}", line + 1)))?;
        samples.push(ts, values);
    }

    if samples.is_empty() {
        return Err(SourceError::NoData("trend export has no rows".to_string()));
    }
    Ok(samples)
}

fn column_positions(
    headers: &StringRecord,
    channels: &[Channel],
    map: &ChannelMap,
) -> Result<Vec<usize>, SourceError> {
    let by_name: Option<Vec<usize>> = channels
        .iter()
        .map(|c| headers.iter().position(|h| h == map.remote_id(*c)))
        .collect();
    if let Some(positions) = by_name {
        return Ok(positions);
    }
    if headers.len() == channels.len() + 1 {
        return Ok((1..=channels.len()).collect());
    }
    Err(SourceError::Csv(format!(
        "expected {} value columns, header has {}",
        channels.len(),
        headers.len().saturating_sub(1)
    )))
}

fn parse_record(
    record: &StringRecord,
    positions: &[usize],
) -> Result<(OffsetDateTime, Vec<Option<f64>>), String> {
    let ts_str = record.get(0).ok_or("missing timestamp")?;
    let ts = parse_timestamp(ts_str)?;
    let values = positions
        .iter()
        .map(|&idx| parse_optional_f64(record.get(idx).unwrap_or("")))
        .collect::<Result<_, _>>()?;
    Ok((ts, values))
}

fn parse_optional_f64(s: &str) -> Result<Option<f64>, String> {
    let s = s.trim();
    if s.is_empty() {
        return Ok(None);
    }
    s.parse()
        .map(Some)
        .map_err(|e| format!("invalid value '{s}': {e}"))
}

/// RFC 3339, or a bare `YYYY-MM-DD HH:MM:SS[.fff]` taken as UTC.
pub fn parse_timestamp(s: &str) -> Result<OffsetDateTime, String> {
    let s = s.trim();
    if let Ok(ts) = OffsetDateTime::parse(s, &Rfc3339) {
        return Ok(ts);
    }
    PrimitiveDateTime::parse(
        s,
        format_description!("[year]-[month]-[day] [hour]:[minute]:[second][optional [.[subsecond]]]"),
    )
    .map(PrimitiveDateTime::assume_utc)
    .map_err(|e| format!("invalid timestamp '{s}': {e}"))
}
