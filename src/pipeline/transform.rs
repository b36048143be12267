use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use bytes::Bytes;
use chrono::{DateTime, TimeZone, Utc};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use parquet::basic::{Compression, GzipLevel, ZstdLevel};
use parquet::file::properties::WriterProperties;
use serde_json::Value;
use tracing::info;

use crate::error::{PipelineError, Result};
use crate::models::AirPollutionRecord;

const DEFAULT_ROW_GROUP_SIZE: usize = 10_000;

/// One flattened, enriched measurement ready for the silver layer.
#[derive(Debug, Clone, PartialEq)]
pub struct PollutionRow {
    pub city: String,
    pub dt: i64,
    pub measured_at: DateTime<Utc>,
    pub aqi: i64,
    pub aqi_interpretation: String,
    pub day_of_week: String,
    pub time_of_day: String,
    pub co: f64,
    pub no: f64,
    pub no2: f64,
    pub o3: f64,
    pub so2: f64,
    pub pm2_5: f64,
    pub pm10: f64,
    pub nh3: f64,
}

impl PollutionRow {
    fn from_record(record: &AirPollutionRecord, city: &str) -> Result<Self> {
        let measured_at = Utc
            .timestamp_opt(record.dt, 0)
            .single()
            .ok_or_else(|| {
                PipelineError::InvalidFormat(format!(
                    "timestamp {} is not representable",
                    record.dt
                ))
            })?;
        let aqi_interpretation = aqi_category(record.main.aqi).ok_or_else(|| {
            PipelineError::InvalidFormat(format!(
                "aqi {} outside categories 1-5",
                record.main.aqi
            ))
        })?;

        Ok(Self {
            city: city.to_string(),
            dt: record.dt,
            measured_at,
            aqi: record.main.aqi,
            aqi_interpretation: aqi_interpretation.to_string(),
            day_of_week: measured_at.format("%A").to_string(),
            time_of_day: measured_at.format("%H:%M").to_string(),
            co: record.components.co,
            no: record.components.no,
            no2: record.components.no2,
            o3: record.components.o3,
            so2: record.components.so2,
            pm2_5: record.components.pm2_5,
            pm10: record.components.pm10,
            nh3: record.components.nh3,
        })
    }
}

/// Human-readable interpretation of an AQI category.
pub fn aqi_category(aqi: i64) -> Option<&'static str> {
    match aqi {
        1 => Some("good"),
        2 => Some("fair"),
        3 => Some("moderate"),
        4 => Some("poor"),
        5 => Some("very poor"),
        _ => None,
    }
}

/// Transform a stored bronze payload into flattened, enriched rows.
///
/// Pure function, no I/O. Fails fast when the payload carries no records or
/// a record no longer matches the pollution schema.
pub fn transform_records(payload: &Value, city: &str) -> Result<Vec<PollutionRow>> {
    let list = payload
        .get("list")
        .and_then(Value::as_array)
        .filter(|records| !records.is_empty())
        .ok_or_else(|| {
            PipelineError::InvalidFormat("payload 'list' is missing or empty".to_string())
        })?;

    let mut rows = Vec::with_capacity(list.len());
    for record in list {
        let record: AirPollutionRecord = serde_json::from_value(record.clone()).map_err(|err| {
            PipelineError::InvalidFormat(format!(
                "record does not match the pollution schema: {err}"
            ))
        })?;
        rows.push(PollutionRow::from_record(&record, city)?);
    }

    info!(
        "Transformation complete for city={city}. {} rows produced",
        rows.len()
    );

    Ok(rows)
}

/// Serializes pollution rows to and from silver-layer Parquet artifacts.
pub struct ParquetRowWriter {
    compression: Compression,
    row_group_size: usize,
}

impl ParquetRowWriter {
    pub fn new() -> Self {
        Self {
            compression: Compression::SNAPPY,
            row_group_size: DEFAULT_ROW_GROUP_SIZE,
        }
    }

    pub fn with_compression(mut self, compression: &str) -> Result<Self> {
        self.compression = match compression.to_lowercase().as_str() {
            "snappy" => Compression::SNAPPY,
            "gzip" => Compression::GZIP(GzipLevel::default()),
            "lz4" => Compression::LZ4,
            "zstd" => Compression::ZSTD(ZstdLevel::default()),
            "none" => Compression::UNCOMPRESSED,
            _ => {
                return Err(PipelineError::InvalidFormat(format!(
                    "Unsupported compression: {compression}"
                )))
            }
        };
        Ok(self)
    }

    pub fn with_row_group_size(mut self, size: usize) -> Self {
        self.row_group_size = size;
        self
    }

    /// Encode rows into an in-memory Parquet artifact.
    pub fn write_to_bytes(&self, rows: &[PollutionRow]) -> Result<Vec<u8>> {
        if rows.is_empty() {
            return Err(PipelineError::InvalidFormat(
                "no rows to write to Parquet".to_string(),
            ));
        }

        let schema = Self::schema();
        let batch = Self::rows_to_batch(rows, schema.clone())?;

        let props = WriterProperties::builder()
            .set_compression(self.compression)
            .set_max_row_group_size(self.row_group_size)
            .build();

        let mut buffer = Vec::new();
        let mut writer = ArrowWriter::try_new(&mut buffer, schema, Some(props))?;
        writer.write(&batch)?;
        writer.close()?;

        Ok(buffer)
    }

    /// Decode a silver artifact back into rows.
    pub fn read_rows(&self, data: Vec<u8>) -> Result<Vec<PollutionRow>> {
        let reader = ParquetRecordBatchReaderBuilder::try_new(Bytes::from(data))?.build()?;

        let mut rows = Vec::new();
        for batch in reader {
            let batch = batch?;
            let city = string_column(&batch, "city")?;
            let dt = int_column(&batch, "dt")?;
            let measured_at = string_column(&batch, "measured_at")?;
            let aqi = int_column(&batch, "aqi")?;
            let aqi_interpretation = string_column(&batch, "aqi_interpretation")?;
            let day_of_week = string_column(&batch, "day_of_week")?;
            let time_of_day = string_column(&batch, "time_of_day")?;
            let co = float_column(&batch, "co")?;
            let no = float_column(&batch, "no")?;
            let no2 = float_column(&batch, "no2")?;
            let o3 = float_column(&batch, "o3")?;
            let so2 = float_column(&batch, "so2")?;
            let pm2_5 = float_column(&batch, "pm2_5")?;
            let pm10 = float_column(&batch, "pm10")?;
            let nh3 = float_column(&batch, "nh3")?;

            for i in 0..batch.num_rows() {
                rows.push(PollutionRow {
                    city: city.value(i).to_string(),
                    dt: dt.value(i),
                    measured_at: parse_rfc3339(measured_at.value(i))?,
                    aqi: aqi.value(i),
                    aqi_interpretation: aqi_interpretation.value(i).to_string(),
                    day_of_week: day_of_week.value(i).to_string(),
                    time_of_day: time_of_day.value(i).to_string(),
                    co: co.value(i),
                    no: no.value(i),
                    no2: no2.value(i),
                    o3: o3.value(i),
                    so2: so2.value(i),
                    pm2_5: pm2_5.value(i),
                    pm10: pm10.value(i),
                    nh3: nh3.value(i),
                });
            }
        }

        Ok(rows)
    }

    fn schema() -> Arc<Schema> {
        let float_fields = ["co", "no", "no2", "o3", "so2", "pm2_5", "pm10", "nh3"]
            .map(|name| Field::new(name, DataType::Float64, false));

        let mut fields = vec![
            Field::new("city", DataType::Utf8, false),
            Field::new("dt", DataType::Int64, false),
            Field::new("measured_at", DataType::Utf8, false),
            Field::new("aqi", DataType::Int64, false),
            Field::new("aqi_interpretation", DataType::Utf8, false),
            Field::new("day_of_week", DataType::Utf8, false),
            Field::new("time_of_day", DataType::Utf8, false),
        ];
        fields.extend(float_fields);

        Arc::new(Schema::new(fields))
    }

    fn rows_to_batch(rows: &[PollutionRow], schema: Arc<Schema>) -> Result<RecordBatch> {
        let cities: Vec<&str> = rows.iter().map(|r| r.city.as_str()).collect();
        let dts: Vec<i64> = rows.iter().map(|r| r.dt).collect();
        let measured: Vec<String> = rows.iter().map(|r| r.measured_at.to_rfc3339()).collect();
        let aqis: Vec<i64> = rows.iter().map(|r| r.aqi).collect();
        let interpretations: Vec<&str> = rows
            .iter()
            .map(|r| r.aqi_interpretation.as_str())
            .collect();
        let days: Vec<&str> = rows.iter().map(|r| r.day_of_week.as_str()).collect();
        let times: Vec<&str> = rows.iter().map(|r| r.time_of_day.as_str()).collect();

        let mut columns: Vec<ArrayRef> = vec![
            Arc::new(StringArray::from(cities)),
            Arc::new(Int64Array::from(dts)),
            Arc::new(StringArray::from(
                measured.iter().map(String::as_str).collect::<Vec<&str>>(),
            )),
            Arc::new(Int64Array::from(aqis)),
            Arc::new(StringArray::from(interpretations)),
            Arc::new(StringArray::from(days)),
            Arc::new(StringArray::from(times)),
        ];

        let accessors: [fn(&PollutionRow) -> f64; 8] = [
            |r| r.co,
            |r| r.no,
            |r| r.no2,
            |r| r.o3,
            |r| r.so2,
            |r| r.pm2_5,
            |r| r.pm10,
            |r| r.nh3,
        ];
        for accessor in accessors {
            let values: Vec<f64> = rows.iter().map(accessor).collect();
            columns.push(Arc::new(Float64Array::from(values)));
        }

        Ok(RecordBatch::try_new(schema, columns)?)
    }
}

impl Default for ParquetRowWriter {
    fn default() -> Self {
        Self::new()
    }
}

fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray> {
    batch
        .column_by_name(name)
        .and_then(|column| column.as_any().downcast_ref::<StringArray>())
        .ok_or_else(|| column_error(name))
}

fn int_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a Int64Array> {
    batch
        .column_by_name(name)
        .and_then(|column| column.as_any().downcast_ref::<Int64Array>())
        .ok_or_else(|| column_error(name))
}

fn float_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a Float64Array> {
    batch
        .column_by_name(name)
        .and_then(|column| column.as_any().downcast_ref::<Float64Array>())
        .ok_or_else(|| column_error(name))
}

fn column_error(name: &str) -> PipelineError {
    PipelineError::InvalidFormat(format!("missing or mistyped column '{name}'"))
}

fn parse_rfc3339(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|err| PipelineError::InvalidFormat(format!("bad timestamp '{value}': {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn bronze_payload() -> Value {
        json!({
            "coord": {"lon": 13.405, "lat": 52.52},
            "metadata": {"status": "valid"},
            "list": [
                {
                    // 2020-11-27 13:00 UTC, a Friday
                    "dt": 1_606_482_000,
                    "main": {"aqi": 2},
                    "components": {
                        "co": 201.9, "no": 0.1, "no2": 8.2, "o3": 68.7,
                        "so2": 1.4, "pm2_5": 4.3, "pm10": 6.8, "nh3": 0.9
                    }
                },
                {
                    "dt": 1_606_485_600,
                    "main": {"aqi": 5},
                    "components": {
                        "co": 300.0, "no": 0.2, "no2": 9.0, "o3": 70.0,
                        "so2": 2.0, "pm2_5": 45.0, "pm10": 80.0, "nh3": 1.2
                    }
                }
            ]
        })
    }

    #[test]
    fn test_transform_enriches_rows() {
        let rows = transform_records(&bronze_payload(), "Berlin").unwrap();

        assert_eq!(rows.len(), 2);
        let first = &rows[0];
        assert_eq!(first.city, "Berlin");
        assert_eq!(first.aqi_interpretation, "fair");
        assert_eq!(first.day_of_week, "Friday");
        assert_eq!(first.time_of_day, "13:00");
        assert_eq!(first.pm2_5, 4.3);

        assert_eq!(rows[1].aqi_interpretation, "very poor");
        assert_eq!(rows[1].time_of_day, "14:00");
    }

    #[test]
    fn test_transform_fails_fast_on_empty_payload() {
        assert!(transform_records(&json!({"list": []}), "Berlin").is_err());
        assert!(transform_records(&json!({"coord": {}}), "Berlin").is_err());
    }

    #[test]
    fn test_transform_rejects_schema_mismatch() {
        let payload = json!({"list": [{"dt": 1_606_482_000}]});
        let err = transform_records(&payload, "Berlin").unwrap_err();
        assert!(matches!(err, PipelineError::InvalidFormat(_)));
    }

    #[test]
    fn test_parquet_roundtrip() {
        let rows = transform_records(&bronze_payload(), "Berlin").unwrap();
        let writer = ParquetRowWriter::new();

        let bytes = writer.write_to_bytes(&rows).unwrap();
        let decoded = writer.read_rows(bytes).unwrap();

        assert_eq!(decoded, rows);
    }

    #[test]
    fn test_empty_rows_refused() {
        assert!(ParquetRowWriter::new().write_to_bytes(&[]).is_err());
    }

    #[test]
    fn test_unsupported_compression_rejected() {
        assert!(ParquetRowWriter::new().with_compression("brotli9000").is_err());
        assert!(ParquetRowWriter::new().with_compression("zstd").is_ok());
    }

    #[test]
    fn test_aqi_categories() {
        assert_eq!(aqi_category(1), Some("good"));
        assert_eq!(aqi_category(5), Some("very poor"));
        assert_eq!(aqi_category(0), None);
        assert_eq!(aqi_category(6), None);
    }
}
