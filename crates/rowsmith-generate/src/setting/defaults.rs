//! Built-in value generators registered on the process-wide default setting.

use std::sync::{Arc, LazyLock};

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use rand::distr::Alphanumeric;
use rand::{Rng, RngCore};
use rowsmith_core::{ColumnDescriptor, ColumnProperty, EngineType, PropertySet, Value};
use rust_decimal::Decimal;
use tracing::trace;

use crate::supplier::{BoxedSupplier, SupplierDecider, decider, fresh_rng};

use super::DataSetting;

pub const DEFAULT_ROWS: u64 = 1024;
pub const DEFAULT_DICE_SIDES: u32 = 6;
pub const DEFAULT_GENERATE_NULL: bool = false;
pub const LARGE_TEXT_MIN_LENGTH: usize = 1024;
pub const LARGE_TEXT_MAX_LENGTH: usize = 2048;
const LARGE_BINARY_MIN_LENGTH: usize = 1024;
const LARGE_BINARY_MAX_LENGTH: usize = 2048;
const DEFAULT_DECIMAL_PRECISION: u32 = 12;
const DEFAULT_DECIMAL_SCALE: u32 = 2;
const MAX_DECIMAL_PRECISION: u32 = 28;

pub fn default_auto_generating() -> PropertySet {
    PropertySet::of(&[ColumnProperty::Nullable, ColumnProperty::DefaultValue])
}

static DEFAULTS: LazyLock<Arc<DataSetting>> = LazyLock::new(|| Arc::new(build_defaults()));

/// The immutable process-wide default setting, always consulted last.
pub fn defaults() -> Arc<DataSetting> {
    Arc::clone(&DEFAULTS)
}

fn build_defaults() -> DataSetting {
    DataSetting::blank()
        .given_type(EngineType::Bit)
        .decide_supplier(|_| bool_supplier())
        .given_type(EngineType::Boolean)
        .decide_supplier(|_| bool_supplier())
        .given_type(EngineType::TinyInt)
        .decide_supplier(|_| int_supplier(i64::from(i8::MAX)))
        .given_type(EngineType::SmallInt)
        .decide_supplier(|_| int_supplier(i64::from(i16::MAX)))
        .given_type(EngineType::Integer)
        .decide_supplier(|_| int_supplier(i64::from(i32::MAX)))
        .given_type(EngineType::BigInt)
        .decide_supplier(|_| int_supplier(i64::MAX))
        .given_type(EngineType::Float)
        .decide_supplier(|_| real_supplier())
        .given_type(EngineType::Real)
        .decide_supplier(|_| real_supplier())
        .given_type(EngineType::Double)
        .decide_supplier(|_| double_supplier())
        .given_type(EngineType::Decimal)
        .decide_with(decimal_decider())
        .given_type(EngineType::Numeric)
        .decide_with(decimal_decider())
        .given_type(EngineType::Char)
        .decide_with(char_decider())
        .given_type(EngineType::Varchar)
        .decide_with(char_decider())
        .given_type(EngineType::NChar)
        .decide_with(char_decider())
        .given_type(EngineType::NVarchar)
        .decide_with(char_decider())
        .given_type(EngineType::Binary)
        .decide_with(binary_decider())
        .given_type(EngineType::Varbinary)
        .decide_with(binary_decider())
        .given_type(EngineType::LongVarbinary)
        .decide_supplier(|_| bytes_supplier(LARGE_BINARY_MIN_LENGTH, LARGE_BINARY_MAX_LENGTH))
        .given_type(EngineType::Blob)
        .decide_supplier(|_| bytes_supplier(LARGE_BINARY_MIN_LENGTH, LARGE_BINARY_MAX_LENGTH))
        .given_type(EngineType::Date)
        .decide_supplier(|_| date_supplier())
        .given_type(EngineType::Time)
        .decide_supplier(|_| time_supplier())
        .given_type(EngineType::TimeWithTimezone)
        .decide_supplier(|_| time_supplier())
        .given_type(EngineType::Timestamp)
        .decide_supplier(|_| timestamp_supplier())
        .given_type(EngineType::TimestampWithTimezone)
        .decide_supplier(|_| timestamp_tz_supplier())
        .given_type("UUID")
        .decide_supplier(|_| uuid_supplier())
        .large_text_length(LARGE_TEXT_MIN_LENGTH, LARGE_TEXT_MAX_LENGTH)
        .with_unsupported_types(EngineType::UNSUPPORTED)
}

pub fn bool_supplier() -> BoxedSupplier {
    let mut rng = fresh_rng();
    Box::new(move || Value::Bool(rng.random_bool(0.5)))
}

/// Integers in `0..=max`.
pub fn int_supplier(max: i64) -> BoxedSupplier {
    let mut rng = fresh_rng();
    Box::new(move || Value::Int(rng.random_range(0..=max)))
}

pub fn real_supplier() -> BoxedSupplier {
    let mut rng = fresh_rng();
    Box::new(move || Value::Float(f64::from(rng.random_range(0.0..=f32::MAX))))
}

pub fn double_supplier() -> BoxedSupplier {
    let mut rng = fresh_rng();
    Box::new(move || Value::Float(rng.random_range(0.0..=f64::MAX)))
}

fn decimal_decider() -> SupplierDecider {
    decider(|column| {
        let precision = column
            .size()
            .filter(|size| *size > 0)
            .unwrap_or(DEFAULT_DECIMAL_PRECISION)
            .min(MAX_DECIMAL_PRECISION);
        let scale = column
            .decimal_digits()
            .unwrap_or(DEFAULT_DECIMAL_SCALE)
            .min(precision);
        trace!(column = %column, precision, scale, "deciding decimal supplier");
        decimal_supplier(precision, scale)
    })
}

/// Decimals with at most `precision` digits, `scale` of them after the point.
pub fn decimal_supplier(precision: u32, scale: u32) -> BoxedSupplier {
    let mut rng = fresh_rng();
    let bound = 10_i128.pow(precision.min(MAX_DECIMAL_PRECISION));
    Box::new(move || {
        let mantissa = rng.random_range(0..bound);
        Value::Decimal(Decimal::from_i128_with_scale(mantissa, scale))
    })
}

/// Length window for character columns, by declared size.
pub fn char_length_window(size: Option<u32>) -> (usize, usize) {
    let size = size.map_or(usize::MAX, |size| size as usize);
    if size <= 8 {
        (size, size)
    } else if size <= 32 {
        (8, size)
    } else {
        (32, size.min(128))
    }
}

fn char_decider() -> SupplierDecider {
    decider(|column: &ColumnDescriptor| {
        let (min, max) = char_length_window(column.size());
        trace!(column = %column, min, max, "deciding text supplier");
        text_supplier(min, max)
    })
}

/// Alphanumeric strings with a length in `min..=max`.
pub fn text_supplier(min: usize, max: usize) -> BoxedSupplier {
    let mut rng = fresh_rng();
    Box::new(move || {
        let len = if min == max {
            min
        } else {
            rng.random_range(min..=max)
        };
        let value: String = (0..len)
            .map(|_| char::from(rng.sample(Alphanumeric)))
            .collect();
        Value::Text(value)
    })
}

/// Length window for binary columns, by declared size.
pub fn binary_length_window(size: Option<u32>) -> (usize, usize) {
    let size = size.map_or(usize::MAX, |size| size as usize);
    if size <= 16 {
        (size, size)
    } else if size <= 64 {
        (16, size)
    } else {
        (64, size.min(256))
    }
}

fn binary_decider() -> SupplierDecider {
    decider(|column| {
        let (min, max) = binary_length_window(column.size());
        bytes_supplier(min, max)
    })
}

pub fn bytes_supplier(min: usize, max: usize) -> BoxedSupplier {
    let mut rng = fresh_rng();
    Box::new(move || {
        let len = if min == max {
            min
        } else {
            rng.random_range(min..=max)
        };
        let mut bytes = vec![0_u8; len];
        rng.fill_bytes(&mut bytes);
        Value::Bytes(bytes)
    })
}

fn epoch_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or_default()
}

/// Dates across a century starting at the Unix epoch.
pub fn date_supplier() -> BoxedSupplier {
    let mut rng = fresh_rng();
    let base = epoch_date();
    Box::new(move || {
        let offset = rng.random_range(0..=36_524_i64);
        Value::Date(base + Duration::days(offset))
    })
}

pub fn time_supplier() -> BoxedSupplier {
    let mut rng = fresh_rng();
    Box::new(move || {
        let seconds = rng.random_range(0..86_400_u32);
        let time = NaiveTime::from_num_seconds_from_midnight_opt(seconds, 0).unwrap_or_default();
        Value::Time(time)
    })
}

pub fn timestamp_supplier() -> BoxedSupplier {
    let mut rng = fresh_rng();
    let base = epoch_date().and_time(NaiveTime::default());
    Box::new(move || {
        let offset = rng.random_range(0..=3_155_673_600_i64);
        Value::Timestamp(base + Duration::seconds(offset))
    })
}

pub fn timestamp_tz_supplier() -> BoxedSupplier {
    let mut rng = fresh_rng();
    Box::new(move || {
        let seconds = rng.random_range(0..=3_155_673_600_i64);
        let timestamp = DateTime::<Utc>::from_timestamp(seconds, 0).unwrap_or_default();
        Value::TimestampTz(timestamp)
    })
}

pub fn uuid_supplier() -> BoxedSupplier {
    let mut rng = fresh_rng();
    Box::new(move || {
        let mut bytes = [0_u8; 16];
        rng.fill_bytes(&mut bytes);
        bytes[6] = (bytes[6] & 0x0f) | 0x40;
        bytes[8] = (bytes[8] & 0x3f) | 0x80;
        Value::Uuid(uuid::Uuid::from_bytes(bytes))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(mut supplier: BoxedSupplier) -> Value {
        supplier.next_value().expect("value")
    }

    #[test]
    fn char_windows_follow_size_tiers() {
        assert_eq!(char_length_window(Some(5)), (5, 5));
        assert_eq!(char_length_window(Some(20)), (8, 20));
        assert_eq!(char_length_window(Some(64)), (32, 64));
        assert_eq!(char_length_window(Some(4000)), (32, 128));
        assert_eq!(char_length_window(None), (32, 128));
    }

    #[test]
    fn binary_windows_follow_size_tiers() {
        assert_eq!(binary_length_window(Some(10)), (10, 10));
        assert_eq!(binary_length_window(Some(50)), (16, 50));
        assert_eq!(binary_length_window(Some(1000)), (64, 256));
    }

    #[test]
    fn text_respects_length_window() {
        let mut supplier = text_supplier(8, 12);
        for _ in 0..50 {
            let value = supplier.next_value().expect("value");
            let text = value.as_str().expect("text");
            assert!((8..=12).contains(&text.len()));
            assert!(text.chars().all(|c| c.is_ascii_alphanumeric()));
        }
    }

    #[test]
    fn decimal_respects_precision_and_scale() {
        let mut supplier = decimal_supplier(5, 2);
        for _ in 0..50 {
            let Value::Decimal(value) = supplier.next_value().expect("value") else {
                panic!("expected decimal");
            };
            assert_eq!(value.scale(), 2);
            assert!(value < Decimal::new(100_000, 2));
        }
    }

    #[test]
    fn integers_stay_non_negative() {
        let mut supplier = int_supplier(i64::from(i8::MAX));
        for _ in 0..50 {
            let value = supplier.next_value().expect("value").as_i64().expect("int");
            assert!((0..=127).contains(&value));
        }
    }

    #[test]
    fn uuid_is_version_four() {
        let Value::Uuid(id) = sample(uuid_supplier()) else {
            panic!("expected uuid");
        };
        assert_eq!(id.get_version_num(), 4);
    }
}
