use serde_json::Value;
use validator::{Validate, ValidationErrors, ValidationErrorsKind};

use crate::models::{AirPollutionRecord, AqiMain, FieldError, PollutantComponents};

const COMPONENT_FIELDS: [&str; 8] = ["co", "no", "no2", "o3", "so2", "pm2_5", "pm10", "nh3"];

/// Validate one raw API record against the air pollution schema.
///
/// Pure function: returns either the normalized record or the full list of
/// structured errors. Unknown extra fields are ignored; wrong primitive
/// types fail unless unambiguously coercible (a numeric string coerces, a
/// fractional float does not coerce to an integer field).
pub fn validate_record(raw: &Value) -> std::result::Result<AirPollutionRecord, Vec<FieldError>> {
    let Some(obj) = raw.as_object() else {
        return Err(vec![FieldError::new("record", "expected a JSON object")]);
    };

    let mut errors = Vec::new();

    let dt = extract_int(obj.get("dt"), "dt", &mut errors);

    let aqi = match obj.get("main") {
        None => {
            errors.push(FieldError::new("main", "field is required"));
            None
        }
        Some(main) => match main.as_object() {
            None => {
                errors.push(FieldError::new("main", "expected a JSON object"));
                None
            }
            Some(main_obj) => extract_int(main_obj.get("aqi"), "main.aqi", &mut errors),
        },
    };

    let components = match obj.get("components") {
        None => {
            errors.push(FieldError::new("components", "field is required"));
            None
        }
        Some(components) => match components.as_object() {
            None => {
                errors.push(FieldError::new("components", "expected a JSON object"));
                None
            }
            Some(comp_obj) => {
                let mut values = [None; 8];
                for (slot, name) in values.iter_mut().zip(COMPONENT_FIELDS) {
                    *slot = extract_float(
                        comp_obj.get(name),
                        &format!("components.{name}"),
                        &mut errors,
                    );
                }
                match values {
                    [Some(co), Some(no), Some(no2), Some(o3), Some(so2), Some(pm2_5), Some(pm10), Some(nh3)] => {
                        Some(PollutantComponents {
                            co,
                            no,
                            no2,
                            o3,
                            so2,
                            pm2_5,
                            pm10,
                            nh3,
                        })
                    }
                    _ => None,
                }
            }
        },
    };

    if !errors.is_empty() {
        return Err(errors);
    }

    // Every extraction pushed an error on failure, so all three are present.
    let (Some(dt), Some(aqi), Some(components)) = (dt, aqi, components) else {
        return Err(errors);
    };

    let record = AirPollutionRecord {
        dt,
        main: AqiMain { aqi },
        components,
    };

    if let Err(validation_errors) = record.validate() {
        let mut bound_errors = Vec::new();
        flatten_validation_errors("", &validation_errors, &mut bound_errors);
        return Err(bound_errors);
    }

    Ok(record)
}

fn extract_int(value: Option<&Value>, path: &str, errors: &mut Vec<FieldError>) -> Option<i64> {
    match value {
        None => {
            errors.push(FieldError::new(path, "field is required"));
            None
        }
        Some(v) => match coerce_int(v) {
            Some(i) => Some(i),
            None => {
                errors.push(FieldError::new(path, "expected an integer"));
                None
            }
        },
    }
}

fn extract_float(value: Option<&Value>, path: &str, errors: &mut Vec<FieldError>) -> Option<f64> {
    match value {
        None => {
            errors.push(FieldError::new(path, "field is required"));
            None
        }
        Some(v) => match coerce_float(v) {
            Some(f) => Some(f),
            None => {
                errors.push(FieldError::new(path, "expected a number"));
                None
            }
        },
    }
}

fn coerce_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                return Some(i);
            }
            n.as_f64()
                .filter(|f| f.is_finite() && f.fract() == 0.0)
                .map(|f| f as i64)
        }
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

fn coerce_float(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        _ => None,
    }
}

/// Flatten nested `validator` errors into dot-separated field paths.
fn flatten_validation_errors(prefix: &str, errors: &ValidationErrors, out: &mut Vec<FieldError>) {
    for (field, kind) in errors.errors() {
        let path = if prefix.is_empty() {
            field.to_string()
        } else {
            format!("{prefix}.{field}")
        };
        match kind {
            ValidationErrorsKind::Field(field_errors) => {
                for err in field_errors {
                    let message = err
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("failed '{}' constraint", err.code));
                    out.push(FieldError::new(path.clone(), message));
                }
            }
            ValidationErrorsKind::Struct(nested) => {
                flatten_validation_errors(&path, nested, out);
            }
            ValidationErrorsKind::List(items) => {
                for (index, nested) in items {
                    flatten_validation_errors(&format!("{path}[{index}]"), nested, out);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn valid_raw() -> Value {
        json!({
            "dt": 1_606_482_000,
            "main": {"aqi": 2},
            "components": {
                "co": 200.0, "no": 10.0, "no2": 10.0, "o3": 10.0,
                "so2": 10.0, "pm2_5": 10.0, "pm10": 10.0, "nh3": 10.0
            }
        })
    }

    #[test]
    fn test_valid_record_normalizes() {
        let record = validate_record(&valid_raw()).unwrap();
        assert_eq!(record.dt, 1_606_482_000);
        assert_eq!(record.main.aqi, 2);
        assert_eq!(record.components.co, 200.0);
    }

    #[test]
    fn test_numeric_strings_are_coerced() {
        let mut raw = valid_raw();
        raw["dt"] = json!("1606482000");
        raw["main"]["aqi"] = json!("3");
        raw["components"]["pm2_5"] = json!("12.5");

        let record = validate_record(&raw).unwrap();
        assert_eq!(record.dt, 1_606_482_000);
        assert_eq!(record.main.aqi, 3);
        assert_eq!(record.components.pm2_5, 12.5);
    }

    #[test]
    fn test_non_numeric_aqi_fails() {
        let mut raw = valid_raw();
        raw["main"]["aqi"] = json!("NOT_AN_INT");

        let errors = validate_record(&raw).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "main.aqi");
    }

    #[test]
    fn test_fractional_timestamp_fails() {
        let mut raw = valid_raw();
        raw["dt"] = json!(1_606_482_000.5);

        let errors = validate_record(&raw).unwrap_err();
        assert_eq!(errors[0].field, "dt");
    }

    #[test]
    fn test_missing_components_reported_once() {
        let raw = json!({"dt": 1_606_482_000, "main": {"aqi": 2}});

        let errors = validate_record(&raw).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "components");
        assert_eq!(errors[0].message, "field is required");
    }

    #[test]
    fn test_multiple_failures_are_collected() {
        let raw = json!({
            "main": {"aqi": true},
            "components": {
                "co": 200.0, "no": 10.0, "no2": 10.0, "o3": 10.0,
                "so2": 10.0, "pm2_5": "bad", "pm10": 10.0, "nh3": 10.0
            }
        });

        let errors = validate_record(&raw).unwrap_err();
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["dt", "main.aqi", "components.pm2_5"]);
    }

    #[test]
    fn test_unknown_extra_fields_ignored() {
        let mut raw = valid_raw();
        raw["unexpected"] = json!("whatever");
        raw["components"]["radon"] = json!(1.0);

        assert!(validate_record(&raw).is_ok());
    }

    #[test]
    fn test_bounds_reported_with_paths() {
        let mut raw = valid_raw();
        raw["main"]["aqi"] = json!(9);
        raw["components"]["nh3"] = json!(-4.0);

        let mut fields: Vec<String> = validate_record(&raw)
            .unwrap_err()
            .into_iter()
            .map(|e| e.field)
            .collect();
        fields.sort();
        assert_eq!(fields, vec!["components.nh3", "main.aqi"]);
    }

    #[test]
    fn test_non_object_record() {
        let errors = validate_record(&json!([1, 2, 3])).unwrap_err();
        assert_eq!(errors[0].field, "record");
    }
}
