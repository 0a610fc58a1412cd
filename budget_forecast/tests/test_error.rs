use budget_forecast::identity::RESERVED_PRIMARY;
use budget_forecast::ForecastError;
use std::io;

#[test]
fn test_error_conversion() {
    let io_error = io::Error::new(io::ErrorKind::NotFound, "file not found");
    let forecast_error = ForecastError::from(io_error);
    assert!(matches!(forecast_error, ForecastError::IoError(_)));

    let json_error = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
    assert!(matches!(
        ForecastError::from(json_error),
        ForecastError::JsonError(_)
    ));

    let math_error = holt_math::MathError::InvalidInput("bad grid".to_string());
    assert!(matches!(
        ForecastError::from(math_error),
        ForecastError::ConfigError(_)
    ));
}

#[test]
fn test_error_display() {
    let error = ForecastError::SchemaError {
        missing: vec!["date".to_string(), "tx_id".to_string()],
    };
    let text = error.to_string();
    assert!(text.contains("date"));
    assert!(text.contains("tx_id"));

    let error = ForecastError::UnknownIdentifier("bob".to_string());
    assert!(error.to_string().contains(RESERVED_PRIMARY));

    let error = ForecastError::OutOfRange(1);
    assert!(error.to_string().contains(">= 3"));
}

#[test]
fn test_error_classes_do_not_overlap() {
    let identifier_errors = [
        ForecastError::InvalidType("float".to_string()),
        ForecastError::OutOfRange(2),
        ForecastError::UnknownIdentifier("x".to_string()),
        ForecastError::IdentifierNotFound {
            identifier: "5".to_string(),
            sample: vec![],
        },
    ];
    for err in &identifier_errors {
        assert!(err.is_identifier_error());
        assert!(!err.is_load_error());
    }

    let schema = ForecastError::SchemaError { missing: vec![] };
    assert!(schema.is_load_error());
    assert!(!schema.is_identifier_error());

    let empty = ForecastError::EmptySeriesError("5".to_string());
    assert!(!empty.is_load_error() && !empty.is_identifier_error());
}
