use crate::cli::errors::{CliError, CliResult};

const MAX_LABEL_LEN: usize = 100;

/// Splits a comma separated list, dropping empty items
pub fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn validate_price_range(min: f64, max: f64) -> CliResult<()> {
    if min < 0.0 || max < 0.0 {
        return Err(CliError::validation("price", "Prices cannot be negative"));
    }
    if min > max {
        return Err(CliError::validation(
            "price",
            format!("minimum {min} is above maximum {max}"),
        ));
    }
    Ok(())
}

pub fn validate_labels(field: &str, labels: &[String]) -> CliResult<()> {
    if let Some(label) = labels.iter().find(|l| l.len() > MAX_LABEL_LEN) {
        return Err(CliError::validation(
            field,
            format!("{label:?} exceeds {MAX_LABEL_LEN} characters"),
        ));
    }
    Ok(())
}
