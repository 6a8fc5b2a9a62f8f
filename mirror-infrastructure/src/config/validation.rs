use anyhow::{anyhow, Result};

pub fn validate_http_url(field: &str, value: &str) -> Result<()> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(anyhow!("{} must not be empty", field));
    }
    let rest = trimmed
        .strip_prefix("https://")
        .or_else(|| trimmed.strip_prefix("http://"))
        .ok_or_else(|| anyhow!("{} must be an http(s) url", field))?;
    if rest.is_empty() || rest.starts_with('/') {
        return Err(anyhow!("{} has no host", field));
    }
    Ok(())
}

pub fn validate_ratio(field: &str, value: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&value) {
        return Err(anyhow!("{} must be within 0..=1, got {}", field, value));
    }
    Ok(())
}

pub fn validate_country_code(value: &str) -> Result<()> {
    if value.len() != 2 || !value.chars().all(|ch| ch.is_ascii_alphabetic()) {
        return Err(anyhow!("country_code must be a two-letter code, got '{}'", value));
    }
    Ok(())
}
