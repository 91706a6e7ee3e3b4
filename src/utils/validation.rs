//! Utilidades de validación
//!
//! Este módulo contiene funciones helper para validación de datos
//! y normalización de números de teléfono.

use lazy_static::lazy_static;
use regex::Regex;
use validator::ValidationError;

use crate::utils::errors::{validation_error, AppError};

lazy_static! {
    /// Teléfono normalizado: prefijo internacional y 9 a 14 dígitos
    static ref E164_RE: Regex = Regex::new(r"^\+[1-9]\d{8,14}$").unwrap();
}

/// Prefijo internacional por defecto (Kenia)
pub const DEFAULT_COUNTRY_CODE: &str = "254";

/// Normalizar un teléfono al formato `+254…`
///
/// Acepta formato local (`0712…`), internacional sin `+` (`254712…`) y
/// con `+`. Espacios, guiones y paréntesis se ignoran.
pub fn normalize_phone(value: &str) -> Result<String, AppError> {
    let trimmed = value.trim();
    let digits: String = trimmed.chars().filter(|c| c.is_ascii_digit()).collect();

    let normalized = if trimmed.starts_with('+') {
        format!("+{}", digits)
    } else if let Some(local) = digits.strip_prefix('0') {
        format!("+{}{}", DEFAULT_COUNTRY_CODE, local)
    } else {
        format!("+{}", digits)
    };

    if !E164_RE.is_match(&normalized) {
        return Err(validation_error("phone", "Invalid phone number"));
    }

    Ok(normalized)
}

/// Formato MSISDN que espera M-Pesa (`2547…`, sin `+`)
pub fn to_msisdn(normalized_phone: &str) -> String {
    normalized_phone.trim_start_matches('+').to_string()
}

/// Enmascarar un teléfono para logs
pub fn mask_phone(phone: &str) -> String {
    let visible: String = phone.chars().rev().take(3).collect::<Vec<_>>().into_iter().rev().collect();
    format!("***{}", visible)
}

/// Validar formato de teléfono (uso con `#[validate(custom = ...)]`)
pub fn validate_phone(value: &str) -> Result<(), ValidationError> {
    if normalize_phone(value).is_err() {
        let mut error = ValidationError::new("phone");
        error.add_param("value".into(), &value.to_string());
        return Err(error);
    }
    Ok(())
}

/// Validar que un string no esté vacío
pub fn validate_not_empty(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("not_empty"));
    }
    Ok(())
}

/// Validar formato de coordenadas GPS
pub fn validate_coordinates(lat: f64, lng: f64) -> Result<(), AppError> {
    if !(-90.0..=90.0).contains(&lat) {
        return Err(validation_error("latitude", "Latitude must be between -90 and 90"));
    }

    if !(-180.0..=180.0).contains(&lng) {
        return Err(validation_error("longitude", "Longitude must be between -180 and 180"));
    }

    Ok(())
}

/// Validar formato de matrícula de vehículo
pub fn validate_number_plate(value: &str) -> Result<(), ValidationError> {
    // Formato básico: KDA 123A o similar
    let clean_plate = value.replace([' ', '-', '_'], "");
    if clean_plate.len() < 5 || clean_plate.len() > 10 {
        let mut error = ValidationError::new("number_plate");
        error.add_param("value".into(), &value.to_string());
        return Err(error);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_phone_formats() {
        assert_eq!(normalize_phone("0712345678").unwrap(), "+254712345678");
        assert_eq!(normalize_phone("254712345678").unwrap(), "+254712345678");
        assert_eq!(normalize_phone("+254712345678").unwrap(), "+254712345678");
        assert_eq!(normalize_phone(" 0712-345 678 ").unwrap(), "+254712345678");
    }

    #[test]
    fn test_normalize_phone_rejects_garbage() {
        assert!(normalize_phone("").is_err());
        assert!(normalize_phone("123").is_err());
        assert!(normalize_phone("phone").is_err());
    }

    #[test]
    fn test_msisdn_and_mask() {
        assert_eq!(to_msisdn("+254712345678"), "254712345678");
        assert_eq!(mask_phone("+254712345678"), "***678");
    }

    #[test]
    fn test_validate_coordinates() {
        assert!(validate_coordinates(-1.29, 36.82).is_ok());
        assert!(validate_coordinates(91.0, 36.82).is_err());
        assert!(validate_coordinates(-1.29, -181.0).is_err());
    }

    #[test]
    fn test_validate_number_plate() {
        assert!(validate_number_plate("KDA 123A").is_ok());
        assert!(validate_number_plate("K1").is_err());
    }
}
