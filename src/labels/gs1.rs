//! GS1 mod-10 check digits and SSCC-18 construction.

use crate::errors::ServiceError;

/// Mod-10 check digit over a digit string, weighting 3,1,3,... from the
/// rightmost digit. Returns `None` for empty or non-numeric input.
pub fn check_digit(digits: &str) -> Option<u8> {
    if digits.is_empty() {
        return None;
    }
    let mut sum = 0u32;
    for (i, c) in digits.chars().rev().enumerate() {
        let d = c.to_digit(10)?;
        sum += if i % 2 == 0 { d * 3 } else { d };
    }
    Some(((10 - sum % 10) % 10) as u8)
}

/// Builds an 18-digit SSCC from an extension digit, a GS1 company prefix
/// and a serial reference, zero-padding the reference to fill 17 digits.
pub fn sscc18(
    extension: u8,
    company_prefix: &str,
    serial_reference: u64,
) -> Result<String, ServiceError> {
    if extension > 9 {
        return Err(ServiceError::invalid("SSCC extension digit must be 0-9"));
    }
    if !(6..=12).contains(&company_prefix.len())
        || !company_prefix.chars().all(|c| c.is_ascii_digit())
    {
        return Err(ServiceError::invalid(
            "GS1 company prefix must be 6 to 12 digits",
        ));
    }

    let reference_len = 16 - company_prefix.len();
    let reference = format!("{:0width$}", serial_reference, width = reference_len);
    if reference.len() > reference_len {
        return Err(ServiceError::invalid(format!(
            "Serial reference {} does not fit in {} digits",
            serial_reference, reference_len
        )));
    }

    let body = format!("{}{}{}", extension, company_prefix, reference);
    let check = check_digit(&body)
        .ok_or_else(|| ServiceError::InternalError("SSCC body is not numeric".into()))?;
    Ok(format!("{}{}", body, check))
}

pub fn is_valid_sscc(sscc: &str) -> bool {
    if sscc.len() != 18 {
        return false;
    }
    let (body, check) = sscc.split_at(17);
    match (check_digit(body), check.parse::<u8>()) {
        (Some(expected), Ok(actual)) => expected == actual,
        _ => false,
    }
}
