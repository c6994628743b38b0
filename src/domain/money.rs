/// Parse a price that may carry a currency suffix and German or English
/// separators: `"45.00 EUR"`, `"1.234,50 €"`, `"19,99"`.
pub fn parse_price(text: &str) -> Option<f64> {
    // A minus before the first digit is a sign, anything later is noise
    let negative = text
        .chars()
        .take_while(|c| !c.is_ascii_digit())
        .any(|c| c == '-');
    let cleaned: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == ',')
        .collect();
    if cleaned.is_empty() {
        return None;
    }

    let last_dot = cleaned.rfind('.');
    let last_comma = cleaned.rfind(',');
    let normalized = match (last_dot, last_comma) {
        // Both present: whichever comes last is the decimal separator
        (Some(dot), Some(comma)) if comma > dot => cleaned.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => cleaned.replace(',', ""),
        (None, Some(_)) => {
            if cleaned.matches(',').count() > 1 {
                cleaned.replace(',', "")
            } else {
                cleaned.replace(',', ".")
            }
        }
        (Some(_), None) => {
            if cleaned.matches('.').count() > 1 {
                cleaned.replace('.', "")
            } else {
                cleaned
            }
        }
        (None, None) => cleaned,
    };

    normalized
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .map(|v| if negative { -v } else { v })
}

/// Round to one decimal place.
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// `part / whole * 100`, rounded to one decimal. Zero when `whole` is zero,
/// missing or not a number.
pub fn percentage_of(part: Option<f64>, whole: Option<f64>) -> f64 {
    match whole {
        Some(w) if w.is_finite() && w > 0.0 => {
            let p = part.filter(|p| p.is_finite()).unwrap_or(0.0);
            round1(p / w * 100.0)
        }
        _ => 0.0,
    }
}

/// Format as a German euro amount: `1.234,56 €`.
pub fn format_eur(value: f64) -> String {
    let value = if value.is_finite() { value } else { 0.0 };
    let cents = (value.abs() * 100.0).round() as u64;
    let euros = cents / 100;
    let rest = cents % 100;

    let digits = euros.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }

    let sign = if value < 0.0 && cents > 0 { "-" } else { "" };
    format!("{}{},{:02} €", sign, grouped, rest)
}

/// Like [`format_eur`], with absent prices shown as zero.
pub fn format_opt_eur(value: Option<f64>) -> String {
    format_eur(value.unwrap_or(0.0))
}
