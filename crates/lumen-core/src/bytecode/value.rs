//! Runtime values. Only double-precision numbers exist for now.

/// A value of the constant pool and of the VM operand stack.
pub type Value = f64;

/// Significant digits printed by [`format_value`].
const PRECISION: usize = 6;

/// Render a value the way C's `%g` does: 6 significant digits, trailing
/// zeros removed, scientific notation outside `[1e-4, 1e6)`.
pub fn format_value(value: Value) -> String {
    if value.is_nan() {
        return "nan".into();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf".into() } else { "-inf".into() };
    }
    if value == 0.0 {
        return if value.is_sign_negative() { "-0".into() } else { "0".into() };
    }

    // Rounding to PRECISION digits may bump the exponent (999999.7 -> 1e+06),
    // so the exponent is read back from the rounded rendering.
    let sci = format!("{:.*e}", PRECISION - 1, value);
    let (mantissa, exp) = match sci.split_once('e') {
        Some((m, e)) => (m, e.parse::<i32>().unwrap_or(0)),
        None => (sci.as_str(), 0),
    };

    if exp < -4 || exp >= PRECISION as i32 {
        let sign = if exp < 0 { '-' } else { '+' };
        format!("{}e{sign}{:02}", trim_fraction(mantissa), exp.unsigned_abs())
    } else {
        let decimals = (PRECISION as i32 - 1 - exp).max(0) as usize;
        trim_fraction(&format!("{value:.decimals$}")).into()
    }
}

fn trim_fraction(digits: &str) -> &str {
    if digits.contains('.') {
        digits.trim_end_matches('0').trim_end_matches('.')
    } else {
        digits
    }
}
