//! Normalization, ordering and rounding of result values.

use crate::store::Branches;

/// Rounds `value` to `precision` significant decimal digits. `-0` becomes `0`.
pub fn normalize(value: f64, precision: u32) -> f64 {
    if value == 0.0 {
        return 0.0;
    }
    if !value.is_finite() {
        return value;
    }
    let digits = precision.saturating_sub(1) as usize;
    format!("{:.*e}", digits, value).parse().unwrap_or(value)
}

/// Normalizes, sorts ascending and removes duplicates.
pub fn settle(mut values: Branches, precision: u32) -> Branches {
    for v in values.iter_mut() {
        *v = normalize(*v, precision);
    }
    values.sort_by(f64::total_cmp);
    values.dedup();
    values
}

/// Rounds to `digits` places after the decimal point. Ties go to even.
pub fn round(value: f64, digits: u32) -> f64 {
    let rounded: f64 = format!("{:.*}", digits as usize, value).parse().unwrap_or(value);
    if rounded == 0.0 { 0.0 } else { rounded }
}

/// Calls `f` with every combination of indices into lists of the given
/// lengths, the last position varying fastest. One call when `lens` is empty.
pub fn for_each_combination<E>(lens: &[usize], mut f: impl FnMut(&[usize]) -> Result<(), E>) -> Result<(), E> {
    if lens.contains(&0) {
        return Ok(());
    }
    let mut cursor = vec![0usize; lens.len()];
    loop {
        f(&cursor)?;
        let mut pos = lens.len();
        loop {
            if pos == 0 {
                return Ok(());
            }
            pos -= 1;
            cursor[pos] += 1;
            if cursor[pos] < lens[pos] {
                break;
            }
            cursor[pos] = 0;
        }
    }
}
