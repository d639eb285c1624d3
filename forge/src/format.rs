// SPDX-License-Identifier: AGPL-3.0-only

//! Human-readable byte sizes with binary prefixes.
//!
//! Three decimals, rounded half-to-even, computed in exact integer
//! arithmetic so heap sizes of any magnitude print without float drift.

use crate::error::FormatError;

const PREFIXES: [&str; 9] = ["", "Ki", "Mi", "Gi", "Ti", "Pi", "Ei", "Zi", "Yi"];

/// Multiplier of the `Yi` prefix, used for everything at or above it.
const YI_INDEX: u32 = 8;

/// Render a byte count with the largest fitting binary prefix.
///
/// ```
/// use epseon_forge::format::adaptive_size;
/// assert_eq!(adaptive_size(1024).unwrap(), "1.000KiB");
/// assert_eq!(adaptive_size(256 * 1024 * 1024).unwrap(), "256.000MiB");
/// ```
///
/// # Errors
///
/// [`FormatError::NegativeSize`] for values below zero.
pub fn adaptive_size(value: i128) -> Result<String, FormatError> {
    if value < 0 {
        return Err(FormatError::NegativeSize(value));
    }
    let index = prefix_index(value);
    let multiplier = 1024_i128.pow(index);
    let (whole, thousandths) = divide_rounded(value, multiplier);
    Ok(format!(
        "{whole}.{thousandths:03}{}B",
        PREFIXES[index as usize]
    ))
}

/// Same as [`adaptive_size`] for unsigned counts, which cannot fail.
#[must_use]
pub fn adaptive_size_u64(value: u64) -> String {
    let value = i128::from(value);
    let index = prefix_index(value);
    let (whole, thousandths) = divide_rounded(value, 1024_i128.pow(index));
    format!("{whole}.{thousandths:03}{}B", PREFIXES[index as usize])
}

/// Multiplier and prefix used to scale `value`.
#[must_use]
pub fn unit_for(value: u64) -> (u128, &'static str) {
    let index = prefix_index(i128::from(value));
    (1024_u128.pow(index), PREFIXES[index as usize])
}

fn prefix_index(value: i128) -> u32 {
    (0..YI_INDEX)
        .find(|&i| {
            let lower = 1024_i128.pow(i) - 1;
            let upper = 1024_i128.pow(i + 1);
            lower <= value && value < upper
        })
        .unwrap_or(YI_INDEX)
}

/// `value / multiplier` as whole part plus rounded thousandths.
fn divide_rounded(value: i128, multiplier: i128) -> (i128, i128) {
    let mut whole = value / multiplier;
    let scaled = (value % multiplier) * 1000;
    let mut thousandths = scaled / multiplier;
    let remainder = scaled % multiplier;
    let twice = remainder * 2;
    if twice > multiplier || (twice == multiplier && thousandths % 2 == 1) {
        thousandths += 1;
    }
    if thousandths == 1000 {
        whole += 1;
        thousandths = 0;
    }
    (whole, thousandths)
}
