//! Conversion utilities.

use {
    alloy::primitives::U256,
    bigdecimal::BigDecimal,
    num::{BigInt, BigUint, One, rational::Ratio},
};

/// A 256-bit rational type.
type Rational = num::rational::Ratio<U256>;

/// Converts a `BigDecimal` value to a `Rational` value. Returns `None` if
/// the specified decimal value cannot be represented as a rational of `U256`
/// integers.
pub fn decimal_to_rational(d: &BigDecimal) -> Option<Rational> {
    let (int, exp) = d.as_bigint_and_exponent();

    // First convert to a `Ratio<BigUint>`. This ensures that the ratio is
    // normalized (i.e. GCD of numerator and denomninator is 1) before trying to
    // convert the components to `U256`s. This allows values like `1.00...000`
    // that would otherwise overflow a `U256` numerator.
    let uint = int.to_biguint()?;
    let factor = BigUint::from(10_u8).pow(exp.unsigned_abs().try_into().ok()?);
    let ratio = if exp >= 0 {
        Ratio::new(uint, factor)
    } else {
        Ratio::new(uint * factor, num::one())
    };

    let numer = biguint_to_u256(ratio.numer())?;
    let denom = biguint_to_u256(ratio.denom())?;

    Some(Rational::new_raw(numer, denom))
}

pub fn biguint_to_u256(i: &BigUint) -> Option<U256> {
    let bytes = i.to_bytes_be();
    if bytes.len() > 32 {
        return None;
    }
    Some(U256::from_be_slice(&bytes))
}

/// Converts a decimal token amount into base units of a token with the given
/// number of decimals. Returns `None` for negative amounts, amounts with more
/// precision than the token supports and amounts overflowing a `U256`.
pub fn decimal_to_units(d: &BigDecimal, decimals: u8) -> Option<U256> {
    let scaled = d * BigDecimal::new(BigInt::one(), -i64::from(decimals));
    let ratio = decimal_to_rational(&scaled)?;
    (*ratio.denom() == U256::from(1)).then(|| *ratio.numer())
}
