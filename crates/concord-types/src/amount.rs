use crate::error::TypesError;
use std::fmt;
use std::iter::Sum;
use std::str::FromStr;

/// Token quantity in the smallest indivisible unit.
///
/// Stakes, tallies and treasury balances are all `Amount`s. Arithmetic is
/// checked: callers decide whether overflow is an error or saturates.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Amount(u128);

impl Amount {
    pub const ZERO: Self = Self(0);
    pub const MAX: Self = Self(u128::MAX);

    /// One whole unit (10^18 smallest units)
    pub const UNIT: Self = Self(1_000_000_000_000_000_000);

    /// Number of decimal places in one whole unit
    pub const DECIMALS: u32 = 18;

    pub const fn from_raw(raw: u128) -> Self {
        Self(raw)
    }

    /// Whole units, e.g. `from_units(5)` is five units.
    pub const fn from_units(units: u64) -> Self {
        Self(units as u128 * Self::UNIT.0)
    }

    pub const fn raw(&self) -> u128 {
        self.0
    }

    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(&self, rhs: Self) -> Option<Self> {
        self.0.checked_add(rhs.0).map(Self)
    }

    pub fn checked_sub(&self, rhs: Self) -> Option<Self> {
        self.0.checked_sub(rhs.0).map(Self)
    }

    pub fn saturating_add(&self, rhs: Self) -> Self {
        Self(self.0.saturating_add(rhs.0))
    }

    pub fn saturating_sub(&self, rhs: Self) -> Self {
        Self(self.0.saturating_sub(rhs.0))
    }

    /// Multiply by a basis-point fraction (10_000 = 100%), rounding down.
    /// Fractions above 100% saturate at `MAX`.
    pub fn mul_bps(&self, bps: u16) -> Self {
        let bps = bps as u128;
        // Split to keep the intermediate product inside u128.
        let whole = (self.0 / 10_000).saturating_mul(bps);
        let rest = (self.0 % 10_000) * bps / 10_000;
        Self(whole.saturating_add(rest))
    }

    /// Render as decimal whole units, trimming trailing zeros ("0.1", "17").
    pub fn format_units(&self) -> String {
        let unit = Self::UNIT.0;
        let whole = self.0 / unit;
        let frac = self.0 % unit;
        if frac == 0 {
            return whole.to_string();
        }
        let frac = format!("{:018}", frac);
        format!("{}.{}", whole, frac.trim_end_matches('0'))
    }

    fn parse_units(s: &str) -> Result<Self, TypesError> {
        let (whole, frac) = match s.split_once('.') {
            Some((w, f)) => (w, f),
            None => (s, ""),
        };
        if frac.len() > Self::DECIMALS as usize {
            return Err(TypesError::InvalidAmount(format!(
                "more than {} decimal places: {}",
                Self::DECIMALS,
                s
            )));
        }
        let whole = if whole.is_empty() { 0 } else { parse_digits(whole)? };
        let frac_raw = if frac.is_empty() {
            0
        } else {
            parse_digits(&format!("{:0<18}", frac))?
        };
        whole
            .checked_mul(Self::UNIT.0)
            .and_then(|w| w.checked_add(frac_raw))
            .map(Self)
            .ok_or(TypesError::AmountOverflow)
    }
}

/// `u128::from_str` tolerates a leading `+`; amounts are plain digits only.
fn parse_digits(s: &str) -> Result<u128, TypesError> {
    if !s.bytes().all(|b| b.is_ascii_digit()) {
        return Err(TypesError::InvalidAmount(format!("not a decimal number: {}", s)));
    }
    Ok(s.parse()?)
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Amount({})", self.0)
    }
}

/// Parses either a bare integer of smallest units (`"100"`) or a decimal
/// quantity of whole units (`"0.1"`, `"5 units"`).
impl FromStr for Amount {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(TypesError::InvalidAmount("empty string".to_string()));
        }

        let stripped = s
            .strip_suffix("units")
            .or_else(|| s.strip_suffix("unit"))
            .map(str::trim_end);

        match stripped {
            Some(units) => Self::parse_units(units),
            None if s.contains('.') => Self::parse_units(s),
            None => parse_digits(s).map(Self),
        }
    }
}

impl From<u128> for Amount {
    fn from(raw: u128) -> Self {
        Self(raw)
    }
}

impl From<u64> for Amount {
    fn from(raw: u64) -> Self {
        Self(raw as u128)
    }
}

impl Sum for Amount {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, |acc, a| acc.saturating_add(a))
    }
}
