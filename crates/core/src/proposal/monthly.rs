//! Monthly disbursement vectors.

use rust_decimal::Decimal;
use serde::de::Error as _;
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::ops::{Add, AddAssign, Index, IndexMut};

/// Calendar month of the budget year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Month {
    /// January.
    Jan,
    /// February.
    Feb,
    /// March.
    Mar,
    /// April.
    Apr,
    /// May.
    May,
    /// June.
    Jun,
    /// July.
    Jul,
    /// August.
    Aug,
    /// September.
    Sep,
    /// October.
    Oct,
    /// November.
    Nov,
    /// December.
    Dec,
}

impl Month {
    /// All months in calendar order.
    pub const ALL: [Self; 12] = [
        Self::Jan,
        Self::Feb,
        Self::Mar,
        Self::Apr,
        Self::May,
        Self::Jun,
        Self::Jul,
        Self::Aug,
        Self::Sep,
        Self::Oct,
        Self::Nov,
        Self::Dec,
    ];

    /// Lower-case three letter abbreviation used in column names.
    #[must_use]
    pub const fn abbrev(&self) -> &'static str {
        match self {
            Self::Jan => "jan",
            Self::Feb => "feb",
            Self::Mar => "mar",
            Self::Apr => "apr",
            Self::May => "may",
            Self::Jun => "jun",
            Self::Jul => "jul",
            Self::Aug => "aug",
            Self::Sep => "sep",
            Self::Oct => "oct",
            Self::Nov => "nov",
            Self::Dec => "dec",
        }
    }

    /// Zero-based position in the year.
    #[must_use]
    pub const fn index(&self) -> usize {
        *self as usize
    }

    /// Parses an abbreviation (case-insensitive).
    #[must_use]
    pub fn parse(abbrev: &str) -> Option<Self> {
        let abbrev = abbrev.to_lowercase();
        Self::ALL.into_iter().find(|m| m.abbrev() == abbrev)
    }

    /// Column holding the planned amount for this month, e.g. `planned_jan`.
    #[must_use]
    pub fn planned_column(&self) -> String {
        format!("planned_{}", self.abbrev())
    }

    /// Column holding the executed amount for this month, e.g. `executed_jan`.
    #[must_use]
    pub fn executed_column(&self) -> String {
        format!("executed_{}", self.abbrev())
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.abbrev())
    }
}

/// Twelve monthly amounts, January first.
///
/// Serialized as a map keyed by month abbreviation; missing months read as zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MonthlyAmounts([Decimal; 12]);

impl MonthlyAmounts {
    /// All twelve months zero.
    pub const ZERO: Self = Self([Decimal::ZERO; 12]);

    /// Wraps an array of amounts.
    #[must_use]
    pub const fn new(amounts: [Decimal; 12]) -> Self {
        Self(amounts)
    }

    /// Builds a vector from `(month, amount)` pairs; unspecified months are zero.
    #[must_use]
    pub fn from_pairs(pairs: impl IntoIterator<Item = (Month, Decimal)>) -> Self {
        let mut amounts = Self::ZERO;
        for (month, amount) in pairs {
            amounts[month] = amount;
        }
        amounts
    }

    /// Amounts in calendar order.
    #[must_use]
    pub const fn as_array(&self) -> &[Decimal; 12] {
        &self.0
    }

    /// Iterates `(month, amount)` in calendar order.
    pub fn iter(&self) -> impl Iterator<Item = (Month, Decimal)> + '_ {
        Month::ALL.into_iter().zip(self.0.iter().copied())
    }

    /// Sum over the year, saturating at `Decimal::MAX`.
    #[must_use]
    pub fn total(&self) -> Decimal {
        self.0.iter().fold(Decimal::ZERO, |acc, a| acc.saturating_add(*a))
    }

    /// Sum over the year, `None` if it does not fit in a decimal.
    #[must_use]
    pub fn checked_total(&self) -> Option<Decimal> {
        self.0
            .iter()
            .try_fold(Decimal::ZERO, |acc, a| acc.checked_add(*a))
    }

    /// True if every month is zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0.iter().all(Decimal::is_zero)
    }

    /// First month holding a negative amount.
    #[must_use]
    pub fn first_negative(&self) -> Option<Month> {
        self.iter()
            .find(|(_, amount)| amount.is_sign_negative() && !amount.is_zero())
            .map(|(month, _)| month)
    }

    /// Quarter sums, Q1 first.
    #[must_use]
    pub fn quarters(&self) -> [Decimal; 4] {
        let mut quarters = [Decimal::ZERO; 4];
        for (i, amount) in self.0.iter().enumerate() {
            quarters[i / 3] = quarters[i / 3].saturating_add(*amount);
        }
        quarters
    }

    /// Half-year sums, first semester first.
    #[must_use]
    pub fn semesters(&self) -> [Decimal; 2] {
        let [q1, q2, q3, q4] = self.quarters();
        [q1.saturating_add(q2), q3.saturating_add(q4)]
    }
}

impl Index<Month> for MonthlyAmounts {
    type Output = Decimal;

    fn index(&self, month: Month) -> &Decimal {
        &self.0[month.index()]
    }
}

impl IndexMut<Month> for MonthlyAmounts {
    fn index_mut(&mut self, month: Month) -> &mut Decimal {
        &mut self.0[month.index()]
    }
}

impl Add for MonthlyAmounts {
    type Output = Self;

    fn add(mut self, rhs: Self) -> Self {
        self += rhs;
        self
    }
}

impl AddAssign for MonthlyAmounts {
    fn add_assign(&mut self, rhs: Self) {
        for (lhs, rhs) in self.0.iter_mut().zip(rhs.0) {
            *lhs = lhs.saturating_add(rhs);
        }
    }
}

impl Serialize for MonthlyAmounts {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(12))?;
        for (month, amount) in self.iter() {
            map.serialize_entry(month.abbrev(), &amount)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for MonthlyAmounts {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = BTreeMap::<String, Decimal>::deserialize(deserializer)?;
        let mut amounts = Self::ZERO;
        for (key, amount) in raw {
            let month = Month::parse(&key)
                .ok_or_else(|| D::Error::custom(format!("unknown month: {key}")))?;
            amounts[month] = amount;
        }
        Ok(amounts)
    }
}

/// Share of `part` in `whole` as a percentage with one decimal place.
///
/// A zero `whole` yields zero.
#[must_use]
pub fn percentage_of(part: Decimal, whole: Decimal) -> Decimal {
    if whole.is_zero() {
        Decimal::ZERO
    } else {
        (part / whole * Decimal::ONE_HUNDRED).round_dp(1)
    }
}
