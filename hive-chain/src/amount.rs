//! A restricted integer type for monetary values.

use std::{
    cmp::Ordering,
    fmt, io,
    marker::PhantomData,
    ops::{Add, AddAssign, Neg, Sub, SubAssign},
};

use thiserror::Error;

use crate::serialization::{BitcoinDeserialize, BitcoinSerialize, SerializationError};

#[cfg(any(test, feature = "proptest-impl"))]
use proptest_derive::Arbitrary;

/// The number of satoshi-equivalent units in one whole coin.
pub const COIN: i64 = 100_000_000;

/// The maximum number of units that can ever exist, `21_000_000 * COIN`.
pub const MAX_MONEY: i64 = 21_000_000 * COIN;

/// Marker for `Amount`s allowed to be zero or positive.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct NonNegative;

/// Marker for `Amount`s allowed to be negative, zero, or positive (used for
/// fee deltas and net value computations).
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct NegativeAllowed;

/// An amount of the chain's native unit, bounded to `[0, MAX_MONEY]` (for
/// `NonNegative`) or `[-MAX_MONEY, MAX_MONEY]` (for `NegativeAllowed`).
#[derive(Copy, Clone, Eq, PartialEq, Hash)]
#[cfg_attr(any(test, feature = "proptest-impl"), derive(Arbitrary))]
pub struct Amount<C>(i64, PhantomData<C>);

/// An error constructing or operating on an [`Amount`].
#[derive(Error, Clone, Debug, Eq, PartialEq)]
pub enum Error {
    #[error("invalid amount {0}: amounts must be in range {1}..={2}")]
    Constraint(i64, i64, i64),
    #[error("amount addition overflowed")]
    Addition,
    #[error("amount subtraction overflowed")]
    Subtraction,
}

impl Amount<NonNegative> {
    pub const fn zero() -> Self {
        Amount(0, PhantomData)
    }
}

impl<C> Amount<C> {
    pub fn try_new(value: i64, lower: i64, upper: i64) -> Result<Amount<C>, Error> {
        if value < lower || value > upper {
            return Err(Error::Constraint(value, lower, upper));
        }
        Ok(Amount(value, PhantomData))
    }

    pub const fn raw(&self) -> i64 {
        self.0
    }
}

impl Amount<NonNegative> {
    pub fn new(value: i64) -> Result<Self, Error> {
        Self::try_new(value, 0, MAX_MONEY)
    }
}

impl Amount<NegativeAllowed> {
    pub fn new(value: i64) -> Result<Self, Error> {
        Self::try_new(value, -MAX_MONEY, MAX_MONEY)
    }
}

impl From<Amount<NonNegative>> for Amount<NegativeAllowed> {
    fn from(amount: Amount<NonNegative>) -> Self {
        Amount(amount.0, PhantomData)
    }
}

impl<C> fmt::Debug for Amount<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Amount").field(&self.0).finish()
    }
}

impl<C> fmt::Display for Amount<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl Add for Amount<NonNegative> {
    type Output = Result<Amount<NonNegative>, Error>;
    fn add(self, rhs: Self) -> Self::Output {
        self.0
            .checked_add(rhs.0)
            .ok_or(Error::Addition)
            .and_then(Amount::new)
    }
}

impl AddAssign<Amount<NonNegative>> for Amount<NonNegative> {
    fn add_assign(&mut self, rhs: Amount<NonNegative>) {
        *self = (*self + rhs).expect("amount sum does not overflow MAX_MONEY");
    }
}

impl Sub for Amount<NonNegative> {
    type Output = Result<Amount<NegativeAllowed>, Error>;
    fn sub(self, rhs: Self) -> Self::Output {
        self.0
            .checked_sub(rhs.0)
            .ok_or(Error::Subtraction)
            .and_then(Amount::new)
    }
}

impl SubAssign<Amount<NonNegative>> for Amount<NegativeAllowed> {
    fn sub_assign(&mut self, rhs: Amount<NonNegative>) {
        *self = (*self - Amount::<NegativeAllowed>::from(rhs)).expect("fits NegativeAllowed");
    }
}

impl Sub for Amount<NegativeAllowed> {
    type Output = Result<Amount<NegativeAllowed>, Error>;
    fn sub(self, rhs: Self) -> Self::Output {
        self.0
            .checked_sub(rhs.0)
            .ok_or(Error::Subtraction)
            .and_then(Amount::new)
    }
}

impl Neg for Amount<NegativeAllowed> {
    type Output = Amount<NegativeAllowed>;
    fn neg(self) -> Self::Output {
        Amount(-self.0, PhantomData)
    }
}

impl<C> BitcoinSerialize for Amount<C> {
    fn bitcoin_serialize<W: io::Write>(&self, target: W) -> Result<(), io::Error> {
        self.0.bitcoin_serialize(target)
    }
}

impl BitcoinDeserialize for Amount<NonNegative> {
    fn bitcoin_deserialize<R: io::Read>(reader: R) -> Result<Self, SerializationError> {
        let raw = i64::bitcoin_deserialize(reader)?;
        Amount::new(raw).map_err(|_| SerializationError::Parse("amount out of range"))
    }
}

impl std::convert::TryFrom<i64> for Amount<NonNegative> {
    type Error = Error;
    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Amount::new(value)
    }
}

impl std::convert::TryFrom<u64> for Amount<NonNegative> {
    type Error = Error;
    fn try_from(value: u64) -> Result<Self, Self::Error> {
        i64::try_from(value)
            .map_err(|_| Error::Constraint(i64::MAX, 0, MAX_MONEY))
            .and_then(Amount::new)
    }
}

impl std::convert::TryFrom<i64> for Amount<NegativeAllowed> {
    type Error = Error;
    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Amount::new(value)
    }
}

impl<C> PartialOrd for Amount<C> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.0.partial_cmp(&other.0)
    }
}

impl<C> Ord for Amount<C> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.cmp(&other.0)
    }
}
