// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! BGP AS numbers and AS-path prepend lists

use std::fmt::Display;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;

/// A BGP autonomous system number.
///
/// Accepted textual forms are asplain (`65001`) and asdot (`1.10`). The reserved values 0 and
/// 4294967295 are rejected.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Asn(u32);

impl Asn {
    pub const MIN: u32 = 1;
    pub const MAX: u32 = u32::MAX - 1;

    pub fn new(value: u32) -> Result<Self, ConfigError> {
        if (Self::MIN..=Self::MAX).contains(&value) {
            Ok(Self(value))
        } else {
            Err(ConfigError::InvalidAsn(value.to_string()))
        }
    }
    #[must_use]
    pub fn as_u32(self) -> u32 {
        self.0
    }
}

impl FromStr for Asn {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ConfigError::InvalidAsn(s.to_string());
        let digits = |part: &str| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit());
        let value = match s.split_once('.') {
            None if digits(s) => s.parse::<u32>().map_err(|_| invalid())?,
            Some((high, low)) if digits(high) && digits(low) => {
                let high = high.parse::<u16>().map_err(|_| invalid())?;
                let low = low.parse::<u16>().map_err(|_| invalid())?;
                (u32::from(high) << 16) | u32::from(low)
            }
            _ => return Err(invalid()),
        };
        Self::new(value).map_err(|_| invalid())
    }
}

impl TryFrom<String> for Asn {
    type Error = ConfigError;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Asn> for String {
    fn from(value: Asn) -> Self {
        value.to_string()
    }
}

impl Display for Asn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An ordered list of AS numbers to prepend on the routes advertised in one direction of an
/// attachment. The empty path means "no prepending".
#[derive(Clone, Debug, Default, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AsPath(Vec<Asn>);

impl AsPath {
    /// Longest prepend list the controller accepts.
    pub const MAX_LEN: usize = 25;

    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Parse a list of textual AS numbers.
    ///
    /// # Errors
    ///
    /// Fails on the first token that is not a legal AS number.
    pub fn parse<I, S>(tokens: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        tokens
            .into_iter()
            .map(|token| token.as_ref().trim().parse())
            .collect::<Result<Vec<Asn>, _>>()
            .map(Self)
    }

    /// Check the length bound. `side` names the direction in the error.
    pub fn validate(&self, side: &'static str) -> Result<(), ConfigError> {
        if self.0.len() > Self::MAX_LEN {
            return Err(ConfigError::AsPathTooLong(side, self.0.len()));
        }
        Ok(())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }
    pub fn iter(&self) -> impl Iterator<Item = &Asn> {
        self.0.iter()
    }
}

impl From<Vec<Asn>> for AsPath {
    fn from(value: Vec<Asn>) -> Self {
        Self(value)
    }
}

/// Space separated, which is what the controller expects on the wire.
impl Display for AsPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (index, asn) in self.0.iter().enumerate() {
            if index > 0 {
                write!(f, " ")?;
            }
            write!(f, "{asn}")?;
        }
        Ok(())
    }
}

#[cfg(any(test, feature = "bolero"))]
mod contract {
    use crate::aspath::{AsPath, Asn};
    use bolero::{Driver, TypeGenerator};

    impl TypeGenerator for Asn {
        fn generate<D: Driver>(driver: &mut D) -> Option<Self> {
            Some(Asn(driver.produce::<u32>()?.clamp(Asn::MIN, Asn::MAX)))
        }
    }

    impl TypeGenerator for AsPath {
        fn generate<D: Driver>(driver: &mut D) -> Option<Self> {
            let len = driver.produce::<usize>()? % (AsPath::MAX_LEN + 1);
            let mut path = Vec::with_capacity(len);
            for _ in 0..len {
                path.push(driver.produce()?);
            }
            Some(AsPath(path))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn asplain_and_asdot() {
        assert_eq!("65001".parse::<Asn>().unwrap().as_u32(), 65001);
        assert_eq!("4294967294".parse::<Asn>().unwrap().as_u32(), u32::MAX - 1);
        assert_eq!("1.10".parse::<Asn>().unwrap().as_u32(), 65546);
        assert_eq!("0.1".parse::<Asn>().unwrap().as_u32(), 1);
    }

    #[test]
    fn illegal_asns() {
        for bad in [
            "", "0", "0.0", "4294967295", "4294967296", "-1", "+5", "65001a", "1.", ".1",
            "65536.1", "1.2.3", " ",
        ] {
            assert_eq!(
                bad.parse::<Asn>(),
                Err(ConfigError::InvalidAsn(bad.to_string())),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn path_parse_and_display() {
        let path = AsPath::parse(["65001", "65001", " 65002 "]).unwrap();
        assert_eq!(path.len(), 3);
        assert_eq!(path.to_string(), "65001 65001 65002");
        assert!(AsPath::empty().to_string().is_empty());
        assert_eq!(
            AsPath::parse(["65001", "bogus"]),
            Err(ConfigError::InvalidAsn("bogus".to_string()))
        );
    }

    #[test]
    fn generated_paths_are_valid() {
        bolero::check!().with_type().for_each(|path: &AsPath| {
            assert!(path.validate("spoke").is_ok());
            let tokens = path.iter().map(ToString::to_string).collect::<Vec<_>>();
            assert_eq!(&AsPath::parse(tokens).unwrap(), path);
        });
    }

    #[test]
    fn path_length_bound() {
        let at_limit = AsPath::parse(vec!["65000"; AsPath::MAX_LEN]).unwrap();
        assert!(at_limit.validate("spoke").is_ok());
        let over = AsPath::parse(vec!["65000"; AsPath::MAX_LEN + 1]).unwrap();
        assert_eq!(
            over.validate("spoke"),
            Err(ConfigError::AsPathTooLong("spoke", AsPath::MAX_LEN + 1))
        );
    }
}
