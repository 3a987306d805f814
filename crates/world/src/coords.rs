//! Absolute and `~`-relative coordinate literals.

use mdinspect_core::Class;
use mdinspect_engine::ParseError;

/// A coordinate typed by the user, possibly relative to the sender.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CoordArg {
    /// Used as given.
    Absolute(f64),
    /// Offset from the base coordinate.
    Relative(f64),
}

impl CoordArg {
    /// Parse `12.5`, `~` or `~-3`.
    pub fn parse(s: &str, class: &Class) -> Result<Self, ParseError> {
        let s = s.trim();
        if let Some(rest) = s.strip_prefix('~') {
            if rest.is_empty() {
                return Ok(Self::Relative(0.0));
            }
            let delta = rest
                .parse::<f64>()
                .map_err(|_| ParseError::new(s, class, "invalid relative coordinate"))?;
            return Ok(Self::Relative(delta));
        }
        let value = s
            .parse::<f64>()
            .map_err(|_| ParseError::new(s, class, "invalid coordinate"))?;
        Ok(Self::Absolute(value))
    }

    /// Resolve against `base`.
    pub fn resolve(self, base: f64) -> f64 {
        match self {
            Self::Absolute(v) => v,
            Self::Relative(delta) => base + delta,
        }
    }

    /// Whether the coordinate depends on a base.
    pub fn is_relative(self) -> bool {
        matches!(self, Self::Relative(_))
    }
}

/// A block coordinate typed by the user, possibly relative to the sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockCoordArg {
    /// Used as given.
    Absolute(i32),
    /// Offset from the base coordinate.
    Relative(i32),
}

impl BlockCoordArg {
    /// Parse `12`, `~` or `~-3`.
    pub fn parse(s: &str, class: &Class) -> Result<Self, ParseError> {
        let s = s.trim();
        if let Some(rest) = s.strip_prefix('~') {
            if rest.is_empty() {
                return Ok(Self::Relative(0));
            }
            let delta = rest
                .parse::<i32>()
                .map_err(|_| ParseError::new(s, class, "invalid relative block coordinate"))?;
            return Ok(Self::Relative(delta));
        }
        let value = s
            .parse::<i32>()
            .map_err(|_| ParseError::new(s, class, "invalid block coordinate"))?;
        Ok(Self::Absolute(value))
    }

    /// Resolve against `base`.
    pub fn resolve(self, base: i32) -> i32 {
        match self {
            Self::Absolute(v) => v,
            Self::Relative(delta) => base.saturating_add(delta),
        }
    }

    /// Whether the coordinate depends on a base.
    pub fn is_relative(self) -> bool {
        matches!(self, Self::Relative(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mdinspect_core::DOUBLE;

    #[test]
    fn parses_absolute_and_relative() {
        assert_eq!(CoordArg::parse("12.5", &DOUBLE).unwrap(), CoordArg::Absolute(12.5));
        assert_eq!(CoordArg::parse("~", &DOUBLE).unwrap(), CoordArg::Relative(0.0));
        assert_eq!(CoordArg::parse(" ~-3 ", &DOUBLE).unwrap(), CoordArg::Relative(-3.0));
        assert!(CoordArg::parse("~x", &DOUBLE).is_err());
        assert_eq!(BlockCoordArg::parse("~2", &DOUBLE).unwrap().resolve(10), 12);
        assert_eq!(BlockCoordArg::Relative(1).resolve(i32::MAX), i32::MAX);
        assert!(BlockCoordArg::parse("1.5", &DOUBLE).is_err());
    }
}
