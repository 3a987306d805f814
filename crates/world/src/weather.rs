//! Weather state exposed as a reflectable enum.

use mdinspect_core::reflect_enum;
use serde::{Deserialize, Serialize};

/// Weather state affecting ambient lighting and gameplay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WeatherState {
    /// Clear skies, no precipitation.
    #[default]
    Clear,
    /// Active precipitation (rain in warm biomes, snow in cold biomes).
    Precipitation,
    /// Active precipitation plus thunder/lightning.
    Thunderstorm,
}

reflect_enum!(WeatherState, WEATHER_STATE, "WeatherState", "world::WeatherState", {
    Clear => "CLEAR",
    Precipitation => "PRECIPITATION",
    Thunderstorm => "THUNDERSTORM",
});

impl WeatherState {
    /// Check if currently raining/snowing.
    pub fn is_precipitating(self) -> bool {
        matches!(self, Self::Precipitation | Self::Thunderstorm)
    }

    /// Check if currently thundering.
    pub fn is_thundering(self) -> bool {
        self == Self::Thunderstorm
    }

    /// Weather-modified skylight scalar.
    pub fn skylight_modifier(self) -> f32 {
        match self {
            Self::Clear => 1.0,
            Self::Precipitation => 0.85,
            Self::Thunderstorm => 0.78,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mdinspect_core::{EnumConstant, Reflect};

    #[test]
    fn constants_resolve_case_insensitively() {
        let rain = WEATHER_STATE.enum_constant("precipitation").expect("constant");
        assert_eq!(rain.to_text(), "PRECIPITATION");
        assert_eq!(WeatherState::Thunderstorm.ordinal(), 2);
        assert!(WEATHER_STATE.enum_constant("snow").is_none());
    }

    #[test]
    fn precipitation_reduces_skylight() {
        assert_eq!(WeatherState::Clear.skylight_modifier(), 1.0);
        assert!(WeatherState::Precipitation.is_precipitating());
        assert!(WeatherState::Thunderstorm.is_thundering());
        assert!(WeatherState::Thunderstorm.skylight_modifier() < WeatherState::Precipitation.skylight_modifier());
        assert_eq!(WeatherState::Clear.class(), &WEATHER_STATE);
    }
}
