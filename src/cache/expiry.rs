//! TTL constants and presets

/// Sentinel stored in place of a TTL or deadline for entries that never expire
pub const NEVER: i64 = -1;

/// Lifetime of the placeholder written back by an anti-stampede refill
pub const RUSH_SECONDS: i64 = 2 * 60;

/// Named TTLs offered as caller convenience
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TtlPreset {
    Second,
    Minute,
    Hour,
    Day,
    Week,
    /// Thirty days
    Month,
    /// 365 days
    Year,
}

impl TtlPreset {
    /// Returns the preset's length in seconds
    pub const fn as_seconds(self) -> i64 {
        match self {
            TtlPreset::Second => 1,
            TtlPreset::Minute => 60,
            TtlPreset::Hour => 60 * 60,
            TtlPreset::Day => 60 * 60 * 24,
            TtlPreset::Week => 60 * 60 * 24 * 7,
            TtlPreset::Month => 60 * 60 * 24 * 30,
            TtlPreset::Year => 60 * 60 * 24 * 365,
        }
    }
}

impl From<TtlPreset> for i64 {
    fn from(preset: TtlPreset) -> Self {
        preset.as_seconds()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preset_seconds() {
        assert_eq!(TtlPreset::Second.as_seconds(), 1);
        assert_eq!(TtlPreset::Minute.as_seconds(), 60);
        assert_eq!(TtlPreset::Hour.as_seconds(), 3_600);
        assert_eq!(TtlPreset::Day.as_seconds(), 86_400);
        assert_eq!(TtlPreset::Week.as_seconds(), 604_800);
        assert_eq!(TtlPreset::Month.as_seconds(), 2_592_000);
        assert_eq!(TtlPreset::Year.as_seconds(), 31_536_000);
    }

    #[test]
    fn test_preset_into_i64() {
        let ttl: i64 = TtlPreset::Hour.into();
        assert_eq!(ttl, 3_600);
    }
}
