use serde::{Deserialize, Serialize};

/// Independent, optionally-disabled integer ceilings bounding one
/// reconciliation run. `None` disables a cap.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapSet {
    max_total: Option<u32>,
    max_theme: Option<u32>,
    max_epoch_theme: Option<u32>,
    max_new: Option<u32>,
}

impl CapSet {
    /// Creates a cap set from explicit ceilings.
    #[must_use]
    pub const fn new(
        max_total: Option<u32>,
        max_theme: Option<u32>,
        max_epoch_theme: Option<u32>,
        max_new: Option<u32>,
    ) -> Self {
        Self {
            max_total,
            max_theme,
            max_epoch_theme,
            max_new,
        }
    }

    /// Creates a cap set with every ceiling disabled.
    #[must_use]
    pub const fn unbounded() -> Self {
        Self::new(None, None, None, None)
    }

    /// Creates a cap set from loosely-typed caller input: absent or
    /// non-positive values disable the corresponding cap.
    #[must_use]
    pub fn from_raw(
        max_total: Option<i64>,
        max_theme: Option<i64>,
        max_epoch_theme: Option<i64>,
        max_new: Option<i64>,
    ) -> Self {
        Self::new(
            sanitize(max_total),
            sanitize(max_theme),
            sanitize(max_epoch_theme),
            sanitize(max_new),
        )
    }

    /// Ceiling on total records of this kind within bounds.
    #[must_use]
    pub const fn max_total(&self) -> Option<u32> {
        self.max_total
    }

    /// Ceiling on records of this theme within bounds.
    #[must_use]
    pub const fn max_theme(&self) -> Option<u32> {
        self.max_theme
    }

    /// Ceiling on records of this (epoch, theme) pair within bounds.
    #[must_use]
    pub const fn max_epoch_theme(&self) -> Option<u32> {
        self.max_epoch_theme
    }

    /// Ceiling on new insertions permitted in the current run.
    #[must_use]
    pub const fn max_new(&self) -> Option<u32> {
        self.max_new
    }
}

fn sanitize(value: Option<i64>) -> Option<u32> {
    value.and_then(|value| {
        if value <= 0 {
            None
        } else {
            Some(u32::try_from(value).unwrap_or(u32::MAX))
        }
    })
}

/// Names of the individual caps, used to explain which ceilings bind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapKind {
    /// The ceiling on total records within bounds.
    Total,
    /// The ceiling on records of the wave's theme within bounds.
    Theme,
    /// The ceiling on records of the wave's (epoch, theme) pair.
    EpochTheme,
    /// The ceiling on new insertions this run.
    NewPerRun,
}

#[cfg(test)]
mod tests {
    use super::CapSet;

    #[test]
    fn non_positive_raw_values_disable_caps() {
        let caps = CapSet::from_raw(Some(0), Some(-3), None, Some(12));
        assert_eq!(caps.max_total(), None);
        assert_eq!(caps.max_theme(), None);
        assert_eq!(caps.max_epoch_theme(), None);
        assert_eq!(caps.max_new(), Some(12));
    }

    #[test]
    fn oversized_raw_values_saturate() {
        let caps = CapSet::from_raw(Some(i64::MAX), None, None, None);
        assert_eq!(caps.max_total(), Some(u32::MAX));
    }
}
