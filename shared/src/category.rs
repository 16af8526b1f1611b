use serde::{Deserialize, Serialize};

/// Palette shared by the building circles, the legend and the pie chart,
/// indexed by category 0..=4.
pub const CATEGORY_PALETTE: [&str; 5] = ["#cccccc", "#2a630e", "#d1d569", "#d57438", "#cd2667"];

/// Colour for buildings without an assessment (category 0 or unknown).
pub const NO_DATA_COLOR: &str = "#cccccc";

/// Assessed damage severity. 1..=4 are graded, 0 means "not assessed".
///
/// Serialized as the bare integer, which also makes it usable as a JSON
/// object key (`{"2": 30}`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DamageCategory(pub u8);

impl DamageCategory {
    pub const NO_DATA: Self = Self(0);
    pub const MAX: u8 = 4;

    pub const fn value(self) -> u8 {
        self.0
    }

    pub const fn has_data(self) -> bool {
        self.0 >= 1 && self.0 <= Self::MAX
    }

    pub fn color_hex(self) -> &'static str {
        CATEGORY_PALETTE
            .get(self.0 as usize)
            .copied()
            .unwrap_or(NO_DATA_COLOR)
    }

    pub fn label(self) -> String {
        format!("Category {}", self.0)
    }

    /// All categories the palette knows about, in ascending order.
    pub fn all() -> impl Iterator<Item = Self> {
        (0..=Self::MAX).map(Self)
    }
}

impl From<u8> for DamageCategory {
    fn from(value: u8) -> Self {
        Self(value)
    }
}

impl std::fmt::Display for DamageCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
