//! Static price table and display labels.
//!
//! Prices are a total function of [`Subtype`]; there is no (category, subtype)
//! pair that can fail to resolve.

use crate::types::{
    BeverageKind, Category, FrozenKind, Money, SnackKind, StationeryKind, Subtype,
};

/// Unit price for a subtype
#[must_use]
pub const fn price_for(subtype: Subtype) -> Money {
    let units = match subtype {
        Subtype::Beverage(BeverageKind::Water) => 2,
        Subtype::Beverage(BeverageKind::Milk) => 3,
        Subtype::Beverage(BeverageKind::FrozenPop) | Subtype::Frozen(FrozenKind::Popsicle) => 5,
        Subtype::Snack(_) => 5,
        Subtype::Stationery(kind) => match kind {
            StationeryKind::Pencil => 5,
            StationeryKind::Pen => 7,
            StationeryKind::Eraser => 4,
            StationeryKind::Sharpener => 3,
            StationeryKind::CorrectionFluid => 12,
            StationeryKind::Glue => 8,
        },
    };
    Money::from_units(units)
}

impl Category {
    /// Every category, in display order
    pub const ALL: [Self; 4] = [
        Self::BeverageSnacks,
        Self::FrozenTreats,
        Self::PackagedSnacks,
        Self::Stationery,
    ];

    /// Section heading
    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Self::BeverageSnacks => "Sabalitos Disponibles",
            Self::FrozenTreats => "Paletas y Helados",
            Self::PackagedSnacks => "Frituras",
            Self::Stationery => "Papelería",
        }
    }

    /// Short tab label
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::BeverageSnacks => "Sabalitos",
            Self::FrozenTreats => "Paletas",
            Self::PackagedSnacks => "Frituras",
            Self::Stationery => "Papelería",
        }
    }

    /// Tab icon
    #[must_use]
    pub const fn icon(self) -> &'static str {
        match self {
            Self::BeverageSnacks => "🍧",
            Self::FrozenTreats => "🍭",
            Self::PackagedSnacks => "🍿",
            Self::Stationery => "📚",
        }
    }

    /// Subtypes offered when adding a product to this category
    #[must_use]
    pub const fn subtypes(self) -> &'static [Subtype] {
        match self {
            Self::BeverageSnacks => &[
                Subtype::Beverage(BeverageKind::Water),
                Subtype::Beverage(BeverageKind::Milk),
                Subtype::Beverage(BeverageKind::FrozenPop),
            ],
            Self::FrozenTreats => &[Subtype::Frozen(FrozenKind::Popsicle)],
            Self::PackagedSnacks => &[
                Subtype::Snack(SnackKind::Popcorn),
                Subtype::Snack(SnackKind::PorkRinds),
                Subtype::Snack(SnackKind::Chips),
                Subtype::Snack(SnackKind::Other),
            ],
            Self::Stationery => &[
                Subtype::Stationery(StationeryKind::Pencil),
                Subtype::Stationery(StationeryKind::Pen),
                Subtype::Stationery(StationeryKind::Eraser),
                Subtype::Stationery(StationeryKind::Sharpener),
                Subtype::Stationery(StationeryKind::CorrectionFluid),
                Subtype::Stationery(StationeryKind::Glue),
            ],
        }
    }

    /// `(subtype, price)` pairs for an add-product dialog
    #[must_use]
    pub fn type_options(self) -> Vec<(Subtype, Money)> {
        self.subtypes()
            .iter()
            .map(|&subtype| (subtype, price_for(subtype)))
            .collect()
    }
}

impl Subtype {
    /// Option label shown in the add-product dialog
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Beverage(BeverageKind::Water) => "Agua",
            Self::Beverage(BeverageKind::Milk) => "Leche",
            Self::Beverage(BeverageKind::FrozenPop) | Self::Frozen(FrozenKind::Popsicle) => "Paletas",
            Self::Snack(SnackKind::Popcorn) => "Palomitas",
            Self::Snack(SnackKind::PorkRinds) => "Chicharrones",
            Self::Snack(SnackKind::Chips) => "Papas",
            Self::Snack(SnackKind::Other) => "Otros",
            Self::Stationery(StationeryKind::Pencil) => "Lápices",
            Self::Stationery(StationeryKind::Pen) => "Lapiceros",
            Self::Stationery(StationeryKind::Eraser) => "Borradores",
            Self::Stationery(StationeryKind::Sharpener) => "Sacapuntas",
            Self::Stationery(StationeryKind::CorrectionFluid) => "Corrector",
            Self::Stationery(StationeryKind::Glue) => "Pegamento",
        }
    }

    /// Heading of the grouped inventory sub-section for this subtype
    #[must_use]
    pub const fn section_title(self) -> &'static str {
        match self {
            Self::Beverage(BeverageKind::Water) => "De Agua",
            Self::Beverage(BeverageKind::Milk) => "De Leche",
            Self::Snack(SnackKind::Chips) => "Papas Fritas",
            Self::Snack(SnackKind::Other) => "Otras Frituras",
            other => other.label(),
        }
    }
}
