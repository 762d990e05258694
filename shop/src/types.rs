//! Domain types for the shop.
//!
//! Products are identified by [`ProductId`], priced in [`Money`] and classified
//! by a [`Subtype`] that carries its own [`Category`], so a product can never
//! hold a subtype from a different category.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use uuid::Uuid;

// ============================================================================
// Identifiers
// ============================================================================

/// Unique identifier for a catalog product
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(Uuid);

impl ProductId {
    /// Creates a new random `ProductId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a `ProductId` from an existing UUID
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ProductId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a ledger line: `<unix millis>-<uuid>`
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SaleId(String);

impl SaleId {
    /// Generates an id whose prefix is the sale time
    #[must_use]
    pub fn generate(at: DateTime<Utc>) -> Self {
        Self(format!("{}-{}", at.timestamp_millis(), Uuid::new_v4()))
    }

    /// Returns the id as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SaleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// Money Value Object (cents-based to avoid floating point errors)
// ============================================================================

/// Represents money in cents to avoid floating-point arithmetic errors
///
/// Arithmetic saturates instead of overflowing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(u64);

impl Money {
    /// Zero
    pub const ZERO: Self = Self(0);

    /// Creates a `Money` value from cents
    #[must_use]
    pub const fn from_cents(cents: u64) -> Self {
        Self(cents)
    }

    /// Creates a `Money` value from whole currency units
    #[must_use]
    pub const fn from_units(units: u64) -> Self {
        Self(units.saturating_mul(100))
    }

    /// Returns the amount in cents
    #[must_use]
    pub const fn cents(&self) -> u64 {
        self.0
    }

    /// Checks if the amount is zero
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Adds two money amounts
    #[must_use]
    pub const fn saturating_add(self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }

    /// Multiplies money by a quantity
    #[must_use]
    pub const fn times(self, quantity: u32) -> Self {
        Self(self.0.saturating_mul(quantity as u64))
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Self::saturating_add)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}.{:02}", self.0 / 100, self.0 % 100)
    }
}

// ============================================================================
// Categories and subtypes
// ============================================================================

/// Top-level product category
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    /// Flavoured water/milk frozen cups and pops
    BeverageSnacks,
    /// Popsicles and ice creams
    FrozenTreats,
    /// Popcorn, pork rinds, chips
    PackagedSnacks,
    /// School supplies
    Stationery,
}

/// Kinds sold under [`Category::BeverageSnacks`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BeverageKind {
    /// Water based
    Water,
    /// Milk based
    Milk,
    /// Frozen pop
    FrozenPop,
}

/// Kinds sold under [`Category::FrozenTreats`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FrozenKind {
    /// Popsicle
    Popsicle,
}

/// Kinds sold under [`Category::PackagedSnacks`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SnackKind {
    /// Popcorn
    Popcorn,
    /// Pork rinds
    PorkRinds,
    /// Potato chips
    Chips,
    /// Anything else
    Other,
}

/// Kinds sold under [`Category::Stationery`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StationeryKind {
    /// Pencils
    Pencil,
    /// Pens
    Pen,
    /// Erasers
    Eraser,
    /// Sharpeners
    Sharpener,
    /// Correction fluid
    CorrectionFluid,
    /// Glue
    Glue,
}

/// A product subtype, tagged by the category it belongs to
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Subtype {
    /// Beverage snack
    Beverage(BeverageKind),
    /// Frozen treat
    Frozen(FrozenKind),
    /// Packaged snack
    Snack(SnackKind),
    /// Stationery item
    Stationery(StationeryKind),
}

impl Subtype {
    /// The category this subtype belongs to
    #[must_use]
    pub const fn category(self) -> Category {
        match self {
            Self::Beverage(_) => Category::BeverageSnacks,
            Self::Frozen(_) => Category::FrozenTreats,
            Self::Snack(_) => Category::PackagedSnacks,
            Self::Stationery(_) => Category::Stationery,
        }
    }
}

// ============================================================================
// Catalog and ledger records
// ============================================================================

/// A catalog entry
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    /// Assigned at creation, never changes
    pub id: ProductId,
    /// Display name (non-empty after trimming)
    pub title: String,
    /// Subtype, which also fixes the category
    pub subtype: Subtype,
    /// Unit price, taken from the price table at creation
    pub price: Money,
    /// Units on hand
    pub stock: u32,
}

impl Product {
    /// Category derived from the subtype
    #[must_use]
    pub const fn category(&self) -> Category {
        self.subtype.category()
    }
}

/// One line of a completed sale. Never mutated once appended.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleRecord {
    /// Unique id with a timestamp prefix
    pub id: SaleId,
    /// Product sold
    pub product_id: ProductId,
    /// Product title at sale time
    pub title: String,
    /// Product subtype at sale time
    pub subtype: Subtype,
    /// Product category at sale time
    pub category: Category,
    /// Units sold
    pub quantity_sold: u32,
    /// Price snapshot at sale time
    pub unit_price: Money,
    /// `quantity_sold * unit_price`
    pub total_revenue: Money,
    /// When the sale was confirmed
    pub timestamp: DateTime<Utc>,
}

/// A pending-sale line
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartEntry {
    /// Product being sold
    pub product_id: ProductId,
    /// Always at least 1 and at most the product's stock
    pub quantity: u32,
    /// Copied from the product when the entry was created
    pub subtype: Subtype,
}

// ============================================================================
// Alerts
// ============================================================================

/// Severity of a low-stock alert; products above the warning threshold have none
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AlertLevel {
    /// At or below the warning threshold
    Low,
    /// At or below the critical threshold, including out of stock
    Critical,
}

/// A derived low-stock alert
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alert {
    /// Product the alert is about
    pub product_id: ProductId,
    /// Alert headline
    pub title: String,
    /// Operator-facing message
    pub message: String,
    /// Severity
    pub level: AlertLevel,
    /// Stock when the alert was computed
    pub current_stock: u32,
}

/// A notification the alert engine wants delivered
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationRequest {
    /// Notification title
    pub title: String,
    /// Notification body
    pub body: String,
    /// Product the notification should open
    pub product_id: ProductId,
}
