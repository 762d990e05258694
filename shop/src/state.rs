//! Shop state and actions.

use crate::alerts::AlertState;
use crate::cart::Cart;
use crate::catalog::Catalog;
use crate::input::StockAdjustment;
use crate::ledger::SalesLedger;
use crate::persistence::{PersistenceError, Snapshot, StorageKey};
use crate::types::{Money, ProductId, Subtype};

/// Tone of an operator message
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FeedbackKind {
    /// Something completed
    Success,
    /// Neutral confirmation
    Info,
    /// Allowed but noteworthy (stock decrease, nothing to remove)
    Warning,
    /// Rejected input
    Error,
}

/// Transient operator message
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Feedback {
    /// Tone
    pub kind: FeedbackKind,
    /// Text shown to the operator
    pub message: String,
}

impl Feedback {
    /// Creates a message of the given kind
    #[must_use]
    pub fn new(kind: FeedbackKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// State of the shop
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShopState {
    /// Products on sale
    pub catalog: Catalog,
    /// Completed sales
    pub ledger: SalesLedger,
    /// The pending sale
    pub cart: Cart,
    /// Active alerts and notification cooldowns
    pub alerts: AlertState,
    /// Set until persisted data has been loaded (or failed to load)
    pub is_loading: bool,
    /// Latest operator message, cleared after a while
    pub feedback: Option<Feedback>,
    /// Bumped by every clear; writes encoded before a clear are dropped
    pub storage_generation: u64,
}

impl ShopState {
    /// Creates the state of a shop that has not loaded its data yet
    #[must_use]
    pub fn new() -> Self {
        Self {
            catalog: Catalog::new(),
            ledger: SalesLedger::new(),
            cart: Cart::new(),
            alerts: AlertState::new(),
            is_loading: true,
            feedback: None,
            storage_generation: 0,
        }
    }

    /// Creates a loaded state over an existing catalog and ledger
    #[must_use]
    pub fn loaded(catalog: Catalog, ledger: SalesLedger) -> Self {
        Self {
            catalog,
            ledger,
            is_loading: false,
            ..Self::new()
        }
    }

    /// Cart total at live prices
    #[must_use]
    pub fn cart_total(&self) -> Money {
        self.cart.total_cost(&self.catalog)
    }

    /// Units in the cart
    #[must_use]
    pub fn cart_items(&self) -> u32 {
        self.cart.total_items()
    }
}

impl Default for ShopState {
    fn default() -> Self {
        Self::new()
    }
}

/// Actions for the shop
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ShopAction {
    // Commands
    /// Load persisted data
    Load,
    /// Quick +/- adjustment, clamped at zero
    AdjustStock {
        /// Product to adjust
        id: ProductId,
        /// Signed change
        delta: i64,
    },
    /// Precise adjustment from the dialog; rejects removing more than is on hand
    ApplyStockAdjustment {
        /// Product to adjust
        id: ProductId,
        /// Validated adjustment
        adjustment: StockAdjustment,
    },
    /// Add a product with zero stock
    AddProduct {
        /// Id for the new product
        id: ProductId,
        /// Display name
        title: String,
        /// Kind, which also fixes the price
        subtype: Subtype,
    },
    /// Remove a product
    DeleteProduct {
        /// Product to remove
        id: ProductId,
    },
    /// Change a cart quantity by a signed amount
    UpdateCart {
        /// Product in the cart
        id: ProductId,
        /// Signed change
        delta: i64,
    },
    /// Set a cart quantity directly
    SetCartQuantity {
        /// Product in the cart
        id: ProductId,
        /// New quantity; zero or less removes the entry
        quantity: i64,
    },
    /// Empty the cart
    ClearCart,
    /// Record the cart as a sale
    ConfirmSale,
    /// Wipe the catalog, ledger and stored data
    ClearAllData,
    /// Hide the current operator message
    DismissFeedback,

    // Events
    /// Persisted data arrived (`None` on first run)
    Loaded {
        /// What was stored
        snapshot: Option<Snapshot>,
    },
    /// Persisted data could not be read
    LoadFailed {
        /// Why
        error: PersistenceError,
    },
    /// A debounced write is due
    Flush(StorageKey),
}

impl ShopAction {
    /// Builds an `AddProduct` command with a fresh id
    #[must_use]
    pub fn add_product(title: impl Into<String>, subtype: Subtype) -> Self {
        Self::AddProduct {
            id: ProductId::new(),
            title: title.into(),
            subtype,
        }
    }

    /// Whether this action changes the catalog, ledger or cart
    #[must_use]
    pub const fn is_mutation(&self) -> bool {
        matches!(
            self,
            Self::AdjustStock { .. }
                | Self::ApplyStockAdjustment { .. }
                | Self::AddProduct { .. }
                | Self::DeleteProduct { .. }
                | Self::UpdateCart { .. }
                | Self::SetCartQuantity { .. }
                | Self::ClearCart
                | Self::ConfirmSale
                | Self::ClearAllData
        )
    }
}
