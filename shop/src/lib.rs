//! # Sabalitos Shop
//!
//! Point-of-sale and inventory engine for a small snack shop: a product
//! catalog with stock, a pending-sale cart, an append-only sales ledger,
//! low-stock alerts with rate-limited notifications, and period reports.
//!
//! All state lives in [`ShopState`] and changes only through [`ShopReducer`].
//! Persistence writes are debounced per blob and notifications are
//! fire-and-forget; both are effects executed by the runtime `Store`.
//!
//! ## Example
//!
//! ```no_run
//! use sabalitos_core::environment::SystemClock;
//! use sabalitos_runtime::Store;
//! use sabalitos_shop::{
//!     InMemoryStore, ShopAction, ShopEnvironment, ShopReducer, ShopState, TracingNotifier,
//! };
//! use std::sync::Arc;
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let env = ShopEnvironment::new(
//!     Arc::new(SystemClock),
//!     Arc::new(InMemoryStore::new()),
//!     Arc::new(TracingNotifier),
//! );
//! let store = Store::new(ShopState::new(), ShopReducer::new(), env);
//!
//! store.send(ShopAction::Load).await?.wait().await;
//! let products = store.state(|s| s.catalog.len()).await;
//! # let _ = products;
//! # Ok(())
//! # }
//! ```

pub mod alerts;
pub mod cart;
pub mod catalog;
pub mod config;
pub mod environment;
pub mod error;
pub mod input;
pub mod inventory;
pub mod ledger;
pub mod notifier;
pub mod persistence;
pub mod pricing;
pub mod reducer;
pub mod reports;
pub mod state;
pub mod types;

pub use alerts::{AlertPolicy, AlertState, NOTIFICATION_TITLE};
pub use cart::{Cart, CartChange};
pub use catalog::{Catalog, CategorySection, SubtypeGroup};
pub use config::{ConfigError, ShopConfig};
pub use environment::ShopEnvironment;
pub use error::ShopError;
pub use input::{parse_quantity, parse_sale_quantity, AdjustDirection, StockAdjustment};
pub use ledger::SalesLedger;
pub use notifier::{Notifier, NotifyError, RecordingNotifier, TracingNotifier};
pub use persistence::{
    InMemoryStore, JsonFileStore, Persistence, PersistenceError, Snapshot, StorageKey, WriteGate,
};
pub use pricing::price_for;
pub use reducer::{ShopReducer, FEEDBACK_EFFECT_ID};
pub use reports::{Period, ReportView, SalesReport, TransactionFeed};
pub use state::{Feedback, FeedbackKind, ShopAction, ShopState};
pub use types::{
    Alert, AlertLevel, BeverageKind, CartEntry, Category, FrozenKind, Money, NotificationRequest,
    Product, ProductId, SaleId, SaleRecord, SnackKind, StationeryKind, Subtype,
};
