//! Operator-facing errors.
//!
//! Every variant is recoverable: it is shown to the operator as transient
//! feedback and leaves state untouched. The `Display` text is that message.

use thiserror::Error;

/// Validation and stock-limit errors raised by the shop engines
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ShopError {
    /// Product title is empty after trimming
    #[error("El nombre del producto no puede estar vacío.")]
    EmptyTitle,

    /// A product with this id is already in the catalog
    #[error("El producto {0} ya existe.")]
    DuplicateProduct(crate::types::ProductId),

    /// Quantity entry is non-numeric, zero or negative
    #[error("Ingrese una cantidad válida: {input:?}")]
    InvalidQuantity {
        /// The raw entry
        input: String,
    },

    /// Cart quantity would exceed the stock on hand
    #[error("Límite de stock: solo quedan {available} unidades de {title}.")]
    StockLimit {
        /// Product title
        title: String,
        /// Units on hand
        available: u32,
    },

    /// A precise stock removal is larger than the stock on hand
    #[error("No puede restar {requested}. El stock restante de {title} es solo {available}.")]
    InsufficientStock {
        /// Product title
        title: String,
        /// Units the operator tried to remove
        requested: u32,
        /// Units on hand
        available: u32,
    },
}
