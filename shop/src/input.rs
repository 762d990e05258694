//! Parsing of operator-entered quantities.

use crate::error::ShopError;
use serde::{Deserialize, Serialize};

/// Parses a positive whole quantity
///
/// Surrounding whitespace is ignored. Non-numeric, fractional, zero and
/// negative entries are rejected.
///
/// # Errors
///
/// Returns [`ShopError::InvalidQuantity`] for anything but a positive integer.
pub fn parse_quantity(input: &str) -> Result<u32, ShopError> {
    match input.trim().parse::<u32>() {
        Ok(quantity) if quantity > 0 => Ok(quantity),
        _ => Err(ShopError::InvalidQuantity {
            input: input.to_string(),
        }),
    }
}

/// Parses a quantity to sell from the precise-entry dialog
///
/// # Errors
///
/// Returns [`ShopError::InvalidQuantity`] for an invalid entry and
/// [`ShopError::StockLimit`] when the quantity exceeds `available`.
pub fn parse_sale_quantity(input: &str, title: &str, available: u32) -> Result<u32, ShopError> {
    let quantity = parse_quantity(input)?;
    if quantity > available {
        return Err(ShopError::StockLimit {
            title: title.to_string(),
            available,
        });
    }
    Ok(quantity)
}

/// Whether a precise adjustment adds or removes stock
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdjustDirection {
    /// Restock
    Add,
    /// Write off
    Remove,
}

/// A validated precise stock adjustment (magnitude is never zero)
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StockAdjustment {
    direction: AdjustDirection,
    magnitude: u32,
}

impl StockAdjustment {
    /// Builds an adjustment
    ///
    /// # Errors
    ///
    /// Returns [`ShopError::InvalidQuantity`] when `magnitude` is zero.
    pub fn new(direction: AdjustDirection, magnitude: u32) -> Result<Self, ShopError> {
        if magnitude == 0 {
            return Err(ShopError::InvalidQuantity {
                input: magnitude.to_string(),
            });
        }
        Ok(Self {
            direction,
            magnitude,
        })
    }

    /// Parses the dialog entry for `direction`
    ///
    /// # Errors
    ///
    /// Returns [`ShopError::InvalidQuantity`] for anything but a positive integer.
    pub fn parse(direction: AdjustDirection, input: &str) -> Result<Self, ShopError> {
        Self::new(direction, parse_quantity(input)?)
    }

    /// Direction of the adjustment
    #[must_use]
    pub const fn direction(&self) -> AdjustDirection {
        self.direction
    }

    /// Units added or removed
    #[must_use]
    pub const fn magnitude(&self) -> u32 {
        self.magnitude
    }

    /// Signed stock change
    #[must_use]
    pub fn delta(&self) -> i64 {
        match self.direction {
            AdjustDirection::Add => i64::from(self.magnitude),
            AdjustDirection::Remove => -i64::from(self.magnitude),
        }
    }
}
