//! Inventory Engine: every stock-affecting mutation of the catalog.
//!
//! Quick adjustments and sale decrements clamp at zero. Only the precise
//! adjustment dialog rejects a removal larger than the stock on hand.

use crate::cart::Cart;
use crate::catalog::Catalog;
use crate::error::ShopError;
use crate::input::{AdjustDirection, StockAdjustment};
use crate::ledger::SalesLedger;
use crate::pricing::price_for;
use crate::types::{Money, Product, ProductId, SaleId, SaleRecord, Subtype};
use chrono::{DateTime, Utc};

/// A stock level that actually changed
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StockChange {
    /// Product whose stock changed
    pub product_id: ProductId,
    /// Stock before
    pub previous: u32,
    /// Stock after
    pub current: u32,
}

impl StockChange {
    /// Signed difference `current - previous`
    #[must_use]
    pub fn delta(&self) -> i64 {
        i64::from(self.current) - i64::from(self.previous)
    }
}

/// Totals of a recorded sale
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SaleSummary {
    /// Ledger lines appended (one per distinct product)
    pub lines: usize,
    /// Units sold
    pub items: u32,
    /// Revenue of the batch
    pub total: Money,
    /// Stock levels the sale changed
    pub changes: Vec<StockChange>,
}

impl SaleSummary {
    /// Returns true when nothing was sold
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.lines == 0
    }
}

/// Sets `stock = max(0, stock + delta)`
///
/// Returns `None` when the product is unknown or the clamped stock equals the
/// current stock, in which case nothing downstream should react.
pub fn adjust_stock(catalog: &mut Catalog, id: ProductId, delta: i64) -> Option<StockChange> {
    let product = catalog.get_mut(id)?;
    let target = i64::from(product.stock).saturating_add(delta).max(0);
    let target = u32::try_from(target).unwrap_or(u32::MAX);

    if target == product.stock {
        return None;
    }

    let change = StockChange {
        product_id: id,
        previous: product.stock,
        current: target,
    };
    product.stock = target;
    Some(change)
}

/// Applies a precise adjustment from the adjustment dialog
///
/// Unknown products are a silent no-op (`Ok(None)`).
///
/// # Errors
///
/// Returns [`ShopError::InsufficientStock`] when removing more than the stock
/// on hand; the catalog is left untouched.
pub fn apply_adjustment(
    catalog: &mut Catalog,
    id: ProductId,
    adjustment: StockAdjustment,
) -> Result<Option<StockChange>, ShopError> {
    let Some(product) = catalog.get(id) else {
        return Ok(None);
    };

    if adjustment.direction() == AdjustDirection::Remove && adjustment.magnitude() > product.stock
    {
        return Err(ShopError::InsufficientStock {
            title: product.title.clone(),
            requested: adjustment.magnitude(),
            available: product.stock,
        });
    }

    Ok(adjust_stock(catalog, id, adjustment.delta()))
}

/// Adds a product with zero stock, priced from the price table
///
/// The title is stored trimmed.
///
/// # Errors
///
/// Returns [`ShopError::EmptyTitle`] if the trimmed title is empty and
/// [`ShopError::DuplicateProduct`] if `id` is already in use.
pub fn add_product(
    catalog: &mut Catalog,
    id: ProductId,
    title: &str,
    subtype: Subtype,
) -> Result<ProductId, ShopError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(ShopError::EmptyTitle);
    }
    if catalog.contains(id) {
        return Err(ShopError::DuplicateProduct(id));
    }

    catalog.push(Product {
        id,
        title: title.to_string(),
        subtype,
        price: price_for(subtype),
        stock: 0,
    });
    Ok(id)
}

/// Removes a product; unknown ids are a no-op
pub fn delete_product(catalog: &mut Catalog, id: ProductId) -> Option<Product> {
    catalog.remove(id)
}

/// Records the cart as a completed sale
///
/// Every entry with a positive quantity that references a known product
/// yields one [`SaleRecord`] priced at the current product price. Stock is
/// then decremented once per product by the summed quantity, clamped at
/// zero, and the whole batch is appended to the ledger in one step. Entries
/// for unknown products are skipped. The cart itself is not cleared.
pub fn record_sale(
    catalog: &mut Catalog,
    ledger: &mut SalesLedger,
    cart: &Cart,
    now: DateTime<Utc>,
) -> SaleSummary {
    let mut batch = Vec::with_capacity(cart.len());
    let mut sold: Vec<(ProductId, u32)> = Vec::with_capacity(cart.len());

    for entry in cart.entries() {
        if entry.quantity == 0 {
            continue;
        }
        let Some(product) = catalog.get(entry.product_id) else {
            tracing::debug!(product_id = %entry.product_id, "Skipping cart entry for unknown product");
            continue;
        };

        batch.push(SaleRecord {
            id: SaleId::generate(now),
            product_id: product.id,
            title: product.title.clone(),
            subtype: product.subtype,
            category: product.category(),
            quantity_sold: entry.quantity,
            unit_price: product.price,
            total_revenue: product.price.times(entry.quantity),
            timestamp: now,
        });

        match sold.iter_mut().find(|(id, _)| *id == product.id) {
            Some((_, total)) => *total = total.saturating_add(entry.quantity),
            None => sold.push((product.id, entry.quantity)),
        }
    }

    let changes = sold
        .into_iter()
        .filter_map(|(id, quantity)| adjust_stock(catalog, id, -i64::from(quantity)))
        .collect();

    let summary = SaleSummary {
        lines: batch.len(),
        items: batch
            .iter()
            .fold(0u32, |sum, r| sum.saturating_add(r.quantity_sold)),
        total: batch.iter().map(|r| r.total_revenue).sum(),
        changes,
    };

    ledger.append(batch);
    summary
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::{BeverageKind, Category, StationeryKind};
    use sabalitos_testing::test_instant;

    fn catalog_with(stocks: &[(&str, Subtype, u32)]) -> (Catalog, Vec<ProductId>) {
        let mut catalog = Catalog::new();
        let ids = stocks
            .iter()
            .map(|(title, subtype, stock)| {
                let id = add_product(&mut catalog, ProductId::new(), title, *subtype).unwrap();
                adjust_stock(&mut catalog, id, i64::from(*stock));
                id
            })
            .collect();
        (catalog, ids)
    }

    fn stock(catalog: &Catalog, id: ProductId) -> u32 {
        catalog.get(id).map_or(0, |p| p.stock)
    }

    #[test]
    fn adjust_stock_clamps_at_zero() {
        let (mut catalog, ids) =
            catalog_with(&[("Jamaica", Subtype::Beverage(BeverageKind::Water), 1)]);

        let change = adjust_stock(&mut catalog, ids[0], -5).unwrap();
        assert_eq!((change.previous, change.current), (1, 0));
        assert_eq!(stock(&catalog, ids[0]), 0);
    }

    #[test]
    fn adjust_stock_reports_no_op() {
        let (mut catalog, ids) =
            catalog_with(&[("Jamaica", Subtype::Beverage(BeverageKind::Water), 0)]);

        assert_eq!(adjust_stock(&mut catalog, ids[0], 0), None);
        assert_eq!(adjust_stock(&mut catalog, ids[0], -1), None);
        assert_eq!(adjust_stock(&mut catalog, ProductId::new(), 3), None);
    }

    #[test]
    fn set_absolute_is_a_delta() {
        let (mut catalog, ids) =
            catalog_with(&[("Jamaica", Subtype::Beverage(BeverageKind::Water), 7)]);

        let desired = 5;
        let delta = i64::from(desired) - i64::from(stock(&catalog, ids[0]));
        adjust_stock(&mut catalog, ids[0], delta);
        assert_eq!(stock(&catalog, ids[0]), 5);
    }

    #[test]
    fn precise_removal_rejects_going_negative() {
        let (mut catalog, ids) =
            catalog_with(&[("Lapicero", Subtype::Stationery(StationeryKind::Pen), 4)]);

        let remove = StockAdjustment::new(AdjustDirection::Remove, 9).unwrap();
        let err = apply_adjustment(&mut catalog, ids[0], remove).unwrap_err();
        assert_eq!(
            err,
            ShopError::InsufficientStock {
                title: "Lapicero".into(),
                requested: 9,
                available: 4
            }
        );
        assert_eq!(stock(&catalog, ids[0]), 4);

        let remove_all = StockAdjustment::new(AdjustDirection::Remove, 4).unwrap();
        let change = apply_adjustment(&mut catalog, ids[0], remove_all).unwrap();
        assert_eq!(change.map(|c| c.current), Some(0));
    }

    #[test]
    fn add_product_prices_and_validates() {
        let mut catalog = Catalog::new();
        assert_eq!(
            add_product(&mut catalog, ProductId::new(), "   ", Subtype::Beverage(BeverageKind::Milk)),
            Err(ShopError::EmptyTitle)
        );

        let id = add_product(
            &mut catalog,
            ProductId::new(),
            "  Corrector líquido ",
            Subtype::Stationery(StationeryKind::CorrectionFluid),
        )
        .unwrap();
        let product = catalog.get(id).unwrap();
        assert_eq!(product.title, "Corrector líquido");
        assert_eq!(product.price, Money::from_units(12));
        assert_eq!(product.stock, 0);
        assert_eq!(product.category(), Category::Stationery);

        assert_eq!(
            add_product(&mut catalog, id, "Otro", Subtype::Stationery(StationeryKind::Glue)),
            Err(ShopError::DuplicateProduct(id))
        );
    }

    #[test]
    fn add_then_delete_restores_catalog() {
        let (mut catalog, _) =
            catalog_with(&[("Jamaica", Subtype::Beverage(BeverageKind::Water), 3)]);
        let before = catalog.clone();

        let id = add_product(&mut catalog, ProductId::new(), "Fresa", Subtype::Beverage(BeverageKind::Milk))
            .unwrap();
        assert!(delete_product(&mut catalog, id).is_some());
        assert_eq!(catalog, before);
        assert!(delete_product(&mut catalog, id).is_none());
    }

    #[test]
    fn record_sale_appends_batch_and_decrements() {
        let (mut catalog, ids) = catalog_with(&[
            ("Jamaica", Subtype::Beverage(BeverageKind::Water), 5),
            ("Fresa", Subtype::Beverage(BeverageKind::Milk), 2),
        ]);
        let mut cart = Cart::new();
        cart.update(&catalog, ids[0], 3).unwrap();
        cart.update(&catalog, ids[1], 2).unwrap();
        let mut ledger = SalesLedger::new();

        let summary = record_sale(&mut catalog, &mut ledger, &cart, test_instant());

        assert_eq!(summary.lines, 2);
        assert_eq!(summary.items, 5);
        assert_eq!(summary.total, Money::from_units(3 * 2 + 2 * 3));
        assert_eq!(stock(&catalog, ids[0]), 2);
        assert_eq!(stock(&catalog, ids[1]), 0);

        let records = ledger.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].quantity_sold, 3);
        assert_eq!(records[0].total_revenue, Money::from_units(6));
        assert_eq!(records[1].quantity_sold, 2);
        assert_eq!(records[1].unit_price, Money::from_units(3));
        assert!(records.iter().all(|r| r.timestamp == test_instant()));
    }

    #[test]
    fn record_sale_skips_deleted_products() {
        let (mut catalog, ids) = catalog_with(&[
            ("Jamaica", Subtype::Beverage(BeverageKind::Water), 5),
            ("Fresa", Subtype::Beverage(BeverageKind::Milk), 5),
        ]);
        let mut cart = Cart::new();
        cart.update(&catalog, ids[0], 1).unwrap();
        cart.update(&catalog, ids[1], 1).unwrap();
        delete_product(&mut catalog, ids[1]);
        let mut ledger = SalesLedger::new();

        let summary = record_sale(&mut catalog, &mut ledger, &cart, test_instant());

        assert_eq!(summary.lines, 1);
        assert_eq!(ledger.records()[0].product_id, ids[0]);
    }

    #[test]
    fn record_sale_with_stale_cart_floors_at_zero() {
        let (mut catalog, ids) =
            catalog_with(&[("Jamaica", Subtype::Beverage(BeverageKind::Water), 5)]);
        let mut cart = Cart::new();
        cart.update(&catalog, ids[0], 5).unwrap();
        adjust_stock(&mut catalog, ids[0], -4);
        let mut ledger = SalesLedger::new();

        let summary = record_sale(&mut catalog, &mut ledger, &cart, test_instant());

        assert_eq!(stock(&catalog, ids[0]), 0);
        assert_eq!(summary.changes[0].delta(), -1);
        assert_eq!(ledger.records()[0].quantity_sold, 5);
    }
}
