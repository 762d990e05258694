//! Alert Engine: low-stock alerts and notification cooldowns.
//!
//! Alerts are rebuilt from the whole catalog on every change. Notifications
//! are rate-limited per product: one per cooldown window, except that an
//! escalation from `Low` to `Critical` notifies immediately.

use crate::catalog::Catalog;
use crate::types::{Alert, AlertLevel, NotificationRequest, Product, ProductId};
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;

/// Title of every stock notification
pub const NOTIFICATION_TITLE: &str = "🚨 Alerta de Stock";

/// Thresholds and cooldown for stock alerts
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AlertPolicy {
    /// Stock at or below this is `Critical`
    pub critical_threshold: u32,
    /// Stock at or below this (and above critical) is `Low`
    pub warning_threshold: u32,
    /// Minimum time between notifications for an unchanged condition
    pub cooldown: Duration,
}

impl Default for AlertPolicy {
    fn default() -> Self {
        Self {
            critical_threshold: 5,
            warning_threshold: 10,
            cooldown: Duration::hours(24),
        }
    }
}

impl AlertPolicy {
    /// Alert level for a stock count; `None` means safe
    #[must_use]
    pub const fn level_for(&self, stock: u32) -> Option<AlertLevel> {
        if stock <= self.critical_threshold {
            Some(AlertLevel::Critical)
        } else if stock <= self.warning_threshold {
            Some(AlertLevel::Low)
        } else {
            None
        }
    }

    /// Builds the alert for a product, if its stock warrants one
    #[must_use]
    pub fn alert_for(&self, product: &Product) -> Option<Alert> {
        let level = self.level_for(product.stock)?;
        let message = match level {
            AlertLevel::Critical if product.stock == 0 => format!("¡AGOTADO! {}", product.title),
            AlertLevel::Critical => format!(
                "¡CRÍTICO! {} - Solo {} unidades",
                product.title, product.stock
            ),
            AlertLevel::Low => format!(
                "Stock Bajo: {} - Quedan {} unidades",
                product.title, product.stock
            ),
        };

        Some(Alert {
            product_id: product.id,
            title: format!("Alerta de {}", product.title),
            message,
            level,
            current_stock: product.stock,
        })
    }
}

/// Last notification sent for a product
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Cooldown {
    /// When it was sent
    pub last_notified: DateTime<Utc>,
    /// Level it was sent for
    pub level: AlertLevel,
}

/// Active alerts plus the per-product notification cooldowns
///
/// Cooldowns live only for the process; they are never persisted.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AlertState {
    active: Vec<Alert>,
    cooldowns: HashMap<ProductId, Cooldown>,
}

impl AlertState {
    /// Creates an empty alert state
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current alerts in catalog order
    #[must_use]
    pub fn active(&self) -> &[Alert] {
        &self.active
    }

    /// Alerts at a given level
    pub fn at_level(&self, level: AlertLevel) -> impl Iterator<Item = &Alert> {
        self.active.iter().filter(move |a| a.level == level)
    }

    /// Cooldown entry for a product
    #[must_use]
    pub fn cooldown(&self, id: ProductId) -> Option<&Cooldown> {
        self.cooldowns.get(&id)
    }

    /// Forgets all alerts and cooldowns
    pub fn clear(&mut self) {
        self.active.clear();
        self.cooldowns.clear();
    }

    /// Recomputes alerts from the catalog and returns the notifications to send
    ///
    /// Nothing happens while the catalog is still loading. Otherwise the active
    /// list is replaced wholesale, and a product is notified when it has no
    /// cooldown entry, its cooldown has elapsed, or its level rose above the
    /// level last notified. Cooldowns of products that no longer alert are
    /// dropped.
    pub fn calculate(
        &mut self,
        catalog: &Catalog,
        is_loading: bool,
        policy: &AlertPolicy,
        now: DateTime<Utc>,
    ) -> Vec<NotificationRequest> {
        if is_loading {
            tracing::trace!("Skipping alert calculation while loading");
            return Vec::new();
        }

        self.active = catalog.iter().filter_map(|p| policy.alert_for(p)).collect();

        let mut notify = Vec::new();
        for alert in &self.active {
            let due = match self.cooldowns.get(&alert.product_id) {
                None => true,
                Some(entry) => {
                    now - entry.last_notified > policy.cooldown || alert.level > entry.level
                },
            };

            if due {
                self.cooldowns.insert(
                    alert.product_id,
                    Cooldown {
                        last_notified: now,
                        level: alert.level,
                    },
                );
                notify.push(NotificationRequest {
                    title: NOTIFICATION_TITLE.to_string(),
                    body: alert.message.clone(),
                    product_id: alert.product_id,
                });
            }
        }

        let active = &self.active;
        self.cooldowns
            .retain(|id, _| active.iter().any(|a| a.product_id == *id));

        notify
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::inventory::{add_product, adjust_stock};
    use crate::types::{BeverageKind, Subtype};
    use sabalitos_testing::test_instant;

    fn single(stock: u32) -> (Catalog, ProductId) {
        let mut catalog = Catalog::new();
        let id = add_product(
            &mut catalog,
            ProductId::new(),
            "Jamaica",
            Subtype::Beverage(BeverageKind::Water),
        )
        .unwrap();
        adjust_stock(&mut catalog, id, i64::from(stock));
        (catalog, id)
    }

    fn set_stock(catalog: &mut Catalog, id: ProductId, stock: u32) {
        let current = catalog.get(id).map_or(0, |p| p.stock);
        adjust_stock(catalog, id, i64::from(stock) - i64::from(current));
    }

    #[test]
    fn thresholds() {
        let policy = AlertPolicy::default();
        assert_eq!(policy.level_for(0), Some(AlertLevel::Critical));
        assert_eq!(policy.level_for(5), Some(AlertLevel::Critical));
        assert_eq!(policy.level_for(6), Some(AlertLevel::Low));
        assert_eq!(policy.level_for(10), Some(AlertLevel::Low));
        assert_eq!(policy.level_for(11), None);
    }

    #[test]
    fn messages() {
        let policy = AlertPolicy::default();
        let (catalog, id) = single(0);
        let alert = policy.alert_for(catalog.get(id).unwrap()).unwrap();
        assert_eq!(alert.message, "¡AGOTADO! Jamaica");
        assert_eq!(alert.title, "Alerta de Jamaica");

        let (catalog, id) = single(3);
        let alert = policy.alert_for(catalog.get(id).unwrap()).unwrap();
        assert_eq!(alert.message, "¡CRÍTICO! Jamaica - Solo 3 unidades");

        let (catalog, id) = single(8);
        let alert = policy.alert_for(catalog.get(id).unwrap()).unwrap();
        assert_eq!(alert.message, "Stock Bajo: Jamaica - Quedan 8 unidades");
        assert_eq!(alert.current_stock, 8);
    }

    #[test]
    fn loading_skips_everything() {
        let (catalog, _) = single(0);
        let mut alerts = AlertState::new();

        let sent = alerts.calculate(&catalog, true, &AlertPolicy::default(), test_instant());

        assert!(sent.is_empty());
        assert!(alerts.active().is_empty());
    }

    #[test]
    fn cooldown_suppresses_repeat_until_it_elapses() {
        let policy = AlertPolicy::default();
        let (catalog, id) = single(2);
        let mut alerts = AlertState::new();
        let t = test_instant();

        let sent = alerts.calculate(&catalog, false, &policy, t);
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].product_id, id);
        assert_eq!(sent[0].title, NOTIFICATION_TITLE);

        assert!(alerts.calculate(&catalog, false, &policy, t + Duration::hours(1)).is_empty());
        assert!(alerts.calculate(&catalog, false, &policy, t + Duration::hours(24)).is_empty());
        assert_eq!(
            alerts.calculate(&catalog, false, &policy, t + Duration::hours(25)).len(),
            1
        );
        assert_eq!(
            alerts.cooldown(id).map(|c| c.last_notified),
            Some(t + Duration::hours(25))
        );
    }

    #[test]
    fn escalation_bypasses_cooldown() {
        let policy = AlertPolicy::default();
        let (mut catalog, id) = single(8);
        let mut alerts = AlertState::new();
        let t = test_instant();

        assert_eq!(alerts.calculate(&catalog, false, &policy, t).len(), 1);

        set_stock(&mut catalog, id, 4);
        let sent = alerts.calculate(&catalog, false, &policy, t + Duration::hours(1));
        assert_eq!(sent.len(), 1);
        assert_eq!(alerts.cooldown(id).map(|c| c.level), Some(AlertLevel::Critical));
    }

    #[test]
    fn de_escalation_does_not_notify_or_reset() {
        let policy = AlertPolicy::default();
        let (mut catalog, id) = single(4);
        let mut alerts = AlertState::new();
        let t = test_instant();
        alerts.calculate(&catalog, false, &policy, t);

        set_stock(&mut catalog, id, 8);
        assert!(alerts.calculate(&catalog, false, &policy, t + Duration::hours(1)).is_empty());
        assert_eq!(
            alerts.cooldown(id),
            Some(&Cooldown {
                last_notified: t,
                level: AlertLevel::Critical
            })
        );

        // Back to critical: same level as last notified, still cooling down
        set_stock(&mut catalog, id, 3);
        assert!(alerts.calculate(&catalog, false, &policy, t + Duration::hours(2)).is_empty());
    }

    #[test]
    fn recovery_purges_cooldown() {
        let policy = AlertPolicy::default();
        let (mut catalog, id) = single(1);
        let mut alerts = AlertState::new();
        let t = test_instant();
        alerts.calculate(&catalog, false, &policy, t);

        set_stock(&mut catalog, id, 20);
        alerts.calculate(&catalog, false, &policy, t + Duration::minutes(5));
        assert!(alerts.active().is_empty());
        assert!(alerts.cooldown(id).is_none());

        // Dropping again notifies right away
        set_stock(&mut catalog, id, 1);
        assert_eq!(
            alerts.calculate(&catalog, false, &policy, t + Duration::minutes(10)).len(),
            1
        );
    }

    #[test]
    fn active_list_is_replaced_not_patched() {
        let policy = AlertPolicy::default();
        let (mut catalog, id) = single(3);
        let mut alerts = AlertState::new();
        alerts.calculate(&catalog, false, &policy, test_instant());
        assert_eq!(alerts.at_level(AlertLevel::Critical).count(), 1);

        set_stock(&mut catalog, id, 9);
        alerts.calculate(&catalog, false, &policy, test_instant());
        assert_eq!(alerts.active().len(), 1);
        assert_eq!(alerts.active()[0].level, AlertLevel::Low);
        assert_eq!(alerts.at_level(AlertLevel::Critical).count(), 0);
    }
}
