//! Reducer for the shop.
//!
//! The reducer is the single owner of the catalog and ledger. Engines are
//! plain functions it calls; everything they cannot do synchronously (saving,
//! notifying, dismissing feedback) is returned as an effect.

use crate::alerts::AlertState;
use crate::cart::Cart;
use crate::catalog::Catalog;
use crate::environment::ShopEnvironment;
use crate::error::ShopError;
use crate::inventory::{add_product, adjust_stock, apply_adjustment, delete_product, record_sale};
use crate::ledger::SalesLedger;
use crate::persistence::{encode_catalog, encode_sales, StorageKey};
use crate::state::{Feedback, FeedbackKind, ShopAction, ShopState};
use crate::types::NotificationRequest;
use sabalitos_core::effect::{Effect, EffectId};
use sabalitos_core::{async_effect, delay, reducer::Reducer, SmallVec};
use std::sync::Arc;

type Effects = SmallVec<[Effect<ShopAction>; 4]>;

/// Id of the pending feedback dismissal
pub const FEEDBACK_EFFECT_ID: EffectId = EffectId::from_static("feedback");

/// Reducer for the shop
#[derive(Clone, Debug, Default)]
pub struct ShopReducer;

impl ShopReducer {
    /// Creates a new `ShopReducer`
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Shows a message and (re)schedules its dismissal
    fn show(state: &mut ShopState, env: &ShopEnvironment, feedback: Feedback, effects: &mut Effects) {
        tracing::debug!(kind = ?feedback.kind, message = %feedback.message, "Feedback");
        state.feedback = Some(feedback);
        effects.push(
            delay! {
                duration: env.feedback_duration,
                action: ShopAction::DismissFeedback
            }
            .cancellable(FEEDBACK_EFFECT_ID),
        );
    }

    fn reject(state: &mut ShopState, env: &ShopEnvironment, error: &ShopError, effects: &mut Effects) {
        tracing::debug!(%error, "Rejected operator input");
        Self::show(
            state,
            env,
            Feedback::new(FeedbackKind::Error, error.to_string()),
            effects,
        );
    }

    /// Debounced write of one blob
    fn schedule_save(key: StorageKey, env: &ShopEnvironment) -> Effect<ShopAction> {
        delay! {
            duration: env.save_debounce,
            action: ShopAction::Flush(key)
        }
        .cancellable(key.effect_id())
    }

    /// Fire-and-forget notification; failures are only logged
    fn notify(request: NotificationRequest, env: &ShopEnvironment) -> Effect<ShopAction> {
        metrics::counter!("shop.notifications.requested").increment(1);
        let notifier = Arc::clone(&env.notifier);
        async_effect! {
            let product_id = request.product_id;
            if let Err(error) = notifier.request_notification(request).await {
                tracing::warn!(%product_id, %error, "Stock notification failed");
            }
            None
        }
    }

    fn recalculate_alerts(state: &mut ShopState, env: &ShopEnvironment, effects: &mut Effects) {
        let requests = state.alerts.calculate(
            &state.catalog,
            state.is_loading,
            &env.alert_policy,
            env.clock.now(),
        );
        if !requests.is_empty() {
            tracing::info!(count = requests.len(), "Requesting stock notifications");
            effects.push(Effect::merge(
                requests
                    .into_iter()
                    .map(|request| Self::notify(request, env))
                    .collect(),
            ));
        }
    }

    /// First alert pass after loading: records cooldowns for what is already
    /// low without notifying about it again
    fn seed_alerts(state: &mut ShopState, env: &ShopEnvironment) {
        let skipped = state.alerts.calculate(
            &state.catalog,
            state.is_loading,
            &env.alert_policy,
            env.clock.now(),
        );
        tracing::debug!(alerts = skipped.len(), "Alerts restored without notifying");
    }

    /// Alerts plus a debounced catalog write
    fn catalog_changed(state: &mut ShopState, env: &ShopEnvironment, effects: &mut Effects) {
        Self::recalculate_alerts(state, env, effects);
        effects.push(Self::schedule_save(StorageKey::Catalog, env));
    }

    fn flush(state: &ShopState, key: StorageKey, env: &ShopEnvironment) -> Effects {
        let blob = match key {
            StorageKey::Catalog => encode_catalog(state.catalog.products()),
            StorageKey::Sales => encode_sales(state.ledger.records()),
        };
        let blob = match blob {
            Ok(blob) => blob,
            Err(error) => {
                tracing::error!(%key, %error, "Failed to encode blob");
                return SmallVec::new();
            },
        };

        let persistence = Arc::clone(&env.persistence);
        let writes = Arc::clone(&env.writes);
        let generation = state.storage_generation;
        let mut effects = Effects::new();
        effects.push(async_effect! {
            match writes.save(persistence.as_ref(), generation, key, blob).await {
                Ok(true) => tracing::debug!(%key, "Flushed"),
                Ok(false) => {},
                Err(error) => tracing::error!(%key, %error, "Failed to save, keeping in-memory state"),
            }
            None
        });
        effects
    }

    fn confirm_sale(state: &mut ShopState, env: &ShopEnvironment, effects: &mut Effects) {
        if state.cart.is_empty() {
            tracing::debug!("Ignoring sale confirmation with an empty cart");
            return;
        }

        let summary = record_sale(
            &mut state.catalog,
            &mut state.ledger,
            &state.cart,
            env.clock.now(),
        );
        state.cart.clear();

        if summary.is_empty() {
            tracing::warn!("Cart held only removed products, nothing was sold");
            return;
        }

        metrics::counter!("shop.sales.confirmed").increment(1);
        tracing::info!(
            lines = summary.lines,
            items = summary.items,
            total = %summary.total,
            "Sale confirmed"
        );

        if !summary.changes.is_empty() {
            Self::recalculate_alerts(state, env, effects);
        }
        effects.push(Self::schedule_save(StorageKey::Catalog, env));
        effects.push(Self::schedule_save(StorageKey::Sales, env));
        Self::show(
            state,
            env,
            Feedback::new(
                FeedbackKind::Success,
                format!(
                    "Venta de {} artículos por {} confirmada.",
                    summary.items, summary.total
                ),
            ),
            effects,
        );
    }

    fn clear_all_data(state: &mut ShopState, env: &ShopEnvironment, effects: &mut Effects) {
        state.catalog = Catalog::new();
        state.ledger = SalesLedger::new();
        state.cart = Cart::new();
        state.alerts = AlertState::new();
        state.storage_generation += 1;
        tracing::warn!(generation = state.storage_generation, "Cleared all shop data");

        for key in StorageKey::ALL {
            effects.push(Effect::Cancel(key.effect_id()));
        }

        let persistence = Arc::clone(&env.persistence);
        let writes = Arc::clone(&env.writes);
        let generation = state.storage_generation;
        effects.push(async_effect! {
            if let Err(error) = writes.clear(persistence.as_ref(), generation).await {
                tracing::error!(%error, "Failed to clear stored data");
            }
            None
        });
        Self::show(
            state,
            env,
            Feedback::new(FeedbackKind::Info, "Todos los datos fueron borrados."),
            effects,
        );
    }
}

impl Reducer for ShopReducer {
    type State = ShopState;
    type Action = ShopAction;
    type Environment = ShopEnvironment;

    #[allow(clippy::too_many_lines)] // one arm per action
    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        let mut effects = Effects::new();

        if state.is_loading && action.is_mutation() {
            tracing::debug!(?action, "Ignoring mutation while loading");
            return effects;
        }

        match action {
            // ========== Commands ==========
            ShopAction::Load => {
                state.is_loading = true;
                let persistence = Arc::clone(&env.persistence);
                effects.push(async_effect! {
                    match persistence.load().await {
                        Ok(snapshot) => Some(ShopAction::Loaded { snapshot }),
                        Err(error) => Some(ShopAction::LoadFailed { error }),
                    }
                });
            },

            ShopAction::AdjustStock { id, delta } => {
                let Some(product) = state.catalog.get(id) else {
                    return effects;
                };
                let title = product.title.clone();

                if delta < 0 && product.stock == 0 {
                    Self::show(
                        state,
                        env,
                        Feedback::new(FeedbackKind::Warning, format!("Stock de {title} ya está en 0.")),
                        &mut effects,
                    );
                    return effects;
                }

                if let Some(change) = adjust_stock(&mut state.catalog, id, delta) {
                    let kind = if change.delta() > 0 {
                        FeedbackKind::Info
                    } else {
                        FeedbackKind::Warning
                    };
                    Self::catalog_changed(state, env, &mut effects);
                    Self::show(
                        state,
                        env,
                        Feedback::new(
                            kind,
                            format!(
                                "Ajuste rápido: {title} {:+}. Stock actual: {}.",
                                change.delta(),
                                change.current
                            ),
                        ),
                        &mut effects,
                    );
                }
            },

            ShopAction::ApplyStockAdjustment { id, adjustment } => {
                match apply_adjustment(&mut state.catalog, id, adjustment) {
                    Ok(Some(change)) => {
                        let title = state
                            .catalog
                            .get(id)
                            .map(|p| p.title.clone())
                            .unwrap_or_default();
                        Self::catalog_changed(state, env, &mut effects);
                        Self::show(
                            state,
                            env,
                            Feedback::new(
                                FeedbackKind::Info,
                                format!("{title} ajustado: {:+} unidades.", change.delta()),
                            ),
                            &mut effects,
                        );
                    },
                    Ok(None) => {},
                    Err(error) => Self::reject(state, env, &error, &mut effects),
                }
            },

            ShopAction::AddProduct { id, title, subtype } => {
                match add_product(&mut state.catalog, id, &title, subtype) {
                    Ok(id) => {
                        tracing::info!(product_id = %id, title = %title.trim(), ?subtype, "Product added");
                        Self::catalog_changed(state, env, &mut effects);
                        Self::show(
                            state,
                            env,
                            Feedback::new(
                                FeedbackKind::Success,
                                format!("Producto {} agregado.", title.trim()),
                            ),
                            &mut effects,
                        );
                    },
                    Err(error) => Self::reject(state, env, &error, &mut effects),
                }
            },

            ShopAction::DeleteProduct { id } => {
                if let Some(product) = delete_product(&mut state.catalog, id) {
                    tracing::info!(product_id = %id, title = %product.title, "Product deleted");
                    state.cart.remove(id);
                    Self::catalog_changed(state, env, &mut effects);
                    Self::show(
                        state,
                        env,
                        Feedback::new(
                            FeedbackKind::Info,
                            format!("Producto {} eliminado.", product.title),
                        ),
                        &mut effects,
                    );
                }
            },

            ShopAction::UpdateCart { id, delta } => {
                if let Err(error) = state.cart.update(&state.catalog, id, delta) {
                    Self::reject(state, env, &error, &mut effects);
                }
            },

            ShopAction::SetCartQuantity { id, quantity } => {
                if let Err(error) = state.cart.set_quantity(&state.catalog, id, quantity) {
                    Self::reject(state, env, &error, &mut effects);
                }
            },

            ShopAction::ClearCart => state.cart.clear(),

            ShopAction::ConfirmSale => Self::confirm_sale(state, env, &mut effects),

            ShopAction::ClearAllData => Self::clear_all_data(state, env, &mut effects),

            ShopAction::DismissFeedback => state.feedback = None,

            // ========== Events ==========
            ShopAction::Loaded { snapshot } => {
                let snapshot = snapshot.unwrap_or_default();
                tracing::info!(
                    products = snapshot.products.len(),
                    sales = snapshot.sales.len(),
                    "Shop data loaded"
                );
                state.catalog = Catalog::from_products(snapshot.products);
                state.ledger = SalesLedger::from_records(snapshot.sales);
                state.cart.clear();
                state.is_loading = false;
                Self::seed_alerts(state, env);
            },

            ShopAction::LoadFailed { error } => {
                tracing::error!(%error, "Failed to load shop data, starting empty");
                state.catalog = Catalog::new();
                state.ledger = SalesLedger::new();
                state.cart.clear();
                state.is_loading = false;
                Self::seed_alerts(state, env);
            },

            ShopAction::Flush(key) => {
                if state.is_loading {
                    tracing::debug!(%key, "Skipping flush while loading");
                } else {
                    effects = Self::flush(state, key, env);
                }
            },
        }

        effects
    }
}
