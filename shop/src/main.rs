//! Command-line demo of the shop engine.
//!
//! Loads the stored catalog and ledger (seeding a few products on first run),
//! rings up a sale, prints alerts and today's report, then shuts down,
//! letting pending debounced writes land.

use anyhow::Context;
use sabalitos_core::environment::{Clock, SystemClock};
use sabalitos_runtime::Store;
use sabalitos_shop::{
    AdjustDirection, BeverageKind, FrozenKind, JsonFileStore, Period, ReportView, ShopAction,
    ProductId, ShopConfig, ShopEnvironment, ShopReducer, ShopState, SnackKind,
    StationeryKind, StockAdjustment, Subtype, TracingNotifier,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

type ShopStore = Store<ShopState, ShopAction, ShopEnvironment, ShopReducer>;

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sabalitos=info,sabalitos_shop=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
}

/// Products created on first run, with opening stock
const SEED: &[(&str, Subtype, u32)] = &[
    ("Sabalito de Fresa", Subtype::Beverage(BeverageKind::Milk), 24),
    ("Sabalito de Jamaica", Subtype::Beverage(BeverageKind::Water), 30),
    ("Paleta de Mango", Subtype::Frozen(FrozenKind::Popsicle), 8),
    ("Palomitas", Subtype::Snack(SnackKind::Popcorn), 15),
    ("Lápiz", Subtype::Stationery(StationeryKind::Pencil), 4),
];

async fn seed(store: &ShopStore) -> anyhow::Result<()> {
    println!("Empty catalog, adding sample products...");
    for &(title, subtype, stock) in SEED {
        let id = ProductId::new();
        store
            .send(ShopAction::AddProduct {
                id,
                title: title.to_string(),
                subtype,
            })
            .await?;
        if let Ok(adjustment) = StockAdjustment::new(AdjustDirection::Add, stock) {
            store
                .send(ShopAction::ApplyStockAdjustment { id, adjustment })
                .await?;
        }
    }
    Ok(())
}

async fn ring_up_sale(store: &ShopStore) -> anyhow::Result<()> {
    let picks: Vec<_> = store
        .state(|s| s.catalog.iter().take(3).map(|p| p.id).collect())
        .await;

    for (quantity, id) in (1..).zip(picks) {
        store
            .send(ShopAction::UpdateCart { id, delta: quantity })
            .await?;
    }

    let (items, total) = store.state(|s| (s.cart_items(), s.cart_total())).await;
    println!("\nCart: {items} items, {total}");

    store.send(ShopAction::ConfirmSale).await?;
    if let Some(feedback) = store.state(|s| s.feedback.clone()).await {
        println!("{}", feedback.message);
    }
    Ok(())
}

async fn print_inventory(store: &ShopStore) {
    let state = store.state(Clone::clone).await;

    println!("\n=== Inventario ({} productos) ===", state.catalog.len());
    for section in state.catalog.sections() {
        println!("{} {}", section.category.icon(), section.title);
        for group in section.groups {
            println!("  {}", group.title);
            for product in group.products {
                println!(
                    "    {:<22} {:>4} u.  {}",
                    product.title, product.stock, product.price
                );
            }
        }
    }

    if !state.alerts.active().is_empty() {
        println!("\n=== Alertas ===");
        for alert in state.alerts.active() {
            println!("  [{:?}] {}", alert.level, alert.message);
        }
    }
}

async fn print_report(store: &ShopStore, config: &ShopConfig, clock: &dyn Clock) {
    let ledger = store.state(|s| s.ledger.clone()).await;
    let mut view = ReportView::new(config.report_page_size);
    view.select_period(Period::Today);

    let report = view.refresh(&ledger, clock.now());
    println!(
        "\n=== Reporte: {} ({} ventas, total {}) ===",
        report.period.label(),
        report.transactions.len(),
        report.grand_total
    );
    for total in &report.categories {
        println!(
            "  {} {:<24} {:>3} ventas  {}",
            total.category.icon(),
            total.category.title(),
            total.transactions,
            total.revenue
        );
    }
    for record in view.visible() {
        println!(
            "  {}  {} x{}  {}",
            record.timestamp.format("%H:%M:%S"),
            record.title,
            record.quantity_sold,
            record.total_revenue
        );
    }
    if view.has_more() {
        println!("  ...");
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    init_tracing();

    let config = ShopConfig::from_env().context("invalid configuration")?;
    tracing::info!(data_dir = %config.data_dir.display(), "Starting Sabalitos");

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let env = ShopEnvironment::from_config(
        &config,
        Arc::clone(&clock),
        Arc::new(JsonFileStore::new(&config.data_dir)),
        Arc::new(TracingNotifier),
    );
    let store: ShopStore = Store::new(ShopState::new(), ShopReducer::new(), env);

    store.send(ShopAction::Load).await?.wait().await;

    if store.state(|s| s.catalog.is_empty()).await {
        seed(&store).await?;
    }

    ring_up_sale(&store).await?;
    print_inventory(&store).await;
    print_report(&store, &config, clock.as_ref()).await;

    println!("\nSaving...");
    store
        .shutdown(config.shutdown_timeout())
        .await
        .context("pending writes did not finish")?;

    Ok(())
}
