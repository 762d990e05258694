//! Reporting Engine: period-filtered aggregates over the sales ledger.
//!
//! Reports are recomputed from the ledger; [`ReportView`] memoizes the last
//! one and pages through its transactions.

use crate::ledger::SalesLedger;
use crate::types::{Category, Money, SaleId, SaleRecord};
use chrono::{DateTime, Duration, Local, TimeZone, Utc};

/// Default number of transactions per page
pub const DEFAULT_PAGE_SIZE: usize = 15;

/// Reporting time window
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Period {
    /// Since local midnight
    #[default]
    Today,
    /// The last `n` days up to now
    LastNDays(u32),
    /// No cutoff
    AllTime,
}

impl Period {
    /// Selector presets in display order
    pub const PRESETS: [Self; 4] = [Self::Today, Self::LastNDays(7), Self::LastNDays(30), Self::AllTime];

    /// Selector label
    #[must_use]
    pub fn label(&self) -> String {
        match self {
            Self::Today => "Hoy".to_string(),
            Self::LastNDays(n) => format!("{n} Días"),
            Self::AllTime => "Todo".to_string(),
        }
    }

    /// Earliest timestamp included, evaluated in `tz` for [`Period::Today`]
    #[must_use]
    pub fn cutoff<Tz: TimeZone>(&self, now: DateTime<Utc>, tz: &Tz) -> Option<DateTime<Utc>> {
        match self {
            Self::Today => {
                let midnight = now.with_timezone(tz).date_naive().and_time(chrono::NaiveTime::MIN);
                // A midnight skipped by a DST change falls back to UTC midnight
                Some(
                    tz.from_local_datetime(&midnight)
                        .earliest()
                        .map_or_else(|| midnight.and_utc(), |dt| dt.with_timezone(&Utc)),
                )
            },
            // A window reaching past the representable range covers everything
            Self::LastNDays(n) => Duration::try_days(i64::from(*n))
                .and_then(|window| now.checked_sub_signed(window)),
            Self::AllTime => None,
        }
    }
}

/// Revenue and transaction count for one category
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CategoryTotal {
    /// The category
    pub category: Category,
    /// Summed revenue
    pub revenue: Money,
    /// Number of ledger lines
    pub transactions: usize,
}

/// Aggregated view of the ledger for one period
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SalesReport {
    /// Period the report covers
    pub period: Period,
    /// Earliest included timestamp
    pub cutoff: Option<DateTime<Utc>>,
    /// Per-category totals, highest revenue first; ties keep first-seen order
    pub categories: Vec<CategoryTotal>,
    /// Sum of all included revenue
    pub grand_total: Money,
    /// Included records, most recent first
    pub transactions: Vec<SaleRecord>,
}

impl SalesReport {
    /// Builds a report, resolving "today" in the local timezone
    #[must_use]
    pub fn build(ledger: &SalesLedger, period: Period, now: DateTime<Utc>) -> Self {
        Self::build_in(ledger, period, now, &Local)
    }

    /// Builds a report, resolving "today" in `tz`
    #[must_use]
    pub fn build_in<Tz: TimeZone>(
        ledger: &SalesLedger,
        period: Period,
        now: DateTime<Utc>,
        tz: &Tz,
    ) -> Self {
        Self::from_cutoff(ledger, period, period.cutoff(now, tz))
    }

    fn from_cutoff(ledger: &SalesLedger, period: Period, cutoff: Option<DateTime<Utc>>) -> Self {
        let mut transactions: Vec<SaleRecord> = ledger
            .records()
            .iter()
            .filter(|r| cutoff.is_none_or(|c| r.timestamp >= c))
            .cloned()
            .collect();

        let mut categories: Vec<CategoryTotal> = Vec::new();
        for record in &transactions {
            if let Some(total) = categories.iter_mut().find(|t| t.category == record.category) {
                total.revenue = total.revenue.saturating_add(record.total_revenue);
                total.transactions += 1;
            } else {
                categories.push(CategoryTotal {
                    category: record.category,
                    revenue: record.total_revenue,
                    transactions: 1,
                });
            }
        }
        // Stable sorts: equal revenues keep first-seen order, equal timestamps keep ledger order
        categories.sort_by(|a, b| b.revenue.cmp(&a.revenue));
        transactions.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

        Self {
            period,
            cutoff,
            grand_total: categories.iter().map(|t| t.revenue).sum(),
            categories,
            transactions,
        }
    }
}

/// Paging state over a finite transaction list
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TransactionFeed {
    page_size: usize,
    pages: usize,
}

impl TransactionFeed {
    /// Creates a feed showing the first page
    #[must_use]
    pub fn new(page_size: usize) -> Self {
        Self {
            page_size: page_size.max(1),
            pages: 1,
        }
    }

    /// Records visible with the pages loaded so far
    #[must_use]
    pub fn visible<'a>(&self, all: &'a [SaleRecord]) -> &'a [SaleRecord] {
        &all[..all.len().min(self.limit())]
    }

    /// Whether more records remain beyond the loaded pages
    #[must_use]
    pub fn has_more(&self, total: usize) -> bool {
        total > self.limit()
    }

    /// Loads one more page if records remain; returns whether it did
    pub fn load_more(&mut self, total: usize) -> bool {
        if self.has_more(total) {
            self.pages += 1;
            true
        } else {
            false
        }
    }

    /// Back to the first page
    pub fn reset(&mut self) {
        self.pages = 1;
    }

    fn limit(&self) -> usize {
        self.pages.saturating_mul(self.page_size)
    }
}

/// Ledger version plus the inputs a report depends on
#[derive(Clone, Debug, PartialEq, Eq)]
struct ReportKey {
    ledger_len: usize,
    last_sale: Option<SaleId>,
    period: Period,
    cutoff: Option<DateTime<Utc>>,
}

/// Report screen state: selected period, memoized report and paging
#[derive(Clone, Debug)]
pub struct ReportView {
    period: Period,
    feed: TransactionFeed,
    cached: Option<(ReportKey, SalesReport)>,
}

impl ReportView {
    /// Creates a view on [`Period::Today`] with the given page size
    #[must_use]
    pub fn new(page_size: usize) -> Self {
        Self {
            period: Period::default(),
            feed: TransactionFeed::new(page_size),
            cached: None,
        }
    }

    /// Selected period
    #[must_use]
    pub const fn period(&self) -> Period {
        self.period
    }

    /// Selects a period; paging restarts at the first page
    pub fn select_period(&mut self, period: Period) {
        self.period = period;
        self.feed.reset();
    }

    /// Current report, recomputed only when the ledger, period or cutoff changed
    pub fn refresh(&mut self, ledger: &SalesLedger, now: DateTime<Utc>) -> &SalesReport {
        self.refresh_in(ledger, now, &Local)
    }

    /// Like [`ReportView::refresh`] with "today" resolved in `tz`
    pub fn refresh_in<Tz: TimeZone>(
        &mut self,
        ledger: &SalesLedger,
        now: DateTime<Utc>,
        tz: &Tz,
    ) -> &SalesReport {
        let key = ReportKey {
            ledger_len: ledger.len(),
            last_sale: ledger.last_id().cloned(),
            period: self.period,
            cutoff: self.period.cutoff(now, tz),
        };

        let fresh = match self.cached.take() {
            Some((cached, report)) if cached == key => (cached, report),
            _ => {
                tracing::debug!(period = ?self.period, records = ledger.len(), "Recomputing sales report");
                let report = SalesReport::from_cutoff(ledger, key.period, key.cutoff);
                (key, report)
            },
        };

        &self.cached.insert(fresh).1
    }

    /// Last computed report
    #[must_use]
    pub fn report(&self) -> Option<&SalesReport> {
        self.cached.as_ref().map(|(_, report)| report)
    }

    /// Transactions visible with the pages loaded so far
    #[must_use]
    pub fn visible(&self) -> &[SaleRecord] {
        self.report()
            .map_or(&[][..], |report| self.feed.visible(&report.transactions))
    }

    /// Whether more transactions can be loaded
    #[must_use]
    pub fn has_more(&self) -> bool {
        self.report()
            .is_some_and(|report| self.feed.has_more(report.transactions.len()))
    }

    /// Loads one more page; returns whether anything was added
    pub fn load_more(&mut self) -> bool {
        let total = self.report().map_or(0, |report| report.transactions.len());
        self.feed.load_more(total)
    }
}

impl Default for ReportView {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::{BeverageKind, ProductId, SnackKind, Subtype};
    use sabalitos_testing::test_instant;

    fn record(subtype: Subtype, revenue: u64, at: DateTime<Utc>) -> SaleRecord {
        SaleRecord {
            id: SaleId::generate(at),
            product_id: ProductId::new(),
            title: "x".into(),
            subtype,
            category: subtype.category(),
            quantity_sold: 1,
            unit_price: Money::from_units(revenue),
            total_revenue: Money::from_units(revenue),
            timestamp: at,
        }
    }

    const WATER: Subtype = Subtype::Beverage(BeverageKind::Water);
    const CHIPS: Subtype = Subtype::Snack(SnackKind::Chips);

    #[test]
    fn aggregates_sorted_by_revenue() {
        let t = test_instant();
        let ledger = SalesLedger::from_records(vec![
            record(WATER, 10, t),
            record(WATER, 5, t),
            record(CHIPS, 20, t),
        ]);

        let report = SalesReport::build_in(&ledger, Period::AllTime, t, &Utc);

        assert_eq!(
            report.categories,
            vec![
                CategoryTotal {
                    category: Category::PackagedSnacks,
                    revenue: Money::from_units(20),
                    transactions: 1
                },
                CategoryTotal {
                    category: Category::BeverageSnacks,
                    revenue: Money::from_units(15),
                    transactions: 2
                },
            ]
        );
        assert_eq!(report.grand_total, Money::from_units(35));
    }

    #[test]
    fn equal_revenue_keeps_first_seen_order() {
        let t = test_instant();
        let ledger = SalesLedger::from_records(vec![record(WATER, 5, t), record(CHIPS, 5, t)]);

        let report = SalesReport::build_in(&ledger, Period::AllTime, t, &Utc);

        assert_eq!(report.categories[0].category, Category::BeverageSnacks);
        assert_eq!(report.categories[1].category, Category::PackagedSnacks);
    }

    #[test]
    fn periods_filter_by_cutoff() {
        let now = test_instant();
        let ledger = SalesLedger::from_records(vec![
            record(WATER, 1, now - Duration::days(40)),
            record(WATER, 2, now - Duration::days(10)),
            record(WATER, 4, now - Duration::days(3)),
            record(WATER, 8, now - Duration::hours(1)),
        ]);

        let total = |period| SalesReport::build_in(&ledger, period, now, &Utc).grand_total;
        assert_eq!(total(Period::Today), Money::from_units(8));
        assert_eq!(total(Period::LastNDays(7)), Money::from_units(12));
        assert_eq!(total(Period::LastNDays(30)), Money::from_units(14));
        assert_eq!(total(Period::AllTime), Money::from_units(15));
    }

    #[test]
    fn huge_day_window_covers_everything() {
        let now = test_instant();
        let ledger = SalesLedger::from_records(vec![
            record(WATER, 1, now - Duration::days(4000)),
            record(WATER, 2, now - Duration::hours(1)),
        ]);

        let report = SalesReport::build_in(&ledger, Period::LastNDays(u32::MAX), now, &Utc);
        assert_eq!(report.cutoff, None);
        assert_eq!(report.grand_total, Money::from_units(3));
        assert_eq!(Period::LastNDays(u32::MAX).cutoff(now, &Utc), None);
    }

    #[test]
    fn today_starts_at_local_midnight() {
        let now = test_instant();
        let cutoff = Period::Today.cutoff(now, &Utc).unwrap();
        assert_eq!(cutoff, now - Duration::hours(12));

        let ledger = SalesLedger::from_records(vec![record(WATER, 3, cutoff)]);
        let report = SalesReport::build_in(&ledger, Period::Today, now, &Utc);
        assert_eq!(report.transactions.len(), 1);
    }

    #[test]
    fn transactions_most_recent_first() {
        let now = test_instant();
        let ledger = SalesLedger::from_records(vec![
            record(WATER, 1, now - Duration::hours(3)),
            record(WATER, 2, now - Duration::hours(1)),
            record(WATER, 3, now - Duration::hours(2)),
        ]);

        let report = SalesReport::build_in(&ledger, Period::AllTime, now, &Utc);
        let revenues: Vec<_> = report.transactions.iter().map(|r| r.total_revenue).collect();
        assert_eq!(
            revenues,
            vec![Money::from_units(2), Money::from_units(3), Money::from_units(1)]
        );
    }

    #[test]
    fn feed_pages_and_resets() {
        let now = test_instant();
        let ledger = SalesLedger::from_records(
            (0..35).map(|i| record(WATER, 1, now - Duration::minutes(i))).collect(),
        );
        let mut view = ReportView::new(15);

        view.refresh_in(&ledger, now, &Utc);
        assert_eq!(view.visible().len(), 15);
        assert!(view.has_more());

        assert!(view.load_more());
        assert_eq!(view.visible().len(), 30);
        assert!(view.load_more());
        assert_eq!(view.visible().len(), 35);
        assert!(!view.has_more());
        assert!(!view.load_more());

        view.select_period(Period::LastNDays(7));
        view.refresh_in(&ledger, now, &Utc);
        assert_eq!(view.visible().len(), 15);
    }

    #[test]
    fn view_recomputes_only_when_inputs_change() {
        let now = test_instant();
        let mut ledger = SalesLedger::from_records(vec![record(WATER, 1, now)]);
        let mut view = ReportView::default();

        let first = view.refresh_in(&ledger, now, &Utc).clone();
        assert_eq!(view.refresh_in(&ledger, now, &Utc), &first);

        ledger.append(vec![record(CHIPS, 4, now)]);
        let second = view.refresh_in(&ledger, now, &Utc);
        assert_eq!(second.grand_total, Money::from_units(5));
        assert_eq!(second.transactions.len(), 2);
    }

    #[test]
    fn preset_labels() {
        let labels: Vec<_> = Period::PRESETS.iter().map(Period::label).collect();
        assert_eq!(labels, vec!["Hoy", "7 Días", "30 Días", "Todo"]);
    }
}
