//! Symbol universe: which symbols are watched and how they are split across connections

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};

use crate::common::channels::{RefreshSender, RefreshSignal};
use crate::common::errors::{MonitorError, Result};
use crate::common::traits::{SymbolSource, TagSource};
use crate::common::types::{CandleInterval, SubscriptionGroup, SymbolInfo, SymbolTags};

/// One generation of watched symbols
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SymbolUniverse {
    pub generation: u64,
    /// One entry per feed connection
    pub groups: Vec<SubscriptionGroup>,
    /// Every watched symbol, in exchange order
    pub symbols: Vec<String>,
    /// Base asset code → tags
    pub tags: SymbolTags,
    base_assets: HashMap<String, String>,
}

impl SymbolUniverse {
    /// Spread the trading symbols quoted in `quote_asset` round-robin over `group_count` groups
    pub fn partition(
        generation: u64,
        symbols: &[SymbolInfo],
        quote_asset: &str,
        group_count: usize,
        interval: CandleInterval,
        tags: SymbolTags,
    ) -> Self {
        let group_count = group_count.max(1);
        let mut groups = vec![SubscriptionGroup::new(); group_count];
        let mut watched = Vec::new();
        let mut base_assets = HashMap::new();

        let eligible = symbols
            .iter()
            .filter(|info| info.trading && info.quote_asset.eq_ignore_ascii_case(quote_asset));
        for (index, info) in eligible.enumerate() {
            groups[index % group_count].insert(info.symbol.clone(), interval);
            watched.push(info.symbol.clone());
            base_assets.insert(info.symbol.clone(), info.base_asset.clone());
        }
        groups.retain(|group| !group.is_empty());

        Self {
            generation,
            groups,
            symbols: watched,
            tags,
            base_assets,
        }
    }

    /// Tags of the symbol's base asset, empty when there are none
    pub fn tags_for(&self, symbol: &str) -> &[String] {
        self.base_assets
            .get(symbol)
            .and_then(|base| self.tags.get(base))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

/// Shared, swappable reference to the current universe
#[derive(Debug, Clone, Default)]
pub struct UniverseHandle {
    inner: Arc<RwLock<Arc<SymbolUniverse>>>,
}

impl UniverseHandle {
    pub fn new(universe: SymbolUniverse) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Arc::new(universe))),
        }
    }

    /// Snapshot of the current universe
    pub fn current(&self) -> Arc<SymbolUniverse> {
        self.inner.read().clone()
    }

    fn replace(&self, universe: SymbolUniverse) -> Arc<SymbolUniverse> {
        let universe = Arc::new(universe);
        *self.inner.write() = universe.clone();
        universe
    }
}

/// Builds the symbol universe from the exchange and keeps it fresh
pub struct UniverseResolver {
    symbols: Arc<dyn SymbolSource>,
    tags: Arc<dyn TagSource>,
    quote_asset: String,
    group_count: usize,
    interval: CandleInterval,
    handle: UniverseHandle,
    refresh_tx: RefreshSender,
    generation: AtomicU64,
}

impl UniverseResolver {
    pub fn new(
        symbols: Arc<dyn SymbolSource>,
        tags: Arc<dyn TagSource>,
        quote_asset: &str,
        group_count: usize,
        interval: CandleInterval,
        refresh_tx: RefreshSender,
    ) -> Self {
        Self {
            symbols,
            tags,
            quote_asset: quote_asset.to_uppercase(),
            group_count,
            interval,
            handle: UniverseHandle::default(),
            refresh_tx,
            generation: AtomicU64::new(0),
        }
    }

    /// Handle readers use to look at the current universe
    pub fn handle(&self) -> UniverseHandle {
        self.handle.clone()
    }

    /// First resolution at startup; installs the universe without signalling a refresh
    pub async fn bootstrap(&self) -> Result<Arc<SymbolUniverse>> {
        self.resolve(false).await
    }

    /// Resolve again, install the result and signal the supervisor
    ///
    /// Symbols and tags are both fetched before anything is replaced, so a
    /// failure leaves the previous universe untouched.
    pub async fn refresh(&self) -> Result<Arc<SymbolUniverse>> {
        self.resolve(true).await
    }

    #[instrument(skip(self), fields(quote = %self.quote_asset))]
    async fn resolve(&self, signal: bool) -> Result<Arc<SymbolUniverse>> {
        let symbols = self.symbols.fetch_symbols().await?;
        let tags = self.tags.fetch_tags().await?;

        let generation = self.generation.load(Ordering::SeqCst) + 1;
        let universe = SymbolUniverse::partition(
            generation,
            &symbols,
            &self.quote_asset,
            self.group_count,
            self.interval,
            tags,
        );
        if universe.is_empty() {
            return Err(MonitorError::Refresh(format!(
                "no trading symbols quoted in {}",
                self.quote_asset
            )));
        }

        self.generation.store(generation, Ordering::SeqCst);
        let universe = self.handle.replace(universe);
        info!(
            generation,
            symbols = universe.symbols.len(),
            groups = universe.groups.len(),
            tagged_assets = universe.tags.len(),
            "Symbol universe installed"
        );

        if signal {
            self.refresh_tx.notify(RefreshSignal { generation });
        }
        Ok(universe)
    }

    /// Refresh on a fixed period until `shutdown` fires
    ///
    /// Each cycle runs in its own task so a panic inside it is contained.
    pub async fn run(self: Arc<Self>, period: Duration, shutdown: CancellationToken) {
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Universe refresh loop stopping");
                    break;
                }
                _ = ticker.tick() => {
                    let resolver = self.clone();
                    let cycle = tokio::spawn(async move { resolver.refresh().await });
                    match cycle.await {
                        Ok(Ok(_)) => {}
                        Ok(Err(e)) => {
                            warn!(error = %e, "Universe refresh failed, keeping previous universe");
                        }
                        Err(e) if e.is_panic() => {
                            error!("Universe refresh panicked, keeping previous universe");
                        }
                        Err(e) => {
                            warn!(error = %e, "Universe refresh task cancelled");
                        }
                    }
                }
            }
        }
    }
}
