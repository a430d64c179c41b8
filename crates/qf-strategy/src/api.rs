//! The surface strategy logic programs against.
//!
//! [`StrategyApi`] owns everything a strategy instance mutates — registered
//! indicators, resolved parameters, positions, and the four order-tracking
//! maps — and is only ever touched from the strategy's own worker thread.
//! User logic receives `&mut StrategyApi` in `setup` and `on_bar`.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use qf_bus::EventBus;
use qf_events::market::BarReceived;
use qf_events::requests::{
    OrderCancellationRequest, OrderModificationRequest, OrderSubmissionRequest,
};
use qf_indicators::{Close, High, Indicator, Low, Open, PlotSpec, Volume, IDENTITY_PANEL};
use qf_models::{ActionType, OrderType, TradeSide};
use uuid::Uuid;

use crate::params::ResolvedParams;
use crate::records::{FillRecord, OrderRecord, Position};

/// Opaque reference to an indicator registered with [`StrategyApi`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct IndicatorHandle(usize);

/// Encoded key under which an indicator value appears in
/// `BarProcessed.indicators`: two decimal digits of panel, one style letter,
/// one color letter, an underscore, then the canonical indicator name.
pub fn encode_indicator_key(plot: PlotSpec, name: &str) -> String {
    format!(
        "{:02}{}{}_{}",
        plot.panel,
        plot.style.code(),
        plot.color.code(),
        name
    )
}

/// A modification awaiting broker acknowledgment: acceptance installs the
/// proposed fields, rejection restores the prior ones.
#[derive(Clone, Debug)]
struct ModificationInFlight {
    original: OrderRecord,
    proposed: OrderRecord,
}

/// An order intent under construction; built by strategy logic and turned
/// into an `OrderSubmissionRequest` by [`StrategyApi::submit_order`].
#[derive(Clone, Debug)]
pub struct OrderIntent {
    pub order_type: OrderType,
    pub side: TradeSide,
    pub quantity: f64,
    pub limit_price: Option<f64>,
    pub stop_price: Option<f64>,
    pub action: Option<ActionType>,
    pub signal: Option<String>,
    /// Target symbol; defaults to the active symbol of the current bar.
    pub symbol: Option<String>,
}

impl OrderIntent {
    pub fn market(side: TradeSide, quantity: f64) -> Self {
        Self {
            order_type: OrderType::Market,
            side,
            quantity,
            limit_price: None,
            stop_price: None,
            action: None,
            signal: None,
            symbol: None,
        }
    }

    pub fn limit(side: TradeSide, quantity: f64, limit_price: f64) -> Self {
        Self {
            limit_price: Some(limit_price),
            order_type: OrderType::Limit,
            ..Self::market(side, quantity)
        }
    }

    pub fn stop(side: TradeSide, quantity: f64, stop_price: f64) -> Self {
        Self {
            stop_price: Some(stop_price),
            order_type: OrderType::Stop,
            ..Self::market(side, quantity)
        }
    }

    pub fn stop_limit(side: TradeSide, quantity: f64, stop_price: f64, limit_price: f64) -> Self {
        Self {
            stop_price: Some(stop_price),
            limit_price: Some(limit_price),
            order_type: OrderType::StopLimit,
            ..Self::market(side, quantity)
        }
    }

    pub fn action(mut self, action: ActionType) -> Self {
        self.action = Some(action);
        self
    }

    pub fn signal(mut self, signal: impl Into<String>) -> Self {
        self.signal = Some(signal.into());
        self
    }

    pub fn symbol(mut self, symbol: impl Into<String>) -> Self {
        self.symbol = Some(symbol.into());
        self
    }
}

/// Per-instance strategy state plus the bus-facing order operations.
pub struct StrategyApi {
    bus: Arc<EventBus>,
    indicators: Vec<Box<dyn Indicator>>,
    open: IndicatorHandle,
    high: IndicatorHandle,
    low: IndicatorHandle,
    close: IndicatorHandle,
    volume: IndicatorHandle,
    params: ResolvedParams,
    active_symbol: String,
    active_ts_ns: i64,
    positions: HashMap<String, Position>,
    fills: HashMap<String, Vec<FillRecord>>,
    pending_orders: BTreeMap<Uuid, OrderRecord>,
    submitted_orders: BTreeMap<Uuid, OrderRecord>,
    submitted_modifications: BTreeMap<Uuid, ModificationInFlight>,
    submitted_cancellations: BTreeMap<Uuid, OrderRecord>,
}

impl StrategyApi {
    pub(crate) fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    pub(crate) fn new(bus: Arc<EventBus>, params: ResolvedParams) -> Self {
        let mut api = Self {
            bus,
            indicators: Vec::new(),
            open: IndicatorHandle(0),
            high: IndicatorHandle(0),
            low: IndicatorHandle(0),
            close: IndicatorHandle(0),
            volume: IndicatorHandle(0),
            params,
            active_symbol: String::new(),
            active_ts_ns: 0,
            positions: HashMap::new(),
            fills: HashMap::new(),
            pending_orders: BTreeMap::new(),
            submitted_orders: BTreeMap::new(),
            submitted_modifications: BTreeMap::new(),
            submitted_cancellations: BTreeMap::new(),
        };
        // OHLCV identity indicators give bar fields the same history access
        // as computed indicators.
        api.open = api.add_indicator(Box::new(Open::new()));
        api.high = api.add_indicator(Box::new(High::new()));
        api.low = api.add_indicator(Box::new(Low::new()));
        api.close = api.add_indicator(Box::new(Close::new()));
        api.volume = api.add_indicator(Box::new(Volume::new()));
        api
    }

    // ------------------------------------------------------------------
    // Indicators
    // ------------------------------------------------------------------

    /// Register an indicator; it will be updated on every accepted bar.
    /// Returns a handle for later reads.
    pub fn add_indicator(&mut self, indicator: Box<dyn Indicator>) -> IndicatorHandle {
        self.indicators.push(indicator);
        IndicatorHandle(self.indicators.len() - 1)
    }

    pub fn indicator(&self, handle: IndicatorHandle) -> &dyn Indicator {
        self.indicators[handle.0].as_ref()
    }

    /// Latest value of an indicator for the active symbol.
    pub fn latest(&self, handle: IndicatorHandle) -> f64 {
        self.indicator(handle).latest(&self.active_symbol)
    }

    /// Indexed read of an indicator for the active symbol (`-1` latest).
    pub fn get(&self, handle: IndicatorHandle, index: i64) -> f64 {
        self.indicator(handle).get(&self.active_symbol, index)
    }

    pub fn open(&self) -> IndicatorHandle {
        self.open
    }

    pub fn high(&self) -> IndicatorHandle {
        self.high
    }

    pub fn low(&self) -> IndicatorHandle {
        self.low
    }

    pub fn close(&self) -> IndicatorHandle {
        self.close
    }

    pub fn volume(&self) -> IndicatorHandle {
        self.volume
    }

    pub(crate) fn update_indicators(&mut self, bar: &BarReceived) {
        for indicator in &mut self.indicators {
            indicator.update(bar);
        }
    }

    /// Encoded indicator values for a processed bar. Indicators on the
    /// reserved identity panel are omitted.
    pub(crate) fn indicator_values(&self, symbol: &str) -> BTreeMap<String, f64> {
        self.indicators
            .iter()
            .filter(|ind| ind.plot().panel != IDENTITY_PANEL)
            .map(|ind| {
                (
                    encode_indicator_key(ind.plot(), &ind.name()),
                    ind.latest(symbol),
                )
            })
            .collect()
    }

    // ------------------------------------------------------------------
    // Context & parameters
    // ------------------------------------------------------------------

    pub fn params(&self) -> &ResolvedParams {
        &self.params
    }

    /// Symbol of the bar currently being processed.
    pub fn active_symbol(&self) -> &str {
        &self.active_symbol
    }

    /// `ts_event_ns` of the bar currently being processed.
    pub fn active_ts_ns(&self) -> i64 {
        self.active_ts_ns
    }

    pub(crate) fn set_active(&mut self, symbol: &str, ts_event_ns: i64) {
        self.active_symbol.clear();
        self.active_symbol.push_str(symbol);
        self.active_ts_ns = ts_event_ns;
    }

    // ------------------------------------------------------------------
    // Positions & fills
    // ------------------------------------------------------------------

    /// Signed position for the active symbol.
    pub fn position(&self) -> f64 {
        self.position_for(&self.active_symbol)
    }

    /// Weighted-average entry price for the active symbol; zero when flat.
    pub fn avg_price(&self) -> f64 {
        self.avg_price_for(&self.active_symbol)
    }

    pub fn position_for(&self, symbol: &str) -> f64 {
        self.positions.get(symbol).map_or(0.0, |p| p.quantity)
    }

    pub fn avg_price_for(&self, symbol: &str) -> f64 {
        self.positions.get(symbol).map_or(0.0, |p| p.avg_price)
    }

    /// All fills observed for a symbol, in arrival order.
    pub fn fills(&self, symbol: &str) -> &[FillRecord] {
        self.fills.get(symbol).map_or(&[], |f| f.as_slice())
    }

    pub fn pending_orders(&self) -> &BTreeMap<Uuid, OrderRecord> {
        &self.pending_orders
    }

    // ------------------------------------------------------------------
    // Order operations
    // ------------------------------------------------------------------

    /// Submit a new order; returns the generated `system_order_id`.
    ///
    /// The intent's symbol defaults to the active symbol, and the request is
    /// stamped with the active bar timestamp.
    pub fn submit_order(&mut self, intent: OrderIntent) -> Uuid {
        let order_id = Uuid::new_v4();
        let symbol = intent
            .symbol
            .unwrap_or_else(|| self.active_symbol.clone());

        self.submitted_orders.insert(
            order_id,
            OrderRecord {
                order_id,
                symbol: symbol.clone(),
                order_type: intent.order_type,
                side: intent.side,
                quantity: intent.quantity,
                limit_price: intent.limit_price,
                stop_price: intent.stop_price,
                signal: intent.signal.clone(),
                filled_quantity: 0.0,
            },
        );

        self.bus.publish(OrderSubmissionRequest::new(
            self.active_ts_ns,
            order_id,
            symbol,
            intent.order_type,
            intent.side,
            intent.quantity,
            intent.limit_price,
            intent.stop_price,
            intent.action,
            intent.signal,
        ));
        order_id
    }

    /// Request modification of a pending order. Returns `false` (and does
    /// nothing) when the order is not pending.
    pub fn submit_modification(
        &mut self,
        order_id: Uuid,
        quantity: Option<f64>,
        limit_price: Option<f64>,
        stop_price: Option<f64>,
    ) -> bool {
        let Some(original) = self.pending_orders.remove(&order_id) else {
            return false;
        };
        let symbol = original.symbol.clone();

        let proposed = OrderRecord {
            quantity: quantity.unwrap_or(original.quantity),
            limit_price: limit_price.or(original.limit_price),
            stop_price: stop_price.or(original.stop_price),
            ..original.clone()
        };
        self.submitted_modifications
            .insert(order_id, ModificationInFlight { original, proposed });

        self.bus.publish(OrderModificationRequest::new(
            self.active_ts_ns,
            order_id,
            symbol,
            quantity,
            limit_price,
            stop_price,
        ));
        true
    }

    /// Request cancellation of a pending order. Returns `false` (and does
    /// nothing) when the order is not pending.
    pub fn submit_cancellation(&mut self, order_id: Uuid) -> bool {
        let Some(original) = self.pending_orders.remove(&order_id) else {
            return false;
        };
        let symbol = original.symbol.clone();
        self.submitted_cancellations.insert(order_id, original);

        self.bus.publish(OrderCancellationRequest::new(
            self.active_ts_ns,
            order_id,
            symbol,
        ));
        true
    }

    // ------------------------------------------------------------------
    // Response state machine (driven by the runtime)
    // ------------------------------------------------------------------

    pub(crate) fn on_order_accepted(&mut self, order_id: Uuid) {
        if let Some(order) = self.submitted_orders.remove(&order_id) {
            self.pending_orders.insert(order_id, order);
        }
    }

    pub(crate) fn on_order_rejected(&mut self, order_id: Uuid) {
        self.submitted_orders.remove(&order_id);
    }

    pub(crate) fn on_modification_accepted(&mut self, order_id: Uuid) {
        if let Some(inflight) = self.submitted_modifications.remove(&order_id) {
            self.pending_orders.insert(order_id, inflight.proposed);
        }
    }

    /// A rejected modification leaves the order live with its prior fields.
    pub(crate) fn on_modification_rejected(&mut self, order_id: Uuid) {
        if let Some(inflight) = self.submitted_modifications.remove(&order_id) {
            self.pending_orders.insert(order_id, inflight.original);
        }
    }

    pub(crate) fn on_cancellation_accepted(&mut self, order_id: Uuid) {
        self.submitted_cancellations.remove(&order_id);
        self.pending_orders.remove(&order_id);
    }

    pub(crate) fn on_cancellation_rejected(&mut self, order_id: Uuid) {
        if let Some(order) = self.submitted_cancellations.remove(&order_id) {
            self.pending_orders.insert(order_id, order);
        }
    }

    pub(crate) fn on_fill(&mut self, fill: &qf_events::orders::FillEvent) {
        if let Some(order) = self.pending_orders.get_mut(&fill.system_order_id) {
            order.filled_quantity += fill.quantity_filled;
            if order.filled_quantity >= order.quantity {
                self.pending_orders.remove(&fill.system_order_id);
            }
        } else {
            // A fill can race a modification or cancellation in flight; the
            // order is terminal either way.
            self.submitted_modifications.remove(&fill.system_order_id);
            self.submitted_cancellations.remove(&fill.system_order_id);
        }

        self.fills
            .entry(fill.symbol.clone())
            .or_default()
            .push(FillRecord {
                fill_id: fill.fill_id,
                order_id: fill.system_order_id,
                symbol: fill.symbol.clone(),
                side: fill.side,
                quantity: fill.quantity_filled,
                price: fill.fill_price,
                commission: fill.commission,
                ts_event_ns: fill.ts_event_ns,
            });

        let position = self.positions.entry(fill.symbol.clone()).or_default();
        *position = position.apply_fill(fill.side, fill.quantity_filled, fill.fill_price);
    }

    pub(crate) fn on_order_expired(&mut self, order_id: Uuid) {
        self.pending_orders.remove(&order_id);
        self.submitted_modifications.remove(&order_id);
        self.submitted_cancellations.remove(&order_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::ResolvedParams;
    use qf_events::orders::FillEvent;
    use qf_models::{PlotColor, PlotStyle};

    fn api() -> StrategyApi {
        let mut api = StrategyApi::new(Arc::new(EventBus::new()), ResolvedParams::default());
        api.set_active("AAA", 1);
        api
    }

    fn fill(order_id: Uuid, side: TradeSide, quantity: f64, price: f64) -> FillEvent {
        FillEvent::new(2, order_id, "AAA", side, quantity, price, 0.0, "SIMULATED", 2)
    }

    #[test]
    fn encoded_key_format() {
        let plot = PlotSpec::new(0, PlotStyle::Line, PlotColor::Blue);
        assert_eq!(encode_indicator_key(plot, "SMA_20_CLOSE"), "00LB_SMA_20_CLOSE");

        let plot = PlotSpec::new(2, PlotStyle::Histogram, PlotColor::Red);
        assert_eq!(encode_indicator_key(plot, "RSI_14_CLOSE"), "02HR_RSI_14_CLOSE");
    }

    #[test]
    fn submission_moves_to_pending_on_acceptance() {
        let mut api = api();
        let id = api.submit_order(OrderIntent::market(TradeSide::Buy, 1.0));
        assert!(api.pending_orders().is_empty());

        api.on_order_accepted(id);
        assert!(api.pending_orders().contains_key(&id));
    }

    #[test]
    fn rejection_drops_the_submission() {
        let mut api = api();
        let id = api.submit_order(OrderIntent::market(TradeSide::Buy, 1.0));
        api.on_order_rejected(id);
        assert!(api.pending_orders().is_empty());

        // A late acceptance for the same id is a no-op.
        api.on_order_accepted(id);
        assert!(api.pending_orders().is_empty());
    }

    #[test]
    fn modification_applies_on_acceptance() {
        let mut api = api();
        let id = api.submit_order(OrderIntent::limit(TradeSide::Buy, 10.0, 100.0));
        api.on_order_accepted(id);

        assert!(api.submit_modification(id, Some(5.0), Some(99.0), None));
        assert!(!api.pending_orders().contains_key(&id));

        api.on_modification_accepted(id);
        let order = &api.pending_orders()[&id];
        assert_eq!(order.quantity, 5.0);
        assert_eq!(order.limit_price, Some(99.0));
    }

    #[test]
    fn modification_rejection_restores_prior_fields() {
        let mut api = api();
        let id = api.submit_order(OrderIntent::limit(TradeSide::Buy, 10.0, 100.0));
        api.on_order_accepted(id);

        assert!(api.submit_modification(id, Some(5.0), None, None));
        api.on_modification_rejected(id);

        let order = &api.pending_orders()[&id];
        assert_eq!(order.quantity, 10.0);
        assert_eq!(order.limit_price, Some(100.0));
    }

    #[test]
    fn modification_of_unknown_order_is_refused() {
        let mut api = api();
        assert!(!api.submit_modification(Uuid::new_v4(), Some(5.0), None, None));
    }

    #[test]
    fn cancellation_flow() {
        let mut api = api();
        let id = api.submit_order(OrderIntent::limit(TradeSide::Buy, 10.0, 100.0));
        api.on_order_accepted(id);

        assert!(api.submit_cancellation(id));
        assert!(!api.pending_orders().contains_key(&id));

        api.on_cancellation_accepted(id);
        assert!(api.pending_orders().is_empty());
    }

    #[test]
    fn cancellation_rejection_restores_the_order() {
        let mut api = api();
        let id = api.submit_order(OrderIntent::limit(TradeSide::Buy, 10.0, 100.0));
        api.on_order_accepted(id);

        assert!(api.submit_cancellation(id));
        api.on_cancellation_rejected(id);
        assert!(api.pending_orders().contains_key(&id));
    }

    #[test]
    fn cancellation_of_unknown_order_is_refused() {
        let mut api = api();
        assert!(!api.submit_cancellation(Uuid::new_v4()));
    }

    #[test]
    fn fill_updates_position_and_clears_the_order() {
        let mut api = api();
        let id = api.submit_order(OrderIntent::market(TradeSide::Buy, 2.0));
        api.on_order_accepted(id);

        api.on_fill(&fill(id, TradeSide::Buy, 2.0, 102.0));
        assert!(api.pending_orders().is_empty());
        assert_eq!(api.position(), 2.0);
        assert_eq!(api.avg_price(), 102.0);
        assert_eq!(api.fills("AAA").len(), 1);
        assert_eq!(api.fills("AAA")[0].price, 102.0);
    }

    #[test]
    fn expiry_clears_the_order_without_touching_positions() {
        let mut api = api();
        let id = api.submit_order(OrderIntent::limit(TradeSide::Buy, 1.0, 90.0));
        api.on_order_accepted(id);

        api.on_order_expired(id);
        assert!(api.pending_orders().is_empty());
        assert_eq!(api.position(), 0.0);
    }

    #[test]
    fn explicit_symbol_overrides_the_active_one() {
        let mut api = api();
        let id = api.submit_order(OrderIntent::market(TradeSide::Buy, 1.0).symbol("BBB"));
        api.on_order_accepted(id);
        assert_eq!(api.pending_orders()[&id].symbol, "BBB");
    }
}
