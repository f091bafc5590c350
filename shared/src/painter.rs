use chrono::{DateTime, Utc};

use crate::board::{self, BoardAction, PixelBoard};
use crate::color::{self, ERASE_COLOR};
use crate::error::BoardError;
use crate::grid::WorldGrid;
use crate::payment::{COOLDOWN_SKIP_FEE, PaymentGateway, TransactionId};
use crate::session::{ChargePolicy, SessionCharges, SessionStatus};
use crate::store::{KeyValueStore, StoreError};

pub const PAINTED_PIXELS_KEY: &str = "worldboard.paintedPixels";
pub const PIXEL_CHARGES_KEY: &str = "worldboard.pixelCharges";
pub const LAST_REGEN_KEY: &str = "worldboard.lastRegenAt";

/// Result of a paid cooldown skip.
#[derive(Debug, Clone, PartialEq)]
pub enum SkipOutcome {
    Skipped { tx: TransactionId },
    NotCooling,
}

/// One user's painting session: the locally painted pixels, the charge
/// balance, and the store they are written back to after every mutation.
pub struct Painter<S> {
    board: PixelBoard,
    session: SessionCharges,
    policy: ChargePolicy,
    store: S,
}

impl<S: KeyValueStore> Painter<S> {
    /// Load the persisted session, falling back to an empty board and a
    /// full balance where nothing (or nothing parseable) is stored.
    pub fn load(
        grid: WorldGrid,
        policy: ChargePolicy,
        store: S,
        now: DateTime<Utc>,
    ) -> Result<Self, BoardError> {
        let pixels = match store.get(PAINTED_PIXELS_KEY).map_err(storage_error)? {
            Some(raw) => board::parse_stored_pixels(&raw),
            None => board::PixelMap::new(),
        };

        let charges = store
            .get(PIXEL_CHARGES_KEY)
            .map_err(storage_error)?
            .and_then(|raw| raw.trim().parse::<u32>().ok())
            .unwrap_or(policy.max_charges);
        let last_regen = store
            .get(LAST_REGEN_KEY)
            .map_err(storage_error)?
            .and_then(|raw| raw.trim().parse::<i64>().ok())
            .and_then(DateTime::from_timestamp_millis)
            .unwrap_or(now);

        Ok(Self {
            board: PixelBoard::from_pixels(grid, pixels),
            session: SessionCharges::restore(charges, last_regen, policy),
            policy,
            store,
        })
    }

    pub fn board(&self) -> &PixelBoard {
        &self.board
    }

    pub fn status(&self, now: DateTime<Utc>) -> SessionStatus {
        self.session.status(self.policy, now)
    }

    pub fn charges(&self, now: DateTime<Utc>) -> u32 {
        self.session.available(self.policy, now)
    }

    /// Paint the cell under a geographic point. Consumes one charge; the
    /// zero color is an erase and consumes nothing. On rejection nothing
    /// mutates.
    pub fn paint_at(
        &mut self,
        lat: f64,
        lng: f64,
        value: &str,
        now: DateTime<Utc>,
    ) -> Result<BoardAction, BoardError> {
        let color = color::normalize_hex(value)?;
        if color == ERASE_COLOR {
            return self.erase_at(lat, lng);
        }

        self.session.spend(self.policy, now)?;

        let cell = self.board.grid().cell_at(lat, lng);
        let action = self.board.apply(cell.x as i64, cell.y as i64, &color)?;

        self.persist_pixels()?;
        self.persist_session()?;
        Ok(action)
    }

    /// Erase the cell under a geographic point. Never consumes a charge;
    /// erasing an unpainted cell changes nothing.
    pub fn erase_at(&mut self, lat: f64, lng: f64) -> Result<BoardAction, BoardError> {
        let cell = self.board.grid().cell_at(lat, lng);
        let action = self.board.erase(cell);
        if action.changed() {
            self.persist_pixels()?;
        }
        Ok(action)
    }

    /// Pay the cooldown-skip fee through the collaborator and restore the
    /// full balance. A session that is not cooling pays nothing.
    pub fn skip_cooldown<G: PaymentGateway>(
        &mut self,
        gateway: &G,
        now: DateTime<Utc>,
    ) -> Result<SkipOutcome, BoardError> {
        if let SessionStatus::Ready { .. } = self.session.status(self.policy, now) {
            return Ok(SkipOutcome::NotCooling);
        }

        let tx = gateway
            .pay(COOLDOWN_SKIP_FEE)
            .map_err(|e| BoardError::RemoteUnavailable {
                reason: e.to_string(),
            })?;

        self.session.restore_full(self.policy, now);
        self.persist_session()?;
        Ok(SkipOutcome::Skipped { tx })
    }

    fn persist_pixels(&self) -> Result<(), BoardError> {
        let encoded = board::encode_stored_pixels(self.board.pixels())?;
        self.store
            .set(PAINTED_PIXELS_KEY, &encoded)
            .map_err(storage_error)
    }

    fn persist_session(&self) -> Result<(), BoardError> {
        self.store
            .set(PIXEL_CHARGES_KEY, &self.session.charges().to_string())
            .map_err(storage_error)?;
        self.store
            .set(
                LAST_REGEN_KEY,
                &self.session.last_regen().timestamp_millis().to_string(),
            )
            .map_err(storage_error)
    }
}

fn storage_error(e: StoreError) -> BoardError {
    BoardError::StorageUnavailable {
        reason: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::{
        LAST_REGEN_KEY, PAINTED_PIXELS_KEY, PIXEL_CHARGES_KEY, Painter, SkipOutcome,
    };
    use crate::board::BoardAction;
    use crate::error::BoardError;
    use crate::grid::WorldGrid;
    use crate::payment::{PaymentError, PaymentGateway, TransactionId};
    use crate::session::{ChargePolicy, SessionStatus};
    use crate::store::{KeyValueStore, MemoryStore};
    use chrono::{DateTime, TimeDelta, TimeZone, Utc};

    struct FakeGateway {
        result: Result<TransactionId, PaymentError>,
        calls: Cell<u32>,
    }

    impl FakeGateway {
        fn succeeding() -> Self {
            Self {
                result: Ok(TransactionId("0xfeedface".to_string())),
                calls: Cell::new(0),
            }
        }

        fn failing() -> Self {
            Self {
                result: Err(PaymentError::Unavailable {
                    reason: "rpc down".to_string(),
                }),
                calls: Cell::new(0),
            }
        }
    }

    impl PaymentGateway for FakeGateway {
        fn pay(&self, _fee: &str) -> Result<TransactionId, PaymentError> {
            self.calls.set(self.calls.get() + 1);
            self.result.clone()
        }
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 1, 9, 0, 0).unwrap()
    }

    fn policy() -> ChargePolicy {
        ChargePolicy {
            max_charges: 2,
            regen_interval: TimeDelta::seconds(30),
        }
    }

    fn painter(store: &MemoryStore) -> Painter<&MemoryStore> {
        Painter::load(WorldGrid::world(), policy(), store, t0()).unwrap()
    }

    #[test]
    fn fresh_session_starts_full_and_empty() {
        let store = MemoryStore::new();
        let painter = painter(&store);
        assert!(painter.board().is_empty());
        assert_eq!(painter.charges(t0()), 2);
    }

    #[test]
    fn painting_consumes_a_charge_and_persists() {
        let store = MemoryStore::new();
        let mut painter = painter(&store);

        let action = painter.paint_at(48.8566, 2.3522, "#FB7185", t0()).unwrap();
        let BoardAction::Painted { cell, color, .. } = action else {
            panic!("expected a paint");
        };
        assert_eq!(color, "#fb7185");
        assert_eq!(painter.board().color_at(cell), Some("#fb7185"));
        assert_eq!(painter.charges(t0()), 1);

        let stored = store.get(PAINTED_PIXELS_KEY).unwrap().unwrap();
        assert!(stored.contains("#fb7185"));
        assert_eq!(store.get(PIXEL_CHARGES_KEY).unwrap().as_deref(), Some("1"));
        assert_eq!(
            store.get(LAST_REGEN_KEY).unwrap().as_deref(),
            Some(t0().timestamp_millis().to_string().as_str())
        );
    }

    #[test]
    fn exhaustion_rejects_without_touching_the_board() {
        let store = MemoryStore::new();
        let mut painter = painter(&store);

        painter.paint_at(10.0, 10.0, "#ff0000", t0()).unwrap();
        painter.paint_at(11.0, 11.0, "#ff0000", t0()).unwrap();
        assert!(matches!(
            painter.status(t0()),
            SessionStatus::Cooling { .. }
        ));

        let before = painter.board().pixels().clone();
        let err = painter.paint_at(12.0, 12.0, "#ff0000", t0()).unwrap_err();
        assert!(matches!(err, BoardError::RateLimited { .. }));
        assert_eq!(painter.board().pixels(), &before);
        assert_eq!(store.get(PIXEL_CHARGES_KEY).unwrap().as_deref(), Some("0"));
    }

    #[test]
    fn erase_is_free_even_while_cooling() {
        let store = MemoryStore::new();
        let mut painter = painter(&store);

        painter.paint_at(10.0, 10.0, "#ff0000", t0()).unwrap();
        painter.paint_at(11.0, 11.0, "#ff0000", t0()).unwrap();
        assert_eq!(painter.charges(t0()), 0);

        let action = painter.erase_at(10.0, 10.0).unwrap();
        assert!(action.changed());
        assert_eq!(painter.board().len(), 1);
        assert_eq!(painter.charges(t0()), 0);
        assert_eq!(store.get(PIXEL_CHARGES_KEY).unwrap().as_deref(), Some("0"));
    }

    #[test]
    fn zero_color_paint_erases_for_free() {
        let store = MemoryStore::new();
        let mut painter = painter(&store);

        painter.paint_at(10.0, 10.0, "#ff0000", t0()).unwrap();
        let action = painter.paint_at(10.0, 10.0, "#000000", t0()).unwrap();
        assert!(matches!(action, BoardAction::Erased { .. }));
        assert!(painter.board().is_empty());
        assert_eq!(painter.charges(t0()), 1);
    }

    #[test]
    fn erasing_unpainted_is_a_noop_and_writes_nothing() {
        let store = MemoryStore::new();
        let mut painter = painter(&store);

        let action = painter.erase_at(0.0, 0.0).unwrap();
        assert!(!action.changed());
        assert_eq!(store.get(PAINTED_PIXELS_KEY).unwrap(), None);
    }

    #[test]
    fn session_reloads_from_the_store() {
        let store = MemoryStore::new();
        {
            let mut painter = painter(&store);
            painter.paint_at(48.8566, 2.3522, "#fb7185", t0()).unwrap();
        }

        let later = t0() + TimeDelta::seconds(5);
        let reloaded = Painter::load(WorldGrid::world(), policy(), &store, later).unwrap();
        assert_eq!(reloaded.board().len(), 1);
        assert_eq!(reloaded.charges(later), 1);
    }

    #[test]
    fn malformed_persisted_values_fall_back_to_defaults() {
        let store = MemoryStore::new();
        store.set(PAINTED_PIXELS_KEY, "not json").unwrap();
        store.set(PIXEL_CHARGES_KEY, "many").unwrap();
        store.set(LAST_REGEN_KEY, "yesterday").unwrap();

        let painter = painter(&store);
        assert!(painter.board().is_empty());
        assert_eq!(painter.charges(t0()), 2);
    }

    #[test]
    fn invalid_color_rejects_before_spending() {
        let store = MemoryStore::new();
        let mut painter = painter(&store);

        let err = painter.paint_at(10.0, 10.0, "red", t0()).unwrap_err();
        assert!(matches!(err, BoardError::InvalidColor { .. }));
        assert_eq!(painter.charges(t0()), 2);
    }

    #[test]
    fn paid_skip_restores_the_full_balance() {
        let store = MemoryStore::new();
        let mut painter = painter(&store);
        painter.paint_at(10.0, 10.0, "#ff0000", t0()).unwrap();
        painter.paint_at(11.0, 11.0, "#ff0000", t0()).unwrap();

        let gateway = FakeGateway::succeeding();
        let outcome = painter.skip_cooldown(&gateway, t0()).unwrap();
        assert_eq!(
            outcome,
            SkipOutcome::Skipped {
                tx: TransactionId("0xfeedface".to_string())
            }
        );
        assert_eq!(gateway.calls.get(), 1);
        assert_eq!(painter.charges(t0()), 2);
        assert_eq!(store.get(PIXEL_CHARGES_KEY).unwrap().as_deref(), Some("2"));
    }

    #[test]
    fn failed_payment_leaves_the_session_cooling() {
        let store = MemoryStore::new();
        let mut painter = painter(&store);
        painter.paint_at(10.0, 10.0, "#ff0000", t0()).unwrap();
        painter.paint_at(11.0, 11.0, "#ff0000", t0()).unwrap();

        let gateway = FakeGateway::failing();
        let err = painter.skip_cooldown(&gateway, t0()).unwrap_err();
        assert!(matches!(err, BoardError::RemoteUnavailable { .. }));
        assert_eq!(painter.charges(t0()), 0);
    }

    #[test]
    fn skip_without_cooldown_pays_nothing() {
        let store = MemoryStore::new();
        let mut painter = painter(&store);

        let gateway = FakeGateway::succeeding();
        let outcome = painter.skip_cooldown(&gateway, t0()).unwrap();
        assert_eq!(outcome, SkipOutcome::NotCooling);
        assert_eq!(gateway.calls.get(), 0);
    }
}
