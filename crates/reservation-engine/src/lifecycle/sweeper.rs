//! Authoritative expiry sweep and the background task that drives it.

use crate::cart_actor::CartError;
use crate::clients::{CartClient, SavedCartClient};
use crate::clock::Clock;
use crate::model::{CartLine, SavedCartKey, SessionId};
use crate::saved_cart_actor::SavedCartError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Error, PartialEq)]
pub enum SweepError {
    #[error(transparent)]
    Cart(#[from] CartError),

    #[error(transparent)]
    SavedCart(#[from] SavedCartError),
}

/// Lines removed by one sweep.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SweepReport {
    pub cart_lines: Vec<(SessionId, CartLine)>,
    pub saved_lines: Vec<(SavedCartKey, CartLine)>,
    /// Another sweep was already running, so this one did nothing.
    pub skipped: bool,
}

impl SweepReport {
    /// What the polling interface reports back to the browser.
    pub fn any_removed(&self) -> bool {
        !self.cart_lines.is_empty() || !self.saved_lines.is_empty()
    }
}

struct InFlight(Arc<AtomicBool>);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Releases expired lines in every active and saved cart.
///
/// Each cart removes a line in the same message that releases its hold, so concurrent sweeps
/// never release twice. The in-flight guard only keeps one caller from stacking sweeps.
#[derive(Clone)]
pub struct Sweeper {
    carts: CartClient,
    saved: SavedCartClient,
    clock: Arc<dyn Clock>,
    in_flight: Arc<AtomicBool>,
}

impl Sweeper {
    pub fn new(carts: CartClient, saved: SavedCartClient, clock: Arc<dyn Clock>) -> Self {
        Self {
            carts,
            saved,
            clock,
            in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    /// The "sweep now" call. Idempotent; returns immediately if a sweep is in flight.
    pub async fn sweep_now(&self) -> Result<SweepReport, SweepError> {
        if self.in_flight.swap(true, Ordering::AcqRel) {
            debug!("Sweep already in flight");
            return Ok(SweepReport {
                skipped: true,
                ..SweepReport::default()
            });
        }
        let _guard = InFlight(self.in_flight.clone());

        let now = self.clock.now();
        let cart_lines = self.carts.sweep_expired(now).await?;
        let saved_lines = self.saved.sweep_expired(now).await?;
        for (session_id, line) in &cart_lines {
            info!(%session_id, product_id = %line.product_id, "An item was removed because its reservation expired");
        }
        Ok(SweepReport {
            cart_lines,
            saved_lines,
            skipped: false,
        })
    }

    /// Page-load sweep of a single session's cart.
    pub async fn sweep_session(&self, session_id: &SessionId) -> Result<Vec<CartLine>, SweepError> {
        Ok(self.carts.sweep_session(session_id, self.clock.now()).await?)
    }
}

/// Background task running [`Sweeper::sweep_now`] on a fixed interval.
pub struct ReservationClock {
    stop: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

impl ReservationClock {
    pub fn spawn(sweeper: Sweeper, period: Duration) -> Self {
        let (stop, mut stopped) = oneshot::channel::<()>();
        let period = period.max(Duration::from_millis(1));
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            info!(?period, "Reservation clock started");
            loop {
                tokio::select! {
                    _ = &mut stopped => break,
                    _ = ticker.tick() => match sweeper.sweep_now().await {
                        Ok(report) if report.any_removed() => info!(
                            cart_lines = report.cart_lines.len(),
                            saved_lines = report.saved_lines.len(),
                            "Expired reservations released"
                        ),
                        Ok(_) => {}
                        Err(e) => warn!(error = %e, "Sweep failed"),
                    },
                }
            }
            info!("Reservation clock stopped");
        });
        Self { stop, handle }
    }

    /// Stops the task after any sweep in progress finishes.
    pub async fn stop(self) {
        let _ = self.stop.send(());
        if let Err(e) = self.handle.await {
            warn!(error = %e, "Reservation clock task failed");
        }
    }
}
