use std::time::Duration;
use tokio::time;
use tracing::{error, info};

use crate::handlers::BookingManager;

/// Periodic pull-based sweep: releases bookings whose payment window
/// lapsed and expires coupons of closed campaigns. Every pass is
/// idempotent, so overlapping or repeated runs are harmless.
pub struct ExpirySweeper {
    manager: BookingManager,
    period: Duration,
}

impl ExpirySweeper {
    pub fn new(manager: BookingManager, period: Duration) -> Self {
        Self { manager, period }
    }

    pub async fn run(&self) {
        let mut interval = time::interval(self.period);

        loop {
            interval.tick().await;

            match self.manager.expire_timeouts().await {
                Ok(0) => {}
                Ok(expired) => info!("Expired {} unpaid bookings", expired),
                Err(e) => error!("Error expiring unpaid bookings: {}", e),
            }

            match self.manager.expire_coupons().await {
                Ok(0) => {}
                Ok(expired) => info!("Expired {} coupons of closed campaigns", expired),
                Err(e) => error!("Error expiring coupons: {}", e),
            }
        }
    }
}
