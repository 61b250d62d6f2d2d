use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Default)]
pub struct AtomicMetrics {
    pix_charges: AtomicU64,
    card_charges: AtomicU64,
    status_checks: AtomicU64,
    confirmations: AtomicU64,
    validation_rejections: AtomicU64,
    gateway_failures: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub pix_charges: u64,
    pub card_charges: u64,
    pub status_checks: u64,
    pub confirmations: u64,
    pub validation_rejections: u64,
    pub gateway_failures: u64,
}

impl AtomicMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment_pix_charges(&self) {
        self.pix_charges.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_card_charges(&self) {
        self.card_charges.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_status_checks(&self) {
        self.status_checks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_confirmations(&self) {
        self.confirmations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_validation_rejections(&self) {
        self.validation_rejections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_gateway_failures(&self) {
        self.gateway_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            pix_charges: self.pix_charges.load(Ordering::Relaxed),
            card_charges: self.card_charges.load(Ordering::Relaxed),
            status_checks: self.status_checks.load(Ordering::Relaxed),
            confirmations: self.confirmations.load(Ordering::Relaxed),
            validation_rejections: self.validation_rejections.load(Ordering::Relaxed),
            gateway_failures: self.gateway_failures.load(Ordering::Relaxed),
        }
    }
}
