// Health check service implementation

use crate::models::Page;
use crate::services::TipLedger;

pub struct HealthChecker<'a> {
    ledger: &'a TipLedger,
}

impl<'a> HealthChecker<'a> {
    pub fn new(ledger: &'a TipLedger) -> Self {
        Self { ledger }
    }

    /// Reports whether the deposit store answers a minimal query
    pub async fn check(&self) -> bool {
        let page = Page { offset: 0, limit: 1 };
        match self.ledger.list_all(page).await {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!("Health check failed: {}", e);
                false
            }
        }
    }
}
