// DANS : src/execution/retry.rs

use crate::errors::{SniperError, SniperResult};
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Politique de ré-essai bornée : `max_attempts` essais, délai doublé à chaque échec, plafonné à `max_delay`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// Délai à attendre après l'échec numéro `attempt` (à partir de 1).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }

    /// Exécute `operation` jusqu'au succès. Seules les erreurs `is_retryable` sont ré-essayées.
    pub async fn run<T, F, Fut>(&self, label: &str, mut operation: F) -> SniperResult<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = SniperResult<T>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match operation(attempt).await {
                Ok(value) => return Ok(value),
                Err(e) if !e.is_retryable() => return Err(e),
                Err(e) if attempt >= max_attempts => {
                    return Err(SniperError::RetriesExhausted { attempts: attempt, last: Box::new(e) });
                }
                Err(e) => {
                    let delay = self.delay_for(attempt);
                    warn!(label, attempt, max_attempts, delay_ms = delay.as_millis() as u64, error = %e, "Échec, nouvelle tentative.");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}
