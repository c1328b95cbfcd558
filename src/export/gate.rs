// Who may export, and how often. The editor only talks to the account side
// through these two traits; `LocalLedger` is the built-in backend and tests
// script their own.

use std::fmt;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{EditorError, Result};

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("account service unavailable: {0}")]
    Unavailable(String),

    #[error("ledger io: {0}")]
    Io(#[from] std::io::Error),

    #[error("ledger is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entitlement {
    pub is_premium: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Remaining {
    Count(u32),
    Unlimited,
}

impl Remaining {
    pub fn is_exhausted(self) -> bool {
        self == Remaining::Count(0)
    }

    // the upgrade nag starts when the last free export is in sight
    pub fn is_low(self) -> bool {
        matches!(self, Remaining::Count(n) if n <= 1)
    }
}

impl fmt::Display for Remaining {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Remaining::Count(n) => write!(f, "{n}"),
            Remaining::Unlimited => write!(f, "unlimited"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QuotaReceipt {
    pub success: bool,
    pub remaining: Remaining,
}

pub trait EntitlementProvider {
    fn check_entitlement(&mut self, user: &str) -> std::result::Result<Entitlement, ServiceError>;
}

pub trait QuotaService {
    fn check_quota(&mut self, user: &str) -> std::result::Result<Remaining, ServiceError>;

    fn consume_quota(&mut self, user: &str) -> std::result::Result<QuotaReceipt, ServiceError>;
}

/// Anything that answers both questions.
pub trait AccountBackend: EntitlementProvider + QuotaService {}

impl<T: EntitlementProvider + QuotaService> AccountBackend for T {}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Authorization {
    pub premium: bool,
    pub remaining: Remaining,
}

pub struct ExportGate {
    backend: Box<dyn AccountBackend>,
    refresh: Duration,
    cached: Option<(String, Entitlement, Instant)>,
}

impl ExportGate {
    pub fn new(backend: Box<dyn AccountBackend>, refresh: Duration) -> Self {
        Self {
            backend,
            refresh,
            cached: None,
        }
    }

    /// Premium status, trusted for `refresh` before asking again. A backend
    /// that can't be reached counts as free tier.
    pub fn entitlement(&mut self, user: &str) -> Entitlement {
        if let Some((who, ent, at)) = &self.cached {
            if who == user && at.elapsed() < self.refresh {
                return *ent;
            }
        }

        let ent = match self.backend.check_entitlement(user) {
            Ok(ent) => ent,
            Err(e) => {
                warn!(user, error = %e, "entitlement check failed, treating as free tier");
                Entitlement::default()
            }
        };
        debug!(user, premium = ent.is_premium, "entitlement refreshed");
        self.cached = Some((user.to_string(), ent, Instant::now()));
        ent
    }

    /// Read-only quota lookup for display. `None` when the backend is down.
    pub fn remaining(&mut self, user: &str) -> Option<Remaining> {
        match self.backend.check_quota(user) {
            Ok(r) => Some(r),
            Err(e) => {
                warn!(user, error = %e, "quota check failed");
                None
            }
        }
    }

    /// Spend one export. Called exactly once per export action, before
    /// anything is rendered.
    pub fn authorize(&mut self, user: &str) -> Result<Authorization> {
        let premium = self.entitlement(user).is_premium;
        let receipt = match self.backend.consume_quota(user) {
            Ok(r) => r,
            Err(e) => {
                warn!(user, error = %e, "quota service failed, refusing export");
                return Err(EditorError::QuotaExceeded);
            }
        };
        if !receipt.success {
            info!(user, "export quota exhausted");
            return Err(EditorError::QuotaExceeded);
        }
        info!(user, premium, remaining = %receipt.remaining, "export authorized");
        Ok(Authorization {
            premium,
            remaining: receipt.remaining,
        })
    }

    pub fn forget_entitlement(&mut self) {
        self.cached = None;
    }
}
