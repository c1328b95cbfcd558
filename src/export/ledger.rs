// File-backed account ledger: premium flag and export count per user, kept
// as pretty JSON next to the project like the rest of our on-disk state.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::gate::{Entitlement, EntitlementProvider, QuotaReceipt, QuotaService, Remaining, ServiceError};

pub const DEFAULT_LEDGER_FILE: &str = "samplx-ledger.json";

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Account {
    pub premium: bool,
    pub downloads: u32,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
struct LedgerFile {
    users: BTreeMap<String, Account>,
}

pub struct LocalLedger {
    path: PathBuf,
    free_limit: u32,
    state: LedgerFile,
}

impl LocalLedger {
    /// Open the ledger at `path`. A missing file is an empty ledger; it's
    /// only created on the first successful export.
    pub fn open(path: impl Into<PathBuf>, free_limit: u32) -> Result<Self, ServiceError> {
        let path = path.into();
        let state = match std::fs::read_to_string(&path) {
            Ok(data) => serde_json::from_str(&data)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => LedgerFile::default(),
            Err(e) => return Err(e.into()),
        };
        debug!(path = %path.display(), users = state.users.len(), "ledger opened");
        Ok(Self { path, free_limit, state })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn account(&self, user: &str) -> Account {
        self.state.users.get(user).cloned().unwrap_or_default()
    }

    pub fn set_premium(&mut self, user: &str, premium: bool) -> Result<(), ServiceError> {
        self.state.users.entry(user.to_string()).or_default().premium = premium;
        self.save()
    }

    fn remaining_for(&self, account: &Account) -> Remaining {
        if account.premium {
            Remaining::Unlimited
        } else {
            Remaining::Count(self.free_limit.saturating_sub(account.downloads))
        }
    }

    fn save(&self) -> Result<(), ServiceError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&self.state)?;
        std::fs::write(&self.path, json)?;
        Ok(())
    }
}

impl EntitlementProvider for LocalLedger {
    fn check_entitlement(&mut self, user: &str) -> Result<Entitlement, ServiceError> {
        Ok(Entitlement {
            is_premium: self.account(user).premium,
        })
    }
}

impl QuotaService for LocalLedger {
    fn check_quota(&mut self, user: &str) -> Result<Remaining, ServiceError> {
        Ok(self.remaining_for(&self.account(user)))
    }

    fn consume_quota(&mut self, user: &str) -> Result<QuotaReceipt, ServiceError> {
        let account = self.account(user);
        let remaining = self.remaining_for(&account);
        if remaining.is_exhausted() {
            return Ok(QuotaReceipt { success: false, remaining });
        }
        if account.premium {
            return Ok(QuotaReceipt { success: true, remaining });
        }

        let updated = Account {
            downloads: account.downloads + 1,
            ..account
        };
        let remaining = self.remaining_for(&updated);
        self.state.users.insert(user.to_string(), updated);
        self.save()?;
        Ok(QuotaReceipt { success: true, remaining })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_an_empty_ledger() {
        let dir = tempfile::tempdir().unwrap();
        let mut ledger = LocalLedger::open(dir.path().join("ledger.json"), 3).unwrap();
        assert_eq!(ledger.check_quota("ada").unwrap(), Remaining::Count(3));
        assert!(!ledger.check_entitlement("ada").unwrap().is_premium);
        assert!(!ledger.path().exists());
    }

    #[test]
    fn free_user_runs_out() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.json");
        let mut ledger = LocalLedger::open(&path, 2).unwrap();

        assert_eq!(ledger.consume_quota("ada").unwrap().remaining, Remaining::Count(1));
        assert_eq!(ledger.consume_quota("ada").unwrap().remaining, Remaining::Count(0));
        let refused = ledger.consume_quota("ada").unwrap();
        assert!(!refused.success);
        assert_eq!(ledger.account("ada").downloads, 2);

        // counts survive a reopen
        let reopened = LocalLedger::open(&path, 2).unwrap();
        assert_eq!(reopened.account("ada").downloads, 2);
    }

    #[test]
    fn checking_never_writes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.json");
        let mut ledger = LocalLedger::open(&path, 3).unwrap();
        ledger.consume_quota("ada").unwrap();
        let before = std::fs::read_to_string(&path).unwrap();

        ledger.check_quota("ada").unwrap();
        ledger.check_quota("bob").unwrap();
        ledger.check_entitlement("bob").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), before);
    }

    #[test]
    fn premium_is_unlimited() {
        let dir = tempfile::tempdir().unwrap();
        let mut ledger = LocalLedger::open(dir.path().join("nested/ledger.json"), 0).unwrap();
        ledger.set_premium("ada", true).unwrap();
        for _ in 0..5 {
            let r = ledger.consume_quota("ada").unwrap();
            assert!(r.success);
            assert_eq!(r.remaining, Remaining::Unlimited);
        }
        assert_eq!(ledger.account("ada").downloads, 0);
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(LocalLedger::open(&path, 3), Err(ServiceError::Corrupt(_))));
    }
}
