//! In-memory per-identity daily send quota.

use std::collections::HashMap;

use chrono::NaiveDate;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaExceeded;

#[derive(Debug, Clone, Copy)]
struct DailyUsage {
    day: NaiveDate,
    used: u32,
}

#[derive(Debug)]
pub struct QuotaLedger {
    daily_limit: Option<u32>,
    usage: HashMap<String, DailyUsage>,
}

impl QuotaLedger {
    pub fn new(daily_limit: Option<u32>) -> Self {
        Self {
            daily_limit,
            usage: HashMap::new(),
        }
    }

    fn used_on(&self, identity: &str, today: NaiveDate) -> u32 {
        self.usage
            .get(identity)
            .filter(|usage| usage.day == today)
            .map_or(0, |usage| usage.used)
    }

    /// `None` when the ledger has no limit.
    pub fn remaining(&self, identity: &str, today: NaiveDate) -> Option<u32> {
        self.daily_limit
            .map(|limit| limit.saturating_sub(self.used_on(identity, today)))
    }

    pub fn display(&self, identity: &str, today: NaiveDate) -> String {
        match (self.remaining(identity, today), self.daily_limit) {
            (Some(remaining), Some(limit)) => format!("{remaining}/{limit}"),
            _ => "unlimited".to_string(),
        }
    }

    pub fn try_consume(&mut self, identity: &str, today: NaiveDate) -> Result<(), QuotaExceeded> {
        if self.remaining(identity, today) == Some(0) {
            return Err(QuotaExceeded);
        }
        let entry = self
            .usage
            .entry(identity.to_string())
            .or_insert(DailyUsage { day: today, used: 0 });
        if entry.day != today {
            *entry = DailyUsage { day: today, used: 0 };
        }
        entry.used += 1;
        Ok(())
    }
}
