//! Finance module: owner-scoped transaction ledger, a sidebar group and
//! a realm grouping its entities on the console index.

use std::sync::Arc;

use crate::auth::Viewer;
use crate::console::{
    DataSourceHandler, FeatureModule, LinkTarget, Realm, Record, SidebarItem, SidebarModule,
};
use crate::db::{Store, Transaction};
use crate::error::ConsoleError;
use crate::registry::RegistrationQueue;

pub struct FinanceModule {
    store: Store,
}

impl FinanceModule {
    pub fn new(store: Store) -> Self {
        Self { store }
    }
}

impl FeatureModule for FinanceModule {
    fn name(&self) -> &str {
        "finance"
    }

    fn handlers(&self) -> Vec<Arc<dyn DataSourceHandler>> {
        vec![Arc::new(TransactionHandler {
            store: self.store.clone(),
        })]
    }

    fn setup(&self, queue: &mut RegistrationQueue) -> Result<(), ConsoleError> {
        queue.enqueue_autoregister(self.name())?;
        queue.enqueue_sidebar_module(SidebarModule {
            id: "finance".to_string(),
            title: "Finance".to_string(),
            items: vec![SidebarItem {
                label: "Transactions".to_string(),
                target: LinkTarget::route("admin:finance.transaction:list"),
            }],
        })?;
        queue.enqueue_realm(Realm {
            id: "finance".to_string(),
            title: "Finance".to_string(),
            entity_types: vec!["finance.transaction".to_string()],
        })?;
        Ok(())
    }
}

struct TransactionHandler {
    store: Store,
}

fn format_amount(amount_minor: i64, currency: &str) -> String {
    let sign = if amount_minor < 0 { "-" } else { "" };
    let abs = amount_minor.unsigned_abs();
    format!("{}{}.{:02} {}", sign, abs / 100, abs % 100, currency)
}

fn to_record(tx: Transaction) -> Record {
    Record {
        key: tx.id.to_string(),
        title: tx.payee.clone(),
        body: format!(
            "{} to {}{}",
            format_amount(tx.amount_minor, &tx.currency),
            tx.payee,
            if tx.memo.is_empty() {
                String::new()
            } else {
                format!(": {}", tx.memo)
            }
        ),
    }
}

impl DataSourceHandler for TransactionHandler {
    fn entity_type(&self) -> &str {
        "finance.transaction"
    }

    fn search(&self, viewer: &Viewer, query: &str) -> anyhow::Result<Vec<Record>> {
        if !viewer.is_authenticated {
            return Ok(Vec::new());
        }
        let transactions = self.store.search_transactions(&viewer.username, query)?;
        Ok(transactions.into_iter().map(to_record).collect())
    }

    fn list(&self, viewer: &Viewer) -> anyhow::Result<Vec<Record>> {
        if !viewer.is_authenticated {
            return Ok(Vec::new());
        }
        let transactions = self.store.list_transactions(&viewer.username)?;
        Ok(transactions.into_iter().map(to_record).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_amounts_in_minor_units() {
        assert_eq!(format_amount(123456, "PLN"), "1234.56 PLN");
        assert_eq!(format_amount(-505, "USD"), "-5.05 USD");
        assert_eq!(format_amount(7, "EUR"), "0.07 EUR");
    }
}
