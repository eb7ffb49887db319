//! Aggregate reports over recorded transactions.
//!
//! Every summary accepts the same [`TransactionFilter`] as
//! [`InventoryStore::list_transactions`], so a report always agrees with the
//! listing it summarizes.

use rusqlite::params_from_iter;
use tower_inventory_core::{
    ActionSummary, ActionType, DailySummary, TechnicianSummary, Totals, TransactionFilter,
};

use crate::error::{Result, StoreError};
use crate::store::{InventoryStore, filter_clause};

const TOTALS: &str = "COUNT(*) AS n, COALESCE(SUM(t.quantity), 0) AS qty, \
                      COALESCE(SUM(t.price * t.quantity), 0.0) AS value";

fn totals(row: &rusqlite::Row<'_>) -> rusqlite::Result<Totals> {
    Ok(Totals {
        count: row.get("n")?,
        quantity: row.get("qty")?,
        value: row.get("value")?,
    })
}

impl InventoryStore {
    /// Totals per action type. All three types are always present, in
    /// Install, Remove, Repair order.
    pub fn summary_by_action(&self, filter: &TransactionFilter) -> Result<Vec<ActionSummary>> {
        let (clause, values) = filter_clause(filter);
        let sql = format!(
            "SELECT t.action_type AS action_type, {TOTALS}
             FROM transactions t {clause}
             GROUP BY t.action_type"
        );
        let mut stmt = self.connection().prepare(&sql)?;
        let found = stmt
            .query_map(params_from_iter(values), |row| {
                Ok((row.get::<_, String>("action_type")?, totals(row)?))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut summaries: Vec<ActionSummary> = ActionType::ALL
            .into_iter()
            .map(|action_type| ActionSummary {
                action_type,
                totals: Totals::default(),
            })
            .collect();
        for (name, row_totals) in found {
            let action: ActionType = name
                .parse()
                .map_err(|_| StoreError::ConversionError(format!("unknown action type '{name}'")))?;
            if let Some(summary) = summaries.iter_mut().find(|s| s.action_type == action) {
                summary.totals = row_totals;
            }
        }
        Ok(summaries)
    }

    /// Totals per technician with at least one matching transaction, by name.
    pub fn summary_by_technician(
        &self,
        filter: &TransactionFilter,
    ) -> Result<Vec<TechnicianSummary>> {
        let (clause, values) = filter_clause(filter);
        let sql = format!(
            "SELECT tech.technician_id AS technician_id, tech.name AS technician_name, {TOTALS}
             FROM transactions t
             JOIN technicians tech ON t.technician_id = tech.technician_id
             {clause}
             GROUP BY tech.technician_id
             ORDER BY tech.name, tech.technician_id"
        );
        let mut stmt = self.connection().prepare(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(values), |row| {
                Ok(TechnicianSummary {
                    technician_id: row.get("technician_id")?,
                    technician_name: row.get("technician_name")?,
                    totals: totals(row)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Totals per calendar day with activity, oldest first.
    pub fn summary_by_day(&self, filter: &TransactionFilter) -> Result<Vec<DailySummary>> {
        let (clause, values) = filter_clause(filter);
        let sql = format!(
            "SELECT substr(t.timestamp, 1, 10) AS day, {TOTALS}
             FROM transactions t {clause}
             GROUP BY day
             ORDER BY day"
        );
        let mut stmt = self.connection().prepare(&sql)?;
        let found = stmt
            .query_map(params_from_iter(values), |row| {
                Ok((row.get::<_, String>("day")?, totals(row)?))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        found
            .into_iter()
            .map(|(day, totals)| {
                let day = chrono::NaiveDate::parse_from_str(&day, "%Y-%m-%d")
                    .map_err(|e| StoreError::ConversionError(format!("bad day '{day}': {e}")))?;
                Ok(DailySummary { day, totals })
            })
            .collect()
    }
}
