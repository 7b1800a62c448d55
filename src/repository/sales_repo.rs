// ==========================================
// 门店补货预测系统 - 销售流水仓储
// ==========================================
// 职责: POS 流水写入, 按门店+窗口+渠道汇总
// ==========================================

use crate::domain::sales::{SalesAggregate, SalesTransaction, SalesWindow};
use crate::domain::types::TransactionType;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};

// ==========================================
// SalesRepository - 销售流水仓储
// ==========================================
pub struct SalesRepository {
    conn: Arc<Mutex<Connection>>,
}

impl SalesRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 批量写入流水 (单事务)
    pub fn batch_insert(&self, transactions: &[SalesTransaction]) -> RepositoryResult<usize> {
        if let Some(bad) = transactions.iter().find(|t| t.quantity < 0) {
            return Err(RepositoryError::ValidationError(format!(
                "销量不能为负: menu_item_id={}, quantity={}",
                bad.menu_item_id, bad.quantity
            )));
        }

        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;
        for t in transactions {
            tx.execute(
                r#"INSERT INTO sales_transaction (
                       menu_item_id, area_id, transaction_type, quantity, sales_date
                   ) VALUES (?1, ?2, ?3, ?4, ?5)"#,
                params![
                    t.menu_item_id,
                    t.area_id,
                    t.transaction_type.to_db_str(),
                    t.quantity,
                    t.sales_date.format("%Y-%m-%d").to_string(),
                ],
            )?;
        }
        tx.commit()?;
        Ok(transactions.len())
    }

    /// 按门店与窗口 [start, end) 汇总销量
    ///
    /// # 返回
    /// - 每个 (菜单品项, 渠道) 一行, 仅包含有流水的组合
    pub fn aggregate_window(
        &self,
        area_id: i64,
        window: SalesWindow,
    ) -> RepositoryResult<Vec<SalesAggregate>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(
            r#"SELECT menu_item_id, transaction_type, SUM(quantity)
               FROM sales_transaction
               WHERE area_id = ?1 AND sales_date >= ?2 AND sales_date < ?3
               GROUP BY menu_item_id, transaction_type
               ORDER BY menu_item_id, transaction_type"#,
        )?;

        let rows = stmt
            .query_map(
                params![
                    area_id,
                    window.start_date.format("%Y-%m-%d").to_string(),
                    window.end_date.format("%Y-%m-%d").to_string(),
                ],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, Option<i64>>(2)?,
                    ))
                },
            )?
            .collect::<Result<Vec<_>, _>>()?;

        let mut aggregates = Vec::with_capacity(rows.len());
        for (menu_item_id, raw_type, quantity) in rows {
            let transaction_type = TransactionType::from_db_str(&raw_type).ok_or_else(|| {
                RepositoryError::FieldValueError {
                    field: "transaction_type".to_string(),
                    message: format!("未知销售渠道: {}", raw_type),
                }
            })?;
            aggregates.push(SalesAggregate {
                menu_item_id,
                area_id,
                transaction_type,
                quantity: quantity.unwrap_or(0),
                window,
            });
        }

        Ok(aggregates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, day).unwrap()
    }

    fn tx(item: i64, area: i64, t: TransactionType, qty: i64, day: u32) -> SalesTransaction {
        SalesTransaction {
            menu_item_id: item,
            area_id: area,
            transaction_type: t,
            quantity: qty,
            sales_date: d(day),
        }
    }

    #[test]
    fn test_aggregate_window_sums_by_channel() {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::init_schema(&conn).unwrap();
        let repo = SalesRepository::new(Arc::new(Mutex::new(conn)));

        repo.batch_insert(&[
            tx(1, 1, TransactionType::DineIn, 10, 5),
            tx(1, 1, TransactionType::DineIn, 15, 10),
            tx(1, 1, TransactionType::TakeOut, 4, 12),
            tx(1, 1, TransactionType::DineIn, 99, 26), // 窗口外 (右开)
            tx(1, 2, TransactionType::DineIn, 50, 6),  // 其他门店
        ])
        .unwrap();

        let aggregates = repo.aggregate_window(1, SalesWindow::new(d(5), d(26))).unwrap();
        assert_eq!(aggregates.len(), 2);

        let dine_in = aggregates
            .iter()
            .find(|a| a.transaction_type == TransactionType::DineIn)
            .unwrap();
        assert_eq!(dine_in.quantity, 25);

        let take_out = aggregates
            .iter()
            .find(|a| a.transaction_type == TransactionType::TakeOut)
            .unwrap();
        assert_eq!(take_out.quantity, 4);
    }
}
