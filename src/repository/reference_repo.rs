// ==========================================
// 门店补货预测系统 - 参考数据仓储
// ==========================================
// 职责: 门店/菜单品项/原料/BOM/按需品项的写入与快照加载
// 红线: Repository 不含业务逻辑
// ==========================================

use crate::domain::reference::{Area, BomLine, ByRequestItem, Ingredient, MenuItem, ReferenceData};
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};

// ==========================================
// ReferenceDataRepository - 参考数据仓储
// ==========================================
pub struct ReferenceDataRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ReferenceDataRepository {
    /// 创建新的参考数据仓储
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ==========================================
    // 写入操作 (批量 UPSERT, 单事务)
    // ==========================================

    pub fn upsert_areas(&self, areas: &[Area]) -> RepositoryResult<usize> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;
        for area in areas {
            tx.execute(
                r#"INSERT INTO area (area_id, location, province, municipality)
                   VALUES (?1, ?2, ?3, ?4)
                   ON CONFLICT(area_id) DO UPDATE SET
                       location = ?2, province = ?3, municipality = ?4"#,
                params![area.area_id, area.location, area.province, area.municipality],
            )?;
        }
        tx.commit()?;
        Ok(areas.len())
    }

    pub fn upsert_menu_items(&self, items: &[MenuItem]) -> RepositoryResult<usize> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;
        for item in items {
            tx.execute(
                r#"INSERT INTO menu_item (menu_item_id, pos_code, menu_description)
                   VALUES (?1, ?2, ?3)
                   ON CONFLICT(menu_item_id) DO UPDATE SET
                       pos_code = ?2, menu_description = ?3"#,
                params![item.menu_item_id, item.pos_code, item.menu_description],
            )?;
        }
        tx.commit()?;
        Ok(items.len())
    }

    /// 写入原料
    ///
    /// # 错误
    /// - `ValidationError`: bundling_size ≤ 0 或 conversion_delivery_uom < 0
    pub fn upsert_ingredients(&self, ingredients: &[Ingredient]) -> RepositoryResult<usize> {
        if let Some(bad) = ingredients
            .iter()
            .find(|i| !(i.bundling_size > 0.0) || i.conversion_delivery_uom < 0.0)
        {
            return Err(RepositoryError::ValidationError(format!(
                "原料{}的批量/换算系数非法: bundling_size={}, conversion_delivery_uom={}",
                bad.bos_code, bad.bundling_size, bad.conversion_delivery_uom
            )));
        }

        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;
        for i in ingredients {
            tx.execute(
                r#"INSERT INTO ingredient (
                       ingredient_id, bos_code, description, uom, delivery_uom,
                       bundling_size, conversion_delivery_uom
                   ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                   ON CONFLICT(ingredient_id) DO UPDATE SET
                       bos_code = ?2, description = ?3, uom = ?4, delivery_uom = ?5,
                       bundling_size = ?6, conversion_delivery_uom = ?7"#,
                params![
                    i.ingredient_id,
                    i.bos_code,
                    i.description,
                    i.uom,
                    i.delivery_uom,
                    i.bundling_size,
                    i.conversion_delivery_uom,
                ],
            )?;
        }
        tx.commit()?;
        Ok(ingredients.len())
    }

    /// 整体替换 BOM (静态参考数据)
    pub fn replace_bom_lines(&self, lines: &[BomLine]) -> RepositoryResult<usize> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM bom_line", [])?;
        for line in lines {
            tx.execute(
                r#"INSERT INTO bom_line (menu_item_id, ingredient_id, ratio, category, uom)
                   VALUES (?1, ?2, ?3, ?4, ?5)"#,
                params![line.menu_item_id, line.ingredient_id, line.ratio, line.category, line.uom],
            )?;
        }
        tx.commit()?;
        Ok(lines.len())
    }

    pub fn upsert_by_request_items(&self, items: &[ByRequestItem]) -> RepositoryResult<usize> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;
        for item in items {
            tx.execute(
                r#"INSERT INTO by_request_item (
                       item_id, item_code, description, uom, delivery_uom, conversion_delivery_uom
                   ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                   ON CONFLICT(item_id) DO UPDATE SET
                       item_code = ?2, description = ?3, uom = ?4, delivery_uom = ?5,
                       conversion_delivery_uom = ?6"#,
                params![
                    item.item_id,
                    item.item_code,
                    item.description,
                    item.uom,
                    item.delivery_uom,
                    item.conversion_delivery_uom,
                ],
            )?;
        }
        tx.commit()?;
        Ok(items.len())
    }

    // ==========================================
    // 查询操作
    // ==========================================

    pub fn list_areas(&self) -> RepositoryResult<Vec<Area>> {
        let conn = self.get_conn()?;
        query_areas(&conn)
    }

    /// 加载完整参考数据快照 (一次锁内完成, 保证读一致)
    pub fn load_snapshot(&self) -> RepositoryResult<ReferenceData> {
        let conn = self.get_conn()?;
        let areas = query_areas(&conn)?;

        let menu_items = conn
            .prepare("SELECT menu_item_id, pos_code, menu_description FROM menu_item")?
            .query_map([], |row| {
                Ok(MenuItem {
                    menu_item_id: row.get(0)?,
                    pos_code: row.get(1)?,
                    menu_description: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let ingredients = conn
            .prepare(
                r#"SELECT ingredient_id, bos_code, description, uom, delivery_uom,
                          bundling_size, conversion_delivery_uom
                   FROM ingredient"#,
            )?
            .query_map([], |row| {
                Ok(Ingredient {
                    ingredient_id: row.get(0)?,
                    bos_code: row.get(1)?,
                    description: row.get(2)?,
                    uom: row.get(3)?,
                    delivery_uom: row.get(4)?,
                    bundling_size: row.get(5)?,
                    conversion_delivery_uom: row.get(6)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let bom_lines = conn
            .prepare(
                r#"SELECT menu_item_id, ingredient_id, ratio, category, uom
                   FROM bom_line ORDER BY bom_line_id"#,
            )?
            .query_map([], |row| {
                Ok(BomLine {
                    menu_item_id: row.get(0)?,
                    ingredient_id: row.get(1)?,
                    ratio: row.get(2)?,
                    category: row.get(3)?,
                    uom: row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let by_request_items = conn
            .prepare(
                r#"SELECT item_id, item_code, description, uom, delivery_uom, conversion_delivery_uom
                   FROM by_request_item"#,
            )?
            .query_map([], |row| {
                Ok(ByRequestItem {
                    item_id: row.get(0)?,
                    item_code: row.get(1)?,
                    description: row.get(2)?,
                    uom: row.get(3)?,
                    delivery_uom: row.get(4)?,
                    conversion_delivery_uom: row.get(5)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        tracing::debug!(
            areas = areas.len(),
            menu_items = menu_items.len(),
            ingredients = ingredients.len(),
            bom_lines = bom_lines.len(),
            by_request_items = by_request_items.len(),
            "参考数据快照加载完成"
        );

        Ok(ReferenceData::new(
            areas,
            menu_items,
            ingredients,
            bom_lines,
            by_request_items,
        ))
    }
}

fn query_areas(conn: &Connection) -> RepositoryResult<Vec<Area>> {
    let mut stmt = conn
        .prepare("SELECT area_id, location, province, municipality FROM area ORDER BY area_id")?;
    let areas = stmt
        .query_map([], |row| {
            Ok(Area {
                area_id: row.get(0)?,
                location: row.get(1)?,
                province: row.get(2)?,
                municipality: row.get(3)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(areas)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> ReferenceDataRepository {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::init_schema(&conn).unwrap();
        ReferenceDataRepository::new(Arc::new(Mutex::new(conn)))
    }

    fn ingredient(id: i64, bundling: f64) -> Ingredient {
        Ingredient {
            ingredient_id: id,
            bos_code: format!("BOS{}", id),
            description: "Chicken".to_string(),
            uom: "PC".to_string(),
            delivery_uom: "BOX".to_string(),
            bundling_size: bundling,
            conversion_delivery_uom: 12.0,
        }
    }

    #[test]
    fn test_rejects_non_positive_bundling_size() {
        let repo = setup();
        let err = repo.upsert_ingredients(&[ingredient(1, 0.0)]).unwrap_err();
        assert!(matches!(err, RepositoryError::ValidationError(_)));
    }

    #[test]
    fn test_load_snapshot() {
        let repo = setup();
        repo.upsert_areas(&[Area {
            area_id: 1,
            location: "SM IMUS".to_string(),
            province: "Cavite".to_string(),
            municipality: "Imus".to_string(),
        }])
        .unwrap();
        repo.upsert_menu_items(&[MenuItem {
            menu_item_id: 100,
            pos_code: "POS100".to_string(),
            menu_description: "Roast Chicken".to_string(),
        }])
        .unwrap();
        repo.upsert_ingredients(&[ingredient(10, 12.0)]).unwrap();
        repo.replace_bom_lines(&[BomLine {
            menu_item_id: 100,
            ingredient_id: 10,
            ratio: 2.0,
            category: "DINE IN".to_string(),
            uom: "PC".to_string(),
        }])
        .unwrap();

        let snapshot = repo.load_snapshot().unwrap();
        assert_eq!(snapshot.areas.len(), 1);
        assert_eq!(snapshot.bom_lines_for(100).len(), 1);
        assert_eq!(snapshot.ingredient(10).unwrap().bundling_size, 12.0);
        assert_eq!(snapshot.area_name(1), "SM IMUS");
    }
}
