use crate::database::{from_sql_time, is_unique_violation, now_millis, to_sql_time, total_pages};
use crate::error::AppError;
use common::model::species::{SpeciesFields, SpeciesPage, SpeciesRecord};
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use uuid::Uuid;

pub const SPECIES_PAGE_SIZE: i64 = 5;

const SPECIES_COLUMNS: &str = "id, image_url, common_name, local_name, scientific_name, \
     family_name, description, propagation, planting_season, harvesting_season, utilization, \
     status, survey_site, created_at, updated_at";

const DUPLICATE_NAME: &str = "A species with this scientific name already exists";

pub fn insert(
    conn: &Connection,
    fields: &SpeciesFields,
    image_url: &str,
) -> Result<SpeciesRecord, AppError> {
    let now = now_millis();
    let record = SpeciesRecord {
        id: Uuid::new_v4().to_string(),
        image_url: image_url.to_string(),
        common_name: fields.common_name.trim().to_string(),
        local_name: fields.local_name.trim().to_string(),
        scientific_name: fields.scientific_name.trim().to_string(),
        family_name: fields.family_name.trim().to_string(),
        description: fields.description.trim().to_string(),
        propagation: fields.propagation.trim().to_string(),
        planting_season: fields.planting_season.trim().to_string(),
        harvesting_season: fields.harvesting_season.trim().to_string(),
        utilization: fields.utilization.trim().to_string(),
        status: fields.status.trim().to_string(),
        survey_site: fields.survey_site.trim().to_string(),
        created_at: now,
        updated_at: now,
    };

    conn.execute(
        &format!(
            "INSERT INTO species ({SPECIES_COLUMNS}) VALUES \
             (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)"
        ),
        params![
            record.id,
            record.image_url,
            record.common_name,
            record.local_name,
            record.scientific_name,
            record.family_name,
            record.description,
            record.propagation,
            record.planting_season,
            record.harvesting_season,
            record.utilization,
            record.status,
            record.survey_site,
            to_sql_time(now),
            to_sql_time(now),
        ],
    )
    .map_err(conflict_on_duplicate)?;
    Ok(record)
}

pub fn find_by_id(conn: &Connection, id: &str) -> Result<Option<SpeciesRecord>, AppError> {
    let record = conn
        .query_row(
            &format!("SELECT {SPECIES_COLUMNS} FROM species WHERE id = ?1"),
            [id],
            map_species,
        )
        .optional()?;
    Ok(record)
}

/// Newest first. With `paginate == false` every match is returned on one page.
pub fn list_page(
    conn: &Connection,
    local_name: Option<&str>,
    page: i64,
    paginate: bool,
) -> Result<SpeciesPage, AppError> {
    let mut values = Vec::new();
    let where_sql = match local_name.map(str::trim).filter(|n| !n.is_empty()) {
        Some(name) => {
            values.push(SqlValue::Text(name.to_string()));
            "WHERE instr(fold(local_name), fold(?1)) > 0"
        }
        None => "",
    };

    let total: i64 = conn.query_row(
        &format!("SELECT COUNT(*) FROM species {where_sql}"),
        params_from_iter(values.iter()),
        |row| row.get(0),
    )?;

    let (page, limit) = if paginate {
        (page.max(1), SPECIES_PAGE_SIZE)
    } else {
        (1, total.max(1))
    };
    values.push(SqlValue::Integer(limit));
    values.push(SqlValue::Integer((page - 1).saturating_mul(limit)));
    let limit_param = values.len() - 1;
    let offset_param = values.len();

    let mut stmt = conn.prepare(&format!(
        "SELECT {SPECIES_COLUMNS} FROM species {where_sql} \
         ORDER BY created_at DESC, id ASC LIMIT ?{limit_param} OFFSET ?{offset_param}"
    ))?;
    let species = stmt
        .query_map(params_from_iter(values.iter()), map_species)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(SpeciesPage {
        total_species: total,
        total_pages: total_pages(total, limit),
        current_page: page,
        limit,
        species,
    })
}

/// Case-insensitive substring match on the scientific name.
pub fn search(conn: &Connection, scientific_name: Option<&str>) -> Result<Vec<SpeciesRecord>, AppError> {
    let term = scientific_name.map(str::trim).unwrap_or_default();
    let mut stmt = conn.prepare(&format!(
        "SELECT {SPECIES_COLUMNS} FROM species \
         WHERE ?1 = '' OR instr(fold(scientific_name), fold(?1)) > 0 \
         ORDER BY scientific_name"
    ))?;
    let rows = stmt.query_map([term], map_species)?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

pub fn scientific_names(conn: &Connection) -> Result<Vec<String>, AppError> {
    let mut stmt = conn.prepare("SELECT DISTINCT scientific_name FROM species ORDER BY scientific_name")?;
    let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

/// Overwrites non-empty fields and, when given, the image. Returns the updated
/// record and the image it replaced.
pub fn update(
    conn: &Connection,
    id: &str,
    fields: &SpeciesFields,
    new_image: Option<&str>,
) -> Result<Option<(SpeciesRecord, Option<String>)>, AppError> {
    let Some(mut record) = find_by_id(conn, id)? else {
        return Ok(None);
    };

    let assign = |target: &mut String, value: &str| {
        let value = value.trim();
        if !value.is_empty() {
            *target = value.to_string();
        }
    };
    assign(&mut record.common_name, &fields.common_name);
    assign(&mut record.local_name, &fields.local_name);
    assign(&mut record.scientific_name, &fields.scientific_name);
    assign(&mut record.family_name, &fields.family_name);
    assign(&mut record.description, &fields.description);
    assign(&mut record.propagation, &fields.propagation);
    assign(&mut record.planting_season, &fields.planting_season);
    assign(&mut record.harvesting_season, &fields.harvesting_season);
    assign(&mut record.utilization, &fields.utilization);
    assign(&mut record.status, &fields.status);
    assign(&mut record.survey_site, &fields.survey_site);

    let replaced = new_image.map(|image| std::mem::replace(&mut record.image_url, image.to_string()));
    record.updated_at = now_millis();

    conn.execute(
        "UPDATE species SET image_url = ?1, common_name = ?2, local_name = ?3, \
         scientific_name = ?4, family_name = ?5, description = ?6, propagation = ?7, \
         planting_season = ?8, harvesting_season = ?9, utilization = ?10, status = ?11, \
         survey_site = ?12, updated_at = ?13 WHERE id = ?14",
        params![
            record.image_url,
            record.common_name,
            record.local_name,
            record.scientific_name,
            record.family_name,
            record.description,
            record.propagation,
            record.planting_season,
            record.harvesting_season,
            record.utilization,
            record.status,
            record.survey_site,
            to_sql_time(record.updated_at),
            id,
        ],
    )
    .map_err(conflict_on_duplicate)?;

    Ok(Some((record, replaced)))
}

/// Deletes a species and returns it so the caller can remove its image.
pub fn delete(conn: &Connection, id: &str) -> Result<Option<SpeciesRecord>, AppError> {
    let Some(record) = find_by_id(conn, id)? else {
        return Ok(None);
    };
    conn.execute("DELETE FROM species WHERE id = ?1", [id])?;
    Ok(Some(record))
}

fn conflict_on_duplicate(err: rusqlite::Error) -> AppError {
    if is_unique_violation(&err) {
        AppError::Conflict(DUPLICATE_NAME.to_string())
    } else {
        err.into()
    }
}

fn map_species(row: &Row<'_>) -> Result<SpeciesRecord, rusqlite::Error> {
    let created_at: String = row.get(13)?;
    let updated_at: String = row.get(14)?;
    Ok(SpeciesRecord {
        id: row.get(0)?,
        image_url: row.get(1)?,
        common_name: row.get(2)?,
        local_name: row.get(3)?,
        scientific_name: row.get(4)?,
        family_name: row.get(5)?,
        description: row.get(6)?,
        propagation: row.get(7)?,
        planting_season: row.get(8)?,
        harvesting_season: row.get(9)?,
        utilization: row.get(10)?,
        status: row.get(11)?,
        survey_site: row.get(12)?,
        created_at: from_sql_time(13, &created_at)?,
        updated_at: from_sql_time(14, &updated_at)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::Database;

    fn fields(scientific: &str, local: &str) -> SpeciesFields {
        SpeciesFields {
            common_name: "Water yam".into(),
            local_name: local.into(),
            scientific_name: scientific.into(),
            family_name: "Dioscoreaceae".into(),
            description: "Climbing vine".into(),
            ..Default::default()
        }
    }

    #[test]
    fn duplicate_scientific_name_conflicts() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::init(dir.path().join("sp.sqlite")).unwrap();
        let conn = db.open().unwrap();

        insert(&conn, &fields("D. Alata", "Man Sao"), "a.png").unwrap();
        let err = insert(&conn, &fields("D. Alata", "Other"), "b.png").unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[test]
    fn listing_filters_and_paginates() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::init(dir.path().join("sp.sqlite")).unwrap();
        let conn = db.open().unwrap();
        for i in 0..7 {
            insert(&conn, &fields(&format!("D. Sp{i}"), &format!("Man {i}")), "x.png").unwrap();
        }
        insert(&conn, &fields("D. Hispida", "Kloi"), "k.png").unwrap();

        let first = list_page(&conn, None, 1, true).unwrap();
        assert_eq!(first.total_species, 8);
        assert_eq!(first.total_pages, 2);
        assert_eq!(first.species.len(), 5);

        let everything = list_page(&conn, Some("MAN"), 3, false).unwrap();
        assert_eq!(everything.total_species, 7);
        assert_eq!(everything.species.len(), 7);
        assert_eq!(everything.current_page, 1);

        assert_eq!(search(&conn, Some("hisp")).unwrap().len(), 1);
        assert_eq!(scientific_names(&conn).unwrap().len(), 8);
    }

    #[test]
    fn update_replaces_image_and_keeps_blank_fields() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::init(dir.path().join("sp.sqlite")).unwrap();
        let conn = db.open().unwrap();
        let created = insert(&conn, &fields("D. Alata", "Man Sao"), "old.png").unwrap();

        let change = SpeciesFields {
            status: "Native".into(),
            ..Default::default()
        };
        let (updated, replaced) = update(&conn, &created.id, &change, Some("new.png"))
            .unwrap()
            .unwrap();
        assert_eq!(updated.status, "Native");
        assert_eq!(updated.local_name, "Man Sao");
        assert_eq!(updated.image_url, "new.png");
        assert_eq!(replaced.as_deref(), Some("old.png"));
    }
}
