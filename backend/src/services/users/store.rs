use crate::database::{from_sql_time, is_unique_violation, now_millis, to_sql_time, total_pages};
use crate::error::AppError;
use common::model::user::{NewUser, Role, UserPage, UserProfile, UserUpdate};
use regex::Regex;
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use uuid::Uuid;

pub const DEFAULT_USER_PAGE_SIZE: i64 = 10;

const USER_COLUMNS: &str = "id, name, email, role, position, department, organization, \
     work_address, phone_number, profile_pic, created_at, updated_at";

/// Checks name, email and phone format. Blank phone numbers are allowed.
pub fn validate_profile(name: &str, email: &str, phone_number: &str) -> Result<(), AppError> {
    if name.trim().is_empty() || email.trim().is_empty() {
        return Err(AppError::Validation("name and email are required".to_string()));
    }

    let email_re = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$")
        .map_err(|e| AppError::Internal(format!("Regex error: {e}")))?;
    if !email_re.is_match(email.trim()) {
        return Err(AppError::Validation("Invalid email address".to_string()));
    }

    let phone = phone_number.trim();
    if !phone.is_empty() {
        let phone_re = Regex::new(r"^\d{3}-\d{3}-\d{4}$")
            .map_err(|e| AppError::Internal(format!("Regex error: {e}")))?;
        if !phone_re.is_match(phone) {
            return Err(AppError::Validation(
                "Phone number must look like 081-234-5678".to_string(),
            ));
        }
    }
    Ok(())
}

pub fn insert(conn: &Connection, user: &NewUser) -> Result<UserProfile, AppError> {
    validate_profile(&user.name, &user.email, &user.phone_number)?;

    let now = now_millis();
    let profile = UserProfile {
        id: Uuid::new_v4().to_string(),
        name: user.name.trim().to_string(),
        email: user.email.trim().to_string(),
        role: user.role.unwrap_or_default(),
        position: user.position.trim().to_string(),
        department: user.department.trim().to_string(),
        organization: user.organization.trim().to_string(),
        work_address: user.work_address.trim().to_string(),
        phone_number: user.phone_number.trim().to_string(),
        profile_pic: user.profile_pic.trim().to_string(),
        created_at: now,
        updated_at: now,
    };
    write(conn, &profile, true)?;
    Ok(profile)
}

pub fn find_by_id(conn: &Connection, id: &str) -> Result<Option<UserProfile>, AppError> {
    let profile = conn
        .query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
            [id],
            map_user,
        )
        .optional()?;
    Ok(profile)
}

/// Case-insensitive name filter, alphabetical.
pub fn list_page(
    conn: &Connection,
    name: Option<&str>,
    page: i64,
    limit: i64,
) -> Result<UserPage, AppError> {
    let page = page.max(1);
    let limit = if limit > 0 { limit } else { DEFAULT_USER_PAGE_SIZE };

    let mut values = Vec::new();
    let where_sql = match name.map(str::trim).filter(|n| !n.is_empty()) {
        Some(name) => {
            values.push(SqlValue::Text(name.to_string()));
            "WHERE instr(fold(name), fold(?1)) > 0"
        }
        None => "",
    };

    let total: i64 = conn.query_row(
        &format!("SELECT COUNT(*) FROM users {where_sql}"),
        params_from_iter(values.iter()),
        |row| row.get(0),
    )?;

    values.push(SqlValue::Integer(limit));
    values.push(SqlValue::Integer((page - 1).saturating_mul(limit)));
    let mut stmt = conn.prepare(&format!(
        "SELECT {USER_COLUMNS} FROM users {where_sql} ORDER BY name ASC LIMIT ?{} OFFSET ?{}",
        values.len() - 1,
        values.len()
    ))?;
    let users = stmt
        .query_map(params_from_iter(values.iter()), map_user)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(UserPage {
        total_users: total,
        total_pages: total_pages(total, limit),
        current_page: page,
        users,
    })
}

/// Applies a partial update. `None` when the user does not exist.
pub fn update(
    conn: &Connection,
    id: &str,
    change: &UserUpdate,
) -> Result<Option<UserProfile>, AppError> {
    let Some(mut profile) = find_by_id(conn, id)? else {
        return Ok(None);
    };

    let assign = |target: &mut String, value: &Option<String>| {
        if let Some(value) = value {
            *target = value.trim().to_string();
        }
    };
    assign(&mut profile.name, &change.name);
    assign(&mut profile.email, &change.email);
    assign(&mut profile.position, &change.position);
    assign(&mut profile.department, &change.department);
    assign(&mut profile.organization, &change.organization);
    assign(&mut profile.work_address, &change.work_address);
    assign(&mut profile.phone_number, &change.phone_number);
    assign(&mut profile.profile_pic, &change.profile_pic);
    if let Some(role) = change.role {
        profile.role = role;
    }

    validate_profile(&profile.name, &profile.email, &profile.phone_number)?;
    profile.updated_at = now_millis();
    write(conn, &profile, false)?;
    Ok(Some(profile))
}

pub fn delete(conn: &Connection, id: &str) -> Result<bool, AppError> {
    Ok(conn.execute("DELETE FROM users WHERE id = ?1", [id])? > 0)
}

fn write(conn: &Connection, profile: &UserProfile, create: bool) -> Result<(), AppError> {
    let sql = if create {
        format!(
            "INSERT INTO users ({USER_COLUMNS}) VALUES \
             (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)"
        )
    } else {
        "UPDATE users SET name = ?2, email = ?3, role = ?4, position = ?5, department = ?6, \
         organization = ?7, work_address = ?8, phone_number = ?9, profile_pic = ?10, \
         created_at = ?11, updated_at = ?12 WHERE id = ?1"
            .to_string()
    };

    conn.execute(
        &sql,
        params![
            profile.id,
            profile.name,
            profile.email,
            profile.role.as_str(),
            profile.position,
            profile.department,
            profile.organization,
            profile.work_address,
            profile.phone_number,
            profile.profile_pic,
            to_sql_time(profile.created_at),
            to_sql_time(profile.updated_at),
        ],
    )
    .map_err(|e| {
        if is_unique_violation(&e) {
            AppError::Conflict("A user with this name or email already exists".to_string())
        } else {
            e.into()
        }
    })?;
    Ok(())
}

fn map_user(row: &Row<'_>) -> Result<UserProfile, rusqlite::Error> {
    let role: String = row.get(3)?;
    let created_at: String = row.get(10)?;
    let updated_at: String = row.get(11)?;
    Ok(UserProfile {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        role: Role::parse(&role).unwrap_or_default(),
        position: row.get(4)?,
        department: row.get(5)?,
        organization: row.get(6)?,
        work_address: row.get(7)?,
        phone_number: row.get(8)?,
        profile_pic: row.get(9)?,
        created_at: from_sql_time(10, &created_at)?,
        updated_at: from_sql_time(11, &updated_at)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::Database;

    fn new_user(name: &str, email: &str) -> NewUser {
        NewUser {
            name: name.into(),
            email: email.into(),
            phone_number: "081-234-5678".into(),
            ..Default::default()
        }
    }

    #[test]
    fn phone_format_is_checked() {
        assert!(validate_profile("a", "a@b.co", "").is_ok());
        assert!(validate_profile("a", "a@b.co", "081-234-5678").is_ok());
        assert!(validate_profile("a", "a@b.co", "0812345678").is_err());
        assert!(validate_profile("", "a@b.co", "").is_err());
        assert!(validate_profile("a", "not-an-email", "").is_err());
    }

    #[test]
    fn users_are_unique_and_updatable() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::init(dir.path().join("u.sqlite")).unwrap();
        let conn = db.open().unwrap();

        let somchai = insert(&conn, &new_user("Somchai", "somchai@example.org")).unwrap();
        assert_eq!(somchai.role, Role::User);
        let err = insert(&conn, &new_user("Somchai", "other@example.org")).unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        let change = UserUpdate {
            department: Some("Botany".into()),
            role: Some(Role::Admin),
            ..Default::default()
        };
        let updated = update(&conn, &somchai.id, &change).unwrap().unwrap();
        assert_eq!(updated.department, "Botany");
        assert_eq!(updated.role, Role::Admin);
        assert_eq!(updated.created_at, somchai.created_at);

        let page = list_page(&conn, Some("som"), 1, 0).unwrap();
        assert_eq!(page.total_users, 1);
        assert!(delete(&conn, &somchai.id).unwrap());
        assert!(find_by_id(&conn, &somchai.id).unwrap().is_none());
    }
}
