use rocket::serde::{Deserialize, Serialize};

use crate::schema::*;
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use diesel::deserialize::{self, FromSql};
use diesel::pg::Pg;
use diesel::serialize::{self, Output, ToSql};
use diesel::sql_types::Text;
use std::io::Write;
use uuid::Uuid;

pub const INVOICE_PROCESSED: &str = "processed";

#[derive(Debug, Clone, Queryable, Identifiable, Insertable, Serialize, Deserialize)]
pub struct Organization {
    pub id: Uuid,
    pub name: String,
    pub tax_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Organization {
    pub fn new(name: &str, tax_id: Option<String>) -> Organization {
        Organization {
            id: Uuid::new_v4(),
            name: String::from(name),
            tax_id,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsExpression, FromSqlRow)]
#[sql_type = "Text"]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Owner,
    Admin,
    Member,
}

impl ToSql<Text, Pg> for Role {
    fn to_sql<W: Write>(&self, out: &mut Output<W, Pg>) -> serialize::Result {
        let s = match self {
            Role::Owner => "owner",
            Role::Admin => "admin",
            Role::Member => "member",
        };
        <str as ToSql<Text, Pg>>::to_sql(s, out)
    }
}

impl FromSql<Text, Pg> for Role {
    fn from_sql(bytes: Option<&[u8]>) -> deserialize::Result<Self> {
        match <String as FromSql<Text, Pg>>::from_sql(bytes)?.as_str() {
            "owner" => Ok(Role::Owner),
            "admin" => Ok(Role::Admin),
            "member" => Ok(Role::Member),
            other => Err(format!("unrecognized role: {}", other).into()),
        }
    }
}

#[derive(Debug, Clone, Queryable, Insertable, Serialize, Deserialize)]
pub struct Member {
    pub org_id: Uuid,
    pub user_id: Uuid,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl Member {
    pub fn owner(org_id: Uuid, user_id: Uuid) -> Member {
        Member {
            org_id,
            user_id,
            role: Role::Owner,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Queryable, Identifiable, Insertable, Serialize, Deserialize)]
pub struct Invoice {
    pub id: Uuid,
    pub user_id: Uuid,
    pub supplier_name: String,
    pub total_amount: BigDecimal,
    pub file_url: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl Invoice {
    pub fn new(user_id: Uuid, supplier_name: &str, total_amount: BigDecimal, file_url: &str) -> Invoice {
        Invoice {
            id: Uuid::new_v4(),
            user_id,
            supplier_name: String::from(supplier_name),
            total_amount,
            file_url: String::from(file_url),
            status: String::from(INVOICE_PROCESSED),
            created_at: Utc::now(),
        }
    }
}
