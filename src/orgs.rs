use rocket::Route;

use crate::auth::{authorize_for_org, AuthContext};
use crate::base::{run_as, IxError, IxResult, MainDbConn};
use crate::model::{Member, Organization};
use crate::schema::members::dsl::members;
use crate::schema::organizations as orgs;
use crate::schema::organizations::dsl::organizations;

use diesel::prelude::*;
use rocket::serde::json::Json;
use rocket::serde::Deserialize;
use slog_scope::{debug, info};
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct OrgCreate {
    pub name: Option<String>,
    pub tax_id: Option<String>,
}

#[get("/?<limit>&<offset>")]
async fn get_organizations(
    ctx: AuthContext,
    limit: Option<usize>,
    offset: Option<usize>,
    conn: MainDbConn,
) -> IxResult<Json<Vec<Organization>>> {
    let real_limit = limit.unwrap_or(10) as i64;
    let real_offset = offset.unwrap_or(0) as i64;

    let found = run_as(&conn, ctx.user_id, move |c| {
        organizations
            .order(orgs::name)
            .limit(real_limit)
            .offset(real_offset)
            .load(c)
    })
    .await?;
    Ok(Json(found))
}

#[post("/", data = "<org>")]
async fn create_organization(
    ctx: AuthContext,
    org: Json<OrgCreate>,
    conn: MainDbConn,
) -> IxResult<Json<Organization>> {
    let org = org.into_inner();
    let name = org
        .name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .ok_or(IxError::ValidationFailed {
            field: "name",
            reason: "must not be blank",
        })?;
    let tax_id = org.tax_id.filter(|t| !t.trim().is_empty());

    let record = Organization::new(name, tax_id);
    let membership = Member::owner(record.id, ctx.user_id);

    // One transaction: the organization never exists without its owner row.
    let created = run_as(&conn, ctx.user_id, move |c| {
        diesel::insert_into(organizations)
            .values(&record)
            .execute(c)?;
        diesel::insert_into(members).values(&membership).execute(c)?;
        Ok(record)
    })
    .await?;
    info!("organization created"; "org" => %created.id, "owner" => %ctx.user_id);
    Ok(Json(created))
}

#[get("/<id>")]
async fn get_organization(ctx: AuthContext, id: &str, conn: MainDbConn) -> IxResult<Json<Organization>> {
    let org_id = Uuid::parse_str(id)?;
    let role = authorize_for_org(&ctx, org_id, &conn).await?;
    debug!("organization access"; "org" => %org_id, "role" => ?role);

    let org = run_as(&conn, ctx.user_id, move |c| {
        organizations.filter(orgs::id.eq(org_id)).first(c)
    })
    .await?;
    Ok(Json(org))
}

pub fn routes() -> Vec<Route> {
    routes![get_organizations, create_organization, get_organization]
}
