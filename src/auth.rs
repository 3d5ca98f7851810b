use crate::base::{run_as, Config, IxError, IxResult, MainDbConn};
use crate::model::{Member, Role};
use crate::schema::members as mbrs;
use crate::schema::members::dsl::members;

use diesel::prelude::*;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use rocket::http::Status;
use rocket::request::{FromRequest, Outcome, Request};
use rocket::serde::{Deserialize, Serialize};
use slog_scope::debug;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub aud: String, // Audience, must match the configured one
    pub exp: usize,  // Expiration time (as UTC timestamp), validated by default
    pub sub: String, // Subject: the user id
    pub email: String,
}

#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user_id: Uuid,
    pub email: String,
}

pub fn verify_token(token: &str, config: &Config) -> IxResult<AuthContext> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_audience(&[&config.jwt_audience]);
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.jwt_secret.as_bytes()),
        &validation,
    )
    .map_err(|e| {
        debug!("rejected bearer token"; "reason" => %e);
        IxError::Unauthenticated
    })?;
    let user_id = Uuid::parse_str(&data.claims.sub).map_err(|_| IxError::Unauthenticated)?;
    Ok(AuthContext {
        user_id,
        email: data.claims.email,
    })
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for AuthContext {
    type Error = IxError;

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let token = request
            .headers()
            .get_one("Authorization")
            .and_then(|h| h.strip_prefix("Bearer "));
        let config = request.rocket().state::<Config>();
        match (token, config) {
            (Some(token), Some(config)) => match verify_token(token, config) {
                Ok(ctx) => Outcome::Success(ctx),
                Err(e) => Outcome::Failure((Status::Unauthorized, e)),
            },
            _ => Outcome::Failure((Status::Unauthorized, IxError::Unauthenticated)),
        }
    }
}

pub async fn memberships(ctx: &AuthContext, conn: &MainDbConn) -> IxResult<Vec<Member>> {
    run_as(conn, ctx.user_id, |c| {
        members.order(mbrs::created_at).load::<Member>(c)
    })
    .await
}

// Invoice operations are closed to users who belong to no organization.
pub async fn require_membership(ctx: &AuthContext, conn: &MainDbConn) -> IxResult<Vec<Member>> {
    let found = memberships(ctx, conn).await?;
    if found.is_empty() {
        return Err(IxError::NoOrganization);
    }
    Ok(found)
}

pub async fn authorize_for_org(ctx: &AuthContext, org_id: Uuid, conn: &MainDbConn) -> IxResult<Role> {
    let member: Member = run_as(conn, ctx.user_id, move |c| {
        members.filter(mbrs::org_id.eq(org_id)).first(c)
    })
    .await?;
    Ok(member.role)
}
