use rocket::{Route, State};

use crate::auth::{require_membership, AuthContext};
use crate::base::{run_as, IxError, IxResult, MainDbConn};
use crate::extract::Extractor;
use crate::model::Invoice;
use crate::notify::{InvoiceNotification, Notifier};
use crate::payload;
use crate::schema::invoices as invs;
use crate::schema::invoices::dsl::invoices;
use crate::storage::Placement;

use bigdecimal::BigDecimal;
use diesel::prelude::*;
use rocket::http::Status;
use rocket::serde::json::Json;
use rocket::serde::{Deserialize, Serialize};
use slog_scope::info;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceUpload {
    pub file_name: Option<String>,
    pub file_data: Option<String>,
    pub user_id: Option<String>,
    pub supplier_name: Option<String>,
    pub total_amount: Option<f64>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceCreated {
    pub success: bool,
    pub invoice: Invoice,
    pub storage_url: String,
}

#[post("/", data = "<upload>")]
async fn create_invoice(
    ctx: AuthContext,
    upload: Json<InvoiceUpload>,
    placement: &State<Placement>,
    extractor: &State<Extractor>,
    notifier: &State<Notifier>,
    conn: MainDbConn,
) -> IxResult<Json<InvoiceCreated>> {
    require_membership(&ctx, &conn).await?;
    let upload = upload.into_inner();

    let encoded = upload
        .file_data
        .as_deref()
        .ok_or_else(|| IxError::InvalidPayloadFormat(String::from("missing fileData")))?;
    let (bytes, content_type) = payload::decode(encoded)?;
    let file_name = payload::safe_file_name(upload.file_name.as_deref(), &content_type);

    // The object has to land in storage before anything else: a stored row must
    // never point at a file that does not exist.
    let needs_extraction = upload.supplier_name.is_none() || upload.total_amount.is_none();
    let extraction_bytes = if needs_extraction {
        Some(bytes.clone())
    } else {
        None
    };
    let storage_url = placement
        .place(ctx.user_id, &file_name, &content_type, bytes)
        .await?;

    // Caller-supplied fields always win; extraction only fills the gaps.
    let mut supplier_name = upload.supplier_name;
    let mut total_amount = upload.total_amount;
    if let Some(data) = extraction_bytes {
        let proposed = extractor.extract(&data, &content_type).await;
        if supplier_name.is_none() {
            supplier_name = proposed.supplier_name;
        }
        if total_amount.is_none() {
            total_amount = proposed.total_amount;
        }
    }

    let record = build_invoice(
        &ctx,
        upload.user_id.as_deref(),
        supplier_name.as_deref(),
        total_amount,
        &storage_url,
    )?;

    let stored = record.clone();
    let invoice = run_as(&conn, ctx.user_id, move |c| {
        diesel::insert_into(invoices).values(&stored).execute(c)?;
        Ok(stored)
    })
    .await?;

    notifier.dispatch(InvoiceNotification {
        user_email: ctx.email.clone(),
        supplier_name: invoice.supplier_name.clone(),
        total_amount: invoice.total_amount.clone(),
        file_url: invoice.file_url.clone(),
    });

    info!("invoice ingested"; "invoice" => %invoice.id, "user" => %ctx.user_id);
    Ok(Json(InvoiceCreated {
        success: true,
        invoice,
        storage_url,
    }))
}

fn build_invoice(
    ctx: &AuthContext,
    user_id: Option<&str>,
    supplier_name: Option<&str>,
    total_amount: Option<f64>,
    file_url: &str,
) -> IxResult<Invoice> {
    let user_id = user_id.ok_or(IxError::ValidationFailed {
        field: "userId",
        reason: "is required",
    })?;
    let user_id = Uuid::parse_str(user_id).map_err(|_| IxError::ValidationFailed {
        field: "userId",
        reason: "must be a valid UUID",
    })?;
    if user_id != ctx.user_id {
        return Err(IxError::Unauthenticated);
    }
    if file_url.is_empty() {
        return Err(IxError::ValidationFailed {
            field: "fileUrl",
            reason: "is required",
        });
    }
    let supplier_name = supplier_name
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or(IxError::ValidationFailed {
            field: "supplierName",
            reason: "must not be blank",
        })?;
    let total_amount = total_amount.ok_or(IxError::ValidationFailed {
        field: "totalAmount",
        reason: "is required",
    })?;
    let total_amount = decimal_from_f64(total_amount)
        .filter(|t| t > &BigDecimal::from(0))
        .ok_or(IxError::ValidationFailed {
            field: "totalAmount",
            reason: "must be greater than zero",
        })?;
    Ok(Invoice::new(user_id, supplier_name, total_amount, file_url))
}

// Going through the shortest decimal rendering keeps amounts like 250.50 exact
// instead of dragging in the binary expansion of the f64.
fn decimal_from_f64(value: f64) -> Option<BigDecimal> {
    format!("{}", value).parse().ok()
}

// usize keeps negative paging values from ever reaching the database; they
// fall back to the defaults instead.
#[get("/?<limit>&<offset>")]
async fn get_invoices(
    ctx: AuthContext,
    limit: Option<usize>,
    offset: Option<usize>,
    conn: MainDbConn,
) -> IxResult<Json<Vec<Invoice>>> {
    require_membership(&ctx, &conn).await?;
    let real_limit = limit.unwrap_or(10) as i64;
    let real_offset = offset.unwrap_or(0) as i64;

    // No ownership filter here: row level security already scopes the rows to
    // the caller set by run_as.
    let found = run_as(&conn, ctx.user_id, move |c| {
        invoices
            .order(invs::created_at.desc())
            .limit(real_limit)
            .offset(real_offset)
            .load(c)
    })
    .await?;
    Ok(Json(found))
}

#[get("/<id>")]
async fn get_invoice(ctx: AuthContext, id: &str, conn: MainDbConn) -> IxResult<Json<Invoice>> {
    require_membership(&ctx, &conn).await?;
    let invoice_id = Uuid::parse_str(id)?;

    let invoice = run_as(&conn, ctx.user_id, move |c| {
        invoices.filter(invs::id.eq(invoice_id)).first(c)
    })
    .await?;
    Ok(Json(invoice))
}

#[delete("/<id>")]
async fn delete_invoice(ctx: AuthContext, id: &str, conn: MainDbConn) -> IxResult<Status> {
    require_membership(&ctx, &conn).await?;
    let invoice_id = Uuid::parse_str(id)?;

    run_as(&conn, ctx.user_id, move |c| {
        diesel::delete(invoices.filter(invs::id.eq(invoice_id))).execute(c)
    })
    .await?;
    Ok(Status::NoContent)
}

pub fn routes() -> Vec<Route> {
    routes![create_invoice, get_invoices, get_invoice, delete_invoice]
}
