mod common;

use common::{create_org, json_ok_response, setup, with_login};
use invodex::base::ApiError;
use invodex::model::Organization;
use rocket::http::{ContentType, Status};
use serial_test::serial;
use serde_json::json;
use uuid::Uuid;

#[test]
#[serial]
fn create_and_read() {
    let client = setup();
    let user = Uuid::new_v4();

    // nothing visible before onboarding
    let orgs: Vec<Organization> = json_ok_response(with_login(client.get("/api/orgs"), &user));
    assert_eq!(0, orgs.len());

    let response = with_login(client.post("/api/orgs"), &user)
        .header(ContentType::JSON)
        .body(json!({ "name": "Acme Ltd", "tax_id": "GB123456789" }).to_string())
        .dispatch();
    assert_eq!(response.status(), Status::Ok);
    assert_eq!(response.content_type(), Some(ContentType::JSON));
    let org: Organization = response.into_json().unwrap();
    assert_eq!("Acme Ltd", &org.name);
    assert_eq!(Some(String::from("GB123456789")), org.tax_id);

    // the creator is a member and can read it back
    let orgs: Vec<Organization> = json_ok_response(with_login(client.get("/api/orgs"), &user));
    assert_eq!(1, orgs.len());
    assert_eq!(org.id, orgs[0].id);

    let fetched: Organization =
        json_ok_response(with_login(client.get(format!("/api/orgs/{}", org.id)), &user));
    assert_eq!(org.id, fetched.id);

    // a stranger sees neither the listing nor the organization itself
    let other = Uuid::new_v4();
    let orgs: Vec<Organization> = json_ok_response(with_login(client.get("/api/orgs"), &other));
    assert_eq!(0, orgs.len());
    let response = with_login(client.get(format!("/api/orgs/{}", org.id)), &other).dispatch();
    assert_eq!(response.status(), Status::NotFound);
}

#[test]
#[serial]
fn rejects_blank_name() {
    let client = setup();
    let user = Uuid::new_v4();

    let response = with_login(client.post("/api/orgs"), &user)
        .header(ContentType::JSON)
        .body(json!({ "name": "   " }).to_string())
        .dispatch();
    assert_eq!(response.status(), Status::BadRequest);
    let err: ApiError = response.into_json().unwrap();
    assert_eq!(Some(String::from("validation_failed")), err.code);
    assert!(err.details.unwrap().contains("name"));

    let response = with_login(client.post("/api/orgs"), &user)
        .header(ContentType::JSON)
        .body(json!({}).to_string())
        .dispatch();
    assert_eq!(response.status(), Status::BadRequest);
}

#[test]
#[serial]
fn membership_gates_invoices() {
    let client = setup();
    let user = Uuid::new_v4();

    let response = with_login(client.get("/api/invoices"), &user).dispatch();
    assert_eq!(response.status(), Status::Forbidden);

    create_org(&client, &user, "Gate Org");

    let response = with_login(client.get("/api/invoices"), &user).dispatch();
    assert_eq!(response.status(), Status::Ok);
}
