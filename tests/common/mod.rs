use invodex;
use invodex::model::Organization;
use jsonwebtoken::{encode, EncodingKey, Header as JwtHeader};
use rocket::http::{ContentType, Header, Status};
use rocket::local::blocking::{Client, LocalRequest};
use rocket::serde::{DeserializeOwned, Serialize};
use std::env;
use uuid::Uuid;

// must match the [test] profile in Rocket.toml
pub const TEST_JWT_SECRET: &str = "test-secret-0123456789";

pub fn setup() -> Client {
    env::set_var("ROCKET_PROFILE", "test");

    let rocket = invodex::rocket();
    Client::tracked(rocket).unwrap()
}

#[derive(Serialize)]
struct TestClaims {
    aud: String,
    exp: usize,
    sub: String,
    email: String,
}

pub fn bearer_token(user: &Uuid) -> String {
    let claims = TestClaims {
        aud: String::from("authenticated"),
        exp: 4102444800, // 2100-01-01
        sub: user.to_string(),
        email: format!("user-{}@example.com", user.to_simple()),
    };
    encode(
        &JwtHeader::default(),
        &claims,
        &EncodingKey::from_secret(TEST_JWT_SECRET.as_bytes()),
    )
    .unwrap()
}

pub fn with_login<'a>(req: LocalRequest<'a>, user: &Uuid) -> LocalRequest<'a> {
    req.header(Header::new(
        "Authorization",
        format!("Bearer {}", bearer_token(user)),
    ))
}

pub fn create_org(client: &Client, user: &Uuid, name: &str) -> Organization {
    let response = with_login(client.post("/api/orgs"), user)
        .header(ContentType::JSON)
        .body(serde_json::json!({ "name": name }).to_string())
        .dispatch();
    assert_eq!(response.status(), Status::Ok);
    assert_eq!(response.content_type(), Some(ContentType::JSON));
    response.into_json().unwrap()
}

// "%PDF-1.4\n"
pub fn pdf_payload() -> &'static str {
    "data:application/pdf;base64,JVBERi0xLjQK"
}

pub fn json_ok_response<T>(req: LocalRequest) -> T
where
    T: Send + DeserializeOwned + 'static,
{
    let response = req.dispatch();
    assert_eq!(response.status(), Status::Ok);
    assert_eq!(response.content_type(), Some(ContentType::JSON));
    response.into_json().unwrap()
}
