#[rocket::main]
async fn main() -> Result<(), rocket::Error> {
    let _logging = invodex::init_logging();
    invodex::rocket().launch().await
}
