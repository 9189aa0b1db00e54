#[actix_web::main]
async fn main() -> std::io::Result<()> {
    policy_docs_server::run().await
}
