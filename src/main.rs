#[actix_web::main]
async fn main() -> std::io::Result<()> {
    bni_dashboard_lib::run().await
}
