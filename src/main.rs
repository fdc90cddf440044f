use actix_web::middleware::{Logger, NormalizePath, TrailingSlash};
use actix_web::{App, HttpServer};
use anyhow::Context as AnyhowContext;
use std::env;
use storefront::config::Settings;
use storefront::{control, open_storage, Services};

#[actix_web::main]
async fn main() -> Result<(), anyhow::Error> {
    if let Err(env::VarError::NotPresent) = env::var("RUST_LOG") {
        env::set_var("RUST_LOG", "INFO");
    }
    pretty_env_logger::formatted_timed_builder()
        .parse_default_env()
        .init();

    match std::fs::File::open(".env") {
        Ok(_) => envmnt::load_file(".env")?,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            std::fs::File::create(".env")?;
            envmnt::load_file(".env")?;
        }
        Err(err) => {
            return Err(anyhow::anyhow!("Unable to open .env file: {err}"));
        }
    }

    let settings = Settings::from_env()?;
    let conn = open_storage(&settings.database_path)
        .await
        .with_context(|| {
            format!(
                "Unable to open database {}",
                settings.database_path.display()
            )
        })?;
    log::info!("Connected to {}", settings.database_path.display());
    let services = Services::start(conn, &settings).await?;

    let address = (settings.bind_address.clone(), settings.port);
    log::info!("Listening on {}:{}", address.0, address.1);
    HttpServer::new(move || {
        let services = services.clone();
        App::new()
            .wrap(control::SessionMiddlewareFactory {})
            .wrap(NormalizePath::new(TrailingSlash::Trim))
            .wrap(Logger::default())
            .wrap(control::cors())
            .configure(move |cfg| services.register(cfg))
            .configure(control::configure)
    })
    .bind(address.clone())
    .with_context(|| format!("Unable to bind {}:{}", address.0, address.1))?
    .run()
    .await?;
    Ok(())
}
