use crate::control::{acknowledge, reply, success, Identity, Response};
use actix::Addr;
use actix_web::web::{Data, Json};
use actix_web::{get, post};
use serde::{Deserialize, Serialize};
use storefront_types::access::service::{AccessService, LogIn, LogOut};
use storefront_types::access::{Profile, SessionToken, Shopper};

#[derive(Deserialize)]
pub struct LogInDto {
    name: String,
    email: String,
    picture: Option<String>,
    password: String,
}

#[derive(Serialize)]
struct LoggedIn {
    token: SessionToken,
    shopper: Shopper,
}

#[post("/api/login")]
pub async fn log_in(access: Data<Addr<AccessService>>, dto: Json<LogInDto>) -> Response {
    let LogInDto {
        name,
        email,
        picture,
        password,
    } = dto.into_inner();
    let profile = Profile {
        name,
        email,
        picture,
    };
    let (shopper, token) = access.send(LogIn { profile, password }).await??;
    Ok(reply("success", LoggedIn { token, shopper }))
}

#[post("/api/logout")]
pub async fn log_out(Identity { token, shopper }: Identity, access: Data<Addr<AccessService>>) -> Response {
    access.send(LogOut(token)).await??;
    log::info!("Shopper {} logged out", shopper.id);
    Ok(acknowledge("logged_out"))
}

#[get("/api/me")]
pub async fn me(Identity { shopper, .. }: Identity) -> Response {
    success(shopper)
}
