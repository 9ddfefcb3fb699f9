use std::time::Duration;

use fred::{
    prelude::{Builder, ClientLike, Config, KeysInterface, Pool, TcpConfig},
    types::{Expiration, SetOptions},
};
use rocket::fairing::AdHoc;

use crate::config::get_app_config;

/// Verification codes expire after 5 minutes
pub const VERIFY_CODE_TTL_SECS: i64 = 5 * 60;

fn verify_code_key(email: &str) -> String {
    format!("verify_code:{email}")
}

/// Store an email verification code, replacing any previous one
pub async fn store_verify_code(pool: &Pool, email: &str, code: &str) -> Result<(), fred::error::Error> {
    pool.set::<(), _, _>(
        verify_code_key(email),
        code,
        Some(Expiration::EX(VERIFY_CODE_TTL_SECS)),
        None::<SetOptions>,
        false,
    )
    .await
}

fn code_matches(cached: Option<&str>, code: &str) -> bool {
    cached.is_some_and(|cached| cached == code.trim())
}

/// Take the email's verification code out of the cache with GETDEL and check it.
/// Every attempt consumes the stored code, so a code can be redeemed once and
/// a wrong guess requires requesting a new code.
pub async fn consume_verify_code(
    pool: &Pool,
    email: &str,
    code: &str,
) -> Result<bool, fred::error::Error> {
    let cached: Option<String> = pool.getdel(verify_code_key(email)).await?;
    Ok(code_matches(cached.as_deref(), code))
}

/// Fairing that sets up and initializes the Redis connection pool.
pub fn setup_redis() -> AdHoc {
    AdHoc::on_ignite("Redis", |rocket| async {
        rocket
            .attach(AdHoc::try_on_ignite(
                "Initialize Redis connection",
                |rocket| async {
                    let app_config = get_app_config(&rocket);
                    let config = match Config::from_url(&app_config.redis_url) {
                        Ok(config) => config,
                        Err(e) => {
                            rocket::error!("TENANT_RAG_REDIS_URL is not a valid Redis URL: {}", e);
                            return Err(rocket);
                        }
                    };
                    let pool = Builder::from_config(config)
                        .with_connection_config(|config| {
                            config.connection_timeout = Duration::from_secs(4);
                            config.tcp = TcpConfig {
                                nodelay: Some(true),
                                ..Default::default()
                            };
                        })
                        .build_pool(app_config.redis_pool.unwrap_or(4));
                    let pool = match pool {
                        Ok(pool) => pool,
                        Err(e) => {
                            rocket::error!("Failed to build Redis pool: {}", e);
                            return Err(rocket);
                        }
                    };
                    if let Err(e) = pool.init().await {
                        rocket::error!("Failed to connect to Redis: {}", e);
                        return Err(rocket);
                    }

                    Ok(rocket.manage(pool))
                },
            ))
            .attach(AdHoc::on_shutdown("Shutdown Redis connection", |rocket| {
                Box::pin(async {
                    if let Some(pool) = rocket.state::<Pool>() {
                        rocket::info!("Shutting down Redis connection");
                        if let Err(err) = pool.quit().await {
                            rocket::error!("Failed to shutdown Redis: {}", err);
                        }
                    }
                })
            }))
    })
}

#[cfg(test)]
mod tests {
    use super::{code_matches, verify_code_key};

    #[test]
    fn verify_code_key_format() {
        assert_eq!(verify_code_key("a@b.com"), "verify_code:a@b.com");
    }

    #[test]
    fn code_must_match_the_taken_value() {
        assert!(code_matches(Some("1234"), "1234"));
        assert!(code_matches(Some("1234"), " 1234 "));
        assert!(!code_matches(Some("1234"), "4321"));
        // already taken by an earlier request, or expired
        assert!(!code_matches(None, "1234"));
    }
}
