pub mod models;
pub mod schema;
pub mod services;

use std::ops::{Deref, DerefMut};

use diesel_async::{
    pooled_connection::{
        deadpool::{Object, Pool},
        AsyncDieselConnectionManager,
    },
    AsyncPgConnection,
};
use diesel_async_migrations::{embed_migrations, EmbeddedMigrations};
use rocket::{
    fairing::AdHoc,
    http::Status,
    request::{FromRequest, Outcome},
    Request,
};
use rocket_okapi::OpenApiFromRequest;

use crate::config::get_app_config;

static MIGRATIONS: EmbeddedMigrations = embed_migrations!();

/// Pooled Postgres connection, available as a request guard.
#[derive(OpenApiFromRequest)]
pub struct DbConnection(pub Object<AsyncPgConnection>);
impl Deref for DbConnection {
    type Target = Object<AsyncPgConnection>;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
impl DerefMut for DbConnection {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for DbConnection {
    type Error = String;

    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let Some(pool) = req.rocket().state::<DbPool>() else {
            return Outcome::Error((
                Status::InternalServerError,
                "Database not initialized".to_owned(),
            ));
        };
        match pool.get().await {
            Ok(conn) => Outcome::Success(DbConnection(conn)),
            Err(e) => {
                rocket::error!("Couldn't get database connection: {}", e);
                Outcome::Error((
                    Status::InternalServerError,
                    format!("Couldn't get connection: {}", e),
                ))
            }
        }
    }
}

/// The database pool stored in Rocket's managed state. Background tasks
/// (e.g. the history persister) clone it to get their own connections.
pub type DbPool = Pool<AsyncPgConnection>;

/// Fairing that connects to Postgres, runs the embedded migrations and
/// manages the connection pool.
pub fn setup_db() -> AdHoc {
    AdHoc::on_ignite("Database setup", |rocket| async {
        rocket
            .attach(AdHoc::try_on_ignite(
                "Initialize database connection",
                |rocket| async {
                    let app_config = get_app_config(&rocket);
                    let manager = AsyncDieselConnectionManager::<AsyncPgConnection>::new(
                        &app_config.database_url,
                    );
                    let pool = match Pool::builder(manager)
                        .max_size(app_config.database_pool.unwrap_or(16))
                        .build()
                    {
                        Ok(pool) => pool,
                        Err(e) => {
                            rocket::error!("Failed to build database pool: {}", e);
                            return Err(rocket);
                        }
                    };
                    let mut conn = match pool.get().await {
                        Ok(conn) => conn,
                        Err(e) => {
                            rocket::error!("Failed to connect to database: {}", e);
                            return Err(rocket);
                        }
                    };
                    if let Err(e) = MIGRATIONS.run_pending_migrations(&mut conn).await {
                        rocket::error!("Failed to run migrations: {}", e);
                        return Err(rocket);
                    }
                    rocket::info!("Migrations completed successfully");
                    drop(conn);

                    Ok(rocket.manage(pool))
                },
            ))
            .attach(AdHoc::on_shutdown(
                "Shutdown database connection",
                |rocket| {
                    Box::pin(async {
                        if let Some(pool) = rocket.state::<DbPool>() {
                            rocket::info!("Shutting down database connection");
                            pool.close();
                        }
                    })
                },
            ))
    })
}
