mod access;
mod guard;
mod password;
mod token;

pub use access::TenantAccess;
pub use guard::{bearer_token, CurrentUser};
pub use password::{hash_password, verify_password};
pub use token::{Claims, JwtService};

use rocket::fairing::AdHoc;

use crate::{config::get_app_config, utils::Encryptor};

/// Fairing that sets up the encryption service for stored API keys
pub fn setup_encryption() -> AdHoc {
    AdHoc::try_on_ignite("Encryption setup", |rocket| async {
        let encryptor = Encryptor::new(&get_app_config(&rocket).secret_key);
        match encryptor {
            Ok(encryptor) => Ok(rocket.manage(encryptor)),
            Err(e) => {
                rocket::error!("{}", e);
                Err(rocket)
            }
        }
    })
}

/// Fairing that sets up the access token service
pub fn setup_jwt() -> AdHoc {
    AdHoc::on_ignite("Access token setup", |rocket| async {
        let app_config = get_app_config(&rocket);
        let jwt = JwtService::new(&app_config.jwt_secret, app_config.token_expire_minutes());

        rocket.manage(jwt)
    })
}
