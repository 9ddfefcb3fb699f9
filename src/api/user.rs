use fred::prelude::Pool;
use rand::Rng;
use rocket::{get, post, put, serde::json::Json, Route, State};
use rocket_okapi::{
    okapi::openapi3::OpenApi, openapi, openapi_get_routes_spec, settings::OpenApiSettings,
};
use schemars::JsonSchema;
use serde::Deserialize;

use crate::{
    api::result::{ApiResult, ResultEntity},
    auth::{hash_password, verify_password, CurrentUser, JwtService, TenantAccess},
    db::{
        models::{new_id, NewUser, UpdateUser, User, UserProfile, UserSearchResult},
        services::UserDbService,
        DbConnection,
    },
    errors::ApiError,
    mail::send_verify_code,
    redis::{consume_verify_code, store_verify_code},
    utils::Pagination,
};

pub fn get_routes(settings: &OpenApiSettings) -> (Vec<Route>, OpenApi) {
    openapi_get_routes_spec![
        settings: register,
        login,
        get_user_data,
        update_user,
        update_password,
        send_email_verify_code,
        reset_password,
        login_by_email,
        verify_user,
        search_users
    ]
}

fn required<'a>(value: &'a str, field: &str) -> Result<&'a str, ApiError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ApiError::bad_request(format!("{} must not be empty", field)));
    }
    Ok(value)
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn user_with_token(jwt: &JwtService, user: User) -> Result<ApiResult<User>, ApiError> {
    let token = jwt.issue(&UserProfile::from(&user))?;
    Ok(ResultEntity::with_token(user, token))
}

#[derive(Debug, JsonSchema, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegisterInput {
    user_account: String,
    email: String,
    username: String,
    password: String,
    telephone: Option<String>,
    birthday: Option<String>,
    sex: Option<String>,
    sign: Option<String>,
    region: Option<String>,
}

/// # Register
/// Create a user account and return it with an access token
#[openapi(tag = "User")]
#[post("/register", data = "<input>")]
async fn register(
    mut db: DbConnection,
    jwt: &State<JwtService>,
    input: Json<RegisterInput>,
) -> Result<ApiResult<User>, ApiError> {
    let user_account = required(&input.user_account, "Account")?;
    let email = required(&input.email, "Email")?;
    let password = required(&input.password, "Password")?;
    let username = non_empty(Some(&input.username)).unwrap_or(user_account);

    let mut user_service = UserDbService::new(&mut db);
    if user_service.find_by_account(user_account).await?.is_some() {
        return Err(ApiError::bad_request("Account already registered"));
    }
    if user_service.find_by_email(email).await?.is_some() {
        return Err(ApiError::bad_request("Email already registered"));
    }

    let password_hash = hash_password(password)?;
    let user = user_service
        .create(NewUser {
            id: &new_id(),
            user_account,
            password_hash: &password_hash,
            username,
            email: Some(email),
            telephone: non_empty(input.telephone.as_deref()),
            birthday: non_empty(input.birthday.as_deref()),
            sex: non_empty(input.sex.as_deref()),
            sign: non_empty(input.sign.as_deref()),
            region: non_empty(input.region.as_deref()),
        })
        .await?;
    rocket::info!("Registered user {}", user.id);

    user_with_token(jwt, user)
}

#[derive(Debug, JsonSchema, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginInput {
    /// Account name, email or telephone
    user_account: String,
    password: String,
}

/// # Log in
/// Log in with an account name, email or telephone and a password
#[openapi(tag = "User")]
#[post("/login", data = "<input>")]
async fn login(
    mut db: DbConnection,
    jwt: &State<JwtService>,
    input: Json<LoginInput>,
) -> Result<ApiResult<User>, ApiError> {
    let invalid = || ApiError::unauthorized("Incorrect account or password");
    let user = UserDbService::new(&mut db)
        .find_by_login(input.user_account.trim())
        .await?
        .ok_or_else(invalid)?;
    if !verify_password(&input.password, &user.password_hash)? {
        return Err(invalid());
    }
    if user.disabled {
        return Err(ApiError::forbidden("User disabled"));
    }

    user_with_token(jwt, user)
}

/// # Get user data
/// Reload the current user and issue a fresh access token
#[openapi(tag = "User")]
#[get("/getUserData")]
async fn get_user_data(
    user: CurrentUser,
    mut db: DbConnection,
    jwt: &State<JwtService>,
) -> Result<ApiResult<User>, ApiError> {
    let user = UserDbService::new(&mut db)
        .find_by_id(&user.id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    user_with_token(jwt, user)
}

#[derive(Debug, Default, JsonSchema, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateUserInput {
    username: Option<String>,
    telephone: Option<String>,
    email: Option<String>,
    avatar: Option<String>,
    birthday: Option<String>,
    sex: Option<String>,
    sign: Option<String>,
    region: Option<String>,
}

/// # Update user
/// Update profile fields of the current user
#[openapi(tag = "User")]
#[put("/updateUser", data = "<input>")]
async fn update_user(
    user: CurrentUser,
    mut db: DbConnection,
    input: Json<UpdateUserInput>,
) -> Result<ApiResult<i32>, ApiError> {
    let mut user_service = UserDbService::new(&mut db);
    let email = non_empty(input.email.as_deref());
    if let Some(email) = email {
        let taken = user_service
            .find_by_email(email)
            .await?
            .is_some_and(|other| other.id != user.id);
        if taken {
            return Err(ApiError::bad_request("Email already registered"));
        }
    }

    user_service
        .update(
            &user.id,
            UpdateUser {
                username: non_empty(input.username.as_deref()),
                telephone: input.telephone.as_deref(),
                email,
                avatar: input.avatar.as_deref(),
                birthday: input.birthday.as_deref(),
                sex: input.sex.as_deref(),
                sign: input.sign.as_deref(),
                region: input.region.as_deref(),
                updated_at: Some(chrono::Utc::now()),
                ..Default::default()
            },
        )
        .await?;

    Ok(ResultEntity::success(1))
}

#[derive(Debug, JsonSchema, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdatePasswordInput {
    old_password: String,
    new_password: String,
}

/// # Update password
#[openapi(tag = "User")]
#[put("/updatePassword", data = "<input>")]
async fn update_password(
    user: CurrentUser,
    mut db: DbConnection,
    input: Json<UpdatePasswordInput>,
) -> Result<ApiResult<i32>, ApiError> {
    let new_password = required(&input.new_password, "New password")?;
    let mut user_service = UserDbService::new(&mut db);
    let existing = user_service
        .find_by_id(&user.id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    if !verify_password(&input.old_password, &existing.password_hash)? {
        return Err(ApiError::bad_request("Old password is incorrect"));
    }

    let password_hash = hash_password(new_password)?;
    user_service
        .update(
            &user.id,
            UpdateUser {
                password_hash: Some(&password_hash),
                updated_at: Some(chrono::Utc::now()),
                ..Default::default()
            },
        )
        .await?;

    Ok(ResultEntity::success(1))
}

#[derive(Debug, JsonSchema, Deserialize)]
struct MailInput {
    email: String,
    code: Option<String>,
}

/// # Send verification code
/// Send a 4-digit verification code to a registered email address
#[openapi(tag = "User")]
#[post("/sendEmailVerifyCode", data = "<input>")]
async fn send_email_verify_code(
    mut db: DbConnection,
    redis: &State<Pool>,
    input: Json<MailInput>,
) -> Result<ApiResult<()>, ApiError> {
    let email = required(&input.email, "Email")?;
    if UserDbService::new(&mut db).find_by_email(email).await?.is_none() {
        return Err(ApiError::bad_request("Email not registered"));
    }

    let code = rand::rng().random_range(1000..=9999).to_string();
    store_verify_code(redis, email, &code).await?;
    send_verify_code(email, &code);

    Ok(ResultEntity::message("Verification code sent"))
}

/// Consume the verification code sent to `email`, failing unless it matches
async fn check_code(redis: &Pool, email: &str, code: Option<&str>) -> Result<(), ApiError> {
    let code = non_empty(code).ok_or_else(|| ApiError::bad_request("Invalid verification code"))?;
    if !consume_verify_code(redis, email, code).await? {
        return Err(ApiError::bad_request("Invalid verification code"));
    }
    Ok(())
}

#[derive(Debug, JsonSchema, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResetPasswordInput {
    email: String,
    code: String,
    new_password: String,
}

/// # Reset password
/// Set a new password using an email verification code
#[openapi(tag = "User")]
#[post("/resetPassword", data = "<input>")]
async fn reset_password(
    mut db: DbConnection,
    redis: &State<Pool>,
    jwt: &State<JwtService>,
    input: Json<ResetPasswordInput>,
) -> Result<ApiResult<User>, ApiError> {
    let email = required(&input.email, "Email")?;
    let new_password = required(&input.new_password, "New password")?;
    check_code(redis, email, Some(&input.code)).await?;

    let mut user_service = UserDbService::new(&mut db);
    let user = user_service
        .find_by_email(email)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    let password_hash = hash_password(new_password)?;
    let user = user_service
        .update(
            &user.id,
            UpdateUser {
                password_hash: Some(&password_hash),
                updated_at: Some(chrono::Utc::now()),
                ..Default::default()
            },
        )
        .await?;

    user_with_token(jwt, user)
}

/// # Log in by email
/// Log in with an email verification code
#[openapi(tag = "User")]
#[post("/loginByEmail", data = "<input>")]
async fn login_by_email(
    mut db: DbConnection,
    redis: &State<Pool>,
    jwt: &State<JwtService>,
    input: Json<MailInput>,
) -> Result<ApiResult<User>, ApiError> {
    let email = required(&input.email, "Email")?;
    check_code(redis, email, input.code.as_deref()).await?;

    let user = UserDbService::new(&mut db)
        .find_by_email(email)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    if user.disabled {
        return Err(ApiError::forbidden("User disabled"));
    }

    user_with_token(jwt, user)
}

#[derive(Debug, JsonSchema, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VerifyUserInput {
    user_account: String,
}

/// # Verify account
/// Number of users holding the account name (0 or 1)
#[openapi(tag = "User")]
#[post("/verifyUser", data = "<input>")]
async fn verify_user(
    mut db: DbConnection,
    input: Json<VerifyUserInput>,
) -> Result<ApiResult<i64>, ApiError> {
    let count = UserDbService::new(&mut db)
        .count_by_account(input.user_account.trim())
        .await?;

    Ok(ResultEntity::success(count))
}

/// # Search users
/// Search users by name, account, email or telephone, flagging members of the tenant
#[openapi(tag = "User")]
#[get("/searchUsers?<keyword>&<tenant_id>&<page_num>&<page_size>")]
async fn search_users(
    user: CurrentUser,
    mut db: DbConnection,
    keyword: Option<&str>,
    tenant_id: &str,
    page_num: Option<i64>,
    page_size: Option<i64>,
) -> Result<ApiResult<Vec<UserSearchResult>>, ApiError> {
    TenantAccess::load(&mut db, &user.id)
        .await?
        .require_tenant_admin(tenant_id)?;
    let page = UserDbService::new(&mut db)
        .search(keyword, tenant_id, Pagination::new(page_num, page_size))
        .await?;

    Ok(ResultEntity::page(page))
}
