use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use mongodb::bson::oid::ObjectId;
use thiserror::Error;

use crate::{
    config::AuthConfig,
    dto::auth::{Claims, TokenKind, TokenPair},
    models::user::User,
};

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("token error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),
    #[error("password hashing error: {0}")]
    Hash(#[from] bcrypt::BcryptError),
    #[error("blocking task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
    #[error("expected a {0:?} token")]
    WrongKind(TokenKind),
    #[error("token subject is not a valid id")]
    InvalidSubject,
    #[error("user has no id")]
    MissingId,
}

/// Issues and checks access/refresh tokens and password hashes.
pub struct AuthService {
    access_secret: String,
    access_ttl: Duration,
    refresh_secret: String,
    refresh_ttl: Duration,
    bcrypt_cost: u32,
}

impl AuthService {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            access_secret: config.access_token_secret.clone(),
            access_ttl: Duration::minutes(config.access_token_ttl_minutes),
            refresh_secret: config.refresh_token_secret.clone(),
            refresh_ttl: Duration::days(config.refresh_token_ttl_days),
            bcrypt_cost: config.bcrypt_cost,
        }
    }

    pub fn access_ttl_secs(&self) -> i64 {
        self.access_ttl.num_seconds()
    }

    pub fn refresh_ttl_secs(&self) -> i64 {
        self.refresh_ttl.num_seconds()
    }

    fn secret(&self, kind: TokenKind) -> &str {
        match kind {
            TokenKind::Access => &self.access_secret,
            TokenKind::Refresh => &self.refresh_secret,
        }
    }

    fn generate_token(&self, user: &User, kind: TokenKind) -> Result<String, AuthError> {
        let id = user.id.ok_or(AuthError::MissingId)?;
        let ttl = match kind {
            TokenKind::Access => self.access_ttl,
            TokenKind::Refresh => self.refresh_ttl,
        };
        let now = Utc::now();
        let exp = now + ttl;

        let claims = Claims {
            sub: id.to_hex(),
            username: user.username.clone(),
            kind,
            exp: exp.timestamp() as usize,
            iat: now.timestamp() as usize,
            jti: uuid::Uuid::new_v4().to_string(),
        };

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret(kind).as_ref()),
        )?;

        Ok(token)
    }

    pub fn generate_token_pair(&self, user: &User) -> Result<TokenPair, AuthError> {
        Ok(TokenPair {
            access_token: self.generate_token(user, TokenKind::Access)?,
            refresh_token: self.generate_token(user, TokenKind::Refresh)?,
        })
    }

    fn validate_token(&self, token: &str, kind: TokenKind) -> Result<Claims, AuthError> {
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret(kind).as_ref()),
            &Validation::new(Algorithm::HS256),
        )?;

        if token_data.claims.kind != kind {
            return Err(AuthError::WrongKind(kind));
        }
        Ok(token_data.claims)
    }

    pub fn validate_access_token(&self, token: &str) -> Result<Claims, AuthError> {
        self.validate_token(token, TokenKind::Access)
    }

    pub fn validate_refresh_token(&self, token: &str) -> Result<Claims, AuthError> {
        self.validate_token(token, TokenKind::Refresh)
    }

    pub fn subject_id(claims: &Claims) -> Result<ObjectId, AuthError> {
        ObjectId::parse_str(&claims.sub).map_err(|_| AuthError::InvalidSubject)
    }

    /// bcrypt runs on the blocking pool.
    pub async fn hash_password(&self, password: &str) -> Result<String, AuthError> {
        let password = password.to_string();
        let cost = self.bcrypt_cost;
        let hash = tokio::task::spawn_blocking(move || bcrypt::hash(password, cost)).await??;
        Ok(hash)
    }

    pub async fn verify_password(&self, password: &str, hash: &str) -> Result<bool, AuthError> {
        let password = password.to_string();
        let hash = hash.to_string();
        let valid = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash)).await??;
        Ok(valid)
    }
}
