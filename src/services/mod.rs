//! Business logic services

pub mod access;
pub mod auth;
pub mod catalog;
pub mod loans;
pub mod tokens;
pub mod users;

pub use auth::AuthContext;

use crate::{config::AuthConfig, repository::Repository};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub auth: auth::AuthService,
    pub access: access::Authorizer,
    pub users: users::UsersService,
    pub catalog: catalog::CatalogService,
    pub loans: loans::LoansService,
    pub tokens: tokens::TokenService,
}

impl Services {
    /// Create all services over the given storage handle
    pub fn new(repository: Repository, auth_config: &AuthConfig) -> Self {
        let tokens = tokens::TokenService::new(auth_config);

        Self {
            auth: auth::AuthService::new(repository.clone(), tokens.clone()),
            access: access::Authorizer::new(repository.clone()),
            users: users::UsersService::new(repository.clone()),
            catalog: catalog::CatalogService::new(repository.clone()),
            loans: loans::LoansService::new(repository),
            tokens,
        }
    }
}
