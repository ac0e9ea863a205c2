//! Users contract
//!
//! Positional-argument front of the Identity Registry. Lookups by id return
//! the stored document bytes unchanged, which the settlement engine relies on
//! when it resolves users through this contract.

use async_trait::async_trait;
use tracing::debug;

use core_kernel::{Chaincode, ContractResponse, UserId};
use domain_identity::{IdentityRegistry, UserType};

use super::error::{expect_args, ContractError};

pub const REGISTER_USER: &str = "registerUser";
pub const FETCH_USER: &str = "fetchUserDataByUserID";
pub const FETCH_USERS_BY_TYPE: &str = "fetchUserByType";
pub const FETCH_FARMS: &str = "fetchFarmsByUserId";
pub const FETCH_ACCOUNTS: &str = "fetchAccountsByUserId";

const FUNCTIONS: &[&str] = &[
    REGISTER_USER,
    FETCH_USER,
    FETCH_USERS_BY_TYPE,
    FETCH_FARMS,
    FETCH_ACCOUNTS,
];

pub struct UsersContract {
    name: String,
    registry: IdentityRegistry,
}

impl UsersContract {
    pub fn new(name: impl Into<String>, registry: IdentityRegistry) -> Self {
        Self {
            name: name.into(),
            registry,
        }
    }

    async fn dispatch(&self, function: &str, args: &[String]) -> Result<Vec<u8>, ContractError> {
        match function {
            REGISTER_USER => {
                let user_id = self.registry.register_user(args).await?;
                Ok(serde_json::to_vec(&serde_json::json!({ "userId": user_id }))?)
            }
            FETCH_USER => {
                let [user_id] = expect_args(function, args)?;
                Ok(self.registry.fetch_user_raw(&UserId::new(user_id)?).await?)
            }
            FETCH_USERS_BY_TYPE => {
                let [user_type] = expect_args(function, args)?;
                let user_type: UserType = user_type.parse()?;
                Ok(self.registry.fetch_users_by_type_raw(user_type).await?)
            }
            FETCH_FARMS => {
                let [user_id] = expect_args(function, args)?;
                let farms = self.registry.fetch_farms_by_user(&UserId::new(user_id)?).await?;
                Ok(serde_json::to_vec(&farms)?)
            }
            FETCH_ACCOUNTS => {
                let [user_id] = expect_args(function, args)?;
                let accounts = self
                    .registry
                    .fetch_accounts_by_user(&UserId::new(user_id)?)
                    .await?;
                Ok(serde_json::to_vec(&accounts)?)
            }
            other => Err(ContractError::unknown_function(&self.name, other)),
        }
    }
}

impl std::fmt::Debug for UsersContract {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UsersContract")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Chaincode for UsersContract {
    fn name(&self) -> &str {
        &self.name
    }

    fn functions(&self) -> &'static [&'static str] {
        FUNCTIONS
    }

    async fn invoke(&self, function: &str, args: &[String]) -> ContractResponse {
        debug!(contract = %self.name, function, args = args.len(), "Invoking users contract");
        match self.dispatch(function, args).await {
            Ok(payload) => ContractResponse::Success(payload),
            Err(err) => ContractResponse::error(&err),
        }
    }
}
