//! Identity Registry
//!
//! Owns the user documents: registration, lookup by id, and lookup by type
//! through the Query Façade. A registration writes the user document and
//! its `userId~fullName` index entry as one write set.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};

use core_kernel::{
    decode_document, encode_document, DomainPort, Filter, LedgerClient, LedgerError,
    OperationMetadata, PortError, QueryFacade, UserId, WriteSet, INDEX_SENTINEL,
};

use crate::error::IdentityError;
use crate::ports::UserDirectory;
use crate::registration::parse_registration;
use crate::user::{Account, Farm, User, UserType};

/// Name of the secondary index written at registration
pub const USER_NAME_INDEX: &str = "userId~fullName";

/// Registry of farmers and insurers
#[derive(Clone)]
pub struct IdentityRegistry {
    ledger: Arc<dyn LedgerClient>,
    query: QueryFacade,
}

impl IdentityRegistry {
    pub fn new(ledger: Arc<dyn LedgerClient>) -> Self {
        let query = QueryFacade::new(ledger.clone());
        Self { ledger, query }
    }

    /// Parses positional fields and registers the user
    pub async fn register_user(&self, args: &[String]) -> Result<UserId, IdentityError> {
        let user = parse_registration(args)?;
        self.register(user).await
    }

    /// Registers an already validated user
    ///
    /// # Errors
    ///
    /// `AlreadyExists` if the id has any ledger entry, including one created
    /// by a concurrent registration between the check and the commit.
    pub async fn register(&self, user: User) -> Result<UserId, IdentityError> {
        let user_id = user.user_id.clone();
        if self.ledger.get_state(user_id.as_str()).await?.is_some() {
            warn!(user_id = %user_id, "Registration rejected: user already exists");
            return Err(IdentityError::AlreadyExists(user_id.to_string()));
        }

        let document = encode_document(&user)?;
        let index_key = self
            .ledger
            .create_composite_key(USER_NAME_INDEX, &[user_id.as_str(), &user.full_name])?;
        let write_set = WriteSet::new()
            .expect_absent(user_id.as_str())
            .put(user_id.as_str(), document)
            .put(index_key, INDEX_SENTINEL);

        match self.ledger.commit(write_set).await {
            Ok(()) => {}
            Err(LedgerError::Conflict { .. }) => {
                warn!(user_id = %user_id, "Registration lost a race for the user id");
                return Err(IdentityError::AlreadyExists(user_id.to_string()));
            }
            Err(e) => return Err(e.into()),
        }

        info!(
            user_id = %user_id,
            user_type = %user.user_type,
            "Registered user"
        );
        Ok(user_id)
    }

    /// The stored document under `user_id`, byte for byte
    pub async fn fetch_user_raw(&self, user_id: &UserId) -> Result<Vec<u8>, IdentityError> {
        let raw = self
            .ledger
            .get_state(user_id.as_str())
            .await?
            .ok_or_else(|| IdentityError::not_found(user_id))?;
        // A key holding another document type is not a user
        if decode_document::<User>(user_id.as_str(), &raw)?.is_none() {
            return Err(IdentityError::not_found(user_id));
        }
        Ok(raw)
    }

    pub async fn fetch_user(&self, user_id: &UserId) -> Result<User, IdentityError> {
        let raw = self
            .ledger
            .get_state(user_id.as_str())
            .await?
            .ok_or_else(|| IdentityError::not_found(user_id))?;
        decode_document::<User>(user_id.as_str(), &raw)?
            .ok_or_else(|| IdentityError::not_found(user_id))
    }

    /// All users of a type, in ledger order
    pub async fn fetch_users_by_type(&self, user_type: UserType) -> Result<Vec<User>, IdentityError> {
        debug!(user_type = %user_type, "Fetching users by type");
        Ok(self.query.documents::<User>(&type_filter(user_type)).await?)
    }

    /// All users of a type as `[{"Key": .., "Record": ..}]`
    pub async fn fetch_users_by_type_raw(&self, user_type: UserType) -> Result<Vec<u8>, IdentityError> {
        Ok(self.query.raw(&type_filter(user_type)).await?)
    }

    /// Farms of a user; empty for insurers
    pub async fn fetch_farms_by_user(&self, user_id: &UserId) -> Result<Vec<Farm>, IdentityError> {
        Ok(self.fetch_user(user_id).await?.farms)
    }

    pub async fn fetch_accounts_by_user(&self, user_id: &UserId) -> Result<Vec<Account>, IdentityError> {
        Ok(self.fetch_user(user_id).await?.accounts)
    }

    /// Overwrites a user document without touching its index entry
    ///
    /// Administrative path used to load opening balances.
    pub async fn save_user(&self, user: &User) -> Result<(), IdentityError> {
        let document = encode_document(user)?;
        self.ledger.put_state(user.user_id.as_str(), document).await?;
        info!(user_id = %user.user_id, "Saved user document");
        Ok(())
    }
}

fn type_filter(user_type: UserType) -> Filter {
    Filter::documents::<User>().field("userType", user_type.as_str())
}

impl std::fmt::Debug for IdentityRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityRegistry").finish_non_exhaustive()
    }
}

impl DomainPort for IdentityRegistry {}

#[async_trait]
impl UserDirectory for IdentityRegistry {
    async fn fetch_user_raw(
        &self,
        user_id: &UserId,
        _metadata: Option<OperationMetadata>,
    ) -> Result<Vec<u8>, PortError> {
        IdentityRegistry::fetch_user_raw(self, user_id)
            .await
            .map_err(IdentityError::into_port_error)
    }

    fn directory_name(&self) -> &'static str {
        "local"
    }
}
