//! Identity Ports
//!
//! The settlement engine resolves farmers and insurers through
//! [`UserDirectory`]. Two adapters exist:
//!
//! - **Local**: the [`IdentityRegistry`](crate::IdentityRegistry) itself,
//!   when both contracts share one ledger client
//! - **Chaincode**: [`ChaincodeUserDirectory`](crate::adapters::ChaincodeUserDirectory),
//!   which calls the users contract through `invoke`
//!
//! # Usage
//!
//! ```rust,ignore
//! let directory: Arc<dyn UserDirectory> = match config.user_directory {
//!     DirectoryMode::Local => Arc::new(IdentityRegistry::new(ledger.clone())),
//!     DirectoryMode::Chaincode => Arc::new(ChaincodeUserDirectory::new(ledger.clone(), "userCC")),
//! };
//! let farmer = directory.fetch_user(&farmer_id, None).await?;
//! ```

use async_trait::async_trait;

use core_kernel::{decode_document, DomainPort, OperationMetadata, PortError, UserId};

use crate::user::User;

/// A user document together with the exact bytes it was decoded from
///
/// The bytes are what a later write set expects to still find under the
/// user's key.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedUser {
    pub user: User,
    pub raw: Vec<u8>,
}

/// Port for resolving users by id
#[async_trait]
pub trait UserDirectory: DomainPort {
    /// Returns the stored user document, byte for byte
    ///
    /// # Errors
    ///
    /// `PortError::NotFound` if no user is registered under `user_id`.
    async fn fetch_user_raw(
        &self,
        user_id: &UserId,
        metadata: Option<OperationMetadata>,
    ) -> Result<Vec<u8>, PortError>;

    /// Short name for logs
    fn directory_name(&self) -> &'static str;
}

/// Extension trait with decoding helpers
#[async_trait]
pub trait UserDirectoryExt: UserDirectory {
    /// Fetches and decodes a user
    async fn fetch_user(
        &self,
        user_id: &UserId,
        metadata: Option<OperationMetadata>,
    ) -> Result<ResolvedUser, PortError> {
        let raw = self.fetch_user_raw(user_id, metadata).await?;
        match decode_document::<User>(user_id.as_str(), &raw) {
            Ok(Some(user)) => Ok(ResolvedUser { user, raw }),
            Ok(None) => Err(PortError::not_found("User", user_id)),
            Err(e) => Err(PortError::Transformation {
                message: e.to_string(),
            }),
        }
    }
}

impl<T: UserDirectory + ?Sized> UserDirectoryExt for T {}

/// Mock implementation for testing
#[cfg(any(test, feature = "mock"))]
pub mod mock {
    use super::*;
    use core_kernel::encode_document;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::RwLock;

    /// In-memory directory that also counts lookups
    #[derive(Debug, Default)]
    pub struct MockUserDirectory {
        users: RwLock<HashMap<UserId, Vec<u8>>>,
        lookups: AtomicUsize,
    }

    impl MockUserDirectory {
        pub fn new() -> Self {
            Self::default()
        }

        pub async fn with_users(users: Vec<User>) -> Self {
            let directory = Self::new();
            for user in users {
                directory.insert(&user).await;
            }
            directory
        }

        pub async fn insert(&self, user: &User) {
            let raw = encode_document(user).unwrap_or_default();
            self.users.write().await.insert(user.user_id.clone(), raw);
        }

        /// Stores arbitrary bytes under an id
        pub async fn insert_raw(&self, user_id: UserId, raw: Vec<u8>) {
            self.users.write().await.insert(user_id, raw);
        }

        pub fn lookups(&self) -> usize {
            self.lookups.load(Ordering::SeqCst)
        }
    }

    impl DomainPort for MockUserDirectory {}

    #[async_trait]
    impl UserDirectory for MockUserDirectory {
        async fn fetch_user_raw(
            &self,
            user_id: &UserId,
            _metadata: Option<OperationMetadata>,
        ) -> Result<Vec<u8>, PortError> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            self.users
                .read()
                .await
                .get(user_id)
                .cloned()
                .ok_or_else(|| PortError::not_found("User", user_id))
        }

        fn directory_name(&self) -> &'static str {
            "mock"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mock::MockUserDirectory;
    use super::*;
    use crate::user::{Account, UserType};

    fn insurer(id: &str) -> User {
        User {
            user_id: UserId::new(id).unwrap(),
            user_type: UserType::Insurer,
            full_name: "Monsoon Mutual".into(),
            home_address: "12 MG Road".into(),
            phone: 8_012_345_678,
            email: "claims@monsoon.example".into(),
            farms: vec![],
            accounts: vec![Account::open(4001, "State Bank")],
        }
    }

    #[tokio::test]
    async fn test_fetch_user_decodes_and_keeps_bytes() {
        let directory = MockUserDirectory::with_users(vec![insurer("I1")]).await;
        let id = UserId::new("I1").unwrap();

        let resolved = directory.fetch_user(&id, None).await.unwrap();
        assert_eq!(resolved.user, insurer("I1"));
        assert_eq!(resolved.raw, directory.fetch_user_raw(&id, None).await.unwrap());
        assert_eq!(directory.lookups(), 2);
    }

    #[tokio::test]
    async fn test_missing_user() {
        let directory = MockUserDirectory::new();
        let err = directory
            .fetch_user(&UserId::new("F9").unwrap(), None)
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_foreign_document_reads_as_missing() {
        let directory = MockUserDirectory::new();
        let id = UserId::new("P1").unwrap();
        directory
            .insert_raw(id.clone(), br#"{"docType":"policy","policyId":"P1"}"#.to_vec())
            .await;
        assert!(directory.fetch_user(&id, None).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_corrupt_document_is_transformation_error() {
        let directory = MockUserDirectory::new();
        let id = UserId::new("F1").unwrap();
        directory.insert_raw(id.clone(), b"not json".to_vec()).await;
        let err = directory.fetch_user(&id, None).await.unwrap_err();
        assert!(matches!(err, PortError::Transformation { .. }));
    }
}
