//! Identity and session handling for the portal: permission registry, principals,
//! per-client session storage, access evaluation and authentication backends.
//! Keep the public surface thin and split implementation across sub-modules.

mod permissions;
mod principal;
mod storage;
mod session;
mod vault;
mod evaluator;
mod provider;

pub use permissions::{Permission, PermissionGroup, UnknownPermission};
pub use principal::{EntityType, PermissionEntry, Principal, Role, User};
pub use storage::{FileStorage, MemoryStorage, Storage, StorageError};
pub use session::{SessionEvent, SessionKeys, SessionStore};
pub use vault::{is_valid_client_id, new_client_id, ClientVault};
pub use evaluator::{current_user_has_permission, has_permission, is_super_admin};
pub use provider::{
    hash_password, is_invalid_credentials, verify_password, ApiClient, AuthBackend, LocalAuthProvider, LocalUserRecord,
    LoginRequest, LoginResponse, RemoteAuthProvider,
};
