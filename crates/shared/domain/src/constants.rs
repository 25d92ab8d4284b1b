//! Domain-level constants.
//!
//! These constants define business rules and validation requirements.

// =============================================================================
// User Roles
// =============================================================================

/// Role allowed to manage the catalog
pub const ROLE_MANAGER: &str = "manager";

/// Default role assigned to new accounts
pub const ROLE_CASHIER: &str = "cashier";

/// All valid role values
pub const VALID_ROLES: &[&str] = &[ROLE_MANAGER, ROLE_CASHIER];

/// Check if a role value is valid
pub fn is_valid_role(role: &str) -> bool {
    VALID_ROLES.contains(&role)
}

// =============================================================================
// Validation
// =============================================================================

/// Minimum password length requirement
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Minimum SKU length after normalisation
pub const MIN_SKU_LENGTH: usize = 3;

/// Maximum SKU length after normalisation
pub const MAX_SKU_LENGTH: usize = 50;

/// Email length bounds
pub const MIN_EMAIL_LENGTH: usize = 3;
pub const MAX_EMAIL_LENGTH: usize = 254;

// =============================================================================
// Pagination
// =============================================================================

/// Page size used when the caller asks for none (or a non-positive one)
pub const DEFAULT_PAGE_SIZE: u64 = 10;

/// Maximum allowed items per page
pub const MAX_PAGE_SIZE: u64 = 100;

// =============================================================================
// Cache lifetimes
// =============================================================================

/// Users change on every profile edit; keep them short-lived
pub const DEFAULT_USER_CACHE_TTL_SECONDS: u64 = 5 * 60;

/// Product metadata
pub const DEFAULT_PRODUCT_CACHE_TTL_SECONDS: u64 = 30 * 60;

/// Categories are almost static
pub const DEFAULT_CATEGORY_CACHE_TTL_SECONDS: u64 = 24 * 60 * 60;

/// Stock rows (invalidated on every adjustment)
pub const DEFAULT_INVENTORY_CACHE_TTL_SECONDS: u64 = 10 * 60 * 60;
