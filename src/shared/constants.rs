/// Default page size for hospital search
pub const DEFAULT_PAGE_SIZE: i64 = 20;

/// Maximum page size allowed
pub const MAX_PAGE_SIZE: i64 = 100;

// =============================================================================
// NEARBY SEARCH
// =============================================================================

/// Radius used when the caller gives none (or a non-positive one)
pub const DEFAULT_NEARBY_RADIUS_KM: f64 = 10.0;

/// Result cap used when the caller gives none
pub const DEFAULT_NEARBY_LIMIT: i64 = 50;

// =============================================================================
// KEYWORD SEARCH
// =============================================================================

/// Keywords are split on whitespace; extra terms beyond this are ignored
pub const MAX_KEYWORD_TERMS: usize = 8;

// =============================================================================
// HOSPITAL STATUS
// =============================================================================

/// Status value of a hospital that is open for business
pub const STATUS_OPERATING: &str = "開業";

// =============================================================================
// IMPORT
// =============================================================================

/// Maximum number of per-record error messages kept in an import summary
pub const MAX_IMPORT_ERRORS: usize = 50;
