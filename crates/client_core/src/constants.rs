//! User-facing texts and timing defaults shared by the repositories.

use std::time::Duration;

pub const NETWORK_TIMEOUT: Duration = Duration::from_millis(6000);
pub const CACHE_TIMEOUT: Duration = Duration::from_millis(2000);
pub const PAGINATION_PAGE_SIZE: u32 = 10;

// Failure reasons.
pub const NETWORK_ERROR: &str = "Network error. Check your internet connection.";
pub const DATA_IS_NULL: &str = "Data is NULL";
pub const CACHE_ERROR_TIMEOUT: &str = "Cache timeout";
pub const ERROR_UNKNOWN: &str = "Unknown error";
pub const INVALID_CREDENTIALS: &str = "Invalid credentials";
pub const ERROR_SAVE_AUTH_TOKEN: &str =
    "Error saving authentication token.\nTry restarting the app.";
pub const ERROR_SAVE_ACCOUNT_PROPERTIES: &str =
    "Error saving account properties.\nTry restarting the app.";
pub const ERROR_NOT_AUTHENTICATED: &str = "You must be logged in to do that.";

// Server `response` values.
pub const GENERIC_AUTH_ERROR: &str = "Error";
pub const RESPONSE_HAS_PERMISSION_TO_EDIT: &str = "You have permission to edit that.";
pub const RESPONSE_NO_PERMISSION_TO_EDIT: &str = "You don't have permission to edit that.";
pub const RESPONSE_MUST_BECOME_MEMBER: &str =
    "You must become a member to publish. Visit the website to sign up.";
pub const SUCCESS_BLOG_DELETED: &str = "deleted";
pub const SUCCESS_BLOG_UPDATED: &str = "updated";
pub const SUCCESS_ACCOUNT_UPDATED: &str = "Updated";
pub const SUCCESS_PASSWORD_UPDATED: &str = "successfully changed password";

// Local outcomes.
pub const RESPONSE_CHECK_PREVIOUS_AUTH_USER_DONE: &str =
    "Done checking for previously authenticated user.";
pub const RESPONSE_LOGGED_OUT: &str = "Logged out.";
