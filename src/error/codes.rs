/// Error code registry for matchdoc
///
/// Error codes are organized by category:
/// - 1000-1999: Configuration errors
/// - 2000-2999: Data source errors
/// - 3000-3999: Cache storage errors
/// - 4000-4999: Rendering host errors
/// - 5000-5999: Template and page errors
/// - 6000-6999: Merge errors
/// - 7000-7999: Validation errors
/// - 9000-9999: Other errors
#[allow(dead_code)]
pub struct ErrorCode;

impl ErrorCode {
    // Configuration errors (1000-1999)
    pub const CONFIG_GENERIC: u16 = 1000;
    pub const CONFIG_NOT_FOUND: u16 = 1001;
    pub const CONFIG_INVALID_YAML: u16 = 1002;
    pub const CONFIG_INVALID_TOML: u16 = 1003;
    pub const CONFIG_MISSING_REQUIRED: u16 = 1004;
    pub const CONFIG_INVALID_VALUE: u16 = 1005;

    // Data source errors (2000-2999)
    pub const DATA_SOURCE_GENERIC: u16 = 2000;
    pub const DATA_SOURCE_UNAVAILABLE: u16 = 2001;
    pub const DATA_SOURCE_FAILED: u16 = 2002;
    pub const DATA_SOURCE_MISSING_ARTIFACT: u16 = 2003;

    // Cache storage errors (3000-3999)
    pub const STORAGE_GENERIC: u16 = 3000;
    pub const STORAGE_IO_ERROR: u16 = 3001;
    pub const STORAGE_PUBLISH_FAILED: u16 = 3002;
    pub const STORAGE_CORRUPTED: u16 = 3003;
    pub const STORAGE_NOT_FOUND: u16 = 3004;
    pub const STORAGE_INVALID_NAMESPACE: u16 = 3005;

    // Rendering host errors (4000-4999)
    pub const HOST_GENERIC: u16 = 4000;
    pub const HOST_RETRIES_EXHAUSTED: u16 = 4001;
    pub const HOST_OPERATION_FAILED: u16 = 4002;
    pub const HOST_DOCUMENT_NOT_FOUND: u16 = 4003;

    // Template and page errors (5000-5999)
    pub const TEMPLATE_GENERIC: u16 = 5000;
    pub const TEMPLATE_NOT_FOUND: u16 = 5001;
    pub const TEMPLATE_NO_PAGES: u16 = 5002;
    pub const TEMPLATE_ARCHIVE_INVALID: u16 = 5003;

    // Merge errors (6000-6999)
    pub const MERGE_GENERIC: u16 = 6000;
    pub const MERGE_NO_INPUT: u16 = 6001;
    pub const MERGE_INVALID_PDF: u16 = 6002;

    // Validation errors (7000-7999)
    pub const VALIDATION_GENERIC: u16 = 7000;
    pub const VALIDATION_REQUIRED_FIELD: u16 = 7001;
    pub const VALIDATION_OUT_OF_RANGE: u16 = 7002;
    pub const VALIDATION_INVALID_FORMAT: u16 = 7003;

    // Other errors (9000-9999)
    pub const OTHER_GENERIC: u16 = 9000;
    pub const OTHER_INTERNAL_ERROR: u16 = 9001;
}

/// Get a human-readable description for an error code
pub fn describe_error_code(code: u16) -> &'static str {
    match code {
        1000 => "Generic configuration error",
        1001 => "Configuration file not found",
        1002 => "Invalid YAML syntax in configuration",
        1003 => "Invalid TOML syntax in configuration",
        1004 => "Required configuration field is missing",
        1005 => "Invalid value in configuration",

        2000 => "Generic data source error",
        2001 => "Data source is temporarily unavailable",
        2002 => "Data source computation failed",
        2003 => "Data source did not produce every artifact",

        3000 => "Generic cache storage error",
        3001 => "Cache storage I/O error",
        3002 => "Failed to publish cache entry",
        3003 => "Cache entry is corrupted",
        3004 => "Cache entry not found",
        3005 => "Namespace does not name a cache entry",

        4000 => "Generic rendering host error",
        4001 => "Rendering host stayed busy after every retry",
        4002 => "Rendering host operation failed",
        4003 => "Rendering host could not open the document",

        5000 => "Generic template error",
        5001 => "Template not found in archive",
        5002 => "No page was produced",
        5003 => "Template archive is invalid",

        6000 => "Generic merge error",
        6001 => "Nothing to merge",
        6002 => "Rendered page is not a valid PDF",

        7000 => "Generic validation error",
        7001 => "Required field is missing or empty",
        7002 => "Value out of range",
        7003 => "Invalid format",

        9000 => "Generic error",
        9001 => "Internal error",

        _ => "Unknown error code",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_known_codes() {
        assert_eq!(
            describe_error_code(ErrorCode::HOST_RETRIES_EXHAUSTED),
            "Rendering host stayed busy after every retry"
        );
        assert_eq!(
            describe_error_code(ErrorCode::TEMPLATE_NO_PAGES),
            "No page was produced"
        );
    }

    #[test]
    fn test_describe_unknown_code() {
        assert_eq!(describe_error_code(4242), "Unknown error code");
    }
}
