/// Public S3 endpoint used when no host is configured.
pub const DEFAULT_S3_HOST: &str = "https://s3.amazonaws.com";

/// Signing region used when none is configured.
pub const DEFAULT_REGION: &str = "us-east-1";

/// Marker that makes a URL prefix application-relative (`~/images`).
pub const URL_PREFIX_MARKER: char = '~';

pub const DEFAULT_IMAGE_URL_PREFIX: &str = "~/images";

/// Content type applied when an upload does not name one.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Provider error code for a missing bucket.
pub const NO_SUCH_BUCKET: &str = "NoSuchBucket";
