/// Classification for retry policy.
///
/// | Class | Serve stale cache entry? |
/// |-------|--------------------------|
/// | `Never` | No, the request itself is invalid |
/// | `Transient` | Yes, when one exists |
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RetryClass {
    /// Bad symbol, empty range or invalid data. Retrying won't help.
    Never,

    /// Rate limiting, timeouts and upstream outages. A later attempt may succeed.
    Transient,
}
