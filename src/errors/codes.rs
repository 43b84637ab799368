use std::fmt;
use std::ptr;

/// A named error identity used for classification
///
/// Sentinels are compared by address, never by text: declare them as
/// `static` items (a `const` would be copied at every use site and lose its
/// identity). Two sentinels with the same name are different errors.
///
/// ```
/// use errs::Sentinel;
///
/// static QUOTA_EXHAUSTED: Sentinel = Sentinel::new("quota exhausted");
/// ```
pub struct Sentinel {
    name: &'static str,
}

impl Sentinel {
    pub const fn new(name: &'static str) -> Self {
        Self { name }
    }

    /// Human-readable name, also used as the error message
    pub const fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for Sentinel {
    fn eq(&self, other: &Self) -> bool {
        ptr::eq(self, other)
    }
}

impl Eq for Sentinel {}

impl fmt::Debug for Sentinel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Sentinel").field(&self.name).finish()
    }
}

impl fmt::Display for Sentinel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl std::error::Error for Sentinel {}

pub static NOT_IMPLEMENTED: Sentinel = Sentinel::new("not implemented");
pub static INTERNAL: Sentinel = Sentinel::new("internal error");
pub static CANCELED: Sentinel = Sentinel::new("canceled");
pub static OUT_OF_MEMORY: Sentinel = Sentinel::new("out of memory");
pub static DEADLINE_EXCEEDED: Sentinel = Sentinel::new("deadline exceeded");
pub static REMOTE_SERVICE_ERROR: Sentinel = Sentinel::new("remote service error");
pub static RATE_LIMITED: Sentinel = Sentinel::new("rate limited");

pub static INVALID_ARGUMENT: Sentinel = Sentinel::new("invalid argument");
pub static MISSING_ARGUMENT: Sentinel = Sentinel::new("missing argument");
pub static OUT_OF_RANGE: Sentinel = Sentinel::new("out of range");

pub static PERMISSION_DENIED: Sentinel = Sentinel::new("permission denied");
pub static UNAUTHORIZED: Sentinel = Sentinel::new("unauthorized");

pub static EXISTS: Sentinel = Sentinel::new("already exists");
pub static NOT_FOUND: Sentinel = Sentinel::new("not found");
pub static OUTDATED: Sentinel = Sentinel::new("outdated");
