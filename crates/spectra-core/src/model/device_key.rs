// ── Device identity ──
//
// A device is identified by the backend that owns it plus the uid that
// backend assigned. Uids are only unique within one backend.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Globally unique device identity, displayed as `backend:uid`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DeviceKey {
    pub backend: String,
    pub uid: String,
}

impl DeviceKey {
    pub fn new(backend: impl Into<String>, uid: impl Into<String>) -> Self {
        Self {
            backend: backend.into(),
            uid: uid.into(),
        }
    }
}

impl fmt::Display for DeviceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.backend, self.uid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_joins_backend_and_uid() {
        assert_eq!(DeviceKey::new("openrazer", "PM1").to_string(), "openrazer:PM1");
    }

    #[test]
    fn orders_by_backend_first() {
        let mut keys = vec![DeviceKey::new("b", "1"), DeviceKey::new("a", "2")];
        keys.sort();
        assert_eq!(keys[0].backend, "a");
    }
}
