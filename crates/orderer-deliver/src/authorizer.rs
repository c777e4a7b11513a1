//! Read access control for Deliver streams.

use std::collections::HashSet;

use orderer_core::{ChainId, Identity};

use crate::messages::SeekInfo;

/// Decides whether a caller may read the chain a seek names. Consulted on
/// every seek. `caller` is `None` for a stream opened without credentials.
pub trait DeliverAuthorizer: Send + Sync {
    fn authorize(&self, caller: Option<&Identity>, seek: &SeekInfo) -> bool;
}

/// Lets every reader in.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl DeliverAuthorizer for AllowAll {
    fn authorize(&self, _caller: Option<&Identity>, _seek: &SeekInfo) -> bool {
        true
    }
}

/// Admits listed readers, per chain. Anonymous callers are refused.
#[derive(Debug, Clone, Default)]
pub struct ReaderAllowlist {
    readers: HashSet<(ChainId, Identity)>,
}

impl ReaderAllowlist {
    pub fn new() -> Self {
        Self::default()
    }

    /// Grant `reader` access to `chain_id`.
    pub fn allow(mut self, chain_id: impl Into<ChainId>, reader: Identity) -> Self {
        self.readers.insert((chain_id.into(), reader));
        self
    }
}

impl DeliverAuthorizer for ReaderAllowlist {
    fn authorize(&self, caller: Option<&Identity>, seek: &SeekInfo) -> bool {
        match caller {
            Some(caller) => self
                .readers
                .contains(&(seek.chain_id.clone(), caller.clone())),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allowlist_per_chain() {
        let reader = Identity::from_bytes(vec![1u8; 32]);
        let other = Identity::from_bytes(vec![2u8; 32]);
        let allowlist = ReaderAllowlist::new().allow("alpha", reader.clone());

        assert!(allowlist.authorize(Some(&reader), &SeekInfo::oldest("alpha", 0)));
        assert!(!allowlist.authorize(Some(&reader), &SeekInfo::oldest("beta", 0)));
        assert!(!allowlist.authorize(Some(&other), &SeekInfo::oldest("alpha", 0)));
        assert!(!allowlist.authorize(None, &SeekInfo::oldest("alpha", 0)));
    }
}
