//! Capability Gate - Who May Touch Raw Memory
//!
//! Every raw-layer entry point takes a `&Capability`. A capability can only be
//! obtained from a [`CapabilityGate`], which hands one out to trusted callers
//! and refuses everyone else with `PermissionDenied`. The check happens once,
//! at acquisition; holding the token is the proof afterwards, so no operation
//! re-validates it.
//!
//! Trust follows the loader that produced the caller:
//!
//! | Domain      | Trusted                                  |
//! |-------------|------------------------------------------|
//! | Bootstrap   | always                                   |
//! | Platform    | always                                   |
//! | Application | only when named in `trusted_callers`     |
//!
//! # Limitations
//!
//! A [`CallerIdentity`] is self-asserted. The gate trusts the domain a caller
//! declares and does not authenticate it, so any code that can construct a
//! `CallerIdentity::platform` gets a capability. The gate keeps honest callers
//! off the raw layer by accident; it is not a security boundary against code
//! running in the same process.
//!
//! # Example
//!
//! ```rust
//! use ordo::capability::{CallerIdentity, CapabilityGate};
//!
//! let gate = CapabilityGate::global();
//! let cap = gate.acquire(&CallerIdentity::platform("lockfree-queue"))?;
//! assert_eq!(cap.holder(), "lockfree-queue");
//!
//! assert!(gate.acquire(&CallerIdentity::application("plugin")).is_err());
//! # Ok::<(), ordo::OrdoError>(())
//! ```

use crate::config::OrdoConfig;
use crate::error::{OrdoError, Result};
use crate::logging::{log_event, RawEvent};
use std::borrow::Cow;
use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Loader domain a caller was produced by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoaderDomain {
    /// Code shipped with the runtime itself
    Bootstrap,
    /// Platform libraries layered on the runtime
    Platform,
    /// Ordinary application code
    Application,
}

impl fmt::Display for LoaderDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LoaderDomain::Bootstrap => "Bootstrap",
            LoaderDomain::Platform => "Platform",
            LoaderDomain::Application => "Application",
        };
        f.write_str(name)
    }
}

/// Identity a caller presents when asking for a capability
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerIdentity {
    name: String,
    domain: LoaderDomain,
}

impl CallerIdentity {
    /// The domain is taken as declared; nothing verifies it
    pub fn new(name: impl Into<String>, domain: LoaderDomain) -> Self {
        Self {
            name: name.into(),
            domain,
        }
    }

    pub fn bootstrap(name: impl Into<String>) -> Self {
        Self::new(name, LoaderDomain::Bootstrap)
    }

    pub fn platform(name: impl Into<String>) -> Self {
        Self::new(name, LoaderDomain::Platform)
    }

    pub fn application(name: impl Into<String>) -> Self {
        Self::new(name, LoaderDomain::Application)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn domain(&self) -> LoaderDomain {
        self.domain
    }
}

/// Permission token for the raw layer
///
/// Not `Clone`: a holder lends it out by reference.
#[derive(Debug)]
pub struct Capability {
    id: u64,
    holder: Cow<'static, str>,
    domain: LoaderDomain,
}

impl Capability {
    /// Capability the crate's own safe wrappers run under
    pub(crate) const fn internal() -> Self {
        Capability {
            id: 0,
            holder: Cow::Borrowed("ordo"),
            domain: LoaderDomain::Bootstrap,
        }
    }

    /// Unique id of this grant (0 for the crate-internal capability)
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Name of the caller the capability was granted to
    pub fn holder(&self) -> &str {
        &self.holder
    }

    pub fn domain(&self) -> LoaderDomain {
        self.domain
    }
}

/// Decides which callers receive a [`Capability`]
#[derive(Debug)]
pub struct CapabilityGate {
    trusted_callers: HashSet<String>,
    next_id: AtomicU64,
}

lazy_static::lazy_static! {
    static ref GLOBAL_GATE: CapabilityGate = CapabilityGate::from_config(OrdoConfig::global());
}

impl CapabilityGate {
    /// Gate trusting only the bootstrap and platform domains
    pub fn new() -> Self {
        Self {
            trusted_callers: HashSet::new(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Gate that additionally trusts the configured application callers
    pub fn from_config(config: &OrdoConfig) -> Self {
        let mut gate = Self::new();
        for name in &config.trusted_callers {
            gate.trust(name.clone());
        }
        gate
    }

    /// Process-wide gate, configured from the environment on first use
    pub fn global() -> &'static CapabilityGate {
        &GLOBAL_GATE
    }

    /// Trust an application caller by name
    pub fn trust(&mut self, name: impl Into<String>) {
        self.trusted_callers.insert(name.into());
    }

    /// Whether `caller` would be granted a capability
    pub fn is_trusted(&self, caller: &CallerIdentity) -> bool {
        match caller.domain {
            LoaderDomain::Bootstrap | LoaderDomain::Platform => true,
            LoaderDomain::Application => self.trusted_callers.contains(&caller.name),
        }
    }

    /// Acquire a capability for `caller`
    ///
    /// # Errors
    ///
    /// `PermissionDenied` if the caller is not trusted.
    pub fn acquire(&self, caller: &CallerIdentity) -> Result<Capability> {
        if !self.is_trusted(caller) {
            log_event(RawEvent::CapabilityDenied {
                caller: caller.name.clone(),
                domain: caller.domain.to_string(),
            });
            return Err(OrdoError::PermissionDenied {
                caller: caller.name.clone(),
                domain: caller.domain.to_string(),
            });
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        log_event(RawEvent::CapabilityGranted {
            caller: caller.name.clone(),
            domain: caller.domain.to_string(),
        });

        Ok(Capability {
            id,
            holder: Cow::Owned(caller.name.clone()),
            domain: caller.domain,
        })
    }
}

impl Default for CapabilityGate {
    fn default() -> Self {
        Self::new()
    }
}
