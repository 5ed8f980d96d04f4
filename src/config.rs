//! Process-wide settings.
//!
//! ```no_run
//! use zhandle::{Config, Reclaim};
//!
//! Config::from_env()
//!     .unwrap()
//!     .reclaim(Reclaim::Deferred)
//!     .install()
//!     .unwrap();
//! ```

use std::env;
use std::str::FromStr;
use std::sync::{PoisonError, RwLock};

use libc::c_int;
use once_cell::sync::Lazy;

use crate::{finalizer, raw, Error};

/// When the destructor of a dropped owning handle runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reclaim {
    /// Inside the drop. This is the default.
    Immediate,
    /// On the next [`finalizer::collect`] pass.
    Deferred,
}

impl FromStr for Reclaim {
    type Err = Error;

    fn from_str(s: &str) -> Result<Reclaim, Error> {
        match s.trim().to_ascii_lowercase().as_str() {
            "immediate" => Ok(Reclaim::Immediate),
            "deferred" => Ok(Reclaim::Deferred),
            other => Err(Error::InvalidConfig(format!(
                "reclaim must be immediate or deferred, got {:?}",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub reclaim: Reclaim,
    /// Create IPv6 UDP sockets instead of IPv4 ones.
    pub ipv6: bool,
    /// Size of the buffer `Udp::recv` hands to the native side for the peer host.
    pub peer_name_max: usize,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            reclaim: Reclaim::Immediate,
            ipv6: false,
            peer_name_max: raw::PEER_NAME_MAX,
        }
    }
}

static CONFIG: Lazy<RwLock<Config>> = Lazy::new(|| RwLock::new(Config::default()));

impl Config {
    /// Starts from the defaults and applies `ZSYS_IPV6` (`0`/`1`), `ZSYS_RECLAIM`
    /// (`immediate`/`deferred`) and `ZSYS_PEER_NAME_MAX` when they are set.
    pub fn from_env() -> Result<Config, Error> {
        Config::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Config, Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();
        if let Some(value) = lookup("ZSYS_IPV6") {
            config.ipv6 = parse_flag("ZSYS_IPV6", &value)?;
        }
        if let Some(value) = lookup("ZSYS_RECLAIM") {
            config.reclaim = value.parse()?;
        }
        if let Some(value) = lookup("ZSYS_PEER_NAME_MAX") {
            config.peer_name_max = value.trim().parse().map_err(|_| {
                Error::InvalidConfig(format!("ZSYS_PEER_NAME_MAX is not a size: {:?}", value))
            })?;
        }
        Ok(config)
    }

    pub fn reclaim(self, reclaim: Reclaim) -> Config {
        Config { reclaim, ..self }
    }

    pub fn ipv6(self, ipv6: bool) -> Config {
        Config { ipv6, ..self }
    }

    pub fn peer_name_max(self, peer_name_max: usize) -> Config {
        Config {
            peer_name_max,
            ..self
        }
    }

    /// Makes this the process-wide configuration and pushes the socket family to
    /// the native side. Installing [`Reclaim::Immediate`] also runs whatever an
    /// earlier deferred configuration left queued.
    pub fn install(self) -> Result<(), Error> {
        if self.peer_name_max == 0 {
            return Err(Error::InvalidConfig("peer_name_max must be positive".into()));
        }
        if c_int::try_from(self.peer_name_max).is_err() {
            return Err(Error::BufferOverflow);
        }

        finalizer::set_reclaim(self.reclaim);
        unsafe { raw::zsys_set_ipv6(self.ipv6) };
        log::debug!("installed {:?}", self);
        let reclaim = self.reclaim;
        *CONFIG.write().unwrap_or_else(PoisonError::into_inner) = self;

        if reclaim == Reclaim::Immediate {
            finalizer::collect();
        }
        Ok(())
    }
}

/// The configuration last installed, or the defaults.
pub fn current() -> Config {
    CONFIG
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
}

fn parse_flag(key: &str, value: &str) -> Result<bool, Error> {
    match value.trim() {
        "1" | "true" => Ok(true),
        "0" | "false" => Ok(false),
        other => Err(Error::InvalidConfig(format!(
            "{} must be 0 or 1, got {:?}",
            key, other
        ))),
    }
}
